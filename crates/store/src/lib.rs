//! Persistence for the bookfair services.
//!
//! Each aggregate has a store trait with two implementations:
//! [`InMemoryStore`] for tests and single-process deployments, and
//! [`PostgresStore`] backed by `sqlx`.

pub mod error;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod profiles;
pub mod reservations;
pub mod stalls;
pub mod users;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use notifications::{
    NewNotification, NotificationQuery, NotificationRecord, NotificationStats, NotificationStatus,
    NotificationStore, NotificationType,
};
pub use postgres::PostgresStore;
pub use profiles::{NewProfile, ProfileRecord, ProfileStore};
pub use reservations::{
    NewReservation, PaymentStatus, ReservationRecord, ReservationStatus, ReservationStore,
    ReserveOutcome, ranges_overlap,
};
pub use stalls::{StallFilter, StallRecord, StallSize, StallStatus, StallStore};
pub use users::{NewUser, UserRecord, UserStore};
