//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use common::{Money, Role, StallId, UserId};
use store::{
    NewNotification, NewProfile, NewReservation, NewUser, NotificationQuery,
    NotificationStatus, NotificationStore, NotificationType, PostgresStore, ProfileStore,
    ReservationStatus, ReservationStore, ReserveOutcome, StallFilter, StallRecord, StallSize,
    StallStatus, StallStore, StoreError, UserStore,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let store = PostgresStore::connect(&connection_string, 2).await.unwrap();
            store.run_migrations().await.unwrap();
            store.pool().close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;
    let store = PostgresStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE users, profiles, stalls, reservations, notification_logs RESTART IDENTITY",
    )
    .execute(store.pool())
    .await
    .unwrap();

    store
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 9, day).unwrap()
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$stub".into(),
        role: Role::Vendor,
        full_name: Some("Nimal Perera".into()),
        phone_number: None,
        company_name: Some("Sarasavi".into()),
        contact_number: Some("0771234567".into()),
        owner: None,
        business_reg_no: None,
        address: None,
    }
}

fn stall(code: &str, size: StallSize) -> StallRecord {
    let now = Utc::now();
    StallRecord {
        id: StallId::new(),
        stall_code: code.to_string(),
        name: format!("Stall {code}"),
        size,
        status: StallStatus::Available,
        section: Some("Hall A".into()),
        row: Some(1),
        column: Some(2),
        x_position: Some(10.0),
        y_position: Some(20.0),
        width: Some(3.0),
        length: Some(3.0),
        price_per_day: Money::from_cents(5_000_00),
        description: None,
        created_at: now,
        updated_at: now,
    }
}

fn new_reservation(user: i64, stalls: &[StallId], start: u32, end: u32) -> NewReservation {
    NewReservation {
        user_id: UserId::new(user),
        user_email: format!("user{user}@example.com"),
        company_name: None,
        stall_ids: stalls.to_vec(),
        start_date: date(start),
        end_date: date(end),
        total_price: Money::from_cents(10_000_00),
        genres: vec!["Fiction".into()],
        notes: None,
    }
}

#[tokio::test]
async fn user_insert_and_lookup() {
    let store = get_test_store().await;

    let user = store.insert_user(new_user("v@example.com")).await.unwrap();
    assert_eq!(user.role, Role::Vendor);

    let found = store
        .find_user_by_email("v@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);

    let err = store
        .insert_user(new_user("v@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    assert!(store.delete_user(user.id).await.unwrap());
    assert!(store.find_user_by_id(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn profile_genre_search_ignores_case() {
    let store = get_test_store().await;

    store
        .insert_profile(NewProfile {
            user_id: UserId::new(9),
            full_name: Some("Kamal".into()),
            email: None,
            phone_number: None,
            company_name: None,
            business_reg_no: None,
            address: None,
            literary_genres: vec!["Poetry".into(), "History".into()],
            role: Role::Vendor,
            business_description: None,
            profile_image_url: None,
            website_url: None,
            facebook_url: None,
        })
        .await
        .unwrap();

    let hits = store.search_profiles_by_genre("poetry").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(store.search_profiles_by_genre("Science").await.unwrap().is_empty());
}

#[tokio::test]
async fn stall_filters_and_unique_code() {
    let store = get_test_store().await;

    store.insert_stall(stall("A-01", StallSize::Small)).await.unwrap();
    let mut large = store.insert_stall(stall("A-02", StallSize::Large)).await.unwrap();
    large.status = StallStatus::Maintenance;
    store.update_stall(large).await.unwrap();

    let available = store
        .list_stalls(StallFilter::new().status(StallStatus::Available))
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].stall_code, "A-01");

    let err = store
        .insert_stall(stall("A-01", StallSize::Medium))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn reserve_checks_overlap_and_limit() {
    let store = get_test_store().await;
    let a = StallId::new();
    let b = StallId::new();

    let outcome = store
        .reserve(new_reservation(1, &[a, b], 1, 5), 3)
        .await
        .unwrap();
    let ReserveOutcome::Created(first) = outcome else {
        panic!("expected created, got {outcome:?}");
    };
    assert_eq!(first.status, ReservationStatus::Pending);
    assert_eq!(first.stall_ids, vec![a, b]);

    let taken = store
        .reserve(new_reservation(2, &[b], 5, 7), 3)
        .await
        .unwrap();
    assert_eq!(taken, ReserveOutcome::StallTaken(b));

    let limited = store
        .reserve(new_reservation(1, &[StallId::new(), StallId::new()], 10, 12), 3)
        .await
        .unwrap();
    assert_eq!(limited, ReserveOutcome::LimitExceeded { current: 2 });

    assert_eq!(store.count_active_stalls(UserId::new(1)).await.unwrap(), 2);
    assert_eq!(store.count_overlapping(a, date(5), date(6)).await.unwrap(), 1);
    assert_eq!(store.count_overlapping(a, date(6), date(9)).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_reserves_for_one_stall_admit_one() {
    let store = get_test_store().await;
    let stall = StallId::new();

    let handles: Vec<_> = (1..=6)
        .map(|user| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .reserve(new_reservation(user, &[stall], 1, 3), 3)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), ReserveOutcome::Created(_)) {
            created += 1;
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn qr_code_is_unique_across_reservations() {
    let store = get_test_store().await;

    let ReserveOutcome::Created(mut first) = store
        .reserve(new_reservation(1, &[StallId::new()], 1, 2), 3)
        .await
        .unwrap()
    else {
        panic!("expected created");
    };
    let ReserveOutcome::Created(mut second) = store
        .reserve(new_reservation(2, &[StallId::new()], 1, 2), 3)
        .await
        .unwrap()
    else {
        panic!("expected created");
    };

    first.qr_code = Some("BOOKFAIR-2026-RES-1".into());
    store
        .update_reservation(first, ReservationStatus::Pending)
        .await
        .unwrap();

    second.qr_code = Some("BOOKFAIR-2026-RES-1".into());
    let err = store
        .update_reservation(second, ReservationStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let found = store
        .find_reservation_by_qr_code("BOOKFAIR-2026-RES-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.user_id, UserId::new(1));
}

#[tokio::test]
async fn status_update_is_compare_and_set() {
    let store = get_test_store().await;

    let ReserveOutcome::Created(read) = store
        .reserve(new_reservation(40, &[StallId::new()], 1, 2), 3)
        .await
        .unwrap()
    else {
        panic!("expected created");
    };

    let mut completed = read.clone();
    completed.status = ReservationStatus::Completed;
    store
        .update_reservation(completed, ReservationStatus::Pending)
        .await
        .unwrap();

    let mut stale = read.clone();
    stale.genres = vec!["Poetry".into()];
    let err = store
        .update_reservation(stale, ReservationStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConcurrencyConflict { .. }));

    let stored = store.find_reservation(read.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ReservationStatus::Completed);

    let mut missing = read;
    missing.id = i64::MAX;
    let err = store
        .update_reservation(missing, ReservationStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn notification_log_lifecycle_and_stats() {
    let store = get_test_store().await;

    let mut record = store
        .insert_notification(NewNotification {
            recipient_email: "v@example.com".into(),
            recipient_name: "Vendor".into(),
            notification_type: NotificationType::ReservationConfirmation,
            subject: "Reservation Confirmed".into(),
            reference_id: Some("1".into()),
        })
        .await
        .unwrap();
    assert_eq!(record.status, NotificationStatus::Pending);

    record.mark_sent("Email sent successfully");
    store.update_notification(record).await.unwrap();

    let rows = store
        .query_notifications(NotificationQuery::new().recipient("v@example.com"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, NotificationStatus::Sent);
    assert!(rows[0].sent_at.is_some());

    let stats = store.notification_stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.reservations, 1);
}
