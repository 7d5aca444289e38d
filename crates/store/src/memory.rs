use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{StallId, UserId};
use tokio::sync::RwLock;

use crate::{
    NewNotification, NewProfile, NewReservation, NewUser, NotificationQuery, NotificationRecord,
    NotificationStats, NotificationStatus, NotificationStore, NotificationType, PaymentStatus,
    ProfileRecord, ProfileStore, ReservationRecord, ReservationStatus, ReservationStore,
    ReserveOutcome, Result, StallFilter, StallRecord, StallStore, StoreError, UserRecord,
    UserStore,
};

/// A table keyed by a sequential id, the way a `BIGSERIAL` column would be.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory store implementing every store trait.
///
/// Each aggregate lives behind its own lock, so a clone shares state
/// with the original. Used by tests and by single-process deployments
/// that run without `DATABASE_URL`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<Table<UserRecord>>>,
    profiles: Arc<RwLock<Table<ProfileRecord>>>,
    stalls: Arc<RwLock<BTreeMap<StallId, StallRecord>>>,
    reservations: Arc<RwLock<Table<ReservationRecord>>>,
    notifications: Arc<RwLock<Table<NotificationRecord>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        *self.users.write().await = Table::default();
        *self.profiles.write().await = Table::default();
        self.stalls.write().await.clear();
        *self.reservations.write().await = Table::default();
        *self.notifications.write().await = Table::default();
    }
}

fn newest_first(mut rows: Vec<ReservationRecord>) -> Vec<ReservationRecord> {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    rows
}

fn active_stalls(rows: &BTreeMap<i64, ReservationRecord>, user_id: UserId) -> i64 {
    rows.values()
        .filter(|r| r.user_id == user_id && r.status.is_active())
        .map(|r| r.stall_ids.len() as i64)
        .sum()
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserRecord> {
        let mut table = self.users.write().await;
        if table.rows.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }

        let id = table.allocate_id();
        let now = Utc::now();
        let record = UserRecord {
            id: UserId::new(id),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            full_name: user.full_name,
            phone_number: user.phone_number,
            company_name: user.company_name,
            contact_number: user.contact_number,
            owner: user.owner,
            business_reg_no: user.business_reg_no,
            address: user.address,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let table = self.users.read().await;
        Ok(table.rows.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.rows.get(&id.as_i64()).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users.read().await.rows.values().cloned().collect())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        Ok(self.users.write().await.rows.remove(&id.as_i64()).is_some())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileRecord> {
        let mut table = self.profiles.write().await;
        if table.rows.values().any(|p| p.user_id == profile.user_id) {
            return Err(StoreError::Conflict(format!(
                "profile for user {} already exists",
                profile.user_id
            )));
        }

        let id = table.allocate_id();
        let now = Utc::now();
        let record = ProfileRecord {
            id,
            user_id: profile.user_id,
            full_name: profile.full_name,
            email: profile.email,
            phone_number: profile.phone_number,
            company_name: profile.company_name,
            business_reg_no: profile.business_reg_no,
            address: profile.address,
            literary_genres: profile.literary_genres,
            role: profile.role,
            business_description: profile.business_description,
            profile_image_url: profile.profile_image_url,
            website_url: profile.website_url,
            facebook_url: profile.facebook_url,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn find_profile(&self, user_id: UserId) -> Result<Option<ProfileRecord>> {
        let table = self.profiles.read().await;
        Ok(table.rows.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn update_profile(&self, mut profile: ProfileRecord) -> Result<ProfileRecord> {
        let mut table = self.profiles.write().await;
        let slot = table
            .rows
            .values_mut()
            .find(|p| p.user_id == profile.user_id)
            .ok_or_else(|| StoreError::not_found("Profile", profile.user_id))?;
        profile.id = slot.id;
        profile.created_at = slot.created_at;
        profile.updated_at = Utc::now();
        *slot = profile.clone();
        Ok(profile)
    }

    async fn delete_profile(&self, user_id: UserId) -> Result<bool> {
        let mut table = self.profiles.write().await;
        let before = table.rows.len();
        table.rows.retain(|_, p| p.user_id != user_id);
        Ok(table.rows.len() != before)
    }

    async fn search_profiles_by_genre(&self, genre: &str) -> Result<Vec<ProfileRecord>> {
        let table = self.profiles.read().await;
        Ok(table
            .rows
            .values()
            .filter(|p| p.has_genre(genre))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StallStore for InMemoryStore {
    async fn insert_stall(&self, stall: StallRecord) -> Result<StallRecord> {
        let mut stalls = self.stalls.write().await;
        if stalls.values().any(|s| s.stall_code == stall.stall_code) {
            return Err(StoreError::Conflict(format!(
                "stall code {} already exists",
                stall.stall_code
            )));
        }
        stalls.insert(stall.id, stall.clone());
        Ok(stall)
    }

    async fn find_stall(&self, id: StallId) -> Result<Option<StallRecord>> {
        Ok(self.stalls.read().await.get(&id).cloned())
    }

    async fn find_stall_by_code(&self, code: &str) -> Result<Option<StallRecord>> {
        let stalls = self.stalls.read().await;
        Ok(stalls.values().find(|s| s.stall_code == code).cloned())
    }

    async fn list_stalls(&self, filter: StallFilter) -> Result<Vec<StallRecord>> {
        let stalls = self.stalls.read().await;
        let mut matching: Vec<_> = stalls
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.stall_code.cmp(&b.stall_code));
        Ok(matching)
    }

    async fn update_stall(&self, mut stall: StallRecord) -> Result<StallRecord> {
        let mut stalls = self.stalls.write().await;
        let slot = stalls
            .get_mut(&stall.id)
            .ok_or_else(|| StoreError::not_found("Stall", stall.id))?;
        stall.created_at = slot.created_at;
        stall.updated_at = Utc::now();
        *slot = stall.clone();
        Ok(stall)
    }

    async fn delete_stall(&self, id: StallId) -> Result<bool> {
        Ok(self.stalls.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn reserve(
        &self,
        new: NewReservation,
        max_stalls_per_user: i64,
    ) -> Result<ReserveOutcome> {
        // One write lock covers the checks and the insert.
        let mut table = self.reservations.write().await;

        let current = active_stalls(&table.rows, new.user_id);
        if current + new.stall_ids.len() as i64 > max_stalls_per_user {
            return Ok(ReserveOutcome::LimitExceeded { current });
        }

        for stall in &new.stall_ids {
            if table
                .rows
                .values()
                .any(|r| r.blocks(*stall, new.start_date, new.end_date))
            {
                return Ok(ReserveOutcome::StallTaken(*stall));
            }
        }

        let id = table.allocate_id();
        let now = Utc::now();
        let record = ReservationRecord {
            id,
            user_id: new.user_id,
            user_email: new.user_email,
            company_name: new.company_name,
            stall_ids: new.stall_ids,
            start_date: new.start_date,
            end_date: new.end_date,
            status: ReservationStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_price: new.total_price,
            qr_code: None,
            qr_code_path: None,
            genres: new.genres,
            notes: new.notes,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        };
        table.rows.insert(id, record.clone());
        Ok(ReserveOutcome::Created(record))
    }

    async fn find_reservation(&self, id: i64) -> Result<Option<ReservationRecord>> {
        Ok(self.reservations.read().await.rows.get(&id).cloned())
    }

    async fn find_reservation_by_qr_code(
        &self,
        code: &str,
    ) -> Result<Option<ReservationRecord>> {
        let table = self.reservations.read().await;
        Ok(table
            .rows
            .values()
            .find(|r| r.qr_code.as_deref() == Some(code))
            .cloned())
    }

    async fn list_reservations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReservationRecord>> {
        let table = self.reservations.read().await;
        Ok(newest_first(
            table
                .rows
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_reservations_for_stall(
        &self,
        stall_id: StallId,
    ) -> Result<Vec<ReservationRecord>> {
        let table = self.reservations.read().await;
        Ok(newest_first(
            table
                .rows
                .values()
                .filter(|r| r.stall_ids.contains(&stall_id))
                .cloned()
                .collect(),
        ))
    }

    async fn list_reservations(
        &self,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<ReservationRecord>> {
        let table = self.reservations.read().await;
        Ok(newest_first(
            table
                .rows
                .values()
                .filter(|r| status.is_none_or(|s| r.status == s))
                .cloned()
                .collect(),
        ))
    }

    async fn count_active_stalls(&self, user_id: UserId) -> Result<i64> {
        Ok(active_stalls(&self.reservations.read().await.rows, user_id))
    }

    async fn count_overlapping(
        &self,
        stall_id: StallId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64> {
        let table = self.reservations.read().await;
        Ok(table
            .rows
            .values()
            .filter(|r| r.blocks(stall_id, start, end))
            .count() as i64)
    }

    async fn update_reservation(
        &self,
        mut reservation: ReservationRecord,
        expected: ReservationStatus,
    ) -> Result<ReservationRecord> {
        let mut table = self.reservations.write().await;
        if let Some(code) = reservation.qr_code.as_deref()
            && table
                .rows
                .values()
                .any(|r| r.id != reservation.id && r.qr_code.as_deref() == Some(code))
        {
            return Err(StoreError::Conflict(format!("QR code {code} already issued")));
        }
        let slot = table
            .rows
            .get_mut(&reservation.id)
            .ok_or_else(|| StoreError::not_found("Reservation", reservation.id))?;
        if slot.status != expected {
            tracing::debug!(
                id = %reservation.id,
                %expected,
                actual = %slot.status,
                "Rejected stale reservation write"
            );
            return Err(StoreError::ConcurrencyConflict {
                entity: "Reservation",
                id: reservation.id.to_string(),
                expected: expected.to_string(),
                actual: slot.status.to_string(),
            });
        }
        reservation.created_at = slot.created_at;
        reservation.updated_at = Utc::now();
        *slot = reservation.clone();
        Ok(reservation)
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(&self, new: NewNotification) -> Result<NotificationRecord> {
        let mut table = self.notifications.write().await;
        let id = table.allocate_id();
        let record = NotificationRecord {
            id,
            recipient_email: new.recipient_email,
            recipient_name: new.recipient_name,
            notification_type: new.notification_type,
            subject: new.subject,
            message: None,
            status: NotificationStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            sent_at: None,
            reference_id: new.reference_id,
        };
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn update_notification(
        &self,
        record: NotificationRecord,
    ) -> Result<NotificationRecord> {
        let mut table = self.notifications.write().await;
        let slot = table
            .rows
            .get_mut(&record.id)
            .ok_or_else(|| StoreError::not_found("Notification", record.id))?;
        slot.status = record.status;
        slot.message = record.message;
        slot.error_message = record.error_message;
        slot.sent_at = record.sent_at;
        Ok(slot.clone())
    }

    async fn find_notification(&self, id: i64) -> Result<Option<NotificationRecord>> {
        Ok(self.notifications.read().await.rows.get(&id).cloned())
    }

    async fn query_notifications(
        &self,
        query: NotificationQuery,
    ) -> Result<Vec<NotificationRecord>> {
        let table = self.notifications.read().await;
        let mut rows: Vec<_> = table
            .rows
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn notification_stats(&self) -> Result<NotificationStats> {
        let table = self.notifications.read().await;
        let mut stats = NotificationStats::default();
        for r in table.rows.values() {
            stats.total += 1;
            match r.status {
                NotificationStatus::Sent => stats.sent += 1,
                NotificationStatus::Failed => stats.failed += 1,
                NotificationStatus::Pending => stats.pending += 1,
            }
            match r.notification_type {
                NotificationType::ReservationConfirmation => stats.reservations += 1,
                NotificationType::RegistrationConfirmation => stats.registrations += 1,
                _ => {}
            }
        }
        Ok(stats)
    }
}
