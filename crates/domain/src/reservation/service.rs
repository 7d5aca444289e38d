use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use common::{Money, StallId, UserId};
use store::{
    NewReservation, PaymentStatus, ReservationRecord, ReservationStatus, ReservationStore,
    ReserveOutcome, StoreError,
};
use validator::Validate;

use super::{CreateReservationRequest, QrCodeResponse, ReservationError, ReservationResponse};
use crate::events::{CancellationEvent, ReservationEvent, StallInfo};
use crate::ports::{NotificationPublisher, StallCatalog, StallSummary};
use crate::qr::QrCodeGenerator;
use crate::{Caller, DomainError, Result};

/// Default cap on stalls one user may hold across active reservations.
pub const DEFAULT_MAX_STALLS_PER_USER: i64 = 3;

/// Reads per modification before a lost status race is reported.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// A QR image ready to be served as an attachment.
#[derive(Debug, Clone)]
pub struct QrDownload {
    pub filename: String,
    pub png: Vec<u8>,
}

/// The reservation workflow and its admin and internal views.
pub struct ReservationService {
    reservations: Arc<dyn ReservationStore>,
    stalls: Arc<dyn StallCatalog>,
    publisher: Arc<dyn NotificationPublisher>,
    qr: QrCodeGenerator,
    max_stalls_per_user: i64,
}

fn rejected(reason: &'static str) {
    metrics::counter!("reservations_rejected_total", "reason" => reason).increment(1);
}

fn display_name(reservation: &ReservationRecord) -> String {
    reservation
        .company_name
        .clone()
        .unwrap_or_else(|| reservation.user_email.clone())
}

impl ReservationService {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        stalls: Arc<dyn StallCatalog>,
        publisher: Arc<dyn NotificationPublisher>,
        qr: QrCodeGenerator,
    ) -> Self {
        Self {
            reservations,
            stalls,
            publisher,
            qr,
            max_stalls_per_user: DEFAULT_MAX_STALLS_PER_USER,
        }
    }

    pub fn with_max_stalls_per_user(mut self, max: i64) -> Self {
        self.max_stalls_per_user = max;
        self
    }

    /// Validates, prices, persists, issues a QR code, confirms and announces
    /// a new reservation.
    #[tracing::instrument(skip(self, request, caller), fields(user_id = %caller.user_id))]
    pub async fn create(
        &self,
        request: CreateReservationRequest,
        caller: &Caller,
    ) -> Result<ReservationResponse> {
        let started = Instant::now();
        let result = self.create_inner(request, caller).await;
        metrics::histogram!("reservation_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn create_inner(
        &self,
        request: CreateReservationRequest,
        caller: &Caller,
    ) -> Result<ReservationResponse> {
        if let Err(e) = request.validate() {
            rejected("validation");
            return Err(e.into());
        }
        if request.end_date < request.start_date {
            rejected("validation");
            return Err(ReservationError::Invalid("End date must be after start date".into()).into());
        }

        let requested = request.stall_ids.len() as i64;
        let current = self.reservations.count_active_stalls(caller.user_id).await?;
        if current + requested > self.max_stalls_per_user {
            rejected("limit");
            return Err(self.limit_exceeded(current));
        }

        for stall in &request.stall_ids {
            let overlapping = self
                .reservations
                .count_overlapping(*stall, request.start_date, request.end_date)
                .await?;
            if overlapping > 0 {
                rejected("unavailable");
                return Err(ReservationError::StallNotAvailable(*stall).into());
            }
        }

        let stalls = self.price_lookup(&request.stall_ids).await?;
        let days = (request.end_date - request.start_date).num_days() + 1;
        let Some(total_price) = stalls.iter().try_fold(Money::zero(), |total, s| {
            s.price_per_day
                .checked_mul(days)
                .and_then(|price| total.checked_add(price))
        }) else {
            rejected("validation");
            return Err(ReservationError::Invalid("Total price is out of range".into()).into());
        };

        let new = NewReservation {
            user_id: caller.user_id,
            user_email: caller.email.clone(),
            company_name: caller.company_name.clone(),
            stall_ids: request.stall_ids,
            start_date: request.start_date,
            end_date: request.end_date,
            total_price,
            genres: request.genres,
            notes: request.notes,
        };

        let reservation = match self.reservations.reserve(new, self.max_stalls_per_user).await? {
            ReserveOutcome::Created(record) => record,
            ReserveOutcome::LimitExceeded { current } => {
                rejected("limit");
                return Err(self.limit_exceeded(current));
            }
            ReserveOutcome::StallTaken(stall) => {
                rejected("unavailable");
                return Err(ReservationError::StallNotAvailable(stall).into());
            }
        };
        tracing::info!(reservation_id = reservation.id, %total_price, "Reservation created");

        let code = QrCodeGenerator::reservation_code(reservation.id, reservation.user_id);
        let qr_code_path = match self.qr.write(reservation.id, &code).await {
            Ok(path) => Some(path.to_string_lossy().into_owned()),
            Err(e) => {
                tracing::error!(reservation_id = reservation.id, error = %e, "QR image not written");
                None
            }
        };
        let confirmed_at = Utc::now();
        let reservation = self
            .modify(reservation.id, None, |r| {
                r.qr_code = Some(code.clone());
                r.qr_code_path = qr_code_path.clone();
                // A cancel that won the race keeps its status.
                if r.status == ReservationStatus::Pending {
                    r.status = ReservationStatus::Confirmed;
                    r.confirmed_at = Some(confirmed_at);
                }
                Ok(())
            })
            .await?;

        metrics::counter!("reservations_created_total").increment(1);

        let event = ReservationEvent {
            reservation_id: reservation.id.to_string(),
            user_id: reservation.user_id.to_string(),
            user_email: reservation.user_email.clone(),
            user_name: display_name(&reservation),
            business_name: reservation.company_name.clone(),
            stalls: stalls
                .into_iter()
                .map(|s| StallInfo {
                    stall_id: s.id.to_string(),
                    stall_name: s.name,
                    stall_size: s.size.to_string(),
                    location: s.section,
                    price_cents: s.price_per_day.cents(),
                })
                .collect(),
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            reservation_date: reservation.created_at,
            total_amount_cents: reservation.total_price.cents(),
            qr_code: reservation.qr_code.clone(),
        };
        if let Err(e) = self.publisher.publish_reservation(event).await {
            tracing::warn!(reservation_id = reservation.id, error = %e, "Reservation event not published");
        }

        Ok(reservation.into())
    }

    fn limit_exceeded(&self, current: i64) -> DomainError {
        ReservationError::LimitExceeded {
            max: self.max_stalls_per_user,
            current,
        }
        .into()
    }

    async fn price_lookup(&self, stall_ids: &[StallId]) -> Result<Vec<StallSummary>> {
        let mut stalls = Vec::with_capacity(stall_ids.len());
        for id in stall_ids {
            match self.stalls.stall(*id).await {
                Ok(Some(stall)) => stalls.push(stall),
                Ok(None) => {
                    rejected("stall_lookup");
                    return Err(ReservationError::Invalid(format!(
                        "Unable to fetch stall details: {id}"
                    ))
                    .into());
                }
                Err(e) => {
                    tracing::warn!(stall_id = %id, error = %e, "Stall lookup failed");
                    rejected("stall_lookup");
                    return Err(ReservationError::Invalid(format!(
                        "Unable to fetch stall details: {id}"
                    ))
                    .into());
                }
            }
        }
        Ok(stalls)
    }

    /// Loads a reservation the caller owns. Someone else's reservation is
    /// reported as missing.
    async fn owned(&self, id: i64, caller: &Caller) -> Result<ReservationRecord> {
        self.reservations
            .find_reservation(id)
            .await?
            .filter(|r| r.user_id == caller.user_id)
            .ok_or_else(|| ReservationError::NotFound(id).into())
    }

    async fn load(&self, id: i64, owner: Option<&Caller>) -> Result<ReservationRecord> {
        match owner {
            Some(caller) => self.owned(id, caller).await,
            None => self
                .reservations
                .find_reservation(id)
                .await?
                .ok_or_else(|| ReservationError::NotFound(id).into()),
        }
    }

    /// Reads the reservation, applies `change` and writes it back only if
    /// its status is still the one that was read. A lost race re-reads and
    /// re-applies, so `change` always judges the current status.
    async fn modify<F>(
        &self,
        id: i64,
        owner: Option<&Caller>,
        mut change: F,
    ) -> Result<ReservationRecord>
    where
        F: FnMut(&mut ReservationRecord) -> Result<()>,
    {
        let mut attempt = 1;
        loop {
            let mut reservation = self.load(id, owner).await?;
            let expected = reservation.status;
            change(&mut reservation)?;
            match self.reservations.update_reservation(reservation, expected).await {
                Err(StoreError::ConcurrencyConflict { actual, .. })
                    if attempt < MAX_WRITE_ATTEMPTS =>
                {
                    tracing::debug!(
                        reservation_id = id,
                        %expected,
                        %actual,
                        attempt,
                        "Status changed underneath, retrying"
                    );
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }

    pub async fn my_reservations(&self, caller: &Caller) -> Result<Vec<ReservationResponse>> {
        let records = self
            .reservations
            .list_reservations_for_user(caller.user_id)
            .await?;
        Ok(records.into_iter().map(ReservationResponse::from).collect())
    }

    pub async fn get(&self, id: i64, caller: &Caller) -> Result<ReservationResponse> {
        Ok(self.owned(id, caller).await?.into())
    }

    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn cancel(
        &self,
        id: i64,
        caller: &Caller,
        reason: Option<String>,
    ) -> Result<ReservationResponse> {
        let now = Utc::now();
        let reservation = self
            .modify(id, Some(caller), |r| {
                match r.status {
                    ReservationStatus::Cancelled => {
                        return Err(
                            ReservationError::Invalid("Reservation is already cancelled".into()).into(),
                        );
                    }
                    ReservationStatus::Completed => {
                        return Err(ReservationError::Invalid(
                            "Cannot cancel a completed reservation".into(),
                        )
                        .into());
                    }
                    ReservationStatus::Pending | ReservationStatus::Confirmed => {}
                }
                r.status = ReservationStatus::Cancelled;
                r.payment_status = PaymentStatus::Refunded;
                r.cancelled_at = Some(now);
                r.cancellation_reason = reason.clone();
                Ok(())
            })
            .await?;

        metrics::counter!("reservations_cancelled_total").increment(1);
        tracing::info!(reservation_id = id, "Reservation cancelled");

        let event = CancellationEvent {
            reservation_id: reservation.id.to_string(),
            user_id: reservation.user_id.to_string(),
            user_email: reservation.user_email.clone(),
            user_name: display_name(&reservation),
            reason,
            cancelled_at: now,
        };
        if let Err(e) = self.publisher.publish_cancellation(event).await {
            tracing::warn!(reservation_id = id, error = %e, "Cancellation event not published");
        }

        Ok(reservation.into())
    }

    pub async fn update_genres(
        &self,
        id: i64,
        caller: &Caller,
        genres: Vec<String>,
    ) -> Result<ReservationResponse> {
        let reservation = self
            .modify(id, Some(caller), |r| {
                r.genres = genres.clone();
                Ok(())
            })
            .await?;
        Ok(reservation.into())
    }

    async fn qr_image(&self, reservation: &ReservationRecord) -> Result<Vec<u8>> {
        let Some(path) = reservation.qr_code_path.as_deref() else {
            return Err(ReservationError::QrNotFound("QR code image not found".into()).into());
        };
        self.qr.read(path).await.map_err(|e| {
            tracing::warn!(reservation_id = reservation.id, error = %e, "QR image unreadable");
            ReservationError::QrNotFound("QR code image not found".into()).into()
        })
    }

    pub async fn qr_code(&self, id: i64, caller: &Caller) -> Result<QrCodeResponse> {
        let reservation = self.owned(id, caller).await?;
        let Some(code) = reservation.qr_code.clone() else {
            return Err(
                ReservationError::QrNotFound("QR code not found for this reservation".into()).into(),
            );
        };
        let png = self.qr_image(&reservation).await?;

        Ok(QrCodeResponse {
            qr_code: code,
            qr_code_image: QrCodeGenerator::data_uri(&png),
            download_url: format!("/api/reservations/{id}/qrcode/download"),
        })
    }

    pub async fn download_qr(&self, id: i64, caller: &Caller) -> Result<QrDownload> {
        let reservation = self.owned(id, caller).await?;
        if reservation.qr_code.is_none() {
            return Err(
                ReservationError::QrNotFound("QR code not found for this reservation".into()).into(),
            );
        }
        let png = self.qr_image(&reservation).await?;

        Ok(QrDownload {
            filename: format!("QRCode-Reservation-{id}.png"),
            png,
        })
    }

    /// Public lookup used at the fair entrance.
    pub async fn verify_qr(&self, code: &str) -> Result<ReservationResponse> {
        self.reservations
            .find_reservation_by_qr_code(code)
            .await?
            .map(ReservationResponse::from)
            .ok_or_else(|| ReservationError::QrNotFound("Invalid QR code".into()).into())
    }

    pub async fn all(&self, caller: &Caller) -> Result<Vec<ReservationResponse>> {
        caller.require_admin()?;
        let records = self.reservations.list_reservations(None).await?;
        Ok(records.into_iter().map(ReservationResponse::from).collect())
    }

    pub async fn by_status(&self, caller: &Caller, status: &str) -> Result<Vec<ReservationResponse>> {
        caller.require_admin()?;
        let status: ReservationStatus = status
            .parse()
            .map_err(|e: String| DomainError::from(ReservationError::Invalid(e)))?;
        let records = self.reservations.list_reservations(Some(status)).await?;
        Ok(records.into_iter().map(ReservationResponse::from).collect())
    }

    /// Marks a confirmed reservation as completed after the fair.
    #[tracing::instrument(skip(self, caller))]
    pub async fn complete(&self, caller: &Caller, id: i64) -> Result<ReservationResponse> {
        caller.require_admin()?;
        let reservation = self
            .modify(id, None, |r| {
                if r.status != ReservationStatus::Confirmed {
                    return Err(ReservationError::Invalid(format!(
                        "Only confirmed reservations can be completed, this one is {}",
                        r.status.as_str().to_lowercase()
                    ))
                    .into());
                }
                r.status = ReservationStatus::Completed;
                Ok(())
            })
            .await?;
        Ok(reservation.into())
    }

    /// Reservations of one user. Callers may only list their own unless admin.
    pub async fn by_user(&self, caller: &Caller, user_id: UserId) -> Result<Vec<ReservationResponse>> {
        if caller.user_id != user_id && !caller.is_admin() {
            return Err(DomainError::Forbidden(
                "Cannot view another user's reservations".to_string(),
            ));
        }
        let records = self.reservations.list_reservations_for_user(user_id).await?;
        Ok(records.into_iter().map(ReservationResponse::from).collect())
    }

    pub async fn by_stall(&self, stall_id: StallId) -> Result<Vec<ReservationResponse>> {
        let records = self.reservations.list_reservations_for_stall(stall_id).await?;
        Ok(records.into_iter().map(ReservationResponse::from).collect())
    }

    /// True when no active reservation holds the stall during `[start, end]`.
    pub async fn stall_availability(
        &self,
        stall_id: StallId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool> {
        if end < start {
            return Err(ReservationError::Invalid("End date must be after start date".into()).into());
        }
        Ok(self
            .reservations
            .count_overlapping(stall_id, start, end)
            .await?
            == 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::Role;
    use store::{InMemoryStore, StallRecord, StallSize, StallStatus, StallStore};

    use super::*;
    use crate::ports::local::LocalStallCatalog;
    use crate::ports::{PublishedEvent, RecordingPublisher, Unreachable};

    struct Fixture {
        store: Arc<InMemoryStore>,
        publisher: RecordingPublisher,
        service: ReservationService,
        _qr_dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let publisher = RecordingPublisher::new();
        let qr_dir = tempfile::tempdir().unwrap();
        let service = ReservationService::new(
            store.clone(),
            Arc::new(LocalStallCatalog::new(store.clone())),
            Arc::new(publisher.clone()),
            QrCodeGenerator::new(qr_dir.path()),
        );
        Fixture {
            store,
            publisher,
            service,
            _qr_dir: qr_dir,
        }
    }

    fn caller(id: i64, role: Role) -> Caller {
        Caller {
            user_id: UserId::new(id),
            email: format!("user{id}@example.com"),
            role,
            company_name: Some(format!("Publisher {id}")),
        }
    }

    fn in_days(days: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(days)
    }

    async fn add_stall(store: &InMemoryStore, code: &str, price_cents: i64) -> StallId {
        let now = Utc::now();
        store
            .insert_stall(StallRecord {
                id: StallId::new(),
                stall_code: code.into(),
                name: format!("Stall {code}"),
                size: StallSize::Medium,
                status: StallStatus::Available,
                section: Some("Hall A".into()),
                row: None,
                column: None,
                x_position: None,
                y_position: None,
                width: None,
                length: None,
                price_per_day: Money::from_cents(price_cents),
                description: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
            .id
    }

    fn request(stalls: Vec<StallId>, start: i64, end: i64) -> CreateReservationRequest {
        CreateReservationRequest {
            stall_ids: stalls,
            start_date: in_days(start),
            end_date: in_days(end),
            genres: vec!["Fiction".into()],
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_confirms_prices_and_issues_qr() {
        let f = fixture();
        let a = add_stall(&f.store, "A-01", 1_000_00).await;
        let b = add_stall(&f.store, "A-02", 2_500_00).await;
        let vendor = caller(1, Role::Vendor);

        let created = f
            .service
            .create(request(vec![a, b], 10, 12), &vendor)
            .await
            .unwrap();

        assert_eq!(created.status, ReservationStatus::Confirmed);
        assert_eq!(created.payment_status, PaymentStatus::Pending);
        assert!(created.confirmed_at.is_some());
        // (1000 + 2500) per day over three days
        assert_eq!(created.total_price_cents, 10_500_00);

        let code = created.qr_code.clone().unwrap();
        assert!(code.starts_with(&format!("BOOKFAIR-2026-RES-{}-USER-1-", created.id)));

        let qr = f.service.qr_code(created.id, &vendor).await.unwrap();
        assert_eq!(qr.qr_code, code);
        assert!(qr.qr_code_image.starts_with("data:image/png;base64,"));
        assert_eq!(
            qr.download_url,
            format!("/api/reservations/{}/qrcode/download", created.id)
        );

        let download = f.service.download_qr(created.id, &vendor).await.unwrap();
        assert_eq!(
            download.filename,
            format!("QRCode-Reservation-{}.png", created.id)
        );
        assert!(!download.png.is_empty());

        let events = f.publisher.events().await;
        let [PublishedEvent::Reservation(event)] = &events[..] else {
            panic!("expected one reservation event, got {events:?}");
        };
        assert_eq!(event.stalls.len(), 2);
        assert_eq!(event.total_amount_cents, 10_500_00);
        assert_eq!(event.user_name, "Publisher 1");
    }

    #[tokio::test]
    async fn one_day_booking_is_allowed() {
        let f = fixture();
        let a = add_stall(&f.store, "A-01", 1_000_00).await;

        let created = f
            .service
            .create(request(vec![a], 5, 5), &caller(1, Role::Vendor))
            .await
            .unwrap();
        assert_eq!(created.total_price_cents, 1_000_00);
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let f = fixture();
        let a = add_stall(&f.store, "A-01", 1_000_00).await;

        let err = f
            .service
            .create(request(vec![a], 6, 5), &caller(1, Role::Vendor))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "End date must be after start date");
    }

    #[tokio::test]
    async fn limit_counts_stalls_across_active_reservations() {
        let f = fixture();
        let vendor = caller(1, Role::Vendor);
        let stalls = [
            add_stall(&f.store, "A-01", 100).await,
            add_stall(&f.store, "A-02", 100).await,
            add_stall(&f.store, "A-03", 100).await,
        ];

        let first = f
            .service
            .create(request(vec![stalls[0], stalls[1]], 1, 2), &vendor)
            .await
            .unwrap();

        let err = f
            .service
            .create(request(vec![stalls[2], add_stall(&f.store, "A-04", 100).await], 5, 6), &vendor)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot reserve more than 3 stalls. You currently have 2 stalls reserved."
        );

        f.service.cancel(first.id, &vendor, None).await.unwrap();
        f.service
            .create(request(vec![stalls[2]], 5, 6), &vendor)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn overlapping_dates_conflict_and_touching_counts() {
        let f = fixture();
        let a = add_stall(&f.store, "A-01", 100).await;

        f.service
            .create(request(vec![a], 10, 12), &caller(1, Role::Vendor))
            .await
            .unwrap();

        let err = f
            .service
            .create(request(vec![a], 12, 14), &caller(2, Role::Vendor))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Reservation(ReservationError::StallNotAvailable(s)) if s == a
        ));

        f.service
            .create(request(vec![a], 13, 14), &caller(2, Role::Vendor))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_stall_aborts_without_persisting() {
        let f = fixture();
        let missing = StallId::new();

        let err = f
            .service
            .create(request(vec![missing], 1, 2), &caller(1, Role::Vendor))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("Unable to fetch stall details: {missing}"));
        assert_eq!(
            f.store.count_active_stalls(UserId::new(1)).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn catalog_outage_aborts_create() {
        let store = Arc::new(InMemoryStore::new());
        let dir = tempfile::tempdir().unwrap();
        let service = ReservationService::new(
            store.clone(),
            Arc::new(Unreachable),
            Arc::new(RecordingPublisher::new()),
            QrCodeGenerator::new(dir.path()),
        );

        let err = service
            .create(request(vec![StallId::new()], 1, 2), &caller(1, Role::Vendor))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Unable to fetch stall details"));
    }

    #[tokio::test]
    async fn publisher_outage_does_not_fail_create() {
        let f = fixture();
        f.publisher.set_fail(true).await;
        let a = add_stall(&f.store, "A-01", 100).await;

        let created = f
            .service
            .create(request(vec![a], 1, 2), &caller(1, Role::Vendor))
            .await
            .unwrap();
        assert_eq!(created.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn other_users_reservations_look_missing() {
        let f = fixture();
        let a = add_stall(&f.store, "A-01", 100).await;
        let created = f
            .service
            .create(request(vec![a], 1, 2), &caller(1, Role::Vendor))
            .await
            .unwrap();

        let stranger = caller(2, Role::Vendor);
        let expected = format!("Reservation not found with ID: {}", created.id);
        assert_eq!(
            f.service.get(created.id, &stranger).await.unwrap_err().to_string(),
            expected
        );
        assert_eq!(
            f.service
                .cancel(created.id, &stranger, None)
                .await
                .unwrap_err()
                .to_string(),
            expected
        );
        assert!(f.service.qr_code(created.id, &stranger).await.is_err());
        assert!(f.service.my_reservations(&stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_transitions() {
        let f = fixture();
        let vendor = caller(1, Role::Vendor);
        let admin = caller(9, Role::Admin);
        let a = add_stall(&f.store, "A-01", 100).await;
        let b = add_stall(&f.store, "A-02", 100).await;

        let first = f
            .service
            .create(request(vec![a], 1, 2), &vendor)
            .await
            .unwrap();
        let cancelled = f
            .service
            .cancel(first.id, &vendor, Some("Plans changed".into()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Plans changed"));

        let err = f.service.cancel(first.id, &vendor, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Reservation is already cancelled");

        let second = f
            .service
            .create(request(vec![b], 1, 2), &vendor)
            .await
            .unwrap();
        f.service.complete(&admin, second.id).await.unwrap();
        let err = f.service.cancel(second.id, &vendor, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel a completed reservation");

        assert!(f.service.complete(&admin, first.id).await.is_err());

        let events = f.publisher.events().await;
        assert!(events
            .iter()
            .any(|e| matches!(e, PublishedEvent::Cancellation(c) if c.reason.as_deref() == Some("Plans changed"))));
    }

    #[tokio::test]
    async fn verify_qr_is_public() {
        let f = fixture();
        let a = add_stall(&f.store, "A-01", 100).await;
        let created = f
            .service
            .create(request(vec![a], 1, 2), &caller(1, Role::Vendor))
            .await
            .unwrap();

        let verified = f
            .service
            .verify_qr(created.qr_code.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(verified.id, created.id);

        let err = f.service.verify_qr("BOOKFAIR-FAKE").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid QR code");
    }

    #[tokio::test]
    async fn admin_views() {
        let f = fixture();
        let vendor = caller(1, Role::Vendor);
        let admin = caller(9, Role::Admin);
        let a = add_stall(&f.store, "A-01", 100).await;
        let b = add_stall(&f.store, "A-02", 100).await;

        let first = f.service.create(request(vec![a], 1, 2), &vendor).await.unwrap();
        let second = f.service.create(request(vec![b], 1, 2), &vendor).await.unwrap();
        f.service.cancel(first.id, &vendor, None).await.unwrap();

        let err = f.service.all(&vendor).await.unwrap_err();
        assert_eq!(err.to_string(), "Admin access required");

        let all = f.service.all(&admin).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let cancelled = f.service.by_status(&admin, "cancelled").await.unwrap();
        assert_eq!(cancelled.len(), 1);

        let err = f.service.by_status(&admin, "lost").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid status: lost");
    }

    #[tokio::test]
    async fn internal_directory_views() {
        let f = fixture();
        let vendor = caller(1, Role::Vendor);
        let a = add_stall(&f.store, "A-01", 100).await;
        f.service.create(request(vec![a], 3, 4), &vendor).await.unwrap();

        assert_eq!(f.service.by_user(&vendor, UserId::new(1)).await.unwrap().len(), 1);
        assert!(matches!(
            f.service.by_user(&caller(2, Role::Vendor), UserId::new(1)).await,
            Err(DomainError::Forbidden(_))
        ));
        assert_eq!(
            f.service
                .by_user(&caller(9, Role::Admin), UserId::new(1))
                .await
                .unwrap()
                .len(),
            1
        );

        assert_eq!(f.service.by_stall(a).await.unwrap().len(), 1);
        assert!(!f.service.stall_availability(a, in_days(4), in_days(8)).await.unwrap());
        assert!(f.service.stall_availability(a, in_days(5), in_days(8)).await.unwrap());
    }

    #[tokio::test]
    async fn genres_update() {
        let f = fixture();
        let vendor = caller(1, Role::Vendor);
        let a = add_stall(&f.store, "A-01", 100).await;
        let created = f.service.create(request(vec![a], 1, 2), &vendor).await.unwrap();

        let updated = f
            .service
            .update_genres(created.id, &vendor, vec!["Poetry".into(), "History".into()])
            .await
            .unwrap();
        assert_eq!(updated.genres, vec!["Poetry".to_string(), "History".to_string()]);
    }

    #[tokio::test]
    async fn total_price_overflow_is_rejected() {
        let f = fixture();
        let a = add_stall(&f.store, "A-01", i64::MAX / 2).await;

        let err = f
            .service
            .create(request(vec![a], 1, 3), &caller(1, Role::Vendor))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Total price is out of range");
        assert_eq!(f.store.count_active_stalls(UserId::new(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn full_notification_queue_does_not_stall_create() {
        let store = Arc::new(InMemoryStore::new());
        let dir = tempfile::tempdir().unwrap();
        let (queue, _rx) = crate::NotificationQueue::new(1);
        let service = ReservationService::new(
            store.clone(),
            Arc::new(LocalStallCatalog::new(store.clone())),
            Arc::new(queue),
            QrCodeGenerator::new(dir.path()),
        );
        let a = add_stall(&store, "A-01", 100).await;
        let b = add_stall(&store, "A-02", 100).await;

        // Nobody drains the queue: the first event fills it.
        for stall in [a, b] {
            let created = tokio::time::timeout(
                std::time::Duration::from_secs(2),
                service.create(request(vec![stall], 1, 2), &caller(1, Role::Vendor)),
            )
            .await
            .expect("create must not wait on the notification queue")
            .unwrap();
            assert_eq!(created.status, ReservationStatus::Confirmed);
        }
    }

    /// Delegates to an in-memory store, but lets another writer change a
    /// reservation's status right before the next update lands.
    struct Interleaved {
        inner: Arc<InMemoryStore>,
        competing: tokio::sync::Mutex<Option<ReservationStatus>>,
    }

    impl Interleaved {
        async fn before_next_update(&self, status: ReservationStatus) {
            *self.competing.lock().await = Some(status);
        }
    }

    #[async_trait::async_trait]
    impl ReservationStore for Interleaved {
        async fn reserve(
            &self,
            new: NewReservation,
            max: i64,
        ) -> store::Result<ReserveOutcome> {
            self.inner.reserve(new, max).await
        }

        async fn find_reservation(&self, id: i64) -> store::Result<Option<ReservationRecord>> {
            self.inner.find_reservation(id).await
        }

        async fn find_reservation_by_qr_code(
            &self,
            code: &str,
        ) -> store::Result<Option<ReservationRecord>> {
            self.inner.find_reservation_by_qr_code(code).await
        }

        async fn list_reservations_for_user(
            &self,
            user_id: UserId,
        ) -> store::Result<Vec<ReservationRecord>> {
            self.inner.list_reservations_for_user(user_id).await
        }

        async fn list_reservations_for_stall(
            &self,
            stall_id: StallId,
        ) -> store::Result<Vec<ReservationRecord>> {
            self.inner.list_reservations_for_stall(stall_id).await
        }

        async fn list_reservations(
            &self,
            status: Option<ReservationStatus>,
        ) -> store::Result<Vec<ReservationRecord>> {
            self.inner.list_reservations(status).await
        }

        async fn count_active_stalls(&self, user_id: UserId) -> store::Result<i64> {
            self.inner.count_active_stalls(user_id).await
        }

        async fn count_overlapping(
            &self,
            stall_id: StallId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> store::Result<i64> {
            self.inner.count_overlapping(stall_id, start, end).await
        }

        async fn update_reservation(
            &self,
            reservation: ReservationRecord,
            expected: ReservationStatus,
        ) -> store::Result<ReservationRecord> {
            if let Some(status) = self.competing.lock().await.take() {
                let mut current = self.inner.find_reservation(reservation.id).await?.unwrap();
                let read = current.status;
                current.status = status;
                self.inner.update_reservation(current, read).await?;
            }
            self.inner.update_reservation(reservation, expected).await
        }
    }

    fn interleaved_fixture() -> (Arc<Interleaved>, ReservationService, tempfile::TempDir) {
        let inner = Arc::new(InMemoryStore::new());
        let store = Arc::new(Interleaved {
            inner: inner.clone(),
            competing: tokio::sync::Mutex::new(None),
        });
        let dir = tempfile::tempdir().unwrap();
        let service = ReservationService::new(
            store.clone(),
            Arc::new(LocalStallCatalog::new(inner)),
            Arc::new(RecordingPublisher::new()),
            QrCodeGenerator::new(dir.path()),
        );
        (store, service, dir)
    }

    #[tokio::test]
    async fn genres_update_keeps_a_concurrent_completion() {
        let (store, service, _dir) = interleaved_fixture();
        let vendor = caller(1, Role::Vendor);
        let a = add_stall(&store.inner, "A-01", 100).await;
        let created = service.create(request(vec![a], 1, 2), &vendor).await.unwrap();

        store.before_next_update(ReservationStatus::Completed).await;
        let updated = service
            .update_genres(created.id, &vendor, vec!["Poetry".into()])
            .await
            .unwrap();

        assert_eq!(updated.status, ReservationStatus::Completed);
        assert_eq!(updated.genres, vec!["Poetry".to_string()]);
        assert_eq!(store.count_active_stalls(UserId::new(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cancel_loses_to_a_concurrent_completion() {
        let (store, service, _dir) = interleaved_fixture();
        let vendor = caller(1, Role::Vendor);
        let a = add_stall(&store.inner, "A-01", 100).await;
        let created = service.create(request(vec![a], 1, 2), &vendor).await.unwrap();

        store.before_next_update(ReservationStatus::Completed).await;
        let err = service.cancel(created.id, &vendor, None).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel a completed reservation");

        let stored = store.find_reservation(created.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Completed);
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert!(stored.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn concurrent_creates_for_one_stall_admit_one() {
        let f = fixture();
        let a = add_stall(&f.store, "A-01", 100).await;
        let service = Arc::new(f.service);

        let handles: Vec<_> = (1..=8)
            .map(|user| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .create(request(vec![a], 3, 5), &caller(user, Role::Vendor))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }
}
