use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{Money, Role, StallId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::ports::RecordingPublisher;
use domain::ports::local::LocalStallCatalog;
use domain::reservation::CreateReservationRequest;
use domain::{Caller, QrCodeGenerator, ReservationService};
use store::{InMemoryStore, StallRecord, StallSize, StallStatus, StallStore};

fn vendor(id: i64) -> Caller {
    Caller {
        user_id: UserId::new(id),
        email: format!("vendor{id}@example.com"),
        role: Role::Vendor,
        company_name: None,
    }
}

async fn seed_stall(store: &InMemoryStore, code: &str) -> StallId {
    let now = Utc::now();
    store
        .insert_stall(StallRecord {
            id: StallId::new(),
            stall_code: code.to_string(),
            name: format!("Stall {code}"),
            size: StallSize::Small,
            status: StallStatus::Available,
            section: None,
            row: None,
            column: None,
            x_position: None,
            y_position: None,
            width: None,
            length: None,
            price_per_day: Money::from_cents(5_000_00),
            description: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
        .id
}

fn booking(stall: StallId) -> CreateReservationRequest {
    let today = Utc::now().date_naive();
    CreateReservationRequest {
        stall_ids: vec![stall],
        start_date: today + Duration::days(10),
        end_date: today + Duration::days(12),
        genres: vec![],
        notes: None,
    }
}

fn bench_create_reservation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let qr_dir = tempfile::tempdir().unwrap();

    c.bench_function("domain/create_reservation", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = Arc::new(InMemoryStore::new());
                let stall = seed_stall(&store, "A-01").await;
                let service = ReservationService::new(
                    store.clone(),
                    Arc::new(LocalStallCatalog::new(store.clone())),
                    Arc::new(RecordingPublisher::new()),
                    QrCodeGenerator::new(qr_dir.path()),
                );
                service.create(booking(stall), &vendor(1)).await.unwrap();
            });
        });
    });
}

fn bench_overlap_rejection(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let qr_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new());
    let service = ReservationService::new(
        store.clone(),
        Arc::new(LocalStallCatalog::new(store.clone())),
        Arc::new(RecordingPublisher::new()),
        QrCodeGenerator::new(qr_dir.path()),
    );

    // 50 booked stalls, then repeatedly try to take the first one again.
    let first = rt.block_on(async {
        let mut first = None;
        for i in 0..50 {
            let stall = seed_stall(&store, &format!("B-{i:02}")).await;
            service.create(booking(stall), &vendor(i)).await.unwrap();
            first.get_or_insert(stall);
        }
        first.unwrap()
    });

    c.bench_function("domain/overlap_rejection_50_bookings", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create(booking(first), &vendor(999))
                    .await
                    .unwrap_err();
            });
        });
    });
}

fn bench_qr_render(c: &mut Criterion) {
    let data = QrCodeGenerator::reservation_code(42, UserId::new(7));

    c.bench_function("domain/qr_render_png", |b| {
        b.iter(|| QrCodeGenerator::render_png(&data).unwrap());
    });
}

criterion_group!(
    benches,
    bench_create_reservation,
    bench_overlap_rejection,
    bench_qr_render,
);
criterion_main!(benches);
