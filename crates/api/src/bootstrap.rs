//! Builds the services a process runs from its configuration.
//!
//! With `SERVICE=all` every service shares one store and calls its peers
//! through the in-process adapters. A single service reaches its peers over
//! HTTP at the configured `*_SERVICE_URL`s.

use std::sync::Arc;

use clients::{
    ClientError, DEFAULT_TIMEOUT, HttpAccountDirectory, HttpBookingCalendar,
    HttpNotificationPublisher, HttpProfileDirectory, HttpReservationDirectory, HttpStallCatalog,
    SmtpMailer, build_http_client,
};
use common::{JwtConfig, JwtError, JwtService};
use domain::ports::local::{
    LocalAccountDirectory, LocalBookingCalendar, LocalProfileDirectory, LocalReservationDirectory,
    LocalStallCatalog,
};
use domain::ports::{
    AccountDirectory, BookingCalendar, LogMailer, Mailer, NotificationPublisher,
    ProfileDirectory, ReservationDirectory, StallCatalog,
};
use domain::{
    AuthService, NotificationQueue, NotificationService, NotificationWorker, ProfileService,
    QrCodeGenerator, ReservationService, StallService,
};
use store::{
    InMemoryStore, NotificationStore, PostgresStore, ProfileStore, ReservationStore, StallStore,
    StoreError, UserStore,
};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::Services;
use crate::config::{Config, ServiceKind};
use crate::state::NotificationState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("jwt: {0}")]
    Jwt(#[from] JwtError),

    #[error("clients: {0}")]
    Client(#[from] ClientError),
}

/// The assembled services plus the notification worker, if this process
/// runs one.
pub struct Runtime {
    pub services: Services,
    pub worker: Option<JoinHandle<()>>,
}

/// A store backing every service.
pub trait PlatformStore:
    UserStore + ProfileStore + StallStore + ReservationStore + NotificationStore + 'static
{
}

impl<S> PlatformStore for S where
    S: UserStore + ProfileStore + StallStore + ReservationStore + NotificationStore + 'static
{
}

/// Connects the store named by the configuration and assembles the services.
pub async fn build(config: &Config) -> Result<Runtime, StartupError> {
    let jwt = JwtService::new(JwtConfig::new(
        config.jwt_secret.clone(),
        config.jwt_expiration_minutes,
    )?);

    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url, config.database_max_connections).await?;
            store.run_migrations().await?;
            tracing::info!("connected to PostgreSQL, migrations applied");
            assemble(config, Arc::new(store), jwt)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data is kept in memory");
            assemble(config, Arc::new(InMemoryStore::new()), jwt)
        }
    }
}

/// Wires the services `config.service` selects over `store`.
///
/// Must run inside a tokio runtime when the notification service is
/// selected, since its worker is spawned here.
pub fn assemble<S: PlatformStore>(
    config: &Config,
    store: Arc<S>,
    jwt: JwtService,
) -> Result<Runtime, StartupError> {
    let kind = config.service;
    let local = kind == ServiceKind::All;
    let peers = &config.peers;
    let http = build_http_client(DEFAULT_TIMEOUT)?;
    let mut services = Services::new(kind.as_str(), jwt.clone());

    let mut worker = None;
    let mut queue = None;
    if kind.runs(ServiceKind::Notification) {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp.clone())?),
            None => {
                tracing::info!("SMTP_HOST not set, emails are only logged");
                Arc::new(LogMailer)
            }
        };
        let service = Arc::new(NotificationService::new(store.clone(), mailer));
        let (tx, rx) = NotificationQueue::new(NotificationQueue::DEFAULT_CAPACITY);
        worker = Some(NotificationWorker::new(service.clone()).spawn(rx));
        services.notifications = Some(NotificationState {
            service,
            queue: tx.clone(),
        });
        queue = Some(tx);
    }

    let publisher: Arc<dyn NotificationPublisher> = match queue {
        Some(queue) => Arc::new(queue),
        None => Arc::new(HttpNotificationPublisher::new(
            http.clone(),
            &peers.notification,
        )),
    };

    if kind.runs(ServiceKind::Auth) {
        let profiles: Arc<dyn ProfileDirectory> = if local {
            Arc::new(LocalProfileDirectory::new(store.clone()))
        } else {
            Arc::new(HttpProfileDirectory::new(http.clone(), &peers.profile))
        };
        services.auth = Some(Arc::new(AuthService::new(
            store.clone(),
            jwt.clone(),
            profiles,
            publisher.clone(),
        )));
    }

    if kind.runs(ServiceKind::Profile) {
        let (reservations, accounts): (Arc<dyn ReservationDirectory>, Arc<dyn AccountDirectory>) =
            if local {
                (
                    Arc::new(LocalReservationDirectory::new(store.clone())),
                    Arc::new(LocalAccountDirectory::new(store.clone())),
                )
            } else {
                (
                    Arc::new(HttpReservationDirectory::new(
                        http.clone(),
                        &peers.reservation,
                    )),
                    Arc::new(HttpAccountDirectory::new(http.clone(), &peers.auth)),
                )
            };
        services.profiles = Some(Arc::new(ProfileService::new(
            store.clone(),
            reservations,
            accounts,
        )));
    }

    if kind.runs(ServiceKind::Stall) {
        let calendar: Arc<dyn BookingCalendar> = if local {
            Arc::new(LocalBookingCalendar::new(store.clone()))
        } else {
            Arc::new(HttpBookingCalendar::new(http.clone(), &peers.reservation))
        };
        services.stalls = Some(Arc::new(StallService::new(store.clone(), calendar)));
    }

    if kind.runs(ServiceKind::Reservation) {
        let catalog: Arc<dyn StallCatalog> = if local {
            Arc::new(LocalStallCatalog::new(store.clone()))
        } else {
            Arc::new(HttpStallCatalog::new(http.clone(), &peers.stall))
        };
        let service = ReservationService::new(
            store.clone(),
            catalog,
            publisher,
            QrCodeGenerator::new(config.qr_code_dir.clone()),
        )
        .with_max_stalls_per_user(config.max_stalls_per_user);
        services.reservations = Some(Arc::new(service));
    }

    tracing::info!(service = kind.as_str(), local, "services assembled");
    Ok(Runtime { services, worker })
}
