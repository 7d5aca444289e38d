//! Shared handler state.

use std::sync::Arc;

use axum::extract::FromRef;
use common::JwtService;
use domain::{NotificationQueue, NotificationService};

/// One service plus the token verifier its handlers authenticate with.
pub struct ServiceState<T> {
    pub service: Arc<T>,
    pub jwt: JwtService,
}

impl<T> ServiceState<T> {
    pub fn new(service: Arc<T>, jwt: JwtService) -> Self {
        Self { service, jwt }
    }
}

impl<T> Clone for ServiceState<T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            jwt: self.jwt.clone(),
        }
    }
}

impl<T> FromRef<ServiceState<T>> for JwtService {
    fn from_ref(state: &ServiceState<T>) -> Self {
        state.jwt.clone()
    }
}

/// The notification log and the intake queue feeding its worker.
#[derive(Clone)]
pub struct NotificationState {
    pub service: Arc<NotificationService>,
    pub queue: NotificationQueue,
}
