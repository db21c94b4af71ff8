//! Service registry for the in-process host
//!
//! Maps `domain.service` to an async handler. Components register their
//! services at setup; anything holding the registry can then call them with
//! a [`ServiceCall`].

use dashmap::DashMap;
use ha_core::ServiceCall;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub type ServiceResult = Result<(), ServiceError>;

pub type ServiceFuture = Pin<Box<dyn Future<Output = ServiceResult> + Send>>;

pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> ServiceFuture + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service not found: {domain}.{service}")]
    NotFound { domain: String, service: String },

    #[error("service call failed: {0}")]
    CallFailed(String),
}

fn service_key(domain: &str, service: &str) -> String {
    format!("{}.{}", domain, service)
}

pub struct ServiceRegistry {
    services: DashMap<String, ServiceHandler>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service, replacing any existing handler for the same name
    #[instrument(skip(self, handler))]
    pub fn register<F, Fut>(&self, domain: &str, service: &str, handler: F)
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        debug!("Registering service");

        let handler: ServiceHandler =
            Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture);
        self.services.insert(service_key(domain, service), handler);
    }

    /// Run the handler for `call.domain`.`call.service`
    #[instrument(skip_all, fields(service = %call.service_id()))]
    pub async fn call(&self, call: ServiceCall) -> ServiceResult {
        let handler = {
            let registered = self
                .services
                .get(&service_key(&call.domain, &call.service))
                .ok_or_else(|| {
                    warn!("Service not found");
                    ServiceError::NotFound {
                        domain: call.domain.clone(),
                        service: call.service.clone(),
                    }
                })?;
            registered.value().clone()
        };

        debug!("Calling service");
        handler(call).await
    }

    /// Whether a handler is registered for `domain.service`
    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&service_key(domain, service))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
