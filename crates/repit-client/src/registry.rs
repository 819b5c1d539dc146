// Last known health of each downstream service

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub consecutive_failures: u32,
}

impl Default for ServiceHealth {
    fn default() -> Self {
        Self {
            status: HealthStatus::Unknown,
            last_check: None,
            error: None,
            consecutive_failures: 0,
        }
    }
}

#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<BTreeMap<String, ServiceHealth>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_healthy(&self, service: &str) {
        let mut services = self.services.write();
        let health = services.entry(service.to_string()).or_default();
        health.status = HealthStatus::Healthy;
        health.last_check = Some(Utc::now());
        health.error = None;
        health.consecutive_failures = 0;
    }

    pub fn mark_unhealthy(&self, service: &str, error: &str) {
        let mut services = self.services.write();
        let health = services.entry(service.to_string()).or_default();
        health.status = HealthStatus::Unhealthy;
        health.last_check = Some(Utc::now());
        health.error = Some(error.to_string());
        health.consecutive_failures += 1;
    }

    pub fn health(&self, service: &str) -> Option<ServiceHealth> {
        self.services.read().get(service).cloned()
    }

    /// Unchecked services count as unhealthy
    pub fn is_healthy(&self, service: &str) -> bool {
        self.services
            .read()
            .get(service)
            .is_some_and(|h| h.status == HealthStatus::Healthy)
    }

    pub fn healthy_services(&self) -> Vec<String> {
        self.services
            .read()
            .iter()
            .filter(|(_, h)| h.status == HealthStatus::Healthy)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, ServiceHealth> {
        self.services.read().clone()
    }
}
