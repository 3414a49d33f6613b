use crate::{
    configuration::HarnessConfiguration,
    data::{HttpMethod, RequestSpec},
    error::TransportError,
    http_client::{HttpTransport, ReqwestTransport},
    retry::{Sleeper, ThreadSleeper},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::{
    sync::{Arc, Once},
    time::Duration,
};
use tracing::{debug, error, info, warn};

static PREPARE_GATEWAY: Once = Once::new();

lazy_static! {
    static ref ROUTE_METHODS_REGEX: Regex =
        Regex::new(r"Methods: \[(?P<methods>[^\]]*)\]").unwrap();
}

/// Decides from the route table body whether the dependency can take traffic.
#[derive(Debug, Clone)]
pub enum ReadinessPredicate {
    /// Every marker must occur somewhere in the body.
    ContainsAll(Vec<String>),
    Matches(Regex),
    /// The route table lists `route_id` and its predicate admits `method`.
    RouteRegistered { route_id: String, method: HttpMethod },
}

impl ReadinessPredicate {
    pub fn contains_all<S: Into<String>, I: IntoIterator<Item = S>>(markers: I) -> Self {
        ReadinessPredicate::ContainsAll(markers.into_iter().map(Into::into).collect())
    }

    pub fn is_satisfied_by(&self, body: &str) -> bool {
        match self {
            ReadinessPredicate::ContainsAll(markers) => {
                markers.iter().all(|marker| body.contains(marker.as_str()))
            }
            ReadinessPredicate::Matches(pattern) => pattern.is_match(body),
            ReadinessPredicate::RouteRegistered { route_id, method } => {
                match serde_json::from_str::<Value>(body) {
                    Ok(Value::Array(routes)) => routes
                        .iter()
                        .filter(|route| route.get("route_id").and_then(Value::as_str) == Some(route_id.as_str()))
                        .any(|route| route_admits(route, *method)),
                    _ => {
                        body.contains(route_id.as_str())
                            && body.contains(&format!("Methods: [{}]", method))
                    }
                }
            }
        }
    }
}

fn route_admits(route: &Value, method: HttpMethod) -> bool {
    let predicate = match route.get("predicate").and_then(Value::as_str) {
        Some(predicate) => predicate,
        None => return false,
    };

    ROUTE_METHODS_REGEX
        .captures_iter(predicate)
        .flat_map(|captures| {
            captures["methods"]
                .split(',')
                .map(|m| m.trim().to_uppercase())
                .collect::<Vec<_>>()
        })
        .any(|m| m == method.as_str())
}

#[derive(Debug, Clone)]
pub struct ReadinessCheck {
    pub health_endpoint: String,
    pub route_verification_endpoint: String,
    pub predicate: ReadinessPredicate,
    pub max_polls: u32,
    pub poll_interval: Duration,
}

/// Polls a dependency until its readiness predicate holds or the poll budget
/// is spent. Never fails: giving up is reported as `false`.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
}

impl ReadinessGate {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn await_ready(&self, check: &ReadinessCheck) -> bool {
        info!(endpoint = %check.health_endpoint, "waiting for dependency to become ready");

        for poll in 1..=check.max_polls {
            match self.poll_once(check) {
                Ok(true) => {
                    info!(poll, "dependency is ready");
                    return true;
                }
                Ok(false) => {
                    debug!(poll, max_polls = check.max_polls, "dependency not ready yet");
                }
                Err(e) => {
                    warn!(poll, error = %e, "error while checking readiness");
                }
            }

            if poll < check.max_polls {
                self.sleeper.sleep(check.poll_interval);
            }
        }

        warn!(
            polls = check.max_polls,
            "dependency may not be fully ready, continuing anyway"
        );
        false
    }

    fn poll_once(&self, check: &ReadinessCheck) -> Result<bool, TransportError> {
        let health = self
            .transport
            .execute(&RequestSpec::get(check.health_endpoint.as_str()))?;
        if health.status_code() != 200 {
            debug!(status = health.status_code(), "health endpoint not up");
            return Ok(false);
        }

        let routes = self
            .transport
            .execute(&RequestSpec::get(check.route_verification_endpoint.as_str()))?;
        if routes.status_code() != 200 {
            debug!(status = routes.status_code(), "route table unavailable");
            return Ok(false);
        }

        Ok(check.predicate.is_satisfied_by(routes.body()))
    }
}

/// Waits for the gateway once per process. Later calls return immediately.
pub fn prepare_gateway(configuration: &HarnessConfiguration) {
    PREPARE_GATEWAY.call_once(|| {
        if configuration.bypass_gateway() {
            info!("gateway bypass enabled, skipping readiness check");
            return;
        }

        match ReqwestTransport::new(configuration) {
            Ok(transport) => {
                ReadinessGate::new(Arc::new(transport)).await_ready(&configuration.readiness_check());
            }
            Err(e) => error!(error = %e, "could not build a client for the readiness check"),
        }
    });
}
