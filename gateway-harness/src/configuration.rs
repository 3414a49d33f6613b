use crate::{
    data::HttpMethod,
    readiness::{ReadinessCheck, ReadinessPredicate},
};
use std::{env, str::FromStr, time::Duration};
use tracing::warn;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8080";
pub const DEFAULT_USER_SERVICE_URL: &str = "http://localhost:8081";
pub const DEFAULT_ORDER_SERVICE_URL: &str = "http://localhost:8082";
pub const DEFAULT_PAYMENT_SERVICE_URL: &str = "http://localhost:8083";
pub const DEFAULT_NOTIFICATION_SERVICE_URL: &str = "http://localhost:8084";
pub const DEFAULT_USER_AGENT: &str = "curl/8.4.0";
pub const DEFAULT_PASSWORD: &str = "password123";

const HEALTH_PATH: &str = "/actuator/health";
const ROUTES_PATH: &str = "/actuator/gateway/routes";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProtocolVersion {
    /// Always speak HTTP/1.1, whatever the server offers.
    Http1,
    /// Let the client negotiate.
    Negotiate,
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "http1" | "http/1.1" | "http1.1" => Ok(ProtocolVersion::Http1),
            "negotiate" | "auto" => Ok(ProtocolVersion::Negotiate),
            other => Err(format!("unknown protocol version '{}'", other)),
        }
    }
}

/// Direct addresses of the services behind the gateway, used in bypass mode.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServiceUrls {
    pub user: String,
    pub order: String,
    pub payment: String,
    pub notification: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            user: String::from(DEFAULT_USER_SERVICE_URL),
            order: String::from(DEFAULT_ORDER_SERVICE_URL),
            payment: String::from(DEFAULT_PAYMENT_SERVICE_URL),
            notification: String::from(DEFAULT_NOTIFICATION_SERVICE_URL),
        }
    }
}

/// Resolved API base addresses for one run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServiceEndpoints {
    pub auth: String,
    pub orders: String,
    pub payments: String,
    pub notifications: String,
}

#[derive(Debug, Clone)]
pub struct ReadinessSettings {
    pub route_id: String,
    pub route_method: HttpMethod,
    pub max_polls: u32,
    pub poll_interval: Duration,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            route_id: String::from("order-service-post"),
            route_method: HttpMethod::Post,
            max_polls: 30,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// How long scenarios let asynchronous side effects settle before looking at them.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScenarioTimings {
    pub payment_settle: Duration,
    pub notification_settle: Duration,
}

impl Default for ScenarioTimings {
    fn default() -> Self {
        Self {
            payment_settle: Duration::from_secs(3),
            notification_settle: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfiguration {
    gateway_url: String,
    service_urls: ServiceUrls,
    bypass_gateway: bool,
    user_agent: String,
    protocol_version: ProtocolVersion,
    request_timeout: Duration,
    default_password: String,
    readiness: ReadinessSettings,
    timings: ScenarioTimings,
}

impl HarnessConfiguration {
    pub fn new() -> Self {
        Self {
            gateway_url: String::from(DEFAULT_GATEWAY_URL),
            service_urls: ServiceUrls::default(),
            bypass_gateway: false,
            user_agent: String::from(DEFAULT_USER_AGENT),
            protocol_version: ProtocolVersion::Http1,
            request_timeout: Duration::from_secs(30),
            default_password: String::from(DEFAULT_PASSWORD),
            readiness: ReadinessSettings::default(),
            timings: ScenarioTimings::default(),
        }
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut configuration = Self::new();

        if let Some(bypass) = parse_var(&lookup, "BYPASS_GATEWAY") {
            configuration.set_bypass_gateway(bypass);
        }
        if let Some(url) = lookup("GATEWAY_URL") {
            configuration.set_gateway_url(url);
        }
        if let Some(url) = lookup("USER_SERVICE_URL") {
            configuration.service_urls.user = trim_url(url);
        }
        if let Some(url) = lookup("ORDER_SERVICE_URL") {
            configuration.service_urls.order = trim_url(url);
        }
        if let Some(url) = lookup("PAYMENT_SERVICE_URL") {
            configuration.service_urls.payment = trim_url(url);
        }
        if let Some(url) = lookup("NOTIFICATION_SERVICE_URL") {
            configuration.service_urls.notification = trim_url(url);
        }
        if let Some(user_agent) = lookup("HARNESS_USER_AGENT") {
            configuration.set_user_agent(user_agent);
        }
        if let Some(millis) = parse_var::<u64, _>(&lookup, "HARNESS_TIMEOUT_MS") {
            configuration.set_request_timeout(Duration::from_millis(millis));
        }
        if let Some(version) = parse_var(&lookup, "HARNESS_PROTOCOL") {
            configuration.set_protocol_version(version);
        }

        configuration
    }

    pub fn set_gateway_url<S: Into<String>>(&mut self, url: S) {
        self.gateway_url = trim_url(url.into());
    }

    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    pub fn set_service_urls(&mut self, urls: ServiceUrls) {
        self.service_urls = ServiceUrls {
            user: trim_url(urls.user),
            order: trim_url(urls.order),
            payment: trim_url(urls.payment),
            notification: trim_url(urls.notification),
        };
    }

    pub fn service_urls(&self) -> &ServiceUrls {
        &self.service_urls
    }

    pub fn set_bypass_gateway(&mut self, value: bool) {
        self.bypass_gateway = value;
    }

    pub fn bypass_gateway(&self) -> bool {
        self.bypass_gateway
    }

    pub fn set_user_agent<S: Into<String>>(&mut self, user_agent: S) {
        self.user_agent = user_agent.into();
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_protocol_version(&mut self, version: ProtocolVersion) {
        self.protocol_version = version;
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) {
        self.request_timeout = timeout;
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn set_default_password<S: Into<String>>(&mut self, password: S) {
        self.default_password = password.into();
    }

    pub fn default_password(&self) -> &str {
        &self.default_password
    }

    pub fn set_readiness(&mut self, readiness: ReadinessSettings) {
        self.readiness = readiness;
    }

    pub fn readiness(&self) -> &ReadinessSettings {
        &self.readiness
    }

    pub fn set_timings(&mut self, timings: ScenarioTimings) {
        self.timings = timings;
    }

    pub fn timings(&self) -> ScenarioTimings {
        self.timings
    }

    pub fn endpoints(&self) -> ServiceEndpoints {
        if self.bypass_gateway {
            ServiceEndpoints {
                auth: format!("{}/api/auth", self.service_urls.user),
                orders: format!("{}/api/orders", self.service_urls.order),
                payments: format!("{}/api/payments", self.service_urls.payment),
                notifications: format!("{}/api/notifications", self.service_urls.notification),
            }
        } else {
            ServiceEndpoints {
                auth: format!("{}/api/auth", self.gateway_url),
                orders: format!("{}/api/orders", self.gateway_url),
                payments: format!("{}/api/payments", self.gateway_url),
                notifications: format!("{}/api/notifications", self.gateway_url),
            }
        }
    }

    /// The gateway probe: health first, then the route table must list the
    /// configured route for the configured method.
    pub fn readiness_check(&self) -> ReadinessCheck {
        ReadinessCheck {
            health_endpoint: format!("{}{}", self.gateway_url, HEALTH_PATH),
            route_verification_endpoint: format!("{}{}", self.gateway_url, ROUTES_PATH),
            predicate: ReadinessPredicate::RouteRegistered {
                route_id: self.readiness.route_id.clone(),
                method: self.readiness.route_method,
            },
            max_polls: self.readiness.max_polls,
            poll_interval: self.readiness.poll_interval,
        }
    }
}

impl Default for HarnessConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_var<T: FromStr, F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
