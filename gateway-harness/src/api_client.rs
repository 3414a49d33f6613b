use crate::{
    configuration::{HarnessConfiguration, ServiceEndpoints},
    data::{RequestSpec, ResponseDescriptor},
    error::Error,
    http_client::{HttpTransport, ReqwestTransport},
    retry::{RetryPolicy, RetryingExecutor, Sleeper},
};
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
}

/// Body of an order creation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub username: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl OrderRequest {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        username: S1,
        product_name: S2,
        quantity: u32,
        unit_price: f64,
    ) -> Self {
        Self {
            username: username.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }
}

#[derive(Serialize)]
struct RegistrationRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    role: UserRole,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Builder used to build a GatewayApiClient instance
#[derive(Debug, Clone, Default)]
pub struct GatewayApiClientBuilder {
    configuration: Option<HarnessConfiguration>,
    transport: Option<Arc<dyn HttpTransport>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    post_retry_policy: Option<RetryPolicy>,
    default_headers: BTreeMap<String, String>,
}

impl GatewayApiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given configuration for endpoint resolution and, unless a
    /// transport is supplied, for building the HTTP client.
    ///
    /// # Arguments
    /// `configuration` - gateway or bypass endpoints, timeout and user agent.
    ///
    /// # Returns
    /// This builder.
    pub fn with_configuration(mut self, configuration: HarnessConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Use the given transport instead of a reqwest client built from the
    /// configuration.
    ///
    /// # Arguments
    /// `transport` - anything able to execute a [`RequestSpec`].
    ///
    /// # Returns
    /// This builder.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// # Arguments
    /// `sleeper` - waits between retry attempts. Defaults to a thread sleep.
    ///
    /// # Returns
    /// This builder.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Policy applied to every POST. Defaults to [`RetryPolicy::transient_gateway`].
    pub fn with_post_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.post_retry_policy = Some(policy);
        self
    }

    /// Send a header with every request the client makes, in addition to the
    /// bearer token of authenticated calls.
    ///
    /// # Arguments
    /// `name` - header name, matched case-insensitively.
    /// `value` - header value.
    ///
    /// # Returns
    /// This builder.
    pub fn with_default_header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.default_headers
            .insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Consume the builder and create a GatewayApiClient using all of the
    /// previously configured values or their defaults.
    ///
    /// # Returns
    /// A GatewayApiClient instance, or [`Error::ClientBuild`] when the reqwest
    /// client cannot be created.
    pub fn build(self) -> Result<GatewayApiClient, Error> {
        let configuration = self.configuration.unwrap_or_default();

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&configuration)?),
        };

        let mut executor = RetryingExecutor::new(transport);
        if let Some(sleeper) = self.sleeper {
            executor = executor.with_sleeper(sleeper);
        }

        Ok(GatewayApiClient {
            executor,
            endpoints: configuration.endpoints(),
            post_retry_policy: self
                .post_retry_policy
                .unwrap_or_else(RetryPolicy::transient_gateway),
            default_headers: self.default_headers,
        })
    }
}

/// Client for the business endpoints behind the gateway.
///
/// Every call returns the raw [`ResponseDescriptor`]; deciding whether a status
/// is acceptable is left to the caller. POSTs go through the post retry policy,
/// GETs are single attempts unless a policy is passed explicitly.
#[derive(Debug, Clone)]
pub struct GatewayApiClient {
    executor: RetryingExecutor,
    endpoints: ServiceEndpoints,
    post_retry_policy: RetryPolicy,
    default_headers: BTreeMap<String, String>,
}

impl GatewayApiClient {
    pub fn builder() -> GatewayApiClientBuilder {
        GatewayApiClientBuilder::new()
    }

    /// A client for the given configuration talking over reqwest.
    pub fn from_configuration(configuration: &HarnessConfiguration) -> Result<Self, Error> {
        Self::builder()
            .with_configuration(configuration.clone())
            .build()
    }

    pub fn executor(&self) -> &RetryingExecutor {
        &self.executor
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    /// Registers a new user with the user service.
    ///
    /// # Arguments
    /// `username` - the account name, expected to be unique.
    /// `email` - contact address sent alongside it.
    /// `password` - plain text password.
    /// `role` - sent as `USER` or `ADMIN`.
    ///
    /// # Returns
    /// The raw response. A 2xx carries the JWT in its `token` field, a 409
    /// means the user already exists.
    pub fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<ResponseDescriptor, Error> {
        let body = serde_json::to_value(RegistrationRequest {
            username,
            email,
            password,
            role,
        })?;

        self.post(format!("{}/register", self.endpoints.auth), body, None)
    }

    /// # Arguments
    /// `username` - the account name.
    /// `password` - plain text password.
    ///
    /// # Returns
    /// The raw response, carrying the JWT in its `token` field on success.
    pub fn login_user(&self, username: &str, password: &str) -> Result<ResponseDescriptor, Error> {
        let body = serde_json::to_value(LoginRequest { username, password })?;

        self.post(format!("{}/login", self.endpoints.auth), body, None)
    }

    pub fn get_user_details(&self, username: &str, token: &str) -> Result<ResponseDescriptor, Error> {
        let url = format!("{}/user/{}", self.endpoints.auth, username);
        self.get(url, Some(require_token(token)?), &RetryPolicy::single_attempt())
    }

    pub fn get_user_service_health(&self) -> Result<ResponseDescriptor, Error> {
        let url = format!("{}/health", self.endpoints.auth);
        self.get(url, None, &RetryPolicy::single_attempt())
    }

    /// Creates an order for the user named in `order`.
    ///
    /// # Arguments
    /// `order` - serialized with camelCase field names.
    /// `token` - bearer token of the ordering user. Must not be blank.
    ///
    /// # Returns
    /// The raw response. The order service may answer 2xx with an empty body,
    /// in which case the order number has to be looked up separately.
    pub fn create_order(&self, order: &OrderRequest, token: &str) -> Result<ResponseDescriptor, Error> {
        let token = require_token(token)?;
        let body = serde_json::to_value(order)?;

        self.post(self.endpoints.orders.clone(), body, Some(token))
    }

    pub fn get_order_details(&self, order_number: &str, token: &str) -> Result<ResponseDescriptor, Error> {
        let url = format!("{}/{}", self.endpoints.orders, order_number);
        self.get(url, Some(require_token(token)?), &RetryPolicy::single_attempt())
    }

    /// Lists a user's orders. Without a token the call goes out unauthenticated.
    pub fn get_user_orders(&self, username: &str, token: Option<&str>) -> Result<ResponseDescriptor, Error> {
        let token = match token {
            Some(token) => Some(require_token(token)?),
            None => None,
        };
        let url = format!("{}/user/{}", self.endpoints.orders, username);

        self.get(url, token, &RetryPolicy::single_attempt())
    }

    pub fn get_payment_details(&self, order_number: &str, token: &str) -> Result<ResponseDescriptor, Error> {
        self.get_payment_details_with_retry(order_number, token, &RetryPolicy::single_attempt())
    }

    /// Fetches the payment recorded for an order.
    ///
    /// # Arguments
    /// `order_number` - the order the payment belongs to.
    /// `token` - bearer token of the ordering user.
    /// `policy` - payments are processed asynchronously, so callers usually pass
    ///     [`RetryPolicy::service_unavailable_backoff`].
    ///
    /// # Returns
    /// The last response seen, even when it is still a retryable status.
    pub fn get_payment_details_with_retry(
        &self,
        order_number: &str,
        token: &str,
        policy: &RetryPolicy,
    ) -> Result<ResponseDescriptor, Error> {
        let url = format!("{}/order/{}", self.endpoints.payments, order_number);
        self.get(url, Some(require_token(token)?), policy)
    }

    pub fn get_user_notifications(&self, username: &str, token: &str) -> Result<ResponseDescriptor, Error> {
        let url = format!("{}/user/{}", self.endpoints.notifications, username);
        self.get(url, Some(require_token(token)?), &RetryPolicy::single_attempt())
    }

    /// Sends an authenticated PUT with a JSON body.
    ///
    /// # Arguments
    /// `url` - full URL of the resource.
    /// `body` - anything serializable to JSON.
    /// `token` - bearer token. Must not be blank.
    /// `policy` - retry policy for the call.
    ///
    /// # Returns
    /// The last response seen.
    pub fn put_with_auth<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        token: &str,
        policy: &RetryPolicy,
    ) -> Result<ResponseDescriptor, Error> {
        let token = require_token(token)?;
        let request = RequestSpec::put(url, serde_json::to_value(body)?);

        self.send(request, Some(token), policy)
    }

    /// Sends an authenticated DELETE.
    ///
    /// # Arguments
    /// `url` - full URL of the resource.
    /// `token` - bearer token. Must not be blank.
    /// `policy` - retry policy for the call.
    ///
    /// # Returns
    /// The last response seen.
    pub fn delete_with_auth(&self, url: &str, token: &str, policy: &RetryPolicy) -> Result<ResponseDescriptor, Error> {
        let token = require_token(token)?;

        self.send(RequestSpec::delete(url), Some(token), policy)
    }

    fn post(&self, url: String, body: Value, token: Option<&str>) -> Result<ResponseDescriptor, Error> {
        self.send(RequestSpec::post(url, body), token, &self.post_retry_policy)
    }

    fn get(&self, url: String, token: Option<&str>, policy: &RetryPolicy) -> Result<ResponseDescriptor, Error> {
        self.send(RequestSpec::get(url), token, policy)
    }

    fn send(&self, mut request: RequestSpec, token: Option<&str>, policy: &RetryPolicy) -> Result<ResponseDescriptor, Error> {
        for (name, value) in &self.default_headers {
            request = request.with_header(name, value.as_str());
        }
        if let Some(token) = token {
            request = request.with_auth_token(token);
        }

        self.executor.execute_with_retry(&request, policy)
    }
}

fn require_token(token: &str) -> Result<&str, Error> {
    if token.trim().is_empty() {
        return Err(Error::InvalidRequest(String::from(
            "auth token must not be empty for an authenticated call",
        )));
    }

    Ok(token)
}
