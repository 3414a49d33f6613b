use crate::{
    api_client::{GatewayApiClient, OrderRequest, UserRole},
    configuration::{HarnessConfiguration, ScenarioTimings, DEFAULT_PASSWORD},
    data::ResponseDescriptor,
    error::Error,
    resolution::{product_name_is, resolve_order_number},
    retry::RetryPolicy,
    session::{OrderHandle, Session},
    username::generate_unique_username,
    util,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Sequences API client calls into the multi-step flows the tests exercise.
///
/// Operations never retry on their own account; retries come from the
/// client's policies. Every failure ends the scenario where it happened.
#[derive(Debug, Clone)]
pub struct ScenarioOrchestrator {
    client: GatewayApiClient,
    timings: ScenarioTimings,
    default_password: String,
}

impl ScenarioOrchestrator {
    pub fn new(client: GatewayApiClient, timings: ScenarioTimings) -> Self {
        Self {
            client,
            timings,
            default_password: String::from(DEFAULT_PASSWORD),
        }
    }

    pub fn from_configuration(configuration: &HarnessConfiguration) -> Result<Self, Error> {
        let client = GatewayApiClient::from_configuration(configuration)?;

        Ok(Self::new(client, configuration.timings())
            .with_default_password(configuration.default_password()))
    }

    pub fn with_default_password<S: Into<String>>(mut self, password: S) -> Self {
        self.default_password = password.into();
        self
    }

    pub fn client(&self) -> &GatewayApiClient {
        &self.client
    }

    /// Registers the user, or logs in when registration is refused (typically
    /// because the user already exists).
    pub fn register_or_login(&self, username: &str, email: &str, password: &str) -> Result<Session, Error> {
        let registration = self
            .client
            .register_user(username, email, password, UserRole::User)?;
        let registration_status = registration.status_code();

        if registration.is_success() {
            return match registration.string_field("token") {
                Some(token) => {
                    info!(username, token = %util::abbreviate_token(&token), "registered user");
                    Ok(Session::authenticated(username, token))
                }
                None => Err(Error::Credential {
                    username: username.to_string(),
                    registration_status,
                    login_status: None,
                    reason: String::from("registration succeeded without a token"),
                }),
            };
        }

        info!(username, status = registration_status, "registration refused, trying login");
        let login = self.client.login_user(username, password)?;
        let login_status = Some(login.status_code());

        if !login.is_success() {
            return Err(Error::Credential {
                username: username.to_string(),
                registration_status,
                login_status,
                reason: String::from("registration and login both failed"),
            });
        }

        match login.string_field("token") {
            Some(token) => {
                info!(username, token = %util::abbreviate_token(&token), "logged in existing user");
                Ok(Session::authenticated(username, token))
            }
            None => Err(Error::Credential {
                username: username.to_string(),
                registration_status,
                login_status,
                reason: String::from("login succeeded without a token"),
            }),
        }
    }

    /// A fresh user named after `prefix`, with the default password and an
    /// `@example.com` address.
    pub fn register_fresh_user(&self, prefix: &str) -> Result<Session, Error> {
        let username = generate_unique_username(prefix);
        let email = format!("{}@example.com", username);

        self.register_or_login(&username, &email, &self.default_password)
    }

    /// Places an order and works out its number, from the creation response
    /// when it carries one and from the user's order listing otherwise.
    pub fn create_order(
        &self,
        session: &Session,
        product_name: &str,
        quantity: u32,
        unit_price: f64,
    ) -> Result<OrderHandle, Error> {
        let token = session.require_token()?;
        let order = OrderRequest::new(session.username(), product_name, quantity, unit_price);
        let response = self.client.create_order(&order, token)?;
        let status = response.status_code();

        if !response.is_success() {
            return Err(Error::OrderResolution {
                product_name: product_name.to_string(),
                status,
                reason: format!("order creation was rejected: {}", response.body()),
            });
        }

        if let Some(order_number) = response.string_field("orderNumber") {
            info!(%order_number, product_name, "order created");
            return Ok(OrderHandle::new(order_number, product_name, quantity, unit_price));
        }

        warn!(
            status,
            product_name,
            "order created without an order number, looking it up in the user's orders"
        );

        let listing = self.client.get_user_orders(session.username(), Some(token))?;
        let orders = match listing.json_value() {
            Some(Value::Array(orders)) if listing.is_success() => orders,
            _ => {
                warn!(status = listing.status_code(), "user order listing unusable");
                Vec::new()
            }
        };

        match resolve_order_number(&orders, product_name_is(product_name)) {
            Some(order_number) => {
                info!(%order_number, product_name, "order number resolved from listing");
                Ok(OrderHandle::new(order_number, product_name, quantity, unit_price))
            }
            None => Err(Error::OrderResolution {
                product_name: product_name.to_string(),
                status,
                reason: String::from("neither the creation response nor the user's orders carry an order number"),
            }),
        }
    }

    pub fn fetch_order_details(&self, session: &Session, order_number: &str) -> Result<ResponseDescriptor, Error> {
        self.client
            .get_order_details(order_number, session.require_token()?)
    }

    /// Gives the payment service time to react to the order, then asks for the
    /// payment while backing off on 503. The last response is returned as is.
    pub fn fetch_payment_details(&self, session: &Session, order: &OrderHandle) -> Result<ResponseDescriptor, Error> {
        let token = session.require_token()?;

        self.wait_for_async_operation(self.timings.payment_settle);
        self.client.get_payment_details_with_retry(
            order.order_number(),
            token,
            &RetryPolicy::service_unavailable_backoff(),
        )
    }

    pub fn fetch_notifications(&self, session: &Session) -> Result<ResponseDescriptor, Error> {
        let token = session.require_token()?;

        self.wait_for_async_operation(self.timings.notification_settle);
        self.client
            .get_user_notifications(session.username(), token)
    }

    pub fn wait_for_async_operation(&self, duration: Duration) {
        self.client.executor().sleeper().sleep(duration);
    }
}
