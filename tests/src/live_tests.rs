//! Runs against a live stack. Start the gateway and services, then
//! `cargo test -p tests -- --ignored`.

use gateway_harness::{
    gateway_test, generate_unique_username, HarnessConfiguration, OrderRequest,
    ScenarioOrchestrator, ScenarioRun, ScenarioState, Session, UserRole,
};
use serde_json::Value;
use std::time::Duration;

const PASSWORD: &str = "password123";

fn orchestrator(configuration: &HarnessConfiguration) -> ScenarioOrchestrator {
    ScenarioOrchestrator::from_configuration(configuration).unwrap()
}

fn with_short_timeout(configuration: &mut HarnessConfiguration) {
    configuration.set_request_timeout(Duration::from_secs(10));
}

fn array_len(body: Option<Value>) -> usize {
    match body {
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    }
}

fn fresh_session(orchestrator: &ScenarioOrchestrator, prefix: &str) -> Session {
    let session = orchestrator.register_fresh_user(prefix).unwrap();
    assert!(session.token().is_some(), "no token for {}", session.username());
    session
}

#[ignore]
#[gateway_test]
fn user_registration(configuration: HarnessConfiguration) {
    let client = orchestrator(&configuration).client().clone();
    let cases = vec![
        ("tu", "example.com", PASSWORD, UserRole::User),
        ("tu", "example.com", PASSWORD, UserRole::User),
        ("adm", "example.com", "adminpass123", UserRole::Admin),
        ("min", "test.com", "pass123", UserRole::User),
        ("ut_", "example.com", PASSWORD, UserRole::User),
    ];

    for (prefix, domain, password, role) in cases {
        let username = generate_unique_username(prefix);
        let email = format!("{}@{}", username, domain);

        let response = client.register_user(&username, &email, password, role).unwrap();

        assert_eq!(
            response.status_code(),
            200,
            "registration of {} failed: {}",
            username,
            response.body()
        );
        assert!(response.string_field("token").is_some());
        assert_eq!(response.string_field("username").as_deref(), Some(username.as_str()));
    }
}

#[ignore]
#[gateway_test]
fn user_login(configuration: HarnessConfiguration) {
    let orchestrator = orchestrator(&configuration);
    let client = orchestrator.client();
    let username = generate_unique_username("login");
    orchestrator
        .register_or_login(&username, &format!("{}@example.com", username), PASSWORD)
        .unwrap();
    let unknown = generate_unique_username("nonexistent");

    let cases = vec![
        (username.as_str(), PASSWORD, 200),
        (username.as_str(), "wrongpassword", 401),
        (unknown.as_str(), PASSWORD, 401),
        ("", PASSWORD, 400),
        (username.as_str(), "", 400),
    ];

    for (username, password, expected_status) in cases {
        let response = client.login_user(username, password).unwrap();

        assert_eq!(
            response.status_code(),
            expected_status,
            "login of '{}' answered {}",
            username,
            response.body()
        );
        if expected_status == 200 {
            assert!(response.string_field("token").is_some());
        }
    }
}

#[ignore]
#[gateway_test(with_short_timeout)]
fn user_service_health(configuration: HarnessConfiguration) {
    let response = orchestrator(&configuration)
        .client()
        .get_user_service_health()
        .unwrap();

    assert_eq!(response.status_code(), 200, "{}", response.body());
    assert!(response.body().contains("running") || response.body().contains("User Service"));
}

#[ignore]
#[gateway_test]
fn user_details(configuration: HarnessConfiguration) {
    let orchestrator = orchestrator(&configuration);
    let username = "testuser_details";
    let session = orchestrator
        .register_or_login(username, "testuser_details@example.com", PASSWORD)
        .unwrap();

    let response = orchestrator
        .client()
        .get_user_details(username, session.require_token().unwrap())
        .unwrap();

    assert_eq!(response.status_code(), 200, "{}", response.body());
    assert_eq!(response.string_field("username").as_deref(), Some(username));
    assert!(response.string_field("email").is_some());
}

#[ignore]
#[gateway_test]
fn order_creation(configuration: HarnessConfiguration) {
    let orchestrator = orchestrator(&configuration);
    let cases = vec![("Mouse", 5, 29.99), ("Gaming PC", 1, 2499.99), ("USB Cable", 2, 9.99)];

    for (product_name, quantity, unit_price) in cases {
        let session = fresh_session(&orchestrator, "ord");
        let order = orchestrator
            .create_order(&session, product_name, quantity, unit_price)
            .unwrap();

        let details = orchestrator
            .fetch_order_details(&session, order.order_number())
            .unwrap();
        assert_eq!(details.status_code(), 200, "{}", details.body());

        let details = details.json_value().unwrap_or(Value::Null);
        assert_eq!(details["orderNumber"], order.order_number());
        assert_eq!(details["productName"], product_name);
        assert_eq!(details["quantity"], quantity);
    }
}

#[ignore]
#[gateway_test]
fn order_with_zero_quantity_is_rejected(configuration: HarnessConfiguration) {
    let orchestrator = orchestrator(&configuration);
    let session = fresh_session(&orchestrator, "ord");
    let order = OrderRequest::new(session.username(), "Keyboard", 0, 79.99);

    let response = orchestrator
        .client()
        .create_order(&order, session.require_token().unwrap())
        .unwrap();

    assert_eq!(response.status_code(), 400, "{}", response.body());
}

#[ignore]
#[gateway_test]
fn user_orders(configuration: HarnessConfiguration) {
    let orchestrator = orchestrator(&configuration);
    let session = fresh_session(&orchestrator, "orders");
    orchestrator.create_order(&session, "Product 1", 1, 10.99).unwrap();
    orchestrator.create_order(&session, "Product 2", 2, 20.99).unwrap();

    let response = orchestrator
        .client()
        .get_user_orders(session.username(), session.token())
        .unwrap();

    assert_eq!(response.status_code(), 200, "{}", response.body());
    assert!(array_len(response.json_value()) >= 2, "{}", response.body());
}

#[ignore]
#[gateway_test]
fn notifications(configuration: HarnessConfiguration) {
    let orchestrator = orchestrator(&configuration);
    let session = fresh_session(&orchestrator, "notif");
    orchestrator.create_order(&session, "Notification Product", 1, 49.99).unwrap();

    let response = orchestrator.fetch_notifications(&session).unwrap();

    assert_eq!(response.status_code(), 200, "{}", response.body());
    assert!(array_len(response.json_value()) >= 1, "{}", response.body());
}

#[ignore]
#[gateway_test]
fn payment_details(configuration: HarnessConfiguration) {
    let orchestrator = orchestrator(&configuration);
    let session = fresh_session(&orchestrator, "pay");
    let order = orchestrator.create_order(&session, "Payment Product", 1, 99.99).unwrap();

    let response = orchestrator.fetch_payment_details(&session, &order).unwrap();

    assert_eq!(response.status_code(), 200, "{}", response.body());
    assert!(response.string_field("paymentId").is_some());
    assert_eq!(
        response.string_field("orderNumber").as_deref(),
        Some(order.order_number())
    );
}

#[ignore]
#[gateway_test]
fn end_to_end_flow(configuration: HarnessConfiguration) {
    let orchestrator = orchestrator(&configuration);
    let mut run = ScenarioRun::new("end to end flow");
    let username = "testuser_e2e";

    let session = orchestrator
        .register_or_login(username, "testuser_e2e@example.com", PASSWORD)
        .unwrap();
    run.advance(ScenarioState::Credentialed).unwrap();

    let user = orchestrator
        .client()
        .get_user_details(username, session.require_token().unwrap())
        .unwrap();
    assert_eq!(user.status_code(), 200, "{}", user.body());

    let order = orchestrator.create_order(&session, "E2E Product", 1, 299.99).unwrap();
    run.advance(ScenarioState::Ordered).unwrap();

    let details = orchestrator
        .fetch_order_details(&session, order.order_number())
        .unwrap();
    assert_eq!(details.status_code(), 200, "{}", details.body());

    let payment = orchestrator.fetch_payment_details(&session, &order).unwrap();
    assert_eq!(payment.status_code(), 200, "{}", payment.body());
    run.advance(ScenarioState::Paid).unwrap();
    run.advance(ScenarioState::Done).unwrap();
}

// Authentication is disabled on the gateway for now, so these expect the
// request through rather than a 401.
fn passes_without_authentication(status: u16) -> bool {
    status == 200 || status == 404 || status >= 500
}

#[ignore]
#[gateway_test]
fn orders_without_token(configuration: HarnessConfiguration) {
    let response = orchestrator(&configuration)
        .client()
        .get_user_orders("testuser", None)
        .unwrap();

    assert!(passes_without_authentication(response.status_code()), "{}", response.body());
}

#[ignore]
#[gateway_test]
fn orders_with_invalid_token(configuration: HarnessConfiguration) {
    let response = orchestrator(&configuration)
        .client()
        .get_user_orders("testuser", Some("invalid_token_12345"))
        .unwrap();

    assert!(passes_without_authentication(response.status_code()), "{}", response.body());
}
