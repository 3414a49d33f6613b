mod api_client;
mod configuration;
mod data;
mod error;
mod http_client;
mod readiness;
mod resolution;
mod retry;
mod scenario;
mod session;
mod username;
mod util;

pub mod logging;
pub mod reporting;

pub use gateway_harness_codegen::gateway_test;

pub use api_client::{GatewayApiClient, GatewayApiClientBuilder, OrderRequest, UserRole};
pub use configuration::{
    HarnessConfiguration, ProtocolVersion, ReadinessSettings, ScenarioTimings, ServiceEndpoints,
    ServiceUrls,
};
pub use data::{HttpMethod, RequestSpec, ResponseDescriptor};
pub use error::{BoxError, Error, TransportError};
pub use http_client::{HttpTransport, ReqwestTransport};
pub use readiness::{prepare_gateway, ReadinessCheck, ReadinessGate, ReadinessPredicate};
pub use resolution::{product_name_is, resolve_order_number};
pub use retry::{
    retry_with_policy, DelayStrategy, RetryPolicy, RetryPolicyBuilder, RetryingExecutor, Sleeper,
    ThreadSleeper,
};
#[cfg(feature = "test-utils")]
pub use retry::testing::RecordingSleeper;
pub use scenario::ScenarioOrchestrator;
pub use session::{OrderHandle, ScenarioRun, ScenarioState, Session};
pub use username::generate_unique_username;
