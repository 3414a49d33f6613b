use crate::{
    configuration::{HarnessConfiguration, ProtocolVersion},
    data::{RequestSpec, ResponseDescriptor},
    error::{Error, TransportError},
    util,
};
use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderValue, ACCEPT, CONNECTION},
    redirect::Policy,
};
use std::fmt::Debug;
use tracing::debug;

/// Issues exactly one HTTP request. No retries and no opinion about status codes.
pub trait HttpTransport: Debug + Send + Sync {
    fn execute(&self, request: &RequestSpec) -> Result<ResponseDescriptor, TransportError>;
}

/// Blocking reqwest client shaped like a plain `curl` call: no cookie jar,
/// no redirect following, a fixed client identifier and `Connection: close`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(configuration: &HarnessConfiguration) -> Result<Self, Error> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("close"));

        // reqwest only keeps cookies when a cookie store is configured, so none is set here
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .user_agent(configuration.user_agent())
            .default_headers(default_headers)
            .timeout(configuration.request_timeout());

        if configuration.protocol_version() == ProtocolVersion::Http1 {
            builder = builder.http1_only();
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    fn send(&self, request: &RequestSpec) -> Result<ResponseDescriptor, TransportError> {
        let to_transport_error =
            |e: reqwest::Error| TransportError::new(request.method(), request.endpoint(), e);

        let mut headers = HeaderMap::new();
        util::put_headers(&mut headers, request.headers())
            .map_err(|e| TransportError::new(request.method(), request.endpoint(), e))?;

        let mut request_builder = self
            .client
            .request(request.method().into(), request.endpoint())
            .headers(headers);

        if let Some(token) = request.auth_token() {
            request_builder = request_builder.bearer_auth(token);
        }
        if let Some(body) = request.body() {
            request_builder = request_builder.json(body);
        }

        let response = request_builder.send().map_err(to_transport_error)?;

        let status_code = response.status().as_u16();
        let headers = util::extract_headers(response.headers());
        let body = response.text().map_err(to_transport_error)?;

        Ok(ResponseDescriptor::new(status_code, headers, body))
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: &RequestSpec) -> Result<ResponseDescriptor, TransportError> {
        debug!(
            method = %request.method(),
            endpoint = request.endpoint(),
            token = ?request.auth_token().map(util::abbreviate_token),
            "sending request"
        );

        let response = self.send(request)?;

        debug!(
            method = %request.method(),
            endpoint = request.endpoint(),
            status = response.status_code(),
            body = response.body(),
            "received response"
        );

        Ok(response)
    }
}
