use futures::channel::oneshot;
use gateway_harness::HttpMethod;
use hyper::{
    body,
    header::{HeaderName, HeaderValue},
    service::{make_service_fn, service_fn},
    Body, HeaderMap, Request, Response, Server,
};
use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    net::SocketAddr,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Instant,
};
use tokio::runtime::Runtime;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl StubResponse {
    pub fn new<S: Into<String>>(status_code: u16, body: S) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// e.g. `HTTP/1.1`
    pub version: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub received_at: Instant,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct StubState {
    routes: HashMap<(String, String), VecDeque<StubResponse>>,
    requests: Vec<RecordedRequest>,
}

/// A local HTTP server standing in for the gateway or one of the services.
///
/// Each route answers from its own script: responses are handed out in order
/// and the last one keeps being repeated. Unscripted routes answer 404. The
/// server binds an ephemeral port and stops when the stub is dropped.
#[derive(Debug)]
pub struct StubGateway {
    address: SocketAddr,
    state: Arc<Mutex<StubState>>,
    shutdown: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl StubGateway {
    pub fn start() -> Self {
        let state = Arc::new(Mutex::new(StubState::default()));
        let (address_sender, address_receiver) = mpsc::channel();
        let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();

        let server_state = state.clone();
        let join_handle = thread::spawn(move || {
            Runtime::new().unwrap().block_on(async move {
                let addr = SocketAddr::from(([127, 0, 0, 1], 0));

                let server = Server::bind(&addr).serve(make_service_fn(move |_| {
                    let state = server_state.clone();
                    async move {
                        Ok::<_, Infallible>(service_fn(move |req| {
                            Self::handle_request(state.clone(), req)
                        }))
                    }
                }));

                address_sender.send(server.local_addr()).unwrap();

                let server = server.with_graceful_shutdown(async {
                    let _ = shutdown_receiver.await;
                });

                if let Err(e) = server.await {
                    error!(error = %e, "stub gateway error");
                }
            });
        });

        let address = address_receiver
            .recv()
            .expect("Couldn't start the stub gateway");
        debug!(%address, "stub gateway listening");

        StubGateway {
            address,
            state,
            shutdown: Some(shutdown_sender),
            join_handle: Some(join_handle),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn respond<S: Into<String>>(&self, method: HttpMethod, path: &str, status_code: u16, body: S) {
        self.script(method, path, vec![StubResponse::new(status_code, body)]);
    }

    pub fn script(&self, method: HttpMethod, path: &str, responses: Vec<StubResponse>) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(Self::route_key(method, path), responses.into());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method.as_str() && request.path == path)
            .collect()
    }

    pub fn hits(&self, method: HttpMethod, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    fn route_key(method: HttpMethod, path: &str) -> (String, String) {
        (String::from(method.as_str()), String::from(path))
    }

    async fn handle_request(
        state: Arc<Mutex<StubState>>,
        mut request: Request<Body>,
    ) -> Result<Response<Body>, Infallible> {
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let version = format!("{:?}", request.version());
        let headers = Self::record_headers(request.headers());
        let body = body::to_bytes(request.body_mut())
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        let stub_response = {
            let mut state = state.lock().unwrap();
            state.requests.push(RecordedRequest {
                method: method.clone(),
                path: path.clone(),
                version,
                headers,
                body,
                received_at: Instant::now(),
            });

            match state.routes.get_mut(&(method.clone(), path.clone())) {
                Some(responses) if responses.len() > 1 => responses.pop_front(),
                Some(responses) => responses.front().cloned(),
                None => None,
            }
        };

        let stub_response = stub_response.unwrap_or_else(|| StubResponse::new(404, ""));
        debug!(%method, %path, status = stub_response.status_code, "stub gateway answered");

        Ok(Self::build_response(stub_response))
    }

    fn build_response(stub_response: StubResponse) -> Response<Body> {
        let mut response_builder = Response::builder().status(stub_response.status_code);

        if let Some(header_map) = response_builder.headers_mut() {
            for (key, value) in &stub_response.headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_lowercase(key.to_lowercase().as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    header_map.append(name, value);
                }
            }
        }

        response_builder
            .body(stub_response.body.into())
            .unwrap_or_else(|_| {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                response
            })
    }

    /// Unlike the client side, opaque bytes are kept (lossily) so a test can
    /// still see that the header arrived.
    fn record_headers(header_map: &HeaderMap) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        for (name, value) in header_map {
            headers.insert(
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        headers
    }
}

impl Drop for StubGateway {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .join()
                .expect("Couldn't gracefully shutdown the stub gateway thread");
        }
    }
}
