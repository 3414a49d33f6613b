use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single HTTP call as the harness wants it issued.
///
/// Built with the consuming `with_*` methods and never changed afterwards;
/// header names are stored lowercase so every key is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    method: HttpMethod,
    endpoint: String,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
    auth_token: Option<String>,
}

impl RequestSpec {
    pub fn new<S: Into<String>>(method: HttpMethod, endpoint: S) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: BTreeMap::new(),
            body: None,
            auth_token: None,
        }
    }

    pub fn get<S: Into<String>>(endpoint: S) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post<S: Into<String>>(endpoint: S, body: Value) -> Self {
        Self::new(HttpMethod::Post, endpoint).with_body(body)
    }

    pub fn put<S: Into<String>>(endpoint: S, body: Value) -> Self {
        Self::new(HttpMethod::Put, endpoint).with_body(body)
    }

    pub fn delete<S: Into<String>>(endpoint: S) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    pub fn with_header<S1: AsRef<str>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_auth_token<S: Into<String>>(mut self, token: S) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}

/// What came back from one transport call. The body is kept as raw text and
/// only parsed as JSON when a caller asks for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    status_code: u16,
    headers: HashMap<String, String>,
    body: String,
}

impl ResponseDescriptor {
    pub fn new<S: Into<String>>(status_code: u16, headers: HashMap<String, String>, body: S) -> Self {
        Self {
            status_code,
            headers,
            body: body.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| key.to_lowercase() == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn has_empty_body(&self) -> bool {
        self.body.trim().is_empty()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// The body as JSON, or `None` when it is empty or not JSON at all.
    pub fn json_value(&self) -> Option<Value> {
        if self.has_empty_body() {
            return None;
        }

        serde_json::from_str(&self.body).ok()
    }

    /// A top-level field rendered as a non-empty string. Numbers are accepted
    /// too since some services hand out numeric identifiers.
    pub fn string_field(&self, name: &str) -> Option<String> {
        self.json_value()
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(value_as_identifier)
    }
}

pub(crate) fn value_as_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
