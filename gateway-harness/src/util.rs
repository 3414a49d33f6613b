use crate::error::Error;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

/// Response headers as plain strings. Values that are not visible ASCII are dropped.
pub fn extract_headers(header_map: &HeaderMap) -> HashMap<String, String> {
    header_map
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

pub fn put_headers<'a, I: IntoIterator<Item = (&'a String, &'a String)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.insert(header_name, header_value);
    }

    Ok(())
}

/// Fails with `InvalidHeaderName`/`InvalidHeaderValue` when a header could
/// never be put on the wire.
pub fn validate_headers<'a, I: IntoIterator<Item = (&'a String, &'a String)>>(headers: I) -> Result<(), Error> {
    put_headers(&mut HeaderMap::new(), headers)
}

/// Shortens a bearer token for log output.
pub fn abbreviate_token(token: &str) -> String {
    let prefix: String = token.chars().take(20).collect();
    if prefix.len() < token.len() {
        format!("{}...", prefix)
    } else {
        prefix
    }
}
