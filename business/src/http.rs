//! Thin HTTP client wrapper used by gateway commands.
//!
//! Requests are built with a small builder and sent through one shared
//! `reqwest::Client`, and responses are flattened into a simplified
//! [`Response`] holding only owned data, so command futures stay `Send` and
//! tests can construct responses directly.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A simplified HTTP response holding only owned, Send-safe data.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// Response headers, keys lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Extract an application-level `{ "message": ... }` from the body.
    ///
    /// The portal service reports failures this way on every status code,
    /// including some 2xx bodies, so error mapping checks this before
    /// trusting the status line.
    pub fn service_message(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct ServiceMessage {
            message: String,
        }
        self.json::<ServiceMessage>().ok().map(|m| m.message)
    }
}

/// Transport-level failure (connect, TLS, body read).
#[derive(Debug, Clone, thiserror::Error)]
#[error("HTTP error: {message}")]
pub struct HttpError {
    pub message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type HttpResult<T> = Result<T, HttpError>;

fn shared_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl RequestBuilder {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and the matching content type.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(value)?);
        self.headers
            .insert("content-type".to_owned(), "application/json".to_owned());
        Ok(self)
    }

    pub async fn send(self) -> HttpResult<Response> {
        let client = shared_client();

        let mut request = match self.method {
            Method::Get => client.get(&self.url),
            Method::Post => client.post(&self.url),
            Method::Put => client.put(&self.url),
            Method::Delete => client.delete(&self.url),
        };

        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some(body) = self.body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HttpError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_lowercase(), v.to_owned());
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::new(e.to_string()))?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

/// Entry point for building requests.
pub struct Client;

impl Client {
    pub fn get(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Delete, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_body(status: u16, body: &[u8]) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_response_is_success() {
        assert!(response_with_body(200, b"").is_success());
        assert!(response_with_body(204, b"").is_success());
        assert!(!response_with_body(404, b"").is_success());
        assert!(!response_with_body(500, b"").is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_owned(), "application/json".to_owned());
        let response = Response {
            status: 200,
            headers,
            body: Vec::new(),
        };

        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_text_decodes_utf8_body() {
        let response = response_with_body(200, "ጤና ይስጥልኝ".as_bytes());
        assert_eq!(response.text().unwrap(), "ጤና ይስጥልኝ");

        assert!(response_with_body(200, b"\xff\xfe").text().is_err());
    }

    #[test]
    fn test_service_message_extraction() {
        let response = response_with_body(200, br#"{"message": "asset code already in use"}"#);
        assert_eq!(
            response.service_message(),
            Some("asset code already in use".to_owned())
        );

        let response = response_with_body(200, br#"{"id": "a-1"}"#);
        assert_eq!(response.service_message(), None);

        let response = response_with_body(500, b"not json");
        assert_eq!(response.service_message(), None);
    }

    #[test]
    fn test_request_builder_json_sets_content_type() {
        #[derive(serde::Serialize)]
        struct Body {
            name: String,
        }

        let builder = Client::post("https://example.org")
            .json(&Body {
                name: "keyboard".to_owned(),
            })
            .unwrap();

        assert_eq!(
            builder.headers.get("content-type"),
            Some(&"application/json".to_owned())
        );
        assert!(builder.body.is_some());
    }
}
