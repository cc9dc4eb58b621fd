use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;

use crate::{producer::BodyProducer, DeeplError, Result};

/// Request payload of an [`Endpoint`].
#[derive(Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    /// Buffered bytes, replayed as-is on every attempt.
    Bytes(Bytes),
    /// Regenerated for every attempt by a background producer.
    Stream(Arc<dyn BodyProducer>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Method, path, headers and body of one API call.
///
/// Built once by the caller and borrowed by
/// [`Translator::dispatch`](crate::Translator::dispatch) for every attempt.
#[derive(Clone, Debug)]
pub struct Endpoint {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Body,
}

impl Endpoint {
    /// `path` is relative to the server URL, e.g. `v2/usage`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a header value; repeated names keep every value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = Body::Bytes(body.into());
        self
    }

    pub fn with_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| DeeplError::Decode(format!("could not encode request JSON: {err}")))?;
        Ok(self.with_body("application/json", body))
    }

    pub fn with_form(self, encoded: String) -> Self {
        self.with_body("application/x-www-form-urlencoded", encoded)
    }

    /// Uses a producer-backed body. `content_type` is sent verbatim.
    pub fn with_stream(
        mut self,
        content_type: &str,
        producer: Arc<dyn BodyProducer>,
    ) -> Result<Self> {
        let value = HeaderValue::from_str(content_type).map_err(|err| {
            DeeplError::Config(format!("invalid content type '{content_type}': {err}"))
        })?;
        self.headers.insert(CONTENT_TYPE, value);
        self.body = Body::Stream(producer);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// Checks a caller-supplied id before it is spliced into a path.
pub(crate) fn path_segment<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(value)
    } else {
        Err(DeeplError::InvalidOption {
            name,
            value: value.to_owned(),
        })
    }
}
