use crate::error::{ParseErrorKind, WfdError};
use crate::protocol::Method;
use crate::protocol::header::{self, Headers};

/// An RTSP request (RFC 2326 §6), either received from the peer or built
/// locally for sending.
///
/// ```text
/// Method SP Request-URI SP RTSP-Version CRLF
/// *(Header: Value CRLF)
/// CRLF
/// [body]
/// ```
///
/// Header lookup is case-insensitive per RFC 2326 §4.2.
#[derive(Debug, Clone)]
pub struct RtspRequest {
    /// RTSP method token as received (OPTIONS, SET_PARAMETER, ...).
    pub method: String,
    /// Request-URI (e.g. `rtsp://localhost/wfd1.0`).
    pub uri: String,
    /// Protocol version (expected: `RTSP/1.0`).
    pub version: String,
    /// Headers as ordered (name, value) pairs.
    pub headers: Headers,
    pub body: String,
}

impl RtspRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method: method.as_str().to_string(),
            uri: uri.to_string(),
            version: "RTSP/1.0".to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Parse a complete request: request line, headers, blank line, body.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        let (request_line, headers, body) = header::split_message(raw)?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(WfdError::parse(ParseErrorKind::InvalidRequestLine));
        }

        let version = parts[2].to_string();
        if version != "RTSP/1.0" {
            tracing::warn!(version, "peer sent non-RTSP/1.0 version");
        }

        Ok(RtspRequest {
            method: parts[0].to_string(),
            uri: parts[1].to_string(),
            version,
            headers,
            body,
        })
    }

    /// The method as a known [`Method`], if it is one.
    pub fn method_kind(&self) -> Option<Method> {
        Method::from_token(&self.method)
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Insert or replace a header.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    pub fn with_body(mut self, content_type: &str, body: String) -> Self {
        self.set_header("Content-Type", content_type);
        self.body = body;
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        header::find(&self.headers, name)
    }

    /// Returns the CSeq header value (RFC 2326 §12.17).
    pub fn cseq(&self) -> Option<u32> {
        self.get_header("CSeq").and_then(|v| v.parse().ok())
    }

    /// Serialize to the RTSP text wire format; `Content-Length` is added
    /// automatically when a body is present.
    pub fn serialize(&self) -> String {
        let mut out = format!("{} {} {}\r\n", self.method, self.uri, self.version);
        header::serialize_into(&mut out, &self.headers, &self.body);
        out
    }
}
