use crate::error::{ParseErrorKind, WfdError};
use crate::protocol::header::{self, Headers};

/// An RTSP response (RFC 2326 §7).
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 3\r\n
/// Content-Type: text/parameters\r\n
/// Content-Length: 39\r\n
/// \r\n
/// wfd_client_rtp_ports: RTP/AVP/UDP;...
/// ```
///
/// Uses a builder pattern: chain [`add_header`](Self::add_header) and
/// [`with_body`](Self::with_body), then call [`serialize`](Self::serialize).
#[must_use]
#[derive(Debug, Clone)]
pub struct RtspResponse {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: String,
}

impl RtspResponse {
    pub fn new(status_code: u16, status_text: &str) -> Self {
        RtspResponse {
            status_code,
            status_text: status_text.to_string(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// 200 OK: success (RFC 2326 §7.1.1).
    pub fn ok() -> Self {
        Self::new(200, "OK")
    }

    /// 400 Bad Request: malformed or missing required header.
    pub fn bad_request() -> Self {
        Self::new(400, "Bad Request")
    }

    /// 500 Internal Server Error: the request was valid but could not be
    /// answered.
    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }

    /// 501 Not Implemented: method not handled by this side.
    pub fn not_implemented() -> Self {
        Self::new(501, "Not Implemented")
    }

    /// 551 Option not supported: a `Require` tag we do not know.
    pub fn option_not_supported() -> Self {
        Self::new(551, "Option not supported")
    }

    /// Parse a complete response: status line, headers, blank line, body.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        let (status_line, headers, body) = header::split_message(raw)?;

        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("RTSP/") {
            return Err(WfdError::parse(ParseErrorKind::InvalidStatusLine));
        }
        let status_code = parts
            .next()
            .and_then(|c| c.parse().ok())
            .ok_or(WfdError::parse(ParseErrorKind::InvalidStatusLine))?;
        let status_text = parts.next().unwrap_or_default().trim().to_string();

        Ok(RtspResponse {
            status_code,
            status_text,
            headers,
            body,
        })
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, content_type: &str, body: String) -> Self {
        self.headers
            .push(("Content-Type".to_string(), content_type.to_string()));
        self.body = body;
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        header::find(&self.headers, name)
    }

    pub fn cseq(&self) -> Option<u32> {
        self.get_header("CSeq").and_then(|v| v.parse().ok())
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Serialize to the RTSP text wire format.
    ///
    /// If a body is present, `Content-Length` is appended automatically
    /// (RFC 2326 §12.14).
    pub fn serialize(&self) -> String {
        let mut response = format!("RTSP/1.0 {} {}\r\n", self.status_code, self.status_text);
        header::serialize_into(&mut response, &self.headers, &self.body);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_no_body() {
        let resp = RtspResponse::ok()
            .add_header("CSeq", "1")
            .add_header("Public", "org.wfa.wfd1.0, GET_PARAMETER, SET_PARAMETER");
        let s = resp.serialize();
        assert!(s.starts_with("RTSP/1.0 200 OK\r\n"));
        assert!(s.contains("CSeq: 1\r\n"));
        assert!(!s.contains("Content-Length"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn serialize_with_body() {
        let resp = RtspResponse::ok()
            .add_header("CSeq", "2")
            .with_body("text/parameters", "wfd_I2C: none\r\n".to_string());
        let s = resp.serialize();
        assert!(s.contains("Content-Type: text/parameters\r\n"));
        assert!(s.contains("Content-Length: 15\r\n"));
        assert!(s.ends_with("wfd_I2C: none\r\n"));
    }

    #[test]
    fn parse_status_line() {
        let resp = RtspResponse::parse("RTSP/1.0 405 Method Not Allowed\r\nCSeq: 9\r\n\r\n").unwrap();
        assert_eq!(resp.status_code, 405);
        assert_eq!(resp.status_text, "Method Not Allowed");
        assert_eq!(resp.cseq(), Some(9));
        assert!(!resp.is_success());
    }

    #[test]
    fn parse_bad_status_line() {
        assert!(RtspResponse::parse("HTTP/1.1 200 OK\r\n\r\n").is_err());
        assert!(RtspResponse::parse("RTSP/1.0 abc OK\r\n\r\n").is_err());
    }
}
