use std::fmt;

use crate::error::{Result, WfdError};

/// Well-known WFD control port (WFD §6.1).
pub const DEFAULT_WFD_PORT: u16 = 7236;

/// Parsed `rtsp://host[:port][/path]` control URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtspUrl {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl RtspUrl {
    /// Parse a control URL. IPv6 hosts must be bracketed.
    ///
    /// ```
    /// use wfd::transport::RtspUrl;
    ///
    /// let url = RtspUrl::parse("rtsp://192.168.49.1:7236/wfd1.0").unwrap();
    /// assert_eq!(url.host, "192.168.49.1");
    /// assert_eq!(url.port, 7236);
    /// assert_eq!(url.path, "/wfd1.0");
    ///
    /// assert!(RtspUrl::parse("http://example.com/").is_err());
    /// ```
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = || WfdError::InvalidUrl(url.to_string());

        let rest = url.strip_prefix("rtsp://").ok_or_else(invalid)?;
        let (authority, path) = match rest.find('/') {
            Some(slash) => (&rest[..slash], &rest[slash..]),
            None => (rest, "/"),
        };

        let (host, port) = if let Some(v6) = authority.strip_prefix('[') {
            let (host, after) = v6.split_once(']').ok_or_else(invalid)?;
            (host, after.strip_prefix(':'))
        } else {
            match authority.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(invalid());
        }
        let port = match port {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => DEFAULT_WFD_PORT,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for RtspUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "rtsp://[{}]:{}{}", self.host, self.port, self.path)
        } else {
            write!(f, "rtsp://{}:{}{}", self.host, self.port, self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_and_path() {
        let url = RtspUrl::parse("rtsp://10.0.0.2").unwrap();
        assert_eq!(url.port, DEFAULT_WFD_PORT);
        assert_eq!(url.path, "/");
    }

    #[test]
    fn ipv6_host() {
        let url = RtspUrl::parse("rtsp://[fe80::1]:554/wfd1.0").unwrap();
        assert_eq!(url.host, "fe80::1");
        assert_eq!(url.port, 554);
        assert_eq!(url.to_string(), "rtsp://[fe80::1]:554/wfd1.0");
    }

    #[test]
    fn invalid_urls() {
        assert!(RtspUrl::parse("rtsp://:7236/").is_err());
        assert!(RtspUrl::parse("rtsp://host:notaport/").is_err());
        assert!(RtspUrl::parse("192.168.0.1").is_err());
    }
}
