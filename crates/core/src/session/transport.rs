use crate::wfd::LowerTransport;

/// Parsed RTSP `Transport` header value (RFC 2326 §12.39).
///
/// The sink offers its receive ports in SETUP and the source answers
/// with the pair it will send from:
///
/// ```text
/// Sink → Source:
///   Transport: RTP/AVP/UDP;unicast;client_port=19000-19001
///
/// Source → Sink:
///   Transport: RTP/AVP/UDP;unicast;client_port=19000-19001;server_port=5000-5001
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHeader {
    /// Profile without the lower transport, e.g. `RTP/AVP`.
    pub profile: String,
    pub lower_transport: LowerTransport,
    pub unicast: bool,
    pub client_port: Option<(u16, u16)>,
    pub server_port: Option<(u16, u16)>,
}

impl TransportHeader {
    /// Unicast UDP offer for the given receive pair.
    pub fn offer(rtp_port: u16, rtcp_port: u16) -> Self {
        Self {
            profile: "RTP/AVP".to_string(),
            lower_transport: LowerTransport::Udp,
            unicast: true,
            client_port: Some((rtp_port, rtcp_port)),
            server_port: None,
        }
    }

    /// Parse a `Transport` header value. Only the first transport spec
    /// of a comma-separated list is considered.
    ///
    /// ## Examples
    ///
    /// ```
    /// use wfd::session::transport::TransportHeader;
    ///
    /// let th = TransportHeader::parse("RTP/AVP/UDP;unicast;client_port=19000-19001;server_port=5000-5001").unwrap();
    /// assert_eq!(th.client_port, Some((19000, 19001)));
    /// assert_eq!(th.server_port, Some((5000, 5001)));
    ///
    /// assert!(TransportHeader::parse("").is_none());
    /// ```
    pub fn parse(header: &str) -> Option<Self> {
        let spec = header.split(',').next()?.trim();
        let mut parts = spec.split(';').map(str::trim);

        let protocol = parts.next().filter(|p| !p.is_empty())?;
        let (profile, lower_transport) = match protocol.rsplit_once('/') {
            Some((profile, "UDP")) => (profile, LowerTransport::Udp),
            Some((profile, "TCP")) => (profile, LowerTransport::Tcp),
            _ => (protocol, LowerTransport::Udp),
        };

        let mut th = TransportHeader {
            profile: profile.to_string(),
            lower_transport,
            unicast: false,
            client_port: None,
            server_port: None,
        };

        for part in parts {
            if part == "unicast" {
                th.unicast = true;
            } else if let Some(ports) = part.strip_prefix("client_port=") {
                th.client_port = parse_pair(ports);
            } else if let Some(ports) = part.strip_prefix("server_port=") {
                th.server_port = parse_pair(ports);
            }
        }
        Some(th)
    }

    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}/{}", self.profile, self.lower_transport.as_str());
        if self.unicast {
            out.push_str(";unicast");
        }
        if let Some((rtp, rtcp)) = self.client_port {
            out.push_str(&format!(";client_port={}-{}", rtp, rtcp));
        }
        if let Some((rtp, rtcp)) = self.server_port {
            out.push_str(&format!(";server_port={}-{}", rtp, rtcp));
        }
        out
    }
}

fn parse_pair(ports: &str) -> Option<(u16, u16)> {
    match ports.split_once('-') {
        Some((rtp, rtcp)) => Some((rtp.trim().parse().ok()?, rtcp.trim().parse().ok()?)),
        None => {
            let rtp: u16 = ports.trim().parse().ok()?;
            Some((rtp, rtp.checked_add(1)?))
        }
    }
}

/// Media transport agreed in SETUP, handed to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedTransport {
    pub lower_transport: LowerTransport,
    /// Host of the source, taken from the control URL.
    pub source_host: String,
    /// Local RTP receive port.
    pub rtp_port: u16,
    /// Local RTCP port, `rtp_port + 1`.
    pub rtcp_port: u16,
    /// Source's sending pair, when it told us.
    pub server_port: Option<(u16, u16)>,
    /// Maximum RTP packet size hint.
    pub packet_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_offer_roundtrip() {
        let offer = TransportHeader::offer(19000, 19001);
        assert_eq!(
            offer.to_header_value(),
            "RTP/AVP/UDP;unicast;client_port=19000-19001"
        );
        assert_eq!(TransportHeader::parse(&offer.to_header_value()), Some(offer));
    }

    #[test]
    fn parse_without_lower_transport() {
        let th = TransportHeader::parse("RTP/AVP;unicast;client_port=5000-5001").unwrap();
        assert_eq!(th.profile, "RTP/AVP");
        assert_eq!(th.lower_transport, LowerTransport::Udp);
        assert!(th.unicast);
        assert_eq!(th.client_port, Some((5000, 5001)));
        assert_eq!(th.server_port, None);
    }

    #[test]
    fn single_port_implies_rtcp() {
        let th = TransportHeader::parse("RTP/AVP/UDP;unicast;server_port=6000").unwrap();
        assert_eq!(th.server_port, Some((6000, 6001)));
    }

    #[test]
    fn malformed_ports_are_dropped() {
        let th = TransportHeader::parse("RTP/AVP/TCP;client_port=abc-1").unwrap();
        assert_eq!(th.lower_transport, LowerTransport::Tcp);
        assert_eq!(th.client_port, None);
    }
}
