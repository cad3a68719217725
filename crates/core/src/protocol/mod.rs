//! RTSP message model (RFC 2326) as used by the WFD control channel.
//!
//! WFD reuses RTSP/1.0 framing with both peers acting as client and
//! server on one TCP connection: the source sends OPTIONS,
//! GET_PARAMETER and SET_PARAMETER requests to the sink, and the sink
//! sends OPTIONS, SETUP, PLAY, PAUSE, TEARDOWN and SET_PARAMETER
//! requests to the source.
//!
//! ## Message exchange (WFD §6.1)
//!
//! | Msg | Direction     | Method        | Purpose |
//! |-----|---------------|---------------|---------|
//! | M1  | source → sink | OPTIONS       | Capability discovery |
//! | M2  | sink → source | OPTIONS       | Capability discovery |
//! | M3  | source → sink | GET_PARAMETER | Query sink capabilities |
//! | M4  | source → sink | SET_PARAMETER | Select formats, presentation URL |
//! | M5  | source → sink | SET_PARAMETER | Trigger SETUP/PLAY/PAUSE/TEARDOWN |
//! | M6  | sink → source | SETUP         | Negotiate RTP transport |
//! | M7  | sink → source | PLAY          | Start streaming |
//! | M8  | sink → source | TEARDOWN      | End session |
//! | M9  | sink → source | PAUSE         | Pause streaming |
//! | M13 | sink → source | SET_PARAMETER | IDR request |
//! | M16 | source → sink | GET_PARAMETER | Keep-alive (empty body) |

pub mod header;
pub mod method;
pub mod request;
pub mod response;

pub use method::{Method, Methods, WFD_TAG};
pub use request::RtspRequest;
pub use response::RtspResponse;

/// Any message read from the control channel.
#[derive(Debug, Clone)]
pub enum RtspMessage {
    Request(RtspRequest),
    Response(RtspResponse),
}

impl RtspMessage {
    /// Parse a framed message, deciding request vs. response from the
    /// start line.
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        if raw.trim_start().starts_with("RTSP/") {
            RtspResponse::parse(raw).map(Self::Response)
        } else {
            RtspRequest::parse(raw).map(Self::Request)
        }
    }

    pub fn serialize(&self) -> String {
        match self {
            Self::Request(r) => r.serialize(),
            Self::Response(r) => r.serialize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify() {
        assert!(matches!(
            RtspMessage::parse("RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\n").unwrap(),
            RtspMessage::Response(_)
        ));
        assert!(matches!(
            RtspMessage::parse("GET_PARAMETER rtsp://localhost/wfd1.0 RTSP/1.0\r\nCSeq: 2\r\n\r\n")
                .unwrap(),
            RtspMessage::Request(_)
        ));
    }
}
