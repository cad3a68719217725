//! Error types for the WFD negotiation engine.

use std::fmt;

/// Errors that can occur while negotiating a Wi-Fi Display session.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Connection**: [`Io`](Self::Io), [`InvalidUrl`](Self::InvalidUrl),
///   [`ConnectFailed`](Self::ConnectFailed),
///   [`ConnectionClosed`](Self::ConnectionClosed),
///   [`NotConnected`](Self::NotConnected),
///   [`KeepaliveExpired`](Self::KeepaliveExpired).
/// - **Protocol**: [`Parse`](Self::Parse), [`Timeout`](Self::Timeout),
///   [`MissingHeader`](Self::MissingHeader), [`Status`](Self::Status),
///   [`MediaTransport`](Self::MediaTransport),
///   [`InvalidConfig`](Self::InvalidConfig).
/// - **Degradation**: [`NotSupported`](Self::NotSupported).
/// - **Cancellation**: [`Interrupted`](Self::Interrupted).
///
/// Use [`category`](WfdError::category) to collapse a variant into one of
/// the four buckets the dispatcher acts on.
#[derive(Debug, thiserror::Error)]
pub enum WfdError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The control-channel URL could not be parsed.
    #[error("invalid control URL: {0}")]
    InvalidUrl(String),

    /// Every connection attempt failed.
    #[error("failed to connect after {attempts} attempts")]
    ConnectFailed { attempts: u32 },

    /// The peer closed the control connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// An operation needed the control connection but it is not open.
    #[error("not connected")]
    NotConnected,

    /// The peer stopped sending keep-alive probes.
    #[error("keep-alive deadline expired")]
    KeepaliveExpired,

    /// A blocking call was interrupted by a flush (command cancellation).
    #[error("operation interrupted")]
    Interrupted,

    /// No message arrived within the configured timeout.
    #[error("timed out waiting for peer")]
    Timeout,

    /// Failed to parse an RTSP message.
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// A response lacked a header the exchange depends on.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// The peer answered with a non-200 status.
    #[error("peer answered {code} {reason}")]
    Status { code: u16, reason: String },

    /// The peer does not implement the method (404/405/501).
    #[error("method not supported by peer: {0}")]
    NotSupported(&'static str),

    /// The external media transport refused the negotiated parameters.
    #[error("media transport error: {0}")]
    MediaTransport(String),

    /// A [`SessionConfig`](crate::config::SessionConfig) value cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Specific kind of RTSP parse failure.
#[derive(Debug)]
pub enum ParseErrorKind {
    /// Input was empty (no start line).
    EmptyMessage,
    /// Request line did not have the expected `Method URI Version` format.
    InvalidRequestLine,
    /// Status line did not have the expected `Version Code Reason` format.
    InvalidStatusLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// `Content-Length` was not a number or exceeded the body limit.
    InvalidContentLength,
    /// Header block exceeded the framing limit.
    MessageTooLarge,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::InvalidRequestLine => write!(f, "invalid request line"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::InvalidContentLength => write!(f, "invalid content length"),
            Self::MessageTooLarge => write!(f, "message too large"),
        }
    }
}

/// Coarse classification used by the dispatcher and the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fatal for the session; end-of-stream is signalled once.
    Connection,
    /// Fatal for the in-flight operation only.
    Protocol,
    /// Recoverable; the peer's method set is narrowed.
    NotSupported,
    /// Not an error: the operation was cancelled by a newer command.
    Cancelled,
}

impl WfdError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_)
            | Self::InvalidUrl(_)
            | Self::ConnectFailed { .. }
            | Self::ConnectionClosed
            | Self::NotConnected
            | Self::KeepaliveExpired => ErrorCategory::Connection,
            Self::Interrupted => ErrorCategory::Cancelled,
            Self::NotSupported(_) => ErrorCategory::NotSupported,
            Self::Timeout
            | Self::Parse { .. }
            | Self::MissingHeader(_)
            | Self::Status { .. }
            | Self::MediaTransport(_)
            | Self::InvalidConfig(_) => ErrorCategory::Protocol,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }

    pub(crate) fn parse(kind: ParseErrorKind) -> Self {
        Self::Parse { kind }
    }
}

/// Convenience alias for `Result<T, WfdError>`.
pub type Result<T> = std::result::Result<T, WfdError>;
