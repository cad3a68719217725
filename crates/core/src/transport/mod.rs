//! Control-channel transport.
//!
//! - [`url`]: parses the `rtsp://` control URL.
//! - [`connection`]: one TCP stream to the source with bounded connect
//!   retry and cooperative flush.
//! - [`rtsp`]: frames RTSP messages on top of a connection.
//!
//! Media travels over separate UDP ports negotiated in SETUP; this layer
//! never touches it.

pub mod connection;
pub mod rtsp;
pub mod url;

pub use connection::{Connection, ConnectionHandle, Connector, LinkState, Stream, TcpConnector};
pub use rtsp::RtspTransport;
pub use url::{DEFAULT_WFD_PORT, RtspUrl};
