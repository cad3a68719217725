pub mod config;
pub mod dispatcher;
pub mod error;
pub mod negotiation;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod transport;
pub mod wfd;

pub use config::SessionConfig;
pub use dispatcher::{Command, Dispatcher, Progress, ProgressKind, SinkRequest};
pub use error::{ErrorCategory, Result, WfdError};
pub use session::{RtspState, Session};
pub use sink::{MediaSink, PlaybackState, SinkEvent};
pub use wfd::WfdMessage;
