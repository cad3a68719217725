//! Contract between the negotiation engine and the media side.
//!
//! The engine never touches media. It tells a [`MediaSink`] where RTP will
//! arrive, when to start or stop consuming it, and what the stream looks
//! like. All calls come from the session worker thread and must not
//! block for long.

use crate::dispatcher::Progress;
use crate::error::{Result, WfdError};
use crate::protocol::header::RtpInfo;
use crate::session::NegotiatedTransport;
use crate::wfd::AvFormatChangeTiming;
use crate::wfd::formats::StreamInfo;

/// Playback state applied to the media side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Ready,
    Paused,
    Playing,
}

/// Out-of-band events pushed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    /// Drop buffered media; a format change is coming.
    FlushStart,
    FlushStop,
    /// The session ended. Sent at most once per session.
    EndOfStream,
}

/// Media collaborator driven by the session worker.
///
/// Only [`MediaSink::configure_transport`] is mandatory; everything else
/// defaults to a no-op.
pub trait MediaSink: Send + Sync {
    /// Open receive sockets for the negotiated transport. An error fails
    /// the SETUP exchange.
    fn configure_transport(&self, transport: &NegotiatedTransport) -> Result<()>;

    /// Release whatever `configure_transport` opened.
    fn release_transport(&self) {}

    fn set_playback_state(&self, _state: PlaybackState) {}

    fn push_event(&self, _event: SinkEvent) {}

    /// Base sequence number and timestamp from the PLAY response.
    fn set_rtp_base(&self, _info: &RtpInfo) {}

    fn stream_info_updated(&self, _info: &StreamInfo) {}

    /// The source announced a format change at the given PTS/DTS.
    fn av_format_changing(&self, _timing: &AvFormatChangeTiming) {}

    fn progress(&self, _progress: &Progress) {}

    /// Element-level error, raised for failed PLAY and PAUSE.
    fn error(&self, _error: &WfdError) {}
}
