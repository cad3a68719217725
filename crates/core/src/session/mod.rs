//! Negotiation state for one control connection.
//!
//! ## State machine
//!
//! ```text
//! INIT ──OPEN/SETUP──> READY ──PLAY──> PLAYING
//!                        ^               │
//!                        └─────PAUSE─────┘   (READY with `paused` set)
//! any ──CLOSE──> INIT
//! ```
//!
//! The state is only ever mutated by the session worker. Other threads
//! read it through [`crate::dispatcher::Dispatcher`] snapshots.

pub mod transport;

use std::time::{Duration, Instant};

use crate::protocol::Methods;
use crate::wfd::formats::StreamInfo;
use crate::wfd::{AudioRoute, ClientRtpPorts, WfdMessage};
pub use transport::{NegotiatedTransport, TransportHeader};

/// Session timeout assumed until the source tells us otherwise
/// (RFC 2326 §12.37).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest session timeout honoured; larger values are clamped.
pub const MAX_SESSION_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// RTSP state of the sink (RFC 2326 §A.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RtspState {
    #[default]
    Init,
    Ready,
    Playing,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub state: RtspState,
    /// Set once PAUSE returns the session from PLAYING to READY.
    pub paused: bool,
    /// Methods the source accepts, from its OPTIONS answer.
    pub methods: Methods,
    /// Session identifier assigned by the source in SETUP.
    pub id: Option<String>,
    pub timeout: Duration,
    /// When the source must have probed us by (M16).
    pub keepalive_deadline: Option<Instant>,
    /// Request URI for SETUP and later, from `wfd_presentation_URL`.
    pub control_url: Option<String>,
    /// Ports the source asked us to use in `wfd_client_rtp_ports`.
    pub client_ports: Option<ClientRtpPorts>,
    pub transport: Option<NegotiatedTransport>,
    pub stream_info: StreamInfo,
    pub standby: bool,
    pub route: Option<AudioRoute>,
    /// Every group the source has set so far, latest value wins.
    pub peer_params: WfdMessage,
    /// Set after a fatal connection error until the next OPEN.
    pub terminated: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: RtspState::Init,
            paused: false,
            methods: Methods::MINIMAL,
            id: None,
            timeout: DEFAULT_SESSION_TIMEOUT,
            keepalive_deadline: None,
            control_url: None,
            client_ports: None,
            transport: None,
            stream_info: StreamInfo::default(),
            standby: false,
            route: None,
            peer_params: WfdMessage::default(),
            terminated: false,
        }
    }

    pub fn set_state(&mut self, state: RtspState) {
        if self.state != state {
            tracing::info!(old_state = ?self.state, new_state = ?state, "state transition");
        }
        self.state = state;
    }

    /// Value for the `Session` request header, once SETUP assigned one.
    pub fn header_value(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Adopt the `timeout` of the source's `Session` header.
    pub fn set_timeout(&mut self, secs: Option<u64>) {
        self.timeout = match secs.map(Duration::from_secs) {
            None => DEFAULT_SESSION_TIMEOUT,
            Some(t) if t > MAX_SESSION_TIMEOUT => {
                tracing::warn!(timeout = ?t, "session timeout clamped");
                MAX_SESSION_TIMEOUT
            }
            Some(t) => t,
        };
    }

    /// Push the keep-alive deadline out by one session timeout plus `grace`.
    pub fn touch_keepalive(&mut self, grace: Duration) {
        let now = Instant::now();
        self.keepalive_deadline = now
            .checked_add(self.timeout.saturating_add(grace))
            .or_else(|| now.checked_add(MAX_SESSION_TIMEOUT));
    }

    /// Time left until the keep-alive deadline, `None` if not armed.
    pub fn keepalive_remaining(&self) -> Option<Duration> {
        self.keepalive_deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fold peer-provided groups into `peer_params`.
    pub fn merge_peer_params(&mut self, msg: &WfdMessage) {
        let p = &mut self.peer_params;
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if msg.$field.is_some() { p.$field = msg.$field.clone(); })*
            };
        }
        merge!(
            audio_codecs,
            video_formats,
            video_3d_formats,
            content_protection,
            display_edid,
            coupled_sink,
            presentation_url,
            client_rtp_ports,
            route,
            i2c,
            av_format_change_timing,
            preferred_display_mode,
            standby_resume_capability,
            connector_type
        );
    }

    /// Drop everything learned from the current connection.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
