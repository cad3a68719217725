//! WFD sink negotiation state machine.
//!
//! A [`Negotiator`] lives on the session worker thread and owns the
//! control connection. Each [`Command`] maps to one operation here; the
//! result is folded into an [`Outcome`] so the dispatcher never has to
//! look at raw errors:
//!
//! | Error category | Outcome    | Side effect |
//! |----------------|------------|-------------|
//! | connection     | `Failed`   | session terminated, end-of-stream once |
//! | protocol       | `Failed`   | element error for PLAY and PAUSE |
//! | not supported  | `Complete` | method removed from the peer's set |
//! | cancelled      | `Canceled` | none |

mod exchange;
mod inbound;

use std::net::UdpSocket;
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::dispatcher::{Command, Shared, SinkRequest};
use crate::error::{ErrorCategory, Result, WfdError};
use crate::protocol::header::{RtpInfo, SessionHeader};
use crate::protocol::{Method, Methods, RtspMessage, WFD_TAG};
use crate::session::{NegotiatedTransport, RtspState, TransportHeader};
use crate::sink::{MediaSink, PlaybackState, SinkEvent};
use crate::transport::{RtspTransport, RtspUrl};
use crate::wfd::{CONTENT_TYPE, LowerTransport};

/// Methods this sink answers, advertised in reply to M1.
pub const SINK_METHODS: Methods = Methods::OPTIONS
    .union(Methods::SETUP)
    .union(Methods::PLAY)
    .union(Methods::PAUSE)
    .union(Methods::TEARDOWN)
    .union(Methods::GET_PARAMETER)
    .union(Methods::SET_PARAMETER);

/// Attempts at finding a free even RTP port pair.
const PORT_ATTEMPTS: usize = 16;
const RTP_PORT_MIN: u16 = 1024;
const RTP_PORT_MAX: u16 = 65534;

/// How a command ended, as reported to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Canceled,
    Failed(String),
}

pub struct Negotiator {
    config: SessionConfig,
    transport: RtspTransport,
    shared: Arc<Shared>,
    sink: Arc<dyn MediaSink>,
    url: Option<RtspUrl>,
    local_ports: Option<(u16, u16)>,
    /// True while OPEN runs; a SETUP trigger is then served inline.
    in_open: bool,
    setup_requested: bool,
}

impl Negotiator {
    pub(crate) fn new(
        config: SessionConfig,
        transport: RtspTransport,
        shared: Arc<Shared>,
        sink: Arc<dyn MediaSink>,
    ) -> Self {
        Self {
            config,
            transport,
            shared,
            sink,
            url: None,
            local_ports: None,
            in_open: false,
            setup_requested: false,
        }
    }

    /// Execute one command and classify its result.
    pub fn run(&mut self, command: Command) -> Outcome {
        let result = match command {
            Command::Open => self.open(),
            Command::Setup => self.setup(),
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Close => self.close(),
            Command::Request => self.send_pending_request(),
            Command::Wait => self.wait(),
        };

        let Err(error) = result else {
            return Outcome::Complete;
        };

        match error.category() {
            ErrorCategory::Cancelled => {
                tracing::debug!(%command, "command interrupted");
                Outcome::Canceled
            }
            ErrorCategory::NotSupported => {
                tracing::warn!(%command, %error, "continuing without method");
                Outcome::Complete
            }
            ErrorCategory::Connection => {
                tracing::error!(%command, %error, "session terminated");
                self.terminate();
                Outcome::Failed(error.to_string())
            }
            ErrorCategory::Protocol => {
                tracing::warn!(%command, %error, "command failed");
                if matches!(command, Command::Play | Command::Pause) {
                    self.sink.error(&error);
                }
                Outcome::Failed(error.to_string())
            }
        }
    }

    /// Connect and run the capability exchange up to READY (M1 to M6).
    fn open(&mut self) -> Result<()> {
        if self.transport.connection().is_connected()
            && self.shared.with_session(|s| s.state) != RtspState::Init
        {
            tracing::debug!("session already open");
            return Ok(());
        }

        self.shared.with_session(|s| s.reset());
        self.local_ports = None;
        self.url = Some(self.transport.connection_mut().connect()?);

        self.in_open = true;
        let result = self.negotiate();
        self.in_open = false;
        self.setup_requested = false;

        // A half-negotiated connection is useless; drop it.
        if result
            .as_ref()
            .is_err_and(|e| e.category() == ErrorCategory::Protocol)
        {
            self.terminate();
        }
        result
    }

    fn negotiate(&mut self) -> Result<()> {
        // M1: the source opens with OPTIONS.
        loop {
            match self.transport.receive(self.config.io_timeout)? {
                RtspMessage::Request(request) => {
                    let is_options = request.method_kind() == Some(Method::Options);
                    self.handle_request(request)?;
                    if is_options {
                        break;
                    }
                }
                RtspMessage::Response(response) => {
                    tracing::warn!(status = response.status_code, "unexpected response before M1");
                }
            }
        }

        // M2: our OPTIONS, requiring the WFD extension.
        let request = self
            .request(Method::Options, "*")
            .add_header("Require", WFD_TAG);
        let response = self.send(Method::Options, request)?;
        let methods = match response
            .get_header("Public")
            .or_else(|| response.get_header("Allow"))
        {
            Some(value) => {
                let (methods, wfd) = Methods::parse_list(value);
                if !wfd {
                    tracing::warn!(public = value, "source did not list {}", WFD_TAG);
                }
                methods
            }
            None => {
                tracing::warn!("no Public header, assuming SETUP and PLAY only");
                Methods::MINIMAL
            }
        };
        tracing::info!(methods = %methods.to_header_value(false), "source methods");
        self.shared.with_session(|s| s.methods = methods);

        // M3..M6: serve the source until a SETUP trigger completes.
        while self.shared.with_session(|s| s.state) == RtspState::Init {
            match self.transport.receive(self.config.io_timeout)? {
                RtspMessage::Request(request) => self.handle_request(request)?,
                RtspMessage::Response(response) => {
                    tracing::debug!(status = response.status_code, "discarding stray response");
                }
            }
            if std::mem::take(&mut self.setup_requested) {
                self.setup()?;
            }
        }
        Ok(())
    }

    /// M6: SETUP over unicast UDP.
    fn setup(&mut self) -> Result<()> {
        let (state, methods) = self.shared.with_session(|s| (s.state, s.methods));
        if state != RtspState::Init {
            tracing::debug!(?state, "SETUP skipped, transport already set up");
            return Ok(());
        }
        if !self.transport.connection().is_connected() {
            return Err(WfdError::NotConnected);
        }
        if !methods.contains(Methods::SETUP) {
            return Err(WfdError::NotSupported(Method::Setup.as_str()));
        }

        let (rtp_port, rtcp_port) = self.local_ports()?;
        let offer = TransportHeader::offer(rtp_port, rtcp_port);
        let uri = self.control_uri();
        let request = self
            .request(Method::Setup, &uri)
            .add_header("Transport", &offer.to_header_value());
        let response = self.send(Method::Setup, request)?;

        let session = response
            .get_header("Session")
            .and_then(SessionHeader::parse)
            .ok_or(WfdError::MissingHeader("Session"))?;
        let answer = response
            .get_header("Transport")
            .and_then(TransportHeader::parse);

        if let Some(answer) = &answer {
            if answer.lower_transport != LowerTransport::Udp {
                return Err(WfdError::MediaTransport(format!(
                    "source chose unsupported transport {}",
                    answer.to_header_value()
                )));
            }
        }
        let (rtp_port, rtcp_port) = answer
            .as_ref()
            .and_then(|a| a.client_port)
            .unwrap_or((rtp_port, rtcp_port));

        let negotiated = NegotiatedTransport {
            lower_transport: LowerTransport::Udp,
            source_host: self
                .url
                .as_ref()
                .map(|u| u.host.clone())
                .unwrap_or_default(),
            rtp_port,
            rtcp_port,
            server_port: answer.and_then(|a| a.server_port),
            packet_size: self.config.packet_size,
        };
        self.sink.configure_transport(&negotiated)?;
        tracing::info!(session = %session.id, rtp_port, rtcp_port, "transport configured");

        let grace = self.config.keepalive_grace;
        self.shared.with_session(|s| {
            s.id = Some(session.id);
            s.set_timeout(session.timeout_secs);
            s.transport = Some(negotiated);
            s.touch_keepalive(grace);
            s.set_state(RtspState::Ready);
        });
        Ok(())
    }

    /// M7.
    fn play(&mut self) -> Result<()> {
        let (state, methods) = self.shared.with_session(|s| (s.state, s.methods));
        match state {
            RtspState::Playing => return Ok(()),
            RtspState::Init => {
                tracing::warn!("PLAY ignored, no transport set up");
                return Ok(());
            }
            RtspState::Ready => {}
        }
        if !methods.contains(Methods::PLAY) {
            tracing::debug!("source does not accept PLAY");
            return Ok(());
        }

        let uri = self.control_uri();
        let request = self.request(Method::Play, &uri);
        let response = self.send(Method::Play, request)?;

        if let Some(info) = response.get_header("RTP-Info").and_then(RtpInfo::parse) {
            tracing::debug!(seq = ?info.seq, rtptime = ?info.rtptime, "RTP base");
            self.sink.set_rtp_base(&info);
        }
        self.sink.set_playback_state(PlaybackState::Playing);
        self.shared.with_session(|s| {
            s.paused = false;
            s.set_state(RtspState::Playing);
        });
        Ok(())
    }

    /// M9.
    fn pause(&mut self) -> Result<()> {
        let (state, methods) = self.shared.with_session(|s| (s.state, s.methods));
        if state != RtspState::Playing {
            return Ok(());
        }
        if !methods.contains(Methods::PAUSE) {
            tracing::debug!("source does not accept PAUSE");
            return Ok(());
        }

        let uri = self.control_uri();
        let request = self.request(Method::Pause, &uri);
        self.send(Method::Pause, request)?;

        self.sink.set_playback_state(PlaybackState::Paused);
        self.shared.with_session(|s| {
            s.paused = true;
            s.set_state(RtspState::Ready);
        });
        Ok(())
    }

    /// M8, then release the connection. Never fails.
    fn close(&mut self) -> Result<()> {
        self.sink.set_playback_state(PlaybackState::Ready);

        let methods = self.shared.with_session(|s| s.methods);
        if !self.transport.connection().is_connected() {
            tracing::debug!("not connected, skipping TEARDOWN");
        } else if !methods.contains(Methods::TEARDOWN) {
            tracing::debug!("source does not accept TEARDOWN, skipping");
        } else {
            let uri = self.control_uri();
            let request = self.request(Method::Teardown, &uri);
            if let Err(error) = self.send(Method::Teardown, request) {
                tracing::warn!(%error, "TEARDOWN failed, closing anyway");
            }
        }

        self.transport.connection_mut().close(true);
        self.sink.release_transport();
        self.local_ports = None;
        self.shared.with_session(|s| s.reset());
        tracing::info!("session closed");
        Ok(())
    }

    /// Send the mailbox request as one SET_PARAMETER.
    fn send_pending_request(&mut self) -> Result<()> {
        let Some(pending) = self.shared.take_request() else {
            return Ok(());
        };
        let (state, methods) = self.shared.with_session(|s| (s.state, s.methods));
        if state == RtspState::Init || !self.transport.connection().is_connected() {
            tracing::warn!(request = ?pending, "dropping request, no session");
            return Ok(());
        }
        if !methods.contains(Methods::SET_PARAMETER) {
            return Err(WfdError::NotSupported(Method::SetParameter.as_str()));
        }

        let uri = self.control_uri();
        let body = pending.to_message().serialize();
        let request = self
            .request(Method::SetParameter, &uri)
            .with_body(CONTENT_TYPE, body);
        self.send(Method::SetParameter, request)?;
        tracing::debug!(request = ?pending, "request acknowledged");

        self.shared.with_session(|s| match pending {
            SinkRequest::Route(route) => s.route = Some(route),
            SinkRequest::Standby => s.standby = true,
            _ => {}
        });
        Ok(())
    }

    /// Idle: serve source requests until one arrives, the keep-alive
    /// deadline passes or the wait is interrupted.
    fn wait(&mut self) -> Result<()> {
        if !self.transport.connection().is_connected() {
            return Ok(());
        }
        let remaining = self.shared.with_session(|s| s.keepalive_remaining());
        if remaining.is_some_and(|r| r.is_zero()) {
            return Err(WfdError::KeepaliveExpired);
        }
        let timeout = remaining.map_or(self.config.io_timeout, |r| r.min(self.config.io_timeout));

        match self.transport.receive(timeout) {
            Ok(RtspMessage::Request(request)) => self.handle_request(request),
            Ok(RtspMessage::Response(response)) => {
                tracing::debug!(status = response.status_code, "discarding stray response");
                Ok(())
            }
            Err(WfdError::Timeout) => {
                let expired = self
                    .shared
                    .with_session(|s| s.keepalive_remaining())
                    .is_some_and(|r| r.is_zero());
                if expired {
                    Err(WfdError::KeepaliveExpired)
                } else {
                    Ok(())
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the connection after a fatal error. End-of-stream goes out
    /// once per session.
    fn terminate(&mut self) {
        let first = self.shared.with_session(|s| {
            let first = !s.terminated;
            s.terminated = true;
            s.set_state(RtspState::Init);
            first
        });
        self.transport.connection_mut().close(true);
        if first {
            self.sink.release_transport();
            self.sink.push_event(SinkEvent::EndOfStream);
        }
    }

    /// Request URI for session-level requests.
    fn control_uri(&self) -> String {
        if let Some(url) = self.shared.with_session(|s| s.control_url.clone()) {
            return url;
        }
        self.url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| self.config.url.clone())
    }

    /// Local RTP/RTCP pair: set by the source, configured, or a random
    /// even pair that binds on UDP.
    fn local_ports(&mut self) -> Result<(u16, u16)> {
        if let Some(ports) = self.local_ports {
            return Ok(ports);
        }
        let from_source = self.shared.with_session(|s| {
            s.client_ports
                .as_ref()
                .map(|p| p.rtp_port0)
                .filter(|&port| port != 0 && port < u16::MAX)
        });
        let ports = match (from_source, self.config.rtp_ports()?) {
            (Some(port), _) => (port, port + 1),
            (None, Some(pair)) => pair,
            (None, None) => random_port_pair()?,
        };
        tracing::debug!(rtp_port = ports.0, rtcp_port = ports.1, "local RTP ports");
        self.local_ports = Some(ports);
        Ok(ports)
    }
}

fn random_port_pair() -> Result<(u16, u16)> {
    for _ in 0..PORT_ATTEMPTS {
        let rtp = rand::random_range(RTP_PORT_MIN..RTP_PORT_MAX) & !1;
        let rtp_ok = UdpSocket::bind(("0.0.0.0", rtp)).is_ok();
        if rtp_ok && UdpSocket::bind(("0.0.0.0", rtp + 1)).is_ok() {
            return Ok((rtp, rtp + 1));
        }
    }
    Err(WfdError::MediaTransport("no free RTP port pair found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_methods_cover_wfd_set() {
        assert_eq!(
            SINK_METHODS.to_header_value(true),
            "org.wfa.wfd1.0, OPTIONS, SETUP, PLAY, PAUSE, TEARDOWN, GET_PARAMETER, SET_PARAMETER"
        );
    }

    #[test]
    fn random_pair_is_even() {
        let (rtp, rtcp) = random_port_pair().unwrap();
        assert_eq!(rtp % 2, 0);
        assert_eq!(rtcp, rtp + 1);
    }
}
