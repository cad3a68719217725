//! Scripted WFD source and recording media sink for integration tests.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use wfd::protocol::header::RtpInfo;
use wfd::session::NegotiatedTransport;
use wfd::wfd::AvFormatChangeTiming;
use wfd::wfd::formats::StreamInfo;
use wfd::{
    Command, Dispatcher, MediaSink, PlaybackState, Progress, ProgressKind, SessionConfig,
    SinkEvent, WfdError,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// One message read by the source side.
#[derive(Debug, Clone)]
pub struct Message {
    pub start: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Message {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn cseq(&self) -> &str {
        self.header("CSeq").unwrap_or("")
    }

    pub fn is_ok(&self) -> bool {
        self.start.starts_with("RTSP/1.0 200")
    }
}

/// Listening side of the control channel, playing the WFD source.
pub struct Source {
    listener: TcpListener,
}

impl Source {
    pub fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").expect("bind source"),
        }
    }

    pub fn url(&self) -> String {
        let port = self.listener.local_addr().unwrap().port();
        format!("rtsp://127.0.0.1:{}/wfd1.0", port)
    }

    pub fn accept(&self) -> Peer {
        let (stream, _) = self.listener.accept().expect("sink connects");
        stream.set_read_timeout(Some(WAIT)).unwrap();
        stream.set_write_timeout(Some(WAIT)).unwrap();
        Peer {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: stream,
            cseq: 0,
        }
    }
}

/// Accepted connection from the sink under test.
pub struct Peer {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    cseq: u32,
}

impl Peer {
    /// Read the next message. `None` on EOF.
    pub fn read(&mut self) -> Option<Message> {
        let mut start = String::new();
        loop {
            start.clear();
            if self.reader.read_line(&mut start).ok()? == 0 {
                return None;
            }
            if !start.trim().is_empty() {
                break;
            }
        }

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).ok()? == 0 {
                return None;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').expect("header line");
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let mut msg = Message {
            start: start.trim_end().to_string(),
            headers,
            body: String::new(),
        };
        if let Some(len) = msg.header("Content-Length").and_then(|v| v.parse::<usize>().ok()) {
            let mut body = vec![0u8; len];
            self.reader.read_exact(&mut body).ok()?;
            msg.body = String::from_utf8_lossy(&body).into_owned();
        }
        Some(msg)
    }

    pub fn read_request(&mut self, method: &str) -> Message {
        let msg = self.read().expect("request from sink");
        assert!(
            msg.start.starts_with(method),
            "expected {}, got {:?}",
            method,
            msg.start
        );
        msg
    }

    /// Send a request and return the sink's answer.
    pub fn request(&mut self, method: &str, uri: &str, headers: &[(&str, &str)], body: &str) -> Message {
        self.cseq += 1;
        let mut out = format!("{} {} RTSP/1.0\r\nCSeq: {}\r\n", method, uri, self.cseq);
        for (name, value) in headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        if !body.is_empty() {
            out.push_str("Content-Type: text/parameters\r\n");
            out.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        out.push_str("\r\n");
        out.push_str(body);
        self.writer.write_all(out.as_bytes()).unwrap();

        let response = self.read().expect("response from sink");
        assert!(response.start.starts_with("RTSP/1.0"), "expected response, got {:?}", response.start);
        assert_eq!(response.cseq(), self.cseq.to_string());
        response
    }

    pub fn respond(&mut self, to: &Message, status: &str, headers: &[(&str, &str)]) {
        let mut out = format!("RTSP/1.0 {}\r\nCSeq: {}\r\n", status, to.cseq());
        for (name, value) in headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str("\r\n");
        self.writer.write_all(out.as_bytes()).unwrap();
    }

    /// Assert the sink sends nothing for `window`.
    pub fn expect_silence(&mut self, window: Duration) {
        self.writer.set_read_timeout(Some(window)).unwrap();
        let mut byte = [0u8; 1];
        let result = self.reader.get_mut().read(&mut byte);
        assert!(
            matches!(&result, Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)),
            "sink was not silent: {:?}",
            result
        );
        self.writer.set_read_timeout(Some(WAIT)).unwrap();
    }
}

/// Everything the engine told the media side.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Transport(NegotiatedTransport),
    Released,
    State(PlaybackState),
    Sink(SinkEvent),
    RtpBase(RtpInfo),
    StreamInfo(StreamInfo),
    FormatChange(AvFormatChangeTiming),
    Progress(Progress),
    Error(String),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }

    /// Poll until `pred` holds on the recorded events.
    pub fn wait_for(&self, pred: impl Fn(&[Event]) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if pred(&self.events.lock()) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    pub fn wait_progress(&self, command: Command, kind: ProgressKind) -> bool {
        self.wait_for(|events| count_progress(events, command, kind) > 0)
    }

    pub fn progress_count(&self, command: Command, kind: ProgressKind) -> usize {
        count_progress(&self.events.lock(), command, kind)
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

pub fn count_progress(events: &[Event], command: Command, kind: ProgressKind) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Progress(p) if p.command == command && p.kind == kind))
        .count()
}

impl MediaSink for RecordingSink {
    fn configure_transport(&self, transport: &NegotiatedTransport) -> wfd::Result<()> {
        self.push(Event::Transport(transport.clone()));
        Ok(())
    }

    fn release_transport(&self) {
        self.push(Event::Released);
    }

    fn set_playback_state(&self, state: PlaybackState) {
        self.push(Event::State(state));
    }

    fn push_event(&self, event: SinkEvent) {
        self.push(Event::Sink(event));
    }

    fn set_rtp_base(&self, info: &RtpInfo) {
        self.push(Event::RtpBase(info.clone()));
    }

    fn stream_info_updated(&self, info: &StreamInfo) {
        self.push(Event::StreamInfo(*info));
    }

    fn av_format_changing(&self, timing: &AvFormatChangeTiming) {
        self.push(Event::FormatChange(*timing));
    }

    fn progress(&self, progress: &Progress) {
        self.push(Event::Progress(progress.clone()));
    }

    fn error(&self, error: &WfdError) {
        self.push(Event::Error(error.to_string()));
    }
}

pub const FULL_PUBLIC: &str =
    "org.wfa.wfd1.0, SETUP, TEARDOWN, PLAY, PAUSE, GET_PARAMETER, SET_PARAMETER";

pub const PRESENTATION: &str = "rtsp://127.0.0.1/wfd1.0/streamid=0";

pub fn config(url: &str) -> SessionConfig {
    let mut config = SessionConfig::new(url);
    config.rtp_port = 19000;
    config.io_timeout = Duration::from_secs(5);
    config.retry = 3;
    config.retry_delay = Duration::from_millis(20);
    config
}

pub fn start(url: &str) -> (Dispatcher, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let dispatcher = Dispatcher::start(config(url), sink.clone());
    (dispatcher, sink)
}

/// Drive M1 through M6 from the source side. The source advertises
/// `public` (no `Public` header at all when empty) and gives the session
/// `timeout` seconds.
pub fn handshake(peer: &mut Peer, public: &str, timeout: u64) {
    // M1
    let m1 = peer.request("OPTIONS", "*", &[("Require", "org.wfa.wfd1.0")], "");
    assert!(m1.is_ok());

    // M2
    let m2 = peer.read_request("OPTIONS * RTSP/1.0");
    assert_eq!(m2.header("Require"), Some("org.wfa.wfd1.0"));
    if public.is_empty() {
        peer.respond(&m2, "200 OK", &[]);
    } else {
        peer.respond(&m2, "200 OK", &[("Public", public)]);
    }

    // M3
    let m3 = peer.request(
        "GET_PARAMETER",
        "rtsp://localhost/wfd1.0",
        &[],
        "wfd_audio_codecs\r\nwfd_video_formats\r\nwfd_client_rtp_ports\r\n",
    );
    assert!(m3.is_ok());

    // M4
    let m4_body = format!(
        "wfd_audio_codecs: AAC 00000001 00\r\n\
         wfd_video_formats: 00 00 02 02 00000020 00000000 00000000 00 0000 0000 00 none none\r\n\
         wfd_presentation_URL: {} none\r\n\
         wfd_client_rtp_ports: RTP/AVP/UDP;unicast 19000 0 mode=play\r\n",
        PRESENTATION
    );
    let m4 = peer.request("SET_PARAMETER", "rtsp://localhost/wfd1.0", &[], &m4_body);
    assert!(m4.is_ok());

    // M5: the acknowledgement must come back before SETUP.
    let m5 = peer.request(
        "SET_PARAMETER",
        "rtsp://localhost/wfd1.0",
        &[],
        "wfd_trigger_method: SETUP\r\n",
    );
    assert!(m5.is_ok());

    // M6
    let m6 = peer.read_request(&format!("SETUP {} RTSP/1.0", PRESENTATION));
    assert_eq!(
        m6.header("Transport"),
        Some("RTP/AVP/UDP;unicast;client_port=19000-19001")
    );
    let session = format!("6B8B4567;timeout={}", timeout);
    peer.respond(
        &m6,
        "200 OK",
        &[
            ("Session", &session),
            (
                "Transport",
                "RTP/AVP/UDP;unicast;client_port=19000-19001;server_port=5000-5001",
            ),
        ],
    );
}

/// Open a session and run the handshake; returns once OPEN completed.
///
/// Bind the result in this order so the peer is dropped before the
/// dispatcher and shutdown does not wait on an unanswered TEARDOWN.
pub fn open_session(public: &str) -> (Dispatcher, Arc<RecordingSink>, Source, Peer) {
    let source = Source::bind();
    let (dispatcher, sink) = start(&source.url());
    dispatcher.open();
    let mut peer = source.accept();
    handshake(&mut peer, public, 30);
    assert!(sink.wait_progress(Command::Open, ProgressKind::Complete));
    (dispatcher, sink, source, peer)
}
