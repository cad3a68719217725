use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wfd::protocol::header::RtpInfo;
use wfd::session::NegotiatedTransport;
use wfd::wfd::AudioRoute;
use wfd::wfd::formats::StreamInfo;
use wfd::{
    Command, Dispatcher, MediaSink, PlaybackState, Progress, ProgressKind, SessionConfig,
    SinkEvent, SinkRequest, WfdError,
};

#[derive(Parser)]
#[command(
    name = "wfd-sink",
    about = "Wi-Fi Display sink control client: negotiates a session with a WFD source"
)]
struct Args {
    /// Control URL of the source
    #[arg(default_value = "rtsp://192.168.49.1:7236/wfd1.0")]
    url: String,

    /// Connection attempts before giving up
    #[arg(long, default_value_t = 10)]
    retry: u32,

    /// TCP connect timeout per attempt, in milliseconds
    #[arg(long, default_value_t = 5000)]
    tcp_timeout_ms: u64,

    /// First local RTP port, even (0 picks a free even port)
    #[arg(long, default_value_t = wfd::config::DEFAULT_RTP_PORT)]
    rtp_port: u16,

    /// Maximum RTP packet size hint
    #[arg(long, default_value_t = 1500)]
    packet_size: u32,

    /// Do not send PLAY once the session is set up
    #[arg(long)]
    no_play: bool,
}

/// Collaborator that only reports what the engine asks of it.
struct LoggingSink {
    /// Told whether OPEN reached READY.
    opened: Sender<bool>,
}

impl MediaSink for LoggingSink {
    fn configure_transport(&self, transport: &NegotiatedTransport) -> wfd::Result<()> {
        tracing::info!(
            source = %transport.source_host,
            rtp_port = transport.rtp_port,
            rtcp_port = transport.rtcp_port,
            server_port = ?transport.server_port,
            "receive RTP here"
        );
        Ok(())
    }

    fn set_playback_state(&self, state: PlaybackState) {
        tracing::info!(?state, "playback state");
    }

    fn push_event(&self, event: SinkEvent) {
        tracing::info!(?event, "downstream event");
    }

    fn set_rtp_base(&self, info: &RtpInfo) {
        tracing::info!(seq = ?info.seq, rtptime = ?info.rtptime, "RTP base");
    }

    fn stream_info_updated(&self, info: &StreamInfo) {
        if let Some(video) = &info.video {
            tracing::info!(
                width = video.mode.width,
                height = video.mode.height,
                framerate = video.mode.framerate,
                "video format"
            );
        }
        if let Some(audio) = &info.audio {
            tracing::info!(
                codec = %audio.format,
                channels = audio.channels,
                rate = audio.sample_rate,
                "audio format"
            );
        }
    }

    fn progress(&self, progress: &Progress) {
        tracing::debug!(
            command = %progress.command,
            kind = ?progress.kind,
            message = progress.message.as_deref().unwrap_or(""),
            "progress"
        );
        if progress.command == Command::Open && progress.kind != ProgressKind::Start {
            let _ = self.opened.send(progress.kind == ProgressKind::Complete);
        }
    }

    fn error(&self, error: &WfdError) {
        tracing::error!(%error, "session error");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = SessionConfig::new(&args.url);
    config.retry = args.retry;
    config.tcp_timeout = Duration::from_millis(args.tcp_timeout_ms);
    config.rtp_port = args.rtp_port;
    config.packet_size = args.packet_size;
    if let Err(e) = config.rtp_ports() {
        eprintln!("{}", e);
        return;
    }

    let (opened, open_result) = mpsc::channel();
    let mut dispatcher = Dispatcher::start(config, Arc::new(LoggingSink { opened }));
    dispatcher.open();
    match open_result.recv() {
        Ok(true) if !args.no_play => dispatcher.play(),
        Ok(true) => {}
        _ => {
            eprintln!("could not open a session with {}", args.url);
            dispatcher.shutdown();
            return;
        }
    }

    println!("commands: play, pause, idr, standby, route <primary|secondary>, connector <n>, state, quit");
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("play"), _) => dispatcher.play(),
            (Some("pause"), _) => dispatcher.pause(),
            (Some("idr"), _) => dispatcher.request(SinkRequest::IdrRequest),
            (Some("standby"), _) => dispatcher.request(SinkRequest::Standby),
            (Some("route"), Some(target)) => match AudioRoute::from_token(target) {
                Some(route) => dispatcher.request(SinkRequest::Route(route)),
                None => eprintln!("route must be primary or secondary"),
            },
            (Some("connector"), Some(n)) => match n.parse() {
                Ok(connector) => dispatcher.request(SinkRequest::ConnectorType(connector)),
                Err(_) => eprintln!("connector must be a number"),
            },
            (Some("state"), _) => {
                let session = dispatcher.session();
                println!(
                    "state: {:?} paused: {} methods: {} source params: {:?}",
                    session.state,
                    session.paused,
                    session.methods.to_header_value(false),
                    session.peer_params.parameter_names()
                );
            }
            (Some("quit" | "exit"), _) => break,
            (None, _) => {}
            (Some(other), _) => eprintln!("unknown command: {}", other),
        }
    }

    dispatcher.shutdown();
}
