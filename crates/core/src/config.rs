use std::time::Duration;

use crate::error::{Result, WfdError};
use crate::wfd::{
    AudioCodec, AudioCodecs, AudioFormat, ConnectorType, ContentProtection, CoupledSink,
    DisplayEdid, H264Codec, Hdcp2Spec, StandbyResumeCapability, Video3dFormats, VideoFormats,
};

/// Identification string sent in `User-Agent` and `Server` headers.
pub const USER_AGENT: &str = "wfd-rtsp/0.1";

/// Default first RTP port advertised in `wfd_client_rtp_ports`.
pub const DEFAULT_RTP_PORT: u16 = 19000;

/// Session-level configuration consumed by the negotiation engine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Control-channel URL of the source, e.g. `rtsp://192.168.49.1:7236/wfd1.0`.
    pub url: String,
    /// Maximum number of connection attempts.
    pub retry: u32,
    /// Pause between two connection attempts.
    pub retry_delay: Duration,
    /// TCP connect timeout for one attempt.
    pub tcp_timeout: Duration,
    /// Upper bound for one blocking send or receive.
    pub io_timeout: Duration,
    /// Granularity at which blocked I/O checks for a flush request.
    pub poll_interval: Duration,
    /// Extra time allowed past the session timeout before the peer is
    /// considered gone.
    pub keepalive_grace: Duration,
    /// First RTP port of the local pair. `0` picks an available even port.
    pub rtp_port: u16,
    /// Maximum RTP packet size hint passed to the media transport.
    pub packet_size: u32,
    pub user_agent: String,
    pub audio_codecs: AudioCodecs,
    pub video_formats: VideoFormats,
    pub video_3d_formats: Video3dFormats,
    pub hdcp: Option<Hdcp2Spec>,
    pub edid: Option<DisplayEdid>,
    pub coupled_sink: CoupledSink,
    pub connector_type: Option<u8>,
    pub standby_resume: bool,
}

impl SessionConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }

    /// Configured local RTP/RTCP pair, `None` when a port should be picked.
    ///
    /// The RTP port must be even so that RTCP gets the odd port above it.
    pub fn rtp_ports(&self) -> Result<Option<(u16, u16)>> {
        match self.rtp_port {
            0 => Ok(None),
            port if port % 2 != 0 => Err(WfdError::InvalidConfig(format!(
                "RTP port {} is odd",
                port
            ))),
            port => Ok(Some((port, port + 1))),
        }
    }

    pub(crate) fn content_protection(&self) -> ContentProtection {
        ContentProtection { hdcp: self.hdcp }
    }

    pub(crate) fn connector(&self) -> ConnectorType {
        ConnectorType {
            connector: self.connector_type,
        }
    }

    pub(crate) fn standby_resume_capability(&self) -> StandbyResumeCapability {
        StandbyResumeCapability {
            supported: self.standby_resume,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            retry: 10,
            retry_delay: Duration::from_millis(200),
            tcp_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            keepalive_grace: Duration::from_secs(5),
            rtp_port: DEFAULT_RTP_PORT,
            packet_size: 1500,
            user_agent: USER_AGENT.to_string(),
            audio_codecs: AudioCodecs {
                codecs: vec![
                    AudioCodec {
                        format: AudioFormat::Lpcm,
                        modes: 0x0000_0003,
                        latency: 0,
                    },
                    AudioCodec {
                        format: AudioFormat::Aac,
                        modes: 0x0000_000f,
                        latency: 0,
                    },
                    AudioCodec {
                        format: AudioFormat::Ac3,
                        modes: 0x0000_0007,
                        latency: 0,
                    },
                ],
            },
            video_formats: VideoFormats {
                native: 0x00,
                preferred_display_mode_supported: 0x00,
                codecs: vec![H264Codec {
                    // Constrained Baseline, level 3.1
                    profile: 0x01,
                    level: 0x02,
                    cea_support: 0x0001_ffff,
                    vesa_support: 0x1fff_ffff,
                    hh_support: 0x0000_0fff,
                    latency: 0,
                    min_slice_size: 0,
                    slice_enc_params: 0,
                    frame_rate_control: 0,
                    max_hres: None,
                    max_vres: None,
                }],
            },
            video_3d_formats: Video3dFormats::default(),
            hdcp: None,
            edid: None,
            coupled_sink: CoupledSink::default(),
            connector_type: None,
            standby_resume: false,
        }
    }
}
