//! Wi-Fi Display parameter bodies (`text/parameters`).
//!
//! WFD carries its capability exchange inside the bodies of RTSP
//! GET_PARAMETER and SET_PARAMETER messages, one parameter per line:
//!
//! ```text
//! wfd_audio_codecs: LPCM 00000003 00, AAC 0000000f 00\r\n
//! wfd_client_rtp_ports: RTP/AVP/UDP;unicast 19000 0 mode=play\r\n
//! wfd_trigger_method: SETUP\r\n
//! ```
//!
//! A GET_PARAMETER query lists bare parameter names; the answer repeats
//! each queried name with its value. Numbers are fixed-width hex, except
//! ports which are decimal.
//!
//! Parsing is fail-open: unknown lines are ignored (peers send vendor
//! extensions), and a malformed field reads as zero without affecting
//! the other fields or lines.

mod fields;
pub mod formats;
pub mod params;

use params::{Param, read_value, write_line};
pub use params::{
    AudioCodec, AudioCodecs, AudioFormat, AudioRoute, AvFormatChangeTiming, ClientRtpPorts,
    ConnectorType, ContentProtection, CoupledSink, CoupledSinkCap, DisplayEdid, H264Codec,
    H264Codec3d, Hdcp2Spec, HdcpVersion, I2c, LowerTransport, PreferredDisplayMode,
    PresentationUrl, StandbyResumeCapability, TriggerMethod, Video3dFormats, VideoFormats,
};

/// MIME type of WFD parameter bodies.
pub const CONTENT_TYPE: &str = "text/parameters";

/// One parsed or to-be-serialized parameter body.
///
/// Every group is independently optional; `Some` means the line was
/// present, even if it carried `none`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WfdMessage {
    pub audio_codecs: Option<AudioCodecs>,
    pub video_formats: Option<VideoFormats>,
    pub video_3d_formats: Option<Video3dFormats>,
    pub content_protection: Option<ContentProtection>,
    pub display_edid: Option<DisplayEdid>,
    pub coupled_sink: Option<CoupledSink>,
    pub trigger_method: Option<TriggerMethod>,
    pub presentation_url: Option<PresentationUrl>,
    pub client_rtp_ports: Option<ClientRtpPorts>,
    pub route: Option<AudioRoute>,
    pub i2c: Option<I2c>,
    pub av_format_change_timing: Option<AvFormatChangeTiming>,
    pub preferred_display_mode: Option<PreferredDisplayMode>,
    pub standby_resume_capability: Option<StandbyResumeCapability>,
    pub standby: bool,
    pub connector_type: Option<ConnectorType>,
    pub idr_request: bool,
}

impl WfdMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a parameter body. Never fails; see the module docs.
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let mut msg = Self::default();

        for line in text.split(['\r', '\n']) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, value) = match line.split_once(':') {
                Some((name, value)) => (name.trim_end(), value),
                None => (line, ""),
            };
            msg.read_line(name, value);
        }
        msg
    }

    fn read_line(&mut self, name: &str, value: &str) {
        match name {
            params::AUDIO_CODECS => self.audio_codecs = Some(read_value(value)),
            params::VIDEO_FORMATS => self.video_formats = Some(read_value(value)),
            params::VIDEO_3D_FORMATS => self.video_3d_formats = Some(read_value(value)),
            params::CONTENT_PROTECTION => self.content_protection = Some(read_value(value)),
            params::DISPLAY_EDID => self.display_edid = Some(read_value(value)),
            params::COUPLED_SINK => self.coupled_sink = Some(read_value(value)),
            params::TRIGGER_METHOD => {
                self.trigger_method = keyword(name, value, TriggerMethod::from_token)
            }
            params::PRESENTATION_URL => self.presentation_url = Some(read_value(value)),
            params::CLIENT_RTP_PORTS => self.client_rtp_ports = Some(read_value(value)),
            params::ROUTE => self.route = keyword(name, value, AudioRoute::from_token),
            params::I2C => self.i2c = Some(read_value(value)),
            params::AV_FORMAT_CHANGE_TIMING => {
                self.av_format_change_timing = Some(read_value(value))
            }
            params::PREFERRED_DISPLAY_MODE => {
                self.preferred_display_mode = Some(read_value(value))
            }
            params::STANDBY_RESUME_CAPABILITY => {
                self.standby_resume_capability = Some(read_value(value))
            }
            params::STANDBY => self.standby = true,
            params::CONNECTOR_TYPE => self.connector_type = Some(read_value(value)),
            params::IDR_REQUEST => self.idr_request = true,
            _ => tracing::trace!(name, "ignoring unknown parameter"),
        }
    }

    /// Serialize present groups in canonical order, one CRLF line each.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        opt_line(&mut out, &self.audio_codecs);
        opt_line(&mut out, &self.video_formats);
        opt_line(&mut out, &self.video_3d_formats);
        opt_line(&mut out, &self.content_protection);
        opt_line(&mut out, &self.display_edid);
        opt_line(&mut out, &self.coupled_sink);
        if let Some(method) = self.trigger_method {
            out.push_str(&format!("{}: {}\r\n", params::TRIGGER_METHOD, method.as_str()));
        }
        opt_line(&mut out, &self.presentation_url);
        opt_line(&mut out, &self.client_rtp_ports);
        if let Some(route) = self.route {
            out.push_str(&format!("{}: {}\r\n", params::ROUTE, route.as_str()));
        }
        opt_line(&mut out, &self.i2c);
        opt_line(&mut out, &self.av_format_change_timing);
        opt_line(&mut out, &self.preferred_display_mode);
        opt_line(&mut out, &self.standby_resume_capability);
        if self.standby {
            out.push_str(params::STANDBY);
            out.push_str("\r\n");
        }
        opt_line(&mut out, &self.connector_type);
        if self.idr_request {
            out.push_str(params::IDR_REQUEST);
            out.push_str("\r\n");
        }
        out
    }

    /// Names of the groups present, in canonical order.
    pub fn parameter_names(&self) -> Vec<&'static str> {
        [
            (self.audio_codecs.is_some(), params::AUDIO_CODECS),
            (self.video_formats.is_some(), params::VIDEO_FORMATS),
            (self.video_3d_formats.is_some(), params::VIDEO_3D_FORMATS),
            (self.content_protection.is_some(), params::CONTENT_PROTECTION),
            (self.display_edid.is_some(), params::DISPLAY_EDID),
            (self.coupled_sink.is_some(), params::COUPLED_SINK),
            (self.trigger_method.is_some(), params::TRIGGER_METHOD),
            (self.presentation_url.is_some(), params::PRESENTATION_URL),
            (self.client_rtp_ports.is_some(), params::CLIENT_RTP_PORTS),
            (self.route.is_some(), params::ROUTE),
            (self.i2c.is_some(), params::I2C),
            (self.av_format_change_timing.is_some(), params::AV_FORMAT_CHANGE_TIMING),
            (self.preferred_display_mode.is_some(), params::PREFERRED_DISPLAY_MODE),
            (
                self.standby_resume_capability.is_some(),
                params::STANDBY_RESUME_CAPABILITY,
            ),
            (self.standby, params::STANDBY),
            (self.connector_type.is_some(), params::CONNECTOR_TYPE),
            (self.idr_request, params::IDR_REQUEST),
        ]
        .into_iter()
        .filter_map(|(present, name)| present.then_some(name))
        .collect()
    }

    /// True when no group is present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build a GET_PARAMETER query body listing bare parameter names.
    pub fn query(names: &[&str]) -> String {
        names.iter().map(|name| format!("{}\r\n", name)).collect()
    }
}

fn opt_line<P: Param>(out: &mut String, param: &Option<P>) {
    if let Some(p) = param {
        write_line(out, p);
    }
}

fn keyword<T>(name: &str, value: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let token = value.split_whitespace().next()?;
    let parsed = parse(token);
    if parsed.is_none() {
        tracing::warn!(name, token, "unrecognized keyword");
    }
    parsed
}
