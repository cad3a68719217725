//! Parameter groups carried in WFD `text/parameters` bodies.
//!
//! Each group serializes to the value part of one `name: fields` line.
//! A group equal to its `Default` has no fields set and is written as the
//! literal `none`; parsing `none` (or a bare parameter name, as used in
//! GET_PARAMETER queries) yields that default value, so presence of a
//! group is preserved even when it carries nothing.

use std::fmt;

use super::fields::{Fields, decode_hex, encode_hex, push_opt_hex4};

pub const AUDIO_CODECS: &str = "wfd_audio_codecs";
pub const VIDEO_FORMATS: &str = "wfd_video_formats";
pub const VIDEO_3D_FORMATS: &str = "wfd_3d_video_formats";
pub const CONTENT_PROTECTION: &str = "wfd_content_protection";
pub const DISPLAY_EDID: &str = "wfd_display_edid";
pub const COUPLED_SINK: &str = "wfd_coupled_sink";
pub const TRIGGER_METHOD: &str = "wfd_trigger_method";
pub const PRESENTATION_URL: &str = "wfd_presentation_URL";
pub const CLIENT_RTP_PORTS: &str = "wfd_client_rtp_ports";
pub const ROUTE: &str = "wfd_route";
pub const I2C: &str = "wfd_I2C";
pub const AV_FORMAT_CHANGE_TIMING: &str = "wfd_av_format_change_timing";
pub const PREFERRED_DISPLAY_MODE: &str = "wfd_preferred_display_mode";
pub const STANDBY_RESUME_CAPABILITY: &str = "wfd_standby_resume_capability";
pub const STANDBY: &str = "wfd_standby";
pub const CONNECTOR_TYPE: &str = "wfd_connector_type";
pub const IDR_REQUEST: &str = "wfd_idr_request";

/// Size of one EDID block in bytes.
pub const EDID_BLOCK_SIZE: usize = 128;
/// Largest block count `wfd_display_edid` can announce.
pub const MAX_EDID_BLOCKS: usize = 256;

/// A parameter group with a fixed line name and field syntax.
pub(crate) trait Param: Default + PartialEq + Sized {
    const NAME: &'static str;

    /// Append the fields, each preceded by a single space.
    fn write_fields(&self, out: &mut String);

    /// Read the fields from the value part of the line (never `none`).
    fn read_fields(value: &str) -> Self;

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Audio codec family advertised in `wfd_audio_codecs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Lpcm,
    Aac,
    Ac3,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lpcm => "LPCM",
            Self::Aac => "AAC",
            Self::Ac3 => "AC3",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "LPCM" => Some(Self::Lpcm),
            "AAC" => Some(Self::Aac),
            "AC3" => Some(Self::Ac3),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `format modes latency` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioCodec {
    pub format: AudioFormat,
    /// Bitmask of supported sample-rate/channel modes (8 hex digits).
    pub modes: u32,
    /// Decoder latency in 5 ms units (2 hex digits).
    pub latency: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioCodecs {
    pub codecs: Vec<AudioCodec>,
}

impl Param for AudioCodecs {
    const NAME: &'static str = AUDIO_CODECS;

    fn write_fields(&self, out: &mut String) {
        for (i, c) in self.codecs.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&format!(" {} {:08x} {:02x}", c.format, c.modes, c.latency));
        }
    }

    fn read_fields(value: &str) -> Self {
        let mut codecs = Vec::new();
        for entry in value.split(',') {
            let mut f = Fields::new(Self::NAME, entry);
            let Some(token) = f.word() else { continue };
            let Some(format) = AudioFormat::from_token(token) else {
                tracing::warn!(token, "ignoring unknown audio format");
                continue;
            };
            codecs.push(AudioCodec {
                format,
                modes: f.hex(),
                latency: f.hex(),
            });
        }
        Self { codecs }
    }
}

/// H.264 codec capability shared by `wfd_video_formats` and
/// `wfd_preferred_display_mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct H264Codec {
    pub profile: u8,
    pub level: u8,
    pub cea_support: u32,
    pub vesa_support: u32,
    pub hh_support: u32,
    pub latency: u8,
    pub min_slice_size: u16,
    pub slice_enc_params: u16,
    pub frame_rate_control: u8,
    pub max_hres: Option<u16>,
    pub max_vres: Option<u16>,
}

impl H264Codec {
    fn write(&self, out: &mut String) {
        out.push_str(&format!(
            " {:02x} {:02x} {:08x} {:08x} {:08x} {:02x} {:04x} {:04x} {:02x}",
            self.profile,
            self.level,
            self.cea_support,
            self.vesa_support,
            self.hh_support,
            self.latency,
            self.min_slice_size,
            self.slice_enc_params,
            self.frame_rate_control,
        ));
        push_opt_hex4(out, self.max_hres);
        push_opt_hex4(out, self.max_vres);
    }

    fn read(f: &mut Fields<'_>) -> Self {
        Self {
            profile: f.hex(),
            level: f.hex(),
            cea_support: f.hex(),
            vesa_support: f.hex(),
            hh_support: f.hex(),
            latency: f.hex(),
            min_slice_size: f.hex(),
            slice_enc_params: f.hex(),
            frame_rate_control: f.hex(),
            max_hres: f.hex_or_none(),
            max_vres: f.hex_or_none(),
        }
    }
}

/// `wfd_video_formats`: native resolution plus one or more H.264 codecs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoFormats {
    /// Low 3 bits select the resolution table, upper 5 bits the index.
    pub native: u8,
    pub preferred_display_mode_supported: u8,
    pub codecs: Vec<H264Codec>,
}

impl Param for VideoFormats {
    const NAME: &'static str = VIDEO_FORMATS;

    fn write_fields(&self, out: &mut String) {
        out.push_str(&format!(
            " {:02x} {:02x}",
            self.native, self.preferred_display_mode_supported
        ));
        for (i, codec) in self.codecs.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            codec.write(out);
        }
    }

    fn read_fields(value: &str) -> Self {
        let mut entries = value.split(',');
        let mut f = Fields::new(Self::NAME, entries.next().unwrap_or_default());
        let mut formats = Self {
            native: f.hex(),
            preferred_display_mode_supported: f.hex(),
            codecs: Vec::new(),
        };
        if !f.is_exhausted() {
            formats.codecs.push(H264Codec::read(&mut f));
        }
        for entry in entries {
            formats
                .codecs
                .push(H264Codec::read(&mut Fields::new(Self::NAME, entry)));
        }
        formats
    }
}

/// One H.264 entry of `wfd_3d_video_formats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct H264Codec3d {
    pub profile: u8,
    pub level: u8,
    /// 3D capability bitmap (16 hex digits).
    pub video_capability: u64,
    pub latency: u8,
    pub min_slice_size: u16,
    pub slice_enc_params: u16,
    pub frame_rate_control: u8,
    pub max_hres: Option<u16>,
    pub max_vres: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Video3dFormats {
    pub native: u8,
    pub preferred_display_mode_supported: u8,
    pub codecs: Vec<H264Codec3d>,
}

impl Param for Video3dFormats {
    const NAME: &'static str = VIDEO_3D_FORMATS;

    fn write_fields(&self, out: &mut String) {
        out.push_str(&format!(
            " {:02x} {:02x}",
            self.native, self.preferred_display_mode_supported
        ));
        for (i, c) in self.codecs.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&format!(
                " {:02x} {:02x} {:016x} {:02x} {:04x} {:04x} {:02x}",
                c.profile,
                c.level,
                c.video_capability,
                c.latency,
                c.min_slice_size,
                c.slice_enc_params,
                c.frame_rate_control,
            ));
            push_opt_hex4(out, c.max_hres);
            push_opt_hex4(out, c.max_vres);
        }
    }

    fn read_fields(value: &str) -> Self {
        fn codec(f: &mut Fields<'_>) -> H264Codec3d {
            H264Codec3d {
                profile: f.hex(),
                level: f.hex(),
                video_capability: f.hex(),
                latency: f.hex(),
                min_slice_size: f.hex(),
                slice_enc_params: f.hex(),
                frame_rate_control: f.hex(),
                max_hres: f.hex_or_none(),
                max_vres: f.hex_or_none(),
            }
        }

        let mut entries = value.split(',');
        let mut f = Fields::new(Self::NAME, entries.next().unwrap_or_default());
        let mut formats = Self {
            native: f.hex(),
            preferred_display_mode_supported: f.hex(),
            codecs: Vec::new(),
        };
        if !f.is_exhausted() {
            formats.codecs.push(codec(&mut f));
        }
        for entry in entries {
            formats.codecs.push(codec(&mut Fields::new(Self::NAME, entry)));
        }
        formats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdcpVersion {
    V2_0,
    V2_1,
    V2_2,
}

impl HdcpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2_0 => "HDCP2.0",
            Self::V2_1 => "HDCP2.1",
            Self::V2_2 => "HDCP2.2",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "HDCP2.0" => Some(Self::V2_0),
            "HDCP2.1" => Some(Self::V2_1),
            "HDCP2.2" => Some(Self::V2_2),
            _ => None,
        }
    }
}

/// HDCP 2.x capability: version and the TCP port of the HDCP control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hdcp2Spec {
    pub version: HdcpVersion,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentProtection {
    pub hdcp: Option<Hdcp2Spec>,
}

impl Param for ContentProtection {
    const NAME: &'static str = CONTENT_PROTECTION;

    fn write_fields(&self, out: &mut String) {
        if let Some(hdcp) = &self.hdcp {
            out.push_str(&format!(" {} port={}", hdcp.version.as_str(), hdcp.port));
        }
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        let version = f.word().and_then(HdcpVersion::from_token);
        let port = f.word().and_then(|w| w.strip_prefix("port="));
        match version {
            Some(version) => Self {
                hdcp: Some(Hdcp2Spec {
                    version,
                    port: f.number(port, 10),
                }),
            },
            None => {
                tracing::warn!(value, "unrecognized content protection");
                Self::default()
            }
        }
    }
}

/// `wfd_display_edid`: block count followed by the raw EDID bytes.
///
/// The payload length is always a multiple of [`EDID_BLOCK_SIZE`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayEdid {
    payload: Vec<u8>,
}

impl DisplayEdid {
    /// Wrap an EDID blob. Returns `None` unless the length is a whole,
    /// non-zero number of 128-byte blocks.
    pub fn new(payload: Vec<u8>) -> Option<Self> {
        if payload.is_empty() || payload.len() % EDID_BLOCK_SIZE != 0 {
            return None;
        }
        Some(Self { payload })
    }

    pub fn block_count(&self) -> usize {
        self.payload.len() / EDID_BLOCK_SIZE
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl Param for DisplayEdid {
    const NAME: &'static str = DISPLAY_EDID;

    fn write_fields(&self, out: &mut String) {
        out.push_str(&format!(
            " {:04x} {}",
            self.block_count(),
            encode_hex(&self.payload)
        ));
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        let count: usize = f.hex();
        if count == 0 {
            return Self::default();
        }
        if count > MAX_EDID_BLOCKS {
            tracing::warn!(count, "EDID block count out of range");
            return Self::default();
        }
        let payload = f.word().and_then(decode_hex).unwrap_or_default();
        if count.checked_mul(EDID_BLOCK_SIZE) != Some(payload.len()) {
            tracing::warn!(
                count,
                bytes = payload.len(),
                "EDID payload does not match block count"
            );
            return Self::default();
        }
        Self { payload }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoupledSinkCap {
    pub status: u8,
    /// EUI-64 address of the coupled peer.
    pub address: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoupledSink {
    pub cap: Option<CoupledSinkCap>,
}

impl Param for CoupledSink {
    const NAME: &'static str = COUPLED_SINK;

    fn write_fields(&self, out: &mut String) {
        if let Some(cap) = &self.cap {
            out.push_str(&format!(" {:02x}", cap.status));
            match cap.address {
                Some(addr) => out.push_str(&format!(" {:016x}", addr)),
                None => out.push_str(" none"),
            }
        }
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        Self {
            cap: Some(CoupledSinkCap {
                status: f.hex(),
                address: f.hex_or_none(),
            }),
        }
    }
}

/// Action requested by the peer through `wfd_trigger_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMethod {
    Setup,
    Play,
    Pause,
    Teardown,
}

impl TriggerMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Teardown => "TEARDOWN",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "SETUP" => Some(Self::Setup),
            "PLAY" => Some(Self::Play),
            "PAUSE" => Some(Self::Pause),
            "TEARDOWN" => Some(Self::Teardown),
            _ => None,
        }
    }
}

/// `wfd_presentation_URL`: control URLs for the primary and secondary sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationUrl {
    pub url0: Option<String>,
    pub url1: Option<String>,
}

impl Param for PresentationUrl {
    const NAME: &'static str = PRESENTATION_URL;

    fn write_fields(&self, out: &mut String) {
        for url in [&self.url0, &self.url1] {
            out.push(' ');
            out.push_str(url.as_deref().unwrap_or("none"));
        }
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        Self {
            url0: f.word_or_none(),
            url1: f.word_or_none(),
        }
    }
}

/// Delivery mechanism under the RTP profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LowerTransport {
    #[default]
    Udp,
    Tcp,
}

impl LowerTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
        }
    }
}

/// `wfd_client_rtp_ports`: where the sink receives RTP.
///
/// Written as `RTP/AVP/UDP;unicast 19000 0 mode=play`. The
/// `profile;unicast;client_port=A-B` spelling is accepted on input too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRtpPorts {
    /// RTP profile without the lower transport, e.g. `RTP/AVP`.
    pub profile: String,
    pub lower_transport: LowerTransport,
    pub unicast: bool,
    pub rtp_port0: u16,
    pub rtp_port1: u16,
    pub mode: String,
}

impl ClientRtpPorts {
    /// Unicast UDP offer in play mode.
    pub fn udp(rtp_port0: u16, rtp_port1: u16) -> Self {
        Self {
            profile: "RTP/AVP".to_string(),
            lower_transport: LowerTransport::Udp,
            unicast: true,
            rtp_port0,
            rtp_port1,
            mode: "play".to_string(),
        }
    }
}

impl Param for ClientRtpPorts {
    const NAME: &'static str = CLIENT_RTP_PORTS;

    fn write_fields(&self, out: &mut String) {
        out.push_str(&format!(
            " {}/{};{} {} {} mode={}",
            self.profile,
            self.lower_transport.as_str(),
            if self.unicast { "unicast" } else { "multicast" },
            self.rtp_port0,
            self.rtp_port1,
            self.mode,
        ));
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        let mut ports = Self::default();
        let mut spec = f.word().unwrap_or_default().split(';');

        let profile = spec.next().unwrap_or_default();
        match profile.rsplit_once('/') {
            Some((head, "UDP")) => ports.profile = head.to_string(),
            Some((head, "TCP")) => {
                ports.profile = head.to_string();
                ports.lower_transport = LowerTransport::Tcp;
            }
            _ => ports.profile = profile.to_string(),
        }

        let mut bare_ports = Vec::new();
        for part in spec {
            match part {
                "unicast" => ports.unicast = true,
                "multicast" => ports.unicast = false,
                _ => {
                    if let Some(range) = part.strip_prefix("client_port=") {
                        let mut it = range.splitn(2, '-');
                        ports.rtp_port0 = f.number(it.next(), 10);
                        if let Some(p1) = it.next() {
                            ports.rtp_port1 = f.number(Some(p1), 10);
                        }
                    }
                }
            }
        }

        while let Some(token) = f.word() {
            if let Some(mode) = token.strip_prefix("mode=") {
                ports.mode = mode.to_string();
            } else {
                bare_ports.push(token);
            }
        }
        if let Some(&p0) = bare_ports.first() {
            ports.rtp_port0 = f.number(Some(p0), 10);
        }
        if let Some(&p1) = bare_ports.get(1) {
            ports.rtp_port1 = f.number(Some(p1), 10);
        }
        ports
    }
}

/// Audio route requested through `wfd_route`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRoute {
    Primary,
    Secondary,
}

impl AudioRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// `wfd_I2C`: TCP port of the I2C read/write channel (decimal).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct I2c {
    pub port: Option<u16>,
}

impl Param for I2c {
    const NAME: &'static str = I2C;

    fn write_fields(&self, out: &mut String) {
        if let Some(port) = self.port {
            out.push_str(&format!(" {}", port));
        }
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        Self {
            port: Some(f.dec()),
        }
    }
}

/// `wfd_av_format_change_timing`: 33-bit PTS/DTS as 10 hex digits each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvFormatChangeTiming {
    pub pts: u64,
    pub dts: u64,
}

impl Param for AvFormatChangeTiming {
    const NAME: &'static str = AV_FORMAT_CHANGE_TIMING;

    fn write_fields(&self, out: &mut String) {
        out.push_str(&format!(" {:010x} {:010x}", self.pts, self.dts));
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        Self {
            pts: f.hex(),
            dts: f.hex(),
        }
    }
}

/// `wfd_preferred_display_mode`: explicit timing plus the codec to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreferredDisplayMode {
    /// Pixel clock in 10 kHz units (6 hex digits).
    pub pixel_clock: u32,
    pub h: u16,
    pub hb: u16,
    pub hspol_hsoff: u16,
    pub hsw: u16,
    pub v: u16,
    pub vb: u16,
    pub vspol_vsoff: u16,
    pub vsw: u16,
    pub vbs3d: u8,
    pub r: u8,
    pub v2d_s3d_modes: u8,
    pub p_depth: u8,
    pub codec: H264Codec,
}

impl Param for PreferredDisplayMode {
    const NAME: &'static str = PREFERRED_DISPLAY_MODE;

    fn write_fields(&self, out: &mut String) {
        out.push_str(&format!(
            " {:06x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:04x} {:02x} {:02x} {:02x} {:02x}",
            self.pixel_clock,
            self.h,
            self.hb,
            self.hspol_hsoff,
            self.hsw,
            self.v,
            self.vb,
            self.vspol_vsoff,
            self.vsw,
            self.vbs3d,
            self.r,
            self.v2d_s3d_modes,
            self.p_depth,
        ));
        self.codec.write(out);
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        Self {
            pixel_clock: f.hex(),
            h: f.hex(),
            hb: f.hex(),
            hspol_hsoff: f.hex(),
            hsw: f.hex(),
            v: f.hex(),
            vb: f.hex(),
            vspol_vsoff: f.hex(),
            vsw: f.hex(),
            vbs3d: f.hex(),
            r: f.hex(),
            v2d_s3d_modes: f.hex(),
            p_depth: f.hex(),
            codec: H264Codec::read(&mut f),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandbyResumeCapability {
    pub supported: bool,
}

impl Param for StandbyResumeCapability {
    const NAME: &'static str = STANDBY_RESUME_CAPABILITY;

    fn write_fields(&self, out: &mut String) {
        if self.supported {
            out.push_str(" supported");
        }
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        Self {
            supported: f.word() == Some("supported"),
        }
    }
}

/// `wfd_connector_type`: active connector (5 = HDMI, 7 = embedded, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectorType {
    pub connector: Option<u8>,
}

impl Param for ConnectorType {
    const NAME: &'static str = CONNECTOR_TYPE;

    fn write_fields(&self, out: &mut String) {
        if let Some(connector) = self.connector {
            out.push_str(&format!(" {:02x}", connector));
        }
    }

    fn read_fields(value: &str) -> Self {
        let mut f = Fields::new(Self::NAME, value);
        Self {
            connector: Some(f.hex()),
        }
    }
}

/// Serialize one group as a full `name: fields\r\n` line.
pub(crate) fn write_line<P: Param>(out: &mut String, param: &P) {
    out.push_str(P::NAME);
    out.push(':');
    if param.is_empty() {
        out.push_str(" none");
    } else {
        param.write_fields(out);
    }
    out.push_str("\r\n");
}

/// Parse the value part of a line into a group, honouring `none`.
pub(crate) fn read_value<P: Param>(value: &str) -> P {
    let value = value.trim();
    match value.split_whitespace().next() {
        None | Some("none") => P::default(),
        Some(_) => P::read_fields(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line<P: Param>(p: &P) -> String {
        let mut out = String::new();
        write_line(&mut out, p);
        out
    }

    #[test]
    fn audio_codec_list() {
        let codecs: AudioCodecs = read_value("LPCM 00000003 00, AAC 0000000f 00, AC3 00000007 00");
        assert_eq!(codecs.codecs.len(), 3);
        assert_eq!(codecs.codecs[1].format, AudioFormat::Aac);
        assert_eq!(codecs.codecs[1].modes, 0x0f);
        assert_eq!(
            line(&codecs),
            "wfd_audio_codecs: LPCM 00000003 00, AAC 0000000f 00, AC3 00000007 00\r\n"
        );
    }

    #[test]
    fn unknown_audio_format_is_skipped() {
        let codecs: AudioCodecs = read_value("DTS 00000001 00, AAC 00000001 00");
        assert_eq!(codecs.codecs.len(), 1);
        assert_eq!(codecs.codecs[0].format, AudioFormat::Aac);
    }

    #[test]
    fn video_formats_fixed_width() {
        let formats: VideoFormats =
            read_value("00 00 02 04 0001ffff 1fffffff 00000fff 00 0000 0000 11 none none");
        assert_eq!(formats.codecs.len(), 1);
        let codec = &formats.codecs[0];
        assert_eq!(codec.profile, 0x02);
        assert_eq!(codec.level, 0x04);
        assert_eq!(codec.cea_support, 0x0001ffff);
        assert_eq!(codec.frame_rate_control, 0x11);
        assert_eq!(codec.max_hres, None);
        assert_eq!(
            line(&formats),
            "wfd_video_formats: 00 00 02 04 0001ffff 1fffffff 00000fff 00 0000 0000 11 none none\r\n"
        );
    }

    #[test]
    fn video_formats_multiple_codecs() {
        let formats: VideoFormats = read_value(
            "08 01 01 02 00000020 00000000 00000000 00 0000 0000 00 0500 02d0, 02 04 00000080 00000000 00000000 00 0000 0000 00 none none",
        );
        assert_eq!(formats.native, 0x08);
        assert_eq!(formats.codecs.len(), 2);
        assert_eq!(formats.codecs[0].max_hres, Some(0x500));
        assert_eq!(formats.codecs[1].cea_support, 0x80);
    }

    #[test]
    fn video_formats_without_codecs() {
        let formats = VideoFormats {
            native: 0x40,
            preferred_display_mode_supported: 0,
            codecs: Vec::new(),
        };
        assert_eq!(line(&formats), "wfd_video_formats: 40 00\r\n");
        let parsed: VideoFormats = read_value("40 00");
        assert_eq!(parsed, formats);

        let formats3d: Video3dFormats = read_value("80 00");
        assert_eq!(formats3d.native, 0x80);
        assert!(formats3d.codecs.is_empty());
    }

    #[test]
    fn content_protection() {
        let cp: ContentProtection = read_value("HDCP2.1 port=1189");
        assert_eq!(
            cp.hdcp,
            Some(Hdcp2Spec {
                version: HdcpVersion::V2_1,
                port: 1189
            })
        );
        assert_eq!(line(&cp), "wfd_content_protection: HDCP2.1 port=1189\r\n");
        assert_eq!(
            line(&ContentProtection::default()),
            "wfd_content_protection: none\r\n"
        );
    }

    #[test]
    fn edid_length_must_match_block_count() {
        let blob = "00".repeat(EDID_BLOCK_SIZE);
        let ok: DisplayEdid = read_value(&format!("0001 {}", blob));
        assert_eq!(ok.block_count(), 1);

        let short: DisplayEdid = read_value(&format!("0002 {}", blob));
        assert_eq!(short, DisplayEdid::default());

        let zero: DisplayEdid = read_value("0000");
        assert_eq!(zero.block_count(), 0);
    }

    #[test]
    fn edid_oversized_block_count_is_dropped() {
        let huge: DisplayEdid = read_value("ffffffffffffffff 00");
        assert_eq!(huge, DisplayEdid::default());
        let over: DisplayEdid = read_value("0101 00");
        assert_eq!(over, DisplayEdid::default());
    }

    #[test]
    fn edid_constructor_rejects_partial_blocks() {
        assert!(DisplayEdid::new(vec![0; 100]).is_none());
        assert!(DisplayEdid::new(Vec::new()).is_none());
        assert_eq!(DisplayEdid::new(vec![0; 256]).unwrap().block_count(), 2);
    }

    #[test]
    fn client_rtp_ports_standard_form() {
        let ports: ClientRtpPorts = read_value("RTP/AVP/UDP;unicast 19000 0 mode=play");
        assert_eq!(ports, ClientRtpPorts::udp(19000, 0));
        assert_eq!(
            line(&ports),
            "wfd_client_rtp_ports: RTP/AVP/UDP;unicast 19000 0 mode=play\r\n"
        );
    }

    #[test]
    fn client_rtp_ports_client_port_form() {
        let ports: ClientRtpPorts = read_value("RTP/AVP/TCP;multicast;client_port=5000-5001 mode=play");
        assert_eq!(ports.lower_transport, LowerTransport::Tcp);
        assert!(!ports.unicast);
        assert_eq!((ports.rtp_port0, ports.rtp_port1), (5000, 5001));
    }

    #[test]
    fn coupled_sink_and_i2c() {
        let cs: CoupledSink = read_value("01 0011223344556677");
        assert_eq!(
            cs.cap,
            Some(CoupledSinkCap {
                status: 1,
                address: Some(0x0011223344556677)
            })
        );
        let i2c: I2c = read_value("404");
        assert_eq!(i2c.port, Some(404));
        assert_eq!(line(&i2c), "wfd_I2C: 404\r\n");
    }

    #[test]
    fn timing_is_ten_hex_digits() {
        let t = AvFormatChangeTiming {
            pts: 0x1_2345_6789,
            dts: 0xff,
        };
        assert_eq!(
            line(&t),
            "wfd_av_format_change_timing: 0123456789 00000000ff\r\n"
        );
    }

    #[test]
    fn none_yields_default() {
        let formats: VideoFormats = read_value("none");
        assert_eq!(formats, VideoFormats::default());
        let empty: StandbyResumeCapability = read_value("");
        assert!(!empty.supported);
    }
}
