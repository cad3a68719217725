//! Decoding of negotiated audio/video formats into stream parameters.
//!
//! The peer selects a format in M4 by sending a codec list with exactly
//! one mode bit set. Video bits index into the CEA, VESA or handheld
//! resolution tables of the WFD specification; audio bits map to a
//! sample-rate/channel combination that depends on the codec family.

use super::params::{AudioCodecs, AudioFormat, H264Codec, VideoFormats};

/// Resolution table a video mode bit refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTable {
    Cea,
    Vesa,
    Hh,
}

/// One entry of a resolution table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMode {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub interlaced: bool,
}

const fn p(width: u32, height: u32, framerate: u32) -> VideoMode {
    VideoMode {
        width,
        height,
        framerate,
        interlaced: false,
    }
}

const fn i(width: u32, height: u32, framerate: u32) -> VideoMode {
    VideoMode {
        width,
        height,
        framerate,
        interlaced: true,
    }
}

const CEA_MODES: [VideoMode; 17] = [
    p(640, 480, 60),
    p(720, 480, 60),
    i(720, 480, 60),
    p(720, 576, 50),
    i(720, 576, 50),
    p(1280, 720, 30),
    p(1280, 720, 60),
    p(1920, 1080, 30),
    p(1920, 1080, 60),
    i(1920, 1080, 60),
    p(1280, 720, 25),
    p(1280, 720, 50),
    p(1920, 1080, 25),
    p(1920, 1080, 50),
    i(1920, 1080, 50),
    p(1280, 720, 24),
    p(1920, 1080, 24),
];

const VESA_MODES: [VideoMode; 30] = [
    p(800, 600, 30),
    p(800, 600, 60),
    p(1024, 768, 30),
    p(1024, 768, 60),
    p(1152, 864, 30),
    p(1152, 864, 60),
    p(1280, 768, 30),
    p(1280, 768, 60),
    p(1280, 800, 30),
    p(1280, 800, 60),
    p(1360, 768, 30),
    p(1360, 768, 60),
    p(1366, 768, 30),
    p(1366, 768, 60),
    p(1280, 1024, 30),
    p(1280, 1024, 60),
    p(1400, 1050, 30),
    p(1400, 1050, 60),
    p(1440, 900, 30),
    p(1440, 900, 60),
    p(1600, 900, 30),
    p(1600, 900, 60),
    p(1600, 1200, 30),
    p(1600, 1200, 60),
    p(1680, 1024, 30),
    p(1680, 1024, 60),
    p(1680, 1050, 30),
    p(1680, 1050, 60),
    p(1920, 1200, 30),
    p(1920, 1200, 60),
];

const HH_MODES: [VideoMode; 12] = [
    p(800, 480, 30),
    p(800, 480, 60),
    p(854, 480, 30),
    p(854, 480, 60),
    p(864, 480, 30),
    p(864, 480, 60),
    p(640, 360, 30),
    p(640, 360, 60),
    p(960, 540, 30),
    p(960, 540, 60),
    p(848, 480, 30),
    p(848, 480, 60),
];

impl ResolutionTable {
    fn modes(&self) -> &'static [VideoMode] {
        match self {
            Self::Cea => &CEA_MODES,
            Self::Vesa => &VESA_MODES,
            Self::Hh => &HH_MODES,
        }
    }

    /// Table encoded in the low 3 bits of the `native` field.
    pub fn from_native(native: u8) -> Option<Self> {
        match native & 0x07 {
            0 => Some(Self::Cea),
            1 => Some(Self::Vesa),
            2 => Some(Self::Hh),
            _ => None,
        }
    }

    pub fn mode(&self, index: u32) -> Option<VideoMode> {
        self.modes().get(index as usize).copied()
    }
}

/// Negotiated video stream parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub table: ResolutionTable,
    pub mode: VideoMode,
    pub profile: u8,
    pub level: u8,
}

/// Negotiated audio stream parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioInfo {
    pub format: AudioFormat,
    pub channels: u32,
    pub sample_rate: u32,
    pub bits_per_sample: u32,
}

/// Accumulated stream parameters reported to the media collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub audio: Option<AudioInfo>,
    pub video: Option<VideoInfo>,
}

/// Decode the selected video mode, preferring CEA bits over VESA over HH.
///
/// Falls back to the `native` field when no mode bit is set.
pub fn select_video(formats: &VideoFormats) -> Option<VideoInfo> {
    let codec: &H264Codec = formats.codecs.first()?;
    let picked = [
        (ResolutionTable::Cea, codec.cea_support),
        (ResolutionTable::Vesa, codec.vesa_support),
        (ResolutionTable::Hh, codec.hh_support),
    ]
    .into_iter()
    .find(|(_, bits)| *bits != 0)
    .map(|(table, bits)| (table, bits.trailing_zeros()))
    .or_else(|| {
        ResolutionTable::from_native(formats.native)
            .map(|table| (table, u32::from(formats.native >> 3)))
    });

    let (table, index) = picked?;
    let Some(mode) = table.mode(index) else {
        tracing::warn!(?table, index, "video mode index out of range");
        return None;
    };
    Some(VideoInfo {
        table,
        mode,
        profile: codec.profile,
        level: codec.level,
    })
}

/// Pick the first usable audio codec in LPCM > AAC > AC3 order.
pub fn select_audio(codecs: &AudioCodecs) -> Option<AudioInfo> {
    [AudioFormat::Lpcm, AudioFormat::Aac, AudioFormat::Ac3]
        .into_iter()
        .find_map(|format| {
            codecs
                .codecs
                .iter()
                .find(|c| c.format == format && c.modes != 0)
                .map(|c| decode_audio(format, c.modes))
        })
}

fn decode_audio(format: AudioFormat, modes: u32) -> AudioInfo {
    let bit = modes.trailing_zeros();
    let (sample_rate, channels) = match format {
        AudioFormat::Lpcm if bit == 0 => (44_100, 2),
        AudioFormat::Lpcm => (48_000, 2),
        AudioFormat::Aac | AudioFormat::Ac3 => match bit {
            0 => (48_000, 2),
            1 => (48_000, 4),
            2 => (48_000, 6),
            _ => (48_000, 8),
        },
    };
    AudioInfo {
        format,
        channels,
        sample_rate,
        bits_per_sample: 16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wfd::params::AudioCodec;

    fn video(cea: u32, vesa: u32, hh: u32) -> VideoFormats {
        VideoFormats {
            native: 0,
            preferred_display_mode_supported: 0,
            codecs: vec![H264Codec {
                profile: 1,
                level: 2,
                cea_support: cea,
                vesa_support: vesa,
                hh_support: hh,
                ..Default::default()
            }],
        }
    }

    #[test]
    fn cea_bit_wins_over_vesa() {
        let info = select_video(&video(1 << 5, 1 << 3, 0)).unwrap();
        assert_eq!(info.table, ResolutionTable::Cea);
        assert_eq!(info.mode, p(1280, 720, 30));
    }

    #[test]
    fn vesa_and_hh_tables() {
        let info = select_video(&video(0, 1 << 3, 0)).unwrap();
        assert_eq!(info.mode, p(1024, 768, 60));
        let info = select_video(&video(0, 0, 1 << 8)).unwrap();
        assert_eq!(info.table, ResolutionTable::Hh);
        assert_eq!(info.mode, p(960, 540, 30));
    }

    #[test]
    fn native_fallback() {
        let mut formats = video(0, 0, 0);
        // CEA index 8: 1920x1080p60
        formats.native = 8 << 3;
        let info = select_video(&formats).unwrap();
        assert_eq!(info.mode, p(1920, 1080, 60));
    }

    #[test]
    fn out_of_range_index() {
        assert!(select_video(&video(1 << 20, 0, 0)).is_none());
        assert!(select_video(&VideoFormats::default()).is_none());
    }

    #[test]
    fn audio_priority() {
        let codecs = AudioCodecs {
            codecs: vec![
                AudioCodec {
                    format: AudioFormat::Ac3,
                    modes: 1,
                    latency: 0,
                },
                AudioCodec {
                    format: AudioFormat::Aac,
                    modes: 0b100,
                    latency: 0,
                },
            ],
        };
        let info = select_audio(&codecs).unwrap();
        assert_eq!(info.format, AudioFormat::Aac);
        assert_eq!(info.channels, 6);
        assert_eq!(info.sample_rate, 48_000);
    }

    #[test]
    fn lpcm_sample_rates() {
        let codecs = |modes| AudioCodecs {
            codecs: vec![AudioCodec {
                format: AudioFormat::Lpcm,
                modes,
                latency: 0,
            }],
        };
        assert_eq!(select_audio(&codecs(1)).unwrap().sample_rate, 44_100);
        assert_eq!(select_audio(&codecs(2)).unwrap().sample_rate, 48_000);
        assert!(select_audio(&codecs(0)).is_none());
    }
}
