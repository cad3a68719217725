use std::fmt;

/// Extension tag a WFD peer must list in `Public` and `Require`.
pub const WFD_TAG: &str = "org.wfa.wfd1.0";

/// RTSP methods used by WFD (RFC 2326 §10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Options,
    Describe,
    Announce,
    Setup,
    Play,
    Pause,
    Teardown,
    GetParameter,
    SetParameter,
    Record,
    Redirect,
}

impl Method {
    pub const ALL: [Method; 11] = [
        Method::Options,
        Method::Describe,
        Method::Announce,
        Method::Setup,
        Method::Play,
        Method::Pause,
        Method::Teardown,
        Method::GetParameter,
        Method::SetParameter,
        Method::Record,
        Method::Redirect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Describe => "DESCRIBE",
            Self::Announce => "ANNOUNCE",
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Teardown => "TEARDOWN",
            Self::GetParameter => "GET_PARAMETER",
            Self::SetParameter => "SET_PARAMETER",
            Self::Record => "RECORD",
            Self::Redirect => "REDIRECT",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == token)
    }

    pub fn flag(&self) -> Methods {
        match self {
            Self::Options => Methods::OPTIONS,
            Self::Describe => Methods::DESCRIBE,
            Self::Announce => Methods::ANNOUNCE,
            Self::Setup => Methods::SETUP,
            Self::Play => Methods::PLAY,
            Self::Pause => Methods::PAUSE,
            Self::Teardown => Methods::TEARDOWN,
            Self::GetParameter => Methods::GET_PARAMETER,
            Self::SetParameter => Methods::SET_PARAMETER,
            Self::Record => Methods::RECORD,
            Self::Redirect => Methods::REDIRECT,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags::bitflags! {
    /// Set of methods a peer advertises in `Public`/`Allow`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Methods: u32 {
        const OPTIONS       = 1 << 0;
        const DESCRIBE      = 1 << 1;
        const ANNOUNCE      = 1 << 2;
        const SETUP         = 1 << 3;
        const PLAY          = 1 << 4;
        const PAUSE         = 1 << 5;
        const TEARDOWN      = 1 << 6;
        const GET_PARAMETER = 1 << 7;
        const SET_PARAMETER = 1 << 8;
        const RECORD        = 1 << 9;
        const REDIRECT      = 1 << 10;

        /// Assumed when the peer answers OPTIONS without `Public`/`Allow`.
        const MINIMAL = Self::SETUP.bits() | Self::PLAY.bits();
    }
}

impl Methods {
    /// Parse a comma-separated `Public`/`Allow` value.
    ///
    /// Returns the known methods and whether the WFD tag was listed.
    /// Unknown tokens are ignored.
    pub fn parse_list(value: &str) -> (Methods, bool) {
        let mut methods = Methods::empty();
        let mut wfd = false;
        for token in value.split(',').map(str::trim) {
            if token == WFD_TAG {
                wfd = true;
            } else if let Some(m) = Method::from_token(token) {
                methods |= m.flag();
            }
        }
        (methods, wfd)
    }

    /// Format as a `Public` header value, optionally led by the WFD tag.
    pub fn to_header_value(&self, with_wfd_tag: bool) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if with_wfd_tag {
            parts.push(WFD_TAG);
        }
        parts.extend(
            Method::ALL
                .iter()
                .filter(|m| self.contains(m.flag()))
                .map(Method::as_str),
        );
        parts.join(", ")
    }
}
