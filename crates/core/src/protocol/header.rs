//! Header block parsing and structured header values.

use crate::error::{ParseErrorKind, Result, WfdError};

pub type Headers = Vec<(String, String)>;

/// Split a raw message into its start line, header lines and body.
pub(crate) fn split_message(raw: &str) -> Result<(&str, Headers, String)> {
    let (head, body) = match find_header_end(raw.as_bytes()) {
        Some((pos, sep)) => (&raw[..pos], &raw[pos + sep..]),
        None => (raw, ""),
    };

    let mut lines = head.lines();
    let start = lines
        .by_ref()
        .find(|l| !l.trim().is_empty())
        .ok_or(WfdError::parse(ParseErrorKind::EmptyMessage))?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let colon_pos = line
            .find(':')
            .ok_or(WfdError::parse(ParseErrorKind::InvalidHeader))?;
        let name = line[..colon_pos].trim().to_string();
        let value = line[colon_pos + 1..].trim().to_string();
        headers.push((name, value));
    }

    Ok((start.trim(), headers, body.to_string()))
}

/// Offset and length of the blank line ending the header block. Either
/// `\r\n\r\n` or a bare `\n\n`, whichever comes first.
pub(crate) fn find_header_end(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else {
            None
        }
    })
}

/// Case-insensitive header lookup (RFC 2326 §4.2).
pub(crate) fn find<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

pub(crate) fn serialize_into(out: &mut String, headers: &Headers, body: &str) {
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    if !body.is_empty() {
        out.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    out.push_str("\r\n");
    out.push_str(body);
}

/// `Session` header value (RFC 2326 §12.37): `id[;timeout=secs]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHeader {
    pub id: String,
    pub timeout_secs: Option<u64>,
}

impl SessionHeader {
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';').map(str::trim);
        let id = parts.next().filter(|id| !id.is_empty())?.to_string();
        let timeout_secs = parts
            .filter_map(|p| p.strip_prefix("timeout="))
            .find_map(|t| t.parse().ok());
        Some(Self { id, timeout_secs })
    }
}

/// First entry of an `RTP-Info` header (RFC 2326 §12.33).
///
/// ```
/// use wfd::protocol::header::RtpInfo;
///
/// let info = RtpInfo::parse("url=rtsp://10.0.0.1/wfd1.0/streamid=0;seq=1200;rtptime=90000").unwrap();
/// assert_eq!(info.seq, Some(1200));
/// assert_eq!(info.rtptime, Some(90000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RtpInfo {
    pub url: Option<String>,
    pub seq: Option<u16>,
    pub rtptime: Option<u32>,
}

impl RtpInfo {
    pub fn parse(value: &str) -> Option<Self> {
        let first = value.split(',').next()?.trim();
        let mut info = RtpInfo::default();
        for part in first.split(';').map(str::trim) {
            if let Some(url) = part.strip_prefix("url=") {
                info.url = Some(url.to_string());
            } else if let Some(seq) = part.strip_prefix("seq=") {
                info.seq = seq.parse().ok();
            } else if let Some(ts) = part.strip_prefix("rtptime=") {
                info.rtptime = ts.parse().ok();
            }
        }
        (info.seq.is_some() || info.rtptime.is_some()).then_some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earliest_header_terminator_wins() {
        assert_eq!(find_header_end(b"A\nB\n\nC\r\n\r\n"), Some((3, 2)));
        assert_eq!(find_header_end(b"A\r\n\r\nB\n\n"), Some((1, 4)));
        assert_eq!(find_header_end(b"A\r\nB"), None);
    }

    #[test]
    fn split_with_body() {
        let (start, headers, body) =
            split_message("RTSP/1.0 200 OK\r\nCSeq: 2\r\nContent-Length: 5\r\n\r\nhello").unwrap();
        assert_eq!(start, "RTSP/1.0 200 OK");
        assert_eq!(find(&headers, "cseq"), Some("2"));
        assert_eq!(body, "hello");
    }

    #[test]
    fn invalid_header_line() {
        assert!(split_message("OPTIONS * RTSP/1.0\r\nno colon here\r\n\r\n").is_err());
    }

    #[test]
    fn session_header() {
        let s = SessionHeader::parse("6B8B4567;timeout=30").unwrap();
        assert_eq!(s.id, "6B8B4567");
        assert_eq!(s.timeout_secs, Some(30));
        assert_eq!(SessionHeader::parse("abc").unwrap().timeout_secs, None);
        assert!(SessionHeader::parse("").is_none());
    }

    #[test]
    fn rtp_info_without_numbers() {
        assert!(RtpInfo::parse("url=rtsp://x/y").is_none());
    }
}
