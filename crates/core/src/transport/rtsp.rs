use std::time::{Duration, Instant};

use crate::error::{ParseErrorKind, Result, WfdError};
use crate::protocol::RtspMessage;
use crate::protocol::header::find_header_end;
use crate::transport::Connection;

/// Upper bound for a header block.
const MAX_HEADER_LEN: usize = 64 * 1024;
/// Upper bound for a message body (EDID blobs are the largest WFD bodies).
const MAX_BODY_LEN: usize = 1024 * 1024;

/// Frames RTSP messages over a [`Connection`].
///
/// Each call is a single blocking operation bounded by its timeout.
/// Interleaved binary frames (`$` + channel + length) are read and
/// discarded; WFD carries media over UDP only.
pub struct RtspTransport {
    conn: Connection,
    cseq: u32,
}

impl RtspTransport {
    pub fn new(conn: Connection) -> Self {
        Self { conn, cseq: 0 }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Allocate the CSeq for the next outbound request.
    pub fn next_cseq(&mut self) -> u32 {
        self.cseq = self.cseq.wrapping_add(1);
        self.cseq
    }

    pub fn send(&mut self, message: &RtspMessage, timeout: Duration) -> Result<()> {
        match message {
            RtspMessage::Request(r) => {
                tracing::debug!(method = %r.method, uri = %r.uri, cseq = ?r.cseq(), "send request")
            }
            RtspMessage::Response(r) => {
                tracing::debug!(status = r.status_code, cseq = ?r.cseq(), "send response")
            }
        }
        let text = message.serialize();
        tracing::trace!(message = %text, "outbound");
        self.conn.write_all(text.as_bytes(), timeout)
    }

    /// Receive the next request or response.
    pub fn receive(&mut self, timeout: Duration) -> Result<RtspMessage> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(raw) = self.take_frame()? {
                let message = RtspMessage::parse(&raw)?;
                match &message {
                    RtspMessage::Request(r) => {
                        tracing::debug!(method = %r.method, cseq = ?r.cseq(), "received request")
                    }
                    RtspMessage::Response(r) => {
                        tracing::debug!(status = r.status_code, cseq = ?r.cseq(), "received response")
                    }
                }
                tracing::trace!(message = %raw, "inbound");
                return Ok(message);
            }
            self.conn.fill(deadline)?;
        }
    }

    /// Pop one complete message from the receive buffer, if available.
    fn take_frame(&mut self) -> Result<Option<String>> {
        let buf = self.conn.buffer();
        loop {
            let leading = buf
                .iter()
                .take_while(|b| matches!(b, b'\r' | b'\n'))
                .count();
            buf.drain(..leading);

            if buf.first() == Some(&b'$') {
                if buf.len() < 4 {
                    return Ok(None);
                }
                let len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
                if buf.len() < 4 + len {
                    return Ok(None);
                }
                tracing::trace!(channel = buf[1], len, "discarding interleaved data");
                buf.drain(..4 + len);
                continue;
            }
            break;
        }

        let Some((head_len, sep_len)) = find_header_end(buf) else {
            if buf.len() > MAX_HEADER_LEN {
                return Err(WfdError::parse(ParseErrorKind::MessageTooLarge));
            }
            return Ok(None);
        };

        let head = String::from_utf8_lossy(&buf[..head_len]);
        let body_len = content_length(&head)?;
        let total = head_len + sep_len + body_len;
        if buf.len() < total {
            return Ok(None);
        }

        let raw = String::from_utf8_lossy(&buf[..total]).into_owned();
        buf.drain(..total);
        Ok(Some(raw))
    }
}

fn content_length(head: &str) -> Result<usize> {
    let Some(value) = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("Content-Length")
            .then(|| value.trim())
    }) else {
        return Ok(0);
    };

    match value.parse::<usize>() {
        Ok(len) if len <= MAX_BODY_LEN => Ok(len),
        _ => Err(WfdError::parse(ParseErrorKind::InvalidContentLength)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::protocol::{Method, RtspRequest};
    use crate::transport::TcpConnector;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn pair() -> (RtspTransport, std::net::TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = SessionConfig::new(&format!("rtsp://127.0.0.1:{}/wfd1.0", port));
        let mut conn = Connection::new(&config, Box::new(TcpConnector));
        conn.connect().unwrap();
        let (peer, _) = listener.accept().unwrap();
        (RtspTransport::new(conn), peer)
    }

    #[test]
    fn receives_request_with_body_split_across_writes() {
        let (mut transport, mut peer) = pair();
        peer.write_all(b"SET_PARAMETER rtsp://localhost/wfd1.0 RTSP/1.0\r\nCSeq: 5\r\nContent-Length: 27\r\n\r\nwfd_trigger_")
            .unwrap();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            peer.write_all(b"method: SETUP\r\n").unwrap();
            std::thread::sleep(Duration::from_millis(200));
        });

        match transport.receive(Duration::from_secs(2)).unwrap() {
            RtspMessage::Request(req) => {
                assert_eq!(req.method_kind(), Some(Method::SetParameter));
                assert_eq!(req.body, "wfd_trigger_method: SETUP\r\n");
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn skips_interleaved_frames() {
        let (mut transport, mut peer) = pair();
        peer.write_all(&[b'$', 0, 0, 3, 1, 2, 3]).unwrap();
        peer.write_all(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\n\r\n").unwrap();
        match transport.receive(Duration::from_secs(2)).unwrap() {
            RtspMessage::Response(resp) => assert_eq!(resp.cseq(), Some(1)),
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn lf_only_message_followed_by_crlf_message() {
        let (mut transport, mut peer) = pair();
        peer.write_all(b"RTSP/1.0 200 OK\nCSeq: 1\n\nRTSP/1.0 200 OK\r\nCSeq: 2\r\n\r\n")
            .unwrap();
        for expected in [1, 2] {
            match transport.receive(Duration::from_secs(2)).unwrap() {
                RtspMessage::Response(resp) => assert_eq!(resp.cseq(), Some(expected)),
                other => panic!("expected response, got {:?}", other),
            }
        }
    }

    #[test]
    fn send_and_timeout() {
        let (mut transport, mut peer) = pair();
        let cseq = transport.next_cseq();
        let req = RtspRequest::new(Method::Options, "*").add_header("CSeq", &cseq.to_string());
        transport
            .send(&RtspMessage::Request(req), Duration::from_secs(1))
            .unwrap();

        let mut buf = [0u8; 256];
        let n = peer.read(&mut buf).unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("OPTIONS * RTSP/1.0\r\nCSeq: 1\r\n"));

        let err = transport.receive(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, WfdError::Timeout));
    }

    #[test]
    fn peer_close_is_reported() {
        let (mut transport, peer) = pair();
        drop(peer);
        let err = transport.receive(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, WfdError::ConnectionClosed | WfdError::Io(_)));
    }
}
