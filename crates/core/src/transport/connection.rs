//! Control-channel connection with bounded retry and cooperative
//! interruption.
//!
//! All blocking calls are sliced into `poll_interval` chunks. Between
//! slices the flush flag is checked, so a [`ConnectionHandle::flush`]
//! from another thread makes the blocked call return
//! [`WfdError::Interrupted`] promptly without closing the socket.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::SessionConfig;
use crate::error::{Result, WfdError};
use crate::transport::RtspUrl;

/// Smallest slice handed to `set_read_timeout`; zero is rejected by std.
const MIN_SLICE: Duration = Duration::from_millis(1);

/// Reliable byte stream the control channel runs over.
pub trait Stream: Read + Write + Send {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    fn shutdown(&self) -> io::Result<()>;
}

impl Stream for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, std::net::Shutdown::Both)
    }
}

/// Opens streams to the peer.
pub trait Connector: Send {
    fn connect(&self, host: &str, port: u16, timeout: Duration) -> io::Result<Box<dyn Stream>>;
}

/// Plain TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, host: &str, port: u16, timeout: Duration) -> io::Result<Box<dyn Stream>> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "host resolved to no address");
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(Box::new(stream));
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Closed,
    Connecting,
    Connected,
}

struct Control {
    flushing: AtomicBool,
    stopping: AtomicBool,
    state: Mutex<LinkState>,
}

/// Cloneable handle for interrupting a [`Connection`] from another thread.
#[derive(Clone)]
pub struct ConnectionHandle {
    control: Arc<Control>,
}

impl ConnectionHandle {
    fn new() -> Self {
        Self {
            control: Arc::new(Control {
                flushing: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                state: Mutex::new(LinkState::Closed),
            }),
        }
    }

    /// Enable or disable flushing. While enabled, every blocking call on
    /// the connection fails with [`WfdError::Interrupted`].
    pub fn flush(&self, enable: bool) {
        tracing::trace!(enable, "connection flush");
        self.control.flushing.store(enable, Ordering::SeqCst);
    }

    pub fn is_flushing(&self) -> bool {
        self.control.flushing.load(Ordering::SeqCst)
    }

    /// Request that an in-progress connect gives up at the next attempt.
    ///
    /// Permanent: later connects fail with [`WfdError::Interrupted`] too.
    /// Reads and writes on an open connection are not affected.
    pub fn stop(&self) {
        tracing::debug!("connection stopped");
        self.control.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.control.stopping.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LinkState {
        *self.control.state.lock()
    }

    fn set_state(&self, state: LinkState) {
        *self.control.state.lock() = state;
    }

    fn check(&self) -> Result<()> {
        if self.is_flushing() {
            return Err(WfdError::Interrupted);
        }
        Ok(())
    }

    fn check_connect(&self) -> Result<()> {
        if self.is_stopping() {
            return Err(WfdError::Interrupted);
        }
        self.check()
    }
}

/// One control-channel connection to the WFD source.
pub struct Connection {
    url: String,
    connector: Box<dyn Connector>,
    stream: Option<Box<dyn Stream>>,
    handle: ConnectionHandle,
    retry: u32,
    retry_delay: Duration,
    tcp_timeout: Duration,
    poll_interval: Duration,
    buffer: Vec<u8>,
}

impl Connection {
    pub fn new(config: &SessionConfig, connector: Box<dyn Connector>) -> Self {
        Self {
            url: config.url.clone(),
            connector,
            stream: None,
            handle: ConnectionHandle::new(),
            retry: config.retry.max(1),
            retry_delay: config.retry_delay,
            tcp_timeout: config.tcp_timeout,
            poll_interval: config.poll_interval.max(MIN_SLICE),
            buffer: Vec::new(),
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some() && self.handle.state() == LinkState::Connected
    }

    /// Parse the URL and connect, trying up to `retry` times.
    ///
    /// Aborts with [`WfdError::Interrupted`] if the handle is stopped or
    /// flushed between attempts.
    pub fn connect(&mut self) -> Result<RtspUrl> {
        let url = RtspUrl::parse(&self.url)?;
        if self.is_connected() {
            return Ok(url);
        }

        self.handle.set_state(LinkState::Connecting);
        for attempt in 1..=self.retry {
            if let Err(e) = self.handle.check_connect() {
                self.handle.set_state(LinkState::Closed);
                return Err(e);
            }

            match self.connector.connect(&url.host, url.port, self.tcp_timeout) {
                Ok(stream) => {
                    self.stream = Some(stream);
                    self.buffer.clear();
                    self.handle.set_state(LinkState::Connected);
                    tracing::info!(host = %url.host, port = url.port, attempt, "connected to source");
                    return Ok(url);
                }
                Err(e) => {
                    tracing::warn!(attempt, retry = self.retry, error = %e, "connect attempt failed");
                }
            }

            if attempt < self.retry {
                if let Err(e) = self.sleep(self.retry_delay) {
                    self.handle.set_state(LinkState::Closed);
                    return Err(e);
                }
            }
        }

        self.handle.set_state(LinkState::Closed);
        Err(WfdError::ConnectFailed {
            attempts: self.retry,
        })
    }

    fn sleep(&self, total: Duration) -> Result<()> {
        let deadline = Instant::now() + total;
        loop {
            self.handle.check_connect()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            thread::sleep(remaining.min(self.poll_interval));
        }
    }

    /// Close the connection. With `free`, the stream object is released
    /// too. Safe to call repeatedly.
    pub fn close(&mut self, free: bool) {
        if let Some(stream) = &self.stream {
            if self.handle.state() != LinkState::Closed {
                let _ = stream.shutdown();
                tracing::debug!("control connection closed");
            }
        }
        if free {
            self.stream = None;
            self.buffer.clear();
        }
        self.handle.set_state(LinkState::Closed);
    }

    pub fn flush(&self, enable: bool) {
        self.handle.flush(enable);
    }

    /// Write all of `data`, bounded by `timeout`.
    pub fn write_all(&mut self, data: &[u8], timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let handle = &self.handle;
        let poll = self.poll_interval;
        let stream = self.stream.as_mut().ok_or(WfdError::NotConnected)?;

        let mut written = 0;
        while written < data.len() {
            handle.check()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WfdError::Timeout);
            }
            stream.set_write_timeout(Some(remaining.min(poll).max(MIN_SLICE)))?;
            match stream.write(&data[written..]) {
                Ok(0) => return Err(WfdError::ConnectionClosed),
                Ok(n) => written += n,
                Err(e) if is_retryable(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        stream.flush()?;
        Ok(())
    }

    /// Read at least one more byte into the receive buffer.
    pub(crate) fn fill(&mut self, deadline: Instant) -> Result<()> {
        let handle = &self.handle;
        let poll = self.poll_interval;
        let stream = self.stream.as_mut().ok_or(WfdError::NotConnected)?;

        let mut chunk = [0u8; 4096];
        loop {
            handle.check()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WfdError::Timeout);
            }
            stream.set_read_timeout(Some(remaining.min(poll).max(MIN_SLICE)))?;
            match stream.read(&mut chunk) {
                Ok(0) => return Err(WfdError::ConnectionClosed),
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if is_retryable(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub(crate) fn buffer(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close(true);
    }
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct FailingConnector {
        attempts: Arc<AtomicU32>,
    }

    impl Connector for FailingConnector {
        fn connect(&self, _: &str, _: u16, _: Duration) -> io::Result<Box<dyn Stream>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        }
    }

    fn config(retry: u32) -> SessionConfig {
        SessionConfig {
            retry,
            retry_delay: Duration::from_millis(5),
            ..SessionConfig::new("rtsp://127.0.0.1:7236/wfd1.0")
        }
    }

    #[test]
    fn connect_gives_up_after_retry_count() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut conn = Connection::new(
            &config(3),
            Box::new(FailingConnector {
                attempts: attempts.clone(),
            }),
        );
        let err = conn.connect().unwrap_err();
        assert!(matches!(err, WfdError::ConnectFailed { attempts: 3 }));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(!conn.is_connected());
    }

    #[test]
    fn stop_flag_aborts_connect() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut conn = Connection::new(
            &config(5),
            Box::new(FailingConnector {
                attempts: attempts.clone(),
            }),
        );
        conn.handle().stop();
        assert!(conn.connect().unwrap_err().is_cancelled());
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invalid_url_is_reported() {
        let mut conn = Connection::new(&SessionConfig::new("not-a-url"), Box::new(TcpConnector));
        assert!(matches!(conn.connect(), Err(WfdError::InvalidUrl(_))));
    }

    #[test]
    fn close_is_idempotent() {
        let mut conn = Connection::new(&config(1), Box::new(TcpConnector));
        conn.close(false);
        conn.close(true);
        conn.close(true);
        assert_eq!(conn.handle().state(), LinkState::Closed);
    }

    #[test]
    fn flush_interrupts_blocked_read() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut conn = Connection::new(
            &SessionConfig::new(&format!("rtsp://127.0.0.1:{}/wfd1.0", port)),
            Box::new(TcpConnector),
        );
        conn.connect().unwrap();
        let (_peer, _) = listener.accept().unwrap();

        let handle = conn.handle();
        let flusher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            handle.flush(true);
        });

        let started = Instant::now();
        let err = conn.fill(Instant::now() + Duration::from_secs(10)).unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(5));
        flusher.join().unwrap();

        // Un-flushed, the connection is usable again and times out normally.
        conn.flush(false);
        let err = conn.fill(Instant::now() + Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, WfdError::Timeout));
    }
}
