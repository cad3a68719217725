//! Serialized command execution for one WFD session.
//!
//! The application talks to a session through a [`Dispatcher`]: every
//! call only enqueues a [`Command`] and returns. A single worker thread
//! pops commands one at a time and runs them on the
//! [`Negotiator`](crate::negotiation::Negotiator), which owns the
//! control connection.
//!
//! There is one pending slot and one busy slot. Enqueuing over an
//! unconsumed command cancels it, and if the busy command is in the new
//! command's [`Command::interrupts`] mask the connection is flushed so
//! its blocking I/O returns promptly. Between commands, while connected,
//! the worker runs [`Command::Wait`] to serve the source.

pub mod command;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

pub use command::{Command, CommandMask, Progress, ProgressKind, SinkRequest};

use crate::config::SessionConfig;
use crate::negotiation::{Negotiator, Outcome};
use crate::session::{RtspState, Session};
use crate::sink::MediaSink;
use crate::transport::{
    Connection, ConnectionHandle, Connector, LinkState, RtspTransport, TcpConnector,
};
use crate::wfd::formats::StreamInfo;

struct Inner {
    session: Session,
    pending: Option<Command>,
    busy: Option<Command>,
    /// Single-slot mailbox for [`Command::Request`].
    request: Option<SinkRequest>,
    running: bool,
}

/// State shared between the application side and the worker, guarded by
/// one lock.
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
    conn: ConnectionHandle,
    sink: Arc<dyn MediaSink>,
}

impl Shared {
    fn new(conn: ConnectionHandle, sink: Arc<dyn MediaSink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                session: Session::new(),
                pending: None,
                busy: None,
                request: None,
                running: true,
            }),
            wake: Condvar::new(),
            conn,
            sink,
        }
    }

    /// Run `f` on the session under the lock. Never block inside `f`.
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.inner.lock().session)
    }

    pub(crate) fn enqueue(&self, command: Command) {
        let canceled = {
            let mut inner = self.inner.lock();
            let canceled = if !inner.running {
                Some(command)
            } else {
                match inner.pending {
                    Some(prev) if prev == command => None,
                    // A pending close is never displaced.
                    Some(Command::Close) => Some(command),
                    prev => {
                        inner.pending = Some(command);
                        prev
                    }
                }
            };

            if inner.pending == Some(command) {
                if let Some(busy) = inner.busy {
                    if command.interrupts().contains(busy.flag()) {
                        tracing::debug!(%command, %busy, "interrupting busy command");
                        self.conn.flush(true);
                    }
                }
                self.wake.notify_one();
            }
            canceled
        };

        if let Some(canceled) = canceled {
            tracing::debug!(command = %canceled, "command canceled before it ran");
            self.report(Progress::new(canceled, ProgressKind::Canceled));
        }
    }

    /// Store `request` in the mailbox, replacing an unsent one.
    pub(crate) fn set_request(&self, request: SinkRequest) {
        if let Some(prev) = self.inner.lock().request.replace(request) {
            tracing::debug!(?prev, ?request, "replacing unsent request");
        }
    }

    pub(crate) fn take_request(&self) -> Option<SinkRequest> {
        self.inner.lock().request.take()
    }

    /// Block until there is something to do. `None` means shut down.
    fn next_command(&self) -> Option<Command> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(command) = inner.pending.take() {
                inner.busy = Some(command);
                return Some(command);
            }
            if !inner.running {
                return None;
            }
            if self.conn.state() == LinkState::Connected && !inner.session.terminated {
                inner.busy = Some(Command::Wait);
                return Some(Command::Wait);
            }
            self.wake.wait(&mut inner);
        }
    }

    /// Clear the busy slot, then re-arm the connection.
    fn finish(&self) {
        self.inner.lock().busy = None;
        self.conn.flush(false);
    }

    fn stop(&self) {
        self.conn.stop();
        self.enqueue(Command::Close);
        self.inner.lock().running = false;
        self.wake.notify_one();
    }

    fn report(&self, progress: Progress) {
        self.sink.progress(&progress);
    }
}

fn run_worker(mut negotiator: Negotiator, shared: Arc<Shared>) {
    tracing::debug!("session worker started");
    while let Some(command) = shared.next_command() {
        if command != Command::Wait {
            tracing::debug!(%command, "command started");
            shared.report(Progress::new(command, ProgressKind::Start));
        }

        let outcome = negotiator.run(command);
        shared.finish();

        let progress = match outcome {
            Outcome::Complete if command == Command::Wait => continue,
            Outcome::Canceled if command == Command::Wait => continue,
            Outcome::Complete => Progress::new(command, ProgressKind::Complete),
            Outcome::Canceled => Progress::new(command, ProgressKind::Canceled),
            Outcome::Failed(message) => {
                Progress::new(command, ProgressKind::Error).with_message(message)
            }
        };
        tracing::debug!(%command, kind = ?progress.kind, "command finished");
        shared.report(progress);
    }
    tracing::debug!("session worker exited");
}

/// Handle to one WFD sink session and its worker thread.
///
/// Dropping the dispatcher closes the session (TEARDOWN when the source
/// accepts it) and joins the worker.
pub struct Dispatcher {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start a session worker connecting over TCP.
    pub fn start(config: SessionConfig, sink: Arc<dyn MediaSink>) -> Self {
        Self::with_connector(config, sink, Box::new(TcpConnector))
    }

    pub fn with_connector(
        config: SessionConfig,
        sink: Arc<dyn MediaSink>,
        connector: Box<dyn Connector>,
    ) -> Self {
        let connection = Connection::new(&config, connector);
        let shared = Arc::new(Shared::new(connection.handle(), sink.clone()));
        let negotiator = Negotiator::new(
            config,
            RtspTransport::new(connection),
            shared.clone(),
            sink,
        );

        let worker_shared = shared.clone();
        let worker = thread::spawn(move || run_worker(negotiator, worker_shared));

        Self {
            shared,
            worker: Some(worker),
        }
    }

    pub fn enqueue(&self, command: Command) {
        self.shared.enqueue(command);
    }

    /// Connect and negotiate up to READY.
    pub fn open(&self) {
        self.enqueue(Command::Open);
    }

    pub fn setup(&self) {
        self.enqueue(Command::Setup);
    }

    pub fn play(&self) {
        self.enqueue(Command::Play);
    }

    pub fn pause(&self) {
        self.enqueue(Command::Pause);
    }

    pub fn close(&self) {
        self.enqueue(Command::Close);
    }

    /// Queue an out-of-band SET_PARAMETER. An earlier request not yet
    /// sent is replaced.
    pub fn request(&self, request: SinkRequest) {
        self.shared.set_request(request);
        self.enqueue(Command::Request);
    }

    pub fn state(&self) -> RtspState {
        self.shared.with_session(|s| s.state)
    }

    /// Snapshot of the whole session state.
    pub fn session(&self) -> Session {
        self.shared.with_session(|s| s.clone())
    }

    pub fn stream_info(&self) -> StreamInfo {
        self.shared.with_session(|s| s.stream_info)
    }

    /// Close the session and join the worker.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.stop();
        if worker.join().is_err() {
            tracing::error!("session worker panicked");
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
