use std::fmt;

use bitflags::bitflags;

use crate::wfd::{AudioRoute, ConnectorType, WfdMessage};

/// Work items executed by the session worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Connect and run M1 through M6.
    Open,
    /// Send SETUP (M6) outside of OPEN.
    Setup,
    Play,
    Pause,
    /// TEARDOWN (M8) and release the connection.
    Close,
    /// Send the mailbox request as a SET_PARAMETER.
    Request,
    /// Idle receive loop serving source requests and keep-alives.
    Wait,
}

bitflags! {
    /// Set of commands, used to express which busy commands a newly
    /// enqueued command interrupts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CommandMask: u8 {
        const OPEN    = 1 << 0;
        const SETUP   = 1 << 1;
        const PLAY    = 1 << 2;
        const PAUSE   = 1 << 3;
        const CLOSE   = 1 << 4;
        const REQUEST = 1 << 5;
        const WAIT    = 1 << 6;
    }
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Setup => "setup",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Close => "close",
            Self::Request => "request",
            Self::Wait => "wait",
        }
    }

    pub fn flag(&self) -> CommandMask {
        match self {
            Self::Open => CommandMask::OPEN,
            Self::Setup => CommandMask::SETUP,
            Self::Play => CommandMask::PLAY,
            Self::Pause => CommandMask::PAUSE,
            Self::Close => CommandMask::CLOSE,
            Self::Request => CommandMask::REQUEST,
            Self::Wait => CommandMask::WAIT,
        }
    }

    /// Busy commands whose blocking I/O is flushed when `self` is enqueued.
    pub fn interrupts(&self) -> CommandMask {
        match self {
            Self::Open | Self::Setup | Self::Request => CommandMask::WAIT,
            Self::Play => CommandMask::WAIT | CommandMask::PAUSE,
            Self::Pause => CommandMask::WAIT | CommandMask::PLAY,
            Self::Close => CommandMask::all(),
            Self::Wait => CommandMask::empty(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Start,
    Complete,
    Canceled,
    Error,
}

/// Lifecycle report for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub command: Command,
    pub kind: ProgressKind,
    pub message: Option<String>,
}

impl Progress {
    pub fn new(command: Command, kind: ProgressKind) -> Self {
        Self {
            command,
            kind,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Out-of-band SET_PARAMETER the sink sends to the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkRequest {
    /// Move audio to the primary or secondary sink.
    Route(AudioRoute),
    /// Report a change of the active display connector.
    ConnectorType(u8),
    /// Enter WFD standby.
    Standby,
    /// Ask the source for an IDR frame (M13).
    IdrRequest,
}

impl SinkRequest {
    /// Parameter body carrying this request.
    pub fn to_message(&self) -> WfdMessage {
        let mut msg = WfdMessage::new();
        match *self {
            Self::Route(route) => msg.route = Some(route),
            Self::ConnectorType(connector) => {
                msg.connector_type = Some(ConnectorType {
                    connector: Some(connector),
                })
            }
            Self::Standby => msg.standby = true,
            Self::IdrRequest => msg.idr_request = true,
        }
        msg
    }
}
