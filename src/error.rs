use crate::{connection::ConnectError, wire::ParseError, wire::RequestError};
use std::{fmt, io};

/// An error coming from the `wlr_vpointer` crate
#[derive(Debug)]
pub enum Error {
    /// Couldn't connect to the compositor.
    ConnectFailed(ConnectError),
    /// The compositor doesn't advertise a required global.
    CapabilityUnavailable(&'static str),
    /// Request couldn't be encoded.
    MalformedRequest(RequestError),
    /// Compositor closed the connection.
    UnexpectedServerClose,
    /// Fatal protocol error reported by the compositor.
    Protocol {
        object_id: u32,
        code: u32,
        message: String,
    },
    /// Wire format parse error in a message from the compositor.
    Parse(ParseError),
    /// I/O error.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectFailed(err) => write!(f, "failed to connect to compositor: {err}"),
            Self::CapabilityUnavailable(interface) => {
                write!(f, "compositor doesn't support '{interface}'")
            }
            Self::MalformedRequest(err) => write!(f, "malformed request: {err}"),
            Self::UnexpectedServerClose => write!(f, "compositor closed the connection"),
            Self::Protocol {
                object_id,
                code,
                message,
            } => write!(
                f,
                "protocol error {code} on object {object_id}: {message}"
            ),
            Self::Parse(err) => write!(f, "parse error: {err}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl From<ConnectError> for Error {
    fn from(err: ConnectError) -> Self {
        Self::ConnectFailed(err)
    }
}

impl From<RequestError> for Error {
    fn from(err: RequestError) -> Self {
        Self::MalformedRequest(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConnectFailed(err) => Some(err),
            Self::MalformedRequest(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::CapabilityUnavailable(_) | Self::UnexpectedServerClose | Self::Protocol { .. } => {
                None
            }
        }
    }
}
