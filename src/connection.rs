//! Connection to the compositor.

use std::{
    env, fmt, io,
    os::unix::{
        io::{AsFd, AsRawFd, BorrowedFd, RawFd},
        net::UnixStream,
    },
    path::{Path, PathBuf},
};

use crate::{protocol::display::Display, wire::Backend, Error};

/// Error returned from [`Connection::connect_to_env`]
#[derive(Debug)]
pub enum ConnectError {
    /// `WAYLAND_DISPLAY` is relative and `XDG_RUNTIME_DIR` is not set
    RuntimeDirNotSet,
    /// Connecting to the socket failed
    Io(PathBuf, io::Error),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuntimeDirNotSet => write!(
                f,
                "environment variable XDG_RUNTIME_DIR is not set or invalid"
            ),
            Self::Io(path, err) => write!(f, "{}: {err}", path.display()),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RuntimeDirNotSet => None,
            Self::Io(_, err) => Some(err),
        }
    }
}

/// Resolves the compositor socket from `WAYLAND_DISPLAY` and `XDG_RUNTIME_DIR`.
pub fn socket_path() -> Result<PathBuf, ConnectError> {
    let display = env::var_os("WAYLAND_DISPLAY")
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "wayland-0".into());
    let display = PathBuf::from(display);
    if display.is_absolute() {
        return Ok(display);
    }
    let runtime_dir = env::var_os("XDG_RUNTIME_DIR")
        .filter(|dir| !dir.is_empty())
        .ok_or(ConnectError::RuntimeDirNotSet)?;
    Ok(PathBuf::from(runtime_dir).join(display))
}

/// A connection to the compositor.
///
/// Clones share the same socket and object table.
#[derive(Clone, Debug)]
pub struct Connection(pub(crate) Backend);

impl AsFd for Connection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl AsRawFd for Connection {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_fd().as_raw_fd()
    }
}

impl Connection {
    /// Creates a connection from a connected socket.
    ///
    /// ```no_run
    /// use std::os::unix::net::UnixStream;
    /// use wlr_vpointer::Connection;
    ///
    /// let (client_socket, _server_socket) = UnixStream::pair().unwrap();
    /// let connection = Connection::new(client_socket).unwrap();
    /// ```
    pub fn new(socket: UnixStream) -> io::Result<Self> {
        Ok(Self(Backend::new(socket)?))
    }

    /// Connects to the socket at `path`.
    pub fn connect_to_path(path: &Path) -> Result<Self, ConnectError> {
        let socket =
            UnixStream::connect(path).map_err(|err| ConnectError::Io(path.to_owned(), err))?;
        let connection =
            Self::new(socket).map_err(|err| ConnectError::Io(path.to_owned(), err))?;
        tracing::debug!(path = %path.display(), "connected to compositor");
        Ok(connection)
    }

    /// Connects to the compositor named by the environment, see [`socket_path`].
    pub fn connect_to_env() -> Result<Self, ConnectError> {
        Self::connect_to_path(&socket_path()?)
    }

    /// The `wl_display` singleton.
    pub fn display(&self) -> Display {
        self.0.display()
    }

    /// Reads any pending data on the socket into the internal buffer.
    ///
    /// Returns `UnexpectedEof` if end-of-file is reached.
    pub fn read(&self) -> io::Result<usize> {
        self.0.read()
    }

    /// Dispatches buffered events to object listeners.
    pub fn dispatch_pending(&self) -> Result<usize, Error> {
        self.0.dispatch_pending()
    }

    /// Sends buffered requests.
    pub fn flush(&self) -> io::Result<()> {
        self.0.flush()
    }

    /// Flushes and blocks until the compositor has caught up.
    pub fn roundtrip(&self) -> Result<(), Error> {
        self.0.roundtrip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment is process-global, so all cases live in one test
    #[test]
    fn resolves_socket_path() {
        env::set_var("XDG_RUNTIME_DIR", "/run/user/1000");
        env::set_var("WAYLAND_DISPLAY", "wayland-1");
        assert_eq!(
            socket_path().unwrap(),
            PathBuf::from("/run/user/1000/wayland-1")
        );

        env::set_var("WAYLAND_DISPLAY", "/tmp/compositor.sock");
        assert_eq!(
            socket_path().unwrap(),
            PathBuf::from("/tmp/compositor.sock")
        );

        env::remove_var("WAYLAND_DISPLAY");
        assert_eq!(
            socket_path().unwrap(),
            PathBuf::from("/run/user/1000/wayland-0")
        );

        env::remove_var("XDG_RUNTIME_DIR");
        assert!(matches!(socket_path(), Err(ConnectError::RuntimeDirNotSet)));

        assert!(matches!(
            Connection::connect_to_path(Path::new("/nonexistent/wayland-9")),
            Err(ConnectError::Io(..))
        ));
    }
}
