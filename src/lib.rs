//! Pure Rust client for the wlroots virtual pointer protocol
//! (`zwlr_virtual_pointer_manager_v1`).
//!
//! The crate speaks the Wayland wire format directly over the compositor's
//! Unix socket, without `libwayland-client`. It knows only the handful of
//! interfaces needed to create a virtual pointer and drive it:
//!
//! ```no_run
//! use wlr_vpointer::{Connection, Session};
//!
//! let session = Session::establish(Connection::connect_to_env()?)?;
//! session.move_absolute(400, 300, 800, 600)?;
//! session.roundtrip()?;
//! # Ok::<(), wlr_vpointer::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod command;
mod connection;
mod error;
mod object;
pub mod protocol;
pub mod registry;
pub mod session;
mod util;
pub mod wire;

pub use command::{Command, Dispatcher};
pub use connection::{socket_path, ConnectError, Connection};
pub use error::Error;
pub use object::Object;
pub use session::Session;
pub use wire::Proxy;

mod private {
    pub trait Sealed {}
}
