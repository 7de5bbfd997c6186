//! Virtual pointer session: bootstrap and pointer operations.

use crate::{
    protocol::{
        virtual_pointer::{Axis, ButtonState, VirtualPointer},
        virtual_pointer_manager::VirtualPointerManager,
    },
    registry::RegistryClient,
    util,
    wire::{Fixed, Proxy},
    Connection, Error,
};

/// Bootstrap steps of [`Session::establish`], logged as they are reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    RegistryBound,
    ManagerBound,
    PointerReady,
    Active,
}

/// Source of event timestamps, in milliseconds.
pub type Clock = fn() -> u32;

/// An established virtual pointer.
///
/// Every operation sends one pointer request followed by `frame`. Requests
/// are buffered; call [`Session::roundtrip`] to send them and wait for the
/// compositor.
#[derive(Debug)]
pub struct Session {
    connection: Connection,
    manager: VirtualPointerManager,
    pointer: VirtualPointer,
    clock: Clock,
}

impl Session {
    /// Binds the virtual pointer manager and creates a pointer on the
    /// default seat.
    ///
    /// Each new object is confirmed with a round-trip before it is used.
    pub fn establish(connection: Connection) -> Result<Self, Error> {
        let mut state = SessionState::Disconnected;

        let mut registry = RegistryClient::bind_registry(&connection)?;
        transition(&mut state, SessionState::RegistryBound);

        let global = registry.find_global(VirtualPointerManager::INTERFACE.name)?;
        let manager: VirtualPointerManager =
            registry.bind_global(&global, VirtualPointerManager::INTERFACE.version)?;
        connection.roundtrip()?;
        transition(&mut state, SessionState::ManagerBound);

        let pointer = manager.create_virtual_pointer(None)?;
        connection.roundtrip()?;
        transition(&mut state, SessionState::PointerReady);

        transition(&mut state, SessionState::Active);
        Ok(Self {
            connection,
            manager,
            pointer,
            clock: util::timestamp_ms,
        })
    }

    /// Replaces the timestamp source.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn manager(&self) -> &VirtualPointerManager {
        &self.manager
    }

    pub fn pointer(&self) -> &VirtualPointer {
        &self.pointer
    }

    fn now(&self) -> u32 {
        (self.clock)()
    }

    pub fn move_relative(&self, dx: f64, dy: f64) -> Result<(), Error> {
        self.pointer.motion(self.now(), Fixed::from_f64(dx), Fixed::from_f64(dy))?;
        self.pointer.frame()
    }

    /// Moves to `x / x_extent`, `y / y_extent` of the output layout.
    pub fn move_absolute(
        &self,
        x: u32,
        y: u32,
        x_extent: u32,
        y_extent: u32,
    ) -> Result<(), Error> {
        self.pointer.motion_absolute(self.now(), x, y, x_extent, y_extent)?;
        self.pointer.frame()
    }

    pub fn click(&self, button: u32, pressed: bool) -> Result<(), Error> {
        self.pointer.button(self.now(), button, ButtonState::from(pressed))?;
        self.pointer.frame()
    }

    pub fn scroll(&self, axis: Axis, value: f64) -> Result<(), Error> {
        self.pointer.axis(self.now(), axis, Fixed::from_f64(value))?;
        self.pointer.frame()
    }

    pub fn roundtrip(&self) -> Result<(), Error> {
        self.connection.roundtrip()
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    tracing::debug!(from = ?*state, to = ?next, "session state");
    *state = next;
}
