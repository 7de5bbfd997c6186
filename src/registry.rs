//! Discovery of compositor globals through `wl_registry`.

use std::sync::{Arc, Mutex};

use crate::{
    protocol::registry::{event, Registry},
    wire::{Listener, OwnedArg, Proxy},
    Connection, Error,
};

/// A global advertised by the compositor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Global {
    /// Numeric name, used to bind the global.
    pub name: u32,
    pub interface: String,
    pub version: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No registry object created yet.
    Unbound,
    /// `get_registry` sent; advertisements arrive with the next round-trip.
    AwaitingAdvertisements,
    Found,
    NotFoundAfterRoundtrip,
}

/// Registry client.
///
/// Advertisements are recorded by the registry's listener, in order, and
/// matched after a round-trip.
#[derive(Debug)]
pub struct RegistryClient {
    connection: Connection,
    registry: Option<Registry>,
    globals: Arc<Mutex<Vec<Global>>>,
    phase: Phase,
}

fn advertisement_listener(globals: Arc<Mutex<Vec<Global>>>) -> Listener {
    Box::new(move |opcode, args| match (opcode, args) {
        (
            event::GLOBAL,
            [OwnedArg::Uint(name), OwnedArg::String(Some(interface)), OwnedArg::Uint(version)],
        ) => {
            tracing::trace!(name, %interface, version, "global advertised");
            globals.lock().unwrap().push(Global {
                name: *name,
                interface: interface.clone(),
                version: *version,
            });
        }
        // Hot-unplug isn't handled
        (event::GLOBAL_REMOVE, [OwnedArg::Uint(name)]) => {
            tracing::debug!(name, "global removed");
        }
        _ => {}
    })
}

impl RegistryClient {
    pub fn new(connection: &Connection) -> Self {
        Self {
            connection: connection.clone(),
            registry: None,
            globals: Arc::default(),
            phase: Phase::Unbound,
        }
    }

    /// Creates the registry object and starts listening for globals.
    pub fn bind_registry(connection: &Connection) -> Result<Self, Error> {
        let mut client = Self::new(connection);
        client.bind()?;
        Ok(client)
    }

    fn bind(&mut self) -> Result<&Registry, Error> {
        let registry = match self.registry.take() {
            Some(registry) => registry,
            None => {
                let registry = self.connection.display().get_registry()?;
                registry.0.set_listener(advertisement_listener(self.globals.clone()));
                self.phase = Phase::AwaitingAdvertisements;
                registry
            }
        };
        Ok(self.registry.insert(registry))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Globals advertised so far.
    pub fn globals(&self) -> Vec<Global> {
        self.globals.lock().unwrap().clone()
    }

    /// Round-trips, then returns the first global advertised as `interface`.
    pub fn find_global(&mut self, interface: &'static str) -> Result<Global, Error> {
        self.bind()?;
        self.connection.roundtrip()?;
        let found = self
            .globals
            .lock()
            .unwrap()
            .iter()
            .find(|global| global.interface == interface)
            .cloned();
        match found {
            Some(global) => {
                tracing::debug!(
                    interface,
                    name = global.name,
                    version = global.version,
                    "found global"
                );
                self.phase = Phase::Found;
                Ok(global)
            }
            None => {
                self.phase = Phase::NotFoundAfterRoundtrip;
                Err(Error::CapabilityUnavailable(interface))
            }
        }
    }

    /// Binds `global` as `P`, at the lower of `version` and the advertised
    /// version.
    pub fn bind_global<P: Proxy>(&mut self, global: &Global, version: u32) -> Result<P, Error> {
        let version = version.min(global.version);
        let proxy = self.bind()?.bind::<P>(global.name, version)?;
        tracing::debug!(interface = P::INTERFACE.name, version, "bound global");
        Ok(proxy)
    }
}
