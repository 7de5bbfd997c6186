use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    wire::{Arg, Backend, BackendWeak, Interface, Listener, Proxy},
    Error,
};

struct ObjectInner {
    backend: BackendWeak,
    id: u32,
    interface: &'static Interface,
    version: u32,
}

/// Handle to a protocol object. Clones refer to the same object.
#[derive(Clone)]
pub struct Object(Arc<ObjectInner>);

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.interface().name, self.id())
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl Object {
    pub(crate) fn new(
        backend: BackendWeak,
        id: u32,
        interface: &'static Interface,
        version: u32,
    ) -> Self {
        Self(Arc::new(ObjectInner {
            backend,
            id,
            interface,
            version,
        }))
    }

    /// Returns the backend, or `None` once the connection has been dropped.
    pub(crate) fn backend(&self) -> Option<Backend> {
        self.0.backend.upgrade()
    }

    pub fn id(&self) -> u32 {
        self.0.id
    }

    pub fn interface(&self) -> &'static Interface {
        self.0.interface
    }

    pub fn version(&self) -> u32 {
        self.0.version
    }

    pub fn as_arg(&self) -> Arg<'_> {
        Arg::Object(self.id())
    }

    pub(crate) fn request(&self, opcode: u16, args: &[Arg]) -> Result<(), Error> {
        let backend = self.backend().ok_or(Error::UnexpectedServerClose)?;
        backend.request(self.id(), self.interface(), opcode, args)
    }

    /// Allocates a new object and sends a request creating it.
    ///
    /// `args` receives the new object id.
    pub(crate) fn request_new<T: Proxy>(
        &self,
        opcode: u16,
        version: u32,
        args: impl FnOnce(u32) -> Vec<Arg<'static>>,
    ) -> Result<T, Error> {
        let backend = self.backend().ok_or(Error::UnexpectedServerClose)?;
        let object = backend.new_object(T::INTERFACE, version);
        backend.request(self.id(), self.interface(), opcode, &args(object.id()))?;
        Ok(object.downcast_unchecked())
    }

    /// Installs the handler for events on this object, replacing any previous one.
    pub(crate) fn set_listener(&self, listener: Listener) {
        if let Some(backend) = self.backend() {
            backend.set_listener(self.id(), listener);
        }
    }

    pub fn downcast_unchecked<T: Proxy>(self) -> T {
        T::new_unchecked(self)
    }
}
