//! Backend
//!
//! Handles socket reads/writes and byte buffering, keeps the table of live
//! objects and their listeners, and dispatches incoming events to them.
//!
//! Also implements debug printing to stderr when `WAYLAND_DEBUG` is set.
use rustix::io::Errno;
use std::{
    collections::HashMap,
    env, fmt, io,
    os::unix::{
        io::{AsFd, BorrowedFd},
        net::UnixStream,
    },
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
};

use crate::{
    protocol::{callback, display},
    util,
    wire::{self, Arg, Header, Interface, OwnedArg, ParseError, RequestError},
    Error, Object,
};

/// Handler for the events of one object, called with the opcode and decoded
/// arguments.
pub(crate) type Listener = Box<dyn FnMut(u16, &[OwnedArg]) + Send>;

#[derive(Debug, Default)]
struct Buffer {
    buf: Vec<u8>,
}

impl Buffer {
    fn flush_write(&mut self, socket: &UnixStream) -> io::Result<()> {
        while !self.buf.is_empty() {
            match util::send(socket, &self.buf) {
                Ok(written) => {
                    self.buf.drain(..written);
                }
                #[allow(unreachable_patterns)] // `WOULDBLOCK` and `AGAIN` typically equal
                Err(Errno::WOULDBLOCK | Errno::AGAIN) => util::poll_writable(socket, -1)?,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

struct ObjectEntry {
    interface: &'static Interface,
    // Taken out while the listener runs
    listener: Option<Listener>,
}

impl fmt::Debug for ObjectEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectEntry")
            .field("interface", &self.interface.name)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct ProtocolError {
    object_id: u32,
    code: u32,
    message: String,
}

#[derive(Debug)]
struct BackendState {
    next_id: u32,
    objects: HashMap<u32, ObjectEntry>,
    error: Option<ProtocolError>,
}

#[derive(Debug)]
struct BackendInner {
    socket: UnixStream,
    state: Mutex<BackendState>,
    read: Mutex<Buffer>,
    write: Mutex<Buffer>,
    debug: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Backend(Arc<BackendInner>);

#[derive(Clone, Debug)]
pub(crate) struct BackendWeak(Weak<BackendInner>);

impl BackendWeak {
    pub fn upgrade(&self) -> Option<Backend> {
        self.0.upgrade().map(Backend)
    }
}

impl AsFd for Backend {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.socket.as_fd()
    }
}

impl Backend {
    pub fn new(socket: UnixStream) -> io::Result<Self> {
        socket.set_nonblocking(true)?;
        let mut objects = HashMap::new();
        objects.insert(
            display::ID,
            ObjectEntry {
                interface: &display::INTERFACE,
                listener: None,
            },
        );
        Ok(Self(Arc::new(BackendInner {
            socket,
            state: Mutex::new(BackendState {
                next_id: display::ID + 1,
                objects,
                error: None,
            }),
            read: Mutex::new(Buffer::default()),
            write: Mutex::new(Buffer::default()),
            debug: is_wayland_debug(),
        })))
    }

    pub(crate) fn downgrade(&self) -> BackendWeak {
        BackendWeak(Arc::downgrade(&self.0))
    }

    pub fn display(&self) -> display::Display {
        display::Display(Object::new(
            self.downgrade(),
            display::ID,
            &display::INTERFACE,
            1,
        ))
    }

    /// Reads any pending data on the socket into the backend's internal buffer.
    ///
    /// Returns `UnexpectedEof` if end-of-file is reached.
    pub fn read(&self) -> io::Result<usize> {
        let mut read = self.0.read.lock().unwrap();

        let mut buf = [0; 4096];
        let mut total_count = 0;
        loop {
            match util::recv(&self.0.socket, &mut buf) {
                Ok(0) if total_count == 0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "unexpected EOF reading wayland socket",
                    ));
                }
                Ok(0) => {
                    return Ok(total_count);
                }
                Ok(count) => {
                    read.buf.extend_from_slice(&buf[0..count]);
                    total_count += count;
                }
                #[allow(unreachable_patterns)] // `WOULDBLOCK` and `AGAIN` typically equal
                Err(Errno::WOULDBLOCK | Errno::AGAIN) => {
                    return Ok(total_count);
                }
                // Hand over what was read first; the error shows up again next time
                Err(_) if total_count > 0 => return Ok(total_count),
                Err(err) => return Err(err.into()),
            };
        }
    }

    /// Removes the next complete message from the read buffer.
    fn next_message(&self) -> Result<Option<(Header, Vec<u8>)>, ParseError> {
        let mut read = self.0.read.lock().unwrap();
        let Some(header) = Header::peek(&read.buf) else {
            return Ok(None);
        };
        // Reject a bogus length before waiting for more bytes
        header.validate()?;
        if read.buf.len() < usize::from(header.length) {
            return Ok(None);
        }
        let (_, body) = wire::decode(&read.buf)?;
        let body = body.to_vec();
        read.buf.drain(..usize::from(header.length));
        Ok(Some((header, body)))
    }

    /// Dispatches every complete message in the read buffer to its object's
    /// listener. Returns the number of messages processed.
    ///
    /// Messages for unknown objects, and unknown opcodes on known objects, are
    /// dropped.
    pub fn dispatch_pending(&self) -> Result<usize, Error> {
        let mut count = 0;
        while let Some((header, body)) = self.next_message()? {
            self.dispatch(header, &body)?;
            count += 1;
        }
        Ok(count)
    }

    fn dispatch(&self, header: Header, body: &[u8]) -> Result<(), Error> {
        let Some(interface) = self.object_interface(header.object_id) else {
            tracing::trace!(
                object_id = header.object_id,
                opcode = header.opcode,
                "dropping event for unknown object"
            );
            return Ok(());
        };
        let Some(desc) = interface.event(header.opcode) else {
            tracing::trace!(
                interface = interface.name,
                object_id = header.object_id,
                opcode = header.opcode,
                "dropping unknown event"
            );
            return Ok(());
        };
        let args = wire::parse_args(desc.signature, body)?;
        if self.0.debug {
            let args: Vec<_> = args.iter().map(OwnedArg::as_arg).collect();
            self.print_msg(interface, header.object_id, desc.name, &args, true);
        }

        if header.object_id == display::ID {
            self.handle_display_event(header.opcode, &args);
            return Ok(());
        }

        let listener = self
            .0
            .state
            .lock()
            .unwrap()
            .objects
            .get_mut(&header.object_id)
            .and_then(|entry| entry.listener.take());
        if let Some(mut listener) = listener {
            listener(header.opcode, &args);
            // Put it back, unless the object went away meanwhile
            let mut state = self.0.state.lock().unwrap();
            if let Some(entry) = state.objects.get_mut(&header.object_id) {
                if entry.listener.is_none() {
                    entry.listener = Some(listener);
                }
            }
        }
        Ok(())
    }

    fn handle_display_event(&self, opcode: u16, args: &[OwnedArg]) {
        match (opcode, args) {
            (
                display::event::ERROR,
                [OwnedArg::Object(object_id), OwnedArg::Uint(code), OwnedArg::String(message)],
            ) => {
                let message = message.clone().unwrap_or_default();
                tracing::error!(object_id, code, %message, "protocol error");
                let mut state = self.0.state.lock().unwrap();
                if state.error.is_none() {
                    state.error = Some(ProtocolError {
                        object_id: *object_id,
                        code: *code,
                        message,
                    });
                }
            }
            (display::event::DELETE_ID, [OwnedArg::Uint(id)]) => {
                self.remove_id(*id);
            }
            _ => {}
        }
    }

    fn take_protocol_error(&self) -> Option<Error> {
        let error = self.0.state.lock().unwrap().error.take()?;
        Some(Error::Protocol {
            object_id: error.object_id,
            code: error.code,
            message: error.message,
        })
    }

    pub fn new_object(&self, interface: &'static Interface, version: u32) -> Object {
        let mut state = self.0.state.lock().unwrap();

        let id = state.next_id;
        state.next_id += 1;

        state.objects.insert(
            id,
            ObjectEntry {
                interface,
                listener: None,
            },
        );
        Object::new(self.downgrade(), id, interface, version)
    }

    pub fn set_listener(&self, id: u32, listener: Listener) {
        if let Some(entry) = self.0.state.lock().unwrap().objects.get_mut(&id) {
            entry.listener = Some(listener);
        }
    }

    pub fn remove_id(&self, id: u32) {
        self.0.state.lock().unwrap().objects.remove(&id);
    }

    pub fn object_interface(&self, id: u32) -> Option<&'static Interface> {
        self.0
            .state
            .lock()
            .unwrap()
            .objects
            .get(&id)
            .map(|entry| entry.interface)
    }

    fn print_msg(
        &self,
        interface: &Interface,
        object_id: u32,
        op_name: &str,
        args: &[Arg],
        incoming: bool,
    ) {
        if incoming {
            eprint!(" -> ");
        }
        eprint!("{}@{object_id}.{op_name}(", interface.name);
        let mut first = true;
        for arg in args {
            if !first {
                eprint!(", ");
            }
            first = false;
            eprint!("{arg}");
        }
        eprintln!(")");
    }

    /// Encodes a request into the write buffer. Nothing is sent until
    /// [`Backend::flush`].
    pub fn request(
        &self,
        object_id: u32,
        interface: &'static Interface,
        opcode: u16,
        args: &[Arg],
    ) -> Result<(), Error> {
        let desc = interface
            .request(opcode)
            .ok_or(RequestError::InvalidOpcode(interface.name, opcode))?;

        let mut write = self.0.write.lock().unwrap();
        wire::encode_into(&mut write.buf, object_id, opcode, args, desc.signature)?;

        if self.0.debug {
            self.print_msg(interface, object_id, desc.name, args, false);
        }
        Ok(())
    }

    /// Sends buffered messages.
    pub fn flush(&self) -> io::Result<()> {
        self.0.write.lock().unwrap().flush_write(&self.0.socket)
    }

    /// Blocks until the compositor has processed every request sent so far,
    /// and every event it sent in response has been dispatched.
    pub fn roundtrip(&self) -> Result<(), Error> {
        let done = Arc::new(AtomicBool::new(false));
        let callback = self.display().sync()?;
        let flag = done.clone();
        self.set_listener(
            callback.0.id(),
            Box::new(move |opcode, _args| {
                if opcode == callback::event::DONE {
                    flag.store(true, Ordering::Relaxed);
                }
            }),
        );
        self.flush().map_err(close_error)?;

        loop {
            self.dispatch_pending()?;
            if let Some(err) = self.take_protocol_error() {
                return Err(err);
            }
            if done.load(Ordering::Relaxed) {
                return Ok(());
            }
            util::poll_readable(self, -1)?;
            self.read().map_err(close_error)?;
        }
    }
}

fn close_error(err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset => Error::UnexpectedServerClose,
        _ => Error::Io(err),
    }
}

fn is_wayland_debug() -> bool {
    env::var_os("WAYLAND_DEBUG").is_some_and(|value| !value.is_empty())
}
