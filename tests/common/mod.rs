//! Scripted compositor on the far end of a socket pair.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::{Read, Write},
    net::Shutdown,
    os::unix::net::{UnixListener, UnixStream},
    path::Path,
    thread::{self, JoinHandle},
};

use wlr_vpointer::{
    protocol::{callback, display, registry, virtual_pointer, virtual_pointer_manager},
    wire::{self, Arg, Header, Interface, OwnedArg},
    Connection,
};

pub const MANAGER: &str = "zwlr_virtual_pointer_manager_v1";

/// A request received by the compositor.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub interface: &'static str,
    pub object_id: u32,
    pub name: &'static str,
    pub args: Vec<OwnedArg>,
}

impl Request {
    pub fn is(&self, interface: &str, name: &str) -> bool {
        self.interface == interface && self.name == name
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Failure {
    #[default]
    None,
    /// Send `wl_display.error` in response to the named request, then hang up.
    ErrorOn(&'static str),
    /// Hang up on receiving the named request.
    CloseOn(&'static str),
}

#[derive(Clone, Debug)]
pub struct FakeCompositor {
    pub globals: Vec<(u32, &'static str, u32)>,
    /// Send events the client doesn't know before every `wl_callback.done`.
    pub noise: bool,
    pub failure: Failure,
}

impl Default for FakeCompositor {
    fn default() -> Self {
        Self {
            globals: vec![
                (1, "wl_compositor", 6),
                (2, "wl_seat", 9),
                (3, MANAGER, 2),
                (4, "wl_output", 4),
            ],
            noise: false,
            failure: Failure::None,
        }
    }
}

fn interface_by_name(name: &str) -> Option<&'static Interface> {
    [
        &callback::INTERFACE,
        &registry::INTERFACE,
        &virtual_pointer_manager::INTERFACE,
        &virtual_pointer::INTERFACE,
    ]
    .into_iter()
    .find(|interface| interface.name == name)
}

impl FakeCompositor {
    /// Starts serving on one end of a socket pair. The thread returns every
    /// request it saw once the client hangs up.
    pub fn spawn(self) -> (Connection, JoinHandle<Vec<Request>>) {
        let (client, server) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || self.serve(server));
        (Connection::new(client).unwrap(), handle)
    }

    /// Listens on `path` and serves the first client that connects.
    pub fn listen(self, path: &Path) -> JoinHandle<Vec<Request>> {
        let listener = UnixListener::bind(path).unwrap();
        thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            self.serve(socket)
        })
    }

    fn serve(self, mut socket: UnixStream) -> Vec<Request> {
        let mut objects: HashMap<u32, &'static Interface> = HashMap::new();
        objects.insert(display::ID, &display::INTERFACE);
        let mut log = Vec::new();
        let mut buf = Vec::new();
        let mut chunk = [0; 4096];
        let mut serial = 0;

        loop {
            let count = socket.read(&mut chunk).unwrap_or(0);
            if count == 0 {
                return log;
            }
            buf.extend_from_slice(&chunk[..count]);

            while let Some(header) = Header::peek(&buf) {
                let length = usize::from(header.length);
                if buf.len() < length {
                    break;
                }
                let (header, body) = wire::decode(&buf).unwrap();
                let interface = objects[&header.object_id];
                let desc = interface.request(header.opcode).unwrap();
                let args = wire::parse_args(desc.signature, body).unwrap();
                buf.drain(..length);

                let request = Request {
                    interface: interface.name,
                    object_id: header.object_id,
                    name: desc.name,
                    args,
                };
                log.push(request.clone());

                match self.failure {
                    Failure::ErrorOn(name) if name == request.name => {
                        send(
                            &mut socket,
                            display::ID,
                            display::event::ERROR,
                            &[
                                Arg::Object(request.object_id),
                                Arg::Uint(7),
                                Arg::String("rejected"),
                            ],
                            "ous",
                        );
                        return hang_up(socket, log);
                    }
                    Failure::CloseOn(name) if name == request.name => return hang_up(socket, log),
                    _ => {}
                }

                match (request.interface, request.name, request.args.as_slice()) {
                    ("wl_display", "sync", [OwnedArg::NewId(id)]) => {
                        if self.noise {
                            self.send_noise(&mut socket, &objects);
                        }
                        serial += 1;
                        send(&mut socket, *id, callback::event::DONE, &[Arg::Uint(serial)], "u");
                        send(
                            &mut socket,
                            display::ID,
                            display::event::DELETE_ID,
                            &[Arg::Uint(*id)],
                            "u",
                        );
                    }
                    ("wl_display", "get_registry", [OwnedArg::NewId(id)]) => {
                        objects.insert(*id, &registry::INTERFACE);
                        for (name, interface, version) in &self.globals {
                            send(
                                &mut socket,
                                *id,
                                registry::event::GLOBAL,
                                &[Arg::Uint(*name), Arg::String(interface), Arg::Uint(*version)],
                                "usu",
                            );
                        }
                    }
                    (
                        "wl_registry",
                        "bind",
                        [
                            OwnedArg::Uint(_),
                            OwnedArg::String(Some(name)),
                            OwnedArg::Uint(_),
                            OwnedArg::NewId(id),
                        ],
                    ) => {
                        if let Some(interface) = interface_by_name(name) {
                            objects.insert(*id, interface);
                        }
                    }
                    (_, "create_virtual_pointer", [_, OwnedArg::NewId(id)]) => {
                        objects.insert(*id, &virtual_pointer::INTERFACE);
                    }
                    _ => {}
                }
            }
        }
    }

    fn send_noise(&self, socket: &mut UnixStream, objects: &HashMap<u32, &'static Interface>) {
        // Unknown opcode on every known non-display object
        for id in objects.keys().filter(|id| **id != display::ID) {
            send(socket, *id, 40, &[Arg::Uint(1), Arg::Uint(2)], "uu");
        }
        // Unknown object
        send(socket, 999, 0, &[Arg::String("who?")], "s");
        // Global removal is accepted and ignored
        if let Some(id) = objects
            .iter()
            .find(|(_, interface)| interface.name == "wl_registry")
            .map(|(id, _)| *id)
        {
            send(socket, id, registry::event::GLOBAL_REMOVE, &[Arg::Uint(1)], "u");
        }
    }
}

/// Stops sending, but keeps reading so nothing the client wrote is left
/// unread when the socket closes.
fn hang_up(mut socket: UnixStream, log: Vec<Request>) -> Vec<Request> {
    let _ = socket.shutdown(Shutdown::Write);
    let mut chunk = [0; 4096];
    while matches!(socket.read(&mut chunk), Ok(count) if count > 0) {}
    log
}

fn send(socket: &mut UnixStream, object_id: u32, opcode: u16, args: &[Arg], signature: &str) {
    socket
        .write_all(&wire::encode(object_id, opcode, args, signature).unwrap())
        .unwrap();
}

/// Requests sent to the virtual pointer, with `(name, args)`.
pub fn pointer_requests(log: &[Request]) -> Vec<(&'static str, Vec<OwnedArg>)> {
    log.iter()
        .filter(|request| request.interface == "zwlr_virtual_pointer_v1")
        .map(|request| (request.name, request.args.clone()))
        .collect()
}
