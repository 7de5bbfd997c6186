//! Protocol definitions for the interfaces this client speaks.
//!
//! Each module holds the static [`Interface`](crate::wire::Interface)
//! descriptor, opcode constants, and a typed proxy with one method per request.
//! Request and event tables must match the published XML exactly; the
//! compositor identifies messages by index.

use crate::wire::{Interface, MessageDesc};

/// Core global object.
///
/// Client-side definitions for interface `wl_display`. The display always has
/// object id 1.
pub mod display {
    use super::{Interface, MessageDesc};
    use crate::{protocol::callback::Callback, protocol::registry::Registry, wire, Error};

    pub const ID: u32 = 1;

    pub const INTERFACE: Interface = Interface {
        name: "wl_display",
        version: 1,
        requests: &[
            MessageDesc {
                name: "sync",
                signature: "n",
            },
            MessageDesc {
                name: "get_registry",
                signature: "n",
            },
        ],
        events: &[
            MessageDesc {
                name: "error",
                signature: "ous",
            },
            MessageDesc {
                name: "delete_id",
                signature: "u",
            },
        ],
    };

    pub mod request {
        pub const SYNC: u16 = 0;
        pub const GET_REGISTRY: u16 = 1;
    }

    pub mod event {
        pub const ERROR: u16 = 0;
        pub const DELETE_ID: u16 = 1;
    }

    #[derive(Clone, Debug, Hash, Eq, PartialEq)]
    pub struct Display(pub(crate) crate::Object);

    impl crate::private::Sealed for Display {}

    impl wire::Proxy for Display {
        const INTERFACE: &'static Interface = &INTERFACE;

        fn new_unchecked(object: crate::Object) -> Self {
            Self(object)
        }

        fn as_object(&self) -> &crate::Object {
            &self.0
        }
    }

    impl Display {
        /// Asynchronous roundtrip.
        ///
        /// The compositor answers with `wl_callback.done` on the returned
        /// object once every earlier request has been handled.
        pub fn sync(&self) -> Result<Callback, Error> {
            self.0.request_new(request::SYNC, 1, |id| vec![wire::Arg::NewId(id)])
        }

        /// Creates a registry object listing the compositor's globals.
        pub fn get_registry(&self) -> Result<Registry, Error> {
            self.0.request_new(request::GET_REGISTRY, 1, |id| vec![wire::Arg::NewId(id)])
        }
    }
}

/// Global registry object.
///
/// Client-side definitions for interface `wl_registry`.
pub mod registry {
    use super::{Interface, MessageDesc};
    use crate::{wire, Error};

    pub const INTERFACE: Interface = Interface {
        name: "wl_registry",
        version: 1,
        requests: &[MessageDesc {
            name: "bind",
            signature: "usun",
        }],
        events: &[
            MessageDesc {
                name: "global",
                signature: "usu",
            },
            MessageDesc {
                name: "global_remove",
                signature: "u",
            },
        ],
    };

    pub mod request {
        pub const BIND: u16 = 0;
    }

    pub mod event {
        pub const GLOBAL: u16 = 0;
        pub const GLOBAL_REMOVE: u16 = 1;
    }

    #[derive(Clone, Debug, Hash, Eq, PartialEq)]
    pub struct Registry(pub(crate) crate::Object);

    impl crate::private::Sealed for Registry {}

    impl wire::Proxy for Registry {
        const INTERFACE: &'static Interface = &INTERFACE;

        fn new_unchecked(object: crate::Object) -> Self {
            Self(object)
        }

        fn as_object(&self) -> &crate::Object {
            &self.0
        }
    }

    impl Registry {
        /// Binds the global with numeric `name` as interface `P`.
        ///
        /// The new id is untyped on the wire, so the interface name and
        /// version are sent along with it.
        pub fn bind<P: wire::Proxy>(&self, name: u32, version: u32) -> Result<P, Error> {
            self.0.request_new(request::BIND, version, |id| {
                vec![
                    wire::Arg::Uint(name),
                    wire::Arg::String(P::INTERFACE.name),
                    wire::Arg::Uint(version),
                    wire::Arg::NewId(id),
                ]
            })
        }
    }
}

/// Callback object.
///
/// Client-side definitions for interface `wl_callback`.
pub mod callback {
    use super::{Interface, MessageDesc};
    use crate::wire;

    pub const INTERFACE: Interface = Interface {
        name: "wl_callback",
        version: 1,
        requests: &[],
        events: &[MessageDesc {
            name: "done",
            signature: "u",
        }],
    };

    pub mod event {
        pub const DONE: u16 = 0;
    }

    #[derive(Clone, Debug, Hash, Eq, PartialEq)]
    pub struct Callback(pub(crate) crate::Object);

    impl crate::private::Sealed for Callback {}

    impl wire::Proxy for Callback {
        const INTERFACE: &'static Interface = &INTERFACE;

        fn new_unchecked(object: crate::Object) -> Self {
            Self(object)
        }

        fn as_object(&self) -> &crate::Object {
            &self.0
        }
    }
}

/// Virtual pointer manager.
///
/// Client-side definitions for interface `zwlr_virtual_pointer_manager_v1`.
/// This object allows clients to create individual virtual pointer objects.
pub mod virtual_pointer_manager {
    use super::{Interface, MessageDesc};
    use crate::{protocol::virtual_pointer::VirtualPointer, wire, Error, Object};

    pub const INTERFACE: Interface = Interface {
        name: "zwlr_virtual_pointer_manager_v1",
        version: 1,
        requests: &[
            MessageDesc {
                name: "create_virtual_pointer",
                signature: "?on",
            },
            MessageDesc {
                name: "destroy",
                signature: "",
            },
        ],
        events: &[],
    };

    pub mod request {
        pub const CREATE_VIRTUAL_POINTER: u16 = 0;
        pub const DESTROY: u16 = 1;
    }

    #[derive(Clone, Debug, Hash, Eq, PartialEq)]
    pub struct VirtualPointerManager(pub(crate) crate::Object);

    impl crate::private::Sealed for VirtualPointerManager {}

    impl wire::Proxy for VirtualPointerManager {
        const INTERFACE: &'static Interface = &INTERFACE;

        fn new_unchecked(object: crate::Object) -> Self {
            Self(object)
        }

        fn as_object(&self) -> &crate::Object {
            &self.0
        }
    }

    impl VirtualPointerManager {
        /// Creates a new virtual pointer.
        ///
        /// A `None` seat lets the compositor pick its default seat.
        pub fn create_virtual_pointer(
            &self,
            seat: Option<&Object>,
        ) -> Result<VirtualPointer, Error> {
            let seat = seat.map_or(wire::Arg::Null, |seat| wire::Arg::Object(seat.id()));
            self.0.request_new(request::CREATE_VIRTUAL_POINTER, 1, |id| {
                vec![seat, wire::Arg::NewId(id)]
            })
        }
    }
}

/// Virtual pointer.
///
/// Client-side definitions for interface `zwlr_virtual_pointer_v1`.
/// State changes only take effect at the next `frame` request.
pub mod virtual_pointer {
    use super::{Interface, MessageDesc};
    use crate::{
        wire::{self, Fixed},
        Error,
    };

    pub const INTERFACE: Interface = Interface {
        name: "zwlr_virtual_pointer_v1",
        version: 1,
        requests: &[
            MessageDesc {
                name: "motion",
                signature: "uff",
            },
            MessageDesc {
                name: "motion_absolute",
                signature: "uuuuu",
            },
            MessageDesc {
                name: "button",
                signature: "uuu",
            },
            MessageDesc {
                name: "axis",
                signature: "uuf",
            },
            MessageDesc {
                name: "frame",
                signature: "",
            },
            MessageDesc {
                name: "axis_source",
                signature: "u",
            },
            MessageDesc {
                name: "axis_stop",
                signature: "uu",
            },
            MessageDesc {
                name: "axis_discrete",
                signature: "uufi",
            },
            MessageDesc {
                name: "destroy",
                signature: "",
            },
        ],
        events: &[],
    };

    pub mod request {
        pub const MOTION: u16 = 0;
        pub const MOTION_ABSOLUTE: u16 = 1;
        pub const BUTTON: u16 = 2;
        pub const AXIS: u16 = 3;
        pub const FRAME: u16 = 4;
        pub const AXIS_SOURCE: u16 = 5;
        pub const AXIS_STOP: u16 = 6;
        pub const AXIS_DISCRETE: u16 = 7;
        pub const DESTROY: u16 = 8;
    }

    /// Physical button state, as in `wl_pointer.button_state`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum ButtonState {
        Released = 0,
        Pressed = 1,
    }

    impl From<bool> for ButtonState {
        fn from(pressed: bool) -> Self {
            if pressed {
                Self::Pressed
            } else {
                Self::Released
            }
        }
    }

    /// Axis type, as in `wl_pointer.axis`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub enum Axis {
        VerticalScroll = 0,
        HorizontalScroll = 1,
    }

    impl TryFrom<u32> for Axis {
        type Error = u32;

        fn try_from(value: u32) -> Result<Self, u32> {
            match value {
                0 => Ok(Self::VerticalScroll),
                1 => Ok(Self::HorizontalScroll),
                other => Err(other),
            }
        }
    }

    #[derive(Clone, Debug, Hash, Eq, PartialEq)]
    pub struct VirtualPointer(pub(crate) crate::Object);

    impl crate::private::Sealed for VirtualPointer {}

    impl wire::Proxy for VirtualPointer {
        const INTERFACE: &'static Interface = &INTERFACE;

        fn new_unchecked(object: crate::Object) -> Self {
            Self(object)
        }

        fn as_object(&self) -> &crate::Object {
            &self.0
        }
    }

    impl VirtualPointer {
        /// Pointer relative motion event.
        pub fn motion(&self, time: u32, dx: Fixed, dy: Fixed) -> Result<(), Error> {
            self.0.request(
                request::MOTION,
                &[
                    wire::Arg::Uint(time),
                    wire::Arg::Fixed(dx),
                    wire::Arg::Fixed(dy),
                ],
            )
        }

        /// Pointer absolute motion event.
        ///
        /// The position is `x / x_extent`, `y / y_extent` of the output
        /// layout.
        pub fn motion_absolute(
            &self,
            time: u32,
            x: u32,
            y: u32,
            x_extent: u32,
            y_extent: u32,
        ) -> Result<(), Error> {
            self.0.request(
                request::MOTION_ABSOLUTE,
                &[
                    wire::Arg::Uint(time),
                    wire::Arg::Uint(x),
                    wire::Arg::Uint(y),
                    wire::Arg::Uint(x_extent),
                    wire::Arg::Uint(y_extent),
                ],
            )
        }

        /// Button event. `button` is a Linux input event code like `BTN_LEFT`.
        pub fn button(&self, time: u32, button: u32, state: ButtonState) -> Result<(), Error> {
            self.0.request(
                request::BUTTON,
                &[
                    wire::Arg::Uint(time),
                    wire::Arg::Uint(button),
                    wire::Arg::Uint(state as u32),
                ],
            )
        }

        /// Axis event.
        pub fn axis(&self, time: u32, axis: Axis, value: Fixed) -> Result<(), Error> {
            self.0.request(
                request::AXIS,
                &[
                    wire::Arg::Uint(time),
                    wire::Arg::Uint(axis as u32),
                    wire::Arg::Fixed(value),
                ],
            )
        }

        /// Marks the end of a set of events that belong together.
        pub fn frame(&self) -> Result<(), Error> {
            self.0.request(request::FRAME, &[])
        }    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::signature_args;

    #[test]
    fn signatures_are_supported() {
        for interface in [
            &display::INTERFACE,
            &registry::INTERFACE,
            &callback::INTERFACE,
            &virtual_pointer_manager::INTERFACE,
            &virtual_pointer::INTERFACE,
        ] {
            for desc in interface.requests.iter().chain(interface.events) {
                assert!(
                    signature_args(desc.signature).all(|arg| arg.is_ok()),
                    "{}.{}",
                    interface.name,
                    desc.name
                );
            }
        }
    }

    #[test]
    fn opcodes_match_tables() {
        use virtual_pointer::{request, INTERFACE};
        for (opcode, name) in [
            (request::MOTION, "motion"),
            (request::MOTION_ABSOLUTE, "motion_absolute"),
            (request::BUTTON, "button"),
            (request::AXIS, "axis"),
            (request::FRAME, "frame"),
            (request::DESTROY, "destroy"),
        ] {
            assert_eq!(INTERFACE.request(opcode).unwrap().name, name);
        }
        assert_eq!(
            display::INTERFACE
                .request(display::request::GET_REGISTRY)
                .unwrap()
                .name,
            "get_registry"
        );
    }
}
