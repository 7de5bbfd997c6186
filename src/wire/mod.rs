//! Wayland wire protocol.
//!
//! This is the lowest level component of the crate. It provides serialization
//! and deserialization of messages, and a backend that uses Rustix to handle
//! socket IO.
use std::{fmt, str::Utf8Error};

use crate::Object;

mod arg;
pub use arg::{signature_args, Arg, ArgType, Fixed, OwnedArg, SignatureArg};
mod backend;
pub(crate) use backend::{Backend, BackendWeak, Listener};

/// Size of a message header in bytes.
pub const HEADER_LEN: usize = 8;

/// Largest message the 16-bit length field can describe, rounded down to
/// 32-bit alignment.
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize & !3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub object_id: u32,
    pub opcode: u16,
    /// Total message length, including the header.
    pub length: u16,
}

impl Header {
    pub fn parse(bytes: [u8; HEADER_LEN]) -> Self {
        let [a, b, c, d, e, f, g, h] = bytes;
        let word = u32::from_ne_bytes([e, f, g, h]);
        Self {
            object_id: u32::from_ne_bytes([a, b, c, d]),
            opcode: (word & 0xffff) as u16,
            length: (word >> 16) as u16,
        }
    }

    /// Parses the header at the start of `bytes`, if there are enough bytes.
    pub fn peek(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..HEADER_LEN)?;
        let mut arr = [0; HEADER_LEN];
        arr.copy_from_slice(header);
        Some(Self::parse(arr))
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let word = u32::from(self.length) << 16 | u32::from(self.opcode);
        let mut bytes = [0; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.object_id.to_ne_bytes());
        bytes[4..8].copy_from_slice(&word.to_ne_bytes());
        bytes
    }

    fn validate(&self) -> Result<(), ParseError> {
        if (self.length as usize) < HEADER_LEN {
            Err(ParseError::HeaderLength(self.length))
        } else if self.length % 4 != 0 {
            Err(ParseError::UnalignedLength(self.length))
        } else {
            Ok(())
        }
    }
}

/// Static description of a request or an event.
#[derive(Debug)]
pub struct MessageDesc {
    pub name: &'static str,
    pub signature: &'static str,
}

/// Static description of an interface.
#[derive(Debug)]
pub struct Interface {
    pub name: &'static str,
    pub version: u32,
    /// Requests, indexed by opcode.
    pub requests: &'static [MessageDesc],
    /// Events, indexed by opcode.
    pub events: &'static [MessageDesc],
}

impl Interface {
    pub fn request(&self, opcode: u16) -> Option<&'static MessageDesc> {
        self.requests.get(usize::from(opcode))
    }

    pub fn event(&self, opcode: u16) -> Option<&'static MessageDesc> {
        self.events.get(usize::from(opcode))
    }
}

/// Trait for interface proxies
pub trait Proxy: crate::private::Sealed {
    /// Descriptor of the interface, like `zwlr_virtual_pointer_v1`.
    const INTERFACE: &'static Interface;

    /// Returns an interface proxy without checking [`Object::interface`].
    fn new_unchecked(object: Object) -> Self;

    /// Returns a reference to the object contained in the interface proxy.
    fn as_object(&self) -> &Object;

    /// Returns an `Arg` to reference this object in requests.
    fn as_arg(&self) -> Arg<'_> {
        self.as_object().as_arg()
    }
}

/// Appends one encoded message to `buf`.
///
/// On error `buf` is left as it was.
pub(crate) fn encode_into(
    buf: &mut Vec<u8>,
    object_id: u32,
    opcode: u16,
    args: &[Arg],
    signature: &str,
) -> Result<(), RequestError> {
    let start = buf.len();
    let result = write_message(buf, object_id, opcode, args, signature);
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

fn write_message(
    buf: &mut Vec<u8>,
    object_id: u32,
    opcode: u16,
    args: &[Arg],
    signature: &str,
) -> Result<(), RequestError> {
    let start = buf.len();

    // Leave space for header
    buf.extend([0; HEADER_LEN]);

    let mut count = 0;
    for (index, sig_arg) in signature_args(signature).enumerate() {
        let sig_arg = sig_arg.map_err(RequestError::UnsupportedType)?;
        if matches!(sig_arg.ty, ArgType::Array | ArgType::Fd) {
            return Err(RequestError::UnsupportedType(sig_arg.ty.as_char()));
        }
        let arg = args.get(index).ok_or(RequestError::MissingArgument {
            index,
            expected: sig_arg.ty.as_char(),
        })?;
        arg.write(buf);
        count += 1;
    }
    if args.len() > count {
        return Err(RequestError::TooManyArguments {
            expected: count,
            found: args.len(),
        });
    }

    let length = buf.len() - start;
    if length > MAX_MESSAGE_LEN {
        return Err(RequestError::MessageTooLong(length));
    }

    // Write header now we know the length
    let header = Header {
        object_id,
        opcode,
        length: length as u16,
    };
    buf[start..start + HEADER_LEN].copy_from_slice(&header.to_bytes());
    Ok(())
}

/// Encodes a single message.
///
/// The type of each argument is trusted to match its signature character;
/// only the number of arguments and the total length are checked.
pub fn encode(
    object_id: u32,
    opcode: u16,
    args: &[Arg],
    signature: &str,
) -> Result<Vec<u8>, RequestError> {
    let mut buf = Vec::new();
    encode_into(&mut buf, object_id, opcode, args, signature)?;
    Ok(buf)
}

/// Splits the first message in `bytes` into its header and argument bytes.
pub fn decode(bytes: &[u8]) -> Result<(Header, &[u8]), ParseError> {
    let header = Header::peek(bytes).ok_or(ParseError::EndOfMessage)?;
    header.validate()?;
    let body = bytes
        .get(HEADER_LEN..usize::from(header.length))
        .ok_or(ParseError::EndOfMessage)?;
    Ok((header, body))
}

/// Parses argument bytes according to `signature`.
pub fn parse_args(signature: &str, bytes: &[u8]) -> Result<Vec<OwnedArg>, ParseError> {
    let mut stream = ByteStream { bytes };
    let args = signature_args(signature)
        .map(|sig_arg| {
            let sig_arg = sig_arg.map_err(ParseError::UnsupportedType)?;
            OwnedArg::parse(&mut stream, sig_arg)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if !stream.bytes.is_empty() {
        return Err(ParseError::MessageLength(
            bytes.len(),
            bytes.len() - stream.bytes.len(),
        ));
    }
    Ok(args)
}

pub(crate) struct ByteStream<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteStream<'a> {
    fn read_n(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if self.bytes.len() >= n {
            let (head, tail) = self.bytes.split_at(n);
            self.bytes = tail;
            Ok(head)
        } else {
            Err(ParseError::EndOfMessage)
        }
    }

    fn read<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut arr = [0; N];
        arr.copy_from_slice(self.read_n(N)?);
        Ok(arr)
    }

    fn read_string(&mut self) -> Result<Option<String>, ParseError> {
        let len = u32::from_ne_bytes(self.read()?) as usize;
        if len == 0 {
            return Ok(None);
        }
        let bytes = self.read_n(len.next_multiple_of(4))?;
        // Exclude NUL and padding
        let (contents, rest) = bytes.split_at(len - 1);
        if rest[0] != b'\0' {
            return Err(ParseError::MissingNul);
        }
        Ok(Some(std::str::from_utf8(contents)?.to_owned()))
    }
}

/// Wire format parse error.
#[derive(Debug)]
pub enum ParseError {
    /// End of message while parsing argument.
    EndOfMessage,
    /// Invalid UTF-8 string in message.
    Utf8(Utf8Error),
    /// String is not NUL terminated.
    MissingNul,
    /// Signature names a type this client can't handle.
    UnsupportedType(char),
    /// Message header is too short.
    HeaderLength(u16),
    /// Message length isn't a multiple of 4.
    UnalignedLength(u16),
    /// Argument bytes left over after parsing.
    MessageLength(usize, usize),
    /// NULL for non-nullable argument
    InvalidNull,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::EndOfMessage => write!(f, "found end of message while parsing argument"),
            Self::Utf8(e) => write!(f, "invalid UTF-8 string in message: {e}"),
            Self::MissingNul => write!(f, "string argument not NUL terminated"),
            Self::UnsupportedType(c) => write!(f, "unsupported argument type '{c}'"),
            Self::HeaderLength(len) => write!(f, "message length {len} < {HEADER_LEN}"),
            Self::UnalignedLength(len) => write!(f, "message length {len} not 32-bit aligned"),
            Self::MessageLength(a, b) => {
                write!(f, "message length didn't match arguments ({a} != {b})")
            }
            Self::InvalidNull => {
                write!(f, "NULL value for non-nullable argument")
            }
        }
    }
}

impl From<Utf8Error> for ParseError {
    fn from(err: Utf8Error) -> Self {
        Self::Utf8(err)
    }
}

impl std::error::Error for ParseError {}

/// A request that can't be encoded.
#[derive(Debug, PartialEq, Eq)]
pub enum RequestError {
    /// No argument for a position of the signature.
    MissingArgument { index: usize, expected: char },
    /// More arguments than the signature declares.
    TooManyArguments { expected: usize, found: usize },
    /// Message doesn't fit the 16-bit length field.
    MessageTooLong(usize),
    /// Signature names a type this client can't encode.
    UnsupportedType(char),
    /// Opcode not defined by the interface.
    InvalidOpcode(&'static str, u16),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingArgument { index, expected } => {
                write!(f, "missing argument {index} of type '{expected}'")
            }
            Self::TooManyArguments { expected, found } => {
                write!(f, "expected {expected} arguments, found {found}")
            }
            Self::MessageTooLong(len) => {
                write!(f, "message length {len} exceeds {MAX_MESSAGE_LEN}")
            }
            Self::UnsupportedType(c) => write!(f, "unsupported argument type '{c}'"),
            Self::InvalidOpcode(intr, op) => {
                write!(f, "opcode '{op}' invalid for interface '{intr}'")
            }
        }
    }
}

impl std::error::Error for RequestError {}
