// Types representing arguments to requests/events
// Used in parsing and serialization.

use std::fmt;

use super::{ByteStream, ParseError};

/// Signed 24.8 fixed-point number, as carried on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fixed(i32);

impl Fixed {
    /// Wraps a raw wire value.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw wire value.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Converts an integer, wrapping on overflow of the 24-bit integer part.
    pub const fn from_int(value: i32) -> Self {
        Self(value.wrapping_mul(256))
    }

    /// Converts a float, truncating toward zero. Out of range values saturate.
    pub fn from_f64(value: f64) -> Self {
        Self((value * 256.0) as i32)
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 256.0
    }
}

impl From<i32> for Fixed {
    fn from(value: i32) -> Self {
        Self::from_int(value)
    }
}

impl From<f64> for Fixed {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// Argument type, as named by one character of a message signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    Int,
    Uint,
    Fixed,
    String,
    Object,
    NewId,
    Array,
    Fd,
}

impl ArgType {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'i' => Self::Int,
            'u' => Self::Uint,
            'f' => Self::Fixed,
            's' => Self::String,
            'o' => Self::Object,
            'n' => Self::NewId,
            'a' => Self::Array,
            'h' => Self::Fd,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Int => 'i',
            Self::Uint => 'u',
            Self::Fixed => 'f',
            Self::String => 's',
            Self::Object => 'o',
            Self::NewId => 'n',
            Self::Array => 'a',
            Self::Fd => 'h',
        }
    }
}

/// One entry of a parsed signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureArg {
    pub ty: ArgType,
    pub nullable: bool,
}

/// Iterates over the argument types of a signature like `"?on"`.
///
/// `?` marks the next argument nullable and digits (since-version markers) are
/// skipped. Unknown characters are returned as `Err`.
pub fn signature_args(signature: &str) -> impl Iterator<Item = Result<SignatureArg, char>> + '_ {
    let mut nullable = false;
    signature.chars().filter_map(move |c| match c {
        '?' => {
            nullable = true;
            None
        }
        '0'..='9' => None,
        c => {
            let arg = ArgType::from_char(c)
                .map(|ty| SignatureArg { ty, nullable })
                .ok_or(c);
            nullable = false;
            Some(arg)
        }
    })
}

/// An argument in an event or a request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Arg<'a> {
    Uint(u32),
    Int(i32),
    Fixed(Fixed),
    String(&'a str),
    Object(u32),
    NewId(u32),
    /// Null object or string.
    Null,
}

impl fmt::Display for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Fixed(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Object(value) => write!(f, "id {value}"),
            Self::NewId(value) => write!(f, "new id {value}"),
            Self::Null => write!(f, "nil"),
        }
    }
}

impl Arg<'_> {
    pub fn write<T: Extend<u8>>(&self, buf: &mut T) {
        match self {
            Arg::Uint(value) | Arg::Object(value) | Arg::NewId(value) => {
                buf.extend(value.to_ne_bytes());
            }
            Arg::Int(value) => buf.extend(value.to_ne_bytes()),
            Arg::Fixed(value) => buf.extend(value.raw().to_ne_bytes()),
            // Null object id and null string share the same encoding
            Arg::Null => buf.extend(0u32.to_ne_bytes()),
            Arg::String(value) => {
                // Write 32-bit length, including NUL
                let len = value.len() as u32 + 1;
                buf.extend(len.to_ne_bytes());
                // Write contents of string, as UTF-8
                buf.extend(value.as_bytes().iter().copied());
                // Add NUL terminator
                buf.extend([b'\0']);
                // Pad to multiple of 32 bits
                if len % 4 != 0 {
                    buf.extend((0..4 - (len % 4)).map(|_| b'\0'));
                }
            }
        }
    }

    /// Number of bytes [`Arg::write`] produces.
    pub fn encoded_len(&self) -> usize {
        match self {
            Arg::String(value) => 4 + (value.len() + 1).next_multiple_of(4),
            _ => 4,
        }
    }
}

/// A decoded argument.
#[derive(Clone, Debug, PartialEq)]
pub enum OwnedArg {
    Uint(u32),
    Int(i32),
    Fixed(Fixed),
    String(Option<String>),
    /// Object id; 0 is null.
    Object(u32),
    NewId(u32),
}

impl OwnedArg {
    pub(crate) fn parse(buf: &mut ByteStream, arg: SignatureArg) -> Result<Self, ParseError> {
        Ok(match arg.ty {
            ArgType::Uint => Self::Uint(u32::from_ne_bytes(buf.read()?)),
            ArgType::Int => Self::Int(i32::from_ne_bytes(buf.read()?)),
            ArgType::Fixed => Self::Fixed(Fixed::from_raw(i32::from_ne_bytes(buf.read()?))),
            ArgType::String => {
                let string = buf.read_string()?;
                if string.is_none() && !arg.nullable {
                    return Err(ParseError::InvalidNull);
                }
                Self::String(string)
            }
            ArgType::Object => {
                let id = u32::from_ne_bytes(buf.read()?);
                if id == 0 && !arg.nullable {
                    return Err(ParseError::InvalidNull);
                }
                Self::Object(id)
            }
            ArgType::NewId => Self::NewId(u32::from_ne_bytes(buf.read()?)),
            ArgType::Array | ArgType::Fd => {
                return Err(ParseError::UnsupportedType(arg.ty.as_char()));
            }
        })
    }

    pub fn as_arg(&self) -> Arg<'_> {
        match self {
            Self::Uint(value) => Arg::Uint(*value),
            Self::Int(value) => Arg::Int(*value),
            Self::Fixed(value) => Arg::Fixed(*value),
            Self::String(Some(value)) => Arg::String(value),
            Self::String(None) | Self::Object(0) => Arg::Null,
            Self::Object(value) => Arg::Object(*value),
            Self::NewId(value) => Arg::NewId(*value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_truncates_toward_zero() {
        assert_eq!(Fixed::from_f64(1.5).raw(), 384);
        assert_eq!(Fixed::from_f64(-1.5).raw(), -384);
        assert_eq!(Fixed::from_f64(0.001).raw(), 0);
        assert_eq!(Fixed::from_f64(-0.001).raw(), 0);
        assert_eq!(Fixed::from_f64(2.0 + 1.0 / 512.0).raw(), 512);
        assert_eq!(Fixed::from_int(-3).to_f64(), -3.0);
    }

    #[test]
    fn string_padding() {
        for (s, len) in [("", 8), ("abc", 8), ("abcd", 12), ("wl_seat", 12)] {
            let mut buf = Vec::new();
            let arg = Arg::String(s);
            arg.write(&mut buf);
            assert_eq!(buf.len(), len, "{s:?}");
            assert_eq!(arg.encoded_len(), len);
            assert_eq!(buf[4 + s.len()], 0);
            assert_eq!(
                u32::from_ne_bytes(buf[..4].try_into().unwrap()) as usize,
                s.len() + 1
            );
        }
    }

    #[test]
    fn signature_parsing() {
        let args = signature_args("?on")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            args,
            [
                SignatureArg {
                    ty: ArgType::Object,
                    nullable: true
                },
                SignatureArg {
                    ty: ArgType::NewId,
                    nullable: false
                },
            ]
        );
        assert_eq!(signature_args("2uf").count(), 2);
        assert_eq!(signature_args("ux").nth(1), Some(Err('x')));
    }

    #[test]
    fn null_encodes_as_zero() {
        let mut buf = Vec::new();
        Arg::Null.write(&mut buf);
        assert_eq!(buf, [0; 4]);
        assert_eq!(OwnedArg::Object(0).as_arg(), Arg::Null);
    }
}
