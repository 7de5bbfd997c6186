//! Line-oriented command stream.
//!
//! | Line                   | Effect                                  |
//! |------------------------|-----------------------------------------|
//! | `m <x> <y> <w> <h>`    | move to `x / w`, `y / h` of the layout  |
//! | `r <dx> <dy>`          | move by `dx`, `dy`                      |
//! | `b <button> <pressed>` | button 0 left, 1 middle, 2 right        |
//! | `s <axis> <value>`     | scroll; axis 0 vertical, 1 horizontal   |
//!
//! Anything else is ignored.

use std::io::BufRead;

use crate::{protocol::virtual_pointer::Axis, Error, Session};

pub const BTN_LEFT: u32 = 0x110;
pub const BTN_RIGHT: u32 = 0x111;
pub const BTN_MIDDLE: u32 = 0x112;

/// Maps a button index to a Linux input event code. Unknown indices are the
/// left button.
pub fn button_code(index: i64) -> u32 {
    match index {
        1 => BTN_MIDDLE,
        2 => BTN_RIGHT,
        _ => BTN_LEFT,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    MoveAbsolute {
        x: u32,
        y: u32,
        x_extent: u32,
        y_extent: u32,
    },
    MoveRelative {
        dx: i32,
        dy: i32,
    },
    Button {
        code: u32,
        pressed: bool,
    },
    Scroll {
        axis: Axis,
        value: i32,
    },
}

fn parse_args<T: std::str::FromStr, const N: usize>(
    tokens: &mut std::str::SplitWhitespace,
) -> Option<[T; N]> {
    let mut values = Vec::with_capacity(N);
    for _ in 0..N {
        values.push(tokens.next()?.parse().ok()?);
    }
    if tokens.next().is_some() {
        return None;
    }
    values.try_into().ok()
}

/// Range of the integer part of a 24.8 fixed-point value.
const FIXED_RANGE: std::ops::RangeInclusive<i32> = -(1 << 23)..=(1 << 23) - 1;

fn parse_fixed_int(value: i32) -> Option<i32> {
    FIXED_RANGE.contains(&value).then_some(value)
}

fn parse_flag(flag: u8) -> Option<bool> {
    match flag {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

impl Command {
    /// Parses one line. Returns `None` for blank, unknown or malformed lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        match tokens.next()? {
            "m" => {
                let [x, y, x_extent, y_extent] = parse_args::<u32, 4>(&mut tokens)?;
                Some(Self::MoveAbsolute {
                    x,
                    y,
                    x_extent,
                    y_extent,
                })
            }
            "r" => {
                let [dx, dy] = parse_args::<i32, 2>(&mut tokens)?;
                Some(Self::MoveRelative {
                    dx: parse_fixed_int(dx)?,
                    dy: parse_fixed_int(dy)?,
                })
            }
            "b" => {
                let [index, pressed] = parse_args::<i64, 2>(&mut tokens)?;
                Some(Self::Button {
                    code: button_code(index),
                    pressed: parse_flag(u8::try_from(pressed).ok()?)?,
                })
            }
            "s" => {
                let [axis, value] = parse_args::<i64, 2>(&mut tokens)?;
                Some(Self::Scroll {
                    axis: Axis::try_from(u32::try_from(axis).ok()?).ok()?,
                    value: parse_fixed_int(i32::try_from(value).ok()?)?,
                })
            }
            _ => None,
        }
    }
}

/// Translates commands into requests on a session.
#[derive(Debug)]
pub struct Dispatcher<'a> {
    session: &'a Session,
}

impl<'a> Dispatcher<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Sends the requests for `command` and waits for the compositor to
    /// process them.
    pub fn execute(&self, command: Command) -> Result<(), Error> {
        match command {
            Command::MoveAbsolute {
                x,
                y,
                x_extent,
                y_extent,
            } => self.session.move_absolute(x, y, x_extent, y_extent)?,
            Command::MoveRelative { dx, dy } => {
                self.session.move_relative(f64::from(dx), f64::from(dy))?;
            }
            Command::Button { code, pressed } => self.session.click(code, pressed)?,
            Command::Scroll { axis, value } => self.session.scroll(axis, f64::from(value))?,
        }
        self.session.roundtrip()
    }

    /// Handles one input line. Returns `false` if the line was skipped.
    pub fn handle_line(&self, line: &str) -> Result<bool, Error> {
        match Command::parse(line) {
            Some(command) => {
                self.execute(command)?;
                Ok(true)
            }
            None => {
                if !line.trim().is_empty() {
                    tracing::debug!(line, "skipping unrecognized line");
                }
                Ok(false)
            }
        }
    }

    /// Handles lines until end of input. Returns the number of commands
    /// executed.
    ///
    /// Lines that aren't valid UTF-8 are skipped like any other malformed
    /// line.
    pub fn run<R: BufRead>(&self, mut input: R) -> Result<usize, Error> {
        let mut count = 0;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                return Ok(count);
            }
            let Ok(line) = std::str::from_utf8(&buf) else {
                tracing::debug!(len = buf.len(), "skipping line that isn't UTF-8");
                continue;
            };
            if self.handle_line(line)? {
                count += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_move_absolute() {
        assert_eq!(
            Command::parse("m 100 200 800 600"),
            Some(Command::MoveAbsolute {
                x: 100,
                y: 200,
                x_extent: 800,
                y_extent: 600
            })
        );
        assert_eq!(
            Command::parse("  m\t1 2   3 4 \n"),
            Some(Command::MoveAbsolute {
                x: 1,
                y: 2,
                x_extent: 3,
                y_extent: 4
            })
        );
    }

    #[test]
    fn parse_buttons() {
        assert_eq!(
            Command::parse("b 1 1"),
            Some(Command::Button {
                code: BTN_MIDDLE,
                pressed: true
            })
        );
        assert_eq!(
            Command::parse("b 0 1"),
            Some(Command::Button {
                code: BTN_LEFT,
                pressed: true
            })
        );
        assert_eq!(
            Command::parse("b 2 0"),
            Some(Command::Button {
                code: BTN_RIGHT,
                pressed: false
            })
        );
        assert_eq!(
            Command::parse("b 9 0"),
            Some(Command::Button {
                code: BTN_LEFT,
                pressed: false
            })
        );
        assert_eq!(
            Command::parse("b -1 1"),
            Some(Command::Button {
                code: BTN_LEFT,
                pressed: true
            })
        );
    }

    #[test]
    fn parse_relative_and_scroll() {
        assert_eq!(
            Command::parse("r -5 12"),
            Some(Command::MoveRelative { dx: -5, dy: 12 })
        );
        assert_eq!(
            Command::parse("s 1 -3"),
            Some(Command::Scroll {
                axis: Axis::HorizontalScroll,
                value: -3
            })
        );
        assert_eq!(Command::parse("s 2 1"), None);
    }

    #[test]
    fn values_beyond_fixed_point_range_are_ignored() {
        assert_eq!(
            Command::parse("r 8388607 -8388608"),
            Some(Command::MoveRelative {
                dx: 8_388_607,
                dy: -8_388_608
            })
        );
        assert_eq!(Command::parse("r 8388608 0"), None);
        assert_eq!(Command::parse("r 0 -8388609"), None);
        assert_eq!(Command::parse("r 2147483647 0"), None);
        assert_eq!(Command::parse("s 0 9000000"), None);
        assert_eq!(
            Command::parse("s 0 -8388608"),
            Some(Command::Scroll {
                axis: Axis::VerticalScroll,
                value: -8_388_608
            })
        );
    }

    #[test]
    fn malformed_lines_are_ignored() {
        for line in [
            "",
            "   ",
            "\t\n",
            "m",
            "m 1 2 3",
            "m 1 2 3 4 5",
            "m 1 2 three 4",
            "m -1 2 3 4",
            "b 1",
            "b 1 2",
            "b x 1",
            "r 1.5 2",
            "x 1 2",
            "move 1 2 3 4",
        ] {
            assert_eq!(Command::parse(line), None, "{line:?}");
        }
    }
}
