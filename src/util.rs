use rustix::{
    event::{PollFd, PollFlags},
    io::retry_on_intr,
    net,
};
use std::{
    io,
    os::unix::{io::AsFd, net::UnixStream},
    time::{SystemTime, UNIX_EPOCH},
};

pub fn send(socket: &UnixStream, buf: &[u8]) -> rustix::io::Result<usize> {
    retry_on_intr(|| net::send(socket, buf, net::SendFlags::NOSIGNAL))
}

pub fn recv(socket: &UnixStream, buf: &mut [u8]) -> rustix::io::Result<usize> {
    retry_on_intr(|| net::recv(socket, buf, net::RecvFlags::empty()))
}

fn poll<T: AsFd>(fd: &T, flags: PollFlags, timeout: i32) -> io::Result<()> {
    retry_on_intr(|| rustix::event::poll(&mut [PollFd::new(fd, flags)], timeout))?;
    Ok(())
}

/// Waits until `fd` is readable, or `timeout` milliseconds pass (`-1` waits forever).
pub fn poll_readable<T: AsFd>(fd: &T, timeout: i32) -> io::Result<()> {
    poll(fd, PollFlags::IN, timeout)
}

pub fn poll_writable<T: AsFd>(fd: &T, timeout: i32) -> io::Result<()> {
    poll(fd, PollFlags::OUT, timeout)
}

/// Wall-clock milliseconds, truncated to 32 bits.
///
/// Wraps roughly every 49.7 days.
pub fn timestamp_ms() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |time| time.as_millis() as u32)
}
