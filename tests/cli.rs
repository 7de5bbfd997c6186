mod common;

use std::{
    io::Write,
    path::Path,
    process::{Command, Output, Stdio},
};

use common::{pointer_requests, FakeCompositor};

const READY: &str = "Virtual pointer created";

fn run_client(runtime_dir: &Path, display: &str, input: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_wlr-vpointer"))
        .env("XDG_RUNTIME_DIR", runtime_dir)
        .env("WAYLAND_DISPLAY", display)
        .env_remove("WAYLAND_DEBUG")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    // The client may exit before reading anything
    let _ = stdin.write_all(input);
    drop(stdin);
    child.wait_with_output().unwrap()
}

fn ready_lines(output: &Output) -> usize {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .filter(|line| *line == READY)
        .count()
}

#[test]
fn replays_stdin_and_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let compositor = FakeCompositor::default().listen(&dir.path().join("wayland-test"));

    let output = run_client(dir.path(), "wayland-test", b"m 10 20 100 200\n\nb 2 1\n");
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(ready_lines(&output), 1, "{output:?}");
    assert!(output.stdout.is_empty());

    let names: Vec<_> = pointer_requests(&compositor.join().unwrap())
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, ["motion_absolute", "frame", "button", "frame"]);
}

#[test]
fn missing_manager_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("compositor.sock");
    let compositor = FakeCompositor {
        globals: vec![(1, "wl_compositor", 6), (2, "wl_seat", 9)],
        ..FakeCompositor::default()
    }
    .listen(&socket);

    let output = run_client(dir.path(), socket.to_str().unwrap(), b"b 0 1\n");
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert_eq!(ready_lines(&output), 0, "{output:?}");
    assert!(pointer_requests(&compositor.join().unwrap()).is_empty());
}

#[test]
fn connect_failure_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_client(dir.path(), "no-such-socket", b"m 1 1 2 2\n");
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert_eq!(ready_lines(&output), 0, "{output:?}");
}
