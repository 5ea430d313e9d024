#![cfg(feature = "cli")]

use std::io::Read;
use std::net::UdpSocket;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

fn radiolink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_radiolink"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("radiolink should run")
}

fn json_line(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().expect("command should print a line");
    serde_json::from_str(line).expect("output should be JSON")
}

fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0")
        .and_then(|socket| socket.local_addr())
        .expect("ephemeral port should be available")
        .port()
}

#[test]
fn encode_then_decode_round_trips() {
    let encoded = radiolink(&["--format", "json", "encode", "--int", "-7", "--key", "temp"]);
    assert!(encoded.status.success(), "encode failed: {encoded:?}");
    let encoded = json_line(&encoded);
    // header + tag + i32 + key length + key
    assert_eq!(encoded["size"], 4 + 1 + 4 + 1 + 4);
    let hex = encoded["hex"].as_str().expect("hex should be a string");

    let decoded = radiolink(&["--format", "json", "decode", hex]);
    assert!(decoded.status.success(), "decode failed: {decoded:?}");
    let decoded = json_line(&decoded);
    assert_eq!(decoded["group"], 111);
    assert_eq!(decoded["message"]["type"], "keyed_int");
    assert_eq!(decoded["message"]["key"], "temp");
    assert_eq!(decoded["message"]["value"], -7);
}

#[test]
fn encode_rejects_oversized_string() {
    let long = "x".repeat(31);
    let output = radiolink(&["encode", "--string", &long]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("payload too large"));
}

#[test]
fn encode_requires_a_value() {
    let output = radiolink(&["encode", "--key", "lonely"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn decode_rejects_bad_hex_as_usage() {
    let output = radiolink(&["decode", "zz"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn decode_truncated_frame_is_data_invalid() {
    // The length byte promises ten more bytes than are present.
    let output = radiolink(&["decode", "0a016f01"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn decode_unknown_tag_prints_frame_and_fails() {
    // version 1, group 111, protocol 1, tag 99
    let output = radiolink(&["--format", "json", "decode", "04016f0163"]);
    assert_eq!(output.status.code(), Some(60));
    let frame = json_line(&output);
    assert_eq!(frame["protocol"], 1);
    assert!(frame.get("message").is_none());
    assert_eq!(frame["error"], "unknown datagram type tag 99");
}

#[test]
fn version_prints_package_version() {
    let output = radiolink(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("radiolink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn listen_times_out_waiting_for_count() {
    let port = free_udp_port().to_string();
    let bind = format!("127.0.0.1:{port}");
    let start = Instant::now();
    let output = radiolink(&["listen", &bind, "--count", "1", "--timeout", "300ms"]);
    assert_eq!(output.status.code(), Some(124));
    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[test]
fn send_reaches_listener_over_udp() {
    let bind = format!("127.0.0.1:{}", free_udp_port());
    let mut listener = Command::new(env!("CARGO_BIN_EXE_radiolink"))
        .args(["--log-level", "error", "--format", "json", "listen", &bind])
        .args(["--group", "9", "--count", "1", "--timeout", "10s"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listener should start");

    // Keep sending until the listener is up and has printed one datagram.
    let deadline = Instant::now() + Duration::from_secs(8);
    let status = loop {
        let sent = radiolink(&["send", &bind, "--double", "2.5", "--group", "9"]);
        assert!(sent.status.success(), "send failed: {sent:?}");
        if let Some(status) = listener.try_wait().expect("listener status") {
            break status;
        }
        assert!(Instant::now() < deadline, "listener never received a datagram");
        thread::sleep(Duration::from_millis(100));
    };
    assert!(status.success());

    let mut stdout = String::new();
    listener
        .stdout
        .take()
        .expect("stdout should be piped")
        .read_to_string(&mut stdout)
        .expect("stdout should be readable");
    let frame: Value =
        serde_json::from_str(stdout.lines().next().expect("one frame line")).expect("JSON line");
    assert_eq!(frame["group"], 9);
    assert_eq!(frame["rssi"], 0);
    assert_eq!(frame["message"]["type"], "double");
    assert_eq!(frame["message"]["value"], 2.5);
}
