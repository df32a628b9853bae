#![cfg(all(unix, feature = "cli"))]

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/lwcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn frame(selector: u8, payload: &str) -> Vec<u8> {
    let mut out = vec![selector, 0, 0, 0];
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload.as_bytes());
    out
}

/// Minimal engine: `/version`, container inspect and logs for the ids in
/// `logs`, 404 for anything else. One request per connection.
fn fake_daemon(path: &Path, logs: Vec<(&'static str, Vec<u8>)>) {
    let listener = UnixListener::bind(path).expect("daemon socket should bind");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else {
                return;
            };
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" => break,
                    Ok(_) => {}
                }
            }

            let target = request_line.split_whitespace().nth(1).unwrap_or_default();
            let path = target.split('?').next().unwrap_or_default();
            let segments: Vec<&str> = path.split('/').collect();
            let container = segments
                .iter()
                .position(|s| *s == "containers")
                .and_then(|i| Some((*segments.get(i + 1)?, *segments.get(i + 2)?)));
            let known = |id: &str| logs.iter().find(|(name, _)| *name == id);

            let (status, content_type, body) = match container {
                _ if path.ends_with("/version") => (
                    "200 OK",
                    "application/json",
                    br#"{"ApiVersion":"1.43","Version":"24.0.7"}"#.to_vec(),
                ),
                Some((id, "json")) if known(id).is_some() => (
                    "200 OK",
                    "application/json",
                    format!(r#"{{"Id":"{id}","Config":{{"Tty":false}}}}"#).into_bytes(),
                ),
                Some((id, "logs")) if known(id).is_some() => (
                    "200 OK",
                    "application/vnd.docker.multiplexed-stream",
                    known(id).map(|(_, body)| body.clone()).unwrap_or_default(),
                ),
                other => {
                    let id = other.map(|(id, _)| id).unwrap_or_default();
                    (
                        "404 Not Found",
                        "application/json",
                        format!(r#"{{"message":"No such container: {id}"}}"#).into_bytes(),
                    )
                }
            };

            let mut stream = reader.into_inner();
            let mut response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            response.extend_from_slice(&body);
            let _ = stream.write_all(&response);
        }
    });
}

fn logweave(host: &str, ids: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_logweave"))
        .arg("--log-level")
        .arg("error")
        .arg("logs")
        .args(ids)
        .arg("--host")
        .arg(host)
        .arg("--no-follow")
        .env_remove("DOCKER_HOST")
        .env_remove("DOCKER_TLS_VERIFY")
        .env_remove("RUST_LOG")
        .output()
        .expect("logweave should run")
}

fn lines_from(bytes: &[u8], source: &str) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|line| line.starts_with(&format!("{source}:")))
        .map(str::to_string)
        .collect()
}

#[test]
fn merges_substreams_of_every_container() {
    let dir = unique_temp_dir("merge");
    let sock = dir.join("d.sock");

    let mut web = frame(1, "hello\n");
    web.extend(frame(2, "oops\n"));
    web.extend(frame(1, "world\n"));
    let mut db = frame(2, "slow query\r\n");
    db.extend(frame(1, "ready\n"));
    fake_daemon(&sock, vec![("web", web), ("db", db)]);

    let output = logweave(&format!("unix://{}", sock.display()), &["web", "db"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert_eq!(lines_from(&output.stdout, "web"), ["web:hello", "web:world"]);
    assert_eq!(lines_from(&output.stdout, "db"), ["db:ready"]);
    assert_eq!(lines_from(&output.stderr, "web"), ["web:oops"]);
    assert_eq!(lines_from(&output.stderr, "db"), ["db:slow query"]);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_container_fails_setup_with_transport_exit_code() {
    let dir = unique_temp_dir("missing");
    let sock = dir.join("d.sock");
    fake_daemon(&sock, Vec::new());

    let output = logweave(&format!("unix://{}", sock.display()), &["ghost"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: setup failed: ghost"), "stderr: {stderr}");
    assert!(stderr.contains("No such container: ghost"), "stderr: {stderr}");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn absent_daemon_exits_with_transport_error() {
    let dir = unique_temp_dir("absent");
    let sock = dir.join("nobody-home.sock");

    let output = logweave(&format!("unix://{}", sock.display()), &["web"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: "), "stderr: {stderr}");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unknown_host_scheme_is_a_usage_error() {
    let output = logweave("ftp://127.0.0.1:2375", &["web"]);
    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported host"), "stderr: {stderr}");
}

#[test]
fn logs_without_ids_is_rejected_by_the_parser() {
    let output = Command::new(env!("CARGO_BIN_EXE_logweave"))
        .arg("logs")
        .output()
        .expect("logweave should run");
    assert_eq!(output.status.code(), Some(2));
}
