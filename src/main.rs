mod accounts;
mod autosave;
mod config;
mod db;
mod grades;
mod ipc;
mod record;
mod session;
mod store;
mod telemetry;
mod tracker;

use serde_json::json;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;
use tracing::{debug, info};

fn write_response(stdout: &mut io::Stdout, resp: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn handle_line(state: &mut ipc::AppState, line: &str, stdout: &mut io::Stdout) {
    if line.trim().is_empty() {
        return;
    }
    let req: ipc::Request = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            // No id to echo back.
            write_response(
                stdout,
                &json!({
                    "id": null,
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }),
            );
            return;
        }
    };
    debug!(target: "gradebookd", id = %req.id, method = %req.method, "request");
    let resp = ipc::handle_request(state, req);
    write_response(stdout, &resp);
}

fn main() {
    telemetry::init_tracing();
    info!(target: "gradebookd", version = env!("CARGO_PKG_VERSION"), "sidecar started");

    let mut state = ipc::AppState::default();

    // Stdin is read on its own thread so a pending autosave can fire while
    // no request is arriving.
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut stdout = io::stdout();
    loop {
        let next = match state.autosave_wait(Instant::now()) {
            Some(wait) => rx.recv_timeout(wait),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(line) => handle_line(&mut state, &line, &mut stdout),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        state.tick(Instant::now());
    }

    state.flush();
    info!(target: "gradebookd", "stdin closed; exiting");
}
