//! Shared test utilities for mvirt-switch integration tests.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use mvirt_switch::config::{Config, DEFAULT_POLL_INTERVAL, FetchErrorPolicy, POLL_STEP};

pub const TOKEN: &str = "test-token";

/// `qm list --full` output used by the stub script.
pub const QM_LIST: &str = "      VMID NAME                 STATUS     MEM(MB)    BOOTDISK(GB) PID
       100 tax                  paused     6144              60.00 1954081
       101 web                  stopped    2048              32.00 0
       102 db                   running    4096             100.00 2200001
";

#[derive(Clone)]
struct MockState {
    message: String,
    states: Value,
    pings: Arc<AtomicUsize>,
}

/// In-process stand-in for Home Assistant and the healthcheck service.
pub struct MockServer {
    pub url: String,
    pings: Arc<AtomicUsize>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockServer {
    /// Spawn a healthy server serving `states` from `/api/states`.
    pub async fn spawn(states: Value) -> Self {
        Self::spawn_with_message("API running.", states).await
    }

    pub async fn spawn_with_message(message: &str, states: Value) -> Self {
        let pings = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            message: message.to_string(),
            states,
            pings: Arc::clone(&pings),
        };

        let router = Router::new()
            .route("/api/", get(api_root))
            .route("/api/states", get(api_states))
            .route("/ping/{id}", get(ping))
            .route("/broken/{id}", get(broken))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            pings,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false);
    let json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "application/json")
        .unwrap_or(false);
    bearer && json
}

async fn api_root(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "message": state.message })).into_response()
}

async fn api_states(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(state.states.clone()).into_response()
}

async fn ping(State(state): State<MockState>, UrlPath(_id): UrlPath<String>) -> StatusCode {
    state.pings.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn broken(UrlPath(_id): UrlPath<String>) -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Home Assistant state list for host prefix `vmhost`.
pub fn ha_states(entries: &[(&str, &str)]) -> Value {
    let mut states: Vec<Value> = entries
        .iter()
        .map(|(name, state)| {
            json!({
                "entity_id": format!("input_boolean.proxmox_vmhost_{}", name),
                "state": state,
                "attributes": { "friendly_name": name },
            })
        })
        .collect();
    states.push(json!({ "entity_id": "sun.sun", "state": "above_horizon", "attributes": {} }));
    Value::Array(states)
}

/// Config pointing at `url`, with the test token and `qm` at `qm_path`.
pub fn config(url: &str, token: &str, qm_path: &Path) -> Config {
    Config {
        ha_url: url.to_string(),
        ha_token: token.to_string(),
        entity_prefix: "input_boolean.proxmox_vmhost_".to_string(),
        healthcheck_url: None,
        qm_path: qm_path.to_path_buf(),
        on_fetch_error: FetchErrorPolicy::Exit,
        dry_run: false,
        once: true,
        http_timeout: Some(std::time::Duration::from_secs(5)),
        poll_interval: DEFAULT_POLL_INTERVAL,
        poll_step: POLL_STEP,
    }
}

/// Write an executable `qm` stand-in into `dir`.
///
/// `list` prints `list_output`; any other verb succeeds unless its VMID is
/// in `failing`. Every invocation is appended to `<dir>/qm.log`.
pub fn write_qm_stub(dir: &Path, list_output: &str, failing: &[u32]) -> PathBuf {
    let log = dir.join("qm.log");
    let failing: Vec<String> = failing.iter().map(|id| id.to_string()).collect();
    let mut list_output = list_output.to_string();
    if !list_output.ends_with('\n') {
        list_output.push('\n');
    }
    let script = format!(
        r#"#!/bin/sh
echo "$@" >> "{log}"
case "$1" in
    list)
        cat <<'EOF'
{list_output}EOF
        ;;
    *)
        FAILING="{failing}"
        for id in $FAILING; do
            if [ "$2" = "$id" ]; then
                echo "VM $2 is locked" >&2
                exit 2
            fi
        done
        ;;
esac
"#,
        log = log.display(),
        list_output = list_output,
        failing = failing.join(" "),
    );

    let path = dir.join("qm");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Lines written to `qm.log` by the stub.
pub fn qm_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("qm.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
