//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ledger_flow::config::Config;
use ledger_flow::flows::FlowEnv;
use ledger_flow::keys::{Operator, PrivateKey};
use ledger_flow::ledger::amount::Hbar;
use ledger_flow::ledger::ids::AccountId;
use ledger_flow::sandbox::{SandboxNetwork, GENESIS_OPERATOR};

/// Config with short delays so receipts and pages arrive within a few ms.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.sandbox.consensus_delay_ms = 5;
    config.timeouts.receipt_secs = 5;
    config.timeouts.query_secs = 2;
    config.timeouts.receipt_poll_interval_ms = 5;
    config.subscription.poll_interval_ms = 10;
    config.retries.max_attempts = 3;
    config.retries.base_delay_ms = 1;
    config.retries.max_delay_ms = 5;
    config
}

pub fn test_operator() -> Operator {
    Operator::new(GENESIS_OPERATOR, PrivateKey::generate_ed25519())
}

/// A fresh sandbox where a newly generated operator holds the genesis
/// balance.
pub fn sandbox_env() -> (FlowEnv, Arc<SandboxNetwork>) {
    sandbox_env_with(&fast_config())
}

pub fn sandbox_env_with(config: &Config) -> (FlowEnv, Arc<SandboxNetwork>) {
    FlowEnv::sandbox(config, test_operator()).expect("sandbox env")
}

pub fn hbar_balance(network: &SandboxNetwork, account_id: AccountId) -> Hbar {
    network
        .snapshot()
        .account_balance(&account_id)
        .map(|b| b.hbars)
        .expect("account exists")
}

/// Serve canned HTTP responses on an ephemeral localhost port. `route`
/// maps a request path (query string stripped) to a status and JSON body.
pub async fn start_mock_mirror<F>(route: F) -> SocketAddr
where
    F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let route = Arc::new(route);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let route = route.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let mut read = 0;
                        while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") && read < buf.len() {
                            match socket.read(&mut buf[read..]).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => read += n,
                            }
                        }
                        let request = String::from_utf8_lossy(&buf[..read]);
                        let target = request.split_whitespace().nth(1).unwrap_or("/");
                        let path = target.split('?').next().unwrap_or(target);

                        let (status, body) = route(path);
                        let reason = match status {
                            200 => "OK",
                            400 => "Bad Request",
                            404 => "Not Found",
                            429 => "Too Many Requests",
                            503 => "Service Unavailable",
                            _ => "Internal Server Error",
                        };
                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}
