//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use inko_moko_api::config::{ApiConfig, Environment};
use inko_moko_api::{HttpServer, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server running on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Config used by most tests: trusted localhost origin, short drain.
pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.env = Environment::Test;
    config.cors.trusted_origins = vec!["http://localhost".to_string()];
    config.server.shutdown_timeout_secs = 2;
    config
}

/// Start a server with `config` on 127.0.0.1:0.
pub async fn start_server(config: ApiConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    // The listener is already bound; give the accept loop a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
