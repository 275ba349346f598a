//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use mapes::config::MapesConfig;
use mapes::http::HttpServer;
use mapes::lifecycle::Shutdown;
use mapes::Router;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral port. Trigger the returned `Shutdown`
/// to stop the server.
pub async fn spawn_server(router: &Router) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = MapesConfig::default();
    config.listener.bind_address = addr.to_string();
    config.server.banner = false;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, router);
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, receiver).await.unwrap();
    });

    // Give the server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

/// Client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
