//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the dispatcher in an Axum fallback so every request reaches it
//! - Wire up tower layers (request ID, tracing)
//! - Bind the configured address, print the banner, serve until a signal
//!
//! # Design Decisions
//! - Axum does no routing here; the route table lives in `routing`
//! - Bind failures surface from `start` before anything is printed
//! - Graceful shutdown: stop accepting, let in-flight requests finish

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::MapesConfig;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::MakeRequestUuidV4;
use crate::lifecycle::{wait_for_signal, Shutdown};
use crate::net::{self, ListenerError};
use crate::routing::{Router, SharedRoutes};

const BANNER: &str = r"
 _  _ ____ ___  ____ ____
 |\/| |__| |__] |___ [__
 |  | |  | |    |___ ___]
";

/// Error type for serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server driving a [`Router`]'s route table.
pub struct HttpServer {
    app: axum::Router,
    config: MapesConfig,
    routes: SharedRoutes,
}

impl HttpServer {
    /// Create a server over `router`'s table. Routes registered through
    /// `router` (or its clones) after this call are served too.
    pub fn new(config: MapesConfig, router: &Router) -> Self {
        let routes = router.routes();
        let dispatcher = Arc::new(Dispatcher::new(routes.clone()));
        let app = Self::build_app(dispatcher);
        Self {
            app,
            config,
            routes,
        }
    }

    /// Build the Axum app with all middleware layers.
    fn build_app(dispatcher: Arc<Dispatcher>) -> axum::Router {
        axum::Router::new()
            .fallback(dispatch_request)
            .with_state(dispatcher)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.snapshot().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM.
    pub async fn start(self) -> Result<(), ServerError> {
        let listener = net::bind(&self.config.listener).await?;

        if self.config.server.banner {
            let addr = listener.local_addr()?;
            println!("{BANNER}");
            println!("⇨ http server started on {addr}");
        }

        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        tokio::spawn(async move {
            wait_for_signal().await;
            shutdown.trigger();
        });

        self.run(listener, receiver).await
    }

    pub fn config(&self) -> &MapesConfig {
        &self.config
    }

    pub fn routes(&self) -> &SharedRoutes {
        &self.routes
    }
}

/// Fallback handler: everything goes through the dispatcher.
async fn dispatch_request(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response {
    dispatcher.dispatch(request).await
}
