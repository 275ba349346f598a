//! Static file mounts.
//!
//! # Responsibilities
//! - Turn a mount prefix into the route pattern that captures one file name
//! - Hand the captured file name to `tower_http`'s `ServeDir`
//!
//! # Design Decisions
//! - One trailing `/` on the prefix is dropped, the pattern is
//!   `{prefix}/:file`: one segment below the prefix, no recursion
//! - Relative roots resolve against the working directory (`./{root}`)
//! - Whatever `ServeDir` answers (including its 404) is the response

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::http::context::Context;
use crate::http::handler::{BoxFuture, Handler, HandlerError, HandlerResult};

/// Parameter name captured by static mount patterns.
pub const FILE_PARAM: &str = "file";

/// Handler serving one directory under a URL prefix.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    prefix: String,
    root: PathBuf,
    service: ServeDir,
}

impl StaticFiles {
    pub fn new(prefix: &str, root: impl AsRef<Path>) -> Self {
        let prefix = prefix.strip_suffix('/').unwrap_or(prefix).to_string();
        let root = Path::new(".").join(root);
        let service = ServeDir::new(&root);
        Self {
            prefix,
            root,
            service,
        }
    }

    /// Route pattern for this mount.
    pub fn pattern(&self) -> String {
        format!("{}/:{}", self.prefix, FILE_PARAM)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy of the request addressed to the captured file name.
    ///
    /// The route matched on the decoded path, so the raw path may not start
    /// with the prefix as written (`/my%20files/a.txt`, `/%61ssets/x`). The
    /// file name is taken from the route parameter and encoded again.
    fn forward_request(&self, ctx: &Context) -> Result<Request<Body>, HandlerError> {
        let file = ctx
            .param(FILE_PARAM)
            .ok_or_else(|| HandlerError::abort(StatusCode::NOT_FOUND, "not found"))?;
        let path = format!("/{}", urlencoding::encode(file));
        let uri = match ctx.uri().query() {
            Some(query) => format!("{path}?{query}"),
            None => path,
        };

        let mut request = Request::builder()
            .method(ctx.method().clone())
            .uri(uri)
            .body(Body::empty())?;
        *request.headers_mut() = ctx.headers().clone();
        Ok(request)
    }
}

impl Handler for StaticFiles {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let request = self.forward_request(ctx)?;
            tracing::trace!(
                root = %self.root.display(),
                path = %request.uri().path(),
                "Serving static file"
            );

            let response = self
                .service
                .clone()
                .oneshot(request)
                .await
                .unwrap_or_else(|never| match never {});
            ctx.send(response.map(Body::new));
            Ok(())
        })
    }
}
