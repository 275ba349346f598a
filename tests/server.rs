//! End-to-end tests over a real socket.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use mapes::http::X_REQUEST_ID;
use mapes::{from_fn, guard, HandlerError, Router};
use serde_json::{json, Value};

mod common;

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

#[tokio::test]
async fn test_route_params() {
    let router = Router::new();
    router.get(
        "/hello/:name/from/:addr",
        |ctx| {
            Box::pin(async move {
                let body = json!({ "name": ctx.param("name"), "addr": ctx.param("addr") });
                ctx.json(StatusCode::OK, &body)
            })
        },
        &[],
    );
    let (addr, shutdown) = common::spawn_server(&router).await;

    let res = common::client()
        .get(url(addr, "/hello/alice/from/paris"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "name": "alice", "addr": "paris" }));

    shutdown.trigger();
}

#[tokio::test]
async fn test_not_found_body() {
    let router = Router::new();
    router.get("/", |ctx| Box::pin(async move { ctx.string(StatusCode::OK, "root") }), &[]);
    let (addr, shutdown) = common::spawn_server(&router).await;

    let client = common::client();
    for path in ["/unregistered", "/a/b/c", "/hello/"] {
        let res = client.get(url(addr, path)).send().await.unwrap();
        assert_eq!(res.status(), 404, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "message": "not found" }));
    }

    // Registered path, wrong method.
    let res = client.post(url(addr, "/")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_handler_failure_is_500() {
    let router = Router::new();
    router.get(
        "/x",
        |_ctx| Box::pin(async { Err(HandlerError::internal("connection refused")) }),
        &[],
    );
    let (addr, shutdown) = common::spawn_server(&router).await;

    let res = common::client().get(url(addr, "/x")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "server error" }));

    shutdown.trigger();
}

#[tokio::test]
async fn test_static_files() {
    let router = Router::new();
    router.static_files("/assets", "tests/fixtures/public", &[]);
    let (addr, shutdown) = common::spawn_server(&router).await;
    let client = common::client();

    let res = client.get(url(addr, "/assets/logo.txt")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "mapes logo\n");

    let res = client.get(url(addr, "/assets/missing.txt")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    // Only one level below the prefix is routed.
    let res = client.get(url(addr, "/assets/nested/logo.txt")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_static_files_with_encoded_prefix() {
    let router = Router::new();
    router.static_files("/my files", "tests/fixtures/my files", &[]);
    router.static_files("/assets", "tests/fixtures/public", &[]);
    let (addr, shutdown) = common::spawn_server(&router).await;
    let client = common::client();

    let res = client.get(url(addr, "/my%20files/a.txt")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "spaced\n");

    let res = client.get(url(addr, "/%61ssets/logo.txt")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "mapes logo\n");

    shutdown.trigger();
}

#[tokio::test]
async fn test_bind_route_params_and_query() {
    #[derive(serde::Deserialize)]
    struct Update {
        id: u64,
        name: String,
        dry_run: Option<bool>,
    }

    let router = Router::new();
    router.put(
        "/users/:id",
        |ctx| {
            Box::pin(async move {
                let update: Update = ctx.bind().await?;
                let body = json!({ "id": update.id, "name": update.name, "dry_run": update.dry_run });
                ctx.json(StatusCode::OK, &body)
            })
        },
        &[],
    );
    let (addr, shutdown) = common::spawn_server(&router).await;

    let res = common::client()
        .put(url(addr, "/users/42?dry_run=true"))
        .form(&[("name", "alice")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "id": 42, "name": "alice", "dry_run": true }));

    shutdown.trigger();
}

#[tokio::test]
async fn test_group_middleware_and_state() {
    let router = Router::new();
    let mut api = router.group("/api");
    api.use_middleware(guard(|ctx| {
        Box::pin(async move {
            match ctx.headers().get("x-user").and_then(|v| v.to_str().ok()) {
                Some(user) => {
                    let user = user.to_string();
                    ctx.set("user", user);
                    Ok(())
                }
                None => Err(HandlerError::abort(StatusCode::UNAUTHORIZED, "unauthorized")),
            }
        })
    }));
    api.use_middleware(from_fn(|ctx, next| {
        Box::pin(async move {
            ctx.set_header("x-api", "1")?;
            next.run(ctx).await
        })
    }));
    api.get(
        "/me",
        |ctx| {
            Box::pin(async move {
                let user = ctx.get::<String>("user").cloned().unwrap_or_default();
                ctx.string(StatusCode::OK, user)
            })
        },
        &[],
    );
    let (addr, shutdown) = common::spawn_server(&router).await;
    let client = common::client();

    let res = client.get(url(addr, "/api/me")).send().await.unwrap();
    assert_eq!(res.status(), 401);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "unauthorized" }));

    let res = client
        .get(url(addr, "/api/me"))
        .header("x-user", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-api"], "1");
    assert_eq!(res.text().await.unwrap(), "alice");

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_header() {
    let router = Router::new();
    router.get("/", |ctx| Box::pin(async move { ctx.none(StatusCode::NO_CONTENT) }), &[]);
    let (addr, shutdown) = common::spawn_server(&router).await;

    let res = common::client().get(url(addr, "/")).send().await.unwrap();
    assert_eq!(res.status(), 204);
    let id = res.headers()[X_REQUEST_ID].to_str().unwrap();
    assert_eq!(id.len(), 36);

    shutdown.trigger();
}

#[tokio::test]
async fn test_live_registration() {
    let router = Router::new();
    let (addr, shutdown) = common::spawn_server(&router).await;
    let client = common::client();

    let res = client.get(url(addr, "/late")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    router.get("/late", |ctx| Box::pin(async move { ctx.string(StatusCode::OK, "here") }), &[]);
    let res = client.get(url(addr, "/late")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "here");

    shutdown.trigger();
}

#[tokio::test]
async fn test_graceful_shutdown_stops_accepting() {
    let router = Router::new();
    router.get("/", |ctx| Box::pin(async move { ctx.none(StatusCode::OK) }), &[]);
    let (addr, shutdown) = common::spawn_server(&router).await;

    let res = common::client().get(url(addr, "/")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Fresh client: no pooled connection to reuse.
    let result = common::client().get(url(addr, "/")).send().await;
    assert!(result.is_err());
}
