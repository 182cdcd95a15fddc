//! End-to-end API tests driving the router directly

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use futures::future::{self, BoxFuture, FutureExt};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tokio_test::{assert_err, assert_ok};
use tower::ServiceExt;

use whirlbird_server::app::AppState;
use whirlbird_server::config::Config;
use whirlbird_server::game::pool::HeadlessScene;
use whirlbird_server::game::session::SessionEvent;
use whirlbird_server::game::{GameSession, ScoreReporter};
use whirlbird_server::http::build_router;
use whirlbird_server::social::LoggingPoster;
use whirlbird_server::store::{MemoryStore, ScoreStore, ScoredMember, StoreError};
use whirlbird_server::util::time::ManualClock;

const SECRET: &str = "integration-secret";
const START_MS: i64 = 1_700_000_000_000;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    store: Arc<MemoryStore>,
}

fn app_with_burst(burst: u32) -> TestApp {
    let mut config = Config::local(SECRET);
    config.request_burst_per_sec = burst;
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(START_MS));
    let state = AppState::with_backends(
        config,
        store.clone(),
        Arc::new(LoggingPoster::new("https://reddit.test")),
        clock.clone(),
    );
    TestApp {
        router: build_router(state),
        clock,
        store,
    }
}

fn app() -> TestApp {
    app_with_burst(10_000)
}

fn token_for(username: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({"sub": "t2_1", "username": username, "exp": START_MS / 1000 + 3_600}).to_string(),
    );
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", header, payload).as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{}.{}.{}", header, payload, signature)
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri).header("x-post-id", "abc123");
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", token_for(user)));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: impl Into<String>, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-post-id", "abc123");
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", token_for(user)));
    }
    builder.body(Body::from(body.into())).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn assert_envelope(body: &Value) {
    assert_eq!(body["status"], "error");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn health_reports_ok_with_security_headers() {
    let app = app();
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert_eq!(headers["cache-control"], "no-store");

    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["uptimeSecs"].is_u64());
}

#[tokio::test]
async fn unknown_routes_get_the_404_envelope() {
    let app = app();
    let (status, body) = send(&app.router, get("/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_envelope(&body);
    assert_eq!(body["message"], "not found");

    let (status, body) = send(&app.router, get("/api/score", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_envelope(&body);
}

#[tokio::test]
async fn missing_post_id_is_rejected_everywhere() {
    let app = app();
    let strip = |mut req: Request<Body>| {
        req.headers_mut().remove("x-post-id");
        req
    };

    for request in [
        get("/api/init", None),
        get("/api/leaderboard", None),
        post_json("/api/score", r#"{"score":1}"#, Some("ann")),
        post_json("/api/publish", r#"{"score":1}"#, Some("ann")),
        post_json("/api/comment", r#"{"score":1}"#, Some("ann")),
    ] {
        let uri = request.uri().to_string();
        let (status, body) = send(&app.router, strip(request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["message"], "postId missing");
    }
}

#[tokio::test]
async fn init_bootstraps_anonymous_callers() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/init", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "init");
    assert_eq!(body["postId"], "abc123");
    assert_eq!(body["username"], "anonymous");
    assert_eq!(body["bestScore"], 0);
    assert_eq!(body["leaderboard"], json!([]));
}

#[tokio::test]
async fn score_bounds_are_enforced() {
    let app = app();

    for accepted in [0, 9999] {
        app.clock.advance(Duration::from_secs(3));
        let (status, body) = send(
            &app.router,
            post_json("/api/score", json!({"score": accepted}).to_string(), Some("ann")),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "score {}", accepted);
        assert_eq!(body["type"], "score");
    }

    for rejected in [
        r#"{"score":-1}"#,
        r#"{"score":10000}"#,
        r#"{"score":3.14}"#,
        r#"{"score":null}"#,
        r#"{"score":"100"}"#,
        r#"{}"#,
        r#"{"score":"#,
        "",
    ] {
        app.clock.advance(Duration::from_secs(3));
        let (status, body) = send(&app.router, post_json("/api/score", rejected, Some("ann"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", rejected);
        assert_envelope(&body);
    }
}

#[tokio::test]
async fn content_type_and_size_are_guarded() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/score")
        .header("content-type", "text/plain")
        .header("x-post-id", "abc123")
        .body(Body::from(r#"{"score":1}"#))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["message"], "Content-Type must be application/json");

    let padded = format!(r#"{{"score":1,"pad":"{}"}}"#, "x".repeat(300));
    let (status, body) = send(&app.router, post_json("/api/score", padded.clone(), None)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_envelope(&body);

    let mut declared = post_json("/api/score", padded, None);
    declared
        .headers_mut()
        .insert("content-length", "312".parse().unwrap());
    let (status, _) = send(&app.router, declared).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn rapid_resubmission_is_rate_limited_without_changing_best() {
    let app = app();

    let (status, _) = send(&app.router, post_json("/api/score", r#"{"score":10}"#, Some("ann"))).await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::from_millis(500));
    let (status, body) = send(&app.router, post_json("/api/score", r#"{"score":900}"#, Some("ann"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_envelope(&body);

    let (_, init) = send(&app.router, get("/api/init", Some("ann"))).await;
    assert_eq!(init["bestScore"], 10);
    assert_eq!(init["leaderboard"][0]["score"], 10);
}

#[tokio::test]
async fn best_and_leaderboard_only_move_up() {
    let app = app();

    let mut results = Vec::new();
    for score in [100, 50, 150] {
        app.clock.advance(Duration::from_secs(3));
        let (status, body) = send(
            &app.router,
            post_json("/api/score", json!({"score": score}).to_string(), Some("ann")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        results.push((body["newBest"].clone(), body["bestScore"].clone()));
        if score == 50 {
            assert_eq!(body["leaderboard"][0]["score"], 100);
        }
    }

    assert_eq!(
        results,
        vec![
            (json!(true), json!(100)),
            (json!(false), json!(100)),
            (json!(true), json!(150)),
        ]
    );

    let (_, board) = send(&app.router, get("/api/leaderboard", None)).await;
    assert_eq!(board["type"], "leaderboard");
    assert_eq!(
        board["leaderboard"],
        json!([{"rank": 1, "username": "ann", "score": 150}])
    );
}

#[tokio::test]
async fn anonymous_publish_and_comment_require_login() {
    let app = app();

    let (status, body) = send(&app.router, post_json("/api/publish", r#"{"score":5}"#, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "login required to publish");

    let (status, body) = send(&app.router, post_json("/api/comment", r#"{"score":5}"#, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "login required to comment");
}

#[tokio::test]
async fn anonymous_callers_get_401_even_with_a_bad_score() {
    let app = app();

    for body in [r#"{"score":-1}"#, r#"{"score":3.14}"#, r#"{"score":null}"#, "oops", ""] {
        for (uri, action) in [("/api/publish", "publish"), ("/api/comment", "comment")] {
            let (status, reply) = send(&app.router, post_json(uri, body, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {:?}", uri, body);
            assert_eq!(reply["message"], format!("login required to {}", action));
        }
    }

    // a logged-in caller with the same body still gets the validation error
    let (status, _) = send(&app.router, post_json("/api/publish", r#"{"score":-1}"#, Some("ann"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logged_in_users_can_publish_and_comment_once_per_cooldown() {
    let app = app();

    let (status, body) = send(&app.router, post_json("/api/publish", r#"{"score":42}"#, Some("ann"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "publish");
    assert!(body["postId"].as_str().unwrap().starts_with("t3_"));
    assert!(body["postUrl"].as_str().unwrap().starts_with("https://reddit.test/"));

    let (status, _) = send(&app.router, post_json("/api/publish", r#"{"score":42}"#, Some("ann"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let (status, body) = send(&app.router, post_json("/api/comment", r#"{"score":42}"#, Some("ann"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "comment");
    assert!(body["commentId"].as_str().unwrap().starts_with("t1_"));

    app.clock.advance(Duration::from_secs(10));
    let (status, _) = send(&app.router, post_json("/api/publish", r#"{"score":43}"#, Some("ann"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn usernames_are_sanitized_from_tokens() {
    let app = app();

    let (_, body) = send(&app.router, get("/api/init", Some("<script>alert(1)</script>"))).await;
    assert_eq!(body["username"], "scriptalert1script");

    let long = "b".repeat(500);
    let (_, body) = send(&app.router, get("/api/init", Some(&long))).await;
    assert_eq!(body["username"].as_str().unwrap().len(), 30);

    // a token signed with another key is ignored
    let mut forged = get("/api/init", None);
    forged
        .headers_mut()
        .insert("authorization", "Bearer a.b.c".parse().unwrap());
    let (status, body) = send(&app.router, forged).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "anonymous");
}

#[tokio::test]
async fn request_bursts_are_throttled() {
    let app = app_with_burst(2);
    assert_eq!(send(&app.router, get("/api/leaderboard", Some("ann"))).await.0, StatusCode::OK);
    assert_eq!(send(&app.router, get("/api/leaderboard", Some("ann"))).await.0, StatusCode::OK);
    let (status, body) = send(&app.router, get("/api/leaderboard", Some("ann"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "too many requests");

    assert_eq!(send(&app.router, get("/api/leaderboard", Some("bob"))).await.0, StatusCode::OK);
}

#[tokio::test]
async fn requests_without_context_are_rejected_before_the_throttle() {
    let app = app_with_burst(1);
    let no_context = || {
        let mut req = get("/api/init", None);
        req.headers_mut().remove("x-post-id");
        req
    };

    for _ in 0..3 {
        let (status, body) = send(&app.router, no_context()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "postId missing");
    }

    // the burst was not spent on them
    assert_eq!(send(&app.router, get("/api/init", None)).await.0, StatusCode::OK);
    assert_eq!(
        send(&app.router, get("/api/init", None)).await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
}

/// Store whose every call fails
struct BrokenStore;

impl BrokenStore {
    fn fail<'a, T: Send + 'a>() -> BoxFuture<'a, Result<T, StoreError>> {
        future::ready(Err(StoreError::Unavailable)).boxed()
    }
}

impl ScoreStore for BrokenStore {
    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Self::fail()
    }

    fn set_max<'a>(&'a self, _key: &'a str, _value: i64) -> BoxFuture<'a, Result<i64, StoreError>> {
        Self::fail()
    }

    fn claim_window<'a>(
        &'a self,
        _key: &'a str,
        _now_ms: i64,
        _window_ms: i64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        Self::fail()
    }

    fn z_range_rev<'a>(
        &'a self,
        _key: &'a str,
        _start: usize,
        _stop: usize,
    ) -> BoxFuture<'a, Result<Vec<ScoredMember>, StoreError>> {
        Self::fail()
    }

    fn z_score<'a>(
        &'a self,
        _key: &'a str,
        _member: &'a str,
    ) -> BoxFuture<'a, Result<Option<f64>, StoreError>> {
        Self::fail()
    }

    fn z_add_gt<'a>(
        &'a self,
        _key: &'a str,
        _member: &'a str,
        _score: f64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        Self::fail()
    }
}

#[tokio::test]
async fn store_failures_become_500_envelopes() {
    let state = AppState::with_backends(
        Config::local(SECRET),
        Arc::new(BrokenStore),
        Arc::new(LoggingPoster::default()),
        Arc::new(ManualClock::new(START_MS)),
    );
    let router = build_router(state);

    for uri in ["/api/init", "/api/leaderboard"] {
        let (status, body) = send(&router, get(uri, None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(body, json!({"status": "error", "message": "storage unavailable"}));
    }

    let (status, _) = send(&router, post_json("/api/score", r#"{"score":1}"#, Some("ann"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn reporter_feeds_the_server_best_back_into_the_session() {
    let app = app();
    assert_ok!(app.store.set_max("best:ann", 500).await);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });

    let mut session = GameSession::new(HeadlessScene::new(), 0, 11);
    assert!(session.start());
    let submission = session
        .game_over()
        .into_iter()
        .find_map(|event| match event {
            SessionEvent::Submit(submission) => Some(submission),
            _ => None,
        })
        .unwrap();

    let mut reporter = ScoreReporter::new(format!("http://{}", addr), "abc123", Some(token_for("ann")));
    reporter.submit(submission);

    let mut results = Vec::new();
    for _ in 0..100 {
        results = reporter.drain();
        if !results.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].best_score, 500);
    assert!(session.apply_submission(results[0]));
    assert_eq!(session.best(), 500);

    // a result from an earlier run is ignored
    assert!(session.restart());
    assert!(!session.apply_submission(results[0]));
    let stored = assert_ok!(app.store.get("best:ann").await);
    assert_eq!(stored.as_deref(), Some("500"));
    assert_err!(BrokenStore.get("best:ann").await);
}
