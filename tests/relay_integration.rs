use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use relaynet::{
    EndpointSelector, Endpoints, FailureKind, HttpTransport, Relay, RelayConfig, RelayError,
    RelayOptions, Transport,
};
use serde_json::{json, Value as JsonValue};

const RAW_TX: &str = "0x02f8730181a8843b9aca00850df8475800825208940000000000000000000000000000000000000000880de0b6b3a764000080c001a0";

#[derive(Clone)]
enum Reply {
    Result(JsonValue),
    RpcError { code: i64, message: &'static str },
    WrongId,
    Raw(&'static str),
}

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    reply: Reply,
    delay: Duration,
}

impl MockResponse {
    fn result(value: JsonValue) -> Self {
        Self {
            status: StatusCode::OK,
            reply: Reply::Result(value),
            delay: Duration::from_millis(0),
        }
    }

    fn rpc_error(code: i64, message: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            reply: Reply::RpcError { code, message },
            delay: Duration::from_millis(0),
        }
    }

    fn wrong_id() -> Self {
        Self {
            status: StatusCode::OK,
            reply: Reply::WrongId,
            delay: Duration::from_millis(0),
        }
    }

    fn raw(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            reply: Reply::Raw(body),
            delay: Duration::from_millis(0),
        }
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<JsonValue>>>,
    hits: Arc<AtomicUsize>,
}

async fn rpc_handler(State(state): State<MockState>, body: String) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let request: JsonValue = serde_json::from_str(&body).unwrap_or(JsonValue::Null);
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(request.clone());

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::raw(StatusCode::INTERNAL_SERVER_ERROR, "no mock response available")
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let id = request.get("id").cloned().unwrap_or(JsonValue::Null);
    let body = match response.reply {
        Reply::Result(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string(),
        Reply::RpcError { code, message } => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        })
        .to_string(),
        Reply::WrongId => json!({ "jsonrpc": "2.0", "id": 424242, "result": "0xdead" }).to_string(),
        Reply::Raw(body) => body.to_owned(),
    };

    (
        response.status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<JsonValue>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn rpc_url(&self) -> String {
        format!("{}/rpc", self.base_url)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<JsonValue> {
        self.requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .clone()
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        requests: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/rpc", post(rpc_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        requests: state.requests,
        task,
    }
}

async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind probe listener");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);
    format!("http://{address}/rpc")
}

struct FixedPicks(Mutex<VecDeque<usize>>);

impl FixedPicks {
    fn new(picks: impl Into<VecDeque<usize>>) -> Self {
        Self(Mutex::new(picks.into()))
    }
}

impl EndpointSelector for FixedPicks {
    fn pick(&self, _len: usize) -> usize {
        self.0
            .lock()
            .expect("picks mutex must not be poisoned")
            .pop_front()
            .unwrap_or(0)
    }
}

fn fast_options(max_attempts: usize) -> RelayOptions {
    RelayOptions {
        timeout_ms: 1_000,
        max_attempts,
        backoff_unit_ms: 1,
        ..RelayOptions::default()
    }
}

#[tokio::test]
async fn submit_sends_correlated_envelope_and_returns_result() {
    let server = spawn_server(vec![MockResponse::result(json!("0xabc123"))]).await;
    let transport = HttpTransport::new();

    let result = transport
        .submit(
            &server.rpc_url(),
            "eth_sendRawTransaction",
            RAW_TX,
            Duration::from_secs(1),
        )
        .await
        .expect("submit must succeed");

    assert_eq!(result, json!("0xabc123"));
    assert_eq!(server.hits(), 1);

    let requests = server.requests();
    assert_eq!(requests[0]["jsonrpc"], json!("2.0"));
    assert_eq!(requests[0]["method"], json!("eth_sendRawTransaction"));
    assert_eq!(requests[0]["params"], json!([RAW_TX]));
    assert!(requests[0]["id"].is_u64());
}

#[tokio::test]
async fn consecutive_requests_use_distinct_ids() {
    let server = spawn_server(vec![
        MockResponse::result(json!("0x1")),
        MockResponse::result(json!("0x2")),
    ])
    .await;
    let transport = HttpTransport::new();

    for _ in 0..2 {
        transport
            .submit(&server.rpc_url(), "eth_sendRawTransaction", RAW_TX, Duration::from_secs(1))
            .await
            .expect("submit must succeed");
    }

    let requests = server.requests();
    assert_ne!(requests[0]["id"], requests[1]["id"]);
}

#[tokio::test]
async fn rpc_error_envelope_is_application_error() {
    let server = spawn_server(vec![MockResponse::rpc_error(-32000, "nonce too low")]).await;
    let transport = HttpTransport::new();

    let err = transport
        .submit(&server.rpc_url(), "eth_sendRawTransaction", RAW_TX, Duration::from_secs(1))
        .await
        .expect_err("submit must fail");

    match err {
        RelayError::Rpc { code, message, .. } => {
            assert_eq!(code, -32000);
            assert_eq!(message, "nonce too low");
        }
        other => panic!("expected rpc error, got {other:?}"),
    }
}

#[tokio::test]
async fn rpc_error_with_http_error_status_stays_application_error() {
    let server = spawn_server(vec![MockResponse::rpc_error(-32603, "internal error")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)])
    .await;
    let transport = HttpTransport::new();

    let err = transport
        .submit(&server.rpc_url(), "eth_sendRawTransaction", RAW_TX, Duration::from_secs(1))
        .await
        .expect_err("submit must fail");

    assert_eq!(err.kind(), FailureKind::Application);
}

#[tokio::test]
async fn non_rpc_error_status_is_http_error() {
    let server = spawn_server(vec![MockResponse::raw(
        StatusCode::BAD_GATEWAY,
        "<html>bad gateway</html>",
    )])
    .await;
    let transport = HttpTransport::new();

    let err = transport
        .submit(&server.rpc_url(), "eth_sendRawTransaction", RAW_TX, Duration::from_secs(1))
        .await
        .expect_err("submit must fail");

    match err {
        RelayError::Http { status, body } => {
            assert_eq!(status, 502);
            assert!(body.contains("bad gateway"));
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn oversized_error_page_is_truncated() {
    let page: &'static str = Box::leak(format!("<html>{}</html>", "x".repeat(64 * 1024)).into_boxed_str());
    let server = spawn_server(vec![MockResponse::raw(StatusCode::SERVICE_UNAVAILABLE, page)]).await;
    let transport = HttpTransport::new();

    let err = transport
        .submit(&server.rpc_url(), "eth_sendRawTransaction", RAW_TX, Duration::from_secs(1))
        .await
        .expect_err("submit must fail");

    match err {
        RelayError::Http { status, body } => {
            assert_eq!(status, 503);
            assert!(body.starts_with("<html>"));
            assert!(body.len() < 512);
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_or_uncorrelated_response_is_decode_error() {
    let server = spawn_server(vec![
        MockResponse::raw(StatusCode::OK, "{\"not\":\"jsonrpc\"}"),
        MockResponse::wrong_id(),
    ])
    .await;
    let transport = HttpTransport::new();

    for _ in 0..2 {
        let err = transport
            .submit(&server.rpc_url(), "eth_sendRawTransaction", RAW_TX, Duration::from_secs(1))
            .await
            .expect_err("submit must fail");
        assert!(matches!(err, RelayError::Decode(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn request_timeout_surfaces_transport_error() {
    let server = spawn_server(vec![
        MockResponse::result(json!("0xabc")).with_delay(Duration::from_millis(150))
    ])
    .await;
    let transport = HttpTransport::new();

    let err = transport
        .submit(
            &server.rpc_url(),
            "eth_sendRawTransaction",
            RAW_TX,
            Duration::from_millis(20),
        )
        .await
        .expect_err("request must timeout");

    match err {
        RelayError::Transport(inner) => assert!(inner.is_timeout()),
        other => panic!("expected transport timeout error, got {other:?}"),
    }
}

#[tokio::test]
async fn relay_retries_through_mixed_failures_until_accepted() {
    let server = spawn_server(vec![
        MockResponse::raw(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
        MockResponse::rpc_error(-32000, "already known"),
        MockResponse::result(json!("0xfeed")),
    ])
    .await;

    let relay = Relay::new(Endpoints::new([server.rpc_url()]).expect("valid endpoints"))
        .with_options(fast_options(3));

    let receipt = relay.relay(RAW_TX).await.expect("relay must succeed");

    assert_eq!(receipt.attempts, 3);
    assert_eq!(receipt.endpoint, server.rpc_url());
    assert_eq!(receipt.result, json!("0xfeed"));
    assert_eq!(server.hits(), 3);
    for request in server.requests() {
        assert_eq!(request["params"], json!([RAW_TX]));
    }
}

#[tokio::test]
async fn relay_skips_past_unreachable_endpoint() {
    let healthy = spawn_server(vec![MockResponse::result(json!("0xbeef"))]).await;
    let dead = unreachable_url().await;

    let relay = Relay::new(
        Endpoints::new([dead.clone(), healthy.rpc_url()]).expect("valid endpoints"),
    )
    .with_options(fast_options(3))
    .with_selector(FixedPicks::new([0, 1]));

    let receipt = relay.relay(RAW_TX).await.expect("relay must succeed");

    assert_eq!(receipt.attempts, 2);
    assert_eq!(receipt.endpoint, healthy.rpc_url());
    assert_eq!(healthy.hits(), 1);
}

#[tokio::test]
async fn relay_exhaustion_reports_last_rpc_message() {
    let server = spawn_server(vec![
        MockResponse::rpc_error(-32000, "nonce too low"),
        MockResponse::rpc_error(-32000, "nonce too low"),
        MockResponse::rpc_error(-32000, "nonce too low"),
    ])
    .await;

    let relay = Relay::new(Endpoints::new([server.rpc_url()]).expect("valid endpoints"))
        .with_options(fast_options(3));

    let err = relay.relay(RAW_TX).await.expect_err("relay must fail");

    assert_eq!(err.kind(), FailureKind::Exhausted);
    assert!(err.to_string().contains("nonce too low"));
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn empty_endpoint_list_fails_before_any_request() {
    let server = spawn_server(vec![MockResponse::result(json!("0xabc"))]).await;

    let err = RelayConfig::from_inputs(Some(" , "), Some(RAW_TX), None)
        .expect_err("config must fail");

    assert!(matches!(err, RelayError::Config(_)));
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn config_drives_relay_end_to_end() {
    let server = spawn_server(vec![MockResponse::result(json!("0xc0ffee"))]).await;
    let rpcs = format!(" {} , ", server.rpc_url());

    let config = RelayConfig::from_inputs(Some(rpcs.as_str()), Some(RAW_TX), Some(2))
        .expect("config must build")
        .with_timeout_ms(1_000)
        .expect("positive timeout must be accepted")
        .with_backoff_unit_ms(1);
    let relay = Relay::new(config.endpoints).with_options(config.options);

    let receipt = relay.relay(&config.payload).await.expect("relay must succeed");

    assert_eq!(receipt.result, json!("0xc0ffee"));
    assert_eq!(server.requests()[0]["params"], json!([RAW_TX]));
}
