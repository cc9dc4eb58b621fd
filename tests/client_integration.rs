use std::{
    collections::VecDeque,
    io::{self, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use deepl_http::{
    spawn_producer, Backoff, BodyProducer, BodyWriter, Cancellation, ClientOptions,
    DeeplError, DocumentOptions, Endpoint, ErrorKind, GlossaryEntry, LanguageType,
    MultipartUpload, RetryPolicy, StreamingBody, TranslateOptions, Translator,
};
use futures_util::StreamExt;
use serde_json::{json, Value as JsonValue};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    content_type: &'static str,
    body: String,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    fn text(status: StatusCode, content_type: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type,
            body: body.to_owned(),
        }
    }

    fn empty(status: StatusCode) -> Self {
        Self::text(status, "text/plain", "")
    }
}

#[derive(Clone, Debug)]
struct RecordedRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl RecordedRequest {
    fn header(&self, name: header::HeaderName) -> &str {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    hits: Arc<AtomicUsize>,
}

async fn handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(RecordedRequest {
            method,
            path: uri.path().to_owned(),
            query: uri.query().map(str::to_owned),
            headers,
            body,
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "no mock response available"}),
            )
        })
    };

    (
        response.status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .clone()
    }

    fn translator(&self, max_attempts: u32) -> Translator {
        self.translator_with(fast_retry(max_attempts))
    }

    fn translator_with(&self, retry: RetryPolicy) -> Translator {
        Translator::new("test-key")
            .expect("valid key")
            .with_options(ClientOptions {
                server_url: Some(self.base_url.clone()),
                retry,
                ..ClientOptions::default()
            })
    }
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    let backoff = Backoff::new(Duration::from_millis(1), Duration::from_millis(5), 1.6, 0.0)
        .expect("valid backoff");
    RetryPolicy::new(max_attempts, backoff).expect("valid policy")
}

/// Every wait lasts exactly [`FIXED_DELAY`], so elapsed time counts waits.
fn fixed_retry(max_attempts: u32) -> RetryPolicy {
    let backoff = Backoff::new(FIXED_DELAY, FIXED_DELAY, 1.0, 0.0).expect("valid backoff");
    RetryPolicy::new(max_attempts, backoff).expect("valid policy")
}

const FIXED_DELAY: Duration = Duration::from_millis(150);

fn assert_waits(elapsed: Duration, waits: u32) {
    assert!(elapsed >= FIXED_DELAY * waits, "{elapsed:?} is under {waits} waits");
    assert!(
        elapsed < FIXED_DELAY * (waits + 1),
        "{elapsed:?} is over {waits} waits"
    );
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        requests: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new().fallback(handler).with_state(state.clone());

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

fn usage_body() -> JsonValue {
    json!({"character_count": 180118, "character_limit": 1250000})
}

#[tokio::test]
async fn retries_transient_statuses_until_success() {
    let server = spawn_server(vec![
        MockResponse::empty(StatusCode::SERVICE_UNAVAILABLE),
        MockResponse::empty(StatusCode::SERVICE_UNAVAILABLE),
        MockResponse::json(StatusCode::OK, usage_body()),
    ])
    .await;

    let started = Instant::now();
    let usage = server
        .translator_with(fixed_retry(5))
        .usage()
        .await
        .expect("usage must succeed");

    assert_waits(started.elapsed(), 2);
    assert_eq!(usage.character_count, 180118);
    assert_eq!(usage.character_limit, 1250000);
    assert_eq!(usage.document_count, None);
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn fatal_status_is_not_retried() {
    let server = spawn_server(vec![MockResponse::empty(StatusCode::BAD_REQUEST)]).await;

    let err = server.translator(5).usage().await.expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "400 - Bad Request");
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn rate_limiting_exhausts_the_attempt_budget() {
    let server = spawn_server(vec![MockResponse::empty(StatusCode::TOO_MANY_REQUESTS); 6]).await;

    let started = Instant::now();
    let err = server
        .translator_with(fixed_retry(5))
        .usage()
        .await
        .expect_err("must fail");

    assert_waits(started.elapsed(), 4);
    match &err {
        DeeplError::Exhausted { attempts, last } => {
            assert_eq!(*attempts, 5);
            assert_eq!(last.status(), Some(429));
        }
        other => panic!("expected exhausted error, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Exhausted);
    assert_eq!(server.hits(), 5);
}

#[tokio::test]
async fn quota_exceeded_is_fatal_with_its_own_message() {
    let status = StatusCode::from_u16(456).expect("valid status");
    let server = spawn_server(vec![MockResponse::empty(status)]).await;

    let err = server
        .translator(5)
        .translate_text(&["Hello"], "DE", &TranslateOptions::default())
        .await
        .expect_err("must fail");

    assert_eq!(
        err.to_string(),
        "456 - Quota exceeded. The character limit has been reached."
    );
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn translate_sends_form_with_auth_header() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"translations": [
            {"detected_source_language": "EN", "text": "Hallo"},
            {"detected_source_language": "EN", "text": "Welt"}
        ]}),
    )])
    .await;

    let options = TranslateOptions {
        formality: Some("less".parse().expect("valid formality")),
        ..TranslateOptions::default()
    };
    let translations = server
        .translator(1)
        .translate_text(&["Hello", "World"], "DE", &options)
        .await
        .expect("translate must succeed");

    assert_eq!(translations.len(), 2);
    assert_eq!(translations[0].text, "Hallo");
    assert_eq!(translations[1].detected_source_language, "EN");

    let requests = server.requests();
    let request = &requests[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/v2/translate");
    assert_eq!(request.header(header::AUTHORIZATION), "DeepL-Auth-Key test-key");
    assert_eq!(
        request.header(header::CONTENT_TYPE),
        "application/x-www-form-urlencoded"
    );
    assert_eq!(
        request.body_text(),
        "text=Hello&text=World&target_lang=DE&formality=less"
    );
}

#[tokio::test]
async fn invalid_input_fails_before_any_request() {
    let server = spawn_server(vec![]).await;
    let translator = server.translator(5);

    let empty: [&str; 0] = [];
    let err = translator
        .translate_text(&empty, "DE", &TranslateOptions::default())
        .await
        .expect_err("must fail");
    assert!(matches!(err, DeeplError::InvalidOption { name: "text", .. }));

    let err = translator.glossary("../usage").await.expect_err("must fail");
    assert!(matches!(err, DeeplError::InvalidOption { .. }));
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn default_content_type_is_json() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, usage_body())]).await;

    server.translator(1).usage().await.expect("usage must succeed");

    let requests = server.requests();
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].header(header::CONTENT_TYPE), "application/json");
}

#[tokio::test]
async fn languages_pass_type_as_query() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!([
            {"language": "DE", "name": "German", "supports_formality": true},
            {"language": "EN-US", "name": "English (American)"}
        ]),
    )])
    .await;

    let languages = server
        .translator(1)
        .languages(LanguageType::Target)
        .await
        .expect("languages must succeed");

    assert_eq!(languages.len(), 2);
    assert!(languages[0].supports_formality);
    assert!(!languages[1].supports_formality);
    assert_eq!(languages[1].code, "EN-US");

    let requests = server.requests();
    assert_eq!(requests[0].path, "/v2/languages");
    assert_eq!(requests[0].query.as_deref(), Some("type=target"));
}

#[tokio::test]
async fn glossary_lifecycle() {
    let info = json!({
        "glossary_id": "def3a26b",
        "name": "Greetings",
        "ready": true,
        "source_lang": "en",
        "target_lang": "de",
        "creation_time": "2021-08-03T14:16:18.329Z",
        "entry_count": 2
    });
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::CREATED, info.clone()),
        MockResponse::json(StatusCode::OK, json!({"glossaries": [info]})),
        MockResponse::text(
            StatusCode::OK,
            "text/tab-separated-values",
            "Hello\tHallo\nBye\tTschüss",
        ),
        MockResponse::empty(StatusCode::NO_CONTENT),
    ])
    .await;
    let translator = server.translator(1);

    let entries = [
        GlossaryEntry::new("Hello", "Hallo"),
        GlossaryEntry::new("Bye", "Tschüss"),
    ];
    let created = translator
        .create_glossary("Greetings", "EN", "DE", &entries)
        .await
        .expect("create must succeed");
    assert_eq!(created.glossary_id, "def3a26b");
    assert_eq!(created.entry_count, 2);

    let listed = translator.list_glossaries().await.expect("list must succeed");
    assert_eq!(listed, vec![created.clone()]);

    let fetched = translator
        .glossary_entries("def3a26b")
        .await
        .expect("entries must succeed");
    assert_eq!(fetched, entries);

    translator
        .delete_glossary("def3a26b")
        .await
        .expect("delete must succeed");

    let requests = server.requests();
    let create_body: JsonValue =
        serde_json::from_slice(&requests[0].body).expect("create body must be JSON");
    assert_eq!(create_body["entries"], "Hello\tHallo\nBye\tTschüss");
    assert_eq!(create_body["entries_format"], "tsv");
    assert_eq!(create_body["source_lang"], "EN");
    assert_eq!(requests[2].path, "/v2/glossaries/def3a26b/entries");
    assert_eq!(
        requests[2].header(header::ACCEPT),
        "text/tab-separated-values"
    );
    assert_eq!(requests[3].method, Method::DELETE);
}

#[tokio::test]
async fn unexpected_success_status_is_an_error() {
    // Creation must answer 201.
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, json!({}))]).await;

    let err = server
        .translator(5)
        .create_glossary("g", "EN", "DE", &[GlossaryEntry::new("a", "b")])
        .await
        .expect_err("must fail");

    assert_eq!(err.status(), Some(200));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn glossary_language_pairs_unwrap_envelope() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"supported_languages": [{"source_lang": "de", "target_lang": "en"}]}),
    )])
    .await;

    let pairs = server
        .translator(1)
        .glossary_language_pairs()
        .await
        .expect("pairs must succeed");

    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].source_lang, "de");
}

#[tokio::test]
async fn upload_streams_file_again_on_retry() {
    let mut source = tempfile::NamedTempFile::new().expect("temp file");
    source
        .write_all(b"document body to translate")
        .expect("write temp file");

    let server = spawn_server(vec![
        MockResponse::empty(StatusCode::BAD_GATEWAY),
        MockResponse::json(
            StatusCode::OK,
            json!({"document_id": "04DE5AD9", "document_key": "0CB0054F"}),
        ),
    ])
    .await;

    let options = DocumentOptions {
        source_lang: Some("EN".to_owned()),
        filename: Some("report.txt".to_owned()),
        ..DocumentOptions::default()
    };
    let info = server
        .translator(3)
        .upload_document(source.path(), "DE", &options)
        .await
        .expect("upload must succeed");

    assert_eq!(info.document_id, "04DE5AD9");
    assert_eq!(info.document_key, "0CB0054F");
    assert_eq!(server.hits(), 2);

    for request in server.requests() {
        assert_eq!(request.path, "/v2/document");
        assert!(request
            .header(header::CONTENT_TYPE)
            .starts_with("multipart/form-data; boundary="));
        let body = request.body_text();
        let filename = body.find("name=\"filename\"\r\n\r\nreport.txt").expect("filename field");
        let target = body.find("name=\"target_lang\"\r\n\r\nDE").expect("target field");
        let source = body.find("name=\"source_lang\"\r\n\r\nEN").expect("source field");
        let file = body.find("document body to translate").expect("file content");
        assert!(filename < target && target < source && source < file);
    }
}

#[tokio::test]
async fn document_status_and_download() {
    let server = spawn_server(vec![
        MockResponse::json(
            StatusCode::OK,
            json!({"document_id": "04DE5AD9", "status": "translating", "seconds_remaining": 20}),
        ),
        MockResponse::text(StatusCode::OK, "application/octet-stream", "übersetzt"),
    ])
    .await;
    let translator = server.translator(1);

    let status = translator
        .document_status("04DE5AD9", "0CB0054F")
        .await
        .expect("status must succeed");
    assert_eq!(status.status, "translating");
    assert_eq!(status.seconds_remaining, Some(20));
    assert!(!status.is_done());

    let mut stream = Box::pin(
        translator
            .download_document("04DE5AD9", "0CB0054F")
            .await
            .expect("download must start"),
    );
    let mut downloaded = Vec::new();
    while let Some(chunk) = stream.next().await {
        downloaded.extend_from_slice(&chunk.expect("chunk must arrive"));
    }
    assert_eq!(downloaded, "übersetzt".as_bytes());

    let requests = server.requests();
    assert_eq!(requests[0].path, "/v2/document/04DE5AD9");
    assert_eq!(requests[1].path, "/v2/document/04DE5AD9/result");
    let key: JsonValue = serde_json::from_slice(&requests[1].body).expect("JSON body");
    assert_eq!(key, json!({"document_key": "0CB0054F"}));
}

/// Writes some data, then fails.
struct BrokenSource {
    chunks_before_failure: usize,
}

async fn write_then_fail(writer: BodyWriter, chunks: usize) -> io::Result<()> {
    for _ in 0..chunks {
        writer.write(vec![b'x'; 8 * 1024]).await?;
    }
    Err(io::Error::other("source disk went away"))
}

impl BodyProducer for BrokenSource {
    fn produce(&self) -> StreamingBody {
        let chunks = self.chunks_before_failure;
        spawn_producer(2, move |writer| write_then_fail(writer, chunks))
    }
}

#[tokio::test]
async fn production_failure_wins_over_exchange_outcome() {
    for run in 0..20 {
        let server = spawn_server(vec![
            MockResponse::empty(StatusCode::SERVICE_UNAVAILABLE);
            5
        ])
        .await;
        let endpoint = Endpoint::post("v2/document")
            .with_stream(
                "application/octet-stream",
                Arc::new(BrokenSource {
                    chunks_before_failure: run % 4,
                }),
            )
            .expect("valid content type");

        let err = server
            .translator(5)
            .dispatch(&endpoint)
            .await
            .expect_err("must fail");

        match &err {
            DeeplError::Production(inner) => {
                assert_eq!(inner.to_string(), "source disk went away");
            }
            other => panic!("run {run}: expected production error, got {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(server.hits() <= 1, "production failures are not retried");
    }
}

/// Answers every connection with 200 after reading only the start of the
/// request, then holds the socket open without reading any further.
async fn spawn_early_responder() -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut start = vec![0u8; 4096];
            let _ = socket.read(&mut start).await;
            let body = r#"{"document_id":"04DE5AD9","document_key":"0CB0054F"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            held.push(socket);
        }
    });
    (format!("http://{address}"), task)
}

#[tokio::test]
async fn early_response_does_not_wait_for_unread_upload() {
    let source = tempfile::NamedTempFile::new().expect("temp file");
    source
        .as_file()
        .set_len(32 * 1024 * 1024)
        .expect("size temp file");
    let (base_url, responder) = spawn_early_responder().await;

    let translator = Translator::new("test-key")
        .expect("valid key")
        .with_options(ClientOptions {
            server_url: Some(base_url),
            timeout_ms: 2_000,
            retry: fast_retry(1),
        });
    let upload = MultipartUpload::new(source.path(), "file").field("target_lang", "DE");
    let endpoint = Endpoint::post("v2/document")
        .with_stream(&upload.content_type(), Arc::new(upload))
        .expect("valid content type");

    let result = tokio::time::timeout(Duration::from_secs(15), translator.dispatch(&endpoint))
        .await
        .expect("dispatch must not wait for the unread body");
    responder.abort();

    let response = result.expect("the early response is the outcome");
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn cancellation_interrupts_backoff_wait() {
    let server = spawn_server(vec![
        MockResponse::empty(StatusCode::SERVICE_UNAVAILABLE);
        5
    ])
    .await;
    let backoff = Backoff::new(Duration::from_secs(30), Duration::from_secs(60), 2.0, 0.0)
        .expect("valid backoff");
    let (cancel, cancellation) = Cancellation::new();
    let translator = Translator::new("test-key")
        .expect("valid key")
        .with_options(ClientOptions {
            server_url: Some(server.base_url.clone()),
            retry: RetryPolicy::new(5, backoff).expect("valid policy"),
            ..ClientOptions::default()
        })
        .with_cancellation(cancellation);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(10), translator.usage())
        .await
        .expect("cancellation must end the wait early")
        .expect_err("must fail");
    canceller.await.expect("canceller task");

    assert!(matches!(err, DeeplError::Cancelled));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn transport_errors_are_retried() {
    // Nothing listens on the bound-then-dropped port.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let address = listener.local_addr().expect("local addr");
    drop(listener);

    let translator = Translator::new("test-key")
        .expect("valid key")
        .with_options(ClientOptions {
            server_url: Some(format!("http://{address}")),
            retry: fast_retry(3),
            ..ClientOptions::default()
        });

    let err = translator.usage().await.expect_err("must fail");

    match err {
        DeeplError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, DeeplError::Transport(_)));
        }
        other => panic!("expected exhausted transport error, got {other:?}"),
    }
}
