use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use lesson_forge::auth::IdentityClient;
use lesson_forge::config::Config;
use lesson_forge::files::LocalDirStore;
use lesson_forge::generation::GenerationService;
use lesson_forge::providers::{ContentProvider, MockProvider, ProviderRouter};
use lesson_forge::storage::SqliteStorage;
use lesson_forge::web::{router, AppState, SharedState};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Token the mock identity service accepts
#[allow(dead_code)]
pub const GOOD_TOKEN: &str = "good-token";

/// User id behind [`GOOD_TOKEN`]
#[allow(dead_code)]
pub const USER_ID: &str = "u1";

/// Email behind [`GOOD_TOKEN`]
#[allow(dead_code)]
pub const USER_EMAIL: &str = "teacher@example.com";

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("ledger.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A router wired to a temp ledger, a local file store and a mock identity service
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    pub identity: MockServer,
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    /// Start an app whose generations use the mock content provider
    pub async fn start() -> Self {
        Self::with_provider(Arc::new(MockProvider::new())).await
    }

    /// Start an app whose generations use `provider`
    pub async fn with_provider(provider: Arc<dyn ContentProvider>) -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        let identity = MockServer::start().await;

        let mut config = Config::default();
        config.identity.url = identity.uri();
        config.identity.anon_key = "anon".to_string();
        config.storage.backend = "local".to_string();
        config.storage.local_dir = dir.path().join("files");
        config.database.path = Some(dir.path().join("ledger.db"));
        config.server.public_url = "http://localhost:8080".to_string();

        let storage = SqliteStorage::from_config(&config.database).expect("ledger");
        let files = Arc::new(LocalDirStore::new(
            config.storage.local_dir.clone(),
            &config.server.public_url,
        ));
        let generation =
            GenerationService::new(storage, ProviderRouter::single(provider), files, &config);
        let client = IdentityClient::new(&config.identity).expect("identity client");
        let state = Arc::new(AppState::new(config, client, generation).expect("state"));

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header_matcher("authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": USER_ID,
                "email": USER_EMAIL,
            })))
            .mount(&identity)
            .await;

        Self {
            router: router(state.clone()),
            state,
            identity,
            dir,
        }
    }

    /// Send one request through a clone of the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Give `USER_ID` a starting balance
    pub fn grant(&self, amount: u32) {
        self.state
            .generation
            .storage()
            .grant(USER_ID, amount, Some(USER_EMAIL))
            .expect("grant credits");
    }

    /// Current balance of `USER_ID`
    pub fn balance(&self) -> u32 {
        self.state
            .generation
            .storage()
            .balance(USER_ID)
            .expect("read balance")
            .credits()
    }
}

/// Token response the mock identity service returns on sign-in
#[allow(dead_code)]
pub fn session_body() -> serde_json::Value {
    serde_json::json!({
        "access_token": GOOD_TOKEN,
        "refresh_token": "refresh",
        "expires_in": 3600,
        "user": { "id": USER_ID, "email": USER_EMAIL }
    })
}

/// GET request with the good bearer token
#[allow(dead_code)]
pub fn authed_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", GOOD_TOKEN))
        .body(Body::empty())
        .expect("request")
}

/// JSON POST with the good bearer token
#[allow(dead_code)]
pub fn authed_post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", GOOD_TOKEN))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Form POST, optionally carrying a cookie
#[allow(dead_code)]
pub fn form_post(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

/// GET, optionally carrying a cookie
#[allow(dead_code)]
pub fn page_get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

/// Response body as a string
#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Response body as JSON
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

/// `name=value` pair of the session cookie set by a response
#[allow(dead_code)]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("lf_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}
