//! In-process mock npm registry for integration tests.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A package as the mock registry serves it.
#[derive(Debug, Clone, Default)]
pub struct MockPackage {
    pub versions: Vec<String>,
    pub latest: Option<String>,
    /// version → (dependency name → range)
    pub deps: BTreeMap<String, Vec<(String, String)>>,
}

impl MockPackage {
    pub fn new(versions: &[&str], latest: Option<&str>) -> Self {
        Self {
            versions: versions.iter().map(|v| (*v).to_string()).collect(),
            latest: latest.map(String::from),
            deps: BTreeMap::new(),
        }
    }

    /// Declare dependencies for every published version.
    pub fn depends_on(mut self, deps: &[(&str, &str)]) -> Self {
        for version in &self.versions {
            self.deps.insert(
                version.clone(),
                deps.iter()
                    .map(|(n, r)| ((*n).to_string(), (*r).to_string()))
                    .collect(),
            );
        }
        self
    }

    /// Declare dependencies for one published version only.
    pub fn depends_on_at(mut self, version: &str, deps: &[(&str, &str)]) -> Self {
        self.deps.insert(
            version.to_string(),
            deps.iter()
                .map(|(n, r)| ((*n).to_string(), (*r).to_string()))
                .collect(),
        );
        self
    }

    fn packument(&self, name: &str) -> Value {
        let mut versions = Map::new();
        for version in &self.versions {
            let deps: Map<String, Value> = self
                .deps
                .get(version)
                .map(|d| d.iter().map(|(n, r)| (n.clone(), json!(r))).collect())
                .unwrap_or_default();
            versions.insert(
                version.clone(),
                json!({ "name": name, "version": version, "dependencies": deps }),
            );
        }
        let mut dist_tags = Map::new();
        if let Some(latest) = &self.latest {
            dist_tags.insert("latest".to_string(), json!(latest));
        }
        json!({ "name": name, "dist-tags": dist_tags, "versions": versions })
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    packages: BTreeMap<String, MockPackage>,
    token: Option<String>,
    reject_writes: bool,
    listing_delay: Option<Duration>,
    reads: Vec<String>,
    writes: Vec<(String, String)>,
}

/// Handle to a running mock registry.
#[derive(Clone)]
pub struct MockRegistry {
    pub url: String,
    state: Arc<Mutex<RegistryState>>,
}

impl MockRegistry {
    /// Start a registry serving `packages` on an ephemeral port.
    pub async fn start(packages: Vec<(&str, MockPackage)>) -> Self {
        let state = Arc::new(Mutex::new(RegistryState {
            packages: packages
                .into_iter()
                .map(|(n, p)| (n.to_string(), p))
                .collect(),
            ..RegistryState::default()
        }));

        let app = Router::new()
            .route("/-/all", get(handle_all))
            .route("/-/package/:name/dist-tags/:tag", put(handle_put_tag))
            .route("/:name", get(handle_packument))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    /// Require `Authorization: Bearer <token>` on every request.
    pub fn require_token(&self, token: &str) {
        self.state.lock().unwrap().token = Some(token.to_string());
    }

    /// Answer every tag write with 401.
    pub fn reject_writes(&self) {
        self.state.lock().unwrap().reject_writes = true;
    }

    /// Hold the `/-/all` response back for `delay`.
    pub fn delay_listing(&self, delay: Duration) {
        self.state.lock().unwrap().listing_delay = Some(delay);
    }

    /// Tag writes received so far, as (package, version).
    pub fn writes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Packument reads received so far.
    pub fn reads(&self) -> Vec<String> {
        self.state.lock().unwrap().reads.clone()
    }

    /// Current `latest` tag of a package.
    pub fn latest(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .packages
            .get(name)
            .and_then(|p| p.latest.clone())
    }
}

type Shared = Arc<Mutex<RegistryState>>;

fn authorized(state: &RegistryState, headers: &HeaderMap) -> bool {
    let Some(token) = &state.token else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {token}"))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "401 Unauthorized").into_response()
}

async fn handle_all(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let delay = state.lock().unwrap().listing_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }

    let mut listing = Map::new();
    listing.insert("_updated".to_string(), json!(1_700_000_000_000_u64));
    for name in state.packages.keys() {
        listing.insert(name.clone(), json!({ "name": name }));
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Value::Object(listing).to_string(),
    )
        .into_response()
}

async fn handle_packument(
    Path(name): Path<String>,
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap();
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state.reads.push(name.clone());

    match state.packages.get(&name) {
        Some(pkg) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            pkg.packument(&name).to_string(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn handle_put_tag(
    Path((name, tag)): Path<(String, String)>,
    State(state): State<Shared>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let mut state = state.lock().unwrap();
    if state.reject_writes || !authorized(&state, &headers) {
        return unauthorized();
    }
    let Ok(version) = serde_json::from_str::<String>(&body) else {
        return (StatusCode::BAD_REQUEST, "body must be a JSON string").into_response();
    };
    if tag != "latest" {
        return (StatusCode::BAD_REQUEST, "unexpected tag").into_response();
    }

    let Some(pkg) = state.packages.get_mut(&name) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };
    pkg.latest = Some(version.clone());
    state.writes.push((name, version));
    (StatusCode::OK, "{\"ok\":true}").into_response()
}
