//! In-process stand-in for the series backend, plus scripted collections.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use shared::domain::SeriesId;
use storage::MemoryStore;
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

use crate::{
    credentials::CredentialStore,
    error::ClientError,
    series_api::SeriesApi,
    transport::{AuthTransport, DEFAULT_REQUEST_TIMEOUT},
    types::{Series, SeriesDraft, SeriesPage, SeriesQuery},
};

pub const GOOD_PASSWORD: &str = "correct horse";

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    exp: i64,
}

pub fn mint_token(email: &str, username: Option<&str>) -> String {
    encode(
        &Header::default(),
        &TestClaims {
            sub: email,
            username,
            exp: Utc::now().timestamp() + 3600,
        },
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("mint token")
}

pub struct BackendState {
    pub me: Value,
    pub users: Vec<Value>,
    pub series: Vec<Value>,
    pub next_series_id: i64,
    pub issued_tokens: Vec<String>,
    pub reject_everything: bool,
    pub fail_series_list: bool,
    pub me_calls: usize,
    pub list_queries: Vec<HashMap<String, String>>,
    pub auth_headers: Vec<Option<String>>,
    pub series_payloads: Vec<Value>,
    pub deleted_users: Vec<i64>,
}

impl BackendState {
    fn seeded() -> Self {
        let admin = json!({
            "id": 1,
            "username": "admin",
            "email": "admin@example.com",
            "role": "ADMIN"
        });
        let viewer = json!({
            "id": 2,
            "username": "viewer",
            "email": "viewer@example.com",
            "role": "USER"
        });
        Self {
            me: admin.clone(),
            users: vec![admin, viewer],
            series: Vec::new(),
            next_series_id: 1,
            issued_tokens: Vec::new(),
            reject_everything: false,
            fail_series_list: false,
            me_calls: 0,
            list_queries: Vec::new(),
            auth_headers: Vec::new(),
            series_payloads: Vec::new(),
            deleted_users: Vec::new(),
        }
    }
}

type Shared = Arc<Mutex<BackendState>>;

#[derive(Clone)]
pub struct FakeBackend {
    pub url: String,
    pub state: Shared,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(Mutex::new(BackendState::seeded()));
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/signup", post(signup))
            .route("/api/users/me", get(me))
            .route("/api/users/all", get(all_users))
            .route("/api/users/delete/:id", delete(delete_user))
            .route("/api/series", get(list_series).post(create_series))
            .route("/api/series/:id", put(update_series).delete(delete_series))
            .with_state(Arc::clone(&state));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn transport(&self) -> (Arc<AuthTransport>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let transport = AuthTransport::new(
            self.url.clone(),
            CredentialStore::new(store.clone()),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .expect("transport");
        (Arc::new(transport), store)
    }

    /// Stores a credential the backend accepts, skipping the login call.
    pub async fn sign_in_directly(&self, transport: &AuthTransport) -> String {
        let token = mint_token("admin@example.com", Some("admin"));
        self.state.lock().await.issued_tokens.push(token.clone());
        transport
            .credentials()
            .save_login(&token, 3600, Utc::now())
            .await
            .expect("store credential");
        token
    }
}

async fn authorize(state: &Shared, headers: &HeaderMap) -> Result<(), StatusCode> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let mut guard = state.lock().await;
    guard.auth_headers.push(header.clone());
    if guard.reject_everything {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let token = header.as_deref().and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(token) if guard.issued_tokens.iter().any(|issued| issued == token) => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn login(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if body["password"].as_str() != Some(GOOD_PASSWORD) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Bad credentials" })),
        ));
    }
    let token = mint_token(&email, None);
    state.lock().await.issued_tokens.push(token.clone());
    Ok(Json(json!({ "token": token, "expiresIn": 3600 })))
}

async fn signup(Json(body): Json<Value>) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    if body["username"].as_str().unwrap_or_default().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Username is required" })),
        ));
    }
    Ok(StatusCode::CREATED)
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers).await?;
    let mut guard = state.lock().await;
    guard.me_calls += 1;
    Ok(Json(guard.me.clone()))
}

async fn all_users(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers).await?;
    Ok(Json(Value::Array(state.lock().await.users.clone())))
}

async fn delete_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    authorize(&state, &headers).await?;
    let mut guard = state.lock().await;
    guard.users.retain(|user| user["id"].as_i64() != Some(id));
    guard.deleted_users.push(id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_series(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers).await?;
    let mut guard = state.lock().await;
    guard.list_queries.push(params.clone());
    if guard.fail_series_list {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let page: usize = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(0);
    let size: usize = params
        .get("size")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10)
        .max(1);
    let status = params.get("status").cloned().unwrap_or_default();
    let matching: Vec<Value> = guard
        .series
        .iter()
        .filter(|series| status.is_empty() || series["status"] == status.as_str())
        .cloned()
        .collect();
    let total = matching.len();
    let items: Vec<Value> = matching.into_iter().skip(page * size).take(size).collect();
    Ok(Json(json!({
        "series": items,
        "totalPages": total.div_ceil(size),
        "totalElements": total
    })))
}

async fn create_series(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers).await?;
    let mut guard = state.lock().await;
    guard.series_payloads.push(body.clone());
    let id = guard.next_series_id;
    guard.next_series_id += 1;
    body["id"] = json!(id);
    body["createdAt"] = json!("2024-03-01T10:00:00");
    guard.series.push(body.clone());
    Ok(Json(body))
}

async fn update_series(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(mut body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers).await?;
    let mut guard = state.lock().await;
    guard.series_payloads.push(body.clone());
    let slot = guard
        .series
        .iter_mut()
        .find(|series| series["id"].as_i64() == Some(id))
        .ok_or(StatusCode::NOT_FOUND)?;
    body["id"] = json!(id);
    body["createdAt"] = slot["createdAt"].clone();
    *slot = body.clone();
    Ok(Json(body))
}

async fn delete_series(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    authorize(&state, &headers).await?;
    let mut guard = state.lock().await;
    let before = guard.series.len();
    guard.series.retain(|series| series["id"].as_i64() != Some(id));
    if guard.series.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Collection whose responses are queued per page; a page can be held back
/// until the test releases it.
#[derive(Default)]
pub struct ScriptedSeriesApi {
    pub pages: Mutex<HashMap<u32, SeriesPage>>,
    pub gates: Mutex<HashMap<u32, (oneshot::Sender<()>, oneshot::Receiver<()>)>>,
    pub queries: Mutex<Vec<SeriesQuery>>,
    pub updates: Mutex<Vec<Series>>,
    pub created: Mutex<Vec<SeriesDraft>>,
    pub removed: Mutex<Vec<SeriesId>>,
    pub fail_lists: Mutex<bool>,
    pub fail_mutations: Mutex<bool>,
}

impl ScriptedSeriesApi {
    pub async fn set_page(&self, page: u32, result: SeriesPage) {
        self.pages.lock().await.insert(page, result);
    }

    /// Holds the next fetch of `page`. The first receiver fires when that
    /// fetch starts; the sender releases it.
    pub async fn gate(&self, page: u32) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (started_tx, started_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.gates
            .lock()
            .await
            .insert(page, (started_tx, release_rx));
        (started_rx, release_tx)
    }

    pub async fn query_count(&self) -> usize {
        self.queries.lock().await.len()
    }

    pub async fn last_query(&self) -> Option<SeriesQuery> {
        self.queries.lock().await.last().copied()
    }

    fn mutation_error() -> ClientError {
        ClientError::Api {
            code: shared::error::ErrorCode::Internal,
            status: 500,
            message: "boom".into(),
        }
    }
}

#[async_trait]
impl SeriesApi for ScriptedSeriesApi {
    async fn list(&self, query: &SeriesQuery) -> Result<SeriesPage, ClientError> {
        self.queries.lock().await.push(*query);
        let gate = self.gates.lock().await.remove(&query.page);
        if let Some((started, release)) = gate {
            let _ = started.send(());
            let _ = release.await;
        }
        if *self.fail_lists.lock().await {
            return Err(ClientError::Api {
                code: shared::error::ErrorCode::Internal,
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(self
            .pages
            .lock()
            .await
            .get(&query.page)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(&self, draft: &SeriesDraft) -> Result<Series, ClientError> {
        if *self.fail_mutations.lock().await {
            return Err(Self::mutation_error());
        }
        self.created.lock().await.push(draft.clone());
        Ok(draft.clone().into_series(SeriesId::generate(), Utc::now()))
    }

    async fn update(&self, series: &Series) -> Result<Series, ClientError> {
        if *self.fail_mutations.lock().await {
            return Err(Self::mutation_error());
        }
        self.updates.lock().await.push(series.clone());
        Ok(series.clone())
    }

    async fn remove(&self, id: &SeriesId) -> Result<(), ClientError> {
        if *self.fail_mutations.lock().await {
            return Err(Self::mutation_error());
        }
        self.removed.lock().await.push(id.clone());
        Ok(())
    }
}

pub fn series(id: &str, title: &str, status: shared::domain::WatchStatus) -> Series {
    Series {
        id: SeriesId::new(id),
        title: title.to_string(),
        genre: String::new(),
        status,
        link: String::new(),
        image_link: String::new(),
        rating: None,
        date_added: Utc::now(),
    }
}

pub fn page_of(items: Vec<Series>, total_pages: u32, total_elements: u64) -> SeriesPage {
    SeriesPage {
        items,
        total_pages,
        total_elements,
    }
}
