//! HTTP routes for appending checkouts, reading the chain and registering books.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::chain::AppendOutcome;
use crate::crypto::record_id;
use crate::model::{Block, Book, HashedRecord};
use crate::AppState;

type ApiResult = Result<Response, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_chain).post(write_block))
        .route("/new", post(new_book))
        .route("/block/:position", get(get_block))
        .route("/validate", get(validate_chain))
        .route("/health", get(health))
        .route("/version", get(version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Indented JSON body, matching what the chain dump looks like on the console.
fn pretty<T: Serialize>(value: &T, failure: &str) -> ApiResult {
    let body = serde_json::to_string_pretty(value).map_err(|e| {
        warn!("could not marshal payload: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, failure.to_string())
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// GET /
pub async fn get_chain(State(state): State<AppState>) -> ApiResult {
    pretty(&state.chain.snapshot(), "could not read chain")
}

/// POST / — append a checkout event; echoes the decoded record on success.
pub async fn write_block(
    State(state): State<AppState>,
    payload: Result<Json<HashedRecord>, JsonRejection>,
) -> ApiResult {
    let Json(record) = payload.map_err(|e| {
        warn!("could not write block: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "could not write block".to_string(),
        )
    })?;

    let outcome = state.chain.append(record.clone());
    append_response(outcome, &record)
}

fn append_response(outcome: AppendOutcome, record: &HashedRecord) -> ApiResult {
    match outcome {
        AppendOutcome::Accepted(block) => {
            debug!(position = block.position, hash = %block.hash, "block appended");
            pretty(record, "could not write block")
        }
        AppendOutcome::Rejected { reason } => {
            warn!(%reason, "candidate block rejected");
            Err((
                StatusCode::CONFLICT,
                format!("rejected: chain invariant violation: {reason}"),
            ))
        }
    }
}

/// POST /new — assign an id to a book record and echo it.
pub async fn new_book(payload: Result<Json<Book>, JsonRejection>) -> ApiResult {
    let Json(mut book) = payload.map_err(|e| {
        warn!("could not create: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "could not create new book".to_string(),
        )
    })?;

    book.id = record_id(&book.isbn, &book.publish_date);
    pretty(&book, "could not save book data")
}

/// GET /block/:position
pub async fn get_block(
    State(state): State<AppState>,
    Path(position): Path<u64>,
) -> Result<Json<Block>, (StatusCode, String)> {
    state
        .chain
        .get(position)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "not found".into()))
}

/// GET /validate — recheck every link and hash; returns { ok, errors[] }
#[derive(Serialize)]
pub struct ValidateResp {
    pub ok: bool,
    pub errors: Vec<String>,
}
pub async fn validate_chain(State(state): State<AppState>) -> Json<ValidateResp> {
    let errors: Vec<String> = state
        .chain
        .audit()
        .iter()
        .map(ToString::to_string)
        .collect();
    Json(ValidateResp {
        ok: errors.is_empty(),
        errors,
    })
}

/// GET /health
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// GET /version
#[derive(Serialize)]
pub struct Version {
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
}
pub async fn version() -> Json<Version> {
    Json(Version {
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("GIT_SHA"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{HashChain, SharedChain};
    use crate::error::ChainError;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            chain: SharedChain::new(HashChain::initialize()),
        }
    }

    async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, String) {
        let resp = router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn append_echoes_record_and_grows_chain() {
        let state = state();
        let (status, body) = send(
            &state,
            post("/", r#"{"book_id":"b1","user":"alice","checkout_date":"2024-01-01"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let echoed: HashedRecord = serde_json::from_str(&body).unwrap();
        assert_eq!(echoed.user, "alice");
        assert!(!echoed.is_genesis);

        let (status, body) = send(&state, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        let chain: Value = serde_json::from_str(&body).unwrap();
        let blocks = chain.as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["payload"]["is_genesis"], true);
        assert_eq!(blocks[1]["position"], 2);
        assert_eq!(blocks[1]["payload"]["book_id"], "b1");
        assert_eq!(blocks[1]["prev_hash"], blocks[0]["hash"]);
    }

    #[tokio::test]
    async fn malformed_checkout_is_a_server_error() {
        let state = state();
        let (status, body) = send(&state, post("/", "{not json")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "could not write block");
        assert_eq!(state.chain.len(), 1);
    }

    #[test]
    fn rejected_append_maps_to_conflict() {
        let outcome = AppendOutcome::Rejected {
            reason: ChainError::PositionGap {
                previous: 2,
                actual: 4,
            },
        };
        let (status, msg) = append_response(outcome, &HashedRecord::default()).unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(msg.starts_with("rejected: chain invariant violation"));
    }

    #[tokio::test]
    async fn new_book_gets_md5_id() {
        let state = state();
        let (status, body) = send(
            &state,
            post(
                "/new",
                r#"{"title":"Clean Code","author":"R. Martin","publish_date":"2008-08-01","isbn":"978-0132350884"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let book: Book = serde_json::from_str(&body).unwrap();
        assert_eq!(book.id, record_id("978-0132350884", "2008-08-01"));
        assert_eq!(book.title, "Clean Code");
        // Books never touch the chain.
        assert_eq!(state.chain.len(), 1);
    }

    #[tokio::test]
    async fn malformed_book_is_a_server_error() {
        let (status, body) = send(&state(), post("/new", "[1,2")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "could not create new book");
    }

    #[tokio::test]
    async fn block_lookup_by_position() {
        let state = state();
        let (status, body) = send(&state, get("/block/1")).await;
        assert_eq!(status, StatusCode::OK);
        let genesis: Block = serde_json::from_str(&body).unwrap();
        assert!(genesis.payload.is_genesis);

        let (status, _) = send(&state, get("/block/0")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&state, get("/block/9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn validate_reports_ok_chain() {
        let state = state();
        send(&state, post("/", r#"{"book_id":"b1","user":"alice"}"#)).await;
        let (status, body) = send(&state, get("/validate")).await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["ok"], true);
        assert_eq!(v["errors"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(&state(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }
}
