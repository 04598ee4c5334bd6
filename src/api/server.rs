//! HTTP server for the import API.
//!
//! Sessions live in memory; each command endpoint drives one session's
//! state machine, and the event stream mirrors the session bus over
//! SSE.
//!
//! # API Endpoints
//!
//! | Method | Path                            | Description                          |
//! |--------|---------------------------------|--------------------------------------|
//! | GET    | `/health`                       | Health check                         |
//! | POST   | `/api/sessions`                 | Upload file + schema, open a session |
//! | GET    | `/api/sessions/{id}`            | Session status snapshot              |
//! | DELETE | `/api/sessions/{id}`            | Cancel and drop a session            |
//! | POST   | `/api/sessions/{id}/headers`    | Override the header heuristic        |
//! | POST   | `/api/sessions/{id}/mapping`    | Replace and confirm the mapping      |
//! | POST   | `/api/sessions/{id}/cells`      | Edit one cell, re-validate its field |
//! | POST   | `/api/sessions/{id}/exclusions` | Toggle a row's exclusion             |
//! | POST   | `/api/sessions/{id}/submit`     | Gate on validation, emit the rows    |
//! | GET    | `/api/sessions/{id}/events`     | SSE stream of session events         |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::Value;
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::types::{
    error_response, CellEditRequest, CellEditResponse, ExclusionRequest, HeadersRequest,
    MappingRequest, MappingResponse, SessionCreated, SessionStatus, SubmitResponse,
    ValidationReport,
};
use crate::error::{ImportError, SessionError};
use crate::schema::Schema;
use crate::session::{ConfirmOutcome, ImportSession};

type ApiError = (StatusCode, Json<Value>);
type Sessions = Mutex<HashMap<Uuid, ImportSession>>;

/// Shared server state: the in-memory session store.
#[derive(Default)]
pub struct AppState {
    sessions: Sessions,
}

/// Start the HTTP server.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::default());

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(session_status).delete(cancel_session))
        .route("/api/sessions/{id}/headers", post(set_headers))
        .route("/api/sessions/{id}/mapping", post(confirm_mapping))
        .route("/api/sessions/{id}/cells", post(edit_cell))
        .route("/api/sessions/{id}/exclusions", post(set_exclusion))
        .route("/api/sessions/{id}/submit", post(submit))
        .route("/api/sessions/{id}/events", get(sse_events))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Sheetload server running on http://localhost:{}", port);
    println!("   POST /api/sessions               - Upload file + schema");
    println!("   POST /api/sessions/{{id}}/mapping  - Confirm column mapping");
    println!("   GET  /api/sessions/{{id}}/events   - SSE event stream");
    println!("   GET  /health                     - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sheetload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "sessions": "POST /api/sessions",
            "events": "GET /api/sessions/{id}/events (SSE)"
        }
    }))
}

/// Map pipeline errors onto HTTP responses.
fn import_error_response(e: ImportError) -> ApiError {
    let status = match &e {
        ImportError::Parse(_) => StatusCode::BAD_REQUEST,
        ImportError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ImportError::Session(SessionError::ValidationPending { .. }) => StatusCode::CONFLICT,
        ImportError::Session(SessionError::InvalidStep { .. }) => StatusCode::CONFLICT,
        ImportError::Session(SessionError::RowOutOfRange { .. }) => StatusCode::BAD_REQUEST,
    };
    (status, Json(error_response(&e.to_string())))
}

fn not_found(id: Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(error_response(&format!("Session not found: {}", id))),
    )
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(message)))
}

/// Upload endpoint: multipart with a `file` part (the spreadsheet) and
/// a `schema` part (the JSON schema document).
async fn create_session(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SessionCreated>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut schema_json: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| bad_request(&format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            "schema" => {
                schema_json = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| bad_request(&format!("Read error: {}", e)))?,
                );
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| bad_request("No file provided"))?;
    let schema_json = schema_json.ok_or_else(|| bad_request("No schema provided"))?;

    let schema = Schema::from_json(&schema_json)
        .map_err(|e| import_error_response(ImportError::Config(e)))?;

    println!(
        "📄 New session: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    );

    let mut session = ImportSession::new(schema);
    session
        .load_bytes(&bytes, file_name.as_deref())
        .map_err(import_error_response)?;
    let _ = session.auto_map().map_err(import_error_response)?;

    let id = Uuid::new_v4();
    let response = SessionCreated {
        session_id: id.to_string(),
        step: session.step(),
        columns: session.columns(),
        row_count: session.data_row_count(),
        column_count: session.columns().len(),
        has_headers: session.has_headers(),
        suggested_mapping: session.mapping().clone(),
    };

    state.sessions.lock().await.insert(id, session);
    Ok(Json(response))
}

/// Session status snapshot.
async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatus>, ApiError> {
    let sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or_else(|| not_found(id))?;

    Ok(Json(SessionStatus {
        session_id: id.to_string(),
        step: session.step(),
        columns: session.columns(),
        row_count: session.data_row_count(),
        has_headers: session.has_headers(),
        mapping: session.mapping().clone(),
        excluded_rows: session.excluded().iter().copied().collect(),
    }))
}

/// Cancel a session and drop it from the store.
async fn cancel_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let mut session = sessions.remove(&id).ok_or_else(|| not_found(id))?;
    session.cancel();

    Ok(Json(serde_json::json!({ "status": "cancelled" })))
}

/// Override the header heuristic; resets the mapping.
async fn set_headers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<HeadersRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;

    session
        .set_has_headers(request.has_headers)
        .map_err(import_error_response)?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "hasHeaders": session.has_headers(),
        "columns": session.columns(),
        "rowCount": session.data_row_count(),
    })))
}

/// Replace the mapping and run the completeness gate. On success the
/// session advances to review and the full validation report comes
/// back; on a miss, the unmapped field labels.
async fn confirm_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<MappingRequest>,
) -> Result<Json<MappingResponse>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;

    session
        .replace_mapping(&request.mappings)
        .map_err(import_error_response)?;

    match session.confirm_mapping().await.map_err(import_error_response)? {
        ConfirmOutcome::Confirmed { .. } => Ok(Json(MappingResponse {
            status: "confirmed".to_string(),
            missing_fields: vec![],
            validation: Some(ValidationReport::from_session(session)),
        })),
        ConfirmOutcome::MissingFields(missing) => Ok(Json(MappingResponse {
            status: "incomplete".to_string(),
            missing_fields: missing,
            validation: None,
        })),
    }
}

/// Edit one cell; only the affected field is re-validated.
async fn edit_cell(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<CellEditRequest>,
) -> Result<Json<CellEditResponse>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;

    let error = session
        .edit_cell(request.row_index, &request.key, request.value)
        .await
        .map_err(import_error_response)?;

    let row_valid = session
        .results()
        .iter()
        .find(|r| r.row_index == request.row_index)
        .map(|r| r.is_valid)
        .unwrap_or(false);

    Ok(Json(CellEditResponse {
        row_index: request.row_index,
        key: request.key,
        error,
        row_valid,
        can_submit: session.can_submit(),
    }))
}

/// Toggle a row's exclusion from the final submission.
async fn set_exclusion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ExclusionRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;

    session
        .set_row_excluded(request.row_index, request.excluded)
        .map_err(import_error_response)?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "excludedRows": session.excluded().iter().copied().collect::<Vec<_>>(),
        "canSubmit": session.can_submit(),
    })))
}

/// Gate on validation and emit the transformed rows.
async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;

    let rows = session.submit().map_err(import_error_response)?;

    println!("✅ Session {} submitted: {} rows", id, rows.len());

    Ok(Json(SubmitResponse {
        status: "imported".to_string(),
        row_count: rows.len(),
        rows,
    }))
}

/// SSE endpoint mirroring the session's event bus.
async fn sse_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let rx = {
        let sessions = state.sessions.lock().await;
        let session = sessions.get(&id).ok_or_else(|| not_found(id))?;
        session.subscribe()
    };

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let json = serde_json::to_string(&event).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Ok(Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ParseError};

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = import_error_response(ImportError::Parse(ParseError::EmptyFile));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            import_error_response(ImportError::Config(ConfigError::UnknownField("x".into())));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = import_error_response(ImportError::Session(
            SessionError::ValidationPending { invalid: 2 },
        ));
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
