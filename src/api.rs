//! REST API for the interactive loading session.
//!
//! Hosts one `LoadSession` for a rendering front end. Every request locks the
//! session, so mutations are applied strictly one after another. Change
//! notices are pushed to `/events` subscribers as Server-Sent Events; a
//! background task flushes debounced drag notices once they fall due.

use std::convert::Infallible;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::config::ApiConfig;
use crate::drag::{DragSummary, DragTick};
use crate::error::EngineError;
use crate::model::{Container, Membership, PackageId, PackageRecord, ValidationError};
use crate::notify::{ChangeKind, ChangeNotice};
use crate::rotation::{RotationOutcome, RotationRejection};
use crate::session::{
    EngineConfig, FrameState, IngestReport, LoadSession, PackageView, RestoreAllReport,
    RestoreOutcome, VisualState,
};
use crate::types::Vec3;
use crate::weight::WeightSplit;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
struct ApiState {
    session: Arc<Mutex<Option<LoadSession>>>,
    engine: EngineConfig,
    events: broadcast::Sender<ChangeNotice>,
}

impl ApiState {
    fn new(engine: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: Arc::new(Mutex::new(None)),
            engine,
            events,
        }
    }

    /// Sends every notice that is due to the event subscribers.
    fn publish(&self, session: &mut LoadSession) {
        for notice in session.drain_notices(Instant::now()) {
            if self.events.send(notice).is_err() {
                debug!("no event subscribers connected");
            }
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>load_planner API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request body for opening a session.
///
/// `records` are `[x, y, z, length, width, height, id, weight]` tuples;
/// `x = y = z = -1` marks a package that starts out removed.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": [13200.0, 2200.0, 2900.0],
        "records": [
            [0.0, 0.0, 0.0, 1200.0, 800.0, 1000.0, 1, 300.0],
            [-1.0, -1.0, -1.0, 1200.0, 800.0, 1000.0, 2, 250.0]
        ]
    })
)]
pub struct CreateSessionRequest {
    pub container: [f64; 3],
    #[schema(value_type = Vec<Vec<f64>>)]
    pub records: Vec<Value>,
}

#[derive(Deserialize, ToSchema)]
pub struct ContainerRequest {
    #[schema(example = json!([13200.0, 2200.0, 2900.0]))]
    pub dims: [f64; 3],
}

#[derive(Serialize, ToSchema)]
pub struct ContainerResponse {
    pub container: Container,
    /// Packages that no longer fit or overlap after the change.
    #[schema(value_type = Vec<usize>)]
    pub violations: Vec<PackageId>,
}

#[derive(Serialize, ToSchema)]
pub struct ExportResponse {
    #[schema(value_type = Vec<Vec<f64>>)]
    pub records: Vec<PackageRecord>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeightQuery {
    /// Longitudinal cutoff measured from the container front.
    pub cutoff: f64,
}

#[derive(Serialize, ToSchema)]
pub struct RotateResponse {
    pub rotated: bool,
    pub rotation_degrees: Option<u16>,
    pub rejection: Option<RotationRejection>,
}

impl From<RotationOutcome> for RotateResponse {
    fn from(outcome: RotationOutcome) -> Self {
        match outcome {
            RotationOutcome::Rotated { rotation_degrees } => Self {
                rotated: true,
                rotation_degrees: Some(rotation_degrees),
                rejection: None,
            },
            RotationOutcome::Rejected(rejection) => Self {
                rotated: false,
                rotation_degrees: None,
                rejection: Some(rejection),
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RemoveAllResponse {
    #[schema(value_type = Vec<usize>)]
    pub removed: Vec<PackageId>,
}

#[derive(Deserialize, ToSchema)]
pub struct DragStartRequest {
    #[schema(value_type = usize)]
    pub id: PackageId,
    /// Pointer hit on the drag plane.
    pub point: Vec3,
}

#[derive(Deserialize, ToSchema)]
pub struct DragPointRequest {
    pub point: Vec3,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

/// Everything a handler can fail with.
#[derive(Debug)]
enum ApiError {
    NoSession,
    Json(JsonRejection),
    InvalidInput(String),
    Container(ValidationError),
    Engine(EngineError),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::Json(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NoSession => error_response(
                StatusCode::CONFLICT,
                "No session",
                "POST /session must be called first",
            ),
            ApiError::Json(err) => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid JSON data",
                err.to_string(),
            ),
            ApiError::InvalidInput(details) => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid input data",
                details,
            ),
            ApiError::Container(err) => error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid container configuration",
                err.to_string(),
            ),
            ApiError::Engine(err) => {
                let status = match err {
                    EngineError::UnknownPackage(_) => StatusCode::NOT_FOUND,
                    EngineError::InvalidContainer(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    EngineError::NotActive(_)
                    | EngineError::NotRemoved(_)
                    | EngineError::NoActiveDrag
                    | EngineError::DragInProgress(_) => StatusCode::CONFLICT,
                };
                error_response(status, err.code(), err.to_string())
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Runs `op` against the open session and publishes the notices it produced.
async fn with_session<T>(
    state: &ApiState,
    op: impl FnOnce(&mut LoadSession) -> Result<T, EngineError>,
) -> Result<T, ApiError> {
    let mut guard = state.session.lock().await;
    let session = guard.as_mut().ok_or(ApiError::NoSession)?;
    let result = op(session);
    state.publish(session);
    Ok(result?)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_create_session,
        handle_frame,
        handle_export,
        handle_set_container,
        handle_weight,
        handle_rotate,
        handle_delete,
        handle_restore,
        handle_select,
        handle_clear_selection,
        handle_remove_all,
        handle_restore_all,
        handle_drag_start,
        handle_drag_update,
        handle_drag_end,
        handle_drag_cancel,
        handle_events
    ),
    components(
        schemas(
            CreateSessionRequest,
            ContainerRequest,
            ContainerResponse,
            ExportResponse,
            RotateResponse,
            RemoveAllResponse,
            DragStartRequest,
            DragPointRequest,
            ErrorResponse,
            Container,
            Membership,
            Vec3,
            IngestReport,
            FrameState,
            PackageView,
            VisualState,
            RestoreOutcome,
            RestoreAllReport,
            RotationRejection,
            DragTick,
            DragSummary,
            WeightSplit,
            ChangeNotice,
            ChangeKind
        )
    ),
    tags(
        (name = "session", description = "Session lifecycle and views"),
        (name = "packages", description = "Structural package actions"),
        (name = "drag", description = "Pointer-driven repositioning")
    )
)]
struct ApiDoc;

fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/session", post(handle_create_session))
        .route("/session/frame", get(handle_frame))
        .route("/session/export", get(handle_export))
        .route("/session/container", put(handle_set_container))
        .route("/session/weight", get(handle_weight))
        .route("/packages/remove_all", post(handle_remove_all))
        .route("/packages/restore_all", post(handle_restore_all))
        .route("/packages/{id}", delete(handle_delete))
        .route("/packages/{id}/rotate", post(handle_rotate))
        .route("/packages/{id}/restore", post(handle_restore))
        .route("/packages/{id}/select", post(handle_select))
        .route("/selection", delete(handle_clear_selection))
        .route("/drag/start", post(handle_drag_start))
        .route("/drag/update", post(handle_drag_update))
        .route("/drag/end", post(handle_drag_end))
        .route("/drag/cancel", post(handle_drag_cancel))
        .route("/events", get(handle_events))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Periodically flushes debounced notices to the event subscribers.
fn spawn_notice_flusher(state: ApiState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
        loop {
            ticker.tick().await;
            let mut guard = state.session.lock().await;
            if let Some(session) = guard.as_mut() {
                if session
                    .next_notice_due()
                    .is_some_and(|due| due <= Instant::now())
                {
                    state.publish(session);
                }
            }
        }
    })
}

/// Starts the API server and blocks until it terminates.
///
/// Configures CORS for cross-origin requests from the rendering front end.
pub async fn start_api_server(config: ApiConfig, engine: EngineConfig) -> std::io::Result<()> {
    let state = ApiState::new(engine);
    let _flusher = spawn_notice_flusher(state.clone(), engine.drag.tick_interval);
    let app = build_router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");
    info!("📡 Change events: GET /events");

    axum::serve(listener, app).await.inspect_err(|err| {
        error!("❌ API server terminated with an error: {err}");
    })
}

/// Opens a new session, replacing any previous one.
#[utoipa::path(
    post,
    path = "/session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session opened", body = IngestReport),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid JSON or container", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_create_session(
    State(state): State<ApiState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ApiResult<IngestReport> {
    let Json(request) = payload?;
    let container = Container::from_array(request.container).map_err(ApiError::Container)?;

    let mut session = LoadSession::new(container, state.engine);
    let report = session.ingest(&request.records);
    state.publish(&mut session);

    *state.session.lock().await = Some(session);
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/session/frame",
    responses(
        (status = 200, description = "Render state", body = FrameState),
        (status = CONFLICT, description = "No session", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_frame(State(state): State<ApiState>) -> ApiResult<FrameState> {
    let frame = with_session(&state, |session| Ok(session.frame(Instant::now()))).await?;
    Ok(Json(frame))
}

#[utoipa::path(
    get,
    path = "/session/export",
    responses(
        (status = 200, description = "Current layout as placement records", body = ExportResponse),
        (status = CONFLICT, description = "No session", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_export(State(state): State<ApiState>) -> ApiResult<ExportResponse> {
    let records = with_session(&state, |session| Ok(session.export())).await?;
    Ok(Json(ExportResponse { records }))
}

#[utoipa::path(
    put,
    path = "/session/container",
    request_body = ContainerRequest,
    responses(
        (status = 200, description = "Container replaced", body = ContainerResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid dimensions", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_set_container(
    State(state): State<ApiState>,
    payload: Result<Json<ContainerRequest>, JsonRejection>,
) -> ApiResult<ContainerResponse> {
    let Json(request) = payload?;
    let response = with_session(&state, |session| {
        let violations = session.set_container(request.dims)?;
        Ok(ContainerResponse {
            container: *session.container(),
            violations,
        })
    })
    .await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/session/weight",
    params(WeightQuery),
    responses(
        (status = 200, description = "Weight in front of and behind the cutoff", body = WeightSplit),
        (status = UNPROCESSABLE_ENTITY, description = "Cutoff is not a finite number", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_weight(
    State(state): State<ApiState>,
    Query(query): Query<WeightQuery>,
) -> ApiResult<WeightSplit> {
    if !query.cutoff.is_finite() {
        return Err(ApiError::InvalidInput(format!(
            "cutoff must be a finite number, got: {}",
            query.cutoff
        )));
    }
    let split = with_session(&state, |session| Ok(session.weight_split(query.cutoff))).await?;
    Ok(Json(split))
}

#[utoipa::path(
    post,
    path = "/packages/{id}/rotate",
    params(("id" = usize, Path, description = "Package id")),
    responses(
        (status = 200, description = "Rotation applied or rejected", body = RotateResponse),
        (status = NOT_FOUND, description = "Unknown package", body = ErrorResponse),
        (status = CONFLICT, description = "Package is not active", body = ErrorResponse)
    ),
    tag = "packages"
)]
async fn handle_rotate(
    State(state): State<ApiState>,
    Path(id): Path<PackageId>,
) -> ApiResult<RotateResponse> {
    let outcome = with_session(&state, |session| session.rotate(id, Instant::now())).await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    delete,
    path = "/packages/{id}",
    params(("id" = usize, Path, description = "Package id")),
    responses(
        (status = NO_CONTENT, description = "Package moved to the removed set"),
        (status = NOT_FOUND, description = "Unknown package", body = ErrorResponse),
        (status = CONFLICT, description = "Package is not active", body = ErrorResponse)
    ),
    tag = "packages"
)]
async fn handle_delete(
    State(state): State<ApiState>,
    Path(id): Path<PackageId>,
) -> Result<StatusCode, ApiError> {
    with_session(&state, |session| session.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/packages/{id}/restore",
    params(("id" = usize, Path, description = "Package id")),
    responses(
        (status = 200, description = "Restored or no space", body = RestoreOutcome),
        (status = NOT_FOUND, description = "Unknown package", body = ErrorResponse),
        (status = CONFLICT, description = "Package is not removed", body = ErrorResponse)
    ),
    tag = "packages"
)]
async fn handle_restore(
    State(state): State<ApiState>,
    Path(id): Path<PackageId>,
) -> ApiResult<RestoreOutcome> {
    let outcome = with_session(&state, |session| session.restore(id)).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/packages/{id}/select",
    params(("id" = usize, Path, description = "Package id")),
    responses(
        (status = NO_CONTENT, description = "Package selected"),
        (status = NOT_FOUND, description = "Unknown package", body = ErrorResponse)
    ),
    tag = "packages"
)]
async fn handle_select(
    State(state): State<ApiState>,
    Path(id): Path<PackageId>,
) -> Result<StatusCode, ApiError> {
    with_session(&state, |session| session.select(Some(id))).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/selection",
    responses((status = NO_CONTENT, description = "Selection cleared")),
    tag = "packages"
)]
async fn handle_clear_selection(State(state): State<ApiState>) -> Result<StatusCode, ApiError> {
    with_session(&state, |session| session.select(None)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/packages/remove_all",
    responses((status = 200, description = "Ids moved to the removed set", body = RemoveAllResponse)),
    tag = "packages"
)]
async fn handle_remove_all(State(state): State<ApiState>) -> ApiResult<RemoveAllResponse> {
    let removed = with_session(&state, |session| Ok(session.remove_all())).await?;
    Ok(Json(RemoveAllResponse { removed }))
}

#[utoipa::path(
    post,
    path = "/packages/restore_all",
    responses((status = 200, description = "Restore results per package", body = RestoreAllReport)),
    tag = "packages"
)]
async fn handle_restore_all(State(state): State<ApiState>) -> ApiResult<RestoreAllReport> {
    let report = with_session(&state, |session| Ok(session.restore_all())).await?;
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/drag/start",
    request_body = DragStartRequest,
    responses(
        (status = NO_CONTENT, description = "Drag started"),
        (status = NOT_FOUND, description = "Unknown package", body = ErrorResponse),
        (status = CONFLICT, description = "Package not active or drag already running", body = ErrorResponse)
    ),
    tag = "drag"
)]
async fn handle_drag_start(
    State(state): State<ApiState>,
    payload: Result<Json<DragStartRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    with_session(&state, |session| session.start_drag(request.id, request.point)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/drag/update",
    request_body = DragPointRequest,
    responses(
        (status = 200, description = "Outcome of this pointer update", body = DragTick),
        (status = CONFLICT, description = "No drag in progress", body = ErrorResponse)
    ),
    tag = "drag"
)]
async fn handle_drag_update(
    State(state): State<ApiState>,
    payload: Result<Json<DragPointRequest>, JsonRejection>,
) -> ApiResult<DragTick> {
    let Json(request) = payload?;
    let tick =
        with_session(&state, |session| session.update_drag(request.point, Instant::now())).await?;
    Ok(Json(tick))
}

#[utoipa::path(
    post,
    path = "/drag/end",
    responses(
        (status = 200, description = "Drag finished", body = DragSummary),
        (status = CONFLICT, description = "No drag in progress", body = ErrorResponse)
    ),
    tag = "drag"
)]
async fn handle_drag_end(State(state): State<ApiState>) -> ApiResult<DragSummary> {
    let summary = with_session(&state, |session| session.end_drag(Instant::now())).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/drag/cancel",
    responses(
        (status = 200, description = "Drag aborted, package back at its start", body = DragSummary),
        (status = CONFLICT, description = "No drag in progress", body = ErrorResponse)
    ),
    tag = "drag"
)]
async fn handle_drag_cancel(State(state): State<ApiState>) -> ApiResult<DragSummary> {
    let summary = with_session(&state, |session| session.cancel_drag()).await?;
    Ok(Json(summary))
}

/// Streams change notices as Server-Sent Events (text/event-stream).
///
/// Subscribers that fall behind skip the notices they missed.
#[utoipa::path(
    get,
    path = "/events",
    responses(
        (
            status = 200,
            description = "Change notices in real-time",
            content_type = "text/event-stream",
            body = ChangeNotice
        )
    ),
    tag = "session"
)]
async fn handle_events(State(state): State<ApiState>) -> impl IntoResponse {
    let stream = BroadcastStream::new(state.events.subscribe())
        .filter_map(|notice| notice.ok())
        .filter_map(|notice| serde_json::to_string(&notice).ok())
        .map(|msg| Ok::<_, Infallible>(Event::default().event("change").data(msg)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keep-alive"),
    )
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateSessionRequest {
        serde_json::from_value(json!({
            "container": [13200.0, 2200.0, 2900.0],
            "records": [
                [0, 0, 0, 1200, 800, 1000, 1, 300],
                [0, 900, 0, 1200, 800, 1000, 2, 300],
                [-1, -1, -1, 1200, 800, 1000, 3, 250]
            ]
        }))
        .expect("Should parse valid JSON")
    }

    async fn open_session() -> ApiState {
        let state = ApiState::new(EngineConfig::default());
        let Json(report) = handle_create_session(State(state.clone()), Ok(Json(create_request())))
            .await
            .expect("Session should open");
        assert_eq!(report.active, 2);
        assert_eq!(report.removed, 1);
        state
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in [
            "/session",
            "/session/frame",
            "/session/export",
            "/session/container",
            "/session/weight",
            "/packages/{id}",
            "/packages/{id}/rotate",
            "/packages/{id}/restore",
            "/packages/remove_all",
            "/drag/start",
            "/drag/update",
            "/events",
        ] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        for name in ["CreateSessionRequest", "FrameState", "DragTick", "ErrorResponse"] {
            assert!(
                components.schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn create_request_keeps_malformed_records_for_ingest() {
        let request: CreateSessionRequest = serde_json::from_value(json!({
            "container": [100.0, 100.0, 100.0],
            "records": [[0, 0, 0, 10, 10, 10, 1, 1], "garbage", [1, 2]]
        }))
        .expect("Should parse valid JSON");
        assert_eq!(request.records.len(), 3);
    }

    #[test]
    fn engine_errors_map_to_status_codes() {
        let status = |err: EngineError| ApiError::Engine(err).into_response().status();
        assert_eq!(status(EngineError::UnknownPackage(4)), StatusCode::NOT_FOUND);
        assert_eq!(status(EngineError::NotActive(4)), StatusCode::CONFLICT);
        assert_eq!(status(EngineError::NoActiveDrag), StatusCode::CONFLICT);
        assert_eq!(
            status(EngineError::InvalidContainer(ValidationError::InvalidDimension(
                "length".to_string()
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::NoSession.into_response().status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn operations_without_session_conflict() {
        let state = ApiState::new(EngineConfig::default());
        let result = handle_frame(State(state)).await;
        assert!(matches!(result, Err(ApiError::NoSession)));
    }

    #[tokio::test]
    async fn invalid_container_is_rejected() {
        let state = ApiState::new(EngineConfig::default());
        let request = CreateSessionRequest {
            container: [0.0, 2200.0, 2900.0],
            records: Vec::new(),
        };
        let result = handle_create_session(State(state.clone()), Ok(Json(request))).await;
        assert!(matches!(result, Err(ApiError::Container(_))));
        assert!(state.session.lock().await.is_none());
    }

    #[tokio::test]
    async fn rejected_rotation_is_reported_not_failed() {
        let state = open_session().await;
        let Json(response) = handle_rotate(State(state.clone()), Path(1))
            .await
            .expect("Rotation request should succeed");
        assert!(!response.rotated);
        assert_eq!(
            response.rejection,
            Some(RotationRejection::Collision { with: 2 })
        );

        let Json(frame) = handle_frame(State(state)).await.expect("Frame should render");
        assert!(frame.collision_warning);
    }

    #[tokio::test]
    async fn structural_actions_are_broadcast() {
        let state = open_session().await;
        let mut events = state.events.subscribe();

        handle_delete(State(state.clone()), Path(1))
            .await
            .expect("Delete should succeed");
        let notice = events.recv().await.expect("Notice should be broadcast");
        assert_eq!(notice.kind, ChangeKind::Deleted);
        assert_eq!(notice.package_ids, vec![1]);

        let Json(outcome) = handle_restore(State(state.clone()), Path(3))
            .await
            .expect("Restore should succeed");
        assert!(matches!(outcome, RestoreOutcome::Restored { .. }));
        let notice = events.recv().await.expect("Notice should be broadcast");
        assert_eq!(notice.kind, ChangeKind::Restored);
    }

    #[tokio::test]
    async fn weight_split_rejects_non_finite_cutoff() {
        let state = open_session().await;
        for cutoff in [f64::NAN, f64::INFINITY] {
            let result = handle_weight(State(state.clone()), Query(WeightQuery { cutoff })).await;
            let response = result.err().expect("Should fail").into_response();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }

        let Json(split) = handle_weight(State(state), Query(WeightQuery { cutoff: 600.0 }))
            .await
            .expect("Finite cutoff should succeed");
        assert_eq!(split.front, 300.0);
        assert_eq!(split.total, 600.0);
    }

    #[tokio::test]
    async fn unknown_package_is_not_found() {
        let state = open_session().await;
        let result = handle_restore(State(state), Path(42)).await;
        let response = result.err().expect("Should fail").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn drag_round_trip_over_handlers() {
        let state = open_session().await;
        let start = DragStartRequest {
            id: 1,
            point: Vec3::zero(),
        };
        handle_drag_start(State(state.clone()), Ok(Json(start)))
            .await
            .expect("Drag should start");

        let update = DragPointRequest {
            point: Vec3::new(5000.0, 0.0, 0.0),
        };
        let Json(tick) = handle_drag_update(State(state.clone()), Ok(Json(update)))
            .await
            .expect("Update should be processed");
        assert!(matches!(tick, DragTick::Committed { .. }));

        let Json(summary) = handle_drag_cancel(State(state.clone()))
            .await
            .expect("Cancel should succeed");
        assert_eq!(summary.position, Vec3::zero());

        let result = handle_drag_end(State(state)).await;
        assert!(matches!(
            result,
            Err(ApiError::Engine(EngineError::NoActiveDrag))
        ));
    }
}
