use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::RecordService;
use crate::config::Config;
use crate::docs::{self, BodySchema, EndpointDoc};
use crate::error::{Error, Result};
use crate::log::RequestLogger;
use crate::storage::RecordStore;
use crate::structs::{Collection, LogEntry, Operation, Record, RecordId};

// 错误响应体；成功时直接返回集合数组
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    success: bool,
    error: String,
}

impl ErrorResponse {
    fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            success: false,
            error: message.into(),
        }
    }
}

/// 所有存储错误都折叠成同一个 500；只有无法解析的 JSON 请求体是 400
#[derive(Debug)]
pub enum ApiError {
    Storage { operation: Operation, source: Error },
    BadBody(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Storage { operation, source } => {
                tracing::error!(%operation, error = %source, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("internal server error")),
                )
                    .into_response()
            }
            ApiError::BadBody(message) => {
                tracing::debug!(error = %message, "rejected request body");
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
            }
        }
    }
}

/// 路由共享状态
#[derive(Debug, Clone)]
pub struct AppState {
    service: RecordService,
    logger: RequestLogger,
}

impl AppState {
    pub fn new(service: RecordService, logger: RequestLogger) -> Self {
        AppState { service, logger }
    }

    /// 先生成响应，再投递日志
    fn respond(
        &self,
        operation: Operation,
        result: std::result::Result<Collection, ApiError>,
        success: StatusCode,
    ) -> Response {
        let response = match result {
            // 204 不带响应体
            Ok(_) if success == StatusCode::NO_CONTENT => success.into_response(),
            Ok(collection) => (success, Json(collection)).into_response(),
            Err(e) => e.into_response(),
        };
        self.logger
            .record(LogEntry::new(operation, response.status().as_u16()));
        response
    }
}

/// Endpoint descriptions published at `/api-docs`.
pub const ENDPOINTS: &[EndpointDoc] = &[
    EndpointDoc {
        method: "get",
        path: "/",
        operation_id: "listRecords",
        summary: "List every record",
        request_body: None,
        success_status: 200,
        returns_collection: true,
    },
    EndpointDoc {
        method: "post",
        path: "/",
        operation_id: "createRecord",
        summary: "Append a record and return the whole collection",
        request_body: Some(BodySchema::Record),
        success_status: 201,
        returns_collection: true,
    },
    EndpointDoc {
        method: "put",
        path: "/{id}",
        operation_id: "updateRecord",
        summary: "Shallow-merge fields into the record with this id",
        request_body: Some(BodySchema::RecordPatch),
        success_status: 200,
        returns_collection: true,
    },
    EndpointDoc {
        method: "delete",
        path: "/{id}",
        operation_id: "deleteRecord",
        summary: "Remove the record with this id",
        request_body: None,
        success_status: 204,
        returns_collection: false,
    },
];

#[derive(Debug)]
struct PublishedDocs {
    document: Value,
    page: String,
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let mut app = Router::new()
        .route("/", get(list_handler).post(create_handler))
        .route("/:id", put(update_handler).delete(delete_handler));

    if config.docs.enabled {
        let published = Arc::new(PublishedDocs {
            document: docs::build_openapi_document(&config.docs.title, crate::VERSION, ENDPOINTS),
            page: docs::render_docs_page(&config.docs.title, docs::OPENAPI_PATH),
        });
        // `/api-docs` 遮住了 `/:id`，PUT/DELETE 仍交给记录处理器（id 不匹配任何记录）
        app = app
            .route(
                docs::DOCS_PATH,
                get(docs_page_handler)
                    .with_state(published.clone())
                    .put(update_handler)
                    .delete(delete_handler),
            )
            .route(docs::OPENAPI_PATH, get(openapi_handler).with_state(published));
    }

    app.with_state(state).layer(TraceLayer::new_for_http())
}

pub async fn start_server(config: Config) -> Result<()> {
    let store = RecordStore::new(&config.storage.data_path);
    if config.storage.create_if_missing {
        store.init_if_missing()?;
    }

    let (logger, log_writer) = RequestLogger::spawn(config.log_sink());
    let state = AppState::new(RecordService::new(store), logger);
    let app = build_router(state, &config);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })?;
    tracing::info!(%addr, data = %config.storage.data_path.display(), "Server running");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // 路由已释放，等待剩余日志写完
    log_writer.finish().await;
    tracing::info!("Server stopped");
    served.map_err(Error::Server)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}

// GET /
async fn list_handler(State(state): State<AppState>) -> Response {
    let result = state.service.list().map_err(|source| ApiError::Storage {
        operation: Operation::Read,
        source,
    });
    state.respond(Operation::Read, result, StatusCode::OK)
}

// POST /
async fn create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let result = match read_record(&headers, body) {
        Ok(record) => state.service.create(record).await.map_err(|source| {
            ApiError::Storage {
                operation: Operation::Create,
                source,
            }
        }),
        Err(e) => Err(e),
    };
    state.respond(Operation::Create, result, StatusCode::CREATED)
}

// PUT /:id
async fn update_handler(
    State(state): State<AppState>,
    id: std::result::Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let id = record_id(id);
    let result = match read_record(&headers, body) {
        Ok(patch) => state.service.update(id, patch).await.map_err(|source| {
            ApiError::Storage {
                operation: Operation::Update,
                source,
            }
        }),
        Err(e) => Err(e),
    };
    state.respond(Operation::Update, result, StatusCode::OK)
}

// DELETE /:id
async fn delete_handler(
    State(state): State<AppState>,
    id: std::result::Result<Path<String>, PathRejection>,
) -> Response {
    let id = record_id(id);
    let result = state
        .service
        .delete(id)
        .await
        .map_err(|source| ApiError::Storage {
            operation: Operation::Delete,
            source,
        });
    state.respond(Operation::Delete, result, StatusCode::NO_CONTENT)
}

// 无法解码的路径段不是错误，只是不匹配任何记录
fn record_id(segment: std::result::Result<Path<String>, PathRejection>) -> RecordId {
    match segment {
        Ok(Path(id)) => RecordId::parse(&id),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "undecodable id segment");
            RecordId::unmatched()
        }
    }
}

/// 请求体不做字段校验：缺少 JSON content-type 或请求体为空时当作 `{}`，
/// 只有声明为 JSON 却解析不了（或不是对象）时才是 400
fn read_record(
    headers: &HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Record, ApiError> {
    let body = body.map_err(|rejection| ApiError::BadBody(rejection.body_text()))?;
    if !is_json_content_type(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Record::new());
    }
    match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(ApiError::BadBody(
            "request body is not a JSON object".to_string(),
        )),
        Err(e) => Err(ApiError::BadBody(format!("invalid JSON body: {}", e))),
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

async fn docs_page_handler(State(published): State<Arc<PublishedDocs>>) -> Html<String> {
    Html(published.page.clone())
}

async fn openapi_handler(State(published): State<Arc<PublishedDocs>>) -> Json<Value> {
    Json(published.document.clone())
}
