//! The HTTP surface of the expense pipeline.
//!
//! Every route is served with and without a trailing slash. Failures are returned as
//! `{"detail": "<message>"}` with a status derived from the `ErrorType`, or always 500 when the
//! config asks for uniform error statuses.

use crate::commands;
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{ExpenseTable, RemoteFile};
use crate::pipeline::Pipeline;
use crate::Result;
use anyhow::Context;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const WELCOME: &str = "Welcome to the expense sync API using Google Drive";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    uniform_error_status: bool,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        let uniform_error_status = pipeline.config().uniform_error_status();
        Self {
            pipeline: Arc::new(pipeline),
            uniform_error_status,
        }
    }

    fn fail(&self, error: Error) -> ApiError {
        ApiError {
            error,
            uniform: self.uniform_error_status,
        }
    }

    /// Unwraps query parameters, reporting a malformed query string as a validation failure.
    fn query<T>(
        &self,
        query: std::result::Result<Query<T>, QueryRejection>,
    ) -> std::result::Result<T, ApiError> {
        query.map(|Query(params)| params).map_err(|rejection| {
            self.fail(Error::msg(ErrorType::Validation, rejection.body_text()))
        })
    }
}

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/generate_expense", get(generate_expense))
        .route("/generate_expense/", get(generate_expense))
        .route("/report", get(report))
        .route("/report/", get(report))
        .route("/current_expense", get(current_expense))
        .route("/current_expense/", get(current_expense))
        .route("/list_files", get(list_files))
        .route("/list_files/", get(list_files))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds to `bind` and serves until the process is stopped.
pub async fn serve(pipeline: Pipeline, bind: &str) -> Result<()> {
    let state = AppState::new(pipeline);
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Unable to bind to {bind}"))
        .pub_result(ErrorType::Service)?;
    info!("Listening on http://{bind}");
    axum::serve(listener, create_router(state))
        .await
        .context("The HTTP server stopped unexpectedly")
        .pub_result(ErrorType::Service)
}

/// A failure returned to an HTTP caller.
pub struct ApiError {
    error: Error,
    uniform: bool,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        if self.uniform {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self.error.error_type() {
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Validation => StatusCode::BAD_REQUEST,
            ErrorType::Parse => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorType::Store => StatusCode::BAD_GATEWAY,
            ErrorType::Config | ErrorType::Service => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!(error_type = %self.error.error_type(), "{}", self.error);
        (status, Json(json!({ "detail": self.error.to_string() }))).into_response()
    }
}

/// Query parameters for routes that operate on a month.
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    /// `YYYY-MM-DD`, defaults to today.
    pub date: Option<String>,
}

/// Query parameters for the report.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub date: Option<String>,
    pub person: Option<String>,
    pub category: Option<String>,
    pub payment_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub message: String,
    pub data: ExpenseTable,
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: WELCOME.to_string(),
    })
}

async fn generate_expense(
    State(state): State<AppState>,
    query: std::result::Result<Query<DateQuery>, QueryRejection>,
) -> std::result::Result<Json<MessageResponse>, ApiError> {
    let query = state.query(query)?;
    let out = commands::generate(&state.pipeline, query.date.as_deref())
        .await
        .map_err(|e| state.fail(e))?;
    Ok(Json(MessageResponse {
        message: out.message().to_string(),
    }))
}

async fn report(
    State(state): State<AppState>,
    query: std::result::Result<Query<ReportQuery>, QueryRejection>,
) -> std::result::Result<Json<ReportResponse>, ApiError> {
    let query = state.query(query)?;
    let out = commands::report(
        &state.pipeline,
        query.date.as_deref(),
        query.person.as_deref(),
        query.category.as_deref(),
        query.payment_type.as_deref(),
    )
    .await
    .map_err(|e| state.fail(e))?;
    let (message, data) = out.into_parts();
    Ok(Json(ReportResponse {
        message,
        data: data.unwrap_or_default(),
    }))
}

async fn current_expense(
    State(state): State<AppState>,
    query: std::result::Result<Query<DateQuery>, QueryRejection>,
) -> std::result::Result<Json<ExpenseTable>, ApiError> {
    let query = state.query(query)?;
    let out = commands::current(&state.pipeline, query.date.as_deref())
        .await
        .map_err(|e| state.fail(e))?;
    Ok(Json(out.into_parts().1.unwrap_or_default()))
}

async fn list_files(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<RemoteFile>>, ApiError> {
    let out = commands::list(&state.pipeline)
        .await
        .map_err(|e| state.fail(e))?;
    Ok(Json(out.into_parts().1.unwrap_or_default()))
}
