use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderValue, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, patch, post},
};
use serde::Serialize;
use uuid::Uuid;

use mb_service::{
	CreateSuggestionRequest, Error as ServiceError, ExpiryReport, HistoryQuery, HistoryResponse,
	MarkReadResponse, MessageView, MessagesResponse, RemindRequest, ReminderOutcome,
	ResendRequest, RespondRequest, SendMessageRequest, ShareContactRequest, SuggestionView,
	TransitionOutcome, TransitionRequest,
};

use crate::{auth::Authenticated, state::AppState};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/suggestions", post(create_suggestion))
		.route("/v1/suggestions/{id}", get(get_suggestion))
		.route("/v1/suggestions/{id}/status", patch(transition_status))
		.route("/v1/suggestions/{id}/respond", post(respond))
		.route("/v1/suggestions/{id}/history", get(history))
		.route("/v1/suggestions/{id}/messages", get(list_messages).post(send_message))
		.route("/v1/suggestions/{id}/messages/read", patch(mark_read))
		.route("/v1/suggestions/{id}/remind", post(remind))
		.route("/v1/suggestions/{id}/resend", post(resend))
		.route("/v1/suggestions/{id}/share-contact", post(share_contact))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/expire-overdue", post(expire_overdue)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_suggestion(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Json(payload): Json<CreateSuggestionRequest>,
) -> Result<(StatusCode, Json<SuggestionView>), ApiError> {
	let response = state.service.create_suggestion(&actor, payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn get_suggestion(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
) -> Result<Json<SuggestionView>, ApiError> {
	let response = state.service.get_suggestion(&actor, suggestion_id).await?;

	Ok(Json(response))
}

async fn transition_status(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
	Json(payload): Json<TransitionRequest>,
) -> Result<Json<TransitionOutcome>, ApiError> {
	let response = state.service.transition_status(&actor, suggestion_id, payload).await?;

	Ok(Json(response))
}

async fn respond(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
	Json(payload): Json<RespondRequest>,
) -> Result<Json<TransitionOutcome>, ApiError> {
	let response = state.service.respond(&actor, suggestion_id, payload).await?;

	Ok(Json(response))
}

async fn history(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
	Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
	let response = state.service.history(&actor, suggestion_id, query).await?;

	Ok(Json(response))
}

async fn list_messages(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, ApiError> {
	let response = state.service.list_messages(&actor, suggestion_id).await?;

	Ok(Json(response))
}

async fn send_message(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
	Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
	let response = state.service.send_message(&actor, suggestion_id, payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn mark_read(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>, ApiError> {
	let response = state.service.mark_read(&actor, suggestion_id).await?;

	Ok(Json(response))
}

async fn remind(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
	Json(payload): Json<RemindRequest>,
) -> Result<Json<ReminderOutcome>, ApiError> {
	let response = state.service.remind(&actor, suggestion_id, payload).await?;

	Ok(Json(response))
}

async fn resend(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
	Json(payload): Json<ResendRequest>,
) -> Result<Json<TransitionOutcome>, ApiError> {
	let response = state.service.resend(&actor, suggestion_id, payload).await?;

	Ok(Json(response))
}

async fn share_contact(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
	Path(suggestion_id): Path<Uuid>,
	payload: Option<Json<ShareContactRequest>>,
) -> Result<Json<TransitionOutcome>, ApiError> {
	let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
	let response = state.service.share_contact(&actor, suggestion_id, payload).await?;

	Ok(Json(response))
}

async fn expire_overdue(
	State(state): State<AppState>,
	Authenticated(actor): Authenticated,
) -> Result<Json<ExpiryReport>, ApiError> {
	let response = state.service.run_expiry_sweep(&actor).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
	retry_after_seconds: Option<i64>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self {
			status,
			error_code: error_code.into(),
			message: message.into(),
			fields,
			retry_after_seconds: None,
		}
	}

	pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
		Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message, None)
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::Unauthorized { message } => ApiError::unauthorized(message),
			ServiceError::Forbidden { message } =>
				json_error(StatusCode::FORBIDDEN, "FORBIDDEN", message, None),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			err @ ServiceError::IllegalTransition { .. } if err.is_stale() => json_error(
				StatusCode::CONFLICT,
				"STALE_STATE",
				err.to_string(),
				Some(vec!["$.status".to_string()]),
			),
			err @ ServiceError::IllegalTransition { .. } => json_error(
				StatusCode::BAD_REQUEST,
				"ILLEGAL_TRANSITION",
				err.to_string(),
				Some(vec!["$.status".to_string()]),
			),
			ServiceError::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "CONFLICT", message, None),
			ServiceError::InvalidTarget { message } => json_error(
				StatusCode::UNPROCESSABLE_ENTITY,
				"INVALID_TARGET",
				message,
				Some(vec!["$.target_user_id".to_string()]),
			),
			ServiceError::NoApplicableRecipient { message } => json_error(
				StatusCode::UNPROCESSABLE_ENTITY,
				"NO_APPLICABLE_RECIPIENT",
				message,
				Some(vec!["$.party_type".to_string()]),
			),
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			ServiceError::RateLimited { message, retry_after_seconds } => {
				let mut err =
					json_error(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", message, None);

				err.retry_after_seconds = Some(retry_after_seconds).filter(|seconds| *seconds > 0);

				err
			},
			err @ (ServiceError::Provider { .. } | ServiceError::Storage { .. }) => {
				tracing::error!(error = %err, "Request failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTERNAL_ERROR",
					"Internal error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };
		let mut response = (self.status, Json(body)).into_response();

		if let Some(seconds) = self.retry_after_seconds {
			response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(seconds));
		}

		response
	}
}
