use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
	response::Response,
};
use serde_json::{Value, json};
use tower::util::ServiceExt;
use uuid::Uuid;

use mb_api::{
	auth::{AuthState, HEADER_ACTOR_ID, HEADER_ACTOR_ROLE},
	routes,
	state::AppState,
};
use mb_domain::{Actor, Role};
use mb_service::MatchService;
use mb_testkit::{MemoryDirectory, MemoryStore};

struct Harness {
	app: Router,
	admin: Router,
	matchmaker: Actor,
	first: Actor,
	second: Actor,
}

fn harness() -> Harness {
	let store = Arc::new(MemoryStore::new());
	let directory = Arc::new(MemoryDirectory::new());
	let matchmaker = directory.register("Rivka", Role::Matchmaker);
	let first = directory.register("Avi", Role::Candidate);
	let second = directory.register("Yael", Role::Candidate);
	let service = MatchService::with_collaborators(mb_testkit::test_config(), store, directory);
	let state = AppState::from_parts(service, AuthState::Off);

	Harness {
		app: routes::router(state.clone()),
		admin: routes::admin_router(state),
		matchmaker: Actor::new(matchmaker.user_id, Role::Matchmaker),
		first: Actor::new(first.user_id, Role::Candidate),
		second: Actor::new(second.user_id, Role::Candidate),
	}
}

async fn call(
	app: &Router,
	actor: Option<&Actor>,
	method: &str,
	uri: &str,
	payload: Option<Value>,
) -> Response {
	let mut builder = Request::builder().method(method).uri(uri);

	if let Some(actor) = actor {
		builder = builder
			.header(HEADER_ACTOR_ID, actor.user_id.to_string())
			.header(HEADER_ACTOR_ROLE, actor.role.as_str());
	}

	let body = match payload {
		Some(payload) => {
			builder = builder.header("content-type", "application/json");

			Body::from(payload.to_string())
		},
		None => Body::empty(),
	};

	app.clone()
		.oneshot(builder.body(body).expect("Failed to build request."))
		.await
		.expect("Failed to call router.")
}

async fn json_body(response: Response) -> Value {
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&body).expect("Failed to parse response.")
}

async fn create(h: &Harness) -> Uuid {
	let response = call(
		&h.app,
		Some(&h.matchmaker),
		"POST",
		"/v1/suggestions",
		Some(json!({
			"first_party_id": h.first.user_id,
			"second_party_id": h.second.user_id,
			"matching_reason": "Both love hiking.",
			"internal_notes": "Call the families first."
		})),
	)
	.await;

	assert_eq!(response.status(), StatusCode::CREATED);

	let json = json_body(response).await;

	json["suggestion_id"]
		.as_str()
		.and_then(|raw| Uuid::parse_str(raw).ok())
		.expect("Response must carry a suggestion id.")
}

async fn send_to_first_party(h: &Harness, suggestion_id: Uuid) {
	let response = call(
		&h.app,
		Some(&h.matchmaker),
		"PATCH",
		&format!("/v1/suggestions/{suggestion_id}/status"),
		Some(json!({ "targetState": "PENDING_FIRST_PARTY" })),
	)
	.await;

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_ok() {
	let h = harness();
	let response = call(&h.app, None, "GET", "/health", None).await;

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
	let h = harness();
	let response =
		call(&h.app, None, "GET", &format!("/v1/suggestions/{}", Uuid::new_v4()), None).await;

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(json_body(response).await["error_code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn party_view_hides_internal_notes() {
	let h = harness();
	let suggestion_id = create(&h).await;

	send_to_first_party(&h, suggestion_id).await;

	let staff =
		call(&h.app, Some(&h.matchmaker), "GET", &format!("/v1/suggestions/{suggestion_id}"), None)
			.await;
	let party =
		call(&h.app, Some(&h.first), "GET", &format!("/v1/suggestions/{suggestion_id}"), None).await;

	assert_eq!(staff.status(), StatusCode::OK);
	assert_eq!(party.status(), StatusCode::OK);
	assert_eq!(json_body(staff).await["internal_notes"], "Call the families first.");

	let party = json_body(party).await;

	assert_eq!(party["status"], "PENDING_FIRST_PARTY");
	assert!(party.get("internal_notes").is_none_or(Value::is_null));
	assert_eq!(party["viewer_relation"], "first_party");
}

#[tokio::test]
async fn illegal_transition_is_a_bad_request() {
	let h = harness();
	let suggestion_id = create(&h).await;
	let response = call(
		&h.app,
		Some(&h.matchmaker),
		"PATCH",
		&format!("/v1/suggestions/{suggestion_id}/status"),
		Some(json!({ "status": "CONTACT_DETAILS_SHARED" })),
	)
	.await;

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = json_body(response).await;

	assert_eq!(json["error_code"], "ILLEGAL_TRANSITION");
	assert_eq!(json["fields"][0], "$.status");
}

#[tokio::test]
async fn candidates_cannot_patch_status() {
	let h = harness();
	let suggestion_id = create(&h).await;

	send_to_first_party(&h, suggestion_id).await;

	let response = call(
		&h.app,
		Some(&h.first),
		"PATCH",
		&format!("/v1/suggestions/{suggestion_id}/status"),
		Some(json!({ "status": "FIRST_PARTY_APPROVED" })),
	)
	.await;

	assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn respond_then_resend_reports_no_recipient() {
	let h = harness();
	let suggestion_id = create(&h).await;

	send_to_first_party(&h, suggestion_id).await;

	let approved = call(
		&h.app,
		Some(&h.first),
		"POST",
		&format!("/v1/suggestions/{suggestion_id}/respond"),
		Some(json!({ "decision": "approve" })),
	)
	.await;

	assert_eq!(approved.status(), StatusCode::OK);

	let approved = json_body(approved).await;

	assert_eq!(approved["suggestion"]["status"], "FIRST_PARTY_APPROVED");
	assert_eq!(approved["notifications"][0]["recipient_id"], h.matchmaker.user_id.to_string());

	let resend = call(
		&h.app,
		Some(&h.matchmaker),
		"POST",
		&format!("/v1/suggestions/{suggestion_id}/resend"),
		Some(json!({ "partyType": "first" })),
	)
	.await;

	assert_eq!(resend.status(), StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(json_body(resend).await["error_code"], "NO_APPLICABLE_RECIPIENT");
}

#[tokio::test]
async fn reminders_are_rate_limited() {
	let h = harness();
	let suggestion_id = create(&h).await;

	send_to_first_party(&h, suggestion_id).await;

	let uri = format!("/v1/suggestions/{suggestion_id}/remind");
	let first = call(&h.app, Some(&h.matchmaker), "POST", &uri, Some(json!({ "party_type": "both" })))
		.await;

	assert_eq!(first.status(), StatusCode::OK);
	assert_eq!(json_body(first).await["reminded"][0], "first");

	let second =
		call(&h.app, Some(&h.matchmaker), "POST", &uri, Some(json!({ "party_type": "first" })))
			.await;

	assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
	assert!(second.headers().contains_key("retry-after"));
	assert_eq!(json_body(second).await["error_code"], "RATE_LIMITED");
}

#[tokio::test]
async fn messages_are_scoped_per_party() {
	let h = harness();
	let suggestion_id = create(&h).await;
	let uri = format!("/v1/suggestions/{suggestion_id}/messages");

	send_to_first_party(&h, suggestion_id).await;

	let untargeted =
		call(&h.app, Some(&h.matchmaker), "POST", &uri, Some(json!({ "content": "Hello" }))).await;

	assert_eq!(untargeted.status(), StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(json_body(untargeted).await["error_code"], "INVALID_TARGET");

	let targeted = call(
		&h.app,
		Some(&h.matchmaker),
		"POST",
		&uri,
		Some(json!({ "content": "Avi, any questions?", "targetUserId": h.first.user_id })),
	)
	.await;

	assert_eq!(targeted.status(), StatusCode::CREATED);

	let listed = json_body(call(&h.app, Some(&h.first), "GET", &uri, None).await).await;

	assert_eq!(listed["unread_count"], 1);
	assert_eq!(listed["messages"][0]["content"], "Avi, any questions?");

	let read_uri = format!("{uri}/read");
	let first_read = call(&h.app, Some(&h.first), "PATCH", &read_uri, None).await;
	let second_read = call(&h.app, Some(&h.first), "PATCH", &read_uri, None).await;

	assert_eq!(json_body(first_read).await["updated"], 1);
	assert_eq!(json_body(second_read).await["updated"], 0);
}

#[tokio::test]
async fn history_lists_entries_with_names() {
	let h = harness();
	let suggestion_id = create(&h).await;

	send_to_first_party(&h, suggestion_id).await;

	let response = call(
		&h.app,
		Some(&h.matchmaker),
		"GET",
		&format!("/v1/suggestions/{suggestion_id}/history?limit=10"),
		None,
	)
	.await;

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
	assert_eq!(json["items"][1]["status"], "PENDING_FIRST_PARTY");
	assert_eq!(json["items"][1]["actor_name"], "Rivka");

	let bad_limit = call(
		&h.app,
		Some(&h.matchmaker),
		"GET",
		&format!("/v1/suggestions/{suggestion_id}/history?limit=0"),
		None,
	)
	.await;

	assert_eq!(bad_limit.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expiry_sweep_is_admin_only() {
	let h = harness();
	let denied = call(&h.admin, Some(&h.matchmaker), "POST", "/v1/admin/expire-overdue", None).await;

	assert_eq!(denied.status(), StatusCode::FORBIDDEN);

	let admin = Actor::new(Uuid::new_v4(), Role::Admin);
	let allowed = call(&h.admin, Some(&admin), "POST", "/v1/admin/expire-overdue", None).await;

	assert_eq!(allowed.status(), StatusCode::OK);
	assert_eq!(json_body(allowed).await["expired"], json!([]));
}
