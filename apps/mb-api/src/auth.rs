//! Request identity. In `off` mode the caller's id and role are trusted from headers, so the
//! listener must stay on loopback; `static_keys` maps bearer tokens to configured users.

use std::collections::HashMap;

use axum::{
	extract::FromRequestParts,
	http::{HeaderMap, request::Parts},
};
use color_eyre::eyre;
use uuid::Uuid;

use mb_config::{Security, SecurityAuthRole};
use mb_domain::{Actor, Role};

use crate::{routes::ApiError, state::AppState};

pub const HEADER_ACTOR_ID: &str = "X-MB-Actor-Id";
pub const HEADER_ACTOR_ROLE: &str = "X-MB-Actor-Role";

const HEADER_AUTHORIZATION: &str = "Authorization";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
	Off,
	StaticKeys { actors: HashMap<String, Actor> },
}
impl AuthState {
	pub fn from_config(security: &Security) -> color_eyre::Result<Self> {
		match security.auth_mode.trim() {
			"off" => Ok(Self::Off),
			"static_keys" => {
				let mut actors = HashMap::with_capacity(security.auth_keys.len());

				for key in &security.auth_keys {
					let actor = Actor::new(key.user_id, role_of(key.role));

					if actors.insert(key.token.clone(), actor).is_some() {
						return Err(eyre::eyre!(
							"security.auth_keys token for {} duplicates another entry.",
							key.token_id
						));
					}
				}

				Ok(Self::StaticKeys { actors })
			},
			other => Err(eyre::eyre!(
				"security.auth_mode must be one of off or static_keys, got {other}."
			)),
		}
	}

	pub fn resolve(&self, headers: &HeaderMap) -> Result<Actor, ApiError> {
		match self {
			Self::Off => actor_from_headers(headers),
			Self::StaticKeys { actors } => read_bearer_token(headers)
				.and_then(|token| actors.get(token).copied())
				.ok_or_else(|| ApiError::unauthorized("A valid bearer token is required.")),
		}
	}
}

/// The caller, resolved from the request before the handler runs.
pub struct Authenticated(pub Actor);

impl FromRequestParts<AppState> for Authenticated {
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		state.auth.resolve(&parts.headers).map(Self)
	}
}

fn role_of(role: SecurityAuthRole) -> Role {
	match role {
		SecurityAuthRole::Candidate => Role::Candidate,
		SecurityAuthRole::Matchmaker => Role::Matchmaker,
		SecurityAuthRole::Admin => Role::Admin,
	}
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
	let user_id = read_header(headers, HEADER_ACTOR_ID)
		.and_then(|raw| Uuid::parse_str(raw).ok())
		.ok_or_else(|| ApiError::unauthorized(format!("{HEADER_ACTOR_ID} must be a UUID.")))?;
	let role = read_header(headers, HEADER_ACTOR_ROLE)
		.and_then(|raw| raw.parse::<Role>().ok())
		.filter(|role| *role != Role::System)
		.ok_or_else(|| {
			ApiError::unauthorized(format!(
				"{HEADER_ACTOR_ROLE} must be one of CANDIDATE, MATCHMAKER, or ADMIN."
			))
		})?;

	Ok(Actor::new(user_id, role))
}

fn read_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	let value = headers.get(name)?.to_str().ok()?.trim();

	if value.is_empty() { None } else { Some(value) }
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let token = read_header(headers, HEADER_AUTHORIZATION)?.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
	use mb_config::SecurityAuthKey;

	use super::*;

	fn security(auth_mode: &str, auth_keys: Vec<SecurityAuthKey>) -> Security {
		Security { bind_localhost_only: true, auth_mode: auth_mode.to_string(), auth_keys }
	}

	fn key(token: &str, user_id: Uuid, role: SecurityAuthRole) -> SecurityAuthKey {
		SecurityAuthKey {
			token_id: format!("id-{token}"),
			token: token.to_string(),
			user_id,
			role,
		}
	}

	#[test]
	fn off_mode_reads_actor_headers() {
		let user_id = Uuid::new_v4();
		let mut headers = HeaderMap::new();

		headers.insert(HEADER_ACTOR_ID, user_id.to_string().parse().expect("valid header"));
		headers.insert(HEADER_ACTOR_ROLE, "matchmaker".parse().expect("valid header"));

		let actor = AuthState::Off.resolve(&headers).expect("Expected headers to resolve.");

		assert_eq!(actor, Actor::new(user_id, Role::Matchmaker));
	}

	#[test]
	fn off_mode_refuses_the_system_role() {
		let mut headers = HeaderMap::new();

		headers.insert(HEADER_ACTOR_ID, Uuid::new_v4().to_string().parse().expect("valid header"));
		headers.insert(HEADER_ACTOR_ROLE, "SYSTEM".parse().expect("valid header"));

		assert!(AuthState::Off.resolve(&headers).is_err());
	}

	#[test]
	fn static_keys_require_a_known_bearer_token() {
		let user_id = Uuid::new_v4();
		let auth = AuthState::from_config(&security(
			"static_keys",
			vec![key("token-a", user_id, SecurityAuthRole::Admin)],
		))
		.expect("Expected auth state.");
		let mut headers = HeaderMap::new();

		assert!(auth.resolve(&headers).is_err());

		headers.insert(HEADER_AUTHORIZATION, "bearer token-a".parse().expect("valid header"));

		assert!(auth.resolve(&headers).is_err());

		headers.insert(HEADER_AUTHORIZATION, "Bearer token-a".parse().expect("valid header"));

		assert_eq!(
			auth.resolve(&headers).expect("Expected token to resolve."),
			Actor::new(user_id, Role::Admin)
		);
	}

	#[test]
	fn duplicate_tokens_are_rejected() {
		let keys = vec![
			key("same", Uuid::new_v4(), SecurityAuthRole::Candidate),
			key("same", Uuid::new_v4(), SecurityAuthRole::Matchmaker),
		];

		assert!(AuthState::from_config(&security("static_keys", keys)).is_err());
	}
}
