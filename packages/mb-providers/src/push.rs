use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::header::{AUTHORIZATION, HeaderMap};
use serde_json::Value;

use mb_config::PushChannelConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
	pub to: String,
	pub title: String,
	pub body: String,
	pub data: Value,
}

/// Whether `token` looks like an Expo push token.
pub fn is_push_token(token: &str) -> bool {
	(token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
		&& token.ends_with(']')
}

pub async fn send_push(
	cfg: &PushChannelConfig,
	message: &PushMessage,
	timeout: Duration,
) -> Result<String> {
	if !is_push_token(&message.to) {
		return Err(eyre::eyre!("Recipient push token is malformed."));
	}

	let client = crate::client(timeout)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut headers = HeaderMap::new();

	if let Some(token) = cfg.access_token.as_deref() {
		headers.insert(AUTHORIZATION, format!("Bearer {token}").parse()?);
	}

	let body = serde_json::json!([{
		"to": message.to,
		"title": message.title,
		"body": message.body,
		"data": message.data,
		"sound": "default",
	}]);
	let res = client.post(url).headers(headers).json(&body).send().await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_push_ticket(json)
}

/// Reads the single ticket for the single message sent.
fn parse_push_ticket(json: Value) -> Result<String> {
	let ticket = json
		.get("data")
		.and_then(|v| v.as_array())
		.and_then(|tickets| tickets.first())
		.ok_or_else(|| eyre::eyre!("Push response is missing ticket data."))?;

	match ticket.get("status").and_then(|v| v.as_str()) {
		Some("ok") => Ok(ticket.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string()),
		Some("error") => {
			let message =
				ticket.get("message").and_then(|v| v.as_str()).unwrap_or("unknown error");
			let detail = ticket
				.get("details")
				.and_then(|d| d.get("error"))
				.and_then(|v| v.as_str())
				.map(|code| format!(" ({code})"))
				.unwrap_or_default();

			Err(eyre::eyre!("Push ticket rejected: {message}{detail}"))
		},
		_ => Err(eyre::eyre!("Push ticket has no status.")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn token_shape() {
		assert!(is_push_token("ExponentPushToken[abc123]"));
		assert!(!is_push_token("abc123"));
	}

	#[test]
	fn ok_ticket_yields_id() {
		let json = serde_json::json!({ "data": [{ "status": "ok", "id": "t-1" }] });

		assert_eq!(parse_push_ticket(json).expect("parse failed"), "t-1");
	}

	#[test]
	fn error_ticket_carries_reason() {
		let json = serde_json::json!({
			"data": [{
				"status": "error",
				"message": "not registered",
				"details": { "error": "DeviceNotRegistered" }
			}]
		});
		let err = parse_push_ticket(json).expect_err("Expected ticket error.");

		assert!(err.to_string().contains("DeviceNotRegistered"));
	}
}
