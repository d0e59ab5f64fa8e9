use std::time::Duration;

use color_eyre::{Result, eyre};
use serde::Serialize;
use serde_json::Value;

use mb_config::EmailChannelConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
	pub to: String,
	pub to_name: String,
	pub subject: String,
	pub text: String,
	pub html: Option<String>,
}

pub async fn send_email(
	cfg: &EmailChannelConfig,
	message: &EmailMessage,
	timeout: Duration,
) -> Result<String> {
	let client = crate::client(timeout)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = build_email_body(cfg, message);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let status = res.status();
	let text = res.text().await?;

	if !status.is_success() {
		return Err(eyre::eyre!(
			"Email API returned {status}: {}",
			crate::excerpt(&text)
		));
	}

	parse_email_response(&text)
}

fn build_email_body(cfg: &EmailChannelConfig, message: &EmailMessage) -> Value {
	let mut body = serde_json::json!({
		"from": cfg.from_address,
		"to": [{ "email": message.to, "name": message.to_name }],
		"subject": message.subject,
		"text": message.text,
	});

	if let Some(html) = message.html.as_ref() {
		body["html"] = Value::String(html.clone());
	}

	body
}

/// Returns the provider's message id, or an empty string when the provider sends none.
fn parse_email_response(text: &str) -> Result<String> {
	if text.trim().is_empty() {
		return Ok(String::new());
	}

	let json: Value = serde_json::from_str(text)?;

	if let Some(error) = json.get("error") {
		let message = error
			.get("message")
			.and_then(|v| v.as_str())
			.or_else(|| error.as_str())
			.unwrap_or("unknown error");

		return Err(eyre::eyre!("Email API rejected the message: {message}"));
	}

	Ok(json
		.get("id")
		.or_else(|| json.get("message_id"))
		.and_then(|v| v.as_str())
		.unwrap_or_default()
		.to_string())
}

#[cfg(test)]
mod tests {
	use serde_json::Map;

	use super::*;

	fn cfg() -> EmailChannelConfig {
		EmailChannelConfig {
			api_base: "https://mail.example".to_string(),
			path: "/v1/send".to_string(),
			api_key: "key".to_string(),
			from_address: "Matchbook <noreply@matchbook.test>".to_string(),
			default_headers: Map::new(),
		}
	}

	#[test]
	fn html_is_only_sent_when_present() {
		let mut message = EmailMessage {
			to: "dana@example.com".to_string(),
			to_name: "Dana".to_string(),
			subject: "Hello".to_string(),
			text: "Plain".to_string(),
			html: None,
		};
		let body = build_email_body(&cfg(), &message);

		assert!(body.get("html").is_none());
		assert_eq!(body["to"][0]["email"], "dana@example.com");

		message.html = Some("<p>Plain</p>".to_string());

		let body = build_email_body(&cfg(), &message);

		assert_eq!(body["html"], "<p>Plain</p>");
	}

	#[test]
	fn reads_message_id_or_error() {
		assert_eq!(parse_email_response(r#"{"id":"m-1"}"#).expect("parse failed"), "m-1");
		assert_eq!(parse_email_response("").expect("parse failed"), "");

		let err = parse_email_response(r#"{"error":{"message":"bad sender"}}"#)
			.expect_err("Expected provider error.");

		assert!(err.to_string().contains("bad sender"));
	}
}
