use std::{sync::LazyLock, time::Duration};

use color_eyre::{Result, eyre};
use regex::Regex;
use serde_json::Value;

use mb_config::WhatsAppChannelConfig;

static E164: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").ok());

/// Whether `phone` is a plausible E.164 number.
pub fn is_e164(phone: &str) -> bool {
	E164.as_ref().map(|re| re.is_match(phone)).unwrap_or(false)
}

/// Strips common formatting so "+1 (555) 010-0000" becomes "+15550100000".
pub fn normalize_phone(phone: &str) -> String {
	phone.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect()
}

pub async fn send_whatsapp(
	cfg: &WhatsAppChannelConfig,
	to: &str,
	body: &str,
	timeout: Duration,
) -> Result<String> {
	let to = normalize_phone(to);

	if !is_e164(&to) {
		return Err(eyre::eyre!("Recipient phone number is not in E.164 form."));
	}

	let client = crate::client(timeout)?;
	let url = format!("{}/2010-04-01/Accounts/{}/Messages.json", cfg.api_base, cfg.account_sid);
	let form = [
		("From", format!("whatsapp:{}", cfg.from_number)),
		("To", format!("whatsapp:{to}")),
		("Body", body.to_string()),
	];
	let res = client
		.post(url)
		.basic_auth(&cfg.account_sid, Some(&cfg.auth_token))
		.form(&form)
		.send()
		.await?;
	let status = res.status();
	let text = res.text().await?;

	if !status.is_success() {
		return Err(eyre::eyre!("WhatsApp API returned {status}: {}", describe_error(&text)));
	}

	parse_message_sid(&text)
}

fn parse_message_sid(text: &str) -> Result<String> {
	let json: Value = serde_json::from_str(text)?;

	json.get("sid")
		.and_then(|v| v.as_str())
		.map(ToString::to_string)
		.ok_or_else(|| eyre::eyre!("WhatsApp response is missing sid."))
}

fn describe_error(text: &str) -> String {
	let Ok(json) = serde_json::from_str::<Value>(text) else {
		return crate::excerpt(text);
	};
	let message = json.get("message").and_then(|v| v.as_str()).unwrap_or("unknown error");

	match json.get("code").and_then(|v| v.as_i64()) {
		Some(code) => format!("{message} (code {code})"),
		None => message.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn e164_validation() {
		assert!(is_e164("+15550100000"));
		assert!(is_e164("+972501234567"));
		assert!(!is_e164("15550100000"));
		assert!(!is_e164("+0555"));
		assert!(!is_e164("+1555010000012345"));
	}

	#[test]
	fn normalizes_formatted_numbers() {
		assert_eq!(normalize_phone("+1 (555) 010-0000"), "+15550100000");
	}

	#[test]
	fn error_description_prefers_provider_message() {
		let text = r#"{"code":63016,"message":"Outside the allowed window"}"#;

		assert_eq!(describe_error(text), "Outside the allowed window (code 63016)");
		assert_eq!(describe_error("gateway timeout"), "gateway timeout");
	}

	#[test]
	fn reads_message_sid() {
		assert_eq!(parse_message_sid(r#"{"sid":"SM123"}"#).expect("parse failed"), "SM123");
		assert!(parse_message_sid("{}").is_err());
	}
}
