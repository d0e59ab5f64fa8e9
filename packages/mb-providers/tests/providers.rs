use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		mb_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");
	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();
	defaults.insert("X-Retries".to_string(), Value::from(3));

	assert!(mb_providers::auth_headers("secret", &defaults).is_err());
}

#[test]
fn phone_helpers_agree() {
	let phone = mb_providers::whatsapp::normalize_phone("+44 20 7946 0958");

	assert!(mb_providers::whatsapp::is_e164(&phone));
}
