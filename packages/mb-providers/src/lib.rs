//! HTTP clients for the outbound notification channels.

pub mod email;
pub mod push;
pub mod whatsapp;

use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};
		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}
	Ok(headers)
}

pub(crate) fn client(timeout: Duration) -> Result<Client> {
	Ok(Client::builder().timeout(timeout).build()?)
}

/// Trims `body` for inclusion in an error message.
pub(crate) fn excerpt(body: &str) -> String {
	const MAX: usize = 240;

	let trimmed = body.trim();

	if trimmed.chars().count() <= MAX {
		return trimmed.to_string();
	}

	let mut out = trimmed.chars().take(MAX).collect::<String>();
	out.push_str("...");
	out
}
