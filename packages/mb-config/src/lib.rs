mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmailChannelConfig, Messaging, Notifications, Postgres, PushChannelConfig, Reminders,
	Security, SecurityAuthKey, SecurityAuthRole, Service, Storage, WhatsAppChannelConfig, Worker,
	Workflow,
};

use std::{collections::HashSet, fs, path::Path};

pub const KNOWN_CHANNELS: [&str; 3] = ["email", "whatsapp", "push"];
pub const MAX_DEADLINE_DAYS: i64 = 3_650;
pub const MAX_REMINDER_INTERVAL_MINUTES: i64 = 525_600;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("service.log_level", &cfg.service.log_level),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if !(cfg.service.public_base_url.starts_with("http://")
		|| cfg.service.public_base_url.starts_with("https://"))
	{
		return Err(Error::Validation {
			message: "service.public_base_url must start with http:// or https://.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	validate_security(&cfg.security)?;

	if cfg.workflow.default_response_days <= 0 {
		return Err(Error::Validation {
			message: "workflow.default_response_days must be greater than zero.".to_string(),
		});
	}
	if cfg.workflow.default_decision_days > MAX_DEADLINE_DAYS {
		return Err(Error::Validation {
			message: format!("workflow.default_decision_days must be at most {MAX_DEADLINE_DAYS}."),
		});
	}
	if cfg.workflow.default_decision_days < cfg.workflow.default_response_days {
		return Err(Error::Validation {
			message:
				"workflow.default_decision_days must be greater than or equal to workflow.default_response_days."
					.to_string(),
		});
	}
	if cfg.reminders.min_interval_minutes < 0 {
		return Err(Error::Validation {
			message: "reminders.min_interval_minutes must be zero or greater.".to_string(),
		});
	}
	if cfg.reminders.min_interval_minutes > MAX_REMINDER_INTERVAL_MINUTES {
		return Err(Error::Validation {
			message: format!(
				"reminders.min_interval_minutes must be at most {MAX_REMINDER_INTERVAL_MINUTES}."
			),
		});
	}
	if cfg.reminders.max_per_party == 0 {
		return Err(Error::Validation {
			message: "reminders.max_per_party must be greater than zero.".to_string(),
		});
	}
	if cfg.messaging.max_message_chars == 0 {
		return Err(Error::Validation {
			message: "messaging.max_message_chars must be greater than zero.".to_string(),
		});
	}

	validate_notifications(&cfg.notifications)?;

	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.expiry_sweep_interval_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.expiry_sweep_interval_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.max_job_attempts <= 0 {
		return Err(Error::Validation {
			message: "worker.max_job_attempts must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_security(security: &Security) -> Result<()> {
	match security.auth_mode.as_str() {
		"off" => {},
		"static_keys" =>
			if security.auth_keys.is_empty() {
				return Err(Error::Validation {
					message: "security.auth_keys must be non-empty when security.auth_mode=static_keys."
						.to_string(),
				});
			},
		_ => {
			return Err(Error::Validation {
				message: "security.auth_mode must be one of off or static_keys.".to_string(),
			});
		},
	}

	let mut token_ids = HashSet::new();
	let mut tokens = HashSet::new();

	for key in &security.auth_keys {
		if key.token_id.trim().is_empty() {
			return Err(Error::Validation {
				message: "security.auth_keys.token_id must be non-empty.".to_string(),
			});
		}
		if key.token.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("security.auth_keys token for {} must be non-empty.", key.token_id),
			});
		}
		if !token_ids.insert(key.token_id.as_str()) {
			return Err(Error::Validation {
				message: "token_id must be unique across security.auth_keys.".to_string(),
			});
		}
		if !tokens.insert(key.token.as_str()) {
			return Err(Error::Validation {
				message: "token must be unique across security.auth_keys.".to_string(),
			});
		}
	}

	Ok(())
}

fn validate_notifications(notifications: &Notifications) -> Result<()> {
	if notifications.channels.is_empty() {
		return Err(Error::Validation {
			message: "notifications.channels must be non-empty.".to_string(),
		});
	}

	let mut seen = HashSet::new();

	for channel in &notifications.channels {
		if !KNOWN_CHANNELS.contains(&channel.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"notifications.channels entry {channel:?} must be one of email, whatsapp, or push."
				),
			});
		}
		if !seen.insert(channel.as_str()) {
			return Err(Error::Validation {
				message: format!("notifications.channels lists {channel} more than once."),
			});
		}
	}

	if !(1_000..=30_000).contains(&notifications.channel_timeout_ms) {
		return Err(Error::Validation {
			message: "notifications.channel_timeout_ms must be in the range 1000-30000.".to_string(),
		});
	}
	if seen.contains("email") {
		let Some(email) = notifications.email.as_ref() else {
			return Err(Error::Validation {
				message: "notifications.email is required when the email channel is enabled."
					.to_string(),
			});
		};

		for (label, value) in [
			("notifications.email.api_base", &email.api_base),
			("notifications.email.api_key", &email.api_key),
			("notifications.email.from_address", &email.from_address),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}
	}
	if seen.contains("whatsapp") {
		let Some(whatsapp) = notifications.whatsapp.as_ref() else {
			return Err(Error::Validation {
				message: "notifications.whatsapp is required when the whatsapp channel is enabled."
					.to_string(),
			});
		};

		for (label, value) in [
			("notifications.whatsapp.account_sid", &whatsapp.account_sid),
			("notifications.whatsapp.auth_token", &whatsapp.auth_token),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}

		if !whatsapp.from_number.starts_with('+') {
			return Err(Error::Validation {
				message: "notifications.whatsapp.from_number must be an E.164 number.".to_string(),
			});
		}
	}
	if seen.contains("push") && notifications.push.is_none() {
		return Err(Error::Validation {
			message: "notifications.push is required when the push channel is enabled.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	while cfg.service.public_base_url.ends_with('/') {
		cfg.service.public_base_url.pop();
	}

	for channel in &mut cfg.notifications.channels {
		*channel = channel.trim().to_ascii_lowercase();
	}

	if let Some(push) = cfg.notifications.push.as_mut()
		&& push.access_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		push.access_token = None;
	}
}
