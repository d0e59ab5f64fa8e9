use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub security: Security,
	#[serde(default)]
	pub workflow: Workflow,
	#[serde(default)]
	pub reminders: Reminders,
	#[serde(default)]
	pub messaging: Messaging,
	pub notifications: Notifications,
	#[serde(default)]
	pub worker: Worker,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
	/// Base URL embedded in notification links, e.g. "https://app.example.org".
	pub public_base_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	/// One of "off" or "static_keys".
	#[serde(default = "default_auth_mode")]
	pub auth_mode: String,
	#[serde(default)]
	pub auth_keys: Vec<SecurityAuthKey>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SecurityAuthKey {
	pub token_id: String,
	pub token: String,
	pub user_id: Uuid,
	pub role: SecurityAuthRole,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SecurityAuthRole {
	Candidate,
	Matchmaker,
	Admin,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Workflow {
	/// Reject approvals and new suggestions while a party is already in an active process.
	#[serde(default = "default_true")]
	pub single_active_process: bool,
	#[serde(default = "default_response_days")]
	pub default_response_days: i64,
	#[serde(default = "default_decision_days")]
	pub default_decision_days: i64,
}
impl Default for Workflow {
	fn default() -> Self {
		Self {
			single_active_process: true,
			default_response_days: default_response_days(),
			default_decision_days: default_decision_days(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Reminders {
	#[serde(default = "default_min_interval_minutes")]
	pub min_interval_minutes: i64,
	#[serde(default = "default_max_per_party")]
	pub max_per_party: u32,
}
impl Default for Reminders {
	fn default() -> Self {
		Self {
			min_interval_minutes: default_min_interval_minutes(),
			max_per_party: default_max_per_party(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Messaging {
	#[serde(default = "default_true")]
	pub require_matchmaker_target: bool,
	#[serde(default = "default_max_message_chars")]
	pub max_message_chars: usize,
}
impl Default for Messaging {
	fn default() -> Self {
		Self { require_matchmaker_target: true, max_message_chars: default_max_message_chars() }
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Notifications {
	/// Subset of "email", "whatsapp", and "push", attempted in this order.
	pub channels: Vec<String>,
	#[serde(default = "default_channel_timeout_ms")]
	pub channel_timeout_ms: u64,
	pub email: Option<EmailChannelConfig>,
	pub whatsapp: Option<WhatsAppChannelConfig>,
	pub push: Option<PushChannelConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmailChannelConfig {
	pub api_base: String,
	pub path: String,
	pub api_key: String,
	pub from_address: String,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WhatsAppChannelConfig {
	#[serde(default = "default_twilio_api_base")]
	pub api_base: String,
	pub account_sid: String,
	pub auth_token: String,
	/// E.164 number registered for WhatsApp, without the "whatsapp:" prefix.
	pub from_number: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PushChannelConfig {
	#[serde(default = "default_push_api_base")]
	pub api_base: String,
	#[serde(default = "default_push_path")]
	pub path: String,
	pub access_token: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Worker {
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	#[serde(default = "default_claim_lease_seconds")]
	pub claim_lease_seconds: i64,
	#[serde(default = "default_expiry_sweep_interval_seconds")]
	pub expiry_sweep_interval_seconds: i64,
	#[serde(default = "default_max_job_attempts")]
	pub max_job_attempts: i32,
}
impl Default for Worker {
	fn default() -> Self {
		Self {
			poll_interval_ms: default_poll_interval_ms(),
			claim_lease_seconds: default_claim_lease_seconds(),
			expiry_sweep_interval_seconds: default_expiry_sweep_interval_seconds(),
			max_job_attempts: default_max_job_attempts(),
		}
	}
}

fn default_true() -> bool {
	true
}

fn default_auth_mode() -> String {
	"off".to_string()
}

fn default_response_days() -> i64 {
	7
}

fn default_decision_days() -> i64 {
	14
}

fn default_min_interval_minutes() -> i64 {
	24 * 60
}

fn default_max_per_party() -> u32 {
	3
}

fn default_max_message_chars() -> usize {
	4_000
}

fn default_channel_timeout_ms() -> u64 {
	8_000
}

fn default_twilio_api_base() -> String {
	"https://api.twilio.com".to_string()
}

fn default_push_api_base() -> String {
	"https://exp.host".to_string()
}

fn default_push_path() -> String {
	"/--/api/v2/push/send".to_string()
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_claim_lease_seconds() -> i64 {
	30
}

fn default_expiry_sweep_interval_seconds() -> i64 {
	300
}

fn default_max_job_attempts() -> i32 {
	8
}
