use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use mb_config::{Config, SecurityAuthKey, SecurityAuthRole};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn set_key(value: &mut Value, section: &[&str], key: &str, entry: Value) {
	let mut table = value.as_table_mut().expect("Template config must be a table.");

	for name in section {
		table = table
			.entry(name.to_string())
			.or_insert_with(|| Value::Table(Default::default()))
			.as_table_mut()
			.expect("Config section must be a table.");
	}

	table.insert(key.to_string(), entry);
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("mb_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_value(value: &Value) -> mb_config::Result<Config> {
	let payload = toml::to_string(value).expect("Failed to render template config.");
	let path = write_temp_config(payload);
	let result = mb_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	load_value(&sample_value()).expect("Expected template config to be valid.")
}

#[test]
fn template_applies_section_defaults() {
	let cfg = base_config();

	assert!(cfg.workflow.single_active_process);
	assert!(cfg.messaging.require_matchmaker_target);
	assert_eq!(cfg.reminders.max_per_party, 3);
	assert_eq!(cfg.worker.poll_interval_ms, 500);
	assert_eq!(cfg.service.public_base_url, "http://localhost:3000");
}

#[test]
fn channel_timeout_must_be_bounded() {
	let mut value = sample_value();

	set_key(&mut value, &["notifications"], "channel_timeout_ms", Value::Integer(60_000));

	let err = load_value(&value).expect_err("Expected channel timeout validation error.");

	assert!(err.to_string().contains("notifications.channel_timeout_ms"), "Unexpected error: {err}");
}

#[test]
fn unknown_channels_are_rejected() {
	let mut value = sample_value();

	set_key(
		&mut value,
		&["notifications"],
		"channels",
		Value::Array(vec![Value::String("sms".to_string())]),
	);

	let err = load_value(&value).expect_err("Expected channel validation error.");

	assert!(err.to_string().contains("must be one of email, whatsapp, or push"));
}

#[test]
fn enabled_channel_requires_adapter_section() {
	let mut value = sample_value();

	set_key(
		&mut value,
		&["notifications"],
		"channels",
		Value::Array(vec![Value::String("email".to_string()), Value::String("Push".to_string())]),
	);

	let err = load_value(&value).expect_err("Expected missing push section error.");

	assert!(err.to_string().contains("notifications.push is required"), "Unexpected error: {err}");
}

#[test]
fn auth_mode_must_be_known_value() {
	let mut value = sample_value();

	set_key(&mut value, &["security"], "auth_mode", Value::String("oauth".to_string()));

	let err = load_value(&value).expect_err("Expected auth mode validation error.");

	assert!(err.to_string().contains("security.auth_mode"));
}

#[test]
fn static_keys_mode_requires_keys() {
	let mut cfg = base_config();

	cfg.security.auth_mode = "static_keys".to_string();

	let err = mb_config::validate(&cfg).expect_err("Expected empty auth_keys error.");

	assert!(err.to_string().contains("security.auth_keys must be non-empty"));
}

#[test]
fn security_auth_keys_require_unique_token_ids() {
	let mut cfg = base_config();
	let user_id = uuid::Uuid::new_v4();

	cfg.security.auth_mode = "static_keys".to_string();
	cfg.security.auth_keys = vec![
		SecurityAuthKey {
			token_id: "k1".to_string(),
			token: "secret-1".to_string(),
			user_id,
			role: SecurityAuthRole::Matchmaker,
		},
		SecurityAuthKey {
			token_id: "k1".to_string(),
			token: "secret-2".to_string(),
			user_id,
			role: SecurityAuthRole::Candidate,
		},
	];

	let err = mb_config::validate(&cfg).expect_err("Expected duplicate token_id error.");

	assert!(
		err.to_string().contains("token_id must be unique across security.auth_keys."),
		"Unexpected error: {err}"
	);
}

#[test]
fn decision_deadline_cannot_precede_response_deadline() {
	let mut cfg = base_config();

	cfg.workflow.default_response_days = 10;
	cfg.workflow.default_decision_days = 5;

	let err = mb_config::validate(&cfg).expect_err("Expected workflow validation error.");

	assert!(err.to_string().contains("workflow.default_decision_days"));
}

#[test]
fn deadlines_and_reminder_intervals_are_bounded() {
	let mut cfg = base_config();

	cfg.workflow.default_decision_days = mb_config::MAX_DEADLINE_DAYS;

	mb_config::validate(&cfg).expect("Expected the largest decision window to be accepted.");

	cfg.workflow.default_decision_days = 10_000_000;

	let err = mb_config::validate(&cfg).expect_err("Expected decision window bound error.");

	assert!(
		err.to_string().contains("workflow.default_decision_days must be at most 3650."),
		"Unexpected error: {err}"
	);

	let mut cfg = base_config();

	cfg.reminders.min_interval_minutes = mb_config::MAX_REMINDER_INTERVAL_MINUTES + 1;

	let err = mb_config::validate(&cfg).expect_err("Expected reminder interval bound error.");

	assert!(
		err.to_string().contains("reminders.min_interval_minutes must be at most 525600."),
		"Unexpected error: {err}"
	);
}

#[test]
fn matchbook_example_toml_is_valid() {
	let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../matchbook.example.toml");

	mb_config::load(&path).expect("Expected matchbook.example.toml to be a valid config.");
}
