use std::time::Duration as StdDuration;

use color_eyre::{Result, eyre};
use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;
use tracing::Instrument;
use uuid::Uuid;

use mb_service::{ChannelOutcome, Contact, MatchService, NotificationDispatcher, content};
use mb_storage::{
	db::Db,
	deliveries,
	models::{DeliveryRecord, NotificationOutboxEntry},
	outbox,
};

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;
const REDACTED: &str = "[REDACTED]";
const CONTACT: &str = "[CONTACT]";
const WHATSAPP_SCHEME: &str = "whatsapp:";
const AUTH_SCHEMES: [&str; 2] = ["bearer", "basic"];
// Provider errors can echo these back from the request.
const CREDENTIAL_KEYS: [&str; 7] =
	["account_sid", "api_key", "apikey", "auth_token", "password", "secret", "token"];

pub struct WorkerState {
	pub db: Db,
	pub service: MatchService,
	pub dispatcher: NotificationDispatcher,
	pub settings: mb_config::Worker,
	pub public_base_url: String,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	let sweep_interval = Duration::seconds(state.settings.expiry_sweep_interval_seconds);
	let poll_interval = Duration::milliseconds(
		i64::try_from(state.settings.poll_interval_ms).unwrap_or(i64::MAX),
	);
	let mut last_sweep: Option<OffsetDateTime> = None;

	loop {
		// Drain due jobs before sleeping.
		loop {
			match process_outbox_once(&state).await {
				Ok(true) => continue,
				Ok(false) => break,
				Err(err) => {
					tracing::error!(error = %err, "Notification outbox processing failed.");

					break;
				},
			}
		}

		let now = OffsetDateTime::now_utc();

		if last_sweep.is_none_or(|last| now - last >= sweep_interval) {
			match state.service.expire_overdue(now).await {
				Ok(report) => {
					last_sweep = Some(now);

					if !report.skipped.is_empty() {
						tracing::info!(skipped = report.skipped.len(), "Expiry sweep skipped suggestions.");
					}
				},
				Err(err) => tracing::error!(error = %err, "Expiry sweep failed."),
			}
		}

		tokio_time::sleep(to_std_duration(poll_interval)).await;
	}
}

/// Handles at most one outbox job. Returns whether a job was claimed.
async fn process_outbox_once(state: &WorkerState) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let lease = Duration::seconds(state.settings.claim_lease_seconds);
	let Some(job) = outbox::claim_next(&state.db, now, lease).await? else {
		return Ok(false);
	};
	let span = tracing::info_span!(
		"notification_job",
		outbox_id = %job.outbox_id,
		suggestion_id = %job.suggestion_id,
		recipient_id = %job.recipient_id,
	);

	match deliver(state, &job).instrument(span).await {
		Ok(outcomes) => {
			let records = delivery_records(&job, &outcomes, OffsetDateTime::now_utc());

			finish_job(&state.db, job.outbox_id, &records).await?;
		},
		Err(err) => {
			mark_failed(&state.db, &job, state.settings.max_job_attempts, &err).await?;

			tracing::error!(
				error = %err,
				outbox_id = %job.outbox_id,
				suggestion_id = %job.suggestion_id,
				attempts = job.attempts.saturating_add(1),
				"Notification outbox job failed."
			);
		},
	}

	Ok(true)
}

/// Resolves the job into rendered content and fans it out. Channel failures are outcomes, not
/// errors; only a job that cannot be rendered at all fails here.
async fn deliver(state: &WorkerState, job: &NotificationOutboxEntry) -> Result<Vec<ChannelOutcome>> {
	let intent = job.intent()?;

	if state.service.store.fetch_suggestion(job.suggestion_id).await?.is_none() {
		return Err(eyre::eyre!("Suggestion {} no longer exists.", job.suggestion_id));
	}

	let recipient = lookup(state, intent.recipient_id).await?;
	let counterpart = match intent.counterpart_id {
		Some(user_id) => Some(lookup(state, user_id).await?),
		None => None,
	};
	let rendered = content::render(
		&intent,
		job.suggestion_id,
		&recipient,
		counterpart.as_ref(),
		&state.public_base_url,
	);
	let outcomes =
		state.dispatcher.dispatch(&recipient, &rendered, &state.dispatcher.channels()).await;

	tracing::info!(
		kind = intent.kind.as_str(),
		failed = outcomes.iter().filter(|outcome| outcome.status.as_str() == "FAILED").count(),
		"Notification dispatched."
	);

	Ok(outcomes)
}

async fn lookup(state: &WorkerState, user_id: Uuid) -> Result<Contact> {
	state
		.service
		.directory
		.lookup(user_id)
		.await?
		.ok_or_else(|| eyre::eyre!("User {user_id} is not in the directory."))
}

fn delivery_records(
	job: &NotificationOutboxEntry,
	outcomes: &[ChannelOutcome],
	now: OffsetDateTime,
) -> Vec<DeliveryRecord> {
	outcomes
		.iter()
		.map(|outcome| DeliveryRecord {
			delivery_id: Uuid::new_v4(),
			outbox_id: job.outbox_id,
			suggestion_id: job.suggestion_id,
			recipient_id: job.recipient_id,
			channel: outcome.channel.as_str().to_string(),
			outcome: outcome.status.as_str().to_string(),
			detail: outcome.status.detail().map(sanitize_outbox_error),
			created_at: now,
		})
		.collect()
}

async fn finish_job(db: &Db, outbox_id: Uuid, records: &[DeliveryRecord]) -> Result<()> {
	let mut tx = db.pool.begin().await?;

	for record in records {
		deliveries::insert_delivery(&mut *tx, record).await?;
	}

	outbox::mark_done(&mut *tx, outbox_id, OffsetDateTime::now_utc()).await?;

	tx.commit().await?;

	Ok(())
}

async fn mark_failed(
	db: &Db,
	job: &NotificationOutboxEntry,
	max_attempts: i32,
	err: &color_eyre::Report,
) -> Result<()> {
	let next_attempts = job.attempts.saturating_add(1);
	let now = OffsetDateTime::now_utc();
	let available_at = now + backoff_for_attempt(next_attempts);
	let error_text = sanitize_outbox_error(&err.to_string());

	outbox::mark_failed(
		&db.pool,
		job.outbox_id,
		next_attempts,
		max_attempts,
		&error_text,
		available_at,
		now,
	)
	.await?;

	Ok(())
}

/// Stores adapter errors without credentials or recipient contact details, capped in length.
fn sanitize_outbox_error(text: &str) -> String {
	let mut after_scheme = false;
	let sanitized = text
		.split_whitespace()
		.map(|word| {
			let out = if after_scheme { REDACTED.to_string() } else { redact_word(word) };

			after_scheme = AUTH_SCHEMES.iter().any(|scheme| word.eq_ignore_ascii_case(scheme));

			out
		})
		.collect::<Vec<_>>()
		.join(" ");

	truncate_error(sanitized)
}

fn redact_word(word: &str) -> String {
	if let Some(split) = word.find(['=', ':']) {
		let key = word[..split].to_ascii_lowercase();

		if CREDENTIAL_KEYS.iter().any(|credential| key.contains(credential)) {
			return format!("{}{REDACTED}", &word[..=split]);
		}
	}

	// `to=whatsapp:+15551234567` keeps its key.
	let (prefix, value) = match word.rfind('=') {
		Some(split) => word.split_at(split + 1),
		None => ("", word),
	};

	if is_contact_address(value.trim_end_matches([',', ';', '.', ')'])) {
		return format!("{prefix}{CONTACT}");
	}

	word.to_string()
}

/// Phone numbers (optionally with the WhatsApp scheme) and email addresses.
fn is_contact_address(value: &str) -> bool {
	let number = match value.get(..WHATSAPP_SCHEME.len()) {
		Some(scheme) if scheme.eq_ignore_ascii_case(WHATSAPP_SCHEME) =>
			&value[WHATSAPP_SCHEME.len()..],
		_ => value,
	};
	let is_phone = number.strip_prefix('+').is_some_and(|digits| {
		digits.chars().all(|c| c.is_ascii_digit() || c == '-')
			&& digits.chars().filter(char::is_ascii_digit).count() >= 7
	});
	let is_email = value.split_once('@').is_some_and(|(local, domain)| {
		!local.is_empty() && domain.contains('.') && !domain.starts_with('.')
	});

	is_phone || is_email
}

fn truncate_error(mut text: String) -> String {
	if let Some((cut, _)) = text.char_indices().nth(MAX_OUTBOX_ERROR_CHARS) {
		text.truncate(cut);
		text.push_str("...");
	}

	text
}

/// Delay before retrying after the `attempt`th failure: doubles from 500 ms up to 30 s.
fn backoff_for_attempt(attempt: i32) -> Duration {
	let doublings = u32::try_from(attempt.saturating_sub(1)).unwrap_or(0);
	let factor = 2_i64.checked_pow(doublings).unwrap_or(i64::MAX);

	Duration::milliseconds(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

fn to_std_duration(duration: Duration) -> StdDuration {
	let millis = duration.whole_milliseconds();

	if millis <= 0 {
		return StdDuration::from_millis(0);
	}

	StdDuration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}
