use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use mb_domain::{Status, Suggestion};

use crate::{
	Result,
	db::Db,
	history, messages,
	models::{SuggestionChange, SuggestionRow},
	outbox,
};

const SUGGESTION_COLUMNS: &str = "\
suggestion_id,
	matchmaker_id,
	first_party_id,
	second_party_id,
	status,
	previous_status,
	category,
	priority,
	matching_reason,
	first_party_notes,
	second_party_notes,
	internal_notes,
	follow_up_notes,
	response_deadline,
	decision_deadline,
	first_party_sent,
	first_party_responded,
	second_party_sent,
	second_party_responded,
	first_party_reminded_at,
	second_party_reminded_at,
	first_party_reminders,
	second_party_reminders,
	last_status_change,
	last_activity,
	closed_at,
	created_at,
	updated_at,
	version";

pub async fn insert_suggestion<'e, E>(executor: E, suggestion: &Suggestion) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO suggestions (
	suggestion_id,
	matchmaker_id,
	first_party_id,
	second_party_id,
	status,
	previous_status,
	category,
	priority,
	matching_reason,
	first_party_notes,
	second_party_notes,
	internal_notes,
	follow_up_notes,
	response_deadline,
	decision_deadline,
	last_status_change,
	last_activity,
	created_at,
	updated_at,
	version
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20)",
	)
	.bind(suggestion.suggestion_id)
	.bind(suggestion.matchmaker_id)
	.bind(suggestion.first_party_id)
	.bind(suggestion.second_party_id)
	.bind(suggestion.status.as_str())
	.bind(suggestion.previous_status.map(Status::as_str))
	.bind(suggestion.category.as_str())
	.bind(suggestion.priority.as_str())
	.bind(suggestion.matching_reason.as_deref())
	.bind(suggestion.first_party_notes.as_deref())
	.bind(suggestion.second_party_notes.as_deref())
	.bind(suggestion.internal_notes.as_deref())
	.bind(suggestion.follow_up_notes.as_deref())
	.bind(suggestion.response_deadline)
	.bind(suggestion.decision_deadline)
	.bind(suggestion.last_status_change)
	.bind(suggestion.last_activity)
	.bind(suggestion.created_at)
	.bind(suggestion.updated_at)
	.bind(suggestion.version)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn fetch_suggestion<'e, E>(executor: E, suggestion_id: Uuid) -> Result<Option<Suggestion>>
where
	E: PgExecutor<'e>,
{
	let sql = format!("SELECT {SUGGESTION_COLUMNS} FROM suggestions WHERE suggestion_id = $1");
	let row: Option<SuggestionRow> =
		sqlx::query_as(&sql).bind(suggestion_id).fetch_optional(executor).await?;

	row.map(Suggestion::try_from).transpose()
}

/// Writes `suggestion` only if the stored row still carries `expected_version`.
///
/// Returns false when another writer got there first.
pub async fn update_suggestion_versioned<'e, E>(
	executor: E,
	suggestion: &Suggestion,
	expected_version: i64,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
UPDATE suggestions
SET status = $1,
	previous_status = $2,
	category = $3,
	first_party_sent = $4,
	first_party_responded = $5,
	second_party_sent = $6,
	second_party_responded = $7,
	first_party_reminded_at = $8,
	second_party_reminded_at = $9,
	first_party_reminders = $10,
	second_party_reminders = $11,
	last_status_change = $12,
	last_activity = $13,
	closed_at = $14,
	updated_at = $15,
	version = $16
WHERE suggestion_id = $17
	AND version = $18",
	)
	.bind(suggestion.status.as_str())
	.bind(suggestion.previous_status.map(Status::as_str))
	.bind(suggestion.category.as_str())
	.bind(suggestion.first_party_sent)
	.bind(suggestion.first_party_responded)
	.bind(suggestion.second_party_sent)
	.bind(suggestion.second_party_responded)
	.bind(suggestion.first_party_reminded_at)
	.bind(suggestion.second_party_reminded_at)
	.bind(suggestion.first_party_reminders)
	.bind(suggestion.second_party_reminders)
	.bind(suggestion.last_status_change)
	.bind(suggestion.last_activity)
	.bind(suggestion.closed_at)
	.bind(suggestion.updated_at)
	.bind(suggestion.version)
	.bind(suggestion.suggestion_id)
	.bind(expected_version)
	.execute(executor)
	.await?;

	Ok(result.rows_affected() == 1)
}

/// Applies a [`SuggestionChange`] in one transaction. Nothing is written when the version check
/// fails.
pub async fn apply_change(db: &Db, change: &SuggestionChange) -> Result<bool> {
	let mut tx = db.pool.begin().await?;
	let updated =
		update_suggestion_versioned(&mut *tx, &change.suggestion, change.expected_version).await?;

	if !updated {
		tx.rollback().await?;

		return Ok(false);
	}

	history::insert_history(&mut *tx, &change.history).await?;

	if let Some(message) = change.message.as_ref() {
		messages::insert_message(&mut *tx, message).await?;
	}

	for intent in &change.notifications {
		outbox::enqueue_notification(
			&mut *tx,
			change.suggestion.suggestion_id,
			intent,
			change.suggestion.updated_at,
		)
		.await?;
	}

	tx.commit().await?;

	Ok(true)
}

/// Whether `user_id` is a party on a suggestion that holds them in an active process.
pub async fn has_active_process<'e, E>(
	executor: E,
	user_id: Uuid,
	exclude_suggestion_id: Option<Uuid>,
) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let active = Status::ALL
		.into_iter()
		.filter(|status| status.is_active_process())
		.map(|status| status.as_str().to_string())
		.collect::<Vec<_>>();
	let found: Option<(Uuid,)> = sqlx::query_as(
		"\
SELECT suggestion_id
FROM suggestions
WHERE (first_party_id = $1 OR second_party_id = $1)
	AND status = ANY($2)
	AND ($3::uuid IS NULL OR suggestion_id <> $3)
LIMIT 1",
	)
	.bind(user_id)
	.bind(active)
	.bind(exclude_suggestion_id)
	.fetch_optional(executor)
	.await?;

	Ok(found.is_some())
}

/// Suggestions still awaiting a decision whose decision deadline has passed, oldest deadline
/// first.
pub async fn list_overdue<'e, E>(executor: E, now: OffsetDateTime, limit: i64) -> Result<Vec<Uuid>>
where
	E: PgExecutor<'e>,
{
	let awaiting = Status::ALL
		.into_iter()
		.filter(|status| status.is_awaiting_decision())
		.map(|status| status.as_str().to_string())
		.collect::<Vec<_>>();
	let rows: Vec<(Uuid,)> = sqlx::query_as(
		"\
SELECT suggestion_id
FROM suggestions
WHERE decision_deadline IS NOT NULL
	AND decision_deadline <= $1
	AND status = ANY($2)
ORDER BY decision_deadline ASC
LIMIT $3",
	)
	.bind(now)
	.bind(awaiting)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().map(|(suggestion_id,)| suggestion_id).collect())
}
