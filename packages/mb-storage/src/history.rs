use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use mb_domain::HistoryEntry;

use crate::{Result, models::HistoryRow};

pub async fn insert_history<'e, E>(executor: E, entry: &HistoryEntry) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO suggestion_status_history (entry_id, suggestion_id, status, notes, actor_id, created_at)
VALUES ($1,$2,$3,$4,$5,$6)",
	)
	.bind(entry.entry_id)
	.bind(entry.suggestion_id)
	.bind(entry.status.as_str())
	.bind(entry.notes.as_str())
	.bind(entry.actor_id)
	.bind(entry.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Chronological history, optionally bounded to `[since, until)`.
pub async fn list_history<'e, E>(
	executor: E,
	suggestion_id: Uuid,
	since: Option<OffsetDateTime>,
	until: Option<OffsetDateTime>,
	limit: i64,
) -> Result<Vec<HistoryEntry>>
where
	E: PgExecutor<'e>,
{
	let rows: Vec<HistoryRow> = sqlx::query_as(
		"\
SELECT entry_id, suggestion_id, status, notes, actor_id, created_at
FROM suggestion_status_history
WHERE suggestion_id = $1
	AND ($2::timestamptz IS NULL OR created_at >= $2)
	AND ($3::timestamptz IS NULL OR created_at < $3)
ORDER BY created_at ASC, seq ASC
LIMIT $4",
	)
	.bind(suggestion_id)
	.bind(since)
	.bind(until)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	rows.into_iter().map(HistoryEntry::try_from).collect()
}
