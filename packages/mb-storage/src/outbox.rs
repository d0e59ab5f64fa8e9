use sqlx::PgExecutor;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use mb_domain::NotificationIntent;

use crate::{Result, db::Db, models::NotificationOutboxEntry};

const OUTBOX_COLUMNS: &str = "\
outbox_id,
	suggestion_id,
	recipient_id,
	audience,
	kind,
	status_entered,
	counterpart_id,
	status,
	attempts,
	last_error,
	available_at,
	created_at,
	updated_at";

pub async fn enqueue_notification<'e, E>(
	executor: E,
	suggestion_id: Uuid,
	intent: &NotificationIntent,
	now: OffsetDateTime,
) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let outbox_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO notification_outbox (
	outbox_id,
	suggestion_id,
	recipient_id,
	audience,
	kind,
	status_entered,
	counterpart_id,
	status,
	available_at,
	created_at,
	updated_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,'PENDING',$8,$8,$8)",
	)
	.bind(outbox_id)
	.bind(suggestion_id)
	.bind(intent.recipient_id)
	.bind(intent.audience.as_str())
	.bind(intent.kind.as_str())
	.bind(intent.status.as_str())
	.bind(intent.counterpart_id)
	.bind(now)
	.execute(executor)
	.await?;

	Ok(outbox_id)
}

/// Claims the next due job and pushes its availability out by `lease` so other workers skip it.
pub async fn claim_next(
	db: &Db,
	now: OffsetDateTime,
	lease: Duration,
) -> Result<Option<NotificationOutboxEntry>> {
	let mut tx = db.pool.begin().await?;
	let sql = format!(
		"\
SELECT {OUTBOX_COLUMNS}
FROM notification_outbox
WHERE status IN ('PENDING','FAILED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED"
	);
	let row: Option<NotificationOutboxEntry> =
		sqlx::query_as(&sql).bind(now).fetch_optional(&mut *tx).await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + lease;

		sqlx::query(
			"UPDATE notification_outbox SET available_at = $1, updated_at = $2 WHERE outbox_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.outbox_id)
		.execute(&mut *tx)
		.await?;

		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_done<'e, E>(executor: E, outbox_id: Uuid, now: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("UPDATE notification_outbox SET status = 'DONE', updated_at = $1 WHERE outbox_id = $2")
		.bind(now)
		.bind(outbox_id)
		.execute(executor)
		.await?;

	Ok(())
}

/// Records a failed attempt. Once `attempts` reaches `max_attempts` the job is parked as DEAD.
pub async fn mark_failed<'e, E>(
	executor: E,
	outbox_id: Uuid,
	attempts: i32,
	max_attempts: i32,
	error_text: &str,
	available_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let status = if attempts >= max_attempts { "DEAD" } else { "FAILED" };

	sqlx::query(
		"\
UPDATE notification_outbox
SET status = $1,
	attempts = $2,
	last_error = $3,
	available_at = $4,
	updated_at = $5
WHERE outbox_id = $6",
	)
	.bind(status)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(outbox_id)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn list_for_suggestion<'e, E>(
	executor: E,
	suggestion_id: Uuid,
) -> Result<Vec<NotificationOutboxEntry>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"SELECT {OUTBOX_COLUMNS} FROM notification_outbox WHERE suggestion_id = $1 ORDER BY created_at ASC"
	);
	let rows = sqlx::query_as(&sql).bind(suggestion_id).fetch_all(executor).await?;

	Ok(rows)
}
