use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use mb_domain::Message;

use crate::{Result, db::Db, models::MessageRow};

pub async fn insert_message<'e, E>(executor: E, message: &Message) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO suggestion_messages (
	message_id,
	suggestion_id,
	sender_id,
	sender_role,
	target_user_id,
	content,
	is_read,
	created_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
	)
	.bind(message.message_id)
	.bind(message.suggestion_id)
	.bind(message.sender_id)
	.bind(message.sender_role.as_str())
	.bind(message.target_user_id)
	.bind(message.content.as_str())
	.bind(message.is_read)
	.bind(message.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Inserts the message and bumps the suggestion's last activity in one transaction.
pub async fn append_message(db: &Db, message: &Message) -> Result<()> {
	let mut tx = db.pool.begin().await?;

	insert_message(&mut *tx, message).await?;
	touch_activity(&mut *tx, message.suggestion_id, message.created_at).await?;

	tx.commit().await?;

	Ok(())
}

pub async fn touch_activity<'e, E>(executor: E, suggestion_id: Uuid, now: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE suggestions
SET last_activity = GREATEST(last_activity, $1)
WHERE suggestion_id = $2",
	)
	.bind(now)
	.bind(suggestion_id)
	.execute(executor)
	.await?;

	Ok(())
}

/// The whole thread, oldest first. Visibility filtering happens above this layer.
pub async fn list_messages<'e, E>(executor: E, suggestion_id: Uuid) -> Result<Vec<Message>>
where
	E: PgExecutor<'e>,
{
	let rows: Vec<MessageRow> = sqlx::query_as(
		"\
SELECT message_id, suggestion_id, sender_id, sender_role, target_user_id, content, is_read, created_at
FROM suggestion_messages
WHERE suggestion_id = $1
ORDER BY created_at ASC, seq ASC",
	)
	.bind(suggestion_id)
	.fetch_all(executor)
	.await?;

	rows.into_iter().map(Message::try_from).collect()
}

/// Flips unread messages among `message_ids`. Already-read rows are not counted.
pub async fn mark_read<'e, E>(executor: E, suggestion_id: Uuid, message_ids: &[Uuid]) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	if message_ids.is_empty() {
		return Ok(0);
	}

	let result = sqlx::query(
		"\
UPDATE suggestion_messages
SET is_read = true
WHERE suggestion_id = $1
	AND message_id = ANY($2)
	AND is_read = false",
	)
	.bind(suggestion_id)
	.bind(message_ids)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}
