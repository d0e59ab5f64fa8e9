use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Result, models::DeliveryRecord};

pub async fn insert_delivery<'e, E>(executor: E, record: &DeliveryRecord) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO notification_deliveries (
	delivery_id,
	outbox_id,
	suggestion_id,
	recipient_id,
	channel,
	outcome,
	detail,
	created_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
	)
	.bind(record.delivery_id)
	.bind(record.outbox_id)
	.bind(record.suggestion_id)
	.bind(record.recipient_id)
	.bind(record.channel.as_str())
	.bind(record.outcome.as_str())
	.bind(record.detail.as_deref())
	.bind(record.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn list_deliveries<'e, E>(executor: E, outbox_id: Uuid) -> Result<Vec<DeliveryRecord>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as(
		"\
SELECT delivery_id, outbox_id, suggestion_id, recipient_id, channel, outcome, detail, created_at
FROM notification_deliveries
WHERE outbox_id = $1
ORDER BY created_at ASC",
	)
	.bind(outbox_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
