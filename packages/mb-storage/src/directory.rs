use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{Result, models::DirectoryUser};

pub async fn fetch_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<DirectoryUser>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as(
		"\
SELECT user_id, role, display_name, email, phone, push_token
FROM mb_users
WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn upsert_user<'e, E>(executor: E, user: &DirectoryUser) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO mb_users (user_id, role, display_name, email, phone, push_token)
VALUES ($1,$2,$3,$4,$5,$6)
ON CONFLICT (user_id) DO UPDATE
SET role = EXCLUDED.role,
	display_name = EXCLUDED.display_name,
	email = EXCLUDED.email,
	phone = EXCLUDED.phone,
	push_token = EXCLUDED.push_token",
	)
	.bind(user.user_id)
	.bind(user.role.as_str())
	.bind(user.display_name.as_str())
	.bind(user.email.as_str())
	.bind(user.phone.as_deref())
	.bind(user.push_token.as_deref())
	.execute(executor)
	.await?;

	Ok(())
}
