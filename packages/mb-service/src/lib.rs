pub mod channels;
pub mod content;
pub mod dispatch;
pub mod history;
pub mod messaging;
pub mod reminders;
pub mod rfc3339;
pub mod suggestions;
pub mod transitions;

mod access;
mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

pub use dispatch::{
	ChannelAdapter, ChannelOutcome, Content, DeliveryFailure, DeliveryStatus,
	NotificationDispatcher,
};
pub use error::{Error, Result};
pub use history::{HistoryItem, HistoryQuery, HistoryResponse};
use mb_config::Config;
use mb_domain::{HistoryEntry, Message, Role, Suggestion};
use mb_storage::{
	db::Db,
	models::{DirectoryUser, SuggestionChange},
};
pub use messaging::{MarkReadResponse, MessageView, MessagesResponse, SendMessageRequest};
pub use reminders::{RemindRequest, ReminderOutcome, ResendRequest};
pub use suggestions::{CreateSuggestionRequest, SuggestionView};
pub use transitions::{
	Decision, ExpiryReport, RespondRequest, ShareContactRequest, TransitionOutcome,
	TransitionRequest,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistence seam for suggestions and everything they own.
pub trait SuggestionStore
where
	Self: Send + Sync,
{
	/// Stores a new suggestion together with its first history entry.
	fn insert_suggestion<'a>(
		&'a self,
		suggestion: &'a Suggestion,
		entry: &'a HistoryEntry,
	) -> BoxFuture<'a, Result<()>>;

	fn fetch_suggestion<'a>(&'a self, suggestion_id: Uuid) -> BoxFuture<'a, Result<Option<Suggestion>>>;

	fn has_active_process<'a>(
		&'a self,
		user_id: Uuid,
		exclude_suggestion_id: Option<Uuid>,
	) -> BoxFuture<'a, Result<bool>>;

	/// Applies `change` atomically. Returns `false`, writing nothing, when the stored version no
	/// longer matches `change.expected_version`.
	fn apply_change<'a>(&'a self, change: &'a SuggestionChange) -> BoxFuture<'a, Result<bool>>;

	fn list_history<'a>(
		&'a self,
		suggestion_id: Uuid,
		range: HistoryRange,
	) -> BoxFuture<'a, Result<Vec<HistoryEntry>>>;

	/// Stores a message and bumps the suggestion's last activity.
	fn append_message<'a>(&'a self, message: &'a Message) -> BoxFuture<'a, Result<()>>;

	fn list_messages<'a>(&'a self, suggestion_id: Uuid) -> BoxFuture<'a, Result<Vec<Message>>>;

	/// Flips `is_read` on the listed, still-unread messages and returns how many changed.
	fn mark_read<'a>(
		&'a self,
		suggestion_id: Uuid,
		message_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<u64>>;

	fn list_overdue<'a>(&'a self, now: OffsetDateTime, limit: i64) -> BoxFuture<'a, Result<Vec<Uuid>>>;
}

/// Resolves user ids to names and contact details.
pub trait Directory
where
	Self: Send + Sync,
{
	fn lookup<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, Result<Option<Contact>>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryRange {
	pub since: Option<OffsetDateTime>,
	pub until: Option<OffsetDateTime>,
	pub limit: i64,
}

/// A directory entry, which doubles as a notification recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
	pub user_id: Uuid,
	pub role: Role,
	pub display_name: String,
	pub email: String,
	pub phone: Option<String>,
	pub push_token: Option<String>,
}
impl TryFrom<DirectoryUser> for Contact {
	type Error = Error;

	fn try_from(user: DirectoryUser) -> Result<Self> {
		Ok(Self {
			user_id: user.user_id,
			role: user.role.parse()?,
			display_name: user.display_name,
			email: user.email,
			phone: user.phone.filter(|phone| !phone.trim().is_empty()),
			push_token: user.push_token.filter(|token| !token.trim().is_empty()),
		})
	}
}

pub struct MatchService {
	pub cfg: Config,
	pub store: Arc<dyn SuggestionStore>,
	pub directory: Arc<dyn Directory>,
}
impl MatchService {
	pub fn new(cfg: Config, db: Db) -> Self {
		let directory = PgDirectory::new(db.pool.clone());

		Self::with_collaborators(cfg, Arc::new(PgStore::new(db)), Arc::new(directory))
	}

	pub fn with_collaborators(
		cfg: Config,
		store: Arc<dyn SuggestionStore>,
		directory: Arc<dyn Directory>,
	) -> Self {
		Self { cfg, store, directory }
	}
}

/// The Postgres-backed [`SuggestionStore`].
pub struct PgStore {
	db: Db,
}
impl PgStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}

impl SuggestionStore for PgStore {
	fn insert_suggestion<'a>(
		&'a self,
		suggestion: &'a Suggestion,
		entry: &'a HistoryEntry,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut tx = self.db.pool.begin().await?;

			mb_storage::suggestions::insert_suggestion(&mut *tx, suggestion).await?;
			mb_storage::history::insert_history(&mut *tx, entry).await?;

			tx.commit().await?;

			Ok(())
		})
	}

	fn fetch_suggestion<'a>(&'a self, suggestion_id: Uuid) -> BoxFuture<'a, Result<Option<Suggestion>>> {
		Box::pin(async move {
			Ok(mb_storage::suggestions::fetch_suggestion(&self.db.pool, suggestion_id).await?)
		})
	}

	fn has_active_process<'a>(
		&'a self,
		user_id: Uuid,
		exclude_suggestion_id: Option<Uuid>,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(mb_storage::suggestions::has_active_process(
				&self.db.pool,
				user_id,
				exclude_suggestion_id,
			)
			.await?)
		})
	}

	fn apply_change<'a>(&'a self, change: &'a SuggestionChange) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(mb_storage::suggestions::apply_change(&self.db, change).await?) })
	}

	fn list_history<'a>(
		&'a self,
		suggestion_id: Uuid,
		range: HistoryRange,
	) -> BoxFuture<'a, Result<Vec<HistoryEntry>>> {
		Box::pin(async move {
			Ok(mb_storage::history::list_history(
				&self.db.pool,
				suggestion_id,
				range.since,
				range.until,
				range.limit,
			)
			.await?)
		})
	}

	fn append_message<'a>(&'a self, message: &'a Message) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(mb_storage::messages::append_message(&self.db, message).await?) })
	}

	fn list_messages<'a>(&'a self, suggestion_id: Uuid) -> BoxFuture<'a, Result<Vec<Message>>> {
		Box::pin(async move {
			Ok(mb_storage::messages::list_messages(&self.db.pool, suggestion_id).await?)
		})
	}

	fn mark_read<'a>(
		&'a self,
		suggestion_id: Uuid,
		message_ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			Ok(mb_storage::messages::mark_read(&self.db.pool, suggestion_id, message_ids).await?)
		})
	}

	fn list_overdue<'a>(&'a self, now: OffsetDateTime, limit: i64) -> BoxFuture<'a, Result<Vec<Uuid>>> {
		Box::pin(async move {
			Ok(mb_storage::suggestions::list_overdue(&self.db.pool, now, limit).await?)
		})
	}
}

/// Reads contacts from the `mb_users` table.
pub struct PgDirectory {
	pool: PgPool,
}
impl PgDirectory {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

impl Directory for PgDirectory {
	fn lookup<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, Result<Option<Contact>>> {
		Box::pin(async move {
			mb_storage::directory::fetch_user(&self.pool, user_id)
				.await?
				.map(Contact::try_from)
				.transpose()
		})
	}
}
