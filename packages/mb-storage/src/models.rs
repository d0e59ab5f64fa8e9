use time::OffsetDateTime;
use uuid::Uuid;

use mb_domain::{
	HistoryEntry, Message, NotificationIntent, Suggestion, notification::NotificationKind,
};

use crate::Error;

#[derive(Debug, sqlx::FromRow)]
pub struct SuggestionRow {
	pub suggestion_id: Uuid,
	pub matchmaker_id: Uuid,
	pub first_party_id: Uuid,
	pub second_party_id: Uuid,
	pub status: String,
	pub previous_status: Option<String>,
	pub category: String,
	pub priority: String,
	pub matching_reason: Option<String>,
	pub first_party_notes: Option<String>,
	pub second_party_notes: Option<String>,
	pub internal_notes: Option<String>,
	pub follow_up_notes: Option<String>,
	pub response_deadline: Option<OffsetDateTime>,
	pub decision_deadline: Option<OffsetDateTime>,
	pub first_party_sent: Option<OffsetDateTime>,
	pub first_party_responded: Option<OffsetDateTime>,
	pub second_party_sent: Option<OffsetDateTime>,
	pub second_party_responded: Option<OffsetDateTime>,
	pub first_party_reminded_at: Option<OffsetDateTime>,
	pub second_party_reminded_at: Option<OffsetDateTime>,
	pub first_party_reminders: i32,
	pub second_party_reminders: i32,
	pub last_status_change: OffsetDateTime,
	pub last_activity: OffsetDateTime,
	pub closed_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub version: i64,
}
impl TryFrom<SuggestionRow> for Suggestion {
	type Error = Error;

	fn try_from(row: SuggestionRow) -> Result<Self, Self::Error> {
		let status: mb_domain::Status = row.status.parse()?;
		let previous_status: Option<mb_domain::Status> =
			row.previous_status.as_deref().map(str::parse).transpose()?;

		Ok(Self {
			suggestion_id: row.suggestion_id,
			matchmaker_id: row.matchmaker_id,
			first_party_id: row.first_party_id,
			second_party_id: row.second_party_id,
			status,
			previous_status,
			// Derived, so a stale stored category can never disagree with the status.
			category: status.category(),
			priority: row.priority.parse()?,
			matching_reason: row.matching_reason,
			first_party_notes: row.first_party_notes,
			second_party_notes: row.second_party_notes,
			internal_notes: row.internal_notes,
			follow_up_notes: row.follow_up_notes,
			response_deadline: row.response_deadline,
			decision_deadline: row.decision_deadline,
			first_party_sent: row.first_party_sent,
			first_party_responded: row.first_party_responded,
			second_party_sent: row.second_party_sent,
			second_party_responded: row.second_party_responded,
			first_party_reminded_at: row.first_party_reminded_at,
			second_party_reminded_at: row.second_party_reminded_at,
			first_party_reminders: row.first_party_reminders,
			second_party_reminders: row.second_party_reminders,
			last_status_change: row.last_status_change,
			last_activity: row.last_activity,
			closed_at: row.closed_at,
			created_at: row.created_at,
			updated_at: row.updated_at,
			version: row.version,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct HistoryRow {
	pub entry_id: Uuid,
	pub suggestion_id: Uuid,
	pub status: String,
	pub notes: String,
	pub actor_id: Option<Uuid>,
	pub created_at: OffsetDateTime,
}
impl TryFrom<HistoryRow> for HistoryEntry {
	type Error = Error;

	fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
		Ok(Self {
			entry_id: row.entry_id,
			suggestion_id: row.suggestion_id,
			status: row.status.parse()?,
			notes: row.notes,
			actor_id: row.actor_id,
			created_at: row.created_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRow {
	pub message_id: Uuid,
	pub suggestion_id: Uuid,
	pub sender_id: Option<Uuid>,
	pub sender_role: String,
	pub target_user_id: Option<Uuid>,
	pub content: String,
	pub is_read: bool,
	pub created_at: OffsetDateTime,
}
impl TryFrom<MessageRow> for Message {
	type Error = Error;

	fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
		Ok(Self {
			message_id: row.message_id,
			suggestion_id: row.suggestion_id,
			sender_id: row.sender_id,
			sender_role: row.sender_role.parse()?,
			target_user_id: row.target_user_id,
			content: row.content,
			is_read: row.is_read,
			created_at: row.created_at,
		})
	}
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct NotificationOutboxEntry {
	pub outbox_id: Uuid,
	pub suggestion_id: Uuid,
	pub recipient_id: Uuid,
	pub audience: String,
	pub kind: String,
	pub status_entered: String,
	pub counterpart_id: Option<Uuid>,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl NotificationOutboxEntry {
	pub fn kind(&self) -> Result<NotificationKind, Error> {
		Ok(self.kind.parse()?)
	}

	pub fn status_entered(&self) -> Result<mb_domain::Status, Error> {
		Ok(self.status_entered.parse()?)
	}

	/// Rebuilds the intent that was handed off.
	pub fn intent(&self) -> Result<NotificationIntent, Error> {
		Ok(NotificationIntent {
			recipient_id: self.recipient_id,
			audience: self.audience.parse()?,
			kind: self.kind()?,
			status: self.status_entered()?,
			counterpart_id: self.counterpart_id,
		})
	}
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct DirectoryUser {
	pub user_id: Uuid,
	pub role: String,
	pub display_name: String,
	pub email: String,
	pub phone: Option<String>,
	pub push_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct DeliveryRecord {
	pub delivery_id: Uuid,
	pub outbox_id: Uuid,
	pub suggestion_id: Uuid,
	pub recipient_id: Uuid,
	pub channel: String,
	/// One of "SENT", "FAILED", or "SKIPPED".
	pub outcome: String,
	pub detail: Option<String>,
	pub created_at: OffsetDateTime,
}

/// One atomic write against a suggestion: the versioned row update, its audit entry, any
/// notifications to hand off, and an optional thread message.
#[derive(Clone, Debug)]
pub struct SuggestionChange {
	pub suggestion: Suggestion,
	pub expected_version: i64,
	pub history: HistoryEntry,
	pub notifications: Vec<NotificationIntent>,
	pub message: Option<Message>,
}
