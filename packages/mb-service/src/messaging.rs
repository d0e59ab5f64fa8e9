use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use mb_domain::{Actor, Message, Relation, SenderRole, Suggestion, message};

use crate::{Error, MatchService, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct SendMessageRequest {
	pub content: String,
	#[serde(default, alias = "targetUserId")]
	pub target_user_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageView {
	pub message_id: Uuid,
	pub sender_id: Option<Uuid>,
	pub sender_role: SenderRole,
	pub target_user_id: Option<Uuid>,
	pub content: String,
	pub is_read: bool,
	pub is_own: bool,
	#[serde(with = "crate::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl MessageView {
	fn new(message: Message, viewer_id: Uuid) -> Self {
		Self {
			is_own: message.is_sent_by(viewer_id),
			message_id: message.message_id,
			sender_id: message.sender_id,
			sender_role: message.sender_role,
			target_user_id: message.target_user_id,
			content: message.content,
			is_read: message.is_read,
			created_at: message.created_at,
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct MessagesResponse {
	pub messages: Vec<MessageView>,
	pub unread_count: usize,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct MarkReadResponse {
	pub updated: u64,
}

impl MatchService {
	/// The thread as the requester may see it, oldest first.
	pub async fn list_messages(&self, actor: &Actor, suggestion_id: Uuid) -> Result<MessagesResponse> {
		let (_, relation) = self.load_for(actor, suggestion_id).await?;
		let messages = self.store.list_messages(suggestion_id).await?;
		let unread_count = message::unread_count(&messages, actor.user_id, relation);
		let messages = messages
			.into_iter()
			.filter(|message| message.visible_to(actor.user_id, relation))
			.map(|message| MessageView::new(message, actor.user_id))
			.collect();

		Ok(MessagesResponse { messages, unread_count })
	}

	pub async fn send_message(
		&self,
		actor: &Actor,
		suggestion_id: Uuid,
		req: SendMessageRequest,
	) -> Result<MessageView> {
		let (suggestion, relation) = self.load_for(actor, suggestion_id).await?;
		let sender_role = SenderRole::for_relation(relation)
			.ok_or_else(|| Error::forbidden("You cannot write to this suggestion's thread."))?;
		let content = req.content.trim();

		if content.is_empty() {
			return Err(Error::invalid("Message content must not be empty."));
		}

		let max_chars = self.cfg.messaging.max_message_chars;

		if content.chars().count() > max_chars {
			return Err(Error::invalid(format!(
				"Message content must be at most {max_chars} characters."
			)));
		}

		let target_user_id = self.resolve_target(&suggestion, relation, req.target_user_id)?;
		let message = Message {
			message_id: Uuid::new_v4(),
			suggestion_id,
			sender_id: (sender_role != SenderRole::System).then_some(actor.user_id),
			sender_role,
			target_user_id,
			content: content.to_string(),
			is_read: false,
			created_at: OffsetDateTime::now_utc(),
		};

		self.store.append_message(&message).await?;

		tracing::info!(
			suggestion_id = %suggestion_id,
			message_id = %message.message_id,
			sender_role = sender_role.as_str(),
			"Message sent."
		);

		Ok(MessageView::new(message, actor.user_id))
	}

	/// Marks everything addressed to the requester as read and reports how many changed.
	pub async fn mark_read(&self, actor: &Actor, suggestion_id: Uuid) -> Result<MarkReadResponse> {
		let (_, relation) = self.load_for(actor, suggestion_id).await?;
		let unread = self
			.store
			.list_messages(suggestion_id)
			.await?
			.into_iter()
			.filter(|message| !message.is_read && message.addressed_to(actor.user_id, relation))
			.map(|message| message.message_id)
			.collect::<Vec<_>>();

		if unread.is_empty() {
			return Ok(MarkReadResponse { updated: 0 });
		}

		let updated = self.store.mark_read(suggestion_id, &unread).await?;

		Ok(MarkReadResponse { updated })
	}

	/// Candidates always write to the matchmaker, so only staff messages keep a target.
	fn resolve_target(
		&self,
		suggestion: &Suggestion,
		relation: Relation,
		target_user_id: Option<Uuid>,
	) -> Result<Option<Uuid>> {
		if let Some(target) = target_user_id
			&& suggestion.party_of(target).is_none()
		{
			return Err(Error::InvalidTarget {
				message: format!("User {target} is not a party to this suggestion."),
			});
		}

		match relation {
			Relation::FirstParty | Relation::SecondParty => Ok(None),
			Relation::Matchmaker | Relation::Admin
				if target_user_id.is_none() && self.cfg.messaging.require_matchmaker_target =>
				Err(Error::InvalidTarget {
					message: "Matchmaker messages must name the party they are for.".to_string(),
				}),
			_ => Ok(target_user_id),
		}
	}
}
