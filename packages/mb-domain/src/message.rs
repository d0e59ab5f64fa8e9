use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{ParseError, actor::Relation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderRole {
	Candidate,
	Matchmaker,
	System,
}
impl SenderRole {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Candidate => "CANDIDATE",
			Self::Matchmaker => "MATCHMAKER",
			Self::System => "SYSTEM",
		}
	}

	/// Staff write as the matchmaker; parties write as candidates.
	pub fn for_relation(relation: Relation) -> Option<Self> {
		match relation {
			Relation::Matchmaker | Relation::Admin => Some(Self::Matchmaker),
			Relation::FirstParty | Relation::SecondParty => Some(Self::Candidate),
			Relation::System => Some(Self::System),
			Relation::Outsider => None,
		}
	}
}
impl FromStr for SenderRole {
	type Err = ParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"CANDIDATE" => Ok(Self::Candidate),
			"MATCHMAKER" => Ok(Self::Matchmaker),
			"SYSTEM" => Ok(Self::System),
			other => Err(ParseError::new("sender role", other)),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
	pub message_id: Uuid,
	pub suggestion_id: Uuid,
	/// Absent for system-authored entries.
	pub sender_id: Option<Uuid>,
	pub sender_role: SenderRole,
	/// For matchmaker messages, the only party allowed to read it. Absent means both parties.
	pub target_user_id: Option<Uuid>,
	pub content: String,
	pub is_read: bool,
	pub created_at: OffsetDateTime,
}
impl Message {
	pub fn is_sent_by(&self, user_id: Uuid) -> bool {
		self.sender_id == Some(user_id)
	}

	/// Server-side read filter. A candidate's message never reaches the other candidate.
	pub fn visible_to(&self, viewer_id: Uuid, relation: Relation) -> bool {
		if self.is_sent_by(viewer_id) || relation.is_staff() {
			return true;
		}
		if !relation.is_party() {
			return false;
		}

		match self.sender_role {
			SenderRole::Matchmaker =>
				self.target_user_id.map(|target| target == viewer_id).unwrap_or(true),
			SenderRole::System => true,
			SenderRole::Candidate => false,
		}
	}

	/// Messages that count toward the viewer's unread badge and that `mark_read` flips.
	pub fn addressed_to(&self, viewer_id: Uuid, relation: Relation) -> bool {
		if self.is_sent_by(viewer_id) {
			return false;
		}

		match relation {
			Relation::Matchmaker | Relation::Admin => self.sender_role == SenderRole::Candidate,
			Relation::FirstParty | Relation::SecondParty => self.visible_to(viewer_id, relation),
			Relation::System | Relation::Outsider => false,
		}
	}
}

pub fn unread_count<'a, I>(messages: I, viewer_id: Uuid, relation: Relation) -> usize
where
	I: IntoIterator<Item = &'a Message>,
{
	messages
		.into_iter()
		.filter(|message| !message.is_read && message.addressed_to(viewer_id, relation))
		.count()
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	struct Thread {
		matchmaker: Uuid,
		first: Uuid,
		second: Uuid,
	}
	impl Thread {
		fn new() -> Self {
			Self { matchmaker: Uuid::new_v4(), first: Uuid::new_v4(), second: Uuid::new_v4() }
		}

		fn message(&self, sender: Option<Uuid>, role: SenderRole, target: Option<Uuid>) -> Message {
			Message {
				message_id: Uuid::new_v4(),
				suggestion_id: Uuid::nil(),
				sender_id: sender,
				sender_role: role,
				target_user_id: target,
				content: "hello".to_string(),
				is_read: false,
				created_at: datetime!(2026-05-01 12:00 UTC),
			}
		}
	}

	#[test]
	fn targeted_matchmaker_message_reaches_only_its_target() {
		let thread = Thread::new();
		let message =
			thread.message(Some(thread.matchmaker), SenderRole::Matchmaker, Some(thread.second));

		assert!(!message.visible_to(thread.first, Relation::FirstParty));
		assert!(message.visible_to(thread.second, Relation::SecondParty));
		assert!(message.visible_to(thread.matchmaker, Relation::Matchmaker));
		assert!(message.visible_to(Uuid::new_v4(), Relation::Admin));
	}

	#[test]
	fn candidate_message_never_reaches_the_other_candidate() {
		let thread = Thread::new();
		let message = thread.message(Some(thread.first), SenderRole::Candidate, None);

		assert!(message.visible_to(thread.first, Relation::FirstParty));
		assert!(!message.visible_to(thread.second, Relation::SecondParty));
		assert!(message.visible_to(thread.matchmaker, Relation::Matchmaker));
	}

	#[test]
	fn untargeted_matchmaker_message_is_broadcast_to_both_parties() {
		let thread = Thread::new();
		let message = thread.message(Some(thread.matchmaker), SenderRole::Matchmaker, None);

		assert!(message.visible_to(thread.first, Relation::FirstParty));
		assert!(message.visible_to(thread.second, Relation::SecondParty));
		assert!(!message.visible_to(Uuid::new_v4(), Relation::Outsider));
	}

	#[test]
	fn unread_badges_skip_own_and_invisible_messages() {
		let thread = Thread::new();
		let messages = vec![
			thread.message(Some(thread.first), SenderRole::Candidate, None),
			thread.message(Some(thread.second), SenderRole::Candidate, None),
			thread.message(Some(thread.matchmaker), SenderRole::Matchmaker, Some(thread.first)),
			thread.message(None, SenderRole::System, None),
		];

		assert_eq!(unread_count(&messages, thread.first, Relation::FirstParty), 2);
		assert_eq!(unread_count(&messages, thread.second, Relation::SecondParty), 1);
		assert_eq!(unread_count(&messages, thread.matchmaker, Relation::Matchmaker), 2);
	}
}
