use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
	ParseError,
	actor::Relation,
	status::Status,
	suggestion::{Party, Suggestion},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
	Email,
	Whatsapp,
	Push,
}
impl Channel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Email => "email",
			Self::Whatsapp => "whatsapp",
			Self::Push => "push",
		}
	}
}
impl fmt::Display for Channel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Channel {
	type Err = ParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"email" => Ok(Self::Email),
			"whatsapp" => Ok(Self::Whatsapp),
			"push" => Ok(Self::Push),
			other => Err(ParseError::new("channel", other)),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
	StatusChanged,
	Reminder,
	Resent,
	ContactShared,
}
impl NotificationKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::StatusChanged => "STATUS_CHANGED",
			Self::Reminder => "REMINDER",
			Self::Resent => "RESENT",
			Self::ContactShared => "CONTACT_SHARED",
		}
	}
}
impl FromStr for NotificationKind {
	type Err = ParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"STATUS_CHANGED" => Ok(Self::StatusChanged),
			"REMINDER" => Ok(Self::Reminder),
			"RESENT" => Ok(Self::Resent),
			"CONTACT_SHARED" => Ok(Self::ContactShared),
			other => Err(ParseError::new("notification kind", other)),
		}
	}
}

/// Who must hear about a workflow event and in what framing. Content is rendered later, at
/// delivery time, from the recipient's directory entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
	pub recipient_id: Uuid,
	pub audience: Relation,
	pub kind: NotificationKind,
	pub status: Status,
	/// The other party, for contact-sharing notices.
	pub counterpart_id: Option<Uuid>,
}

/// Audience notified when a suggestion enters `status`.
pub fn audience_for(status: Status) -> &'static [Relation] {
	match status {
		Status::PendingFirstParty => &[Relation::FirstParty],
		Status::PendingSecondParty => &[Relation::SecondParty],
		Status::ContactDetailsShared | Status::AwaitingFirstDateFeedback =>
			&[Relation::FirstParty, Relation::SecondParty],
		Status::Engaged | Status::Married =>
			&[Relation::FirstParty, Relation::SecondParty, Relation::Matchmaker],
		_ => &[Relation::Matchmaker],
	}
}

/// Plans the notices for a suggestion that just entered its current status. The acting user is
/// never told about their own action.
pub fn plan_status_change(suggestion: &Suggestion, actor_id: Uuid) -> Vec<NotificationIntent> {
	audience_for(suggestion.status)
		.iter()
		.filter_map(|&audience| {
			let recipient_id = recipient_for(suggestion, audience)?;

			(recipient_id != actor_id).then_some(NotificationIntent {
				recipient_id,
				audience,
				kind: NotificationKind::StatusChanged,
				status: suggestion.status,
				counterpart_id: None,
			})
		})
		.collect()
}

pub fn plan_reminder(suggestion: &Suggestion, party: Party) -> NotificationIntent {
	party_intent(suggestion, party, NotificationKind::Reminder, None)
}

pub fn plan_resend(suggestion: &Suggestion, party: Party) -> NotificationIntent {
	party_intent(suggestion, party, NotificationKind::Resent, None)
}

/// Each party learns how to reach the other.
pub fn plan_contact_share(suggestion: &Suggestion) -> Vec<NotificationIntent> {
	[Party::First, Party::Second]
		.into_iter()
		.map(|party| {
			let counterpart = suggestion.party_id(party.other());

			party_intent(suggestion, party, NotificationKind::ContactShared, Some(counterpart))
		})
		.collect()
}

fn party_intent(
	suggestion: &Suggestion,
	party: Party,
	kind: NotificationKind,
	counterpart_id: Option<Uuid>,
) -> NotificationIntent {
	let audience = match party {
		Party::First => Relation::FirstParty,
		Party::Second => Relation::SecondParty,
	};

	NotificationIntent {
		recipient_id: suggestion.party_id(party),
		audience,
		kind,
		status: suggestion.status,
		counterpart_id,
	}
}

fn recipient_for(suggestion: &Suggestion, audience: Relation) -> Option<Uuid> {
	match audience {
		Relation::FirstParty => Some(suggestion.first_party_id),
		Relation::SecondParty => Some(suggestion.second_party_id),
		Relation::Matchmaker => Some(suggestion.matchmaker_id),
		Relation::Admin | Relation::System | Relation::Outsider => None,
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn in_status(status: Status) -> Suggestion {
		let mut suggestion = Suggestion::draft(
			Uuid::new_v4(),
			Uuid::new_v4(),
			Uuid::new_v4(),
			datetime!(2026-04-01 09:00 UTC),
		);

		suggestion.status = status;

		suggestion
	}

	#[test]
	fn pending_second_party_notifies_only_the_second_party() {
		let suggestion = in_status(Status::PendingSecondParty);
		let intents = plan_status_change(&suggestion, suggestion.matchmaker_id);

		assert_eq!(intents.len(), 1);
		assert_eq!(intents[0].recipient_id, suggestion.second_party_id);
		assert_eq!(intents[0].kind, NotificationKind::StatusChanged);
	}

	#[test]
	fn party_response_notifies_matchmaker_but_not_the_responder() {
		let suggestion = in_status(Status::FirstPartyApproved);
		let intents = plan_status_change(&suggestion, suggestion.first_party_id);

		assert_eq!(intents.len(), 1);
		assert_eq!(intents[0].recipient_id, suggestion.matchmaker_id);
	}

	#[test]
	fn acting_matchmaker_is_skipped_on_engagement() {
		let suggestion = in_status(Status::Engaged);
		let intents = plan_status_change(&suggestion, suggestion.matchmaker_id);
		let recipients = intents.iter().map(|intent| intent.recipient_id).collect::<Vec<_>>();

		assert_eq!(recipients, vec![suggestion.first_party_id, suggestion.second_party_id]);
	}

	#[test]
	fn contact_share_names_each_counterpart() {
		let suggestion = in_status(Status::ContactDetailsShared);
		let intents = plan_contact_share(&suggestion);

		assert_eq!(intents.len(), 2);
		assert_eq!(intents[0].recipient_id, suggestion.first_party_id);
		assert_eq!(intents[0].counterpart_id, Some(suggestion.second_party_id));
		assert_eq!(intents[1].recipient_id, suggestion.second_party_id);
		assert_eq!(intents[1].counterpart_id, Some(suggestion.first_party_id));
	}
}
