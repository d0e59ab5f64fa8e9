use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	ParseError,
	status::{Priority, Status, StatusCategory},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
	First,
	Second,
}
impl Party {
	pub fn pending_status(self) -> Status {
		match self {
			Self::First => Status::PendingFirstParty,
			Self::Second => Status::PendingSecondParty,
		}
	}

	pub fn other(self) -> Self {
		match self {
			Self::First => Self::Second,
			Self::Second => Self::First,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::First => "first",
			Self::Second => "second",
		}
	}
}

/// Which parties a reminder or resend addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyType {
	First,
	Second,
	Both,
}
impl PartyType {
	pub fn parties(self) -> &'static [Party] {
		match self {
			Self::First => &[Party::First],
			Self::Second => &[Party::Second],
			Self::Both => &[Party::First, Party::Second],
		}
	}
}
impl FromStr for PartyType {
	type Err = ParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"first" => Ok(Self::First),
			"second" => Ok(Self::Second),
			"both" => Ok(Self::Both),
			other => Err(ParseError::new("party type", other)),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
	pub suggestion_id: Uuid,
	pub matchmaker_id: Uuid,
	pub first_party_id: Uuid,
	pub second_party_id: Uuid,
	pub status: Status,
	pub previous_status: Option<Status>,
	pub category: StatusCategory,
	pub priority: Priority,
	pub matching_reason: Option<String>,
	/// Shown to the first party only.
	pub first_party_notes: Option<String>,
	/// Shown to the second party only.
	pub second_party_notes: Option<String>,
	/// Matchmaker and admin only.
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
impl Suggestion {
	pub fn draft(
		matchmaker_id: Uuid,
		first_party_id: Uuid,
		second_party_id: Uuid,
		now: OffsetDateTime,
	) -> Self {
		Self {
			suggestion_id: Uuid::new_v4(),
			matchmaker_id,
			first_party_id,
			second_party_id,
			status: Status::Draft,
			previous_status: None,
			category: Status::Draft.category(),
			priority: Priority::default(),
			matching_reason: None,
			first_party_notes: None,
			second_party_notes: None,
			internal_notes: None,
			follow_up_notes: None,
			response_deadline: None,
			decision_deadline: None,
			first_party_sent: None,
			first_party_responded: None,
			second_party_sent: None,
			second_party_responded: None,
			first_party_reminded_at: None,
			second_party_reminded_at: None,
			first_party_reminders: 0,
			second_party_reminders: 0,
			last_status_change: now,
			last_activity: now,
			closed_at: None,
			created_at: now,
			updated_at: now,
			version: 0,
		}
	}

	pub fn party_id(&self, party: Party) -> Uuid {
		match party {
			Party::First => self.first_party_id,
			Party::Second => self.second_party_id,
		}
	}

	pub fn party_of(&self, user_id: Uuid) -> Option<Party> {
		if user_id == self.first_party_id {
			Some(Party::First)
		} else if user_id == self.second_party_id {
			Some(Party::Second)
		} else {
			None
		}
	}

	pub fn party_notes(&self, party: Party) -> Option<&str> {
		match party {
			Party::First => self.first_party_notes.as_deref(),
			Party::Second => self.second_party_notes.as_deref(),
		}
	}

	pub fn sent_at(&self, party: Party) -> Option<OffsetDateTime> {
		match party {
			Party::First => self.first_party_sent,
			Party::Second => self.second_party_sent,
		}
	}

	pub fn last_reminded_at(&self, party: Party) -> Option<OffsetDateTime> {
		match party {
			Party::First => self.first_party_reminded_at,
			Party::Second => self.second_party_reminded_at,
		}
	}

	pub fn reminder_count(&self, party: Party) -> i32 {
		match party {
			Party::First => self.first_party_reminders,
			Party::Second => self.second_party_reminders,
		}
	}

	pub fn is_past_decision_deadline(&self, now: OffsetDateTime) -> bool {
		self.decision_deadline.map(|deadline| deadline <= now).unwrap_or(false)
	}

	/// Moves the record into `to` and applies the timestamp effects tied to the entered status.
	///
	/// Re-entering the current pending status refreshes the matching "sent" timestamp, which is
	/// how resends are represented.
	pub fn apply_transition(&mut self, to: Status, now: OffsetDateTime) {
		self.previous_status = Some(self.status);
		self.status = to;
		self.category = to.category();
		self.last_status_change = now;
		self.last_activity = now;
		self.updated_at = now;
		self.version += 1;

		match to {
			Status::PendingFirstParty => self.first_party_sent = Some(now),
			Status::PendingSecondParty => self.second_party_sent = Some(now),
			Status::FirstPartyApproved | Status::FirstPartyDeclined =>
				self.first_party_responded = Some(now),
			Status::SecondPartyApproved | Status::SecondPartyDeclined =>
				self.second_party_responded = Some(now),
			_ => {},
		}

		if to.is_terminal() {
			self.closed_at = Some(now);
		}
	}

	/// Records a reminder without touching the status.
	pub fn record_reminder(&mut self, party: Party, now: OffsetDateTime) {
		match party {
			Party::First => {
				self.first_party_reminded_at = Some(now);
				self.first_party_reminders += 1;
			},
			Party::Second => {
				self.second_party_reminded_at = Some(now);
				self.second_party_reminders += 1;
			},
		}

		self.last_activity = now;
		self.updated_at = now;
		self.version += 1;
	}
}

/// Append-only audit record. One per applied transition, plus status-preserving annotations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
	pub entry_id: Uuid,
	pub suggestion_id: Uuid,
	pub status: Status,
	pub notes: String,
	pub actor_id: Option<Uuid>,
	pub created_at: OffsetDateTime,
}
impl HistoryEntry {
	pub fn new(
		suggestion_id: Uuid,
		status: Status,
		notes: impl Into<String>,
		actor_id: Option<Uuid>,
		created_at: OffsetDateTime,
	) -> Self {
		Self {
			entry_id: Uuid::new_v4(),
			suggestion_id,
			status,
			notes: notes.into(),
			actor_id,
			created_at,
		}
	}

	pub fn default_notes(from: Status, to: Status) -> String {
		format!("Status changed from {from} to {to}.")
	}
}
