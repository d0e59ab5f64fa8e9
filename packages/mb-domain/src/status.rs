use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ParseError, suggestion::Party};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
	Draft,
	AwaitingMatchmakerApproval,
	PendingFirstParty,
	FirstPartyApproved,
	FirstPartyDeclined,
	PendingSecondParty,
	SecondPartyApproved,
	SecondPartyDeclined,
	MatchDeclined,
	ContactDetailsShared,
	AwaitingFirstDateFeedback,
	Dating,
	Engaged,
	Married,
	EndedAfterFirstDate,
	Expired,
	Closed,
	Cancelled,
}
impl Status {
	pub const ALL: [Self; 18] = [
		Self::Draft,
		Self::AwaitingMatchmakerApproval,
		Self::PendingFirstParty,
		Self::FirstPartyApproved,
		Self::FirstPartyDeclined,
		Self::PendingSecondParty,
		Self::SecondPartyApproved,
		Self::SecondPartyDeclined,
		Self::MatchDeclined,
		Self::ContactDetailsShared,
		Self::AwaitingFirstDateFeedback,
		Self::Dating,
		Self::Engaged,
		Self::Married,
		Self::EndedAfterFirstDate,
		Self::Expired,
		Self::Closed,
		Self::Cancelled,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Draft => "DRAFT",
			Self::AwaitingMatchmakerApproval => "AWAITING_MATCHMAKER_APPROVAL",
			Self::PendingFirstParty => "PENDING_FIRST_PARTY",
			Self::FirstPartyApproved => "FIRST_PARTY_APPROVED",
			Self::FirstPartyDeclined => "FIRST_PARTY_DECLINED",
			Self::PendingSecondParty => "PENDING_SECOND_PARTY",
			Self::SecondPartyApproved => "SECOND_PARTY_APPROVED",
			Self::SecondPartyDeclined => "SECOND_PARTY_DECLINED",
			Self::MatchDeclined => "MATCH_DECLINED",
			Self::ContactDetailsShared => "CONTACT_DETAILS_SHARED",
			Self::AwaitingFirstDateFeedback => "AWAITING_FIRST_DATE_FEEDBACK",
			Self::Dating => "DATING",
			Self::Engaged => "ENGAGED",
			Self::Married => "MARRIED",
			Self::EndedAfterFirstDate => "ENDED_AFTER_FIRST_DATE",
			Self::Expired => "EXPIRED",
			Self::Closed => "CLOSED",
			Self::Cancelled => "CANCELLED",
		}
	}

	/// Human-readable label used in notification subjects and scoped views.
	pub fn label(self) -> &'static str {
		match self {
			Self::Draft => "Draft",
			Self::AwaitingMatchmakerApproval => "Awaiting matchmaker approval",
			Self::PendingFirstParty => "Waiting for first party",
			Self::FirstPartyApproved => "Approved by first party",
			Self::FirstPartyDeclined => "Declined by first party",
			Self::PendingSecondParty => "Waiting for second party",
			Self::SecondPartyApproved => "Approved by second party",
			Self::SecondPartyDeclined => "Declined by second party",
			Self::MatchDeclined => "Match declined",
			Self::ContactDetailsShared => "Contact details shared",
			Self::AwaitingFirstDateFeedback => "Awaiting first date feedback",
			Self::Dating => "Dating",
			Self::Engaged => "Engaged",
			Self::Married => "Married",
			Self::EndedAfterFirstDate => "Ended after first date",
			Self::Expired => "Expired",
			Self::Closed => "Closed",
			Self::Cancelled => "Cancelled",
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			Self::FirstPartyDeclined
				| Self::SecondPartyDeclined
				| Self::MatchDeclined
				| Self::EndedAfterFirstDate
				| Self::Married
				| Self::Expired
				| Self::Closed
				| Self::Cancelled
		)
	}

	/// Statuses still waiting on a decision, which the decision deadline can expire. Once contact
	/// details are shared the deadline no longer applies.
	pub fn is_awaiting_decision(self) -> bool {
		matches!(
			self,
			Self::Draft
				| Self::AwaitingMatchmakerApproval
				| Self::PendingFirstParty
				| Self::FirstPartyApproved
				| Self::PendingSecondParty
				| Self::SecondPartyApproved
		)
	}

	/// Statuses that hold a candidate in an ongoing process with someone.
	pub fn is_active_process(self) -> bool {
		matches!(
			self,
			Self::FirstPartyApproved
				| Self::SecondPartyApproved
				| Self::AwaitingMatchmakerApproval
				| Self::ContactDetailsShared
				| Self::AwaitingFirstDateFeedback
				| Self::Dating
		)
	}

	pub fn category(self) -> StatusCategory {
		match self {
			Self::Draft
			| Self::AwaitingMatchmakerApproval
			| Self::PendingFirstParty
			| Self::PendingSecondParty => StatusCategory::Pending,
			Self::FirstPartyDeclined
			| Self::SecondPartyDeclined
			| Self::MatchDeclined
			| Self::EndedAfterFirstDate
			| Self::Engaged
			| Self::Married
			| Self::Expired
			| Self::Closed
			| Self::Cancelled => StatusCategory::History,
			Self::FirstPartyApproved
			| Self::SecondPartyApproved
			| Self::ContactDetailsShared
			| Self::AwaitingFirstDateFeedback
			| Self::Dating => StatusCategory::Active,
		}
	}

	/// Both per-party declines are reported as a single declined outcome.
	pub fn reporting_status(self) -> Self {
		match self {
			Self::FirstPartyDeclined | Self::SecondPartyDeclined => Self::MatchDeclined,
			other => other,
		}
	}

	/// The party whose answer the suggestion is currently waiting on.
	pub fn pending_party(self) -> Option<Party> {
		match self {
			Self::PendingFirstParty => Some(Party::First),
			Self::PendingSecondParty => Some(Party::Second),
			_ => None,
		}
	}
}
impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Status {
	type Err = ParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|status| status.as_str() == value)
			.ok_or_else(|| ParseError::new("status", value))
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCategory {
	Pending,
	Active,
	History,
}
impl StatusCategory {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "PENDING",
			Self::Active => "ACTIVE",
			Self::History => "HISTORY",
		}
	}
}

/// Ordering hint for matchmaker queues. Never drives the workflow.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
	Low,
	#[default]
	Medium,
	High,
	Urgent,
}
impl Priority {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Low => "LOW",
			Self::Medium => "MEDIUM",
			Self::High => "HIGH",
			Self::Urgent => "URGENT",
		}
	}
}
impl FromStr for Priority {
	type Err = ParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"LOW" => Ok(Self::Low),
			"MEDIUM" => Ok(Self::Medium),
			"HIGH" => Ok(Self::High),
			"URGENT" => Ok(Self::Urgent),
			other => Err(ParseError::new("priority", other)),
		}
	}
}
