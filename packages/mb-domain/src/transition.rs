use std::{
	collections::{BTreeMap, BTreeSet},
	fmt,
	sync::LazyLock,
};

use serde::{Deserialize, Serialize};

use crate::{
	actor::{Actor, Relation},
	status::Status,
	suggestion::Suggestion,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	SendToFirstParty,
	ResendToFirstParty,
	SendToSecondParty,
	ResendToSecondParty,
	Approve,
	Decline,
	HoldForReview,
	ShareContact,
	RejectMatch,
	RequestFeedback,
	StartDating,
	EndAfterFirstDate,
	Engage,
	Marry,
	Close,
	Cancel,
	Expire,
}
impl Action {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::SendToFirstParty => "send_to_first_party",
			Self::ResendToFirstParty => "resend_to_first_party",
			Self::SendToSecondParty => "send_to_second_party",
			Self::ResendToSecondParty => "resend_to_second_party",
			Self::Approve => "approve",
			Self::Decline => "decline",
			Self::HoldForReview => "hold_for_review",
			Self::ShareContact => "share_contact",
			Self::RejectMatch => "reject_match",
			Self::RequestFeedback => "request_feedback",
			Self::StartDating => "start_dating",
			Self::EndAfterFirstDate => "end_after_first_date",
			Self::Engage => "engage",
			Self::Marry => "marry",
			Self::Close => "close",
			Self::Cancel => "cancel",
			Self::Expire => "expire",
		}
	}
}
impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One legal `(from, action) -> to` edge and the relations allowed to take it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rule {
	pub from: Status,
	pub action: Action,
	pub to: Status,
	pub allowed: &'static [Relation],
}
impl Rule {
	pub fn permits(&self, relation: Relation) -> bool {
		self.allowed.contains(&relation)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
	#[error("Cannot move from {from} to {to}: {reason}.")]
	Illegal { from: Status, to: Status, reason: String },
	#[error("A {relation} may not {action} a suggestion in {from}.")]
	NotPermitted { from: Status, action: Action, relation: Relation },
}

const STAFF: &[Relation] = &[Relation::Matchmaker, Relation::Admin];
const STAFF_OR_SYSTEM: &[Relation] = &[Relation::Matchmaker, Relation::Admin, Relation::System];
const FIRST_PARTY_OR_STAFF: &[Relation] =
	&[Relation::FirstParty, Relation::Matchmaker, Relation::Admin];
const SECOND_PARTY_OR_STAFF: &[Relation] =
	&[Relation::SecondParty, Relation::Matchmaker, Relation::Admin];
const PARTIES_OR_STAFF: &[Relation] =
	&[Relation::FirstParty, Relation::SecondParty, Relation::Matchmaker, Relation::Admin];

const FORWARD_RULES: &[(Status, Action, Status, &[Relation])] = &[
	(Status::Draft, Action::SendToFirstParty, Status::PendingFirstParty, STAFF),
	(Status::PendingFirstParty, Action::ResendToFirstParty, Status::PendingFirstParty, STAFF_OR_SYSTEM),
	(Status::PendingFirstParty, Action::Approve, Status::FirstPartyApproved, FIRST_PARTY_OR_STAFF),
	(Status::PendingFirstParty, Action::Decline, Status::FirstPartyDeclined, FIRST_PARTY_OR_STAFF),
	(Status::FirstPartyApproved, Action::SendToSecondParty, Status::PendingSecondParty, STAFF),
	(Status::FirstPartyApproved, Action::ShareContact, Status::ContactDetailsShared, STAFF),
	(Status::PendingSecondParty, Action::ResendToSecondParty, Status::PendingSecondParty, STAFF_OR_SYSTEM),
	(Status::PendingSecondParty, Action::Approve, Status::SecondPartyApproved, SECOND_PARTY_OR_STAFF),
	(Status::PendingSecondParty, Action::Decline, Status::SecondPartyDeclined, SECOND_PARTY_OR_STAFF),
	(Status::SecondPartyApproved, Action::HoldForReview, Status::AwaitingMatchmakerApproval, STAFF),
	(Status::SecondPartyApproved, Action::ShareContact, Status::ContactDetailsShared, STAFF),
	(Status::AwaitingMatchmakerApproval, Action::ShareContact, Status::ContactDetailsShared, STAFF),
	(Status::AwaitingMatchmakerApproval, Action::RejectMatch, Status::MatchDeclined, STAFF),
	(Status::ContactDetailsShared, Action::RequestFeedback, Status::AwaitingFirstDateFeedback, PARTIES_OR_STAFF),
	(Status::ContactDetailsShared, Action::StartDating, Status::Dating, PARTIES_OR_STAFF),
	(Status::AwaitingFirstDateFeedback, Action::StartDating, Status::Dating, PARTIES_OR_STAFF),
	(Status::AwaitingFirstDateFeedback, Action::EndAfterFirstDate, Status::EndedAfterFirstDate, PARTIES_OR_STAFF),
	(Status::Dating, Action::Engage, Status::Engaged, STAFF),
	(Status::Engaged, Action::Marry, Status::Married, STAFF),
];

/// Exits available from every non-terminal status.
const EXIT_RULES: &[(Action, Status, &[Relation])] = &[
	(Action::Close, Status::Closed, STAFF),
	(Action::Cancel, Status::Cancelled, STAFF),
	(Action::Expire, Status::Expired, STAFF_OR_SYSTEM),
];

static TABLE: LazyLock<BTreeMap<(Status, Action), Rule>> = LazyLock::new(|| {
	let mut table = BTreeMap::new();

	for &(from, action, to, allowed) in FORWARD_RULES {
		table.insert((from, action), Rule { from, action, to, allowed });
	}
	for from in Status::ALL.into_iter().filter(|status| !status.is_terminal()) {
		for &(action, to, allowed) in EXIT_RULES {
			table.insert((from, action), Rule { from, action, to, allowed });
		}
	}

	table
});

pub fn rule_for(from: Status, action: Action) -> Option<Rule> {
	TABLE.get(&(from, action)).copied()
}

pub fn rules_from(from: Status) -> impl Iterator<Item = Rule> {
	TABLE.range((from, Action::SendToFirstParty)..=(from, Action::Expire)).map(|(_, rule)| *rule)
}

/// Finds the edge that moves `from` into `to`, or explains why none exists.
pub fn resolve(from: Status, to: Status) -> Result<Rule, TransitionError> {
	rules_from(from)
		.find(|rule| rule.to == to)
		.ok_or_else(|| TransitionError::Illegal { from, to, reason: illegal_reason(from, to) })
}

pub fn authorize(rule: &Rule, relation: Relation) -> Result<(), TransitionError> {
	if rule.permits(relation) {
		Ok(())
	} else {
		Err(TransitionError::NotPermitted { from: rule.from, action: rule.action, relation })
	}
}

/// Every transition action `actor` could take on `suggestion` right now.
pub fn allowed_actions(actor: &Actor, suggestion: &Suggestion) -> BTreeSet<Action> {
	let relation = actor.relation_to(suggestion);

	rules_from(suggestion.status)
		.filter(|rule| rule.permits(relation))
		.map(|rule| rule.action)
		.collect()
}

fn illegal_reason(from: Status, to: Status) -> String {
	if from.is_terminal() {
		return format!("{from} is a terminal status");
	}

	match to {
		Status::ContactDetailsShared => "cannot share contact before both parties approve".to_string(),
		Status::Draft => "a suggestion cannot return to draft".to_string(),
		Status::FirstPartyApproved | Status::FirstPartyDeclined =>
			"the first party can only respond while the suggestion is pending with them".to_string(),
		Status::SecondPartyApproved | Status::SecondPartyDeclined =>
			"the second party can only respond while the suggestion is pending with them".to_string(),
		Status::PendingFirstParty => "only a draft can be sent to the first party".to_string(),
		Status::PendingSecondParty =>
			"the second party is contacted only after the first party approves".to_string(),
		_ => format!("no transition from {from} to {to}"),
	}
}
