use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use mb_domain::{
	Actor, HistoryEntry, Message, NotificationIntent, Party, Relation, Role, SenderRole, Status,
	Suggestion, notification, transition,
};
use mb_storage::models::SuggestionChange;

use crate::{Error, MatchService, Result, SuggestionView, access};

pub(crate) const CONTACT_SHARED_MESSAGE: &str = "Contact details were shared.";

const EXPIRY_BATCH: i64 = 100;
const EXPIRY_NOTE: &str = "Decision deadline passed.";

#[derive(Clone, Debug, Deserialize)]
pub struct TransitionRequest {
	#[serde(alias = "targetState", alias = "target_state")]
	pub status: Status,
	#[serde(default)]
	pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
	Approve,
	Decline,
}
impl Decision {
	pub fn target_for(self, party: Party) -> Status {
		match (self, party) {
			(Self::Approve, Party::First) => Status::FirstPartyApproved,
			(Self::Decline, Party::First) => Status::FirstPartyDeclined,
			(Self::Approve, Party::Second) => Status::SecondPartyApproved,
			(Self::Decline, Party::Second) => Status::SecondPartyDeclined,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct RespondRequest {
	pub decision: Decision,
	#[serde(default)]
	pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ShareContactRequest {
	#[serde(default)]
	pub notes: Option<String>,
}

/// The authoritative new state plus the side effects the change produced.
#[derive(Clone, Debug, Serialize)]
pub struct TransitionOutcome {
	pub suggestion: SuggestionView,
	pub history_entry_id: Uuid,
	pub notifications: Vec<NotificationIntent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExpiryReport {
	pub expired: Vec<Uuid>,
	pub skipped: Vec<Uuid>,
}

/// How a transition's notifications are framed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Framing {
	StatusChange,
	Resend(Party),
	ContactShare,
}
impl Framing {
	fn default_notes(self, from: Status, to: Status) -> String {
		match self {
			Self::StatusChange => HistoryEntry::default_notes(from, to),
			Self::Resend(party) => format!("Suggestion resent to the {} party.", party.as_str()),
			Self::ContactShare => "Contact details shared with both parties.".to_string(),
		}
	}
}

impl MatchService {
	/// Staff-driven status change, validated against the transition table.
	pub async fn transition_status(
		&self,
		actor: &Actor,
		suggestion_id: Uuid,
		req: TransitionRequest,
	) -> Result<TransitionOutcome> {
		let (suggestion, relation) = self.load_for(actor, suggestion_id).await?;

		access::ensure_staff(relation)?;

		let framing = match suggestion.status.pending_party() {
			Some(party) if suggestion.status == req.status => Framing::Resend(party),
			_ if req.status == Status::ContactDetailsShared => Framing::ContactShare,
			_ => Framing::StatusChange,
		};

		self.apply_transition(actor, suggestion, req.status, req.notes, framing, OffsetDateTime::now_utc())
			.await
	}

	/// A party's answer to a suggestion pending with them.
	pub async fn respond(
		&self,
		actor: &Actor,
		suggestion_id: Uuid,
		req: RespondRequest,
	) -> Result<TransitionOutcome> {
		let (suggestion, relation) = self.load_for(actor, suggestion_id).await?;
		let party = match relation {
			Relation::FirstParty => Party::First,
			Relation::SecondParty => Party::Second,
			_ => return Err(Error::forbidden("Only a party to the suggestion can respond to it.")),
		};
		let target = req.decision.target_for(party);

		transition::resolve(suggestion.status, target)?;

		if req.decision == Decision::Approve
			&& self.cfg.workflow.single_active_process
			&& self.store.has_active_process(actor.user_id, Some(suggestion_id)).await?
		{
			return Err(Error::Conflict {
				message: "You already have another suggestion in progress.".to_string(),
			});
		}

		self.apply_transition(
			actor,
			suggestion,
			target,
			req.notes,
			Framing::StatusChange,
			OffsetDateTime::now_utc(),
		)
		.await
	}

	/// Introduces the parties once both have approved.
	pub async fn share_contact(
		&self,
		actor: &Actor,
		suggestion_id: Uuid,
		req: ShareContactRequest,
	) -> Result<TransitionOutcome> {
		let (suggestion, relation) = self.load_for(actor, suggestion_id).await?;

		access::ensure_staff(relation)?;

		let from = suggestion.status;

		transition::resolve(from, Status::ContactDetailsShared)?;

		if !matches!(from, Status::SecondPartyApproved | Status::AwaitingMatchmakerApproval) {
			return Err(Error::IllegalTransition {
				from,
				to: Status::ContactDetailsShared,
				reason: "cannot share contact before both parties approve".to_string(),
			});
		}

		self.apply_transition(
			actor,
			suggestion,
			Status::ContactDetailsShared,
			req.notes,
			Framing::ContactShare,
			OffsetDateTime::now_utc(),
		)
		.await
	}

	/// Admin or clock entry point for [`MatchService::expire_overdue`].
	pub async fn run_expiry_sweep(&self, actor: &Actor) -> Result<ExpiryReport> {
		if !matches!(actor.role, Role::Admin | Role::System) {
			return Err(Error::forbidden("Only admins can run the expiry sweep."));
		}

		self.expire_overdue(OffsetDateTime::now_utc()).await
	}

	/// Moves every suggestion still awaiting a decision past its decision deadline to `EXPIRED`.
	pub async fn expire_overdue(&self, now: OffsetDateTime) -> Result<ExpiryReport> {
		let system = Actor::system();
		let mut report = ExpiryReport::default();

		for suggestion_id in self.store.list_overdue(now, EXPIRY_BATCH).await? {
			let Some(suggestion) = self.store.fetch_suggestion(suggestion_id).await? else {
				report.skipped.push(suggestion_id);

				continue;
			};

			if !suggestion.status.is_awaiting_decision()
				|| !suggestion.is_past_decision_deadline(now)
			{
				report.skipped.push(suggestion_id);

				continue;
			}

			match self
				.apply_transition(
					&system,
					suggestion,
					Status::Expired,
					Some(EXPIRY_NOTE.to_string()),
					Framing::StatusChange,
					now,
				)
				.await
			{
				Ok(_) => report.expired.push(suggestion_id),
				Err(Error::IllegalTransition { reason, .. }) => {
					tracing::warn!(
						suggestion_id = %suggestion_id,
						reason = %reason,
						"Skipped expiring suggestion."
					);

					report.skipped.push(suggestion_id);
				},
				Err(err) => return Err(err),
			}
		}

		if !report.expired.is_empty() {
			tracing::info!(expired = report.expired.len(), "Expired overdue suggestions.");
		}

		Ok(report)
	}

	/// Validates and persists one transition along with its audit entry and notification intents.
	pub(crate) async fn apply_transition(
		&self,
		actor: &Actor,
		suggestion: Suggestion,
		to: Status,
		notes: Option<String>,
		framing: Framing,
		now: OffsetDateTime,
	) -> Result<TransitionOutcome> {
		let from = suggestion.status;
		let relation = actor.relation_to(&suggestion);
		let rule = transition::resolve(from, to)?;

		transition::authorize(&rule, relation)?;

		if let Framing::Resend(party) = framing
			&& suggestion.is_past_decision_deadline(now)
		{
			return Err(Error::NoApplicableRecipient {
				message: format!(
					"The decision deadline has passed, so the {} party cannot be resent the suggestion.",
					party.as_str()
				),
			});
		}

		let expected_version = suggestion.version;
		let mut next = suggestion;

		next.apply_transition(to, now);

		let notes = access::clean_notes(notes).unwrap_or_else(|| framing.default_notes(from, to));
		let history =
			HistoryEntry::new(next.suggestion_id, to, notes, access::audit_actor(actor), now);
		let notifications = match framing {
			Framing::StatusChange => notification::plan_status_change(&next, actor.user_id),
			Framing::Resend(party) => vec![notification::plan_resend(&next, party)],
			Framing::ContactShare => notification::plan_contact_share(&next),
		};
		let message = (framing == Framing::ContactShare)
			.then(|| system_message(next.suggestion_id, CONTACT_SHARED_MESSAGE, now));
		let history_entry_id = history.entry_id;
		let change =
			SuggestionChange { suggestion: next, expected_version, history, notifications, message };

		self.commit(&change, from).await?;

		tracing::info!(
			suggestion_id = %change.suggestion.suggestion_id,
			from = %from,
			to = %to,
			action = rule.action.as_str(),
			relation = %relation,
			notifications = change.notifications.len(),
			"Suggestion status changed."
		);

		Ok(TransitionOutcome {
			suggestion: SuggestionView::project(&change.suggestion, actor),
			history_entry_id,
			notifications: change.notifications,
		})
	}

	/// Persists `change`, turning a lost version race into a stale-state failure.
	pub(crate) async fn commit(&self, change: &SuggestionChange, from: Status) -> Result<()> {
		if self.store.apply_change(change).await? {
			return Ok(());
		}

		tracing::warn!(
			suggestion_id = %change.suggestion.suggestion_id,
			expected_version = change.expected_version,
			"Suggestion write lost a concurrent update."
		);

		Err(Error::stale(from, change.suggestion.status))
	}
}

pub(crate) fn system_message(suggestion_id: Uuid, content: &str, now: OffsetDateTime) -> Message {
	Message {
		message_id: Uuid::new_v4(),
		suggestion_id,
		sender_id: None,
		sender_role: SenderRole::System,
		target_user_id: None,
		content: content.to_string(),
		is_read: false,
		created_at: now,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decisions_map_to_party_statuses() {
		assert_eq!(Decision::Approve.target_for(Party::First), Status::FirstPartyApproved);
		assert_eq!(Decision::Decline.target_for(Party::Second), Status::SecondPartyDeclined);
	}

	#[test]
	fn framing_notes() {
		assert_eq!(
			Framing::Resend(Party::Second)
				.default_notes(Status::PendingSecondParty, Status::PendingSecondParty),
			"Suggestion resent to the second party."
		);
		assert_eq!(
			Framing::StatusChange.default_notes(Status::Draft, Status::PendingFirstParty),
			HistoryEntry::default_notes(Status::Draft, Status::PendingFirstParty)
		);
	}
}
