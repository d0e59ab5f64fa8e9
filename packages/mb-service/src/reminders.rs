use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use mb_domain::{
	Actor, HistoryEntry, NotificationIntent, Party, PartyType, Suggestion, notification,
};
use mb_storage::models::SuggestionChange;

use crate::{
	Error, MatchService, Result, SuggestionView, TransitionOutcome, access, transitions::Framing,
};

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RemindRequest {
	#[serde(alias = "partyType")]
	pub party_type: PartyType,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ResendRequest {
	#[serde(alias = "partyType")]
	pub party_type: PartyType,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReminderOutcome {
	pub suggestion: SuggestionView,
	pub reminded: Vec<Party>,
	pub notifications: Vec<NotificationIntent>,
}

impl MatchService {
	/// Nudges whichever of the requested parties the suggestion is waiting on. The status is left
	/// untouched.
	pub async fn remind(
		&self,
		actor: &Actor,
		suggestion_id: Uuid,
		req: RemindRequest,
	) -> Result<ReminderOutcome> {
		let (suggestion, relation) = self.load_for(actor, suggestion_id).await?;

		access::ensure_staff_or_system(relation)?;

		let now = OffsetDateTime::now_utc();
		let party = waiting_party(&suggestion, req.party_type, now)?;

		self.check_reminder_allowance(&suggestion, party, now)?;

		let expected_version = suggestion.version;
		let from = suggestion.status;
		let mut next = suggestion;

		next.record_reminder(party, now);

		let history = HistoryEntry::new(
			next.suggestion_id,
			next.status,
			format!(
				"Reminder {} sent to the {} party.",
				next.reminder_count(party),
				party.as_str()
			),
			access::audit_actor(actor),
			now,
		);
		let notifications = vec![notification::plan_reminder(&next, party)];
		let change =
			SuggestionChange { suggestion: next, expected_version, history, notifications, message: None };

		self.commit(&change, from).await?;

		tracing::info!(
			suggestion_id = %suggestion_id,
			party = party.as_str(),
			count = change.suggestion.reminder_count(party),
			"Reminder recorded."
		);

		Ok(ReminderOutcome {
			suggestion: SuggestionView::project(&change.suggestion, actor),
			reminded: vec![party],
			notifications: change.notifications,
		})
	}

	/// Re-enters the pending state for the party the suggestion is waiting on.
	pub async fn resend(
		&self,
		actor: &Actor,
		suggestion_id: Uuid,
		req: ResendRequest,
	) -> Result<TransitionOutcome> {
		let (suggestion, relation) = self.load_for(actor, suggestion_id).await?;

		access::ensure_staff_or_system(relation)?;

		let now = OffsetDateTime::now_utc();
		let party = waiting_party(&suggestion, req.party_type, now)?;
		let to = suggestion.status;

		self.apply_transition(actor, suggestion, to, None, Framing::Resend(party), now).await
	}

	fn check_reminder_allowance(
		&self,
		suggestion: &Suggestion,
		party: Party,
		now: OffsetDateTime,
	) -> Result<()> {
		let limits = &self.cfg.reminders;
		let sent = suggestion.reminder_count(party);

		if i64::from(sent) >= i64::from(limits.max_per_party) {
			return Err(Error::RateLimited {
				message: format!(
					"The {} party has already received {sent} reminders.",
					party.as_str()
				),
				retry_after_seconds: 0,
			});
		}

		if let Some(last) = suggestion.last_reminded_at(party) {
			let next_allowed = access::checked_after(
				last,
				limits.min_interval_minutes,
				Duration::MINUTE,
				"reminders.min_interval_minutes",
			)?;

			if next_allowed > now {
				return Err(Error::RateLimited {
					message: format!("The {} party was reminded recently.", party.as_str()),
					retry_after_seconds: (next_allowed - now).whole_seconds().max(1),
				});
			}
		}

		Ok(())
	}
}

/// Picks the requested party the suggestion is currently pending with. At most one party can be
/// pending at a time, so `both` resolves to whichever one that is.
fn waiting_party(suggestion: &Suggestion, party_type: PartyType, now: OffsetDateTime) -> Result<Party> {
	let Some(party) = party_type
		.parties()
		.iter()
		.copied()
		.find(|party| suggestion.status == party.pending_status())
	else {
		return Err(Error::NoApplicableRecipient {
			message: format!(
				"The suggestion is {} and is not waiting on the requested party.",
				suggestion.status.label().to_lowercase()
			),
		});
	};

	if suggestion.is_past_decision_deadline(now) {
		return Err(Error::NoApplicableRecipient {
			message: "The decision deadline has passed.".to_string(),
		});
	}

	Ok(party)
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use mb_domain::Status;

	use super::*;

	fn suggestion_in(status: Status) -> Suggestion {
		let mut suggestion = Suggestion::draft(
			Uuid::new_v4(),
			Uuid::new_v4(),
			Uuid::new_v4(),
			datetime!(2026-03-01 09:00 UTC),
		);

		suggestion.status = status;
		suggestion
	}

	#[test]
	fn both_resolves_to_the_pending_party() {
		let now = datetime!(2026-03-02 09:00 UTC);
		let suggestion = suggestion_in(Status::PendingSecondParty);

		assert_eq!(
			waiting_party(&suggestion, PartyType::Both, now).expect("Expected a party."),
			Party::Second
		);
		assert!(matches!(
			waiting_party(&suggestion, PartyType::First, now),
			Err(Error::NoApplicableRecipient { .. })
		));
	}

	#[test]
	fn approved_states_have_no_recipient() {
		let suggestion = suggestion_in(Status::FirstPartyApproved);

		assert!(matches!(
			waiting_party(&suggestion, PartyType::Both, datetime!(2026-03-02 09:00 UTC)),
			Err(Error::NoApplicableRecipient { .. })
		));
	}

	#[test]
	fn past_deadline_has_no_recipient() {
		let mut suggestion = suggestion_in(Status::PendingFirstParty);

		suggestion.decision_deadline = Some(datetime!(2026-03-01 12:00 UTC));

		assert!(matches!(
			waiting_party(&suggestion, PartyType::First, datetime!(2026-03-02 09:00 UTC)),
			Err(Error::NoApplicableRecipient { .. })
		));
	}
}
