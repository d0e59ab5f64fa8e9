use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use mb_domain::{
	Action, Actor, HistoryEntry, Priority, Relation, Role, Status, StatusCategory, Suggestion,
	transition,
};

use crate::{Error, MatchService, Result, access};

const CREATED_NOTE: &str = "Suggestion created as draft.";

#[derive(Clone, Debug, Deserialize)]
pub struct CreateSuggestionRequest {
	pub first_party_id: Uuid,
	pub second_party_id: Uuid,
	/// Admins create on behalf of a matchmaker. Matchmakers may omit it or name themselves.
	#[serde(default)]
	pub matchmaker_id: Option<Uuid>,
	#[serde(default)]
	pub priority: Option<Priority>,
	#[serde(default)]
	pub matching_reason: Option<String>,
	#[serde(default)]
	pub first_party_notes: Option<String>,
	#[serde(default)]
	pub second_party_notes: Option<String>,
	#[serde(default)]
	pub internal_notes: Option<String>,
	#[serde(default)]
	pub follow_up_notes: Option<String>,
	#[serde(default, with = "crate::rfc3339::option")]
	pub response_deadline: Option<OffsetDateTime>,
	#[serde(default, with = "crate::rfc3339::option")]
	pub decision_deadline: Option<OffsetDateTime>,
}

/// A suggestion as one particular viewer may see it.
#[derive(Clone, Debug, Serialize)]
pub struct SuggestionView {
	pub suggestion_id: Uuid,
	pub matchmaker_id: Uuid,
	pub first_party_id: Uuid,
	pub second_party_id: Uuid,
	pub status: Status,
	pub status_label: &'static str,
	pub previous_status: Option<Status>,
	pub category: StatusCategory,
	pub priority: Priority,
	pub viewer_relation: Relation,
	pub matching_reason: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_party_notes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub second_party_notes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub internal_notes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub follow_up_notes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first_party_reminders: Option<i32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub second_party_reminders: Option<i32>,
	#[serde(with = "crate::rfc3339::option")]
	pub response_deadline: Option<OffsetDateTime>,
	#[serde(with = "crate::rfc3339::option")]
	pub decision_deadline: Option<OffsetDateTime>,
	#[serde(with = "crate::rfc3339::option")]
	pub first_party_sent: Option<OffsetDateTime>,
	#[serde(with = "crate::rfc3339::option")]
	pub first_party_responded: Option<OffsetDateTime>,
	#[serde(with = "crate::rfc3339::option")]
	pub second_party_sent: Option<OffsetDateTime>,
	#[serde(with = "crate::rfc3339::option")]
	pub second_party_responded: Option<OffsetDateTime>,
	#[serde(with = "crate::rfc3339")]
	pub last_status_change: OffsetDateTime,
	#[serde(with = "crate::rfc3339")]
	pub last_activity: OffsetDateTime,
	#[serde(with = "crate::rfc3339::option")]
	pub closed_at: Option<OffsetDateTime>,
	#[serde(with = "crate::rfc3339")]
	pub created_at: OffsetDateTime,
	pub allowed_actions: Vec<Action>,
	pub version: i64,
}
impl SuggestionView {
	/// Projects `suggestion` for `actor`. Parties get their own note and nothing staff-only.
	pub fn project(suggestion: &Suggestion, actor: &Actor) -> Self {
		let relation = actor.relation_to(suggestion);
		let staff = relation.is_staff() || relation == Relation::System;
		let first_party_notes = match relation {
			Relation::FirstParty => suggestion.first_party_notes.clone(),
			_ if staff => suggestion.first_party_notes.clone(),
			_ => None,
		};
		let second_party_notes = match relation {
			Relation::SecondParty => suggestion.second_party_notes.clone(),
			_ if staff => suggestion.second_party_notes.clone(),
			_ => None,
		};

		Self {
			suggestion_id: suggestion.suggestion_id,
			matchmaker_id: suggestion.matchmaker_id,
			first_party_id: suggestion.first_party_id,
			second_party_id: suggestion.second_party_id,
			status: suggestion.status,
			status_label: suggestion.status.label(),
			previous_status: suggestion.previous_status,
			category: suggestion.category,
			priority: suggestion.priority,
			viewer_relation: relation,
			matching_reason: suggestion.matching_reason.clone(),
			first_party_notes,
			second_party_notes,
			internal_notes: suggestion.internal_notes.clone().filter(|_| staff),
			follow_up_notes: suggestion.follow_up_notes.clone().filter(|_| staff),
			first_party_reminders: staff.then_some(suggestion.first_party_reminders),
			second_party_reminders: staff.then_some(suggestion.second_party_reminders),
			response_deadline: suggestion.response_deadline,
			decision_deadline: suggestion.decision_deadline,
			first_party_sent: suggestion.first_party_sent,
			first_party_responded: suggestion.first_party_responded,
			second_party_sent: suggestion.second_party_sent,
			second_party_responded: suggestion.second_party_responded,
			last_status_change: suggestion.last_status_change,
			last_activity: suggestion.last_activity,
			closed_at: suggestion.closed_at,
			created_at: suggestion.created_at,
			allowed_actions: transition::allowed_actions(actor, suggestion).into_iter().collect(),
			version: suggestion.version,
		}
	}
}

impl MatchService {
	pub async fn create_suggestion(
		&self,
		actor: &Actor,
		req: CreateSuggestionRequest,
	) -> Result<SuggestionView> {
		let matchmaker_id = match (actor.role, req.matchmaker_id) {
			(Role::Admin, Some(matchmaker_id)) => matchmaker_id,
			(Role::Admin, None) =>
				return Err(Error::invalid("matchmaker_id is required when an admin creates a suggestion.")),
			(Role::Matchmaker, None) => actor.user_id,
			(Role::Matchmaker, Some(matchmaker_id)) if matchmaker_id == actor.user_id =>
				matchmaker_id,
			(Role::Matchmaker, Some(_)) =>
				return Err(Error::forbidden("Matchmakers can only create their own suggestions.")),
			_ => return Err(Error::forbidden("Only matchmakers and admins can create suggestions.")),
		};

		if req.first_party_id == req.second_party_id
			|| matchmaker_id == req.first_party_id
			|| matchmaker_id == req.second_party_id
		{
			return Err(Error::invalid(
				"The matchmaker and both parties must be three different users.",
			));
		}

		let first = self.contact(req.first_party_id).await?;
		let second = self.contact(req.second_party_id).await?;

		for contact in [&first, &second] {
			if contact.role != Role::Candidate {
				return Err(Error::invalid(format!(
					"User {} is not a candidate.",
					contact.user_id
				)));
			}
		}

		if self.cfg.workflow.single_active_process {
			for contact in [&first, &second] {
				if self.store.has_active_process(contact.user_id, None).await? {
					return Err(Error::Conflict {
						message: format!(
							"{} is already in an active suggestion.",
							contact.display_name
						),
					});
				}
			}
		}

		let now = OffsetDateTime::now_utc();
		let response_deadline = match req.response_deadline {
			Some(deadline) => deadline,
			None => access::checked_after(
				now,
				self.cfg.workflow.default_response_days,
				Duration::DAY,
				"workflow.default_response_days",
			)?,
		};
		let decision_deadline = match req.decision_deadline {
			Some(deadline) => deadline,
			None => access::checked_after(
				now,
				self.cfg.workflow.default_decision_days,
				Duration::DAY,
				"workflow.default_decision_days",
			)?,
		};

		if decision_deadline < response_deadline {
			return Err(Error::invalid(
				"decision_deadline must not be earlier than response_deadline.",
			));
		}

		let mut suggestion =
			Suggestion::draft(matchmaker_id, req.first_party_id, req.second_party_id, now);

		suggestion.priority = req.priority.unwrap_or_default();
		suggestion.matching_reason = access::clean_notes(req.matching_reason);
		suggestion.first_party_notes = access::clean_notes(req.first_party_notes);
		suggestion.second_party_notes = access::clean_notes(req.second_party_notes);
		suggestion.internal_notes = access::clean_notes(req.internal_notes);
		suggestion.follow_up_notes = access::clean_notes(req.follow_up_notes);
		suggestion.response_deadline = Some(response_deadline);
		suggestion.decision_deadline = Some(decision_deadline);

		let entry = HistoryEntry::new(
			suggestion.suggestion_id,
			Status::Draft,
			CREATED_NOTE,
			access::audit_actor(actor),
			now,
		);

		self.store.insert_suggestion(&suggestion, &entry).await?;

		tracing::info!(
			suggestion_id = %suggestion.suggestion_id,
			matchmaker_id = %matchmaker_id,
			"Suggestion created."
		);

		Ok(SuggestionView::project(&suggestion, actor))
	}

	pub async fn get_suggestion(&self, actor: &Actor, suggestion_id: Uuid) -> Result<SuggestionView> {
		let (suggestion, _) = self.load_for(actor, suggestion_id).await?;

		Ok(SuggestionView::project(&suggestion, actor))
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	fn sent_suggestion() -> Suggestion {
		let mut suggestion = Suggestion::draft(
			Uuid::new_v4(),
			Uuid::new_v4(),
			Uuid::new_v4(),
			datetime!(2026-03-01 09:00 UTC),
		);

		suggestion.first_party_notes = Some("You both love hiking.".to_string());
		suggestion.second_party_notes = Some("She reads a lot.".to_string());
		suggestion.internal_notes = Some("Family knows each other.".to_string());
		suggestion.follow_up_notes = Some("Call after first date.".to_string());
		suggestion.apply_transition(Status::PendingFirstParty, datetime!(2026-03-02 09:00 UTC));

		suggestion
	}

	#[test]
	fn party_view_hides_staff_and_counterpart_notes() {
		let suggestion = sent_suggestion();
		let first = Actor::new(suggestion.first_party_id, Role::Candidate);
		let view = SuggestionView::project(&suggestion, &first);

		assert_eq!(view.viewer_relation, Relation::FirstParty);
		assert_eq!(view.first_party_notes.as_deref(), Some("You both love hiking."));
		assert!(view.second_party_notes.is_none());
		assert!(view.internal_notes.is_none());
		assert!(view.follow_up_notes.is_none());
		assert!(view.first_party_reminders.is_none());
		assert!(view.allowed_actions.contains(&Action::Approve));

		let json = serde_json::to_value(&view).expect("Failed to serialize view.");

		assert!(json.get("internal_notes").is_none());
		assert_eq!(json["status"], "PENDING_FIRST_PARTY");
	}

	#[test]
	fn staff_view_has_everything() {
		let suggestion = sent_suggestion();
		let matchmaker = Actor::new(suggestion.matchmaker_id, Role::Matchmaker);
		let view = SuggestionView::project(&suggestion, &matchmaker);

		assert!(view.first_party_notes.is_some());
		assert!(view.second_party_notes.is_some());
		assert!(view.internal_notes.is_some());
		assert!(view.follow_up_notes.is_some());
		assert_eq!(view.first_party_reminders, Some(0));
		assert_eq!(view.status_label, Status::PendingFirstParty.label());
	}
}
