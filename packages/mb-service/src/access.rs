use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use mb_domain::{Actor, Relation, Role, Suggestion};

use crate::{Contact, Error, MatchService, Result};

impl MatchService {
	pub(crate) async fn load(&self, suggestion_id: Uuid) -> Result<Suggestion> {
		self.store.fetch_suggestion(suggestion_id).await?.ok_or_else(|| Error::NotFound {
			message: format!("Suggestion {suggestion_id} does not exist."),
		})
	}

	/// Loads a suggestion the actor is allowed to see and reports how they relate to it.
	pub(crate) async fn load_for(
		&self,
		actor: &Actor,
		suggestion_id: Uuid,
	) -> Result<(Suggestion, Relation)> {
		let suggestion = self.load(suggestion_id).await?;
		let relation = actor.relation_to(&suggestion);

		ensure_visible(&suggestion, relation)?;

		Ok((suggestion, relation))
	}

	pub(crate) async fn contact(&self, user_id: Uuid) -> Result<Contact> {
		self.directory.lookup(user_id).await?.ok_or_else(|| Error::NotFound {
			message: format!("User {user_id} is not in the directory."),
		})
	}
}

/// A party only learns about a suggestion once it has been sent to them.
pub(crate) fn ensure_visible(suggestion: &Suggestion, relation: Relation) -> Result<()> {
	match relation {
		Relation::Outsider => Err(Error::forbidden(
			"Only the suggestion's matchmaker, its parties, or an admin can access it.",
		)),
		Relation::FirstParty if suggestion.first_party_sent.is_none() => Err(Error::NotFound {
			message: format!("Suggestion {} does not exist.", suggestion.suggestion_id),
		}),
		Relation::SecondParty if suggestion.second_party_sent.is_none() => Err(Error::NotFound {
			message: format!("Suggestion {} does not exist.", suggestion.suggestion_id),
		}),
		_ => Ok(()),
	}
}

pub(crate) fn ensure_staff(relation: Relation) -> Result<()> {
	if relation.is_staff() {
		Ok(())
	} else {
		Err(Error::forbidden("Only the suggestion's matchmaker or an admin can do this."))
	}
}

pub(crate) fn ensure_staff_or_system(relation: Relation) -> Result<()> {
	if relation.is_staff() || relation == Relation::System {
		Ok(())
	} else {
		Err(Error::forbidden("Only the suggestion's matchmaker or an admin can do this."))
	}
}

/// The id recorded in audit rows. Clock-driven actions have none.
pub(crate) fn audit_actor(actor: &Actor) -> Option<Uuid> {
	(actor.role != Role::System).then_some(actor.user_id)
}

/// `start` plus `amount` whole `unit`s, or `InvalidRequest` naming `label` when that leaves the
/// representable range.
pub(crate) fn checked_after(
	start: OffsetDateTime,
	amount: i64,
	unit: Duration,
	label: &str,
) -> Result<OffsetDateTime> {
	amount
		.checked_mul(unit.whole_seconds())
		.map(Duration::seconds)
		.and_then(|offset| start.checked_add(offset))
		.ok_or_else(|| Error::invalid(format!("{label} is out of range.")))
}

/// Trims free-text notes, treating blank input as absent.
pub(crate) fn clean_notes(notes: Option<String>) -> Option<String> {
	notes.map(|notes| notes.trim().to_string()).filter(|notes| !notes.is_empty())
}
