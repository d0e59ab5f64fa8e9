use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use mb_domain::{Actor, HistoryEntry, Relation, Status};

use crate::{Error, HistoryRange, MatchService, Result};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;
const SYSTEM_NAME: &str = "System";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryQuery {
	#[serde(default, with = "crate::rfc3339::option")]
	pub since: Option<OffsetDateTime>,
	#[serde(default, with = "crate::rfc3339::option")]
	pub until: Option<OffsetDateTime>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryItem {
	pub entry_id: Uuid,
	pub status: Status,
	pub status_label: &'static str,
	/// Withheld from parties unless they wrote it.
	pub notes: Option<String>,
	pub actor_id: Option<Uuid>,
	pub actor_name: String,
	#[serde(with = "crate::rfc3339")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryResponse {
	pub suggestion_id: Uuid,
	pub items: Vec<HistoryItem>,
}

impl MatchService {
	pub async fn history(
		&self,
		actor: &Actor,
		suggestion_id: Uuid,
		query: HistoryQuery,
	) -> Result<HistoryResponse> {
		let (_, relation) = self.load_for(actor, suggestion_id).await?;
		let range = resolve_range(&query)?;
		let entries = self.store.list_history(suggestion_id, range).await?;
		let mut names: HashMap<Uuid, String> = HashMap::new();
		let mut items = Vec::with_capacity(entries.len());

		for entry in entries {
			let actor_name = match entry.actor_id {
				Some(actor_id) => self.actor_name(&mut names, actor_id).await?,
				None => SYSTEM_NAME.to_string(),
			};

			items.push(item(entry, actor_name, actor.user_id, relation));
		}

		Ok(HistoryResponse { suggestion_id, items })
	}

	async fn actor_name(&self, names: &mut HashMap<Uuid, String>, actor_id: Uuid) -> Result<String> {
		if let Some(name) = names.get(&actor_id) {
			return Ok(name.clone());
		}

		let name = self
			.directory
			.lookup(actor_id)
			.await?
			.map(|contact| contact.display_name)
			.unwrap_or_else(|| "Unknown user".to_string());

		names.insert(actor_id, name.clone());

		Ok(name)
	}
}

fn resolve_range(query: &HistoryQuery) -> Result<HistoryRange> {
	let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

	if limit == 0 || limit > MAX_LIMIT {
		return Err(Error::invalid(format!("limit must be between 1 and {MAX_LIMIT}.")));
	}
	if let (Some(since), Some(until)) = (query.since, query.until)
		&& since >= until
	{
		return Err(Error::invalid("since must be earlier than until."));
	}

	Ok(HistoryRange { since: query.since, until: query.until, limit: i64::from(limit) })
}

fn item(entry: HistoryEntry, actor_name: String, viewer_id: Uuid, relation: Relation) -> HistoryItem {
	let notes = if relation.is_party() && entry.actor_id != Some(viewer_id) {
		None
	} else {
		Some(entry.notes)
	};

	HistoryItem {
		entry_id: entry.entry_id,
		status: entry.status,
		status_label: entry.status.label(),
		notes,
		actor_id: entry.actor_id,
		actor_name,
		created_at: entry.created_at,
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn limit_defaults_and_bounds() {
		let range = resolve_range(&HistoryQuery::default()).expect("Default query must resolve.");

		assert_eq!(range.limit, 50);
		assert!(resolve_range(&HistoryQuery { limit: Some(0), ..Default::default() }).is_err());
		assert!(resolve_range(&HistoryQuery { limit: Some(501), ..Default::default() }).is_err());
	}

	#[test]
	fn inverted_window_is_rejected() {
		let query = HistoryQuery {
			since: Some(datetime!(2026-03-02 00:00 UTC)),
			until: Some(datetime!(2026-03-01 00:00 UTC)),
			limit: None,
		};

		assert!(matches!(resolve_range(&query), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn parties_only_see_their_own_notes() {
		let viewer = Uuid::new_v4();
		let entry = HistoryEntry::new(
			Uuid::new_v4(),
			Status::PendingFirstParty,
			"Strong fit on values.",
			Some(Uuid::new_v4()),
			datetime!(2026-03-01 09:00 UTC),
		);

		assert!(item(entry.clone(), "Mira".to_string(), viewer, Relation::FirstParty).notes.is_none());
		assert!(item(entry, "Mira".to_string(), viewer, Relation::Matchmaker).notes.is_some());
	}
}
