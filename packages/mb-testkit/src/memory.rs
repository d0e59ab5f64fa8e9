//! In-memory stand-ins for the Postgres-backed store and directory.

use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use time::OffsetDateTime;
use uuid::Uuid;

use mb_domain::{HistoryEntry, Message, NotificationIntent, Role, Suggestion};
use mb_service::{BoxFuture, Contact, Directory, HistoryRange, SuggestionStore};
use mb_storage::models::SuggestionChange;

/// A [`SuggestionStore`] with the same versioning and atomicity rules as Postgres.
#[derive(Default)]
pub struct MemoryStore {
	state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
	suggestions: HashMap<Uuid, Suggestion>,
	history: Vec<HistoryEntry>,
	messages: Vec<Message>,
	outbox: Vec<(Uuid, NotificationIntent)>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Overwrites a suggestion as-is, bypassing the workflow. For seeding odd states.
	pub fn put_suggestion(&self, suggestion: Suggestion) {
		self.lock().suggestions.insert(suggestion.suggestion_id, suggestion);
	}

	pub fn put_message(&self, message: Message) {
		self.lock().messages.push(message);
	}

	pub fn suggestion(&self, suggestion_id: Uuid) -> Option<Suggestion> {
		self.lock().suggestions.get(&suggestion_id).cloned()
	}

	pub fn history_for(&self, suggestion_id: Uuid) -> Vec<HistoryEntry> {
		self.lock()
			.history
			.iter()
			.filter(|entry| entry.suggestion_id == suggestion_id)
			.cloned()
			.collect()
	}

	pub fn messages_for(&self, suggestion_id: Uuid) -> Vec<Message> {
		self.lock()
			.messages
			.iter()
			.filter(|message| message.suggestion_id == suggestion_id)
			.cloned()
			.collect()
	}

	/// Notification intents handed off for `suggestion_id`, in enqueue order.
	pub fn outbox_for(&self, suggestion_id: Uuid) -> Vec<NotificationIntent> {
		self.lock()
			.outbox
			.iter()
			.filter(|(id, _)| *id == suggestion_id)
			.map(|(_, intent)| intent.clone())
			.collect()
	}

	fn lock(&self) -> MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}

impl SuggestionStore for MemoryStore {
	fn insert_suggestion<'a>(
		&'a self,
		suggestion: &'a Suggestion,
		entry: &'a HistoryEntry,
	) -> BoxFuture<'a, mb_service::Result<()>> {
		Box::pin(async move {
			let mut state = self.lock();

			if state.suggestions.contains_key(&suggestion.suggestion_id) {
				return Err(mb_service::Error::Conflict {
					message: format!("Suggestion {} already exists.", suggestion.suggestion_id),
				});
			}

			state.suggestions.insert(suggestion.suggestion_id, suggestion.clone());
			state.history.push(entry.clone());

			Ok(())
		})
	}

	fn fetch_suggestion<'a>(
		&'a self,
		suggestion_id: Uuid,
	) -> BoxFuture<'a, mb_service::Result<Option<Suggestion>>> {
		Box::pin(async move { Ok(self.suggestion(suggestion_id)) })
	}

	fn has_active_process<'a>(
		&'a self,
		user_id: Uuid,
		exclude_suggestion_id: Option<Uuid>,
	) -> BoxFuture<'a, mb_service::Result<bool>> {
		Box::pin(async move {
			Ok(self.lock().suggestions.values().any(|suggestion| {
				Some(suggestion.suggestion_id) != exclude_suggestion_id
					&& suggestion.party_of(user_id).is_some()
					&& suggestion.status.is_active_process()
			}))
		})
	}

	fn apply_change<'a>(
		&'a self,
		change: &'a SuggestionChange,
	) -> BoxFuture<'a, mb_service::Result<bool>> {
		Box::pin(async move {
			let mut state = self.lock();
			let suggestion_id = change.suggestion.suggestion_id;
			let current = state.suggestions.get(&suggestion_id).map(|stored| stored.version);

			if current != Some(change.expected_version) {
				return Ok(false);
			}

			state.suggestions.insert(suggestion_id, change.suggestion.clone());
			state.history.push(change.history.clone());

			if let Some(message) = change.message.as_ref() {
				state.messages.push(message.clone());
			}

			state
				.outbox
				.extend(change.notifications.iter().map(|intent| (suggestion_id, intent.clone())));

			Ok(true)
		})
	}

	fn list_history<'a>(
		&'a self,
		suggestion_id: Uuid,
		range: HistoryRange,
	) -> BoxFuture<'a, mb_service::Result<Vec<HistoryEntry>>> {
		Box::pin(async move {
			let mut entries = self
				.history_for(suggestion_id)
				.into_iter()
				.filter(|entry| range.since.is_none_or(|since| entry.created_at >= since))
				.filter(|entry| range.until.is_none_or(|until| entry.created_at < until))
				.collect::<Vec<_>>();

			// Stable, so insertion order breaks timestamp ties like the sequence column does.
			entries.sort_by_key(|entry| entry.created_at);
			entries.truncate(usize::try_from(range.limit).unwrap_or(0));

			Ok(entries)
		})
	}

	fn append_message<'a>(&'a self, message: &'a Message) -> BoxFuture<'a, mb_service::Result<()>> {
		Box::pin(async move {
			let mut state = self.lock();
			let Some(suggestion) = state.suggestions.get_mut(&message.suggestion_id) else {
				return Err(mb_service::Error::NotFound {
					message: format!("Suggestion {} does not exist.", message.suggestion_id),
				});
			};

			suggestion.last_activity = suggestion.last_activity.max(message.created_at);
			state.messages.push(message.clone());

			Ok(())
		})
	}

	fn list_messages<'a>(
		&'a self,
		suggestion_id: Uuid,
	) -> BoxFuture<'a, mb_service::Result<Vec<Message>>> {
		Box::pin(async move {
			let mut messages = self.messages_for(suggestion_id);

			messages.sort_by_key(|message| message.created_at);

			Ok(messages)
		})
	}

	fn mark_read<'a>(
		&'a self,
		suggestion_id: Uuid,
		message_ids: &'a [Uuid],
	) -> BoxFuture<'a, mb_service::Result<u64>> {
		Box::pin(async move {
			let mut updated = 0;

			for message in self.lock().messages.iter_mut() {
				if message.suggestion_id == suggestion_id
					&& !message.is_read
					&& message_ids.contains(&message.message_id)
				{
					message.is_read = true;
					updated += 1;
				}
			}

			Ok(updated)
		})
	}

	fn list_overdue<'a>(
		&'a self,
		now: OffsetDateTime,
		limit: i64,
	) -> BoxFuture<'a, mb_service::Result<Vec<Uuid>>> {
		Box::pin(async move {
			let state = self.lock();
			let mut overdue = state
				.suggestions
				.values()
				.filter(|suggestion| {
					suggestion.status.is_awaiting_decision()
						&& suggestion.is_past_decision_deadline(now)
				})
				.map(|suggestion| (suggestion.decision_deadline, suggestion.suggestion_id))
				.collect::<Vec<_>>();

			overdue.sort();
			overdue.truncate(usize::try_from(limit).unwrap_or(0));

			Ok(overdue.into_iter().map(|(_, suggestion_id)| suggestion_id).collect())
		})
	}
}

#[derive(Default)]
pub struct MemoryDirectory {
	contacts: Mutex<HashMap<Uuid, Contact>>,
}
impl MemoryDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, contact: Contact) {
		self.contacts
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(contact.user_id, contact);
	}

	/// Registers a user with an email address and a WhatsApp-capable phone number.
	pub fn register(&self, name: &str, role: Role) -> Contact {
		let contact = Contact {
			user_id: Uuid::new_v4(),
			role,
			display_name: name.to_string(),
			email: format!("{}@example.com", name.to_lowercase()),
			phone: Some("+15550100000".to_string()),
			push_token: None,
		};

		self.insert(contact.clone());

		contact
	}
}

impl Directory for MemoryDirectory {
	fn lookup<'a>(&'a self, user_id: Uuid) -> BoxFuture<'a, mb_service::Result<Option<Contact>>> {
		Box::pin(async move {
			Ok(self.contacts.lock().unwrap_or_else(|err| err.into_inner()).get(&user_id).cloned())
		})
	}
}
