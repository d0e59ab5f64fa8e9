use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use mb_domain::{HistoryEntry, Message, Role, SenderRole, Status, Suggestion, notification};
use mb_storage::{
	db::Db,
	directory, history, messages, outbox,
	models::{DirectoryUser, SuggestionChange},
	suggestions,
};

async fn seed_user(db: &Db, name: &str, role: Role) -> Uuid {
	let user_id = Uuid::new_v4();

	directory::upsert_user(
		&db.pool,
		&DirectoryUser {
			user_id,
			role: role.as_str().to_string(),
			display_name: name.to_string(),
			email: format!("{}@example.com", name.to_lowercase()),
			phone: None,
			push_token: None,
		},
	)
	.await
	.expect("Failed to seed user.");

	user_id
}

async fn seed_draft(db: &Db) -> Suggestion {
	let matchmaker = seed_user(db, "Rivka", Role::Matchmaker).await;
	let first = seed_user(db, "Avi", Role::Candidate).await;
	let second = seed_user(db, "Yael", Role::Candidate).await;
	let suggestion = Suggestion::draft(matchmaker, first, second, OffsetDateTime::now_utc());

	suggestions::insert_suggestion(&db.pool, &suggestion).await.expect("Failed to insert.");

	suggestion
}

fn send_to_first_party(suggestion: &Suggestion, expected_version: i64) -> SuggestionChange {
	let mut next = suggestion.clone();
	let now = OffsetDateTime::now_utc();

	next.apply_transition(Status::PendingFirstParty, now);

	let history = HistoryEntry::new(
		next.suggestion_id,
		next.status,
		"Sent.",
		Some(next.matchmaker_id),
		now,
	);
	let notifications = notification::plan_status_change(&next, next.matchmaker_id);

	SuggestionChange { suggestion: next, expected_version, history, notifications, message: None }
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MB_PG_DSN to run."]
async fn versioned_change_is_all_or_nothing() {
	let Some(base_dsn) = mb_testkit::env_dsn() else {
		eprintln!("Skipping versioned_change_is_all_or_nothing; set MB_PG_DSN to run this test.");

		return;
	};
	let test_db =
		mb_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = test_db.connect().await.expect("Failed to connect to Postgres.");
	let draft = seed_draft(&db).await;
	let stale = send_to_first_party(&draft, draft.version + 7);

	assert!(!suggestions::apply_change(&db, &stale).await.expect("Stale apply failed."));
	assert!(
		history::list_history(&db.pool, draft.suggestion_id, None, None, 50)
			.await
			.expect("Failed to list history.")
			.is_empty()
	);
	assert!(
		outbox::list_for_suggestion(&db.pool, draft.suggestion_id)
			.await
			.expect("Failed to list outbox.")
			.is_empty()
	);

	let fresh = send_to_first_party(&draft, draft.version);

	assert!(suggestions::apply_change(&db, &fresh).await.expect("Fresh apply failed."));
	// Replaying the same change must now lose the version race.
	assert!(!suggestions::apply_change(&db, &fresh).await.expect("Replay failed."));

	let stored = suggestions::fetch_suggestion(&db.pool, draft.suggestion_id)
		.await
		.expect("Failed to fetch.")
		.expect("Suggestion must exist.");
	let queued = outbox::list_for_suggestion(&db.pool, draft.suggestion_id)
		.await
		.expect("Failed to list outbox.");

	assert_eq!(stored.status, Status::PendingFirstParty);
	assert_eq!(stored.version, draft.version + 1);
	assert!(stored.first_party_sent.is_some());
	assert_eq!(queued.len(), 1);
	assert_eq!(queued[0].recipient_id, draft.first_party_id);
	assert_eq!(queued[0].status, "PENDING");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MB_PG_DSN to run."]
async fn outbox_claims_are_leased() {
	let Some(base_dsn) = mb_testkit::env_dsn() else {
		eprintln!("Skipping outbox_claims_are_leased; set MB_PG_DSN to run this test.");

		return;
	};
	let test_db =
		mb_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = test_db.connect().await.expect("Failed to connect to Postgres.");
	let draft = seed_draft(&db).await;

	assert!(
		suggestions::apply_change(&db, &send_to_first_party(&draft, draft.version))
			.await
			.expect("Apply failed.")
	);

	let now = OffsetDateTime::now_utc() + Duration::seconds(1);
	let job = outbox::claim_next(&db, now, Duration::seconds(30))
		.await
		.expect("Claim failed.")
		.expect("A job must be due.");

	assert!(
		outbox::claim_next(&db, now, Duration::seconds(30))
			.await
			.expect("Second claim failed.")
			.is_none(),
		"A leased job must not be claimed twice."
	);

	outbox::mark_failed(&db.pool, job.outbox_id, 1, 1, "boom", now, now)
		.await
		.expect("Mark failed failed.");

	let dead = outbox::list_for_suggestion(&db.pool, draft.suggestion_id)
		.await
		.expect("Failed to list outbox.");

	assert_eq!(dead[0].status, "DEAD");
	assert_eq!(dead[0].last_error.as_deref(), Some("boom"));
	assert!(
		outbox::claim_next(&db, now + Duration::hours(1), Duration::seconds(30))
			.await
			.expect("Claim failed.")
			.is_none()
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set MB_PG_DSN to run."]
async fn mark_read_only_counts_unread_rows() {
	let Some(base_dsn) = mb_testkit::env_dsn() else {
		eprintln!("Skipping mark_read_only_counts_unread_rows; set MB_PG_DSN to run this test.");

		return;
	};
	let test_db =
		mb_testkit::TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = test_db.connect().await.expect("Failed to connect to Postgres.");
	let draft = seed_draft(&db).await;
	let message = Message {
		message_id: Uuid::new_v4(),
		suggestion_id: draft.suggestion_id,
		sender_id: Some(draft.matchmaker_id),
		sender_role: SenderRole::Matchmaker,
		target_user_id: Some(draft.first_party_id),
		content: "Hello Avi".to_string(),
		is_read: false,
		created_at: OffsetDateTime::now_utc(),
	};

	messages::append_message(&db, &message).await.expect("Failed to append message.");

	let ids = [message.message_id];

	assert_eq!(
		messages::mark_read(&db.pool, draft.suggestion_id, &ids).await.expect("Mark read failed."),
		1
	);
	assert_eq!(
		messages::mark_read(&db.pool, draft.suggestion_id, &ids).await.expect("Mark read failed."),
		0
	);

	let listed =
		messages::list_messages(&db.pool, draft.suggestion_id).await.expect("List failed.");

	assert_eq!(listed.len(), 1);
	assert!(listed[0].is_read);
	assert_eq!(listed[0].target_user_id, Some(draft.first_party_id));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
