use time::macros::datetime;
use uuid::Uuid;

use mb_domain::{
	Action, Actor, Relation, Role, Status, Suggestion, TransitionError,
	transition::{self, allowed_actions, authorize, resolve, rule_for},
};

const ALL_ACTIONS: [Action; 17] = [
	Action::SendToFirstParty,
	Action::ResendToFirstParty,
	Action::SendToSecondParty,
	Action::ResendToSecondParty,
	Action::Approve,
	Action::Decline,
	Action::HoldForReview,
	Action::ShareContact,
	Action::RejectMatch,
	Action::RequestFeedback,
	Action::StartDating,
	Action::EndAfterFirstDate,
	Action::Engage,
	Action::Marry,
	Action::Close,
	Action::Cancel,
	Action::Expire,
];

fn suggestion_in(status: Status) -> Suggestion {
	let mut suggestion = Suggestion::draft(
		Uuid::new_v4(),
		Uuid::new_v4(),
		Uuid::new_v4(),
		datetime!(2026-02-10 08:00 UTC),
	);

	suggestion.status = status;

	suggestion
}

#[test]
fn terminal_states_accept_no_transition() {
	for from in Status::ALL.into_iter().filter(|status| status.is_terminal()) {
		for action in ALL_ACTIONS {
			assert_eq!(rule_for(from, action), None, "{from} must not accept {action}.");
		}
		for to in Status::ALL {
			let err = resolve(from, to).expect_err("Terminal status must reject every target.");

			assert!(
				matches!(&err, TransitionError::Illegal { reason, .. } if reason.contains("terminal")),
				"Unexpected error: {err}"
			);
		}
	}
}

#[test]
fn canonical_forward_path_is_legal() {
	let path = [
		Status::Draft,
		Status::PendingFirstParty,
		Status::FirstPartyApproved,
		Status::PendingSecondParty,
		Status::SecondPartyApproved,
		Status::ContactDetailsShared,
		Status::AwaitingFirstDateFeedback,
		Status::Dating,
		Status::Engaged,
		Status::Married,
	];

	for pair in path.windows(2) {
		resolve(pair[0], pair[1]).expect("Expected canonical edge to exist.");
	}
}

#[test]
fn contact_sharing_requires_approval() {
	for from in [Status::PendingFirstParty, Status::PendingSecondParty, Status::Draft] {
		let err = resolve(from, Status::ContactDetailsShared).expect_err("Expected illegal edge.");

		assert_eq!(
			err,
			TransitionError::Illegal {
				from,
				to: Status::ContactDetailsShared,
				reason: "cannot share contact before both parties approve".to_string(),
			}
		);
	}
	for from in [
		Status::FirstPartyApproved,
		Status::SecondPartyApproved,
		Status::AwaitingMatchmakerApproval,
	] {
		resolve(from, Status::ContactDetailsShared).expect("Expected contact sharing edge.");
	}
}

#[test]
fn every_non_terminal_state_can_close_cancel_or_expire() {
	for from in Status::ALL.into_iter().filter(|status| !status.is_terminal()) {
		for to in [Status::Closed, Status::Cancelled, Status::Expired] {
			resolve(from, to).expect("Expected exit edge.");
		}
	}
}

#[test]
fn resend_reenters_the_same_pending_state() {
	let rule = resolve(Status::PendingFirstParty, Status::PendingFirstParty)
		.expect("Expected resend edge.");

	assert_eq!(rule.action, Action::ResendToFirstParty);
	assert!(rule.permits(Relation::System));
	assert!(resolve(Status::FirstPartyApproved, Status::FirstPartyApproved).is_err());
}

#[test]
fn only_the_pending_party_may_respond() {
	let rule = rule_for(Status::PendingFirstParty, Action::Approve).expect("Expected approve rule.");

	authorize(&rule, Relation::FirstParty).expect("First party may approve.");
	authorize(&rule, Relation::Matchmaker).expect("Matchmaker may approve on their behalf.");

	let err = authorize(&rule, Relation::SecondParty).expect_err("Second party must be refused.");

	assert!(matches!(err, TransitionError::NotPermitted { relation: Relation::SecondParty, .. }));
}

#[test]
fn capabilities_follow_the_actor_relation() {
	let suggestion = suggestion_in(Status::PendingSecondParty);
	let second = Actor::new(suggestion.second_party_id, Role::Candidate);
	let first = Actor::new(suggestion.first_party_id, Role::Candidate);
	let stranger = Actor::new(Uuid::new_v4(), Role::Matchmaker);
	let owner = Actor::new(suggestion.matchmaker_id, Role::Matchmaker);

	assert_eq!(
		allowed_actions(&second, &suggestion).into_iter().collect::<Vec<_>>(),
		vec![Action::Approve, Action::Decline]
	);
	assert!(allowed_actions(&first, &suggestion).is_empty());
	assert!(allowed_actions(&stranger, &suggestion).is_empty());
	assert!(allowed_actions(&owner, &suggestion).contains(&Action::ResendToSecondParty));
	assert!(allowed_actions(&Actor::system(), &suggestion).contains(&Action::Expire));
}

#[test]
fn every_rule_is_reachable_through_resolve() {
	for from in Status::ALL {
		for rule in transition::rules_from(from) {
			assert_eq!(resolve(from, rule.to), Ok(rule));
		}
	}
}
