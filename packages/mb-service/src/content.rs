//! Plain-text and HTML wording for workflow notifications.

use uuid::Uuid;

use mb_domain::{NotificationIntent, NotificationKind, Relation, Status};

use crate::{Contact, Content};

/// Renders `intent` for `recipient`. `counterpart` is the other party for contact-sharing
/// notices and is ignored otherwise.
pub fn render(
	intent: &NotificationIntent,
	suggestion_id: Uuid,
	recipient: &Contact,
	counterpart: Option<&Contact>,
	public_base_url: &str,
) -> Content {
	let link = format!("{}/suggestions/{suggestion_id}", public_base_url.trim_end_matches('/'));
	let (subject, lines) = match intent.kind {
		NotificationKind::StatusChanged => status_changed(intent.status, intent.audience),
		NotificationKind::Reminder => (
			"Reminder: a match suggestion is waiting for your answer".to_string(),
			vec!["A match suggestion is still waiting for your response.".to_string()],
		),
		NotificationKind::Resent => (
			"A match suggestion was sent to you again".to_string(),
			vec!["Your matchmaker sent you this suggestion again. Please take a look.".to_string()],
		),
		NotificationKind::ContactShared => contact_shared(counterpart),
	};
	let greeting = format!("Hello {},", recipient.display_name);
	let mut body = vec![greeting.clone(), String::new()];

	body.extend(lines.iter().cloned());
	body.push(String::new());
	body.push(format!("Open it here: {link}"));

	let mut html = format!("<p>{}</p>", escape(&greeting));

	for line in &lines {
		html.push_str(&format!("<p>{}</p>", escape(line)));
	}

	html.push_str(&format!("<p><a href=\"{}\">View the suggestion</a></p>", escape(&link)));

	Content { subject, body: body.join("\n"), html_body: Some(html), link: Some(link) }
}

fn status_changed(status: Status, audience: Relation) -> (String, Vec<String>) {
	match (status, audience) {
		(Status::PendingFirstParty | Status::PendingSecondParty, _) => (
			"You have a new match suggestion".to_string(),
			vec!["Your matchmaker has a suggestion for you. Please review it and respond.".to_string()],
		),
		(Status::FirstPartyApproved, Relation::Matchmaker) => (
			"The first party approved your suggestion".to_string(),
			vec!["You can now send the suggestion to the second party.".to_string()],
		),
		(Status::SecondPartyApproved, Relation::Matchmaker) => (
			"Both parties approved your suggestion".to_string(),
			vec!["You can now share contact details.".to_string()],
		),
		(Status::FirstPartyDeclined | Status::SecondPartyDeclined, Relation::Matchmaker) => (
			format!("Suggestion update: {}", status.label()),
			vec!["A party declined the suggestion. It is now closed.".to_string()],
		),
		(Status::AwaitingFirstDateFeedback, _) => (
			"How was your first date?".to_string(),
			vec!["Let your matchmaker know how the first date went.".to_string()],
		),
		(Status::Engaged, _) => (
			"Mazal tov on your engagement!".to_string(),
			vec!["The suggestion has been marked as engaged.".to_string()],
		),
		(Status::Married, _) => (
			"Mazal tov on your wedding!".to_string(),
			vec!["The suggestion has been marked as married.".to_string()],
		),
		_ => (
			format!("Suggestion update: {}", status.label()),
			vec![format!("The suggestion is now: {}.", status.label())],
		),
	}
}

fn contact_shared(counterpart: Option<&Contact>) -> (String, Vec<String>) {
	let Some(counterpart) = counterpart else {
		return (
			"Contact details were shared".to_string(),
			vec!["Your matchmaker shared contact details for your match.".to_string()],
		);
	};
	let mut lines = vec![
		format!("Your matchmaker shared {}'s contact details with you.", counterpart.display_name),
		format!("Email: {}", counterpart.email),
	];

	if let Some(phone) = counterpart.phone.as_deref() {
		lines.push(format!("Phone: {phone}"));
	}

	(format!("Contact details for {}", counterpart.display_name), lines)
}

fn escape(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for c in raw.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}

	out
}
