pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_mb_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_mb_users.sql")),
				"tables/002_suggestions.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_suggestions.sql")),
				"tables/003_suggestion_status_history.sql" => out.push_str(include_str!(
					"../../../sql/tables/003_suggestion_status_history.sql"
				)),
				"tables/004_suggestion_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_suggestion_messages.sql")),
				"tables/005_notification_outbox.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_notification_outbox.sql")),
				"tables/006_notification_deliveries.sql" => out
					.push_str(include_str!("../../../sql/tables/006_notification_deliveries.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
