use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ParseError, suggestion::Suggestion};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	Candidate,
	Matchmaker,
	Admin,
	System,
}
impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Candidate => "CANDIDATE",
			Self::Matchmaker => "MATCHMAKER",
			Self::Admin => "ADMIN",
			Self::System => "SYSTEM",
		}
	}
}
impl FromStr for Role {
	type Err = ParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_uppercase().as_str() {
			"CANDIDATE" => Ok(Self::Candidate),
			"MATCHMAKER" => Ok(Self::Matchmaker),
			"ADMIN" => Ok(Self::Admin),
			"SYSTEM" => Ok(Self::System),
			_ => Err(ParseError::new("role", value)),
		}
	}
}

/// An authenticated identity issuing a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
	pub user_id: Uuid,
	pub role: Role,
}
impl Actor {
	pub fn new(user_id: Uuid, role: Role) -> Self {
		Self { user_id, role }
	}

	/// The clock-driven actor used by deadline sweeps and scheduled resends.
	pub fn system() -> Self {
		Self { user_id: Uuid::nil(), role: Role::System }
	}

	pub fn relation_to(&self, suggestion: &Suggestion) -> Relation {
		Relation::of(self, suggestion)
	}
}

/// How an actor stands with respect to one particular suggestion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
	Matchmaker,
	Admin,
	FirstParty,
	SecondParty,
	System,
	Outsider,
}
impl Relation {
	pub fn of(actor: &Actor, suggestion: &Suggestion) -> Self {
		match actor.role {
			Role::Admin => Self::Admin,
			Role::System => Self::System,
			Role::Matchmaker if actor.user_id == suggestion.matchmaker_id => Self::Matchmaker,
			Role::Candidate if actor.user_id == suggestion.first_party_id => Self::FirstParty,
			Role::Candidate if actor.user_id == suggestion.second_party_id => Self::SecondParty,
			_ => Self::Outsider,
		}
	}

	pub fn is_staff(self) -> bool {
		matches!(self, Self::Matchmaker | Self::Admin)
	}

	pub fn is_party(self) -> bool {
		matches!(self, Self::FirstParty | Self::SecondParty)
	}

	/// Whether the relation grants any read access to the suggestion at all.
	pub fn is_participant(self) -> bool {
		self.is_staff() || self.is_party()
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Matchmaker => "matchmaker",
			Self::Admin => "admin",
			Self::FirstParty => "first_party",
			Self::SecondParty => "second_party",
			Self::System => "system",
			Self::Outsider => "outsider",
		}
	}
}
impl fmt::Display for Relation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Relation {
	type Err = ParseError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim() {
			"matchmaker" => Ok(Self::Matchmaker),
			"admin" => Ok(Self::Admin),
			"first_party" => Ok(Self::FirstParty),
			"second_party" => Ok(Self::SecondParty),
			"system" => Ok(Self::System),
			"outsider" => Ok(Self::Outsider),
			_ => Err(ParseError::new("relation", value)),
		}
	}
}
