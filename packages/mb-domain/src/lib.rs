pub mod actor;
pub mod message;
pub mod notification;
pub mod status;
pub mod suggestion;
pub mod transition;

pub use actor::{Actor, Relation, Role};
pub use message::{Message, SenderRole};
pub use notification::{Channel, NotificationIntent, NotificationKind};
pub use status::{Priority, Status, StatusCategory};
pub use suggestion::{HistoryEntry, Party, PartyType, Suggestion};
pub use transition::{Action, Rule, TransitionError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} value {value:?}.")]
pub struct ParseError {
	pub kind: &'static str,
	pub value: String,
}
impl ParseError {
	pub(crate) fn new(kind: &'static str, value: &str) -> Self {
		Self { kind, value: value.to_string() }
	}
}
