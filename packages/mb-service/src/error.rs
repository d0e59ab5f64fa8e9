use mb_domain::{Status, TransitionError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

const STALE_REASON: &str = "suggestion changed concurrently";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unauthorized: {message}")]
	Unauthorized { message: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Illegal transition from {from} to {to}: {reason}.")]
	IllegalTransition { from: Status, to: Status, reason: String },
	#[error("Invalid target: {message}")]
	InvalidTarget { message: String },
	#[error("No applicable recipient: {message}")]
	NoApplicableRecipient { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Rate limited: {message}")]
	RateLimited { message: String, retry_after_seconds: i64 },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	/// The suggestion moved on between read and write, so `to` was computed from a stale `from`.
	pub fn stale(from: Status, to: Status) -> Self {
		Self::IllegalTransition { from, to, reason: STALE_REASON.to_string() }
	}

	/// Whether this is a lost write race rather than a transition the table forbids.
	pub fn is_stale(&self) -> bool {
		matches!(self, Self::IllegalTransition { reason, .. } if reason == STALE_REASON)
	}

	pub(crate) fn forbidden(message: impl Into<String>) -> Self {
		Self::Forbidden { message: message.into() }
	}

	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into() }
	}
}

impl From<TransitionError> for Error {
	fn from(err: TransitionError) -> Self {
		match err {
			TransitionError::Illegal { from, to, reason } =>
				Self::IllegalTransition { from, to, reason },
			err @ TransitionError::NotPermitted { .. } => Self::Forbidden { message: err.to_string() },
		}
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<mb_storage::Error> for Error {
	fn from(err: mb_storage::Error) -> Self {
		match err {
			mb_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			mb_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			mb_storage::Error::NotFound(message) => Self::NotFound { message },
			mb_storage::Error::Conflict(message) => Self::Conflict { message },
			mb_storage::Error::InvalidData(message) => Self::Storage { message },
		}
	}
}

impl From<mb_domain::ParseError> for Error {
	fn from(err: mb_domain::ParseError) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
