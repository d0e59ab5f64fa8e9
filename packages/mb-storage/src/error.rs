#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error("Invalid stored data: {0}")]
	InvalidData(String),
}
impl From<mb_domain::ParseError> for Error {
	fn from(err: mb_domain::ParseError) -> Self {
		Self::InvalidData(err.to_string())
	}
}
