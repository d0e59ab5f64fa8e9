pub mod db;
pub mod deliveries;
pub mod directory;
pub mod history;
pub mod messages;
pub mod models;
pub mod outbox;
pub mod schema;
pub mod suggestions;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
