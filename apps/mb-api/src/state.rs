use std::sync::Arc;

use mb_service::MatchService;
use mb_storage::db::Db;

use crate::auth::AuthState;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MatchService>,
	pub auth: Arc<AuthState>,
}
impl AppState {
	pub async fn new(config: mb_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let auth = AuthState::from_config(&config.security)?;
		let service = MatchService::new(config, db);

		Ok(Self::from_parts(service, auth))
	}

	/// Builds state around an already wired service.
	pub fn from_parts(service: MatchService, auth: AuthState) -> Self {
		Self { service: Arc::new(service), auth: Arc::new(auth) }
	}
}
