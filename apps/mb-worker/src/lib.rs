pub mod worker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mb_service::{MatchService, NotificationDispatcher};
use mb_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = mb_cli::VERSION,
	rename_all = "kebab",
	styles = mb_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = mb_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let dispatcher = NotificationDispatcher::from_config(&config.notifications)?;

	tracing::info!(channels = ?dispatcher.channels(), "Notification worker starting.");

	let state = worker::WorkerState {
		settings: config.worker.clone(),
		public_base_url: config.service.public_base_url.clone(),
		service: MatchService::new(config, Db::from_pool(db.pool.clone())),
		db,
		dispatcher,
	};

	worker::run_worker(state).await
}
