//! Shared fixtures for matchbook tests: ephemeral Postgres databases, in-memory collaborators,
//! and scripted channel adapters.

pub mod channels;
pub mod memory;

mod error;

pub use error::{Error, Result};
pub use memory::{MemoryDirectory, MemoryStore};

use std::{env, future::Future, str::FromStr, thread};

use serde_json::Map;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

use mb_config::{
	Config, EmailChannelConfig, Messaging, Notifications, Postgres, Reminders, Security, Service,
	Storage, Worker, Workflow,
};
use mb_storage::db::Db;

pub const DSN_ENV: &str = "MB_PG_DSN";

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

/// A throwaway database created next to the one `MB_PG_DSN` points at and dropped afterwards.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse {DSN_ENV}: {err}.")))?;
		let (admin_options, mut admin_conn) = connect_admin(&base_options).await?;
		let name = format!("mb_test_{}", Uuid::new_v4().simple());

		admin_conn
			.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.clone().database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options, cleaned: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Connects to the test database and installs the schema.
	pub async fn connect(&self) -> Result<Db> {
		let db = Db::connect(&Postgres { dsn: self.dsn.clone(), pool_max_conns: 4 }).await?;

		db.ensure_schema().await?;

		Ok(db)
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner().await
	}

	async fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		drop_database(&self.name, &self.admin_options).await?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		// Drop can run inside a runtime, so the async cleanup gets its own thread and runtime.
		let cleanup = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test database cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(drop_database(&name, &admin_options)) {
				eprintln!("Test database cleanup failed: {err}.");
			}
		});
		let _ = cleanup.join();
	}
}

pub fn env_dsn() -> Option<String> {
	env::var(DSN_ENV).ok().filter(|dsn| !dsn.trim().is_empty())
}

pub async fn with_test_db<F, Fut, T>(base_dsn: &str, f: F) -> Result<T>
where
	F: FnOnce(&TestDatabase) -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let mut db = TestDatabase::new(base_dsn).await?;
	let result = f(&db).await;

	if let Err(err) = db.cleanup_inner().await {
		eprintln!("Test database cleanup warning: {err}.");

		if result.is_ok() {
			return Err(err);
		}
	}

	result
}

/// A complete, valid configuration for tests: local binds, auth off, email only.
pub fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			public_base_url: "https://app.matchbook.test".to_string(),
		},
		storage: Storage {
			postgres: Postgres {
				dsn: env_dsn().unwrap_or_else(|| "postgres://localhost/matchbook".to_string()),
				pool_max_conns: 4,
			},
		},
		security: Security {
			bind_localhost_only: true,
			auth_mode: "off".to_string(),
			auth_keys: Vec::new(),
		},
		workflow: Workflow::default(),
		reminders: Reminders::default(),
		messaging: Messaging::default(),
		notifications: Notifications {
			channels: vec!["email".to_string()],
			channel_timeout_ms: 5_000,
			email: Some(EmailChannelConfig {
				api_base: "http://127.0.0.1:9".to_string(),
				path: "/send".to_string(),
				api_key: "test-key".to_string(),
				from_address: "noreply@matchbook.test".to_string(),
				default_headers: Map::new(),
			}),
			whatsapp: None,
			push: None,
		},
		worker: Worker::default(),
	}
}

async fn connect_admin(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last_err = Some(err),
		}
	}

	Err(Error::Message(format!("Failed to connect to an admin database: {last_err:?}.")))
}

async fn drop_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options).await.map_err(|err| {
		Error::Message(format!("Failed to connect to admin database for cleanup: {err}."))
	})?;
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	sqlx::query(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}
