pub mod auth;
pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

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

	init_tracing(&config);

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;

	check_binds(&config.security, http_addr, admin_addr)?;

	let state = AppState::new(config).await?;
	let app = routes::router(state.clone());
	let admin_app = routes::admin_router(state);
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let http_server = axum::serve(http_listener, app);
	let admin_listener = TcpListener::bind(admin_addr).await?;

	tracing::info!(%admin_addr, "Admin server listening.");

	let admin_server = axum::serve(admin_listener, admin_app);

	tokio::try_join!(http_server, admin_server)?;

	Ok(())
}

/// Header-trusting auth and the admin surface are only safe on loopback.
fn check_binds(
	security: &mb_config::Security,
	http_addr: SocketAddr,
	admin_addr: SocketAddr,
) -> color_eyre::Result<()> {
	if security.bind_localhost_only && !http_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"http_bind must be a loopback address when bind_localhost_only is true."
		));
	}
	if security.auth_mode == "off" && !http_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"service.http_bind must be a loopback address when security.auth_mode=off."
		));
	}
	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("admin_bind must be a loopback address."));
	}

	Ok(())
}

fn init_tracing(config: &mb_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
	use super::*;

	fn security(auth_mode: &str, bind_localhost_only: bool) -> mb_config::Security {
		mb_config::Security {
			bind_localhost_only,
			auth_mode: auth_mode.to_string(),
			auth_keys: Vec::new(),
		}
	}

	fn addr(raw: &str) -> SocketAddr {
		raw.parse().expect("Test address must parse.")
	}

	#[test]
	fn off_mode_requires_loopback_http() {
		let err = check_binds(&security("off", false), addr("0.0.0.0:8080"), addr("127.0.0.1:8081"))
			.expect_err("Expected public bind to be rejected.");

		assert!(err.to_string().contains("security.auth_mode=off"));
	}

	#[test]
	fn static_keys_may_bind_publicly() {
		assert!(
			check_binds(
				&security("static_keys", false),
				addr("0.0.0.0:8080"),
				addr("127.0.0.1:8081")
			)
			.is_ok()
		);
	}

	#[test]
	fn admin_must_stay_on_loopback() {
		assert!(
			check_binds(
				&security("static_keys", false),
				addr("0.0.0.0:8080"),
				addr("0.0.0.0:8081")
			)
			.is_err()
		);
	}
}
