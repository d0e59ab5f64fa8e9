use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = mb_worker::Args::parse();

	mb_worker::run(args).await
}
