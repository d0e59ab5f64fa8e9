use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = mb_api::Args::parse();

	mb_api::run(args).await
}
