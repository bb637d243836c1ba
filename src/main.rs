use anyhow::Result;
use prepkit_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    prepkit_core::init()?;

    let (config, validation) = Config::load_validated()?;
    tracing::info!(
        "PrepKit starting on {}:{} ({} config warnings)",
        config.server.host,
        config.server.port,
        validation.warnings.len()
    );

    prepkit_server::serve(config).await
}
