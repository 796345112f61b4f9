use std::error::Error;

use ai_llm_service::telemetry;
use tracing::{Level, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine; the process environment still applies.
    let dotenv = dotenvy::dotenv();

    telemetry::init("info", Level::INFO)?;
    if let Err(e) = dotenv {
        warn!(error = %e, ".env not loaded");
    }

    info!("starting docqa-server");
    api::start().await?;
    Ok(())
}
