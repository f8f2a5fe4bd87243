use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use translation_export::config::Config;
use translation_export::db::Database;
use translation_export::export::ExportService;
use translation_export::output::write_files;
use translation_export::telemetry::{LoggingEventPublisher, OnceInTimePublisher};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when not present)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_export=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let params = config.export_params();

    info!("Connecting to {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    let events = Arc::new(OnceInTimePublisher::new(Arc::new(LoggingEventPublisher)));
    let service = ExportService::new(Arc::new(db), events);

    let output = service.export(config.project_id, &params).await?;
    for error in &output.item_errors {
        warn!("Not exported: {}", error);
    }

    let written = write_files(Path::new(&config.output_dir), &output).await?;
    info!(
        "Wrote {} files to {} ({} items skipped)",
        written.len(),
        config.output_dir,
        output.item_errors.len()
    );
    Ok(())
}
