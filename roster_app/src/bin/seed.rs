//! Insert the four fixed members in one transaction, then print the one named 잔다르크.

use roster_app::error::chain;
use roster_app::operations;
use roster_app::telemetry::init_tracing;
use roster_app::{AppError, Settings, MAIN_PROFILE};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_tracing();
    let settings = Settings::load()?;
    let factory = operations::open_profile(&settings, MAIN_PROFILE).await?;

    match operations::seed_and_query(&factory).await {
        Ok(found) => println!("{}", operations::render(found.as_ref())),
        Err(e) => error!(error = %chain(&e), "seed failed; transaction rolled back"),
    }

    factory.close();
    Ok(())
}
