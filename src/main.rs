use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trip_ledger::{
    config::{database, settings},
    core::{
        currency::{CurrencyCatalog, RateProvider},
        report::{self, DisplayMode, TripSummary},
    },
    errors::Result,
    repository::Repository,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load and check the application configuration
    let catalog = Arc::new(CurrencyCatalog::builtin());
    let app_config = settings::load_default_config()
        .and_then(|config| config.validate(&catalog).map(|()| config))
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        "Configuration loaded: home currency {}, {} categories, {} rates",
        app_config.home_currency,
        app_config.categories.len(),
        app_config.rates.len()
    );

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed process-wide state
    let rates: Arc<dyn RateProvider> = Arc::new(app_config.fixed_rates());
    let repository = Repository::new(db, Arc::clone(&catalog), rates, &app_config);
    repository
        .seed(app_config.show_sample_trip)
        .await
        .inspect_err(|e| error!("Failed to seed system state: {}", e))?;

    // 6. Print a summary of every trip
    let mut trip_ids: Vec<String> = Vec::new();
    if let Some(sample) = repository.fetch_sample_trip().await? {
        trip_ids.push(sample.id);
    }
    trip_ids.extend(repository.fetch_trips().await?.into_iter().map(|t| t.id));

    if trip_ids.is_empty() {
        println!("No trips yet.");
    }
    for trip_id in &trip_ids {
        let summary = repository.trip_summary(trip_id).await?;
        print_summary(&summary, repository.home_symbol());
    }

    Ok(())
}

fn print_summary(summary: &TripSummary, symbol: &str) {
    let trip = &summary.trip;
    println!(
        "{} ({} to {}, {} days, {})",
        trip.name,
        trip.start_date,
        trip.end_date,
        trip.length_days(),
        trip.currencies.join("/")
    );

    let status = &summary.budget;
    println!(
        "  Spent {} of {} {}",
        report::format_amount(status.spent, symbol),
        report::format_amount(status.allowance, symbol),
        report::format_progress_bar(status.percent_used(), None)
    );
    if status.over_budget {
        println!(
            "  Over budget by {}",
            report::format_amount(-status.remaining, symbol)
        );
    }

    if summary.breakdown.is_empty() {
        println!("  No entries");
        return;
    }
    let shares = summary.breakdown.display(DisplayMode::Percentage, symbol);
    let amounts = summary
        .breakdown
        .display(DisplayMode::Percentage.toggle(), symbol);
    for ((category, share), (_, amount)) in shares.iter().zip(&amounts) {
        println!("  {category:<16} {amount:>12} {share:>8}");
    }
}
