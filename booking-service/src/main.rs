use std::sync::Arc;

use anyhow::Result;
use booking_service::api;
use booking_service::currency::{CurrencyApiClient, CurrencyNormalizer, DEFAULT_CURRENCY_API_URL};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "booking-service")]
struct Args {
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    db_host: String,

    #[arg(long, env = "DB_PORT", default_value = "5432")]
    db_port: u16,

    #[arg(long, env = "DB_USER", default_value = "postgres")]
    db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "postgres", hide_env_values = true)]
    db_password: String,

    #[arg(long, env = "DB_NAME", default_value = "booking_inventory")]
    db_name: String,

    #[arg(long, env = "CURRENCY_EXCHANGE_API_KEY", hide_env_values = true)]
    currency_api_key: Option<String>,

    #[arg(long, env = "CURRENCY_EXCHANGE_API_URL", default_value = DEFAULT_CURRENCY_API_URL)]
    currency_api_url: String,

    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,
}

impl Args {
    fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let database_url = args.database_url();

    // Run migrations first
    info!("Running database migrations...");
    let migration_url = database_url.clone();
    tokio::task::spawn_blocking(move || booking_service::run_migrations(&migration_url)).await??;
    info!("Migrations completed successfully");

    let pool = booking_service::connect_pool(&database_url).await?;

    if args.currency_api_key.is_none() {
        warn!("CURRENCY_EXCHANGE_API_KEY is not set, mixed-currency bookings will fail");
    }
    let rates = CurrencyApiClient::new(args.currency_api_key.clone(), args.currency_api_url.clone())?;

    let app_state = api::AppState {
        pool,
        normalizer: CurrencyNormalizer::new(Arc::new(rates)),
    };

    let app = api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Booking service web server started on port {}", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
