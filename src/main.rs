use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use authgate::clock::SystemClock;
use authgate::configuration::get_configuration;
use authgate::startup::run;
use authgate::store::PgCredentialStore;
use authgate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = init_telemetry("info") {
        eprintln!("Failed to initialize telemetry: {}", e);
    }

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(
        listener,
        Arc::new(PgCredentialStore::new(pool)),
        configuration.application,
        configuration.jwt,
        Arc::new(SystemClock),
    )?;

    server.await
}
