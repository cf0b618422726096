use std::process::ExitCode;

use tracing::{error, info};

use datashare::{Config, Database, FileLifecycleManager, FileStorage, WebServer};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = datashare::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        datashare::logging::init_console_only(&config.logging.level);
    }

    info!("datashare - time-limited file sharing");

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(config: Config) -> datashare::Result<()> {
    config.validate()?;

    let policy = config.sharing_policy();
    let db = Database::open(&config.database.path).await?;
    let storage = FileStorage::new(&config.storage.root, &policy)?;
    info!(
        "Uploads limited to {} bytes, {}-{} days",
        policy.max_file_size, policy.min_expiration_days, policy.max_expiration_days
    );

    let files = FileLifecycleManager::new(db, storage, policy);
    let server = WebServer::new(&config.server, &config.auth.jwt_secret, files)?;
    info!("Server configured on {}", server.addr());

    server
        .run()
        .await
        .map_err(|e| datashare::ShareError::Internal(format!("server error: {e}")))
}
