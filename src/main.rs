use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Result, WrapErr};
use log::{info, warn};

use ytpost::completion::ChatClient;
use ytpost::config::{self, Config};
use ytpost::favorites::{FavoritesStore, MemoryFavorites, RealtimeDbFavorites};
use ytpost::pipeline::Pipeline;
use ytpost::server::{self, AppState};
use ytpost::youtube::CaptionsClient;

mod cli;

use cli::Cli;

fn setup_logging(to_file: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if to_file {
        let log_dir = log_dir();
        std::fs::create_dir_all(&log_dir)?;
        let log_file = log_dir.join("ytpost.log");
        let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);
        builder.target(env_logger::Target::Pipe(target));
        builder.init();
        info!("Logging initialized: {}", log_file.display());
    } else {
        builder.init();
    }
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytpost")
        .join("logs")
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from(path).wrap_err_with(|| format!("failed to load config {}", path.display())),
        // The default config file is optional; a broken one is reported but not fatal
        None => Ok(Config::load().unwrap_or_else(|e| {
            warn!("Ignoring config {}: {e}", config::config_path().display());
            Config::default()
        })),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_file)?;

    let config = load_config(&cli)?;
    let bind = cli.bind.clone().unwrap_or_else(|| config.bind().to_string());

    let captions_key = config::env_secret(config::CAPTIONS_KEY_ENV);
    let completion_key = config::env_secret(config::COMPLETION_KEY_ENV);
    if captions_key.is_none() {
        warn!("{} is not set; /transcribe will fail", config::CAPTIONS_KEY_ENV);
    }
    if completion_key.is_none() {
        warn!("{} is not set; completions will fail", config::COMPLETION_KEY_ENV);
    }

    let http = reqwest::Client::new();

    let pipeline = Pipeline::new(
        CaptionsClient::new(http.clone(), config.captions_url(), config.captions_host(), captions_key),
        ChatClient::new(http.clone(), config.completion_url(), config.completion_model(), completion_key),
        config.retry_policy(),
    );

    let favorites: Arc<dyn FavoritesStore> = match &config.favorites_url {
        Some(url) => {
            info!("Storing favorites in realtime database at {url}");
            Arc::new(RealtimeDbFavorites::new(
                http.clone(),
                url.as_str(),
                config::env_secret(config::FAVORITES_AUTH_ENV),
            ))
        }
        None => {
            info!("No favorites_url configured, keeping favorites in memory");
            Arc::new(MemoryFavorites::new())
        }
    };

    let app = server::router(Arc::new(AppState { pipeline, favorites }));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .wrap_err_with(|| format!("failed to bind {bind}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
