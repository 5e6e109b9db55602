use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, mpsc};

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod contacts;
mod controller;
mod domain;
mod inputter;
mod links;
mod loader;
mod model;
mod performers;
mod router;
mod search;
mod table;
mod theme;
mod ui;
mod worker;

use controller::Controller;
use domain::{PortalConfig, PortalError};
use loader::{HttpSheetSource, SheetClient};
use model::{Model, Status};
use performers::HttpPhotoLoader;
use router::Location;
use theme::PreferenceStore;
use ui::PortalUI;

/// Terminal portal for supplier contacts, top performers and team links.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Page to open, e.g. `supplier-contacts` or `#po-tools`
    #[arg(long, default_value = "home")]
    page: String,

    /// Sheet endpoint, overrides the config file
    #[arg(long)]
    endpoint: Option<String>,

    /// Config file (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Where to write the log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: could not set up logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            ratatui::restore();
            error!("Portal failed: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            info!("Portal stopped");
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(args: &Args) -> Result<(), PortalError> {
    let path = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("portal.log"));
    let file = File::create(&path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn load_config(args: &Args) -> Result<PortalConfig, PortalError> {
    let path = match &args.config {
        Some(p) => {
            let expanded = shellexpand::full(p)
                .map_err(|e| PortalError::Io(std::io::Error::other(e.to_string())))?;
            Some(PathBuf::from(expanded.as_ref()))
        }
        None => None,
    };
    let mut cfg = PortalConfig::load(path.as_deref())?;
    if let Some(endpoint) = &args.endpoint {
        cfg = cfg.endpoint(endpoint.as_str());
    }
    Ok(cfg)
}

fn run(args: Args) -> Result<(), PortalError> {
    info!("Starting portal!");

    let cfg = load_config(&args)?;
    let location = Location::parse(&args.page)?;

    let (job_tx, job_rx) = mpsc::channel();
    let (result_tx, result_rx) = mpsc::channel();
    let client = SheetClient::new(Box::new(HttpSheetSource::new(cfg.endpoint.as_str())?));
    let photos = HttpPhotoLoader::new()?;
    let _worker = worker::spawn_worker(client, Box::new(photos), job_rx, result_tx);

    let theme_hint = std::env::var("COLORFGBG").ok();
    let mut model = Model::init(
        &cfg,
        location.0,
        PreferenceStore::new(PreferenceStore::default_path()),
        theme_hint.as_deref(),
        job_tx,
        result_rx,
    );
    let ui = PortalUI::new();
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    Ok(())
}
