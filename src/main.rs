// Entry point: loads the config, prepares the session and launches the egui/eframe runner.
mod app;
mod ui;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use illusion::cli::Args;
use illusion::config::AppConfig;
use illusion::experiment::session::Session;

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "illusion=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config);
    if let Some(dir) = &args.data_dir {
        config.output.data_dir = dir.clone();
    }
    if args.windowed {
        config.display.fullscreen = false;
    }

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let session = match Session::new(&config, args.participant, rng) {
        Ok(s) => s,
        Err(err) => {
            error!("Cannot start experiment: {err}");
            std::process::exit(1);
        }
    };
    info!(
        "Results go to {}/ ({} blocks)",
        config.output.data_dir,
        session.block_count()
    );

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_for_ctrlc = stop_flag.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        stop_flag_for_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!("Error setting Ctrl-C handler: {err}");
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Illusion")
            .with_inner_size([1280.0, 800.0])
            .with_fullscreen(config.display.fullscreen),
        ..Default::default()
    };

    let display = config.display.clone();
    eframe::run_native(
        "Illusion",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(app::App::new(
                cc,
                session,
                display,
                stop_flag.clone(),
            )))
        }),
    )
}
