use motion_highlight_common::config::Config;
use motion_highlight_common::frame::Dimensions;
use motion_highlight_viewfinder::camera::SyntheticCamera;
use motion_highlight_viewfinder::display::TracingDisplay;
use motion_highlight_viewfinder::session::Viewfinder;
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(config_path) => match Config::load(&config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {e}", config_path.display());
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        width = config.camera.width,
        height = config.camera.height,
        fps = config.camera.fps,
        threshold = config.highlight.threshold,
        contour_thickness = config.highlight.contour_thickness,
        box_thickness = config.highlight.box_thickness,
        "starting motion-highlight viewfinder"
    );

    let camera = SyntheticCamera::new(
        Dimensions::new(config.camera.width, config.camera.height),
        config.camera.speed,
    );
    let handle = Viewfinder::new(config.camera.clone(), config.highlight.clone())
        .spawn(camera, TracingDisplay::default());

    let control = handle.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, closing camera view");
            control.close();
        }
    });

    match handle.join().await {
        Ok(stats) => info!(
            captured = stats.captured,
            dropped = stats.dropped,
            displayed = stats.displayed,
            skipped = stats.skipped,
            "viewfinder finished"
        ),
        Err(e) => {
            error!(error = %e, "viewfinder failed");
            std::process::exit(1);
        }
    }
}
