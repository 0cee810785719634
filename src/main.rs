mod app;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::error;

use topology_viewer::config::ViewerConfig;
use topology_viewer::logging;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Topology snapshot JSON to display.
    #[arg(long, default_value = "topology.json")]
    snapshot: PathBuf,

    /// Optional JSON file overriding layout and interaction settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Re-read the snapshot every N seconds; 0 disables polling.
    #[arg(long, default_value_t = 0)]
    refresh_secs: u64,
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    logging::init();

    let config = match ViewerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            error!("{error:#}");
            std::process::exit(2);
        }
    };
    let refresh = (args.refresh_secs > 0).then(|| Duration::from_secs(args.refresh_secs));

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "topology-viewer",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::TopologyApp::new(
                cc,
                args.snapshot.clone(),
                config.clone(),
                refresh,
            )))
        }),
    )
}
