//! track-viz - visualize tracking data from GPX and TCX activity files.

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueHint};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use track_viz::charts;
use track_viz::export_data;
use track_viz::heatmap;
use track_viz::import_data;
use track_viz::logs;
use track_viz::movements::compute_movements;
use track_viz::pace;
use track_viz::webserver::{self, ServerConfig};

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("{value} is not an existing file"))
    }
}

#[derive(Parser, Debug)]
#[command(name = "track-viz", version, about = "Visualize tracking data from GPX and TCX files")]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Also write logs to rotating files in this directory
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a TCX file to a track CSV file
    TcxToCsv {
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        tcx: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        to: PathBuf,
    },

    /// Convert a GPX file to a track CSV file
    GpxToCsv {
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        gpx: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        to: PathBuf,
    },

    /// Plot the speed over time
    Speed {
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        track: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        img: PathBuf,
    },

    /// Plot the one minute moving average of the speed
    SpeedMoving {
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        track: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        img: PathBuf,
    },

    /// Plot the acceleration over time
    Acceleration {
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        track: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        img: PathBuf,
    },

    /// Write the movements time series of a track to CSV
    Movements {
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        track: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        to: PathBuf,
    },

    /// Write an interactive pace chart as a Vega-Lite JSON spec
    Pace {
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        track: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        to: PathBuf,
    },

    /// Draw a heatmap of a track over a background image
    Heatmap {
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        track: PathBuf,
        /// YAML file describing the background image and the plot
        #[arg(long, value_parser = existing_file, value_hint = ValueHint::FilePath)]
        config: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        img: PathBuf,
    },

    /// Run the web GUI
    #[command(alias = "flask")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 5000)]
        port: u16,
        #[arg(long, default_value = "static/heatmap.yml", value_hint = ValueHint::FilePath)]
        heatmap_config: PathBuf,
        /// Where uploads are kept while being processed (default: temp dir)
        #[arg(long, value_hint = ValueHint::DirPath)]
        upload_folder: Option<PathBuf>,
        #[arg(long, default_value_t = webserver::DEFAULT_MAX_CONTENT_LENGTH)]
        max_content_length: usize,
    },
}

fn track_to_csv(track: track_viz::track::Track, to: &Path) -> Result<()> {
    export_data::save_track_csv(&track, to)?;
    info!("{} trackpoints written to {}", track.len(), to.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };
    logs::init(
        logs::level_for_verbosity(cli.verbose),
        cli.log_dir.as_deref(),
    )?;

    match command {
        Commands::TcxToCsv { tcx, to } => track_to_csv(import_data::load_tcx(&tcx)?, &to)?,
        Commands::GpxToCsv { gpx, to } => track_to_csv(import_data::load_gpx(&gpx)?, &to)?,
        Commands::Speed { track, img } => charts::plot_speed(&track, &img)?,
        Commands::SpeedMoving { track, img } => charts::plot_speed_moving_avg(&track, &img)?,
        Commands::Acceleration { track, img } => charts::plot_acceleration(&track, &img)?,
        Commands::Movements { track, to } => {
            let track = export_data::load_track_csv(&track)?;
            let movements = compute_movements(&track.points);
            export_data::save_movements_csv(&movements, &to)?;
            info!("{} movements written to {}", movements.len(), to.display());
        }
        Commands::Pace { track, to } => {
            let track = export_data::load_track_csv(&track)?;
            fs::write(&to, pace::altair_plot_pace(&track)?)?;
            if let Some(average) = pace::average_pace(&compute_movements(&track.points)) {
                info!("average pace {} min/km", pace::format_pace(average));
            }
            info!("pace chart written to {}", to.display());
        }
        Commands::Heatmap { track, config, img } => {
            let heatmap = heatmap::heatmap(&track, &config)?;
            heatmap::save_image(&heatmap, &img)?;
        }
        Commands::Serve {
            host,
            port,
            heatmap_config,
            upload_folder,
            max_content_length,
        } => {
            let defaults = ServerConfig::default();
            webserver::run_webserver(ServerConfig {
                host,
                port,
                upload_folder: upload_folder.unwrap_or(defaults.upload_folder),
                max_content_length,
                heatmap_config,
            })?;
        }
    }

    Ok(())
}
