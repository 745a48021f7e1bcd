//! # airlog_cli
//!
//! The command-line front end for the airlog instrument logging pipeline.
//!
//! ## Use
//!
//! Generate a template configuration:
//!
//! ```bash
//! airlog_cli -p config.yml new
//! ```
//!
//! Run the ingestion pipeline until interrupted:
//!
//! ```bash
//! airlog_cli -p config.yml run
//! ```
//!
//! Archive yesterday's data log for one instrument directory:
//!
//! ```bash
//! airlog_cli archive -d logs/SENSOR_ARRAY_1
//! ```
//!
//! The archive subcommand exits non-zero when it cannot identify exactly one
//! file to archive, so it can be supervised from cron.

use clap::{Arg, ArgAction, Command};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use libairlog::archive;
use libairlog::config::Config;
use libairlog::process;

fn make_template_config(path: &Path) {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config).unwrap();
    let mut file = File::create(path).expect("Could create template config file!");
    file.write_all(yaml_str.as_bytes())
        .expect("Failed to write yaml data to file!");
}

fn main() {
    // Create a cli
    let matches = Command::new("airlog_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(Command::new("run").about("Run the instrument ingestion pipeline"))
        .subcommand(
            Command::new("archive")
                .about("Archive yesterday's data log from a log directory")
                .arg(
                    Arg::new("dir")
                        .short('d')
                        .long("dir")
                        .required(true)
                        .help("Log directory to search for yesterday's data file"),
                )
                .arg(
                    Arg::new("keep")
                        .short('k')
                        .long("keep")
                        .action(ArgAction::SetTrue)
                        .help("Keep the original file after compression"),
                ),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    simplelog::CombinedLogger::init(vec![
        simplelog::TermLogger::new(
            simplelog::LevelFilter::Info,
            simplelog::Config::default(),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        ),
        simplelog::WriteLogger::new(
            simplelog::LevelFilter::Info,
            simplelog::Config::default(),
            File::create("./airlog.log").expect("Could not create log file!"),
        ),
    ])
    .expect("Could not create logging!");

    if let Some(("archive", sub_matches)) = matches.subcommand() {
        let log_dir = PathBuf::from(sub_matches.get_one::<String>("dir").expect("required"));
        let keep = sub_matches.get_flag("keep");
        match archive::archive_yesterday(&log_dir, !keep) {
            Ok(zip_path) => {
                log::info!("Data log archived successfully to {zip_path:?}");
            }
            Err(e) => {
                log::error!("{e}");
                log::error!("Terminating execution");
                std::process::exit(1);
            }
        }
        return;
    }

    // Both remaining subcommands need the config path
    let config_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        log::info!("Done.");
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Log Path: {}", config.log_path.to_string_lossy());
    for instrument in config.instruments.iter() {
        log::info!("Instrument: {} on {}", instrument.name, instrument.device);
    }

    // Cooperative shutdown: Ctrl-C raises the stop flag, the loops exit between iterations
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::Relaxed);
    }) {
        log::warn!("Could not install the Ctrl-C handler: {e}");
    }

    match process::run(&config, stop) {
        Ok(_) => log::info!("Pipeline stopped cleanly."),
        Err(e) => {
            log::error!("Pipeline failed with error: {e}");
            std::process::exit(1);
        }
    }

    log::info!("Done.");
}
