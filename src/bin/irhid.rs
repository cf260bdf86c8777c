use clap::{ArgAction, Parser, Subcommand};
use irhid::config;
use log::{Level, LevelFilter, Metadata, Record};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "irhid",
    version = env!("CARGO_PKG_VERSION"),
    about = "Infrared remote to USB HID bridge",
    subcommand_required = true
)]
struct App {
    /// Increase message verbosity
    #[arg(long, short, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    /// Silence all warnings
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Location of the settings file
    #[arg(long, short, global = true, default_value = config::DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Receive IR and send HID key presses
    Run(commands::run::Run),
    /// Validate the settings file and print the resolved configuration
    Check,
}

fn main() {
    let args = App::parse();

    log::set_logger(&CLI_LOGGER).unwrap();

    let level = if args.quiet {
        LevelFilter::Error
    } else {
        match args.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    log::set_max_level(level);

    match &args.command {
        Commands::Run(run) => commands::run::run(&args.config, run),
        Commands::Check => commands::check::check(&args.config),
    }
}

static CLI_LOGGER: CliLogger = CliLogger;

struct CliLogger;

impl log::Log for CliLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!(
                "{}: {}",
                match record.level() {
                    Level::Trace => "trace",
                    Level::Debug => "debug",
                    Level::Info => "info",
                    Level::Warn => "warn",
                    Level::Error => "error",
                },
                record.args()
            );
        }
    }

    fn flush(&self) {}
}
