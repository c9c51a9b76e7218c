pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::GlobalOptions;
use upkeep_core::config::{AppConfig, ConfigOverrides};

#[derive(Debug, Parser)]
#[command(
    name = "upkeep",
    about = "Upkeep operator CLI",
    long_about = "Run maintenance incidents end to end, inspect vendor ranking and the catalog, and review effective configuration.",
    after_help = "Examples:\n  upkeep run incidents/ac_heatwave.json\n  upkeep rank --issue-type hvac --zip 95054 --severity critical\n  upkeep vendors --service-type plumber\n  upkeep config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to load instead of upkeep.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Process one incident JSON file and print its trace")]
    Run {
        incident: PathBuf,
        #[arg(long, help = "Seed the auto-approval coin flip")]
        seed: Option<u64>,
        #[arg(long, help = "Record the PAID state before CLOSED")]
        record_paid: bool,
        #[arg(long, help = "Use a remote vendor service instead of the simulation")]
        vendor_url: Option<String>,
    },
    #[command(about = "Rank vendors for an issue type, ZIP and severity")]
    Rank {
        #[arg(long)]
        issue_type: String,
        #[arg(long)]
        zip: String,
        #[arg(long, default_value = "MEDIUM")]
        severity: String,
    },
    #[command(about = "List the vendor catalog")]
    Vendors {
        #[arg(long)]
        service_type: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let mut global = GlobalOptions {
        config_path: cli.config,
        overrides: ConfigOverrides { log_level: cli.log_level, ..ConfigOverrides::default() },
    };

    let result = match cli.command {
        Command::Run { incident, seed, record_paid, vendor_url } => {
            global.overrides.approval_seed = seed;
            if record_paid {
                global.overrides.record_paid_state = Some(true);
            }
            if let Some(url) = vendor_url {
                global.overrides.vendor_service_mode =
                    Some(upkeep_core::config::VendorServiceMode::Http);
                global.overrides.vendor_service_base_url = Some(url);
            }
            commands::run::run(&global, &incident)
        }
        Command::Rank { issue_type, zip, severity } => {
            commands::rank::run(&global, &issue_type, &zip, &severity)
        }
        Command::Vendors { service_type } => {
            commands::vendors::run(&global, service_type.as_deref())
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(&global) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays machine-readable.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use upkeep_core::config::LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // Tests and repeated invocations may already own the global subscriber.
    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}
