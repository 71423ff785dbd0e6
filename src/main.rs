//! Command-line entry point for the BGX gatherer.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use log::debug;
use tokio_util::sync::CancellationToken;

use bgx_gatherer::core::bluetooth::{
    BluestTransport, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_SCAN_TIMEOUT_SECS, GatherReport, GatherSession, ReadOutcome, RetryPolicy, RunOutcome,
};
use bgx_gatherer::{DeviceConfig, ProgressReporter, logging};

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_RUN_FAILED: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

const CONFIG_FILE_HELP: &str = "\
Configuration file format:
------------------------------------------
device_address=<MAC_ADDRESS>
service_uuid=<SERVICE_UUID>
characteristic_uuid=<CHARACTERISTIC_UUID>

Example:
device_address=XX:XX:XX:XX:XX:XX
service_uuid=F000C0E0-0451-4000-B000-000000000000
characteristic_uuid=F000C0E1-0451-4000-B000-000000000000
------------------------------------------";

/// Data gathering tool for BGX220S BLE devices.
#[derive(Debug, Parser)]
#[command(name = "bgx-gatherer", version, after_help = CONFIG_FILE_HELP)]
struct Cli {
    /// Path to the configuration file containing device information
    #[arg(short = 'f', long = "config_file")]
    config_file: PathBuf,

    /// Timeout value for the BLE connection in seconds
    #[arg(long = "connection_timeout", default_value_t = DEFAULT_CONNECTION_TIMEOUT_SECS)]
    connection_timeout: f64,

    /// Delay between discovery retries in seconds
    #[arg(long = "retry_delay", default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    retry_delay: f64,

    /// Timeout value for BLE scanning in seconds
    #[arg(long = "scan_timeout", default_value_t = DEFAULT_SCAN_TIMEOUT_SECS)]
    scan_timeout: f64,

    /// Enable verbose output for debugging and detailed information
    #[arg(short, long)]
    verbose: bool,

    /// Print the gathered data as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match DeviceConfig::load(&cli.config_file).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Configuration error:".red(), e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    debug!("Gathering from {}", config.device_address);

    let policy = RetryPolicy::new(
        Duration::from_secs_f64(cli.retry_delay.max(0.0)),
        Duration::from_secs_f64(cli.scan_timeout.max(0.0)),
        Duration::from_secs_f64(cli.connection_timeout.max(0.0)),
    );

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let transport = match BluestTransport::new().await {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("{} {:#}", "Bluetooth error:".red(), e);
            return ExitCode::from(EXIT_RUN_FAILED);
        }
    };

    let reporter = ProgressReporter::new(cli.verbose);
    let session = GatherSession::new(transport, config, policy, reporter);

    match session.run(&token).await {
        RunOutcome::Completed(report) => {
            print_report(&report, cli.json);
            println!("{}", "Data gathering complete.".green());
            ExitCode::SUCCESS
        }
        RunOutcome::DiscoveryFailed { attempts } => {
            eprintln!(
                "Device not found after {attempts} attempts. Please ensure the device is powered on and in range."
            );
            ExitCode::from(EXIT_RUN_FAILED)
        }
        RunOutcome::ConnectionFailed { reason } => {
            eprintln!(
                "{}",
                format!("An error occurred during connection or data gathering: {reason}").red()
            );
            ExitCode::from(EXIT_RUN_FAILED)
        }
        RunOutcome::Interrupted { partial } => {
            if !partial.reads.is_empty() {
                print_report(&partial, cli.json);
            }
            eprintln!("\nOperation interrupted by user. Exiting...");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

/// Prints the gathered data, grouped per service in read order.
fn print_report(report: &GatherReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("{} {}", "Failed to render JSON report:".red(), e),
        }
        return;
    }

    // Reads were produced in selection order, so pairing them back up with
    // the services' readable characteristics is a plain zip.
    let mut reads = report.reads.iter();
    for service in &report.services {
        println!("Found Service: {} - {}", service.uuid, service.description);
        for _ in service.readable_characteristics() {
            let Some(outcome) = reads.next() else {
                return;
            };
            print_outcome(outcome);
        }
    }

    if let Some(data) = &report.onboard_storage {
        println!(
            "{}",
            format!("Onboard Storage Data: {}", format_value(data)).green()
        );
    }
}

fn print_outcome(outcome: &ReadOutcome) {
    match outcome {
        ReadOutcome::Success { uuid, value } => {
            println!("Characteristic {}: {}", uuid, format_value(value));
        }
        ReadOutcome::TimedOut { uuid } => {
            println!(
                "{}",
                format!("Read operation timed out for characteristic {uuid}").red()
            );
        }
        ReadOutcome::Failed { uuid, reason } => {
            println!(
                "{}",
                format!("Failed to read characteristic {uuid}: {reason}").red()
            );
        }
    }
}

/// Hex dump plus a text rendering when the bytes look like ASCII.
fn format_value(value: &[u8]) -> String {
    let hex = format!("{value:02X?}");
    match std::str::from_utf8(value) {
        Ok(text)
            if !text.is_empty()
                && text
                    .trim_end_matches('\0')
                    .chars()
                    .all(|c| c.is_ascii_graphic() || c == ' ') =>
        {
            format!("{hex} \"{}\"", text.trim_end_matches('\0'))
        }
        _ => hex,
    }
}
