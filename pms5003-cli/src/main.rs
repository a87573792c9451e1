use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use pms5003_lib::{CancelSignal, Measurement, Pms5003, PmsError, SerialConfig, constants};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

mod logging;
mod output;
mod serve;

/// Read particulate-matter concentrations from a PMS5003 on a serial port.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[command(flatten)]
    sensor: SensorArgs,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[derive(Args, Debug, Clone)]
struct SensorArgs {
    /// Serial device the sensor is attached to.
    #[arg(short, long, global = true, default_value = constants::DEFAULT_PORT)]
    port: String,
    /// Serial line speed.
    #[arg(short, long, global = true, default_value_t = constants::DEFAULT_BAUD_RATE)]
    baud: u32,
    /// Seconds to wait for a valid frame.
    #[arg(short, long, global = true, default_value_t = constants::DEFAULT_SESSION_TIMEOUT.as_secs())]
    timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take one reading and print it (the default).
    Read {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Poll the sensor periodically and serve the latest reading over HTTP.
    Serve {
        /// Seconds between readings.
        #[arg(long, default_value_t = 60)]
        period: u64,
        /// Address to listen on.
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,
    },
}

impl SensorArgs {
    fn sensor(&self) -> Pms5003 {
        let serial = SerialConfig::new(&self.port).with_baud_rate(self.baud);
        Pms5003::new(serial).with_timeout(Duration::from_secs(self.timeout))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    // Held until main returns so buffered file logs are flushed on every exit path
    let _guard = match logging::setup_logging(cli.log_file, &cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelSignal::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down gracefully.");
            ctrl_c.cancel();
        }
    });

    let sensor = cli.sensor.sensor();
    let result = match cli.command.unwrap_or(Command::Read { json: false }) {
        Command::Read { json } => read_once(sensor, json, &cancel).await,
        Command::Serve { period, listen } => serve::run(sensor, Duration::from_secs(period), listen, cancel)
            .await
            .map(|()| ExitCode::SUCCESS),
    };
    exit_code(result)
}

fn exit_code(result: Result<ExitCode>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn read_once(sensor: Pms5003, json: bool, cancel: &CancelSignal) -> Result<ExitCode> {
    report(sensor.read(cancel).await, json)
}

/// Print a reading, or the timeout line when none arrived in time.
fn report(reading: Result<Measurement, PmsError>, json: bool) -> Result<ExitCode> {
    match reading {
        Ok(m) if json => println!("{}", m.to_json_pretty()?),
        Ok(m) => print!("{}", output::render_table(&m)),
        Err(e @ PmsError::Timeout(_)) => {
            // Reported on stdout like a reading, so scripts see why there is none
            println!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(ExitCode::SUCCESS)
}
