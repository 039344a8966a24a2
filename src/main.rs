use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pinpad::application::coordinator::Coordinator;
use pinpad::config::CoordinatorConfig;
use pinpad::domain::ports::{InteractionSurfaceRef, RandomSourceRef};
use pinpad::infrastructure::rng::OsRandomSource;
use pinpad::infrastructure::simulated::{SimulatedEngine, SimulatedEngineConfig};
use pinpad::interfaces::console::ConsoleSurface;
use pinpad::interfaces::csv::outcome_writer::OutcomeWriter;
use pinpad::interfaces::csv::transaction_reader::TransactionReader;
use pinpad::interfaces::scripted::ScriptedSurface;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input transactions CSV file (`payload,amount`, payload in hex)
    input: PathBuf,

    /// JSON file with coordinator settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to wait for each PIN entry; 0 waits forever
    #[arg(long)]
    pin_timeout_secs: Option<u64>,

    /// PIN prompts allowed per transaction; 0 allows any number
    #[arg(long)]
    max_pin_prompts: Option<u32>,

    /// PIN the simulated engine accepts
    #[arg(long, default_value = "1234")]
    expected_pin: String,

    /// Amounts above this need a PIN
    #[arg(long, default_value = "0")]
    floor_limit: Decimal,

    /// Comma-separated PIN entries to answer prompts with (`c` cancels).
    /// Prompts are read from the terminal when omitted.
    #[arg(long)]
    pins: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CoordinatorConfig::load(path).into_diagnostic()?,
        None => CoordinatorConfig::default(),
    };
    if let Some(secs) = cli.pin_timeout_secs {
        config = config.with_pin_timeout_secs(secs);
    }
    if let Some(max) = cli.max_pin_prompts {
        config = config.with_max_pin_prompts(max);
    }

    let rng: RandomSourceRef = Arc::new(OsRandomSource::new());
    let engine = Arc::new(SimulatedEngine::new(
        SimulatedEngineConfig {
            expected_pin: cli.expected_pin,
            floor_limit: cli.floor_limit,
            ..SimulatedEngineConfig::default()
        },
        rng.clone(),
    ));
    let coordinator = Coordinator::init(engine, rng, config)
        .await
        .into_diagnostic()?;

    let surface: InteractionSurfaceRef = match cli.pins {
        Some(list) => Arc::new(ScriptedSurface::from_list(&list)),
        None => Arc::new(ConsoleSurface::stdio()),
    };

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = TransactionReader::new(file);
    let mut writer = OutcomeWriter::new(io::stdout());

    for request in reader.transactions() {
        match request {
            Ok(request) => {
                let outcome = coordinator
                    .run(
                        request.payload().to_vec(),
                        Some(request.amount().to_string()),
                        surface.clone(),
                    )
                    .await;
                writer
                    .write_outcome(request.payload(), &outcome)
                    .into_diagnostic()?;
            }
            Err(e) => {
                tracing::error!("Error reading transaction: {}", e);
            }
        }
    }

    writer.flush().into_diagnostic()?;
    coordinator.shutdown().await.into_diagnostic()?;

    Ok(())
}
