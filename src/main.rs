use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;

use deliverables_cli::app;
use deliverables_cli::config::{CoercionPolicy, Settings};
use deliverables_cli::session::Controller;
use deliverables_cli::ui;
use deliverables_cli::wafermap::Palette;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV export to preselect
    csv_path: Option<PathBuf>,

    /// Seed for reproducible wafermap colors (random on every run when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Keep digit-only fields with a leading zero (e.g. 007) as text
    #[arg(long)]
    preserve_leading_zeros: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Run convert, pivot, end test check and wafermap without the interactive UI
    #[arg(long, short = 'b', requires = "csv_path")]
    batch: bool,

    /// C1_MARK value for batch mode (defaults to the first value found)
    #[arg(long, short = 'f', requires = "batch")]
    filter: Option<String>,

    /// Print a JSON summary instead of the status log in batch mode
    #[arg(long, short = 'j', requires = "batch")]
    json: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            coercion: CoercionPolicy {
                preserve_leading_zeros: self.preserve_leading_zeros,
            },
            palette: self.seed.map(Palette::Seeded).unwrap_or_default(),
            ..Settings::default()
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };

    if let Some(path) = &cli.log_file {
        let file = File::create(path)
            .with_context(|| format!("Unable to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if cli.batch {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}

fn run_batch(cli: &Cli) -> Result<bool> {
    let mut controller = Controller::new(cli.settings());
    if let Some(path) = &cli.csv_path {
        controller.select_file(path.clone());
    }

    if controller.convert() {
        match &cli.filter {
            Some(value) => controller.select_filter(value.clone()),
            None => controller.cycle_filter(true),
        }
        if controller.generate_pivot() {
            controller.check_end_test();
        }
        controller.generate_wafermap();
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&controller.summary())?);
    } else {
        for line in controller.status().lines() {
            println!("{}", line.text);
        }
    }

    Ok(!controller.status().has_errors())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if cli.batch {
        if !run_batch(&cli)? {
            std::process::exit(1);
        }
        return Ok(());
    }

    if !std::io::stdout().is_terminal() {
        eprintln!("deliverables-cli error: not a terminal. Use --batch for non-interactive runs.");
        std::process::exit(1);
    }

    let app_state = app::AppState::new(cli.settings(), cli.csv_path.clone());
    ui::run_app(app_state)?;

    Ok(())
}
