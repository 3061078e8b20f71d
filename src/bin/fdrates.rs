use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bank_fd_rates::api::HttpBankApi;
use bank_fd_rates::app::App;
use bank_fd_rates::clock::SystemClock;
use bank_fd_rates::config::{ConfigLoader, ResolvedConfig};
use bank_fd_rates::domain::BankId;
use bank_fd_rates::error::FdError;
use bank_fd_rates::output::{JsonOutput, OutputMode};
use bank_fd_rates::tui::Tui;

#[derive(Parser)]
#[command(name = "fdrates")]
#[command(about = "Fetch and compare fixed deposit rates across banks")]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Path to a JSON config file (default: ./fdrates.json if present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Backend base URL, overrides the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List configured banks and backend connectivity")]
    Banks,
    #[command(about = "Fetch rates for the given banks, one after another")]
    Fetch(FetchArgs),
    #[command(about = "Clear fetched data on the backend")]
    Clear,
}

#[derive(Args)]
struct FetchArgs {
    banks: Vec<String>,

    /// Fetch every configured bank
    #[arg(long, conflicts_with = "banks")]
    all: bool,

    /// Export a spreadsheet after the pass
    #[arg(long)]
    export: bool,
}

type HttpApp = App<HttpBankApi, SystemClock>;

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<FdError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FdError) -> u8 {
    match error {
        FdError::EmptySelection
        | FdError::UnknownBank(_)
        | FdError::InvalidBankId(_)
        | FdError::NothingToExport
        | FdError::ConfigRead(_)
        | FdError::ConfigParse(_) => 2,
        FdError::Status { .. } => 3,
        error if error.is_transport() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    let app = build_app(&config)?;

    match cli.command {
        Some(Commands::Banks) => {
            let result = app.load_registry(&JsonOutput);
            JsonOutput::print_banks(&result).into_diagnostic()
        }
        Some(Commands::Fetch(args)) => run_fetch(args, &app),
        Some(Commands::Clear) => {
            let result = app.clear(&JsonOutput);
            JsonOutput::print_clear(&result).into_diagnostic()
        }
        None => match output_mode {
            OutputMode::Interactive => {
                let mut tui = Tui::new();
                app.load_registry(&tui.sink());
                tui.run(Arc::new(app))
            }
            OutputMode::NonInteractive => Err(miette::Report::msg(
                "command required (try `fdrates --help`)",
            )),
        },
    }
}

fn build_app(config: &ResolvedConfig) -> Result<HttpApp, FdError> {
    let api = HttpBankApi::new(&config.api_base_url, config.request_timeout)?;
    Ok(App::new(
        api,
        SystemClock,
        config.timings,
        config.export_dir.clone(),
    ))
}

fn run_fetch(args: FetchArgs, app: &HttpApp) -> miette::Result<()> {
    app.load_registry(&JsonOutput);

    let selected = if args.all {
        let state = app.state();
        let dashboard = bank_fd_rates::dashboard::lock(&state);
        dashboard.registry().ids().cloned().collect::<Vec<_>>()
    } else {
        args.banks
            .iter()
            .map(|value| value.parse::<BankId>())
            .collect::<Result<Vec<_>, _>>()?
    };

    let report = app.run_fetch_pass(&selected, &JsonOutput)?;
    JsonOutput::print_fetch(&report).into_diagnostic()?;

    if args.export {
        let result = app.export(&JsonOutput)?;
        JsonOutput::print_export(&result).into_diagnostic()?;
    }
    Ok(())
}
