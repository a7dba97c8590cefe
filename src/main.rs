use clap::Parser;
use expense_sync::args::{Args, Command};
use expense_sync::{commands, server, Config, Mode, Pipeline, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // When EXPENSE_SYNC_IN_TEST_MODE is set and non-empty, files are kept in memory instead of
    // Google Drive.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.service_account(), init_args.folder_id())
                .await?
                .print()
        }

        Command::Serve(serve_args) => {
            let config = Config::load(home).await?;
            let bind = serve_args
                .bind()
                .unwrap_or(config.bind())
                .to_string();
            let pipeline = Pipeline::new(config, mode).await?;
            server::serve(pipeline, &bind).await?
        }

        Command::Generate(date_args) => {
            let pipeline = Pipeline::new(Config::load(home).await?, mode).await?;
            commands::generate(&pipeline, date_args.date())
                .await?
                .print()
        }

        Command::Report(report_args) => {
            let pipeline = Pipeline::new(Config::load(home).await?, mode).await?;
            commands::report(
                &pipeline,
                report_args.date(),
                report_args.person(),
                report_args.category(),
                report_args.payment_type(),
            )
            .await?
            .print()
        }

        Command::Current(date_args) => {
            let pipeline = Pipeline::new(Config::load(home).await?, mode).await?;
            commands::current(&pipeline, date_args.date())
                .await?
                .print()
        }

        Command::List => {
            let pipeline = Pipeline::new(Config::load(home).await?, mode).await?;
            commands::list(&pipeline).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
