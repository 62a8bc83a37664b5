use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use argh::FromArgs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use skycast::config::LoggingConfig;
use skycast::scheduler::spawn_periodic;
use skycast::{
    AppConfig, ConsolePresenter, FetchOrchestrator, FetchResult, LocationResolver, PipelineEvent,
    Presenter, RefreshScheduler, ResultDispatcher, Trigger, WeatherTransport,
};

#[derive(FromArgs)]
/// Current weather and forecast for your location
struct Args {
    /// path to the configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// fetch once, print the result and exit
    #[argh(switch)]
    once: bool,

    /// enable debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args: Args = argh::from_env();

    let config = AppConfig::load_from_path(args.config)?;
    init_tracing(&config.logging, args.verbose);
    tracing::info!("Skycast {} starting", skycast::VERSION);

    let resolver =
        LocationResolver::new(&config.location).context("Failed to create location resolver")?;
    let transport = WeatherTransport::new(config.weather.clone())
        .context("Failed to create weather transport")?;
    let orchestrator = Arc::new(FetchOrchestrator::new(
        Arc::new(resolver),
        Arc::new(transport),
    ));

    let (scheduler, mut events) = RefreshScheduler::new(orchestrator);
    let scheduler = Arc::new(scheduler);
    let mut dispatcher = ResultDispatcher::new(scheduler.generations());
    let mut presenter = ConsolePresenter::stdout();

    scheduler.trigger(Trigger::Startup);

    if args.once {
        while let Some(event) = events.recv().await {
            let failed = match &event {
                PipelineEvent::Completed { outcome, .. } => {
                    Some(matches!(outcome.result, FetchResult::Failure(_)))
                }
                PipelineEvent::Status { .. } => None,
            };
            dispatcher.dispatch(event, &mut presenter);
            if let Some(failed) = failed {
                return Ok(if failed {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                });
            }
        }
        return Ok(ExitCode::FAILURE);
    }

    let timer = spawn_periodic(scheduler.clone(), config.refresh.interval());
    presenter.on_status("Press Enter to refresh, 'q' to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                dispatcher.dispatch(event, &mut presenter);
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().eq_ignore_ascii_case("q") => break,
                Ok(Some(_)) => {
                    scheduler.trigger(Trigger::Manual);
                }
                Ok(None) => {
                    tracing::debug!("stdin closed, manual refresh disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    timer.abort();
    Ok(ExitCode::SUCCESS)
}
