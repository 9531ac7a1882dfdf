use std::{
    io::{IsTerminal, stderr},
    net::SocketAddr,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use chart::{Chart, UserHistory};
use clap::{Parser, ValueEnum};
use config::IdentityTable;
use eyre::{Context, eyre};
use reqwest::Url;
use routes::create_router;
use tracing::{debug, error, info, level_filters::LevelFilter, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vatsim::VatsimClient;
use viewer::Viewer;

mod chart;
mod config;
mod legend;
mod monthly;
mod routes;
mod sessions;
mod vatsim;
mod viewer;

/// Default log level.
const DEFAULT_LOG_LEVEL: LevelFilterWrapper = if cfg!(debug_assertions) {
    LevelFilterWrapper::Debug
} else {
    LevelFilterWrapper::Info
};

#[derive(clap::Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
struct CliOptions {
    /// Address/port to serve the chart on
    #[arg(short, long = "listen-on", default_value = "127.0.0.1:3000")]
    listen_addr: SocketAddr,

    /// Log verbosity
    #[arg(short, long, alias = "log-level", value_enum, default_value_t = DEFAULT_LOG_LEVEL)]
    verbosity: LevelFilterWrapper,

    /// File to print logs to in addition to the console
    #[arg(short = 'o', long)]
    log_file: Option<PathBuf>,

    /// TOML file to read controllers from instead of the built-in list
    #[arg(short, long)]
    identities: Option<PathBuf>,

    /// Base URL of the VATSIM API
    #[arg(long, default_value = vatsim::DEFAULT_API_BASE_URL)]
    api_base_url: Url,

    /// Write the chart page to this file and exit instead of serving it
    #[arg(short, long)]
    write_html: Option<PathBuf>,
}

// This type exists so clap can figure out what variants are available for the verbosity option.
// If we use LevelFilter directly, it uses the Display and FromStr implementations, which means
// there isn't a list of possible variants for clap to use.
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LevelFilterWrapper {
    Off,
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LevelFilterWrapper> for LevelFilter {
    fn from(val: LevelFilterWrapper) -> Self {
        match val {
            LevelFilterWrapper::Off => LevelFilter::OFF,
            LevelFilterWrapper::Trace => LevelFilter::TRACE,
            LevelFilterWrapper::Debug => LevelFilter::DEBUG,
            LevelFilterWrapper::Info => LevelFilter::INFO,
            LevelFilterWrapper::Warn => LevelFilter::WARN,
            LevelFilterWrapper::Error => LevelFilter::ERROR,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = CliOptions::parse();

    // Set up logging. The guard flushes the log file when dropped.
    let _log_guard = match init_logging(cli.verbosity.into(), cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: failed to initialize logger: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let identities = match &cli.identities {
        Some(path) => match IdentityTable::parse_from_file(path).await {
            Ok(table) => table,
            Err(err) => {
                error!("{err:#}");
                return ExitCode::FAILURE;
            }
        },
        None => IdentityTable::default(),
    };

    // Fetch everything first, then lay out the chart
    let client = VatsimClient::new(cli.api_base_url.clone());
    let histories = match fetch_histories(&client, &identities).await {
        Ok(histories) => histories,
        Err(err) => {
            error!("Failed to fetch ATC history: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let viewer = match Chart::plot(&histories)
        .wrap_err("Failed to plot chart")
        .and_then(Viewer::new)
    {
        Ok(viewer) => Arc::new(viewer),
        Err(err) => {
            error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match &cli.write_html {
        Some(path) => write_html(&viewer, path).await,
        None => serve(viewer, cli.listen_addr).await,
    };
    if let Err(err) = result {
        error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Log to stderr, and to `log_file` if given.
fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> eyre::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| eyre!("{} is not a file path", path.display()))?;
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(level)
        .with(
            fmt::layer()
                .with_writer(stderr)
                .with_ansi(stderr().is_terminal()),
        )
        .with(file_layer)
        .try_init()?;
    Ok(guard)
}

/// Fetch and aggregate every controller's history, one after the other, in table order.
async fn fetch_histories(
    client: &VatsimClient,
    identities: &IdentityTable,
) -> eyre::Result<Vec<UserHistory>> {
    let mut histories = Vec::new();
    for (name, identity) in identities.iter() {
        info!("Getting data for {name}");
        let totals = client
            .monthly_atc_hours(identity.id)
            .await
            .wrap_err_with(|| format!("Failed to get ATC hours of {name}"))?;
        if totals.is_empty() {
            warn!("{name} has no ATC sessions in their recent history");
        }
        debug!(
            user = name,
            months = totals.iter().count(),
            hours = totals.total_hours(),
            "Aggregated ATC sessions"
        );
        histories.push(UserHistory {
            name: name.to_owned(),
            color: identity.color.clone(),
            totals,
        });
    }
    Ok(histories)
}

async fn write_html(viewer: &Viewer, path: &Path) -> eyre::Result<()> {
    tokio::fs::write(path, viewer.to_html()?)
        .await
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote chart to {}", path.display());
    Ok(())
}

/// Serve the chart until Ctrl-C.
async fn serve(viewer: Arc<Viewer>, listen_addr: SocketAddr) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .wrap_err_with(|| format!("Failed to listen on {listen_addr}"))?;
    info!("Chart available at http://{listen_addr}");
    axum::serve(listener, create_router(viewer))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Unable to wait for Ctrl-C: {err}");
            }
        })
        .await?;
    info!("Shutting down");
    Ok(())
}
