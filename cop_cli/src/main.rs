mod cli;
mod error_fmt;
mod session;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use cop_core::{ConsoleError, ControlFacade, ViewCfg, WorkerCfg};
use cop_traits::Connector;
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::{Result, WrapErr};
use session::{MonitorParams, Printer};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        tracing::error!(error = %e, "command failed");
        std::process::exit(exit_code_for_error(&e));
    }
}

fn init_tracing(cli: &Cli, logging: &cop_config::Logging) -> Result<()> {
    // RUST_LOG wins over --log-level when set.
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .wrap_err_with(|| format!("invalid --log-level {:?}", cli.log_level))?;

    let console = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            let level = logging.level.as_deref().unwrap_or("info");
            let filter = EnvFilter::try_new(level)
                .wrap_err_with(|| format!("invalid logging.level {level:?}"))?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(filter)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("failed to install tracing subscriber")?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let cfg = cop_config::load_file(&cli.config)
        .map_err(|e| ConsoleError::Config(format!("{}: {e:#}", cli.config.display())))?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), sim = cli.sim, "starting");

    if cli.sim || matches!(cli.cmd, Commands::SelfCheck) {
        let connector = cop_serial::SimulatedConnector::synthetic();
        return dispatch(&cli, &cfg, connector, cop_serial::SIM_PORT);
    }

    #[cfg(feature = "hardware")]
    {
        let connector = cop_serial::SerialConnector::new(cfg.serial.baud_rate);
        dispatch(&cli, &cfg, connector, "")
    }
    #[cfg(not(feature = "hardware"))]
    {
        Err(ConsoleError::Config(
            "serial support not compiled in; rebuild with --features hardware or pass --sim"
                .to_string(),
        )
        .into())
    }
}

/// Explicit `--port`, then `serial.port`, then the backend default.
fn resolve_port(arg: Option<&String>, configured: Option<&String>, fallback: &str) -> Result<String> {
    arg.or(configured)
        .cloned()
        .or_else(|| (!fallback.is_empty()).then(|| fallback.to_string()))
        .ok_or_else(|| {
            ConsoleError::Config("no port: pass --port or set serial.port".to_string()).into()
        })
}

fn dispatch<C: Connector + Send + Sync + 'static>(
    cli: &Cli,
    cfg: &cop_config::Config,
    connector: C,
    default_port: &str,
) -> Result<()> {
    let printer = Printer::new(cli.json);
    let poll = Duration::from_millis(cfg.ui.poll_ms);
    let mut facade = ControlFacade::new(connector, WorkerCfg::from(cfg));
    // The simulated plate only answers on its own port name.
    let configured = if cli.sim { None } else { cfg.serial.port.as_ref() };

    match &cli.cmd {
        Commands::Ports => session::run_ports(&facade, &printer),
        Commands::Monitor {
            port,
            stream,
            duration_s,
            log_data,
        } => {
            let port = resolve_port(port.as_ref(), configured, default_port)?;
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = shutdown.clone();
                ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                    .wrap_err("failed to install Ctrl-C handler")?;
            }
            let record = *log_data || cfg.data_log.enabled;
            let params = MonitorParams {
                port: &port,
                stream: *stream,
                duration: duration_s.map(Duration::from_secs),
                poll,
                view: ViewCfg::from(cfg),
                data_log: record.then(|| (Path::new(&cfg.data_log.dir), cfg.serial.baud_rate)),
                shutdown,
            };
            session::run_monitor(&mut facade, params, &printer)
        }
        Commands::Send { port, command } => {
            let port = resolve_port(port.as_ref(), configured, default_port)?;
            session::run_send(&mut facade, &port, command, poll, &printer)
        }
        Commands::Calibrate {
            port,
            weight,
            timeout_s,
        } => {
            let port = resolve_port(port.as_ref(), configured, default_port)?;
            session::run_calibrate(
                &mut facade,
                &port,
                weight,
                Duration::from_secs(*timeout_s),
                poll,
                &printer,
            )
        }
        Commands::SelfCheck => {
            session::run_self_check(&mut facade, default_port, poll)?;
            println!("OK");
            Ok(())
        }
    }
}
