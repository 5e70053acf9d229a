use clap::Parser;
use colored::*;
use std::{net::SocketAddr, path::PathBuf, process::ExitCode};
use tracing::{info, Level};
use tracing_subscriber::{
    field::RecordFields,
    fmt::{self, time::ChronoUtc, FormatFields},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use account_server::{create_app, AccountServer, AppConfig};
use error_common::{log_error, Result, ServiceError};
use logger_redacted::{redact, LoggerConfig};

/// Crates whose logs are shown at the configured level
const LOG_CRATES: &[&str] = &[
    "account-server",
    "auth-identity",
    "auth-gateway",
    "auth-oauth",
    "email-service",
];

/// Account Service HTTP Server
#[derive(Parser, Debug)]
#[command(name = "account-server")]
#[command(about = "User accounts, sessions and administration HTTP API server")]
struct Args {
    /// Server bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file; the environment is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            // Tracing is configured from the config, so this one goes to stderr
            eprintln!("{} {e}", "error:".bright_red());
            return exit_code(&e);
        }
    };

    init_tracing(&config, args.verbose);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error("account-server", &e);
            exit_code(&e)
        }
    }
}

fn exit_code(error: &ServiceError) -> ExitCode {
    ExitCode::from(u8::try_from(error.exit_code()).unwrap_or(1))
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    Ok(config)
}

async fn run(config: AppConfig) -> Result<()> {
    info!("{}", "Starting Account Service HTTP Server".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!("Environment: {}", config.app_env.bright_white());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            ServiceError::ConfigError(format!(
                "invalid bind address {}:{}: {e}",
                config.host, config.port
            ))
        })?;

    let server = AccountServer::connect(config).await?;
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::NetworkError(format!("Failed to bind to {addr}: {e}")))?;

    info!(
        "{}",
        format!("Account Service running on http://{addr}").bright_green()
    );
    info!(
        "{}",
        format!("Health check available at: http://{addr}/api/health").bright_blue()
    );
    info!(
        "{}",
        format!("OpenAPI document at: http://{addr}/api/docs/openapi.json").bright_blue()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::ServerError(format!("HTTP server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

fn init_tracing(config: &AppConfig, verbose: bool) {
    let logger = LoggerConfig::for_environment(&config.app_env, verbose);
    let env_filter = logger.env_filter(LOG_CRATES);
    let use_colors = std::env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout);

    if !logger.json && use_colors {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .event_format(ColoredFormatter)
                    .fmt_fields(ColoredFieldFormatter {
                        redaction_enabled: logger.redaction_enabled,
                    }),
            )
            .init();

        print_startup_banner();
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                       ACCOUNT SERVICE                        ║".bright_cyan());
    println!("{}", "║         Sessions, profiles and user administration           ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

/// Colored single-line development format
struct ColoredFormatter;

impl<S, N> fmt::FormatEvent<S, N> for ColoredFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Utc::now().format("%H:%M:%S%.3f").to_string().bright_black()
        )?;

        let level = match *metadata.level() {
            Level::TRACE => "TRACE".bright_purple(),
            Level::DEBUG => "DEBUG".bright_blue(),
            Level::INFO => " INFO".bright_green(),
            Level::WARN => " WARN".bright_yellow(),
            Level::ERROR => "ERROR".bright_red(),
        };
        write!(writer, "[{level}] ")?;

        if let Some(target) = metadata.target().split("::").last() {
            write!(writer, "{:<15} ", target.bright_cyan())?;
        }

        ctx.format_fields(writer.by_ref(), event)?;

        if metadata.level() <= &Level::DEBUG {
            if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
                let file_short = file.rsplit('/').next().unwrap_or(file);
                write!(
                    writer,
                    " {}",
                    format!("({file_short}:{line})").bright_black()
                )?;
            }
        }

        writeln!(writer)
    }
}

/// Field formatter that runs every value through the PII redactor
struct ColoredFieldFormatter {
    redaction_enabled: bool,
}

impl<'a> FormatFields<'a> for ColoredFieldFormatter {
    fn format_fields<R: RecordFields>(
        &self,
        writer: fmt::format::Writer<'a>,
        fields: R,
    ) -> std::fmt::Result {
        let mut visitor = ColoredFieldVisitor {
            writer,
            redaction_enabled: self.redaction_enabled,
            is_first: true,
            result: Ok(()),
        };
        fields.record(&mut visitor);
        visitor.result
    }
}

struct ColoredFieldVisitor<'a> {
    writer: fmt::format::Writer<'a>,
    redaction_enabled: bool,
    is_first: bool,
    result: std::fmt::Result,
}

impl ColoredFieldVisitor<'_> {
    fn write_field(&mut self, name: &str, value: &str) {
        if self.result.is_err() {
            return;
        }
        let value = if self.redaction_enabled {
            redact(value)
        } else {
            value.to_string()
        };

        self.result = if name == "message" {
            write!(self.writer, "{}", value.white().bold())
        } else {
            let separator = if self.is_first { "" } else { " " };
            write!(
                self.writer,
                "{separator}{}={}",
                name.bright_yellow(),
                value.bright_white()
            )
        };
        self.is_first = false;
    }
}

impl tracing::field::Visit for ColoredFieldVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.write_field(field.name(), &format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.write_field(field.name(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_colored_format_redacts_fields() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(move || writer.clone())
                .event_format(ColoredFormatter)
                .fmt_fields(ColoredFieldFormatter {
                    redaction_enabled: true,
                }),
        );

        tracing::subscriber::with_default(subscriber, || {
            info!(email = "jane.doe@example.com", "Reset link sent");
        });

        let line = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(line.contains("Reset link sent"));
        assert!(line.contains("email"));
        assert!(!line.contains("jane.doe@example.com"));
        assert!(line.ends_with('\n'));
    }
}
