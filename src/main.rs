mod collectors;
mod config;
mod evaluate;
mod metrics;
mod probe;
mod report;

use clap::{CommandFactory, Parser};
use config::{Config, ConfigError};
use evaluate::Verdict;
use probe::ProbeError;
use report::Report;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "check-nextcloud")]
#[command(version, about = "Nextcloud serverinfo check for Nagios-compatible monitoring")]
struct Cli {
    /// Nextcloud server URL (e.g. https://nextcloud.example.com)
    #[arg(short = 's', long = "server")]
    server: Option<String>,
    /// Nextcloud NC-Token for API access
    #[arg(short = 't', long = "token")]
    token: Option<String>,
    /// Request timeout, e.g. "10s" or "1500ms"
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
    /// Optional YAML file with defaults and thresholds
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return ExitCode::SUCCESS;
    }

    let outcome = run(&cli).await;
    match &outcome {
        Ok(verdict) => info!(severity = %verdict.severity, "проверка завершена"),
        Err(ProbeError::Config(ConfigError::MissingArguments)) => {
            eprintln!("{}", Cli::command().render_help());
        }
        Err(err) => error!(error = %err, "проверка не выполнена"),
    }

    let report = Report::from_outcome(&outcome);
    println!("{}", report.line);
    ExitCode::from(report.exit_code)
}

async fn run(cli: &Cli) -> Result<Verdict, ProbeError> {
    let cfg = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    let settings = cfg.resolve(cli.server.clone(), cli.token.clone(), cli.timeout)?;
    info!(
        server = %settings.server_url,
        timeout = %humantime::format_duration(settings.timeout),
        "запрос serverinfo"
    );

    probe::run_check(&settings, &cfg.thresholds).await
}

fn init_tracing() {
    // stdout is reserved for the plugin line.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_accepts_short_flags() {
        let args = ["check-nextcloud", "-s", "https://cloud.example", "-t", "tok"];
        let cli = Cli::try_parse_from(args).expect("короткие флаги должны разбираться");
        assert_eq!(cli.server.as_deref(), Some("https://cloud.example"));
        assert_eq!(cli.token.as_deref(), Some("tok"));
        assert!(cli.timeout.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_parses_humantime_timeout() {
        let cli = Cli::try_parse_from(["check-nextcloud", "--timeout", "1500ms"]).unwrap();
        assert_eq!(cli.timeout, Some(Duration::from_millis(1500)));

        assert!(Cli::try_parse_from(["check-nextcloud", "--timeout", "soon"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn missing_arguments_fail_before_any_request() {
        let cli = Cli::try_parse_from(["check-nextcloud", "-t", "tok"]).unwrap();
        let err = run(&cli).await.unwrap_err();
        assert!(matches!(err, ProbeError::Config(ConfigError::MissingArguments)));
        assert_eq!(
            Report::from_outcome(&Err(err)).line,
            "CRITICAL - Missing required arguments"
        );
    }

    fn write_temp_config(name: &str, text: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "check-nextcloud-main-{}-{name}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, text).expect("временный файл конфигурации должен записываться");
        path
    }

    #[tokio::test]
    async fn invalid_config_file_is_fatal() {
        let path = write_temp_config("invalid", "thresholds:\n  memory_warning_percent: 95\n");
        let config = path.display().to_string();
        let args = ["check-nextcloud", "-t", "tok", "--config", config.as_str()];
        let cli = Cli::try_parse_from(args).unwrap();
        let outcome = run(&cli).await;
        let _ = std::fs::remove_file(&path);

        assert!(matches!(
            outcome,
            Err(ProbeError::Config(ConfigError::Validation(_)))
        ));
        let report = Report::from_outcome(&outcome);
        assert!(report.line.starts_with("CRITICAL - Invalid configuration: "));
        assert_eq!(report.exit_code, report::FATAL_EXIT_CODE);
    }

    #[tokio::test]
    async fn config_file_supplies_server_and_thresholds() {
        use crate::collectors::serverinfo::test_support::{
            serverinfo_router, spawn_server, HEALTHY_BODY, TOKEN,
        };

        let base = spawn_server(serverinfo_router(HEALTHY_BODY)).await;
        let path = write_temp_config(
            "server",
            &format!("server_url: \"{base}/\"\nthresholds:\n  cpu_load_1m: 0.1\n"),
        );
        let config = path.display().to_string();
        let args = ["check-nextcloud", "-t", TOKEN, "--config", config.as_str()];
        let cli = Cli::try_parse_from(args).unwrap();
        let outcome = run(&cli).await;
        let _ = std::fs::remove_file(&path);

        let report = Report::from_outcome(&outcome);
        assert_eq!(report.exit_code, 1);
        assert!(report
            .line
            .starts_with("WARNING - High CPU Load - Nextcloud 28.0.4.1 running. | "));
    }
}
