use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use depscan::{
    config::Config,
    invoker::{redact_token, InvokerSettings, ScanInvoker},
    logging::{init_tracing, LogFormat},
    output::{print_summary, OutputFormat},
    runtime::{default_container_user, DockerEngine},
    ScanMode, ScanRun,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};

/// Exit codes. Findings are not a failure; only configuration problems and
/// unrecoverable I/O end the process with an error.
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser, Debug)]
#[command(name = "depscan")]
#[command(
    author,
    version,
    about = "Scan every dependency manifest in a project with a containerized scan engine"
)]
struct Cli {
    /// Path of the project on the container runtime's host
    project_path: PathBuf,

    /// Scan engine credential
    token: String,

    /// Scan each manifest separately or the whole tree at once
    #[arg(short, long, value_enum)]
    mode: Option<ScanMode>,

    /// Local directory where the project is visible (default: /var/src)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Directory to move the final artifacts into (default: /var/reports)
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,

    /// Log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Summary printed after the run (table, json, none)
    #[arg(short, long, default_value = "table")]
    format: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::from(exit_codes::SUCCESS);
        }
        Err(e) => {
            let _ = init_tracing("info", LogFormat::Text);
            error!("Provide the project path and a scan token");
            error!("{}", e.render().to_string().trim_end());
            return ExitCode::from(exit_codes::ERROR);
        }
    };

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => apply_overrides(config, &cli),
        Err(e) => {
            let _ = init_tracing("info", LogFormat::Text);
            error!("{:#}", e);
            return ExitCode::from(exit_codes::ERROR);
        }
    };

    if let Err(e) = init_tracing(&config.log_level, config.log_format) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(exit_codes::ERROR);
    }

    match run(cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

/// Command-line flags win over the config file.
fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(workspace) = &cli.workspace {
        config.workspace_dir = workspace.clone();
    }
    if let Some(report_dir) = &cli.report_dir {
        config.report_dir = report_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config
}

async fn run(cli: Cli, config: Config) -> Result<u8> {
    let format = OutputFormat::from_str(&cli.format).map_err(|e| anyhow::anyhow!(e))?;

    info!("Starting scan");
    info!("mode: {}", config.mode);
    info!("project_path: {}", config.workspace_dir.display());
    info!("host_project_path: {}", cli.project_path.display());
    info!("report_path: {}", config.report_dir.display());
    info!("token: {}", redact_token(&cli.token));

    let user = config
        .container_user
        .clone()
        .or_else(|| default_container_user(&config.workspace_dir));

    let settings = InvokerSettings {
        host_project_path: cli.project_path,
        token: cli.token,
        token_env: config.token_env.clone(),
        per_manifest_repo: config.per_manifest_repo.clone(),
        all_projects_image: config.all_projects_image.clone(),
        detection_depth: config.detection_depth,
        user,
    };

    let runtime = DockerEngine::connect_local().context("Docker is not available")?;

    let scan = ScanRun::new(
        ScanInvoker::new(runtime, settings),
        config.mode,
        config.workspace_dir.clone(),
        config.report_dir.clone(),
        config.renderer.clone(),
    );

    let summary = scan.run().await?;
    print_summary(&summary, format)?;

    Ok(exit_codes::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_two_positionals() {
        assert!(Cli::try_parse_from(["depscan"]).is_err());
        assert!(Cli::try_parse_from(["depscan", "/host/project"]).is_err());
        assert!(Cli::try_parse_from(["depscan", "/host/project", "token", "extra"]).is_err());
    }

    #[test]
    fn test_cli_parses_positionals() {
        let cli = Cli::try_parse_from(["depscan", "/host/project", "token-123"]).unwrap();
        assert_eq!(cli.project_path, PathBuf::from("/host/project"));
        assert_eq!(cli.token, "token-123");
        assert!(cli.mode.is_none());
        assert_eq!(cli.format, "table");
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "depscan",
            "/host/project",
            "token-123",
            "--mode",
            "all-projects",
            "--report-dir",
            "/out",
            "--log-format",
            "json",
        ])
        .unwrap();

        let config = apply_overrides(Config::default(), &cli);

        assert_eq!(config.mode, ScanMode::AllProjects);
        assert_eq!(config.report_dir, PathBuf::from("/out"));
        assert_eq!(config.workspace_dir, PathBuf::from("/var/src"));
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
