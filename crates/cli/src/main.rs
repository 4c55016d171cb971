//! glops CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load `glops.toml` (or `--config`) and apply
//!    flag/environment overrides.
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer
//!    on stderr, plus an OpenTelemetry OTLP exporter when configured.
//! 3. **Construct infrastructure**: build the [`gitlab::GitLabClient`] through
//!    a [`gitlab::ClientAccessor`] and hand it to [`repo_ops::RepoOperations`].
//! 4. **Run one operation**: selected by subcommand; the result is printed to
//!    stdout as JSON (raw bytes for `get-file`).

mod commands;
mod config;
mod observability;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use gitlab::ClientAccessor;
use repo_ops::{InvocationId, RepoOperations};
use tracing::{info_span, Instrument};

use crate::commands::Command;
use crate::config::{Config, Overrides};
use crate::observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "glops")]
#[command(version)]
#[command(about = "Branch, commit, merge-request and mirror operations against a GitLab instance")]
#[command(after_long_help = r#"EXAMPLES
    Commit two files to a branch (created from the base branch if missing):
        $ glops commit -p me/clusterimagesets -b update-sets -m "Update image sets" \
              --file sets/a.yaml=./out/a.yaml --file sets/b.yaml=./out/b.yaml

    Open a merge request into the upstream project:
        $ glops merge-request -p me/clusterimagesets -b update-sets -m "Update image sets"

ENVIRONMENT VARIABLES
    GITLAB_TOKEN         Personal access token (variable name set by gitlab.token_env)
    GLOPS_CONFIG         Config file path
    GLOPS_URL            GitLab instance URL (default: https://gitlab.com)
    GLOPS_BASE_BRANCH    Base branch (default: master)
    GLOPS_MIRROR_URL     Pull mirror source URL
    RUST_LOG             Log filter (default: warn)
"#)]
struct Cli {
    /// Config file (default: ./glops.toml if present)
    #[arg(long, global = true, env = "GLOPS_CONFIG")]
    config: Option<PathBuf>,

    /// GitLab instance URL
    #[arg(long, global = true, env = "GLOPS_URL")]
    url: Option<String>,

    /// Branch new branches start from and merge requests target
    #[arg(long, global = true, env = "GLOPS_BASE_BRANCH")]
    base_branch: Option<String>,

    /// Source URL registered by `mirror`
    #[arg(long, global = true, env = "GLOPS_MIRROR_URL")]
    mirror_url: Option<String>,

    /// Log format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = match observability::init(cli.log_format) {
        Ok(telemetry) => telemetry,
        Err(e) => {
            eprintln!("error: failed to initialise logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let invocation = InvocationId::new_random();
    let result = run(cli)
        .instrument(info_span!("glops", %invocation))
        .await;
    telemetry.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply(Overrides {
        url: cli.url,
        base_branch: cli.base_branch,
        mirror_url: cli.mirror_url,
    });

    let accessor = ClientAccessor::new(config.gitlab.token_env.as_str());
    let client = accessor
        .client(&config.gitlab.url)
        .await
        .context("failed to create GitLab client")?;
    let ops = RepoOperations::new(client, config.repository)?;

    let mut stdout = std::io::stdout();
    commands::execute(&ops, &config.gitlab.url, cli.command, &mut stdout).await
}
