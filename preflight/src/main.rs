//! `preflight`: decides whether the repository agent runs for the current
//! workflow event, and prepares everything it needs when it does.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::info;

use preflight::core::config::{ActionConfig, keys};
use preflight::core::context::Repository;
use preflight::exit_codes;
use preflight::inline_comment::{InlineCommentRequest, create_inline_comment, describe_failure};
use preflight::io::config::{self, RunEnvironment};
use preflight::io::git::Git;
use preflight::io::github::rest::{DEFAULT_API_URL, RestGithub};
use preflight::io::outputs::ActionsOutputs;
use preflight::io::settings::setup_agent_settings;
use preflight::io::token::{OidcTokenExchange, TokenProvider};
use preflight::logging;
use preflight::mcp_server::InlineCommentServer;
use preflight::prepare::{execute, report_failure};

#[derive(Parser)]
#[command(
    name = "preflight",
    version,
    about = "Event gate and preparation step for the repository agent"
)]
struct Cli {
    /// TOML file with `[inputs]` defaults for keys missing from the environment.
    #[arg(long, global = true)]
    defaults: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize the event, check the trigger, and prepare the selected mode.
    Prepare,
    /// Create one inline review comment on the current pull request.
    InlineComment {
        /// Tool input as JSON: {path, body, line?, startLine?, side?, commit_id?}.
        #[arg(long)]
        request: String,
    },
    /// Serve the inline comment tool over MCP stdio until stdin closes.
    ServeInlineComment,
    /// Write `~/.claude/settings.json` and copy slash commands.
    SetupSettings {
        /// Inline JSON or a path to a JSON file.
        #[arg(long)]
        settings: Option<String>,
        /// Home directory; defaults to `$HOME`.
        #[arg(long)]
        home: Option<PathBuf>,
        /// Directory of `.md` slash commands.
        #[arg(long)]
        commands: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match cli.command {
        Command::Prepare => cmd_prepare(cli.defaults.as_deref()),
        Command::InlineComment { request } => cmd_inline_comment(&request),
        Command::ServeInlineComment => report(cmd_serve_inline_comment()),
        Command::SetupSettings {
            settings,
            home,
            commands,
        } => report(cmd_setup_settings(
            settings.as_deref(),
            home,
            commands.as_deref(),
        )),
    };
    std::process::exit(code);
}

fn report(result: Result<()>) -> i32 {
    match result {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::FAILED
        }
    }
}

fn cmd_prepare(defaults: Option<&Path>) -> i32 {
    let config = match config::capture(defaults) {
        Ok(config) => config,
        Err(err) => {
            let env_only = ActionConfig::from_pairs(std::env::vars());
            return report_failure(&mut ActionsOutputs::from_config(&env_only), &err);
        }
    };
    let mut outputs = ActionsOutputs::from_config(&config);
    if let Err(err) = config.validate() {
        return report_failure(&mut outputs, &anyhow::Error::from(err));
    }
    let env = match RunEnvironment::from_config(&config) {
        Ok(env) => env,
        Err(err) => return report_failure(&mut outputs, &err),
    };

    let tokens = LazyExchange(OidcTokenExchange::from_config(&config));
    let git = Git::new(env.workspace.clone());
    let api_url = env.api_url.clone();
    execute(
        &config,
        &tokens,
        |token| RestGithub::new(&api_url, token),
        &git,
        &env,
        &mut outputs,
    )
}

/// OIDC exchange whose configuration error surfaces only when a token is
/// actually requested.
struct LazyExchange(Result<OidcTokenExchange>);

impl TokenProvider for LazyExchange {
    fn exchange(&self) -> Result<String> {
        match &self.0 {
            Ok(exchange) => exchange.exchange(),
            Err(err) => Err(anyhow!("{err:#}")),
        }
    }
}

fn cmd_inline_comment(raw: &str) -> i32 {
    match run_inline_comment(raw) {
        Ok(json) => {
            println!("{json}");
            exit_codes::OK
        }
        Err(err) => {
            println!("{}", describe_failure(&err));
            exit_codes::FAILED
        }
    }
}

/// Pull request and client from the environment the MCP config sets.
fn inline_comment_target() -> Result<(Repository, u64, RestGithub)> {
    let config = ActionConfig::from_pairs(std::env::vars());
    let required = |key: &str| {
        config
            .non_empty(key)
            .ok_or_else(|| anyhow!("{key} environment variable is required"))
    };
    let repo = Repository::new(required("REPO_OWNER")?, required("REPO_NAME")?);
    let number: u64 = required("PR_NUMBER")?
        .parse()
        .context("PR_NUMBER must be a number")?;
    let token = required("GITHUB_TOKEN")?;
    let api_url = config.non_empty(keys::API_URL).unwrap_or(DEFAULT_API_URL);
    let github = RestGithub::new(api_url, token)?;
    Ok((repo, number, github))
}

fn run_inline_comment(raw: &str) -> Result<String> {
    let (repo, number, github) = inline_comment_target()?;
    let request: InlineCommentRequest =
        serde_json::from_str(raw).context("parse inline comment request")?;
    let outcome = create_inline_comment(&github, &repo, number, request)?;
    serde_json::to_string_pretty(&outcome).context("serialize inline comment result")
}

fn cmd_serve_inline_comment() -> Result<()> {
    let (repo, number, github) = inline_comment_target()?;
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let report =
        InlineCommentServer::new(&github, repo, number).serve(stdin.lock(), &mut stdout)?;
    info!(
        responses = report.responses,
        errors = report.errors,
        "stdin closed"
    );
    Ok(())
}

fn cmd_setup_settings(
    settings: Option<&str>,
    home: Option<PathBuf>,
    commands: Option<&Path>,
) -> Result<()> {
    let home = match home {
        Some(home) => home,
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home"))?,
    };
    let path = setup_agent_settings(settings, &home, commands)?;
    println!("{}", path.display());
    Ok(())
}
