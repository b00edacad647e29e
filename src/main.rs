use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dialoguer::Password;
use repomover::App;
use repomover::config::FileConfig;
use repomover::ops::git::RealGit;
use repomover::ops::gitea::RealGitea;
use repomover::ops::stash::RealStash;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

#[derive(Parser)]
#[command(name = "repomover")]
#[command(about = "Move git repositories from a Bitbucket/Stash server to a Gitea server", long_about = None)]
pub struct Cli {
    /// Config file with default option values; flags passed on the command
    /// line override it
    #[arg(short = 'c', long, value_name = "FILE")]
    conf_file: Option<PathBuf>,

    /// Base HTTP URL of the Bitbucket/Stash instance, for interacting with its API
    #[arg(long, value_name = "URL")]
    bitbucket_http_base: Option<String>,

    /// Username to access the Bitbucket API
    #[arg(long, value_name = "USERNAME")]
    bitbucket_username: Option<String>,

    /// Bitbucket/Stash project to move repositories from
    #[arg(long, value_name = "PROJECT_KEY")]
    bitbucket_project: Option<String>,

    /// Base HTTP URL of the Gitea instance, for interacting with its API
    #[arg(long, value_name = "URL")]
    gitea_http_base: Option<String>,

    /// Base SSH URL of the Gitea instance, for interacting with repositories
    #[arg(long, value_name = "URL")]
    gitea_ssh_base: Option<String>,

    /// Gitea API key
    #[arg(long, value_name = "KEY")]
    gitea_api_key: Option<String>,

    /// Organization in Gitea to move repositories to
    #[arg(long, value_name = "NAME")]
    gitea_org: Option<String>,

    /// 'old new' replacements to perform on .gitmodules files; one pair,
    /// separated by a space, per line
    #[arg(long, value_name = "OLD NEW\\n...")]
    gitmodule_mappings: Option<String>,

    /// Working directory for checking out git repositories
    #[arg(long, value_name = "PATH")]
    working_dir: Option<PathBuf>,

    /// Push all branches and tags to the new origin
    #[arg(long)]
    push: bool,
}

impl Cli {
    fn overrides(&self) -> FileConfig {
        FileConfig {
            bitbucket_http_base: self.bitbucket_http_base.clone(),
            bitbucket_username: self.bitbucket_username.clone(),
            bitbucket_project: self.bitbucket_project.clone(),
            gitea_http_base: self.gitea_http_base.clone(),
            gitea_ssh_base: self.gitea_ssh_base.clone(),
            gitea_api_key: self.gitea_api_key.clone(),
            gitea_org: self.gitea_org.clone(),
            gitmodule_mappings: self.gitmodule_mappings.clone(),
            working_dir: self.working_dir.clone(),
            push: self.push.then_some(true),
        }
    }
}

fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();
    let file = match &cli.conf_file {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = file.merge(cli.overrides()).try_into_config()?;

    let bitbucket_password = Password::new()
        .with_prompt(format!(
            "Bitbucket/Stash password for '{}'",
            config.bitbucket_username
        ))
        .interact()?;

    info!("connecting to {}", config.bitbucket_http_base);
    let stash = RealStash::new(
        config.bitbucket_http_base.clone(),
        config.bitbucket_username.clone(),
        bitbucket_password,
    );
    let gitea = RealGitea::new(
        config.gitea_http_base.clone(),
        config.gitea_api_key.clone(),
        config.gitea_org.clone(),
    );
    let app = App::new(config, stash, RealGit, gitea);

    let outcomes = app.cmd_migrate(&mut std::io::stdout()).await?;

    if app.config.push {
        app.cmd_publish(&outcomes, &mut std::io::stdout()).await?;
    } else {
        info!("skipping push");
    }

    Ok(())
}
