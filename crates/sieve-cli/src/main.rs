mod config;
mod server;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use policy_sieve::{Orchestrator, PolicyFilter, RecordStore};
use sieve_crawler::{Discovery, Document, Fetcher, HttpFetcher, OnError, Scope, Target};
use tokio::runtime;

use crate::config::AppConfig;

/// Policy page scraper
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[command(name = "serve")]
    Serve(ServeArgs),
    #[command(name = "scrap")]
    Scrap(ScrapArgs),
    #[command(name = "discover")]
    Discover(DiscoverArgs),
    #[command(hide = true)]
    Completion,
}

/// Options shared by every subcommand
#[derive(Debug, clap::Args)]
pub struct CommonArgs {
    /// Optional yaml configuration file
    #[arg(env = "SIEVE_CONFIG", long)]
    pub config: Option<PathBuf>,
    /// Override crawler's user agent
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Override crawler's maximum depth from entry pages
    #[arg(long)]
    pub max_depth: Option<usize>,
    /// Override crawler's maximum concurrent page downloads
    #[arg(long)]
    pub concurrent_downloads: Option<usize>,
    /// Override crawler's per page timeout (seconds)
    #[arg(long)]
    pub fetch_timeout: Option<u64>,
    /// Override crawler's scrape pass deadline (seconds)
    #[arg(long)]
    pub pass_timeout: Option<u64>,
    /// Override crawler's download error handling strategy
    #[arg(value_enum, long)]
    pub on_dl_error: Option<OnError>,
    /// When quiet no logs are outputted
    #[arg(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CommonArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CommonArgs) -> Result<Self, Self::Error> {
        let mut conf = AppConfig::load(args.config.as_deref())?;
        if let Some(user_agent) = &args.user_agent {
            conf.crawler.user_agent = user_agent.to_string();
        }
        if let Some(max_depth) = args.max_depth {
            conf.crawler.max_depth = max_depth;
        }
        if let Some(concurrent_downloads) = args.concurrent_downloads {
            conf.crawler.concurrent_downloads = concurrent_downloads;
        }
        if let Some(fetch_timeout) = args.fetch_timeout {
            conf.crawler.fetch_timeout = fetch_timeout;
        }
        if let Some(pass_timeout) = args.pass_timeout {
            conf.crawler.pass_timeout = pass_timeout;
        }
        if let Some(on_dl_error) = args.on_dl_error {
            conf.crawler.on_dl_error = on_dl_error;
        }
        Ok(conf)
    }
}

/// Receive observed pages over HTTP and scrape their policy links
#[derive(Debug, clap::Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Override the listening host
    #[arg(long)]
    pub host: Option<String>,
    /// Override the listening ports, tried in order
    #[arg(long, value_delimiter = ',')]
    pub ports: Option<Vec<u16>>,
}

pub fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut conf = AppConfig::try_from(&args.common)?;
    if let Some(host) = args.host {
        conf.server.host = host;
    }
    if let Some(ports) = args.ports {
        conf.server.ports = ports;
    }

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(RecordStore::new()),
        HttpFetcher::new(&conf.crawler)?,
        PolicyFilter::new(conf.filter),
        conf.crawler,
    ));

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(server::serve(orchestrator, &conf.server))
}

/// Filter a single page and print its policy fragments to stdout
#[derive(Debug, clap::Args)]
#[command(group = clap::ArgGroup::new("page").required(true))]
pub struct ScrapArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// A local html page to scrap
    #[arg(group = "page", long)]
    pub file: Option<PathBuf>,
    /// A distant html page to scrap
    #[arg(group = "page", long)]
    pub url: Option<String>,
}

pub fn scrap(args: ScrapArgs) -> anyhow::Result<()> {
    let conf = AppConfig::try_from(&args.common)?;
    let page = if let Some(url) = args.url {
        let fetcher = HttpFetcher::new(&conf.crawler)?;
        let target = Target::parse(&url, 1)?;
        let scope = Scope::for_url(&target.url, conf.crawler.max_depth)?;
        let rt = runtime::Builder::new_current_thread().enable_all().build()?;
        rt.block_on(fetcher.fetch(&target, &scope))?.body
    } else if let Some(path) = args.file {
        fs::read_to_string(&path)?
    } else {
        anyhow::bail!("Missing `url` or `file`");
    };

    let filter = PolicyFilter::new(conf.filter);
    print!("{}", filter.extract(Document::parse(&page).elements()));
    Ok(())
}

/// Find login pages from a homepage and print the policies they link to
#[derive(Debug, clap::Args)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// The homepage to start from
    #[arg(long)]
    pub url: String,
}

pub fn discover(args: DiscoverArgs) -> anyhow::Result<()> {
    let conf = AppConfig::try_from(&args.common)?;
    let fetcher = HttpFetcher::new(&conf.crawler)?;

    let rt = runtime::Builder::new_current_thread().enable_all().build()?;
    let policies = rt.block_on(Discovery::new(&fetcher, &conf.crawler).run(&args.url))?;

    for policy in policies {
        println!("Policy {} (from {})", policy.policy_url, policy.login_url);
        println!("----- Start of Policy Content -----");
        println!("{}", policy.text);
        println!("----- End of Policy Content -----");
    }
    Ok(())
}

fn init_logging(quiet: bool) {
    if !quiet {
        env_logger::Builder::from_env(
            env_logger::Env::default()
                .default_filter_or("policy_sieve=info,sieve_crawler=info,sieve=info"),
        )
        .init();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Serve(args) => {
            init_logging(args.common.quiet);
            serve(args)
        }
        SubCommand::Scrap(args) => {
            init_logging(args.common.quiet);
            scrap(args)
        }
        SubCommand::Discover(args) => {
            init_logging(args.common.quiet);
            discover(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "sieve", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "sieve",
            "serve",
            "--max-depth",
            "3",
            "--on-dl-error",
            "fail",
            "--ports",
            "9000,9001",
        ]);
        let SubCommand::Serve(serve) = args.cmd else {
            panic!("expected serve");
        };
        let conf = AppConfig::try_from(&serve.common).unwrap();
        assert_eq!(3, conf.crawler.max_depth);
        assert_eq!(OnError::Fail, conf.crawler.on_dl_error);
        assert_eq!(Some(vec![9000, 9001]), serve.ports);
    }

    #[test]
    fn scrap_needs_a_page() {
        assert!(Args::try_parse_from(["sieve", "scrap"]).is_err());
        assert!(Args::try_parse_from([
            "sieve",
            "scrap",
            "--file",
            "a.html",
            "--url",
            "https://a.example/"
        ])
        .is_err());
    }
}
