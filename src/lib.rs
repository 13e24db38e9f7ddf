#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub mod attempt;
pub mod bootstrap;
pub mod node;
pub mod peer_addr;
pub mod peer_list;
pub mod report;
pub mod util;

use crate::bootstrap::{BootstrapConfig, Bootstrapper};
use crate::node::IpfsNode;
use crate::peer_list::PeerList;
use crate::report::BootstrapReport;
use anyhow::Result;
use reqwest::Url;
use std::time::Duration;
use structopt::StructOpt;

/// Longest timeout accepted on the command line: one day.
const MAX_TIMEOUT_SECS: f64 = 24.0 * 60.0 * 60.0;

fn parse_secs(s: &str) -> Result<Duration> {
    let secs: f64 = s.parse()?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(anyhow!("`{}` is not a positive number of seconds", s));
    }
    if secs > MAX_TIMEOUT_SECS {
        return Err(anyhow!(
            "`{}` seconds is more than the maximum of {}",
            s,
            MAX_TIMEOUT_SECS
        ));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_concurrency(s: &str) -> Result<usize> {
    match s.parse::<usize>()? {
        0 => Err(anyhow!("concurrency must be at least 1")),
        n => Ok(n),
    }
}

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "ipfs-bootstrap",
    about = "Connects a local IPFS node to a list of known peers, best effort."
)]
pub struct CmdOptions {
    /// Base URL of the node's HTTP control interface.
    #[structopt(long, default_value = "http://127.0.0.1:5001")]
    pub api: Url,

    /// File with one peer address per line. `#` starts a comment.
    #[structopt(long, parse(from_os_str))]
    pub peers_file: Option<std::path::PathBuf>,

    /// Extra peer address. May be repeated.
    #[structopt(long = "peer", number_of_values = 1)]
    pub peers: Vec<String>,

    /// Do not include the built-in public bootstrap peers.
    #[structopt(long)]
    pub no_default_peers: bool,

    /// Seconds to wait for a single connect attempt.
    #[structopt(long, default_value = "20", parse(try_from_str = parse_secs))]
    pub timeout: Duration,

    /// Seconds to wait for the node to come up.
    #[structopt(long, default_value = "60", parse(try_from_str = parse_secs))]
    pub ready_timeout: Duration,

    /// Number of connect attempts in flight at once.
    #[structopt(long, default_value = "1", parse(try_from_str = parse_concurrency))]
    pub concurrency: usize,

    /// Seconds after which a concurrent run stops waiting for outstanding attempts.
    #[structopt(long, parse(try_from_str = parse_secs))]
    pub max_duration: Option<Duration>,

    /// Where to write the JSON report.
    #[structopt(long, parse(from_os_str))]
    pub report: Option<std::path::PathBuf>,
}

impl CmdOptions {
    pub fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            attempt_timeout: self.timeout,
            ready_timeout: self.ready_timeout,
            concurrency: self.concurrency,
            max_duration: self.max_duration,
            ..BootstrapConfig::default()
        }
    }
}

pub async fn run(opts: CmdOptions) -> Result<BootstrapReport> {
    let peers = PeerList::load(
        !opts.no_default_peers,
        opts.peers_file.as_deref(),
        &opts.peers,
    )?;

    let node = IpfsNode::new(opts.api.clone());
    let bootstrapper = Bootstrapper::new(node, opts.bootstrap_config());
    let report = bootstrapper.run(&peers).await?;

    if let Some(path) = &opts.report {
        report.save(path)?;
    }
    Ok(report)
}
