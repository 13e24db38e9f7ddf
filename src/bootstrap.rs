use crate::attempt::{AttemptResult, Outcome};
use crate::node::IpfsNode;
use crate::peer_addr::PeerAddr;
use crate::peer_list::PeerList;
use crate::report::BootstrapReport;
use crate::util::{deadline_after, MAX_WAIT};
use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;

#[derive(Error, Debug)]
pub enum BootstrapErr {
    /// The local node never answered, or stopped answering during the run.
    #[error("control interface at {0} is unavailable: {1}")]
    ControlUnavailable(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Upper bound for a single connect attempt.
    pub attempt_timeout: Duration,
    /// How long to wait for the node to answer before giving up.
    pub ready_timeout: Duration,
    /// Delay between readiness polls.
    pub poll_interval: Duration,
    /// Maximum number of attempts in flight. 1 means one after the other, in list order.
    pub concurrency: usize,
    /// Caps the concurrent fan-out below the summed attempt timeouts.
    pub max_duration: Option<Duration>,
}

impl Default for BootstrapConfig {
    fn default() -> BootstrapConfig {
        BootstrapConfig {
            attempt_timeout: Duration::from_secs(20),
            ready_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
            concurrency: 1,
            max_duration: None,
        }
    }
}

/// Connects a freshly started node to a list of known peers, best effort.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    node: Arc<IpfsNode>,
    config: BootstrapConfig,
}

impl Bootstrapper {
    /// Extra time on top of the summed attempt timeouts before the run is cut off.
    const DEADLINE_GRACE: Duration = Duration::from_secs(1);

    pub fn new(node: IpfsNode, config: BootstrapConfig) -> Bootstrapper {
        Bootstrapper {
            node: Arc::new(node),
            config,
        }
    }

    fn unavailable_(&self, reason: String) -> BootstrapErr {
        BootstrapErr::ControlUnavailable(self.node.api_url().to_string(), reason)
    }

    /// Bound on the whole fan-out: every attempt running into its timeout, one after the other.
    pub fn deadline_for(&self, num_peers: usize) -> Duration {
        let num_peers = u32::try_from(num_peers).unwrap_or(u32::MAX);
        let budget = self
            .config
            .attempt_timeout
            .checked_mul(num_peers)
            .and_then(|d| d.checked_add(Bootstrapper::DEADLINE_GRACE))
            .unwrap_or(MAX_WAIT);
        match self.config.max_duration {
            Some(max_duration) => budget.min(max_duration),
            None => budget,
        }
        .min(MAX_WAIT)
    }

    /// Attempts every address in `peers` once.
    ///
    /// Unreachable, rejected, malformed and timed out peers are recorded in the report
    /// and never fail the run. Only a node whose control interface cannot be reached is
    /// an error.
    pub async fn run(&self, peers: &PeerList) -> Result<BootstrapReport, BootstrapErr> {
        let node_id = self
            .node
            .wait_ready(self.config.ready_timeout, self.config.poll_interval)
            .await
            .map_err(|e| self.unavailable_(e.to_string()))?;
        info!(
            "Node {} is ready at {}, bootstrapping {} peers",
            node_id,
            self.node.api_url(),
            peers.len()
        );

        let results = if self.config.concurrency <= 1 {
            self.run_sequential_(peers).await
        } else {
            self.run_concurrent_(peers).await
        };

        // Malformed addresses never reach the node, so they say nothing about it.
        let sent: Vec<&Outcome> = results
            .iter()
            .map(|r| &r.outcome)
            .filter(|outcome| !matches!(outcome, Outcome::Malformed(_)))
            .collect();
        let all_unreachable = sent
            .iter()
            .all(|outcome| matches!(outcome, Outcome::Unreachable(_)));
        if !sent.is_empty() && all_unreachable {
            return Err(self.unavailable_(format!(
                "all {} connect attempts failed to reach it",
                sent.len()
            )));
        }

        let mut report = BootstrapReport::new(node_id, results);
        match self.node.swarm_peers().await {
            Ok(swarm_peers) => report.swarm_peers = Some(swarm_peers),
            Err(e) => warn!("Could not query swarm peers: {}", e),
        }
        info!("Bootstrap done: {}", report);
        Ok(report)
    }

    async fn run_sequential_(&self, peers: &PeerList) -> Vec<AttemptResult> {
        let mut results = Vec::with_capacity(peers.len());
        for (index, raw) in peers.iter().enumerate() {
            let timeout = self.config.attempt_timeout;
            results.push(Bootstrapper::attempt(&self.node, index, raw, timeout).await);
        }
        results
    }

    async fn run_concurrent_(&self, peers: &PeerList) -> Vec<AttemptResult> {
        let budget = self.deadline_for(peers.len());
        let deadline = deadline_after(budget);
        let (send_chan, mut recv_chan) = mpsc::unbounded_channel();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = Vec::with_capacity(peers.len());
        for (index, raw) in peers.iter().enumerate() {
            let node = self.node.clone();
            let semaphore = semaphore.clone();
            let send_chan = send_chan.clone();
            let raw = raw.to_string();
            let timeout = self.config.attempt_timeout;
            tasks.push(tokio::spawn(async move {
                let attempt = async {
                    let _permit = semaphore.acquire().await;
                    Bootstrapper::attempt(&node, index, &raw, timeout).await
                };
                // Attempts still queued or in flight at the deadline are dropped, so
                // nothing is sent to the node once the run is over.
                if let Ok(result) = tokio::time::timeout_at(deadline, attempt).await {
                    let _ = send_chan.send(result);
                }
            }));
        }
        drop(send_chan);

        let mut slots: Vec<Option<AttemptResult>> = vec![None; peers.len()];
        loop {
            match tokio::time::timeout_at(deadline, recv_chan.recv()).await {
                Ok(Some(result)) => {
                    let index = result.index;
                    slots[index] = Some(result);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("Bootstrap deadline of {:?} passed", budget);
                    break;
                }
            }
        }
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Connect task failed: {}", e);
            }
        }

        slots
            .into_iter()
            .zip(peers.iter())
            .enumerate()
            .map(|(index, (slot, raw))| {
                slot.unwrap_or_else(|| AttemptResult::new(index, raw, Outcome::TimedOut, budget))
            })
            .collect()
    }

    /// Makes one connect attempt. Never fails: every error becomes the attempt's outcome.
    pub async fn attempt(
        node: &IpfsNode,
        index: usize,
        raw: &str,
        timeout: Duration,
    ) -> AttemptResult {
        let start = Instant::now();
        let outcome = match PeerAddr::parse(raw) {
            Ok(addr) => match node.connect(&addr, timeout).await {
                Ok(()) => Outcome::Connected,
                Err(e) => e.into(),
            },
            Err(e) => e.into(),
        };

        let result = AttemptResult::new(index, raw, outcome, start.elapsed());
        match &result.outcome {
            Outcome::Connected => info!("Connected to {} in {:?}", raw, result.elapsed),
            outcome => warn!("Could not connect to {}: {}", raw, outcome),
        }
        result
    }
}
