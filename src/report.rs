use crate::attempt::{AttemptResult, Outcome};
use crate::util::save_json;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a bootstrap run found out, in a form the pipeline can publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Peer id of the local node.
    pub node_id: String,
    /// Number of addresses attempted. Always the length of the peer list.
    pub attempted: usize,
    /// Number of attempts that ended in `Outcome::Connected`.
    pub connected: usize,
    /// Swarm size reported by the node after the run, if it answered.
    pub swarm_peers: Option<usize>,
    /// One entry per address, in peer list order.
    pub results: Vec<AttemptResult>,
}

impl BootstrapReport {
    pub fn new(node_id: String, results: Vec<AttemptResult>) -> BootstrapReport {
        BootstrapReport {
            node_id,
            attempted: results.len(),
            connected: results.iter().filter(|r| r.outcome.is_connected()).count(),
            swarm_peers: None,
            results,
        }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.connected
    }

    pub fn outcome(&self, addr: &str) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|r| r.addr == addr)
            .map(|r| &r.outcome)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(self, path)?;
        info!("Wrote bootstrap report to {}", path.display());
        Ok(())
    }
}

impl std::fmt::Display for BootstrapReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connected to {}/{} peers",
            self.connected, self.attempted
        )?;
        if let Some(swarm_peers) = self.swarm_peers {
            write!(f, " (swarm size {})", swarm_peers)?;
        }
        Ok(())
    }
}
