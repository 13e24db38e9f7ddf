use crate::node::NodeErr;
use crate::peer_addr::PeerAddrErr;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a single connect attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    /// The node connected to the peer.
    Connected,
    /// The node tried and failed, e.g. the peer is offline.
    Failed(String),
    /// No answer within the attempt's timeout.
    TimedOut,
    /// The address could not be parsed, so it was never sent to the node.
    Malformed(String),
    /// The node's control interface could not be reached for this attempt.
    Unreachable(String),
}

impl Outcome {
    pub fn is_connected(&self) -> bool {
        *self == Outcome::Connected
    }
}

impl From<NodeErr> for Outcome {
    fn from(err: NodeErr) -> Outcome {
        match err {
            NodeErr::TimedOut(_) => Outcome::TimedOut,
            NodeErr::Unreachable(e) => Outcome::Unreachable(e.to_string()),
            e => Outcome::Failed(e.to_string()),
        }
    }
}

impl From<PeerAddrErr> for Outcome {
    fn from(err: PeerAddrErr) -> Outcome {
        Outcome::Malformed(err.to_string())
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Connected => write!(f, "connected"),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
            Outcome::TimedOut => write!(f, "timed out"),
            Outcome::Malformed(reason) => write!(f, "malformed address: {}", reason),
            Outcome::Unreachable(reason) => write!(f, "node unreachable: {}", reason),
        }
    }
}

/// The recorded result of trying one address of the peer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    /// Position of the address in the peer list.
    pub index: usize,
    /// The address exactly as configured.
    pub addr: String,
    pub outcome: Outcome,
    /// Time the attempt took, at millisecond precision.
    #[serde(rename = "elapsed_ms", with = "millis")]
    pub elapsed: Duration,
}

impl AttemptResult {
    pub fn new(index: usize, addr: &str, outcome: Outcome, elapsed: Duration) -> AttemptResult {
        AttemptResult {
            index,
            addr: addr.to_string(),
            outcome,
            elapsed: Duration::from_millis(millis::saturating(&elapsed)),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::convert::TryFrom;
    use std::time::Duration;

    pub fn saturating(d: &Duration) -> u64 {
        u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(saturating(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
