use multiaddr::{Multiaddr, Protocol};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeerAddrErr {
    #[error("invalid multiaddr `{0}`: {1}")]
    Invalid(String, #[source] multiaddr::Error),

    #[error("address must end with `/p2p/<peer-id>`")]
    MissingPeerId,
}

/// A multi-segment peer address, e.g. `/ip4/1.2.3.4/tcp/4001/p2p/Qm...`.
///
/// The original string is kept untouched since it is handed to the node as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddr {
    raw: String,
    multiaddr: Multiaddr,
    /// Base58 id of the peer named by the final `/p2p` component.
    peer_id: String,
}

impl PeerAddr {
    pub fn parse(s: &str) -> Result<PeerAddr, PeerAddrErr> {
        let multiaddr =
            Multiaddr::from_str(s).map_err(|e| PeerAddrErr::Invalid(s.to_string(), e))?;
        let peer_id = match multiaddr.iter().last() {
            Some(Protocol::P2p(peer_id)) => peer_id.to_base58(),
            _ => return Err(PeerAddrErr::MissingPeerId),
        };

        Ok(PeerAddr {
            raw: s.to_string(),
            multiaddr,
            peer_id,
        })
    }

    /// The address exactly as it was given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn multiaddr(&self) -> &Multiaddr {
        &self.multiaddr
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }
}

impl FromStr for PeerAddr {
    type Err = PeerAddrErr;

    fn from_str(s: &str) -> Result<PeerAddr, PeerAddrErr> {
        PeerAddr::parse(s)
    }
}

impl std::fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}
