use crate::peer_addr::PeerAddr;
use crate::util::deadline_after;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

const ID_PATH: &str = "api/v0/id";
const SWARM_CONNECT_PATH: &str = "api/v0/swarm/connect";
const SWARM_PEERS_PATH: &str = "api/v0/swarm/peers";

#[derive(Error, Debug)]
pub enum NodeErr {
    /// The control interface could not be reached at all.
    #[error("control interface unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The node answered with an error, e.g. because the remote peer is offline.
    #[error("node returned {0}: {1}")]
    Rejected(StatusCode, String),

    #[error("no answer within {0:?}")]
    TimedOut(Duration),

    #[error("could not decode node response: {0}")]
    BadResponse(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Error body sent by the node on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct SwarmPeersResponse {
    #[serde(rename = "Peers")]
    peers: Option<Vec<serde_json::Value>>,
}

/// Client for the HTTP RPC control interface of a locally running IPFS node.
#[derive(Debug, Clone)]
pub struct IpfsNode {
    api_url: Url,
    client: Client,
}

impl IpfsNode {
    /// Timeout applied to the short control calls (`id`, `swarm/peers`).
    pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(api_url: Url) -> IpfsNode {
        IpfsNode {
            api_url,
            client: Client::new(),
        }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    async fn post_(
        &self,
        path: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Bytes, NodeErr> {
        let url = self.api_url.join(path)?;
        let mut request = self.client.post(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let request = request.send();

        let response = match tokio::time::timeout_at(deadline_after(timeout), async {
            let response = request.await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        })
        .await
        {
            Ok(res) => res.map_err(NodeErr::Unreachable)?,
            Err(_) => return Err(NodeErr::TimedOut(timeout)),
        };

        match response {
            (status, body) if status.is_success() => Ok(body),
            (status, body) => Err(NodeErr::Rejected(status, IpfsNode::error_message(&body))),
        }
    }

    fn error_message(body: &[u8]) -> String {
        match serde_json::from_slice::<ErrorResponse>(body) {
            Ok(err) => err.message,
            Err(_) => String::from_utf8_lossy(body).trim().to_string(),
        }
    }

    /// Returns the node's own peer id.
    pub async fn id(&self) -> Result<String, NodeErr> {
        let body = self.post_(ID_PATH, &[], IpfsNode::CONTROL_TIMEOUT).await?;
        let response: IdResponse = serde_json::from_slice(&body)?;
        Ok(response.id)
    }

    /// Asks the node to dial `addr`. The attempt is abandoned after `timeout`.
    pub async fn connect(&self, addr: &PeerAddr, timeout: Duration) -> Result<(), NodeErr> {
        let node_timeout = format!("{}ms", timeout.as_millis());
        self.post_(
            SWARM_CONNECT_PATH,
            &[("arg", addr.as_str()), ("timeout", &node_timeout)],
            timeout,
        )
        .await?;
        Ok(())
    }

    /// Returns the number of peers the node is currently connected to.
    pub async fn swarm_peers(&self) -> Result<usize, NodeErr> {
        let body = self
            .post_(SWARM_PEERS_PATH, &[], IpfsNode::CONTROL_TIMEOUT)
            .await?;
        let response: SwarmPeersResponse = serde_json::from_slice(&body)?;
        Ok(response.peers.map_or(0, |peers| peers.len()))
    }

    /// Polls `id` until the node answers or `ready_timeout` passes. Returns the node's peer id.
    ///
    /// The deadline also bounds each poll, so a node that accepts connections but never
    /// answers cannot stretch the wait.
    pub async fn wait_ready(
        &self,
        ready_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<String, NodeErr> {
        let deadline = deadline_after(ready_timeout);
        let mut last_err = None;
        loop {
            match tokio::time::timeout_at(deadline, self.id()).await {
                Ok(Ok(id)) => return Ok(id),
                Ok(Err(e)) => {
                    trace!("Node at {} not ready: {}", self.api_url, e);
                    last_err = Some(e);
                }
                Err(_) => break,
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::delay_for(poll_interval.min(deadline - now)).await;
        }
        Err(last_err.unwrap_or(NodeErr::TimedOut(ready_timeout)))
    }
}
