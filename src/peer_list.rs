use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

/// Public bootstrap peers used when no other list is configured.
pub const DEFAULT_PEERS: &[&str] = &[
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmQCU2EcMqAqQPR2i9bChDtGNJchTbq5TbXJJ16u19uLTa",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmbLHAnMoJPWSCR5Zhtx6BHJX9KiKNN6tpvbUcqanj75Nb",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmcZf59bWwK5XFi76CZX8cbJ4BhTzzA3gU1ZjYZcYW3dwt",
    "/ip4/104.131.131.82/tcp/4001/p2p/QmaCpDMGvV2BGHeYERUEnRQAwe3N8SzbUtfsmvsqQLuvuJ",
    "/ip4/104.131.131.82/udp/4001/quic-v1/p2p/QmaCpDMGvV2BGHeYERUEnRQAwe3N8SzbUtfsmvsqQLuvuJ",
];

const COMMENT_START: char = '#';

/// An ordered list of peer addresses to connect to.
///
/// Entries are kept as raw strings. They are validated when attempted, so one bad line
/// only fails that one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerList {
    entries: Vec<String>,
}

impl PeerList {
    pub fn new() -> PeerList {
        PeerList::default()
    }

    pub fn defaults() -> PeerList {
        let mut list = PeerList::new();
        list.extend(DEFAULT_PEERS.iter().copied());
        list
    }

    /// Parses one address per line. Blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> PeerList {
        let mut list = PeerList::new();
        list.extend(PeerList::lines_(text));
        list
    }

    fn lines_(text: &str) -> impl Iterator<Item = &str> {
        text.lines()
            .map(|line| match line.find(COMMENT_START) {
                Some(i) => &line[..i],
                None => line,
            })
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }

    /// Builds the list from the defaults (if wanted), then the peers file, then `extra`.
    pub fn load(
        use_defaults: bool,
        peers_file: Option<&Path>,
        extra: &[String],
    ) -> Result<PeerList> {
        let mut list = if use_defaults {
            PeerList::defaults()
        } else {
            PeerList::new()
        };

        if let Some(path) = peers_file {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow!("could not read peers file `{}`: {}", path.display(), e))?;
            list.extend(PeerList::lines_(&text));
        }
        list.extend(extra.iter().map(String::as_str));

        debug!("Loaded {} peer addresses", list.len());
        Ok(list)
    }

    /// Appends addresses that are not already in the list.
    pub fn extend<'a, I>(&mut self, addrs: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: HashSet<String> = self.entries.iter().cloned().collect();
        for addr in addrs {
            if seen.insert(addr.to_string()) {
                self.entries.push(addr.to_string());
            } else {
                trace!("Skipping duplicate peer {}", addr);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}
