use bytes::BytesMut;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const FAKE_NODE_ID: &str = "QmFakeNode";

/// How the fake node answers a `swarm/connect` for a given address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    Connect,
    Fail(String),
    /// Never answer.
    Hang,
    /// Close the connection without answering, as a crashing node would.
    Drop,
}

#[derive(Debug, Default)]
struct State {
    behaviors: HashMap<String, Behavior>,
    /// Every `arg` received by `swarm/connect`, in arrival order.
    connect_args: Vec<String>,
    connected: Vec<String>,
}

/// A minimal stand-in for an IPFS node's HTTP control interface.
#[derive(Debug, Clone)]
pub struct FakeNode {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl FakeNode {
    pub async fn start(behaviors: Vec<(&str, Behavior)>) -> FakeNode {
        FakeNode::start_ready_after(behaviors, Duration::from_secs(0)).await
    }

    /// Like `start`, but `id` fails until `ready_after` has passed.
    pub async fn start_ready_after(
        behaviors: Vec<(&str, Behavior)>,
        ready_after: Duration,
    ) -> FakeNode {
        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let state = Arc::new(Mutex::new(State {
            behaviors: behaviors
                .into_iter()
                .map(|(addr, behavior)| (addr.to_string(), behavior))
                .collect(),
            ..State::default()
        }));
        let node = FakeNode {
            addr: listener.local_addr().unwrap(),
            state: state.clone(),
        };

        let ready_at = Instant::now() + ready_after;
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let state = state.clone();
                tokio::spawn(async move { FakeNode::serve(socket, state, ready_at).await });
            }
        });
        node
    }

    pub fn api_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn connect_args(&self) -> Vec<String> {
        self.state.lock().unwrap().connect_args.clone()
    }

    async fn serve(mut socket: TcpStream, state: Arc<Mutex<State>>, ready_at: Instant) {
        let mut buf = BytesMut::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }

        let request = String::from_utf8_lossy(&buf).to_string();
        let target = request
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/")
            .to_string();
        let (path, query) = match target.find('?') {
            Some(i) => (&target[..i], &target[i + 1..]),
            None => (&target[..], ""),
        };

        let (status, body) = match path {
            "/api/v0/id" if Instant::now() < ready_at => {
                (500, r#"{"Message":"node is starting","Code":0,"Type":"error"}"#.to_string())
            }
            "/api/v0/id" => (200, format!(r#"{{"ID":"{}"}}"#, FAKE_NODE_ID)),
            "/api/v0/swarm/peers" => {
                let connected = state.lock().unwrap().connected.clone();
                let peers: Vec<String> = connected
                    .iter()
                    .map(|addr| format!(r#"{{"Addr":"{}"}}"#, addr))
                    .collect();
                (200, format!(r#"{{"Peers":[{}]}}"#, peers.join(",")))
            }
            "/api/v0/swarm/connect" => {
                let arg = url::form_urlencoded::parse(query.as_bytes())
                    .find(|(k, _)| k == "arg")
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
                let behavior = {
                    let mut state = state.lock().unwrap();
                    state.connect_args.push(arg.clone());
                    state
                        .behaviors
                        .get(&arg)
                        .cloned()
                        .unwrap_or_else(|| Behavior::Fail("unknown peer".into()))
                };
                match behavior {
                    Behavior::Connect => {
                        state.lock().unwrap().connected.push(arg.clone());
                        (200, format!(r#"{{"Strings":["connect {} success"]}}"#, arg))
                    }
                    Behavior::Fail(reason) => (
                        500,
                        format!(r#"{{"Message":"{}","Code":0,"Type":"error"}}"#, reason),
                    ),
                    Behavior::Hang => {
                        tokio::time::delay_for(Duration::from_secs(3600)).await;
                        return;
                    }
                    Behavior::Drop => return,
                }
            }
            _ => (404, "404 page not found".to_string()),
        };

        let reason = match status {
            200 => "OK",
            404 => "Not Found",
            _ => "Internal Server Error",
        };
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown(std::net::Shutdown::Write);
    }
}
