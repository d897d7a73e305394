//! In-process whois server for session tests

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const GREETING: &str = "Bulk mode; whois.cymru.com [2024-01-01 00:00:00 +0000]\r\n";

/// How the fake server treats the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Serve until the client sends `end` or a reply is `None`
    Graceful,
    /// Reset the connection once this many replies have been sent
    ResetAfter(usize),
    /// Reset the connection in place of the greeting
    ResetAtGreeting,
}

/// Accepts one session, records every line it receives and answers each
/// query with the reply function
///
/// A reply of `None` makes the server close its side of the connection.
pub struct FakeWhois {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakeWhois {
    /// Start a server on an ephemeral loopback port
    pub async fn spawn<F>(reply: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self::spawn_with(Ending::Graceful, reply).await
    }

    /// Start a server that ends the connection as `ending` says
    pub async fn spawn_with<F>(ending: Ending, reply: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = received.clone();

        let handle = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let _ = stream.set_nodelay(true);
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();

            for _ in 0..2 {
                if let Ok(Some(line)) = lines.next_line().await {
                    log.lock().unwrap().push(line);
                }
            }
            if ending == Ending::ResetAtGreeting {
                reset(lines.into_inner().into_inner(), write);
                return;
            }
            if write.write_all(GREETING.as_bytes()).await.is_err() {
                return;
            }

            let mut replies = 0;
            while let Ok(Some(line)) = lines.next_line().await {
                log.lock().unwrap().push(line.clone());
                if line == "end" {
                    break;
                }
                match reply(&line) {
                    Some(answer) => {
                        let answer = format!("{answer}\r\n");
                        if write.write_all(answer.as_bytes()).await.is_err() {
                            return;
                        }
                        replies += 1;
                        if ending == Ending::ResetAfter(replies) {
                            // let the replies reach the client before the RST
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            reset(lines.into_inner().into_inner(), write);
                            return;
                        }
                    }
                    None => {
                        let _ = write.shutdown().await;
                        while let Ok(Some(_)) = lines.next_line().await {}
                        return;
                    }
                }
            }
        });

        Self {
            addr,
            received,
            handle,
        }
    }

    /// Address the server listens on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the session to end and return every line received
    pub async fn finish(self) -> Vec<String> {
        let _ = self.handle.await;
        let lines = self.received.lock().unwrap().clone();
        lines
    }

    /// Verbose address reply echoing the query
    ///
    /// IPv4 queries are announced by `AS(64500 + last octet)` from the
    /// covering /24; IPv6 queries by AS64499 from the covering /32.
    pub fn echo_address(query: &str) -> Option<String> {
        let ip: IpAddr = query.parse().ok()?;
        let (asn, range) = match ip {
            IpAddr::V4(v4) => (
                64500 + u32::from(v4.octets()[3]),
                ipnet::Ipv4Net::new(v4, 24).ok()?.trunc().to_string(),
            ),
            IpAddr::V6(v6) => (64499, ipnet::Ipv6Net::new(v6, 32).ok()?.trunc().to_string()),
        };
        Some(format!(
            "{asn:<7} | {ip:<16} | {range:<18} | US | arin     | 2001-01-01 | NET-{asn}, US"
        ))
    }
}

// Zero linger turns the close into a reset.
#[allow(deprecated)]
fn reset(read: OwnedReadHalf, write: OwnedWriteHalf) {
    if let Ok(stream) = read.reunite(write) {
        let _ = stream.set_linger(Some(Duration::ZERO));
        drop(stream);
    }
}
