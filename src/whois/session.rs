//! Pipelined whois session
//!
//! The bulk whois interface answers one line per query over a single TCP
//! connection. A batch writes all of its queries before reading any reply,
//! then reads replies until it has one per query.
//!
//! The protocol carries no correlation identifier: reply *i* is assumed to
//! answer query *i*. The service upholds this ordering; the client cannot
//! verify it in general, but in address mode it compares the echoed address
//! against the query and logs a warning on mismatch.
//!
//! A batch aborted by an error line or an unparseable reply still reads and
//! discards the replies owed for the rest of its queries, so the next batch
//! starts in step. A batch abandoned with replies owed (its future dropped,
//! or the stream failing) leaves the session unusable: every later batch
//! fails with [`LookupError::Desynchronized`].

use crate::config::settings::{ERROR_MARKER, LINE_TERMINATOR, MAX_LINE_LEN};
use crate::config::SessionConfig;
use crate::error::{BatchError, BatchResult, LookupError, ParseError};
use crate::record::{parse, Record, Schema};
use crate::resolver::AsnResolver;
use crate::types::Asn;
use async_trait::async_trait;
use std::fmt::Display;
use std::net::IpAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Client for the bulk whois interface
///
/// One instance owns one connection. Batches from concurrent callers are
/// serialized: the connection is locked from the first query written until
/// the last reply read, so replies of one batch can never be handed to
/// another.
///
/// # Examples
///
/// ```no_run
/// use asnr::config::SessionConfig;
/// use asnr::whois::WhoisClient;
/// use asnr::AsnResolver;
/// use std::net::IpAddr;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let whois = WhoisClient::connect(&SessionConfig::default()).await?;
///
///     let ips: Vec<IpAddr> = vec!["8.8.8.8".parse()?, "1.1.1.1".parse()?];
///     for record in whois.lookup_addresses(&ips).await? {
///         println!("{} {} {}", record.asn, record.range.unwrap(), record.name);
///     }
///
///     whois.close().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct WhoisClient {
    server: String,
    conn: Mutex<Connection>,
}

#[derive(Debug)]
struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    /// Replies still due to the batch in progress
    owed: usize,
}

impl WhoisClient {
    /// Connect to the whois service and switch the session to bulk mode
    ///
    /// Only the TCP connect is bounded by `config.connect_timeout`.
    pub async fn connect(config: &SessionConfig) -> Result<Self, LookupError> {
        let server = config.server.clone();
        let stream = match timeout(config.connect_timeout, TcpStream::connect(&server)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(LookupError::Connect { server, source }),
            Err(_) => {
                return Err(LookupError::ConnectTimeout {
                    server,
                    timeout: config.connect_timeout,
                })
            }
        };

        let (read, write) = stream.into_split();
        let mut conn = Connection {
            reader: BufReader::new(read),
            writer: BufWriter::new(write),
            owed: 0,
        };

        match conn.handshake().await {
            Ok(Some(greeting)) => debug!(%server, %greeting, "whois session open"),
            Ok(None) => debug!(%server, "whois session closed before greeting"),
            Err(LookupError::Io(source)) => return Err(LookupError::Connect { server, source }),
            Err(e) => return Err(e),
        }

        Ok(Self {
            server,
            conn: Mutex::new(conn),
        })
    }

    /// The endpoint this client is connected to
    pub fn server(&self) -> &str {
        &self.server
    }

    /// End the session and close the connection
    pub async fn close(self) -> Result<(), LookupError> {
        let mut conn = self.conn.into_inner();
        conn.write_line("end").await?;
        conn.writer.shutdown().await?;
        debug!(server = %self.server, "whois session closed");
        Ok(())
    }

    async fn run_batch<Q: Display>(&self, queries: &[Q], schema: Schema) -> BatchResult {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.lock().await;
        let mut records = Vec::with_capacity(queries.len());
        match conn.exchange(queries, schema, &mut records).await {
            Ok(()) => Ok(records),
            Err(e) => Err(BatchError::new(records, e)),
        }
    }
}

impl Connection {
    /// Switch to bulk verbose mode and read the greeting
    async fn handshake(&mut self) -> Result<Option<String>, LookupError> {
        self.write_line("begin").await?;
        self.write_line("verbose").await?;
        self.writer.flush().await?;
        self.next_line().await
    }

    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        trace!(line, "whois >");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(LINE_TERMINATOR.as_bytes()).await
    }

    /// Next line without its terminator, `None` at end of stream
    async fn next_line(&mut self) -> Result<Option<String>, LookupError> {
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(None);
        }
        if read == MAX_LINE_LEN && !buf.ends_with(b"\n") {
            return Err(ParseError::LineTooLong {
                limit: MAX_LINE_LEN,
            }
            .into());
        }
        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        trace!(%line, "whois <");
        Ok(Some(line))
    }

    /// Write every query, flush once, then collect one reply per query
    ///
    /// Stops early without error if the service closes the connection.
    async fn exchange<Q: Display>(
        &mut self,
        queries: &[Q],
        schema: Schema,
        records: &mut Vec<Record>,
    ) -> Result<(), LookupError> {
        if self.owed > 0 {
            return Err(LookupError::Desynchronized);
        }

        self.owed = queries.len();
        for query in queries {
            self.write_line(&query.to_string()).await?;
        }
        self.writer.flush().await?;

        while self.owed > 0 {
            let Some(line) = self.next_line().await? else {
                debug!(
                    received = records.len(),
                    expected = queries.len(),
                    "whois session ended before batch completed"
                );
                self.owed = 0;
                break;
            };
            self.owed -= 1;

            let reply = match line.strip_prefix(ERROR_MARKER) {
                Some(message) => Err(LookupError::Upstream(message.trim().to_string())),
                None => parse(&line, schema).map_err(LookupError::from),
            };
            match reply {
                Ok(record) => records.push(record),
                Err(e) => {
                    self.skip_owed().await;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Read and discard the replies still due to an aborted batch
    async fn skip_owed(&mut self) {
        while self.owed > 0 {
            match self.next_line().await {
                Ok(Some(line)) => {
                    self.owed -= 1;
                    trace!(%line, "whois < (discarded)");
                }
                Ok(None) => self.owed = 0,
                Err(e) => {
                    debug!(error = %e, owed = self.owed, "could not drain aborted batch");
                    return;
                }
            }
        }
    }
}

// Replies are matched to queries purely by position.
fn check_echo(queries: &[IpAddr], records: &[Record]) {
    for (query, record) in queries.iter().zip(records) {
        if let Some(echoed) = record.address {
            if echoed != *query {
                warn!(%query, %echoed, "whois reply out of order");
            }
        }
    }
}

#[async_trait]
impl AsnResolver for WhoisClient {
    async fn lookup_addresses(&self, addresses: &[IpAddr]) -> BatchResult {
        let result = self.run_batch(addresses, Schema::Address).await;
        match &result {
            Ok(records) => check_echo(addresses, records),
            Err(e) => check_echo(addresses, e.partial()),
        }
        result
    }

    async fn lookup_asns(&self, asns: &[Asn]) -> BatchResult {
        self.run_batch(asns, Schema::Asn).await
    }
}
