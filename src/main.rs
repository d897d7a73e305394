//! asnr - look up IP address and ASN ownership from the command line.

use anyhow::{bail, Context, Result};
use asnr::config::settings::{self, LookupSettings, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_WHOIS_SERVER};
use asnr::{
    Asn, AsnResolver, BatchError, DirectoryLookup, LookupError, Record, SessionConfig,
    WhoisClient,
};
use clap::Parser;
use std::net::IpAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the lookup tool.
#[derive(Parser, Debug)]
#[clap(author, version, about = "IP address and ASN ownership lookup via Team Cymru", long_about = None)]
struct Args {
    /// IP addresses or AS numbers (e.g. 8.8.8.8, AS15169, 15169)
    #[clap(required = true)]
    queries: Vec<String>,

    /// Transport used to reach the lookup service
    #[clap(short, long, value_enum, default_value = "whois")]
    transport: TransportArg,

    /// Whois server as host:port
    #[clap(long, default_value = DEFAULT_WHOIS_SERVER)]
    server: String,

    /// Timeout for connecting to the whois server in milliseconds
    #[clap(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    connect_timeout_ms: u64,

    /// Output results in JSON format
    #[clap(long)]
    json: bool,

    /// Enable verbose logging (use -vv for wire traces)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum TransportArg {
    Whois,
    Dns,
}

/// JSON output structure for a whole run
#[derive(Debug, serde::Serialize)]
struct JsonOutput {
    version: &'static str,
    transport: &'static str,
    records: Vec<Record>,
    errors: Vec<String>,
}

/// Records gathered from every batch, plus the failures that cut batches short
#[derive(Default)]
struct Outcome {
    records: Vec<Record>,
    errors: Vec<String>,
}

impl Outcome {
    fn absorb(&mut self, requested: usize, result: Result<Vec<Record>, BatchError>) {
        match result {
            Ok(records) => {
                if records.len() < requested {
                    self.errors.push(format!(
                        "service closed the session after {} of {} answers",
                        records.len(),
                        requested
                    ));
                }
                self.records.extend(records);
            }
            Err(e) => {
                let (partial, error) = e.into_parts();
                self.records.extend(partial);
                self.errors.push(error.to_string());
            }
        }
    }

    fn absorb_close(&mut self, result: Result<(), LookupError>) {
        if let Err(e) = result {
            self.errors.push(format!("closing whois session: {e}"));
        }
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Single-threaded runtime; lookups are I/O bound
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    if let Err(e) = runtime.block_on(async_main(args)) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "asnr=debug",
        _ => "asnr=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn split_queries(queries: &[String]) -> Result<(Vec<IpAddr>, Vec<Asn>)> {
    let mut addresses = Vec::new();
    let mut asns = Vec::new();
    for query in queries {
        if let Ok(ip) = query.parse::<IpAddr>() {
            addresses.push(ip);
        } else if let Ok(asn) = query.parse::<Asn>() {
            asns.push(asn);
        } else {
            bail!("'{query}' is neither an IP address nor an AS number");
        }
    }
    Ok((addresses, asns))
}

async fn resolve_all(resolver: &dyn AsnResolver, addresses: &[IpAddr], asns: &[Asn]) -> Outcome {
    let mut outcome = Outcome::default();
    if !addresses.is_empty() {
        let result = resolver.lookup_addresses(addresses).await;
        outcome.absorb(addresses.len(), result);
    }
    if !asns.is_empty() {
        let result = resolver.lookup_asns(asns).await;
        outcome.absorb(asns.len(), result);
    }
    outcome
}

async fn async_main(args: Args) -> Result<()> {
    let (addresses, asns) = split_queries(&args.queries)?;

    if args.connect_timeout_ms == 0 {
        bail!("connect-timeout-ms must be greater than 0");
    }
    let _ = settings::set_settings(LookupSettings {
        whois_server: args.server.clone(),
        connect_timeout: Duration::from_millis(args.connect_timeout_ms),
    });

    let (transport, outcome) = match args.transport {
        TransportArg::Whois => {
            let config = SessionConfig::default();
            let client = WhoisClient::connect(&config)
                .await
                .with_context(|| format!("could not open whois session to {}", config.server))?;
            let mut outcome = resolve_all(&client, &addresses, &asns).await;
            outcome.absorb_close(client.close().await);
            ("whois", outcome)
        }
        TransportArg::Dns => {
            let dns = DirectoryLookup::new();
            ("dns", resolve_all(&dns, &addresses, &asns).await)
        }
    };

    if args.json {
        let output = JsonOutput {
            version: env!("CARGO_PKG_VERSION"),
            transport,
            records: outcome.records,
            errors: outcome.errors.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for record in &outcome.records {
            println!("{}", format_record(record));
        }
    }

    if !outcome.errors.is_empty() {
        bail!(outcome.errors.join("; "));
    }
    Ok(())
}

fn format_record(record: &Record) -> String {
    let address = record.address.map(|ip| ip.to_string()).unwrap_or_default();
    let range = record.range.map(|net| net.to_string()).unwrap_or_default();
    let allocated = record
        .allocated
        .map(|date| date.to_string())
        .unwrap_or_default();
    format!(
        "{:<10} | {:<16} | {:<20} | {:<2} | {:<8} | {:<10} | {}",
        record.asn.to_string(),
        address,
        range,
        record.country.code(),
        record.registry,
        allocated,
        record.name
    )
}
