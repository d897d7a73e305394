//! Whois transport: the pipelined bulk session

pub mod session;

#[cfg(test)]
pub mod test_server;

pub use session::WhoisClient;
