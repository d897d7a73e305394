//! Test utilities for the DNS transport

use super::txt::TxtSource;
use crate::error::LookupError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory TXT zone that records every name it is asked for
#[derive(Debug, Default)]
pub struct StaticTxtSource {
    records: HashMap<String, Vec<String>>,
    failures: HashMap<String, String>,
    queried: Mutex<Vec<String>>,
    count: AtomicUsize,
}

impl StaticTxtSource {
    /// Create an empty zone
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a TXT record at `name`
    pub fn with_record(mut self, name: &str, txt: &str) -> Self {
        self.records
            .entry(name.to_string())
            .or_default()
            .push(txt.to_string());
        self
    }

    /// Publish `name` with no TXT data
    pub fn with_empty(mut self, name: &str) -> Self {
        self.records.entry(name.to_string()).or_default();
        self
    }

    /// Make queries for `name` fail
    pub fn with_failure(mut self, name: &str, message: &str) -> Self {
        self.failures.insert(name.to_string(), message.to_string());
        self
    }

    /// Number of queries answered so far
    pub fn query_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Names queried so far, in order
    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().expect("mutex poisoned").clone()
    }
}

#[async_trait]
impl TxtSource for StaticTxtSource {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, LookupError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.queried
            .lock()
            .expect("mutex poisoned")
            .push(name.to_string());

        if let Some(message) = self.failures.get(name) {
            return Err(LookupError::Dns(message.clone()));
        }
        self.records
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::Dns(format!("no record for {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticTxtSource::new()
            .with_record("a.example", "one")
            .with_empty("b.example")
            .with_failure("c.example", "SERVFAIL");

        assert_eq!(source.lookup_txt("a.example").await.unwrap(), vec!["one"]);
        assert!(source.lookup_txt("b.example").await.unwrap().is_empty());
        assert!(matches!(
            source.lookup_txt("c.example").await,
            Err(LookupError::Dns(_))
        ));
        assert!(source.lookup_txt("d.example").await.is_err());

        assert_eq!(source.query_count(), 4);
        assert_eq!(source.queried()[0], "a.example");
    }
}
