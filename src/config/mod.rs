//! Lookup configuration

pub mod settings;

pub use settings::{LookupSettings, SessionConfig, SessionConfigBuilder};
