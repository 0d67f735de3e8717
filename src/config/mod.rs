/// Database configuration and connection management
pub mod database;

/// Ledger settings and brand seeds loaded from config.toml
pub mod ledger;
