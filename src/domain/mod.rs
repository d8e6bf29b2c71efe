/// Core data types shared across the dispatch pipeline.
pub mod models;

/// Dispatch services: discovery, matching, relay, lifecycle.
pub mod services;
