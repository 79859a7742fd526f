// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pulse-Ingest: wearable webhook ingestion
//!
//! This crate provides the backend that receives signed Terra webhooks,
//! normalizes provider payloads into canonical health metrics and stores
//! them in Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{IngestService, MappingError, MetricMappingTable, SignatureVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub mappings: Arc<MetricMappingTable>,
    pub verifier: SignatureVerifier,
    pub ingest_service: IngestService,
}

impl AppState {
    /// Wire up services around an already connected database.
    pub fn new(config: Config, db: FirestoreDb, mappings: MetricMappingTable) -> Self {
        let mappings = Arc::new(mappings);
        let verifier = SignatureVerifier::new(config.terra_webhook_secret.clone(), "terra")
            .with_max_skew(config.webhook_max_skew);
        let ingest_service = IngestService::new(db.clone(), mappings.clone());

        Self {
            config,
            db,
            mappings,
            verifier,
            ingest_service,
        }
    }

    /// State backed by the in-memory store and the standard mapping table.
    pub fn with_memory_store(config: Config) -> Result<Self, MappingError> {
        Ok(Self::new(
            config,
            FirestoreDb::new_memory(),
            MetricMappingTable::standard()?,
        ))
    }
}
