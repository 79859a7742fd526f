// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wearable connection and athlete profile models.

use serde::{Deserialize, Serialize};

use crate::models::metric::composite_document_id;

/// A user's link to a wearable provider, written by `auth` notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConnection {
    /// Application user ID
    pub user_id: String,
    /// Terra's user ID for this connection
    pub terra_user_id: Option<String>,
    /// Upstream device provider
    pub provider: String,
    /// "success", "error", ...
    pub status: String,
    /// Provider message accompanying the status
    pub message: Option<String>,
    pub updated_at: String,
}

impl ProviderConnection {
    pub fn document_id(&self) -> String {
        composite_document_id(&[self.user_id.as_str(), self.provider.as_str()])
    }
}

/// Athlete profile as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub user_id: String,
    pub provider: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub sex: Option<String>,
    /// Date of birth ("YYYY-MM-DD")
    pub date_of_birth: Option<String>,
    pub updated_at: String,
}

impl AthleteProfile {
    pub fn document_id(&self) -> String {
        composite_document_id(&[self.user_id.as_str(), self.provider.as_str()])
    }
}
