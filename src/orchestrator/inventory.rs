//! The external inventory-source collaborator: the orchestrator consumes
//! inventory records to drive multi-target checks but does not implement
//! the inventory query itself.
//!
//! No concrete implementation lives in this crate; callers that have a real
//! warehouse query implement this trait and hand the orchestrator the
//! resulting records via [`crate::orchestrator::Orchestrator::lookup_many`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One row returned by an external inventory query: a piece of software
/// observed on a particular computer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRecord {
    /// The software product name as recorded by the inventory system.
    pub software_name: String,
    /// The observed version string, if the inventory system captured one.
    pub software_version: Option<String>,
    /// Identifier of the computer the software was observed on.
    pub computer: String,
    /// When this record was last refreshed by the inventory system.
    pub last_seen: DateTime<Utc>,
}

/// An external collaborator the orchestrator can be handed to drive
/// multi-target EOL checks. Implemented outside this crate.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch the current inventory snapshot.
    async fn fetch(&self) -> anyhow::Result<Vec<InventoryRecord>>;
}
