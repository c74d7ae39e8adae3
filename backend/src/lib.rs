//! # Habit Tracker Backend
//!
//! This backend provides direct access to domain services and storage
//! for a desktop frontend. It:
//! - Uses synchronous operations (no async/await)
//! - Provides direct access to domain services
//! - Excludes any IO/REST layer entirely
//! - Is optimized for single-machine, per-user data
//!
//! Remote collaborators (the backup drive and the insight model) are
//! constructed by the caller with their own credentials and passed into
//! the relevant service calls; the backend never holds tokens.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub mod domain;
pub mod storage;

pub use storage::files::FileConnection;

/// Main backend struct that orchestrates all services
pub struct Backend {
    pub user_service: domain::UserService,
    pub habit_service: domain::HabitService,
    pub heatmap_service: domain::HeatmapService,
    pub backup_service: domain::BackupService,
    pub insight_service: domain::InsightService,
}

impl Backend {
    /// Create a new backend over the default data directory
    /// (`Documents/Habit Tracker`)
    pub fn new() -> Result<Self> {
        Self::with_connection(FileConnection::new_default()?)
    }

    /// Create a new backend over an explicit data directory
    pub fn new_with_base_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        Self::with_connection(FileConnection::new(base_dir)?)
    }

    fn with_connection(connection: FileConnection) -> Result<Self> {
        let connection = Arc::new(connection);

        let user_service = domain::UserService::new(connection.clone());
        let habit_service = domain::HabitService::new(connection, user_service.clone());
        let heatmap_service = domain::HeatmapService::new();
        let backup_service = domain::BackupService::new();
        let insight_service = domain::InsightService::new();

        Ok(Backend {
            user_service,
            habit_service,
            heatmap_service,
            backup_service,
            insight_service,
        })
    }
}
