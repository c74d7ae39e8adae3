pub mod backup_service;
pub mod commands;
pub mod habit_service;
pub mod heatmap;
pub mod insight_service;
pub mod models;
pub mod user_service;

pub use backup_service::BackupService;
pub use habit_service::HabitService;
pub use heatmap::HeatmapService;
pub use insight_service::{GeminiClient, InsightModel, InsightService};
pub use user_service::UserService;
