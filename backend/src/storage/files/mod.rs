//! File-backed storage: one directory per user under the data
//! directory, YAML for metadata, CSV for completion logs.

pub mod connection;
pub mod habit_repository;
pub mod user_repository;

pub use connection::FileConnection;
pub use habit_repository::HabitRepository;
pub use user_repository::UserRepository;
