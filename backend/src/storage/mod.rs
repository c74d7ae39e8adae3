pub mod drive;
pub mod files;
pub mod traits;

pub use drive::GoogleDriveClient;
pub use files::FileConnection;
pub use traits::{HabitStorage, RemoteDrive, RemoteFileHandle, UserStorage};
