pub mod add_room;
pub mod daemon;
pub mod health;
pub mod id;
pub mod init;
pub mod version;

pub use add_room::AddRoom;
pub use daemon::Daemon;
pub use health::Health;
pub use id::Id;
pub use init::Init;
pub use version::Version;
