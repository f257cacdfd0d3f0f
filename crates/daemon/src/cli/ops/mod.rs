pub mod daemon;
pub mod health;
pub mod init;
pub mod keys;
pub mod privacy_group;
pub mod receive;
pub mod send;
pub mod version;

pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use keys::Keys;
pub use privacy_group::PrivacyGroup;
pub use receive::Receive;
pub use send::SendPayload;
pub use version::Version;
