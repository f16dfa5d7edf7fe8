pub mod config;
pub mod db;
pub mod error;
pub mod locate;
pub mod report;
pub mod verify;

pub use db::sqlite::VaultStorage;
pub use error::ProbeError;
pub use locate::Locator;
