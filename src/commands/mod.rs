//! CLI commands

pub mod archive;
pub mod deploy;
pub mod history;
pub mod init;
pub mod list;
pub mod restore;
pub mod show;
pub mod utils;
pub mod verify;
