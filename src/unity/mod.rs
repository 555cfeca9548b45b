//! Unity Android library deployment
//!
//! A deployment replaces the project's `unityLibrary` with a fresh export
//! and then carries the project's customizations back into it from the
//! renamed backup.

pub mod archive;
pub mod error;
pub mod fsops;
pub mod gradle;
pub mod history;
pub mod layout;
pub mod libs;
pub mod manifest;
pub mod pipeline;
pub mod steps;
pub mod verify;

pub use error::{DeployError, Result};
pub use layout::Layout;
pub use pipeline::{DeployReport, Pipeline};
pub use steps::Step;
