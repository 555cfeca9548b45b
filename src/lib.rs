//! unity-deploy library
//!
//! Merges a freshly exported Unity Android library into a customized Android
//! project according to named deployment profiles.

pub mod config;
pub mod unity;
