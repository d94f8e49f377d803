//! Scan module - share-link search and extraction per community.
//!
//! This module provides the building blocks used by the orchestrator:
//! - **Patterns**: [`PlatformSpec`] and the ordered [`PlatformTable`]
//! - **Extraction**: [`extract`] pulls distinct URLs out of message text
//! - **Scanner**: [`CommunityScanner`] drives one community's searches

pub mod extract;
pub mod patterns;
pub mod scanner;

pub use extract::extract;
pub use patterns::{PlatformSpec, PlatformTable};
pub use scanner::{CommunityScan, CommunityScanner, PlatformOutcome};
