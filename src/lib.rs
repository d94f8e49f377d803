pub mod archive;
pub mod config;
pub mod executor;
pub mod model;
pub mod report;
pub mod scan;
pub mod session;
pub mod traits;

// Re-export common types for convenience
pub use config::*;
pub use executor::*;
pub use model::*;
pub use scan::{extract, CommunityScan, CommunityScanner, PlatformOutcome, PlatformSpec, PlatformTable};
pub use session::{run, Credential, RunMode, RunOutcome};
pub use traits::*;
