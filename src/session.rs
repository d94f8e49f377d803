//! Run entry point: opens a session, dispatches the run mode, closes the
//! session on every exit path.

use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::executor::ScanOrchestrator;
use crate::model::{Community, ScanAggregate};
use crate::traits::{ScanError, Session, SessionProvider};

/// Placeholder left in sample configurations; never a real token.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_TOKEN_HERE";

/// Account token handed to a [`SessionProvider`].
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// # Errors
    ///
    /// Returns [`ScanError::EmptyCredential`] for blank or placeholder values.
    pub fn new(token: impl Into<String>) -> Result<Self, ScanError> {
        let token = token.into().trim().to_string();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(ScanError::EmptyCredential);
        }
        Ok(Self(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// List the communities of the account and stop.
    ListCommunities,
    ScanOne(u64),
    ScanAll,
}

#[derive(Debug)]
pub enum RunOutcome {
    Listed(Vec<Community>),
    Scanned(ScanAggregate),
}

/// Opens a session from `provider`, runs `mode` and closes the session.
///
/// # Errors
///
/// - [`ScanError::EmptyCredential`] / [`ScanError::AuthenticationFailed`]
///   from opening the session
/// - [`ScanError::CommunityNotFound`] when [`RunMode::ScanOne`] does not
///   resolve
///
/// Failures inside a scan never surface here; they are events of the
/// returned aggregate.
#[instrument(skip(provider, credential, orchestrator, cancel))]
pub async fn run<P>(
    provider: &P,
    credential: &Credential,
    mode: RunMode,
    orchestrator: &ScanOrchestrator,
    cancel: &CancellationToken,
) -> Result<RunOutcome, ScanError>
where
    P: SessionProvider,
{
    let mut session = provider.open(credential).await?;
    info!("Session opened");

    let outcome = run_in_session(&session, mode, orchestrator, cancel).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close session");
    }
    info!("Session closed");
    outcome
}

async fn run_in_session<S>(
    session: &S,
    mode: RunMode,
    orchestrator: &ScanOrchestrator,
    cancel: &CancellationToken,
) -> Result<RunOutcome, ScanError>
where
    S: Session,
{
    let targets = match mode {
        RunMode::ListCommunities => return Ok(RunOutcome::Listed(session.communities().await?)),
        RunMode::ScanAll => {
            let communities = session.communities().await?;
            info!("Scanning all communities ({} total)", communities.len());
            communities
        }
        RunMode::ScanOne(id) => {
            let community = session
                .community(id)
                .await?
                .ok_or(ScanError::CommunityNotFound(id))?;
            info!("Scanning community '{}' (ID: {})", community.name, community.id);
            vec![community]
        }
    };

    let aggregate = orchestrator.run_scan(session, &targets, cancel).await;
    Ok(RunOutcome::Scanned(aggregate))
}
