//! Shared traits and interfaces
//!
//! The authority seam lets the state machine run against the in-process
//! program, a remote client or a scripted test double.

use crate::authority::AuthorityError;
use crate::common::types::Lamports;
use crate::games::types::SpinOutcome;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of canonical spin outcomes
#[async_trait]
pub trait SpinAuthority: Send + Sync {
    /// Submit a spin for `bet` and wait for its outcome.
    ///
    /// The returned payout is canonical; callers display it without
    /// recomputing it.
    async fn spin(&self, bet: Lamports) -> Result<SpinOutcome, AuthorityError>;
}

#[async_trait]
impl<T: SpinAuthority + ?Sized> SpinAuthority for Arc<T> {
    async fn spin(&self, bet: Lamports) -> Result<SpinOutcome, AuthorityError> {
        (**self).spin(bet).await
    }
}
