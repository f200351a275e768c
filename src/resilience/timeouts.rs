//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Turn an elapsed deadline into a classified failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors (`FailureKind::Timeout`)
//! - The deadline covers the whole exchange, body included

use std::future::Future;
use std::time::Duration;

use crate::upstream::FailureKind;

/// Run `call` under `limit`, mapping an elapsed deadline to [`FailureKind::Timeout`].
pub async fn with_deadline<F, T>(limit: Duration, call: F) -> Result<T, FailureKind>
where
    F: Future<Output = Result<T, FailureKind>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(FailureKind::Timeout),
    }
}
