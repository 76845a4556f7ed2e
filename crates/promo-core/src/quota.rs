//! The quota manager: sets and cancels partner promo-code limits.
//!
//! Every mutation runs read-decide-write on one partner aggregate while
//! holding that partner's lock, so two concurrent requests for the same
//! partner never both observe the same active limit. Storage adds a version
//! check on top for writers outside this process.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::{LIMIT_MUST_BE_POSITIVE, PARTNER_NOT_ACTIVE},
  partner::{Partner, PartnerLimit},
  store::PromoStore,
};

/// A request to replace a partner's limit.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NewLimit {
  pub limit:    i32,
  pub end_date: DateTime<Utc>,
}

type LockMap = HashMap<Uuid, Arc<AsyncMutex<()>>>;

/// One async mutex per partner with a request in flight. An entry lives only
/// as long as some caller holds or waits for it.
#[derive(Debug, Default)]
struct PartnerLocks(Arc<Mutex<LockMap>>);

impl PartnerLocks {
  fn map(&self) -> MutexGuard<'_, LockMap> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn handle(&self, partner_id: Uuid) -> Arc<AsyncMutex<()>> {
    self.map().entry(partner_id).or_default().clone()
  }

  async fn acquire(&self, partner_id: Uuid) -> PartnerGuard {
    let guard = self.handle(partner_id).lock_owned().await;
    PartnerGuard { partner_id, guard: Some(guard), locks: self.0.clone() }
  }

  #[cfg(test)]
  fn len(&self) -> usize { self.map().len() }
}

/// Held for the whole read-decide-write of one partner.
struct PartnerGuard {
  partner_id: Uuid,
  guard:      Option<OwnedMutexGuard<()>>,
  locks:      Arc<Mutex<LockMap>>,
}

impl Drop for PartnerGuard {
  fn drop(&mut self) {
    // Handles are only cloned out under the map lock, so a count of one
    // after releasing ours means nobody else holds or awaits this mutex.
    let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    drop(self.guard.take());
    if map
      .get(&self.partner_id)
      .is_some_and(|m| Arc::strong_count(m) == 1)
    {
      map.remove(&self.partner_id);
    }
  }
}

/// Serializes limit changes per partner. Share one instance per process.
#[derive(Debug, Default)]
pub struct QuotaManager {
  locks: PartnerLocks,
}

impl QuotaManager {
  pub fn new() -> Self { Self::default() }

  /// Replace the partner's active limit with a new one.
  ///
  /// Checks, in order: the partner exists, the partner is active, the limit
  /// is positive. On success the previous active limit (if any) is
  /// cancelled, the issuance counter is reset if and only if such a limit
  /// existed, the new limit is appended, and the aggregate is saved once.
  pub async fn set_limit<S: PromoStore>(
    &self,
    store: &S,
    partner_id: Uuid,
    request: NewLimit,
  ) -> Result<PartnerLimit> {
    let _guard = self.locks.acquire(partner_id).await;

    let mut partner = load_partner(store, partner_id).await?;
    ensure_active(&partner)?;
    if request.limit <= 0 {
      tracing::warn!(%partner_id, limit = request.limit, "rejected non-positive limit");
      return Err(Error::InvalidArgument(LIMIT_MUST_BE_POSITIVE.to_owned()));
    }

    let change =
      partner.replace_limit(request.limit.unsigned_abs(), request.end_date, Utc::now())?;
    tracing::debug!(
      %partner_id,
      cancelled = ?change.cancelled.as_ref().map(|l| l.limit_id),
      counter_reset = change.counter_reset,
      "replacing partner limit"
    );

    store.save_partner(partner).await.map_err(Error::store)?;

    tracing::info!(
      %partner_id,
      limit_id = %change.created.limit_id,
      limit = change.created.limit,
      "partner limit set"
    );
    Ok(change.created)
  }

  /// Cancel the partner's active limit, if it has one.
  ///
  /// Returns the cancelled limit. Nothing is written when there was no
  /// active limit. The issuance counter is left as it is.
  pub async fn cancel_limit<S: PromoStore>(
    &self,
    store: &S,
    partner_id: Uuid,
  ) -> Result<Option<PartnerLimit>> {
    let _guard = self.locks.acquire(partner_id).await;

    let mut partner = load_partner(store, partner_id).await?;
    ensure_active(&partner)?;

    let Some(cancelled) = partner.cancel_limit(Utc::now())? else {
      return Ok(None);
    };
    store.save_partner(partner).await.map_err(Error::store)?;

    tracing::info!(%partner_id, limit_id = %cancelled.limit_id, "partner limit cancelled");
    Ok(Some(cancelled))
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub async fn load_partner<S: PromoStore>(store: &S, partner_id: Uuid) -> Result<Partner> {
  store
    .find_partner(partner_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("partner {partner_id} not found")))
}

/// A single entry of a partner's history, cancelled or not.
pub async fn find_limit<S: PromoStore>(
  store: &S,
  partner_id: Uuid,
  limit_id: Uuid,
) -> Result<PartnerLimit> {
  load_partner(store, partner_id)
    .await?
    .limits
    .get(limit_id)
    .cloned()
    .ok_or_else(|| Error::NotFound(format!("limit {limit_id} not found")))
}

fn ensure_active(partner: &Partner) -> Result<()> {
  if partner.is_active {
    return Ok(());
  }
  tracing::warn!(partner_id = %partner.partner_id, "partner is not active");
  Err(Error::InvalidState(PARTNER_NOT_ACTIVE.to_owned()))
}
