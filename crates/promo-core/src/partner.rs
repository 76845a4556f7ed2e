//! Partners and their promo-code limit history.
//!
//! A partner owns an append-only [`LimitHistory`]. At most one entry is
//! active (uncancelled) at a time; replacing the limit cancels the active
//! entry, resets the issuance counter, and appends the new one. Cancellation
//! is the only change a past entry ever sees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── PartnerLimit ────────────────────────────────────────────────────────────

/// A time-bounded cap on the promo codes a partner may issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerLimit {
  pub limit_id:    Uuid,
  /// Owning partner. A plain id, never a reference back to the aggregate.
  pub partner_id:  Uuid,
  pub limit:       u32,
  pub create_date: DateTime<Utc>,
  pub end_date:    DateTime<Utc>,
  /// Set exactly once, when a later limit supersedes this one.
  pub cancel_date: Option<DateTime<Utc>>,
}

impl PartnerLimit {
  /// Active means "not cancelled". Expiry by `end_date` does not enter into
  /// it; see [`PartnerLimit::is_expired`].
  pub fn is_active(&self) -> bool { self.cancel_date.is_none() }

  pub fn is_expired(&self, at: DateTime<Utc>) -> bool { self.end_date <= at }
}

// ─── LimitHistory ────────────────────────────────────────────────────────────

/// The chronological record of every limit ever granted to a partner.
///
/// Insertion order is chronological order. Entries are never removed or
/// reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LimitHistory(Vec<PartnerLimit>);

impl LimitHistory {
  /// Wrap limits loaded from storage, oldest first.
  pub fn from_stored(limits: Vec<PartnerLimit>) -> Self { Self(limits) }

  /// The single uncancelled entry, if any.
  ///
  /// Finding more than one is reported as [`Error::Integrity`] rather than
  /// picking one of them.
  pub fn active(&self) -> Result<Option<&PartnerLimit>> {
    Ok(self.active_index()?.and_then(|i| self.0.get(i)))
  }

  pub fn get(&self, limit_id: Uuid) -> Option<&PartnerLimit> {
    self.0.iter().find(|l| l.limit_id == limit_id)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, PartnerLimit> { self.0.iter() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn last(&self) -> Option<&PartnerLimit> { self.0.last() }

  fn active_index(&self) -> Result<Option<usize>> {
    let mut active = self
      .0
      .iter()
      .enumerate()
      .filter(|(_, l)| l.is_active());

    let first = active.next();
    if let Some((_, extra)) = active.next() {
      return Err(Error::Integrity(format!(
        "partner {} has more than one active limit",
        extra.partner_id
      )));
    }
    Ok(first.map(|(i, _)| i))
  }

  /// Cancel the active entry at `at`; returns the cancelled entry.
  fn cancel_active(&mut self, at: DateTime<Utc>) -> Result<Option<PartnerLimit>> {
    let Some(index) = self.active_index()? else {
      return Ok(None);
    };
    Ok(self.0.get_mut(index).map(|limit| {
      limit.cancel_date = Some(at);
      limit.clone()
    }))
  }

  fn push(&mut self, limit: PartnerLimit) { self.0.push(limit); }
}

// ─── Partner ─────────────────────────────────────────────────────────────────

/// An external party on whose behalf promo codes are issued under a quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
  pub partner_id:                Uuid,
  pub name:                      String,
  pub is_active:                 bool,
  /// Codes issued under the current quota period.
  pub number_issued_promo_codes: u32,
  pub limits:                    LimitHistory,
  /// Optimistic concurrency token; stores bump it on every save.
  pub version:                   u32,
}

/// What [`Partner::replace_limit`] did to the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitChange {
  pub created:       PartnerLimit,
  pub cancelled:     Option<PartnerLimit>,
  pub counter_reset: bool,
}

impl Partner {
  /// A partner with an empty history that has never been saved.
  pub fn new(name: impl Into<String>, is_active: bool) -> Self {
    Self {
      partner_id: Uuid::new_v4(),
      name: name.into(),
      is_active,
      number_issued_promo_codes: 0,
      limits: LimitHistory::default(),
      version: 0,
    }
  }

  pub fn active_limit(&self) -> Result<Option<&PartnerLimit>> { self.limits.active() }

  /// Supersede the active limit (if any) with a new one created at `now`.
  ///
  /// The issuance counter is reset only when an active limit was cancelled.
  /// On error the aggregate is left untouched.
  pub fn replace_limit(
    &mut self,
    limit: u32,
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
  ) -> Result<LimitChange> {
    let cancelled = self.limits.cancel_active(now)?;
    let counter_reset = cancelled.is_some();
    if counter_reset {
      self.number_issued_promo_codes = 0;
    }

    let created = PartnerLimit {
      limit_id: Uuid::new_v4(),
      partner_id: self.partner_id,
      limit,
      create_date: now,
      end_date,
      cancel_date: None,
    };
    self.limits.push(created.clone());

    Ok(LimitChange { created, cancelled, counter_reset })
  }

  /// Cancel the active limit without replacing it. The counter is kept.
  pub fn cancel_limit(&mut self, now: DateTime<Utc>) -> Result<Option<PartnerLimit>> {
    self.limits.cancel_active(now)
  }
}
