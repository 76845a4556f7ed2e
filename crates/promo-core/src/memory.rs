//! A process-local [`PromoStore`] kept behind one mutex.
//!
//! Follows the same contract as the SQLite backend, including the version
//! check on [`PromoStore::save_partner`]. Used by tests and demos.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use uuid::Uuid;

use crate::{
  customer::{Customer, Preference, PromoCode},
  partner::Partner,
  store::PromoStore,
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("partner {0} was modified concurrently")]
  Conflict(Uuid),

  #[error("promo code writes are unavailable")]
  Unavailable,
}

#[derive(Debug, Default)]
struct Inner {
  partners:      Vec<Partner>,
  preferences:   Vec<Preference>,
  customers:     Vec<Customer>,
  promo_codes:   Vec<PromoCode>,
  partner_saves: usize,
  /// Remaining promo code writes before [`MemoryError::Unavailable`].
  write_budget:  Option<usize>,
  yield_reads:   bool,
}

/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Insert or overwrite a partner as-is, bypassing the version check.
  pub fn insert_partner(&self, partner: Partner) {
    let mut inner = self.lock();
    inner.partners.retain(|p| p.partner_id != partner.partner_id);
    inner.partners.push(partner);
  }

  pub fn insert_preference(&self, preference: Preference) {
    self.lock().preferences.push(preference);
  }

  pub fn insert_customer(&self, customer: Customer) {
    self.lock().customers.push(customer);
  }

  /// Number of successful [`PromoStore::save_partner`] calls so far.
  pub fn partner_saves(&self) -> usize { self.lock().partner_saves }

  /// Allow only `n` more promo code writes; later ones fail.
  pub fn limit_promo_code_writes(&self, n: usize) {
    self.lock().write_budget = Some(n);
  }

  /// Make every [`PromoStore::find_partner`] yield to the runtime before it
  /// returns, so concurrent read-modify-write sequences can interleave.
  pub fn yield_after_reads(&self) { self.lock().yield_reads = true; }
}

impl PromoStore for MemoryStore {
  type Error = MemoryError;

  async fn find_partner(&self, partner_id: Uuid) -> Result<Option<Partner>, MemoryError> {
    let (found, yield_reads) = {
      let inner = self.lock();
      let found = inner
        .partners
        .iter()
        .find(|p| p.partner_id == partner_id)
        .cloned();
      (found, inner.yield_reads)
    };
    if yield_reads {
      tokio::task::yield_now().await;
    }
    Ok(found)
  }

  async fn list_partners(&self) -> Result<Vec<Partner>, MemoryError> {
    Ok(self.lock().partners.clone())
  }

  async fn save_partner(&self, mut partner: Partner) -> Result<Partner, MemoryError> {
    let mut inner = self.lock();
    let existing = inner
      .partners
      .iter()
      .position(|p| p.partner_id == partner.partner_id);

    let stored_version = existing
      .and_then(|i| inner.partners.get(i))
      .map_or(0, |p| p.version);
    if stored_version != partner.version {
      return Err(MemoryError::Conflict(partner.partner_id));
    }

    partner.version += 1;
    match existing {
      Some(i) => {
        if let Some(slot) = inner.partners.get_mut(i) {
          *slot = partner.clone();
        }
      }
      None => inner.partners.push(partner.clone()),
    }
    inner.partner_saves += 1;
    Ok(partner)
  }

  async fn find_preference_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> Result<Option<Preference>, MemoryError> {
    Ok(
      self
        .lock()
        .preferences
        .iter()
        .find(|p| p.name == name)
        .cloned(),
    )
  }

  async fn find_customers_by_preference(
    &self,
    preference_id: Uuid,
  ) -> Result<Vec<Customer>, MemoryError> {
    Ok(
      self
        .lock()
        .customers
        .iter()
        .filter(|c| c.has_preference(preference_id))
        .cloned()
        .collect(),
    )
  }

  async fn create_promo_code(&self, promo_code: PromoCode) -> Result<(), MemoryError> {
    let mut inner = self.lock();
    if let Some(budget) = inner.write_budget.as_mut() {
      if *budget == 0 {
        return Err(MemoryError::Unavailable);
      }
      *budget -= 1;
    }
    inner.promo_codes.push(promo_code);
    Ok(())
  }

  async fn list_promo_codes(&self) -> Result<Vec<PromoCode>, MemoryError> {
    Ok(self.lock().promo_codes.clone())
  }
}
