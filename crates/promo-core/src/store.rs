//! The storage collaborator behind every service.
//!
//! Implemented by storage backends (e.g. `promo-store-sqlite`) and by the
//! in-memory [`MemoryStore`](crate::memory::MemoryStore). Each method covers
//! one query shape; aggregates come back fully composed.

use std::future::Future;

use uuid::Uuid;

use crate::{
  customer::{Customer, Preference, PromoCode},
  partner::Partner,
};

/// Abstraction over a promo-code storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait PromoStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Partners ──────────────────────────────────────────────────────────

  /// Load a partner together with its full limit history, oldest first.
  fn find_partner(
    &self,
    partner_id: Uuid,
  ) -> impl Future<Output = Result<Option<Partner>, Self::Error>> + Send + '_;

  fn list_partners(
    &self,
  ) -> impl Future<Output = Result<Vec<Partner>, Self::Error>> + Send + '_;

  /// Upsert the partner and its whole limit history as one write.
  ///
  /// Fails without writing anything if `partner.version` no longer matches
  /// the stored version. Returns the aggregate with its bumped version.
  fn save_partner(
    &self,
    partner: Partner,
  ) -> impl Future<Output = Result<Partner, Self::Error>> + Send + '_;

  // ── Segments ──────────────────────────────────────────────────────────

  fn find_preference_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Preference>, Self::Error>> + Send + 'a;

  /// Every customer holding `preference_id`.
  fn find_customers_by_preference(
    &self,
    preference_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Customer>, Self::Error>> + Send + '_;

  // ── Promo codes ───────────────────────────────────────────────────────

  fn create_promo_code(
    &self,
    promo_code: PromoCode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All issued codes, oldest first.
  fn list_promo_codes(
    &self,
  ) -> impl Future<Output = Result<Vec<PromoCode>, Self::Error>> + Send + '_;
}
