//! Error taxonomy shared by the quota and distribution services.

use thiserror::Error;

/// Returned when an inactive partner is asked to change its quota.
pub const PARTNER_NOT_ACTIVE: &str = "Данный партнер не активен";

/// Returned when a new limit is zero or negative.
pub const LIMIT_MUST_BE_POSITIVE: &str = "Лимит должен быть больше 0";

/// Returned when a distribution names an unknown preference.
pub const PREFERENCE_NOT_FOUND: &str = "Preference not found";

/// Returned when a distribution targets an empty segment.
pub const NO_CUSTOMERS_WITH_PREFERENCE: &str = "No customers with this preference";

#[derive(Debug, Error)]
pub enum Error {
  /// A referenced entity does not exist.
  #[error("{0}")]
  NotFound(String),

  /// The entity exists but cannot take part in the operation.
  #[error("{0}")]
  InvalidState(String),

  /// A caller-supplied value violates a domain constraint.
  #[error("{0}")]
  InvalidArgument(String),

  /// Stored data breaks an invariant, e.g. two uncancelled limits.
  #[error("data integrity violation: {0}")]
  Integrity(String),

  /// The storage collaborator failed. Safe to retry.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Only storage failures are worth retrying unchanged.
  pub fn is_transient(&self) -> bool { matches!(self, Self::Store(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
