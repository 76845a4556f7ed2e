//! Customers, preference tags, and issued promo codes.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tag customers opt into; the key of a distribution segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
  pub preference_id: Uuid,
  pub name:          String,
}

impl Preference {
  pub fn new(name: impl Into<String>) -> Self {
    Self { preference_id: Uuid::new_v4(), name: name.into() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub customer_id:    Uuid,
  pub first_name:     String,
  pub last_name:      String,
  pub email:          String,
  /// Preferences this customer holds. Owned by the customer.
  pub preference_ids: Vec<Uuid>,
}

impl Customer {
  pub fn has_preference(&self, preference_id: Uuid) -> bool {
    self.preference_ids.contains(&preference_id)
  }
}

/// A promo code issued to exactly one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
  pub promo_code_id: Uuid,
  pub code:          String,
  pub service_info:  String,
  pub begin_date:    DateTime<Utc>,
  pub end_date:      DateTime<Utc>,
  pub partner_name:  String,
  pub customer_id:   Uuid,
  pub preference_id: Uuid,
}

/// The shared part of every code in one distribution batch.
#[derive(Debug, Clone)]
pub struct PromoTemplate {
  pub code:         String,
  pub service_info: String,
  pub partner_name: String,
  /// Length of the validity window starting at issuance.
  pub validity:     TimeDelta,
}

impl PromoTemplate {
  /// Stamp a fresh code for `customer_id`, valid from `now`.
  pub fn issue(
    &self,
    customer_id: Uuid,
    preference_id: Uuid,
    now: DateTime<Utc>,
  ) -> PromoCode {
    PromoCode {
      promo_code_id: Uuid::new_v4(),
      code: self.code.clone(),
      service_info: self.service_info.clone(),
      begin_date: now,
      end_date: now + self.validity,
      partner_name: self.partner_name.clone(),
      customer_id,
      preference_id,
    }
  }
}
