//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use promo_core::{
  customer::{Customer, PromoCode},
  partner::{LimitHistory, Partner, PartnerLimit},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `partners` row.
pub struct RawPartner {
  pub partner_id:                String,
  pub name:                      String,
  pub is_active:                 bool,
  pub number_issued_promo_codes: u32,
  pub version:                   u32,
}

impl RawPartner {
  pub fn encode(p: &Partner) -> Self {
    Self {
      partner_id:                encode_uuid(p.partner_id),
      name:                      p.name.clone(),
      is_active:                 p.is_active,
      number_issued_promo_codes: p.number_issued_promo_codes,
      version:                   p.version,
    }
  }

  /// Compose the aggregate from its row and its limit rows (ordered by `seq`).
  pub fn into_partner(self, limits: Vec<RawLimit>) -> Result<Partner> {
    let limits = limits
      .into_iter()
      .map(RawLimit::into_limit)
      .collect::<Result<Vec<_>>>()?;

    Ok(Partner {
      partner_id:                decode_uuid(&self.partner_id)?,
      name:                      self.name,
      is_active:                 self.is_active,
      number_issued_promo_codes: self.number_issued_promo_codes,
      limits:                    LimitHistory::from_stored(limits),
      version:                   self.version,
    })
  }
}

/// Raw values read directly from a `partner_limits` row.
pub struct RawLimit {
  pub limit_id:    String,
  pub partner_id:  String,
  pub limit:       u32,
  pub create_date: String,
  pub end_date:    String,
  pub cancel_date: Option<String>,
}

impl RawLimit {
  pub fn encode(l: &PartnerLimit) -> Self {
    Self {
      limit_id:    encode_uuid(l.limit_id),
      partner_id:  encode_uuid(l.partner_id),
      limit:       l.limit,
      create_date: encode_dt(l.create_date),
      end_date:    encode_dt(l.end_date),
      cancel_date: l.cancel_date.map(encode_dt),
    }
  }

  pub fn into_limit(self) -> Result<PartnerLimit> {
    Ok(PartnerLimit {
      limit_id:    decode_uuid(&self.limit_id)?,
      partner_id:  decode_uuid(&self.partner_id)?,
      limit:       self.limit,
      create_date: decode_dt(&self.create_date)?,
      end_date:    decode_dt(&self.end_date)?,
      cancel_date: self.cancel_date.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// A `customers` row plus the ids from `customer_preferences`.
pub struct RawCustomer {
  pub customer_id:    String,
  pub first_name:     String,
  pub last_name:      String,
  pub email:          String,
  pub preference_ids: Vec<String>,
}

impl RawCustomer {
  pub fn encode(c: &Customer) -> Self {
    Self {
      customer_id:    encode_uuid(c.customer_id),
      first_name:     c.first_name.clone(),
      last_name:      c.last_name.clone(),
      email:          c.email.clone(),
      preference_ids: c.preference_ids.iter().copied().map(encode_uuid).collect(),
    }
  }

  pub fn into_customer(self) -> Result<Customer> {
    Ok(Customer {
      customer_id:    decode_uuid(&self.customer_id)?,
      first_name:     self.first_name,
      last_name:      self.last_name,
      email:          self.email,
      preference_ids: self
        .preference_ids
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<_>>()?,
    })
  }
}

/// Raw values read directly from a `promo_codes` row.
pub struct RawPromoCode {
  pub promo_code_id: String,
  pub code:          String,
  pub service_info:  String,
  pub begin_date:    String,
  pub end_date:      String,
  pub partner_name:  String,
  pub customer_id:   String,
  pub preference_id: String,
}

impl RawPromoCode {
  pub fn encode(pc: &PromoCode) -> Self {
    Self {
      promo_code_id: encode_uuid(pc.promo_code_id),
      code:          pc.code.clone(),
      service_info:  pc.service_info.clone(),
      begin_date:    encode_dt(pc.begin_date),
      end_date:      encode_dt(pc.end_date),
      partner_name:  pc.partner_name.clone(),
      customer_id:   encode_uuid(pc.customer_id),
      preference_id: encode_uuid(pc.preference_id),
    }
  }

  pub fn into_promo_code(self) -> Result<PromoCode> {
    Ok(PromoCode {
      promo_code_id: decode_uuid(&self.promo_code_id)?,
      code:          self.code,
      service_info:  self.service_info,
      begin_date:    decode_dt(&self.begin_date)?,
      end_date:      decode_dt(&self.end_date)?,
      partner_name:  self.partner_name,
      customer_id:   decode_uuid(&self.customer_id)?,
      preference_id: decode_uuid(&self.preference_id)?,
    })
  }
}
