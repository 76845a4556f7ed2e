//! SQLite implementation of [`PromoStore`].

use std::path::Path;

use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use promo_core::{
  customer::{Customer, Preference, PromoCode},
  partner::Partner,
  store::PromoStore,
};

use crate::{
  Error, Result,
  encode::{RawCustomer, RawLimit, RawPartner, RawPromoCode, decode_uuid, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A promo-code store backed by a single SQLite file.
///
/// Clones share one reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn insert_preference(&self, preference: &Preference) -> Result<()> {
    let id_str = encode_uuid(preference.preference_id);
    let name   = preference.name.clone();

    self
      .conn
      .call(move |conn| {
        insert_preference_row(conn, &id_str, &name)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a customer together with its preference links.
  pub async fn insert_customer(&self, customer: &Customer) -> Result<()> {
    let raw = RawCustomer::encode(customer);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        insert_customer_rows(&tx, &raw)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row writers ─────────────────────────────────────────────────────────────

pub(crate) fn insert_preference_row(
  conn: &Connection,
  preference_id: &str,
  name: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO preferences (preference_id, name) VALUES (?1, ?2)",
    rusqlite::params![preference_id, name],
  )?;
  Ok(())
}

pub(crate) fn insert_customer_rows(conn: &Connection, raw: &RawCustomer) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO customers (customer_id, first_name, last_name, email)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![raw.customer_id, raw.first_name, raw.last_name, raw.email],
  )?;
  for pref in &raw.preference_ids {
    conn.execute(
      "INSERT INTO customer_preferences (customer_id, preference_id) VALUES (?1, ?2)",
      rusqlite::params![raw.customer_id, pref],
    )?;
  }
  Ok(())
}

pub(crate) fn insert_promo_code_row(conn: &Connection, raw: &RawPromoCode) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO promo_codes (
       promo_code_id, code, service_info, begin_date, end_date,
       partner_name, customer_id, preference_id
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      raw.promo_code_id,
      raw.code,
      raw.service_info,
      raw.begin_date,
      raw.end_date,
      raw.partner_name,
      raw.customer_id,
      raw.preference_id,
    ],
  )?;
  Ok(())
}

/// Version-checked upsert of a partner row and its limit rows.
///
/// Returns `false` without writing when the stored version is not
/// `raw.version`. Must run inside a write transaction.
pub(crate) fn write_partner(
  conn: &Connection,
  raw: &RawPartner,
  limits: &[RawLimit],
) -> rusqlite::Result<bool> {
  let stored: Option<u32> = conn
    .query_row(
      "SELECT version FROM partners WHERE partner_id = ?1",
      rusqlite::params![raw.partner_id],
      |r| r.get(0),
    )
    .optional()?;
  if stored.unwrap_or(0) != raw.version {
    return Ok(false);
  }

  let next = raw.version + 1;
  if stored.is_some() {
    conn.execute(
      "UPDATE partners
       SET name = ?2, is_active = ?3, number_issued_promo_codes = ?4, version = ?5
       WHERE partner_id = ?1",
      rusqlite::params![
        raw.partner_id,
        raw.name,
        raw.is_active,
        raw.number_issued_promo_codes,
        next,
      ],
    )?;
  } else {
    conn.execute(
      "INSERT INTO partners (partner_id, name, is_active, number_issued_promo_codes, version)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      rusqlite::params![
        raw.partner_id,
        raw.name,
        raw.is_active,
        raw.number_issued_promo_codes,
        next,
      ],
    )?;
  }

  // Past entries only ever gain a cancel_date.
  for (seq, limit) in limits.iter().enumerate() {
    conn.execute(
      "INSERT INTO partner_limits (
         limit_id, partner_id, seq, limit_value, create_date, end_date, cancel_date
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
       ON CONFLICT (limit_id) DO UPDATE SET cancel_date = excluded.cancel_date",
      rusqlite::params![
        limit.limit_id,
        limit.partner_id,
        seq as i64,
        limit.limit,
        limit.create_date,
        limit.end_date,
        limit.cancel_date,
      ],
    )?;
  }
  Ok(true)
}

// ─── Row readers ─────────────────────────────────────────────────────────────

fn read_partner(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPartner> {
  Ok(RawPartner {
    partner_id:                row.get(0)?,
    name:                      row.get(1)?,
    is_active:                 row.get(2)?,
    number_issued_promo_codes: row.get(3)?,
    version:                   row.get(4)?,
  })
}

fn read_limits(conn: &Connection, partner_id: &str) -> rusqlite::Result<Vec<RawLimit>> {
  let mut stmt = conn.prepare(
    "SELECT limit_id, partner_id, limit_value, create_date, end_date, cancel_date
     FROM partner_limits
     WHERE partner_id = ?1
     ORDER BY seq",
  )?;
  stmt
    .query_map(rusqlite::params![partner_id], |row| {
      Ok(RawLimit {
        limit_id:    row.get(0)?,
        partner_id:  row.get(1)?,
        limit:       row.get(2)?,
        create_date: row.get(3)?,
        end_date:    row.get(4)?,
        cancel_date: row.get(5)?,
      })
    })?
    .collect()
}

fn read_preference_ids(conn: &Connection, customer_id: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(
    "SELECT preference_id FROM customer_preferences WHERE customer_id = ?1",
  )?;
  stmt
    .query_map(rusqlite::params![customer_id], |row| row.get(0))?
    .collect()
}

const PARTNER_COLUMNS: &str =
  "partner_id, name, is_active, number_issued_promo_codes, version";

// ─── PromoStore impl ─────────────────────────────────────────────────────────

impl PromoStore for SqliteStore {
  type Error = Error;

  // ── Partners ──────────────────────────────────────────────────────────────

  async fn find_partner(&self, partner_id: Uuid) -> Result<Option<Partner>> {
    let id_str = encode_uuid(partner_id);

    let raw: Option<(RawPartner, Vec<RawLimit>)> = self
      .conn
      .call(move |conn| {
        let partner = conn
          .query_row(
            &format!("SELECT {PARTNER_COLUMNS} FROM partners WHERE partner_id = ?1"),
            rusqlite::params![id_str],
            read_partner,
          )
          .optional()?;
        let Some(partner) = partner else {
          return Ok(None);
        };
        let limits = read_limits(conn, &id_str)?;
        Ok(Some((partner, limits)))
      })
      .await?;

    raw.map(|(p, limits)| p.into_partner(limits)).transpose()
  }

  async fn list_partners(&self) -> Result<Vec<Partner>> {
    let raws: Vec<(RawPartner, Vec<RawLimit>)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PARTNER_COLUMNS} FROM partners ORDER BY rowid"
        ))?;
        let partners = stmt
          .query_map([], read_partner)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(partners.len());
        for partner in partners {
          let limits = read_limits(conn, &partner.partner_id)?;
          rows.push((partner, limits));
        }
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(p, limits)| p.into_partner(limits))
      .collect()
  }

  async fn save_partner(&self, mut partner: Partner) -> Result<Partner> {
    let raw      = RawPartner::encode(&partner);
    let limits: Vec<RawLimit> = partner.limits.iter().map(RawLimit::encode).collect();
    let expected = partner.version;

    let saved: bool = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front so the version read cannot
        // go stale before the update.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !write_partner(&tx, &raw, &limits)? {
          return Ok(false);
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !saved {
      tracing::warn!(partner_id = %partner.partner_id, expected, "stale partner version");
      return Err(Error::Conflict(partner.partner_id));
    }

    partner.version = expected + 1;
    Ok(partner)
  }

  // ── Segments ──────────────────────────────────────────────────────────────

  async fn find_preference_by_name<'a>(&'a self, name: &'a str) -> Result<Option<Preference>> {
    let name = name.to_owned();

    let raw: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT preference_id, name FROM preferences WHERE name = ?1",
            rusqlite::params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(id, name)| {
        Ok(Preference { preference_id: decode_uuid(&id)?, name })
      })
      .transpose()
  }

  async fn find_customers_by_preference(&self, preference_id: Uuid) -> Result<Vec<Customer>> {
    let pref_str = encode_uuid(preference_id);

    let raws: Vec<RawCustomer> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.customer_id, c.first_name, c.last_name, c.email
           FROM customers c
           JOIN customer_preferences cp ON cp.customer_id = c.customer_id
           WHERE cp.preference_id = ?1
           ORDER BY c.rowid",
        )?;
        let heads = stmt
          .query_map(rusqlite::params![pref_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<(String, String, String, String)>>>()?;

        let mut rows = Vec::with_capacity(heads.len());
        for (customer_id, first_name, last_name, email) in heads {
          let preference_ids = read_preference_ids(conn, &customer_id)?;
          rows.push(RawCustomer { customer_id, first_name, last_name, email, preference_ids });
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCustomer::into_customer).collect()
  }

  // ── Promo codes ───────────────────────────────────────────────────────────

  async fn create_promo_code(&self, promo_code: PromoCode) -> Result<()> {
    let raw = RawPromoCode::encode(&promo_code);

    self
      .conn
      .call(move |conn| {
        insert_promo_code_row(conn, &raw)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_promo_codes(&self) -> Result<Vec<PromoCode>> {
    let raws: Vec<RawPromoCode> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT promo_code_id, code, service_info, begin_date, end_date,
                  partner_name, customer_id, preference_id
           FROM promo_codes
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawPromoCode {
              promo_code_id: row.get(0)?,
              code:          row.get(1)?,
              service_info:  row.get(2)?,
              begin_date:    row.get(3)?,
              end_date:      row.get(4)?,
              partner_name:  row.get(5)?,
              customer_id:   row.get(6)?,
              preference_id: row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPromoCode::into_promo_code).collect()
  }
}
