//! Demo data for a freshly created store.

use chrono::{TimeDelta, Utc};
use promo_core::{
  customer::{Customer, PromoTemplate},
  partner::Partner,
};
use rusqlite::TransactionBehavior;
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  encode::{RawCustomer, RawLimit, RawPartner, RawPromoCode, encode_uuid},
  store::{insert_customer_rows, insert_preference_row, insert_promo_code_row, write_partner},
};

const THEATRE_ID: Uuid = Uuid::from_u128(0xef7f299f_92d7_459f_896e_078ed53ef99c);
const FAMILY_ID: Uuid = Uuid::from_u128(0xc4bda62e_fc74_4256_a956_4760b3858cbd);
const CHILDREN_ID: Uuid = Uuid::from_u128(0x76324c47_68d2_472d_abb8_33cfa8cc0c84);
pub(crate) const CUSTOMER_ID: Uuid = Uuid::from_u128(0xa6c8c6b1_4349_45b0_ab31_244740aaf0f0);
const TOYS_PARTNER_ID: Uuid = Uuid::from_u128(0x20d2d612_db93_4ed5_86b1_ff2413bca655);
const FISH_PARTNER_ID: Uuid = Uuid::from_u128(0x894b6e9b_eb5f_406c_aefa_8ccb35d39319);

impl SqliteStore {
  /// Populate an empty store with demo preferences, a customer, one promo
  /// code, and two partners, all in one transaction.
  ///
  /// Returns `false` without writing if any preference or partner already
  /// exists. A failure leaves the store as it was.
  pub async fn seed_demo_data(&self) -> Result<bool> {
    let now = Utc::now();

    let preferences: Vec<(String, String)> = [
      (THEATRE_ID, "Театр"),
      (FAMILY_ID, "Семья"),
      (CHILDREN_ID, "Дети"),
    ]
    .into_iter()
    .map(|(id, name)| (encode_uuid(id), name.to_owned()))
    .collect();

    let customer = RawCustomer::encode(&Customer {
      customer_id:    CUSTOMER_ID,
      first_name:     "Иван".into(),
      last_name:      "Петров".into(),
      email:          "ivan_sergeev@mail.ru".into(),
      preference_ids: vec![THEATRE_ID, FAMILY_ID],
    });

    let welcome = PromoTemplate {
      code:         "PROMO2024".into(),
      service_info: "Промокод на скидку 20% в 2026 году".into(),
      partner_name: "Компания А".into(),
      validity:     TimeDelta::days(365),
    };
    let promo_code = RawPromoCode::encode(&welcome.issue(CUSTOMER_ID, THEATRE_ID, now));

    let mut toys = Partner::new("Суперигрушки", true);
    toys.partner_id = TOYS_PARTNER_ID;
    toys.replace_limit(100, now + TimeDelta::days(30), now)?;
    let mut fish = Partner::new("Рыба твоей мечты", false);
    fish.partner_id = FISH_PARTNER_ID;
    let partners: Vec<(RawPartner, Vec<RawLimit>)> = [toys, fish]
      .iter()
      .map(|p| (RawPartner::encode(p), p.limits.iter().map(RawLimit::encode).collect()))
      .collect();

    let seeded = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: i64 = tx.query_row(
          "SELECT (SELECT COUNT(*) FROM preferences) + (SELECT COUNT(*) FROM partners)",
          [],
          |r| r.get(0),
        )?;
        if existing > 0 {
          return Ok(false);
        }

        for (id, name) in &preferences {
          insert_preference_row(&tx, id, name)?;
        }
        insert_customer_rows(&tx, &customer)?;
        insert_promo_code_row(&tx, &promo_code)?;
        for (partner, limits) in &partners {
          if !write_partner(&tx, partner, limits)? {
            return Ok(false);
          }
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if seeded {
      tracing::info!("seeded demo data");
    }
    Ok(seeded)
  }
}
