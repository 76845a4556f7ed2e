//! Bulk issuance of promo codes to a preference segment.
//!
//! One code is created per customer holding the preference. Each write is
//! independent: a storage failure part-way leaves the already-issued codes
//! in place and reports the batch as failed.

use chrono::Utc;

use crate::{
  Error, Result,
  customer::PromoTemplate,
  error::{NO_CUSTOMERS_WITH_PREFERENCE, PREFERENCE_NOT_FOUND},
  store::PromoStore,
};

/// Issue `template` to every customer holding the preference named
/// `preference`. Returns the number of codes issued.
pub async fn issue_to_segment<S: PromoStore>(
  store: &S,
  preference: &str,
  template: &PromoTemplate,
) -> Result<usize> {
  let preference = store
    .find_preference_by_name(preference)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(PREFERENCE_NOT_FOUND.to_owned()))?;

  let segment = store
    .find_customers_by_preference(preference.preference_id)
    .await
    .map_err(Error::store)?;
  if segment.is_empty() {
    tracing::warn!(preference = %preference.name, "distribution to an empty segment");
    return Err(Error::InvalidState(NO_CUSTOMERS_WITH_PREFERENCE.to_owned()));
  }

  let now = Utc::now();
  let codes: Vec<_> = segment
    .iter()
    .map(|c| template.issue(c.customer_id, preference.preference_id, now))
    .collect();

  let total = codes.len();
  for (issued, code) in codes.into_iter().enumerate() {
    let customer_id = code.customer_id;
    if let Err(e) = store.create_promo_code(code).await {
      tracing::warn!(
        preference = %preference.name,
        %customer_id,
        issued,
        total,
        "distribution stopped part-way"
      );
      return Err(Error::store(e));
    }
  }

  tracing::info!(
    preference = %preference.name,
    code = %template.code,
    issued = total,
    "promo codes distributed"
  );
  Ok(total)
}

#[cfg(test)]
mod tests {
  use chrono::TimeDelta;
  use uuid::Uuid;

  use super::*;
  use crate::{
    customer::{Customer, Preference},
    memory::MemoryStore,
  };

  fn template() -> PromoTemplate {
    PromoTemplate {
      code:         "THEATRE20".into(),
      service_info: "Скидка 20% на билеты".into(),
      partner_name: "Компания А".into(),
      validity:     TimeDelta::days(30),
    }
  }

  fn customer(email: &str, preference_ids: Vec<Uuid>) -> Customer {
    Customer {
      customer_id: Uuid::new_v4(),
      first_name: "Иван".into(),
      last_name: "Петров".into(),
      email: email.into(),
      preference_ids,
    }
  }

  fn store_with_theatre() -> (MemoryStore, Preference, Preference) {
    let store = MemoryStore::new();
    let theatre = Preference::new("Театр");
    let children = Preference::new("Дети");
    store.insert_preference(theatre.clone());
    store.insert_preference(children.clone());
    (store, theatre, children)
  }

  #[tokio::test]
  async fn issues_one_code_to_the_single_matching_customer() {
    let (store, theatre, _) = store_with_theatre();
    let ivan = customer("ivan@mail.ru", vec![theatre.preference_id]);
    store.insert_customer(ivan.clone());
    store.insert_customer(customer("other@mail.ru", vec![]));

    let issued = issue_to_segment(&store, "Театр", &template()).await.unwrap();
    assert_eq!(issued, 1);

    let codes = store.list_promo_codes().await.unwrap();
    assert_eq!(codes.len(), 1);
    let code = &codes[0];
    assert_eq!(code.customer_id, ivan.customer_id);
    assert_eq!(code.preference_id, theatre.preference_id);
    assert_eq!(code.code, "THEATRE20");
    assert_eq!(code.partner_name, "Компания А");
    assert_eq!(code.end_date - code.begin_date, TimeDelta::days(30));
  }

  #[tokio::test]
  async fn issues_distinct_codes_per_customer() {
    let (store, theatre, _) = store_with_theatre();
    for i in 0..3 {
      store.insert_customer(customer(&format!("c{i}@mail.ru"), vec![theatre.preference_id]));
    }

    let issued = issue_to_segment(&store, "Театр", &template()).await.unwrap();
    assert_eq!(issued, 3);

    let codes = store.list_promo_codes().await.unwrap();
    let mut ids: Vec<_> = codes.iter().map(|c| c.promo_code_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
  }

  #[tokio::test]
  async fn empty_segment_is_invalid_state() {
    let (store, theatre, _) = store_with_theatre();
    store.insert_customer(customer("ivan@mail.ru", vec![theatre.preference_id]));

    let err = issue_to_segment(&store, "Дети", &template()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert_eq!(err.to_string(), NO_CUSTOMERS_WITH_PREFERENCE);
    assert!(store.list_promo_codes().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn unknown_preference_is_not_found() {
    let (store, theatre, _) = store_with_theatre();
    store.insert_customer(customer("ivan@mail.ru", vec![theatre.preference_id]));

    let err = issue_to_segment(&store, "Рыбалка", &template()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(store.list_promo_codes().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn storage_failure_keeps_earlier_codes() {
    let (store, theatre, _) = store_with_theatre();
    for i in 0..3 {
      store.insert_customer(customer(&format!("c{i}@mail.ru"), vec![theatre.preference_id]));
    }
    store.limit_promo_code_writes(2);

    let err = issue_to_segment(&store, "Театр", &template()).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(store.list_promo_codes().await.unwrap().len(), 2);
  }
}
