//! JSON REST API for the promo-code backend.
//!
//! Exposes an axum [`Router`] backed by any [`promo_core::store::PromoStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", promo_api::api_router(state))
//! ```

pub mod error;
pub mod partners;
pub mod promocodes;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use chrono::TimeDelta;
use promo_core::{quota::QuotaManager, store::PromoStore};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:               Arc<S>,
  /// One per process so limit changes serialize per partner.
  pub quota:               Arc<QuotaManager>,
  /// Validity window of codes issued by `POST /promocodes`.
  pub promo_code_validity: TimeDelta,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:               self.store.clone(),
      quota:               self.quota.clone(),
      promo_code_validity: self.promo_code_validity,
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, promo_code_validity: TimeDelta) -> Self {
    Self { store, quota: Arc::new(QuotaManager::new()), promo_code_validity }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: PromoStore + 'static,
{
  Router::new()
    // Partners
    .route("/partners", get(partners::list::<S>))
    .route("/partners/{id}", get(partners::get_one::<S>))
    .route("/partners/{id}/limits", post(partners::set_limit::<S>))
    .route("/partners/{id}/limits/cancel", post(partners::cancel_limit::<S>))
    .route("/partners/{id}/limits/{limit_id}", get(partners::get_limit::<S>))
    // Promo codes
    .route("/promocodes", get(promocodes::list::<S>).post(promocodes::issue::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::{Duration, Utc};
  use promo_core::{
    customer::{Customer, Preference},
    memory::MemoryStore,
    partner::Partner,
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;

  fn make_state() -> (AppState<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    (AppState::new(Arc::new(store.clone()), TimeDelta::days(30)), store)
  }

  async fn oneshot_json(
    state:  AppState<MemoryStore>,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = api_router(state)
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status  = resp.status();
    let headers = resp.headers().clone();
    let bytes   = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json    = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, json)
  }

  fn limit_body(limit: i32) -> Value {
    json!({ "limit": limit, "endDate": (Utc::now() + Duration::days(10)).to_rfc3339() })
  }

  // ── Set limit ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn set_limit_returns_201_with_location() {
    let (state, store) = make_state();
    let partner = Partner::new("Суперигрушки", true);
    store.insert_partner(partner.clone());
    let id = partner.partner_id;

    let (status, headers, body) =
      oneshot_json(state.clone(), "POST", &format!("/partners/{id}/limits"), Some(limit_body(100))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["limit"], 100);
    assert_eq!(body["partnerId"], id.to_string());
    assert!(body.get("createDate").is_some());
    assert_eq!(body["expired"], false);

    let location = headers.get(header::LOCATION).unwrap().to_str().unwrap().to_owned();
    assert_eq!(location, format!("/partners/{id}/limits/{}", body["id"].as_str().unwrap()));

    let (status, _, fetched) = oneshot_json(state, "GET", &location, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], body["id"]);
  }

  #[tokio::test]
  async fn set_limit_unknown_partner_returns_404() {
    let (state, store) = make_state();
    let uri = format!("/partners/{}/limits", Uuid::new_v4());
    let (status, _, _) = oneshot_json(state, "POST", &uri, Some(limit_body(100))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(store.partner_saves(), 0);
  }

  #[tokio::test]
  async fn set_limit_inactive_partner_returns_400_with_message() {
    let (state, store) = make_state();
    let partner = Partner::new("Рыба твоей мечты", false);
    store.insert_partner(partner.clone());

    let uri = format!("/partners/{}/limits", partner.partner_id);
    let (status, _, body) = oneshot_json(state, "POST", &uri, Some(limit_body(100))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Данный партнер не активен");
  }

  #[tokio::test]
  async fn set_limit_zero_returns_400_with_message() {
    let (state, store) = make_state();
    let partner = Partner::new("Суперигрушки", true);
    store.insert_partner(partner.clone());

    let uri = format!("/partners/{}/limits", partner.partner_id);
    let (status, _, body) = oneshot_json(state, "POST", &uri, Some(limit_body(0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Лимит должен быть больше 0");
  }

  #[tokio::test]
  async fn cancel_limit_returns_204_and_clears_active() {
    let (state, store) = make_state();
    let mut partner = Partner::new("Суперигрушки", true);
    let now = Utc::now();
    partner.replace_limit(10, now + Duration::days(1), now).unwrap();
    store.insert_partner(partner.clone());
    let id = partner.partner_id;

    let (status, _, _) =
      oneshot_json(state.clone(), "POST", &format!("/partners/{id}/limits/cancel"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = oneshot_json(state, "GET", &format!("/partners/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["partnerLimits"][0].get("cancelDate").is_some());
  }

  #[tokio::test]
  async fn lapsed_limit_is_reported_expired() {
    let (state, store) = make_state();
    let mut partner = Partner::new("Суперигрушки", true);
    let now = Utc::now();
    partner.replace_limit(10, now - Duration::days(1), now - Duration::days(5)).unwrap();
    store.insert_partner(partner.clone());

    let uri = format!("/partners/{}", partner.partner_id);
    let (status, _, body) = oneshot_json(state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["partnerLimits"][0]["expired"], true);
    assert!(body["partnerLimits"][0].get("cancelDate").is_none());
  }

  // ── Promo codes ──────────────────────────────────────────────────────────────

  fn seed_segment(store: &MemoryStore) -> Customer {
    let theatre = Preference::new("Театр");
    store.insert_preference(theatre.clone());
    store.insert_preference(Preference::new("Дети"));
    let customer = Customer {
      customer_id:    Uuid::new_v4(),
      first_name:     "Иван".into(),
      last_name:      "Петров".into(),
      email:          "ivan_sergeev@mail.ru".into(),
      preference_ids: vec![theatre.preference_id],
    };
    store.insert_customer(customer.clone());
    customer
  }

  fn issue_body(preference: &str) -> Value {
    json!({
      "preference":  preference,
      "promoCode":   "THEATRE20",
      "serviceInfo": "Скидка 20%",
      "partnerName": "Компания А",
    })
  }

  #[tokio::test]
  async fn issue_to_segment_reports_count_and_lists_codes() {
    let (state, store) = make_state();
    seed_segment(&store);

    let (status, _, body) =
      oneshot_json(state.clone(), "POST", "/promocodes", Some(issue_body("Театр"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issuedCount"], 1);

    let (status, _, codes) = oneshot_json(state, "GET", "/promocodes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(codes.as_array().unwrap().len(), 1);
    assert_eq!(codes[0]["code"], "THEATRE20");
    let today = Utc::now().format("%d-%m-%Y").to_string();
    assert_eq!(codes[0]["beginDate"], today);
  }

  #[tokio::test]
  async fn issue_to_unknown_preference_returns_404() {
    let (state, store) = make_state();
    seed_segment(&store);
    let (status, _, body) =
      oneshot_json(state, "POST", "/promocodes", Some(issue_body("Рыбалка"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Preference not found");
  }

  #[tokio::test]
  async fn issue_to_empty_segment_returns_400() {
    let (state, store) = make_state();
    seed_segment(&store);
    let (status, _, body) =
      oneshot_json(state, "POST", "/promocodes", Some(issue_body("Дети"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No customers with this preference");
  }

  #[tokio::test]
  async fn store_failure_returns_503() {
    let (state, store) = make_state();
    seed_segment(&store);
    store.limit_promo_code_writes(0);
    let (status, _, _) =
      oneshot_json(state, "POST", "/promocodes", Some(issue_body("Театр"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  }
}
