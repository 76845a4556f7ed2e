//! Handlers for `/promocodes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/promocodes` | All issued codes, oldest first |
//! | `POST` | `/promocodes` | Body: [`IssueBody`]; one code per customer in the segment |

use axum::{
  Json,
  extract::State,
};
use promo_core::{
  customer::{PromoCode, PromoTemplate},
  distribution::issue_to_segment,
  store::PromoStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

const DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeShortResponse {
  pub id:           Uuid,
  pub code:         String,
  pub service_info: String,
  /// `dd-MM-yyyy`
  pub begin_date:   String,
  pub end_date:     String,
  pub partner_name: String,
}

impl From<PromoCode> for PromoCodeShortResponse {
  fn from(pc: PromoCode) -> Self {
    Self {
      id:           pc.promo_code_id,
      code:         pc.code,
      service_info: pc.service_info,
      begin_date:   pc.begin_date.format(DATE_FORMAT).to_string(),
      end_date:     pc.end_date.format(DATE_FORMAT).to_string(),
      partner_name: pc.partner_name,
    }
  }
}

/// JSON body accepted by `POST /promocodes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueBody {
  pub preference:   String,
  #[serde(alias = "promoCode")]
  pub code:         String,
  pub service_info: String,
  pub partner_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
  pub issued_count: usize,
}

/// `GET /promocodes`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<PromoCodeShortResponse>>, ApiError>
where
  S: PromoStore,
{
  let codes = state
    .store
    .list_promo_codes()
    .await
    .map_err(|e| ApiError::Unavailable(Box::new(e)))?;
  Ok(Json(codes.into_iter().map(PromoCodeShortResponse::from).collect()))
}

/// `POST /promocodes`: issue the code to every customer with the preference.
pub async fn issue<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<IssueBody>,
) -> Result<Json<IssueResponse>, ApiError>
where
  S: PromoStore,
{
  let template = PromoTemplate {
    code:         body.code,
    service_info: body.service_info,
    partner_name: body.partner_name,
    validity:     state.promo_code_validity,
  };
  let issued_count =
    issue_to_segment(state.store.as_ref(), &body.preference, &template).await?;
  Ok(Json(IssueResponse { issued_count }))
}
