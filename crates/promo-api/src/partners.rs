//! Handlers for `/partners` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/partners` | All partners with their limit history |
//! | `GET`  | `/partners/{id}` | 404 if not found |
//! | `POST` | `/partners/{id}/limits` | Body: [`SetLimitBody`]; returns 201 + new limit |
//! | `POST` | `/partners/{id}/limits/cancel` | Cancels the active limit; 204 |
//! | `GET`  | `/partners/{id}/limits/{limit_id}` | Single limit, cancelled or not |

use axum::{
  Json,
  extract::{Path, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use promo_core::{
  partner::{Partner, PartnerLimit},
  quota::{self, NewLimit},
  store::PromoStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── DTOs ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitResponse {
  pub id:          Uuid,
  pub partner_id:  Uuid,
  pub limit:       u32,
  pub create_date: DateTime<Utc>,
  pub end_date:    DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cancel_date: Option<DateTime<Utc>>,
  /// Past `end_date`. Says nothing about whether the limit is cancelled.
  pub expired:     bool,
}

impl From<PartnerLimit> for LimitResponse {
  fn from(l: PartnerLimit) -> Self {
    Self {
      id:          l.limit_id,
      partner_id:  l.partner_id,
      limit:       l.limit,
      create_date: l.create_date,
      end_date:    l.end_date,
      cancel_date: l.cancel_date,
      expired:     l.is_expired(Utc::now()),
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerResponse {
  pub id:                        Uuid,
  pub name:                      String,
  pub is_active:                 bool,
  pub number_issued_promo_codes: u32,
  pub partner_limits:            Vec<LimitResponse>,
}

impl From<Partner> for PartnerResponse {
  fn from(p: Partner) -> Self {
    Self {
      id:                        p.partner_id,
      name:                      p.name,
      is_active:                 p.is_active,
      number_issued_promo_codes: p.number_issued_promo_codes,
      partner_limits:            p.limits.iter().cloned().map(LimitResponse::from).collect(),
    }
  }
}

/// JSON body accepted by `POST /partners/{id}/limits`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLimitBody {
  pub limit:    i32,
  pub end_date: DateTime<Utc>,
}

// ─── List / get ───────────────────────────────────────────────────────────────

/// `GET /partners`
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<PartnerResponse>>, ApiError>
where
  S: PromoStore,
{
  let partners = state
    .store
    .list_partners()
    .await
    .map_err(|e| ApiError::Unavailable(Box::new(e)))?;
  Ok(Json(partners.into_iter().map(PartnerResponse::from).collect()))
}

/// `GET /partners/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PartnerResponse>, ApiError>
where
  S: PromoStore,
{
  let partner = quota::load_partner(state.store.as_ref(), id).await?;
  Ok(Json(partner.into()))
}

/// `GET /partners/{id}/limits/{limit_id}`
pub async fn get_limit<S>(
  State(state): State<AppState<S>>,
  Path((id, limit_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LimitResponse>, ApiError>
where
  S: PromoStore,
{
  let limit = quota::find_limit(state.store.as_ref(), id, limit_id).await?;
  Ok(Json(limit.into()))
}

// ─── Set / cancel ─────────────────────────────────────────────────────────────

/// `POST /partners/{id}/limits`: returns 201, a `Location` header pointing at
/// the new limit, and the limit itself.
pub async fn set_limit<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<SetLimitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PromoStore,
{
  let request = NewLimit { limit: body.limit, end_date: body.end_date };
  let limit = state
    .quota
    .set_limit(state.store.as_ref(), id, request)
    .await?;

  let location = format!("/partners/{id}/limits/{}", limit.limit_id);
  Ok((
    StatusCode::CREATED,
    [(header::LOCATION, location)],
    Json(LimitResponse::from(limit)),
  ))
}

/// `POST /partners/{id}/limits/cancel`: 204 whether or not a limit was active.
pub async fn cancel_limit<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: PromoStore,
{
  state.quota.cancel_limit(state.store.as_ref(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}
