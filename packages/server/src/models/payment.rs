use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::payment;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetPaidRequest {
    pub paid: bool,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct PaymentListQuery {
    pub submission_set: Option<i32>,
    pub paid: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PaymentResponse {
    pub id: i32,
    pub submission_set_id: i32,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payment::Model> for PaymentResponse {
    fn from(m: payment::Model) -> Self {
        Self {
            id: m.id,
            submission_set_id: m.submission_set_id,
            paid: m.paid,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PaymentListResponse {
    pub data: Vec<PaymentResponse>,
    pub total: u64,
}
