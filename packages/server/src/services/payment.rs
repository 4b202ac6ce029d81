use chrono::Utc;
use sea_orm::sea_query::{OnConflict, Query, SelectStatement};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{payment, submission, submission_set, submission_set_member};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::payment::PaymentListQuery;

/// Mark a submission set paid or unpaid. Repeated calls update the one
/// payment row of the set.
#[instrument(skip(db, auth_user), fields(user_id = auth_user.user_id))]
pub async fn set_paid<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    submission_set_id: i32,
    paid: bool,
) -> Result<payment::Model, AppError> {
    auth_user.require_permission("payment:manage")?;

    submission_set::Entity::find_by_id(submission_set_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission set not found".into()))?;

    let now = Utc::now();
    payment::Entity::insert(payment::ActiveModel {
        submission_set_id: Set(submission_set_id),
        paid: Set(paid),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(payment::Column::SubmissionSetId)
            .update_columns([payment::Column::Paid, payment::Column::UpdatedAt])
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    info!(submission_set_id, paid, "Payment updated");

    payment::Entity::find()
        .filter(payment::Column::SubmissionSetId.eq(submission_set_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("payment row missing after upsert".into()))
}

pub async fn list_payments<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    query: &PaymentListQuery,
) -> Result<Vec<payment::Model>, AppError> {
    auth_user.require_permission("payment:manage")?;

    let mut select = payment::Entity::find();
    if let Some(set_id) = query.submission_set {
        select = select.filter(payment::Column::SubmissionSetId.eq(set_id));
    }
    if let Some(paid) = query.paid {
        select = select.filter(payment::Column::Paid.eq(paid));
    }
    Ok(select.order_by_asc(payment::Column::Id).all(db).await?)
}

/// Subquery selecting the ids of submissions whose set has a paid payment.
pub fn paid_submissions() -> SelectStatement {
    Query::select()
        .column(submission_set_member::Column::SubmissionId)
        .from(submission_set_member::Entity)
        .and_where(
            submission_set_member::Column::SubmissionSetId.in_subquery(
                Query::select()
                    .column(payment::Column::SubmissionSetId)
                    .from(payment::Entity)
                    .and_where(payment::Column::Paid.eq(true))
                    .to_owned(),
            ),
        )
        .to_owned()
}

/// Whether the set holding the submission is paid.
pub async fn is_paid<C: ConnectionTrait>(db: &C, submission_id: i32) -> Result<bool, AppError> {
    let paid = submission::Entity::find_by_id(submission_id)
        .filter(submission::Column::Id.in_subquery(paid_submissions()))
        .count(db)
        .await?;
    Ok(paid > 0)
}
