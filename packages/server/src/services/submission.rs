use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::Condition;
use sea_orm::*;
use tracing::{info, instrument, warn};

use super::media::{delete_media_rows, remove_media_blobs};
use crate::entity::{
    author, media_file, payment, rating, submission, submission_reward, submission_set,
    submission_set_member, theme, user,
};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::author::AuthorResponse;
use crate::models::media::MediaFileResponse;
use crate::models::submission::{
    CreateSubmissionRequest, SubmissionListQuery, SubmissionResponse, SubmissionSetResponse,
    validate_create_submission,
};
use crate::notify::Confirmation;
use crate::state::AppState;
use crate::utils::contest::{
    find_contest, judged_contest_ids, published_contest_ids, theme_contest, theme_ids_in,
};

/// Result of a committed submission batch.
#[derive(Debug, Clone)]
pub struct SubmissionBatch {
    pub set: submission_set::Model,
    pub submissions: Vec<submission::Model>,
}

/// Create a batch of submissions and their submission set.
///
/// All drafts must target themes of one contest that is open at `now`. The
/// submissions, the set, its membership rows and the media links are written
/// in one transaction.
#[instrument(skip(state, auth_user, drafts), fields(user_id = auth_user.user_id, count = drafts.len()))]
pub async fn create_submissions(
    state: &AppState,
    auth_user: &AuthUser,
    drafts: Vec<CreateSubmissionRequest>,
    now: DateTime<Utc>,
) -> Result<SubmissionBatch, AppError> {
    if drafts.is_empty() {
        return Err(AppError::validation("At least one submission is required"));
    }
    for draft in &drafts {
        validate_create_submission(draft)?;
    }

    let theme_ids: HashSet<i32> = drafts.iter().map(|d| d.theme_id).collect();
    let themes: HashMap<i32, theme::Model> = theme::Entity::find()
        .filter(theme::Column::Id.is_in(theme_ids.iter().copied()))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();
    if themes.len() != theme_ids.len() {
        return Err(AppError::field("theme_id", "Theme does not exist"));
    }

    let contest_ids: HashSet<i32> = themes.values().map(|t| t.contest_id).collect();
    if contest_ids.len() > 1 {
        return Err(AppError::field(
            "theme_id",
            "All submissions must belong to the same contest",
        ));
    }
    let contest_id = themes[&drafts[0].theme_id].contest_id;
    let contest = find_contest(&state.db, contest_id).await?;
    if !contest.is_active(now) {
        return Err(AppError::validation("Contest is not open for submissions"));
    }

    let author_ids: HashSet<i32> = drafts.iter().map(|d| d.author_id).collect();
    let mut authors = author::Entity::find().filter(author::Column::Id.is_in(author_ids.iter().copied()));
    if !auth_user.is_admin() {
        authors = authors.filter(author::Column::UserId.eq(auth_user.user_id));
    }
    if authors.count(&state.db).await? != author_ids.len() as u64 {
        return Err(AppError::field("author_id", "Author does not exist"));
    }

    let mut media_ids = HashSet::new();
    for draft in &drafts {
        let n_photos = themes[&draft.theme_id].n_photos;
        if draft.media_ids.is_empty() || draft.media_ids.len() > n_photos as usize {
            return Err(AppError::field(
                "media_ids",
                format!("Submission must contain 1-{n_photos} photos"),
            ));
        }
        for &id in &draft.media_ids {
            if !media_ids.insert(id) {
                return Err(AppError::field(
                    "media_ids",
                    "A photo can only be used in one submission",
                ));
            }
        }
    }
    let available = media_file::Entity::find()
        .filter(media_file::Column::Id.is_in(media_ids.iter().copied()))
        .filter(media_file::Column::UserId.eq(auth_user.user_id))
        .filter(media_file::Column::SubmissionId.is_null())
        .count(&state.db)
        .await?;
    if available != media_ids.len() as u64 {
        return Err(AppError::field(
            "media_ids",
            "Media file does not exist or is already used",
        ));
    }

    let txn = state.db.begin().await?;
    let mut submissions = Vec::with_capacity(drafts.len());
    for draft in &drafts {
        let model = submission::ActiveModel {
            title: Set(draft.title.trim().to_string()),
            description: Set(draft.description.clone()),
            author_id: Set(draft.author_id),
            theme_id: Set(draft.theme_id),
            user_id: Set(auth_user.user_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let linked = media_file::Entity::update_many()
            .col_expr(media_file::Column::SubmissionId, Expr::value(model.id))
            .filter(media_file::Column::Id.is_in(draft.media_ids.clone()))
            .filter(media_file::Column::SubmissionId.is_null())
            .exec(&txn)
            .await?;
        if linked.rows_affected != draft.media_ids.len() as u64 {
            // Dropping the transaction rolls it back.
            return Err(AppError::field(
                "media_ids",
                "Media file does not exist or is already used",
            ));
        }
        submissions.push(model);
    }

    let set = submission_set::ActiveModel {
        contest_id: Set(contest.id),
        author_id: Set(drafts[0].author_id),
        user_id: Set(submissions[0].user_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let members = submissions
        .iter()
        .map(|s| submission_set_member::ActiveModel {
            submission_set_id: Set(set.id),
            submission_id: Set(s.id),
        });
    submission_set_member::Entity::insert_many(members)
        .exec_without_returning(&txn)
        .await?;

    txn.commit().await?;
    info!(submission_set_id = set.id, contest_id = contest.id, "Submissions created");

    if let Some(notice) = contest.confirmation_notice.clone() {
        send_confirmation(state, auth_user.user_id, &contest.title, notice).await;
    }

    Ok(SubmissionBatch { set, submissions })
}

async fn send_confirmation(state: &AppState, user_id: i32, contest_title: &str, body_html: String) {
    let email = match user::Entity::find_by_id(user_id).one(&state.db).await {
        Ok(Some(u)) => u.email,
        Ok(None) => None,
        Err(e) => {
            warn!(user_id, error = %e, "Failed to load user for confirmation mail");
            None
        }
    };
    let Some(to) = email else {
        return;
    };

    let confirmation = Confirmation {
        to,
        contest_title: contest_title.to_string(),
        body_html,
    };
    if let Err(e) = state.notifier.send_confirmation(confirmation).await {
        warn!(user_id, error = %e, "Failed to send submission confirmation");
    }
}

/// Restriction on submissions visible to the caller. `None` means no
/// restriction.
///
/// A submission is visible to its owner, to judges of its contest, and to
/// everyone once its contest is published.
pub async fn visibility_condition<C: ConnectionTrait>(
    db: &C,
    auth_user: Option<&AuthUser>,
    now: DateTime<Utc>,
) -> Result<Option<Condition>, AppError> {
    if auth_user.is_some_and(|u| u.is_admin() || u.has_permission("submission:view_all")) {
        return Ok(None);
    }

    let mut contest_ids = published_contest_ids(db, now).await?;
    if let Some(u) = auth_user {
        contest_ids.extend(judged_contest_ids(db, u.user_id).await?);
    }
    let theme_ids = theme_ids_in(db, contest_ids).await?;

    let mut cond = Condition::any().add(submission::Column::ThemeId.is_in(theme_ids));
    if let Some(u) = auth_user {
        cond = cond.add(submission::Column::UserId.eq(u.user_id));
    }
    Ok(Some(cond))
}

/// Fetch a submission visible to the caller, 404 otherwise.
pub async fn find_visible_submission<C: ConnectionTrait>(
    db: &C,
    auth_user: Option<&AuthUser>,
    id: i32,
    now: DateTime<Utc>,
) -> Result<submission::Model, AppError> {
    let mut select = submission::Entity::find_by_id(id);
    if let Some(cond) = visibility_condition(db, auth_user, now).await? {
        select = select.filter(cond);
    }
    select
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))
}

pub async fn list_submissions<C: ConnectionTrait>(
    db: &C,
    auth_user: Option<&AuthUser>,
    query: &SubmissionListQuery,
    now: DateTime<Utc>,
) -> Result<Vec<submission::Model>, AppError> {
    let mut select = submission::Entity::find();
    if let Some(cond) = visibility_condition(db, auth_user, now).await? {
        select = select.filter(cond);
    }
    if let Some(theme_id) = query.theme {
        select = select.filter(submission::Column::ThemeId.eq(theme_id));
    }
    if let Some(contest_id) = query.contest {
        let theme_ids = theme_ids_in(db, vec![contest_id]).await?;
        select = select.filter(submission::Column::ThemeId.is_in(theme_ids));
    }
    Ok(select
        .order_by_asc(submission::Column::Id)
        .all(db)
        .await?)
}

/// Attach authors and media to submissions for the response.
pub async fn describe_submissions<C: ConnectionTrait>(
    db: &C,
    submissions: Vec<submission::Model>,
    show_email: bool,
) -> Result<Vec<SubmissionResponse>, AppError> {
    let author_ids: HashSet<i32> = submissions.iter().map(|s| s.author_id).collect();
    let authors: HashMap<i32, author::Model> = author::Entity::find()
        .filter(author::Column::Id.is_in(author_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let mut media = media_by_submission(db, submissions.iter().map(|s| s.id).collect()).await?;

    submissions
        .into_iter()
        .map(|s| {
            let author = authors
                .get(&s.author_id)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("submission {} has no author", s.id)))?;
            Ok(SubmissionResponse {
                media: media.remove(&s.id).unwrap_or_default(),
                author: AuthorResponse::new(author, show_email),
                id: s.id,
                user_id: s.user_id,
                theme_id: s.theme_id,
                title: s.title,
                description: s.description,
                created_at: s.created_at,
            })
        })
        .collect()
}

/// Media of each submission, ordered by upload.
pub async fn media_by_submission<C: ConnectionTrait>(
    db: &C,
    submission_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<MediaFileResponse>>, AppError> {
    let mut grouped: HashMap<i32, Vec<MediaFileResponse>> = HashMap::new();
    if submission_ids.is_empty() {
        return Ok(grouped);
    }
    let files = media_file::Entity::find()
        .filter(media_file::Column::SubmissionId.is_in(submission_ids))
        .order_by_asc(media_file::Column::Id)
        .all(db)
        .await?;
    for file in files {
        if let Some(submission_id) = file.submission_id {
            grouped.entry(submission_id).or_default().push(file.into());
        }
    }
    Ok(grouped)
}

/// Delete submission rows together with everything that hangs off them.
/// Returns the deleted media so their blobs can be removed after commit.
async fn delete_submission_rows<C: ConnectionTrait>(
    db: &C,
    ids: Vec<i32>,
) -> Result<Vec<media_file::Model>, DbErr> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    submission_set_member::Entity::delete_many()
        .filter(submission_set_member::Column::SubmissionId.is_in(ids.clone()))
        .exec(db)
        .await?;
    rating::Entity::delete_many()
        .filter(rating::Column::SubmissionId.is_in(ids.clone()))
        .exec(db)
        .await?;
    submission_reward::Entity::delete_many()
        .filter(submission_reward::Column::SubmissionId.is_in(ids.clone()))
        .exec(db)
        .await?;

    let media = media_file::Entity::find()
        .filter(media_file::Column::SubmissionId.is_in(ids.clone()))
        .all(db)
        .await?;
    delete_media_rows(db, media.iter().map(|m| m.id).collect()).await?;

    submission::Entity::delete_many()
        .filter(submission::Column::Id.is_in(ids))
        .exec(db)
        .await?;
    Ok(media)
}

/// Delete the caller's own submission before its contest is published.
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_submission(
    state: &AppState,
    auth_user: &AuthUser,
    id: i32,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let submission = find_visible_submission(&state.db, Some(auth_user), id, now).await?;
    if submission.user_id != auth_user.user_id {
        return Err(AppError::PermissionDenied(
            "You can only delete your own submissions.".into(),
        ));
    }

    let theme = theme::Entity::find_by_id(submission.theme_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal(format!("submission {id} has no theme")))?;
    let contest = theme_contest(&state.db, &theme).await?;
    if now > contest.publish_date {
        return Err(AppError::PermissionDenied(
            "You cannot delete already published submissions.".into(),
        ));
    }

    let txn = state.db.begin().await?;
    let media = delete_submission_rows(&txn, vec![submission.id]).await?;
    txn.commit().await?;

    remove_media_blobs(state.blob_store.as_ref(), &media).await;
    info!(submission_id = id, "Submission deleted");
    Ok(())
}

fn visible_sets(auth_user: &AuthUser) -> Select<submission_set::Entity> {
    let select = submission_set::Entity::find();
    if auth_user.is_admin() || auth_user.has_permission("submission:view_all") {
        select
    } else {
        select.filter(submission_set::Column::UserId.eq(auth_user.user_id))
    }
}

/// Fetch a submission set owned by the caller (any set for admins).
pub async fn find_submission_set<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<submission_set::Model, AppError> {
    visible_sets(auth_user)
        .filter(submission_set::Column::Id.eq(id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission set not found".into()))
}

pub async fn list_submission_sets<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
) -> Result<Vec<submission_set::Model>, AppError> {
    Ok(visible_sets(auth_user)
        .order_by_asc(submission_set::Column::Id)
        .all(db)
        .await?)
}

/// Delete a submission set with all its member submissions.
///
/// Owners lose this right once the contest is published; admins keep it.
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_submission_set(
    state: &AppState,
    auth_user: &AuthUser,
    id: i32,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let set = find_submission_set(&state.db, auth_user, id).await?;
    if !auth_user.is_admin() {
        let contest = find_contest(&state.db, set.contest_id).await?;
        if now > contest.publish_date {
            return Err(AppError::PermissionDenied(
                "You cannot delete already published submissions.".into(),
            ));
        }
    }

    let txn = state.db.begin().await?;
    let member_ids: Vec<i32> = submission_set_member::Entity::find()
        .filter(submission_set_member::Column::SubmissionSetId.eq(set.id))
        .select_only()
        .column(submission_set_member::Column::SubmissionId)
        .into_tuple()
        .all(&txn)
        .await?;
    let media = delete_submission_rows(&txn, member_ids).await?;

    payment::Entity::delete_many()
        .filter(payment::Column::SubmissionSetId.eq(set.id))
        .exec(&txn)
        .await?;
    submission_set::Entity::delete_by_id(set.id).exec(&txn).await?;
    txn.commit().await?;

    remove_media_blobs(state.blob_store.as_ref(), &media).await;
    info!(submission_set_id = id, "Submission set deleted");
    Ok(())
}

/// Attach author, member submissions and payment state to sets.
pub async fn describe_submission_sets<C: ConnectionTrait>(
    db: &C,
    sets: Vec<submission_set::Model>,
    show_email: bool,
) -> Result<Vec<SubmissionSetResponse>, AppError> {
    let set_ids: Vec<i32> = sets.iter().map(|s| s.id).collect();

    let members = submission_set_member::Entity::find()
        .filter(submission_set_member::Column::SubmissionSetId.is_in(set_ids.clone()))
        .all(db)
        .await?;
    let submissions = submission::Entity::find()
        .filter(submission::Column::Id.is_in(members.iter().map(|m| m.submission_id)))
        .order_by_asc(submission::Column::Id)
        .all(db)
        .await?;
    let mut by_id: HashMap<i32, SubmissionResponse> = describe_submissions(db, submissions, show_email)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut set_members: HashMap<i32, Vec<i32>> = HashMap::new();
    for m in &members {
        set_members
            .entry(m.submission_set_id)
            .or_default()
            .push(m.submission_id);
    }

    let paid: HashMap<i32, bool> = payment::Entity::find()
        .filter(payment::Column::SubmissionSetId.is_in(set_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.submission_set_id, p.paid))
        .collect();

    let author_ids: HashSet<i32> = sets.iter().map(|s| s.author_id).collect();
    let authors: HashMap<i32, author::Model> = author::Entity::find()
        .filter(author::Column::Id.is_in(author_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    sets.into_iter()
        .map(|set| {
            let author = authors
                .get(&set.author_id)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("set {} has no author", set.id)))?;
            let mut ids = set_members.remove(&set.id).unwrap_or_default();
            ids.sort_unstable();
            Ok(SubmissionSetResponse {
                submissions: ids.iter().filter_map(|id| by_id.remove(id)).collect(),
                paid: paid.get(&set.id).copied().unwrap_or(false),
                author: AuthorResponse::new(author, show_email),
                id: set.id,
                contest_id: set.contest_id,
                user_id: set.user_id,
                created_at: set.created_at,
            })
        })
        .collect()
}
