use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, OnConflict, PostgresQueryBuilder,
    SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::info;

use crate::config::AuthConfig;
use crate::entity::role::{ADMIN_ROLE, DEFAULT_ROLE};
use crate::entity::{judge, rating, role, role_permission, submission, user};
use crate::utils::hash;

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &[ADMIN_ROLE, DEFAULT_ROLE];

/// Default role-permission mappings seeded on startup.
///
/// Regular users hold no permissions: everything they may do is decided by
/// ownership or judge assignment.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    (ADMIN_ROLE, "contest:manage"),
    (ADMIN_ROLE, "judge:manage"),
    (ADMIN_ROLE, "payment:manage"),
    (ADMIN_ROLE, "results:manage"),
    (ADMIN_ROLE, "submission:view_all"),
    (ADMIN_ROLE, "author:view_all"),
    (ADMIN_ROLE, "media:view_all"),
    (ADMIN_ROLE, "backup:trigger"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => roles_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => perms_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Create the configured admin account if it does not exist yet.
pub async fn seed_admin(db: &DatabaseConnection, auth: &AuthConfig) -> Result<(), DbErr> {
    let (Some(username), Some(password)) = (&auth.admin_username, &auth.admin_password) else {
        return Ok(());
    };

    let exists = user::Entity::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    let hash = hash::hash_password(password)
        .map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;

    user::ActiveModel {
        username: Set(username.clone()),
        password: Set(hash),
        email: Set(None),
        role: Set(ADMIN_ROLE.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(username = %username, "Seeded admin account");
    Ok(())
}

fn build_index(db: &DatabaseConnection, stmt: &IndexCreateStatement) -> String {
    match db.get_database_backend() {
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        DbBackend::MySql => stmt.to_string(MysqlQueryBuilder),
        _ => stmt.to_string(PostgresQueryBuilder),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite indexes, so they are
/// created manually on startup. The unique ones back the upserts on ratings
/// and judge assignments and must exist before those run.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let unique_indexes = [
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_rating_judge_submission")
            .table(rating::Entity)
            .col(rating::Column::JudgeId)
            .col(rating::Column::SubmissionId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .unique()
            .name("idx_judge_contest_user")
            .table(judge::Entity)
            .col(judge::Column::ContestId)
            .col(judge::Column::UserId)
            .to_owned(),
    ];

    for index in &unique_indexes {
        db.execute_unprepared(&build_index(db, index)).await?;
    }
    info!("Ensured unique indexes on rating and judge exist");

    // Listing a user's submissions per theme.
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_submission_theme_user")
        .table(submission::Entity)
        .col(submission::Column::ThemeId)
        .col(submission::Column::UserId)
        .to_owned();

    match db.execute_unprepared(&build_index(db, &stmt)).await {
        Ok(_) => info!("Ensured index idx_submission_theme_user exists"),
        Err(e) => tracing::warn!("Failed to create index idx_submission_theme_user: {}", e),
    }

    Ok(())
}
