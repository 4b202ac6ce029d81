use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    pub description: String,
    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    /// Results become visible at this instant. Defaults to `end_date`.
    pub publish_date: DateTimeUtc,
    pub login_required: bool,
    /// HTML mailed to the submitter after a successful submission.
    pub confirmation_notice: Option<String>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub themes: HasMany<super::theme::Entity>,

    #[sea_orm(has_many)]
    pub judges: HasMany<super::judge::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Open for submissions: `start_date <= now <= end_date`.
    pub fn is_active(&self, now: DateTimeUtc) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Results are public once `publish_date` has passed.
    pub fn is_published(&self, now: DateTimeUtc) -> bool {
        self.publish_date <= now
    }
}

impl ActiveModelBehavior for ActiveModel {}
