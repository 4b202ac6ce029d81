pub mod backup;
pub mod config;
pub mod consumers;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod utils;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rolca API",
        version = "1.0.0",
        description = "API for the Rolca photography salon platform"
    ),
    tags(
        (name = "Auth", description = "Authentication and user management"),
        (name = "Contests", description = "Contest CRUD operations"),
        (name = "Themes", description = "Contest themes and their acceptance thresholds"),
        (name = "Judges", description = "Assigning judges to contests"),
        (name = "Authors", description = "Photographers entered by users"),
        (name = "Media", description = "Photo upload and download"),
        (name = "Submissions", description = "Submitting photos to themes"),
        (name = "Submission Sets", description = "Submissions grouped per entry"),
        (name = "Payments", description = "Entry fee bookkeeping"),
        (name = "Ratings", description = "Judge scores"),
        (name = "Judging", description = "Views for assigned judges"),
        (name = "Rewards", description = "Awards for submissions and authors"),
        (name = "Results", description = "Published contest results"),
        (name = "Backup", description = "Off-site media backup"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes(&state.config))
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
