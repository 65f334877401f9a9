use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/feedback", feedback_routes())
}

fn feedback_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::feedback::create_feedback,
            handlers::feedback::list_feedback
        ))
        .routes(routes!(
            handlers::feedback::get_feedback,
            handlers::feedback::update_feedback,
            handlers::feedback::delete_feedback
        ))
        .routes(routes!(handlers::asset::list_assets))
        .routes(routes!(
            handlers::asset::upload_asset,
            handlers::asset::download_asset,
            handlers::asset::delete_asset
        ))
}
