use crate::library::{list_directory, MediaEntry};
use crate::server::error::ApiError;
use crate::server::AppContext;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

pub fn library_routes() -> Router<AppContext> {
    Router::new().route("/browse", get(browse))
}

#[derive(Debug, Default, Deserialize)]
struct BrowseQuery {
    #[serde(default)]
    path: String,
}

/// List one directory of the media root. Native-container files are probed
/// on every call.
async fn browse(
    State(ctx): State<AppContext>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<Vec<MediaEntry>>, ApiError> {
    let entries = list_directory(&ctx.sandbox, &query.path, ctx.prober.as_ref()).await?;
    tracing::debug!(path = %query.path, count = entries.len(), "Listed directory");
    Ok(Json(entries))
}
