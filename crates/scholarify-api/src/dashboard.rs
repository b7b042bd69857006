use axum::{Json, extract::State};

use scholarify_types::api::DashboardResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{run_db, today};

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let date = today();
    let stats = run_db(&state, move |db| db.dashboard(date)).await?;
    Ok(Json(stats))
}
