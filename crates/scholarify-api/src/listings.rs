use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use scholarify_db::models::ListingFilter;
use scholarify_types::api::{
    Claims, HomeResponse, ListingDetailResponse, ListingResponse, ToggleSaveResponse,
};
use scholarify_types::models::ListingStatus;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::{CurrentUser, SessionKey};
use crate::{run_db, today};

const HOME_FEATURED: u32 = 6;
const HOME_LATEST: u32 = 9;
const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

/// Values of `remote` that turn the remote-only filter on.
const TRUTHY: &[&str] = &["1", "true", "True", "yes", "YES"];

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub remote: Option<String>,
    pub deadline: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListingQuery {
    fn into_filter(self) -> ListingFilter {
        let limit = self
            .limit
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        let offset = self
            .offset
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);

        ListingFilter {
            query: self.q.map(|q| q.trim().to_string()),
            listing_type: self.listing_type.map(|t| t.trim().to_string()),
            status: Some(ListingStatus::Active),
            remote: self
                .remote
                .as_deref()
                .is_some_and(|r| TRUTHY.contains(&r))
                .then_some(true),
            deadline_soon: self.deadline.as_deref() == Some("soon"),
            limit: Some(limit),
            offset,
            ..Default::default()
        }
    }
}

/// Featured and latest active listings for the landing page.
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, ApiError> {
    let date = today();
    let (featured, latest) = run_db(&state, move |db| {
        let featured = db.search_listings(
            &ListingFilter {
                status: Some(ListingStatus::Active),
                featured: Some(true),
                limit: Some(HOME_FEATURED),
                ..Default::default()
            },
            date,
        )?;
        let latest = db.search_listings(
            &ListingFilter {
                status: Some(ListingStatus::Active),
                limit: Some(HOME_LATEST),
                ..Default::default()
            },
            date,
        )?;
        Ok((featured, latest))
    })
    .await?;

    Ok(Json(HomeResponse {
        featured: featured.into_iter().map(Into::into).collect(),
        latest: latest.into_iter().map(Into::into).collect(),
    }))
}

pub async fn list_listings(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListingQuery>, ApiError>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let filter = query.into_filter();
    let date = today();
    let rows = run_db(&state, move |db| db.search_listings(&filter, date)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Shows an active listing and counts one view per session per day.
pub async fn listing_detail(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    CurrentUser(current): CurrentUser,
    Extension(SessionKey(session)): Extension<SessionKey>,
) -> Result<Json<ListingDetailResponse>, ApiError> {
    let user_id = current.map(|c| c.sub.to_string());
    let date = today();

    let (listing, saved) = run_db(&state, move |db| {
        let Some(listing) = db.get_active_listing(id)? else {
            return Ok(None);
        };
        db.record_listing_view(id, &session, date)?;
        let saved = match &user_id {
            Some(uid) => db.is_listing_saved(uid, id)?,
            None => false,
        };
        Ok(Some((listing, saved)))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(ListingDetailResponse {
        listing: listing.into(),
        saved,
    }))
}

/// Bookmarks or un-bookmarks a listing for the caller.
pub async fn toggle_save(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ToggleSaveResponse>, ApiError> {
    let user_id = claims.sub.to_string();
    let saved = run_db(&state, move |db| db.toggle_saved_listing(&user_id, id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ToggleSaveResponse { saved }))
}
