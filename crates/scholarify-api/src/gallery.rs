use axum::{
    Extension, Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;

use scholarify_db::models::LikeOwner;
use scholarify_types::api::{GalleryImageResponse, GalleryItem, GalleryResponse, LikeResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::{CurrentUser, SessionKey};
use crate::run_db;

/// Who is liking: the signed-in user, else the anonymous session.
enum Visitor {
    User(String),
    Session(String),
}

impl Visitor {
    fn new(current: CurrentUser, session: SessionKey) -> Self {
        match current.0 {
            Some(claims) => Self::User(claims.sub.to_string()),
            None => Self::Session(session.0),
        }
    }

    fn owner(&self) -> LikeOwner<'_> {
        match self {
            Self::User(id) => LikeOwner::User(id),
            Self::Session(key) => LikeOwner::Session(key),
        }
    }
}

pub async fn gallery_index(
    State(state): State<AppState>,
    current: CurrentUser,
    Extension(session): Extension<SessionKey>,
) -> Result<Json<GalleryResponse>, ApiError> {
    let visitor = Visitor::new(current, session);
    let entries = run_db(&state, move |db| db.published_gallery(visitor.owner())).await?;

    let total_likes = entries.iter().map(|e| e.likes).sum();
    let total_views = entries.iter().map(|e| e.image.views).sum();
    let images = entries
        .into_iter()
        .map(|e| GalleryItem {
            image: e.image.into(),
            likes: e.likes,
            liked: e.liked,
        })
        .collect();

    Ok(Json(GalleryResponse {
        images,
        total_likes,
        total_views,
    }))
}

/// Opening an image counts as one view.
pub async fn gallery_detail(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<GalleryImageResponse>, ApiError> {
    let image = run_db(&state, move |db| db.increment_gallery_views(id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(image.into()))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    current: CurrentUser,
    Extension(session): Extension<SessionKey>,
) -> Result<Json<LikeResponse>, ApiError> {
    let visitor = Visitor::new(current, session);
    let (liked, likes) = run_db(&state, move |db| db.toggle_gallery_like(id, visitor.owner()))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(LikeResponse { liked, likes }))
}
