//! Staff management of listings, gallery images and contact messages.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::info;

use scholarify_db::models::{
    GalleryImageFields, ListingFields, ListingFilter, MessageFilter, SearchScope,
};
use scholarify_types::api::{
    ContactMessageResponse, GalleryImageInput, GalleryImagePatch, GalleryImageResponse,
    ListingInput, ListingPatch, ListingResponse, MessageActionRequest, PublishRequest,
    UpdatedResponse,
};
use scholarify_types::models::{ListingStatus, ListingType, join_tags};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::validate;
use crate::{run_db, today};

const TITLE_MAX: usize = 255;
const TAGS_MAX: usize = 255;
const GALLERY_TITLE_MAX: usize = 200;

// -- Listings --

#[derive(Debug, Default, Deserialize)]
pub struct AdminListingQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub status: Option<String>,
    pub country: Option<String>,
    pub remote: Option<String>,
    pub is_featured: Option<String>,
    pub is_verified: Option<String>,
}

/// Yes/no query flag. Absent or empty means "any".
fn parse_flag(name: &str, value: Option<&str>) -> Result<Option<bool>, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some("1" | "true" | "yes") => Ok(Some(true)),
        Some("0" | "false" | "no") => Ok(Some(false)),
        Some(other) => Err(ApiError::bad_request(format!(
            "{} must be true or false, got '{}'",
            name, other
        ))),
    }
}

fn check_listing_text(title: &str, tags: &str) -> Result<(), ApiError> {
    validate::required("Title", title)?;
    validate::max_len("Title", title, TITLE_MAX)?;
    validate::max_len("Tags", tags, TAGS_MAX)?;
    Ok(())
}

/// Every listing regardless of status, newest first.
pub async fn list_listings(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<AdminListingQuery>, ApiError>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let listing_type = match query.listing_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(t) => Some(
            t.parse::<ListingType>()
                .map_err(|e| ApiError::bad_request(e.to_string()))?
                .as_str()
                .to_string(),
        ),
    };
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(
            s.parse::<ListingStatus>()
                .map_err(|e| ApiError::bad_request(e.to_string()))?,
        ),
    };

    let filter = ListingFilter {
        query: query.q.map(|q| q.trim().to_string()),
        scope: SearchScope::Admin,
        listing_type,
        status,
        country: query.country.map(|c| c.trim().to_string()),
        remote: parse_flag("remote", query.remote.as_deref())?,
        featured: parse_flag("is_featured", query.is_featured.as_deref())?,
        verified: parse_flag("is_verified", query.is_verified.as_deref())?,
        ..Default::default()
    };
    let date = today();
    let rows = run_db(&state, move |db| db.search_listings(&filter, date)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn create_listing(
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<ListingInput>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = ListingFields {
        listing_type: input.listing_type,
        title: input.title.trim().to_string(),
        image: input.image.filter(|i| !i.is_empty()),
        organization: input.organization,
        country: input.country,
        city: input.city,
        deadline: input.deadline,
        remote: input.remote,
        level: input.level,
        description: input.description,
        apply_url: input.apply_url,
        source_url: input.source_url,
        tags: join_tags(&input.tags),
        is_verified: input.is_verified,
        is_featured: input.is_featured,
        status: input.status,
    };
    check_listing_text(&fields.title, &fields.tags)?;

    let date = today();
    let row = run_db(&state, move |db| db.insert_listing(&fields, date)).await?;
    info!("Listing {} created with status {}", row.id, row.status.as_str());
    Ok((StatusCode::CREATED, Json(ListingResponse::from(row))))
}

pub async fn update_listing(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(patch), _): WithRejection<Json<ListingPatch>, ApiError>,
) -> Result<Json<ListingResponse>, ApiError> {
    let title = patch.title.map(|t| t.trim().to_string());
    let tags = patch.tags.as_deref().map(join_tags);
    if let Some(title) = &title {
        check_listing_text(title, tags.as_deref().unwrap_or(""))?;
    } else if let Some(tags) = &tags {
        validate::max_len("Tags", tags, TAGS_MAX)?;
    }

    let date = today();
    let row = run_db(&state, move |db| {
        db.update_listing(id, date, |f| {
            if let Some(v) = patch.listing_type {
                f.listing_type = v;
            }
            if let Some(v) = title {
                f.title = v;
            }
            if let Some(v) = patch.image {
                f.image = v.filter(|i| !i.is_empty());
            }
            if let Some(v) = patch.organization {
                f.organization = v;
            }
            if let Some(v) = patch.country {
                f.country = v;
            }
            if let Some(v) = patch.city {
                f.city = v;
            }
            if let Some(v) = patch.deadline {
                f.deadline = v;
            }
            if let Some(v) = patch.remote {
                f.remote = v;
            }
            if let Some(v) = patch.level {
                f.level = v;
            }
            if let Some(v) = patch.description {
                f.description = v;
            }
            if let Some(v) = patch.apply_url {
                f.apply_url = v;
            }
            if let Some(v) = patch.source_url {
                f.source_url = v;
            }
            if let Some(v) = tags {
                f.tags = v;
            }
            if let Some(v) = patch.is_verified {
                f.is_verified = v;
            }
            if let Some(v) = patch.is_featured {
                f.is_featured = v;
            }
            if let Some(v) = patch.status {
                f.status = v;
            }
        })
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    info!("Listing {} updated, status {}", row.id, row.status.as_str());
    Ok(Json(row.into()))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !run_db(&state, move |db| db.delete_listing(id)).await? {
        return Err(ApiError::NotFound);
    }
    info!("Listing {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

// -- Gallery --

#[derive(Debug, Default, Deserialize)]
pub struct AdminGalleryQuery {
    pub q: Option<String>,
}

pub async fn list_gallery(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<AdminGalleryQuery>, ApiError>,
) -> Result<Json<Vec<GalleryImageResponse>>, ApiError> {
    let rows = run_db(&state, move |db| db.list_gallery_images(query.q.as_deref())).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

fn check_gallery_fields(fields: &GalleryImageFields) -> Result<(), ApiError> {
    validate::required("Image", &fields.image)?;
    validate::max_len("Title", &fields.title, GALLERY_TITLE_MAX)?;
    if fields.sort_order < 0 {
        return Err(ApiError::bad_request("Order cannot be negative"));
    }
    Ok(())
}

pub async fn create_gallery_image(
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<GalleryImageInput>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = GalleryImageFields {
        title: input.title.trim().to_string(),
        caption: input.caption,
        image: input.image.trim().to_string(),
        is_published: input.is_published,
        sort_order: input.order,
    };
    check_gallery_fields(&fields)?;

    let row = run_db(&state, move |db| db.insert_gallery_image(&fields)).await?;
    info!("Gallery image {} created", row.id);
    Ok((StatusCode::CREATED, Json(GalleryImageResponse::from(row))))
}

pub async fn update_gallery_image(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(patch), _): WithRejection<Json<GalleryImagePatch>, ApiError>,
) -> Result<Json<GalleryImageResponse>, ApiError> {
    let title = patch.title.map(|t| t.trim().to_string());
    let image = patch.image.map(|i| i.trim().to_string());
    if let Some(title) = &title {
        validate::max_len("Title", title, GALLERY_TITLE_MAX)?;
    }
    if let Some(image) = &image {
        validate::required("Image", image)?;
    }
    if patch.order.is_some_and(|o| o < 0) {
        return Err(ApiError::bad_request("Order cannot be negative"));
    }

    let row = run_db(&state, move |db| {
        db.update_gallery_image(id, |f| {
            if let Some(v) = title {
                f.title = v;
            }
            if let Some(v) = patch.caption {
                f.caption = v;
            }
            if let Some(v) = image {
                f.image = v;
            }
            if let Some(v) = patch.is_published {
                f.is_published = v;
            }
            if let Some(v) = patch.order {
                f.sort_order = v;
            }
        })
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    info!("Gallery image {} updated", row.id);
    Ok(Json(row.into()))
}

pub async fn delete_gallery_image(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if !run_db(&state, move |db| db.delete_gallery_image(id)).await? {
        return Err(ApiError::NotFound);
    }
    info!("Gallery image {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_gallery(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<PublishRequest>, ApiError>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let updated =
        run_db(&state, move |db| db.set_gallery_published(&req.ids, req.published)).await?;
    Ok(Json(UpdatedResponse { updated }))
}

// -- Contact messages --

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub q: Option<String>,
    pub unread: Option<String>,
    pub replied: Option<String>,
}

/// Newest first. `q` searches name, email, subject and body; `unread` and
/// `replied` narrow by state.
pub async fn list_messages(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<MessageQuery>, ApiError>,
) -> Result<Json<Vec<ContactMessageResponse>>, ApiError> {
    let filter = MessageFilter {
        query: query.q,
        is_read: parse_flag("unread", query.unread.as_deref())?.map(|unread| !unread),
        replied: parse_flag("replied", query.replied.as_deref())?,
    };
    let rows = run_db(&state, move |db| db.list_contact_messages(&filter)).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Returns the message and marks it read.
pub async fn open_message(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<ContactMessageResponse>, ApiError> {
    let row = run_db(&state, move |db| db.open_contact_message(id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(row.into()))
}

pub async fn message_actions(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<MessageActionRequest>, ApiError>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let action = req.action;
    let updated = run_db(&state, move |db| db.apply_message_action(&req.ids, action)).await?;
    info!("Applied {:?} to {} contact messages", action, updated);
    Ok(Json(UpdatedResponse { updated }))
}
