use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{Gender, ListingStatus, ListingType, MessageAction};

// -- JWT Claims --

/// Bearer token claims. `jti` identifies the token so logout can revoke it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub jti: Uuid,
    pub exp: usize,
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Accounts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub phone: String,
    pub next: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub token: String,
    pub redirect_to: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub gender: Gender,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub profile: ProfileResponse,
}

// -- Listings --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub title: String,
    pub image: Option<String>,
    pub organization: String,
    pub country: String,
    pub city: String,
    pub deadline: Option<NaiveDate>,
    pub remote: bool,
    pub level: String,
    pub description: String,
    pub apply_url: String,
    pub source_url: String,
    pub tags: Vec<String>,
    pub is_verified: bool,
    pub is_featured: bool,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub featured: Vec<ListingResponse>,
    pub latest: Vec<ListingResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListingDetailResponse {
    pub listing: ListingResponse,
    pub saved: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleSaveResponse {
    pub saved: bool,
}

/// Staff payload for creating a listing.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingInput {
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub title: String,
    pub image: Option<String>,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub apply_url: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub status: ListingStatus,
}

/// Staff payload for a partial listing update. `null` clears nullable fields.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListingPatch {
    #[serde(rename = "type")]
    pub listing_type: Option<ListingType>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    pub organization: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub deadline: Option<Option<NaiveDate>>,
    pub remote: Option<bool>,
    pub level: Option<String>,
    pub description: Option<String>,
    pub apply_url: Option<String>,
    pub source_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_verified: Option<bool>,
    pub is_featured: Option<bool>,
    pub status: Option<ListingStatus>,
}

// -- Gallery --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImageResponse {
    pub id: i64,
    pub title: String,
    pub caption: String,
    pub image: String,
    pub is_published: bool,
    pub order: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GalleryItem {
    #[serde(flatten)]
    pub image: GalleryImageResponse,
    pub likes: i64,
    pub liked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GalleryResponse {
    pub images: Vec<GalleryItem>,
    pub total_likes: i64,
    pub total_views: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GalleryImageInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caption: String,
    pub image: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default)]
    pub order: i64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GalleryImagePatch {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub image: Option<String>,
    pub is_published: Option<bool>,
    pub order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishRequest {
    pub ids: Vec<i64>,
    pub published: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub updated: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MediaUploadResponse {
    pub path: String,
    pub url: String,
}

// -- Contact --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: i64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessageResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub replied: bool,
    pub replied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageActionRequest {
    pub ids: Vec<i64>,
    pub action: MessageAction,
}

// -- Dashboard --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenderStats {
    pub male: i64,
    pub female: i64,
    pub na: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    pub country: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewedListing {
    pub listing: ListingResponse,
    pub views: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub today: NaiveDate,
    pub soon: NaiveDate,

    pub total_listings: i64,
    pub jobs: i64,
    pub scholarships: i64,
    pub courses: i64,

    pub featured: i64,
    pub remote: i64,
    pub remote_pct: f64,

    pub closing_soon: i64,
    pub expired: i64,

    pub total_listing_views: i64,
    pub views_last_7_days: i64,
    pub views_by_day: Vec<DayCount>,

    pub site_visits_today: i64,
    pub site_visits_last_7_days: i64,

    pub gender: GenderStats,

    pub top_countries: Vec<CountryCount>,
    pub top_viewed_listings: Vec<ViewedListing>,
    pub latest_listings: Vec<ListingResponse>,

    pub gallery_images: i64,
    pub gallery_likes: i64,
    pub gallery_views: i64,
    pub contact_messages: i64,
    pub unread_messages: i64,
}
