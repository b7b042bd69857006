//! Database row types. These map directly to SQLite rows and convert into the
//! API response types at the edge.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use scholarify_types::api::{
    ContactMessageResponse, GalleryImageResponse, ListingResponse, ProfileResponse,
};
use scholarify_types::models::{Gender, ListingStatus, ListingType, split_tags};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

pub struct ProfileRow {
    pub user_id: String,
    pub gender: Gender,
    pub phone: String,
}

impl From<ProfileRow> for ProfileResponse {
    fn from(row: ProfileRow) -> Self {
        Self {
            gender: row.gender,
            phone: row.phone,
        }
    }
}

/// Fields needed to create an account; the password is already hashed.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub gender: Gender,
    pub phone: &'a str,
}

#[derive(Debug, Clone)]
pub struct ListingRow {
    pub id: i64,
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
    pub tags: String,
    pub is_verified: bool,
    pub is_featured: bool,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ListingRow> for ListingResponse {
    fn from(row: ListingRow) -> Self {
        Self {
            id: row.id,
            listing_type: row.listing_type,
            title: row.title,
            image: row.image,
            organization: row.organization,
            country: row.country,
            city: row.city,
            deadline: row.deadline,
            remote: row.remote,
            level: row.level,
            description: row.description,
            apply_url: row.apply_url,
            source_url: row.source_url,
            tags: split_tags(&row.tags),
            is_verified: row.is_verified,
            is_featured: row.is_featured,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Every writable listing column. Status is the requested one; the stored
/// status is derived from it on save.
#[derive(Debug, Clone)]
pub struct ListingFields {
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
    pub tags: String,
    pub is_verified: bool,
    pub is_featured: bool,
    pub status: ListingStatus,
}

impl From<ListingRow> for ListingFields {
    fn from(row: ListingRow) -> Self {
        Self {
            listing_type: row.listing_type,
            title: row.title,
            image: row.image,
            organization: row.organization,
            country: row.country,
            city: row.city,
            deadline: row.deadline,
            remote: row.remote,
            level: row.level,
            description: row.description,
            apply_url: row.apply_url,
            source_url: row.source_url,
            tags: row.tags,
            is_verified: row.is_verified,
            is_featured: row.is_featured,
            status: row.status,
        }
    }
}

/// Columns a listing `query` is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    /// Title, organization, country, city and tags.
    #[default]
    Site,
    /// Title, organization, country and tags.
    Admin,
}

/// Query options for listing searches. `None`/`false` means "no filter".
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub query: Option<String>,
    pub scope: SearchScope,
    pub listing_type: Option<String>,
    pub status: Option<ListingStatus>,
    /// Exact country, case-insensitive.
    pub country: Option<String>,
    pub remote: Option<bool>,
    pub featured: Option<bool>,
    pub verified: Option<bool>,
    /// Only listings whose deadline is today or later, soonest first.
    pub deadline_soon: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Staff inbox filter. `query` matches name, email, subject and message.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub query: Option<String>,
    pub is_read: Option<bool>,
    pub replied: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct GalleryImageRow {
    pub id: i64,
    pub title: String,
    pub caption: String,
    pub image: String,
    pub is_published: bool,
    pub sort_order: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

impl From<GalleryImageRow> for GalleryImageResponse {
    fn from(row: GalleryImageRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            caption: row.caption,
            image: row.image,
            is_published: row.is_published,
            order: row.sort_order,
            views: row.views,
            created_at: row.created_at,
        }
    }
}

/// Published image together with its like count and whether the current
/// visitor liked it.
pub struct GalleryEntry {
    pub image: GalleryImageRow,
    pub likes: i64,
    pub liked: bool,
}

#[derive(Debug, Clone)]
pub struct GalleryImageFields {
    pub title: String,
    pub caption: String,
    pub image: String,
    pub is_published: bool,
    pub sort_order: i64,
}

/// Who a gallery like belongs to.
#[derive(Debug, Clone, Copy)]
pub enum LikeOwner<'a> {
    User(&'a str),
    Session(&'a str),
}

#[derive(Debug, Clone)]
pub struct ContactMessageRow {
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

impl From<ContactMessageRow> for ContactMessageResponse {
    fn from(row: ContactMessageRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            subject: row.subject,
            message: row.message,
            created_at: row.created_at,
            is_read: row.is_read,
            replied: row.replied,
            replied_at: row.replied_at,
        }
    }
}

// -- Row mapping --

/// Reads a text column holding an enum code.
pub(crate) fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) const LISTING_COLUMNS: &str = "l.id, l.type, l.title, l.image, l.organization, \
     l.country, l.city, l.deadline, l.remote, l.level, l.description, l.apply_url, \
     l.source_url, l.tags, l.is_verified, l.is_featured, l.status, l.created_at, l.updated_at";

pub(crate) fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        listing_type: parse_col(row, 1)?,
        title: row.get(2)?,
        image: row.get(3)?,
        organization: row.get(4)?,
        country: row.get(5)?,
        city: row.get(6)?,
        deadline: row.get(7)?,
        remote: row.get(8)?,
        level: row.get(9)?,
        description: row.get(10)?,
        apply_url: row.get(11)?,
        source_url: row.get(12)?,
        tags: row.get(13)?,
        is_verified: row.get(14)?,
        is_featured: row.get(15)?,
        status: parse_col(row, 16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

pub(crate) const GALLERY_COLUMNS: &str =
    "g.id, g.title, g.caption, g.image, g.is_published, g.sort_order, g.views, g.created_at";

pub(crate) fn gallery_image_from_row(row: &Row<'_>) -> rusqlite::Result<GalleryImageRow> {
    Ok(GalleryImageRow {
        id: row.get(0)?,
        title: row.get(1)?,
        caption: row.get(2)?,
        image: row.get(3)?,
        is_published: row.get(4)?,
        sort_order: row.get(5)?,
        views: row.get(6)?,
        created_at: row.get(7)?,
    })
}
