use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Returned when a stored or submitted enum code is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

// -- Listings --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingType {
    Job,
    Scholarship,
    Course,
}

impl ListingType {
    pub const ALL: [ListingType; 3] = [Self::Job, Self::Scholarship, Self::Course];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Job => "JOB",
            Self::Scholarship => "SCHOLARSHIP",
            Self::Course => "COURSE",
        }
    }
}

impl FromStr for ListingType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JOB" => Ok(Self::Job),
            "SCHOLARSHIP" => Ok(Self::Scholarship),
            "COURSE" => Ok(Self::Course),
            other => Err(UnknownVariant { kind: "listing type", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    #[default]
    Draft,
    Active,
    Expired,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
        }
    }

    /// Status a listing is stored with when saved on `today`.
    ///
    /// A passed deadline always expires the listing. A listing that was
    /// expired comes back as active once its deadline moves into the future.
    /// Without a deadline the requested status is kept as-is.
    pub fn on_save(self, deadline: Option<NaiveDate>, today: NaiveDate) -> Self {
        match deadline {
            Some(d) if d < today => Self::Expired,
            Some(_) if self == Self::Expired => Self::Active,
            _ => self,
        }
    }
}

impl FromStr for ListingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(UnknownVariant { kind: "listing status", value: other.to_string() }),
        }
    }
}

/// Splits the free-text tag column into trimmed, non-empty tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of [`split_tags`] for storage.
pub fn join_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

// -- Profiles --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[default]
    #[serde(rename = "N")]
    PreferNotToSay,
}

impl Gender {
    pub fn code(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::PreferNotToSay => "N",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Self::Male),
            "F" => Ok(Self::Female),
            "N" | "" => Ok(Self::PreferNotToSay),
            other => Err(UnknownVariant { kind: "gender", value: other.to_string() }),
        }
    }
}

// -- Contact messages --

/// Bulk actions staff can apply to contact messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageAction {
    MarkRead,
    MarkUnread,
    MarkReplied,
    MarkNotReplied,
}
