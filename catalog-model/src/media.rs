use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::ModelError;
use crate::ids::{FileId, MediaItemId, MediaTypeId};

/// Media entity categories seeded into the `media_types` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MediaKind {
    Movie,
    TvShow,
    TvSeason,
    TvEpisode,
    MusicAlbum,
    Book,
    Comic,
    Software,
    Game,
}

impl MediaKind {
    pub const ALL: [MediaKind; 9] = [
        MediaKind::Movie,
        MediaKind::TvShow,
        MediaKind::TvSeason,
        MediaKind::TvEpisode,
        MediaKind::MusicAlbum,
        MediaKind::Book,
        MediaKind::Comic,
        MediaKind::Software,
        MediaKind::Game,
    ];

    /// Name stored in `media_types.name`.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::TvShow => "tv_show",
            MediaKind::TvSeason => "tv_season",
            MediaKind::TvEpisode => "tv_episode",
            MediaKind::MusicAlbum => "music_album",
            MediaKind::Book => "book",
            MediaKind::Comic => "comic",
            MediaKind::Software => "software",
            MediaKind::Game => "game",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownVariant {
                kind: "media type",
                value: s.to_string(),
            })
    }
}

/// Status assigned to entities created by directory classification.
pub const DETECTED_STATUS: &str = "detected";

/// A derived media entity. Shows own seasons, seasons own episodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaItem {
    pub id: MediaItemId,
    pub media_type_id: MediaTypeId,
    pub title: String,
    pub year: Option<i32>,
    pub parent_id: Option<MediaItemId>,
    pub season_number: Option<i32>,
    pub episode_number: Option<i32>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMediaItem {
    pub media_type_id: MediaTypeId,
    pub title: String,
    pub year: Option<i32>,
    pub parent_id: Option<MediaItemId>,
    pub season_number: Option<i32>,
    pub episode_number: Option<i32>,
    pub status: String,
}

impl NewMediaItem {
    pub fn detected(media_type_id: MediaTypeId, title: impl Into<String>) -> Self {
        Self {
            media_type_id,
            title: title.into(),
            year: None,
            parent_id: None,
            season_number: None,
            episode_number: None,
            status: DETECTED_STATUS.to_string(),
        }
    }
}

/// Link between a media entity and one of the files backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaFileLink {
    pub media_item_id: MediaItemId,
    pub file_id: FileId,
    pub is_primary: bool,
}

/// Outcome of classifying one top-level directory, keyed by its path.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectoryAnalysis {
    pub id: i64,
    pub directory_path: String,
    pub media_item_id: Option<MediaItemId>,
    pub confidence_score: f64,
    pub detection_method: String,
    pub files_count: i32,
    pub total_size: i64,
}
