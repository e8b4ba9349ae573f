//! Content data: tracks, playlists, search hits and the main content view

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A playable item.
///
/// `source_id` is the stable key shared by the playlist and catalog views;
/// local ids differ between them.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "spotify_uid")]
    pub source_id: String,
    pub name: String,
    pub author: String,
    #[serde(default)]
    pub link: Option<String>,
}

impl Track {
    /// Same logical track, compared by source id (local id only when neither has one)
    pub fn same_as(&self, other: &Track) -> bool {
        if self.source_id.is_empty() && other.source_id.is_empty() {
            return self.id == other.id;
        }
        self.source_id == other.source_id
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn toggled(self) -> Self {
        match self {
            Visibility::Private => Visibility::Public,
            Visibility::Public => Visibility::Private,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Private => write!(f, "private"),
            Visibility::Public => write!(f, "public"),
        }
    }
}

/// Playlist without its tracks (sidebar entry and playback context)
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PlaylistSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub owner_id: i64,
    #[serde(default)]
    pub publicity: Visibility,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub modified_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub track_count: u32,
}

/// Playlist with its ordered tracks (order is playback order)
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub summary: PlaylistSummary,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Search result row as returned by `GET /search`
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub track: String,
    pub artist: String,
}

impl SearchHit {
    pub fn to_track(&self) -> Track {
        Track {
            id: 0,
            source_id: self.id.clone(),
            name: self.track.clone(),
            author: self.artist.clone(),
            link: None,
        }
    }
}

/// Row of the service's track catalog (`GET /tracks`)
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CatalogTrack {
    #[serde(flatten)]
    pub track: Track,
    #[serde(default)]
    pub host: Option<String>,
    /// A working link has been found
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub fails: u32,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl CatalogTrack {
    /// Tracks that failed more than this without ever resolving are not offered for playback
    pub const MAX_FAILS: u32 = 3;

    pub fn is_playable(&self) -> bool {
        self.result || self.fails <= Self::MAX_FAILS
    }

    /// The track to hand to the player. A link is only trusted once resolved.
    pub fn to_track(&self) -> Track {
        let mut track = self.track.clone();
        if !self.result {
            track.link = None;
        }
        track
    }
}

/// What the main content area shows
#[derive(Clone, Debug, Default)]
pub enum ContentView {
    #[default]
    Empty,
    PlaylistDetail {
        detail: PlaylistDetail,
        selected_index: usize,
        /// Current user owns it and may edit it
        editable: bool,
    },
    SearchResults {
        query: String,
        results: Vec<SearchHit>,
        selected_index: usize,
    },
    Catalog {
        tracks: Vec<CatalogTrack>,
        selected_index: usize,
    },
}

#[derive(Clone, Debug, Default)]
pub struct ContentState {
    pub view: ContentView,
    pub is_loading: bool,
    /// Playlist that search hits get added to
    pub target_playlist: Option<PlaylistSummary>,
}
