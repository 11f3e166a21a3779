//! Music insights: top content and new-artist discoveries.

use super::window::Window;
use crate::db::Database;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Most played artist in a window.
///
/// Ties on play count break by most recent play, then artist name; the
/// ordering is encoded in the query, not left to iteration order.
#[derive(Debug, Clone, Serialize)]
pub struct TopArtistInsight {
    pub name: String,
    pub play_count: i64,
    pub last_played_at: DateTime<Utc>,
}

/// Most played track (title + artist identity) in a window.
#[derive(Debug, Clone, Serialize)]
pub struct TopTrackInsight {
    pub title: String,
    pub artist: String,
    pub play_count: i64,
}

/// Most played album (album + artist identity) in a window.
#[derive(Debug, Clone, Serialize)]
pub struct TopAlbumInsight {
    pub album: String,
    pub artist: String,
    pub play_count: i64,
}

pub fn top_artist(db: &Database, user_id: i64, window: &Window) -> Result<Option<TopArtistInsight>> {
    let top = db.top_artist(user_id, window.start, window.end)?;
    Ok(top.map(|t| TopArtistInsight {
        name: t.artist,
        play_count: t.play_count,
        last_played_at: t.last_played_at,
    }))
}

pub fn top_track(db: &Database, user_id: i64, window: &Window) -> Result<Option<TopTrackInsight>> {
    let top = db.top_track(user_id, window.start, window.end)?;
    Ok(top.map(|t| TopTrackInsight {
        title: t.title,
        artist: t.artist,
        play_count: t.play_count,
    }))
}

pub fn top_album(db: &Database, user_id: i64, window: &Window) -> Result<Option<TopAlbumInsight>> {
    let top = db.top_album(user_id, window.start, window.end)?;
    Ok(top.map(|t| TopAlbumInsight {
        album: t.album,
        artist: t.artist,
        play_count: t.play_count,
    }))
}

/// Artists first heard during the window.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewDiscoveries {
    pub new_artists_count: i64,
    /// Change vs the preceding window's discovery count; `None` when that
    /// window discovered nothing (no meaningful baseline)
    pub change_percentage: Option<f64>,
}

fn new_artists_in(db: &Database, user_id: i64, window: &Window) -> Result<i64> {
    // Set difference against all prior history, not incremental tracking:
    // an artist heard before the window start is never "new".
    let in_window: HashSet<String> = db
        .artists_in_window(user_id, window.start, window.end)?
        .into_iter()
        .collect();
    let before: HashSet<String> = db
        .artists_before(user_id, window.start)?
        .into_iter()
        .collect();

    Ok(in_window.difference(&before).count() as i64)
}

/// Count artists that appear in the window but never before it.
pub fn new_discoveries(db: &Database, user_id: i64, window: &Window) -> Result<NewDiscoveries> {
    let current = new_artists_in(db, user_id, window)?;
    let previous = new_artists_in(db, user_id, &window.preceding())?;

    let change_percentage = if previous == 0 {
        None
    } else {
        Some(super::calc_delta(current, previous))
    };

    Ok(NewDiscoveries {
        new_artists_count: current,
        change_percentage,
    })
}
