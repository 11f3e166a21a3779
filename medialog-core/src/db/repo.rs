//! Database repository layer
//!
//! Provides query and insert operations for the platform stores (Layer 1)
//! and the derived analytics tables (Layer 2). All window queries take an
//! inclusive `[start, end]` date pair and bucket timestamps with SQLite's
//! `date(...)`.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

/// Per-platform gaming aggregates over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamingWindowStats {
    /// Titles with a `last_played` inside the window
    pub games_touched: i64,
    /// Achievements with an `unlock_time` inside the window
    pub achievements_earned: i64,
    /// Reported playtime minutes summed over touched titles
    pub playtime_minutes: i64,
}

/// Highest-play-count artist in a window.
#[derive(Debug, Clone)]
pub struct TopArtist {
    pub artist: String,
    pub play_count: i64,
    pub last_played_at: DateTime<Utc>,
}

/// Highest-play-count track in a window.
#[derive(Debug, Clone)]
pub struct TopTrack {
    pub title: String,
    pub artist: String,
    pub play_count: i64,
}

/// Highest-play-count album in a window.
#[derive(Debug, Clone)]
pub struct TopAlbum {
    pub album: String,
    pub artist: String,
    pub play_count: i64,
}

/// Lifetime activity totals for milestone tracking.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifetimeTotals {
    pub games: i64,
    pub achievements: i64,
    pub songs: i64,
    pub movies: i64,
    pub episodes: i64,
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn date_param(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn text_conversion_err(e: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
}

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Title store (games + achievements)
    // ============================================

    /// Insert or update a title keyed by `(user, platform, external_id)`.
    /// Returns the row id.
    pub fn upsert_title(&self, title: &TitleRecord) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO games (
                user_id, platform, external_id, name, last_played,
                playtime_minutes, total_achievements, unlocked_achievements
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(user_id, platform, external_id) DO UPDATE SET
                name = excluded.name,
                last_played = excluded.last_played,
                playtime_minutes = excluded.playtime_minutes,
                total_achievements = excluded.total_achievements,
                unlocked_achievements = excluded.unlocked_achievements
            "#,
            params![
                title.user_id,
                title.platform.as_str(),
                title.external_id,
                title.name,
                title.last_played.map(|t| t.to_rfc3339()),
                title.playtime_minutes,
                title.total_achievements,
                title.unlocked_achievements,
            ],
        )?;

        conn.query_row(
            "SELECT id FROM games WHERE user_id = ?1 AND platform = ?2 AND external_id = ?3",
            params![title.user_id, title.platform.as_str(), title.external_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    /// Insert an achievement row for a title.
    pub fn insert_achievement(&self, achievement: &AchievementRecord) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO achievements (game_id, name, tier, unlocked, unlock_time, rarity)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                achievement.game_id,
                achievement.name,
                achievement.tier,
                achievement.unlocked,
                achievement.unlock_time.map(|t| t.to_rfc3339()),
                achievement.rarity,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn row_to_title(row: &Row) -> rusqlite::Result<TitleRecord> {
        let platform_str: String = row.get("platform")?;
        let last_played: Option<String> = row.get("last_played")?;

        Ok(TitleRecord {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            platform: GamePlatform::from_str(&platform_str).map_err(text_conversion_err)?,
            external_id: row.get("external_id")?,
            name: row.get("name")?,
            last_played: last_played.as_deref().and_then(parse_ts),
            playtime_minutes: row.get("playtime_minutes")?,
            total_achievements: row.get("total_achievements")?,
            unlocked_achievements: row.get("unlocked_achievements")?,
        })
    }

    fn row_to_achievement(row: &Row) -> rusqlite::Result<AchievementRecord> {
        let unlock_time: Option<String> = row.get("unlock_time")?;

        Ok(AchievementRecord {
            id: row.get("id")?,
            game_id: row.get("game_id")?,
            name: row.get("name")?,
            tier: row.get("tier")?,
            unlocked: row.get("unlocked")?,
            unlock_time: unlock_time.as_deref().and_then(parse_ts),
            rarity: row.get("rarity")?,
        })
    }

    /// All titles for a user, across platforms.
    pub fn titles_for_user(&self, user_id: i64) -> Result<Vec<TitleRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM games WHERE user_id = ?1 ORDER BY platform, external_id",
        )?;
        let titles = stmt
            .query_map([user_id], Self::row_to_title)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(titles)
    }

    /// All achievements for a user's titles, grouped by title id.
    pub fn achievements_by_title(&self, user_id: i64) -> Result<HashMap<i64, Vec<AchievementRecord>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT a.* FROM achievements a
            JOIN games g ON a.game_id = g.id
            WHERE g.user_id = ?1
            ORDER BY a.game_id, a.id
            "#,
        )?;
        let rows = stmt
            .query_map([user_id], Self::row_to_achievement)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut grouped: HashMap<i64, Vec<AchievementRecord>> = HashMap::new();
        for achievement in rows {
            grouped.entry(achievement.game_id).or_default().push(achievement);
        }
        Ok(grouped)
    }

    /// Gaming aggregates for one platform over a window.
    pub fn gaming_window_stats(
        &self,
        user_id: i64,
        platform: GamePlatform,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<GamingWindowStats> {
        let conn = self.conn.lock().unwrap();
        let (start, end) = (date_param(start), date_param(end));

        let (games_touched, playtime_minutes): (i64, i64) = conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(playtime_minutes), 0)
            FROM games
            WHERE user_id = ?1 AND platform = ?2
              AND last_played IS NOT NULL
              AND date(last_played) >= ?3 AND date(last_played) <= ?4
            "#,
            params![user_id, platform.as_str(), start, end],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        // unlock_time is ground truth: an achievement without one never
        // counts toward a window, whatever the boolean says.
        let achievements_earned: i64 = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM achievements a
            JOIN games g ON a.game_id = g.id
            WHERE g.user_id = ?1 AND g.platform = ?2
              AND a.unlock_time IS NOT NULL
              AND date(a.unlock_time) >= ?3 AND date(a.unlock_time) <= ?4
            "#,
            params![user_id, platform.as_str(), start, end],
            |row| row.get(0),
        )?;

        Ok(GamingWindowStats {
            games_touched,
            achievements_earned,
            playtime_minutes,
        })
    }

    /// Gaming aggregates across all platforms over a window.
    pub fn gaming_totals(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<GamingWindowStats> {
        let mut totals = GamingWindowStats::default();
        for platform in GamePlatform::ALL {
            let stats = self.gaming_window_stats(user_id, platform, start, end)?;
            totals.games_touched += stats.games_touched;
            totals.achievements_earned += stats.achievements_earned;
            totals.playtime_minutes += stats.playtime_minutes;
        }
        Ok(totals)
    }

    /// Titles touched per day over a window, summed across platforms.
    pub fn daily_games_touched(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<NaiveDate, i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT date(last_played) AS day, COUNT(*)
            FROM games
            WHERE user_id = ?1 AND last_played IS NOT NULL
              AND date(last_played) >= ?2 AND date(last_played) <= ?3
            GROUP BY day
            "#,
        )?;
        Self::collect_daily_counts(&mut stmt, user_id, start, end)
    }

    /// Achievements unlocked per day over a window.
    pub fn daily_achievements_earned(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<NaiveDate, i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT date(a.unlock_time) AS day, COUNT(*)
            FROM achievements a
            JOIN games g ON a.game_id = g.id
            WHERE g.user_id = ?1 AND a.unlock_time IS NOT NULL
              AND date(a.unlock_time) >= ?2 AND date(a.unlock_time) <= ?3
            GROUP BY day
            "#,
        )?;
        Self::collect_daily_counts(&mut stmt, user_id, start, end)
    }

    fn collect_daily_counts(
        stmt: &mut rusqlite::Statement,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<NaiveDate, i64>> {
        let rows = stmt
            .query_map(
                params![user_id, date_param(start), date_param(end)],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(day, count)| parse_date(&day).map(|d| (d, count)))
            .collect())
    }

    /// Most recent `last_played` across every title store.
    pub fn max_last_played(&self, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let latest: Option<String> = conn.query_row(
            "SELECT MAX(last_played) FROM games WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(latest.as_deref().and_then(parse_ts))
    }

    /// Title with the largest reported playtime among titles touched in the
    /// window. Ties break by name ascending.
    pub fn most_played_title(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TitleRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT * FROM games
            WHERE user_id = ?1
              AND playtime_minutes IS NOT NULL
              AND last_played IS NOT NULL
              AND date(last_played) >= ?2 AND date(last_played) <= ?3
            ORDER BY playtime_minutes DESC, name ASC
            LIMIT 1
            "#,
            params![user_id, date_param(start), date_param(end)],
            Self::row_to_title,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Rarest achievement unlocked in the window: `(achievement, title name)`.
    pub fn rarest_unlocked_achievement(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<(AchievementRecord, String)>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT a.*, g.name AS game_name
            FROM achievements a
            JOIN games g ON a.game_id = g.id
            WHERE g.user_id = ?1
              AND a.rarity IS NOT NULL
              AND a.unlock_time IS NOT NULL
              AND date(a.unlock_time) >= ?2 AND date(a.unlock_time) <= ?3
            ORDER BY a.rarity ASC, a.name ASC
            LIMIT 1
            "#,
            params![user_id, date_param(start), date_param(end)],
            |row| Ok((Self::row_to_achievement(row)?, row.get("game_name")?)),
        )
        .optional()
        .map_err(Error::from)
    }

    /// Sorted distinct calendar days with any gaming activity (a title
    /// touched or an achievement unlocked).
    pub fn gaming_activity_dates(&self, user_id: i64) -> Result<Vec<NaiveDate>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT date(last_played) AS day
            FROM games
            WHERE user_id = ?1 AND last_played IS NOT NULL
            UNION
            SELECT date(a.unlock_time)
            FROM achievements a
            JOIN games g ON a.game_id = g.id
            WHERE g.user_id = ?1 AND a.unlock_time IS NOT NULL
            ORDER BY day
            "#,
        )?;
        let days = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days.iter().filter_map(|d| parse_date(d)).collect())
    }

    // ============================================
    // Music store
    // ============================================

    /// Insert a song play. Exact duplicates (same user, title, artist,
    /// timestamp) from re-syncs are ignored.
    pub fn insert_song_play(&self, song: &SongPlay) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO songs (user_id, title, artist, album, played_at, duration_ms, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, title, artist, played_at) DO NOTHING
            "#,
            params![
                song.user_id,
                song.title,
                song.artist,
                song.album,
                song.played_at.to_rfc3339(),
                song.duration_ms,
                song.source.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Song count and real duration sum over a window, optionally filtered
    /// by scrobbling source.
    pub fn music_window_stats(
        &self,
        user_id: i64,
        source: Option<MusicSource>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(i64, i64)> {
        let conn = self.conn.lock().unwrap();
        let (start, end) = (date_param(start), date_param(end));

        match source {
            Some(source) => conn
                .query_row(
                    r#"
                    SELECT COUNT(*), COALESCE(SUM(duration_ms), 0)
                    FROM songs
                    WHERE user_id = ?1 AND source = ?2
                      AND date(played_at) >= ?3 AND date(played_at) <= ?4
                    "#,
                    params![user_id, source.as_str(), start, end],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(Error::from),
            None => conn
                .query_row(
                    r#"
                    SELECT COUNT(*), COALESCE(SUM(duration_ms), 0)
                    FROM songs
                    WHERE user_id = ?1
                      AND date(played_at) >= ?2 AND date(played_at) <= ?3
                    "#,
                    params![user_id, start, end],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .map_err(Error::from),
        }
    }

    /// Per-day song count and duration sum over a window.
    pub fn daily_music_stats(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<NaiveDate, (i64, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT date(played_at) AS day, COUNT(*), COALESCE(SUM(duration_ms), 0)
            FROM songs
            WHERE user_id = ?1
              AND date(played_at) >= ?2 AND date(played_at) <= ?3
            GROUP BY day
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![user_id, date_param(start), date_param(end)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(day, count, ms)| parse_date(&day).map(|d| (d, (count, ms))))
            .collect())
    }

    /// Highest-play-count artist in the window. Ties break by most recent
    /// play, then artist name.
    pub fn top_artist(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TopArtist>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT artist, COUNT(*) AS plays, MAX(played_at) AS latest
            FROM songs
            WHERE user_id = ?1
              AND date(played_at) >= ?2 AND date(played_at) <= ?3
            GROUP BY artist
            ORDER BY plays DESC, latest DESC, artist ASC
            LIMIT 1
            "#,
            params![user_id, date_param(start), date_param(end)],
            |row| {
                Ok((
                    row.get::<_, String>("artist")?,
                    row.get::<_, i64>("plays")?,
                    row.get::<_, String>("latest")?,
                ))
            },
        )
        .optional()
        .map_err(Error::from)
        .map(|row| {
            row.and_then(|(artist, play_count, latest)| {
                parse_ts(&latest).map(|last_played_at| TopArtist {
                    artist,
                    play_count,
                    last_played_at,
                })
            })
        })
    }

    /// Highest-play-count track in the window, same tie-break as artists.
    pub fn top_track(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TopTrack>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT title, artist, COUNT(*) AS plays, MAX(played_at) AS latest
            FROM songs
            WHERE user_id = ?1
              AND date(played_at) >= ?2 AND date(played_at) <= ?3
            GROUP BY title, artist
            ORDER BY plays DESC, latest DESC, title ASC
            LIMIT 1
            "#,
            params![user_id, date_param(start), date_param(end)],
            |row| {
                Ok(TopTrack {
                    title: row.get("title")?,
                    artist: row.get("artist")?,
                    play_count: row.get("plays")?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Highest-play-count album in the window, same tie-break as artists.
    pub fn top_album(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<TopAlbum>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT album, artist, COUNT(*) AS plays, MAX(played_at) AS latest
            FROM songs
            WHERE user_id = ?1 AND album IS NOT NULL
              AND date(played_at) >= ?2 AND date(played_at) <= ?3
            GROUP BY album, artist
            ORDER BY plays DESC, latest DESC, album ASC
            LIMIT 1
            "#,
            params![user_id, date_param(start), date_param(end)],
            |row| {
                Ok(TopAlbum {
                    album: row.get("album")?,
                    artist: row.get("artist")?,
                    play_count: row.get("plays")?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Distinct artists played inside the window.
    pub fn artists_in_window(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT artist FROM songs
            WHERE user_id = ?1
              AND date(played_at) >= ?2 AND date(played_at) <= ?3
            "#,
        )?;
        let artists = stmt
            .query_map(
                params![user_id, date_param(start), date_param(end)],
                |row| row.get(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artists)
    }

    /// Distinct artists with any play strictly before the given date.
    pub fn artists_before(&self, user_id: i64, before: NaiveDate) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT artist FROM songs WHERE user_id = ?1 AND date(played_at) < ?2",
        )?;
        let artists = stmt
            .query_map(params![user_id, date_param(before)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artists)
    }

    // ============================================
    // Viewing store (movies, shows, watch events)
    // ============================================

    /// Insert or update a movie keyed by `(user, external_id)`. Returns the row id.
    pub fn upsert_movie(
        &self,
        user_id: i64,
        external_id: &str,
        title: &str,
        year: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO movies (user_id, external_id, title, year)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, external_id) DO UPDATE SET
                title = excluded.title,
                year = excluded.year
            "#,
            params![user_id, external_id, title, year],
        )?;
        conn.query_row(
            "SELECT id FROM movies WHERE user_id = ?1 AND external_id = ?2",
            params![user_id, external_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    /// Record a movie watch event.
    pub fn insert_movie_watch(&self, watch: &MovieWatch) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO movie_watches (movie_id, watched_at) VALUES (?1, ?2)",
            params![watch.movie_id, watch.watched_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Insert or update a show keyed by `(user, external_id)`. Returns the row id.
    pub fn upsert_show(&self, user_id: i64, external_id: &str, title: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO shows (user_id, external_id, title)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, external_id) DO UPDATE SET title = excluded.title
            "#,
            params![user_id, external_id, title],
        )?;
        conn.query_row(
            "SELECT id FROM shows WHERE user_id = ?1 AND external_id = ?2",
            params![user_id, external_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    /// Insert or fetch an episode row. Returns the row id.
    pub fn upsert_episode(
        &self,
        show_id: i64,
        season_number: i64,
        episode_number: i64,
        title: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO episodes (show_id, season_number, episode_number, title)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(show_id, season_number, episode_number) DO UPDATE SET
                title = excluded.title
            "#,
            params![show_id, season_number, episode_number, title],
        )?;
        conn.query_row(
            r#"
            SELECT id FROM episodes
            WHERE show_id = ?1 AND season_number = ?2 AND episode_number = ?3
            "#,
            params![show_id, season_number, episode_number],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    /// Record an episode watch event.
    pub fn insert_episode_watch(&self, watch: &EpisodeWatch) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO episode_watches (episode_id, watched_at) VALUES (?1, ?2)",
            params![watch.episode_id, watch.watched_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Deduplicated movie and episode watch counts over a window.
    ///
    /// Re-syncs can insert the same watch twice, so counts are over distinct
    /// `(content, watched_at)` pairs; repeat watches at distinct times remain
    /// distinct events.
    pub fn watch_counts(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(i64, i64)> {
        let conn = self.conn.lock().unwrap();
        let (start, end) = (date_param(start), date_param(end));

        let movies: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT DISTINCT w.movie_id, w.watched_at
                FROM movie_watches w
                JOIN movies m ON w.movie_id = m.id
                WHERE m.user_id = ?1
                  AND date(w.watched_at) >= ?2 AND date(w.watched_at) <= ?3
            )
            "#,
            params![user_id, start, end],
            |row| row.get(0),
        )?;

        let episodes: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT DISTINCT w.episode_id, w.watched_at
                FROM episode_watches w
                JOIN episodes e ON w.episode_id = e.id
                JOIN shows s ON e.show_id = s.id
                WHERE s.user_id = ?1
                  AND date(w.watched_at) >= ?2 AND date(w.watched_at) <= ?3
            )
            "#,
            params![user_id, start, end],
            |row| row.get(0),
        )?;

        Ok((movies, episodes))
    }

    /// Per-day deduplicated movie watch counts.
    pub fn daily_movie_watches(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<NaiveDate, i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT day, COUNT(*) FROM (
                SELECT DISTINCT w.movie_id, w.watched_at, date(w.watched_at) AS day
                FROM movie_watches w
                JOIN movies m ON w.movie_id = m.id
                WHERE m.user_id = ?1
                  AND date(w.watched_at) >= ?2 AND date(w.watched_at) <= ?3
            )
            GROUP BY day
            "#,
        )?;
        Self::collect_daily_counts(&mut stmt, user_id, start, end)
    }

    /// Per-day deduplicated episode watch counts.
    pub fn daily_episode_watches(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<NaiveDate, i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT day, COUNT(*) FROM (
                SELECT DISTINCT w.episode_id, w.watched_at, date(w.watched_at) AS day
                FROM episode_watches w
                JOIN episodes e ON w.episode_id = e.id
                JOIN shows s ON e.show_id = s.id
                WHERE s.user_id = ?1
                  AND date(w.watched_at) >= ?2 AND date(w.watched_at) <= ?3
            )
            GROUP BY day
            "#,
        )?;
        Self::collect_daily_counts(&mut stmt, user_id, start, end)
    }

    // ============================================
    // Lifetime totals
    // ============================================

    /// Lifetime activity counts for milestone tracking.
    pub fn lifetime_totals(&self, user_id: i64) -> Result<LifetimeTotals> {
        let conn = self.conn.lock().unwrap();

        let games: i64 = conn.query_row(
            "SELECT COUNT(*) FROM games WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        let achievements: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM achievements a
            JOIN games g ON a.game_id = g.id
            WHERE g.user_id = ?1 AND a.unlock_time IS NOT NULL
            "#,
            [user_id],
            |row| row.get(0),
        )?;
        let songs: i64 = conn.query_row(
            "SELECT COUNT(*) FROM songs WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;
        let movies: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT DISTINCT w.movie_id, w.watched_at
                FROM movie_watches w JOIN movies m ON w.movie_id = m.id
                WHERE m.user_id = ?1
            )
            "#,
            [user_id],
            |row| row.get(0),
        )?;
        let episodes: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT DISTINCT w.episode_id, w.watched_at
                FROM episode_watches w
                JOIN episodes e ON w.episode_id = e.id
                JOIN shows s ON e.show_id = s.id
                WHERE s.user_id = ?1
            )
            "#,
            [user_id],
            |row| row.get(0),
        )?;

        Ok(LifetimeTotals {
            games,
            achievements,
            songs,
            movies,
            episodes,
        })
    }

    // ============================================
    // Derived tables (Layer 2)
    // ============================================

    /// Insert or update a daily statistics snapshot.
    pub fn upsert_snapshot(&self, snapshot: &StatisticsSnapshot) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO statistics_snapshots (
                user_id, date, games_played, achievements_earned, gaming_secs,
                songs_listened, listening_secs, movies_watched, episodes_watched,
                watch_secs, engagement_secs
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(user_id, date) DO UPDATE SET
                games_played = excluded.games_played,
                achievements_earned = excluded.achievements_earned,
                gaming_secs = excluded.gaming_secs,
                songs_listened = excluded.songs_listened,
                listening_secs = excluded.listening_secs,
                movies_watched = excluded.movies_watched,
                episodes_watched = excluded.episodes_watched,
                watch_secs = excluded.watch_secs,
                engagement_secs = excluded.engagement_secs
            "#,
            params![
                snapshot.user_id,
                date_param(snapshot.date),
                snapshot.games_played,
                snapshot.achievements_earned,
                snapshot.gaming_secs,
                snapshot.songs_listened,
                snapshot.listening_secs,
                snapshot.movies_watched,
                snapshot.episodes_watched,
                snapshot.watch_secs,
                snapshot.engagement_secs,
            ],
        )?;
        Ok(())
    }

    fn row_to_snapshot(row: &Row) -> rusqlite::Result<StatisticsSnapshot> {
        let date_str: String = row.get("date")?;
        Ok(StatisticsSnapshot {
            user_id: row.get("user_id")?,
            date: parse_date(&date_str).unwrap_or_default(),
            games_played: row.get("games_played")?,
            achievements_earned: row.get("achievements_earned")?,
            gaming_secs: row.get("gaming_secs")?,
            songs_listened: row.get("songs_listened")?,
            listening_secs: row.get("listening_secs")?,
            movies_watched: row.get("movies_watched")?,
            episodes_watched: row.get("episodes_watched")?,
            watch_secs: row.get("watch_secs")?,
            engagement_secs: row.get("engagement_secs")?,
        })
    }

    /// Fetch the snapshot for a `(user, date)`, if one has been recorded.
    pub fn get_snapshot(&self, user_id: i64, date: NaiveDate) -> Result<Option<StatisticsSnapshot>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM statistics_snapshots WHERE user_id = ?1 AND date = ?2",
            params![user_id, date_param(date)],
            Self::row_to_snapshot,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Replace a user's streak rows atomically. Used by the idempotent
    /// streak rebuild; recomputing from unchanged stores writes identical rows.
    pub fn replace_streaks(&self, user_id: i64, streaks: &[GamingStreak]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM gaming_streaks WHERE user_id = ?1", [user_id])?;
        for streak in streaks {
            tx.execute(
                r#"
                INSERT INTO gaming_streaks (
                    user_id, start_date, end_date, streak_length,
                    total_gaming_secs, games_played, achievements_earned
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    user_id,
                    date_param(streak.start_date),
                    date_param(streak.end_date),
                    streak.streak_length,
                    streak.total_gaming_secs,
                    streak.games_played,
                    streak.achievements_earned,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn row_to_streak(row: &Row) -> rusqlite::Result<GamingStreak> {
        let start: String = row.get("start_date")?;
        let end: String = row.get("end_date")?;
        Ok(GamingStreak {
            user_id: row.get("user_id")?,
            start_date: parse_date(&start).unwrap_or_default(),
            end_date: parse_date(&end).unwrap_or_default(),
            streak_length: row.get("streak_length")?,
            total_gaming_secs: row.get("total_gaming_secs")?,
            games_played: row.get("games_played")?,
            achievements_earned: row.get("achievements_earned")?,
        })
    }

    /// Longest streaks first; equal lengths order by start date.
    pub fn top_streaks(&self, user_id: i64, limit: usize) -> Result<Vec<GamingStreak>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM gaming_streaks
            WHERE user_id = ?1
            ORDER BY streak_length DESC, start_date ASC
            LIMIT ?2
            "#,
        )?;
        let streaks = stmt
            .query_map(params![user_id, limit as i64], Self::row_to_streak)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(streaks)
    }
}
