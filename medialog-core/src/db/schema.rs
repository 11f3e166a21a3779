//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- ============================================
    -- LAYER 1: Platform stores (written by sync jobs)
    -- ============================================

    CREATE TABLE IF NOT EXISTS games (
        id                    INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id               INTEGER NOT NULL,
        platform              TEXT NOT NULL,
        external_id           TEXT NOT NULL,
        name                  TEXT NOT NULL,
        last_played           DATETIME,
        playtime_minutes      INTEGER,
        total_achievements    INTEGER NOT NULL DEFAULT 0,
        unlocked_achievements INTEGER NOT NULL DEFAULT 0,

        UNIQUE (user_id, platform, external_id)
    );

    CREATE TABLE IF NOT EXISTS achievements (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        game_id     INTEGER NOT NULL REFERENCES games(id),
        name        TEXT NOT NULL,
        tier        TEXT,
        unlocked    BOOLEAN NOT NULL DEFAULT 0,
        unlock_time DATETIME,
        rarity      REAL
    );

    CREATE TABLE IF NOT EXISTS songs (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id     INTEGER NOT NULL,
        title       TEXT NOT NULL,
        artist      TEXT NOT NULL,
        album       TEXT,
        played_at   DATETIME NOT NULL,
        duration_ms INTEGER NOT NULL DEFAULT 0,
        source      TEXT NOT NULL,

        UNIQUE (user_id, title, artist, played_at)
    );

    CREATE TABLE IF NOT EXISTS movies (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id     INTEGER NOT NULL,
        external_id TEXT NOT NULL,
        title       TEXT NOT NULL,
        year        INTEGER,

        UNIQUE (user_id, external_id)
    );

    CREATE TABLE IF NOT EXISTS movie_watches (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        movie_id   INTEGER NOT NULL REFERENCES movies(id),
        watched_at DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS shows (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id     INTEGER NOT NULL,
        external_id TEXT NOT NULL,
        title       TEXT NOT NULL,
        year        INTEGER,

        UNIQUE (user_id, external_id)
    );

    CREATE TABLE IF NOT EXISTS episodes (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        show_id        INTEGER NOT NULL REFERENCES shows(id),
        season_number  INTEGER NOT NULL,
        episode_number INTEGER NOT NULL,
        title          TEXT,

        UNIQUE (show_id, season_number, episode_number)
    );

    CREATE TABLE IF NOT EXISTS episode_watches (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        episode_id INTEGER NOT NULL REFERENCES episodes(id),
        watched_at DATETIME NOT NULL
    );

    -- ============================================
    -- LAYER 2: Derived (regenerable)
    -- ============================================

    CREATE TABLE IF NOT EXISTS statistics_snapshots (
        user_id             INTEGER NOT NULL,
        date                DATE NOT NULL,
        games_played        INTEGER NOT NULL DEFAULT 0,
        achievements_earned INTEGER NOT NULL DEFAULT 0,
        gaming_secs         INTEGER NOT NULL DEFAULT 0,
        songs_listened      INTEGER NOT NULL DEFAULT 0,
        listening_secs      INTEGER NOT NULL DEFAULT 0,
        movies_watched      INTEGER NOT NULL DEFAULT 0,
        episodes_watched    INTEGER NOT NULL DEFAULT 0,
        watch_secs          INTEGER NOT NULL DEFAULT 0,
        engagement_secs     INTEGER NOT NULL DEFAULT 0,

        PRIMARY KEY (user_id, date)
    );

    CREATE TABLE IF NOT EXISTS gaming_streaks (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id             INTEGER NOT NULL,
        start_date          DATE NOT NULL,
        end_date            DATE NOT NULL,
        streak_length       INTEGER NOT NULL,
        total_gaming_secs   INTEGER NOT NULL DEFAULT 0,
        games_played        INTEGER NOT NULL DEFAULT 0,
        achievements_earned INTEGER NOT NULL DEFAULT 0
    );

    -- ============================================
    -- Indexes for window queries
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_games_user_played ON games(user_id, last_played);
    CREATE INDEX IF NOT EXISTS idx_achievements_game ON achievements(game_id);
    CREATE INDEX IF NOT EXISTS idx_achievements_unlock ON achievements(unlock_time);
    CREATE INDEX IF NOT EXISTS idx_songs_user_played ON songs(user_id, played_at);
    CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(user_id, artist);
    CREATE INDEX IF NOT EXISTS idx_movie_watches_time ON movie_watches(movie_id, watched_at);
    CREATE INDEX IF NOT EXISTS idx_episode_watches_time ON episode_watches(episode_id, watched_at);
    CREATE INDEX IF NOT EXISTS idx_streaks_user_length ON gaming_streaks(user_id, streak_length DESC);
    "#,
];

/// Run all pending migrations on the connection.
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (idx, migration) in MIGRATIONS.iter().enumerate() {
        let version = idx as i32 + 1;
        if version > current {
            tracing::info!(version, "Applying schema migration");
            conn.execute_batch(migration)?;
            conn.pragma_update(None, "user_version", version)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_expected_tables_exist() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('games', 'achievements', 'songs', 'movies', 'movie_watches',
                  'shows', 'episodes', 'episode_watches',
                  'statistics_snapshots', 'gaming_streaks')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 10);
    }
}
