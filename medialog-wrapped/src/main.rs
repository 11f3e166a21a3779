//! medialog-wrapped - activity dashboard CLI
//!
//! Render the cross-platform analytics dashboard for a user and window to
//! the terminal, or export it as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use medialog_core::analytics::DashboardEngine;
use medialog_core::{Config, Database};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "medialog-wrapped")]
#[command(about = "Your cross-platform activity, in review")]
#[command(version)]
struct Args {
    /// User id to generate the dashboard for
    #[arg(long, default_value_t = 1)]
    user: i64,

    /// Window length in days
    #[arg(long, default_value_t = 30)]
    days: i64,

    /// Bypass the cache and recompute
    #[arg(long)]
    fresh: bool,

    /// Export format (json = raw composite JSON)
    #[arg(long)]
    export: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration and database
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = medialog_core::logging::init(&config.logging).ok();

    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run migrations")?;

    let engine = DashboardEngine::new(&config.analytics);
    let dashboard = if args.fresh {
        engine.generate_fresh(&db, args.user, args.days)
    } else {
        engine.generate(&db, args.user, args.days)
    }
    .context("failed to compute dashboard")?;

    match args.export.as_deref() {
        Some("json") => println!("{}", serde_json::to_string_pretty(&dashboard)?),
        Some(other) => anyhow::bail!("Unknown export format: {}. Use 'json'", other),
        None => print_terminal(&dashboard, args.days),
    }

    Ok(())
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str()
}

fn int_at(value: &Value, path: &[&str]) -> i64 {
    let mut current = value;
    for key in path {
        match current.get(key) {
            Some(v) => current = v,
            None => return 0,
        }
    }
    current.as_i64().unwrap_or(0)
}

fn print_terminal(dashboard: &Value, days: i64) {
    println!();
    println!("╭{}╮", "─".repeat(60));
    println!("│{:^60}│", format!("YOUR LAST {} DAYS", days));
    println!("╰{}╯", "─".repeat(60));
    println!();

    // Totals
    let totals = &dashboard["comprehensive_stats"]["totals"];
    println!("TOTALS");
    println!(
        "   Games:    {:<6} Gaming:    {}",
        int_at(totals, &["total_games_played"]),
        str_at(totals, &["total_gaming_time"]).unwrap_or("0 minutes")
    );
    println!(
        "   Songs:    {:<6} Listening: {}",
        int_at(totals, &["total_songs_listened"]),
        str_at(totals, &["total_listening_time"]).unwrap_or("0 minutes")
    );
    println!(
        "   Watched:  {:<6} Watching:  {}",
        int_at(totals, &["total_movies_watched"]) + int_at(totals, &["total_episodes_watched"]),
        str_at(totals, &["total_watch_time"]).unwrap_or("0 minutes")
    );
    println!(
        "   Achievements: {:<4} Engagement: {}",
        int_at(totals, &["total_achievements_earned"]),
        str_at(totals, &["total_engagement_time"]).unwrap_or("0 minutes")
    );
    println!();

    // Music highlights
    println!("MUSIC");
    match str_at(dashboard, &["top_artist", "name"]) {
        Some(artist) => println!(
            "   Top artist: {} ({} plays)",
            artist,
            int_at(dashboard, &["top_artist", "play_count"])
        ),
        None => println!("   Top artist: —"),
    }
    if let Some(title) = str_at(dashboard, &["top_track", "title"]) {
        println!(
            "   Top track:  {} by {}",
            title,
            str_at(dashboard, &["top_track", "artist"]).unwrap_or("?")
        );
    }
    println!(
        "   New artists discovered: {}",
        int_at(dashboard, &["new_discoveries", "new_artists_count"])
    );
    println!();

    // Gaming highlights
    println!("GAMING");
    if let Some(game) = str_at(dashboard, &["most_played_game", "name"]) {
        println!(
            "   Most played: {} ({})",
            game,
            str_at(dashboard, &["most_played_game", "playtime"]).unwrap_or("0 minutes")
        );
    }
    println!(
        "   Completed titles: {}",
        int_at(dashboard, &["completion_summary", "total"])
    );
    if let Some(streaks) = dashboard["gaming_streaks"].as_array() {
        if let Some(longest) = streaks.first() {
            println!(
                "   Longest streak: {} days ({} – {})",
                int_at(longest, &["streak_length"]),
                str_at(longest, &["start_date"]).unwrap_or("?"),
                str_at(longest, &["end_date"]).unwrap_or("?")
            );
        }
    }
    println!();

    // Trend vs previous window
    let comparison = &dashboard["monthly_comparison"];
    let change = comparison["change_percentage"].as_f64().unwrap_or(0.0);
    let sign = if change >= 0.0 { "+" } else { "" };
    println!("VS PREVIOUS {} DAYS", days);
    println!("   Engagement: {}{:.0}%", sign, change);
    println!(
        "   Active platforms: {}",
        int_at(dashboard, &["platform_count"])
    );
    println!();
}
