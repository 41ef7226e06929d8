use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use gritcard::stats::{Category, FocusKind, HistoryFilter, Period, PointSource, RatingEngine};
use gritcard::Config;

#[derive(Parser)]
#[command(name = "gritcard")]
#[command(about = "Personal discipline tracker - daily actions in, ratings out")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record an activity for today
    Record {
        #[command(subcommand)]
        activity: RecordCommands,
    },

    /// Show the current rating snapshot (tier, points, category scores)
    Rating,

    /// Show category scores for a period
    Stats {
        #[arg(long, value_enum, default_value_t = PeriodArg::Monthly)]
        period: PeriodArg,
    },

    /// Show recent point history entries
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only entries from this source (e.g. journal, goal_completed)
        #[arg(long)]
        source: Option<String>,

        /// Only entries in this category (e.g. DIS, FOC)
        #[arg(long)]
        category: Option<String>,
    },

    /// Show daily point summaries for the last N days
    Summary {
        #[arg(long, default_value_t = 7)]
        days: usize,
    },

    /// Show the top of the shared leaderboard
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Push the current summary to the leaderboard now
    Sync,

    /// Delete all recorded data
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum RecordCommands {
    /// A journal entry
    Journal,
    /// A completed goal (or a newly created one with --created)
    Goal {
        #[arg(long)]
        created: bool,
    },
    /// A completed todo (or a newly created one with --created)
    Todo {
        #[arg(long)]
        created: bool,
    },
    /// A focus session
    Session {
        #[arg(value_enum)]
        kind: SessionKind,
        /// Session length in minutes
        minutes: u32,
        /// The session was aborted before completion
        #[arg(long)]
        aborted: bool,
    },
    /// Minutes spent outside
    Outside { minutes: u32 },
    /// Minutes spent with friends
    Friends { minutes: u32 },
    /// Phone usage minutes for today (requires usage_access in config)
    Phone {
        minutes: u32,
        /// Portion spent on social media
        #[arg(long, default_value_t = 0)]
        social_media: u32,
    },
    /// A completed 7-day habit streak
    Streak,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeriodArg {
    Daily,
    Monthly,
    Lifetime,
}

impl From<PeriodArg> for Period {
    fn from(p: PeriodArg) -> Self {
        match p {
            PeriodArg::Daily => Period::Daily,
            PeriodArg::Monthly => Period::Monthly,
            PeriodArg::Lifetime => Period::Lifetime,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SessionKind {
    Flow,
    Meditation,
    Body,
    NoPhone,
}

impl From<SessionKind> for FocusKind {
    fn from(k: SessionKind) -> Self {
        match k {
            SessionKind::Flow => FocusKind::Flow,
            SessionKind::Meditation => FocusKind::Meditation,
            SessionKind::Body => FocusKind::Body,
            SessionKind::NoPhone => FocusKind::NoPhone,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = Config::load()?;
    let engine = RatingEngine::open_default(&config)?;

    match cli.command {
        Commands::Record { activity } => {
            record(&engine, activity)?;
            let rating = engine.get_current_rating();
            println!(
                "Recorded. {} pts this month, {} lifetime ({})",
                rating.monthly_points,
                rating.total_points,
                rating.tier.label()
            );
        }
        Commands::Rating => {
            let rating = engine.get_current_rating();
            println!("Tier:    {}", rating.tier.label());
            println!("Overall: {}", rating.overall_rating);
            println!("Points:  {} this month, {} lifetime", rating.monthly_points, rating.total_points);
            if let Some(next) = rating.tier.next_threshold() {
                println!("Next:    {} pts to go", next.saturating_sub(rating.total_points));
            }
            println!();
            print_stats(&rating.stats);
        }
        Commands::Stats { period } => {
            let stats = engine.get_stats(period.into());
            print_stats(&stats);
        }
        Commands::History {
            limit,
            source,
            category,
        } => {
            let filter = HistoryFilter {
                source: source.as_deref().and_then(PointSource::from_str),
                category: category.as_deref().and_then(Category::from_str),
                ..Default::default()
            };
            for entry in engine.get_points_history(limit, &filter) {
                println!(
                    "{}  +{:<4} {:<4} {}",
                    format_timestamp(entry.timestamp),
                    entry.amount,
                    entry.category.as_str(),
                    entry.description
                );
            }
        }
        Commands::Summary { days } => {
            for summary in engine.get_recent_daily_summaries(days) {
                let top = summary
                    .top_source
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {:>5} pts  {:>3} entries  top: {}",
                    summary.date, summary.total_points, summary.entry_count, top
                );
            }
        }
        Commands::Leaderboard { limit } => {
            let entries = engine.leaderboard_top(limit)?;
            if entries.is_empty() {
                println!("Leaderboard is empty (is leaderboard_url set in config.toml?)");
            }
            for (i, entry) in entries.iter().enumerate() {
                println!(
                    "{:>3}. {:<20} {:>6} pts  {}",
                    i + 1,
                    entry.username,
                    entry.total_points,
                    entry.tier.label()
                );
            }
        }
        Commands::Sync => {
            if engine.sync_user_to_leaderboard()? {
                println!("Leaderboard updated");
            } else {
                println!("No leaderboard_url configured in config.toml");
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!("Refusing to delete all data without --yes");
            }
            engine.reset_all()?;
            println!("All data deleted");
        }
    }

    Ok(())
}

fn record(engine: &RatingEngine, activity: RecordCommands) -> Result<()> {
    match activity {
        RecordCommands::Journal => engine.record_journal_entry(),
        RecordCommands::Goal { created: true } => engine.record_goal_created(),
        RecordCommands::Goal { created: false } => engine.record_goal_completed(),
        RecordCommands::Todo { created: true } => engine.record_todo_created(),
        RecordCommands::Todo { created: false } => engine.record_todo_completed(),
        RecordCommands::Session {
            kind,
            minutes,
            aborted,
        } => engine.record_focus_session(kind.into(), minutes, !aborted),
        RecordCommands::Outside { minutes } => engine.record_time_outside(minutes),
        RecordCommands::Friends { minutes } => engine.record_time_with_friends(minutes),
        RecordCommands::Phone {
            minutes,
            social_media,
        } => engine.record_phone_usage(minutes, social_media),
        RecordCommands::Streak => engine.record_habit_streak(),
    }
}

fn print_stats(stats: &gritcard::stats::CategoryStats) {
    for category in Category::ALL {
        println!("{:<4} {:>6}  {}", category.as_str(), stats.get(category), category.label());
    }
    println!("{:<4} {:>6}", "SUM", stats.total());
}

fn format_timestamp(ms: i64) -> String {
    use chrono::TimeZone;
    match chrono::Local.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        _ => ms.to_string(),
    }
}
