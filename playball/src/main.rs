// League simulator entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout stays for box scores)
// 2. Load config
// 3. Open database
// 4. Dispatch the subcommand

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use playball::config;
use playball::db::Database;
use playball::league::{self, PlayBallReport};
use playball::roster::Team;
use playball::sim::{Half, RngSource, TopBottom};

#[derive(Debug, Parser)]
#[command(name = "playball", version, about = "Baseball league simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the roster CSV files into the database and open the season.
    Import,
    /// Simulate one game and record it.
    Play {
        /// Away team, batting first.
        #[arg(long)]
        top: String,
        /// Home team.
        #[arg(long)]
        bottom: String,
        /// Seed for a reproducible game; overrides rules.toml.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the current standings and champion.
    Standings,
    /// Print recent games.
    Log {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing
    init_tracing()?;
    info!("playball starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, season {}",
        config.league.name, config.league.season
    );

    // 3. Open database
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Dispatch
    match cli.command {
        Command::Import => {
            let ids = league::import_league(&db, &config)?;
            println!("Imported {} teams.", ids.len());
        }
        Command::Play { top, bottom, seed } => {
            let top_id = league::team_id(&db, &top)?;
            let bottom_id = league::team_id(&db, &bottom)?;
            let report = match seed.or(config.rules.seed) {
                Some(seed) => {
                    info!("using seed {seed}");
                    league::play_ball(&db, &config, top_id, bottom_id, RngSource::seeded(seed))?
                }
                None => league::play_ball(&db, &config, top_id, bottom_id, RngSource::thread())?,
            };
            // Season lines after this game is merged in.
            let seasons = TopBottom::new(
                db.load_team(top_id, report.times)?,
                db.load_team(bottom_id, report.times)?,
            );
            print_report(&report, &seasons);
        }
        Command::Standings => {
            let times = current_season(&db)?;
            println!("{} season {}", config.league.name, times);
            println!(
                "{:<16}{:>4}{:>4}{:>4}{:>6}{:>6}{:>5}",
                "Team", "W", "L", "D", "RS", "RA", "Strk"
            );
            for row in league::standings(&db, times)? {
                let s = &row.season;
                println!(
                    "{:<16}{:>4}{:>4}{:>4}{:>6}{:>6}{:>5}",
                    row.name, s.win, s.lose, s.draw, s.score, s.lose_score, s.win_continue
                );
            }
            match db.champion(times)? {
                Some(champ) => println!("\nChampion: {} ({} straight)", champ.name, champ.win_continue),
                None => println!("\nNo champion yet."),
            }
        }
        Command::Log { limit } => {
            let times = current_season(&db)?;
            for entry in db.game_logs(times, limit)? {
                let mark = if entry.walk_off { " (walk-off)" } else { "" };
                println!(
                    "#{:<5}{}  {} {} - {} {}  [{} inn]{}",
                    entry.id,
                    entry.played_at,
                    entry.teams.top,
                    entry.score.top,
                    entry.score.bottom,
                    entry.teams.bottom,
                    entry.innings,
                    mark
                );
            }
        }
    }

    Ok(())
}

fn current_season(db: &Database) -> anyhow::Result<u32> {
    Ok(db.current_times()?.ok_or(league::LeagueError::NoSeason)?)
}

fn print_report(report: &PlayBallReport, seasons: &TopBottom<Team>) {
    let record = &report.result.record;
    println!("{record}");

    for summary in &record.innings {
        let team = record.teams.get(summary.half);
        let half = match summary.half {
            Half::Top => "Top",
            Half::Bottom => "Bot",
        };
        println!(
            "{half} {:>2}  {:<16} {} R, {} H, {} E",
            summary.inning, team, summary.runs, summary.hits, summary.errors
        );
        for play in &summary.plays {
            println!("        {play}");
        }
    }

    for half in [Half::Top, Half::Bottom] {
        let side = report.result.sides.get(half);
        let season = seasons.get(half);
        println!("\n{}", record.teams.get(half));
        for line in &side.batting {
            let s = &line.stats;
            let avg = season
                .lineup
                .iter()
                .chain(&season.bench)
                .find(|b| !line.is_pitcher && b.id == line.player_id)
                .map(|b| format!("{:.3}", b.season.average()))
                .unwrap_or_default();
            println!(
                "  {:<20} AB {:>2}  H {:>2}  HR {:>2}  RBI {:>2}  BB {:>2}  K {:>2}  {:>5}",
                line.name, s.at_bat, s.hit, s.hr, s.bat_score, s.four_ball, s.strike_out, avg
            );
        }
        let p = &side.pitching.stats;
        let decision = if p.win > 0 {
            " (W)"
        } else if p.lose > 0 {
            " (L)"
        } else {
            ""
        };
        println!(
            "  P {:<18} IP {}.{}  H {:>2}  R {:>2}  ER {:>2}  K {:>2}  ERA {:.2}{}",
            side.pitching.name,
            p.out_count / 3,
            p.out_count % 3,
            p.hit,
            p.runs_allowed,
            p.loss_score,
            p.strike_out,
            season.pitcher.season.era(),
            decision
        );
    }

    if let Some(champ) = &report.champion {
        println!("\nChampion: {} ({} straight)", champ.name, champ.win_continue);
    }
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("playball.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("playball=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
