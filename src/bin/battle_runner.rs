//! Headless Battle Runner
//!
//! Runs a full boss battle against the seeded simulated analyzer, with the
//! real ingest loop, clock and watchdog, and prints the outcome.

use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use orator_arena::analysis::{SimulatedAnalyzer, SimulatedProfile};
use orator_arena::battle::{find_topic, BattleConfig, LogEntry};
use orator_arena::core::error::{ArenaError, Result};
use orator_arena::core::types::UserId;
use orator_arena::core::ArenaConfig;
use orator_arena::progress::{InMemoryProgressStore, ProgressStore};
use orator_arena::session::{spawn_session, IngestLoop, IngestReport, ScriptedSource};

const DEFAULT_CONFIG_PATH: &str = "data/arena.toml";

/// Headless Battle Runner - simulated speaker vs the boss
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a simulated speaking battle and output the result")]
struct Args {
    /// Config file (defaults to data/arena.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Topic id from the built-in catalogue
    #[arg(long, default_value_t = 1)]
    topic: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum chunks the simulated speaker produces
    #[arg(long, default_value_t = 40)]
    chunks: u64,

    /// Mean skill score of the simulated speaker (0-9)
    #[arg(long, default_value_t = 6.5)]
    skill_mean: f32,

    /// Chance the analyzer never answers a chunk
    #[arg(long, default_value_t = 0.05)]
    stall: f64,

    /// Time compression: 60 runs a two-minute battle in two seconds
    #[arg(long, default_value_t = 60.0)]
    speed: f64,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the combat log to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunResult {
    outcome: String,
    topic: String,
    boss: String,
    boss_hp: u32,
    boss_max_hp: u32,
    player_hp: u32,
    seconds_elapsed: u32,
    ingest: IngestReport,
    cumulative_damage: u64,
    band_key: String,
    total_xp: u64,
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orator_arena=info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = load_config(args.config.as_deref())?;
    let topic = find_topic(args.topic)
        .ok_or_else(|| ArenaError::Config(format!("unknown topic id {}", args.topic)))?;
    let battle = BattleConfig::for_topic(topic.clone(), &config);

    let speed = args.speed.max(1.0);
    let run_config = compress_time(&config, speed);
    let profile = SimulatedProfile {
        skill_mean: args.skill_mean,
        stall_probability: args.stall,
        min_latency_ms: scaled(SimulatedProfile::default().min_latency_ms, speed),
        max_latency_ms: scaled(SimulatedProfile::default().max_latency_ms, speed),
        ..SimulatedProfile::default()
    };
    let analyzer = Arc::new(
        SimulatedAnalyzer::new(seed, profile).with_markers(config.scoring.discourse_markers.clone()),
    );

    let user = UserId::new("battle_runner");
    let store = Arc::new(InMemoryProgressStore::default());

    let rt = Runtime::new()?;
    let (report, snapshot, record) = rt.block_on(async {
        let handle = spawn_session(run_config.clone(), user.clone(), store.clone());
        handle.start_battle(battle).await?;

        let source = ScriptedSource::placeholders(args.chunks as usize);
        let report = IngestLoop::new(handle.clone(), analyzer, source, &run_config)
            .with_max_chunks(args.chunks)
            .run()
            .await?;
        let snapshot = handle.snapshot();
        let record = handle.progress().await?;
        Ok::<_, ArenaError>((report, snapshot, record))
    })?;

    if args.verbose {
        eprintln!("=== Combat Log ===");
        for entry in snapshot.battle.combat_log().entries() {
            print_entry(entry);
        }
        eprintln!();
    }

    let battle_state = &snapshot.battle;
    let (cumulative_damage, band_key, total_xp) = record
        .map(|r| (r.cumulative_damage, r.band_key, r.total_xp))
        .unwrap_or_else(|| (0, store.bands().lookup(0).band_key.clone(), 0));
    let result = RunResult {
        outcome: format!("{:?}", report.final_phase),
        topic: topic.title,
        boss: config.boss.name.clone(),
        boss_hp: battle_state.boss_hp(),
        boss_max_hp: battle_state.boss_max_hp(),
        player_hp: battle_state.player_hp(),
        seconds_elapsed: battle_state.elapsed_seconds(),
        ingest: report,
        cumulative_damage,
        band_key,
        total_xp,
        seed,
    };

    match args.format.as_str() {
        "text" => {
            println!("Battle Result");
            println!("=============");
            println!("Outcome: {}", result.outcome);
            println!("Topic: {}", result.topic);
            println!("{}: {}/{} HP", result.boss, result.boss_hp, result.boss_max_hp);
            println!("Player: {} HP", result.player_hp);
            println!("Elapsed: {}s", result.seconds_elapsed);
            println!(
                "Chunks: {} captured, {} applied, {} stale, {} failed ({} timed out), {} late, {} cancelled",
                result.ingest.chunks_captured,
                result.ingest.chunks_applied,
                result.ingest.chunks_stale,
                result.ingest.chunks_failed,
                result.ingest.chunks_timed_out,
                result.ingest.chunks_late,
                result.ingest.chunks_cancelled
            );
            println!();
            println!("Proficiency damage: {} ({})", result.cumulative_damage, result.band_key);
            println!("XP: {}", result.total_xp);
            println!("Seed: {}", result.seed);
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ArenaConfig> {
    match path {
        Some(path) => ArenaConfig::load(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => ArenaConfig::load(Path::new(DEFAULT_CONFIG_PATH)),
        None => Ok(ArenaConfig::default()),
    }
}

/// Shrink every real-time interval; battle seconds stay battle seconds
fn compress_time(config: &ArenaConfig, speed: f64) -> ArenaConfig {
    let mut config = config.clone();
    config.ingest.chunk_interval_ms = scaled(config.ingest.chunk_interval_ms, speed);
    config.ingest.tick_interval_ms = scaled(config.ingest.tick_interval_ms, speed);
    config.ingest.analyzer_timeout_ms = scaled(config.ingest.analyzer_timeout_ms, speed);
    config
}

fn scaled(ms: u64, speed: f64) -> u64 {
    ((ms as f64 / speed).round() as u64).max(1)
}

fn print_entry(entry: &LogEntry) {
    eprintln!("  [{:>3}s] {:?}: {}", entry.elapsed_seconds, entry.speaker, entry.message);
}
