//! Orator Arena - Entry Point
//!
//! Interactive text duel against the boss. Every line you type that is not a
//! command is one chunk of speech: it is analysed, scored and thrown at the
//! boss. The battle clock only moves when you `tick` it.

use orator_arena::analysis::{Analyzer, Chunk, HttpAnalyzer, TranscriptAnalyzer};
use orator_arena::battle::{topic_catalog, find_topic, BattleConfig, BattlePhase, LogEntry};
use orator_arena::core::error::{ArenaError, Result};
use orator_arena::core::types::{ChunkSeq, UserId};
use orator_arena::core::ArenaConfig;
use orator_arena::progress::InMemoryProgressStore;
use orator_arena::scoring::BandTable;
use orator_arena::session::{spawn_session, BattleSnapshot, SessionHandle};

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "data/arena.toml";

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orator_arena=info")))
        .init();

    tracing::info!("Orator Arena starting...");

    let config = if Path::new(CONFIG_PATH).exists() {
        ArenaConfig::load(Path::new(CONFIG_PATH))?
    } else {
        ArenaConfig::default()
    };

    // Create the async runtime for the session task and analyzer calls
    let rt = Runtime::new()?;
    let _guard = rt.enter();

    // Remote analysis if configured, otherwise offline heuristics
    let analyzer: Arc<dyn Analyzer> = match HttpAnalyzer::from_env() {
        Ok(client) => Arc::new(client.with_markers(config.scoring.discourse_markers.clone())),
        Err(_) => {
            tracing::warn!("ANALYZER_URL not set - using the offline transcript analyzer");
            Arc::new(TranscriptAnalyzer::from_config(&config.scoring))
        }
    };
    let watchdog = Duration::from_millis(config.ingest.analyzer_timeout_ms);

    let user = UserId::new(std::env::var("USER").unwrap_or_else(|_| "player".into()));
    let store = Arc::new(InMemoryProgressStore::default());
    let handle = spawn_session(config.clone(), user, store);
    let bands = BandTable::standard();

    println!("\n=== ORATOR ARENA ===");
    println!("{}, {}, awaits.", config.boss.name, config.boss.title);
    print_help();

    let mut seq = ChunkSeq::NONE;

    loop {
        let snapshot = handle.snapshot();
        display_status(&snapshot);

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = match input.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command {
            "quit" | "q" => break,
            "help" | "h" => print_help(),
            "topics" => {
                for topic in topic_catalog() {
                    println!(
                        "  {}. {} [{}, {}s, {} XP]",
                        topic.id, topic.title, topic.difficulty, topic.time_limit_seconds, topic.xp_reward
                    );
                }
            }
            "start" => {
                let Some(topic) = rest.parse::<u32>().ok().and_then(find_topic) else {
                    println!("Usage: start <topic id> (see `topics`)");
                    continue;
                };
                println!("\n{}\n{}\n", topic.title, topic.prompt);
                let battle = BattleConfig::for_topic(topic, &config);
                match rt.block_on(handle.start_battle(battle)) {
                    Ok(()) => {
                        seq = ChunkSeq::NONE;
                        print_new_entries(&handle, 0);
                    }
                    Err(e) => println!("Cannot start: {}", e),
                }
            }
            "tick" | "t" => {
                let n = if rest.is_empty() { 1 } else { rest.parse::<u32>().unwrap_or(0) };
                if n == 0 {
                    println!("Usage: tick [seconds]");
                    continue;
                }
                let before = handle.snapshot().battle.combat_log().len();
                for _ in 0..n {
                    match rt.block_on(handle.tick()) {
                        Ok(BattlePhase::Active) => {}
                        Ok(_) => break,
                        Err(e) => {
                            println!("Clock not running: {}", e);
                            break;
                        }
                    }
                }
                print_new_entries(&handle, before);
            }
            "retreat" => match rt.block_on(handle.retreat()) {
                Ok(()) => println!("You retreat from the citadel. The battle is forfeit."),
                Err(e) => println!("Nothing to retreat from: {}", e),
            },
            "ack" => match rt.block_on(handle.acknowledge()) {
                Ok(outcome) => println!("{:?} acknowledged. Back to the lobby.", outcome),
                Err(e) => println!("Nothing to acknowledge: {}", e),
            },
            "status" | "s" => display_detailed_status(&handle.snapshot()),
            "band" => match rt.block_on(handle.progress()) {
                Ok(Some(record)) => {
                    let band = bands.lookup(record.cumulative_damage);
                    println!(
                        "{} {} (band {:.1}) - {} proficiency damage, {} XP",
                        band.icon, band.label, band.score, record.cumulative_damage, record.total_xp
                    );
                    println!("  {}", band.feedback);
                }
                Ok(None) => println!("No progress recorded yet."),
                Err(e) => println!("Progress unavailable: {}", e),
            },
            _ => {
                // Anything else is speech
                if !handle.snapshot().battle.phase().is_active() {
                    println!("Unknown command. Type `help`, or `start <topic>` to fight.");
                    continue;
                }
                seq = seq.next();
                let snapshot = handle.snapshot();
                let mut chunk = Chunk::text(seq, snapshot.session, input);
                if let Some(topic) = snapshot.battle.topic() {
                    chunk = chunk.with_topic(topic.title.clone());
                }

                let before = snapshot.battle.combat_log().len();
                let analysis = rt.block_on(async {
                    match tokio::time::timeout(watchdog, analyzer.analyze(&chunk)).await {
                        Ok(result) => result,
                        Err(_) => Err(ArenaError::AnalyzerTimeout {
                            seq,
                            timeout_ms: watchdog.as_millis() as u64,
                        }),
                    }
                });
                match analysis {
                    Ok(analysis) => {
                        if let Err(e) = rt.block_on(handle.submit_analysis(seq, analysis)) {
                            println!("Chunk ignored: {}", e);
                        }
                    }
                    Err(e) => {
                        println!("Analysis failed, chunk dropped: {}", e);
                        match rt.block_on(handle.report_failure(seq, e.to_string())) {
                            Ok(true) => println!("Analysis is running behind; keep speaking."),
                            Ok(false) => {}
                            Err(e) => println!("Failure not recorded: {}", e),
                        }
                    }
                }
                print_new_entries(&handle, before);
            }
        }
    }

    println!("\nGoodbye! Keep speaking.");
    Ok(())
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  topics          - List speaking topics");
    println!("  start <n>       - Start a battle on topic n");
    println!("  tick / t [n]    - Advance the battle clock n seconds");
    println!("  retreat         - Abandon the current battle");
    println!("  ack             - Acknowledge victory/defeat and return to the lobby");
    println!("  status / s      - Show the full battle state");
    println!("  band            - Show your proficiency band");
    println!("  quit / q        - Exit");
    println!("  <any text>      - Speak! (during a battle)");
    println!();
}

fn print_entry(entry: &LogEntry) {
    println!("  [{:>3}s] {}", entry.elapsed_seconds, entry.message);
}

fn print_new_entries(handle: &SessionHandle, from: usize) {
    let snapshot = handle.snapshot();
    for entry in snapshot.battle.combat_log().entries().iter().skip(from) {
        print_entry(entry);
    }
}

/// Display a brief status line
fn display_status(snapshot: &BattleSnapshot) {
    let battle = &snapshot.battle;
    match battle.phase() {
        BattlePhase::Lobby => println!("\n--- Lobby ---"),
        phase => println!(
            "\n--- {:?} | Boss {}/{} ({}) | You {} HP | {}s left | streak {} ---",
            phase,
            battle.boss_hp(),
            battle.boss_max_hp(),
            battle.boss_phase().label(),
            battle.player_hp(),
            battle.seconds_remaining(),
            snapshot.streak.consecutive_high_skill()
        ),
    }
}

/// Display the whole battle state, combat log included
fn display_detailed_status(snapshot: &BattleSnapshot) {
    let battle = &snapshot.battle;
    println!();
    println!("=== Battle {} ===", snapshot.session);
    println!("Phase: {:?}", battle.phase());
    if let Some(topic) = battle.topic() {
        println!("Topic: {}", topic.title);
    }
    println!(
        "{}: {}/{} HP ({})",
        battle.config().boss.name,
        battle.boss_hp(),
        battle.boss_max_hp(),
        battle.boss_phase().label()
    );
    println!("You: {} HP", battle.player_hp());
    println!("Clock: {}s remaining", battle.seconds_remaining());
    println!(
        "Streak: {} (x{:.1})",
        snapshot.streak.consecutive_high_skill(),
        snapshot.streak.current_multiplier()
    );
    println!("Last applied chunk: {}", battle.last_applied_seq());
    println!();
    for entry in battle.combat_log().entries() {
        print_entry(entry);
    }
    println!();
}
