//! `storydaemon`: the thin CLI driver (§2, out of core scope functionally)
//! wiring `clap` argument parsing to the Tick Orchestrator, exactly as the
//! reference workspace ships `storyletc` alongside its library crates.
//! Contains no narrative logic of its own.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use sd_core::config::OrchestratorConfig;
use sd_llm::{InMemoryVectorIndex, NullLlmClient};
use sd_orchestrator::Orchestrator;
use sd_store::EntityStore;

#[derive(Parser, Debug)]
#[command(name = "storydaemon", about = "Autonomous long-form fiction generator")]
struct Cli {
    /// Project directory (defaults to the current directory).
    #[arg(long, short = 'p', global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one tick of the orchestrator against the project.
    Tick,
    /// Print the current project state summary.
    Status,
    /// List entities of a given kind (characters, locations, scenes, open-loops, beats).
    List {
        kind: String,
    },
    /// Print a single entity's full record as JSON.
    Inspect {
        /// e.g. "C0", "L2", "S003".
        id: String,
    },
    /// Restore the project directory from a checkpoint taken at `tick`.
    Restore {
        tick: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.project);

    let result = match cli.command {
        Command::Tick => run_tick(&cli.project),
        Command::Status => status(&cli.project),
        Command::List { kind } => list(&cli.project, &kind),
        Command::Inspect { id } => inspect(&cli.project, &id),
        Command::Restore { tick } => restore(&cli.project, tick),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Reads `logging.level`/`logging.json` from `config.yaml` if present, else
/// falls back to the documented defaults (§6). The core never installs a
/// subscriber itself; only this binary does.
fn init_logging(project: &PathBuf) {
    let config = load_config(project).unwrap_or_default();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

fn load_config(project: &PathBuf) -> Result<OrchestratorConfig, String> {
    let path = project.join("config.yaml");
    if !path.exists() {
        return Ok(OrchestratorConfig::default());
    }
    let raw = std::fs::read_to_string(&path).map_err(|e| format!("reading {}: {e}", path.display()))?;
    OrchestratorConfig::from_yaml_str(&raw).map_err(|e| format!("parsing {}: {e}", path.display()))
}

/// The real `LlmClient`/`VectorIndex` transports are external collaborators
/// named only by interface (§1); this driver has nothing to link against
/// them with, so it runs the orchestrator against the in-workspace test
/// doubles. A production deployment wires a real adapter crate in here.
fn run_tick(project: &PathBuf) -> Result<(), String> {
    let config = load_config(project)?;
    let llm = NullLlmClient::new("no LLM transport configured for this CLI build");
    let index = InMemoryVectorIndex::new();
    let orchestrator = Orchestrator::new(project.clone(), config, &llm, &index);

    match orchestrator.run_tick() {
        Ok(report) => {
            println!(
                "tick {} -> scene {} ({} words{})",
                report.tick,
                report.scene_id,
                report.word_count,
                report
                    .tension_level
                    .map(|t| format!(", tension {t}"))
                    .unwrap_or_default()
            );
            if report.checkpoint_taken {
                println!("checkpoint taken");
            }
            for warning in &report.warnings {
                println!("warning: {warning:?}");
            }
            Ok(())
        }
        Err(err) => Err(format!(
            "tick failed ({}): {err}; see errors/ for the persisted record",
            err.kind()
        )),
    }
}

fn status(project: &PathBuf) -> Result<(), String> {
    let store = EntityStore::new(project.clone());
    let state = store.load_state().map_err(|e| e.to_string())?;
    println!("novel:          {}", state.novel_name);
    println!("project id:     {}", state.project_id);
    println!("current tick:   {}", state.current_tick);
    println!(
        "active char:    {}",
        state
            .active_character
            .map(|c| c.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    if let Some(goal) = &state.story_goals.primary {
        println!("primary goal:   {} (since tick {})", goal.description, goal.promoted_at_tick);
    }
    if let Some(last) = state.tension_history.last() {
        println!("last tension:   {} ({:?})", last.level, last.category);
    }
    Ok(())
}

fn list(project: &PathBuf, kind: &str) -> Result<(), String> {
    let store = EntityStore::new(project.clone());
    match kind {
        "characters" => {
            for c in store.list_characters().map_err(|e| e.to_string())? {
                println!("{}\t{}\t{}", c.id, c.full_name(), c.role);
            }
        }
        "locations" => {
            for l in store.list_locations().map_err(|e| e.to_string())? {
                println!("{}\t{}", l.id, l.name);
            }
        }
        "scenes" => {
            for s in store.list_scenes().map_err(|e| e.to_string())? {
                println!("{}\ttick {}\t{}\t{} words", s.id, s.tick, s.title, s.word_count);
            }
        }
        "open-loops" => {
            for l in store.load_open_loops().map_err(|e| e.to_string())? {
                println!("{:?}\t{:?}\t{}", l.status, l.importance, l.description);
            }
        }
        "beats" => {
            let outline = store.load_plot_outline().map_err(|e| e.to_string())?;
            for b in &outline.beats {
                println!("{}\t{:?}\t{}", b.id, b.status, b.description);
            }
        }
        "factions" => {
            for f in store.list_factions().map_err(|e| e.to_string())? {
                println!("{}\t{}", f.id, f.name);
            }
        }
        "lore" => {
            for l in store.list_lore().map_err(|e| e.to_string())? {
                println!("{}\t{}", l.id, l.fact);
            }
        }
        other => return Err(format!("unknown list kind: {other} (expected one of characters, locations, scenes, open-loops, beats, factions, lore)")),
    }
    Ok(())
}

fn inspect(project: &PathBuf, id: &str) -> Result<(), String> {
    let store = EntityStore::new(project.clone());
    let value = inspect_value(&store, id)?;
    println!("{}", serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?);
    Ok(())
}

fn inspect_value(store: &EntityStore, id: &str) -> Result<serde_json::Value, String> {
    use sd_core::ids::{CharacterId, FactionId, LocationId, LoreId, SceneId};

    if let Ok(parsed) = id.parse::<CharacterId>() {
        return serde_json::to_value(store.load_character(parsed).map_err(|e| e.to_string())?).map_err(|e| e.to_string());
    }
    if let Ok(parsed) = id.parse::<LocationId>() {
        return serde_json::to_value(store.load_location(parsed).map_err(|e| e.to_string())?).map_err(|e| e.to_string());
    }
    if let Ok(parsed) = id.parse::<SceneId>() {
        return serde_json::to_value(store.load_scene(parsed).map_err(|e| e.to_string())?).map_err(|e| e.to_string());
    }
    if let Ok(parsed) = id.parse::<FactionId>() {
        return serde_json::to_value(store.load_faction(parsed).map_err(|e| e.to_string())?).map_err(|e| e.to_string());
    }
    if let Ok(parsed) = id.parse::<LoreId>() {
        return serde_json::to_value(store.load_lore(parsed).map_err(|e| e.to_string())?).map_err(|e| e.to_string());
    }
    Err(format!("unrecognized id format: {id}"))
}

fn restore(project: &PathBuf, tick: u64) -> Result<(), String> {
    let paths = sd_store::ProjectPaths::new(project.clone());
    let checkpointer = sd_orchestrator::Checkpointer::new(&paths);
    checkpointer.restore_directory(tick).map_err(|e| e.to_string())?;
    println!("restored project directory from checkpoint at tick {tick}");
    Ok(())
}
