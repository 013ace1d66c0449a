//! livelink - recompile, relink and load changed native code.

use std::io::BufRead;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use crossbeam::channel::{self, Receiver};

use livelink::cli::{Cli, Commands};
use livelink::dependency::{DependencyGraph, DependencyResolver, DepfileResolver};
use livelink::unit::{CompilationUnitParser, CompileCommandsParser};
use livelink::utils::plural::plural_count;
use livelink::{ConsoleListener, Live, LiveConfig, core, debug, log};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = LiveConfig::load(&cli).context("Failed to load configuration")?;

    match &cli.command {
        Commands::Watch { .. } => watch(config),
        Commands::Deps { inverse, .. } => print_dependencies(&config, *inverse),
    }
}

// =============================================================================
// Watch Command
// =============================================================================

/// Host the orchestrator until Ctrl+C. Every line on stdin requests a reload.
fn watch(config: LiveConfig) -> Result<()> {
    let tick = Duration::from_millis(config.live.tick_ms.max(1));
    let mut live = Live::new(Box::new(ConsoleListener::new()), config);
    let reload_requests = spawn_stdin_reader()?;

    log!("live"; "press Enter to reload, Ctrl+C to quit");
    while !core::is_shutdown() {
        live.update();
        if reload_requests.try_iter().count() > 0 {
            live.try_reload();
        }
        thread::sleep(tick);
    }

    // Flush what the last tick produced before teardown
    live.update();
    Ok(())
}

fn spawn_stdin_reader() -> Result<Receiver<()>> {
    let (tx, rx) = channel::unbounded();
    thread::Builder::new()
        .name("livelink-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                if line.is_err() || tx.send(()).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

// =============================================================================
// Deps Command
// =============================================================================

/// Build the dependency graph once and print it.
fn print_dependencies(config: &LiveConfig, inverse: bool) -> Result<()> {
    let database = config.compile_commands_path();
    debug!("deps"; "compilation database: {:?}", database);
    let mut parser = CompileCommandsParser::new(database);
    let units = parser
        .parse_units()
        .context("Cannot read compilation database")?;
    let resolver = DepfileResolver;

    let mut graph = DependencyGraph::new();
    for unit in &units {
        match resolver.dependencies(unit) {
            Ok(deps) => graph.record(&unit.source_path, deps),
            Err(e) => log!("warning"; "{}: {}", unit.source_path.display(), e.chain()),
        }
    }

    let entries = if inverse {
        graph.sorted_reverse()
    } else {
        graph.sorted_forward()
    };
    log!(
        "deps";
        "{} from {}",
        plural_count(entries.len(), if inverse { "file" } else { "unit" }),
        plural_count(units.len(), "compilation unit")
    );
    for (key, values) in entries {
        println!("{}", display(&config.root, key));
        for value in values {
            println!("  {}", display(&config.root, value));
        }
    }
    Ok(())
}

fn display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
