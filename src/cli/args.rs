//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// livelink - recompile, relink and load changed native code into a running process
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: livelink.toml, searched upward from cwd)
    #[arg(short = 'C', long, global = true, default_value = "livelink.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Host the orchestrator: watch, recompile, and reload on Enter or SIGUSR1
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        project: ProjectArgs,

        /// Reload when the process receives SIGUSR1
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        reload_on_signal: Option<bool>,

        /// Interval between update ticks in milliseconds
        #[arg(short, long)]
        tick_ms: Option<u64>,
    },

    /// Print the dependency graph built from the compilation database
    #[command(visible_alias = "d")]
    Deps {
        #[command(flatten)]
        project: ProjectArgs,

        /// Print the inverse map (file -> dependent units) instead
        #[arg(short, long)]
        inverse: bool,
    },
}

/// Project location arguments shared by all subcommands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Path to compile_commands.json
    #[arg(short = 'c', long, value_hint = clap::ValueHint::FilePath)]
    pub compile_commands: Option<PathBuf>,

    /// Directory to monitor (repeatable). Defaults to the common directory of all sources.
    #[arg(short = 'd', long = "dir", value_hint = clap::ValueHint::DirPath)]
    pub directories: Vec<PathBuf>,
}

impl Cli {
    pub const fn project(&self) -> &ProjectArgs {
        match &self.command {
            Commands::Watch { project, .. } | Commands::Deps { project, .. } => project,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch() {
        let cli = Cli::parse_from([
            "livelink",
            "watch",
            "-c",
            "build/compile_commands.json",
            "--dir",
            "src",
            "--dir",
            "include",
            "--reload-on-signal",
        ]);

        let project = cli.project();
        assert_eq!(
            project.compile_commands,
            Some(PathBuf::from("build/compile_commands.json"))
        );
        assert_eq!(project.directories.len(), 2);
        match cli.command {
            Commands::Watch {
                reload_on_signal, ..
            } => assert_eq!(reload_on_signal, Some(true)),
            Commands::Deps { .. } => panic!("expected watch"),
        }
    }

    #[test]
    fn test_parse_deps_with_global_flags() {
        let cli = Cli::parse_from(["livelink", "deps", "--inverse", "-V"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Deps { inverse: true, .. }));
        assert_eq!(cli.config, PathBuf::from("livelink.toml"));
    }
}
