//! Symbol tables via the system `nm`.
//!
//! Object file formats stay out of this crate: `nm` already knows ELF,
//! Mach-O and archives.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{ProgramInfoLoader, Symbol, Symbols};
use crate::core::ToolError;
use crate::utils::exec::Cmd;

#[derive(Debug, Clone)]
pub struct NmProgramInfoLoader {
    nm: String,
}

impl NmProgramInfoLoader {
    pub fn new(nm: impl Into<String>) -> Self {
        Self { nm: nm.into() }
    }

    fn run(&self, args: &[&str], path: &Path) -> Result<String, ToolError> {
        let output = Cmd::new(&self.nm)
            .args(args)
            .arg(path)
            .run()
            .map_err(ToolError::command)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for NmProgramInfoLoader {
    fn default() -> Self {
        Self::new("nm")
    }
}

impl ProgramInfoLoader for NmProgramInfoLoader {
    fn loaded_programs(&self) -> Vec<PathBuf> {
        std::env::current_exe().into_iter().collect()
    }

    fn program_symbols(&self, path: &Path) -> Result<Symbols, ToolError> {
        let listing = self.run(&["--defined-only", "-S"], path)?;
        Ok(parse_symbols(&listing))
    }

    fn exported_symbols(&self, object: &Path) -> Result<Vec<String>, ToolError> {
        let listing = self.run(&["-g", "--defined-only"], object)?;
        Ok(parse_lines(&listing).map(|line| line.name.to_string()).collect())
    }
}

// ============================================================================
// Parsing
// ============================================================================

struct NmLine<'a> {
    address: u64,
    size: u64,
    kind: char,
    name: &'a str,
}

/// `<address> [<size>] <type> <name>`
fn nm_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9a-fA-F]+)\s+(?:([0-9a-fA-F]+)\s+)?([A-Za-z])\s+(\S.*)$")
            .expect("valid nm regex")
    })
}

fn parse_lines(listing: &str) -> impl Iterator<Item = NmLine<'_>> {
    let re = nm_line_regex();
    listing.lines().filter_map(move |line| {
        let caps = re.captures(line.trim_end())?;
        let hex = |i: usize| {
            caps.get(i)
                .and_then(|m| u64::from_str_radix(m.as_str(), 16).ok())
        };
        Some(NmLine {
            address: hex(1)?,
            size: hex(2).unwrap_or(0),
            kind: caps.get(3)?.as_str().chars().next()?,
            name: caps.get(4)?.as_str(),
        })
    })
}

fn parse_symbols(listing: &str) -> Symbols {
    let mut symbols = Symbols::default();
    for line in parse_lines(listing) {
        let symbol = Symbol::new(line.name, line.address, line.size);
        match line.kind {
            'T' | 't' | 'W' => symbols.functions.push(symbol),
            'D' | 'd' | 'B' | 'b' | 'R' | 'r' | 'V' => symbols.variables.push(symbol),
            _ => {}
        }
    }
    symbols
}
