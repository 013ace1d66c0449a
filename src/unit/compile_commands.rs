//! `compile_commands.json` reader.
//!
//! Understands both entry shapes CMake, Ninja and Bear emit:
//!
//! ```json
//! { "directory": "/b", "file": "../src/a.cpp", "arguments": ["c++", "-c", "../src/a.cpp", "-o", "a.o"] }
//! { "directory": "/b", "file": "../src/a.cpp", "command": "c++ -c ../src/a.cpp -o a.o" }
//! ```

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::{CompilationUnit, CompilationUnitParser, UnitsDelta};
use crate::core::ToolError;
use crate::utils::path::{normalize_path, resolve_path};

#[derive(Debug, Deserialize)]
struct Entry {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    arguments: Vec<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    output: Option<PathBuf>,
}

/// Depfile options the compiler invocation re-adds itself.
const DEPFILE_FLAGS: &[&str] = &["-MD", "-MMD", "-MP"];
/// Target options followed by a value. `-MF` is kept as the unit's depfile.
const DEPFILE_FLAGS_WITH_VALUE: &[&str] = &["-MT", "-MQ"];

/// Parses units from a compilation database and diffs it when it changes.
#[derive(Debug)]
pub struct CompileCommandsParser {
    path: Option<PathBuf>,
    units: FxHashMap<PathBuf, CompilationUnit>,
}

impl CompileCommandsParser {
    /// `path` is `None` when no database could be located.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.map(|p| normalize_path(&p)),
            units: FxHashMap::default(),
        }
    }

    fn read(&self) -> Result<FxHashMap<PathBuf, CompilationUnit>, ToolError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| ToolError::NotFound("compile_commands.json".into()))?;
        let content = fs::read_to_string(path).map_err(|e| ToolError::Io(path.clone(), e))?;
        let entries: Vec<Entry> =
            serde_json::from_str(&content).map_err(|e| ToolError::Json(path.clone(), e))?;

        Ok(entries
            .into_iter()
            .filter_map(parse_entry)
            .map(|unit| (unit.source_path.clone(), unit))
            .collect())
    }
}

impl CompilationUnitParser for CompileCommandsParser {
    fn parse_units(&mut self) -> Result<Vec<CompilationUnit>, ToolError> {
        self.units = self.read()?;
        let mut units: Vec<_> = self.units.values().cloned().collect();
        units.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        Ok(units)
    }

    fn update_units(&mut self, changed: &Path) -> Result<UnitsDelta, ToolError> {
        if self.path.as_deref() != Some(normalize_path(changed).as_path()) {
            return Ok(UnitsDelta::default());
        }

        let fresh = self.read()?;
        let delta = diff(&self.units, &fresh);
        self.units = fresh;
        Ok(delta)
    }
}

/// Compare two unit tables, sorted by source path within each group.
fn diff(
    old: &FxHashMap<PathBuf, CompilationUnit>,
    new: &FxHashMap<PathBuf, CompilationUnit>,
) -> UnitsDelta {
    let mut delta = UnitsDelta::default();
    for (source, unit) in new {
        match old.get(source) {
            None => delta.added.push(unit.clone()),
            Some(previous) if previous != unit => delta.modified.push(unit.clone()),
            Some(_) => {}
        }
    }
    delta.removed = old
        .keys()
        .filter(|source| !new.contains_key(*source))
        .cloned()
        .collect();

    delta.added.sort_by(|a, b| a.source_path.cmp(&b.source_path));
    delta.modified.sort_by(|a, b| a.source_path.cmp(&b.source_path));
    delta.removed.sort();
    delta
}

/// Turn one database entry into a unit. Entries without an object file
/// can't be relinked and are skipped.
fn parse_entry(entry: Entry) -> Option<CompilationUnit> {
    let args = if entry.arguments.is_empty() {
        split_command(entry.command.as_deref()?)
    } else {
        entry.arguments
    };
    let (compiler, rest) = args.split_first()?;

    let working_dir = normalize_path(&entry.directory);
    let source_path = resolve_path(&entry.file, &working_dir);

    let mut flags = Vec::new();
    let mut obj = entry.output;
    let mut depfile = None;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-c" => {}
            "-o" => obj = iter.next().map(PathBuf::from),
            "-MF" => depfile = iter.next().map(PathBuf::from),
            a if a.len() > 3 && a.starts_with("-MF") => depfile = Some(PathBuf::from(&a[3..])),
            a if DEPFILE_FLAGS.contains(&a) => {}
            a if DEPFILE_FLAGS_WITH_VALUE.contains(&a) => {
                iter.next();
            }
            a if !a.starts_with('-') && resolve_path(Path::new(a), &working_dir) == source_path => {}
            _ => flags.push(arg.clone()),
        }
    }

    let obj_path = resolve_path(&obj?, &working_dir);
    let depfile_path = match depfile {
        Some(path) => resolve_path(&path, &working_dir),
        None => default_depfile(&obj_path),
    };
    Some(CompilationUnit {
        depfile_path,
        obj_path,
        source_path,
        compiler: compiler.clone(),
        flags,
        working_dir,
    })
}

/// `<obj>.d`, the name CMake and Ninja give depfiles (`a.cpp.o` → `a.cpp.o.d`).
pub(crate) fn default_depfile(obj_path: &Path) -> PathBuf {
    let mut name = obj_path.as_os_str().to_owned();
    name.push(".d");
    PathBuf::from(name)
}

/// Split a shell command line, honoring quotes and backslash escapes.
fn split_command(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        args.push(current);
    }
    args
}
