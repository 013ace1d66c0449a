//! Make-style depfile reader (`-MD -MF <file>` output of gcc and clang).
//!
//! ```text
//! obj/a.o: ../src/a.cpp ../src/common.h \
//!   /usr/include/my\ lib/x.h
//! ../src/common.h:
//! ```
//!
//! Only the first rule is read; the phony rules `-MP` appends list files the
//! first rule already names.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::DependencyResolver;
use crate::core::ToolError;
use crate::unit::CompilationUnit;
use crate::utils::path::resolve_path;

/// Resolves dependencies from the depfile the compiler wrote for a unit.
///
/// A unit that was never compiled has no depfile yet; it depends on its own
/// source only.
#[derive(Debug, Default, Clone, Copy)]
pub struct DepfileResolver;

impl DependencyResolver for DepfileResolver {
    fn dependencies(&self, unit: &CompilationUnit) -> Result<Vec<PathBuf>, ToolError> {
        let content = match fs::read_to_string(&unit.depfile_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(vec![unit.source_path.clone()]);
            }
            Err(e) => return Err(ToolError::Io(unit.depfile_path.clone(), e)),
        };

        let mut deps = vec![unit.source_path.clone()];
        for dep in parse_depfile(&content) {
            let dep = resolve_path(&PathBuf::from(dep), &unit.working_dir);
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        Ok(deps)
    }
}

/// Prerequisites of the first rule, unescaped, in file order.
fn parse_depfile(content: &str) -> Vec<String> {
    let joined = content.replace("\\\r\n", " ").replace("\\\n", " ");
    let Some(rule) = joined.lines().find(|line| !line.trim().is_empty()) else {
        return Vec::new();
    };
    match target_end(rule) {
        Some(end) => split_prerequisites(&rule[end + 1..]),
        None => Vec::new(),
    }
}

/// Index of the `:` ending the target list. Drive letters (`C:\`) are not
/// followed by whitespace, which tells them apart.
fn target_end(rule: &str) -> Option<usize> {
    let bytes = rule.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b':'
            && (i == 0 || bytes[i - 1] != b'\\')
            && bytes.get(i + 1).is_none_or(|c| c.is_ascii_whitespace())
    })
}

fn split_prerequisites(list: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = list.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some(' ' | '#' | '\\')) => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '$' if chars.peek() == Some(&'$') => {
                chars.next();
                current.push('$');
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
