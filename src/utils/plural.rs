//! Pluralization for log messages.

/// Format count with noun, handling pluralization
///
/// - `plural_count(0, "unit")` -> `"0 units"`
/// - `plural_count(1, "unit")` -> `"1 unit"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
