//! Post-processing: deterministic cleanup of the model's raw response text
//! before it is parsed as JSON.
//!
//! Even with `responseMimeType: application/json` some models wrap the object
//! in a ```` ```json ```` fence or prefix it with a byte-order mark. These
//! rules remove packaging only; they never edit the JSON itself. Whatever
//! remains must still parse as a whole, otherwise the response is rejected.
//!
//! ## Rule Order
//!
//! Invisible characters go first so the fence regex sees a clean start of
//! input; trimming runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output.
///
/// 1. Strip invisible Unicode (BOM, zero-width spaces)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip one outer markdown fence (`json` or no language tag)
/// 4. Trim surrounding whitespace
pub fn clean_response(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = normalise_line_endings(&s);
    let s = strip_json_fences(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip invisible Unicode ──────────────────────────────────────────

const INVISIBLE: [char; 4] = ['\u{FEFF}', '\u{200B}', '\u{200C}', '\u{200D}'];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\n(.*?)\n?```\s*$").expect("valid fence regex")
});

fn strip_json_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}
