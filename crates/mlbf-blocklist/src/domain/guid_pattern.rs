//! GUID pattern decomposition
//!
//! Legacy blocklist entries may name their add-ons with an alternation regex
//! of the form `^((id1)|(id2)|...|(idN))$`. Matching such a pattern against
//! every known GUID is a full scan; turning it into an explicit list lets the
//! lookup be an exact-match index probe instead.
//!
//! Decomposition is strict. Anything that is not a plain
//! enumeration of literal IDs (`\d`, `\w`, quantifiers, nested groups) yields
//! `None` and the caller falls back to regex matching.

use std::sync::LazyLock;

use regex::Regex;

/// One `( ... )` group: alphanumerics, `_`, `-`, `{`, `}`, `@`, `.` and
/// backslashes (needed to escape the braces and dots).
const ID_GROUP: &str = r"\([\\\w.{}@-]+\)";

/// `^` then one or more ID groups joined by `|`, optionally wrapped in one
/// outer pair of parens, then `$`. The outer parens are all-or-nothing.
static MULTIPLE_IDS: LazyLock<Regex> = LazyLock::new(|| {
    let list = format!(r"{ID_GROUP}(?:\|{ID_GROUP})*");
    Regex::new(&format!(r"^\^(?:\(({list})\)|({list}))\$$"))
        .expect("alternation grammar is a valid regex")
});

/// A backslash followed by anything other than a literal `.`, `{` or `}`.
static ESCAPE_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[^.{}]").expect("escape grammar is a valid regex"));

/// Split an alternation regex into its literal GUIDs, preserving order.
///
/// Returns `None` when the pattern cannot be safely decomposed; callers must
/// then match the pattern as a regex rather than treat it as an error.
pub fn split_regex_to_list(guid_re: &str) -> Option<Vec<String>> {
    if ESCAPE_SEQUENCE.is_match(guid_re) {
        return None;
    }
    let captures = MULTIPLE_IDS.captures(guid_re)?;
    let body = captures.get(1).or_else(|| captures.get(2))?.as_str();

    // body is "(id1)|(id2)|..."; drop the first "(" and the last ")".
    let inner = body.strip_prefix('(')?.strip_suffix(')')?;
    let unescaped = inner.replace('\\', "");

    Some(unescaped.split(")|(").map(str::to_owned).collect())
}

/// Join literal GUIDs into the canonical alternation form, escaping dots.
///
/// `split_regex_to_list(&join_guids_to_regex(ids))` returns `ids` for any
/// list of IDs drawn from the allowed character set.
pub fn join_guids_to_regex<S: AsRef<str>>(guids: &[S]) -> String {
    let groups: Vec<String> = guids
        .iter()
        .map(|g| format!("({})", g.as_ref().replace('.', r"\.")))
        .collect();
    format!("^({})$", groups.join("|"))
}

/// Backslash-escape every `{` and `}` that is not already escaped.
///
/// Legacy records store braces bare; regex engines and the decomposer both
/// expect them escaped.
pub fn escape_braces(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut prev_backslash = false;
    for c in pattern.chars() {
        if (c == '{' || c == '}') && !prev_backslash {
            out.push('\\');
        }
        prev_backslash = c == '\\' && !prev_backslash;
        out.push(c);
    }
    out
}
