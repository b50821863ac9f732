//! Text rewrites applied before statements are compiled: comments, unit conversions,
//! named constants. Every rewrite keeps the line structure so errors still point at the
//! source line.
use crate::errors::NexsysError;
use crate::units::{const_value, convert};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*""#).expect("valid comment regex"));
static CONVERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]]+?)->([^\[\]]+?)\]").expect("valid conversion regex")
});
static CONSTANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z_][A-Za-z0-9_]*)").expect("valid constant regex"));

/// Removes `"..."` comments. A comment spanning several lines leaves its newlines behind.
pub fn strip_comments(text: &str) -> String {
    COMMENT
        .replace_all(text, |caps: &Captures| "\n".repeat(caps[0].matches('\n').count()))
        .into_owned()
}

/// Applies `rewrite` to every match of `re`, stopping at the first failure.
fn try_replace_all<F>(re: &Regex, text: &str, mut rewrite: F) -> Result<String, NexsysError>
where
    F: FnMut(&Captures) -> Result<String, NexsysError>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        out.push_str(&text[last..whole.start]);
        out.push_str(&rewrite(&caps)?);
        last = whole.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Replaces `[from->to]` with the conversion factor, e.g. `[hr->s]` becomes `3.6e3`.
pub fn convert_units(text: &str) -> Result<String, NexsysError> {
    try_replace_all(&CONVERSION, text, |caps| {
        convert(&caps[1], &caps[2]).map(|factor| format!("{:e}", factor))
    })
}

/// Replaces `#name` with the value of the named constant.
pub fn substitute_constants(text: &str) -> Result<String, NexsysError> {
    try_replace_all(&CONSTANT, text, |caps| {
        const_value(&caps[1]).map(|value| format!("{:e}", value))
    })
}

/// All preprocessing steps in order. Errors are tagged with the line they occur on.
pub fn preprocess(text: &str) -> Result<String, NexsysError> {
    let text = strip_comments(text);
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let converted = convert_units(line)
            .and_then(|l| substitute_constants(&l))
            .map_err(|e| e.at_line(i + 1))?;
        out.push(converted);
    }
    Ok(out.join("\n"))
}
