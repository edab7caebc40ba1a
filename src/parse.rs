//! Constrained-verdict extraction from messy LLM text.
//!
//! The plan and reflect stages both ask the model for one label out of a
//! small closed set (`YES`/`NO`, `RELEVANT`/`NOT_RELEVANT`). Models wrap
//! such verdicts in prose, bold, quotes, or `<think>` blocks; this module
//! digs the label out. A `None` result is a degraded-path signal, never an
//! error.

/// Full preprocessing applied to every verdict response: strip
/// `<think>`/`<thinking>` blocks, then trim whitespace.
pub fn preprocess(text: &str) -> String {
    let stripped = strip_think_tags(text);
    stripped.trim().to_string()
}

/// Strip all `<think>...</think>` and `<thinking>...</thinking>` blocks.
///
/// Handles complete blocks, incomplete blocks (no closing tag), and
/// multiple sequential blocks.
pub fn strip_think_tags(text: &str) -> String {
    let mut result = strip_tag_variant(text, "<think>", "</think>");
    result = strip_tag_variant(&result, "<thinking>", "</thinking>");
    result
}

fn strip_tag_variant(text: &str, open: &str, close: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find(open) {
        if let Some(end_offset) = result[start..].find(close) {
            let end = start + end_offset + close.len();
            result = format!("{}{}", &result[..start], &result[end..]);
        } else {
            // No closing tag — strip from open tag to end
            result = result[..start].to_string();
            break;
        }
    }
    result
}

/// Extract a single choice from a set of valid labels.
///
/// Handles common LLM response patterns:
/// - Direct match: `"RELEVANT"`
/// - Bold / quoted / parenthesized: `"**yes**"`, `"'NO'"`
/// - In prose: `"I would say this is relevant because..."`
///
/// Matching is case-insensitive. If multiple valid labels appear, the one
/// occurring earliest in the text wins. Underscores count as word
/// characters, so `RELEVANT` does not match inside `NOT_RELEVANT`.
///
/// # Examples
///
/// ```
/// use rag_agent::parse::parse_choice;
///
/// let verdict = parse_choice("The answer is RELEVANT.", &["RELEVANT", "NOT_RELEVANT"]);
/// assert_eq!(verdict, Some("RELEVANT"));
/// ```
pub fn parse_choice<'a>(response: &str, valid_choices: &[&'a str]) -> Option<&'a str> {
    let cleaned = preprocess(response);
    if cleaned.is_empty() {
        return None;
    }

    let lower = cleaned.to_lowercase();

    // Strip common wrappers for exact matching
    let stripped = lower
        .trim_matches(|c: char| c == '.' || c == '!' || c == ',' || c.is_whitespace())
        .trim_start_matches("**")
        .trim_end_matches("**")
        .trim_matches('"')
        .trim_matches('\'')
        .trim_matches('(')
        .trim_matches(')')
        .trim();

    // Strategy 1: exact match on stripped text
    for &choice in valid_choices {
        if stripped.eq_ignore_ascii_case(choice) {
            return Some(choice);
        }
    }

    // Strategy 2: stripped text starts with a choice at a word boundary
    for &choice in valid_choices {
        let choice_lower = choice.to_lowercase();
        if stripped.starts_with(&choice_lower) {
            let after = stripped.len().min(choice_lower.len());
            if after == stripped.len() || !is_word_byte(stripped.as_bytes()[after]) {
                return Some(choice);
            }
        }
    }

    // Strategy 3: word-boundary search in full text — earliest match wins
    let mut best: Option<(&'a str, usize)> = None;
    for &choice in valid_choices {
        let choice_lower = choice.to_lowercase();
        if let Some(pos) = find_word_boundary_match(&lower, &choice_lower) {
            match best {
                None => best = Some((choice, pos)),
                Some((_, best_pos)) if pos < best_pos => best = Some((choice, pos)),
                _ => {}
            }
        }
    }

    best.map(|(choice, _)| choice)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Find a word-boundary match of `needle` in `haystack`.
/// Returns the position of the first match, or None.
fn find_word_boundary_match(haystack: &str, needle: &str) -> Option<usize> {
    let h_bytes = haystack.as_bytes();
    let n_len = needle.len();
    let mut search_from = 0;

    while let Some(pos) = haystack[search_from..].find(needle) {
        let abs_pos = search_from + pos;
        let end_pos = abs_pos + n_len;

        let boundary_before = abs_pos == 0 || !is_word_byte(h_bytes[abs_pos - 1]);
        let boundary_after = end_pos >= haystack.len() || !is_word_byte(h_bytes[end_pos]);

        if boundary_before && boundary_after {
            return Some(abs_pos);
        }

        search_from = abs_pos + 1;
    }

    None
}
