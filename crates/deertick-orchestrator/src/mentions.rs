//! Detection of the `@name`, `nick>` and `<model` tokens in an utterance.
//!
//! Matches must end on a token boundary so that `@gpt-4` does not select an
//! agent named `gpt-4o`.

/// Characters that can appear inside a model identifier or nickname.
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '/' | ':')
}

/// Whether `rest` (the text right after a candidate match) continues the name.
///
/// A `.` only continues the name when another name character follows it,
/// so sentence punctuation still ends a mention.
fn continues_name(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some('.') => chars.next().is_some_and(is_name_char),
        Some(c) => is_name_char(c),
        None => false,
    }
}

fn starts_token(before: &str) -> bool {
    before
        .chars()
        .next_back()
        .map_or(true, |c| !is_name_char(c) && c != '.')
}

/// Every occurrence of `needle` in `haystack` with the text before and after it.
fn occurrences<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
    haystack
        .match_indices(needle)
        .map(move |(at, m)| (&haystack[..at], &haystack[at + m.len()..]))
}

/// `@name` as a whole token, so `mail@m1` does not mention `m1`.
pub fn mentions(utterance: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let needle = format!("@{name}");
    let found = occurrences(utterance, &needle)
        .any(|(before, after)| starts_token(before) && !continues_name(after));
    found
}

/// `nickname>` at the start of a token.
pub fn addresses_nickname(utterance: &str, nickname: &str) -> bool {
    if nickname.is_empty() {
        return false;
    }
    let needle = format!("{nickname}>");
    let found = occurrences(utterance, &needle).any(|(before, _)| starts_token(before));
    found
}

/// `<model` followed by a token boundary.
pub fn addresses_model(utterance: &str, model: &str) -> bool {
    if model.is_empty() {
        return false;
    }
    let needle = format!("<{model}");
    let found = occurrences(utterance, &needle).any(|(_, after)| !continues_name(after));
    found
}
