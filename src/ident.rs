//! External transaction-identifier generation
/// Identifier issued when there is no usable prior identifier.
pub const SEED_IDENTIFIER: &str = "T00001";

/// Produce the next external transaction identifier from the most recent one.
///
/// The canonical algorithm is prefix-aware: an identifier of the form
/// `<alphabetic prefix><numeric suffix>` increments the suffix and re-pads
/// it to the original width, growing the width instead of truncating when
/// the value outgrows it (`T00042` -> `T00043`, `T99999` -> `T100000`).
/// An identifier that is a bare integer increments with its zero-padding
/// width preserved. Anything else, or no prior identifier at all, yields
/// [`SEED_IDENTIFIER`].
///
/// This is a pure function over the single last-identifier value. It makes
/// no uniqueness guarantee under concurrent callers; the persistence
/// layer's uniqueness constraint does, and callers retry generation on a
/// conflict.
pub fn next_identifier(last: Option<&str>) -> String {
    let Some(last) = last.map(str::trim).filter(|s| !s.is_empty()) else {
        return SEED_IDENTIFIER.to_owned();
    };

    if let Some((prefix, suffix)) = split_prefixed(last) {
        if let Ok(n) = suffix.parse::<u64>() {
            return format!("{prefix}{:0width$}", n + 1, width = suffix.len());
        }
    }

    // bare-integer fallback, zero-padding width preserved
    if last.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = last.parse::<u64>() {
            return format!("{:0width$}", n + 1, width = last.len());
        }
    }

    SEED_IDENTIFIER.to_owned()
}

// splits `<alphabetic prefix><numeric suffix>`, both parts non-empty
fn split_prefixed(id: &str) -> Option<(&str, &str)> {
    let digits_at = id.find(|c: char| c.is_ascii_digit())?;
    let (prefix, suffix) = id.split_at(digits_at);
    if prefix.is_empty()
        || !prefix.chars().all(|c| c.is_ascii_alphabetic())
        || !suffix.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    Some((prefix, suffix))
}
