//! URL slugs for skill records.

use rand::RngCore;

/// Symbols that are spelled out rather than dropped.
fn symbol_word(ch: char) -> Option<&'static str> {
    match ch {
        '&' => Some("and"),
        '|' => Some("or"),
        '<' => Some("less"),
        '>' => Some("greater"),
        '$' => Some("dollar"),
        '%' => Some("percent"),
        '€' => Some("euro"),
        '£' => Some("pound"),
        '¥' => Some("yen"),
        '¢' => Some("cent"),
        '∞' => Some("infinity"),
        '♥' => Some("love"),
        _ => None,
    }
}

/// Derive a slug from free text.
///
/// Non-ASCII characters are transliterated (`é` becomes `e`, `ß` becomes
/// `ss`) and a few symbols are spelled out (`&` becomes `and`). The result
/// is lower-cased, whitespace and hyphens collapse into single `-`
/// separators, and any other character is dropped. Leading and trailing
/// separators are trimmed, so the result may be empty.
pub fn make_slug(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    let mut push = |text: &str| {
        for ch in text.chars() {
            if ch.is_ascii_alphanumeric() {
                cleaned.push(ch.to_ascii_lowercase());
            } else if ch.is_whitespace() || ch == '-' {
                cleaned.push(' ');
            }
        }
    };
    for ch in input.chars() {
        if let Some(word) = symbol_word(ch) {
            push(word);
        } else if ch.is_ascii() {
            push(&*ch.encode_utf8(&mut [0u8; 4]));
        } else if ch.is_whitespace() {
            push(" ");
        } else if let Some(ascii) = deunicode::deunicode_char(ch) {
            push(ascii);
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}

/// `bytes` random bytes rendered as lowercase hex.
pub fn random_suffix(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Append a random hex suffix to `base` to avoid slug collisions.
pub fn disambiguate(base: &str, bytes: usize) -> String {
    format!("{}-{}", base, random_suffix(bytes))
}
