//! File name normalization for label lookup.

use percent_encoding::percent_decode_str;
use unicode_normalization::UnicodeNormalization;

/// A UTF-8 bullet (`•`) that was decoded as Windows-1252 somewhere along the way.
const MOJIBAKE_BULLET: &str = "\u{e2}\u{20ac}\u{a2}";

/// Turns a raw file name into the key used to match videos against the label table.
///
/// This strips any leading directory, decodes `%xx` escapes, applies NFKC normalization, removes
/// the mis-decoded bullet `"â€¢"`, replaces spaces and slashes with underscores, and lowercases the
/// result. Names that only differ in their escaping or Unicode composition map to the same key.
pub fn normalize_name(name: &str) -> String {
    let base = name.rsplit_once('/').map_or(name, |(_, base)| base);
    let decoded = percent_decode_str(base).decode_utf8_lossy();
    decoded
        .nfkc()
        .collect::<String>()
        .replace(MOJIBAKE_BULLET, "")
        .replace([' ', '/'], "_")
        .to_lowercase()
}
