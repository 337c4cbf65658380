//! Name normalization
//!
//! Derives the [`CanonicalKey`] used both for within-source deduplication and
//! for the cross-source join, and classifies bundle/junk listings.
//!
//! Collisions between keys are intentional: two names that reduce to the same
//! key are treated as the same underlying product.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trademark, registered and copyright glyphs
const GLYPHS: [char; 3] = ['\u{00AE}', '\u{2122}', '\u{00A9}'];

/// Edition / variant phrases removed before keying (lower-case, ASCII)
const EDITION_PHRASES: [&str; 10] = [
    "standard edition",
    "deluxe edition",
    "gold edition",
    "ultimate edition",
    "game of the year edition",
    "goty",
    "directors cut",
    "remastered",
    "anniversary edition",
    "complete edition",
];

/// Bundle markers (lower-case substrings)
const BUNDLE_MARKERS: [&str; 6] = [
    "bundle",
    " pack",
    "collection",
    "season pass",
    "dlc",
    "franchise",
];

/// Non-primary-release markers (lower-case substrings)
const JUNK_MARKERS: [&str; 9] = [
    "prologue",
    "playtest",
    "demo",
    "soundtrack",
    " artbook",
    "server",
    "beta",
    "test branch",
    "public test",
];

/// Normalized matching key derived from a display name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the name contained no ASCII letters or digits at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a free-text product name into a matching key
///
/// Strips trademark glyphs, removes whole-word edition phrases, then
/// lower-cases and keeps only `[a-z0-9]`. Returns `None` for a missing name. Pure and total.
pub fn normalize(name: Option<&str>) -> Option<CanonicalKey> {
    let name = name?;
    let display = normalize_display_form(name);
    let key: String = display
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    Some(CanonicalKey(key))
}

/// Shorthand for [`normalize`] on a name that is known to be present
pub fn canonical_key(name: &str) -> CanonicalKey {
    normalize(Some(name)).unwrap_or_else(|| CanonicalKey(String::new()))
}

/// Human-readable cleaned name
///
/// Same glyph and edition-phrase removal as [`normalize`] but keeps the
/// original casing and punctuation, collapses whitespace and trims dangling
/// separators (`"Super Game: Deluxe Edition"` → `"Super Game"`).
/// Phrases only match on word boundaries. Idempotent: phrase removal runs to
/// a fixpoint.
pub fn normalize_display_form(name: &str) -> String {
    let mut chars: Vec<char> = collapse_whitespace(
        &name.chars().filter(|c| !GLYPHS.contains(c)).collect::<String>(),
    )
    .chars()
    .collect();

    loop {
        let mut changed = false;
        for phrase in EDITION_PHRASES {
            while let Some(start) = find_ascii_ci(&chars, phrase) {
                chars.drain(start..start + phrase.len());
                chars = collapse_whitespace(&chars.iter().collect::<String>())
                    .chars()
                    .collect();
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let collapsed = collapse_whitespace(&chars.into_iter().collect::<String>());
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '–' | '—' | ',' | '|'))
        .to_string()
}

/// True for bundles, season passes, DLC, prologues, demos, soundtracks, betas...
///
/// Case-insensitive substring membership. Over-exclusion is accepted
/// ("Demolition Derby" is flagged because it contains "demo").
pub fn is_bundle_or_junk(name: Option<&str>) -> bool {
    let Some(name) = name else {
        return false;
    };
    let lower = name.to_lowercase();
    BUNDLE_MARKERS
        .iter()
        .chain(JUNK_MARKERS.iter())
        .any(|marker| lower.contains(marker))
}

/// Locate an ASCII lower-case phrase in `chars` as a whole word, comparing
/// ASCII case-insensitively
fn find_ascii_ci(chars: &[char], phrase: &str) -> Option<usize> {
    let needle: Vec<char> = phrase.chars().collect();
    if needle.is_empty() || needle.len() > chars.len() {
        return None;
    }
    let is_boundary = |neighbor: Option<&char>| neighbor.map_or(true, |c| !c.is_alphanumeric());
    (0..=chars.len() - needle.len()).find(|&start| {
        let end = start + needle.len();
        needle
            .iter()
            .zip(&chars[start..end])
            .all(|(n, c)| c.is_ascii() && c.to_ascii_lowercase() == *n)
            && is_boundary(start.checked_sub(1).and_then(|i| chars.get(i)))
            && is_boundary(chars.get(end))
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
