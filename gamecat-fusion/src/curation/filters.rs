// Content and locale filters
//
// Both filters over-exclude deliberately: there is no exceptions list.

use crate::record::FusedRecord;

/// Code point ranges treated as non-Latin script
const NON_LATIN_RANGES: [(u32, u32); 11] = [
    (0x0370, 0x03FF), // Greek
    (0x0400, 0x04FF), // Cyrillic
    (0x0590, 0x05FF), // Hebrew
    (0x0600, 0x06FF), // Arabic
    (0x0E00, 0x0E7F), // Thai
    (0x1100, 0x11FF), // Hangul Jamo
    (0x3040, 0x309F), // Hiragana
    (0x30A0, 0x30FF), // Katakana
    (0x3400, 0x4DBF), // CJK extension A
    (0x4E00, 0x9FFF), // CJK unified ideographs
    (0xAC00, 0xD7AF), // Hangul syllables
];

/// True when the display name contains any non-Latin script code point
pub fn has_non_latin(name: &str) -> bool {
    name.chars().any(|c| {
        let cp = c as u32;
        NON_LATIN_RANGES
            .iter()
            .any(|&(start, end)| (start..=end).contains(&cp))
    })
}

/// Returns the first denylisted keyword found in name + genre text
pub fn denylist_hit<'a>(record: &FusedRecord, denylist: &'a [String]) -> Option<&'a str> {
    let mut text = record.name.to_lowercase();
    if let Some(genres) = &record.taxonomy.genres {
        text.push(' ');
        text.push_str(&genres.to_lowercase());
    }
    denylist
        .iter()
        .map(String::as_str)
        .find(|keyword| !keyword.is_empty() && text.contains(&keyword.to_lowercase()))
}
