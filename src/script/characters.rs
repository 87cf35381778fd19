/*!
 * Character extraction for cross-reference appendices.
 */

use super::model::ParsedUnit;

/// Characters that never appear in a real character name
const REJECTED_NAME_CHARS: &[char] = &['<', '>', '(', ')', '[', ']', '（', '）', '【', '】'];

/// Whether a speaker label looks like a character that may have records
///
/// Single-character labels and labels with bracket characters are engine
/// placeholders or stage markers rather than characters.
pub fn is_character_name(name: &str) -> bool {
    let name = name.trim();
    name.chars().count() >= 2 && !name.contains(REJECTED_NAME_CHARS)
}

/// Speaker names across `units` in first-occurrence order, without duplicates
pub fn referenced_characters<'a, I>(units: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ParsedUnit>,
{
    let mut names: Vec<String> = Vec::new();
    for unit in units {
        for speaker in unit.speakers() {
            if is_character_name(speaker) && !names.iter().any(|n| n == speaker) {
                names.push(speaker.to_string());
            }
        }
    }
    names
}
