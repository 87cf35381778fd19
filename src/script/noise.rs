/*!
 * Noise filter for raw script lines.
 *
 * Wiki script dumps interleave narrative text with embedded configuration
 * records, asset paths and resource identifiers. This filter removes those
 * lines before classification. Bracketed cue lines always pass through so
 * the classifier can tell descriptive cues from resource-only ones.
 */

use std::sync::LazyLock;

use regex::Regex;

use super::model::RawLine;

/// JSON scalar, or the opening of a nested object/array
const JSON_VALUE: &str = r#"(?:"(?:[^"\\]|\\.)*"|-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|true|false|null|\{|\[)"#;

/// One or more `"key": value` pairs, optionally wrapped in braces or followed by a comma
static CONFIG_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    let pair = format!(r#""(?:[^"\\]|\\.)*"\s*:\s*{}"#, JSON_VALUE);
    Regex::new(&format!(r"^[\{{\[]?\s*{pair}(?:\s*,\s*{pair})*\s*[,\}}\]]*\s*$", pair = pair))
        .expect("Invalid config fragment regex")
});

/// Lines made only of JSON punctuation, e.g. `{`, `},` or `]`
static JSON_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\{\}\[\],:\s]+$").expect("Invalid JSON punctuation regex")
});

static ASSET_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-]+(?:[/\\][A-Za-z0-9_.\-]+)+[/\\]?$").expect("Invalid asset path regex")
});

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://\S+$").expect("Invalid URL regex")
});

static RESOURCE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[$@]\S+$").expect("Invalid resource token regex")
});

/// Why a line was kept or discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseVerdict {
    Keep,
    Blank,
    ConfigFragment,
    AssetPath,
    ResourceToken,
}

impl NoiseVerdict {
    pub fn is_keep(self) -> bool {
        self == Self::Keep
    }
}

/// Stateless line filter
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseFilter;

impl NoiseFilter {
    pub fn new() -> Self {
        Self
    }

    /// Whether the line may carry narrative content
    pub fn keep(&self, line: &RawLine) -> bool {
        self.verdict(line).is_keep()
    }

    /// Apply the filter rules in order; the first match wins
    pub fn verdict(&self, line: &RawLine) -> NoiseVerdict {
        let text = line.text.trim();

        if text.is_empty() {
            return NoiseVerdict::Blank;
        }

        if JSON_PUNCTUATION.is_match(text) || CONFIG_FRAGMENT.is_match(text) {
            return NoiseVerdict::ConfigFragment;
        }

        // Cue lines are judged by the classifier, even when they hold resource-like text
        if starts_with_bracket(text) {
            return NoiseVerdict::Keep;
        }

        if ASSET_PATH.is_match(text) || BARE_URL.is_match(text) {
            return NoiseVerdict::AssetPath;
        }

        if RESOURCE_TOKEN.is_match(text) {
            return NoiseVerdict::ResourceToken;
        }

        NoiseVerdict::Keep
    }
}

fn starts_with_bracket(text: &str) -> bool {
    text.starts_with(['[', '<', '【'])
}
