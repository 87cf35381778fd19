/*!
 * Line classifier.
 *
 * Assigns each line that survived the noise filter a semantic category,
 * using lexical cues and the kind of the previous element. Game-script
 * directives (`[name="…"]`, `[Subtitle(…)]`, `[Decision(…)]`, …) are decoded
 * first; generic rules follow in a fixed order and the first match wins:
 *
 * 1. bracketed cue with a resource-only interior: discarded
 * 2. bracketed cue with natural-language text: sound effect
 * 3. timestamp
 * 4. speaker prefix: dialogue
 * 5. scene header
 * 6. narration
 */

use std::sync::LazyLock;

use regex::Regex;

use super::model::{ElementKind, RawLine};
use crate::errors::ParseError;

/// Longest line still accepted as a timestamp, in characters
const MAX_TIMESTAMP_CHARS: usize = 32;

/// Longest line accepted as a loose (unmarked) scene header, in characters
const MAX_LOOSE_HEADER_CHARS: usize = 16;

/// Longest line accepted as an explicit chapter marker, in characters
const MAX_CHAPTER_MARKER_CHARS: usize = 40;

static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#+|-{3,}|\*{3,}|={3,})$").expect("Invalid separator regex")
});

static NAME_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\[?(?:multiline\s*\(\s*)?name\s*=\s*"([^"]*)"[^\]]*\]\s*(.*)$"#)
        .expect("Invalid name tag regex")
});

static SCENE_CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<p=1>([^<\n]+)<p=2>([^<\n]+)").expect("Invalid scene card regex")
});

static SUBTITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\[\s*subtitle\s*\(\s*text\s*=\s*"([^"]*)""#).expect("Invalid subtitle regex")
});

static DECISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)decision\s*\(\s*options\s*=\s*"([^"]*)".*?values\s*=\s*"([^"]*)""#)
        .expect("Invalid decision regex")
});

static PREDICATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)predicate\s*\(\s*references\s*=\s*"([^"]*)""#).expect("Invalid predicate regex")
});

static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\[\s*image\s*\(\s*image\s*=\s*"([^"]+)""#).expect("Invalid image regex")
});

static SOUND_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\[\s*(?:playsound|playmusic)\b").expect("Invalid sound directive regex")
});

static SOUND_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bkey\s*=\s*"?([^",\)\]]+)"?"#).expect("Invalid sound key regex")
});

/// `[Identifier]` or `[Identifier(args)]`
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\s*[A-Za-z_][A-Za-z0-9_]*\s*(?:\(.*\))?\s*\]$").expect("Invalid directive regex")
});

static RESOURCE_INTERIOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?[A-Za-z0-9_\-/$.]+$").expect("Invalid resource interior regex")
});

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"\d{1,4}年|\d{1,2}月|\d{1,2}日|\d{1,2}[时点](?:\d{1,2}分)?",
        r"|第[一二三四五六七八九十百\d]+[天日]",
        r"|上午|下午|凌晨|清晨|早晨|早上|中午|傍晚|黄昏|晚上|深夜|午夜|夜间|某日|次日|当日|同日|翌日",
        r"|(?i:day)\s*\d+|(?i:am|pm)",
        r"|\d{1,2}[:：]\d{2}(?:[:：]\d{2})?",
        r"|[\s,，·\-–—/]",
        r")+$"
    ))
    .expect("Invalid timestamp regex")
});

static SPEAKER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([^\s：:，,。！？!?「」『』"“”‘’()（）\[\]<>【】]{1,16})[：:]\s*(\S.*)$"#)
        .expect("Invalid speaker prefix regex")
});

static CHAPTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:第[一二三四五六七八九十百千零〇两\d]+[章节幕话回部篇卷](?:\s*.*)?",
        r"|序章|序幕|尾声|幕间|终章|间章",
        r"|(?i:chapter|act|scene|episode|prologue|epilogue)(?:\s+.*)?)$"
    ))
    .expect("Invalid chapter marker regex")
});

/// Characters that mark a line as a sentence rather than a title
const SENTENCE_PUNCTUATION: &[char] = &[
    '。', '！', '？', '!', '?', '…', '，', ',', '；', ';', '：', ':', '"', '“', '”', '「', '」', '『', '』',
];

/// Why a line produced no element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Bracketed cue whose content is a resource identifier
    ResourceCue,
    /// Engine directive with no narrative content
    Directive,
}

/// Category assigned to one line, with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    SceneHeader(String),
    Timestamp(String),
    /// Title and time from a single `<p=1>…<p=2>…` card
    SceneCard { title: String, time: String },
    Dialogue { speaker: String, text: String },
    Narration(String),
    SoundEffect(String),
    /// Option map `(value, option text)` for upcoming branches
    Decision(Vec<(String, String)>),
    /// Branch start referencing decision values
    Predicate(Vec<String>),
    /// Illustration asset id
    Image(String),
    /// Section separator; resets carried state
    Boundary,
    Discard(DiscardReason),
}

impl LineClass {
    /// Element kind this class produces, if it produces one
    pub fn element_kind(&self) -> Option<ElementKind> {
        match self {
            Self::SceneHeader(_) => Some(ElementKind::SceneHeader),
            Self::Timestamp(_) | Self::SceneCard { .. } => Some(ElementKind::Timestamp),
            Self::Dialogue { .. } => Some(ElementKind::Dialogue),
            Self::Narration(_) => Some(ElementKind::Narration),
            Self::SoundEffect(_) => Some(ElementKind::SoundEffect),
            Self::Predicate(_) => Some(ElementKind::BranchMarker),
            Self::Image(_) => Some(ElementKind::Image),
            Self::Decision(_) | Self::Boundary | Self::Discard(_) => None,
        }
    }
}

/// Lexical line classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct LineClassifier;

impl LineClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify one line given the kind of the preceding element
    ///
    /// `previous` is `None` at the start of a unit and after a separator.
    /// Returns `ParseError::Ambiguous` when bracket nesting is malformed.
    pub fn classify(&self, line: &RawLine, previous: Option<ElementKind>) -> Result<LineClass, ParseError> {
        let text = line.text.trim();

        if let Some(class) = self.classify_directive(text) {
            return Ok(class);
        }

        if let Some(class) = self.classify_bracketed(line, text)? {
            return Ok(class);
        }

        if is_timestamp(text) {
            return Ok(LineClass::Timestamp(text.to_string()));
        }

        if let Some(caps) = SPEAKER_PREFIX.captures(text) {
            let speaker = caps[1].to_string();
            if !speaker.chars().all(|c| c.is_ascii_digit()) {
                return Ok(LineClass::Dialogue { speaker, text: caps[2].trim().to_string() });
            }
        }

        if is_scene_header(text, previous) {
            return Ok(LineClass::SceneHeader(text.to_string()));
        }

        Ok(LineClass::Narration(text.to_string()))
    }

    fn classify_directive(&self, text: &str) -> Option<LineClass> {
        if SEPARATOR.is_match(text) {
            return Some(LineClass::Boundary);
        }

        // Engine comment lines
        if text.starts_with('#') {
            return Some(LineClass::Discard(DiscardReason::Directive));
        }

        if let Some(caps) = SCENE_CARD.captures(text) {
            return Some(LineClass::SceneCard {
                title: caps[1].trim().to_string(),
                time: caps[2].trim().to_string(),
            });
        }

        if !text.starts_with('[') && !text.to_ascii_lowercase().starts_with("name") {
            return None;
        }

        if let Some(caps) = NAME_TAG.captures(text) {
            let speaker = caps[1].trim().to_string();
            let utterance = caps[2].trim().to_string();
            return Some(if speaker.is_empty() {
                LineClass::Narration(utterance)
            } else {
                LineClass::Dialogue { speaker, text: utterance }
            });
        }

        if let Some(caps) = SUBTITLE.captures(text) {
            return Some(LineClass::Narration(caps[1].trim().to_string()));
        }

        if let Some(caps) = DECISION.captures(text) {
            let options = caps[1].split(';').map(str::trim);
            let values = caps[2].split(';').map(str::trim);
            let pairs = values
                .zip(options)
                .map(|(value, option)| (value.to_string(), option.to_string()))
                .collect();
            return Some(LineClass::Decision(pairs));
        }

        if let Some(caps) = PREDICATE.captures(text) {
            let references = caps[1]
                .split(';')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
            return Some(LineClass::Predicate(references));
        }

        if let Some(caps) = IMAGE.captures(text) {
            return Some(LineClass::Image(caps[1].trim().to_string()));
        }

        if SOUND_DIRECTIVE.is_match(text) {
            return Some(match SOUND_KEY.captures(text) {
                Some(caps) => classify_cue_interior(caps[1].trim()),
                None => LineClass::Discard(DiscardReason::Directive),
            });
        }

        if DIRECTIVE.is_match(text) {
            return Some(LineClass::Discard(DiscardReason::Directive));
        }

        None
    }

    /// Rules 1 and 2: lines wholly enclosed in one bracket pair
    fn classify_bracketed(&self, line: &RawLine, text: &str) -> Result<Option<LineClass>, ParseError> {
        let Some(opener) = text.chars().next() else {
            return Ok(None);
        };
        let Some(closer) = closing_bracket(opener) else {
            return Ok(None);
        };

        let opened = text.matches(opener).count();
        let closed = text.matches(closer).count();
        if opened != closed {
            return Err(ParseError::Ambiguous { index: line.index, line: line.text.clone() });
        }

        if opened == 1 && text.ends_with(closer) {
            let interior = &text[opener.len_utf8()..text.len() - closer.len_utf8()];
            return Ok(Some(classify_cue_interior(interior.trim())));
        }

        Ok(None)
    }
}

fn closing_bracket(opener: char) -> Option<char> {
    match opener {
        '<' => Some('>'),
        '[' => Some(']'),
        '【' => Some('】'),
        _ => None,
    }
}

/// Decide between a descriptive sound effect and a resource-only cue
fn classify_cue_interior(interior: &str) -> LineClass {
    if interior.is_empty() || RESOURCE_INTERIOR.is_match(interior) {
        return LineClass::Discard(DiscardReason::ResourceCue);
    }
    if interior.chars().any(char::is_alphabetic) {
        return LineClass::SoundEffect(interior.to_string());
    }
    LineClass::Discard(DiscardReason::ResourceCue)
}

fn is_timestamp(text: &str) -> bool {
    text.chars().count() <= MAX_TIMESTAMP_CHARS
        && text.chars().any(|c| c.is_ascii_digit())
        && TIMESTAMP.is_match(text)
}

fn is_scene_header(text: &str, previous: Option<ElementKind>) -> bool {
    let length = text.chars().count();
    if length <= MAX_CHAPTER_MARKER_CHARS && CHAPTER_MARKER.is_match(text) {
        return true;
    }

    let at_boundary = matches!(previous, None | Some(ElementKind::Timestamp));
    at_boundary
        && length <= MAX_LOOSE_HEADER_CHARS
        && !text.contains(SENTENCE_PUNCTUATION)
        && !text.ends_with('.')
        && text.chars().any(char::is_alphanumeric)
}
