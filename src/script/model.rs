/*!
 * Data model for parsed scripts.
 *
 * A script is read line by line into `RawLine`s, classified, and sequenced
 * into a `ParsedUnit`: the ordered list of `NarrativeElement`s one source
 * unit (a chapter story or a character record) produces.
 */

use serde::{Deserialize, Serialize};

/// A single trimmed line of source text and its index within its unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub index: usize,
    pub text: String,
}

impl RawLine {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self { index, text: text.into() }
    }

    /// Split raw script text into trimmed lines, keeping their original positions
    pub fn split(text: &str) -> Vec<RawLine> {
        text.lines()
            .enumerate()
            .map(|(index, line)| RawLine::new(index, line.trim()))
            .collect()
    }
}

/// Discriminant of a `NarrativeElement`, used as carried classifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    SceneHeader,
    Timestamp,
    Dialogue,
    Narration,
    SoundEffect,
    BranchMarker,
    Image,
}

/// One classified unit of script content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrativeElement {
    /// Structural section marker
    SceneHeader { text: String },
    /// In-story time marker
    Timestamp { text: String },
    /// Consecutive utterances from one speaker
    Dialogue { speaker: String, lines: Vec<String> },
    /// Descriptive prose
    Narration { text: String },
    /// Descriptive sound cue, without its brackets
    SoundEffect { text: String },
    /// Start of a branch chosen by the player
    BranchMarker { label: String },
    /// Illustration shown at this point, by asset id
    Image { id: String },
}

impl NarrativeElement {
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::SceneHeader { .. } => ElementKind::SceneHeader,
            Self::Timestamp { .. } => ElementKind::Timestamp,
            Self::Dialogue { .. } => ElementKind::Dialogue,
            Self::Narration { .. } => ElementKind::Narration,
            Self::SoundEffect { .. } => ElementKind::SoundEffect,
            Self::BranchMarker { .. } => ElementKind::BranchMarker,
            Self::Image { .. } => ElementKind::Image,
        }
    }

    /// Zero-length elements carry no text and are never emitted
    pub fn is_empty(&self) -> bool {
        match self {
            Self::SceneHeader { text }
            | Self::Timestamp { text }
            | Self::Narration { text }
            | Self::SoundEffect { text } => text.trim().is_empty(),
            Self::Dialogue { lines, .. } => lines.iter().all(|line| line.trim().is_empty()),
            Self::BranchMarker { label } => label.trim().is_empty(),
            Self::Image { id } => id.trim().is_empty(),
        }
    }

    /// Speaker of a dialogue element
    pub fn speaker(&self) -> Option<&str> {
        match self {
            Self::Dialogue { speaker, .. } => Some(speaker),
            _ => None,
        }
    }
}

/// Ordered element sequence produced from one source unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedUnit {
    pub elements: Vec<NarrativeElement>,
}

impl ParsedUnit {
    pub fn new(elements: Vec<NarrativeElement>) -> Self {
        Self { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Image ids in order of appearance, repeats included
    pub fn image_ids(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|element| match element {
            NarrativeElement::Image { id } => Some(id.as_str()),
            _ => None,
        })
    }

    /// Speakers in the order they first speak, without repeats
    pub fn speakers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for speaker in self.elements.iter().filter_map(NarrativeElement::speaker) {
            if !seen.contains(&speaker) {
                seen.push(speaker);
            }
        }
        seen
    }
}

/// A line the parser recognised as a directive but did not render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub index: usize,
    pub text: String,
}

/// Result of parsing one script: the unit plus diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub unit: ParsedUnit,
    /// Directive lines that produced no element
    pub skipped: Vec<SkippedLine>,
    /// Lines with malformed bracket nesting that fell back to narration
    pub ambiguous: usize,
}
