/*!
 * Script parsing pipeline.
 *
 * Raw wiki script text flows through three stages:
 * - `noise`: drops configuration fragments, asset paths and resource tokens
 * - `classifier`: assigns each surviving line a category
 * - `sequencer`: groups classified lines into narrative elements
 *
 * `ScriptParser::parse` runs all three and returns a `ParseReport`.
 */

pub mod characters;
pub mod classifier;
pub mod model;
pub mod noise;
pub mod sequencer;

use log::debug;

use crate::errors::ParseError;
pub use characters::referenced_characters;
pub use classifier::{DiscardReason, LineClass, LineClassifier};
pub use model::{ElementKind, NarrativeElement, ParseReport, ParsedUnit, RawLine, SkippedLine};
pub use noise::{NoiseFilter, NoiseVerdict};
pub use sequencer::{Sequencer, SequencerState, sequence};

/// Runs the full filter, classify and sequence pipeline over one script
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptParser {
    filter: NoiseFilter,
    classifier: LineClassifier,
}

impl ScriptParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one unit of raw script text
    ///
    /// Fails only when the text as a whole is unusable (empty, or containing
    /// NUL or replacement characters from a broken decode). Individual lines
    /// with malformed brackets fall back to narration.
    pub fn parse(&self, text: &str) -> Result<ParseReport, ParseError> {
        check_content(text)?;

        let mut sequencer = Sequencer::new();
        let mut skipped = Vec::new();
        let mut ambiguous = 0;

        for line in RawLine::split(text) {
            if !self.filter.keep(&line) {
                continue;
            }

            let class = match self.classifier.classify(&line, sequencer.previous_kind()) {
                Ok(class) => class,
                Err(e) => {
                    debug!("{}; treating as narration", e);
                    ambiguous += 1;
                    LineClass::Narration(line.text.clone())
                }
            };

            if class == LineClass::Discard(DiscardReason::Directive) {
                skipped.push(SkippedLine { index: line.index, text: line.text.clone() });
            }

            sequencer.push(class);
        }

        let unit = sequencer.finish();
        debug!(
            "Parsed {} element(s), {} skipped directive(s), {} ambiguous line(s)",
            unit.len(),
            skipped.len(),
            ambiguous
        );

        Ok(ParseReport { unit, skipped, ambiguous })
    }
}

/// Parse raw script text with the default pipeline
pub fn parse_script(text: &str) -> Result<ParseReport, ParseError> {
    ScriptParser::new().parse(text)
}

fn check_content(text: &str) -> Result<(), ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::MalformedContent("script is empty".to_string()));
    }
    if text.contains('\0') {
        return Err(ParseError::MalformedContent("script contains NUL bytes".to_string()));
    }
    if text.contains('\u{FFFD}') {
        return Err(ParseError::MalformedContent(
            "script contains replacement characters from an invalid encoding".to_string(),
        ));
    }
    Ok(())
}
