/*!
 * Element sequencer.
 *
 * Turns classified lines into a `ParsedUnit`. The sequencer is a small state
 * machine: `Idle`, or `InDialogue(speaker)` while consecutive lines from one
 * speaker are being merged into a single dialogue element.
 */

use super::classifier::LineClass;
use super::model::{ElementKind, NarrativeElement, ParsedUnit};

/// Label used when every option of the last decision leads into a branch
const REJOIN_LABEL: &str = "汇合";

/// Sequencer state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SequencerState {
    #[default]
    Idle,
    InDialogue(String),
}

/// What a pushed line did to the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new element was appended
    Emitted,
    /// The line was appended to the previous dialogue element
    Merged,
    /// Nothing was appended
    Ignored,
}

#[derive(Debug, Default)]
pub struct Sequencer {
    state: SequencerState,
    previous: Option<ElementKind>,
    elements: Vec<NarrativeElement>,
    // @field: (value, option text) pairs of the last decision
    options: Vec<(String, String)>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Kind of the last emitted element; `None` at unit start or after a separator
    pub fn previous_kind(&self) -> Option<ElementKind> {
        self.previous
    }

    /// Feed one classified line
    pub fn push(&mut self, class: LineClass) -> Transition {
        match class {
            LineClass::Dialogue { speaker, text } => self.push_dialogue(speaker, text),
            LineClass::SceneHeader(text) => self.emit(NarrativeElement::SceneHeader { text }),
            LineClass::Timestamp(text) => self.emit(NarrativeElement::Timestamp { text }),
            LineClass::Narration(text) => self.emit(NarrativeElement::Narration { text }),
            LineClass::SoundEffect(text) => self.emit(NarrativeElement::SoundEffect { text }),
            LineClass::Image(id) => self.emit(NarrativeElement::Image { id }),
            LineClass::SceneCard { title, time } => {
                let header = self.emit(NarrativeElement::SceneHeader { text: title });
                let stamp = self.emit(NarrativeElement::Timestamp { text: time });
                if header == Transition::Emitted || stamp == Transition::Emitted {
                    Transition::Emitted
                } else {
                    Transition::Ignored
                }
            }
            LineClass::Decision(options) => {
                self.options = options;
                self.state = SequencerState::Idle;
                Transition::Ignored
            }
            LineClass::Predicate(references) => {
                let label = self.branch_label(&references);
                self.emit(NarrativeElement::BranchMarker { label })
            }
            LineClass::Boundary => {
                self.state = SequencerState::Idle;
                self.previous = None;
                Transition::Ignored
            }
            LineClass::Discard(_) => Transition::Ignored,
        }
    }

    pub fn finish(self) -> ParsedUnit {
        ParsedUnit::new(self.elements)
    }

    fn push_dialogue(&mut self, speaker: String, text: String) -> Transition {
        if text.trim().is_empty() {
            return Transition::Ignored;
        }

        if let SequencerState::InDialogue(current) = &self.state {
            if *current == speaker {
                if let Some(NarrativeElement::Dialogue { lines, .. }) = self.elements.last_mut() {
                    lines.push(text);
                    return Transition::Merged;
                }
            }
        }

        self.elements.push(NarrativeElement::Dialogue { speaker: speaker.clone(), lines: vec![text] });
        self.previous = Some(ElementKind::Dialogue);
        self.state = SequencerState::InDialogue(speaker);
        Transition::Emitted
    }

    fn emit(&mut self, element: NarrativeElement) -> Transition {
        if element.is_empty() {
            return Transition::Ignored;
        }
        self.previous = Some(element.kind());
        self.state = SequencerState::Idle;
        self.elements.push(element);
        Transition::Emitted
    }

    fn branch_label(&self, references: &[String]) -> String {
        let option_text = |value: &str| {
            self.options
                .iter()
                .find(|(v, _)| v == value)
                .map(|(_, option)| option.clone())
                .unwrap_or_else(|| format!("选项{}", value))
        };

        match references {
            [single] => option_text(single),
            _ if !self.options.is_empty() && references.len() == self.options.len() => REJOIN_LABEL.to_string(),
            _ => references.iter().map(|r| option_text(r)).collect::<Vec<_>>().join(" & "),
        }
    }
}

/// Sequence classified lines into a unit
pub fn sequence<I>(classified: I) -> ParsedUnit
where
    I: IntoIterator<Item = LineClass>,
{
    let mut sequencer = Sequencer::new();
    for class in classified {
        sequencer.push(class);
    }
    sequencer.finish()
}
