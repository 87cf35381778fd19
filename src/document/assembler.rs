/*!
 * Document assembler.
 *
 * `assemble` renders parsed units into a `Document` under a `LayoutConfig`.
 * It is pure: the same `DocumentSpec` always yields an equal `Document`.
 *
 * Images are numbered per document. The body shows a `[图片: 图片N]`
 * placeholder where each one appears, and a final appendix lists every
 * distinct image once.
 */

use std::collections::{HashMap, HashSet};

use super::layout::{LayoutConfig, TextStyle};
use super::model::{
    Block, Document, Inline, PageNumbering, Paragraph, ParagraphFormat, Role, Run,
};
use crate::script::{NarrativeElement, ParsedUnit, referenced_characters};

/// A titled unit of primary content
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub unit: ParsedUnit,
}

impl Section {
    pub fn new(title: impl Into<String>, unit: ParsedUnit) -> Self {
        Self { title: title.into(), unit }
    }
}

/// A character's record for the cross-reference appendix
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterRecord {
    pub name: String,
    pub title: String,
    pub unit: ParsedUnit,
}

impl CharacterRecord {
    pub fn new(name: impl Into<String>, title: impl Into<String>, unit: ParsedUnit) -> Self {
        Self { name: name.into(), title: title.into(), unit }
    }
}

/// Everything needed to assemble one output document
#[derive(Debug, Clone)]
pub struct DocumentSpec {
    pub main_title: Option<String>,
    pub sections: Vec<Section>,
    pub appendix: Option<Vec<CharacterRecord>>,
    pub layout: LayoutConfig,
}

impl DocumentSpec {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { main_title: None, sections: Vec::new(), appendix: None, layout }
    }

    pub fn with_main_title(mut self, title: impl Into<String>) -> Self {
        self.main_title = Some(title.into());
        self
    }

    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    pub fn with_appendix(mut self, records: Vec<CharacterRecord>) -> Self {
        self.appendix = Some(records);
        self
    }
}

/// Image numbers for one document
///
/// Each distinct asset id gets the next number in order of first appearance;
/// later references to the same id reuse it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageIndex {
    numbers: HashMap<String, usize>,
    order: Vec<String>,
}

impl ImageIndex {
    pub fn collect<'a>(units: impl IntoIterator<Item = &'a ParsedUnit>) -> Self {
        let mut index = Self::default();
        for id in units.into_iter().flat_map(ParsedUnit::image_ids) {
            if !index.numbers.contains_key(id) {
                index.order.push(id.to_string());
                index.numbers.insert(id.to_string(), index.order.len());
            }
        }
        index
    }

    pub fn number(&self, id: &str) -> Option<usize> {
        self.numbers.get(id).copied()
    }

    /// `(number, id)` pairs in number order
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.order.iter().enumerate().map(|(position, id)| (position + 1, id.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

/// Render a document spec
pub fn assemble(spec: &DocumentSpec) -> Document {
    let layout = &spec.layout;
    let styles = layout.styles();
    let records = spec.appendix.as_deref().map(|records| order_appendix(&spec.sections, records)).unwrap_or_default();
    let images = ImageIndex::collect(spec.sections.iter().map(|s| &s.unit).chain(records.iter().map(|r| &r.unit)));
    let mut blocks = Vec::new();

    if let Some(title) = &spec.main_title {
        blocks.push(single_run(Role::MainTitle, &styles.main_title, title));
    }

    for (position, section) in spec.sections.iter().enumerate() {
        if position > 0 {
            push_spacers(&mut blocks, layout.spacer_lines());
        }
        blocks.push(single_run(Role::UnitTitle, &styles.unit_title, &section.title));
        render_unit(&mut blocks, layout, &section.unit, &images);
    }

    if !records.is_empty() {
        blocks.push(Block::PageBreak);
        blocks.push(single_run(Role::AppendixHeading, &styles.appendix_heading, layout.appendix_title()));
        for (position, record) in records.iter().enumerate() {
            if position > 0 {
                push_spacers(&mut blocks, layout.spacer_lines());
            }
            let heading = format!("{}：{}", record.name, record.title);
            blocks.push(single_run(Role::RecordTitle, &styles.unit_title, &heading));
            render_unit(&mut blocks, layout, &record.unit, &images);
        }
    }

    if !images.is_empty() {
        blocks.push(Block::PageBreak);
        blocks.push(single_run(Role::ImageHeading, &styles.image_heading, layout.image_appendix_title()));
        for (number, id) in images.entries() {
            blocks.push(single_run(Role::ImageCaption, &styles.image_caption, &format!("图片{}：{}", number, id)));
        }
    }

    let page_numbers = layout.page_numbers().then(|| PageNumbering {
        style: styles.page_number.run_style(),
        align: styles.page_number.align,
    });

    Document {
        page: layout.page_setup(),
        line_spacing: layout.line_spacing(),
        body: styles.body.run_style(),
        page_numbers,
        blocks,
    }
}

/// Records to render, ordered by first occurrence of their speaker in `sections`
///
/// Records for names that never speak in `sections` are dropped, as are
/// repeated `(name, title)` pairs. Records sharing a name keep their input order.
pub fn order_appendix<'a>(sections: &[Section], records: &'a [CharacterRecord]) -> Vec<&'a CharacterRecord> {
    let speakers = referenced_characters(sections.iter().map(|s| &s.unit));
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut ordered = Vec::new();

    for speaker in &speakers {
        for record in records.iter().filter(|r| r.name == *speaker) {
            if seen.insert((record.name.as_str(), record.title.as_str())) {
                ordered.push(record);
            }
        }
    }
    ordered
}

fn render_unit(blocks: &mut Vec<Block>, layout: &LayoutConfig, unit: &ParsedUnit, images: &ImageIndex) {
    let styles = layout.styles();
    for element in &unit.elements {
        let block = match element {
            NarrativeElement::SceneHeader { text } => single_run(Role::SceneHeader, &styles.scene_header, text),
            NarrativeElement::Timestamp { text } => single_run(Role::Timestamp, &styles.timestamp, text),
            NarrativeElement::Narration { text } => single_run(Role::Narration, &styles.narration, text),
            NarrativeElement::SoundEffect { text } => {
                single_run(Role::SoundEffect, &styles.sound_effect, &format!("<{}>", text))
            }
            NarrativeElement::BranchMarker { label } => {
                single_run(Role::BranchMarker, &styles.branch_marker, &format!("[→ {}]", label))
            }
            NarrativeElement::Image { id } => {
                let reference = match images.number(id) {
                    Some(number) => format!("[图片: 图片{}]", number),
                    None => format!("[图片: {}]", id),
                };
                single_run(Role::ImageReference, &styles.image_reference, &reference)
            }
            NarrativeElement::Dialogue { speaker, lines } => {
                let mut inlines = vec![run(&styles.speaker, &format!("{}:", speaker))];
                let utterance = styles.utterance.run_style();
                for (position, line) in lines.iter().enumerate() {
                    if position > 0 {
                        inlines.push(Inline::LineBreak);
                    }
                    inlines.push(Inline::Run(Run { text: line.clone(), style: utterance.clone() }));
                }
                Block::Paragraph(Paragraph { role: Role::Dialogue, format: format(&styles.utterance), inlines })
            }
        };
        blocks.push(block);
    }
}

fn push_spacers(blocks: &mut Vec<Block>, count: u32) {
    blocks.extend((0..count).map(|_| Block::Blank));
}

fn single_run(role: Role, style: &TextStyle, text: &str) -> Block {
    Block::Paragraph(Paragraph { role, format: format(style), inlines: vec![run(style, text)] })
}

fn run(style: &TextStyle, text: &str) -> Inline {
    Inline::Run(Run { text: text.to_string(), style: style.run_style() })
}

fn format(style: &TextStyle) -> ParagraphFormat {
    ParagraphFormat {
        align: style.align,
        first_line_indent_in: style.first_line_indent_in,
        space_before_pt: style.space_before_pt,
        space_after_pt: style.space_after_pt,
    }
}
