/*!
 * Format-agnostic document model.
 *
 * The assembler produces a `Document`: page setup, default body style and an
 * ordered list of blocks. Writers (see `docx`) turn it into a file.
 */

use serde::{Deserialize, Serialize};

/// Paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Page dimensions and uniform margin, in inches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width_in: f32,
    pub height_in: f32,
    pub margin_in: f32,
}

/// What a paragraph represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    MainTitle,
    UnitTitle,
    SceneHeader,
    Timestamp,
    Dialogue,
    Narration,
    SoundEffect,
    BranchMarker,
    ImageReference,
    AppendixHeading,
    RecordTitle,
    ImageHeading,
    ImageCaption,
}

impl Role {
    /// Heading roles are rendered with a heading outline level
    pub fn is_heading(self) -> bool {
        matches!(
            self,
            Self::MainTitle | Self::UnitTitle | Self::AppendixHeading | Self::RecordTitle | Self::ImageHeading
        )
    }
}

/// Character formatting of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub font: String,
    pub size_pt: f32,
    pub bold: bool,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Run(Run),
    LineBreak,
}

/// Paragraph-level formatting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphFormat {
    pub align: Alignment,
    pub first_line_indent_in: f32,
    pub space_before_pt: f32,
    pub space_after_pt: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub role: Role,
    pub format: ParagraphFormat,
    pub inlines: Vec<Inline>,
}

impl Paragraph {
    /// Text of all runs, with line breaks as `\n`
    pub fn text(&self) -> String {
        let mut text = String::new();
        for inline in &self.inlines {
            match inline {
                Inline::Run(run) => text.push_str(&run.text),
                Inline::LineBreak => text.push('\n'),
            }
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    /// Empty spacer paragraph
    Blank,
    PageBreak,
}

/// Footer page number field
#[derive(Debug, Clone, PartialEq)]
pub struct PageNumbering {
    pub style: RunStyle,
    pub align: Alignment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page: PageSetup,
    pub line_spacing: f32,
    pub body: RunStyle,
    pub page_numbers: Option<PageNumbering>,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Paragraph texts in order, one per line; spacers and breaks are skipped
    pub fn plain_text(&self) -> String {
        self.paragraphs().map(Paragraph::text).collect::<Vec<_>>().join("\n")
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph),
            _ => None,
        })
    }

    /// Texts of the paragraphs with the given role
    pub fn headings(&self, role: Role) -> Vec<String> {
        self.paragraphs().filter(|p| p.role == role).map(Paragraph::text).collect()
    }
}
