/*!
 * Layout configuration for document assembly.
 *
 * `LayoutConfig` is the validated form of the `document` section of the
 * configuration file. It can only be built through `LayoutConfig::new`
 * (or deserialization, which goes through the same validation), so an
 * assembler never sees an impossible layout.
 */

use serde::{Deserialize, Serialize};

use super::model::{Alignment, PageSetup, RunStyle};
use crate::errors::ConfigError;

/// Most blank lines allowed between units
pub const MAX_SPACER_LINES: u32 = 20;

/// Accepted line spacing multipliers
const LINE_SPACING_RANGE: (f32, f32) = (1.0, 3.0);

/// Largest accepted font size in points
const MAX_FONT_SIZE_PT: f32 = 96.0;

/// Largest accepted paragraph spacing in points
const MAX_PARAGRAPH_SPACING_PT: f32 = 72.0;

/// Physical page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PageSize {
    #[default]
    #[serde(rename = "A4", alias = "a4")]
    A4,
    #[serde(rename = "Letter", alias = "letter")]
    Letter,
}

impl PageSize {
    // @returns: (width, height) in inches
    pub fn dimensions_in(self) -> (f32, f32) {
        match self {
            Self::A4 => (8.27, 11.69),
            Self::Letter => (8.5, 11.0),
        }
    }
}

/// Uniform page margin profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarginProfile {
    #[default]
    Narrow,
    Normal,
    Wide,
}

impl MarginProfile {
    // @returns: Margin on every side in inches
    pub fn inches(self) -> f32 {
        match self {
            Self::Narrow => 0.5,
            Self::Normal => 0.79,
            Self::Wide => 1.0,
        }
    }
}

/// Presentation rule for one kind of paragraph or run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: String,
    pub size_pt: f32,
    #[serde(default)]
    pub bold: bool,
    /// Hex RGB color such as `00FFFF`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub align: Alignment,
    #[serde(default)]
    pub first_line_indent_in: f32,
    #[serde(default)]
    pub space_before_pt: f32,
    #[serde(default)]
    pub space_after_pt: f32,
}

impl TextStyle {
    pub fn new(font: impl Into<String>, size_pt: f32) -> Self {
        Self {
            font: font.into(),
            size_pt,
            bold: false,
            color: None,
            align: Alignment::Left,
            first_line_indent_in: 0.0,
            space_before_pt: 0.0,
            space_after_pt: 0.0,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn color(mut self, hex: impl Into<String>) -> Self {
        self.color = Some(hex.into());
        self
    }

    pub fn align(mut self, align: Alignment) -> Self {
        self.align = align;
        self
    }

    pub fn indent(mut self, inches: f32) -> Self {
        self.first_line_indent_in = inches;
        self
    }

    pub fn spacing(mut self, before_pt: f32, after_pt: f32) -> Self {
        self.space_before_pt = before_pt;
        self.space_after_pt = after_pt;
        self
    }

    /// Character-level part of the style
    pub fn run_style(&self) -> RunStyle {
        RunStyle {
            font: self.font.clone(),
            size_pt: self.size_pt,
            bold: self.bold,
            color: self.color.clone(),
        }
    }

    fn validate(&self, field: &str, text_width_in: f32) -> Result<(), ConfigError> {
        if self.font.trim().is_empty() {
            return Err(ConfigError::invalid(format!("{}.font", field), "font name must not be empty"));
        }
        if !(self.size_pt > 0.0 && self.size_pt <= MAX_FONT_SIZE_PT) {
            return Err(ConfigError::invalid(
                format!("{}.size_pt", field),
                format!("{} is outside (0, {}]", self.size_pt, MAX_FONT_SIZE_PT),
            ));
        }
        if let Some(color) = &self.color {
            if color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::invalid(
                    format!("{}.color", field),
                    format!("'{}' is not a six-digit hex color", color),
                ));
            }
        }
        if !(self.first_line_indent_in >= 0.0 && self.first_line_indent_in < text_width_in) {
            return Err(ConfigError::invalid(
                format!("{}.first_line_indent_in", field),
                format!(
                    "{}in does not fit the {:.2}in text width of the chosen page and margins",
                    self.first_line_indent_in, text_width_in
                ),
            ));
        }
        for (name, value) in [("space_before_pt", self.space_before_pt), ("space_after_pt", self.space_after_pt)] {
            if !(0.0..=MAX_PARAGRAPH_SPACING_PT).contains(&value) {
                return Err(ConfigError::invalid(
                    format!("{}.{}", field, name),
                    format!("{} is outside [0, {}]", value, MAX_PARAGRAPH_SPACING_PT),
                ));
            }
        }
        Ok(())
    }
}

/// One style rule per element kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSheet {
    pub body: TextStyle,
    pub main_title: TextStyle,
    pub unit_title: TextStyle,
    pub appendix_heading: TextStyle,
    pub scene_header: TextStyle,
    pub timestamp: TextStyle,
    pub speaker: TextStyle,
    pub utterance: TextStyle,
    pub narration: TextStyle,
    pub sound_effect: TextStyle,
    pub branch_marker: TextStyle,
    pub image_reference: TextStyle,
    pub image_heading: TextStyle,
    pub image_caption: TextStyle,
    pub page_number: TextStyle,
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self {
            body: TextStyle::new("宋体", 12.0),
            main_title: TextStyle::new("黑体", 22.0).bold(),
            unit_title: TextStyle::new("黑体", 18.0).bold(),
            appendix_heading: TextStyle::new("黑体", 18.0).bold(),
            scene_header: TextStyle::new("黑体", 14.0).bold(),
            timestamp: TextStyle::new("黑体", 12.0).bold(),
            speaker: TextStyle::new("宋体", 8.5).bold(),
            utterance: TextStyle::new("宋体", 8.5),
            narration: TextStyle::new("楷体", 8.5).indent(0.28),
            sound_effect: TextStyle::new("楷体", 8.5),
            branch_marker: TextStyle::new("宋体", 8.5).bold().color("00FFFF").spacing(6.0, 6.0),
            image_reference: TextStyle::new("宋体", 8.5).bold().color("808080"),
            image_heading: TextStyle::new("黑体", 14.0).bold().align(Alignment::Center).spacing(12.0, 12.0),
            image_caption: TextStyle::new("宋体", 9.0).color("808080").align(Alignment::Center).spacing(0.0, 18.0),
            page_number: TextStyle::new("宋体", 10.0).align(Alignment::Center),
        }
    }
}

impl StyleSheet {
    fn entries(&self) -> [(&'static str, &TextStyle); 15] {
        [
            ("body", &self.body),
            ("main_title", &self.main_title),
            ("unit_title", &self.unit_title),
            ("appendix_heading", &self.appendix_heading),
            ("scene_header", &self.scene_header),
            ("timestamp", &self.timestamp),
            ("speaker", &self.speaker),
            ("utterance", &self.utterance),
            ("narration", &self.narration),
            ("sound_effect", &self.sound_effect),
            ("branch_marker", &self.branch_marker),
            ("image_reference", &self.image_reference),
            ("image_heading", &self.image_heading),
            ("image_caption", &self.image_caption),
            ("page_number", &self.page_number),
        ]
    }
}

/// Unvalidated layout settings, as written in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default)]
    pub page_size: PageSize,

    #[serde(default)]
    pub margins: MarginProfile,

    #[serde(default = "default_true")]
    pub page_numbers: bool,

    #[serde(default = "default_spacer_lines")]
    pub spacer_lines: u32,

    #[serde(default = "default_line_spacing")]
    pub line_spacing: f32,

    #[serde(default = "default_appendix_title")]
    pub appendix_title: String,

    #[serde(default = "default_image_appendix_title")]
    pub image_appendix_title: String,

    #[serde(default)]
    pub styles: StyleSheet,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            margins: MarginProfile::default(),
            page_numbers: default_true(),
            spacer_lines: default_spacer_lines(),
            line_spacing: default_line_spacing(),
            appendix_title: default_appendix_title(),
            image_appendix_title: default_image_appendix_title(),
            styles: StyleSheet::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_spacer_lines() -> u32 {
    2
}

fn default_line_spacing() -> f32 {
    1.5
}

fn default_appendix_title() -> String {
    "相关角色秘录".to_string()
}

fn default_image_appendix_title() -> String {
    "━━━ 图片 ━━━".to_string()
}

/// Validated layout for the document assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutSettings", into = "LayoutSettings")]
pub struct LayoutConfig {
    settings: LayoutSettings,
}

impl LayoutConfig {
    /// Validate settings; invalid values are rejected here rather than at render time
    pub fn new(settings: LayoutSettings) -> Result<Self, ConfigError> {
        let layout = Self { settings };
        layout.validate()?;
        Ok(layout)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.settings;

        if s.spacer_lines > MAX_SPACER_LINES {
            return Err(ConfigError::invalid(
                "document.spacer_lines",
                format!("{} exceeds the maximum of {}", s.spacer_lines, MAX_SPACER_LINES),
            ));
        }

        let (low, high) = LINE_SPACING_RANGE;
        if !(s.line_spacing >= low && s.line_spacing <= high) {
            return Err(ConfigError::invalid(
                "document.line_spacing",
                format!("{} is outside [{}, {}]", s.line_spacing, low, high),
            ));
        }

        if s.appendix_title.trim().is_empty() {
            return Err(ConfigError::invalid("document.appendix_title", "must not be empty"));
        }

        if s.image_appendix_title.trim().is_empty() {
            return Err(ConfigError::invalid("document.image_appendix_title", "must not be empty"));
        }

        let text_width = self.text_width_in();
        for (name, style) in s.styles.entries() {
            style.validate(&format!("document.styles.{}", name), text_width)?;
        }

        Ok(())
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn page_size(&self) -> PageSize {
        self.settings.page_size
    }

    pub fn margins(&self) -> MarginProfile {
        self.settings.margins
    }

    pub fn page_numbers(&self) -> bool {
        self.settings.page_numbers
    }

    pub fn spacer_lines(&self) -> u32 {
        self.settings.spacer_lines
    }

    pub fn line_spacing(&self) -> f32 {
        self.settings.line_spacing
    }

    pub fn appendix_title(&self) -> &str {
        &self.settings.appendix_title
    }

    pub fn image_appendix_title(&self) -> &str {
        &self.settings.image_appendix_title
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.settings.styles
    }

    pub fn page_setup(&self) -> PageSetup {
        let (width_in, height_in) = self.settings.page_size.dimensions_in();
        PageSetup { width_in, height_in, margin_in: self.settings.margins.inches() }
    }

    /// Printable width between the left and right margins
    pub fn text_width_in(&self) -> f32 {
        let page = self.page_setup();
        page.width_in - 2.0 * page.margin_in
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { settings: LayoutSettings::default() }
    }
}

impl TryFrom<LayoutSettings> for LayoutConfig {
    type Error = ConfigError;

    fn try_from(settings: LayoutSettings) -> Result<Self, Self::Error> {
        Self::new(settings)
    }
}

impl From<LayoutConfig> for LayoutSettings {
    fn from(layout: LayoutConfig) -> Self {
        layout.settings
    }
}
