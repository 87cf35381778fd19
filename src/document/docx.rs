/*!
 * WordprocessingML (.docx) writer.
 *
 * A `.docx` file is a zip package of XML parts. `DocxWriter` emits the
 * minimal set Word needs: content types, package and document relationships,
 * styles (carrying the body font and line spacing defaults), the document body
 * and, when page numbering is on, a footer holding a PAGE field.
 *
 * Files are written to a temporary sibling and renamed over the target, so an
 * existing output is never left half-written.
 */

use std::fs;
use std::io::{Seek, Write};
use std::path::Path;

use log::debug;
use zip::ZipWriter;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;

use super::model::{Alignment, Block, Document, Inline, PageNumbering, Paragraph, Role, RunStyle};
use crate::errors::OutputWriteError;

const TWIPS_PER_INCH: f32 = 1440.0;
const TWIPS_PER_POINT: f32 = 20.0;
// Line spacing unit for lineRule="auto": 240 is single spacing
const AUTO_LINE_UNIT: f32 = 240.0;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Persists a `Document` in some file format
pub trait DocumentWriter: Send + Sync {
    /// File extension without the dot
    fn extension(&self) -> &'static str;

    /// Write `document` to `path`, replacing any existing file
    fn write(&self, document: &Document, path: &Path) -> Result<(), OutputWriteError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxWriter;

impl DocxWriter {
    pub fn new() -> Self {
        Self
    }

    /// Encode `document` as a docx package into `sink`
    pub fn encode<W: Write + Seek>(&self, document: &Document, sink: W) -> ZipResult<W> {
        let mut zip = ZipWriter::new(sink);
        let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        let with_footer = document.page_numbers.is_some();

        zip.start_file("[Content_Types].xml", opt)?;
        zip.write_all(content_types_xml(with_footer).as_bytes())?;

        zip.add_directory("_rels/", opt)?;
        zip.start_file("_rels/.rels", opt)?;
        zip.write_all(package_rels_xml().as_bytes())?;

        zip.add_directory("word/", opt)?;
        zip.add_directory("word/_rels/", opt)?;

        zip.start_file("word/document.xml", opt)?;
        zip.write_all(document_xml(document).as_bytes())?;

        zip.start_file("word/_rels/document.xml.rels", opt)?;
        zip.write_all(document_rels_xml(with_footer).as_bytes())?;

        zip.start_file("word/styles.xml", opt)?;
        zip.write_all(styles_xml(document).as_bytes())?;

        if let Some(numbering) = &document.page_numbers {
            zip.start_file("word/footer1.xml", opt)?;
            zip.write_all(footer_xml(numbering).as_bytes())?;
        }

        zip.finish()
    }
}

impl DocumentWriter for DocxWriter {
    fn extension(&self) -> &'static str {
        "docx"
    }

    fn write(&self, document: &Document, path: &Path) -> Result<(), OutputWriteError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| OutputWriteError::from_io(dir, e))?;

        let mut temp = tempfile::Builder::new()
            .prefix(".storydoc-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| OutputWriteError::from_io(dir, e))?;

        self.encode(document, temp.as_file_mut()).map_err(|e| OutputWriteError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        temp.persist(path).map_err(|e| OutputWriteError::from_io(path, e.error))?;
        debug!("Wrote {} block(s) to {}", document.blocks.len(), path.display());
        Ok(())
    }
}

/// Escape text for XML element content and attribute values
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            // Not allowed anywhere in an XML 1.0 document
            c if c < '\u{20}' || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            _ => out.push(ch),
        }
    }
    out
}

fn twips(inches: f32) -> i64 {
    (inches * TWIPS_PER_INCH).round() as i64
}

fn point_twips(points: f32) -> i64 {
    (points * TWIPS_PER_POINT).round() as i64
}

fn half_points(points: f32) -> i64 {
    (points * 2.0).round() as i64
}

fn jc(align: Alignment) -> &'static str {
    match align {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
    }
}

fn outline_level(role: Role) -> Option<u8> {
    match role {
        Role::MainTitle => Some(0),
        Role::UnitTitle | Role::AppendixHeading | Role::ImageHeading => Some(1),
        Role::RecordTitle => Some(2),
        _ => None,
    }
}

fn run_properties(style: &RunStyle) -> String {
    let font = xml_escape(&style.font);
    let size = half_points(style.size_pt);
    let mut props = format!(
        r#"<w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/>"#
    );
    if style.bold {
        props.push_str("<w:b/><w:bCs/>");
    }
    if let Some(color) = &style.color {
        props.push_str(&format!(r#"<w:color w:val="{}"/>"#, xml_escape(color)));
    }
    props.push_str(&format!(r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr>"#));
    props
}

fn paragraph_xml(paragraph: &Paragraph, out: &mut String) {
    let format = &paragraph.format;
    out.push_str("<w:p><w:pPr>");
    if paragraph.role.is_heading() {
        out.push_str("<w:keepNext/>");
    }
    out.push_str(&format!(
        r#"<w:spacing w:before="{}" w:after="{}"/>"#,
        point_twips(format.space_before_pt),
        point_twips(format.space_after_pt)
    ));
    if format.first_line_indent_in > 0.0 {
        out.push_str(&format!(r#"<w:ind w:firstLine="{}"/>"#, twips(format.first_line_indent_in)));
    }
    out.push_str(&format!(r#"<w:jc w:val="{}"/>"#, jc(format.align)));
    if let Some(level) = outline_level(paragraph.role) {
        out.push_str(&format!(r#"<w:outlineLvl w:val="{}"/>"#, level));
    }
    out.push_str("</w:pPr>");

    for inline in &paragraph.inlines {
        match inline {
            Inline::LineBreak => out.push_str("<w:r><w:br/></w:r>"),
            Inline::Run(run) => {
                if run.text.is_empty() {
                    continue;
                }
                out.push_str("<w:r>");
                out.push_str(&run_properties(&run.style));
                out.push_str(r#"<w:t xml:space="preserve">"#);
                out.push_str(&xml_escape(&run.text));
                out.push_str("</w:t></w:r>");
            }
        }
    }
    out.push_str("</w:p>");
}

fn document_xml(document: &Document) -> String {
    let mut body = String::new();
    for block in &document.blocks {
        match block {
            Block::Paragraph(paragraph) => paragraph_xml(paragraph, &mut body),
            Block::Blank => body.push_str("<w:p/>"),
            Block::PageBreak => body.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#),
        }
    }

    let page = &document.page;
    let margin = twips(page.margin_in);
    let footer_ref = if document.page_numbers.is_some() {
        r#"<w:footerReference w:type="default" r:id="rId2"/>"#
    } else {
        ""
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WORD_NS}" xmlns:r="{REL_NS}">
  <w:body>
    {body}
    <w:sectPr>
      {footer_ref}
      <w:pgSz w:w="{width}" w:h="{height}"/>
      <w:pgMar w:top="{margin}" w:right="{margin}" w:bottom="{margin}" w:left="{margin}" w:header="708" w:footer="708" w:gutter="0"/>
      <w:cols w:space="708"/>
      <w:docGrid w:linePitch="360"/>
    </w:sectPr>
  </w:body>
</w:document>"#,
        width = twips(page.width_in),
        height = twips(page.height_in),
    )
}

fn styles_xml(document: &Document) -> String {
    let line = (document.line_spacing * AUTO_LINE_UNIT).round() as i64;
    let body_props = run_properties(&document.body);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{WORD_NS}">
  <w:docDefaults>
    <w:rPrDefault>{body_props}</w:rPrDefault>
    <w:pPrDefault><w:pPr><w:spacing w:before="0" w:after="0" w:line="{line}" w:lineRule="auto"/></w:pPr></w:pPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Footer">
    <w:name w:val="footer"/>
    <w:basedOn w:val="Normal"/>
  </w:style>
</w:styles>"#
    )
}

fn footer_xml(numbering: &PageNumbering) -> String {
    let props = run_properties(&numbering.style);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:ftr xmlns:w="{WORD_NS}" xmlns:r="{REL_NS}">
  <w:p>
    <w:pPr><w:pStyle w:val="Footer"/><w:jc w:val="{align}"/></w:pPr>
    <w:r>{props}<w:fldChar w:fldCharType="begin"/></w:r>
    <w:r>{props}<w:instrText xml:space="preserve"> PAGE </w:instrText></w:r>
    <w:r>{props}<w:fldChar w:fldCharType="separate"/></w:r>
    <w:r>{props}<w:t>1</w:t></w:r>
    <w:r>{props}<w:fldChar w:fldCharType="end"/></w:r>
  </w:p>
</w:ftr>"#,
        align = jc(numbering.align),
    )
}

fn content_types_xml(with_footer: bool) -> String {
    let footer = if with_footer {
        r#"
  <Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>"#
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>{footer}
</Types>"#
    )
}

fn package_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#
}

fn document_rels_xml(with_footer: bool) -> String {
    let footer = if with_footer {
        r#"
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/>"#
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>{footer}
</Relationships>"#
    )
}
