/*!
 * Tests for document assembly and the DOCX writer
 */

use anyhow::Result;
use storydoc::document::{
    Block, CharacterRecord, DocumentSpec, DocumentWriter, DocxWriter, LayoutConfig, LayoutSettings, PageSize, Role,
    Section, assemble,
};
use storydoc::script::{NarrativeElement, ParsedUnit, parse_script};

use crate::common;

fn unit_of(text: &str) -> ParsedUnit {
    parse_script(text).unwrap().unit
}

fn record(name: &str, title: &str) -> CharacterRecord {
    CharacterRecord::new(name, title, ParsedUnit::new(vec![NarrativeElement::Narration { text: format!("{}的记录。", name) }]))
}

fn layout_with(edit: impl FnOnce(&mut LayoutSettings)) -> LayoutConfig {
    let mut settings = LayoutSettings::default();
    edit(&mut settings);
    LayoutConfig::new(settings).unwrap()
}

#[test]
fn test_assemble_twice_shouldBeStructurallyEqual() {
    let spec = DocumentSpec::new(LayoutConfig::default())
        .with_main_title("1-7 暴君")
        .with_sections(vec![Section::new("行动前", unit_of("凯尔希：你好\n<雷声>\n雨停了。"))]);

    assert_eq!(assemble(&spec), assemble(&spec));
}

#[test]
fn test_assemble_shouldPlaceTitlesInOrder() {
    let spec = DocumentSpec::new(LayoutConfig::default())
        .with_main_title("1-7 暴君")
        .with_sections(vec![
            Section::new("行动前", unit_of("凯尔希：你好")),
            Section::new("行动后", unit_of("阿米娅：博士！")),
        ]);
    let document = assemble(&spec);

    assert_eq!(document.headings(Role::MainTitle), vec!["1-7 暴君"]);
    assert_eq!(document.headings(Role::UnitTitle), vec!["行动前", "行动后"]);
    assert!(matches!(document.blocks.first(), Some(Block::Paragraph(p)) if p.role == Role::MainTitle));
}

#[test]
fn test_assemble_withRecords_shouldOrderAppendixBySpeakers() {
    let sections = vec![Section::new("行动前", unit_of("凯尔希：醒了？\n博士：嗯。\n凯尔希：很好。\n阿米娅：博士！"))];
    let records = vec![record("阿米娅", "档案一"), record("凯尔希", "档案一"), record("博士", "档案一"), record("W", "档案一")];

    let document = assemble(
        &DocumentSpec::new(LayoutConfig::default()).with_sections(sections).with_appendix(records),
    );

    assert_eq!(document.headings(Role::AppendixHeading), vec!["相关角色秘录"]);
    assert_eq!(
        document.headings(Role::RecordTitle),
        vec!["凯尔希：档案一", "博士：档案一", "阿米娅：档案一"]
    );
    assert!(document.blocks.iter().any(|b| matches!(b, Block::PageBreak)));
}

#[test]
fn test_assemble_withPageNumbersOff_shouldOmitNumbering() {
    let layout = layout_with(|s| s.page_numbers = false);
    let document = assemble(&DocumentSpec::new(layout).with_sections(vec![Section::new("序", unit_of("雨停了。"))]));
    assert!(document.page_numbers.is_none());
}

#[test]
fn test_docxWriter_shouldWriteRequiredParts() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("out").join("test_story.docx");
    let layout = layout_with(|s| s.page_size = PageSize::Letter);
    let document = assemble(
        &DocumentSpec::new(layout)
            .with_main_title("序章")
            .with_sections(vec![Section::new("开端", unit_of("凯尔希：你好 & <再见>"))]),
    );

    DocxWriter::new().write(&document, &path)?;

    let parts = common::docx_part_names(&path)?;
    for part in ["[Content_Types].xml", "_rels/.rels", "word/document.xml", "word/_rels/document.xml.rels", "word/styles.xml", "word/footer1.xml"] {
        assert!(parts.iter().any(|p| p == part), "missing {}", part);
    }

    let body = common::read_docx_part(&path, "word/document.xml")?;
    assert!(body.contains(r#"<w:pgSz w:w="12240" w:h="15840"/>"#));
    assert!(body.contains("你好 &amp; &lt;再见&gt;"));
    assert!(body.contains(r#"<w:footerReference w:type="default" r:id="rId2"/>"#));

    let footer = common::read_docx_part(&path, "word/footer1.xml")?;
    assert!(footer.contains("PAGE"));
    Ok(())
}

#[test]
fn test_docxWriter_withoutPageNumbers_shouldOmitFooter() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("plain.docx");
    let layout = layout_with(|s| s.page_numbers = false);
    let document = assemble(&DocumentSpec::new(layout).with_sections(vec![Section::new("序", unit_of("雨停了。"))]));

    DocxWriter::new().write(&document, &path)?;

    let parts = common::docx_part_names(&path)?;
    assert!(!parts.iter().any(|p| p == "word/footer1.xml"));
    let types = common::read_docx_part(&path, "[Content_Types].xml")?;
    assert!(!types.contains("footer"));
    let body = common::read_docx_part(&path, "word/document.xml")?;
    assert!(!body.contains("footerReference"));
    Ok(())
}

#[test]
fn test_docxWriter_shouldReplaceExistingFileWithoutLeftovers() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "old.docx", "not a zip")?;
    let document = assemble(&DocumentSpec::new(LayoutConfig::default()).with_sections(vec![Section::new("序", unit_of("雨停了。"))]));

    DocxWriter::new().write(&document, &path)?;

    assert!(common::docx_part_names(&path)?.iter().any(|p| p == "word/document.xml"));
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}

#[test]
fn test_docxWriter_onDirectoryTarget_shouldFailWithoutTouchingIt() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let target = dir.path().join("taken.docx");
    std::fs::create_dir(&target)?;
    let document = assemble(&DocumentSpec::new(LayoutConfig::default()));

    let result = DocxWriter::new().write(&document, &target);

    assert!(result.is_err());
    assert!(target.is_dir());
    Ok(())
}

#[test]
fn test_assemble_withImages_shouldNumberPerDocumentAndAppendList() {
    let first = unit_of("[Image(image=\"27_i01\")]\n凯尔希：看。\n[Image(image=\"27_i02\")]");
    let second = unit_of("[Image(image=\"27_i02\")]\n[Image(image=\"27_i03\")]");
    let spec = DocumentSpec::new(LayoutConfig::default())
        .with_sections(vec![Section::new("一", first), Section::new("二", second)]);

    let document = assemble(&spec);

    assert_eq!(
        document.headings(Role::ImageReference),
        vec!["[图片: 图片1]", "[图片: 图片2]", "[图片: 图片2]", "[图片: 图片3]"]
    );
    assert_eq!(document.headings(Role::ImageHeading), vec!["━━━ 图片 ━━━"]);
    assert_eq!(document.headings(Role::ImageCaption), vec!["图片1：27_i01", "图片2：27_i02", "图片3：27_i03"]);
    assert!(matches!(document.blocks.last(), Some(Block::Paragraph(p)) if p.role == Role::ImageCaption));

    let single = assemble(&DocumentSpec::new(LayoutConfig::default()).with_sections(vec![Section::new(
        "二",
        unit_of("[Image(image=\"27_i02\")]"),
    )]));
    assert_eq!(single.headings(Role::ImageReference), vec!["[图片: 图片1]"]);
}

#[test]
fn test_assemble_withImagesInRecords_shouldListThemAfterRecords() {
    let story = unit_of("凯尔希：醒了？");
    let record = CharacterRecord::new("凯尔希", "往事", unit_of("[Image(image=\"avg_k_01\")]\n凯尔希：很久以前。"));
    let document = assemble(
        &DocumentSpec::new(LayoutConfig::default())
            .with_sections(vec![Section::new("一", story)])
            .with_appendix(vec![record]),
    );

    let text = document.plain_text();
    let records_at = text.find("相关角色秘录").expect("records heading");
    let images_at = text.find("━━━ 图片 ━━━").expect("image heading");
    let reference_at = text.find("[图片: 图片1]").expect("image reference");
    assert!(records_at < reference_at && reference_at < images_at);
    assert_eq!(document.blocks.iter().filter(|b| matches!(b, Block::PageBreak)).count(), 2);
}

#[test]
fn test_docxWriter_withImagesAndControlCharacters_shouldWriteValidText() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("images.docx");
    let unit = ParsedUnit::new(vec![
        NarrativeElement::Image { id: "27_i01".to_string() },
        NarrativeElement::Narration { text: "雨\u{0B}停\u{1B}了。".to_string() },
    ]);
    let document = assemble(&DocumentSpec::new(LayoutConfig::default()).with_sections(vec![Section::new("序", unit)]));

    DocxWriter::new().write(&document, &path)?;

    let body = common::read_docx_part(&path, "word/document.xml")?;
    assert!(body.contains("[图片: 图片1]"));
    assert!(body.contains("图片1：27_i01"));
    assert!(body.contains("雨停了。"));
    assert!(!body.chars().any(|c| c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')));
    Ok(())
}
