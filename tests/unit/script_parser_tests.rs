/*!
 * Tests for the script parsing pipeline
 */

use storydoc::errors::ParseError;
use storydoc::script::{NarrativeElement, ParsedUnit, ScriptParser, parse_script, referenced_characters};

use crate::common;

fn dialogue(speaker: &str, lines: &[&str]) -> NarrativeElement {
    NarrativeElement::Dialogue {
        speaker: speaker.to_string(),
        lines: lines.iter().map(|l| l.to_string()).collect(),
    }
}

fn narration(text: &str) -> NarrativeElement {
    NarrativeElement::Narration { text: text.to_string() }
}

#[test]
fn test_parse_withEveryContentKind_shouldLoseNothing() {
    let text = "第一章 黎明\n1097年 某日 上午 9:00\n阿米娅：博士？\n雨停了。";
    let report = parse_script(text).unwrap();

    assert_eq!(
        report.unit.elements,
        vec![
            NarrativeElement::SceneHeader { text: "第一章 黎明".to_string() },
            NarrativeElement::Timestamp { text: "1097年 某日 上午 9:00".to_string() },
            dialogue("阿米娅", &["博士？"]),
            narration("雨停了。"),
        ]
    );
}

#[test]
fn test_parse_withConsecutiveSpeakerLines_shouldMergeDialogue() {
    let report = parse_script("凯尔希：你好\n凯尔希：在吗").unwrap();
    assert_eq!(report.unit.elements, vec![dialogue("凯尔希", &["你好", "在吗"])]);
}

#[test]
fn test_parse_withNoiseLines_shouldDiscardThem() {
    let text = r#"{"storyCode": "1-7", "avgTag": "行动前"}
"eb_068cg_rain": "AVG_V068_rain_01",
Assets/Textures/bg_rain.png
@tok_0193
$bgm_m_bat_awaken
},
走廊里很安静。"#;
    let report = parse_script(text).unwrap();
    assert_eq!(report.unit.elements, vec![narration("走廊里很安静。")]);
}

#[test]
fn test_parse_withSoundCues_shouldKeepOnlyDescriptiveOnes() {
    let text = "雨停了。\n<雷声>\n<$bgm_m_bat_awaken>\n\"eb_068cg_rain\": \"AVG_V068_rain_01\"";
    let report = parse_script(text).unwrap();

    assert_eq!(
        report.unit.elements,
        vec![narration("雨停了。"), NarrativeElement::SoundEffect { text: "雷声".to_string() }]
    );
}

#[test]
fn test_parse_withWikiDump_shouldReportSkippedDirectives() {
    let report = parse_script(&common::sample_script("凯尔希", "你好")).unwrap();

    assert_eq!(
        report.unit.elements,
        vec![
            NarrativeElement::SoundEffect { text: "雷声".to_string() },
            dialogue("凯尔希", &["你好", "还有一件事。"]),
            narration("走廊里很安静。"),
        ]
    );
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped[0].text.starts_with("[HEADER"));
    assert_eq!(report.ambiguous, 0);
}

#[test]
fn test_parse_withImageDirective_shouldKeepImageInPlace() {
    let report = parse_script("[Dialog]\n阿米娅：这是……\n[Image(image=\"27_i01\", fadetime=1)]\n[Image]\n照片已经泛黄。").unwrap();

    assert_eq!(
        report.unit.elements,
        vec![
            dialogue("阿米娅", &["这是……"]),
            NarrativeElement::Image { id: "27_i01".to_string() },
            narration("照片已经泛黄。"),
        ]
    );
    let skipped: Vec<_> = report.skipped.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(skipped, vec!["[Dialog]", "[Image]"]);
}

#[test]
fn test_parse_withDanglingBracket_shouldFallBackToNarration() {
    let report = parse_script("<雷声\n雨停了。").unwrap();

    assert_eq!(report.ambiguous, 1);
    assert_eq!(report.unit.elements[0], narration("<雷声"));
}

#[test]
fn test_parse_withUnusableText_shouldFail() {
    for text in ["", "   \n  ", "你好\0", "乱码\u{FFFD}"] {
        let result = ScriptParser::new().parse(text);
        assert!(matches!(result, Err(ParseError::MalformedContent(_))), "{:?}", text);
    }
}

#[test]
fn test_parse_twice_shouldYieldEqualUnits() {
    let text = common::sample_script("阿米娅", "博士，您醒了吗？");
    let parser = ScriptParser::new();
    assert_eq!(parser.parse(&text).unwrap(), parser.parse(&text).unwrap());
}

#[test]
fn test_referencedCharacters_shouldDedupeAcrossScript() {
    let report = parse_script("凯尔希：醒了？\n博士：嗯。\n凯尔希：很好。\n阿米娅：博士！").unwrap();
    let units: Vec<ParsedUnit> = vec![report.unit];

    assert_eq!(referenced_characters(units.iter()), vec!["凯尔希", "博士", "阿米娅"]);
}

#[test]
fn test_parsedUnit_shouldSerializeWithKindTag() {
    let unit = ParsedUnit::new(vec![dialogue("凯尔希", &["你好"])]);
    let json = serde_json::to_string(&unit).unwrap();

    assert!(json.contains(r#""kind":"dialogue""#));
    let back: ParsedUnit = serde_json::from_str(&json).unwrap();
    assert_eq!(back, unit);
}
