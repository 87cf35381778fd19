/*!
 * Tests for file utilities
 */

use std::path::{Path, PathBuf};

use anyhow::Result;
use storydoc::file_utils::{FileManager, MEMORY_SUFFIX, STORY_SUFFIX};

use crate::common;

#[test]
fn test_normalizeNames_shouldTrimDropCommentsAndDedupe() {
    let names = FileManager::normalize_names(["  凯尔希 ", "", "# 注释", "阿米娅", "凯尔希", "   "]);
    assert_eq!(names, vec!["凯尔希", "阿米娅"]);
}

#[test]
fn test_loadNames_shouldAppendFileNamesAfterArguments() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let file = common::create_test_file(dir.path(), "names.txt", "# chapters\n1-7\n\n1-8\n0-1\n")?;

    let names = FileManager::load_names(&["0-1".to_string()], Some(file.as_path()))?;

    assert_eq!(names, vec!["0-1", "1-7", "1-8"]);
    Ok(())
}

#[test]
fn test_loadNames_withNothingUsable_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let file = common::create_test_file(dir.path(), "names.txt", "# only a comment\n\n")?;

    assert!(FileManager::load_names(&[], Some(file.as_path())).is_err());
    assert!(FileManager::load_names(&[" ".to_string()], None).is_err());
    Ok(())
}

#[test]
fn test_loadNames_withMissingFile_shouldFail() {
    assert!(FileManager::load_names(&["1-7".to_string()], Some(Path::new("/nonexistent/names.txt"))).is_err());
}

#[test]
fn test_safeFileName_shouldStripPathAndPunctuation() {
    assert_eq!(FileManager::safe_file_name("1-7 暴君"), "1-7 暴君");
    assert_eq!(FileManager::safe_file_name("a/b:c*d?"), "abcd");
    assert_eq!(FileManager::safe_file_name("../"), "unnamed");
}

#[test]
fn test_outputPaths_shouldFollowNamingScheme() {
    let dir = PathBuf::from("out");
    assert_eq!(FileManager::output_path(&dir, "凯尔希", MEMORY_SUFFIX, "docx"), dir.join("凯尔希_memory.docx"));
    assert_eq!(FileManager::output_path(&dir, "1-7", STORY_SUFFIX, "docx"), dir.join("1-7_story.docx"));
    assert_eq!(FileManager::combined_output_path(&dir, STORY_SUFFIX, "docx"), dir.join("combined_story.docx"));
    assert_eq!(
        FileManager::skipped_report_path(&dir.join("1-7_story.docx")),
        dir.join("1-7_story.skipped.txt")
    );
}

#[test]
fn test_writeToFile_shouldCreateParentDirectories() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("a").join("b").join("report.txt");

    FileManager::write_to_file(&path, "内容")?;

    assert_eq!(FileManager::read_to_string(&path)?, "内容");
    Ok(())
}
