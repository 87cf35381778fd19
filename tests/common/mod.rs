/*!
 * Common test utilities for the storydoc test suite
 */

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod mock_retriever;

/// Route library logs through env_logger; repeated calls are no-ops
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, creating parent directories
pub fn create_test_file(dir: &Path, relative: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(relative);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A short chapter script in the wiki dump format, with engine noise mixed in
pub fn sample_script(speaker: &str, line: &str) -> String {
    format!(
        r#"[HEADER(key="title_test", is_skippable=true, fit_mode="BLACK_MASK")]
[Background(image="bg_corridor", screenadapt="coverall")]
"eb_068cg_rain": "AVG_V068_rain_01",
$bgm_m_bat_awaken
<雷声>
[name="{speaker}"]{line}
[name="{speaker}"]还有一件事。
走廊里很安静。
"#
    )
}

/// Read one part of a docx package as text
pub fn read_docx_part(path: &Path, part: &str) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name(part)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

/// Names of every part in a docx package
pub fn docx_part_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let archive = zip::ZipArchive::new(file)?;
    Ok(archive.file_names().map(str::to_string).collect())
}

/// Byte offsets of `needles` in `haystack`; panics when one is missing
pub fn positions_of(haystack: &str, needles: &[&str]) -> Vec<usize> {
    needles
        .iter()
        .map(|needle| haystack.find(needle).unwrap_or_else(|| panic!("'{}' not found", needle)))
        .collect()
}
