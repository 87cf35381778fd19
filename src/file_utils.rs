use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

// @module: File and directory utilities

/// Suffix of per-name output files for chapter exports
pub const STORY_SUFFIX: &str = "story";

/// Suffix of per-name output files for character record exports
pub const MEMORY_SUFFIX: &str = "memory";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    // @returns: Requested names, trimmed, without blanks, comments or repeats
    pub fn normalize_names<I, S>(names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            if !result.iter().any(|n| n == name) {
                result.push(name.to_string());
            }
        }
        result
    }

    /// Names from the command line followed by those in `names_file`
    ///
    /// Fails when nothing usable remains.
    pub fn load_names(cli_names: &[String], names_file: Option<&Path>) -> Result<Vec<String>> {
        let mut raw: Vec<String> = cli_names.to_vec();
        if let Some(path) = names_file {
            let content = Self::read_to_string(path)?;
            raw.extend(content.lines().map(str::to_string));
        }

        let names = Self::normalize_names(raw);
        if names.is_empty() {
            return Err(anyhow!("No names given. Pass names as arguments or with --names-file"));
        }
        Ok(names)
    }

    // @returns: Name reduced to letters, digits, spaces, '-' and '_'
    pub fn safe_file_name(name: &str) -> String {
        let safe: String = name
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
            .collect();
        let safe = safe.trim();
        if safe.is_empty() { "unnamed".to_string() } else { safe.to_string() }
    }

    // @generates: `<output_dir>/<safe name>_<suffix>.<extension>`
    pub fn output_path<P: AsRef<Path>>(output_dir: P, name: &str, suffix: &str, extension: &str) -> PathBuf {
        output_dir.as_ref().join(format!("{}_{}.{}", Self::safe_file_name(name), suffix, extension))
    }

    // @generates: `<output_dir>/combined_<suffix>.<extension>`
    pub fn combined_output_path<P: AsRef<Path>>(output_dir: P, suffix: &str, extension: &str) -> PathBuf {
        output_dir.as_ref().join(format!("combined_{}.{}", suffix, extension))
    }

    // @generates: Sidecar report path next to an output file
    pub fn skipped_report_path(output: &Path) -> PathBuf {
        output.with_extension("skipped.txt")
    }
}
