/*!
 * Local directory retriever.
 *
 * Layout under the root:
 *
 * ```text
 * chapters/<name>/<script>.txt     one script per file, ordered by file name
 * chapters/<name>.txt               a single-script chapter
 * characters/<name>/<script>.txt
 * characters/<name>.txt
 * ```
 *
 * Files are read fresh on every run; nothing from a directory source goes
 * through the fetch cache, so edits to a script show up immediately.
 */

use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{Listing, ListingEntry, ListingKind, ScriptRetriever};
use crate::errors::RetrievalError;

const SCRIPT_EXTENSION: &str = "txt";

pub struct DirectoryRetriever {
    root: PathBuf,
}

impl DirectoryRetriever {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: ListingKind) -> PathBuf {
        match kind {
            ListingKind::Chapter => self.root.join("chapters"),
            ListingKind::Character => self.root.join("characters"),
        }
    }

    fn scripts_in(dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION)))
            .collect()
    }
}

fn entry_for(path: &Path) -> ListingEntry {
    let title = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    ListingEntry::new(title, path.to_string_lossy())
}

#[async_trait]
impl ScriptRetriever for DirectoryRetriever {
    fn source_id(&self) -> String {
        let root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        format!("dir:{}", root.display())
    }

    fn cacheable(&self) -> bool {
        false
    }

    async fn fetch_listing(&self, kind: ListingKind, name: &str) -> Result<Listing, RetrievalError> {
        let base = self.kind_dir(kind);
        let dir = base.join(name);
        let single = base.join(format!("{}.{}", name, SCRIPT_EXTENSION));

        let paths = if dir.is_dir() {
            Self::scripts_in(&dir)
        } else if single.is_file() {
            vec![single]
        } else {
            Vec::new()
        };

        if paths.is_empty() {
            return Err(RetrievalError::NotFound(name.to_string()));
        }

        debug!("Found {} local script(s) for {} '{}'", paths.len(), kind, name);
        Ok(Listing::new(paths.iter().map(|p| entry_for(p)).collect()))
    }

    async fn fetch_script(&self, entry: &ListingEntry) -> Result<String, RetrievalError> {
        let path = PathBuf::from(&entry.target);
        match tokio::fs::read(&path).await {
            Ok(bytes) => String::from_utf8(bytes).map_err(|e| RetrievalError::InvalidResponse {
                name: entry.target.clone(),
                message: format!("not valid UTF-8: {}", e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RetrievalError::NotFound(entry.target.clone())),
            Err(e) => Err(RetrievalError::RequestFailed { name: entry.target.clone(), message: e.to_string() }),
        }
    }
}
