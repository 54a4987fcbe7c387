//! Invoice sources: lazily parsed items fed to the pipelines.
//!
//! Any `IntoIterator<Item = SourceItem>` is a source. [`DirectorySource`]
//! is the file-backed one: it lists and sorts matching files up front and
//! parses one file per `next()`.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::core::{FatooraError, Invoice};

/// One unit of pipeline input: where it came from and what parsing produced.
#[derive(Debug)]
pub struct SourceItem {
    /// File path or other identifier, used for degraded results.
    pub origin: String,
    pub parsed: Result<Invoice, FatooraError>,
}

impl SourceItem {
    pub fn new(origin: impl Into<String>, parsed: Result<Invoice, FatooraError>) -> Self {
        Self {
            origin: origin.into(),
            parsed,
        }
    }
}

impl From<Invoice> for SourceItem {
    fn from(invoice: Invoice) -> Self {
        Self {
            origin: invoice.number.clone(),
            parsed: Ok(invoice),
        }
    }
}

/// Serialization of an invoice file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceFormat {
    /// ZATCA UBL 2.1 XML.
    Xml,
    /// The crate's JSON shape.
    Json,
}

impl InvoiceFormat {
    /// Detect from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xml" => Some(Self::Xml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse invoice text in the given format.
pub fn parse_invoice_str(text: &str, format: InvoiceFormat) -> Result<Invoice, FatooraError> {
    match format {
        #[cfg(feature = "xml")]
        InvoiceFormat::Xml => crate::ubl::from_ubl_xml(text),
        #[cfg(feature = "json")]
        InvoiceFormat::Json => crate::json::from_json(text),
        #[allow(unreachable_patterns)]
        other => {
            let _ = text;
            Err(FatooraError::Parse(format!(
                "{other:?} support is not enabled in this build"
            )))
        }
    }
}

/// Read and parse one invoice file; the format follows the extension.
pub fn parse_invoice_file(path: &Path) -> Result<Invoice, FatooraError> {
    let format = InvoiceFormat::from_path(path).ok_or_else(|| {
        FatooraError::Parse(format!("unsupported invoice file type: {}", path.display()))
    })?;
    let text = std::fs::read_to_string(path)
        .map_err(|e| FatooraError::Parse(format!("cannot read {}: {e}", path.display())))?;
    parse_invoice_str(&text, format)
}

/// Files of one directory matching a glob, in file-name order, parsed
/// lazily.
///
/// Chain correctness relies on that order: name files so that each series
/// sorts in issue order.
#[derive(Debug)]
pub struct DirectorySource {
    files: std::vec::IntoIter<PathBuf>,
}

impl DirectorySource {
    /// List `dir` (not recursively) and keep regular files whose name
    /// matches `pattern`, e.g. `*.xml`.
    pub fn open(dir: impl AsRef<Path>, pattern: &str) -> Result<Self, FatooraError> {
        let dir = dir.as_ref();
        let matcher = compile(pattern)?;
        let entries = std::fs::read_dir(dir)
            .map_err(|e| FatooraError::Source(format!("cannot read {}: {e}", dir.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| FatooraError::Source(format!("cannot list {}: {e}", dir.display())))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.file_name().is_some_and(|name| matcher.is_match(name)) {
                files.push(path);
            }
        }
        files.sort();

        debug!(dir = %dir.display(), pattern, files = files.len(), "opened invoice directory");
        Ok(Self {
            files: files.into_iter(),
        })
    }

    /// Files not yet yielded.
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher, FatooraError> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| FatooraError::Config(format!("invalid glob pattern {pattern}: {e}")))
}

impl Iterator for DirectorySource {
    type Item = SourceItem;

    fn next(&mut self) -> Option<SourceItem> {
        let path = self.files.next()?;
        let parsed = parse_invoice_file(&path);
        Some(SourceItem::new(path.display().to_string(), parsed))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.files.size_hint()
    }
}

impl ExactSizeIterator for DirectorySource {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn format_from_extension() {
        assert_eq!(InvoiceFormat::from_path(Path::new("a/b.XML")), Some(InvoiceFormat::Xml));
        assert_eq!(InvoiceFormat::from_path(Path::new("b.json")), Some(InvoiceFormat::Json));
        assert_eq!(InvoiceFormat::from_path(Path::new("b.pdf")), None);
        assert_eq!(InvoiceFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn directory_is_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xml", "a.xml", "c.json", "notes.txt"] {
            fs::write(dir.path().join(name), "<Invoice/>").unwrap();
        }
        fs::create_dir(dir.path().join("sub.xml")).unwrap();

        let source = DirectorySource::open(dir.path(), "*.xml").unwrap();
        assert_eq!(source.remaining(), 2);
        let origins: Vec<String> = source.map(|item| item.origin).collect();
        assert!(origins[0].ends_with("a.xml"));
        assert!(origins[1].ends_with("b.xml"));
    }

    #[test]
    fn unreadable_item_is_a_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.xml"), "<Invoice><cbc:ID>").unwrap();
        let mut source = DirectorySource::open(dir.path(), "*.xml").unwrap();
        let item = source.next().unwrap();
        assert!(matches!(item.parsed, Err(FatooraError::Parse(_))));
        assert!(source.next().is_none());
    }

    #[test]
    fn missing_directory_is_a_source_error() {
        let err = DirectorySource::open("/definitely/not/here", "*.xml").unwrap_err();
        assert!(matches!(err, FatooraError::Source(_)));
    }

    #[test]
    fn bad_glob_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectorySource::open(dir.path(), "[").unwrap_err();
        assert!(matches!(err, FatooraError::Config(_)));
    }
}
