use crate::extractor::PdfExtractor;
use crate::{ExtractionPolicy, IngestError, PageRecord, SkippedPdf};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// PDF files directly inside `folder`, sorted by path. Subfolders are not scanned.
pub fn discover_pdf_files(folder: &Path) -> Result<Vec<PathBuf>, IngestError> {
    if !folder.is_dir() {
        return Err(IngestError::InvalidArgument(format!(
            "document folder does not exist: {}",
            folder.display()
        )));
    }

    let mut files = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort_unstable();
    Ok(files)
}

pub struct LoadedPages {
    pub files: usize,
    pub pages: Vec<PageRecord>,
    pub skipped_files: Vec<SkippedPdf>,
}

fn source_name(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

fn load_file(path: &Path, extractor: &dyn PdfExtractor) -> Result<Vec<PageRecord>, IngestError> {
    let source = source_name(path)?;
    let pages = extractor
        .extract_pages(path)?
        .into_iter()
        .filter(|page| !page.text.trim().is_empty())
        .map(|page| PageRecord {
            text: page.text,
            source: source.clone(),
            page: page.number,
        })
        .collect();
    Ok(pages)
}

/// Extracts the non-empty pages of every PDF in `folder`, in file then page order.
pub fn load_pages(
    folder: &Path,
    extractor: &dyn PdfExtractor,
    policy: ExtractionPolicy,
) -> Result<LoadedPages, IngestError> {
    let files = discover_pdf_files(folder)?;
    let mut pages = Vec::new();
    let mut skipped_files = Vec::new();

    for path in &files {
        match load_file(path, extractor) {
            Ok(file_pages) => {
                info!(path = %path.display(), pages = file_pages.len(), "extracted pdf");
                pages.extend(file_pages);
            }
            Err(error) if policy == ExtractionPolicy::SkipUnreadable => {
                warn!(path = %path.display(), reason = %error, "skipped pdf");
                skipped_files.push(SkippedPdf {
                    path: path.clone(),
                    reason: error.to_string(),
                });
            }
            Err(error) => return Err(error),
        }
    }

    Ok(LoadedPages {
        files: files.len(),
        pages,
        skipped_files,
    })
}
