use crate::ingest::discover_pdf_files;
use crate::IngestError;
use std::fs;
use std::path::Path;

pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Reduces a client-supplied name to a bare file name of `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Validates and writes an uploaded PDF into `folder`. Returns the stored file name.
pub fn save_upload(folder: &Path, file_name: &str, bytes: &[u8]) -> Result<String, IngestError> {
    if file_name.trim().is_empty() {
        return Err(IngestError::InvalidArgument("no file selected".to_string()));
    }

    let stored = sanitize_file_name(file_name);
    let is_pdf = stored
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(IngestError::InvalidArgument(
            "only PDF files are allowed".to_string(),
        ));
    }

    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(IngestError::InvalidArgument(format!(
            "file is {} bytes, limit is {MAX_UPLOAD_BYTES}",
            bytes.len()
        )));
    }

    fs::create_dir_all(folder)?;
    fs::write(folder.join(&stored), bytes)?;
    Ok(stored)
}

pub fn list_pdf_files(folder: &Path) -> Result<Vec<String>, IngestError> {
    if !folder.exists() {
        return Ok(Vec::new());
    }

    Ok(discover_pdf_files(folder)?
        .iter()
        .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
        .map(str::to_string)
        .collect())
}
