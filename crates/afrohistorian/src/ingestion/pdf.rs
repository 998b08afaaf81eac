//! PDF to plain-text conversion

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::ingestion::content::{clean_text, extract_core_content};

const EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of converting one PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfConversion {
    /// Where the text was written
    pub output_path: PathBuf,
    /// Characters of core content written
    pub chars: usize,
}

/// Output path used when none is given: the input with a `.txt` extension
pub fn default_output_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("txt")
}

/// Extract the text of every page, one page after another
pub fn extract_pdf_text(pdf_path: &Path) -> Result<String> {
    let name = pdf_path.display().to_string();
    let data = fs::read(pdf_path)?;

    match extract_with_timeout(data.clone()) {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        Ok(_) => {
            tracing::warn!("pdf-extract found no text in {}, trying fallback", name);
            extract_pdf_text_fallback(&name, &data)
        }
        Err(reason) => {
            tracing::warn!("pdf-extract failed on {}: {}, trying fallback", name, reason);
            extract_pdf_text_fallback(&name, &data)
        }
    }
}

/// Run pdf-extract on its own thread; some fonts make it hang or panic
fn extract_with_timeout(data: Vec<u8>) -> std::result::Result<String, String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string()));
    });

    match rx.recv_timeout(EXTRACT_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(format!("timed out after {:?}", EXTRACT_TIMEOUT)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err("extraction thread crashed".to_string()),
    }
}

/// Page-by-page extraction with lopdf
fn extract_pdf_text_fallback(name: &str, data: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::file_parse(name, format!("Failed to load PDF: {}", e)))?;

    let mut all_text = String::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(text) => {
                all_text.push_str(&text);
                all_text.push('\n');
            }
            Err(e) => tracing::debug!("Could not extract page {} of {}: {}", page_num, name, e),
        }
    }

    if all_text.trim().is_empty() {
        return Err(Error::file_parse(
            name,
            "PDF appears to be image-based or has no extractable text",
        ));
    }

    Ok(all_text)
}

/// Convert a PDF into a text file holding its cleaned core content.
///
/// Errors are logged and returned; a partially written output file may remain.
pub fn pdf_to_txt(pdf_path: &Path, output_path: Option<&Path>) -> Result<PdfConversion> {
    let result = convert(pdf_path, output_path);
    match &result {
        Ok(conversion) => {
            tracing::info!(
                "Successfully converted {} to {}",
                pdf_path.display(),
                conversion.output_path.display()
            );
            tracing::info!("Extracted {} characters of core content", conversion.chars);
        }
        Err(e) => tracing::error!("Error converting {}: {}", pdf_path.display(), e),
    }
    result
}

fn convert(pdf_path: &Path, output_path: Option<&Path>) -> Result<PdfConversion> {
    if !pdf_path.exists() {
        return Err(Error::file_parse(
            pdf_path.display().to_string(),
            "File not found",
        ));
    }

    let full_text = extract_pdf_text(pdf_path)?;
    let cleaned = clean_text(&extract_core_content(&full_text));

    let output_path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(pdf_path));
    fs::write(&output_path, &cleaned)?;

    Ok(PdfConversion {
        output_path,
        chars: cleaned.chars().count(),
    })
}
