//! Rendered preview artifacts.
//!
//! The engine hands back opaque bytes; the document only keeps them once
//! they look like a PDF it can show.

use std::sync::Arc;

use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_TRAILER: &[u8] = b"%%EOF";
/// Incremental updates may put a little garbage after the last trailer.
const TRAILER_WINDOW: usize = 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreviewError {
    #[error("artifact is empty")]
    Empty,

    #[error("artifact is not a PDF document")]
    NotPdf,

    #[error("unsupported PDF version `{0}`")]
    UnsupportedVersion(String),

    #[error("PDF document is truncated (no end-of-file marker)")]
    Truncated,
}

/// A decoded, renderable preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    bytes: Arc<[u8]>,
    version: String,
    page_count: usize,
}

impl Preview {
    pub fn decode(bytes: Arc<[u8]>) -> Result<Self, PreviewError> {
        if bytes.is_empty() {
            return Err(PreviewError::Empty);
        }
        let rest = bytes.strip_prefix(PDF_MAGIC).ok_or(PreviewError::NotPdf)?;

        let version: String = rest
            .iter()
            .take_while(|b| b.is_ascii_digit() || **b == b'.')
            .map(|&b| b as char)
            .collect();
        match version.split_once('.') {
            Some(("1", minor)) if !minor.is_empty() => {}
            Some(("2", "0")) => {}
            _ => return Err(PreviewError::UnsupportedVersion(version)),
        }

        let tail = &bytes[bytes.len().saturating_sub(TRAILER_WINDOW)..];
        if !contains(tail, PDF_TRAILER) {
            return Err(PreviewError::Truncated);
        }

        let page_count = count_pages(&bytes);
        Ok(Self {
            bytes,
            version,
            page_count,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of page objects. Best-effort: compressed object streams hide
    /// their pages, in which case this is zero.
    pub fn page_count(&self) -> usize {
        self.page_count
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Count `/Type /Page` dictionary entries, excluding `/Type /Pages`.
fn count_pages(bytes: &[u8]) -> usize {
    let mut count = 0;
    let mut i = 0;
    while let Some(offset) = find(&bytes[i..], b"/Type") {
        let mut j = i + offset + b"/Type".len();
        while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
            j += 1;
        }
        if bytes[j..].starts_with(b"/Page") {
            let after = bytes.get(j + b"/Page".len());
            if !after.is_some_and(u8::is_ascii_alphanumeric) {
                count += 1;
            }
        }
        i = j;
    }
    count
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest document that passes `Preview::decode`.
    pub(crate) fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut pdf = b"%PDF-1.7\n1 0 obj << /Type /Pages /Count 1 >> endobj\n".to_vec();
        for n in 0..pages {
            pdf.extend_from_slice(format!("{} 0 obj << /Type /Page >> endobj\n", n + 2).as_bytes());
        }
        pdf.extend_from_slice(b"trailer << >>\n%%EOF\n");
        pdf
    }

    #[test]
    fn test_decode_counts_pages() {
        let preview = Preview::decode(sample_pdf(3).into()).unwrap();
        assert_eq!(preview.version(), "1.7");
        assert_eq!(preview.page_count(), 3);
        assert_eq!(&*preview.shared_bytes(), preview.bytes());
    }

    #[test]
    fn test_decode_rejects_non_pdf() {
        assert_eq!(Preview::decode(Arc::from(&b""[..])), Err(PreviewError::Empty));
        assert_eq!(
            Preview::decode(Arc::from(&b"\x89PNG\r\n"[..])),
            Err(PreviewError::NotPdf)
        );
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let mut pdf = sample_pdf(1);
        pdf.truncate(pdf.len() - 7);
        assert_eq!(Preview::decode(pdf.into()), Err(PreviewError::Truncated));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        assert!(matches!(
            Preview::decode(Arc::from(&b"%PDF-9.9\n%%EOF"[..])),
            Err(PreviewError::UnsupportedVersion(v)) if v == "9.9"
        ));
    }
}
