//! HTML and PDF byte-level extraction. Per §1 these are external
//! collaborators, described only by their interface shape
//! (`extract_html(bytes) -> text`, `extract_pdf(bytes) -> text`); the
//! engine does not attempt a from-scratch parser, it leans on the same
//! `scraper`/`readability` crates the teacher already depends on for its
//! own HTML cleanup pass.

use readability::extractor;
use scraper::Html;
use tracing::warn;

const SCANNED_PDF_NOTICE: &str =
    "[pdf contains no extractable text layer — likely a scanned image]";

pub fn extract_html(bytes: &[u8], url: &str) -> String {
    let text = String::from_utf8_lossy(bytes).to_string();

    let base_url = url
        .parse()
        .unwrap_or_else(|_| "http://localhost/".parse().expect("static fallback url is valid"));

    if let Ok(product) = extractor::extract(&mut text.as_bytes(), &base_url) {
        let cleaned = fallback_extract(&product.content);
        if !cleaned.is_empty() {
            return cleaned;
        }
    }

    fallback_extract(&text)
}

/// Direct selector-based fallback when `readability` can't find an article
/// body (thin pages, malformed markup).
fn fallback_extract(html: &str) -> String {
    let document = Html::parse_fragment(html);
    let text: String = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let normalized: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        warn!("html extraction yielded no text");
    }
    normalized
}

/// Extracts text from PDF bytes. Treated per §1 as an external interface;
/// this engine detects a scanned-image-only PDF (no extractable text
/// stream) and returns an informative notice rather than crashing, so the
/// caller can downgrade the source to low priority (§8 boundary behavior).
pub fn extract_pdf(bytes: &[u8]) -> String {
    let text = scan_pdf_text_objects(bytes);
    if text.trim().is_empty() {
        SCANNED_PDF_NOTICE.to_string()
    } else {
        text
    }
}

/// Very small heuristic scan for `(...) Tj` / `BT ... ET` text-showing
/// operators in an uncompressed PDF content stream. Not a general PDF
/// parser — sufficient to distinguish "has a text layer" from "scanned
/// image only", which is all this engine needs from the PDF path.
fn scan_pdf_text_objects(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    let mut out = String::new();
    let mut chars = raw.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '(' {
            if let Some(close) = raw[i + 1..].find(')') {
                let candidate = &raw[i + 1..i + 1 + close];
                if candidate.chars().filter(|c| c.is_ascii_graphic()).count() > candidate.len() / 2
                {
                    out.push_str(candidate);
                    out.push(' ');
                }
            }
        }
    }
    out
}

pub fn is_pdf_response(content_type: Option<&str>, url: &str) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
        .unwrap_or(false)
        || url.to_ascii_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_pdf_response_detects_content_type() {
        assert!(is_pdf_response(Some("application/pdf"), "https://x.com/a"));
    }

    #[test]
    fn is_pdf_response_detects_url_suffix() {
        assert!(is_pdf_response(None, "https://x.com/report.PDF".to_ascii_lowercase().as_str()));
    }

    #[test]
    fn extract_pdf_reports_scanned_image_only() {
        let bytes = b"%PDF-1.4\n%binary image data, no text operators\n";
        assert_eq!(extract_pdf(bytes), SCANNED_PDF_NOTICE);
    }

    #[test]
    fn fallback_extract_strips_tags() {
        let html = "<html><body><p>Hello <b>world</b></p></body></html>";
        assert_eq!(fallback_extract(html), "Hello world");
    }
}
