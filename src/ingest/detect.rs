use std::path::Path;

use crate::models::ContentKind;

/// Map a file name and MIME hint to a content kind. An explicit override wins
/// unconditionally and is not checked against the bytes.
pub fn detect(name: &str, mime_hint: &str, override_kind: Option<ContentKind>) -> ContentKind {
    if let Some(kind) = override_kind {
        return kind;
    }

    let name = name.to_lowercase();
    if name.ends_with(".csv") {
        ContentKind::Csv
    } else if name.ends_with(".xls") || name.ends_with(".xlsx") {
        ContentKind::Excel
    } else if name.ends_with(".json") {
        ContentKind::Json
    } else if name.ends_with(".pdf") {
        ContentKind::Pdf
    } else if is_image(mime_hint) {
        ContentKind::Image
    } else {
        ContentKind::Text
    }
}

fn is_image(mime_hint: &str) -> bool {
    mime_hint
        .trim()
        .parse::<mime::Mime>()
        .map(|m| m.type_() == mime::IMAGE)
        .unwrap_or(false)
}

/// MIME hint for a local file, as a browser upload would report it.
pub fn mime_hint_for_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_match_is_case_insensitive() {
        assert_eq!(detect("report.CSV", "text/csv", None), ContentKind::Csv);
        assert_eq!(detect("Inventory.XLSX", "", None), ContentKind::Excel);
        assert_eq!(detect("legacy.xls", "", None), ContentKind::Excel);
        assert_eq!(detect("apps.Json", "", None), ContentKind::Json);
        assert_eq!(detect("arch.pdf", "", None), ContentKind::Pdf);
    }

    #[test]
    fn test_mime_fallbacks() {
        assert_eq!(detect("x", "image/png", None), ContentKind::Image);
        assert_eq!(detect("x", "application/octet-stream", None), ContentKind::Text);
        assert_eq!(detect("notes", "", None), ContentKind::Text);
        assert_eq!(detect("scan", "image/jpeg; name=scan", None), ContentKind::Image);
        assert_eq!(detect("scan", "not a mime", None), ContentKind::Text);
    }

    #[test]
    fn test_extension_beats_mime() {
        assert_eq!(detect("scan.pdf", "image/png", None), ContentKind::Pdf);
    }

    #[test]
    fn test_override_is_returned_unchanged() {
        assert_eq!(detect("data.csv", "text/csv", Some(ContentKind::Image)), ContentKind::Image);
    }

    #[test]
    fn test_mime_hint_for_path() {
        assert_eq!(mime_hint_for_path(Path::new("diagram.png")), "image/png");
        assert_eq!(mime_hint_for_path(Path::new("no_extension")), "application/octet-stream");
    }
}
