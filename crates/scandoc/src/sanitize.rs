//! Helpers for sanitizing caller-supplied data before it reaches tracing
//! spans or the blob store.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Strips the query string from a URL so signed tokens never reach the logs.
pub fn redact_url(url: &str) -> String {
    match url.find('?') {
        Some(pos) => format!("{}?****", &url[..pos]),
        None => url.to_string(),
    }
}

/// Turns an uploaded filename into a flat object name for the blob store.
///
/// Directory components are dropped and every character outside
/// `[A-Za-z0-9._-]` becomes `_`. Returns `None` when nothing usable is left.
pub fn object_name(filename: &str) -> Option<String> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/home/user/Documents/invoice.pdf")),
            "invoice.pdf"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_redact_url_strips_query() {
        assert_eq!(
            redact_url("https://x.supabase.co/storage/v1/object/sign/a.pdf?token=abc"),
            "https://x.supabase.co/storage/v1/object/sign/a.pdf?****"
        );
        assert_eq!(
            redact_url("https://x.supabase.co/a.pdf"),
            "https://x.supabase.co/a.pdf"
        );
    }

    #[test]
    fn test_object_name_keeps_plain_names() {
        assert_eq!(object_name("invoice.pdf").as_deref(), Some("invoice.pdf"));
        assert_eq!(
            object_name("scan-2024_01.pdf").as_deref(),
            Some("scan-2024_01.pdf")
        );
    }

    #[test]
    fn test_object_name_drops_directories() {
        assert_eq!(object_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(
            object_name("C:\\Users\\me\\factura.pdf").as_deref(),
            Some("factura.pdf")
        );
    }

    #[test]
    fn test_object_name_replaces_unsafe_characters() {
        assert_eq!(
            object_name("recibo de luz (marzo).pdf").as_deref(),
            Some("recibo_de_luz__marzo_.pdf")
        );
        assert_eq!(object_name("añó.pdf").as_deref(), Some("a__.pdf"));
    }

    #[test]
    fn test_object_name_rejects_empty() {
        assert_eq!(object_name(""), None);
        assert_eq!(object_name(".."), None);
        assert_eq!(object_name("dir/"), None);
    }
}
