//! Content-type lookup for the delivery tier.
//!
//! The table is deliberately small: it covers exactly the asset kinds the
//! inspector tree contains, and everything else is served as a generic
//! binary stream.

use std::path::Path;

/// Common content-type constants.
pub mod types {
    pub const BIN: &str = "application/octet-stream";
    pub const HTML: &str = "text/html; charset=UTF-8";
    pub const JAVASCRIPT: &str = "text/javascript";
    pub const CSS: &str = "text/css";
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const ICO: &str = "image/x-icon";
    pub const SVG: &str = "image/svg+xml";
    pub const PLAIN: &str = "text/plain";
}

/// Guess content type from a file path's extension.
pub fn from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    from_extension(ext.as_deref())
}

/// Guess content type from a (lowercased) extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("js") => types::JAVASCRIPT,
        Some("css") => types::CSS,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("ico") => types::ICO,
        Some("svg") => types::SVG,
        _ => types::BIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(&PathBuf::from("Main.min.html")), types::HTML);
        assert_eq!(from_path(&PathBuf::from("Main.min.js")), types::JAVASCRIPT);
        assert_eq!(from_path(&PathBuf::from("Main.min.css")), types::CSS);
        assert_eq!(from_path(&PathBuf::from("Images/Gear.svg")), types::SVG);
        assert_eq!(from_path(&PathBuf::from("Images/Gear.PNG")), types::PNG);
        assert_eq!(from_path(&PathBuf::from("unknown.xyz")), types::BIN);
        assert_eq!(from_path(&PathBuf::from("no_extension")), types::BIN);
    }
}
