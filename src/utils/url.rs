// src/utils/url.rs

//! URL manipulation utilities.

use std::path::PathBuf;

use url::Url;

/// Where a source locator points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Remote(Url),
    File(PathBuf),
}

/// Classify a source locator.
///
/// `http(s)` URLs are remote, `file://` URLs and bare paths are local.
pub fn locate(source: &str) -> Option<Locator> {
    match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(Locator::Remote(url)),
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok().map(Locator::File),
        // Windows drive letters parse as a one-letter scheme
        Ok(url) if url.scheme().len() > 1 => None,
        _ => Some(Locator::File(PathBuf::from(source))),
    }
}

/// Lower-cased extension of the last path segment, ignoring query and fragment.
///
/// # Examples
/// ```
/// use estados::utils::url::path_extension;
///
/// assert_eq!(path_extension("https://x.gov.co/estados/J3.PDF?v=2"), Some("pdf".to_string()));
/// assert_eq!(path_extension("https://x.gov.co/estados/"), None);
/// ```
pub fn path_extension(source: &str) -> Option<String> {
    let path = match Url::parse(source) {
        Ok(url) if url.scheme().len() > 1 => url.path().to_string(),
        _ => source
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .replace('\\', "/"),
    };

    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
