// src/utils/text.rs

//! Text cleanup helpers shared by extractors and exports.

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fold a label for comparison: lowercase, no accents, no trailing colon.
pub fn fold_label(s: &str) -> String {
    let folded: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'º' | '°' => 'o',
            other => other,
        })
        .collect();
    normalize_whitespace(folded.trim_end_matches(|c: char| c == ':' || c.is_whitespace()))
}

/// Escape text for interpolation into HTML.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Make a string safe to embed in a file name.
///
/// Path separators, characters reserved on common filesystems, whitespace
/// and control characters become `-`.
pub fn sanitize_filename(s: &str) -> String {
    let replaced: String = s
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() || c.is_control() => '-',
            c => c,
        })
        .collect();

    // ".." must not survive as a path component
    let replaced = replaced.replace("..", "-");
    if replaced.is_empty() {
        "sin-numero".to_string()
    } else {
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_label() {
        assert_eq!(fold_label("  Descripción: "), "descripcion");
        assert_eq!(fold_label("TIPO DE\n PROCESO"), "tipo de proceso");
        assert_eq!(fold_label("Número"), "numero");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"A&B\"</b>"),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("2301/4521"), "2301-4521");
        assert_eq!(sanitize_filename("a\\b:c*d?e"), "a-b-c-d-e");
        assert_eq!(sanitize_filename("66001 40 03"), "66001-40-03");
        assert_eq!(sanitize_filename("../../etc"), "----etc");
        assert_eq!(sanitize_filename("   "), "sin-numero");
    }
}
