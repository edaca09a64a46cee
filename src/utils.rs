//! Utility functions for text cleanup, escaping, dates and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - HTML/XML escaping and entity unescaping
//! - Tag stripping for feed descriptions
//! - Slugification for generated URLs
//! - Spanish date formatting for cards
//! - String truncation for logging
//! - File system validation for output directories

use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use deunicode::deunicode;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::borrow::Cow;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));

pub const MAX_SLUG_CHARS: usize = 100;

const MONTHS_ES: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sept", "oct", "nov", "dic",
];

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '&', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape text for XML documents (sitemaps).
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    match escape_html(s) {
        Cow::Borrowed(b) => Cow::Borrowed(b),
        Cow::Owned(o) => Cow::Owned(o.replace("&#39;", "&apos;")),
    }
}

/// Resolve the XML predefined entities, `&nbsp;` and numeric references.
///
/// Unknown entities are kept verbatim.
pub fn unescape_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Reduce an HTML fragment to its visible text with whitespace collapsed.
pub fn strip_html(fragment: &str) -> String {
    if !fragment.contains('<') {
        return collapse_whitespace(fragment);
    }
    let parsed = Html::parse_fragment(fragment);
    let text = parsed.root_element().text().collect::<String>();
    collapse_whitespace(&text)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert a title to a URL-friendly slug.
///
/// Folds accented letters to ASCII (`ó` → `o`, `ñ` → `n`), lowercases, drops
/// everything but letters, digits, whitespace and dashes, then turns
/// whitespace runs into single dashes. At most [`MAX_SLUG_CHARS`] long.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Fútbol 2025"), "futbol-2025");
/// ```
pub fn slugify(title: &str) -> String {
    let lower = deunicode(title).to_lowercase();
    let kept = NON_SLUG_CHARS.replace_all(&lower, "");
    let dashed = WHITESPACE_RUN.replace_all(kept.trim(), "-");
    let slug = DASH_RUN.replace_all(&dashed, "-");
    // ASCII only at this point, so byte slicing is safe.
    let capped = &slug[..slug.len().min(MAX_SLUG_CHARS)];
    capped.trim_matches('-').to_string()
}

/// Format a publication date the way cards show it, e.g. `"15 oct, 10:30"`.
pub fn format_date_es(date: Option<DateTime<FixedOffset>>) -> String {
    match date {
        Some(d) => format!(
            "{} {}, {:02}:{:02}",
            d.day(),
            MONTHS_ES[d.month0() as usize],
            d.hour(),
            d.minute()
        ),
        None => "Fecha no disponible".to_string(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a scratch file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let scratch_path = format!("{}/..__write_check__", path.trim_end_matches('/'));
    match stdfs::File::create(&scratch_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&scratch_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("ñññ", 2);
        assert_eq!(result, "ññ…(+2 bytes)");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("plain"), "plain");
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_xml_uses_apos() {
        assert_eq!(escape_xml("it's <ok>"), "it&apos;s &lt;ok&gt;");
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape_entities("no entities"), "no entities");
        assert_eq!(unescape_entities("a &amp; b"), "a & b");
        assert_eq!(unescape_entities("&lt;p&gt;"), "<p>");
        assert_eq!(unescape_entities("&#233;xito &#xE9;"), "éxito é");
        assert_eq!(unescape_entities("&unknown; & alone"), "&unknown; & alone");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hola <b>mundo</b></p>"), "Hola mundo");
        assert_eq!(strip_html("  sin   etiquetas "), "sin etiquetas");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Test -- Article!"), "test-article");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("Special@#$Characters"), "specialcharacters");
        assert_eq!(slugify("Fútbol 2025"), "futbol-2025");
    }

    #[test]
    fn test_slugify_folds_spanish_accents() {
        assert_eq!(
            slugify("Fútbol: la selección ganó en Bogotá"),
            "futbol-la-seleccion-gano-en-bogota"
        );
        assert_eq!(slugify("¿Qué pasó con el Año Niño?"), "que-paso-con-el-ano-nino");
    }

    #[test]
    fn test_slugify_caps_length() {
        let slug = slugify(&"palabra ".repeat(40));
        assert!(slug.len() <= MAX_SLUG_CHARS);
        assert!(slug.starts_with("palabra-palabra"));
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_format_date_es() {
        let d = DateTime::parse_from_rfc2822("Wed, 15 Oct 2025 10:05:00 GMT").unwrap();
        assert_eq!(format_date_es(Some(d)), "15 oct, 10:05");
        assert_eq!(format_date_es(None), "Fecha no disponible");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        ensure_writable_dir(nested.to_str().unwrap()).await.unwrap();
        assert!(nested.is_dir());
    }
}
