//! Trending keywords and the breaking-news ticker, both derived from the
//! items of the last build.
//!
//! # Trending
//!
//! Titles are lowercased, stripped of punctuation and split into words.
//! Words longer than [`MIN_KEYWORD_CHARS`] characters that are not Spanish
//! stopwords are counted; the [`TRENDING_LIMIT`] most frequent win.
//!
//! # Breaking news
//!
//! An item is breaking when its title carries one of [`IMPORTANT_KEYWORDS`]
//! or it comes from a top-priority outlet (BBC). The ticker is sorted by
//! outlet priority, then newest first, and holds at most [`MAX_BREAKING`]
//! items; each feed contributes its first [`BREAKING_ITEMS_PER_FEED`] items.

use crate::models::SourcedItem;
use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

pub const TRENDING_LIMIT: usize = 20;
pub const MIN_KEYWORD_CHARS: usize = 3;
pub const MAX_BREAKING: usize = 8;
pub const BREAKING_ITEMS_PER_FEED: usize = 5;

pub const IMPORTANT_KEYWORDS: [&str; 15] = [
    "urgente",
    "breaking",
    "última hora",
    "importante",
    "crítico",
    "emergencia",
    "crisis",
    "anuncio",
    "declaración",
    "elecciones",
    "presidente",
    "ministro",
    "gobierno",
    "economía",
    "mercado",
];

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "el", "la", "de", "del", "y", "a", "en", "un", "una", "es", "se", "no", "te", "lo", "le", "da", "su",
        "por", "son", "con", "para", "al", "como", "pero", "sus", "me", "hasta", "hay", "donde", "han",
        "quien", "están", "estado", "desde", "todo", "nos", "durante", "todos", "uno", "les", "ni", "contra",
        "otros", "ese", "eso", "ante", "ellos", "e", "esto", "mí", "antes", "algunos", "qué", "unos", "yo",
        "otro", "otras", "otra", "él", "tanto", "esa", "estos", "mucho", "quienes", "nada", "muchos", "cual",
        "poco", "ella", "estar", "estas", "algunas", "algo", "nosotros",
    ]
    .into_iter()
    .collect()
});

const TREND_CATEGORIES: [(&str, &[&str]); 5] = [
    ("política", &["gobierno", "presidente", "ministro", "elecciones", "congreso", "senado"]),
    ("economía", &["mercado", "dólar", "peso", "inflación", "economía", "finanzas"]),
    ("deportes", &["fútbol", "liga", "campeonato", "jugador", "equipo", "gol"]),
    ("tecnología", &["tecnología", "digital", "internet", "app", "software", "innovación"]),
    ("cultura", &["cine", "película", "música", "arte", "literatura", "teatro"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub word: String,
    pub count: usize,
}

impl Keyword {
    /// Topic the keyword belongs to, if any.
    pub fn category(&self) -> Option<&'static str> {
        TREND_CATEGORIES
            .iter()
            .find(|(_, words)| {
                words
                    .iter()
                    .any(|w| self.word.contains(w) || w.contains(self.word.as_str()))
            })
            .map(|(category, _)| *category)
    }
}

fn words(title: &str) -> impl Iterator<Item = String> + '_ {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > MIN_KEYWORD_CHARS && !STOPWORDS.contains(w.as_str()))
}

/// The `limit` most frequent keywords of `titles`, most frequent first.
/// Ties go alphabetically.
pub fn trending_keywords<'a>(titles: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<Keyword> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for title in titles {
        for word in words(title) {
            *counts.entry(word).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(word, count)| Keyword { word, count })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)))
        .take(limit)
        .collect()
}

/// Ticker priority of an outlet: BBC 3, Clarín 2, El Tiempo 1, others 0.
pub fn outlet_priority(fuente: Option<&str>) -> u8 {
    match fuente {
        Some("BBC") => 3,
        Some("Clarín") => 2,
        Some("El Tiempo") => 1,
        _ => 0,
    }
}

pub fn is_important(title: &str) -> bool {
    let title = title.to_lowercase();
    IMPORTANT_KEYWORDS.iter().any(|k| title.contains(k))
}

/// The breaking-news ticker for `items`.
pub fn breaking_news(items: &[SourcedItem]) -> Vec<SourcedItem> {
    let mut per_feed: HashMap<&str, usize> = HashMap::new();
    items
        .iter()
        .filter(|s| {
            let seen = per_feed.entry(s.feed_title.as_str()).or_default();
            *seen += 1;
            *seen <= BREAKING_ITEMS_PER_FEED
        })
        .filter(|s| is_important(&s.item.title) || outlet_priority(s.fuente.as_deref()) == 3)
        .sorted_by_key(|s| (Reverse(outlet_priority(s.fuente.as_deref())), Reverse(s.item.published_at())))
        .take(MAX_BREAKING)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsItem;

    fn sourced(title: &str, fuente: &str, feed: &str, pub_date: &str) -> SourcedItem {
        SourcedItem {
            item: NewsItem {
                title: title.to_string(),
                description: String::new(),
                link: format!("https://news/{}", title.len()),
                pub_date: pub_date.to_string(),
                image_url: None,
            },
            feed_title: feed.to_string(),
            categoria: None,
            fuente: Some(fuente.to_string()),
        }
    }

    #[test]
    fn test_trending_counts_and_filters() {
        let titles = [
            "Messi marca dos goles con la selección",
            "La selección gana: Messi figura",
            "Inflación y dólar, el mercado atento",
            "Para todos los gustos",
        ];
        let keywords = trending_keywords(titles, TRENDING_LIMIT);
        assert_eq!(keywords[0], Keyword { word: "messi".to_string(), count: 2 });
        assert_eq!(keywords[1], Keyword { word: "selección".to_string(), count: 2 });
        let words: Vec<_> = keywords.iter().map(|k| k.word.as_str()).collect();
        assert!(words.contains(&"inflación"));
        assert!(words.contains(&"dólar"));
        // short words and stopwords
        assert!(!words.contains(&"dos"));
        assert!(!words.contains(&"para"));
        assert!(!words.contains(&"todos"));
    }

    #[test]
    fn test_trending_limit() {
        let titles: Vec<String> = (0..30).map(|i| format!("palabra{i:02}")).collect();
        let keywords = trending_keywords(titles.iter().map(String::as_str), TRENDING_LIMIT);
        assert_eq!(keywords.len(), TRENDING_LIMIT);
        assert_eq!(keywords[0].word, "palabra00");
    }

    #[test]
    fn test_keyword_category() {
        let k = |w: &str| Keyword { word: w.to_string(), count: 1 };
        assert_eq!(k("elecciones").category(), Some("política"));
        assert_eq!(k("dólar").category(), Some("economía"));
        assert_eq!(k("futbolista").category(), None);
        assert_eq!(k("películas").category(), Some("cultura"));
    }

    #[test]
    fn test_is_important() {
        assert!(is_important("URGENTE: medidas del Gobierno"));
        assert!(is_important("Última hora en Bogotá"));
        assert!(!is_important("Receta de empanadas"));
    }

    #[test]
    fn test_breaking_sorted_by_priority_then_date() {
        let items = vec![
            sourced("Crisis en el mercado", "El Tiempo", "El Tiempo", "Wed, 15 Oct 2025 12:00:00 GMT"),
            sourced("Receta de empanadas", "Clarín", "Clarín", "Wed, 15 Oct 2025 12:00:00 GMT"),
            sourced("Anuncio del ministro", "Clarín", "Clarín", "Wed, 15 Oct 2025 09:00:00 GMT"),
            sourced("Weather today", "BBC", "BBC World", "Wed, 15 Oct 2025 08:00:00 GMT"),
            sourced("Elecciones: resultados", "Clarín", "Clarín", "Wed, 15 Oct 2025 11:00:00 GMT"),
        ];
        let titles: Vec<_> = breaking_news(&items).into_iter().map(|s| s.item.title).collect();
        assert_eq!(
            titles,
            vec![
                "Weather today",
                "Elecciones: resultados",
                "Anuncio del ministro",
                "Crisis en el mercado",
            ]
        );
    }

    #[test]
    fn test_breaking_caps_per_feed_and_total() {
        let items: Vec<_> = (0..20)
            .map(|i| sourced(&format!("BBC item {i}"), "BBC", "BBC World", ""))
            .chain((0..20).map(|i| sourced(&format!("Crisis {i}"), "Clarín", "Clarín", "")))
            .collect();
        let ticker = breaking_news(&items);
        assert_eq!(ticker.len(), MAX_BREAKING);
        assert_eq!(ticker.iter().filter(|s| s.feed_title == "BBC World").count(), BREAKING_ITEMS_PER_FEED);
    }
}
