//! Static content shown in place of a feed that could not be loaded.
//!
//! Each category has a small hand-written card set. The category of a feed is
//! guessed from its container id and category label, falling back to
//! [`Category::General`].

use crate::models::{Feed, FeedSource, NewsItem};
use chrono::{Duration, Utc};

/// Outlet label used on the badge of every fallback card.
pub const FALLBACK_SOURCE: &str = "HGARUNA News";

/// Most cards a fallback section ever shows.
pub const MAX_FALLBACK_ITEMS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Deportes,
    Tecnologia,
    Cultura,
    Autos,
    Internacional,
    General,
}

impl Category {
    /// Guess the category from a container id and category label.
    ///
    /// Matching is by substring on the lowercased text, checked in order:
    /// sports, technology, culture, cars, world news.
    pub fn detect(container_id: &str, categoria: &str) -> Self {
        let haystack = format!("{container_id} {categoria}").to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| haystack.contains(n));

        if has(&["deportes", "sport"]) {
            Category::Deportes
        } else if has(&["tecnolog", "tech", "tecnosfera"]) {
            Category::Tecnologia
        } else if has(&["cultura"]) {
            Category::Cultura
        } else if has(&["autos"]) {
            Category::Autos
        } else if has(&["internacional", "world", "mundo"]) {
            Category::Internacional
        } else {
            Category::General
        }
    }

    /// Badge label for cards of this category.
    pub fn label(self) -> &'static str {
        match self {
            Category::Deportes => "Deportes",
            Category::Tecnologia => "Tecnología",
            Category::Cultura => "Cultura",
            Category::Autos => "Autos",
            Category::Internacional => "Internacional",
            Category::General => "Noticias",
        }
    }

    fn entries(self) -> &'static [FallbackEntry] {
        match self {
            Category::Deportes => DEPORTES,
            Category::Tecnologia => TECNOLOGIA,
            Category::Cultura => CULTURA,
            Category::Autos => AUTOS,
            Category::Internacional => INTERNACIONAL,
            Category::General => GENERAL,
        }
    }
}

struct FallbackEntry {
    title: &'static str,
    description: &'static str,
    image: &'static str,
    hours_ago: i64,
}

const fn entry(title: &'static str, description: &'static str, image: &'static str, hours_ago: i64) -> FallbackEntry {
    FallbackEntry {
        title,
        description,
        image,
        hours_ago,
    }
}

const DEPORTES: &[FallbackEntry] = &[
    entry(
        "Fútbol: Nuevas transferencias en la ventana de mercado",
        "Los equipos europeos se preparan para la próxima temporada con importantes fichajes.",
        "https://images.unsplash.com/photo-1579952363873-27f3bade9f55?w=800&h=600&fit=crop",
        2,
    ),
    entry(
        "NBA: Playoffs en su momento más emocionante",
        "Los equipos luchan por llegar a las finales con partidos muy disputados.",
        "https://images.unsplash.com/photo-1546519638-68e109498ffc?w=800&h=600&fit=crop",
        3,
    ),
    entry(
        "Fórmula 1: Preparativos para el próximo Gran Premio",
        "Los equipos ultiman detalles para la carrera del fin de semana.",
        "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=800&h=600&fit=crop",
        4,
    ),
];

const TECNOLOGIA: &[FallbackEntry] = &[
    entry(
        "Inteligencia Artificial: Nuevos avances en el sector",
        "Las empresas tecnológicas presentan innovaciones revolucionarias en IA.",
        "https://images.unsplash.com/photo-1485827404703-89b55fcc595e?w=800&h=600&fit=crop",
        1,
    ),
    entry(
        "Startups: El ecosistema emprendedor en crecimiento",
        "Nuevas empresas emergen con soluciones innovadoras para el mercado.",
        "https://images.unsplash.com/photo-1559136555-9303baea8ebd?w=800&h=600&fit=crop",
        2,
    ),
    entry(
        "Gadgets: Los dispositivos más esperados del año",
        "Las principales marcas preparan sus lanzamientos más importantes.",
        "https://images.unsplash.com/photo-1526738549149-8e07eca6c147?w=800&h=600&fit=crop",
        3,
    ),
];

const CULTURA: &[FallbackEntry] = &[
    entry(
        "Cine: Estrenos más esperados de la temporada",
        "Las películas más prometedoras llegan a las salas de cine.",
        "https://images.unsplash.com/photo-1489599835382-957519cb7350?w=800&h=600&fit=crop",
        2,
    ),
    entry(
        "Música: Nuevos álbumes de artistas destacados",
        "Los músicos más populares presentan sus trabajos más recientes.",
        "https://images.unsplash.com/photo-1493225457124-a3eb161ffa5f?w=800&h=600&fit=crop",
        3,
    ),
    entry(
        "Arte: Exposiciones imperdibles en galerías",
        "Las mejores muestras artísticas se presentan en la ciudad.",
        "https://images.unsplash.com/photo-1541961017774-22349e4a1262?w=800&h=600&fit=crop",
        4,
    ),
];

const AUTOS: &[FallbackEntry] = &[
    entry(
        "Coches eléctricos: La revolución del transporte",
        "Los fabricantes automotrices apuestan por la movilidad sostenible.",
        "https://images.unsplash.com/photo-1549317661-bd32c8ce0db2?w=800&h=600&fit=crop",
        1,
    ),
    entry(
        "Fórmula 1: Tecnología de vanguardia en la pista",
        "Los equipos desarrollan innovaciones para mejorar el rendimiento.",
        "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=800&h=600&fit=crop",
        2,
    ),
    entry(
        "Concept cars: El futuro del diseño automotriz",
        "Los prototipos más innovadores se presentan en los salones.",
        "https://images.unsplash.com/photo-1549317661-bd32c8ce0db2?w=800&h=600&fit=crop",
        3,
    ),
];

const INTERNACIONAL: &[FallbackEntry] = &[
    entry(
        "Noticias internacionales: Los eventos más importantes",
        "Cobertura completa de los acontecimientos mundiales más relevantes.",
        "https://images.unsplash.com/photo-1504711434969-e33886168f5c?w=800&h=600&fit=crop",
        1,
    ),
    entry(
        "Política mundial: Decisiones que afectan al mundo",
        "Los líderes mundiales toman decisiones importantes para el futuro.",
        "https://images.unsplash.com/photo-1495020683877-95802f6f647a?w=800&h=600&fit=crop",
        2,
    ),
    entry(
        "Economía global: Tendencias del mercado internacional",
        "Análisis de los movimientos económicos más significativos.",
        "https://images.unsplash.com/photo-1586953208448-b95a79798f07?w=800&h=600&fit=crop",
        3,
    ),
];

const GENERAL: &[FallbackEntry] = &[
    entry(
        "Noticias destacadas del día",
        "Los acontecimientos más importantes que debes conocer hoy.",
        "https://images.unsplash.com/photo-1504711434969-e33886168f5c?w=800&h=600&fit=crop",
        1,
    ),
    entry(
        "Información actualizada las 24 horas",
        "Mantente informado con las últimas noticias del mundo.",
        "https://images.unsplash.com/photo-1495020683877-95802f6f647a?w=800&h=600&fit=crop",
        2,
    ),
    entry(
        "Cobertura completa de eventos importantes",
        "Análisis detallado de los acontecimientos más relevantes.",
        "https://images.unsplash.com/photo-1586953208448-b95a79798f07?w=800&h=600&fit=crop",
        3,
    ),
];

/// Fallback items for a category, at most [`MAX_FALLBACK_ITEMS`].
///
/// Publication dates are relative to now so cards read "a few hours ago".
pub fn items_for(category: Category) -> Vec<NewsItem> {
    let now = Utc::now();
    category
        .entries()
        .iter()
        .take(MAX_FALLBACK_ITEMS)
        .map(|e| NewsItem {
            title: e.title.to_string(),
            description: e.description.to_string(),
            link: "#".to_string(),
            pub_date: (now - Duration::hours(e.hours_ago)).to_rfc3339(),
            image_url: Some(e.image.to_string()),
        })
        .collect()
}

/// The feed shown for `source` when its live load failed.
pub fn fallback_feed(source: &FeedSource) -> Feed {
    let category = Category::detect(&source.container_id, &source.categoria);
    Feed {
        title: source.title.clone(),
        description: format!("Contenido de respaldo ({})", category.label()),
        link: String::new(),
        items: items_for(category),
    }
}
