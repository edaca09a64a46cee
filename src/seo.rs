//! Site routes: the pages `build` writes, the feeds each one shows, and the
//! SEO `<head>` tags rendered for it.
//!
//! The home page shows every configured feed. Category pages show a fixed
//! set of feed ids; ids missing from the configuration are skipped.

use crate::utils::escape_html;
use serde_json::json;
use std::fmt;

pub const SITE_NAME: &str = "HGARUNA News";
pub const ROBOTS: &str = "index, follow, max-image-preview:large, max-snippet:-1, max-video-preview:-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Deportes,
    Tecnologia,
    Cultura,
    Autos,
    Ultimo,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Home,
        Route::Deportes,
        Route::Tecnologia,
        Route::Cultura,
        Route::Autos,
        Route::Ultimo,
    ];

    /// Route of a request path, by substring. Unknown paths are [`Route::Home`].
    pub fn detect(path: &str) -> Self {
        let path = path.to_lowercase();
        [
            ("deportes", Route::Deportes),
            ("tecnologia", Route::Tecnologia),
            ("cultura", Route::Cultura),
            ("autos", Route::Autos),
            ("ultimo", Route::Ultimo),
        ]
        .into_iter()
        .find(|(needle, _)| path.contains(needle))
        .map_or(Route::Home, |(_, route)| route)
    }

    /// Site path of the route's page.
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Deportes => "/deportes.html",
            Route::Tecnologia => "/tecnologia.html",
            Route::Cultura => "/cultura.html",
            Route::Autos => "/autos.html",
            Route::Ultimo => "/ultimo.html",
        }
    }

    /// File the page is written to, relative to the output directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Route::Home => "index.html",
            other => other.path().trim_start_matches('/'),
        }
    }

    /// Feed ids shown on the page, in order. `None` means every feed.
    pub fn feed_ids(self) -> Option<&'static [&'static str]> {
        match self {
            Route::Home => None,
            Route::Deportes => Some(&["bbc-sport", "clarin-deportes"]),
            Route::Tecnologia => Some(&["bbc-tech", "clarin-tecnologia", "eltiempo-tecnosfera"]),
            Route::Cultura => Some(&["clarin-cultura", "clarin-espectaculos", "clarin-cine", "eltiempo-cultura"]),
            Route::Autos => Some(&["clarin-autos"]),
            Route::Ultimo => Some(&["bbc-world", "elpais-portada"]),
        }
    }

    pub fn includes(self, feed_id: &str) -> bool {
        self.feed_ids().is_none_or(|ids| ids.contains(&feed_id))
    }

    pub fn meta(self) -> PageMeta {
        match self {
            Route::Home => PageMeta {
                title: "HGARUNA News - Últimas Noticias Internacionales | Deportes, Tecnología, Cultura",
                description: "Mantente informado con las últimas noticias internacionales. Cobertura completa de deportes, tecnología, cultura y más. Actualizado 24/7.",
                keywords: "noticias, deportes, tecnología, cultura, internacional, BBC, El País, Clarín",
                category: "Noticias Generales",
            },
            Route::Deportes => PageMeta {
                title: "Noticias de Deportes - Fútbol, NBA, MLB, NFL | HGARUNA News",
                description: "Las últimas noticias de deportes: fútbol, NBA, MLB, NFL, tenis y más. Cobertura completa de eventos deportivos internacionales.",
                keywords: "deportes, fútbol, NBA, MLB, NFL, tenis, noticias deportivas",
                category: "Deportes",
            },
            Route::Tecnologia => PageMeta {
                title: "Noticias de Tecnología - IA, Innovación, Startups | HGARUNA News",
                description: "Últimas noticias de tecnología: inteligencia artificial, innovación, startups, gadgets y tendencias tecnológicas.",
                keywords: "tecnología, inteligencia artificial, innovación, startups, gadgets",
                category: "Tecnología",
            },
            Route::Cultura => PageMeta {
                title: "Noticias de Cultura - Cine, Música, Arte | HGARUNA News",
                description: "Noticias de cultura: cine, música, arte, literatura y espectáculos. Las últimas tendencias culturales.",
                keywords: "cultura, cine, música, arte, literatura, espectáculos",
                category: "Cultura",
            },
            Route::Autos => PageMeta {
                title: "Noticias de Autos - Coches, Motores, Fórmula 1 | HGARUNA News",
                description: "Últimas noticias de autos: nuevos modelos, Fórmula 1, motores, tecnología automotriz y más.",
                keywords: "autos, coches, motores, fórmula 1, tecnología automotriz",
                category: "Autos",
            },
            Route::Ultimo => PageMeta {
                title: "Últimas Noticias - Breaking News Internacional | HGARUNA News",
                description: "Breaking news y últimas noticias internacionales. Información actualizada minuto a minuto.",
                keywords: "últimas noticias, breaking news, noticias internacionales",
                category: "Noticias de Último Momento",
            },
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Home => "home",
            Route::Deportes => "deportes",
            Route::Tecnologia => "tecnologia",
            Route::Cultura => "cultura",
            Route::Autos => "autos",
            Route::Ultimo => "ultimo",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub title: &'static str,
    pub description: &'static str,
    pub keywords: &'static str,
    pub category: &'static str,
}

/// `<head>` tags for a page: title, description, keywords, robots, Open
/// Graph, Twitter card and a JSON-LD `WebPage` block.
pub fn render_meta_tags(meta: &PageMeta, canonical_url: &str) -> String {
    let title = escape_html(meta.title);
    let description = escape_html(meta.description);
    let keywords = escape_html(meta.keywords);
    let url = escape_html(canonical_url);

    let structured = json!({
        "@context": "https://schema.org",
        "@type": "WebPage",
        "name": meta.title,
        "description": meta.description,
        "url": canonical_url,
        "inLanguage": "es",
        "publisher": { "@type": "NewsMediaOrganization", "name": SITE_NAME },
        "mainEntity": {
            "@type": "ItemList",
            "name": meta.category,
            "description": format!("Lista de noticias de {}", meta.category),
        },
    });
    // Keep a "</script>" inside a string from closing the tag early.
    let structured = structured.to_string().replace("</", "<\\/");

    format!(
        r#"<title>{title}</title>
<meta name="description" content="{description}">
<meta name="keywords" content="{keywords}">
<meta name="author" content="{SITE_NAME}">
<meta name="robots" content="{ROBOTS}">
<meta name="language" content="es">
<meta name="geo.region" content="AR">
<meta name="geo.placename" content="Buenos Aires">
<meta name="distribution" content="global">
<meta name="rating" content="general">
<link rel="canonical" href="{url}">
<meta property="og:title" content="{title}">
<meta property="og:description" content="{description}">
<meta property="og:url" content="{url}">
<meta property="og:type" content="website">
<meta property="og:site_name" content="{SITE_NAME}">
<meta property="og:locale" content="es_ES">
<meta name="twitter:card" content="summary_large_image">
<meta name="twitter:title" content="{title}">
<meta name="twitter:description" content="{description}">
<script type="application/ld+json">{structured}</script>"#
    )
}
