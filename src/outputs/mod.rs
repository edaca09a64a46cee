//! Output generation for the static site.
//!
//! # Submodules
//!
//! - [`html`]: News cards, feed sections and the front page
//! - [`json`]: The feed snapshot read back by `search` and `sitemap`
//! - [`sitemap`]: `sitemap.xml` with news and image extensions, plus `robots.txt`
//! - [`articles`]: The generated-article list
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── index.html
//! ├── feeds.json
//! ├── sitemap.xml
//! ├── robots.txt
//! └── articulos-list.json
//! ```

pub mod articles;
pub mod html;
pub mod json;
pub mod sitemap;
