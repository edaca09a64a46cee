//! RSS 2.0 parsing into [`Feed`] / [`NewsItem`].
//!
//! The reader walks the document once with `quick-xml`, keeping the path of
//! open elements so that only direct children of `<channel>` and `<item>` are
//! read as fields. For every field the first occurrence wins. Text, CDATA and
//! entity references are accumulated per element; entity references are
//! resolved as they are read, CDATA is kept literally.
//!
//! A document that ends with elements still open is rejected: proxies
//! sometimes cut a body short.
//!
//! # Defaults
//!
//! | Field | Missing or empty |
//! |-------|------------------|
//! | `title` | `"Sin título"` |
//! | `description` | `""` |
//! | `link` | `"#"` |
//! | `pubDate` | current time, RFC 3339 |
//!
//! # Images
//!
//! An item's image is the `url` of the first `<enclosure>` whose `type`
//! starts with `image`, else the first `<media:content>`/`<content>` with a
//! `url`, else the first `<media:thumbnail>`.

use crate::error::ParseError;
use crate::models::{Feed, NewsItem};
use crate::utils::unescape_entities;
use chrono::Utc;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, instrument};

pub const UNTITLED: &str = "Sin título";
pub const MISSING_LINK: &str = "#";

#[derive(Debug, Default)]
struct ItemBuilder {
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
    enclosure_image: Option<String>,
    media_image: Option<String>,
    thumbnail: Option<String>,
}

impl ItemBuilder {
    fn set_field(&mut self, name: &[u8], text: String) {
        let slot = match name {
            b"title" => &mut self.title,
            b"description" => &mut self.description,
            b"link" => &mut self.link,
            b"pubDate" => &mut self.pub_date,
            _ => return,
        };
        if slot.is_none() && !text.is_empty() {
            *slot = Some(text);
        }
    }

    fn set_media(&mut self, elem: &BytesStart<'_>) {
        match elem.name().as_ref() {
            b"enclosure" if self.enclosure_image.is_none() => {
                let is_image = attr(elem, "type").is_some_and(|t| t.starts_with("image"));
                if is_image {
                    self.enclosure_image = attr(elem, "url");
                }
            }
            b"media:content" | b"content" if self.media_image.is_none() => {
                self.media_image = attr(elem, "url");
            }
            b"media:thumbnail" if self.thumbnail.is_none() => {
                self.thumbnail = attr(elem, "url");
            }
            _ => {}
        }
    }

    fn build(self) -> NewsItem {
        NewsItem {
            title: self.title.unwrap_or_else(|| UNTITLED.to_string()),
            description: self.description.unwrap_or_default(),
            link: self.link.unwrap_or_else(|| MISSING_LINK.to_string()),
            pub_date: self.pub_date.unwrap_or_else(|| Utc::now().to_rfc3339()),
            image_url: self.enclosure_image.or(self.media_image).or(self.thumbnail),
        }
    }
}

fn attr(elem: &BytesStart<'_>, key: &str) -> Option<String> {
    let attribute = elem.try_get_attribute(key).ok().flatten()?;
    let raw = String::from_utf8_lossy(&attribute.value);
    let value = unescape_entities(raw.trim()).into_owned();
    (!value.is_empty()).then_some(value)
}

/// Parse RSS XML text into a [`Feed`], keeping at most `max_items` items.
///
/// # Errors
///
/// * [`ParseError::Xml`] when the document is not well-formed
/// * [`ParseError::Truncated`] when the document ends inside an element
/// * [`ParseError::NoChannel`] when there is no `<channel>` element
#[instrument(level = "debug", skip(xml), fields(bytes = xml.len()))]
pub fn parse_feed(xml: &str, max_items: usize) -> Result<Feed, ParseError> {
    let mut reader = Reader::from_str(xml);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();
    let mut seen_channel = false;
    let mut channel_title: Option<String> = None;
    let mut channel_description: Option<String> = None;
    let mut channel_link: Option<String> = None;
    let mut current: Option<ItemBuilder> = None;
    let mut items = Vec::new();
    let mut total_items = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"channel" => seen_channel = true,
                    b"item" => current = Some(ItemBuilder::default()),
                    _ => {
                        if let Some(item) = current.as_mut() {
                            item.set_media(&e);
                        }
                    }
                }
                path.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                if let Some(item) = current.as_mut() {
                    item.set_media(&e);
                }
            }
            Event::Text(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => {
                let entity = format!("&{};", String::from_utf8_lossy(&e));
                text.push_str(&unescape_entities(&entity));
            }
            Event::End(_) => {
                let Some(name) = path.pop() else { continue };
                let parent = path.last().map(Vec::as_slice);
                match (parent, name.as_slice()) {
                    (_, b"item") => {
                        if let Some(item) = current.take() {
                            total_items += 1;
                            if items.len() < max_items {
                                items.push(item.build());
                            }
                        }
                    }
                    (Some(b"item"), field) => {
                        if let Some(item) = current.as_mut() {
                            item.set_field(field, text.trim().to_string());
                        }
                    }
                    (Some(b"channel"), field) => {
                        let value = text.trim().to_string();
                        let slot = match field {
                            b"title" => Some(&mut channel_title),
                            b"description" => Some(&mut channel_description),
                            b"link" => Some(&mut channel_link),
                            _ => None,
                        };
                        if let Some(slot) = slot {
                            if slot.is_none() && !value.is_empty() {
                                *slot = Some(value);
                            }
                        }
                    }
                    _ => {}
                }
                text.clear();
            }
            Event::Eof => {
                if let Some(open) = path.last() {
                    return Err(ParseError::Truncated(String::from_utf8_lossy(open).into_owned()));
                }
                break;
            }
            _ => {}
        }
    }

    if !seen_channel {
        return Err(ParseError::NoChannel);
    }

    debug!(total_items, kept = items.len(), "Parsed RSS channel");
    Ok(Feed {
        title: channel_title.unwrap_or_else(|| UNTITLED.to_string()),
        description: channel_description.unwrap_or_default(),
        link: channel_link.unwrap_or_default(),
        items,
    })
}
