use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::models::{Feed, FeedEntry};
use crate::RssError;

/// Parse an RSS 2.0, RSS 1.0 (RDF) or Atom document from raw XML bytes.
///
/// Entries keep document order. Entries missing a title or any link are
/// dropped.
pub fn parse_feed(xml: &[u8]) -> Result<Feed, RssError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut buf = Vec::new();
    let mut is_feed = false;

    let mut current_entry: Option<EntryBuilder> = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if matches!(local_name(&e).as_str(), "rss" | "feed" | "RDF") {
                    is_feed = true;
                }

                // Prefixed extension elements (media:title, itunes:title)
                // never stand in for the entry's own title or link.
                let name = qualified_name(&e);
                if name == "item" || name == "entry" {
                    current_entry = Some(EntryBuilder::default());
                }

                if let Some(ref mut entry) = current_entry {
                    entry.read_link_attributes(&name, &e);
                }
                current_element = name;
            }
            Ok(Event::Empty(e)) => {
                // Self-closing <enclosure ... /> and Atom <link href="..." />
                let name = qualified_name(&e);
                if let Some(ref mut entry) = current_entry {
                    entry.read_link_attributes(&name, &e);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                if name == "item" || name == "entry" {
                    if let Some(builder) = current_entry.take() {
                        if let Some(entry) = builder.build() {
                            feed.entries.push(entry);
                        }
                    }
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                push_text(&mut feed, current_entry.as_mut(), &current_element, &text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                push_text(&mut feed, current_entry.as_mut(), &current_element, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(RssError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !is_feed {
        return Err(RssError::Parse(
            "document is not an RSS or Atom feed".to_string(),
        ));
    }

    Ok(feed)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_string()
}

fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn push_text(feed: &mut Feed, entry: Option<&mut EntryBuilder>, element: &str, text: &str) {
    if text.is_empty() {
        return;
    }

    match entry {
        Some(entry) => match element {
            "title" => entry.title.get_or_insert_with(String::new).push_str(text),
            "link" => entry.push_link(text.to_string()),
            _ => {}
        },
        None => {
            if element == "title" && feed.title.is_none() {
                feed.title = Some(text.to_string());
            }
        }
    }
}

#[derive(Default)]
struct EntryBuilder {
    title: Option<String>,
    link: Option<String>,
    extra_links: Vec<String>,
}

impl EntryBuilder {
    fn push_link(&mut self, link: String) {
        if self.link.is_none() {
            self.link = Some(link);
        } else {
            self.extra_links.push(link);
        }
    }

    fn read_link_attributes(&mut self, name: &str, e: &BytesStart<'_>) {
        let key: &[u8] = match name {
            "enclosure" => b"url",
            "link" => b"href",
            _ => return,
        };

        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == key {
                let value = String::from_utf8_lossy(&attr.value).to_string();
                if value.is_empty() {
                    continue;
                }
                if name == "enclosure" {
                    self.extra_links.push(value);
                } else {
                    self.push_link(value);
                }
            }
        }
    }

    fn build(mut self) -> Option<FeedEntry> {
        let title = self.title?.trim().to_string();
        let link = match self.link.take() {
            Some(link) => link,
            None if !self.extra_links.is_empty() => self.extra_links.remove(0),
            None => return None,
        };
        let secondary_link = self.extra_links.into_iter().find(|l| *l != link);

        Some(FeedEntry {
            title,
            link,
            secondary_link,
        })
    }
}
