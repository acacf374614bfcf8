//! Raw date text of each feed entry, read straight from the XML.
//!
//! The feed parser normalizes dates to UTC and silently drops the ones it
//! cannot read. Date policy needs the text exactly as the publisher wrote it,
//! so this scan pulls it out alongside the parsed feed.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

/// Date elements found directly under one `<item>` or `<entry>`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntryDates {
    pub published: Option<String>,
    pub pub_date: Option<String>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum DateTag {
    Published,
    PubDate,
    Updated,
}

impl DateTag {
    /// Matched on the local name, so `dc:date` is `date`.
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"published" | b"issued" => Some(DateTag::Published),
            b"pubDate" => Some(DateTag::PubDate),
            b"updated" | b"modified" | b"date" => Some(DateTag::Updated),
            _ => None,
        }
    }
}

impl EntryDates {
    fn append(&mut self, tag: DateTag, text: &str) {
        let slot = match tag {
            DateTag::Published => &mut self.published,
            DateTag::PubDate => &mut self.pub_date,
            DateTag::Updated => &mut self.updated,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn trimmed(self) -> Self {
        let trim = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            published: trim(self.published),
            pub_date: trim(self.pub_date),
            updated: trim(self.updated),
        }
    }
}

/// One [`EntryDates`] per `<item>`/`<entry>`, in document order.
///
/// Stops at the first XML error and returns what was read up to that point.
pub fn scan_entry_dates(xml: &[u8]) -> Vec<EntryDates> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<EntryDates> = None;
    // Element depth below the current entry element.
    let mut depth = 0usize;
    let mut tag: Option<DateTag> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                let name = local.as_ref();
                if current.is_none() {
                    if name == b"item" || name == b"entry" {
                        current = Some(EntryDates::default());
                        depth = 0;
                    }
                } else {
                    depth += 1;
                    tag = if depth == 1 {
                        DateTag::from_local_name(name)
                    } else {
                        None
                    };
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(entry), Some(tag)) = (current.as_mut(), tag) {
                    if let Ok(text) = e.unescape() {
                        entry.append(tag, &text);
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(entry), Some(tag)) = (current.as_mut(), tag) {
                    entry.append(tag, &String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                if current.is_some() {
                    if depth == 0 {
                        if let Some(entry) = current.take() {
                            entries.push(entry.trimmed());
                        }
                    } else {
                        depth -= 1;
                    }
                    tag = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Stopped scanning feed dates: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    entries
}
