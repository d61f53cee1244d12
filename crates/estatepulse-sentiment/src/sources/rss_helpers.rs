//! RSS item extraction and HTML stripping.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::SentimentError;

/// One `<item>` from an RSS feed. `description` is HTML-stripped.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct RssItem {
    pub(super) title: String,
    pub(super) link: String,
    pub(super) description: String,
    pub(super) source: Option<String>,
    pub(super) published_at: Option<DateTime<Utc>>,
}

impl RssItem {
    /// `"{title} {description}"`, or just the title when the description
    /// only repeats it.
    pub(super) fn text(&self) -> String {
        if self.description.is_empty() || self.description.starts_with(&self.title) {
            if self.description.len() > self.title.len() {
                return self.description.clone();
            }
            return self.title.clone();
        }
        format!("{} {}", self.title, self.description)
    }
}

/// Parse `<item>` elements, stopping after `max_items`. Items without a
/// title or link are skipped.
///
/// # Errors
///
/// Returns [`SentimentError::Xml`] if the XML is malformed.
pub(super) fn parse_rss_items(
    xml: &str,
    max_items: usize,
) -> Result<Vec<RssItem>, SentimentError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_item = false;
    let mut current_tag = String::new();
    let mut title = String::new();
    let mut link = String::new();
    let mut description = String::new();
    let mut source = String::new();
    let mut pub_date = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .unwrap_or("")
                    .to_string();
                if name == "item" {
                    in_item = true;
                    title.clear();
                    link.clear();
                    description.clear();
                    source.clear();
                    pub_date.clear();
                }
                current_tag = name;
            }
            Ok(Event::End(e)) => {
                let raw = e.name();
                let name = std::str::from_utf8(raw.as_ref()).unwrap_or("");
                if name == "item" && in_item {
                    in_item = false;
                    if !title.is_empty() && !link.is_empty() {
                        items.push(RssItem {
                            title: title.clone(),
                            link: link.clone(),
                            description: strip_html(&description),
                            source: (!source.is_empty()).then(|| source.clone()),
                            published_at: DateTime::parse_from_rfc2822(&pub_date)
                                .ok()
                                .map(|dt| dt.with_timezone(&Utc)),
                        });
                        if items.len() >= max_items {
                            break;
                        }
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    append_field(
                        &current_tag,
                        &text,
                        &mut title,
                        &mut link,
                        &mut description,
                        &mut source,
                        &mut pub_date,
                    );
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    append_field(
                        &current_tag,
                        &text,
                        &mut title,
                        &mut link,
                        &mut description,
                        &mut source,
                        &mut pub_date,
                    );
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SentimentError::Xml(e)),
            _ => {}
        }
    }

    Ok(items)
}

fn append_field(
    tag: &str,
    text: &str,
    title: &mut String,
    link: &mut String,
    description: &mut String,
    source: &mut String,
    pub_date: &mut String,
) {
    let target = match tag {
        "title" => title,
        "link" => link,
        "description" => description,
        "source" => source,
        "pubDate" => pub_date,
        _ => return,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text.trim());
}

/// Strip HTML tags, decode the common entities, and normalise whitespace.
pub(super) fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Google News</title>
<item>
  <title>Kokapet land prices touch record high - The Hindu</title>
  <link>https://news.example.com/a1</link>
  <pubDate>Wed, 01 May 2024 10:00:00 GMT</pubDate>
  <description><![CDATA[<a href="https://news.example.com/a1">Kokapet land prices touch record high</a>&nbsp;&nbsp;<font color="#6f6f6f">The Hindu</font>]]></description>
  <source url="https://www.thehindu.com">The Hindu</source>
</item>
<item>
  <title>Metro extension approved for Financial District</title>
  <link>https://news.example.com/a2</link>
  <description>Commuters &amp; buyers welcome the decision.</description>
</item>
<item>
  <title>No link item</title>
</item>
</channel></rss>"##;

    #[test]
    fn parses_items_with_metadata() {
        let items = parse_rss_items(FEED, 10).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.link, "https://news.example.com/a1");
        assert_eq!(
            first.description,
            "Kokapet land prices touch record high The Hindu"
        );
        assert_eq!(first.source.as_deref(), Some("The Hindu"));
        assert_eq!(
            first.published_at.unwrap().to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );

        let second = &items[1];
        assert_eq!(second.description, "Commuters & buyers welcome the decision.");
        assert!(second.published_at.is_none());
        assert_eq!(
            second.text(),
            "Metro extension approved for Financial District Commuters & buyers welcome the decision."
        );
    }

    #[test]
    fn respects_max_items() {
        assert_eq!(parse_rss_items(FEED, 1).unwrap().len(), 1);
    }

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(strip_html("<b>Hello</b>&nbsp;<i>world</i>"), "Hello world");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_rss_items("<rss><item><title>x</wrong></item></rss>", 5).is_err());
    }
}
