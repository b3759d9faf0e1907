//! RSS / Atom feed strategy.

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info, instrument};
use url::Url;

use contentmill_crawler::PageScraper;
use contentmill_shared::{ContentMillError, Result};

use crate::{Discovery, DiscoveryStrategy, DiscoverySession, tolerate};

/// Feed locations probed under the base URL, in order.
pub const FEED_PATHS: &[&str] = &["/feed", "/rss", "/feed.xml", "/rss.xml"];

/// Finds posts through the first feed that yields any items.
#[derive(Debug, Default)]
pub struct FeedStrategy;

#[async_trait]
impl DiscoveryStrategy for FeedStrategy {
    fn name(&self) -> &'static str {
        "feed"
    }

    #[instrument(skip_all, fields(strategy = "feed", base = %session.base_url()))]
    async fn discover(
        &self,
        scraper: &PageScraper,
        session: &mut DiscoverySession,
    ) -> Result<Discovery> {
        for path in FEED_PATHS {
            let feed_url = session.join(path);
            session.record_attempt(self.name());

            let fetched = match scraper.probe(&feed_url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    tolerate(e)?;
                    continue;
                }
            };

            let links = match parse_feed_links(&fetched.body) {
                Ok(links) => links,
                Err(e) => {
                    debug!(url = %feed_url, error = %e, "not a feed");
                    continue;
                }
            };
            let links = resolve_all(&feed_url, links);
            info!(url = %feed_url, entries = links.len(), "found feed");

            let items = scraper.scrape_all(&links).await?;
            if !items.is_empty() {
                return Ok(Discovery::matched(items));
            }
            debug!(url = %feed_url, "feed produced no items, trying next");
        }

        Ok(Discovery::no_match())
    }
}

fn resolve_all(feed_url: &str, links: Vec<String>) -> Vec<String> {
    let base = Url::parse(feed_url).ok();
    links
        .into_iter()
        .filter_map(|link| match &base {
            Some(base) => base.join(&link).ok().map(|u| u.to_string()),
            None => Some(link),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract each entry's link from an RSS 2.0, RSS 1.0 (RDF), or Atom document.
///
/// Entries without a link are skipped. For Atom, the first link with no
/// `rel` or `rel="alternate"` is used. Links are returned as written.
pub fn parse_feed_links(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut is_feed = false;
    let mut in_entry = false;
    let mut in_link = false;
    let mut current: Option<String> = None;
    let mut links = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"rss" | b"RDF" | b"feed" => is_feed = true,
                b"item" | b"entry" => {
                    in_entry = true;
                    current = None;
                }
                b"link" if in_entry => match attr(&e, b"href") {
                    Some(href) => take_alternate(&e, href, &mut current),
                    None => in_link = true,
                },
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if in_entry && e.local_name().as_ref() == b"link" {
                    if let Some(href) = attr(&e, b"href") {
                        take_alternate(&e, href, &mut current);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_entry && in_link && current.is_none() {
                    let text = e.unescape().unwrap_or_default();
                    set_if_present(&mut current, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if in_entry && in_link && current.is_none() {
                    set_if_present(&mut current, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"link" => in_link = false,
                b"item" | b"entry" if in_entry => {
                    links.extend(current.take());
                    in_entry = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ContentMillError::parse(format!("feed XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    if !is_feed {
        return Err(ContentMillError::parse("document is not an RSS or Atom feed"));
    }
    Ok(links)
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn take_alternate(e: &BytesStart<'_>, href: String, current: &mut Option<String>) {
    if current.is_some() {
        return;
    }
    let rel = attr(e, b"rel");
    if matches!(rel.as_deref(), None | Some("alternate")) {
        set_if_present(current, &href);
    }
}

fn set_if_present(slot: &mut Option<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        *slot = Some(value.to_string());
    }
}
