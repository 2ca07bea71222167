//! Syndication feed rendering.
//!
//! The feed is an [upon] template embedded at compile time. Every value
//! goes through the `xml` formatter, which escapes markup characters.

use exn::ResultExt;
use serde::Serialize;
use sofa_config::FeedMetadata;
use sofa_extract::models::ChangeFeedEntry;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;
use upon::{Engine, Template};

use crate::error::{ErrorKind, Result};

const TEMPLATE: &str = include_str!("../templates/rss.xml");

#[derive(Serialize)]
struct Channel<'a> {
    title: &'a str,
    link: &'a str,
    description: &'a str,
    self_link: &'a str,
    logo: &'a str,
    language: &'a str,
    built: String,
}

#[derive(Serialize)]
struct Item {
    title: String,
    link: String,
    description: String,
    guid: String,
    dated: bool,
    published: String,
}
impl Item {
    fn new(entry: &ChangeFeedEntry, link: &str) -> Self {
        let published = entry.release_date.to_rfc2822();
        Self {
            title: entry.update_name.clone(),
            link: format!("{}/", link.trim_end_matches('/')),
            description: summary(entry),
            guid: entry.feed_id(),
            dated: published.is_some(),
            published: published.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct Context<'a> {
    channel: Channel<'a>,
    items: Vec<Item>,
}

/// Human-readable summary of an entry's security content. Parts the entry
/// has no data for are left out.
fn summary(entry: &ChangeFeedEntry) -> String {
    let mut parts = Vec::new();
    if let Some(count) = entry.unique_cves_count {
        parts.push(format!("Vulnerabilities Addressed: {count}"));
    }
    if let Some(exploited) = entry.exploited_count() {
        parts.push(format!("Exploited CVE(s): {exploited}"));
    }
    if let Some(days) = entry.days_since_previous_release {
        parts.push(format!("Days to Prev. Release: {days}"));
    }
    parts.join("<br>")
}

pub struct RssFeed {
    engine: Engine<'static>,
    template: Template<'static>,
    metadata: FeedMetadata,
}
impl RssFeed {
    pub fn new(metadata: FeedMetadata) -> Result<Self> {
        let mut engine = Engine::new();
        addons::configure(&mut engine);
        let template = engine.compile(TEMPLATE).or_raise(|| ErrorKind::Template)?;
        Ok(Self { engine, template, metadata })
    }

    pub fn file_name(&self) -> &str {
        &self.metadata.file_name
    }

    /// Renders `entries` (in ascending date order) newest first. An empty
    /// feed renders nothing.
    pub fn render(&self, entries: &[ChangeFeedEntry], built: OffsetDateTime) -> Result<Option<String>> {
        if entries.is_empty() {
            return Ok(None);
        }
        let metadata = &self.metadata;
        let context = Context {
            channel: Channel {
                title: &metadata.title,
                link: &metadata.link,
                description: &metadata.description,
                self_link: &metadata.self_link,
                logo: &metadata.logo,
                language: &metadata.language,
                built: built.format(&Rfc2822).or_raise(|| ErrorKind::Template)?,
            },
            items: entries.iter().rev().map(|entry| Item::new(entry, &metadata.link)).collect(),
        };
        let rendered = self.template.render(&self.engine, &context).to_string().or_raise(|| ErrorKind::Template)?;
        Ok(Some(rendered))
    }
}

mod addons {
    use std::fmt::Write;
    use upon::{Engine, Value, fmt as upon_fmt};

    /// Escapes the characters XML reserves.
    fn xml_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
        match value {
            Value::String(s) => {
                for c in s.chars() {
                    match c {
                        '&' => f.write_str("&amp;")?,
                        '<' => f.write_str("&lt;")?,
                        '>' => f.write_str("&gt;")?,
                        '"' => f.write_str("&quot;")?,
                        '\'' => f.write_str("&apos;")?,
                        c => f.write_char(c)?,
                    }
                }
            },
            v => upon_fmt::default(f, v)?,
        };
        Ok(())
    }

    pub(crate) fn configure(engine: &mut Engine<'_>) {
        engine.add_formatter("xml", xml_formatter);
    }
}
