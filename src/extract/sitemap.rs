//! XML sitemap parsing
//!
//! Handles both `<urlset>` documents and `<sitemapindex>` documents. The reader is
//! streaming, so large sitemaps never need to be loaded as a tree; malformed XML
//! simply ends the stream early.

use super::{Discovery, LinkHint};
use crate::url::canonicalize_absolute;
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::io::Cursor;
use url::Url;

/// URLs listed by a sitemap document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SitemapDocument {
    /// Page URLs from `<url><loc>`
    pub urls: Vec<Url>,
    /// Nested sitemaps from `<sitemap><loc>`
    pub sitemaps: Vec<Url>,
}

impl SitemapDocument {
    /// Returns true if the document listed nothing usable
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.sitemaps.is_empty()
    }

    /// Converts the listed URLs into discovery events
    pub fn into_links(self) -> Vec<Discovery> {
        self.urls
            .into_iter()
            .chain(self.sitemaps)
            .map(|url| Discovery::Link {
                url,
                hint: LinkHint::Sitemap,
                context: "sitemap",
            })
            .collect()
    }
}

/// Parses sitemap XML
///
/// Each `<loc>` is canonicalized; entries that fail canonicalization are dropped.
pub fn parse_sitemap(xml_data: &[u8]) -> SitemapDocument {
    let mut document = SitemapDocument::default();
    let parser = SiteMapReader::new(Cursor::new(xml_data));

    for entity in parser {
        match entity {
            SiteMapEntity::Url(url_entry) => {
                if let Some(url) = url_entry.loc.get_url() {
                    if let Ok(url) = canonicalize_absolute(url.as_str()) {
                        document.urls.push(url);
                    }
                }
            }
            SiteMapEntity::SiteMap(sitemap_entry) => {
                if let Some(url) = sitemap_entry.loc.get_url() {
                    if let Ok(url) = canonicalize_absolute(url.as_str()) {
                        document.sitemaps.push(url);
                    }
                }
            }
            SiteMapEntity::Err(e) => {
                // The underlying XML reader repeats its error forever
                tracing::debug!("Sitemap parse error: {:?}", e);
                break;
            }
        }
    }

    document
}
