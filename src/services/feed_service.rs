//! RSS / sitemap / robots.txt
//!
//! 输出都是直接拼接的 XML / 文本，不经过 JSON 响应包装。

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::site_config_service::keys;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::storage::SeaOrmStorage;
use crate::utils::text::{cdata, escape_xml, truncate_chars};

use migration::entities::{life_record, post};

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
pub const SITEMAP_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
pub const ROBOTS_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

const DEFAULT_SITE_NAME: &str = "inkpost";
const LIFE_DESCRIPTION_CHARS: usize = 200;

/// 三种 RSS 源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    All,
    Posts,
    Life,
}

impl FeedKind {
    fn self_path(self) -> &'static str {
        match self {
            FeedKind::All => "/rss",
            FeedKind::Posts => "/rss/posts",
            FeedKind::Life => "/rss/life",
        }
    }
}

/// 一个 RSS item
#[derive(Debug, Clone)]
struct FeedItem {
    title: String,
    link: String,
    description: String,
    published_at: Option<DateTime<Utc>>,
}

impl FeedItem {
    fn from_post(p: &post::Model, site: &str) -> Self {
        Self {
            title: p.title.clone(),
            link: format!("{}/blog/{}", site, p.slug),
            description: p.excerpt.clone(),
            published_at: p.published_at,
        }
    }

    fn from_life(l: &life_record::Model, site: &str) -> Self {
        let title = if l.title.is_empty() {
            truncate_chars(&l.content, 30)
        } else {
            l.title.clone()
        };
        Self {
            title,
            link: format!("{}/life/{}", site, l.id),
            description: truncate_chars(&l.content, LIFE_DESCRIPTION_CHARS),
            published_at: l.published_at,
        }
    }
}

struct Channel<'a> {
    title: &'a str,
    link: &'a str,
    description: &'a str,
    self_link: &'a str,
}

fn render_rss(channel: &Channel<'_>, items: &[FeedItem], now: DateTime<Utc>) -> String {
    let mut xml = String::with_capacity(1024 + items.len() * 512);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n");
    xml.push_str("  <channel>\n");
    let _ = writeln!(xml, "    <title>{}</title>", cdata(channel.title));
    let _ = writeln!(xml, "    <link>{}</link>", escape_xml(channel.link));
    let _ = writeln!(xml, "    <description>{}</description>", cdata(channel.description));
    xml.push_str("    <language>zh-cn</language>\n");
    let _ = writeln!(xml, "    <lastBuildDate>{}</lastBuildDate>", now.to_rfc2822());
    let _ = writeln!(
        xml,
        "    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>",
        escape_xml(channel.self_link)
    );
    for item in items {
        let link = escape_xml(&item.link);
        xml.push_str("    <item>\n");
        let _ = writeln!(xml, "      <title>{}</title>", cdata(&item.title));
        let _ = writeln!(xml, "      <link>{}</link>", link);
        let _ = writeln!(xml, "      <description>{}</description>", cdata(&item.description));
        if let Some(published) = item.published_at {
            let _ = writeln!(xml, "      <pubDate>{}</pubDate>", published.to_rfc2822());
        }
        let _ = writeln!(xml, "      <guid isPermaLink=\"true\">{}</guid>", link);
        xml.push_str("    </item>\n");
    }
    xml.push_str("  </channel>\n</rss>\n");
    xml
}

struct SitemapEntry {
    loc: String,
    lastmod: Option<DateTime<Utc>>,
    changefreq: &'static str,
    priority: &'static str,
}

const STATIC_PAGES: &[(&str, &str, &str)] = &[
    ("", "daily", "1.0"),
    ("/blog", "daily", "0.9"),
    ("/life", "weekly", "0.8"),
    ("/archive", "weekly", "0.7"),
    ("/category", "weekly", "0.7"),
    ("/guestbook", "weekly", "0.6"),
];

fn render_sitemap(entries: &[SitemapEntry]) -> String {
    let mut xml = String::with_capacity(256 + entries.len() * 160);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for entry in entries {
        xml.push_str("  <url>\n");
        let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(&entry.loc));
        if let Some(lastmod) = entry.lastmod {
            let _ = writeln!(xml, "    <lastmod>{}</lastmod>", lastmod.format("%Y-%m-%d"));
        }
        let _ = writeln!(xml, "    <changefreq>{}</changefreq>", entry.changefreq);
        let _ = writeln!(xml, "    <priority>{}</priority>", entry.priority);
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

fn render_robots(site: &str, api_prefix: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /admin/\nDisallow: {api}/admin/\n\nSitemap: {site}{api}/sitemap.xml\n",
        api = api_prefix,
        site = site,
    )
}

// ============ FeedService ============

pub struct FeedService {
    storage: Arc<SeaOrmStorage>,
    config: Arc<AppConfig>,
}

impl FeedService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: Arc<AppConfig>) -> Self {
        Self { storage, config }
    }

    fn site_url(&self) -> &str {
        self.config.server.site_url.trim_end_matches('/')
    }

    async fn site_name(&self) -> Result<String> {
        let name = self
            .storage
            .all_site_configs()
            .await?
            .into_iter()
            .find(|c| c.config_key == keys::SITE_NAME)
            .map(|c| c.value)
            .filter(|v| !v.is_empty());
        Ok(name.unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()))
    }

    pub async fn rss(&self, kind: FeedKind) -> Result<String> {
        let site = self.site_url();
        let limit = self.config.content.feed_limit;

        let mut items = Vec::new();
        if kind != FeedKind::Life {
            for p in self.storage.recent_posts(limit).await? {
                items.push(FeedItem::from_post(&p, site));
            }
        }
        if kind != FeedKind::Posts {
            for l in self.storage.recent_life(limit).await? {
                items.push(FeedItem::from_life(&l, site));
            }
        }
        // 合并源按发布时间倒序取前 limit 条
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(limit as usize);

        let site_name = self.site_name().await?;
        let (title, description) = match kind {
            FeedKind::All => (site_name.clone(), format!("{} 的博客与生活记录", site_name)),
            FeedKind::Posts => (site_name.clone(), format!("{} 的博客", site_name)),
            FeedKind::Life => (format!("{} · 生活", site_name), "生活记录".to_string()),
        };
        let self_link = format!("{}{}{}", site, self.config.server.api_prefix, kind.self_path());

        debug!("Rendering {:?} feed with {} items", kind, items.len());
        Ok(render_rss(
            &Channel {
                title: &title,
                link: site,
                description: &description,
                self_link: &self_link,
            },
            &items,
            Utc::now(),
        ))
    }

    pub async fn sitemap(&self) -> Result<String> {
        let site = self.site_url();
        let posts = self.storage.all_published_posts().await?;
        let life = self.storage.all_published_life().await?;
        let tags = self.storage.all_tags().await?;

        let mut entries: Vec<SitemapEntry> = STATIC_PAGES
            .iter()
            .map(|(path, changefreq, priority)| SitemapEntry {
                loc: format!("{}{}", site, path),
                lastmod: None,
                changefreq,
                priority,
            })
            .collect();
        entries.extend(posts.iter().map(|p| SitemapEntry {
            loc: format!("{}/blog/{}", site, p.slug),
            lastmod: Some(p.updated_at),
            changefreq: "monthly",
            priority: "0.8",
        }));
        entries.extend(life.iter().map(|l| SitemapEntry {
            loc: format!("{}/life/{}", site, l.id),
            lastmod: Some(l.updated_at),
            changefreq: "monthly",
            priority: "0.6",
        }));
        entries.extend(tags.iter().map(|t| SitemapEntry {
            loc: format!("{}/category/{}", site, t.slug),
            lastmod: None,
            changefreq: "weekly",
            priority: "0.5",
        }));

        Ok(render_sitemap(&entries))
    }

    pub fn robots(&self) -> String {
        render_robots(self.site_url(), &self.config.server.api_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rss_channel_and_items() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 8, 0, 0).unwrap();
        let items = vec![FeedItem {
            title: "Hello <Rust>".into(),
            link: "https://blog.example/blog/hello?a=1&b=2".into(),
            description: "intro".into(),
            published_at: Some(now),
        }];
        let xml = render_rss(
            &Channel {
                title: "Ink",
                link: "https://blog.example",
                description: "Ink 的博客",
                self_link: "https://blog.example/api/rss",
            },
            &items,
            now,
        );
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<title><![CDATA[Hello <Rust>]]></title>"));
        assert!(xml.contains("<link>https://blog.example/blog/hello?a=1&amp;b=2</link>"));
        assert!(xml.contains("<pubDate>Wed, 15 May 2024 08:00:00 +0000</pubDate>"));
        assert!(xml.contains("<language>zh-cn</language>"));
        assert!(xml.contains("rel=\"self\""));
    }

    #[test]
    fn test_sitemap_static_and_dynamic_entries() {
        let mut entries: Vec<SitemapEntry> = STATIC_PAGES
            .iter()
            .map(|(path, changefreq, priority)| SitemapEntry {
                loc: format!("https://s.example{}", path),
                lastmod: None,
                changefreq,
                priority,
            })
            .collect();
        entries.push(SitemapEntry {
            loc: "https://s.example/blog/post-1".into(),
            lastmod: Some(Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap()),
            changefreq: "monthly",
            priority: "0.8",
        });
        let xml = render_sitemap(&entries);
        assert_eq!(xml.matches("<url>").count(), STATIC_PAGES.len() + 1);
        assert!(xml.contains("<loc>https://s.example</loc>"));
        assert!(xml.contains("<lastmod>2024-02-03</lastmod>"));
        assert!(xml.contains("<priority>1.0</priority>"));
    }

    #[test]
    fn test_robots() {
        let robots = render_robots("https://s.example", "/api");
        assert!(robots.contains("Disallow: /admin/\n"));
        assert!(robots.contains("Disallow: /api/admin/\n"));
        assert!(robots.ends_with("Sitemap: https://s.example/api/sitemap.xml\n"));
    }
}
