//! Homepage scraping: post cards and site identity.
use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use chronicle_core::friend::{has_valid_date, parse_published, site_name_from_url, FriendPost, SiteInfo};
use chronicle_core::post::reading_time_minutes;
use chronicle_logging::{chronicle_debug, chronicle_trace};

use crate::feed::DESCRIPTION_CHARS;
use crate::text::{absolute_url, last_path_segment, prefix_site, truncate_chars};

pub const NO_DESCRIPTION: &str = "No description available";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static CARDS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#".card-base, .local-post, [class*="post-card"], [data-post-date]"#));
static GENERIC_CARDS: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"article, .post, a[href*="/posts/"]"#));
static TIME: LazyLock<Selector> = LazyLock::new(|| selector("time[datetime]"));
static LINK: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"a[href*="/posts/"], a[href*="/blog/"], h1 a, h2 a, h3 a, .title a, [class*="title"] a"#)
});
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"h1, h2, h3, .title, [class*="title"]"#));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#".text-75, p, .description, [class*="description"], [class*="excerpt"]"#)
});
static CATEGORY_LINK: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[href*="/category/"]"#));
static TAG_LINK: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[href*="/tag/"]"#));
static IMAGE_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        r#".post-image, .featured-image, [class*="cover"], [class*="banner"], [id="post-cover"], [id*="cover"], [id*="banner"]"#,
    )
});
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img"));
static CARD_META_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[property="og:image"], meta[name="image"], meta[name="twitter:image"]"#)
});
static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:image"]"#));
static OG_SITE_NAME: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:site_name"]"#));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[name="description"]"#));
static OG_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:description"]"#));
static ICON: LazyLock<Selector> = LazyLock::new(|| selector(r#"link[rel="icon"]"#));

static FRONTMATTER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"---\s*([\s\S]*?)\s*---").expect("frontmatter pattern is valid"));
static FRONTMATTER_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"image:\s*["']?([^"'\n]+)["']?"#).expect("image pattern is valid"));
static GENERIC_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Post \d+$").expect("generic title pattern is valid"));

const SITE_BANNER_PATHS: [&str; 2] = ["/assets/banner/", "/images/banner/"];

/// Extracts post cards from a homepage.
///
/// Cards without a date, link, slug or real title are skipped, as are
/// repeated slugs. Dates equal to `today` are treated as the page's render
/// time rather than a publish date and dropped.
pub fn scrape_posts(html: &str, site_url: &str, today: NaiveDate) -> Vec<FriendPost> {
    let doc = Html::parse_document(html);
    let mut cards: Vec<ElementRef<'_>> = doc.select(&CARDS).collect();
    if cards.is_empty() {
        chronicle_trace!("No post cards on {}, trying generic article markup", site_url);
        cards = doc.select(&GENERIC_CARDS).collect();
    }

    let mut seen = HashSet::new();
    let mut posts = Vec::new();
    for card in cards {
        let Some(post) = scrape_card(card, &doc, html, site_url, &mut seen) else {
            continue;
        };
        if has_valid_date(&post.published, today) {
            posts.push(post);
        } else {
            chronicle_debug!("Dropping scraped post {} from {}: fallback date", post.slug, site_url);
        }
    }
    posts
}

fn scrape_card(
    card: ElementRef<'_>,
    doc: &Html,
    html: &str,
    site_url: &str,
    seen: &mut HashSet<String>,
) -> Option<FriendPost> {
    let published = card_date(card)?;

    let link = if card.value().name() == "a" {
        card
    } else {
        card.select(&LINK).next()?
    };
    let href = link.value().attr("href").filter(|h| !h.is_empty())?;
    let full_url = prefix_site(site_url, href);
    let slug = last_path_segment(&full_url)?;
    if !seen.insert(slug.clone()) {
        chronicle_trace!("Skipping repeated slug {}", slug);
        return None;
    }

    let heading = card.select(&HEADING).next().map(|el| element_text(el));
    let title = match attr(card, "data-post-title") {
        Some(title) => title,
        None => heading.clone().unwrap_or_else(|| {
            link.value()
                .attr("title")
                .map(str::to_string)
                .unwrap_or_else(|| element_text(link))
        }),
    };
    if title.is_empty() || GENERIC_TITLE.is_match(&title) {
        return None;
    }

    let description = attr(card, "data-post-description")
        .or_else(|| card.select(&DESCRIPTION).next().map(element_text))
        .unwrap_or_default();

    let category = attr(card, "data-post-category")
        .or_else(|| card.select(&CATEGORY_LINK).next().map(element_text))
        .or_else(|| {
            slug.split_once('-')
                .map(|(first, _)| first.to_uppercase())
        });

    let tags: Vec<String> = match attr(card, "data-post-tags") {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        None => card
            .select(&TAG_LINK)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect(),
    };

    let image = card_image(card, doc, html, heading.as_deref(), site_url);

    let word_count = attr(card, "data-post-words")
        .and_then(|w| w.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if description.is_empty() {
                chronicle_core::friend::DEFAULT_WORD_COUNT
            } else {
                description.split_whitespace().count() * 3
            }
        });
    let reading_time = attr(card, "data-post-minutes")
        .and_then(|m| m.parse::<usize>().ok())
        .unwrap_or_else(|| reading_time_minutes(word_count));

    Some(FriendPost {
        id: format!("scraped-{slug}"),
        title,
        slug,
        description: truncate_chars(&description, DESCRIPTION_CHARS),
        published: published.to_rfc3339(),
        content: Some(String::new()),
        source_url: Some(full_url),
        tags,
        category,
        image,
        word_count: Some(word_count),
        reading_time: Some(reading_time),
        ..FriendPost::default()
    })
}

fn card_date(card: ElementRef<'_>) -> Option<DateTime<Utc>> {
    if let Some(date) = attr(card, "data-post-date").as_deref().and_then(parse_published) {
        return Some(date);
    }
    if let Some(date) = attr(card, "data-post-timestamp")
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
    {
        return Some(date);
    }
    card.select(&TIME)
        .next()
        .and_then(|time| time.value().attr("datetime"))
        .and_then(parse_published)
}

fn card_image(
    card: ElementRef<'_>,
    doc: &Html,
    html: &str,
    heading: Option<&str>,
    site_url: &str,
) -> Option<String> {
    if let Some(src) = attr(card, "data-post-image") {
        return Some(prefix_site(site_url, &src));
    }
    if let Some(src) = card
        .select(&IMAGE_CONTAINER)
        .next()
        .and_then(|container| container.select(&IMG).next())
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
    {
        return Some(prefix_site(site_url, src));
    }
    if let Some(src) = card
        .select(&CARD_META_IMAGE)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .filter(|src| !src.is_empty())
    {
        return Some(prefix_site(site_url, src));
    }
    if let Some(path) = heading.and_then(|title| frontmatter_image(html, title)) {
        return Some(prefix_site(site_url, &path));
    }
    if let Some(src) = doc
        .select(&OG_IMAGE)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .filter(|src| !src.is_empty())
    {
        if SITE_BANNER_PATHS.iter().any(|banner| src.contains(banner)) {
            chronicle_trace!("Ignoring site banner image {}", src);
        } else {
            return Some(prefix_site(site_url, src));
        }
    }
    card.select(&IMG)
        .next()
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(|src| prefix_site(site_url, src))
}

/// Some static builds leak the source frontmatter into the page; find the
/// block whose title matches and take its `image:` line.
fn frontmatter_image(html: &str, title: &str) -> Option<String> {
    let double = format!("title: \"{title}\"");
    let single = format!("title: '{title}'");
    FRONTMATTER_BLOCK
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|block| block.as_str())
        .filter(|block| block.contains(&double) || block.contains(&single))
        .find_map(|block| {
            FRONTMATTER_IMAGE
                .captures(block)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
}

fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn meta_content(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// Reads a homepage's name, description and avatar. `url` must already be
/// formatted.
pub fn site_info(html: &str, url: &str) -> SiteInfo {
    let doc = Html::parse_document(html);
    let name = meta_content(&doc, &OG_SITE_NAME)
        .or_else(|| {
            doc.select(&TITLE)
                .next()
                .map(element_text)
                .and_then(|title| title.split('|').next().map(|s| s.trim().to_string()))
                .filter(|t| !t.is_empty())
        })
        .or_else(|| doc.select(&H1).next().map(element_text).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| site_name_from_url(url));
    let description = meta_content(&doc, &META_DESCRIPTION)
        .or_else(|| meta_content(&doc, &OG_DESCRIPTION))
        .unwrap_or_default();
    let avatar = meta_content(&doc, &OG_IMAGE)
        .or_else(|| {
            doc.select(&ICON)
                .next()
                .and_then(|link| link.value().attr("href"))
                .filter(|href| !href.is_empty())
                .map(ToOwned::to_owned)
        })
        .map(|src| absolute_url(url, &src))
        .unwrap_or_default();
    SiteInfo {
        name,
        description,
        avatar,
        url: url.to_string(),
    }
}

/// Identity used when the homepage cannot be read.
pub fn fallback_site_info(url: &str) -> SiteInfo {
    SiteInfo {
        name: site_name_from_url(url),
        description: NO_DESCRIPTION.to_string(),
        avatar: String::new(),
        url: url.to_string(),
    }
}
