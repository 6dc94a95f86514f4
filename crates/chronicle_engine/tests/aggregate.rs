use std::sync::{Arc, Once};
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use chronicle_core::friend::{Friend, SiteInfo};
use chronicle_engine::{
    DiscoverySettings, DiscoveryStage, FetchSettings, FriendAggregator, ReqwestFetcher,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(chronicle_logging::initialize_for_tests);
}

fn aggregator() -> FriendAggregator {
    let settings = DiscoverySettings {
        feed_timeout: Duration::from_millis(500),
        probe_timeout: Duration::from_millis(500),
        ..DiscoverySettings::default()
    };
    FriendAggregator::new(Arc::new(ReqwestFetcher::new(FetchSettings::default()).unwrap()), settings)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
}

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
  <title>Friend</title>
  <item>
    <title>Bronze Tools</title>
    <link>https://friend.example/posts/bronze-tools/</link>
    <description>Smelting in the valley</description>
    <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    <category>history</category>
  </item>
  <item>
    <title>Undated</title>
    <link>https://friend.example/posts/undated/</link>
  </item>
</channel>
</rss>"#;

#[tokio::test]
async fn feed_stage_wins_when_a_feed_has_dated_items() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "application/rss+xml"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/posts.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let discovery = aggregator().discover_with_source(&server.uri(), today()).await;

    assert_eq!(discovery.stage, Some(DiscoveryStage::Feed));
    assert_eq!(discovery.source, Some(format!("{}/rss.xml", server.uri())));
    assert_eq!(discovery.posts.len(), 1);
    let post = &discovery.posts[0];
    assert_eq!(post.title, "Bronze Tools");
    assert_eq!(post.slug, "bronze-tools");
    assert_eq!(post.id, "rss-bronze-tools");
    assert_eq!(post.tags, vec!["history".to_string()]);
    assert_eq!(post.published, "2024-01-01T10:00:00+00:00");
    assert!(DateTime::parse_from_rfc3339(&post.published).is_ok());
}

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Friend</title>
  <entry>
    <title>Ash and Iron</title>
    <link rel="alternate" href="/posts/ash-and-iron/"/>
    <published>2024-04-05T10:30:00+02:00</published>
    <summary>Forging in the hills</summary>
    <category term="history"/>
    <category term="metallurgy"/>
  </entry>
</feed>"#;

#[tokio::test]
async fn atom_entries_resolve_links_and_category_terms() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/atom.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(ATOM, "application/atom+xml"))
        .mount(&server)
        .await;

    let discovery = aggregator().discover_with_source(&server.uri(), today()).await;

    assert_eq!(discovery.stage, Some(DiscoveryStage::Feed));
    assert_eq!(discovery.source, Some(format!("{}/atom.xml", server.uri())));
    assert_eq!(discovery.posts.len(), 1);
    let post = &discovery.posts[0];
    assert_eq!(post.title, "Ash and Iron");
    assert_eq!(post.slug, "ash-and-iron");
    assert_eq!(
        post.source_url,
        Some(format!("{}/posts/ash-and-iron/", server.uri()))
    );
    assert_eq!(post.published, "2024-04-05T08:30:00+00:00");
    assert!(DateTime::parse_from_rfc3339(&post.published).is_ok());
    assert_eq!(post.description, "Forging in the hills");
    assert_eq!(post.tags, vec!["history".to_string(), "metallurgy".to_string()]);
    assert_eq!(post.category.as_deref(), Some("history"));
}

#[tokio::test]
async fn missing_feeds_fall_through_to_json_listing() {
    init();
    let server = MockServer::start().await;
    let body = r#"{"posts":[
        {"slug":"first-light","title":"First Light","published":"2024-03-01T00:00:00Z","tags":"dawn, sky"},
        {"slug":"no-date","title":"No Date"}
    ]}"#;
    Mock::given(method("GET"))
        .and(path("/api/posts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let discovery = aggregator().discover_with_source(&server.uri(), today()).await;

    assert_eq!(discovery.stage, Some(DiscoveryStage::Json));
    assert_eq!(discovery.posts.len(), 1);
    assert_eq!(discovery.posts[0].title, "First Light");
    assert_eq!(discovery.posts[0].tags, vec!["dawn".to_string(), "sky".to_string()]);
}

#[tokio::test]
async fn feed_without_dated_items_is_not_a_result() {
    init();
    let server = MockServer::start().await;
    let undated = r#"<rss><channel><item><title>A</title><link>https://x.example/posts/a</link></item></channel></rss>"#;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(undated, "application/rss+xml"))
        .mount(&server)
        .await;
    let body = r#"{"posts":[{"slug":"kept","title":"Kept","date":"2024-05-05"}]}"#;
    Mock::given(method("GET"))
        .and(path("/friend-content.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let discovery = aggregator().discover_with_source(&server.uri(), today()).await;

    assert_eq!(discovery.stage, Some(DiscoveryStage::Json));
    assert_eq!(discovery.source, Some(format!("{}/friend-content.json", server.uri())));
    assert_eq!(discovery.posts[0].slug, "kept");
}

#[tokio::test]
async fn homepage_scrape_drops_cards_dated_today() {
    init();
    let server = MockServer::start().await;
    let html = r#"<html><head><title>Friend | Home</title></head><body>
        <div class="post-card" data-post-date="2024-02-02">
          <h2><a href="/posts/old-roads/">Old Roads</a></h2>
          <p>Walking the ridgeway</p>
        </div>
        <div class="post-card" data-post-date="2026-10-16">
          <h2><a href="/posts/rendered-now/">Rendered Now</a></h2>
        </div>
        <div class="post-card" data-post-date="2024-02-03">
          <h2><a href="/posts/post-9/">Post 9</a></h2>
        </div>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
        .mount(&server)
        .await;

    let discovery = aggregator().discover_with_source(&server.uri(), today()).await;

    assert_eq!(discovery.stage, Some(DiscoveryStage::Homepage));
    let titles: Vec<&str> = discovery.posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Old Roads"]);
    assert_eq!(discovery.posts[0].id, "scraped-old-roads");
    assert_eq!(discovery.posts[0].description, "Walking the ridgeway");
}

#[tokio::test]
async fn unreachable_site_yields_nothing() {
    init();
    let discovery = aggregator()
        .discover_with_source("http://127.0.0.1:1", today())
        .await;
    assert_eq!(discovery.stage, None);
    assert!(discovery.posts.is_empty());
}

#[tokio::test]
async fn sync_stores_posts_on_the_friend() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "application/rss+xml"))
        .mount(&server)
        .await;

    let mut friend = Friend::from_site(&SiteInfo {
        name: "Friend".to_string(),
        description: String::new(),
        avatar: String::new(),
        url: server.uri(),
    });
    let count = aggregator().sync(&mut friend).await;

    assert_eq!(count, 1);
    assert_eq!(friend.post_count, 1);
    assert!(friend.last_synced.is_some());
}

#[tokio::test]
async fn validate_site_reads_homepage_metadata() {
    init();
    let server = MockServer::start().await;
    let html = r#"<html><head>
        <title>Stone Notes | Blog</title>
        <meta name="description" content="Field notes">
        <link rel="icon" href="/favicon.png">
    </head><body></body></html>"#;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(&server)
        .await;

    let info = aggregator().validate_site(&server.uri()).await;

    assert_eq!(info.name, "Stone Notes");
    assert_eq!(info.description, "Field notes");
    assert_eq!(info.avatar, format!("{}/favicon.png", server.uri()));
}

#[tokio::test]
async fn validate_site_falls_back_to_hostname() {
    init();
    let info = aggregator().validate_site("http://127.0.0.1:1").await;
    assert_eq!(info.name, "127.0.0.1");
    assert_eq!(info.description, "No description available");
}
