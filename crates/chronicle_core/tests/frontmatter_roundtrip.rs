use std::sync::Once;

use chrono::NaiveDate;
use chronicle_core::frontmatter::{build_document, generate, parse_document};
use chronicle_core::post::slug_from_title;
use chronicle_core::{MemoryStore, Post, PostCache};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(chronicle_logging::initialize_for_tests);
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
}

fn sample_post() -> Post {
    let mut post = Post::empty(today());
    post.title = "The \"Long\" Winter: a retrospective".to_string();
    post.slug = slug_from_title(&post.title);
    post.description = "Notes on snow, ice and patience".to_string();
    post.tags = vec!["weather".to_string(), "history".to_string()];
    post.category = "Essays".to_string();
    post.draft = false;
    post.timeline.enabled = true;
    post.timeline.year = Some(1816);
    post.timeline.era = "middle-period".to_string();
    post.timeline.location = "New England".to_string();
    post.timeline.is_key_event = true;
    post.content = "# Heading\n\nBody text.".to_string();
    post
}

#[test]
fn generated_frontmatter_uses_fixed_field_order() {
    init_logging();
    let fm = generate(&sample_post());
    let keys: Vec<&str> = fm
        .lines()
        .filter(|line| *line != "---")
        .filter_map(|line| line.split(':').next())
        .collect();
    assert_eq!(
        keys,
        vec![
            "title",
            "published",
            "description",
            "tags",
            "category",
            "draft",
            "timelineYear",
            "timelineEra",
            "timelineLocation",
            "isKeyEvent",
        ]
    );
    assert!(fm.contains("published: 2024-05-17\n"));
    assert!(fm.contains("tags: [\"weather\", \"history\"]\n"));
    assert!(fm.ends_with("---"));
}

#[test]
fn round_trip_preserves_title_tags_draft_and_timeline() {
    init_logging();
    let post = sample_post();
    let doc = parse_document(&build_document(&post)).unwrap();
    assert!(doc.has_frontmatter);
    let fm = &doc.frontmatter;
    assert_eq!(fm.title.as_deref(), Some(post.title.as_str()));
    assert_eq!(fm.tags, post.tags);
    assert_eq!(fm.draft, Some(false));
    assert_eq!(fm.timeline_year, Some(1816));
    assert_eq!(fm.timeline_era.as_deref(), Some("middle-period"));
    assert_eq!(fm.timeline_location.as_deref(), Some("New England"));
    assert_eq!(fm.is_key_event, Some(true));
    assert_eq!(doc.body, post.content);

    let rebuilt = Post::from_document(&doc, &post.title, today());
    assert_eq!(rebuilt.title, post.title);
    assert_eq!(rebuilt.tags, post.tags);
    assert_eq!(rebuilt.draft, post.draft);
    assert_eq!(rebuilt.timeline, post.timeline);
    assert_eq!(rebuilt.published, post.published);
}

#[test]
fn advanced_and_banner_sections_round_trip() {
    init_logging();
    let mut post = sample_post();
    post.show_advanced_options = true;
    post.advanced.author_name = "Ada".to_string();
    post.advanced.show_image_on_post = true;
    post.advanced.lang = "sv".to_string();
    post.advanced.banner_image = "/img/banner.png".to_string();
    post.banner.kind = "image".to_string();

    let text = build_document(&post);
    assert!(text.contains("bannerData:\n  image: \"/img/banner.png\"\n"));

    let doc = parse_document(&text).unwrap();
    let rebuilt = Post::from_document(&doc, "ignored", today());
    assert!(rebuilt.show_advanced_options);
    assert_eq!(rebuilt.advanced.author_name, "Ada");
    assert!(rebuilt.advanced.show_image_on_post);
    assert_eq!(rebuilt.advanced.lang, "sv");
    assert_eq!(rebuilt.advanced.banner_image, "/img/banner.png");
    assert_eq!(rebuilt.banner.kind, "image");
}

#[test]
fn tags_accept_comma_separated_string() {
    init_logging();
    let doc = parse_document("---\ntitle: x\ntags: a, b ,c\n---\nbody").unwrap();
    assert_eq!(doc.frontmatter.tags, vec!["a", "b", "c"]);
}

#[test]
fn missing_frontmatter_keeps_whole_text_as_body() {
    init_logging();
    let text = "# Just markdown\n\nNo metadata.";
    let doc = parse_document(text).unwrap();
    assert!(!doc.has_frontmatter);
    assert_eq!(doc.frontmatter, Default::default());
    assert_eq!(doc.body, text);
}

#[test]
fn invalid_yaml_is_an_error() {
    init_logging();
    let result = parse_document("---\ntitle: [unclosed\n---\nbody");
    assert!(result.is_err());
}

#[test]
fn timeline_banner_era_config_keeps_declaration_order() {
    init_logging();
    let text = "---\ntitle: Banner\nbannerType: timeline\nbannerData:\n  category: wars\n  startYear: 1900\n  endYear: 1950\n  eraConfig:\n    zeta:\n      displayName: Zeta\n      startYear: 1900\n      endYear: 1920\n    alpha:\n      displayName: Alpha\n      startYear: 1920\n      endYear: 1950\n---\n";
    let doc = parse_document(text).unwrap();
    let banner = doc.frontmatter.banner_data.unwrap();
    let keys: Vec<&str> = banner.era_config.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["zeta", "alpha"]);
    assert_eq!(banner.start_year, Some(1900));
    assert_eq!(banner.category.as_deref(), Some("wars"));
}

#[test]
fn post_cache_upserts_by_slug() {
    init_logging();
    let mut store = MemoryStore::new();
    let mut cache = PostCache::new(&mut store);
    let mut post = sample_post();

    cache.save(&post, "src/content/posts", today()).unwrap();
    post.description = "Revised".to_string();
    let listing = cache.save(&post, "src/content/posts", today()).unwrap();

    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].description, "Revised");
    assert_eq!(
        listing[0].filepath,
        format!("src/content/posts/{}.mdx", post.slug)
    );
    assert_eq!(listing[0].updated.as_deref(), Some("2024-05-17"));

    let full = cache.load_full(&post.slug).unwrap();
    assert_eq!(full.metadata.content.as_deref(), Some(post.content.as_str()));
    assert_eq!(full.timeline_data, post.timeline);
    assert_eq!(cache.list(), listing);
}
