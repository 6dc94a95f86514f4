use std::sync::Once;

use chrono::{TimeZone, Utc};
use chronicle_core::friend::{friend_markdown, FRIENDS_KEY, FRIEND_CONTENT_ENABLED_KEY};
use chronicle_core::listing::merge_listing;
use chronicle_core::{
    EntrySource, Friend, FriendPost, FriendRoster, KeyValueStore, MemoryStore, PostEntry,
    RosterError, SiteInfo,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(chronicle_logging::initialize_for_tests);
}

fn post(id: &str, published: &str) -> FriendPost {
    FriendPost {
        id: id.to_string(),
        title: format!("Title {id}"),
        slug: id.to_string(),
        published: published.to_string(),
        ..FriendPost::default()
    }
}

fn friend(url: &str, posts: Vec<FriendPost>) -> Friend {
    let mut friend = Friend::from_site(&SiteInfo {
        name: format!("Site {url}"),
        description: String::new(),
        avatar: String::new(),
        url: url.to_string(),
    });
    friend.post_count = posts.len();
    friend.posts = posts;
    friend
}

#[test]
fn only_temporary_friends_are_persisted() {
    init_logging();
    let mut roster = FriendRoster::new();
    roster.add(friend("https://a.example", vec![])).unwrap();
    roster.set_permanent(vec![friend("https://b.example", vec![])]);
    roster.set_content_enabled(false);

    let mut store = MemoryStore::new();
    roster.save(&mut store).unwrap();
    assert_eq!(store.get(FRIEND_CONTENT_ENABLED_KEY).as_deref(), Some("false"));
    let saved: Vec<Friend> = serde_json::from_str(&store.get(FRIENDS_KEY).unwrap()).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].url, "https://a.example");

    let loaded = FriendRoster::load(&store);
    assert_eq!(loaded.friends().len(), 1);
    assert!(!loaded.content_enabled());
    assert_eq!(loaded.temporary().count(), 1);
    assert_eq!(loaded.permanent().count(), 0);
}

#[test]
fn stored_permanent_flag_is_ignored_on_load() {
    init_logging();
    let mut store = MemoryStore::new();
    store
        .set(
            FRIENDS_KEY,
            r#"[{"id":"x","name":"X","url":"https://x.example","postCount":0,"posts":[],"isPermanent":true}]"#
                .to_string(),
        )
        .unwrap();
    let roster = FriendRoster::load(&store);
    assert_eq!(roster.temporary().count(), 1);
    assert!(roster.content_enabled());
}

#[test]
fn duplicate_urls_are_rejected() {
    init_logging();
    let mut roster = FriendRoster::new();
    roster.add(friend("https://a.example", vec![])).unwrap();
    let err = roster.add(friend("https://a.example", vec![])).unwrap_err();
    assert!(matches!(err, RosterError::Duplicate(url) if url == "https://a.example"));
}

#[test]
fn update_keeps_permanent_flag_and_set_permanent_replaces() {
    init_logging();
    let mut roster = FriendRoster::new();
    roster.set_permanent(vec![friend("https://p.example", vec![])]);
    let mut changed = roster.friends()[0].clone();
    changed.permanent = false;
    changed.bio = "updated".to_string();
    assert!(roster.update(changed));
    assert!(roster.friends()[0].permanent);
    assert_eq!(roster.friends()[0].bio, "updated");

    roster.set_permanent(vec![friend("https://q.example", vec![])]);
    let urls: Vec<&str> = roster.permanent().map(|f| f.url.as_str()).collect();
    assert_eq!(urls, vec!["https://q.example"]);

    let id = roster.friends()[0].id.clone();
    assert!(roster.remove(&id));
    assert!(!roster.remove(&id));
}

#[test]
fn synced_posts_of_permanent_friends_survive_reload() {
    init_logging();
    let mut store = MemoryStore::new();
    let mut roster = FriendRoster::new();
    roster.set_permanent(vec![friend("https://p.example", vec![])]);
    let mut synced = roster.friends()[0].clone();
    synced.posts = vec![post("a", "2024-03-01T00:00:00Z")];
    synced.last_synced = Some("2024-03-02T00:00:00Z".to_string());
    assert!(roster.update(synced));
    roster.save(&mut store).unwrap();

    // Friend pages carry no posts; the stored sync fills them in.
    let mut reloaded = FriendRoster::load(&store);
    reloaded.set_permanent(vec![friend("https://p.example", vec![])]);
    let restored = &reloaded.friends()[0];
    assert!(restored.permanent);
    assert_eq!(restored.post_count, 1);
    assert_eq!(restored.last_synced.as_deref(), Some("2024-03-02T00:00:00Z"));
    assert_eq!(reloaded.friend_content().len(), 1);

    // A friend whose page is gone loses its stored posts.
    reloaded.set_permanent(vec![]);
    reloaded.save(&mut store).unwrap();
    let mut again = FriendRoster::load(&store);
    again.set_permanent(vec![friend("https://p.example", vec![])]);
    assert_eq!(again.friends()[0].post_count, 0);
}

#[test]
fn friend_content_attributes_and_sorts_newest_first() {
    init_logging();
    let mut with_body = post("long", "2024-01-10T00:00:00Z");
    with_body.content = Some("word ".repeat(450));
    let mut roster = FriendRoster::new();
    roster
        .add(friend(
            "https://a.example",
            vec![post("old", "2023-05-01T00:00:00Z"), with_body],
        ))
        .unwrap();
    roster
        .add(friend("https://b.example", vec![post("mid", "Mon, 04 Dec 2023 10:00:00 +0000")]))
        .unwrap();

    let content = roster.friend_content();
    let ids: Vec<&str> = content.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["long", "mid", "old"]);
    assert_eq!(content[0].word_count, Some(450));
    assert_eq!(content[0].reading_time, Some(3));
    assert_eq!(content[1].word_count, Some(100));
    assert_eq!(content[1].reading_time, Some(1));
    assert_eq!(content[1].friend_name.as_deref(), Some("Site https://b.example"));
    assert!(content.iter().all(|p| p.is_friend_content));
}

#[test]
fn entries_merge_with_local_posts_by_date() {
    init_logging();
    let mut roster = FriendRoster::new();
    roster
        .add(friend(
            "https://a.example",
            vec![post("f1", "2024-02-01T00:00:00Z"), post("bad", "someday")],
        ))
        .unwrap();
    let friends = roster.as_entries();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].category, "Uncategorized");
    assert!(friends[0].is_friend_content());

    let local = |id: &str, day: u32| PostEntry {
        id: id.to_string(),
        slug: id.to_string(),
        title: id.to_string(),
        published: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        updated: None,
        description: String::new(),
        tags: vec![],
        category: String::new(),
        image: String::new(),
        body: String::new(),
        words: 10,
        minutes: 1,
        draft: false,
        source: EntrySource::Local,
    };
    let merged = merge_listing(vec![local("l1", 20), local("l2", 5)], friends);
    let ids: Vec<&str> = merged.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["f1", "l1", "l2"]);
}

#[test]
fn timeline_events_fall_back_to_publish_year() {
    init_logging();
    let mut dated = post("dated", "2020-06-01T00:00:00Z");
    dated.timeline_year = Some(1815);
    dated.timeline_era = Some("middle-period".to_string());
    let mut roster = FriendRoster::new();
    roster
        .add(friend("https://a.example", vec![dated, post("plain", "2021-06-01T00:00:00Z")]))
        .unwrap();
    let mut years: Vec<(String, i64)> = roster
        .as_timeline_events()
        .into_iter()
        .map(|e| (e.slug, e.year))
        .collect();
    years.sort();
    assert_eq!(years, vec![("dated".to_string(), 1815), ("plain".to_string(), 2021)]);
}

#[test]
fn markdown_page_describes_friend() {
    init_logging();
    let mut f = friend("https://a.example", vec![]);
    f.bio = "Writes about \"things\"".to_string();
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let md = friend_markdown(&f, now);
    assert!(md.starts_with("---\nname: \"Site https://a.example\"\n"));
    assert!(md.contains("bio: \"Writes about \\\"things\\\"\"\n"));
    assert!(md.contains("lastSynced: \"2024-03-01T12:00:00+00:00\"\n"));
    assert!(md.contains("Friend site: [https://a.example](https://a.example)"));
    assert!(md.contains("Last synced: Never"));
}
