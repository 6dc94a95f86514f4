use std::sync::Once;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDate;
use chronicle_core::frontmatter::build_document;
use chronicle_core::{KeyValueStore, MemoryStore, Post};
use chronicle_engine::editor::{delete_post, fetch_posts, save_post, trigger_rebuild, DEPLOY_WORKFLOW};
use chronicle_engine::github::TOKEN_KEY;
use chronicle_engine::{CommitOutcome, GitHubClient, RepoConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(chronicle_logging::initialize_for_tests);
}

fn client(server: &MockServer) -> GitHubClient {
    let config = RepoConfig {
        owner: "octo".to_string(),
        repo: "blog".to_string(),
        api_base: server.uri(),
        ..RepoConfig::default()
    };
    GitHubClient::new(config, Some("secret".to_string())).expect("client builds")
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
}

fn sample_post() -> Post {
    let mut post = Post::empty(today());
    post.title = "Hello".to_string();
    post.slug = "hello".to_string();
    post.content = "Body text".to_string();
    post
}

fn contents_response(file_path: &str, sha: &str, text: &str) -> serde_json::Value {
    json!({
        "path": file_path,
        "sha": sha,
        "encoding": "base64",
        "content": STANDARD.encode(text.as_bytes()),
    })
}

const POST_PATH: &str = "/repos/octo/blog/contents/src/content/posts/hello.mdx";

#[tokio::test]
async fn identical_content_is_not_committed() {
    init();
    let server = MockServer::start().await;
    let post = sample_post();
    let document = build_document(&post);
    Mock::given(method("GET"))
        .and(path(POST_PATH))
        .and(query_param("ref", "main"))
        .and(header("authorization", "token secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(contents_response(
            "src/content/posts/hello.mdx",
            "abc123",
            &document,
        )))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(POST_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = save_post(&client(&server), &post, false, None).await;

    assert!(result.success);
    assert!(!result.changed);
    assert_eq!(result.filepath.as_deref(), Some("src/content/posts/hello.mdx"));
}

#[tokio::test]
async fn new_file_is_created_with_branch_and_message() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(POST_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(POST_PATH))
        .and(body_partial_json(json!({"message": "Draft: Hello", "branch": "main"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let result = save_post(&client(&server), &sample_post(), true, None).await;

    assert!(result.success, "{:?}", result.error);
    assert!(result.changed);
}

#[tokio::test]
async fn changed_file_is_updated_with_its_sha() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/blog/contents/notes/a%20b.md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(contents_response(
            "notes/a b.md",
            "old-sha",
            "old text",
        )))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/repos/octo/blog/contents/notes/a%20b.md"))
        .and(body_partial_json(json!({
            "sha": "old-sha",
            "content": STANDARD.encode("new text"),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server)
        .commit_file("notes/a b.md", "new text", "Update notes")
        .await
        .expect("commit succeeds");
    assert_eq!(outcome, CommitOutcome::Updated);
}

#[tokio::test]
async fn unauthorized_save_reports_friendly_message() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(POST_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .mount(&server)
        .await;

    let result = save_post(&client(&server), &sample_post(), false, None).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Authentication failed. Please refresh your GitHub token.")
    );
}

#[tokio::test]
async fn operations_without_token_fail_before_any_request() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let config = RepoConfig {
        api_base: server.uri(),
        ..RepoConfig::default()
    };
    let client = GitHubClient::new(config, None).expect("client builds");

    let result = save_post(&client, &sample_post(), false, None).await;
    assert_eq!(result.error.as_deref(), Some("Please authenticate with GitHub first"));
    let result = delete_post(&client, "src/content/posts/hello.mdx", "Hello").await;
    assert!(!result.success);
}

#[tokio::test]
async fn delete_sends_sha_of_existing_file() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(POST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(contents_response(
            "src/content/posts/hello.mdx",
            "to-delete",
            "x",
        )))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(POST_PATH))
        .and(body_partial_json(json!({"sha": "to-delete", "message": "Delete: Hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let result = delete_post(&client(&server), "src/content/posts/hello.mdx", "Hello").await;
    assert!(result.success, "{:?}", result.error);
}

#[tokio::test]
async fn missing_workflow_explains_what_to_add() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/blog/actions/workflows/deploy.yml/dispatches"))
        .and(body_partial_json(json!({"ref": "main", "inputs": {"source": "post-editor"}})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let result = trigger_rebuild(&client(&server), DEPLOY_WORKFLOW).await;

    assert!(!result.success);
    let message = result.error.unwrap_or_default();
    assert!(message.contains("Workflow file not found"), "{message}");
    assert!(message.contains("deploy.yml"));
}

#[tokio::test]
async fn listing_keeps_unreadable_files_as_error_entries() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/blog/contents/src/content/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "good.mdx", "path": "src/content/posts/good.mdx", "sha": "1", "type": "file"},
            {"name": "broken.md", "path": "src/content/posts/broken.md", "sha": "2", "type": "file"},
            {"name": "image.png", "path": "src/content/posts/image.png", "sha": "3", "type": "file"},
            {"name": "2024", "path": "src/content/posts/2024", "sha": "4", "type": "dir"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/blog/contents/src/content/posts/good.mdx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(contents_response(
            "src/content/posts/good.mdx",
            "1",
            "---\ntitle: Good Post\npublished: 2024-02-02\ntags: [a, b]\n---\nHello there",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/blog/contents/src/content/posts/broken.md"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&server)
        .await;

    let posts = fetch_posts(&client(&server), "src/content/posts", today())
        .await
        .expect("listing succeeds");

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "Good Post");
    assert_eq!(posts[0].slug, "good");
    assert_eq!(posts[0].published, "2024-02-02");
    assert_eq!(posts[0].tags, vec!["a".to_string(), "b".to_string()]);
    assert!(!posts[0].error);

    assert!(posts[1].error);
    assert_eq!(posts[1].slug, "broken");
    assert_eq!(posts[1].description, "Error loading post content");
    assert_eq!(posts[1].published, "Unknown");
}

#[tokio::test]
async fn listing_a_file_is_not_a_directory() {
    init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/blog/contents/README.md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(contents_response("README.md", "9", "hi")))
        .mount(&server)
        .await;

    let err = client(&server).list_directory("README.md").await.unwrap_err();
    assert!(matches!(err, chronicle_engine::GitHubError::NotADirectory(_)));
}

#[test]
fn authenticate_and_logout_round_trip_the_store() {
    let mut store = MemoryStore::default();
    let mut client = GitHubClient::new(RepoConfig::default(), None).expect("client builds");
    assert!(!client.is_authenticated());

    assert!(!client.authenticate("   ", &mut store).expect("store ok"));
    assert!(client.authenticate("ghp_token", &mut store).expect("store ok"));
    assert!(client.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("ghp_token"));

    let restored = GitHubClient::from_store(RepoConfig::default(), &store).expect("client builds");
    assert!(restored.is_authenticated());

    client.logout(&mut store).expect("store ok");
    assert!(!client.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY), None);
}
