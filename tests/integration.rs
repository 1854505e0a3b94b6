//! Integration tests for site-forge

use async_trait::async_trait;
use parking_lot::Mutex;
use site_forge::{
    llm::prompts,
    store::{SIDECAR_FILE, CONTENT_FILE},
    types::{EventKind, StreamStep},
    DeployRequest, GenerationContext, LlmProvider, MetadataPatch, ProviderDescriptor,
    ProviderRegistry, Result, SiteForgeError, SiteGenerator, SiteStore, StreamEvent,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_test::assert_ok;

const BLOG_PROMPT: &str = "创建一个简单的个人博客网站";
const PAGE: &str = "<!DOCTYPE html><html><head><title>Blog</title></head><body>Hi</body></html>";

type Hook = Box<dyn FnOnce() + Send>;

/// Provider double answering from a script, recording the system role of each call
struct ScriptedProvider {
    id: String,
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<String>>,
    on_first_call: Mutex<Option<Hook>>,
}

impl ScriptedProvider {
    fn new(id: &str, replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            on_first_call: Mutex::new(None),
        })
    }

    fn answering(id: &str) -> Arc<Self> {
        Self::new(
            id,
            vec![
                Ok("# Requirement\nA personal blog with posts and an about page.".to_string()),
                Ok(format!("Here is the page:\n```html\n{}\n```\nEnjoy!", PAGE)),
            ],
        )
    }

    fn failing(id: &str) -> Arc<Self> {
        Self::new(
            id,
            vec![Err(SiteForgeError::upstream(id, "service unavailable", Some(503), None))],
        )
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, system: &str, _user: &str) -> Result<String> {
        if let Some(hook) = self.on_first_call.lock().take() {
            hook();
        }
        self.calls.lock().push(system.to_string());
        self.replies.lock().pop_front().unwrap_or_else(|| {
            Err(SiteForgeError::upstream(&self.id, "script exhausted", None, None))
        })
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn is_ready(&self) -> bool {
        true
    }
}

fn descriptor(id: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        id: id.to_string(),
        display_name: format!("Scripted {}", id),
        vendor_name: "Test".to_string(),
        description: "Scripted provider".to_string(),
        capabilities: vec!["html-generation".to_string()],
        has_credential: true,
        enabled: true,
    }
}

fn registry_with(providers: &[&Arc<ScriptedProvider>]) -> Arc<ProviderRegistry> {
    let registry = Arc::new(ProviderRegistry::new());
    for provider in providers {
        registry.register(descriptor(&provider.id), Arc::clone(provider) as Arc<dyn LlmProvider>);
    }
    if let Some(first) = providers.first() {
        registry.select_initial(&first.id);
    }
    registry
}

async fn collect_stream(
    generator: &SiteGenerator,
    ctx: &GenerationContext,
    prompt: &str,
) -> (Option<site_forge::GeneratedSite>, Vec<StreamEvent>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let site = generator.generate_stream(ctx, prompt, tx).await.unwrap();
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (site, events)
}

// Generation pipeline

#[tokio::test]
async fn test_buffered_generation_strips_fence() {
    let provider = ScriptedProvider::answering("qwen3");
    let generator = SiteGenerator::new(registry_with(&[&provider]));

    let site = generator
        .generate(&GenerationContext::default(), BLOG_PROMPT)
        .await
        .unwrap();

    assert!(!site.degraded);
    assert_eq!(site.html, PAGE);
    assert_eq!(site.provider_id.as_deref(), Some("qwen3"));

    let calls = provider.calls.lock().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], prompts::PRODUCT_MANAGER_ROLE);
    assert_eq!(calls[1], prompts::html_developer_role());
}

#[tokio::test]
async fn test_upstream_failure_yields_fallback_page() {
    let provider = ScriptedProvider::failing("doubao");
    let generator = SiteGenerator::new(registry_with(&[&provider]));

    let site = generator
        .generate(&GenerationContext::default(), BLOG_PROMPT)
        .await
        .unwrap();

    assert!(site.degraded);
    assert!(site.html.contains("<!DOCTYPE") || site.html.contains("<html"));
    assert!(site.html.contains(BLOG_PROMPT));
    // stage 2 never runs after a stage 1 failure
    assert_eq!(provider.call_count(), 1);

    let metrics = generator.get_metrics_snapshot();
    assert_eq!(metrics.requests, 1);
    assert_eq!(metrics.degraded, 1);
    assert_eq!(metrics.upstream_failures, 1);
}

#[tokio::test]
async fn test_no_provider_still_returns_html() {
    let generator = SiteGenerator::new(Arc::new(ProviderRegistry::new()));
    let site = generator
        .generate(&GenerationContext::default(), "landing page")
        .await
        .unwrap();

    assert!(site.degraded);
    assert!(site.provider_id.is_none());
    assert!(site.html.starts_with("<!DOCTYPE html>"));

    // a missing provider is a configuration problem, not an upstream failure
    let metrics = generator.get_metrics_snapshot();
    assert_eq!(metrics.degraded, 1);
    assert_eq!(metrics.upstream_failures, 0);
    assert_eq!(metrics.degraded_ratio(), 1.0);
}

#[tokio::test]
async fn test_empty_prompt_is_rejected() {
    let provider = ScriptedProvider::answering("qwen3");
    let generator = SiteGenerator::new(registry_with(&[&provider]));

    let err = generator
        .generate(&GenerationContext::default(), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, SiteForgeError::Validation { .. }));
    assert_eq!(err.http_status(), 400);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_stream_event_order_on_success() {
    let provider = ScriptedProvider::answering("qwen3");
    let generator = SiteGenerator::new(registry_with(&[&provider]));

    let (site, events) =
        collect_stream(&generator, &GenerationContext::default(), BLOG_PROMPT).await;

    let steps: Vec<StreamStep> = events.iter().map(|e| e.step).collect();
    assert_eq!(
        steps,
        vec![
            StreamStep::Start,
            StreamStep::Requirement,
            StreamStep::RequirementComplete,
            StreamStep::Html,
            StreamStep::Complete,
            StreamStep::Finished,
        ]
    );

    let terminal: Vec<&StreamEvent> = events.iter().filter(|e| e.kind.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(terminal[0].kind, EventKind::Success);
    assert_eq!(terminal[0].body, PAGE);
    assert_eq!(events[2].kind, EventKind::Progress);

    assert_eq!(site.unwrap().html, PAGE);
}

#[tokio::test]
async fn test_stream_failure_emits_single_error() {
    let provider = ScriptedProvider::new(
        "zhipu",
        vec![
            Ok("requirement".to_string()),
            Err(SiteForgeError::malformed_response("zhipu", "missing choices", None)),
        ],
    );
    let generator = SiteGenerator::new(registry_with(&[&provider]));

    let (site, events) =
        collect_stream(&generator, &GenerationContext::default(), BLOG_PROMPT).await;
    assert!(site.is_none());

    let steps: Vec<StreamStep> = events.iter().map(|e| e.step).collect();
    assert_eq!(
        steps,
        vec![
            StreamStep::Start,
            StreamStep::Requirement,
            StreamStep::RequirementComplete,
            StreamStep::Html,
            StreamStep::Error,
            StreamStep::Finished,
        ]
    );
    assert_eq!(events.iter().filter(|e| e.kind.is_terminal()).count(), 1);
    // streaming mode never substitutes the fallback page
    assert!(events.iter().all(|e| !e.body.contains("<!DOCTYPE")));
}

#[tokio::test]
async fn test_stream_stage_one_failure_skips_html_stage() {
    let provider = ScriptedProvider::failing("doubao");
    let generator = SiteGenerator::new(registry_with(&[&provider]));

    let (site, events) =
        collect_stream(&generator, &GenerationContext::default(), BLOG_PROMPT).await;
    assert!(site.is_none());

    let steps: Vec<StreamStep> = events.iter().map(|e| e.step).collect();
    assert_eq!(
        steps,
        vec![
            StreamStep::Start,
            StreamStep::Requirement,
            StreamStep::Error,
            StreamStep::Finished,
        ]
    );
    assert_eq!(events[2].kind, EventKind::Error);
    assert!(events[2].body.contains("service unavailable"));
    assert_eq!(provider.call_count(), 1);
    assert_eq!(generator.get_metrics_snapshot().upstream_failures, 1);
}

#[tokio::test]
async fn test_stream_disconnect_still_completes_pipeline() {
    let provider = ScriptedProvider::answering("qwen3");
    let generator = SiteGenerator::new(registry_with(&[&provider]));

    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);

    let site = generator
        .generate_stream(&GenerationContext::default(), BLOG_PROMPT, tx)
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 2);
    let site = site.unwrap();
    assert_eq!(site.html, PAGE);
    assert!(!site.degraded);
    assert_eq!(generator.get_metrics_snapshot().completed, 1);
}

#[tokio::test]
async fn test_requirement_preview_is_truncated() {
    let long_doc = "需".repeat(500);
    let provider = ScriptedProvider::new(
        "qwen3",
        vec![Ok(long_doc), Ok(PAGE.to_string())],
    );
    let generator = SiteGenerator::new(registry_with(&[&provider]));

    let (_, events) =
        collect_stream(&generator, &GenerationContext::default(), BLOG_PROMPT).await;
    let preview = events
        .iter()
        .find(|e| e.step == StreamStep::RequirementComplete)
        .unwrap();
    assert_eq!(preview.body.chars().count(), 203);
    assert!(preview.body.ends_with("..."));
}

#[tokio::test]
async fn test_context_pins_provider() {
    let first = ScriptedProvider::answering("qwen3");
    let second = ScriptedProvider::answering("zhipu");
    let generator = SiteGenerator::new(registry_with(&[&first, &second]));

    let site = generator
        .generate(&GenerationContext::with_provider("zhipu"), BLOG_PROMPT)
        .await
        .unwrap();

    assert_eq!(site.provider_id.as_deref(), Some("zhipu"));
    assert_eq!(first.call_count(), 0);
    assert_eq!(second.call_count(), 2);
}

#[tokio::test]
async fn test_switch_during_generation_keeps_provider() {
    let first = ScriptedProvider::answering("qwen3");
    let second = ScriptedProvider::answering("zhipu");
    let registry = registry_with(&[&first, &second]);

    let switcher = Arc::clone(&registry);
    *first.on_first_call.lock() = Some(Box::new(move || {
        assert!(switcher.switch_current("zhipu").ok);
    }));

    let generator = SiteGenerator::new(Arc::clone(&registry));
    let site = generator
        .generate(&GenerationContext::default(), BLOG_PROMPT)
        .await
        .unwrap();

    assert_eq!(site.provider_id.as_deref(), Some("qwen3"));
    assert_eq!(first.call_count(), 2);
    assert_eq!(second.call_count(), 0);
    assert_eq!(registry.current_id().as_deref(), Some("zhipu"));
}

#[test]
fn test_switch_to_unknown_provider() {
    let provider = ScriptedProvider::answering("qwen3");
    let registry = registry_with(&[&provider]);

    let outcome = registry.switch_current("gpt-5");
    assert!(!outcome.ok);
    assert!(outcome.message.contains("gpt-5"));
    assert_eq!(registry.current_id().as_deref(), Some("qwen3"));
}

// Site store

fn store(temp_dir: &TempDir) -> SiteStore {
    SiteStore::new(temp_dir.path().join("websites")).with_url_prefix("/websites")
}

#[tokio::test]
async fn test_deploy_then_get_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);

    let outcome = assert_ok!(
        store
            .deploy(
                DeployRequest::new(PAGE)
                    .with_path("blog")
                    .with_name("My Blog")
                    .with_description("Personal writing")
                    .with_generator("glm-4"),
            )
            .await
    );
    assert_eq!(outcome.url, "/websites/blog/");
    assert_eq!(outcome.message, "Website deployed successfully");

    let record = store.get("blog").await.unwrap().unwrap();
    assert_eq!(record.path, "blog");
    assert_eq!(record.name, "My Blog");
    assert_eq!(record.description, "Personal writing");
    assert_eq!(record.generator_id, "glm-4");
    assert_eq!(record.file_size_bytes, PAGE.len() as u64);
    assert!(record.updated_at >= record.created_at);
}

#[tokio::test]
async fn test_deploy_collision_leaves_existing_site() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);

    store
        .deploy(DeployRequest::new(PAGE).with_path("blog"))
        .await
        .unwrap();

    let err = store
        .deploy(DeployRequest::new("<html>other</html>").with_path("blog"))
        .await
        .unwrap_err();
    assert!(matches!(err, SiteForgeError::PathAlreadyExists { .. }));
    assert_eq!(err.http_status(), 400);

    let content = tokio::fs::read_to_string(store.root().join("blog").join(CONTENT_FILE))
        .await
        .unwrap();
    assert_eq!(content, PAGE);
}

#[tokio::test]
async fn test_concurrent_deploys_to_same_path() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);

    let (a, b) = tokio::join!(
        store.deploy(DeployRequest::new("<html>a</html>").with_path("race")),
        store.deploy(DeployRequest::new("<html>b</html>").with_path("race")),
    );
    assert!(a.is_ok() != b.is_ok());
}

#[tokio::test]
async fn test_invalid_path_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);

    let too_long = "x".repeat(101);
    for path in ["a<b", "c:d", too_long.as_str(), "../escape", "a/b", "bad name", "what?"] {
        let err = store
            .deploy(DeployRequest::new(PAGE).with_path(path))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteForgeError::InvalidPath { .. }), "{}", path);
    }

    assert!(!store.root().exists());
    assert!(!temp_dir.path().join("escape").exists());
}

#[tokio::test]
async fn test_list_newest_first() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);

    for path in ["first", "second", "third"] {
        store.deploy(DeployRequest::new(PAGE).with_path(path)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // stray files in the root are not sites
    tokio::fs::write(store.root().join("notes.txt"), "x").await.unwrap();

    let paths: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_update_content_and_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    store
        .deploy(DeployRequest::new(PAGE).with_path("blog").with_name("Old"))
        .await
        .unwrap();
    let before = store.get("blog").await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    let updated = store.update_content("blog", "<html>new</html>").await.unwrap();
    assert_eq!(updated.file_size_bytes, "<html>new</html>".len() as u64);
    assert_eq!(updated.name, "Old");
    assert_eq!(updated.created_at, before.created_at);
    assert!(updated.updated_at > before.updated_at);

    let renamed = store
        .update_metadata(
            "blog",
            &MetadataPatch {
                name: Some("New".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "New");
    assert_eq!(renamed.created_at, before.created_at);
    assert!(store.root().join("blog").join(SIDECAR_FILE).exists());
}

#[tokio::test]
async fn test_delete_then_get() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    store.deploy(DeployRequest::new(PAGE).with_path("gone")).await.unwrap();

    assert_ok!(store.delete("gone").await);
    assert!(store.get("gone").await.unwrap().is_none());

    let err = store.delete("gone").await.unwrap_err();
    assert!(matches!(err, SiteForgeError::NotFound { .. }));
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn test_mutations_on_missing_site() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);

    let err = store.update_content("missing", PAGE).await.unwrap_err();
    assert!(matches!(err, SiteForgeError::NotFound { .. }));

    let err = store
        .update_metadata("missing", &MetadataPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SiteForgeError::NotFound { .. }));

    let err = store.update_content("../x", PAGE).await.unwrap_err();
    assert!(matches!(err, SiteForgeError::InvalidPath { .. }));
}

#[tokio::test]
async fn test_generate_then_deploy() {
    let temp_dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::answering("qwen3");
    let generator = SiteGenerator::new(registry_with(&[&provider]));
    let store = store(&temp_dir);

    let site = generator
        .generate(&GenerationContext::default(), BLOG_PROMPT)
        .await
        .unwrap();
    let outcome = store
        .deploy(DeployRequest::new(site.html).with_name("博客"))
        .await
        .unwrap();

    let record = store.get(&outcome.path).await.unwrap().unwrap();
    assert_eq!(record.name, "博客");
    assert_eq!(outcome.url, format!("/websites/{}/", outcome.path));
}
