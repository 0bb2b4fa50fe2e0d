// tests/page_references.rs
//! Recording document URLs and rewriting links between documents.

mod common;

use common::*;
use notion_ingest::{
    AppError, FetchedDocument, FetcherConfig, ManifestStore, NotionRepository,
    PageReferenceConfig, PageReferenceError, PageReferenceHandler, PageReferenceManifestBuilder,
    PageReferenceManifestStore, ReferenceSource, TrackingCapabilities, TreeFetcher,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

async fn fetch_tracking_links(workspace: Arc<MockWorkspace>) -> FetchedDocument {
    let client: Arc<dyn NotionRepository> = workspace;
    TreeFetcher::new(
        client,
        FetcherConfig::default(),
        TrackingCapabilities {
            media_enabled: false,
            page_ref_enabled: true,
        },
    )
    .fetch(&root())
    .await
    .unwrap()
}

async fn open_store(base: &Path) -> PageReferenceManifestStore {
    let mut store = PageReferenceManifestStore::new(base);
    store.initialize().await.unwrap();
    store.load().await.unwrap();
    store
}

fn segment_href<'a>(document: &'a FetchedDocument, node: u32, index: usize) -> &'a Value {
    &document.find_node(&id(node)).unwrap().payload["rich_text"][index]["href"]
}

#[tokio::test]
async fn records_own_url_and_rewrites_known_targets() {
    let tmp = tempfile::tempdir().unwrap();
    let root = root();
    let (known, unknown) = (id(100), id(101));

    let workspace = Arc::new(
        MockWorkspace::new()
            .with_page(page(&root, json!({ "Public URL": url_property("https://site.test/root") })))
            .with_children(
                &root,
                vec![
                    block(
                        &id(1),
                        &root,
                        true,
                        "paragraph",
                        false,
                        paragraph_payload(vec![
                            page_mention(&known),
                            text(" and "),
                            linked_text("another", &format!("/{}", unknown.as_str())),
                        ]),
                    ),
                    block(
                        &id(2),
                        &root,
                        true,
                        "link_to_page",
                        false,
                        json!({ "type": "page_id", "page_id": known.to_hyphenated() }),
                    ),
                ],
            ),
    );
    let mut document = fetch_tracking_links(workspace).await;

    let mut store = open_store(tmp.path()).await;
    store
        .update_reference(&known, "https://old.host/docs/known?v=2", ReferenceSource::Manifest)
        .unwrap();

    let handler = PageReferenceHandler::new(
        PageReferenceConfig::default()
            .with_url_property("Public URL")
            .with_base_url("https://site.test/"),
    );
    let report = handler.process(&mut document, &mut store).unwrap();

    assert_eq!(report.recorded_url.as_deref(), Some("https://site.test/root"));
    let own = store.get_reference(&root).unwrap().unwrap();
    assert_eq!(own.url, "https://site.test/root");
    assert_eq!(own.source, ReferenceSource::Property);

    // The known target is looked up once but rewritten at both sites.
    assert_eq!(report.resolved_targets, 1);
    assert_eq!(report.rewritten_links, 2);
    assert_eq!(report.unresolved, vec![unknown.clone()]);

    assert_eq!(segment_href(&document, 1, 0), "https://site.test/docs/known?v=2");
    let link_to_page = &document.find_node(&id(2)).unwrap().payload;
    assert_eq!(link_to_page["href"], "https://site.test/docs/known?v=2");

    // Unresolved links are left exactly as fetched.
    let untouched = format!("/{}", unknown.as_str());
    assert_eq!(segment_href(&document, 1, 2), untouched.as_str());
    assert_eq!(
        document.find_node(&id(1)).unwrap().payload["rich_text"][2]["text"]["link"]["url"],
        untouched.as_str()
    );
}

#[tokio::test]
async fn transform_takes_precedence_over_base_url() {
    let tmp = tempfile::tempdir().unwrap();
    let root = root();
    let target = id(200);
    let workspace = Arc::new(
        MockWorkspace::new()
            .with_page(page(&root, json!({})))
            .with_children(
                &root,
                vec![block(
                    &id(1),
                    &root,
                    true,
                    "paragraph",
                    false,
                    paragraph_payload(vec![page_mention(&target)]),
                )],
            ),
    );
    let mut document = fetch_tracking_links(workspace).await;
    let mut store = open_store(tmp.path()).await;
    store
        .update_reference(&target, "/handbook/target", ReferenceSource::Manifest)
        .unwrap();

    let handler = PageReferenceHandler::new(
        PageReferenceConfig::default()
            .with_base_url("https://ignored.test")
            .with_transform(Arc::new(|stored: &str| format!("{}.html", stored))),
    );
    let report = handler.process(&mut document, &mut store).unwrap();

    assert_eq!(report.recorded_url, None);
    assert_eq!(segment_href(&document, 1, 0), "/handbook/target.html");
}

#[tokio::test]
async fn malformed_mention_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let root = root();
    let broken_mention = json!({
        "type": "mention",
        "mention": { "type": "page", "page": {} },
        "plain_text": "?",
        "href": null,
    });
    let workspace = Arc::new(
        MockWorkspace::new()
            .with_page(page(&root, json!({})))
            .with_children(
                &root,
                vec![block(
                    &id(1),
                    &root,
                    true,
                    "paragraph",
                    false,
                    paragraph_payload(vec![broken_mention]),
                )],
            ),
    );
    let mut document = fetch_tracking_links(workspace).await;
    assert_eq!(document.page_references.len(), 1);

    let mut store = open_store(tmp.path()).await;
    let result = PageReferenceHandler::default().process(&mut document, &mut store);

    assert!(matches!(
        result,
        Err(PageReferenceError::MalformedReference { .. })
    ));
}

#[tokio::test]
async fn builder_indexes_every_nested_document() {
    let tmp = tempfile::tempdir().unwrap();
    let root = root();
    let (guide, notes, draft) = (id(1), id(2), id(3));

    let child_page = |child: &notion_ingest::NotionId, title: &str| {
        block(child, &root, true, "child_page", false, json!({ "title": title }))
    };
    let slug = |value: &str| json!({ "id": "slug", "type": "rich_text", "rich_text": [text(value)] });

    let workspace = Arc::new(
        MockWorkspace::new()
            .with_children(
                &root,
                vec![
                    child_page(&guide, "Guide"),
                    child_page(&notes, "Notes"),
                    child_page(&draft, "Draft"),
                ],
            )
            .with_page(page(&root, json!({ "Slug": slug("/") })))
            .with_page(page(&guide, json!({ "Slug": slug("/guide") })))
            .with_page(page(&notes, json!({ "Slug": slug("not a path") })))
            .with_page(page(&draft, json!({}))),
    );

    let client: Arc<dyn NotionRepository> = workspace.clone();
    let builder = PageReferenceManifestBuilder::new(client, FetcherConfig::default(), "Slug");
    let mut store = open_store(tmp.path()).await;
    let report = builder.build(&root, &mut store).await.unwrap();

    assert_eq!(workspace.page_calls(), 4);
    assert_eq!(workspace.comment_calls(), 0);
    assert_eq!(report.documents_scanned, 4);
    assert_eq!(report.recorded, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, notes);

    let reloaded = open_store(tmp.path()).await;
    let references = reloaded.references().unwrap();
    assert_eq!(references.len(), 2);
    assert_eq!(references[root.as_str()].url, "/");
    assert_eq!(references[guide.as_str()].url, "/guide");
    assert_eq!(references[guide.as_str()].source, ReferenceSource::Manifest);
}

#[tokio::test]
async fn builder_propagates_fetch_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let root = root();
    let workspace = Arc::new(MockWorkspace::new().failing_on(&root));

    let client: Arc<dyn NotionRepository> = workspace;
    let builder = PageReferenceManifestBuilder::new(client, FetcherConfig::default(), "Slug");
    let mut store = open_store(tmp.path()).await;

    assert!(matches!(
        builder.build(&root, &mut store).await,
        Err(AppError::NotionService { .. })
    ));
}
