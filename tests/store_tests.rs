use std::sync::Arc;

use gistlink::errors::GistlinkError;
use gistlink::remote::memory::MemoryRemoteStore;
use gistlink::store::{GENERATED_SLUG_LEN, SlugStore, is_valid_slug};

const DOC_ID: &str = "doc-test";

async fn new_store() -> (Arc<MemoryRemoteStore>, SlugStore) {
    let remote = Arc::new(MemoryRemoteStore::new());
    remote.seed_document(DOC_ID).await;
    let store = SlugStore::new(
        remote.clone(),
        DOC_ID,
        "urls.json",
        "https://s.example.com",
    );
    (remote, store)
}

mod create_and_resolve {
    use super::*;

    #[tokio::test]
    async fn test_create_then_resolve_returns_url() {
        let (_remote, store) = new_store().await;

        let created = store
            .create_short_link("https://example.com/page", Some("demo"))
            .await
            .unwrap();
        assert_eq!(created.slug, "demo");
        assert_eq!(created.short_url, "https://s.example.com/r/demo");
        assert_eq!(created.click_count, 0);

        let record = store.resolve("demo").await.unwrap();
        assert_eq!(record.original_url, "https://example.com/page");
        assert_eq!(record.click_count, 0);
    }

    #[tokio::test]
    async fn test_generated_slug_when_none_requested() {
        let (_remote, store) = new_store().await;

        let created = store
            .create_short_link("https://example.com", None)
            .await
            .unwrap();
        assert_eq!(created.slug.len(), GENERATED_SLUG_LEN);
        assert!(is_valid_slug(&created.slug));
        assert!(created.short_url.ends_with(&created.slug));
    }

    #[tokio::test]
    async fn test_taken_slug_fails_and_leaves_record_untouched() {
        let (remote, store) = new_store().await;

        store
            .create_short_link("https://first.example.com", Some("demo"))
            .await
            .unwrap();
        let writes_before = remote.write_count();

        let err = store
            .create_short_link("https://second.example.com", Some("demo"))
            .await
            .unwrap_err();
        assert!(matches!(err, GistlinkError::SlugTaken(_)));
        // collision is detected before any write
        assert_eq!(remote.write_count(), writes_before);

        let record = store.resolve("demo").await.unwrap();
        assert_eq!(record.original_url, "https://first.example.com");
    }

    #[tokio::test]
    async fn test_invalid_requested_slug_rejected() {
        let (_remote, store) = new_store().await;

        for bad in ["has space", "dot.ted", "sla/sh", ""] {
            let err = store
                .create_short_link("https://example.com", Some(bad))
                .await
                .unwrap_err();
            assert!(matches!(err, GistlinkError::Validation(_)), "slug {:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_without_remote_calls() {
        let (remote, store) = new_store().await;

        for bad in ["", "not-a-url", "javascript:alert(1)", "ftp://x.example"] {
            let err = store
                .create_short_link(bad, Some("ok-slug"))
                .await
                .unwrap_err();
            assert!(matches!(err, GistlinkError::Validation(_)), "url {:?}", bad);
        }
        assert_eq!(remote.write_count(), 0);
    }
}

mod resolve_semantics {
    use super::*;

    #[tokio::test]
    async fn test_unknown_slug_is_not_found_and_triggers_no_write() {
        let (remote, store) = new_store().await;

        let err = store.resolve("unknown").await.unwrap_err();
        assert!(matches!(err, GistlinkError::NotFound(_)));
        assert_eq!(remote.write_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let (remote, store) = new_store().await;
        store
            .create_short_link("https://example.com", Some("twice"))
            .await
            .unwrap();

        let first = store.resolve("twice").await.unwrap();
        let second = store.resolve("twice").await.unwrap();
        assert_eq!(first, second);
        // reads never bump the write count
        assert_eq!(remote.write_count(), 1);
    }
}

mod clicks {
    use super::*;

    #[tokio::test]
    async fn test_increment_click_is_visible_on_resolve() {
        let (_remote, store) = new_store().await;
        store
            .create_short_link("https://example.com", Some("demo"))
            .await
            .unwrap();

        store.increment_click("demo").await;
        store.increment_click("demo").await;

        let record = store.resolve("demo").await.unwrap();
        assert_eq!(record.click_count, 2);
    }

    #[tokio::test]
    async fn test_click_for_unknown_slug_is_swallowed_without_write() {
        let (remote, store) = new_store().await;
        let writes_before = remote.write_count();

        // best-effort: no error surfaces, and nothing is written
        store.increment_click("missing").await;
        assert_eq!(remote.write_count(), writes_before);
    }

    #[tokio::test]
    async fn test_apply_clicks_batches_into_one_write() {
        let (remote, store) = new_store().await;
        store
            .create_short_link("https://a.example.com", Some("a"))
            .await
            .unwrap();
        store
            .create_short_link("https://b.example.com", Some("b"))
            .await
            .unwrap();
        let writes_before = remote.write_count();

        store
            .apply_clicks(&[("a".to_string(), 3), ("b".to_string(), 1)])
            .await
            .unwrap();
        assert_eq!(remote.write_count(), writes_before + 1);
        assert_eq!(store.resolve("a").await.unwrap().click_count, 3);
        assert_eq!(store.resolve("b").await.unwrap().click_count, 1);
    }
}

mod retry_exhaustion {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use gistlink::remote::{
        DeleteObjectRequest, ObjectCreated, PatchDocumentRequest, PutObjectRequest, RemoteStore,
        VersionedDocument,
    };

    use super::*;

    const WRITE_RETRY_BUDGET: usize = 3;

    /// Every conditional write loses: the table content reads fine but
    /// any patch reports a stale revision, as if another writer slips
    /// in between every read and write.
    #[derive(Default)]
    struct StaleTableStore {
        patch_calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteStore for StaleTableStore {
        async fn put_object(&self, _key: &str, _req: PutObjectRequest) -> gistlink::errors::Result<ObjectCreated> {
            Err(GistlinkError::network("objects not backed by this store"))
        }

        async fn delete_object(&self, _key: &str, _req: DeleteObjectRequest) -> gistlink::errors::Result<()> {
            Err(GistlinkError::network("objects not backed by this store"))
        }

        async fn get_document(&self, _id: &str) -> gistlink::errors::Result<VersionedDocument> {
            let content = r#"{
                "hot": {
                    "originalUrl": "https://example.com",
                    "createdAt": "2024-05-01T12:00:00Z",
                    "clicks": 0
                }
            }"#;
            Ok(VersionedDocument {
                content: content.to_string(),
                revision: "1".to_string(),
            })
        }

        async fn patch_document(&self, _id: &str, _req: PatchDocumentRequest) -> gistlink::errors::Result<String> {
            self.patch_calls.fetch_add(1, Ordering::SeqCst);
            Err(GistlinkError::concurrent_modification(
                "table changed since read",
            ))
        }

        fn backend_name(&self) -> &'static str {
            "stale-table"
        }
    }

    fn stale_store() -> (Arc<StaleTableStore>, SlugStore) {
        let remote = Arc::new(StaleTableStore::default());
        let store = SlugStore::new(
            remote.clone(),
            DOC_ID,
            "urls.json",
            "https://s.example.com",
        );
        (remote, store)
    }

    #[tokio::test]
    async fn test_create_gives_up_after_bounded_retries() {
        let (remote, store) = stale_store();

        let err = store
            .create_short_link("https://example.com/new", Some("fresh"))
            .await
            .unwrap_err();
        assert!(matches!(err, GistlinkError::ConcurrentModification(_)));
        assert_eq!(
            remote.patch_calls.load(Ordering::SeqCst),
            WRITE_RETRY_BUDGET
        );
    }

    #[tokio::test]
    async fn test_apply_clicks_gives_up_after_bounded_retries() {
        let (remote, store) = stale_store();

        let err = store
            .apply_clicks(&[("hot".to_string(), 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, GistlinkError::ConcurrentModification(_)));
        assert_eq!(
            remote.patch_calls.load(Ordering::SeqCst),
            WRITE_RETRY_BUDGET
        );
    }

    // Best-effort clicks swallow the exhaustion instead of surfacing it.
    #[tokio::test]
    async fn test_increment_click_swallows_exhaustion() {
        let (remote, store) = stale_store();

        store.increment_click("hot").await;
        assert_eq!(
            remote.patch_calls.load(Ordering::SeqCst),
            WRITE_RETRY_BUDGET
        );
    }
}

mod contention {
    use super::*;

    // Two concurrent creates with distinct slugs against the same
    // initial table state must both land; the conditional write turns
    // the lost race into a retry instead of a silent overwrite.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_both_survive() {
        let (_remote, store) = new_store().await;
        let store = Arc::new(store);

        let s1 = store.clone();
        let s2 = store.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(
                async move { s1.create_short_link("https://one.example.com", Some("one")).await }
            ),
            tokio::spawn(
                async move { s2.create_short_link("https://two.example.com", Some("two")).await }
            ),
        );
        r1.unwrap().unwrap();
        r2.unwrap().unwrap();

        assert_eq!(
            store.resolve("one").await.unwrap().original_url,
            "https://one.example.com"
        );
        assert_eq!(
            store.resolve("two").await.unwrap().original_url,
            "https://two.example.com"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clicks_do_not_lose_increments() {
        let (_remote, store) = new_store().await;
        store
            .create_short_link("https://example.com", Some("hot"))
            .await
            .unwrap();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..2 {
            let s = store.clone();
            handles.push(tokio::spawn(async move {
                s.apply_clicks(&[("hot".to_string(), 2)]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.resolve("hot").await.unwrap().click_count, 4);
    }
}
