//! Integration tests for the preview pipeline.

mod common;

use common::{entries, FakeRasterizer, FlakyStore, RecordingSleeper};
use pdfveil::index::read_index;
use pdfveil::model::encode_png;
use pdfveil::pipeline::MANIFEST_NAME;
use pdfveil::publish::Publisher;
use pdfveil::{
    ContentId, Document, Error, PatchPlanner, PreviewOptions, PreviewPipeline, Redactor, Stage,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn sample_document() -> Document {
    Document::from_bytes(b"%PDF-1.7\n%fake body".to_vec()).with_filename("sample.pdf")
}

struct Harness {
    rasterizer: Arc<FakeRasterizer>,
    store: Arc<FlakyStore>,
    sleeper: Arc<RecordingSleeper>,
    scratch_parent: tempfile::TempDir,
}

impl Harness {
    fn new(rasterizer: FakeRasterizer, store: FlakyStore) -> Self {
        Self {
            rasterizer: Arc::new(rasterizer),
            store: Arc::new(store),
            sleeper: Arc::new(RecordingSleeper::default()),
            scratch_parent: tempfile::tempdir().unwrap(),
        }
    }

    fn options(&self) -> PreviewOptions {
        PreviewOptions::new().with_temp_dir(self.scratch_parent.path())
    }

    fn pipeline(&self, options: PreviewOptions, seed: u64) -> PreviewPipeline {
        let publisher = Publisher::new(self.store.clone()).with_sleeper(self.sleeper.clone());
        PreviewPipeline::seeded(self.rasterizer.clone(), publisher, options, seed)
    }

    fn scratch_entries(&self) -> usize {
        entries(self.scratch_parent.path())
    }

    fn manifest_ids(&self, id: &ContentId) -> Vec<String> {
        let value = self.store.inner().get_json(id).unwrap();
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }
}

#[tokio::test]
async fn test_single_page_gets_six_patches() {
    let harness = Harness::new(FakeRasterizer::uniform(1, 1000, 1000), FlakyStore::new());
    let options = harness.options();

    let expected_plan = PatchPlanner::seeded(&options, 11).plan(1000, 1000).unwrap();
    assert_eq!(expected_plan.len(), 6);

    let mut pipeline = harness.pipeline(options.clone(), 11);
    let outcome = pipeline.run(&sample_document()).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.manifest.source_filename, "sample.pdf");
    assert_eq!(outcome.manifest.page_count(), 1);

    let source = image::load_from_memory(&harness.rasterizer.written(1))
        .unwrap()
        .to_rgba8();
    let redacted = Redactor::new(options.blur_strength)
        .redact_image(&source, &expected_plan)
        .unwrap();
    let published = harness
        .store
        .inner()
        .get(&outcome.manifest.content_ids[0])
        .unwrap();
    assert_eq!(published, encode_png(&redacted).unwrap());
    assert_eq!(pipeline.stage(), Stage::CleanedUp);
}

#[tokio::test]
async fn test_unredacted_pages_are_published_verbatim() {
    let harness = Harness::new(FakeRasterizer::uniform(3, 120, 160), FlakyStore::new());
    let options = harness
        .options()
        .with_unredacted_pages(2)
        .with_patch_height(20);

    let outcome = harness
        .pipeline(options, 3)
        .run(&sample_document())
        .await
        .unwrap();

    let ids = &outcome.manifest.content_ids;
    assert_eq!(ids.len(), 3);
    let store = harness.store.inner();
    assert_eq!(store.get(&ids[0]).unwrap(), harness.rasterizer.written(1));
    assert_eq!(store.get(&ids[1]).unwrap(), harness.rasterizer.written(2));
    assert_ne!(store.get(&ids[2]).unwrap(), harness.rasterizer.written(3));
    assert_eq!(store.name_of(&ids[2]).as_deref(), Some("page-3.png"));
}

#[tokio::test]
async fn test_unredacted_pages_are_not_decoded() {
    let rasterizer = FakeRasterizer::uniform(3, 80, 100)
        .corrupt_page(1)
        .corrupt_page(3);
    let harness = Harness::new(rasterizer, FlakyStore::new());
    let options = harness
        .options()
        .with_unredacted_pages(2)
        .with_patch_height(20);

    let outcome = harness
        .pipeline(options, 5)
        .run(&sample_document())
        .await
        .unwrap();

    let ids = &outcome.manifest.content_ids;
    assert_eq!(ids.len(), 2);
    assert_eq!(
        harness.store.inner().get(&ids[0]).unwrap(),
        harness.rasterizer.written(1)
    );
    assert_eq!(outcome.failed_pages.len(), 1);
    assert_eq!(outcome.failed_pages[0].page, 3);
    assert_eq!(outcome.failed_pages[0].file, "page-3.png");
}

#[tokio::test]
async fn test_failed_page_is_reported_not_fatal() {
    let harness = Harness::new(
        FakeRasterizer::uniform(5, 60, 90),
        FlakyStore::new().failing_name("page-3.png"),
    );
    let options = harness.options().with_patch_height(10).with_retries(2);

    let outcome = harness
        .pipeline(options, 5)
        .run(&sample_document())
        .await
        .unwrap();

    assert_eq!(outcome.manifest.page_count(), 4);
    assert_eq!(outcome.failed_pages.len(), 1);
    let failure = &outcome.failed_pages[0];
    assert_eq!(failure.page, 3);
    assert_eq!(failure.file, "page-3.png");
    assert!(failure.error.contains("page-3.png"));

    let published: Vec<String> = outcome
        .manifest
        .content_ids
        .iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(harness.manifest_ids(outcome.manifest_content_id()), published);
    assert_eq!(
        harness.sleeper.delays(),
        vec![Duration::from_millis(1000), Duration::from_millis(2000)]
    );
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_failures_reported_in_page_order() {
    let harness = Harness::new(
        FakeRasterizer::uniform(3, 40, 60).corrupt_page(2),
        FlakyStore::new().failing_name("page-1.png"),
    );
    let options = harness.options().with_patch_height(10).with_retries(0);

    let outcome = harness
        .pipeline(options, 2)
        .run(&sample_document())
        .await
        .unwrap();

    let pages: Vec<u32> = outcome.failed_pages.iter().map(|f| f.page).collect();
    assert_eq!(pages, vec![1, 2]);
    assert_eq!(outcome.manifest.page_count(), 1);
}

#[tokio::test]
async fn test_batches_bound_concurrent_uploads() {
    let harness = Harness::new(FakeRasterizer::uniform(7, 40, 60), FlakyStore::new());
    let options = harness.options().with_patch_height(10).with_batch_size(2);

    let outcome = harness
        .pipeline(options, 1)
        .run(&sample_document())
        .await
        .unwrap();

    assert_eq!(outcome.manifest.page_count(), 7);
    assert_eq!(harness.store.max_in_flight(), 2);
    // 7 pages + manifest
    assert_eq!(harness.store.calls(), 8);
}

#[tokio::test]
async fn test_pages_keep_source_order() {
    let harness = Harness::new(FakeRasterizer::uniform(12, 30, 40), FlakyStore::new());
    let options = harness
        .options()
        .with_patch_height(5)
        .with_batch_size(5)
        .with_unredacted_pages(12);

    let outcome = harness
        .pipeline(options, 1)
        .run(&sample_document())
        .await
        .unwrap();

    let store = harness.store.inner();
    let names: Vec<String> = outcome
        .manifest
        .content_ids
        .iter()
        .map(|id| store.name_of(id).unwrap())
        .collect();
    let expected: Vec<String> = (1..=12).map(|i| format!("page-{}.png", i)).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_rasterization_failure_cleans_up() {
    let harness = Harness::new(FakeRasterizer::failing(), FlakyStore::new());
    let mut pipeline = harness.pipeline(harness.options(), 1);

    let result = pipeline.run(&sample_document()).await;

    assert!(matches!(result, Err(Error::Conversion(_))));
    assert_eq!(pipeline.stage(), Stage::Failed);
    let out_dirs = harness.rasterizer.out_dirs();
    assert_eq!(out_dirs.len(), 1);
    assert!(!out_dirs[0].exists());
    assert_eq!(harness.scratch_entries(), 0);
    assert_eq!(harness.store.calls(), 0);
}

#[tokio::test]
async fn test_no_pages_is_an_error() {
    let harness = Harness::new(FakeRasterizer::new(Vec::new()), FlakyStore::new());
    let result = harness
        .pipeline(harness.options(), 1)
        .run(&sample_document())
        .await;

    assert!(matches!(result, Err(Error::NoPagesGenerated)));
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_page_shorter_than_patch_aborts() {
    let harness = Harness::new(FakeRasterizer::uniform(2, 100, 50), FlakyStore::new());
    let result = harness
        .pipeline(harness.options().with_patch_height(80), 1)
        .run(&sample_document())
        .await;

    assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    assert_eq!(harness.store.calls(), 0);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_manifest_failure_is_fatal() {
    let harness = Harness::new(
        FakeRasterizer::uniform(2, 40, 60),
        FlakyStore::new().failing_name(MANIFEST_NAME),
    );
    let options = harness.options().with_patch_height(10).with_retries(1);

    let result = harness.pipeline(options, 1).run(&sample_document()).await;

    match result {
        Err(Error::ManifestPublish(cause)) => {
            assert!(matches!(*cause, Error::PublishExhausted { attempts: 2, .. }));
        }
        other => panic!("expected manifest failure, got {:?}", other),
    }
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_invalid_options_rejected_before_work() {
    let harness = Harness::new(FakeRasterizer::uniform(1, 40, 60), FlakyStore::new());
    let result = harness
        .pipeline(harness.options().with_coverage(1.5), 1)
        .run(&sample_document())
        .await;

    assert!(matches!(result, Err(Error::InvalidConfig(_))));
    assert!(harness.rasterizer.out_dirs().is_empty());
}

#[tokio::test]
async fn test_missing_source_file() {
    let harness = Harness::new(FakeRasterizer::uniform(1, 40, 60), FlakyStore::new());
    let result = harness
        .pipeline(harness.options(), 1)
        .run(&Document::from_path("/nonexistent/input.pdf"))
        .await;

    assert!(matches!(result, Err(Error::Conversion(_))));
}

#[tokio::test]
async fn test_index_appended_across_runs() {
    let harness = Harness::new(FakeRasterizer::uniform(1, 40, 60), FlakyStore::new());
    let index_dir = tempfile::tempdir().unwrap();
    let index_path = index_dir.path().join("ipfs_cids.json");
    let options = harness
        .options()
        .with_patch_height(10)
        .with_index_path(&index_path);

    let first = harness
        .pipeline(options.clone(), 1)
        .run(&sample_document())
        .await
        .unwrap();
    let second = harness
        .pipeline(options, 2)
        .run(&Document::from_bytes(b"%PDF-1.4 other".to_vec()).with_filename("other.pdf"))
        .await
        .unwrap();

    assert_eq!(first.index_path.as_deref(), Some(index_path.as_path()));
    let entries = read_index(&index_path);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].file, "sample.pdf");
    assert_eq!(&entries[0].json_cid, first.manifest_content_id());
    assert_eq!(entries[1].file, "other.pdf");
    assert_eq!(&entries[1].json_cid, second.manifest_content_id());
}

#[tokio::test]
async fn test_unwritable_index_keeps_published_manifest() {
    let harness = Harness::new(FakeRasterizer::uniform(2, 40, 60), FlakyStore::new());
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let options = harness
        .options()
        .with_patch_height(10)
        .with_index_path(blocker.path().join("ipfs_cids.json"));

    let mut pipeline = harness.pipeline(options, 1);
    let outcome = pipeline.run(&sample_document()).await.unwrap();

    assert!(outcome.index_path.is_none());
    assert_eq!(outcome.manifest.page_count(), 2);
    assert_eq!(harness.manifest_ids(outcome.manifest_content_id()).len(), 2);
    assert_eq!(harness.store.inner().len(), 3);
    assert_eq!(pipeline.stage(), Stage::CleanedUp);
    assert_eq!(harness.scratch_entries(), 0);
}

#[tokio::test]
async fn test_index_not_written_unless_configured() {
    let harness = Harness::new(FakeRasterizer::uniform(1, 40, 60), FlakyStore::new());
    let cwd_index = Path::new("ipfs_cids.json");
    let existed = cwd_index.exists();

    let outcome = harness
        .pipeline(harness.options().with_patch_height(10), 1)
        .run(&sample_document())
        .await
        .unwrap();

    assert!(outcome.index_path.is_none());
    assert_eq!(cwd_index.exists(), existed);
}

#[tokio::test]
async fn test_file_document_is_read_in_place() {
    let harness = Harness::new(FakeRasterizer::uniform(1, 40, 60), FlakyStore::new());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, b"%PDF-1.7\n").unwrap();

    let outcome = harness
        .pipeline(harness.options().with_patch_height(10), 1)
        .run(&Document::from_path(&path))
        .await
        .unwrap();

    assert_eq!(outcome.manifest.source_filename, "report.pdf");
    assert!(path.exists());
    assert_eq!(harness.scratch_entries(), 0);
}
