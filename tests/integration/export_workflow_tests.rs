/*!
 * End-to-end export tests
 *
 * Run the controller against the mock retriever and inspect the written
 * DOCX packages.
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use storydoc::app_config::Config;
use storydoc::cache::{CacheStore, DatabaseConnection, MemoryCacheStore, SqliteCacheStore};
use storydoc::document::DocxWriter;
use storydoc::{Controller, ExportKind, ExportRequest};

use crate::common;
use crate::common::mock_retriever::MockRetriever;

fn controller(mock: MockRetriever, store: Arc<dyn CacheStore>, concurrency: usize) -> Controller {
    common::init_test_logging();
    let mut config = Config::default();
    config.fetch.concurrent_requests = concurrency;
    Controller::with_parts(config, Arc::new(mock), store, Arc::new(DocxWriter::new()))
}

fn request(kind: ExportKind, names: &[&str], output: &Path) -> ExportRequest {
    let mut request = ExportRequest::new(kind, names.iter().map(|n| n.to_string()).collect());
    request.output = output.to_path_buf();
    request
}

fn three_chapters() -> MockRetriever {
    MockRetriever::new()
        .with_chapter("0-1", &[("行动前", "凯尔希：第一章")])
        .with_chapter("0-2", &[("行动前", "阿米娅：第二章")])
        .with_chapter("0-3", &[("行动前", "博士：第三章")])
}

#[tokio::test]
async fn test_run_withOneFailingName_shouldWriteTheOthers() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mock = three_chapters().failing("0-2");
    let controller = controller(mock, Arc::new(MemoryCacheStore::new()), 1);

    let summary = controller.run(&request(ExportKind::Story, &["0-1", "0-2", "0-3"], dir.path())).await?;

    assert_eq!(summary.written, vec![dir.path().join("0-1_story.docx"), dir.path().join("0-3_story.docx")]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "0-2");
    assert_eq!(summary.exit_code(), 0);
    assert!(!dir.path().join("0-2_story.docx").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withEveryNameFailing_shouldExitThree() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let controller = controller(MockRetriever::new(), Arc::new(MemoryCacheStore::new()), 1);

    let summary = controller.run(&request(ExportKind::Memory, &["无名氏"], dir.path())).await?;

    assert!(summary.written.is_empty());
    assert_eq!(summary.exit_code(), 3);
    Ok(())
}

#[tokio::test]
async fn test_run_combined_shouldKeepRequestOrderUnderDelays() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mock = three_chapters()
        .delayed("0-1", Duration::from_millis(120))
        .delayed("0-2", Duration::from_millis(60));
    let controller = controller(mock, Arc::new(MemoryCacheStore::new()), 3);

    let output = dir.path().join("all.docx");
    let mut req = request(ExportKind::Story, &["0-1", "0-2", "0-3"], &output);
    req.combined = true;
    let summary = controller.run(&req).await?;

    assert_eq!(summary.written, vec![output.clone()]);
    let body = common::read_docx_part(&output, "word/document.xml")?;
    let positions = common::positions_of(&body, &["0-1：行动前", "0-2：行动前", "0-3：行动前"]);
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
    Ok(())
}

#[tokio::test]
async fn test_run_combined_withDirectoryOutput_shouldUseDefaultFileName() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mock = MockRetriever::new()
        .with_character("凯尔希", &[("档案一", "凯尔希：记录一")])
        .with_character("阿米娅", &[("档案一", "阿米娅：记录二")]);
    let controller = controller(mock, Arc::new(MemoryCacheStore::new()), 1);

    let mut req = request(ExportKind::Memory, &["凯尔希", "阿米娅"], dir.path());
    req.combined = true;
    let summary = controller.run(&req).await?;

    let output = dir.path().join("combined_memory.docx");
    assert_eq!(summary.written, vec![output.clone()]);
    let body = common::read_docx_part(&output, "word/document.xml")?;
    assert!(body.contains("凯尔希：档案一"));
    assert!(body.contains("阿米娅：档案一"));
    Ok(())
}

#[tokio::test]
async fn test_run_combined_withUnwritableTarget_shouldExitFour() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let output = dir.path().join("taken.docx");
    std::fs::create_dir(&output)?;
    let controller = controller(three_chapters(), Arc::new(MemoryCacheStore::new()), 1);

    let mut req = request(ExportKind::Story, &["0-1"], &output);
    req.combined = true;
    let summary = controller.run(&req).await?;

    assert!(summary.combined_write_failed);
    assert_eq!(summary.exit_code(), 4);
    Ok(())
}

#[tokio::test]
async fn test_run_secondRun_shouldMakeNoRetrievals() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = DatabaseConnection::new(dir.path().join("cache.db"))?;
    let store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::new(db));

    let first_out = dir.path().join("first");
    controller(three_chapters(), store.clone(), 2)
        .run(&request(ExportKind::Story, &["0-1", "0-3"], &first_out))
        .await?;

    let offline = three_chapters();
    let tracker = offline.tracker();
    let second_out = dir.path().join("second");
    let summary = controller(offline, store, 2)
        .run(&request(ExportKind::Story, &["0-1", "0-3"], &second_out))
        .await?;

    assert_eq!(tracker.lock().unwrap().total(), 0);
    assert_eq!(summary.cache.hits, 4);
    for name in ["0-1_story.docx", "0-3_story.docx"] {
        assert_eq!(
            common::read_docx_part(&first_out.join(name), "word/document.xml")?,
            common::read_docx_part(&second_out.join(name), "word/document.xml")?
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_run_withRecords_shouldAppendSpeakerRecords() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mock = MockRetriever::new()
        .with_chapter("1-7", &[("行动前", "凯尔希：醒了？\n阿米娅：博士！")])
        .with_character("凯尔希", &[("往事", "凯尔希：很久以前。")]);
    let controller = controller(mock, Arc::new(MemoryCacheStore::new()), 1);

    let mut req = request(ExportKind::Story, &["1-7"], dir.path());
    req.attach_records = true;
    let summary = controller.run(&req).await?;

    assert_eq!(summary.exit_code(), 0);
    let body = common::read_docx_part(&dir.path().join("1-7_story.docx"), "word/document.xml")?;
    assert!(body.contains("相关角色秘录"));
    assert!(body.contains("凯尔希：往事"));
    assert!(summary.failed.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_run_withEmptyEntry_shouldSkipItAndKeepTheRest() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let mock = MockRetriever::new().with_character(
        "凯尔希",
        &[("空白", "[Dialog]\n$bgm_m_bat_awaken"), ("档案二", "凯尔希：有内容。")],
    );
    let controller = controller(mock, Arc::new(MemoryCacheStore::new()), 1);

    let summary = controller.run(&request(ExportKind::Memory, &["凯尔希"], dir.path())).await?;

    assert_eq!(summary.written.len(), 1);
    let body = common::read_docx_part(&summary.written[0], "word/document.xml")?;
    assert!(body.contains("档案二"));
    assert!(!body.contains("空白"));
    Ok(())
}

#[tokio::test]
async fn test_run_verbose_shouldWriteSkippedReport() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let script = common::sample_script("凯尔希", "你好");
    let mock = MockRetriever::new().with_chapter("1-7", &[("行动前", script.as_str())]);
    let controller = controller(mock, Arc::new(MemoryCacheStore::new()), 1);

    let mut req = request(ExportKind::Story, &["1-7"], dir.path());
    req.verbose = true;
    controller.run(&req).await?;

    let report = std::fs::read_to_string(dir.path().join("1-7_story.skipped.txt"))?;
    assert_eq!(report.lines().count(), 2);
    assert!(report.lines().all(|l| l.starts_with("1-7\t行动前\t")));
    Ok(())
}
