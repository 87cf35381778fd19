/*!
 * Tests for error types and conversions
 */

use std::io;
use std::path::Path;

use storydoc::errors::{
    AppError, CacheError, ConfigError, LOCKED_FILE_HINT, OutputWriteError, ParseError, READ_ONLY_DIR_HINT,
    RetrievalError,
};

use crate::common;

#[test]
fn test_retrievalError_isRetryable_shouldFollowStatusClass() {
    let status = |code| RetrievalError::Status { name: "1-7".to_string(), status_code: code };

    assert!(status(503).is_retryable());
    assert!(status(429).is_retryable());
    assert!(!status(403).is_retryable());
    assert!(RetrievalError::RequestFailed { name: "1-7".to_string(), message: "timeout".to_string() }.is_retryable());
    assert!(!RetrievalError::NotFound("1-7".to_string()).is_retryable());
}

#[test]
fn test_appError_fromDomainErrors_shouldWrap() {
    let retrieval: AppError = RetrievalError::NotFound("凯尔希".to_string()).into();
    assert!(matches!(retrieval, AppError::Retrieval(_)));
    assert!(retrieval.to_string().contains("凯尔希"));

    let parse: AppError = ParseError::MalformedContent("empty".to_string()).into();
    assert!(matches!(parse, AppError::Parse(_)));

    let cache: AppError = CacheError::Store("locked".to_string()).into();
    assert!(matches!(cache, AppError::Cache(_)));

    let config: AppError = ConfigError::invalid("document.spacer_lines", "too many").into();
    assert_eq!(config.to_string(), "Configuration error: Invalid value for 'document.spacer_lines': too many");

    let io_error: AppError = io::Error::other("disk full").into();
    assert!(matches!(io_error, AppError::File(_)));

    let other: AppError = anyhow::anyhow!("boom").into();
    assert!(matches!(other, AppError::Unknown(ref m) if m == "boom"));
}

#[test]
fn test_outputWriteError_fromIo_withExistingFile_shouldHintAtLockedFile() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "story.docx", "x").unwrap();

    let error = OutputWriteError::from_io(&path, io::Error::from(io::ErrorKind::PermissionDenied));

    match error {
        OutputWriteError::PermissionDenied { hint, .. } => assert_eq!(hint, LOCKED_FILE_HINT),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_outputWriteError_fromIo_withMissingFile_shouldHintAtDirectory() {
    let error = OutputWriteError::from_io(
        Path::new("/nonexistent/dir/story.docx"),
        io::Error::from(io::ErrorKind::PermissionDenied),
    );
    assert!(matches!(error, OutputWriteError::PermissionDenied { hint, .. } if hint == READ_ONLY_DIR_HINT));
    assert!(error.to_string().contains("permission denied"));
}

#[test]
fn test_outputWriteError_fromIo_withExistingDirectory_shouldHintAtDirectory() {
    let dir = common::create_temp_dir().unwrap();

    let error = OutputWriteError::from_io(dir.path(), io::Error::from(io::ErrorKind::PermissionDenied));

    assert!(matches!(error, OutputWriteError::PermissionDenied { hint, .. } if hint == READ_ONLY_DIR_HINT));
}

#[test]
fn test_outputWriteError_fromIo_withOtherKind_shouldBeIo() {
    let error = OutputWriteError::from_io(Path::new("a.docx"), io::Error::from(io::ErrorKind::StorageFull));
    assert!(matches!(error, OutputWriteError::Io { .. }));
}
