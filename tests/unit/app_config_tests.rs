/*!
 * Tests for application configuration
 */

use storydoc::app_config::{Config, LogLevel};
use storydoc::document::{MarginProfile, PageSize};
use storydoc::errors::ConfigError;

#[test]
fn test_default_shouldValidate() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.fetch.concurrent_requests, 1);
    assert!(config.cache.enabled);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.document.page_size(), PageSize::A4);
}

#[test]
fn test_deserialize_withPartialFile_shouldFillDefaults() {
    let json = r#"{
        "document": { "page_size": "Letter", "margins": "wide" },
        "fetch": { "concurrent_requests": 4 },
        "log_level": "debug"
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.document.page_size(), PageSize::Letter);
    assert_eq!(config.document.margins(), MarginProfile::Wide);
    assert_eq!(config.document.spacer_lines(), 2);
    assert_eq!(config.fetch.concurrent_requests, 4);
    assert_eq!(config.fetch.home_url, "https://prts.wiki/");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert!(config.validate().is_ok());
}

#[test]
fn test_deserialize_withInvalidLayout_shouldFailAtLoad() {
    let json = r#"{ "document": { "line_spacing": 9.0 } }"#;
    assert!(serde_json::from_str::<Config>(json).is_err());
}

#[test]
fn test_validate_withZeroConcurrency_shouldNameField() {
    let mut config = Config::default();
    config.fetch.concurrent_requests = 0;

    match config.validate() {
        Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "fetch.concurrent_requests"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_validate_withBadUrls_shouldFail() {
    let mut config = Config::default();
    config.fetch.api_url = "not a url".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.fetch.home_url = "https://prts.wiki".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withEmptyQueryField_shouldFail() {
    let mut config = Config::default();
    config.fetch.character_query.table = " ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_serialize_shouldRoundTripThroughDefaults() {
    let json = serde_json::to_string_pretty(&Config::default()).unwrap();
    let back: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(back.fetch, Config::default().fetch);
    assert_eq!(back.document, Config::default().document);
}

#[test]
fn test_logLevel_shouldMapToFilter() {
    assert_eq!(LogLevel::Trace.to_level_filter(), log::LevelFilter::Trace);
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
}
