/*!
 * # storydoc
 *
 * Turns game story scripts into formatted Word documents.
 *
 * ## Features
 *
 * - Parse raw script text into narrative elements, discarding engine noise
 * - Assemble chapters and character records into styled documents
 * - Write DOCX packages atomically
 * - Retrieve scripts from a MediaWiki site or a local directory
 * - Cache fetched text in SQLite so repeated runs stay offline
 *
 * ## Architecture
 *
 * - `script`: noise filter, line classifier and element sequencer
 * - `document`: layout configuration, document model, assembler and DOCX writer
 * - `retrieval`: the `ScriptRetriever` trait with HTTP and directory implementations
 * - `cache`: the `CacheStore` trait, SQLite and in-memory stores, and the fetch policy
 * - `app_config`: configuration management
 * - `app_controller`: batch export runs
 * - `file_utils`: file system operations and output naming
 * - `errors`: custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod cache;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod retrieval;
pub mod script;

pub use app_config::Config;
pub use app_controller::{Controller, ExportKind, ExportRequest, RunSummary};
pub use errors::{AppError, CacheError, ConfigError, OutputWriteError, ParseError, RetrievalError};
pub use script::{ParseReport, ParsedUnit, ScriptParser, parse_script};
