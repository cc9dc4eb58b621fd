//! `deepl-http` is an async client for the DeepL translation REST API.
//!
//! Every call goes through [`Translator::dispatch`], which authenticates the
//! request and retries transient failures (rate limiting, 5xx, network
//! errors) with jittered exponential backoff:
//! - [`Translator::translate_text`]
//! - [`Translator::upload_document`], [`Translator::document_status`],
//!   [`Translator::download_document`]
//! - [`Translator::create_glossary`] and the other glossary calls
//! - [`Translator::languages`], [`Translator::usage`]

mod account;
mod backoff;
mod classify;
mod client;
mod decode;
mod document;
mod endpoint;
mod error;
mod glossary;
mod multipart;
mod options;
mod params;
mod producer;
mod retry;
mod translate;
mod types;
mod wire;

#[cfg(feature = "cli")]
pub mod cli;

pub use backoff::Backoff;
pub use classify::{
    classify_status, classify_transport, status_error, status_message, QUOTA_EXCEEDED,
};
pub use client::{server_url_for_key, Translator, SERVER_URL_FREE, SERVER_URL_PRO};
pub use endpoint::{Body, Endpoint};
pub use error::{DeeplError, ErrorKind};
pub use multipart::MultipartUpload;
pub use options::ClientOptions;
pub use params::{
    DocumentOptions, Formality, LanguageType, SplitSentences, TagHandling, TranslateOptions,
};
pub use producer::{
    spawn_producer, BodyProducer, BodyWriter, ProductionHandle, StreamingBody, PIPE_CAPACITY,
};
pub use retry::{retry, CancelHandle, Cancellation, RetryError, RetryPolicy};
pub use types::{
    DocumentInfo, DocumentStatus, GlossaryEntry, GlossaryInfo, Language, LanguagePair,
    Translation, Usage,
};

pub type Result<T> = std::result::Result<T, DeeplError>;
