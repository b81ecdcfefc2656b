//! Batch conversion: many documents, one engine.
//!
//! Results are yielded in completion order, up to `config.concurrency`
//! conversions at a time. Every conversion goes through the same
//! [`crate::engine::EngineCell`], so the engine is initialized once for
//! the whole batch even when the first few documents start together.

use crate::convert::Converter;
use crate::output::ConversionOutcome;
use crate::pipeline::input::InputFile;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// `(input name, outcome)` per document.
pub type ConversionStream = Pin<Box<dyn Stream<Item = (String, ConversionOutcome)> + Send>>;

/// Convert `files` concurrently, yielding each outcome as it completes.
pub fn convert_stream(converter: Converter, files: Vec<InputFile>) -> ConversionStream {
    Box::pin(indexed_stream(converter, files).map(|(_, name, outcome)| (name, outcome)))
}

/// Like [`convert_stream`], but the item carries the input's position.
fn indexed_stream(
    converter: Converter,
    files: Vec<InputFile>,
) -> impl Stream<Item = (usize, String, ConversionOutcome)> + Send {
    let concurrency = converter.config().concurrency.max(1);
    info!(
        "Starting batch conversion of {} files ({} at a time)",
        files.len(),
        concurrency
    );

    stream::iter(files.into_iter().enumerate().map(move |(idx, file)| {
        let converter = converter.clone();
        async move {
            let outcome = converter.convert(&file).await;
            (idx, file.name().to_string(), outcome)
        }
    }))
    .buffer_unordered(concurrency)
}

/// Drain the batch into a vector ordered like `files`.
///
/// Inputs may share a name; results are matched by position, not by name.
pub async fn convert_all(converter: Converter, files: Vec<InputFile>) -> Vec<(String, ConversionOutcome)> {
    let mut done: Vec<(usize, String, ConversionOutcome)> =
        indexed_stream(converter, files).collect().await;
    done.sort_by_key(|(idx, _, _)| *idx);
    done.into_iter()
        .map(|(_, name, outcome)| (name, outcome))
        .collect()
}
