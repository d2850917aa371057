//! One-shot bootstrap of the document store from a text file.
//!
//! Only seeds an empty store. Once the store has documents (including ones
//! persisted by an earlier run) the file is not read again, so edits to it
//! are not picked up until the store file is cleared.

use ragbot_core::error::{RagbotError, Result};
use ragbot_core::traits::DocumentStore;
use ragbot_core::types::Document;
use std::path::Path;

/// What a call to [`load_documents`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The store was empty; this many documents were inserted.
    Loaded(usize),
    /// The store already held this many documents; nothing was read.
    AlreadyLoaded(usize),
}

/// Split file content into documents: one per non-blank trimmed line, ids `doc1..docN`.
pub fn parse_documents(content: &str) -> Vec<Document> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| Document::new(format!("doc{}", i + 1), line))
        .collect()
}

/// Seed `store` from `path` unless it already has documents.
pub async fn load_documents(store: &dyn DocumentStore, path: &Path) -> Result<LoadOutcome> {
    let existing = store.count().await?;
    if existing > 0 {
        tracing::info!("📚 Documents already loaded ({existing} in store)");
        return Ok(LoadOutcome::AlreadyLoaded(existing));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RagbotError::SourceFile {
            path: path.to_path_buf(),
            source,
        })?;

    let documents = parse_documents(&content);
    store.add(&documents).await?;

    tracing::info!(
        "📚 Loaded {} documents from {}",
        documents.len(),
        path.display()
    );
    Ok(LoadOutcome::Loaded(documents.len()))
}
