//! Read-only access for chart renderers and notifiers.

use benchledger_state::{Document, DocumentFormat, Entry, HistoryStore};

use crate::domain::Result;

/// Read-only view over a history store. Never writes; every call is a plain
/// snapshot read of the latest committed document.
pub struct ExportView<S> {
    store: S,
}

impl<S: HistoryStore> ExportView<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Latest committed document.
    pub async fn get(&self) -> Result<Document> {
        Ok(self.store.read().await?.document)
    }

    /// Full history of one tool key (empty if unknown).
    pub async fn tool(&self, tool: &str) -> Result<Vec<Entry>> {
        Ok(self.get().await?.tool_history(tool).to_vec())
    }

    /// The last `max_items` entries of one tool key, oldest first.
    pub async fn recent(&self, tool: &str, max_items: usize) -> Result<Vec<Entry>> {
        let history = self.tool(tool).await?;
        let skip = history.len().saturating_sub(max_items);
        Ok(history.into_iter().skip(skip).collect())
    }

    /// Document with every tool history cut to its last `max_items` entries,
    /// for chart pages that only plot a recent window. The store is not
    /// affected.
    pub async fn trimmed(&self, max_items: usize) -> Result<Document> {
        let mut doc = self.get().await?;
        for history in doc.entries.values_mut() {
            let skip = history.len().saturating_sub(max_items);
            history.drain(..skip);
        }
        Ok(doc)
    }

    /// Encode the latest document for a chart page or archive.
    pub async fn render(&self, format: DocumentFormat) -> Result<Vec<u8>> {
        let doc = self.get().await?;
        Ok(format.encode(&doc)?)
    }
}
