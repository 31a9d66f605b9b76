use log::{ debug, error, info, warn };
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

use crate::catalog::CatalogCache;
use crate::models::product::{ Product, ProductId };
use crate::storage::{ decode_selection_record, encode_selection_record, KeyValueStorage };

pub const DEFAULT_STORAGE_KEY: &str = "loreal_selected_product_ids";

/// The user's working set of products, kept in selection order and mirrored
/// to durable storage after each mutation.
///
/// Every mutation bumps a revision published on a `watch` channel; the UI
/// adapters subscribe to it to know when to re-render.
pub struct SelectionStore {
    catalog: Arc<CatalogCache>,
    storage: Arc<dyn KeyValueStorage>,
    storage_key: String,
    items: Vec<Product>,
    revision: watch::Sender<u64>,
}

impl SelectionStore {
    pub fn new(
        catalog: Arc<CatalogCache>,
        storage: Arc<dyn KeyValueStorage>,
        storage_key: impl Into<String>
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            catalog,
            storage,
            storage_key: storage_key.into(),
            items: Vec::new(),
            revision,
        }
    }

    pub fn items(&self) -> &[Product] {
        &self.items
    }

    pub fn ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.items.iter().any(|p| p.id == id)
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Selects `id` if it is not selected, deselects it otherwise. Ids that
    /// are not in the catalog are ignored. Returns whether `id` is selected
    /// afterwards.
    pub async fn toggle(&mut self, id: ProductId) -> bool {
        if let Some(idx) = self.items.iter().position(|p| p.id == id) {
            self.items.remove(idx);
            debug!("Deselected product {}", id);
        } else {
            let Some(product) = self.catalog.find(id).cloned() else {
                warn!("Ignoring toggle for product {} which is not in the catalog", id);
                return false;
            };
            self.items.push(product);
            debug!("Selected product {}", id);
        }
        self.after_mutation().await;
        self.contains(id)
    }

    pub async fn remove(&mut self, id: ProductId) -> bool {
        let Some(idx) = self.items.iter().position(|p| p.id == id) else {
            return false;
        };
        self.items.remove(idx);
        self.after_mutation().await;
        true
    }

    pub async fn clear(&mut self) {
        self.items.clear();
        self.after_mutation().await;
    }

    /// Replaces the selection with the persisted record, keeping only ids the
    /// catalog still knows about, in the record's order. Returns the number
    /// of restored products.
    pub async fn restore(&mut self) -> usize {
        let raw = match self.storage.get(&self.storage_key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed loading saved selections: {}", e);
                None
            }
        };
        let ids = decode_selection_record(raw.as_deref());

        let mut seen = HashSet::new();
        let mut restored = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            match self.catalog.find(id) {
                Some(product) => restored.push(product.clone()),
                None => warn!("Dropping saved product {} which is no longer in the catalog", id),
            }
        }

        info!("Restored {} selected products", restored.len());
        self.items = restored;
        self.notify();
        self.items.len()
    }

    /// Writes the selected ids to storage. Failures are logged and swallowed;
    /// the in-memory selection stays authoritative.
    pub async fn persist(&self) {
        let record = encode_selection_record(&self.ids());
        if let Err(e) = self.storage.set(&self.storage_key, &record).await {
            error!("Failed saving selections: {}", e);
        }
    }

    async fn after_mutation(&self) {
        self.persist().await;
        self.notify();
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| {
            *rev += 1;
        });
    }
}
