mod file;
mod http;

pub use self::file::FileCatalogSource;
pub use self::http::HttpCatalogSource;

use async_trait::async_trait;
use log::info;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

use crate::models::product::{ Product, ProductId };

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Catalog file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Catalog JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Product>, CatalogError>;

    fn describe(&self) -> String;
}

/// Picks an HTTP source for `http(s)://` locations and a file source otherwise.
pub fn create_catalog_source(location: &str) -> Arc<dyn CatalogSource> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            Arc::new(HttpCatalogSource::new(url))
        }
        _ => Arc::new(FileCatalogSource::new(location)),
    }
}

/// Memoized product catalog. The first successful `load` is kept for the
/// lifetime of the cache; failed loads are not cached and may be retried.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    products: OnceCell<Arc<Vec<Product>>>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            products: OnceCell::new(),
        }
    }

    pub async fn load(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        let products = self.products
            .get_or_try_init(|| async {
                info!("Loading product catalog from {}", self.source.describe());
                let products = self.source.fetch().await?;
                info!("Catalog loaded: {} products", products.len());
                Ok::<_, CatalogError>(Arc::new(products))
            }).await?;
        Ok(Arc::clone(products))
    }

    pub fn is_loaded(&self) -> bool {
        self.products.initialized()
    }

    /// Products currently held by the cache; empty until the first `load`.
    pub fn products(&self) -> &[Product] {
        self.products
            .get()
            .map(|p| p.as_slice())
            .unwrap_or(&[])
    }

    pub fn find(&self, id: ProductId) -> Option<&Product> {
        self.products().iter().find(|p| p.id == id)
    }

    pub async fn by_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        let products = self.load().await?;
        Ok(
            products
                .iter()
                .filter(|p| p.category == category)
                .cloned()
                .collect()
        )
    }

    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let products = self.load().await?;
        let categories: BTreeSet<&str> = products
            .iter()
            .map(|p| p.category.as_str())
            .collect();
        Ok(categories.into_iter().map(String::from).collect())
    }
}
