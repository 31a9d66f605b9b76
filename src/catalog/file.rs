use async_trait::async_trait;
use std::path::PathBuf;

use super::{ CatalogError, CatalogSource };
use crate::models::product::{ Catalog, Product };

pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch(&self) -> Result<Vec<Product>, CatalogError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let catalog: Catalog = serde_json::from_str(&text)?;
        Ok(catalog.products)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
