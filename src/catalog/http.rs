use async_trait::async_trait;
use reqwest::Client as HttpClient;
use url::Url;

use super::{ CatalogError, CatalogSource };
use crate::models::product::{ Catalog, Product };

pub struct HttpCatalogSource {
    http: HttpClient,
    url: Url,
}

impl HttpCatalogSource {
    pub fn new(url: Url) -> Self {
        Self {
            http: HttpClient::new(),
            url,
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> Result<Vec<Product>, CatalogError> {
        let catalog = self.http
            .get(self.url.clone())
            .send().await?
            .error_for_status()?
            .json::<Catalog>().await?;
        Ok(catalog.products)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}
