use serde::{ Serialize, Deserialize };

pub type ProductId = i64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
}

/// Shape of the catalog document: `{ "products": [...] }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<Product>,
}

/// Reduced product record embedded as JSON in routine requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
        }
    }
}
