use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::Product;
use tracing::{debug, warn};

use crate::SlotStore;

pub const DEFAULT_PRODUCTS_KEY: &str = "myshop_products";

/// Persistence seam for the catalog. `load` never fails: anything it cannot
/// make sense of is logged and treated as an empty catalog.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn load(&self) -> Vec<Product>;
    async fn save(&self, products: &[Product]) -> Result<()>;
    /// The persisted content exactly as stored, `None` if nothing was saved.
    async fn raw(&self) -> Result<Option<String>>;
}

#[async_trait]
impl<T: ProductStore + ?Sized> ProductStore for Box<T> {
    async fn load(&self) -> Vec<Product> {
        (**self).load().await
    }

    async fn save(&self, products: &[Product]) -> Result<()> {
        (**self).save(products).await
    }

    async fn raw(&self) -> Result<Option<String>> {
        (**self).raw().await
    }
}

/// Stores the whole catalog as one JSON array under a single slot key.
#[derive(Clone)]
pub struct SlotProductStore<S> {
    slots: S,
    key: String,
}

impl<S: SlotStore> SlotProductStore<S> {
    pub fn new(slots: S, key: impl Into<String>) -> Self {
        Self {
            slots,
            key: key.into(),
        }
    }

    pub fn with_default_key(slots: S) -> Self {
        Self::new(slots, DEFAULT_PRODUCTS_KEY)
    }

}

#[async_trait]
impl<S: SlotStore> ProductStore for SlotProductStore<S> {
    async fn load(&self) -> Vec<Product> {
        let raw = match self.slots.read_slot(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "product slot is empty");
                return Vec::new();
            }
            Err(err) => {
                warn!(key = %self.key, error = %format!("{err:#}"), "failed to read product slot, starting empty");
                return Vec::new();
            }
        };

        match decode_products(&raw) {
            Ok(products) => {
                debug!(key = %self.key, count = products.len(), "loaded products");
                unique_by_id(products, &self.key)
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "corrupt product slot, starting empty");
                Vec::new()
            }
        }
    }

    async fn save(&self, products: &[Product]) -> Result<()> {
        let encoded = serde_json::to_string(products).context("failed to encode products")?;
        self.slots.write_slot(&self.key, &encoded).await
    }

    async fn raw(&self) -> Result<Option<String>> {
        self.slots.read_slot(&self.key).await
    }
}

/// Decodes a persisted product array. Anything but an array of
/// `{id, name, price, imageUrl}` objects is an error.
fn decode_products(raw: &str) -> serde_json::Result<Vec<Product>> {
    serde_json::from_str(raw)
}

fn unique_by_id(products: Vec<Product>, key: &str) -> Vec<Product> {
    let total = products.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<Product> = products
        .into_iter()
        .filter(|product| seen.insert(product.id.clone()))
        .collect();
    if unique.len() != total {
        warn!(
            key,
            dropped = total - unique.len(),
            "product slot repeats ids, keeping first occurrence"
        );
    }
    unique
}
