use shared::domain::{FormDraft, Product, ProductId};
use storage::ProductStore;
use tracing::{debug, info};

mod error;
mod ids;
mod validation;

pub use error::CatalogError;
pub use ids::{ClockIds, IdGenerator, SequentialIds, UuidIds};
pub use validation::{
    validate_draft, DraftField, FieldIssue, FieldProblem, PricePolicy, ValidFields,
    ValidationError,
};

/// Owns the in-memory catalog and mirrors every mutation to the store.
///
/// Mutations persist the complete next list first and only then swap it in, so
/// a failed save leaves the in-memory catalog exactly as it was.
pub struct CatalogController<P, G> {
    store: P,
    ids: G,
    policy: PricePolicy,
    products: Vec<Product>,
}

impl<P: ProductStore, G: IdGenerator> CatalogController<P, G> {
    pub fn new(store: P, ids: G) -> Self {
        Self {
            store,
            ids,
            policy: PricePolicy::default(),
            products: Vec::new(),
        }
    }

    pub fn with_price_policy(mut self, policy: PricePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn initialize(&mut self) {
        self.products = self.store.load().await;
        debug!(count = self.products.len(), "catalog initialized");
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// The catalog exactly as it sits in the store, which can differ from
    /// `products()` when the stored content was corrupt or repeated ids.
    pub async fn persisted(&self) -> Result<Option<String>, CatalogError> {
        Ok(self.store.raw().await?)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub async fn add(&mut self, draft: &FormDraft) -> Result<Product, CatalogError> {
        let fields = validate_draft(draft, self.policy)?;
        let product = Product {
            id: self.fresh_id(),
            name: fields.name,
            price: fields.price,
            image_url: fields.image_url,
        };

        let mut next = self.products.clone();
        next.push(product.clone());
        self.commit(next).await?;

        info!(product_id = %product.id, price = product.price, "product added");
        Ok(product)
    }

    /// Removing an id that is not present is a no-op; the list is persisted
    /// either way.
    pub async fn remove(&mut self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let mut next = self.products.clone();
        let index = next.iter().position(|p| &p.id == id);
        let removed = index.map(|index| next.remove(index));
        self.commit(next).await?;

        match &removed {
            Some(_) => info!(product_id = %id, "product removed"),
            None => debug!(product_id = %id, "remove of unknown product ignored"),
        }
        Ok(removed)
    }

    pub fn begin_edit(&self, id: &ProductId) -> Result<FormDraft, CatalogError> {
        self.get(id)
            .map(FormDraft::from_product)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    /// Replaces name, price and image URL of the matching entry in place. The
    /// id and the position in the list never change.
    pub async fn update(
        &mut self,
        id: &ProductId,
        draft: &FormDraft,
    ) -> Result<Product, CatalogError> {
        let fields = validate_draft(draft, self.policy)?;
        let index = self
            .products
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        let mut next = self.products.clone();
        let entry = &mut next[index];
        entry.name = fields.name;
        entry.price = fields.price;
        entry.image_url = fields.image_url;
        let updated = entry.clone();
        self.commit(next).await?;

        info!(product_id = %id, price = updated.price, "product updated");
        Ok(updated)
    }

    pub fn cancel_edit(&self, draft: FormDraft) {
        debug!(name = %draft.name, "edit draft discarded");
    }

    fn fresh_id(&mut self) -> ProductId {
        loop {
            let id = self.ids.next_id();
            if self.get(&id).is_none() {
                return id;
            }
            debug!(product_id = %id, "generated id already in catalog, retrying");
        }
    }

    async fn commit(&mut self, next: Vec<Product>) -> Result<(), CatalogError> {
        self.store.save(&next).await?;
        self.products = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
