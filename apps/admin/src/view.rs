//! Session state of the admin screen: the new-product form, the single row
//! being edited, and the notices produced by each user intent.

use catalog::{CatalogController, CatalogError, IdGenerator};
use shared::{
    domain::{FormDraft, Product, ProductId},
    error::ApiError,
    protocol::Notice,
};
use storage::ProductStore;

pub struct AdminView<P, G> {
    controller: CatalogController<P, G>,
    new_draft: FormDraft,
    edit_draft: FormDraft,
    editing_id: Option<ProductId>,
}

impl<P: ProductStore, G: IdGenerator> AdminView<P, G> {
    pub fn new(controller: CatalogController<P, G>) -> Self {
        Self {
            controller,
            new_draft: FormDraft::default(),
            edit_draft: FormDraft::default(),
            editing_id: None,
        }
    }

    pub async fn activate(&mut self) {
        self.controller.initialize().await;
    }

    pub fn controller(&self) -> &CatalogController<P, G> {
        &self.controller
    }

    #[cfg(test)]
    pub fn editing_id(&self) -> Option<&ProductId> {
        self.editing_id.as_ref()
    }

    pub fn new_draft_mut(&mut self) -> &mut FormDraft {
        &mut self.new_draft
    }

    /// The draft of the row being edited, if any.
    pub fn edit_draft_mut(&mut self) -> Option<&mut FormDraft> {
        self.editing_id.as_ref()?;
        Some(&mut self.edit_draft)
    }

    pub async fn submit_new(&mut self) -> Notice {
        match self.controller.add(&self.new_draft).await {
            Ok(_) => {
                self.new_draft.clear();
                Notice::success("Product added successfully")
            }
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// Starts editing `id`. Any edit already in progress on another row is
    /// dropped.
    pub fn begin_edit(&mut self, id: &ProductId) -> Result<(), Notice> {
        let draft = self
            .controller
            .begin_edit(id)
            .map_err(|err| Notice::from(ApiError::from(err)))?;
        self.cancel_edit();
        self.editing_id = Some(id.clone());
        self.edit_draft = draft;
        Ok(())
    }

    pub async fn save_edit(&mut self) -> Notice {
        let Some(id) = self.editing_id.clone() else {
            return Notice::error("No product is being edited");
        };
        match self.controller.update(&id, &self.edit_draft).await {
            Ok(_) => {
                self.editing_id = None;
                self.edit_draft.clear();
                Notice::success("Product updated successfully")
            }
            Err(err) => {
                // the row is gone, there is nothing left to edit
                if matches!(err, CatalogError::NotFound(_)) {
                    self.editing_id = None;
                    self.edit_draft.clear();
                }
                ApiError::from(err).into()
            }
        }
    }

    pub fn cancel_edit(&mut self) {
        if self.editing_id.take().is_some() {
            let draft = std::mem::take(&mut self.edit_draft);
            self.controller.cancel_edit(draft);
        }
    }

    pub async fn delete(&mut self, id: &ProductId) -> Notice {
        match self.controller.remove(id).await {
            Ok(_) => {
                if self.editing_id.as_ref() == Some(id) {
                    self.cancel_edit();
                }
                Notice::success("Product deleted successfully")
            }
            Err(err) => ApiError::from(err).into(),
        }
    }

    /// The persisted catalog text, byte for byte. `Ok(None)` when nothing has
    /// been saved yet.
    pub async fn export(&self) -> Result<Option<String>, Notice> {
        self.controller
            .persisted()
            .await
            .map_err(|err| Notice::from(ApiError::from(err)))
    }

    pub fn render(&self) -> String {
        let products = self.controller.products();
        let mut out = format!("Product List ({})\n", products.len());
        if products.is_empty() {
            out.push_str("No products yet. Add your first product!\n");
            return out;
        }
        for product in products {
            if self.editing_id.as_ref() == Some(&product.id) {
                let draft = &self.edit_draft;
                out.push_str(&format!(
                    "* {}  [editing] name={:?} price={:?} image={:?}\n",
                    product.id, draft.name, draft.price, draft.image_url
                ));
            } else {
                out.push_str(&format!("  {}\n", render_row(product)));
            }
        }
        out
    }
}

pub fn format_price(price: f64) -> String {
    format!("${price:.2}")
}

fn render_row(product: &Product) -> String {
    format!(
        "{}  {}  {}  {}",
        product.id,
        product.name,
        format_price(product.price),
        product.image_url
    )
}
