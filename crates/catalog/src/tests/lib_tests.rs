use super::*;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::error::{ApiError, ErrorCode};
use storage::{MemorySlots, SlotProductStore, SlotStore, DEFAULT_PRODUCTS_KEY};

type MemoryController = CatalogController<SlotProductStore<MemorySlots>, SequentialIds>;

async fn setup() -> (MemoryController, MemorySlots) {
    let slots = MemorySlots::new();
    let mut controller = CatalogController::new(
        SlotProductStore::with_default_key(slots.clone()),
        SequentialIds::new(),
    );
    controller.initialize().await;
    (controller, slots)
}

async fn reopen(slots: &MemorySlots) -> MemoryController {
    let mut controller = CatalogController::new(
        SlotProductStore::with_default_key(slots.clone()),
        SequentialIds::starting_at(1_000),
    );
    controller.initialize().await;
    controller
}

fn mug() -> FormDraft {
    FormDraft::new("Mug", "9.99", "http://i/mug.png")
}

#[tokio::test]
async fn added_product_survives_fresh_initialize() {
    let (mut controller, slots) = setup().await;
    let created = controller.add(&mug()).await.expect("add");
    assert_eq!(created.name, "Mug");
    assert_eq!(created.price, 9.99);
    assert_eq!(created.image_url, "http://i/mug.png");

    let fresh = reopen(&slots).await;
    assert_eq!(fresh.products(), &[created]);
}

#[tokio::test]
async fn add_appends_in_insertion_order_with_distinct_ids() {
    let (mut controller, _) = setup().await;
    let a = controller
        .add(&FormDraft::new("A", "1", "http://a"))
        .await
        .expect("a");
    let b = controller
        .add(&FormDraft::new("B", "2", "http://b"))
        .await
        .expect("b");
    let c = controller
        .add(&FormDraft::new("C", "3", "http://c"))
        .await
        .expect("c");

    let ids: Vec<&ProductId> = controller.products().iter().map(|p| &p.id).collect();
    assert_eq!(ids, vec![&a.id, &b.id, &c.id]);
    assert_ne!(a.id, b.id);
    assert_ne!(b.id, c.id);
}

#[tokio::test]
async fn add_skips_generated_ids_already_present() {
    let slots = MemorySlots::new();
    slots
        .write_slot(
            DEFAULT_PRODUCTS_KEY,
            r#"[{"id":"1","name":"Old","price":1,"imageUrl":"http://old"}]"#,
        )
        .await
        .expect("seed");
    let mut controller = CatalogController::new(
        SlotProductStore::with_default_key(slots),
        SequentialIds::new(),
    );
    controller.initialize().await;

    let created = controller.add(&mug()).await.expect("add");
    assert_eq!(created.id, ProductId::new("2"));
    assert_eq!(controller.len(), 2);
}

#[tokio::test]
async fn empty_name_is_rejected_without_touching_state() {
    let (mut controller, slots) = setup().await;
    controller.add(&mug()).await.expect("seed");
    let persisted_before = slots.read_slot(DEFAULT_PRODUCTS_KEY).await.expect("read");

    let err = controller
        .add(&FormDraft::new("", "5", "http://x"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, CatalogError::Validation(_)));
    assert_eq!(controller.len(), 1);
    assert_eq!(
        slots.read_slot(DEFAULT_PRODUCTS_KEY).await.expect("read"),
        persisted_before
    );
}

#[tokio::test]
async fn remove_is_idempotent() {
    let (mut controller, slots) = setup().await;
    let a = controller.add(&mug()).await.expect("a");
    let b = controller
        .add(&FormDraft::new("Plate", "4", "http://i/plate.png"))
        .await
        .expect("b");

    let removed = controller.remove(&a.id).await.expect("remove");
    assert_eq!(removed, Some(a.clone()));
    let after_once = controller.products().to_vec();

    let removed_again = controller.remove(&a.id).await.expect("remove again");
    assert_eq!(removed_again, None);
    assert_eq!(controller.products(), after_once.as_slice());
    assert_eq!(reopen(&slots).await.products(), &[b]);
}

#[tokio::test]
async fn update_preserves_position_and_other_entries() {
    let (mut controller, _) = setup().await;
    let first = controller
        .add(&FormDraft::new("A", "1", "http://a"))
        .await
        .expect("a");
    let middle = controller
        .add(&FormDraft::new("B", "2", "http://b"))
        .await
        .expect("b");
    let last = controller
        .add(&FormDraft::new("C", "3", "http://c"))
        .await
        .expect("c");

    let updated = controller
        .update(&middle.id, &FormDraft::new("B2", "20", "http://b2"))
        .await
        .expect("update");
    assert_eq!(updated.id, middle.id);

    assert_eq!(
        controller.products(),
        &[
            first,
            Product {
                id: middle.id.clone(),
                name: "B2".into(),
                price: 20.0,
                image_url: "http://b2".into(),
            },
            last,
        ]
    );
}

#[tokio::test]
async fn update_of_missing_id_is_not_found() {
    let (mut controller, _) = setup().await;
    let created = controller.add(&mug()).await.expect("add");
    controller.remove(&created.id).await.expect("remove");

    let err = controller
        .update(&created.id, &mug())
        .await
        .expect_err("should fail");
    assert!(matches!(err, CatalogError::NotFound(id) if id == created.id));
    assert!(controller.is_empty());
}

#[tokio::test]
async fn update_validates_before_lookup() {
    let (mut controller, _) = setup().await;
    let err = controller
        .update(&ProductId::new("missing"), &FormDraft::new("Mug", "", "x"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, CatalogError::Validation(_)));
}

#[tokio::test]
async fn begin_edit_prefills_draft_from_product() {
    let (mut controller, _) = setup().await;
    let created = controller
        .add(&FormDraft::new("Mug", "12.50", "http://i/mug.png"))
        .await
        .expect("add");

    let draft = controller.begin_edit(&created.id).expect("draft");
    assert_eq!(draft, FormDraft::new("Mug", "12.5", "http://i/mug.png"));

    let err = controller
        .begin_edit(&ProductId::new("nope"))
        .expect_err("should fail");
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn cancel_edit_leaves_catalog_untouched() {
    let (mut controller, slots) = setup().await;
    let created = controller.add(&mug()).await.expect("add");
    let before = slots.read_slot(DEFAULT_PRODUCTS_KEY).await.expect("read");

    let mut draft = controller.begin_edit(&created.id).expect("draft");
    draft.name = "Changed".into();
    controller.cancel_edit(draft);

    assert_eq!(controller.products(), &[created]);
    assert_eq!(slots.read_slot(DEFAULT_PRODUCTS_KEY).await.expect("read"), before);
}

#[tokio::test]
async fn mug_lifecycle() {
    let (mut controller, _) = setup().await;
    assert!(controller.is_empty());

    let created = controller.add(&mug()).await.expect("add");
    assert_eq!(controller.len(), 1);
    assert_eq!(controller.products()[0].price, 9.99);

    let updated = controller
        .update(
            &created.id,
            &FormDraft::new("Mug", "12.50", "http://i/mug.png"),
        )
        .await
        .expect("update");
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.price, 12.5);

    controller.remove(&created.id).await.expect("remove");
    assert!(controller.is_empty());
}

#[tokio::test]
async fn negative_price_policy_is_configurable() {
    let (mut controller, _) = setup().await;
    let err = controller
        .add(&FormDraft::new("Refund", "-5", "http://r"))
        .await
        .expect_err("rejected by default");
    assert!(matches!(err, CatalogError::Validation(_)));

    let mut permissive = controller.with_price_policy(PricePolicy::AllowNegative);
    let created = permissive
        .add(&FormDraft::new("Refund", "-5", "http://r"))
        .await
        .expect("accepted");
    assert_eq!(created.price, -5.0);
}

#[derive(Clone)]
struct FlakyStore {
    inner: SlotProductStore<MemorySlots>,
    fail_saves: Arc<AtomicBool>,
}

#[async_trait]
impl ProductStore for FlakyStore {
    async fn load(&self) -> Vec<Product> {
        self.inner.load().await
    }

    async fn save(&self, products: &[Product]) -> anyhow::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.save(products).await
    }

    async fn raw(&self) -> anyhow::Result<Option<String>> {
        self.inner.raw().await
    }
}

#[tokio::test]
async fn failed_save_leaves_memory_unchanged() {
    let slots = MemorySlots::new();
    let fail_saves = Arc::new(AtomicBool::new(false));
    let mut controller = CatalogController::new(
        FlakyStore {
            inner: SlotProductStore::with_default_key(slots.clone()),
            fail_saves: fail_saves.clone(),
        },
        SequentialIds::new(),
    );
    controller.initialize().await;
    let created = controller.add(&mug()).await.expect("add");

    fail_saves.store(true, Ordering::SeqCst);
    let err = controller
        .add(&FormDraft::new("Plate", "4", "http://p"))
        .await
        .expect_err("save fails");
    assert!(matches!(err, CatalogError::Storage(_)));
    controller
        .update(&created.id, &FormDraft::new("Cup", "1", "http://c"))
        .await
        .expect_err("save fails");
    controller
        .remove(&created.id)
        .await
        .expect_err("save fails");

    assert_eq!(controller.products(), &[created.clone()]);
    assert_eq!(reopen(&slots).await.products(), &[created]);

    let api: ApiError = err.into();
    assert_eq!(api.code, ErrorCode::Internal);
    assert!(api.message.contains("disk full"));
}

#[tokio::test]
async fn errors_map_to_api_codes() {
    let (controller, _) = setup().await;
    let not_found: ApiError = controller
        .begin_edit(&ProductId::new("x"))
        .expect_err("missing")
        .into();
    assert_eq!(not_found.code, ErrorCode::NotFound);
    assert_eq!(not_found.message, "product x not found");

    let invalid: ApiError = CatalogError::from(
        validate_draft(&FormDraft::default(), PricePolicy::default()).expect_err("empty"),
    )
    .into();
    assert_eq!(invalid.code, ErrorCode::Validation);
    assert_eq!(invalid.message, "Please fill in all fields");
}

#[tokio::test]
async fn persisted_shows_stored_text_even_when_corrupt() {
    let (mut controller, slots) = setup().await;
    assert_eq!(controller.persisted().await.expect("raw"), None);

    let created = controller.add(&mug()).await.expect("add");
    let raw = controller.persisted().await.expect("raw").expect("saved");
    assert_eq!(
        raw,
        format!(
            r#"[{{"id":"{}","name":"Mug","price":9.99,"imageUrl":"http://i/mug.png"}}]"#,
            created.id
        )
    );

    slots
        .write_slot(DEFAULT_PRODUCTS_KEY, "not json")
        .await
        .expect("corrupt");
    let fresh = reopen(&slots).await;
    assert!(fresh.is_empty());
    assert_eq!(
        fresh.persisted().await.expect("raw"),
        Some("not json".to_string())
    );
}
