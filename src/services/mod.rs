use std::sync::Arc;

use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};
use tracing::error;

use crate::config::AppConfig;
use crate::db::{CreateRetryConfig, DbPool};
use crate::errors::ServiceError;

pub mod accounts;
pub mod images;
pub mod inventory;
pub mod order_items;
pub mod orders;
pub mod pricing;
pub mod provider_transports;
pub mod purchase_orders;
pub mod shipments;
pub mod substances;

/// One page of rows plus the total row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Runs `select` with 1-based `page` numbering.
pub(crate) async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page: u64,
    limit: u64,
) -> Result<Page<E::Model>, ServiceError>
where
    E: EntityTrait,
    E::Model: Sync,
{
    let paginator = select.paginate(db, limit);
    let total = paginator.num_items().await.map_err(|e| {
        error!(error = %e, "Failed to count rows");
        ServiceError::DatabaseError(e)
    })?;
    let items = paginator
        .fetch_page(page.saturating_sub(1))
        .await
        .map_err(|e| {
            error!(error = %e, page, limit, "Failed to fetch page");
            ServiceError::DatabaseError(e)
        })?;
    Ok(Page {
        items,
        total,
        page,
        limit,
    })
}

/// Every domain service, shared by the handlers.
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<accounts::AccountService>,
    pub substances: Arc<substances::SubstanceService>,
    pub transports: Arc<provider_transports::ProviderTransportService>,
    pub inventory: Arc<inventory::InventoryService>,
    pub orders: Arc<orders::OrderService>,
    pub order_items: Arc<order_items::OrderItemService>,
    pub purchase_orders: Arc<purchase_orders::PurchaseOrderService>,
    pub shipments: Arc<shipments::ShipmentService>,
    pub images: Arc<images::ImageStore>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, config: &AppConfig) -> Self {
        let retry = CreateRetryConfig {
            max_attempts: config.create_retry_max_attempts,
        };
        Self {
            accounts: Arc::new(accounts::AccountService::new(db.clone(), retry)),
            substances: Arc::new(substances::SubstanceService::new(db.clone(), retry)),
            transports: Arc::new(provider_transports::ProviderTransportService::new(
                db.clone(),
                retry,
            )),
            inventory: Arc::new(inventory::InventoryService::new(db.clone(), retry)),
            orders: Arc::new(orders::OrderService::new(db.clone(), retry)),
            order_items: Arc::new(order_items::OrderItemService::new(db.clone(), retry)),
            purchase_orders: Arc::new(purchase_orders::PurchaseOrderService::new(
                db.clone(),
                retry,
            )),
            shipments: Arc::new(shipments::ShipmentService::new(db, retry)),
            images: Arc::new(images::ImageStore::new(
                &config.upload_dir,
                config.max_upload_bytes,
            )),
        }
    }
}
