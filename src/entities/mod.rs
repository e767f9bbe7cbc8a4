// Account tables share one column layout.
pub mod customer;
pub mod dealer;
pub mod provider;

pub mod inventory;
pub mod order;
pub mod order_item;
pub mod provider_transport;
pub mod purchase_order;
pub mod shipment;
pub mod substance;
