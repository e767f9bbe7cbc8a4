//! Ownership and role authorization.
//!
//! Every handler decision goes through [`gate`], which consults one declarative
//! table mapping `(Resource, Action)` to the actor kinds allowed and, per kind,
//! which column of the row must equal the actor's id.

use super::{Actor, ActorKind};
use crate::entities::{inventory, order, provider_transport, purchase_order, substance};
use crate::errors::ServiceError;
use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::debug;

/// The low-level predicate: kind membership, then strict id equality.
pub fn authorize(actor: &Actor, allowed: Option<&[ActorKind]>, owner_id: Option<i32>) -> bool {
    if let Some(kinds) = allowed {
        if !kinds.contains(&actor.kind) {
            return false;
        }
    }
    match owner_id {
        Some(owner) => actor.id == owner,
        None => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Customer,
    Dealer,
    Provider,
    Substance,
    ProviderTransport,
    Inventory,
    Order,
    OrderItem,
    PurchaseOrder,
    Shipment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
    UpdateStatus,
    UploadImage,
}

/// Which id on a row identifies its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerField {
    /// The row is the actor's own account.
    SelfId,
    CustomerId,
    DealerId,
    ProviderId,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub kind: ActorKind,
    pub owner: Option<OwnerField>,
}

const fn open(kind: ActorKind) -> Rule {
    Rule { kind, owner: None }
}

const fn owned(kind: ActorKind, field: OwnerField) -> Rule {
    Rule {
        kind,
        owner: Some(field),
    }
}

/// Rows that can answer "who owns you?" for a given owner field.
///
/// Order items and shipments are gated through their parent order, so they
/// have no impl of their own.
pub trait Owned {
    fn owner(&self, field: OwnerField) -> Option<i32>;
}

impl Owned for substance::Model {
    fn owner(&self, field: OwnerField) -> Option<i32> {
        matches!(field, OwnerField::ProviderId).then_some(self.provider_id)
    }
}

impl Owned for provider_transport::Model {
    fn owner(&self, field: OwnerField) -> Option<i32> {
        matches!(field, OwnerField::ProviderId).then_some(self.provider_id)
    }
}

impl Owned for inventory::Model {
    fn owner(&self, field: OwnerField) -> Option<i32> {
        matches!(field, OwnerField::DealerId).then_some(self.dealer_id)
    }
}

impl Owned for order::Model {
    fn owner(&self, field: OwnerField) -> Option<i32> {
        match field {
            OwnerField::CustomerId => Some(self.customer_id),
            OwnerField::DealerId => Some(self.dealer_id),
            _ => None,
        }
    }
}

impl Owned for purchase_order::Model {
    fn owner(&self, field: OwnerField) -> Option<i32> {
        match field {
            OwnerField::DealerId => Some(self.dealer_id),
            OwnerField::ProviderId => Some(self.provider_id),
            _ => None,
        }
    }
}

lazy_static! {
    pub static ref POLICIES: HashMap<(Resource, Action), Vec<Rule>> = {
        use ActorKind::{Customer as C, Dealer as D, Provider as P};
        use OwnerField::*;

        let any = vec![open(C), open(D), open(P)];
        let mut table = HashMap::new();

        for action in [Action::Read, Action::Update, Action::Delete, Action::UploadImage] {
            table.insert((Resource::Customer, action), vec![owned(C, SelfId)]);
        }

        for (resource, kind) in [(Resource::Dealer, D), (Resource::Provider, P)] {
            table.insert((resource, Action::List), any.clone());
            table.insert((resource, Action::Read), any.clone());
            for action in [Action::Update, Action::Delete, Action::UploadImage] {
                table.insert((resource, action), vec![owned(kind, SelfId)]);
            }
        }

        table.insert((Resource::Substance, Action::List), any.clone());
        table.insert((Resource::Substance, Action::Read), any.clone());
        table.insert((Resource::Substance, Action::Create), vec![open(P)]);
        for action in [Action::Update, Action::Delete, Action::UploadImage] {
            table.insert((Resource::Substance, action), vec![owned(P, ProviderId)]);
        }

        table.insert((Resource::ProviderTransport, Action::List), vec![open(D), open(P)]);
        table.insert((Resource::ProviderTransport, Action::Read), vec![open(D), open(P)]);
        table.insert((Resource::ProviderTransport, Action::Create), vec![open(P)]);
        for action in [Action::Update, Action::Delete] {
            table.insert((Resource::ProviderTransport, action), vec![owned(P, ProviderId)]);
        }

        table.insert((Resource::Inventory, Action::List), any.clone());
        table.insert((Resource::Inventory, Action::Read), any);
        table.insert((Resource::Inventory, Action::Create), vec![open(D)]);
        for action in [Action::Update, Action::Delete] {
            table.insert((Resource::Inventory, action), vec![owned(D, DealerId)]);
        }

        let order_parties = vec![owned(C, CustomerId), owned(D, DealerId)];
        table.insert((Resource::Order, Action::List), vec![open(C), open(D)]);
        table.insert((Resource::Order, Action::Read), order_parties.clone());
        table.insert((Resource::Order, Action::Create), vec![open(C)]);
        table.insert((Resource::Order, Action::Update), vec![owned(C, CustomerId)]);
        table.insert((Resource::Order, Action::Delete), vec![owned(C, CustomerId)]);
        table.insert((Resource::Order, Action::UpdateStatus), vec![owned(D, DealerId)]);

        // Items and shipments are checked against their parent order.
        table.insert((Resource::OrderItem, Action::Read), order_parties.clone());
        for action in [Action::Create, Action::Update, Action::Delete] {
            table.insert((Resource::OrderItem, action), vec![owned(C, CustomerId)]);
        }
        table.insert((Resource::Shipment, Action::Read), order_parties);
        for action in [Action::Create, Action::Update, Action::Delete] {
            table.insert((Resource::Shipment, action), vec![owned(D, DealerId)]);
        }

        table.insert((Resource::PurchaseOrder, Action::List), vec![open(D), open(P)]);
        table.insert(
            (Resource::PurchaseOrder, Action::Read),
            vec![owned(D, DealerId), owned(P, ProviderId)],
        );
        table.insert((Resource::PurchaseOrder, Action::Create), vec![open(D)]);
        table.insert((Resource::PurchaseOrder, Action::Update), vec![owned(D, DealerId)]);
        table.insert((Resource::PurchaseOrder, Action::Delete), vec![owned(D, DealerId)]);
        table.insert(
            (Resource::PurchaseOrder, Action::UpdateStatus),
            vec![owned(P, ProviderId)],
        );

        table
    };
}

/// Evaluates the policy table. A rule with an owner field matches only when
/// a row is supplied and its owner equals the actor.
pub fn permits(
    actor: &Actor,
    resource: Resource,
    action: Action,
    row: Option<&dyn Owned>,
) -> bool {
    let Some(rules) = POLICIES.get(&(resource, action)) else {
        return false;
    };
    rules.iter().any(|rule| match rule.owner {
        None => authorize(actor, Some(std::slice::from_ref(&rule.kind)), None),
        Some(field) => match row.and_then(|r| r.owner(field)) {
            Some(owner_id) => {
                authorize(actor, Some(std::slice::from_ref(&rule.kind)), Some(owner_id))
            }
            None => false,
        },
    })
}

/// [`permits`], as a `Forbidden` error for handlers.
pub fn gate(
    actor: &Actor,
    resource: Resource,
    action: Action,
    row: Option<&dyn Owned>,
) -> Result<(), ServiceError> {
    if permits(actor, resource, action, row) {
        Ok(())
    } else {
        debug!(actor_id = actor.id, kind = %actor.kind, ?resource, ?action, "access denied");
        Err(ServiceError::Forbidden(format!(
            "{} cannot perform {:?} on {:?}",
            actor.kind, action, resource
        )))
    }
}
