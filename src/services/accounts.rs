use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use super::{fetch_page, Page};
use crate::auth::{hash_password, verify_password, ActorKind, Owned, OwnerField};
use crate::db::{insert_with_retry, CreateRetryConfig, DbPool};
use crate::entities::{customer, dealer, provider};
use crate::errors::ServiceError;

/// Public view of a customer, dealer or provider account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: i32,
    pub kind: ActorKind,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub organization: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Account {
    fn owner(&self, field: OwnerField) -> Option<i32> {
        matches!(field, OwnerField::SelfId).then_some(self.id)
    }
}

macro_rules! account_from_model {
    ($module:ident, $kind:expr) => {
        impl From<$module::Model> for Account {
            fn from(m: $module::Model) -> Self {
                Account {
                    id: m.id,
                    kind: $kind,
                    username: m.username,
                    email: m.email,
                    full_name: m.full_name,
                    phone: m.phone,
                    address: m.address,
                    organization: m.organization,
                    created_at: m.created_at,
                    updated_at: m.updated_at,
                }
            }
        }
    };
}

account_from_model!(customer, ActorKind::Customer);
account_from_model!(dealer, ActorKind::Dealer);
account_from_model!(provider, ActorKind::Provider);

/// Expands `$body` once per account table, with `$table` naming its entity module.
macro_rules! per_account_table {
    ($kind:expr, $table:ident => $body:expr) => {
        match $kind {
            ActorKind::Customer => {
                use crate::entities::customer as $table;
                $body
            }
            ActorKind::Dealer => {
                use crate::entities::dealer as $table;
                $body
            }
            ActorKind::Provider => {
                use crate::entities::provider as $table;
                $body
            }
        }
    };
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterAccount {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateAccount {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub organization: Option<String>,
}

/// Registration, login and profile management for all three account tables.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DbPool>,
    retry: CreateRetryConfig,
}

impl AccountService {
    pub fn new(db: Arc<DbPool>, retry: CreateRetryConfig) -> Self {
        Self { db, retry }
    }

    /// Creates an account. A taken username or email is a `DuplicateField`.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(
        &self,
        kind: ActorKind,
        request: RegisterAccount,
    ) -> Result<Account, ServiceError> {
        request.validate()?;
        let password_hash = hash_password(&request.password)?;
        let db = &*self.db;

        let account: Account = per_account_table!(kind, table => {
            let model = table::ActiveModel {
                username: Set(request.username.clone()),
                email: Set(request.email.clone()),
                password_hash: Set(password_hash),
                full_name: Set(request.full_name.clone()),
                phone: Set(request.phone.clone()),
                address: Set(request.address.clone()),
                organization: Set(request.organization.clone()),
                ..Default::default()
            };
            insert_with_retry(db, model, self.retry).await?.into()
        });

        info!(account_id = account.id, %kind, "Account registered");
        Ok(account)
    }

    /// Looks an account up by username or email and checks its password.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        kind: ActorKind,
        login: &str,
        password: &str,
    ) -> Result<Account, ServiceError> {
        let db = &*self.db;
        let found: Option<(Account, String)> = per_account_table!(kind, table => {
            table::Entity::find()
                .filter(
                    Condition::any()
                        .add(table::Column::Username.eq(login))
                        .add(table::Column::Email.eq(login)),
                )
                .one(db)
                .await?
                .map(|m| {
                    let hash = m.password_hash.clone();
                    (Account::from(m), hash)
                })
        });

        match found {
            Some((account, hash)) if verify_password(password, &hash) => {
                info!(account_id = account.id, %kind, "Login succeeded");
                Ok(account)
            }
            _ => {
                warn!(%kind, "Login failed");
                Err(ServiceError::AuthError("Invalid credentials".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, kind: ActorKind, id: i32) -> Result<Option<Account>, ServiceError> {
        let db = &*self.db;
        let account = per_account_table!(kind, table => {
            table::Entity::find_by_id(id).one(db).await?.map(Account::from)
        });
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        kind: ActorKind,
        page: u64,
        limit: u64,
    ) -> Result<Page<Account>, ServiceError> {
        let db = &*self.db;
        let page = per_account_table!(kind, table => {
            let select = table::Entity::find().order_by_asc(table::Column::Id);
            fetch_page(db, select, page, limit).await?.map(Account::from)
        });
        Ok(page)
    }

    /// Applies the supplied fields; a new password is re-hashed.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        kind: ActorKind,
        id: i32,
        request: UpdateAccount,
    ) -> Result<Account, ServiceError> {
        request.validate()?;
        let password_hash = request.password.as_deref().map(hash_password).transpose()?;
        let db = &*self.db;

        let account = per_account_table!(kind, table => {
            let existing = table::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found(kind_label(kind), id))?;
            let mut model = existing.into_active_model();
            if let Some(email) = request.email.clone() {
                model.email = Set(email);
            }
            if let Some(hash) = password_hash {
                model.password_hash = Set(hash);
            }
            if request.full_name.is_some() {
                model.full_name = Set(request.full_name.clone());
            }
            if request.phone.is_some() {
                model.phone = Set(request.phone.clone());
            }
            if request.address.is_some() {
                model.address = Set(request.address.clone());
            }
            if request.organization.is_some() {
                model.organization = Set(request.organization.clone());
            }
            let table_name = table_name(kind);
            model
                .update(db)
                .await
                .map_err(|e| ServiceError::from_write(e, table_name))?
                .into()
        });

        info!(account_id = id, %kind, "Account updated");
        Ok(account)
    }

    /// Accounts still referenced by orders or catalog rows cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: ActorKind, id: i32) -> Result<(), ServiceError> {
        let db = &*self.db;
        let rows = per_account_table!(kind, table => {
            table::Entity::delete_by_id(id)
                .exec(db)
                .await
                .map_err(|e| ServiceError::from_write(e, table_name(kind)))?
                .rows_affected
        });
        if rows == 0 {
            return Err(ServiceError::not_found(kind_label(kind), id));
        }
        info!(account_id = id, %kind, "Account deleted");
        Ok(())
    }
}

fn kind_label(kind: ActorKind) -> &'static str {
    match kind {
        ActorKind::Customer => "Customer",
        ActorKind::Dealer => "Dealer",
        ActorKind::Provider => "Provider",
    }
}

fn table_name(kind: ActorKind) -> &'static str {
    match kind {
        ActorKind::Customer => "customers",
        ActorKind::Dealer => "dealers",
        ActorKind::Provider => "providers",
    }
}
