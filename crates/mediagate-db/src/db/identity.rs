use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mediagate_core::models::{Profile, Transaction, Withdrawal};
use mediagate_core::AppError;
use tokio::sync::RwLock;

/// Trait for the identity/document store
///
/// Profiles, sales and withdrawals are keyed by the identity carried in the
/// caller's token. Sign-in records are the only writes the gateway performs.
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError>;

    /// Sales where the identity is buyer or seller, newest first.
    async fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, AppError>;

    async fn list_withdrawals(&self, user_id: &str) -> Result<Vec<Withdrawal>, AppError>;

    /// Record a successful sign-in for `user_id`.
    async fn record_sign_in(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError>;

    async fn last_sign_in(&self, user_id: &str) -> Result<Option<DateTime<Utc>>, AppError>;
}

pub fn create_identity_store() -> Arc<dyn IdentityStore> {
    Arc::new(InMemoryIdentityStore::new())
}

#[derive(Default)]
struct IdentityData {
    profiles: HashMap<String, Profile>,
    transactions: Vec<Transaction>,
    withdrawals: Vec<Withdrawal>,
    sign_ins: HashMap<String, DateTime<Utc>>,
}

/// Process-local identity store for development and tests.
#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    data: Arc<RwLock<IdentityData>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_profile(&self, profile: Profile) {
        self.data
            .write()
            .await
            .profiles
            .insert(profile.user_id.clone(), profile);
    }

    pub async fn add_transaction(&self, transaction: Transaction) {
        self.data.write().await.transactions.push(transaction);
    }

    pub async fn add_withdrawal(&self, withdrawal: Withdrawal) {
        self.data.write().await.withdrawals.push(withdrawal);
    }
}

#[async_trait::async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        Ok(self.data.read().await.profiles.get(user_id).cloned())
    }

    async fn list_transactions(&self, user_id: &str) -> Result<Vec<Transaction>, AppError> {
        let mut found: Vec<Transaction> = self
            .data
            .read()
            .await
            .transactions
            .iter()
            .filter(|t| t.involves(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(found)
    }

    async fn list_withdrawals(&self, user_id: &str) -> Result<Vec<Withdrawal>, AppError> {
        let mut found: Vec<Withdrawal> = self
            .data
            .read()
            .await
            .withdrawals
            .iter()
            .filter(|w| w.request_user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(found)
    }

    async fn record_sign_in(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.data
            .write()
            .await
            .sign_ins
            .insert(user_id.to_string(), at);
        Ok(())
    }

    async fn last_sign_in(&self, user_id: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self.data.read().await.sign_ins.get(user_id).copied())
    }
}
