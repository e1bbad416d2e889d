use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Marketplace profile held by the identity/document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub is_media: bool,
    #[serde(default)]
    pub is_professional: bool,
    #[serde(default)]
    pub is_press: bool,
    #[serde(default)]
    pub sales_quantity: i64,
    #[serde(default)]
    pub sales_amount: i64,
    #[serde(default)]
    pub withdrawable_amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_picture: Option<String>,
}

/// A completed sale between two profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub payment_date: DateTime<Utc>,
    pub story_id: String,
    pub payment_seller: String,
    pub payment_seller_display_name: String,
    pub payment_buyer: String,
    pub payment_buyer_display_name: String,
}

/// A cash-out request raised by a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    #[serde(rename = "requestUser")]
    pub request_user_id: String,
    pub request_amount: i64,
    pub request_date: DateTime<Utc>,
    #[serde(default)]
    pub request_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_completed_date: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Whether `user_id` took part in this sale on either side.
    pub fn involves(&self, user_id: &str) -> bool {
        self.payment_seller == user_id || self.payment_buyer == user_id
    }
}
