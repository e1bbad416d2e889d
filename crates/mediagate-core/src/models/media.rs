use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// A marketplace media listing as held by the Storage Facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: Uuid,
    /// Identity that created the listing
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub go_credits: i16,
    pub subscription_credits: i16,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /media`
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMedia {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub go_credits: i16,
    #[serde(default)]
    pub subscription_credits: i16,
}

/// Response body for `POST /media`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedMedia {
    pub id: Uuid,
}

// Credits are single-byte counters in the marketplace ledger.
const MAX_CREDITS: i16 = u8::MAX as i16;
const MAX_PLACE_LEN: usize = 128;

impl NewMedia {
    pub fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("goCredits", self.go_credits),
            ("subscriptionCredits", self.subscription_credits),
        ] {
            if !(0..=MAX_CREDITS).contains(&value) {
                return Err(AppError::InvalidInput(format!(
                    "{} must be between 0 and {}",
                    field, MAX_CREDITS
                )));
            }
        }
        for (field, value) in [("country", &self.country), ("city", &self.city)] {
            if value.as_deref().is_some_and(|v| v.len() > MAX_PLACE_LEN) {
                return Err(AppError::InvalidInput(format!(
                    "{} must be at most {} characters",
                    field, MAX_PLACE_LEN
                )));
            }
        }
        Ok(())
    }

    /// Materialize the listing for `user_id` with a fresh identifier.
    pub fn into_media(self, user_id: impl Into<String>) -> Media {
        Media {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            country: self.country,
            city: self.city,
            go_credits: self.go_credits,
            subscription_credits: self.subscription_credits,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_media_deserializes_camel_case() {
        let body = r#"{"country":"NL","city":"Amsterdam","goCredits":3,"subscriptionCredits":1}"#;
        let new: NewMedia = serde_json::from_str(body).unwrap();
        assert_eq!(new.country.as_deref(), Some("NL"));
        assert_eq!(new.go_credits, 3);
        assert_eq!(new.subscription_credits, 1);
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_new_media_rejects_unknown_fields() {
        let body = r#"{"country":"NL","owner":"mallory"}"#;
        assert!(serde_json::from_str::<NewMedia>(body).is_err());
    }

    #[test]
    fn test_credit_range_enforced() {
        let new = NewMedia {
            country: None,
            city: None,
            go_credits: 256,
            subscription_credits: 0,
        };
        assert!(matches!(new.validate(), Err(AppError::InvalidInput(_))));

        let negative = NewMedia {
            go_credits: 0,
            subscription_credits: -1,
            ..new
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_into_media_binds_owner() {
        let new = NewMedia {
            country: Some("BE".to_string()),
            city: None,
            go_credits: 1,
            subscription_credits: 2,
        };
        let media = new.into_media("alice");
        assert_eq!(media.user_id, "alice");
        assert_eq!(media.country.as_deref(), Some("BE"));

        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["userId"], "alice");
        assert_eq!(json["goCredits"], 1);
        assert!(json.get("city").is_none());
    }
}
