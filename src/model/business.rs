use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::text_enum;
use super::validate;
use crate::error::Result;

text_enum! {
    pub enum SubscriptionStatus => InvalidState {
        Trial = "trial",
        Active = "active",
        PastDue = "past_due",
        Cancelled = "cancelled",
    }
}

text_enum! {
    /// Where a client reached the business from.
    pub enum PlatformType => InvalidState {
        Whatsapp = "whatsapp",
        Instagram = "instagram",
        Facebook = "facebook",
        Telegram = "telegram",
        Web = "web",
        Email = "email",
        Sms = "sms",
    }
}

text_enum! {
    pub enum RelationshipStatus => InvalidState {
        New = "new",
        Prospect = "prospect",
        Customer = "customer",
        Inactive = "inactive",
        Blocked = "blocked",
    }
}

/// Tenant root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub name: String,
    pub owner_email: String,
    pub owner_id: Option<String>,
    pub primary_language: String,
    pub subscription_plan: String,
    pub subscription_status: SubscriptionStatus,
    pub onboarding_completed: bool,
    pub onboarding_step: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub name: String,
    pub owner_email: String,
    pub owner_id: Option<String>,
    pub primary_language: String,
    pub subscription_plan: String,
}

impl NewBusiness {
    pub fn validate(&self) -> Result<()> {
        validate::non_empty("name", &self.name)?;
        validate::email(&self.owner_email)?;
        validate::language_code(&self.primary_language)?;
        validate::non_empty("subscription_plan", &self.subscription_plan)?;
        if let Some(owner) = &self.owner_id {
            validate::non_empty("owner_id", owner)?;
        }
        Ok(())
    }
}

/// A tenant's contact on one platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub business_id: String,
    pub platform_user_id: String,
    pub platform_type: PlatformType,
    pub display_name: Option<String>,
    pub relationship_status: RelationshipStatus,
    pub engagement_score: f64,
    pub lifetime_value: f64,
    pub total_conversations: i64,
    pub total_leads: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub platform_user_id: String,
    pub platform_type: PlatformType,
    pub display_name: Option<String>,
}

impl NewClient {
    pub fn validate(&self) -> Result<()> {
        validate::non_empty("platform_user_id", &self.platform_user_id)?;
        Ok(())
    }
}

impl Client {
    pub fn set_engagement_score(&mut self, score: f64) -> Result<()> {
        self.engagement_score = validate::in_range("engagement_score", score, 0.0, 100.0)?;
        Ok(())
    }

    pub fn set_lifetime_value(&mut self, value: f64) -> Result<()> {
        self.lifetime_value = validate::non_negative("lifetime_value", value)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSource {
    pub id: String,
    pub business_id: String,
    pub platform_type: PlatformType,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPlatformSource {
    pub platform_type: PlatformType,
    pub name: String,
}

impl NewPlatformSource {
    pub fn validate(&self) -> Result<()> {
        validate::non_empty("name", &self.name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_type_round_trip_text() {
        for platform in PlatformType::ALL {
            let parsed: PlatformType = platform.as_str().parse().unwrap();
            assert_eq!(&parsed, platform);
        }
        assert!("myspace".parse::<PlatformType>().is_err());
    }

    #[test]
    fn test_new_business_validation() {
        let mut input = NewBusiness {
            name: "Corner Bakery".to_string(),
            owner_email: "owner@bakery.example".to_string(),
            owner_id: None,
            primary_language: "en".to_string(),
            subscription_plan: "starter".to_string(),
        };
        assert!(input.validate().is_ok());

        input.owner_email = "not-an-email".to_string();
        assert!(input.validate().is_err());
    }
}
