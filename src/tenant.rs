//! Tenant scoping and composite-key uniqueness
//!
//! `TenantContext` travels explicitly through every service call and is the
//! only place cross-tenant access is rejected. `UniquenessGuard` checks the
//! `(business_id, ...)` keys before a write reaches the store.

use crate::error::{CoreError, Result};
use crate::model::{ContentKind, PlatformType};
use crate::store::repo::{
    BusinessRepository, ClientRepository, ContentRepository, TemplateRepository,
};

/// The business on whose behalf the caller acts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    business_id: String,
}

impl TenantContext {
    pub fn new(business_id: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
        }
    }

    pub fn business_id(&self) -> &str {
        &self.business_id
    }

    /// Fail unless `owner_business_id` is this tenant.
    pub fn authorize(&self, entity: &'static str, owner_business_id: &str) -> Result<()> {
        if self.business_id != owner_business_id {
            tracing::warn!(
                tenant = %self.business_id,
                owner = %owner_business_id,
                entity,
                "cross-tenant access rejected"
            );
            return Err(CoreError::TenantMismatch { entity });
        }
        Ok(())
    }
}

pub struct UniquenessGuard<'a, S> {
    store: &'a S,
}

impl<'a, S> UniquenessGuard<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<'a, S: BusinessRepository> UniquenessGuard<'a, S> {
    pub fn business_owner(&self, owner_email: &str, owner_id: Option<&str>) -> Result<()> {
        if self.store.find_business_by_owner_email(owner_email)?.is_some() {
            return Err(CoreError::UniquenessViolation(format!(
                "owner email {} already has a business",
                owner_email
            )));
        }
        if let Some(owner) = owner_id {
            if self.store.find_business_by_owner_id(owner)?.is_some() {
                return Err(CoreError::UniquenessViolation(format!(
                    "owner {} already has a business",
                    owner
                )));
            }
        }
        Ok(())
    }
}

impl<'a, S: ClientRepository> UniquenessGuard<'a, S> {
    pub fn client(
        &self,
        ctx: &TenantContext,
        platform_user_id: &str,
        platform_type: PlatformType,
    ) -> Result<()> {
        if self
            .store
            .find_client(ctx.business_id(), platform_user_id, platform_type)?
            .is_some()
        {
            return Err(CoreError::UniquenessViolation(format!(
                "client {} on {} already exists",
                platform_user_id, platform_type
            )));
        }
        Ok(())
    }

    pub fn platform_source(
        &self,
        ctx: &TenantContext,
        platform_type: PlatformType,
        name: &str,
    ) -> Result<()> {
        if self
            .store
            .find_platform_source(ctx.business_id(), platform_type, name)?
            .is_some()
        {
            return Err(CoreError::UniquenessViolation(format!(
                "platform source {} on {} already exists",
                name, platform_type
            )));
        }
        Ok(())
    }
}

impl<'a, S: ContentRepository> UniquenessGuard<'a, S> {
    /// The `(business, key, language)` slot must be free or held by `entry_id`.
    pub fn content(
        &self,
        ctx: &TenantContext,
        kind: ContentKind,
        content_key: &str,
        language_code: &str,
        entry_id: Option<&str>,
    ) -> Result<()> {
        match self
            .store
            .find_content(kind, ctx.business_id(), content_key, language_code)?
        {
            Some(existing) if Some(existing.id.as_str()) != entry_id => {
                Err(CoreError::UniquenessViolation(format!(
                    "{} '{}' already exists for language {}",
                    kind.entity_name(),
                    content_key,
                    language_code
                )))
            }
            _ => Ok(()),
        }
    }
}

impl<'a, S: TemplateRepository> UniquenessGuard<'a, S> {
    pub fn template_key(&self, template_key: &str) -> Result<()> {
        if self.store.find_template_by_key(template_key)?.is_some() {
            return Err(CoreError::UniquenessViolation(format!(
                "template key {} already exists",
                template_key
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_same_tenant() {
        let ctx = TenantContext::new("biz-1");
        assert!(ctx.authorize("lead", "biz-1").is_ok());
    }

    #[test]
    fn test_authorize_rejects_other_tenant() {
        let ctx = TenantContext::new("biz-1");
        let err = ctx.authorize("conversation", "biz-2").unwrap_err();
        assert!(matches!(
            err,
            CoreError::TenantMismatch {
                entity: "conversation"
            }
        ));
    }
}
