use anyhow::Result;

use super::{print_json, Service};
use crate::model::{NewBusiness, NewClient, NewPlatformSource, PlatformType, RelationshipStatus};
use crate::tenant::TenantContext;

pub fn create(
    service: &Service,
    name: String,
    owner_email: String,
    owner_id: Option<String>,
    language: String,
    plan: String,
) -> Result<()> {
    let business = service.create_business(&NewBusiness {
        name,
        owner_email,
        owner_id,
        primary_language: language,
        subscription_plan: plan,
    })?;
    println!("Business '{}' created with ID: {}", business.name, business.id);
    Ok(())
}

pub fn show(service: &Service, ctx: &TenantContext) -> Result<()> {
    print_json(&service.get_business(ctx)?)
}

pub fn add_client(
    service: &Service,
    ctx: &TenantContext,
    platform_user_id: String,
    platform_type: PlatformType,
    display_name: Option<String>,
) -> Result<()> {
    let client = service.create_client(
        ctx,
        &NewClient {
            platform_user_id,
            platform_type,
            display_name,
        },
    )?;
    println!(
        "Client {} on {} created with ID: {}",
        client.platform_user_id, client.platform_type, client.id
    );
    Ok(())
}

pub fn show_client(service: &Service, ctx: &TenantContext, client_id: &str) -> Result<()> {
    print_json(&service.get_client(ctx, client_id)?)
}

pub fn update_client(
    service: &Service,
    ctx: &TenantContext,
    client_id: &str,
    status: Option<RelationshipStatus>,
    engagement: Option<f64>,
    lifetime_value: Option<f64>,
) -> Result<()> {
    let client =
        service.update_client_profile(ctx, client_id, status, engagement, lifetime_value)?;
    print_json(&client)
}

pub fn add_source(
    service: &Service,
    ctx: &TenantContext,
    platform_type: PlatformType,
    name: String,
) -> Result<()> {
    let source =
        service.create_platform_source(ctx, &NewPlatformSource { platform_type, name })?;
    println!(
        "Source '{}' ({}) created with ID: {}",
        source.name, source.platform_type, source.id
    );
    Ok(())
}
