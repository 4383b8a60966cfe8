//! `/products` and `/products/{id}`

use super::builder::{MethodOptions, SurfaceBuilder};
use super::Authorizers;
use crate::domain::{HandlerTargets, HttpVerb, JsonType, ModelSchema, ValidatorSchema};
use crate::error::BuildError;

/// Browsing is open to every client of both realms.
const FETCH_WEB_MOBILE_SCOPES: &[&str] = &["customer/web", "customer/mobile", "admin/web"];
const FETCH_WEB_SCOPES: &[&str] = &["customer/web", "admin/web"];
const ADMIN_SCOPES: &[&str] = &["admin/web"];

pub fn product_model() -> ModelSchema {
    ModelSchema::new("ProductModel")
        .required_property("productName", JsonType::String)
        .required_property("code", JsonType::String)
        .property("price", JsonType::Number)
        .property("model", JsonType::String)
        .property("productUrl", JsonType::String)
}

pub(super) fn bind(
    builder: &mut SurfaceBuilder,
    handlers: &HandlerTargets,
    authorizers: &Authorizers,
) -> Result<(), BuildError> {
    let products = builder.add_resource(builder.root(), "products")?;
    let product = builder.add_resource(products, "{id}")?;

    builder.add_method(
        products,
        HttpVerb::Get,
        &handlers.products_fetch,
        MethodOptions::authorized(authorizers.products, FETCH_WEB_MOBILE_SCOPES),
    )?;
    builder.add_method(
        product,
        HttpVerb::Get,
        &handlers.products_fetch,
        MethodOptions::authorized(authorizers.products, FETCH_WEB_SCOPES),
    )?;

    // Shared by POST and PUT
    let request =
        builder.add_validator(ValidatorSchema::body("ProductRequestValidator", product_model()))?;
    let admin = || MethodOptions::authorized(authorizers.products_admin, ADMIN_SCOPES);

    builder.add_method(
        products,
        HttpVerb::Post,
        &handlers.products_admin,
        admin().validated_by(request),
    )?;
    builder.add_method(
        product,
        HttpVerb::Put,
        &handlers.products_admin,
        admin().validated_by(request),
    )?;
    builder.add_method(product, HttpVerb::Delete, &handlers.products_admin, admin())?;

    Ok(())
}
