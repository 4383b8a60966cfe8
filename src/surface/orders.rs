//! `/orders` and `/orders/events`

use super::builder::{MethodOptions, SurfaceBuilder};
use super::Authorizers;
use crate::domain::{
    HandlerTargets, HttpVerb, JsonType, ModelSchema, QueryParameter, ValidatorSchema,
};
use crate::error::BuildError;

const ORDER_SCOPES: &[&str] = &["admin/web", "customer/web"];

pub const PAYMENT_METHODS: &[&str] = &["CASH", "DEBIT_CARD", "CREDIT_CARD"];

pub fn order_model() -> ModelSchema {
    ModelSchema::new("OrderModel")
        .required_property("productIds", JsonType::array_of(JsonType::String, 1))
        .required_property("payment", JsonType::one_of(PAYMENT_METHODS))
}

pub(super) fn bind(
    builder: &mut SurfaceBuilder,
    handlers: &HandlerTargets,
    authorizers: &Authorizers,
) -> Result<(), BuildError> {
    let orders = builder.add_resource(builder.root(), "orders")?;
    let authorized = || MethodOptions::authorized(authorizers.orders, ORDER_SCOPES);

    // GET /orders, /orders?email=, /orders?email=&orderId=
    builder.add_method(
        orders,
        HttpVerb::Get,
        &handlers.orders,
        authorized().query_parameters(vec![
            QueryParameter::optional("email"),
            QueryParameter::optional("orderId"),
        ]),
    )?;

    let deletion_parameters = vec![
        QueryParameter::required("email"),
        QueryParameter::required("orderId"),
    ];
    let deletion = builder.add_validator(ValidatorSchema::query_params(
        "OrderDeletionValidator",
        deletion_parameters.clone(),
    ))?;
    builder.add_method(
        orders,
        HttpVerb::Delete,
        &handlers.orders,
        authorized()
            .validated_by(deletion)
            .query_parameters(deletion_parameters),
    )?;

    let request = builder.add_validator(ValidatorSchema::body("OrderRequestValidator", order_model()))?;
    builder.add_method(
        orders,
        HttpVerb::Post,
        &handlers.orders,
        authorized().validated_by(request),
    )?;

    let events = builder.add_resource(orders, "events")?;
    let events_parameters = vec![
        QueryParameter::required("email"),
        QueryParameter::optional("eventType"),
    ];
    let events_fetch = builder.add_validator(ValidatorSchema::query_params(
        "OrderEventsFetchValidator",
        events_parameters.clone(),
    ))?;
    builder.add_method(
        events,
        HttpVerb::Get,
        &handlers.order_events_fetch,
        authorized()
            .validated_by(events_fetch)
            .query_parameters(events_parameters),
    )?;

    Ok(())
}
