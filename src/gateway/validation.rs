//! Request validation at the edge
//!
//! Body models are compiled once into draft-04 JSON Schema validators when
//! the gateway starts; query validators only check presence.

use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::{QueryParameter, ValidationRules, ValidatorSchema};
use crate::error::{AppError, BuildError, Result};

pub enum CompiledValidator {
    Body {
        name: String,
        validator: Box<Validator>,
    },
    QueryParams {
        name: String,
        parameters: Vec<QueryParameter>,
    },
}

impl CompiledValidator {
    pub fn compile(schema: &ValidatorSchema) -> std::result::Result<Self, BuildError> {
        match &schema.rules {
            ValidationRules::Body { model } => {
                let mut options = jsonschema::options();
                options.with_draft(jsonschema::Draft::Draft4);
                let validator = options.build(&model.to_json_schema()).map_err(|e| {
                    BuildError::InvalidSchema {
                        name: model.name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(CompiledValidator::Body {
                    name: schema.name.clone(),
                    validator: Box::new(validator),
                })
            }
            ValidationRules::QueryParams { parameters } => Ok(CompiledValidator::QueryParams {
                name: schema.name.clone(),
                parameters: parameters.clone(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CompiledValidator::Body { name, .. } | CompiledValidator::QueryParams { name, .. } => {
                name
            }
        }
    }

    /// Validate a request, returning the parsed body when one was sent.
    pub fn validate(
        &self,
        query: &HashMap<String, String>,
        body: Option<&[u8]>,
    ) -> Result<Option<Value>> {
        match self {
            CompiledValidator::QueryParams { parameters, .. } => {
                check_required_parameters(parameters, query)?;
                Ok(passthrough_body(body))
            }
            CompiledValidator::Body { validator, .. } => {
                let instance = parse_body(body)?.ok_or_else(|| {
                    AppError::BadRequest("Invalid request body".to_string())
                })?;

                let violations: Vec<String> = validator
                    .iter_errors(&instance)
                    .map(|e| {
                        let path = e.instance_path.to_string();
                        if path.is_empty() {
                            e.to_string()
                        } else {
                            format!("{}: {}", path, e)
                        }
                    })
                    .collect();

                if violations.is_empty() {
                    Ok(Some(instance))
                } else {
                    Err(AppError::BadRequest(format!(
                        "Invalid request body: [{}]",
                        violations.join("; ")
                    )))
                }
            }
        }
    }
}

/// Reject when any required parameter is absent. Empty values count as present.
pub fn check_required_parameters(
    parameters: &[QueryParameter],
    query: &HashMap<String, String>,
) -> Result<()> {
    let missing: Vec<&str> = parameters
        .iter()
        .filter(|p| p.required && !query.contains_key(&p.name))
        .map(|p| p.name.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Missing required request parameters: [{}]",
            missing.join(", ")
        )))
    }
}

/// Parse a JSON body. An absent or blank body yields `None`.
pub fn parse_body(body: Option<&[u8]>) -> Result<Option<Value>> {
    match body {
        Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e))),
        _ => Ok(None),
    }
}

/// Unvalidated bodies reach the handler as JSON when they parse, as text otherwise.
pub fn passthrough_body(body: Option<&[u8]>) -> Option<Value> {
    match parse_body(body) {
        Ok(parsed) => parsed,
        Err(_) => body.map(|bytes| Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::orders::order_model;
    use crate::surface::products::product_model;
    use rstest::rstest;

    fn order_validator() -> CompiledValidator {
        CompiledValidator::compile(&ValidatorSchema::body("OrderRequestValidator", order_model()))
            .unwrap()
    }

    fn product_validator() -> CompiledValidator {
        CompiledValidator::compile(&ValidatorSchema::body(
            "ProductRequestValidator",
            product_model(),
        ))
        .unwrap()
    }

    fn deletion_validator() -> CompiledValidator {
        CompiledValidator::compile(&ValidatorSchema::query_params(
            "OrderDeletionValidator",
            vec![
                QueryParameter::required("email"),
                QueryParameter::required("orderId"),
            ],
        ))
        .unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[rstest]
    #[case(r#"{"productIds": ["p1"], "payment": "CASH"}"#, true)]
    #[case(r#"{"productIds": ["p1", "p2"], "payment": "CREDIT_CARD"}"#, true)]
    #[case(r#"{"productIds": [], "payment": "CASH"}"#, false)]
    #[case(r#"{"productIds": ["p1"], "payment": "CHEQUE"}"#, false)]
    #[case(r#"{"productIds": [1], "payment": "CASH"}"#, false)]
    #[case(r#"{"payment": "CASH"}"#, false)]
    #[case(r#"{"productIds": ["p1"]}"#, false)]
    fn test_order_body(#[case] body: &str, #[case] accepted: bool) {
        let result = order_validator().validate(&HashMap::new(), Some(body.as_bytes()));
        assert_eq!(result.is_ok(), accepted, "{}", body);
    }

    #[rstest]
    #[case(r#"{"productName": "x", "code": "c1"}"#, true)]
    #[case(r#"{"productName": "x", "code": "c1", "price": 10.5, "model": "m", "productUrl": "u"}"#, true)]
    #[case(r#"{"productName": "x", "payment": "CASH"}"#, false)]
    #[case(r#"{"productName": "x", "code": "c1", "price": "ten"}"#, false)]
    fn test_product_body(#[case] body: &str, #[case] accepted: bool) {
        let result = product_validator().validate(&HashMap::new(), Some(body.as_bytes()));
        assert_eq!(result.is_ok(), accepted, "{}", body);
    }

    #[test]
    fn test_body_rejection_names_rule() {
        let err = order_validator()
            .validate(&HashMap::new(), Some(br#"{"productIds": [], "payment": "CASH"}"#.as_slice()))
            .unwrap_err();
        assert!(err.to_string().contains("/productIds"));
    }

    #[test]
    fn test_missing_body_rejected() {
        assert!(order_validator().validate(&HashMap::new(), None).is_err());
        assert!(order_validator()
            .validate(&HashMap::new(), Some(b"not json".as_slice()))
            .is_err());
    }

    #[test]
    fn test_missing_query_parameters() {
        let err = deletion_validator()
            .validate(&query(&[("email", "a@example.com")]), None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad request: Missing required request parameters: [orderId]"
        );

        let err = deletion_validator()
            .validate(&HashMap::new(), None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad request: Missing required request parameters: [email, orderId]"
        );
    }

    #[test]
    fn test_required_query_parameters_present() {
        let parsed = deletion_validator()
            .validate(&query(&[("email", "a@example.com"), ("orderId", "o-1")]), None)
            .unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_query_validator_passes_text_body_through() {
        let parsed = deletion_validator()
            .validate(
                &query(&[("email", "a@example.com"), ("orderId", "o-1")]),
                Some(b"not json".as_slice()),
            )
            .unwrap();
        assert_eq!(parsed, Some(Value::String("not json".to_string())));
    }

    #[test]
    fn test_passthrough_body() {
        assert_eq!(passthrough_body(None), None);
        assert_eq!(
            passthrough_body(Some(br#"{"a":1}"#.as_slice())),
            Some(serde_json::json!({"a": 1}))
        );
        assert_eq!(
            passthrough_body(Some(b"plain".as_slice())),
            Some(Value::String("plain".to_string()))
        );
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(None).unwrap(), None);
        assert_eq!(parse_body(Some(b"  ".as_slice())).unwrap(), None);
        assert_eq!(
            parse_body(Some(br#"{"a":1}"#.as_slice())).unwrap(),
            Some(serde_json::json!({"a": 1}))
        );
    }
}
