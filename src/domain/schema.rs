//! Request validators and their schemas

use crate::error::BuildError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

/// Handle to a validator registered on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ValidatorId(pub usize);

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of primitive property constraints
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonType {
    String,
    Number,
    Array {
        items: Box<JsonType>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_items: Option<u32>,
    },
    /// A string restricted to the listed values
    Enum { values: Vec<String> },
}

impl JsonType {
    pub fn array_of(items: JsonType, min_items: u32) -> Self {
        JsonType::Array {
            items: Box::new(items),
            min_items: Some(min_items),
        }
    }

    pub fn one_of(values: &[&str]) -> Self {
        JsonType::Enum {
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            JsonType::String => json!({ "type": "string" }),
            JsonType::Number => json!({ "type": "number" }),
            JsonType::Array { items, min_items } => {
                let mut schema = json!({
                    "type": "array",
                    "items": items.to_json_schema(),
                });
                if let Some(min) = min_items {
                    schema["minItems"] = json!(min);
                }
                schema
            }
            JsonType::Enum { values } => json!({ "type": "string", "enum": values }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaProperty {
    pub name: String,
    pub rule: JsonType,
}

/// Body model for an `application/json` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSchema {
    pub name: String,
    pub properties: Vec<SchemaProperty>,
    pub required: Vec<String>,
}

impl ModelSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: vec![],
            required: vec![],
        }
    }

    pub fn property(mut self, name: &str, rule: JsonType) -> Self {
        self.properties.push(SchemaProperty {
            name: name.to_string(),
            rule,
        });
        self
    }

    pub fn required_property(mut self, name: &str, rule: JsonType) -> Self {
        self.required.push(name.to_string());
        self.property(name, rule)
    }

    /// Reject duplicate properties and required names that are not declared.
    pub fn check(&self) -> Result<(), BuildError> {
        for (i, property) in self.properties.iter().enumerate() {
            if self.properties[..i].iter().any(|p| p.name == property.name) {
                return Err(BuildError::InvalidSchema {
                    name: self.name.clone(),
                    reason: format!("property '{}' declared twice", property.name),
                });
            }
            if let JsonType::Array {
                min_items: Some(_),
                items,
            } = &property.rule
            {
                if matches!(items.as_ref(), JsonType::Array { .. }) {
                    return Err(BuildError::InvalidSchema {
                        name: self.name.clone(),
                        reason: format!("property '{}' nests arrays", property.name),
                    });
                }
            }
            if let JsonType::Enum { values } = &property.rule {
                if values.is_empty() {
                    return Err(BuildError::InvalidSchema {
                        name: self.name.clone(),
                        reason: format!("enum '{}' has no values", property.name),
                    });
                }
            }
        }

        for name in &self.required {
            if !self.properties.iter().any(|p| &p.name == name) {
                return Err(BuildError::InvalidSchema {
                    name: self.name.clone(),
                    reason: format!("required property '{}' is not declared", name),
                });
            }
        }

        Ok(())
    }

    /// Render as a draft-04 JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.rule.to_json_schema()))
            .collect();

        let mut schema = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "title": self.name,
            "type": "object",
            "properties": properties,
        });
        if !self.required.is_empty() {
            schema["required"] = json!(self.required);
        }
        schema
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParameter {
    pub name: String,
    pub required: bool,
}

impl QueryParameter {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationTarget {
    Body,
    QueryParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "target", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationRules {
    Body { model: ModelSchema },
    QueryParams { parameters: Vec<QueryParameter> },
}

/// A named, reusable validator. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorSchema {
    pub name: String,
    pub rules: ValidationRules,
}

impl ValidatorSchema {
    pub fn body(name: &str, model: ModelSchema) -> Self {
        Self {
            name: name.to_string(),
            rules: ValidationRules::Body { model },
        }
    }

    pub fn query_params(name: &str, parameters: Vec<QueryParameter>) -> Self {
        Self {
            name: name.to_string(),
            rules: ValidationRules::QueryParams { parameters },
        }
    }

    pub fn target(&self) -> ValidationTarget {
        match self.rules {
            ValidationRules::Body { .. } => ValidationTarget::Body,
            ValidationRules::QueryParams { .. } => ValidationTarget::QueryParams,
        }
    }

    pub fn check(&self) -> Result<(), BuildError> {
        match &self.rules {
            ValidationRules::Body { model } => model.check(),
            ValidationRules::QueryParams { parameters } => {
                if parameters.is_empty() {
                    return Err(BuildError::InvalidSchema {
                        name: self.name.clone(),
                        reason: "no query parameters declared".to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}
