//! Subscription query parsing and argument interpolation
//!
//! The bridge never executes GraphQL. It only needs to know, for a `start`
//! message, which single root subscription field the client asked for and
//! what the field's argument values are once variables are substituted —
//! that is everything channel naming and publish-time filtering require.

use crate::core::error::{BridgeError, BridgeResult};
use graphql_parser::query::{
    Definition, OperationDefinition, Selection, Value as GqlValue, parse_query,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// A fully interpolated scalar argument value
///
/// Only scalars (and explicit null) can participate in channel naming;
/// list and object values have no canonical string form here.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Enum(String),
    Null,
}

impl ArgumentValue {
    /// Build an argument value from a JSON value (a variable binding or a
    /// publish payload field)
    pub fn from_json(value: &Value) -> BridgeResult<Self> {
        match value {
            Value::Null => Ok(ArgumentValue::Null),
            Value::Bool(b) => Ok(ArgumentValue::Boolean(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ArgumentValue::Int(i))
                } else {
                    Ok(ArgumentValue::Float(n.as_f64().unwrap_or_default()))
                }
            }
            Value::String(s) => Ok(ArgumentValue::String(s.clone())),
            Value::Array(_) => Err(unsupported("ListValue")),
            Value::Object(_) => Err(unsupported("ObjectValue")),
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::String(s) => write!(f, "{}", s),
            ArgumentValue::Int(i) => write!(f, "{}", i),
            ArgumentValue::Float(x) => write!(f, "{}", x),
            ArgumentValue::Boolean(b) => write!(f, "{}", b),
            ArgumentValue::Enum(name) => write!(f, "{}", name),
            // querystring-style: null renders as the empty string
            ArgumentValue::Null => Ok(()),
        }
    }
}

/// The single root field of a subscription operation, with its interpolated
/// argument values in source order
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionOperation {
    /// Root subscription field name, e.g. `itemAdded`
    pub field_name: String,
    /// Argument name/value pairs after variable interpolation
    pub arguments: IndexMap<String, ArgumentValue>,
}

/// Parse a subscription query down to its root field and argument values
///
/// Fails with [`BridgeError::UnparsableSubscriptionQuery`] unless the query
/// contains exactly one root selection and that selection is a plain field.
pub fn parse_subscription(
    query: &str,
    variables: Option<&serde_json::Map<String, Value>>,
) -> BridgeResult<SubscriptionOperation> {
    let document = parse_query::<String>(query).map_err(|e| unparsable(&format!("{}", e)))?;

    let operation = document
        .definitions
        .iter()
        .find_map(|def| match def {
            Definition::Operation(op) => Some(op),
            Definition::Fragment(_) => None,
        })
        .ok_or_else(|| unparsable("no operation definition found"))?;

    let selection_set = match operation {
        OperationDefinition::Subscription(sub) => &sub.selection_set,
        OperationDefinition::SelectionSet(set) => set,
        OperationDefinition::Query(_) | OperationDefinition::Mutation(_) => {
            return Err(unparsable("operation is not a subscription"));
        }
    };

    if selection_set.items.len() != 1 {
        return Err(unparsable(&format!(
            "expected exactly one root selection, found {}",
            selection_set.items.len()
        )));
    }

    let field = match &selection_set.items[0] {
        Selection::Field(field) => field,
        Selection::FragmentSpread(_) | Selection::InlineFragment(_) => {
            return Err(unparsable("root selection must be a Field"));
        }
    };

    let mut arguments = IndexMap::new();
    for (name, value) in &field.arguments {
        arguments.insert(name.clone(), interpolate_value(value, variables)?);
    }

    Ok(SubscriptionOperation {
        field_name: field.name.clone(),
        arguments,
    })
}

/// Interpolate a GraphQL value node against the operation's variables
///
/// Variable references are substituted from the variables map; null and
/// scalar literals are used directly; list and object literals fail with
/// [`BridgeError::UnsupportedArgumentValueType`].
pub fn interpolate_value(
    value: &GqlValue<'_, String>,
    variables: Option<&serde_json::Map<String, Value>>,
) -> BridgeResult<ArgumentValue> {
    match value {
        GqlValue::Variable(name) => {
            let bound = variables
                .and_then(|vars| vars.get(name))
                .ok_or_else(|| unparsable(&format!("variable '${}' is not provided", name)))?;
            ArgumentValue::from_json(bound)
        }
        GqlValue::Null => Ok(ArgumentValue::Null),
        GqlValue::Int(n) => Ok(ArgumentValue::Int(
            n.as_i64().ok_or_else(|| unparsable("integer out of range"))?,
        )),
        GqlValue::Float(x) => Ok(ArgumentValue::Float(*x)),
        GqlValue::String(s) => Ok(ArgumentValue::String(s.clone())),
        GqlValue::Boolean(b) => Ok(ArgumentValue::Boolean(*b)),
        GqlValue::Enum(name) => Ok(ArgumentValue::Enum(name.clone())),
        GqlValue::List(_) => Err(unsupported("ListValue")),
        GqlValue::Object(_) => Err(unsupported("ObjectValue")),
    }
}

fn unparsable(message: &str) -> BridgeError {
    BridgeError::UnparsableSubscriptionQuery {
        message: message.to_string(),
    }
}

fn unsupported(kind: &str) -> BridgeError {
    BridgeError::UnsupportedArgumentValueType {
        kind: kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variables(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_parse_bare_subscription() {
        let op = parse_subscription("subscription { itemAdded { id } }", None).unwrap();
        assert_eq!(op.field_name, "itemAdded");
        assert!(op.arguments.is_empty());
    }

    #[test]
    fn test_parse_anonymous_selection_set() {
        let op = parse_subscription("{ itemAdded { id } }", None).unwrap();
        assert_eq!(op.field_name, "itemAdded");
    }

    #[test]
    fn test_parse_literal_arguments() {
        let op = parse_subscription(
            r#"subscription { itemAddedToCategory(category: "news", limit: 3) { id } }"#,
            None,
        )
        .unwrap();
        assert_eq!(op.field_name, "itemAddedToCategory");
        assert_eq!(
            op.arguments.get("category"),
            Some(&ArgumentValue::String("news".to_string()))
        );
        assert_eq!(op.arguments.get("limit"), Some(&ArgumentValue::Int(3)));
    }

    #[test]
    fn test_parse_variable_arguments() {
        let vars = variables(json!({"category": "sports"}));
        let op = parse_subscription(
            r#"subscription ItemsByCategory($category: String!) {
                itemAddedToCategory(category: $category) { id }
            }"#,
            Some(&vars),
        )
        .unwrap();
        assert_eq!(
            op.arguments.get("category"),
            Some(&ArgumentValue::String("sports".to_string()))
        );
    }

    #[test]
    fn test_missing_variable_is_unparsable() {
        let result = parse_subscription(
            r#"subscription($c: String!) { itemAddedToCategory(category: $c) { id } }"#,
            None,
        );
        assert!(matches!(
            result,
            Err(BridgeError::UnparsableSubscriptionQuery { .. })
        ));
    }

    #[test]
    fn test_two_root_selections_is_unparsable() {
        let result = parse_subscription("subscription { itemAdded { id } itemRemoved { id } }", None);
        assert!(matches!(
            result,
            Err(BridgeError::UnparsableSubscriptionQuery { .. })
        ));
    }

    #[test]
    fn test_query_operation_is_rejected() {
        let result = parse_subscription("query { items { id } }", None);
        assert!(matches!(
            result,
            Err(BridgeError::UnparsableSubscriptionQuery { .. })
        ));
    }

    #[test]
    fn test_invalid_syntax_is_unparsable() {
        let result = parse_subscription("subscription { itemAdded {", None);
        assert!(matches!(
            result,
            Err(BridgeError::UnparsableSubscriptionQuery { .. })
        ));
    }

    #[test]
    fn test_list_literal_argument_is_unsupported() {
        let result = parse_subscription(
            r#"subscription { itemAdded(tags: ["a", "b"]) { id } }"#,
            None,
        );
        assert!(matches!(
            result,
            Err(BridgeError::UnsupportedArgumentValueType { .. })
        ));
    }

    #[test]
    fn test_object_variable_binding_is_unsupported() {
        let vars = variables(json!({"filter": {"category": "news"}}));
        let result = parse_subscription(
            r#"subscription($filter: Filter) { itemAdded(filter: $filter) { id } }"#,
            Some(&vars),
        );
        assert!(matches!(
            result,
            Err(BridgeError::UnsupportedArgumentValueType { .. })
        ));
    }

    #[test]
    fn test_null_literal_renders_empty() {
        let op = parse_subscription("subscription { itemAdded(category: null) { id } }", None)
            .unwrap();
        assert_eq!(op.arguments.get("category"), Some(&ArgumentValue::Null));
        assert_eq!(ArgumentValue::Null.to_string(), "");
    }

    #[test]
    fn test_argument_value_from_json_scalars() {
        assert_eq!(
            ArgumentValue::from_json(&json!("x")).unwrap(),
            ArgumentValue::String("x".to_string())
        );
        assert_eq!(
            ArgumentValue::from_json(&json!(7)).unwrap(),
            ArgumentValue::Int(7)
        );
        assert_eq!(
            ArgumentValue::from_json(&json!(true)).unwrap(),
            ArgumentValue::Boolean(true)
        );
        assert!(ArgumentValue::from_json(&json!([1])).is_err());
    }
}
