//! Canonical channel names for GRIP routing
//!
//! The proxy routes a published message to every held socket subscribed to a
//! channel string, so two logically identical subscriptions must always
//! resolve to byte-identical channel names. Canonicalization is a pure
//! function over the subscription field name, its interpolated argument
//! values and the channel kind:
//!
//! - [`ChannelKind::Broadcast`] channels carry updates for a field to every
//!   subscriber whose arguments match. Argument keys are sorted
//!   lexicographically and values percent-encoded:
//!   `itemAddedToCategory?category=news`.
//! - [`ChannelKind::Operation`] channels deliver to exactly one client
//!   operation: `itemAdded#<operation-id>`.
//!
//! The two kinds occupy syntactically disjoint namespaces (`#` never appears
//! in an encoded broadcast suffix), so a user-defined argument can never
//! collide with the operation-id segment.

use crate::graphql::query::ArgumentValue;
use indexmap::IndexMap;
use std::fmt;

/// What a channel addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelKind {
    /// Fan-out to all subscribers of a field (optionally filtered by
    /// argument values)
    Broadcast,
    /// Point-to-point delivery to a single client operation
    ///
    /// The bridge itself only subscribes and publishes Broadcast channels;
    /// this kind is for embedding applications that publish directly to one
    /// operation over EPCP, e.g. to replay missed events to a reconnecting
    /// client. Held sockets are not subscribed to operation channels unless
    /// the application arranges it.
    Operation {
        /// The client-supplied graphql-ws operation id
        operation_id: String,
    },
}

/// A canonical, deterministically ordered channel identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    /// Resolve a channel name from a field, its argument values and a kind
    ///
    /// Argument insertion order never affects the result: set-equal maps
    /// produce byte-identical channel strings.
    pub fn resolve(
        field_name: &str,
        arguments: &IndexMap<String, ArgumentValue>,
        kind: ChannelKind,
    ) -> Self {
        let mut name = field_name.to_string();

        if !arguments.is_empty() {
            let mut pairs: Vec<(&String, &ArgumentValue)> = arguments.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let suffix = pairs
                .iter()
                .map(|(key, value)| {
                    format!("{}={}", percent_encode(key), percent_encode(&value.to_string()))
                })
                .collect::<Vec<_>>()
                .join("&");
            name.push('?');
            name.push_str(&suffix);
        }

        if let ChannelKind::Operation { operation_id } = kind {
            name.push('#');
            name.push_str(&percent_encode(&operation_id));
        }

        ChannelName(name)
    }

    /// The channel identifier string given to the proxy
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Percent-encode everything outside the unreserved set, so `?`, `&`, `=`
/// and `#` inside user values can never be confused with channel syntax
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, ArgumentValue)]) -> IndexMap<String, ArgumentValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_bare_field_channel() {
        let channel = ChannelName::resolve("itemAdded", &IndexMap::new(), ChannelKind::Broadcast);
        assert_eq!(channel.as_str(), "itemAdded");
    }

    #[test]
    fn test_single_argument_suffix() {
        let channel = ChannelName::resolve(
            "itemAddedToCategory",
            &args(&[("category", ArgumentValue::String("news".to_string()))]),
            ChannelKind::Broadcast,
        );
        assert_eq!(channel.as_str(), "itemAddedToCategory?category=news");
    }

    #[test]
    fn test_argument_order_does_not_matter() {
        let forward = args(&[
            ("category", ArgumentValue::String("news".to_string())),
            ("author", ArgumentValue::String("ada".to_string())),
        ]);
        let reversed = args(&[
            ("author", ArgumentValue::String("ada".to_string())),
            ("category", ArgumentValue::String("news".to_string())),
        ]);

        let a = ChannelName::resolve("itemAdded", &forward, ChannelKind::Broadcast);
        let b = ChannelName::resolve("itemAdded", &reversed, ChannelKind::Broadcast);

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "itemAdded?author=ada&category=news");
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let channel = ChannelName::resolve(
            "noteAdded",
            &args(&[("channel", ArgumentValue::String("#general & more".to_string()))]),
            ChannelKind::Broadcast,
        );
        assert_eq!(
            channel.as_str(),
            "noteAdded?channel=%23general%20%26%20more"
        );
    }

    #[test]
    fn test_scalar_value_renderings() {
        let channel = ChannelName::resolve(
            "itemAdded",
            &args(&[
                ("limit", ArgumentValue::Int(10)),
                ("live", ArgumentValue::Boolean(true)),
                ("kind", ArgumentValue::Enum("URGENT".to_string())),
                ("cursor", ArgumentValue::Null),
            ]),
            ChannelKind::Broadcast,
        );
        assert_eq!(
            channel.as_str(),
            "itemAdded?cursor=&kind=URGENT&limit=10&live=true"
        );
    }

    #[test]
    fn test_operation_channel_namespace() {
        let channel = ChannelName::resolve(
            "itemAdded",
            &IndexMap::new(),
            ChannelKind::Operation {
                operation_id: "1".to_string(),
            },
        );
        assert_eq!(channel.as_str(), "itemAdded#1");
    }

    #[test]
    fn test_operation_channel_never_collides_with_broadcast_argument() {
        // A user argument that tries to look like an operation marker is
        // percent-encoded, so the namespaces stay disjoint
        let tricky = ChannelName::resolve(
            "itemAdded",
            &args(&[("id", ArgumentValue::String("#1".to_string()))]),
            ChannelKind::Broadcast,
        );
        let operation = ChannelName::resolve(
            "itemAdded",
            &IndexMap::new(),
            ChannelKind::Operation {
                operation_id: "1".to_string(),
            },
        );
        assert_ne!(tricky, operation);
        assert!(!tricky.as_str().contains('#'));
    }
}
