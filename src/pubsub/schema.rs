//! Subscription-root field descriptors
//!
//! The bridge does not execute GraphQL, but the fan-out engine still needs
//! to know which subscription fields exist, which publish trigger each one
//! responds to, the return type name to inject as `__typename`, and whether
//! the field filters on an argument. Instead of inspecting a schema object
//! and untyped payloads at publish time, applications declare their
//! subscription roots as typed descriptors up front and the engine matches
//! against them.
//!
//! ```rust,ignore
//! let schema = SubscriptionSchema::new(vec![
//!     SubscriptionField::new("itemAdded", "itemAdded", "Item"),
//!     SubscriptionField::new("itemAddedToCategory", "itemAdded", "Item")
//!         .filtered_by("category"),
//! ]);
//! ```

/// Filter declaration for a subscription field
///
/// The field's `argument` (bound at `start` time) must equal the publish
/// payload's value under `payload_key` for the subscription to receive the
/// event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    /// Argument name on the subscription field
    pub argument: String,
    /// Key looked up in the publish payload body
    pub payload_key: String,
}

/// One subscription-root field of the application schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionField {
    /// Field name as it appears in subscription queries
    pub name: String,
    /// Publish trigger this field responds to
    pub trigger: String,
    /// GraphQL return type name, injected as `__typename`
    pub type_name: String,
    /// Filter predicate, `None` for unfiltered broadcast fields
    pub filter: Option<FieldFilter>,
}

impl SubscriptionField {
    /// Declare an unfiltered subscription field
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            type_name: type_name.into(),
            filter: None,
        }
    }

    /// Filter this field on an argument matched against the same-named
    /// payload key
    pub fn filtered_by(self, argument: impl Into<String>) -> Self {
        let argument = argument.into();
        let payload_key = argument.clone();
        self.filtered_by_payload_key(argument, payload_key)
    }

    /// Filter this field on an argument matched against an explicit payload
    /// key
    pub fn filtered_by_payload_key(
        mut self,
        argument: impl Into<String>,
        payload_key: impl Into<String>,
    ) -> Self {
        self.filter = Some(FieldFilter {
            argument: argument.into(),
            payload_key: payload_key.into(),
        });
        self
    }
}

/// The set of subscription-root fields the fan-out engine resolves against
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSchema {
    fields: Vec<SubscriptionField>,
}

impl SubscriptionSchema {
    /// Build a schema from field descriptors
    pub fn new(fields: Vec<SubscriptionField>) -> Self {
        Self { fields }
    }

    /// All fields responding to a publish trigger, declaration order
    pub fn fields_for_trigger(&self, trigger: &str) -> Vec<&SubscriptionField> {
        self.fields
            .iter()
            .filter(|field| field.trigger == trigger)
            .collect()
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&SubscriptionField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// All declared fields
    pub fn fields(&self) -> &[SubscriptionField] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> SubscriptionSchema {
        SubscriptionSchema::new(vec![
            SubscriptionField::new("itemAdded", "itemAdded", "Item"),
            SubscriptionField::new("itemAddedToCategory", "itemAdded", "Item")
                .filtered_by("category"),
            SubscriptionField::new("noteAdded", "noteAdded", "Note"),
        ])
    }

    #[test]
    fn test_fields_for_trigger_groups_primary_and_filtered() {
        let schema = schema();
        let fields = schema.fields_for_trigger("itemAdded");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "itemAdded");
        assert!(fields[0].filter.is_none());
        assert_eq!(fields[1].name, "itemAddedToCategory");
        assert_eq!(
            fields[1].filter.as_ref().unwrap().argument,
            "category".to_string()
        );
    }

    #[test]
    fn test_unknown_trigger_matches_nothing() {
        assert!(schema().fields_for_trigger("commentAdded").is_empty());
    }

    #[test]
    fn test_field_lookup() {
        let schema = schema();
        assert_eq!(schema.field("noteAdded").unwrap().type_name, "Note");
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_filter_payload_key_defaults_to_argument_name() {
        let field = SubscriptionField::new("x", "x", "X").filtered_by("category");
        let filter = field.filter.unwrap();
        assert_eq!(filter.argument, "category");
        assert_eq!(filter.payload_key, "category");
    }
}
