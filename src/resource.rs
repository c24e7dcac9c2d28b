use std::collections::HashMap;

use thiserror::Error;

use crate::value::TemplateValue;

/// Handle for a resource declared by a template.
///
/// Evaluation never looks inside a resource; it only needs the identity
/// to hand to a [`ResourceAttributeResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    logical_id: String,
    resource_type: String,
}

impl Resource {
    pub fn new<S: Into<String>, T: Into<String>>(logical_id: S, resource_type: T) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
        }
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
}

/// Failure reported by a resolver that advertised an attribute but
/// could not produce its value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to resolve attribute {attribute} of {resource}: {message}")]
pub struct AttributeError {
    pub resource: String,
    pub attribute: String,
    pub message: String,
}

impl AttributeError {
    pub fn new<R, A, M>(resource: R, attribute: A, message: M) -> Self
    where
        R: Into<String>,
        A: Into<String>,
        M: Into<String>,
    {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

/// Fold the first character of an attribute name to lower case.
///
/// Attribute lookups run against lower-camel names regardless of how
/// the template spells them, so `Arn`, `DnsName` and `dnsName` address
/// the attributes `arn`, `dnsName` and `dnsName`. Resolvers must key
/// their tables by the normalized form.
pub fn normalize_attribute_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Read-side view of the computed attributes of live resources.
///
/// Implemented by whatever component tracks provisioned state.
/// Attribute names arrive already normalized, see
/// [`normalize_attribute_name`].
#[cfg_attr(test, mockall::automock)]
pub trait ResourceAttributeResolver: Send + Sync {
    /// Whether `resource` exposes an attribute under `attribute_name`.
    fn supports_attribute(&self, resource: &Resource, attribute_name: &str) -> bool;

    /// Current value of `attribute_name` on `resource`.
    fn resolve_attribute(
        &self,
        resource: &Resource,
        attribute_name: &str,
    ) -> Result<TemplateValue, AttributeError>;
}

/// Resolver backed by a plain in-memory attribute table, keyed by
/// logical id and normalized attribute name.
#[derive(Debug, Clone, Default)]
pub struct StaticAttributeResolver {
    attributes: HashMap<String, HashMap<String, TemplateValue>>,
}

impl StaticAttributeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under the resource's logical id. The attribute
    /// name is normalized on the way in.
    pub fn insert<R, A>(&mut self, logical_id: R, attribute_name: A, value: TemplateValue)
    where
        R: Into<String>,
        A: AsRef<str>,
    {
        self.attributes
            .entry(logical_id.into())
            .or_default()
            .insert(normalize_attribute_name(attribute_name.as_ref()), value);
    }
}

impl ResourceAttributeResolver for StaticAttributeResolver {
    fn supports_attribute(&self, resource: &Resource, attribute_name: &str) -> bool {
        self.attributes
            .get(resource.logical_id())
            .is_some_and(|known| known.contains_key(attribute_name))
    }

    fn resolve_attribute(
        &self,
        resource: &Resource,
        attribute_name: &str,
    ) -> Result<TemplateValue, AttributeError> {
        self.attributes
            .get(resource.logical_id())
            .and_then(|known| known.get(attribute_name))
            .cloned()
            .ok_or_else(|| {
                AttributeError::new(resource.logical_id(), attribute_name, "attribute not registered")
            })
    }
}
