use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::resource::{Resource, ResourceAttributeResolver, StaticAttributeResolver};
use crate::value::TemplateValue;

/// Reference name for the current deployment region.
pub const PSEUDO_REGION: &str = "AWS::Region";
/// Reference name for the owning account id.
pub const PSEUDO_ACCOUNT_ID: &str = "AWS::AccountId";
/// Reference name for the stack name.
pub const PSEUDO_STACK_NAME: &str = "AWS::StackName";
/// Reference name for the stack id.
pub const PSEUDO_STACK_ID: &str = "AWS::StackId";
/// Reference name for the stack's notification topic ARNs.
pub const PSEUDO_NOTIFICATION_ARNS: &str = "AWS::NotificationARNs";

pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors from the provisioner-facing mutation API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("no resource named {0} is declared in this template")]
    UnknownResource(String),
    #[error("no condition named {0} is declared in this template")]
    UnknownCondition(String),
}

/// What a named reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Resource,
    Parameter,
    Pseudo,
}

/// A named pointer to a resource identity, an input parameter or a
/// deployment-scoped pseudo parameter.
///
/// Parameters and pseudo parameters are born ready. Resource references
/// start pending and flip to ready exactly once, when the provisioner
/// reports the physical id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    kind: ReferenceKind,
    ready: bool,
    value: TemplateValue,
}

impl Reference {
    pub fn pending(kind: ReferenceKind) -> Self {
        Self {
            kind,
            ready: false,
            value: TemplateValue::Null,
        }
    }

    pub fn resolved(kind: ReferenceKind, value: TemplateValue) -> Self {
        Self {
            kind,
            ready: true,
            value,
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Resolved value. Null until [`Reference::is_ready`] reports true.
    pub fn value(&self) -> &TemplateValue {
        &self.value
    }

    fn resolve(&mut self, value: TemplateValue) {
        self.ready = true;
        self.value = value;
    }
}

/// A named boolean outcome shared across the template.
///
/// The stored value uses the document boolean encoding, so a ready
/// condition always holds the text `"true"` or `"false"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    ready: bool,
    value: TemplateValue,
}

impl Condition {
    pub fn pending() -> Self {
        Self {
            ready: false,
            value: TemplateValue::Null,
        }
    }

    pub fn resolved(outcome: bool) -> Self {
        Self {
            ready: true,
            value: TemplateValue::from(outcome),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn value(&self) -> &TemplateValue {
        &self.value
    }

    fn resolve(&mut self, outcome: bool) {
        self.ready = true;
        self.value = TemplateValue::from(outcome);
    }
}

/// Deployment-scoped values exposed to templates as `AWS::*` references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PseudoParameters {
    pub region: String,
    pub account_id: String,
    pub stack_name: String,
    pub stack_id: String,
    pub notification_arns: Vec<String>,
}

impl Default for PseudoParameters {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: String::new(),
            stack_name: String::new(),
            stack_id: String::new(),
            notification_arns: Vec::new(),
        }
    }
}

/// Everything evaluation reads: the reference and condition maps, the
/// mappings section, declared resources and the zone topology.
///
/// A template is immutable while an evaluation call runs; the borrow
/// rules enforce that, since evaluation borrows it shared and the
/// readiness API below needs it exclusive. The expected loop looks
/// like: evaluate, collect `NotReady` errors, let the provisioner call
/// [`Template::mark_resource_ready`] / [`Template::mark_condition_ready`]
/// as entities come up, evaluate again. Re-evaluating already-resolved
/// documents is safe; function-free trees pass through untouched, so
/// the loop converges instead of compounding.
#[derive(Clone)]
pub struct Template {
    reference_map: HashMap<String, Reference>,
    condition_map: HashMap<String, Condition>,
    mappings: HashMap<String, HashMap<String, HashMap<String, TemplateValue>>>,
    resource_map: HashMap<String, Resource>,
    availability_zones: HashMap<String, Vec<String>>,
    attribute_resolver: Arc<dyn ResourceAttributeResolver>,
}

impl Template {
    /// Empty context. `Fn::GetAtt` lookups fail their support check
    /// until a real resolver is attached via [`Template::with_resolver`].
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(StaticAttributeResolver::new()))
    }

    pub fn with_resolver(attribute_resolver: Arc<dyn ResourceAttributeResolver>) -> Self {
        Self {
            reference_map: HashMap::new(),
            condition_map: HashMap::new(),
            mappings: HashMap::new(),
            resource_map: HashMap::new(),
            availability_zones: HashMap::new(),
            attribute_resolver,
        }
    }

    // --- load-time registration -----------------------------------------

    /// Register an input parameter. Parameters carry their value from
    /// the start, so the reference is ready immediately.
    pub fn add_parameter<S: Into<String>>(&mut self, name: S, value: TemplateValue) {
        self.reference_map.insert(
            name.into(),
            Reference::resolved(ReferenceKind::Parameter, value),
        );
    }

    /// Declare a resource. Its reference starts pending and resolves
    /// when the provisioner reports the physical id.
    pub fn declare_resource(&mut self, resource: Resource) {
        let name = resource.logical_id().to_string();
        self.reference_map
            .insert(name.clone(), Reference::pending(ReferenceKind::Resource));
        self.resource_map.insert(name, resource);
    }

    /// Declare a named condition with no outcome yet.
    pub fn declare_condition<S: Into<String>>(&mut self, name: S) {
        self.condition_map.insert(name.into(), Condition::pending());
    }

    /// Record one `map/key/attribute` cell of the mappings section.
    pub fn insert_mapping<M, K, A>(&mut self, map_name: M, key: K, attribute: A, value: TemplateValue)
    where
        M: Into<String>,
        K: Into<String>,
        A: Into<String>,
    {
        self.mappings
            .entry(map_name.into())
            .or_default()
            .entry(key.into())
            .or_default()
            .insert(attribute.into(), value);
    }

    /// Record the zone list `Fn::GetAZs` answers for `region`.
    pub fn set_availability_zones<S: Into<String>>(&mut self, region: S, zones: Vec<String>) {
        self.availability_zones.insert(region.into(), zones);
    }

    /// Seed the `AWS::*` references for one deployment. All of them are
    /// ready from the start.
    pub fn seed_pseudo_parameters(&mut self, pseudo: &PseudoParameters) {
        let mut seed = |name: &str, value: TemplateValue| {
            self.reference_map
                .insert(name.to_string(), Reference::resolved(ReferenceKind::Pseudo, value));
        };
        seed(PSEUDO_REGION, TemplateValue::from(pseudo.region.clone()));
        seed(PSEUDO_ACCOUNT_ID, TemplateValue::from(pseudo.account_id.clone()));
        seed(PSEUDO_STACK_NAME, TemplateValue::from(pseudo.stack_name.clone()));
        seed(PSEUDO_STACK_ID, TemplateValue::from(pseudo.stack_id.clone()));
        seed(
            PSEUDO_NOTIFICATION_ARNS,
            TemplateValue::Array(
                pseudo
                    .notification_arns
                    .iter()
                    .map(|arn| TemplateValue::from(arn.clone()))
                    .collect(),
            ),
        );
    }

    // --- provisioner API ------------------------------------------------

    /// Resolve a declared resource reference with its physical value.
    pub fn mark_resource_ready<V: Into<TemplateValue>>(
        &mut self,
        name: &str,
        value: V,
    ) -> TemplateResult<()> {
        match self.reference_map.get_mut(name) {
            Some(reference) if reference.kind() == ReferenceKind::Resource => {
                debug!(resource = %name, "resource reference resolved");
                reference.resolve(value.into());
                Ok(())
            }
            _ => Err(TemplateError::UnknownResource(name.to_string())),
        }
    }

    /// Resolve a declared condition with its boolean outcome.
    pub fn mark_condition_ready(&mut self, name: &str, outcome: bool) -> TemplateResult<()> {
        match self.condition_map.get_mut(name) {
            Some(condition) => {
                debug!(condition = %name, outcome, "condition resolved");
                condition.resolve(outcome);
                Ok(())
            }
            None => Err(TemplateError::UnknownCondition(name.to_string())),
        }
    }

    // --- evaluation reads -----------------------------------------------

    pub fn reference(&self, name: &str) -> Option<&Reference> {
        self.reference_map.get(name)
    }

    pub fn condition(&self, name: &str) -> Option<&Condition> {
        self.condition_map.get(name)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resource_map.get(name)
    }

    pub fn has_mapping(&self, map_name: &str) -> bool {
        self.mappings.contains_key(map_name)
    }

    pub fn mapping_value(&self, map_name: &str, key: &str, attribute: &str) -> Option<&TemplateValue> {
        self.mappings
            .get(map_name)?
            .get(key)?
            .get(attribute)
    }

    pub fn availability_zones(&self, region: &str) -> Option<&[String]> {
        self.availability_zones.get(region).map(Vec::as_slice)
    }

    pub fn attribute_resolver(&self) -> &dyn ResourceAttributeResolver {
        self.attribute_resolver.as_ref()
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parameter_is_ready_immediately() {
        let mut template = Template::new();
        template.add_parameter("Environment", TemplateValue::from("staging"));

        let reference = template.reference("Environment").unwrap();
        assert!(reference.is_ready());
        assert_eq!(reference.kind(), ReferenceKind::Parameter);
        assert_eq!(reference.value(), &TemplateValue::from("staging"));
    }

    #[test]
    fn test_resource_reference_lifecycle() {
        let mut template = Template::new();
        template.declare_resource(Resource::new("Vpc", "AWS::EC2::VPC"));

        let reference = template.reference("Vpc").unwrap();
        assert!(!reference.is_ready());
        assert_eq!(reference.kind(), ReferenceKind::Resource);
        assert_eq!(reference.value(), &TemplateValue::Null);

        template.mark_resource_ready("Vpc", "vpc-0a1b2c").unwrap();
        let reference = template.reference("Vpc").unwrap();
        assert!(reference.is_ready());
        assert_eq!(reference.value(), &TemplateValue::from("vpc-0a1b2c"));
    }

    #[test]
    fn test_mark_resource_ready_rejects_undeclared_names() {
        let mut template = Template::new();
        template.add_parameter("Environment", TemplateValue::from("staging"));

        // A parameter name is not a resource name.
        let error = template.mark_resource_ready("Environment", "x").unwrap_err();
        assert_eq!(error, TemplateError::UnknownResource("Environment".to_string()));

        let error = template.mark_resource_ready("Missing", "x").unwrap_err();
        assert_eq!(
            error.to_string(),
            "no resource named Missing is declared in this template"
        );
    }

    #[test]
    fn test_condition_lifecycle() {
        let mut template = Template::new();
        template.declare_condition("IsProd");

        assert!(!template.condition("IsProd").unwrap().is_ready());

        template.mark_condition_ready("IsProd", true).unwrap();
        let condition = template.condition("IsProd").unwrap();
        assert!(condition.is_ready());
        assert_eq!(condition.value(), &TemplateValue::from(true));

        let error = template.mark_condition_ready("Missing", false).unwrap_err();
        assert_eq!(
            error.to_string(),
            "no condition named Missing is declared in this template"
        );
    }

    #[test]
    fn test_mapping_cells() {
        let mut template = Template::new();
        template.insert_mapping("RegionMap", "us-east-1", "Ami", TemplateValue::from("ami-123"));

        assert!(template.has_mapping("RegionMap"));
        assert!(!template.has_mapping("SizeMap"));
        assert_eq!(
            template.mapping_value("RegionMap", "us-east-1", "Ami"),
            Some(&TemplateValue::from("ami-123"))
        );
        assert_eq!(template.mapping_value("RegionMap", "us-east-1", "Vpc"), None);
        assert_eq!(template.mapping_value("RegionMap", "eu-west-1", "Ami"), None);
    }

    #[test]
    fn test_pseudo_parameters_seeding() {
        let mut template = Template::new();
        let pseudo = PseudoParameters {
            region: "eu-central-1".to_string(),
            account_id: "123456789012".to_string(),
            stack_name: "edge".to_string(),
            stack_id: "arn:aws:cloudformation:eu-central-1:123456789012:stack/edge/1".to_string(),
            notification_arns: vec!["arn:aws:sns:eu-central-1:123456789012:ops".to_string()],
        };
        template.seed_pseudo_parameters(&pseudo);

        let region = template.reference(PSEUDO_REGION).unwrap();
        assert!(region.is_ready());
        assert_eq!(region.kind(), ReferenceKind::Pseudo);
        assert_eq!(region.value(), &TemplateValue::from("eu-central-1"));

        let arns = template.reference(PSEUDO_NOTIFICATION_ARNS).unwrap();
        assert_eq!(
            arns.value(),
            &TemplateValue::from(vec![TemplateValue::from(
                "arn:aws:sns:eu-central-1:123456789012:ops"
            )])
        );
    }

    #[test]
    fn test_pseudo_parameters_deserialization_defaults() {
        let pseudo: PseudoParameters = serde_json::from_str(r#"{"region": "ap-south-1"}"#).unwrap();
        assert_eq!(pseudo.region, "ap-south-1");
        assert_eq!(pseudo.account_id, "");
        assert!(pseudo.notification_arns.is_empty());

        let pseudo: PseudoParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(pseudo.region, "us-east-1");
    }

    #[test]
    fn test_availability_zones() {
        let mut template = Template::new();
        template.set_availability_zones(
            "us-east-1",
            vec!["us-east-1a".to_string(), "us-east-1b".to_string()],
        );

        assert_eq!(
            template.availability_zones("us-east-1"),
            Some(&["us-east-1a".to_string(), "us-east-1b".to_string()][..])
        );
        assert_eq!(template.availability_zones("mars-north-1"), None);
    }
}
