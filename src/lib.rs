//! # Cirrus Formation: Template Intrinsic-Function Engine
//!
//! Cirrus Formation evaluates the intrinsic-function mini-language
//! embedded in declarative infrastructure templates. A template is a
//! JSON-like document tree; any scalar position may instead hold a
//! single-entry object naming a function (`Ref`, `Fn::If`, `Fn::Join`,
//! ...) whose arguments may themselves be functions. Evaluation
//! substitutes every call until only plain data remains.
//!
//! ## Components
//!
//! * Document nodes ([`value`]): the immutable tree values all
//!   functions consume and produce.
//! * Template context ([`template`]): references, conditions, mapping
//!   tables, declared resources and zone topology, read-only during a
//!   call.
//! * The function registry and driver ([`intrinsic`]): the closed set
//!   of function variants and the recursive walker that dispatches
//!   them.
//! * External seams ([`resource`]): the attribute resolver a live
//!   provisioner plugs in for `Fn::GetAtt`.
//! * Errors ([`error`]): validation failures, retryable not-ready
//!   signals and internal defects.
//!
//! ## Evaluation Pipeline
//!
//! ```text
//! Document tree → match (priority order) → validate → evaluate → plain data
//! ```
//!
//! Each node is probed against the function variants in a fixed
//! priority order; the first match is shape-validated, then evaluated,
//! with nested arguments resolved by recursion. Containers that are not
//! function calls recurse structurally; scalars pass through.
//!
//! ## Readiness and Retry
//!
//! Some referenced values are unknown while their resources are still
//! being provisioned elsewhere. The engine never waits: evaluation is
//! synchronous, performs no I/O and mutates nothing, and a dependency
//! that is declared but unresolved fails the call with a retryable
//! [`FunctionError::NotReady`]. The intended loop belongs to the
//! caller:
//!
//! 1. Evaluate the document against the current [`Template`] state.
//! 2. On `NotReady`, wait for the provisioner to mark progress
//!    ([`Template::mark_resource_ready`] /
//!    [`Template::mark_condition_ready`]) and evaluate again.
//! 3. Any other error is terminal for the template.
//!
//! Re-evaluation is idempotent: identical template state yields an
//! identical result tree, so retrying needs no coordination beyond
//! calling again.
//!
//! ## Example
//!
//! ```
//! use cirrus_formation::{evaluate_functions, Template, TemplateValue};
//!
//! let mut template = Template::new();
//! template.add_parameter("Environment", TemplateValue::from("staging"));
//!
//! let document: TemplateValue =
//!     serde_json::from_str(r#"{"Fn::Join": ["-", ["app", {"Ref": "Environment"}]]}"#).unwrap();
//! let resolved = evaluate_functions(&document, &template).unwrap();
//! assert_eq!(resolved, TemplateValue::from("app-staging"));
//! ```

pub mod error;
pub mod intrinsic;
pub mod resource;
pub mod template;
pub mod value;

// Re-exports
pub use error::{DependencyKind, FunctionError, FunctionResult};
pub use intrinsic::{
    evaluate_boolean, evaluate_functions, represents_boolean_function, validate_functions,
    IntrinsicFunction,
};
pub use resource::{
    normalize_attribute_name, AttributeError, Resource, ResourceAttributeResolver,
    StaticAttributeResolver,
};
pub use template::{
    Condition, PseudoParameters, Reference, ReferenceKind, Template, TemplateError,
};
pub use value::TemplateValue;
