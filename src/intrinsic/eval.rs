//! The recursive driver that resolves a whole document tree.
//!
//! [`evaluate_functions`] is where the registry meets the document: each
//! node is probed against the variants in priority order, the first
//! match is validated and evaluated, and plain containers fall back to
//! structural recursion. The helpers [`represents_boolean_function`]
//! and [`evaluate_boolean`] are stateless predicates layered on the
//! same matchers.

use strum::IntoEnumIterator;
use tracing::debug;

use crate::error::{FunctionError, FunctionResult};
use crate::intrinsic::function::IntrinsicFunction;
use crate::template::Template;
use crate::value::TemplateValue;

/// Resolve every intrinsic function in `node` against `template`,
/// producing a pure-data tree.
///
/// The call is read-only on both inputs and allocates its result fresh,
/// so re-running it with the same template state returns an identical
/// tree. A [`FunctionError::NotReady`] means a dependency has not been
/// provisioned yet and the same call may succeed later; every other
/// error is terminal for the template.
#[tracing::instrument(level = "debug", skip_all)]
pub fn evaluate_functions(
    node: &TemplateValue,
    template: &Template,
) -> FunctionResult<TemplateValue> {
    for function in IntrinsicFunction::iter() {
        let match_result = function.evaluate_match(node);
        if match_result.is_match() {
            debug!(function = %function, "intrinsic function matched");
            let validate_result = function.validate_arg_types(match_result)?;
            // Variants evaluate their own arguments recursively, so the
            // returned node needs no further passes.
            return function.evaluate_function(validate_result, template);
        }
    }
    match node {
        TemplateValue::Array(items) => {
            let evaluated: FunctionResult<Vec<TemplateValue>> = items
                .iter()
                .map(|item| evaluate_functions(item, template))
                .collect();
            Ok(TemplateValue::Array(evaluated?))
        }
        TemplateValue::Object(entries) => {
            let mut evaluated = indexmap::IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                evaluated.insert(key.clone(), evaluate_functions(value, template)?);
            }
            Ok(TemplateValue::Object(evaluated))
        }
        scalar => Ok(scalar.clone()),
    }
}

/// Check the shape of every function call in `node` without touching
/// readiness state.
///
/// This is the load-time pre-flight: it runs the match and validate
/// phases at every depth, descends into *both* branches of `Fn::If`,
/// and rejects unsupported `Fn:`-prefixed names outright. A template
/// that passes can still fail evaluation later (missing dependencies,
/// type errors only visible after substitution), but its call shapes
/// are known well-formed.
#[tracing::instrument(level = "debug", skip_all)]
pub fn validate_functions(node: &TemplateValue) -> FunctionResult<()> {
    for function in IntrinsicFunction::iter() {
        let match_result = function.evaluate_match(node);
        if match_result.is_match() {
            if function == IntrinsicFunction::Unknown {
                // Evaluation would fail on this node whenever it is
                // reached; a bad name is knowable now. A null node is
                // the marker match with nothing beneath it to check.
                if let Some(key) = node.as_object().and_then(|entries| entries.keys().next()) {
                    return Err(FunctionError::UnsupportedFunction(key.clone()));
                }
                return Ok(());
            }
            function.validate_arg_types(match_result)?;
            break;
        }
    }
    match node {
        TemplateValue::Array(items) => {
            items.iter().try_for_each(validate_functions)
        }
        TemplateValue::Object(entries) => {
            entries.values().try_for_each(validate_functions)
        }
        _ => Ok(()),
    }
}

/// Whether `node` is shaped like one of the boolean-producing functions
/// (`Condition`, `Fn::Equals`, `Fn::And`, `Fn::Or`, `Fn::Not`).
///
/// A literal `"true"` or a `Ref` to a boolean-valued parameter is *not*
/// a boolean function; `Fn::And`/`Fn::Or`/`Fn::Not` arguments must be
/// nested function objects.
pub fn represents_boolean_function(node: &TemplateValue) -> bool {
    IntrinsicFunction::iter()
        .filter(IntrinsicFunction::is_boolean_function)
        .any(|function| function.evaluate_match(node).is_match())
}

/// Read a resolved node as a boolean.
///
/// Only the exact texts `"true"` and `"false"` qualify; anything else
/// is a validation error naming the offending node.
// TODO: decide whether a non-boolean text here should instead coerce to
// false; the error keeps templates honest but may be stricter than the
// upstream platform.
pub fn evaluate_boolean(node: &TemplateValue) -> FunctionResult<bool> {
    match node.as_text() {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        _ => Err(FunctionError::validation(format!(
            "invalid boolean value {node}"
        ))),
    }
}
