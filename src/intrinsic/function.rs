//! The closed set of intrinsic functions and their three-phase protocol.
//!
//! Every variant answers the same four questions: does a node *match* my
//! shape, are the argument types *valid* where that can be told without
//! evaluating, what does the node *evaluate* to, and am I a boolean
//! function. The phases hand ephemeral [`MatchResult`] / [`ValidateResult`]
//! carriers to each other; a carrier is only good for the variant that
//! produced it, and feeding it to another variant is a defect in the
//! evaluator, not in the template (see [`IntrinsicFunction::validate_arg_types`]).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

use crate::error::{DependencyKind, FunctionError, FunctionResult};
use crate::intrinsic::eval::{evaluate_boolean, evaluate_functions, represents_boolean_function};
use crate::resource::normalize_attribute_name;
use crate::template::{ReferenceKind, Template};
use crate::value::TemplateValue;

/// Object key naming a reference.
pub const REF_KEY: &str = "Ref";
/// Object key naming a condition lookup.
pub const CONDITION_KEY: &str = "Condition";
/// The reference name that means "omit this value".
pub const AWS_NO_VALUE: &str = "AWS::NoValue";
/// Prefix shared by every `Fn::*` function key.
pub const FN_PREFIX: &str = "Fn:";

/// The intrinsic functions a template may call, in dispatch priority
/// order.
///
/// Declaration order is load-bearing: [`strum::IntoEnumIterator`] yields
/// variants in this order, and the evaluation driver takes the first
/// variant whose shape matches. `NoValue` must be probed before `Ref`
/// (both match a `{"Ref": ...}` object) and `Unknown` last (it matches
/// any remaining `Fn:`-prefixed key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, AsRefStr)]
pub enum IntrinsicFunction {
    /// `{"Ref": "AWS::NoValue"}` or a null node; evaluates to itself.
    #[strum(serialize = "AWS::NoValue")]
    NoValue,
    /// `{"Ref": name}`; evaluates to the named reference's value.
    #[strum(serialize = "Ref")]
    Ref,
    /// `{"Condition": name}`; evaluates to the named condition's outcome.
    #[strum(serialize = "Condition")]
    Condition,
    /// `{"Fn::If": [condition, then, else]}`.
    #[strum(serialize = "Fn::If")]
    If,
    /// `{"Fn::Equals": [a, b]}`.
    #[strum(serialize = "Fn::Equals")]
    Equals,
    /// `{"Fn::And": [bool-fn, ...]}`, 2 to 10 arguments.
    #[strum(serialize = "Fn::And")]
    And,
    /// `{"Fn::Or": [bool-fn, ...]}`, 2 to 10 arguments.
    #[strum(serialize = "Fn::Or")]
    Or,
    /// `{"Fn::Not": [bool-fn]}`.
    #[strum(serialize = "Fn::Not")]
    Not,
    /// `{"Fn::FindInMap": [map, key, attribute]}`.
    #[strum(serialize = "Fn::FindInMap")]
    FindInMap,
    /// `{"Fn::Base64": text}`.
    #[strum(serialize = "Fn::Base64")]
    Base64,
    /// `{"Fn::Select": [index, list]}`.
    #[strum(serialize = "Fn::Select")]
    Select,
    /// `{"Fn::Join": [delimiter, list]}`.
    #[strum(serialize = "Fn::Join")]
    Join,
    /// `{"Fn::GetAZs": region}`.
    #[strum(serialize = "Fn::GetAZs")]
    GetAzs,
    /// `{"Fn::GetAtt": [resource, attribute]}`.
    #[strum(serialize = "Fn::GetAtt")]
    GetAtt,
    /// Any other `Fn:`-prefixed key; always an error when evaluated.
    #[strum(serialize = "Unknown")]
    Unknown,
}

/// Outcome of probing one node against one variant's shape.
///
/// Lives only long enough to be handed to
/// [`IntrinsicFunction::validate_arg_types`] on the variant that produced
/// it.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    node: &'a TemplateValue,
    matched: bool,
    function: IntrinsicFunction,
}

impl<'a> MatchResult<'a> {
    pub fn is_match(&self) -> bool {
        self.matched
    }

    pub fn node(&self) -> &'a TemplateValue {
        self.node
    }

    pub fn function(&self) -> IntrinsicFunction {
        self.function
    }
}

/// A node whose argument shapes passed validation, ready for
/// [`IntrinsicFunction::evaluate_function`] on the same variant.
#[derive(Debug, Clone, Copy)]
pub struct ValidateResult<'a> {
    node: &'a TemplateValue,
    function: IntrinsicFunction,
}

impl<'a> ValidateResult<'a> {
    pub fn node(&self) -> &'a TemplateValue {
        self.node
    }

    pub fn function(&self) -> IntrinsicFunction {
        self.function
    }
}

/// Stand-in for an absent function argument.
static NULL_NODE: TemplateValue = TemplateValue::Null;

/// The sole key/value entry of a single-entry object, if that is what
/// `node` is.
fn single_entry(node: &TemplateValue) -> Option<(&str, &TemplateValue)> {
    let entries = node.as_object()?;
    if entries.len() != 1 {
        return None;
    }
    entries.iter().next().map(|(key, value)| (key.as_str(), value))
}

impl IntrinsicFunction {
    /// The object key this variant dispatches on, where it has one.
    fn key(&self) -> Option<&str> {
        match self {
            IntrinsicFunction::NoValue | IntrinsicFunction::Ref => Some(REF_KEY),
            IntrinsicFunction::Condition => Some(CONDITION_KEY),
            IntrinsicFunction::Unknown => None,
            other => Some(other.as_ref()),
        }
    }

    /// Probe `node` against this variant's shape. Never fails; the
    /// carrier records whether the shape matched.
    pub fn evaluate_match<'a>(&self, node: &'a TemplateValue) -> MatchResult<'a> {
        let matched = match self {
            IntrinsicFunction::NoValue => {
                node.is_null()
                    || single_entry(node).is_some_and(|(key, value)| {
                        key == REF_KEY && value.as_text() == Some(AWS_NO_VALUE)
                    })
            }
            IntrinsicFunction::Unknown => {
                // Any function key that survived the variants above.
                node.is_null()
                    || single_entry(node).is_some_and(|(key, _)| key.starts_with(FN_PREFIX))
            }
            other => {
                let wanted = other.key().unwrap_or_default();
                single_entry(node).is_some_and(|(key, _)| key == wanted)
            }
        };
        MatchResult {
            node,
            matched,
            function: *self,
        }
    }

    /// Whether this variant produces a boolean, making it acceptable as
    /// an argument to `Fn::And` / `Fn::Or` / `Fn::Not`.
    pub fn is_boolean_function(&self) -> bool {
        matches!(
            self,
            IntrinsicFunction::Condition
                | IntrinsicFunction::Equals
                | IntrinsicFunction::And
                | IntrinsicFunction::Or
                | IntrinsicFunction::Not
        )
    }

    /// Check the argument shapes that are knowable without evaluating
    /// anything: arities, literal-string positions, boolean-function
    /// shapes. Argument *values* that may themselves be functions are
    /// deliberately left alone until evaluation.
    ///
    /// # Panics
    ///
    /// Panics if `match_result` did not match or was produced by a
    /// different variant. That pairing is under the evaluator's control,
    /// never the template author's, so it is a fatal defect rather than
    /// an error value.
    pub fn validate_arg_types<'a>(
        &self,
        match_result: MatchResult<'a>,
    ) -> FunctionResult<ValidateResult<'a>> {
        if !match_result.matched || match_result.function != *self {
            panic!(
                "match result for {} (matched: {}) used to validate {}",
                match_result.function, match_result.matched, self
            );
        }
        let node = match_result.node;
        match self {
            IntrinsicFunction::NoValue
            | IntrinsicFunction::Base64
            | IntrinsicFunction::GetAzs
            | IntrinsicFunction::Unknown => {}
            IntrinsicFunction::Ref => {
                let value = self.argument(node);
                if value.as_text().is_none() {
                    return Err(FunctionError::validation(
                        "All References must be of type string",
                    ));
                }
            }
            IntrinsicFunction::Condition => {
                let value = self.argument(node);
                if value.as_text().is_none() {
                    return Err(FunctionError::validation(
                        "All Conditions must be of type string",
                    ));
                }
            }
            IntrinsicFunction::If => {
                // Literal array: no function returns [condition-name, a, b].
                let args = self.argument(node).as_array().unwrap_or_default();
                if args.first().and_then(TemplateValue::as_text).is_none() {
                    return Err(FunctionError::validation(
                        "Fn::If requires a list argument with the first element being a condition",
                    ));
                }
                if args.len() != 3 {
                    return Err(FunctionError::validation(
                        "Fn::If requires a list argument with three elements",
                    ));
                }
            }
            IntrinsicFunction::Equals => {
                let args = self.argument(node).as_array().unwrap_or_default();
                if args.len() != 2 {
                    return Err(FunctionError::validation(
                        "Fn::Equals requires a list argument with two elements",
                    ));
                }
            }
            IntrinsicFunction::And | IntrinsicFunction::Or => {
                let args = self.argument(node).as_array().unwrap_or_default();
                let message = format!(
                    "every {self} object requires a list of at least 2 and at most 10 boolean parameters."
                );
                if args.len() < 2 || args.len() > 10 {
                    return Err(FunctionError::validation(message));
                }
                for arg in args {
                    if arg.as_object().is_none() || !represents_boolean_function(arg) {
                        return Err(FunctionError::validation(message.clone()));
                    }
                }
            }
            IntrinsicFunction::Not => {
                let args = self.argument(node).as_array().unwrap_or_default();
                if args.len() != 1 {
                    return Err(FunctionError::validation(
                        "Fn::Not requires a list argument with one element",
                    ));
                }
                let arg = &args[0];
                if arg.as_object().is_none() || !represents_boolean_function(arg) {
                    return Err(FunctionError::validation(
                        "Fn::Not requires a list argument with one function token",
                    ));
                }
            }
            IntrinsicFunction::FindInMap => {
                // Literal 3-element array; the elements themselves may be
                // functions, so their types wait for evaluation.
                let args = self.argument(node).as_array().unwrap_or_default();
                if args.len() != 3 {
                    return Err(FunctionError::validation(
                        "every Fn::FindInMap object requires three parameters, the map name, \
                         map key and the attribute for return value",
                    ));
                }
            }
            IntrinsicFunction::Select => {
                let args = self.argument(node).as_array().unwrap_or_default();
                if args.is_empty() {
                    return Err(FunctionError::validation(
                        "Fn::Select requires a list argument with a valid index value as its first element",
                    ));
                }
            }
            IntrinsicFunction::Join => {
                let args = self.argument(node).as_array().unwrap_or_default();
                if args.len() != 2 {
                    return Err(FunctionError::validation(join_parameter_message()));
                }
            }
            IntrinsicFunction::GetAtt => {
                // Both arguments are literal non-empty strings; GetAtt
                // never evaluates nested functions.
                let args = self.argument(node).as_array().unwrap_or_default();
                let both_non_empty = args.len() == 2
                    && args
                        .iter()
                        .all(|arg| arg.as_text().is_some_and(|text| !text.is_empty()));
                if !both_non_empty {
                    return Err(FunctionError::validation(
                        "every Fn::GetAtt object requires two non-empty parameters, \
                         the resource name and the resource attribute",
                    ));
                }
            }
        }
        Ok(ValidateResult {
            node,
            function: *self,
        })
    }

    /// Evaluate a validated node to its substituted value. Nested
    /// arguments are resolved by calling back into
    /// [`evaluate_functions`], so the returned node is fully resolved.
    ///
    /// # Panics
    ///
    /// Panics if `validate_result` was produced by a different variant,
    /// like [`IntrinsicFunction::validate_arg_types`].
    pub fn evaluate_function(
        &self,
        validate_result: ValidateResult<'_>,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        if validate_result.function != *self {
            panic!(
                "validate result for {} used to evaluate {}",
                validate_result.function, self
            );
        }
        let node = validate_result.node;
        debug!(function = %self, "evaluating intrinsic function");
        match self {
            IntrinsicFunction::NoValue => Ok(node.clone()),
            IntrinsicFunction::Ref => self.eval_ref(node, template),
            IntrinsicFunction::Condition => self.eval_condition(node, template),
            IntrinsicFunction::If => self.eval_if(node, template),
            IntrinsicFunction::Equals => self.eval_equals(node, template),
            IntrinsicFunction::And => self.eval_junction(node, template),
            IntrinsicFunction::Or => self.eval_junction(node, template),
            IntrinsicFunction::Not => self.eval_not(node, template),
            IntrinsicFunction::FindInMap => self.eval_find_in_map(node, template),
            IntrinsicFunction::Base64 => self.eval_base64(node, template),
            IntrinsicFunction::Select => self.eval_select(node, template),
            IntrinsicFunction::Join => self.eval_join(node, template),
            IntrinsicFunction::GetAzs => self.eval_get_azs(node, template),
            IntrinsicFunction::GetAtt => self.eval_get_att(node, template),
            IntrinsicFunction::Unknown => {
                let (key, _) = single_entry(node).ok_or_else(|| {
                    FunctionError::internal("unsupported-function marker evaluated without a function object")
                })?;
                Err(FunctionError::UnsupportedFunction(key.to_string()))
            }
        }
    }

    /// The value under this variant's function key. Only meaningful on a
    /// node this variant matched.
    fn argument<'a>(&self, node: &'a TemplateValue) -> &'a TemplateValue {
        single_entry(node)
            .map(|(_, value)| value)
            .unwrap_or(&NULL_NODE)
    }

    fn eval_ref(&self, node: &TemplateValue, template: &Template) -> FunctionResult<TemplateValue> {
        // Known to be textual from validate.
        let key = self.argument(node).as_text().unwrap_or_default();
        let reference = template.reference(key).ok_or_else(|| {
            FunctionError::validation(format!("unresolved resource dependency: {key}"))
        })?;
        if !reference.is_ready() {
            return Err(FunctionError::not_ready(DependencyKind::Reference, key));
        }
        Ok(reference.value().clone())
    }

    fn eval_condition(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let key = self.argument(node).as_text().unwrap_or_default();
        let condition = template.condition(key).ok_or_else(|| {
            FunctionError::validation(format!("unresolved condition dependency: {key}"))
        })?;
        if !condition.is_ready() {
            return Err(FunctionError::not_ready(DependencyKind::Condition, key));
        }
        Ok(condition.value().clone())
    }

    fn eval_if(&self, node: &TemplateValue, template: &Template) -> FunctionResult<TemplateValue> {
        let args = self.argument(node).as_array().unwrap_or_default();
        let key = args[0].as_text().unwrap_or_default();
        let condition = template.condition(key).ok_or_else(|| {
            FunctionError::validation(format!("unresolved condition dependency: {key}"))
        })?;
        if !condition.is_ready() {
            return Err(FunctionError::not_ready(DependencyKind::Condition, key));
        }
        let outcome = evaluate_boolean(condition.value())?;
        // Only the taken branch is evaluated. The other branch may name
        // references that never become ready on this path, and touching
        // it would fail an otherwise healthy template.
        let branch = if outcome { &args[1] } else { &args[2] };
        evaluate_functions(branch, template)
    }

    fn eval_equals(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let args = self.argument(node).as_array().unwrap_or_default();
        let left = evaluate_functions(&args[0], template)?;
        let right = evaluate_functions(&args[1], template)?;
        // TODO: confirm that a null operand should compare unequal even
        // to another null, rather than being an error.
        if left.is_null() || right.is_null() {
            return Ok(TemplateValue::from(false));
        }
        Ok(TemplateValue::from(left == right))
    }

    /// `Fn::And` / `Fn::Or`. Every argument is evaluated even once the
    /// outcome is decided, so a latent error in a later argument always
    /// surfaces instead of depending on its neighbors' values.
    fn eval_junction(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let args = self.argument(node).as_array().unwrap_or_default();
        let mut outcome = matches!(self, IntrinsicFunction::And);
        for arg in args {
            let evaluated = evaluate_functions(arg, template)?;
            let value = evaluate_boolean(&evaluated)?;
            outcome = match self {
                IntrinsicFunction::And => outcome && value,
                _ => outcome || value,
            };
        }
        Ok(TemplateValue::from(outcome))
    }

    fn eval_not(&self, node: &TemplateValue, template: &Template) -> FunctionResult<TemplateValue> {
        let args = self.argument(node).as_array().unwrap_or_default();
        let evaluated = evaluate_functions(&args[0], template)?;
        let value = evaluate_boolean(&evaluated)?;
        Ok(TemplateValue::from(!value))
    }

    fn eval_find_in_map(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let args = self.argument(node).as_array().unwrap_or_default();
        // The three elements may be functions; all of them must come out
        // textual.
        let map_name = evaluate_functions(&args[0], template)?;
        let map_key = evaluate_functions(&args[1], template)?;
        let attribute = evaluate_functions(&args[2], template)?;
        let (Some(map_name), Some(map_key), Some(attribute)) =
            (map_name.as_text(), map_key.as_text(), attribute.as_text())
        else {
            return Err(FunctionError::validation(
                "every Fn::FindInMap object requires three parameters, the map name, \
                 map key and the attribute for return value",
            ));
        };
        if !template.has_mapping(map_name) {
            return Err(FunctionError::validation(format!(
                "Mapping named '{map_name}' is not present in the 'Mappings' section of template"
            )));
        }
        template
            .mapping_value(map_name, map_key, attribute)
            .cloned()
            .ok_or_else(|| {
                FunctionError::validation(format!(
                    "Unable to get mapping for {map_name}::{map_key}::{attribute}"
                ))
            })
    }

    fn eval_base64(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let evaluated = evaluate_functions(self.argument(node), template)?;
        let text = evaluated.as_text().ok_or_else(|| {
            FunctionError::validation("every Fn::Base64 object must have a String-typed value.")
        })?;
        Ok(TemplateValue::Text(STANDARD.encode(text.as_bytes())))
    }

    fn eval_select(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let args = self.argument(node).as_array().unwrap_or_default();
        let index_message = "Fn::Select requires a list argument with a valid index value as its first element";
        let evaluated_index = evaluate_functions(&args[0], template)?;
        let index_text = evaluated_index
            .as_text()
            .ok_or_else(|| FunctionError::validation(index_message))?;
        // Signed parse: a negative index has to reach the range check
        // below so the error names it.
        let index: i64 = index_text
            .parse()
            .map_err(|_| FunctionError::validation(index_message))?;
        let arity_message =
            "Fn::Select requires a list argument with two elements: an integer index and a list";
        if args.len() != 2 {
            return Err(FunctionError::validation(arity_message));
        }
        let evaluated_list = evaluate_functions(&args[1], template)?;
        let items = evaluated_list
            .as_array()
            .ok_or_else(|| FunctionError::validation(arity_message))?;
        if index < 0 || index >= items.len() as i64 {
            return Err(FunctionError::validation(format!(
                "Fn::Select cannot select nonexistent value at index {index}"
            )));
        }
        Ok(items[index as usize].clone())
    }

    fn eval_join(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let args = self.argument(node).as_array().unwrap_or_default();
        // Both the delimiter and the list may be functions, GetAZs being
        // the canonical list producer.
        let delimiter_node = evaluate_functions(&args[0], template)?;
        let list_node = evaluate_functions(&args[1], template)?;
        let (Some(delimiter), Some(items)) = (delimiter_node.as_text(), list_node.as_array())
        else {
            return Err(FunctionError::validation(join_parameter_message()));
        };
        let mut joined = String::new();
        for (position, item) in items.iter().enumerate() {
            let text = item
                .as_text()
                .ok_or_else(|| FunctionError::validation(join_parameter_message()))?;
            if position > 0 {
                joined.push_str(delimiter);
            }
            joined.push_str(text);
        }
        Ok(TemplateValue::Text(joined))
    }

    fn eval_get_azs(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let evaluated = evaluate_functions(self.argument(node), template)?;
        let region = evaluated.as_text().ok_or_else(|| {
            FunctionError::validation("every Fn::GetAZs object must have a String-typed value.")
        })?;
        // An unknown region yields no zones rather than an error, the
        // same answer the upstream platform gives for regions it has
        // never heard of.
        let zones = template.availability_zones(region).unwrap_or_default();
        Ok(TemplateValue::Array(
            zones
                .iter()
                .map(|zone| TemplateValue::from(zone.clone()))
                .collect(),
        ))
    }

    fn eval_get_att(
        &self,
        node: &TemplateValue,
        template: &Template,
    ) -> FunctionResult<TemplateValue> {
        let args = self.argument(node).as_array().unwrap_or_default();
        // Both known textual and non-empty from validate.
        let resource_name = args[0].as_text().unwrap_or_default();
        let declared_resource = template
            .resource(resource_name)
            .zip(template.reference(resource_name))
            .filter(|(_, reference)| reference.kind() == ReferenceKind::Resource);
        let Some((resource, reference)) = declared_resource else {
            return Err(FunctionError::validation(format!(
                "instance of Fn::GetAtt references undefined resource {resource_name}"
            )));
        };
        if !reference.is_ready() {
            return Err(FunctionError::not_ready(
                DependencyKind::Reference,
                resource_name,
            ));
        }
        let attribute_name = normalize_attribute_name(args[1].as_text().unwrap_or_default());
        let resolver = template.attribute_resolver();
        if !resolver.supports_attribute(resource, &attribute_name) {
            return Err(FunctionError::validation(format!(
                "resource {resource_name} does not support attribute type {attribute_name} in Fn::GetAtt"
            )));
        }
        resolver
            .resolve_attribute(resource, &attribute_name)
            .map_err(|error| FunctionError::internal(error.to_string()))
    }
}

fn join_parameter_message() -> &'static str {
    "every Fn::Join object requires two parameters, (1) a string delimiter and (2) a list \
     of strings to be joined or a function that returns a list of strings (such as \
     Fn::GetAZs) to be joined."
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    fn node(raw: serde_json::Value) -> TemplateValue {
        TemplateValue::from(raw)
    }

    #[test]
    fn test_priority_order_is_declaration_order() {
        let order: Vec<IntrinsicFunction> = IntrinsicFunction::iter().collect();
        assert_eq!(order.first(), Some(&IntrinsicFunction::NoValue));
        assert_eq!(order.last(), Some(&IntrinsicFunction::Unknown));
        assert_eq!(order.len(), 15);
        // NoValue shadows Ref shapes, so it must come first of the two.
        let no_value_position = order
            .iter()
            .position(|f| *f == IntrinsicFunction::NoValue)
            .unwrap();
        let ref_position = order.iter().position(|f| *f == IntrinsicFunction::Ref).unwrap();
        assert!(no_value_position < ref_position);
    }

    #[test]
    fn test_function_names() {
        assert_eq!(IntrinsicFunction::Ref.as_ref(), "Ref");
        assert_eq!(IntrinsicFunction::GetAzs.as_ref(), "Fn::GetAZs");
        assert_eq!(IntrinsicFunction::FindInMap.to_string(), "Fn::FindInMap");
        assert_eq!(
            "Fn::If".parse::<IntrinsicFunction>().unwrap(),
            IntrinsicFunction::If
        );
    }

    #[test]
    fn test_no_value_matches_null_and_marker_object() {
        assert!(IntrinsicFunction::NoValue
            .evaluate_match(&TemplateValue::Null)
            .is_match());
        assert!(IntrinsicFunction::NoValue
            .evaluate_match(&node(json!({"Ref": "AWS::NoValue"})))
            .is_match());
        assert!(!IntrinsicFunction::NoValue
            .evaluate_match(&node(json!({"Ref": "Vpc"})))
            .is_match());
        assert!(!IntrinsicFunction::NoValue
            .evaluate_match(&node(json!({"Ref": "AWS::NoValue", "Extra": 1})))
            .is_match());
    }

    #[test]
    fn test_ref_matches_any_ref_value_shape() {
        assert!(IntrinsicFunction::Ref
            .evaluate_match(&node(json!({"Ref": "Vpc"})))
            .is_match());
        // Shape matches even when the value is not textual; validate
        // rejects it later.
        assert!(IntrinsicFunction::Ref
            .evaluate_match(&node(json!({"Ref": ["x"]})))
            .is_match());
        assert!(!IntrinsicFunction::Ref
            .evaluate_match(&node(json!({"Ref": "Vpc", "Other": "y"})))
            .is_match());
        assert!(!IntrinsicFunction::Ref
            .evaluate_match(&node(json!("Ref")))
            .is_match());
    }

    #[test]
    fn test_unknown_matches_fn_prefixed_keys_and_null() {
        assert!(IntrinsicFunction::Unknown
            .evaluate_match(&node(json!({"Fn::Reverse": []})))
            .is_match());
        // Null reports a match as a non-error marker; dispatch never
        // reaches it because NoValue wins.
        assert!(IntrinsicFunction::Unknown
            .evaluate_match(&TemplateValue::Null)
            .is_match());
        assert!(!IntrinsicFunction::Unknown
            .evaluate_match(&node(json!({"Properties": {}})))
            .is_match());
    }

    #[test]
    fn test_boolean_function_subset() {
        let booleans: Vec<IntrinsicFunction> = IntrinsicFunction::iter()
            .filter(IntrinsicFunction::is_boolean_function)
            .collect();
        assert_eq!(
            booleans,
            vec![
                IntrinsicFunction::Condition,
                IntrinsicFunction::Equals,
                IntrinsicFunction::And,
                IntrinsicFunction::Or,
                IntrinsicFunction::Not,
            ]
        );
    }

    #[test]
    fn test_ref_validate_requires_text() {
        let document = node(json!({"Ref": ["not", "text"]}));
        let matched = IntrinsicFunction::Ref.evaluate_match(&document);
        let error = IntrinsicFunction::Ref.validate_arg_types(matched).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Template error: All References must be of type string"
        );
    }

    #[test]
    fn test_if_validate_messages() {
        let no_condition = node(json!({"Fn::If": [["oops"], "a", "b"]}));
        let matched = IntrinsicFunction::If.evaluate_match(&no_condition);
        let error = IntrinsicFunction::If.validate_arg_types(matched).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Template error: Fn::If requires a list argument with the first element being a condition"
        );

        let wrong_arity = node(json!({"Fn::If": ["C", "a"]}));
        let matched = IntrinsicFunction::If.evaluate_match(&wrong_arity);
        let error = IntrinsicFunction::If.validate_arg_types(matched).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Template error: Fn::If requires a list argument with three elements"
        );
    }

    #[test]
    fn test_and_validate_rejects_literals_and_bad_arity() {
        let cases = vec![
            json!({"Fn::And": [{"Condition": "C"}]}),
            json!({"Fn::And": ["true", {"Condition": "C"}]}),
            json!({"Fn::And": [{"Ref": "Flag"}, {"Condition": "C"}]}),
            json!({"Fn::And": "not-a-list"}),
        ];
        for raw in cases {
            let document = node(raw.clone());
            let matched = IntrinsicFunction::And.evaluate_match(&document);
            let error = IntrinsicFunction::And.validate_arg_types(matched).unwrap_err();
            assert_eq!(
                error.to_string(),
                "Template error: every Fn::And object requires a list of at least 2 \
                 and at most 10 boolean parameters.",
                "input: {raw}"
            );
        }
    }

    #[test]
    fn test_and_validate_accepts_ten_boolean_shapes() {
        let args: Vec<serde_json::Value> =
            (0..10).map(|i| json!({"Condition": format!("C{i}")})).collect();
        let document = node(json!({"Fn::And": args}));
        let matched = IntrinsicFunction::And.evaluate_match(&document);
        assert!(IntrinsicFunction::And.validate_arg_types(matched).is_ok());

        let args: Vec<serde_json::Value> =
            (0..11).map(|i| json!({"Condition": format!("C{i}")})).collect();
        let document = node(json!({"Fn::And": args}));
        let matched = IntrinsicFunction::And.evaluate_match(&document);
        assert!(IntrinsicFunction::And.validate_arg_types(matched).is_err());
    }

    #[test]
    fn test_not_validate_messages() {
        let wrong_arity = node(json!({"Fn::Not": []}));
        let matched = IntrinsicFunction::Not.evaluate_match(&wrong_arity);
        let error = IntrinsicFunction::Not.validate_arg_types(matched).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Template error: Fn::Not requires a list argument with one element"
        );

        let not_boolean = node(json!({"Fn::Not": ["true"]}));
        let matched = IntrinsicFunction::Not.evaluate_match(&not_boolean);
        let error = IntrinsicFunction::Not.validate_arg_types(matched).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Template error: Fn::Not requires a list argument with one function token"
        );
    }

    #[test]
    fn test_get_att_validate_requires_two_non_empty_strings() {
        let cases = vec![
            json!({"Fn::GetAtt": ["Only"]}),
            json!({"Fn::GetAtt": ["Vpc", ""]}),
            json!({"Fn::GetAtt": ["", "Arn"]}),
            json!({"Fn::GetAtt": ["Vpc", {"Ref": "AttrName"}]}),
            json!({"Fn::GetAtt": "Vpc.Arn"}),
        ];
        for raw in cases {
            let document = node(raw.clone());
            let matched = IntrinsicFunction::GetAtt.evaluate_match(&document);
            let error = IntrinsicFunction::GetAtt
                .validate_arg_types(matched)
                .unwrap_err();
            assert_eq!(
                error.to_string(),
                "Template error: every Fn::GetAtt object requires two non-empty parameters, \
                 the resource name and the resource attribute",
                "input: {raw}"
            );
        }
    }

    #[test]
    #[should_panic(expected = "used to validate")]
    fn test_validate_rejects_wrong_variant_carrier() {
        let document = node(json!({"Ref": "Vpc"}));
        let matched = IntrinsicFunction::Ref.evaluate_match(&document);
        let _ = IntrinsicFunction::Join.validate_arg_types(matched);
    }

    #[test]
    #[should_panic(expected = "used to validate")]
    fn test_validate_rejects_unmatched_carrier() {
        let document = node(json!("plain text"));
        let matched = IntrinsicFunction::Ref.evaluate_match(&document);
        assert!(!matched.is_match());
        let _ = IntrinsicFunction::Ref.validate_arg_types(matched);
    }

    #[test]
    #[should_panic(expected = "used to evaluate")]
    fn test_evaluate_rejects_wrong_variant_carrier() {
        let document = node(json!({"Ref": "Vpc"}));
        let matched = IntrinsicFunction::Ref.evaluate_match(&document);
        let validated = IntrinsicFunction::Ref.validate_arg_types(matched).unwrap();
        let template = Template::new();
        let _ = IntrinsicFunction::Base64.evaluate_function(validated, &template);
    }

    #[test]
    fn test_unknown_evaluate_always_fails() {
        let document = node(json!({"Fn::Reverse": ["abc"]}));
        let matched = IntrinsicFunction::Unknown.evaluate_match(&document);
        let validated = IntrinsicFunction::Unknown.validate_arg_types(matched).unwrap();
        let template = Template::new();
        let error = IntrinsicFunction::Unknown
            .evaluate_function(validated, &template)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Template Error: Encountered unsupported function: Fn::Reverse Supported functions \
             are: [Fn::Base64, Fn::GetAtt, Fn::GetAZs, Fn::Join, Fn::FindInMap, Fn::Select, Ref, \
             Fn::Equals, Fn::If, Fn::Not, Condition, Fn::And, Fn::Or]"
        );
    }

    #[test]
    fn test_get_att_passes_normalized_names_to_the_resolver() {
        use std::sync::Arc;

        use crate::resource::{MockResourceAttributeResolver, Resource};

        let mut resolver = MockResourceAttributeResolver::new();
        resolver
            .expect_supports_attribute()
            .withf(|resource, attribute| {
                resource.logical_id() == "Queue" && attribute == "queueArn"
            })
            .return_const(true);
        resolver
            .expect_resolve_attribute()
            .withf(|_, attribute| attribute == "queueArn")
            .returning(|_, _| Ok(TemplateValue::from("arn:aws:sqs:us-east-1:123:q")));

        let mut template = Template::with_resolver(Arc::new(resolver));
        template.declare_resource(Resource::new("Queue", "AWS::SQS::Queue"));
        template.mark_resource_ready("Queue", "q-url").unwrap();

        // Template spelling "QueueArn" reaches the resolver as "queueArn".
        let document = node(json!({"Fn::GetAtt": ["Queue", "QueueArn"]}));
        let matched = IntrinsicFunction::GetAtt.evaluate_match(&document);
        let validated = IntrinsicFunction::GetAtt.validate_arg_types(matched).unwrap();
        let result = IntrinsicFunction::GetAtt
            .evaluate_function(validated, &template)
            .unwrap();
        assert_eq!(result, node(json!("arn:aws:sqs:us-east-1:123:q")));
    }

    #[test]
    fn test_get_att_resolver_failure_is_internal() {
        use std::sync::Arc;

        use crate::resource::{AttributeError, MockResourceAttributeResolver, Resource};

        let mut resolver = MockResourceAttributeResolver::new();
        resolver.expect_supports_attribute().return_const(true);
        resolver.expect_resolve_attribute().returning(|resource, attribute| {
            Err(AttributeError::new(
                resource.logical_id(),
                attribute,
                "backing store unavailable",
            ))
        });

        let mut template = Template::with_resolver(Arc::new(resolver));
        template.declare_resource(Resource::new("Queue", "AWS::SQS::Queue"));
        template.mark_resource_ready("Queue", "q-url").unwrap();

        let document = node(json!({"Fn::GetAtt": ["Queue", "Arn"]}));
        let matched = IntrinsicFunction::GetAtt.evaluate_match(&document);
        let validated = IntrinsicFunction::GetAtt.validate_arg_types(matched).unwrap();
        let error = IntrinsicFunction::GetAtt
            .evaluate_function(validated, &template)
            .unwrap_err();
        assert_eq!(
            error,
            FunctionError::internal(
                "failed to resolve attribute arn of Queue: backing store unavailable"
            )
        );
        assert!(!error.is_retryable());
        assert!(!error.is_validation());
    }

    #[test]
    fn test_no_value_evaluates_to_itself() {
        let document = node(json!({"Ref": "AWS::NoValue"}));
        let matched = IntrinsicFunction::NoValue.evaluate_match(&document);
        let validated = IntrinsicFunction::NoValue.validate_arg_types(matched).unwrap();
        let template = Template::new();
        let result = IntrinsicFunction::NoValue
            .evaluate_function(validated, &template)
            .unwrap();
        assert_eq!(result, document);
    }
}
