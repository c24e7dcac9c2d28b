//! # Intrinsic Function Evaluation
//!
//! Templates embed a small function language inside their document
//! trees: a single-entry object whose key names a function, such as
//! `{"Ref": "Vpc"}` or `{"Fn::Join": ["-", [...]]}`. This module holds
//! both halves of its implementation:
//!
//! * [`function`]: the closed [`IntrinsicFunction`] registry, one
//!   variant per supported function, each answering match, validate,
//!   evaluate and is-boolean.
//! * [`eval`]: the recursive [`evaluate_functions`] driver, the
//!   shape-only [`validate_functions`] pre-flight and the shared
//!   boolean helpers.
//!
//! ## Two-phase contract
//!
//! A node is first *matched* (does it look like this function?), then
//! *validated* (are the knowable argument shapes right?), then
//! *evaluated*. The phases pass [`MatchResult`] and [`ValidateResult`]
//! carriers along; each carrier is bound to the variant that produced
//! it, and crossing variants panics, since only evaluator code can get
//! that wrong.
//!
//! ## Dispatch priority
//!
//! The enum's declaration order is the dispatch order. The driver takes
//! the first matching variant, which is what lets `{"Ref":
//! "AWS::NoValue"}` mean "no value" while every other `Ref` is a
//! reference, and lets `Unknown` sweep up unrecognized `Fn::*` names
//! last.

pub mod eval;
pub mod function;

pub use eval::{
    evaluate_boolean, evaluate_functions, represents_boolean_function, validate_functions,
};
pub use function::{IntrinsicFunction, MatchResult, ValidateResult, AWS_NO_VALUE};
