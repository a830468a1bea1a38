//! Event routing
//!
//! The route tree is compiled once from configuration. All predicate
//! compilation happens at build time; the hot path evaluates pre-compiled
//! programs and allocates only the output list.
//!
//! # Semantics
//!
//! Rules are visited depth-first in declaration order. A matching rule
//! appends its output (if any) and then processes its children; a
//! non-matching rule prunes its entire subtree. After a matching rule's
//! subtree completes, `continue: false` stops its later siblings at that
//! level only; the flag never propagates into the children's own sibling
//! lists.
//!
//! A predicate that fails to evaluate (type error against this particular
//! event) demotes to "no match" for that node alone: one bad rule must not
//! suppress unrelated rules.

mod tree;

pub use tree::Router;
