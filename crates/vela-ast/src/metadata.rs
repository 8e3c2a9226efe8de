//! Metadata Importer Contract
//!
//! Per-method and per-type facts the lowering core cannot derive from the
//! tree itself: target calling conventions, trailing-parameter expansion,
//! and script usability of types. Injected so alternate metadata sources can
//! be swapped in.

use crate::symbols::MethodRef;

/// Target calling convention and expansion facts for one method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodSemantics {
    /// The enclosing instance is passed as an explicit first argument on the
    /// declaring type instead of being bound as the receiver
    pub this_as_first_argument: bool,
    /// The trailing parameter expands an array: call sites pass the
    /// elements individually and the lowering packs them into an array
    pub expands_trailing_array: bool,
}

/// Metadata importer collaborator
pub trait Metadata {
    /// Calling convention and expansion facts for a bound method
    fn method_semantics(&self, method: &MethodRef) -> MethodSemantics;

    /// Whether the named type may be mentioned in typeof/is/as constructs
    fn is_usable_from_script(&self, type_name: &str) -> bool;
}

/// Natural conventions: bound receivers, no expansion, everything usable
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMetadata;

impl Metadata for DefaultMetadata {
    fn method_semantics(&self, _method: &MethodRef) -> MethodSemantics {
        MethodSemantics::default()
    }

    fn is_usable_from_script(&self, _type_name: &str) -> bool {
        true
    }
}
