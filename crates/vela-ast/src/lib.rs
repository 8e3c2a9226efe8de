//! Vela Front-End Contract
//!
//! The data model the Vela front-end hands to the lowering core:
//! - **Resolved tree**: type-checked, symbol-bound expressions and
//!   statements (`expr`, `stmt` modules)
//! - **Types**: resolved static types including nullability, array rank,
//!   and generic instantiation (`types` module)
//! - **Symbols**: variable slots and bound member references (`symbols`
//!   module)
//! - **Metadata**: the importer collaborator exposing target calling
//!   conventions and script usability (`metadata` module)
//! - **Diagnostics**: structured error records, the sink collaborator, and
//!   terminal rendering (`diag` module)
//!
//! The tree is owned by the front-end and read-only to the lowering core.

pub mod diag;
pub mod expr;
pub mod metadata;
pub mod span;
pub mod stmt;
pub mod symbols;
pub mod types;

pub use diag::{CollectingSink, Diagnostic, DiagnosticSink, LowerError, Severity};
pub use expr::{Argument, ArrayInit, BinaryOp, Constant, ResolvedExpr, UnaryOp};
pub use metadata::{DefaultMetadata, Metadata, MethodSemantics};
pub use span::Span;
pub use stmt::{FunctionBody, ResolvedStmt};
pub use symbols::{FieldRef, LambdaId, MethodRef, PropertyRef, SlotId, VariableSlot};
pub use types::{NamedTy, Ty, TypeParamOwner, TypeParamRef};
