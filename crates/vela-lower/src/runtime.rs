//! Runtime-Mediated Operation Codegen
//!
//! The injectable contract for operations with no native target primitive:
//! lifted nullable operators, rectangular array ops, sized array creation,
//! generic-aware type tests/casts, and type-token realization. Lowering
//! consults this trait so alternate runtime-support libraries can be
//! targeted without touching the core.

use crate::script::ScriptExpr;
use vela_ast::{BinaryOp, UnaryOp};

/// Runtime-support contract consumed by the lowering core.
///
/// Every operation returns a value expression built from the operand
/// expressions it is given. Operands are evaluated exactly once by the
/// returned form; the caller pre-evaluates anything that must not be
/// re-evaluated into temporaries before calling in.
pub trait RuntimeSupport {
    /// Apply a unary operator lifted over a nullable operand
    fn lifted_unary(&self, op: UnaryOp, operand: ScriptExpr) -> ScriptExpr;

    /// Apply a binary operator lifted over nullable operands
    fn lifted_binary(&self, op: BinaryOp, lhs: ScriptExpr, rhs: ScriptExpr) -> ScriptExpr;

    /// Create a rectangular multidimensional array with the given extents
    fn create_rect_array(&self, dims: Vec<ScriptExpr>) -> ScriptExpr;

    /// Read one element of a rectangular array
    fn get_rect_element(&self, array: ScriptExpr, indices: Vec<ScriptExpr>) -> ScriptExpr;

    /// Write one element of a rectangular array
    fn set_rect_element(
        &self,
        array: ScriptExpr,
        indices: Vec<ScriptExpr>,
        value: ScriptExpr,
    ) -> ScriptExpr;

    /// Create a single-dimension array of the given element type and size
    fn create_sized_array(&self, elem_token: ScriptExpr, size: ScriptExpr) -> ScriptExpr;

    /// Dynamic `is` test against a type token
    fn type_test(&self, value: ScriptExpr, token: ScriptExpr) -> ScriptExpr;

    /// Dynamic `as` cast against a type token
    fn type_cast(&self, value: ScriptExpr, token: ScriptExpr) -> ScriptExpr;

    /// Token for a concrete named or primitive type
    fn type_token(&self, name: &str) -> ScriptExpr;

    /// Token for an instantiated generic type
    fn generic_instance(&self, base: ScriptExpr, args: Vec<ScriptExpr>) -> ScriptExpr;

    /// Token for an array type of the given element token and rank
    fn array_type(&self, elem_token: ScriptExpr, rank: u32) -> ScriptExpr;

    /// Token unconstrained type parameters erase to
    fn object_token(&self) -> ScriptExpr;
}

/// Reference runtime-support library: every mediated operation becomes a
/// call on a configurable root identifier, and named types are realized as
/// global bindings of the same name.
#[derive(Debug, Clone)]
pub struct SupportLibrary {
    /// Root identifier the support calls hang off
    pub root: String,
}

impl Default for SupportLibrary {
    fn default() -> Self {
        Self {
            root: "$rt".to_string(),
        }
    }
}

impl SupportLibrary {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    fn call(&self, name: &str, args: Vec<ScriptExpr>) -> ScriptExpr {
        ScriptExpr::call(
            ScriptExpr::member(ScriptExpr::ident(self.root.clone()), name),
            args,
        )
    }

    fn lifted_name(base: &str) -> String {
        let mut chars = base.chars();
        match chars.next() {
            Some(first) => format!("lifted{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "lifted".to_string(),
        }
    }
}

impl RuntimeSupport for SupportLibrary {
    fn lifted_unary(&self, op: UnaryOp, operand: ScriptExpr) -> ScriptExpr {
        self.call(&Self::lifted_name(op.runtime_name()), vec![operand])
    }

    fn lifted_binary(&self, op: BinaryOp, lhs: ScriptExpr, rhs: ScriptExpr) -> ScriptExpr {
        self.call(&Self::lifted_name(op.runtime_name()), vec![lhs, rhs])
    }

    fn create_rect_array(&self, dims: Vec<ScriptExpr>) -> ScriptExpr {
        self.call("multidimArray", dims)
    }

    fn get_rect_element(&self, array: ScriptExpr, indices: Vec<ScriptExpr>) -> ScriptExpr {
        let mut args = vec![array];
        args.extend(indices);
        self.call("arrayGet", args)
    }

    fn set_rect_element(
        &self,
        array: ScriptExpr,
        indices: Vec<ScriptExpr>,
        value: ScriptExpr,
    ) -> ScriptExpr {
        let mut args = vec![array];
        args.extend(indices);
        args.push(value);
        self.call("arraySet", args)
    }

    fn create_sized_array(&self, elem_token: ScriptExpr, size: ScriptExpr) -> ScriptExpr {
        self.call("createArray", vec![elem_token, size])
    }

    fn type_test(&self, value: ScriptExpr, token: ScriptExpr) -> ScriptExpr {
        self.call("isInstanceOfType", vec![value, token])
    }

    fn type_cast(&self, value: ScriptExpr, token: ScriptExpr) -> ScriptExpr {
        self.call("safeCast", vec![value, token])
    }

    fn type_token(&self, name: &str) -> ScriptExpr {
        ScriptExpr::ident(name)
    }

    fn generic_instance(&self, base: ScriptExpr, args: Vec<ScriptExpr>) -> ScriptExpr {
        let mut call_args = vec![base];
        call_args.extend(args);
        self.call("genericInstance", call_args)
    }

    fn array_type(&self, elem_token: ScriptExpr, rank: u32) -> ScriptExpr {
        if rank <= 1 {
            self.call("arrayType", vec![elem_token])
        } else {
            self.call("arrayType", vec![elem_token, ScriptExpr::Int(rank as i64)])
        }
    }

    fn object_token(&self) -> ScriptExpr {
        ScriptExpr::ident("Object")
    }
}
