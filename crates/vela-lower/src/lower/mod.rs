//! Lowering
//!
//! Converts the resolved Vela tree into target script statements. The
//! context is an explicit value threaded through every call: the function
//! body being lowered, its capture analysis, the injected runtime and
//! metadata collaborators, the diagnostic sink, and the temporary counter.
//! No ambient state.

mod array;
mod closure;
mod expr;
mod stmt;

use crate::capture::CaptureAnalysis;
use crate::runtime::RuntimeSupport;
use crate::script::{ScriptExpr, ScriptStmt};
use vela_ast::{
    DiagnosticSink, FunctionBody, LowerError, Metadata, SlotId, Span, Ty,
};

/// The lowering result for one expression: statements that must run, in
/// order, before the yielded value expression is valid.
#[derive(Debug, Clone)]
pub struct EmittedUnit {
    pub stmts: Vec<ScriptStmt>,
    pub value: ScriptExpr,
}

impl EmittedUnit {
    pub fn new(stmts: Vec<ScriptStmt>, value: ScriptExpr) -> Self {
        Self { stmts, value }
    }

    /// A unit with no preparatory statements
    pub fn pure(value: ScriptExpr) -> Self {
        Self {
            stmts: Vec::new(),
            value,
        }
    }

    pub fn has_statements(&self) -> bool {
        !self.stmts.is_empty()
    }

    /// Consume as a statement sequence, dropping a value with no effects
    pub fn into_stmts(self) -> Vec<ScriptStmt> {
        let mut stmts = self.stmts;
        if !self.value.is_side_effect_free() {
            stmts.push(ScriptStmt::Expr(self.value));
        }
        stmts
    }
}

/// Public lowering entry point. Holds the injected collaborators; each
/// `lower_function` call gets a fresh temporary counter so output is
/// reproducible per compiled body.
pub struct Lowerer<'a> {
    runtime: &'a dyn RuntimeSupport,
    metadata: &'a dyn Metadata,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        runtime: &'a dyn RuntimeSupport,
        metadata: &'a dyn Metadata,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            runtime,
            metadata,
            sink,
        }
    }

    /// Lower one compiled function body to target statements. Never raises
    /// on a lowering diagnostic; the result is best-effort with inert
    /// placeholders where an expression could not be lowered.
    pub fn lower_function(&mut self, func: &FunctionBody) -> Vec<ScriptStmt> {
        let analysis = CaptureAnalysis::analyze(func);
        let this_expr = if func.has_instance {
            Some(ScriptExpr::This)
        } else {
            None
        };
        let mut body = BodyLowerer {
            func,
            analysis,
            runtime: self.runtime,
            metadata: self.metadata,
            sink: &mut *self.sink,
            next_temp: 0,
            this_stack: vec![this_expr],
        };
        body.lower_outer_body()
    }
}

/// Lowering context for one compiled function body
pub(crate) struct BodyLowerer<'a, 'f> {
    pub(crate) func: &'f FunctionBody,
    pub(crate) analysis: CaptureAnalysis,
    pub(crate) runtime: &'a dyn RuntimeSupport,
    pub(crate) metadata: &'a dyn Metadata,
    pub(crate) sink: &'a mut dyn DiagnosticSink,
    /// Temporary counter, reset per body
    pub(crate) next_temp: u32,
    /// How the enclosing instance resolves in the current (possibly nested)
    /// function scope; `None` when no instance is available
    pub(crate) this_stack: Vec<Option<ScriptExpr>>,
}

impl<'a, 'f> BodyLowerer<'a, 'f> {
    fn lower_outer_body(&mut self) -> Vec<ScriptStmt> {
        let mut out = Vec::new();
        // A parameter that is ever by-ref-aliased gets its shared cell at
        // entry: the incoming value is rewrapped under the same name so all
        // later reads and writes go through the cell (I3).
        for &param in &self.func.params {
            if self.slot_is_boxed(param) {
                let name = self.slot_name(param);
                out.push(ScriptStmt::Expr(ScriptExpr::assign(
                    ScriptExpr::ident(name.clone()),
                    ScriptExpr::ObjectLit(vec![("v".to_string(), ScriptExpr::ident(name))]),
                )));
            }
        }
        out.extend(self.lower_stmts(&self.func.body));
        out
    }

    /// Allocate the next deterministic temporary name
    pub(crate) fn fresh_temp(&mut self) -> String {
        self.next_temp += 1;
        format!("$t{}", self.next_temp)
    }

    pub(crate) fn slot_name(&self, slot: SlotId) -> String {
        self.func.slot(slot).name.clone()
    }

    /// Whether the slot's storage is a shared cell. A type-level fact of the
    /// slot (ever by-ref-aliased), not a runtime check.
    pub(crate) fn slot_is_boxed(&self, slot: SlotId) -> bool {
        self.func.slot(slot).byref_aliased
    }

    /// Read/write expression for a slot: through the cell when boxed
    pub(crate) fn slot_ref(&self, slot: SlotId) -> ScriptExpr {
        let name = self.slot_name(slot);
        if self.slot_is_boxed(slot) {
            ScriptExpr::member(ScriptExpr::ident(name), "v")
        } else {
            ScriptExpr::ident(name)
        }
    }

    /// The cell itself, for by-reference argument positions and Boxed
    /// captures
    pub(crate) fn slot_cell(&self, slot: SlotId) -> ScriptExpr {
        ScriptExpr::ident(self.slot_name(slot))
    }

    /// How `this` resolves in the current scope, reporting when there is no
    /// enclosing instance to resolve to
    pub(crate) fn this_expr(&mut self, span: Span) -> ScriptExpr {
        match self.this_stack.last().cloned().flatten() {
            Some(expr) => expr,
            None => {
                self.report(LowerError::Unsupported {
                    message: "reference to the enclosing instance in a static context"
                        .to_string(),
                    span,
                });
                Self::placeholder()
            }
        }
    }

    pub(crate) fn report(&mut self, err: LowerError) {
        self.sink.report(err.into_diagnostic());
    }

    /// Inert value substituted when an expression cannot be lowered
    pub(crate) fn placeholder() -> ScriptExpr {
        ScriptExpr::Null
    }

    /// Seal a left-to-right operand list: concatenate each unit's statements
    /// in source order and spill every non-final operand whose value is not
    /// provably side-effect-free into a fresh temporary. The final operand
    /// is always inlined (nothing follows it), which both preserves I1 and
    /// minimizes temporaries.
    pub(crate) fn seal_operands(
        &mut self,
        units: Vec<EmittedUnit>,
    ) -> (Vec<ScriptStmt>, Vec<ScriptExpr>) {
        let count = units.len();
        let mut stmts = Vec::new();
        let mut values = Vec::with_capacity(count);
        for (i, unit) in units.into_iter().enumerate() {
            stmts.extend(unit.stmts);
            let is_last = i + 1 == count;
            if !is_last && !unit.value.is_side_effect_free() {
                let temp = self.fresh_temp();
                stmts.push(ScriptStmt::var_decl(temp.clone(), Some(unit.value)));
                values.push(ScriptExpr::ident(temp));
            } else {
                values.push(unit.value);
            }
        }
        (stmts, values)
    }

    /// Spill `value` to a temporary unless it is side-effect-free. Used when
    /// a value expression must be consumed more than once (e.g. a written
    /// value that is both stored and yielded).
    pub(crate) fn spill_if_impure(
        &mut self,
        stmts: &mut Vec<ScriptStmt>,
        value: ScriptExpr,
    ) -> ScriptExpr {
        if value.is_side_effect_free() {
            value
        } else {
            let temp = self.fresh_temp();
            stmts.push(ScriptStmt::var_decl(temp.clone(), Some(value)));
            ScriptExpr::ident(temp)
        }
    }

    /// Realize a typeof-style type token, recursively instantiating generic
    /// arguments. `construct` names the surrounding construct for the
    /// NotUsableType diagnostic ("typeof", "is", "as", "new").
    pub(crate) fn realize_type_token(
        &mut self,
        ty: &Ty,
        construct: &str,
        span: Span,
    ) -> Result<ScriptExpr, LowerError> {
        match ty {
            Ty::Named(named) => {
                if !self.metadata.is_usable_from_script(&named.name) {
                    return Err(LowerError::NotUsableType {
                        type_name: named.name.clone(),
                        construct: construct.to_string(),
                        enclosing_type: self.func.enclosing_type.clone(),
                        span,
                    });
                }
                let base = self.runtime.type_token(&named.name);
                if named.type_args.is_empty() {
                    Ok(base)
                } else {
                    let mut args = Vec::with_capacity(named.type_args.len());
                    for arg in &named.type_args {
                        args.push(self.realize_type_token(arg, construct, span)?);
                    }
                    Ok(self.runtime.generic_instance(base, args))
                }
            }
            Ty::Array { elem, rank } => {
                let elem_token = self.realize_type_token(elem, construct, span)?;
                Ok(self.runtime.array_type(elem_token, *rank))
            }
            // A constrained type parameter lowers identically to its bound;
            // an unconstrained one erases to the object token.
            Ty::TypeParam(param) => match &param.constraint {
                Some(bound) => self.realize_type_token(bound, construct, span),
                None => Ok(self.runtime.object_token()),
            },
            // Tokens see through nullability
            Ty::Nullable(inner) => self.realize_type_token(inner, construct, span),
            Ty::Void => Ok(self.runtime.type_token("Void")),
            Ty::Bool => Ok(self.runtime.type_token("Bool")),
            Ty::Int => Ok(self.runtime.type_token("Int")),
            Ty::Long => Ok(self.runtime.type_token("Long")),
            Ty::ULong => Ok(self.runtime.type_token("ULong")),
            Ty::Double => Ok(self.runtime.type_token("Double")),
            Ty::String => Ok(self.runtime.type_token("String")),
            Ty::Object => Ok(self.runtime.type_token("Object")),
            Ty::Delegate { .. } => Ok(self.runtime.type_token("Function")),
        }
    }
}
