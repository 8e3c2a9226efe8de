//! Array Creation/Literal Lowering
//!
//! Classifies every array-creation node: jagged literals become directly
//! nested native array literals; sized single-dimension creation goes
//! through create-sized-array; anything with two or more dimensions is
//! rectangular and is driven entirely through the runtime constructor and
//! per-leaf element-set calls in row-major order.

use super::{BodyLowerer, EmittedUnit};
use crate::script::{ScriptExpr, ScriptStmt};
use vela_ast::expr::ArrayInit;
use vela_ast::{LowerError, ResolvedExpr, Span, Ty};

impl<'a, 'f> BodyLowerer<'a, 'f> {
    pub(crate) fn lower_array_new(
        &mut self,
        elem_ty: &Ty,
        rank: u32,
        dims: &[ResolvedExpr],
        init: Option<&[ArrayInit]>,
        span: Span,
    ) -> EmittedUnit {
        if rank <= 1 {
            match init {
                Some(init) => self.lower_jagged_literal(init, span),
                None => self.lower_sized_array(elem_ty, dims, span),
            }
        } else {
            match init {
                Some(init) => self.lower_rect_with_initializer(rank, dims, init, span),
                None => self.lower_rect_sized(dims),
            }
        }
    }

    /// Literal single-dimension array: a native array literal, recursively
    /// nested through element expressions, with no runtime call.
    fn lower_jagged_literal(&mut self, init: &[ArrayInit], span: Span) -> EmittedUnit {
        let mut units = Vec::with_capacity(init.len());
        for entry in init {
            match entry {
                ArrayInit::Expr(elem) => units.push(self.lower_expr(elem)),
                ArrayInit::Nested(_) => {
                    self.report(LowerError::Unsupported {
                        message: "nested brace level in a single-dimension array initializer"
                            .to_string(),
                        span,
                    });
                    units.push(EmittedUnit::pure(Self::placeholder()));
                }
            }
        }
        let (stmts, values) = self.seal_operands(units);
        EmittedUnit::new(stmts, ScriptExpr::ArrayLit(values))
    }

    /// Single-dimension creation with a size expression; the element type
    /// token rides along so the runtime can default-fill.
    fn lower_sized_array(
        &mut self,
        elem_ty: &Ty,
        dims: &[ResolvedExpr],
        span: Span,
    ) -> EmittedUnit {
        let size = match dims.first() {
            Some(dim) => self.lower_expr(dim),
            None => EmittedUnit::pure(ScriptExpr::Int(0)),
        };
        match self.realize_type_token(elem_ty, "new", span) {
            Ok(token) => EmittedUnit::new(
                size.stmts,
                self.runtime.create_sized_array(token, size.value),
            ),
            Err(err) => {
                self.report(err);
                EmittedUnit::pure(Self::placeholder())
            }
        }
    }

    /// Rectangular creation with an initializer: extents come from the brace
    /// nesting; exactly one create call precedes every element-set call, and
    /// leaves are visited in row-major order with each element's preparatory
    /// statements interleaved in source order (I1).
    fn lower_rect_with_initializer(
        &mut self,
        rank: u32,
        dims: &[ResolvedExpr],
        init: &[ArrayInit],
        span: Span,
    ) -> EmittedUnit {
        let mut stmts = Vec::new();

        // Explicit dimension-size expressions still evaluate, left to right,
        // before the create call; the extents themselves come from the
        // initializer shape.
        for dim in dims {
            let unit = self.lower_expr(dim);
            stmts.extend(unit.into_stmts());
        }

        let extents = Self::initializer_extents(rank, init);
        let array = self.fresh_temp();
        let extent_exprs = extents.iter().map(|&e| ScriptExpr::Int(e)).collect();
        stmts.push(ScriptStmt::var_decl(
            array.clone(),
            Some(self.runtime.create_rect_array(extent_exprs)),
        ));

        let mut indices = Vec::with_capacity(rank as usize);
        self.emit_rect_elements(&array, rank, init, &mut indices, &mut stmts, span);

        EmittedUnit::new(stmts, ScriptExpr::ident(array))
    }

    /// Extents per dimension, read off the first initializer chain. A
    /// zero-length dimension yields zero for every deeper extent.
    fn initializer_extents(rank: u32, init: &[ArrayInit]) -> Vec<i64> {
        let mut extents = Vec::with_capacity(rank as usize);
        let mut current = init;
        for depth in 0..rank {
            extents.push(current.len() as i64);
            if depth + 1 < rank {
                current = match current.first() {
                    Some(ArrayInit::Nested(inner)) => inner.as_slice(),
                    _ => &[],
                };
            }
        }
        extents
    }

    fn emit_rect_elements(
        &mut self,
        array: &str,
        rank: u32,
        entries: &[ArrayInit],
        indices: &mut Vec<i64>,
        stmts: &mut Vec<ScriptStmt>,
        span: Span,
    ) {
        let leaf_depth = indices.len() as u32 + 1 == rank;
        for (i, entry) in entries.iter().enumerate() {
            indices.push(i as i64);
            match (entry, leaf_depth) {
                (ArrayInit::Expr(elem), true) => {
                    let unit = self.lower_expr(elem);
                    stmts.extend(unit.stmts);
                    let index_exprs = indices.iter().map(|&ix| ScriptExpr::Int(ix)).collect();
                    let set = self.runtime.set_rect_element(
                        ScriptExpr::ident(array),
                        index_exprs,
                        unit.value,
                    );
                    stmts.push(ScriptStmt::Expr(set));
                }
                (ArrayInit::Nested(inner), false) => {
                    self.emit_rect_elements(array, rank, inner, indices, stmts, span);
                }
                _ => {
                    self.report(LowerError::Unsupported {
                        message: "initializer nesting does not match the array rank".to_string(),
                        span,
                    });
                }
            }
            indices.pop();
        }
    }

    /// Rectangular creation without an initializer: dimension expressions
    /// lower left to right under the usual temporary rule, then one create
    /// call.
    fn lower_rect_sized(&mut self, dims: &[ResolvedExpr]) -> EmittedUnit {
        let units = dims.iter().map(|dim| self.lower_expr(dim)).collect();
        let (stmts, values) = self.seal_operands(units);
        EmittedUnit::new(stmts, self.runtime.create_rect_array(values))
    }
}
