//! Expression Lowering
//!
//! Maps one resolved expression to one EmittedUnit, preserving left-to-right
//! side-effect order. Temporaries are introduced exactly where a non-final
//! operand's value could have side effects; the final operand of any list is
//! inlined.

use super::{BodyLowerer, EmittedUnit};
use crate::script::{BinOp, ScriptExpr, ScriptStmt, UnOp};
use vela_ast::expr::{Argument, Constant};
use vela_ast::{BinaryOp, LowerError, MethodRef, ResolvedExpr, Span, Ty, UnaryOp};

fn script_binop(op: BinaryOp) -> BinOp {
    match op {
        BinaryOp::Add => BinOp::Add,
        BinaryOp::Sub => BinOp::Sub,
        BinaryOp::Mul => BinOp::Mul,
        BinaryOp::Div => BinOp::Div,
        BinaryOp::Rem => BinOp::Rem,
        BinaryOp::BitAnd => BinOp::BitAnd,
        BinaryOp::BitOr => BinOp::BitOr,
        BinaryOp::BitXor => BinOp::BitXor,
        BinaryOp::Shl => BinOp::Shl,
        BinaryOp::Shr => BinOp::Shr,
        BinaryOp::Eq => BinOp::Eq,
        BinaryOp::Ne => BinOp::Ne,
        BinaryOp::Lt => BinOp::Lt,
        BinaryOp::Le => BinOp::Le,
        BinaryOp::Gt => BinOp::Gt,
        BinaryOp::Ge => BinOp::Ge,
        BinaryOp::LogicalAnd => BinOp::And,
        BinaryOp::LogicalOr => BinOp::Or,
    }
}

fn script_unop(op: UnaryOp) -> UnOp {
    match op {
        UnaryOp::Neg => UnOp::Neg,
        UnaryOp::Not => UnOp::Not,
        UnaryOp::BitNot => UnOp::BitNot,
    }
}

fn script_constant(value: &Constant) -> ScriptExpr {
    match value {
        Constant::Null => ScriptExpr::Null,
        Constant::Bool(b) => ScriptExpr::Bool(*b),
        Constant::Int(i) => ScriptExpr::Int(*i),
        Constant::Double(n) => ScriptExpr::Num(*n),
        Constant::Str(s) => ScriptExpr::Str(s.clone()),
    }
}

impl<'a, 'f> BodyLowerer<'a, 'f> {
    /// Lower one resolved expression
    pub(crate) fn lower_expr(&mut self, expr: &ResolvedExpr) -> EmittedUnit {
        match expr {
            ResolvedExpr::Literal { value, .. } => EmittedUnit::pure(script_constant(value)),
            ResolvedExpr::Local { slot, span } => self.lower_local(*slot, *span),
            ResolvedExpr::This { span } => {
                let this = self.this_expr(*span);
                EmittedUnit::pure(this)
            }
            ResolvedExpr::FieldAccess {
                target,
                field,
                span: _,
            } => match target {
                Some(target) => {
                    let target = self.lower_expr(target);
                    EmittedUnit::new(
                        target.stmts,
                        ScriptExpr::member(target.value, field.name.clone()),
                    )
                }
                None => EmittedUnit::pure(ScriptExpr::member(
                    ScriptExpr::ident(field.declaring_type.clone()),
                    field.name.clone(),
                )),
            },
            ResolvedExpr::PropertyAccess {
                target,
                property,
                span: _,
            } => match target {
                Some(target) => {
                    let target = self.lower_expr(target);
                    EmittedUnit::new(
                        target.stmts,
                        ScriptExpr::call(
                            ScriptExpr::member(target.value, property.getter_name()),
                            vec![],
                        ),
                    )
                }
                None => EmittedUnit::pure(ScriptExpr::call(
                    ScriptExpr::member(
                        ScriptExpr::ident(property.declaring_type.clone()),
                        property.getter_name(),
                    ),
                    vec![],
                )),
            },
            ResolvedExpr::Index {
                array,
                indices,
                span: _,
            } => self.lower_index_read(array, indices),
            ResolvedExpr::Call {
                target,
                method,
                args,
                span,
            } => self.lower_call(target.as_deref(), method, args, *span),
            ResolvedExpr::InvokeValue { callee, args, .. } => {
                let mut units = vec![self.lower_expr(callee)];
                for arg in args {
                    units.push(self.lower_argument(arg));
                }
                let (stmts, mut values) = self.seal_operands(units);
                let callee_v = values.remove(0);
                EmittedUnit::new(stmts, ScriptExpr::call(callee_v, values))
            }
            ResolvedExpr::New { class, args, .. } => {
                let units = args.iter().map(|a| self.lower_argument(a)).collect();
                let (stmts, values) = self.seal_operands(units);
                EmittedUnit::new(
                    stmts,
                    ScriptExpr::New {
                        callee: Box::new(ScriptExpr::ident(class.name.clone())),
                        args: values,
                    },
                )
            }
            ResolvedExpr::ArrayNew {
                elem_ty,
                rank,
                dims,
                init,
                span,
            } => self.lower_array_new(elem_ty, *rank, dims, init.as_deref(), *span),
            ResolvedExpr::Conditional {
                cond,
                when_true,
                when_false,
                ..
            } => self.lower_conditional(cond, when_true, when_false),
            ResolvedExpr::Lambda {
                id,
                params,
                body,
                span,
            } => self.lower_lambda(*id, params, body, *span),
            ResolvedExpr::Unary {
                op,
                operand,
                operand_ty,
                lifted,
                span,
            } => self.lower_unary(*op, operand, operand_ty, *lifted, *span),
            ResolvedExpr::Binary {
                op,
                lhs,
                rhs,
                operand_ty,
                lifted,
                span,
            } => self.lower_binary(*op, lhs, rhs, operand_ty, *lifted, *span),
            ResolvedExpr::Assign { target, value, span } => {
                self.lower_assign(target, value, *span)
            }
            ResolvedExpr::TypeTest { operand, ty, span } => {
                let operand = self.lower_expr(operand);
                match self.realize_type_token(ty, "is", *span) {
                    Ok(token) => EmittedUnit::new(
                        operand.stmts,
                        self.runtime.type_test(operand.value, token),
                    ),
                    Err(err) => {
                        self.report(err);
                        EmittedUnit::pure(Self::placeholder())
                    }
                }
            }
            ResolvedExpr::TypeCast { operand, ty, span } => {
                let operand = self.lower_expr(operand);
                match self.realize_type_token(ty, "as", *span) {
                    Ok(token) => EmittedUnit::new(
                        operand.stmts,
                        self.runtime.type_cast(operand.value, token),
                    ),
                    Err(err) => {
                        self.report(err);
                        EmittedUnit::pure(Self::placeholder())
                    }
                }
            }
            ResolvedExpr::TypeOf { ty, span } => {
                match self.realize_type_token(ty, "typeof", *span) {
                    Ok(token) => EmittedUnit::pure(token),
                    Err(err) => {
                        self.report(err);
                        EmittedUnit::pure(Self::placeholder())
                    }
                }
            }
        }
    }

    fn lower_local(&mut self, slot: vela_ast::SlotId, span: Span) -> EmittedUnit {
        let info = self.func.slot(slot);
        if info.expanded_param {
            let name = info.name.clone();
            self.report(LowerError::ExpandedParamReference { name, span });
            return EmittedUnit::pure(Self::placeholder());
        }
        EmittedUnit::pure(self.slot_ref(slot))
    }

    /// Lower one call-site argument. A by-reference argument passes the
    /// aliased local's cell itself, never the cell's contents.
    fn lower_argument(&mut self, arg: &Argument) -> EmittedUnit {
        if !arg.by_ref {
            return self.lower_expr(&arg.value);
        }
        match &arg.value {
            ResolvedExpr::Local { slot, span } => {
                if self.slot_is_boxed(*slot) {
                    EmittedUnit::pure(self.slot_cell(*slot))
                } else {
                    // The front-end marks every by-ref-aliased slot; a by-ref
                    // argument over an unmarked slot is inconsistent input.
                    self.report(LowerError::Unsupported {
                        message: format!(
                            "by-reference argument over local '{}' that is not marked \
                             by-ref-aliased",
                            self.func.slot(*slot).name
                        ),
                        span: *span,
                    });
                    EmittedUnit::pure(Self::placeholder())
                }
            }
            other => {
                self.report(LowerError::Unsupported {
                    message: "only a local variable can be passed by reference".to_string(),
                    span: other.span(),
                });
                EmittedUnit::pure(Self::placeholder())
            }
        }
    }

    fn lower_index_read(
        &mut self,
        array: &ResolvedExpr,
        indices: &[ResolvedExpr],
    ) -> EmittedUnit {
        let mut units = vec![self.lower_expr(array)];
        for index in indices {
            units.push(self.lower_expr(index));
        }
        let (stmts, mut values) = self.seal_operands(units);
        let array_v = values.remove(0);
        let value = if values.len() == 1 {
            ScriptExpr::index(array_v, values.remove(0))
        } else {
            self.runtime.get_rect_element(array_v, values)
        };
        EmittedUnit::new(stmts, value)
    }

    fn lower_call(
        &mut self,
        target: Option<&ResolvedExpr>,
        method: &MethodRef,
        args: &[Argument],
        span: Span,
    ) -> EmittedUnit {
        let semantics = self.metadata.method_semantics(method);

        let mut units = Vec::new();
        let has_target = if method.is_static {
            false
        } else {
            match target {
                Some(target) => {
                    units.push(self.lower_expr(target));
                    true
                }
                None => {
                    // Implicit receiver
                    let this = self.this_expr(span);
                    units.push(EmittedUnit::pure(this));
                    true
                }
            }
        };

        if semantics.expands_trailing_array && !args.is_empty() {
            let (leading, trailing) = args.split_at(args.len() - 1);
            for arg in leading {
                units.push(self.lower_argument(arg));
            }
            // The expanded parameter's argument must be a literal array so
            // its elements can be passed individually.
            match &trailing[0].value {
                ResolvedExpr::ArrayNew {
                    rank: 1,
                    init: Some(init),
                    ..
                } => {
                    for entry in init {
                        match entry {
                            vela_ast::ArrayInit::Expr(elem) => units.push(self.lower_expr(elem)),
                            vela_ast::ArrayInit::Nested(_) => {
                                self.report(LowerError::Unsupported {
                                    message: format!(
                                        "malformed initializer in the expanded argument of \
                                         '{}'",
                                        method.name
                                    ),
                                    span,
                                });
                            }
                        }
                    }
                }
                other => {
                    self.report(LowerError::Unsupported {
                        message: format!(
                            "the argument for the expanded parameter of '{}' must be an \
                             array literal",
                            method.name
                        ),
                        span: other.span(),
                    });
                    units.push(self.lower_argument(&trailing[0]));
                }
            }
        } else {
            for arg in args {
                units.push(self.lower_argument(arg));
            }
        }

        let (stmts, mut values) = self.seal_operands(units);
        let target_v = if has_target {
            Some(values.remove(0))
        } else {
            None
        };

        let value = match target_v {
            Some(target_v) if semantics.this_as_first_argument => {
                let mut call_args = vec![target_v];
                call_args.extend(values);
                ScriptExpr::call(
                    ScriptExpr::member(
                        ScriptExpr::ident(method.declaring_type.clone()),
                        method.name.clone(),
                    ),
                    call_args,
                )
            }
            Some(target_v) => ScriptExpr::call(
                ScriptExpr::member(target_v, method.name.clone()),
                values,
            ),
            None => ScriptExpr::call(
                ScriptExpr::member(
                    ScriptExpr::ident(method.declaring_type.clone()),
                    method.name.clone(),
                ),
                values,
            ),
        };
        EmittedUnit::new(stmts, value)
    }

    /// Ternary conditional. The native form is only eligible while neither
    /// branch needs preparatory statements; the target's conditional already
    /// isolates value-level effects to the taken branch. Otherwise each
    /// branch's statements stay inside its own arm of an if/else assigning
    /// one shared temporary.
    fn lower_conditional(
        &mut self,
        cond: &ResolvedExpr,
        when_true: &ResolvedExpr,
        when_false: &ResolvedExpr,
    ) -> EmittedUnit {
        let cond = self.lower_expr(cond);
        let when_true = self.lower_expr(when_true);
        let when_false = self.lower_expr(when_false);

        if !when_true.has_statements() && !when_false.has_statements() {
            return EmittedUnit::new(
                cond.stmts,
                ScriptExpr::Conditional {
                    test: Box::new(cond.value),
                    when_true: Box::new(when_true.value),
                    when_false: Box::new(when_false.value),
                },
            );
        }

        let mut stmts = cond.stmts;
        let temp = self.fresh_temp();
        stmts.push(ScriptStmt::var_decl(temp.clone(), None));
        let mut then_branch = when_true.stmts;
        then_branch.push(ScriptStmt::Expr(ScriptExpr::assign(
            ScriptExpr::ident(temp.clone()),
            when_true.value,
        )));
        let mut else_branch = when_false.stmts;
        else_branch.push(ScriptStmt::Expr(ScriptExpr::assign(
            ScriptExpr::ident(temp.clone()),
            when_false.value,
        )));
        stmts.push(ScriptStmt::If {
            cond: cond.value,
            then_branch,
            else_branch: Some(else_branch),
        });
        EmittedUnit::new(stmts, ScriptExpr::ident(temp))
    }

    fn lower_unary(
        &mut self,
        op: UnaryOp,
        operand: &ResolvedExpr,
        operand_ty: &Ty,
        lifted: bool,
        span: Span,
    ) -> EmittedUnit {
        if op.is_bitwise() && operand_ty.is_int64_family() {
            self.lower_expr(operand);
            self.report(LowerError::IllegalOperandType {
                op: op.symbol().to_string(),
                span,
            });
            return EmittedUnit::pure(Self::placeholder());
        }
        let operand = self.lower_expr(operand);
        let value = if lifted {
            self.runtime.lifted_unary(op, operand.value)
        } else {
            ScriptExpr::unary(script_unop(op), operand.value)
        };
        EmittedUnit::new(operand.stmts, value)
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        lhs: &ResolvedExpr,
        rhs: &ResolvedExpr,
        operand_ty: &Ty,
        lifted: bool,
        span: Span,
    ) -> EmittedUnit {
        if op.is_bitwise() && operand_ty.is_int64_family() {
            // Operands are still lowered so their own diagnostics surface in
            // the same pass; the erroneous operation becomes a placeholder.
            self.lower_expr(lhs);
            self.lower_expr(rhs);
            self.report(LowerError::IllegalOperandType {
                op: op.symbol().to_string(),
                span,
            });
            return EmittedUnit::pure(Self::placeholder());
        }

        if lifted {
            // The runtime form evaluates each operand exactly once, so order
            // preservation alone decides the temporaries.
            let lhs = self.lower_expr(lhs);
            let rhs = self.lower_expr(rhs);
            let (stmts, mut values) = self.seal_operands(vec![lhs, rhs]);
            let rhs_v = values.pop().unwrap();
            let lhs_v = values.pop().unwrap();
            return EmittedUnit::new(stmts, self.runtime.lifted_binary(op, lhs_v, rhs_v));
        }

        if op.is_short_circuit() {
            return self.lower_short_circuit(op, lhs, rhs);
        }

        let lhs = self.lower_expr(lhs);
        let rhs = self.lower_expr(rhs);
        let (stmts, mut values) = self.seal_operands(vec![lhs, rhs]);
        let rhs_v = values.pop().unwrap();
        let lhs_v = values.pop().unwrap();
        EmittedUnit::new(stmts, ScriptExpr::binary(script_binop(op), lhs_v, rhs_v))
    }

    /// `&&` / `||` with a statement-bearing right operand: the right side's
    /// statements must not run unless the operator demands its value, so
    /// they move into a guarded if-arm updating a shared temporary.
    fn lower_short_circuit(
        &mut self,
        op: BinaryOp,
        lhs: &ResolvedExpr,
        rhs: &ResolvedExpr,
    ) -> EmittedUnit {
        let lhs = self.lower_expr(lhs);
        let rhs = self.lower_expr(rhs);

        if !rhs.has_statements() {
            let value = ScriptExpr::binary(script_binop(op), lhs.value, rhs.value);
            return EmittedUnit::new(lhs.stmts, value);
        }

        let mut stmts = lhs.stmts;
        let temp = self.fresh_temp();
        stmts.push(ScriptStmt::var_decl(temp.clone(), Some(lhs.value)));
        let test = match op {
            BinaryOp::LogicalAnd => ScriptExpr::ident(temp.clone()),
            _ => ScriptExpr::not(ScriptExpr::ident(temp.clone())),
        };
        let mut arm = rhs.stmts;
        arm.push(ScriptStmt::Expr(ScriptExpr::assign(
            ScriptExpr::ident(temp.clone()),
            rhs.value,
        )));
        stmts.push(ScriptStmt::If {
            cond: test,
            then_branch: arm,
            else_branch: None,
        });
        EmittedUnit::new(stmts, ScriptExpr::ident(temp))
    }

    fn lower_assign(
        &mut self,
        target: &ResolvedExpr,
        value: &ResolvedExpr,
        span: Span,
    ) -> EmittedUnit {
        match target {
            ResolvedExpr::Local { slot, span } => {
                let info = self.func.slot(*slot);
                if info.expanded_param {
                    let name = info.name.clone();
                    let span = *span;
                    self.report(LowerError::ExpandedParamReference { name, span });
                    self.lower_expr(value);
                    return EmittedUnit::pure(Self::placeholder());
                }
                let value = self.lower_expr(value);
                let target_v = self.slot_ref(*slot);
                EmittedUnit::new(value.stmts, ScriptExpr::assign(target_v, value.value))
            }
            ResolvedExpr::FieldAccess {
                target: field_target,
                field,
                ..
            } => {
                let mut units = Vec::new();
                let has_target = field_target.is_some();
                if let Some(field_target) = field_target {
                    units.push(self.lower_expr(field_target));
                }
                units.push(self.lower_expr(value));
                let (stmts, mut values) = self.seal_operands(units);
                let value_v = values.pop().unwrap();
                let member = if has_target {
                    ScriptExpr::member(values.pop().unwrap(), field.name.clone())
                } else {
                    ScriptExpr::member(
                        ScriptExpr::ident(field.declaring_type.clone()),
                        field.name.clone(),
                    )
                };
                EmittedUnit::new(stmts, ScriptExpr::assign(member, value_v))
            }
            ResolvedExpr::PropertyAccess {
                target: prop_target,
                property,
                ..
            } => {
                // A property write in value position always becomes a
                // perform-the-write statement followed by use of the written
                // value (I2 relies on this never being expression-inlined).
                let mut stmts = Vec::new();
                let receiver = match prop_target {
                    Some(prop_target) => {
                        let unit = self.lower_expr(prop_target);
                        stmts.extend(unit.stmts);
                        Some(self.spill_if_impure(&mut stmts, unit.value))
                    }
                    None => None,
                };
                let value = self.lower_expr(value);
                stmts.extend(value.stmts);
                let value_v = self.spill_if_impure(&mut stmts, value.value);
                let setter = match receiver {
                    Some(receiver) => ScriptExpr::member(receiver, property.setter_name()),
                    None => ScriptExpr::member(
                        ScriptExpr::ident(property.declaring_type.clone()),
                        property.setter_name(),
                    ),
                };
                stmts.push(ScriptStmt::Expr(ScriptExpr::call(
                    setter,
                    vec![value_v.clone()],
                )));
                EmittedUnit::new(stmts, value_v)
            }
            ResolvedExpr::Index { array, indices, .. } => {
                let mut units = vec![self.lower_expr(array)];
                for index in indices {
                    units.push(self.lower_expr(index));
                }
                units.push(self.lower_expr(value));
                let (mut stmts, mut values) = self.seal_operands(units);
                let value_v = values.pop().unwrap();
                let array_v = values.remove(0);
                if values.len() == 1 {
                    let element = ScriptExpr::index(array_v, values.remove(0));
                    EmittedUnit::new(stmts, ScriptExpr::assign(element, value_v))
                } else {
                    let value_v = self.spill_if_impure(&mut stmts, value_v);
                    let set = self
                        .runtime
                        .set_rect_element(array_v, values, value_v.clone());
                    stmts.push(ScriptStmt::Expr(set));
                    EmittedUnit::new(stmts, value_v)
                }
            }
            _ => {
                self.report(LowerError::Unsupported {
                    message: "assignment target is not a variable, field, property, or element"
                        .to_string(),
                    span,
                });
                self.lower_expr(value);
                EmittedUnit::pure(Self::placeholder())
            }
        }
    }
}
