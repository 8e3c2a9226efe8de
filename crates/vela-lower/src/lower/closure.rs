//! Closure/Environment Builder
//!
//! Emits nested function literals. A literal that touches nothing outside
//! itself becomes a plain unbound function value. Otherwise its capture
//! environment is materialized as a wrapper function literal taking one
//! parameter per captured slot (the shared cell for Boxed, a copy of the
//! current value for Direct) plus `$this` for the enclosing instance,
//! immediately invoked so references inside the body route through the
//! wrapper parameters instead of the outer lexical scope.

use super::{BodyLowerer, EmittedUnit};
use crate::capture::CaptureStrategy;
use crate::script::{ScriptExpr, ScriptStmt};
use vela_ast::{LambdaId, ResolvedStmt, Span, SlotId};

impl<'a, 'f> BodyLowerer<'a, 'f> {
    pub(crate) fn lower_lambda(
        &mut self,
        id: LambdaId,
        params: &[SlotId],
        body: &[ResolvedStmt],
        span: Span,
    ) -> EmittedUnit {
        let env = self.analysis.environment(id).cloned().unwrap_or_default();

        // Inside the literal, the enclosing instance resolves to the $this
        // environment entry, or not at all when the literal never needs it.
        let inner_this = if env.needs_enclosing_instance {
            Some(ScriptExpr::ident("$this"))
        } else {
            None
        };
        self.this_stack.push(inner_this);
        let mut inner_body = Vec::new();
        for &param in params {
            if self.slot_is_boxed(param) {
                let name = self.slot_name(param);
                inner_body.push(ScriptStmt::Expr(ScriptExpr::assign(
                    ScriptExpr::ident(name.clone()),
                    ScriptExpr::ObjectLit(vec![("v".to_string(), ScriptExpr::ident(name))]),
                )));
            }
        }
        inner_body.extend(self.lower_stmts(body));
        self.this_stack.pop();

        let param_names: Vec<String> = params.iter().map(|&p| self.slot_name(p)).collect();
        let literal = ScriptExpr::Function {
            params: param_names,
            body: inner_body,
        };

        // Nothing captured: a plain unbound function value.
        if env.is_empty() {
            return EmittedUnit::pure(literal);
        }

        let mut wrapper_params = Vec::with_capacity(env.entries.len() + 1);
        let mut bind_args = Vec::with_capacity(env.entries.len() + 1);
        for (slot, strategy) in &env.entries {
            wrapper_params.push(self.slot_name(*slot));
            // In the current scope the slot resolves either to its original
            // storage or to the wrapper parameter of an enclosing literal
            // with the same name, so capture composes transitively.
            bind_args.push(match strategy {
                CaptureStrategy::Boxed => self.slot_cell(*slot),
                CaptureStrategy::Direct => self.slot_ref(*slot),
            });
        }
        if env.needs_enclosing_instance {
            wrapper_params.push("$this".to_string());
            let this = self.this_expr(span);
            bind_args.push(this);
        }

        let wrapper = ScriptExpr::Function {
            params: wrapper_params,
            body: vec![ScriptStmt::Return(Some(literal))],
        };
        EmittedUnit::pure(ScriptExpr::call(wrapper, bind_args))
    }
}
