//! Statement Lowering
//!
//! Converts resolved statements to target statements, splicing each
//! expression's preparatory statements in front of its use site. Loop
//! conditions whose units carry statements are re-evaluated per iteration
//! inside a `while (true)` shape.

use super::BodyLowerer;
use crate::script::{ScriptExpr, ScriptStmt};
use vela_ast::ResolvedStmt;

impl<'a, 'f> BodyLowerer<'a, 'f> {
    pub(crate) fn lower_stmts(&mut self, stmts: &[ResolvedStmt]) -> Vec<ScriptStmt> {
        let mut out = Vec::new();
        for stmt in stmts {
            self.lower_stmt(stmt, &mut out);
        }
        out
    }

    fn lower_stmt(&mut self, stmt: &ResolvedStmt, out: &mut Vec<ScriptStmt>) {
        match stmt {
            ResolvedStmt::Block { body, .. } => {
                let body = self.lower_stmts(body);
                out.push(ScriptStmt::Block(body));
            }
            ResolvedStmt::VarDecl { slot, init, .. } => {
                let init_v = match init {
                    Some(init) => {
                        let unit = self.lower_expr(init);
                        out.extend(unit.stmts);
                        Some(unit.value)
                    }
                    None => None,
                };
                let name = self.slot_name(*slot);
                if self.slot_is_boxed(*slot) {
                    // The shared cell is created at the declaration; every
                    // later read/write goes through it (I3).
                    let cell = ScriptExpr::ObjectLit(vec![(
                        "v".to_string(),
                        init_v.unwrap_or(ScriptExpr::Null),
                    )]);
                    out.push(ScriptStmt::var_decl(name, Some(cell)));
                } else {
                    out.push(ScriptStmt::var_decl(name, init_v));
                }
            }
            ResolvedStmt::Expr { expr, .. } => {
                let unit = self.lower_expr(expr);
                out.extend(unit.into_stmts());
            }
            ResolvedStmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.lower_expr(cond);
                out.extend(cond.stmts);
                let then_branch = self.lower_stmts(then_branch);
                let else_branch = else_branch.as_ref().map(|body| self.lower_stmts(body));
                out.push(ScriptStmt::If {
                    cond: cond.value,
                    then_branch,
                    else_branch,
                });
            }
            ResolvedStmt::While { cond, body, .. } => {
                let cond = self.lower_expr(cond);
                let body = self.lower_stmts(body);
                if cond.has_statements() {
                    // Condition needs statements on every iteration.
                    let mut loop_body = cond.stmts;
                    loop_body.push(ScriptStmt::If {
                        cond: ScriptExpr::not(cond.value),
                        then_branch: vec![ScriptStmt::Break],
                        else_branch: None,
                    });
                    loop_body.extend(body);
                    out.push(ScriptStmt::While {
                        cond: ScriptExpr::Bool(true),
                        body: loop_body,
                    });
                } else {
                    out.push(ScriptStmt::While {
                        cond: cond.value,
                        body,
                    });
                }
            }
            ResolvedStmt::DoWhile { body, cond, .. } => {
                let body = self.lower_stmts(body);
                let cond = self.lower_expr(cond);
                if cond.has_statements() {
                    let mut loop_body = body;
                    loop_body.extend(cond.stmts);
                    loop_body.push(ScriptStmt::If {
                        cond: ScriptExpr::not(cond.value),
                        then_branch: vec![ScriptStmt::Break],
                        else_branch: None,
                    });
                    out.push(ScriptStmt::While {
                        cond: ScriptExpr::Bool(true),
                        body: loop_body,
                    });
                } else {
                    out.push(ScriptStmt::DoWhile {
                        body,
                        cond: cond.value,
                    });
                }
            }
            ResolvedStmt::Return { value, .. } => match value {
                Some(value) => {
                    let unit = self.lower_expr(value);
                    out.extend(unit.stmts);
                    out.push(ScriptStmt::Return(Some(unit.value)));
                }
                None => out.push(ScriptStmt::Return(None)),
            },
            ResolvedStmt::Break { .. } => out.push(ScriptStmt::Break),
            ResolvedStmt::Continue { .. } => out.push(ScriptStmt::Continue),
            ResolvedStmt::Throw { value, .. } => {
                let unit = self.lower_expr(value);
                out.extend(unit.stmts);
                out.push(ScriptStmt::Throw(unit.value));
            }
        }
    }
}
