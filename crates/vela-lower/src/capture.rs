//! Capture Analysis
//!
//! Static pre-pass over a function body. Computes, per nested function
//! literal, which enclosing variable slots and enclosing-instance references
//! it depends on (transitively, through further nesting) and the storage
//! strategy for each. Runs once per compiled function body before lowering;
//! only computes facts, never rejects code.

use rustc_hash::{FxHashMap, FxHashSet};
use vela_ast::expr::{Argument, ArrayInit};
use vela_ast::{FunctionBody, LambdaId, ResolvedExpr, ResolvedStmt, SlotId};

/// Storage strategy for one captured slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// Shared cell; the slot is ever by-ref-aliased in the enclosing function
    Boxed,
    /// Read-only snapshot of the current value
    Direct,
}

/// Per-literal capture record: what one nested function literal needs from
/// its enclosing scopes. Entries are in first-reference order so output is
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct CaptureEnvironment {
    /// Captured slots with their storage strategy
    pub entries: Vec<(SlotId, CaptureStrategy)>,
    /// Whether the literal (or a literal nested inside it) references the
    /// enclosing instance
    pub needs_enclosing_instance: bool,
}

impl CaptureEnvironment {
    /// True when the literal can be emitted as a plain unbound function
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && !self.needs_enclosing_instance
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.entries.iter().any(|(s, _)| *s == slot)
    }
}

/// Result of analyzing one compiled function body
#[derive(Debug, Default)]
pub struct CaptureAnalysis {
    envs: FxHashMap<LambdaId, CaptureEnvironment>,
    captured: FxHashSet<SlotId>,
}

impl CaptureAnalysis {
    /// Analyze every nested function literal in `func`
    pub fn analyze(func: &FunctionBody) -> CaptureAnalysis {
        let mut analysis = CaptureAnalysis::default();
        // The outermost body is treated as the root literal: its own
        // declarations can never be free, so the computed environment is
        // discarded and only the nested literals' records are kept.
        let mut walker = Walker {
            func,
            analysis: &mut analysis,
        };
        walker.analyze_literal_body(&func.params, &func.body);
        analysis
    }

    /// Capture environment for a nested function literal
    pub fn environment(&self, id: LambdaId) -> Option<&CaptureEnvironment> {
        self.envs.get(&id)
    }

    /// Whether any nested function literal captures the slot
    pub fn is_captured(&self, slot: SlotId) -> bool {
        self.captured.contains(&slot)
    }
}

struct Walker<'a> {
    func: &'a FunctionBody,
    analysis: &'a mut CaptureAnalysis,
}

/// Free references collected while scanning one literal's body
#[derive(Default)]
struct FreeRefs {
    refs: Vec<SlotId>,
    seen: FxHashSet<SlotId>,
    needs_this: bool,
}

impl FreeRefs {
    fn record(&mut self, slot: SlotId) {
        if self.seen.insert(slot) {
            self.refs.push(slot);
        }
    }
}

impl<'a> Walker<'a> {
    /// Analyze one literal body and return its environment. `params` and
    /// every slot declared inside the body (outside nested literals) form
    /// the literal's own scope; capture stops there.
    fn analyze_literal_body(
        &mut self,
        params: &[SlotId],
        body: &[ResolvedStmt],
    ) -> CaptureEnvironment {
        let mut own: FxHashSet<SlotId> = params.iter().copied().collect();
        collect_decls(body, &mut own);

        let mut free = FreeRefs::default();
        for stmt in body {
            self.scan_stmt(stmt, &own, &mut free);
        }

        let entries = free
            .refs
            .iter()
            .map(|&slot| {
                let strategy = if self.func.slot(slot).byref_aliased {
                    CaptureStrategy::Boxed
                } else {
                    CaptureStrategy::Direct
                };
                (slot, strategy)
            })
            .collect();
        CaptureEnvironment {
            entries,
            needs_enclosing_instance: free.needs_this,
        }
    }

    fn scan_stmt(&mut self, stmt: &ResolvedStmt, own: &FxHashSet<SlotId>, free: &mut FreeRefs) {
        match stmt {
            ResolvedStmt::Block { body, .. } => {
                for s in body {
                    self.scan_stmt(s, own, free);
                }
            }
            ResolvedStmt::VarDecl { init, .. } => {
                if let Some(init) = init {
                    self.scan_expr(init, own, free);
                }
            }
            ResolvedStmt::Expr { expr, .. } => self.scan_expr(expr, own, free),
            ResolvedStmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.scan_expr(cond, own, free);
                for s in then_branch {
                    self.scan_stmt(s, own, free);
                }
                if let Some(else_branch) = else_branch {
                    for s in else_branch {
                        self.scan_stmt(s, own, free);
                    }
                }
            }
            ResolvedStmt::While { cond, body, .. } => {
                self.scan_expr(cond, own, free);
                for s in body {
                    self.scan_stmt(s, own, free);
                }
            }
            ResolvedStmt::DoWhile { body, cond, .. } => {
                for s in body {
                    self.scan_stmt(s, own, free);
                }
                self.scan_expr(cond, own, free);
            }
            ResolvedStmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.scan_expr(value, own, free);
                }
            }
            ResolvedStmt::Break { .. } | ResolvedStmt::Continue { .. } => {}
            ResolvedStmt::Throw { value, .. } => self.scan_expr(value, own, free),
        }
    }

    fn scan_expr(&mut self, expr: &ResolvedExpr, own: &FxHashSet<SlotId>, free: &mut FreeRefs) {
        match expr {
            ResolvedExpr::Literal { .. } | ResolvedExpr::TypeOf { .. } => {}
            ResolvedExpr::Local { slot, .. } => {
                if !own.contains(slot) {
                    free.record(*slot);
                }
            }
            ResolvedExpr::This { .. } => free.needs_this = true,
            ResolvedExpr::FieldAccess { target, .. }
            | ResolvedExpr::PropertyAccess { target, .. } => {
                if let Some(target) = target {
                    self.scan_expr(target, own, free);
                }
            }
            ResolvedExpr::Index { array, indices, .. } => {
                self.scan_expr(array, own, free);
                for index in indices {
                    self.scan_expr(index, own, free);
                }
            }
            ResolvedExpr::Call { target, args, .. } => {
                if let Some(target) = target {
                    self.scan_expr(target, own, free);
                }
                self.scan_args(args, own, free);
            }
            ResolvedExpr::InvokeValue { callee, args, .. } => {
                self.scan_expr(callee, own, free);
                self.scan_args(args, own, free);
            }
            ResolvedExpr::New { args, .. } => self.scan_args(args, own, free),
            ResolvedExpr::ArrayNew { dims, init, .. } => {
                for dim in dims {
                    self.scan_expr(dim, own, free);
                }
                if let Some(init) = init {
                    for entry in init {
                        self.scan_init(entry, own, free);
                    }
                }
            }
            ResolvedExpr::Conditional {
                cond,
                when_true,
                when_false,
                ..
            } => {
                self.scan_expr(cond, own, free);
                self.scan_expr(when_true, own, free);
                self.scan_expr(when_false, own, free);
            }
            ResolvedExpr::Lambda {
                id, params, body, ..
            } => {
                // Nested literal: analyze it in full, then propagate what it
                // needs but this scope does not declare. Capture composes
                // transitively through the intermediate literal's own
                // environment, never by re-reading the declaring scope.
                let nested = self.analyze_literal_body(params, body);
                for (slot, _) in &nested.entries {
                    self.analysis.captured.insert(*slot);
                    if !own.contains(slot) {
                        free.record(*slot);
                    }
                }
                if nested.needs_enclosing_instance {
                    free.needs_this = true;
                }
                self.analysis.envs.insert(*id, nested);
            }
            ResolvedExpr::Unary { operand, .. } => self.scan_expr(operand, own, free),
            ResolvedExpr::Binary { lhs, rhs, .. } => {
                self.scan_expr(lhs, own, free);
                self.scan_expr(rhs, own, free);
            }
            ResolvedExpr::Assign { target, value, .. } => {
                self.scan_expr(target, own, free);
                self.scan_expr(value, own, free);
            }
            ResolvedExpr::TypeTest { operand, .. } | ResolvedExpr::TypeCast { operand, .. } => {
                self.scan_expr(operand, own, free);
            }
        }
    }

    fn scan_args(&mut self, args: &[Argument], own: &FxHashSet<SlotId>, free: &mut FreeRefs) {
        for arg in args {
            self.scan_expr(&arg.value, own, free);
        }
    }

    fn scan_init(&mut self, init: &ArrayInit, own: &FxHashSet<SlotId>, free: &mut FreeRefs) {
        match init {
            ArrayInit::Expr(expr) => self.scan_expr(expr, own, free),
            ArrayInit::Nested(entries) => {
                for entry in entries {
                    self.scan_init(entry, own, free);
                }
            }
        }
    }
}

/// Collect every slot declared in `stmts`, including nested blocks but not
/// nested function literals (those are separate scopes).
fn collect_decls(stmts: &[ResolvedStmt], decls: &mut FxHashSet<SlotId>) {
    for stmt in stmts {
        match stmt {
            ResolvedStmt::VarDecl { slot, .. } => {
                decls.insert(*slot);
            }
            ResolvedStmt::Block { body, .. } => collect_decls(body, decls),
            ResolvedStmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_decls(then_branch, decls);
                if let Some(else_branch) = else_branch {
                    collect_decls(else_branch, decls);
                }
            }
            ResolvedStmt::While { body, .. } | ResolvedStmt::DoWhile { body, .. } => {
                collect_decls(body, decls);
            }
            _ => {}
        }
    }
}
