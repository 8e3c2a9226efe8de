//! Resolved Statements
//!
//! Statement nodes and the per-function-body container the lowering core
//! consumes. Slots for the body and all nested function literals live in one
//! arena so capture analysis can track slot identity across scopes.

use crate::expr::ResolvedExpr;
use crate::span::Span;
use crate::symbols::{SlotId, VariableSlot};

/// A fully resolved statement node
#[derive(Debug, Clone)]
pub enum ResolvedStmt {
    /// Nested lexical block
    Block { body: Vec<ResolvedStmt>, span: Span },
    /// Variable declaration with optional initializer
    VarDecl {
        slot: SlotId,
        init: Option<ResolvedExpr>,
        span: Span,
    },
    /// Expression evaluated for its effects
    Expr { expr: ResolvedExpr, span: Span },
    If {
        cond: ResolvedExpr,
        then_branch: Vec<ResolvedStmt>,
        else_branch: Option<Vec<ResolvedStmt>>,
        span: Span,
    },
    While {
        cond: ResolvedExpr,
        body: Vec<ResolvedStmt>,
        span: Span,
    },
    DoWhile {
        body: Vec<ResolvedStmt>,
        cond: ResolvedExpr,
        span: Span,
    },
    Return {
        value: Option<ResolvedExpr>,
        span: Span,
    },
    Break { span: Span },
    Continue { span: Span },
    Throw { value: ResolvedExpr, span: Span },
}

impl ResolvedStmt {
    pub fn span(&self) -> Span {
        match self {
            ResolvedStmt::Block { span, .. }
            | ResolvedStmt::VarDecl { span, .. }
            | ResolvedStmt::Expr { span, .. }
            | ResolvedStmt::If { span, .. }
            | ResolvedStmt::While { span, .. }
            | ResolvedStmt::DoWhile { span, .. }
            | ResolvedStmt::Return { span, .. }
            | ResolvedStmt::Break { span }
            | ResolvedStmt::Continue { span }
            | ResolvedStmt::Throw { span, .. } => *span,
        }
    }
}

/// One compiled function body, as handed over by the front-end
#[derive(Debug, Clone)]
pub struct FunctionBody {
    /// Slot arena for the body and every nested function literal,
    /// indexed by `SlotId`
    pub slots: Vec<VariableSlot>,
    /// Parameter slots of the outermost function
    pub params: Vec<SlotId>,
    /// Statements of the outermost function
    pub body: Vec<ResolvedStmt>,
    /// Name of the enclosing compiled type (used in diagnostics)
    pub enclosing_type: String,
    /// Whether an enclosing instance is available (`this`)
    pub has_instance: bool,
}

impl FunctionBody {
    pub fn new(enclosing_type: impl Into<String>) -> Self {
        Self {
            slots: Vec::new(),
            params: Vec::new(),
            body: Vec::new(),
            enclosing_type: enclosing_type.into(),
            has_instance: false,
        }
    }

    /// Add a slot to the arena and return its id
    pub fn add_slot(&mut self, slot: VariableSlot) -> SlotId {
        let id = SlotId::new(self.slots.len() as u32);
        self.slots.push(slot);
        id
    }

    /// Look up a slot by id
    pub fn slot(&self, id: SlotId) -> &VariableSlot {
        &self.slots[id.index()]
    }
}
