//! Diagnostics
//!
//! Structured lowering diagnostics with fixed numeric codes, the sink
//! collaborator the core reports into, and terminal rendering via
//! codespan-reporting. Lowering never raises these as control-flow errors;
//! it reports and substitutes a placeholder so one pass surfaces every
//! independent diagnostic in a method body.

use crate::span::Span;
use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed numeric diagnostic codes
pub mod codes {
    /// Construct with no supported lowering (e.g. direct reference to an
    /// expansion-only trailing parameter)
    pub const UNSUPPORTED_CONSTRUCT: u16 = 7501;
    /// Type mentioned in typeof/is/as is excluded from the target
    pub const NOT_USABLE_TYPE: u16 = 7522;
    /// Operator applied to an operand type the target numeric model
    /// cannot express (bitwise over the 64-bit integer family)
    pub const ILLEGAL_OPERAND_TYPE: u16 = 7540;
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A reported diagnostic record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Fixed numeric code (see [`codes`])
    pub code: u16,
    pub message: String,
    pub span: Span,
}

/// Lowering failures that become diagnostics
#[derive(Debug, Error, Clone)]
pub enum LowerError {
    /// Direct reference to a trailing parameter that call sites expand;
    /// only the expansion mechanism may consume it
    #[error(
        "Parameter '{name}' expands a trailing array and can only be used \
         through its expansion, not referenced directly"
    )]
    ExpandedParamReference {
        /// Parameter name
        name: String,
        /// Location of the direct reference
        span: Span,
    },

    /// Type excluded from the target mentioned in typeof/is/as
    #[error(
        "Type '{type_name}' is not usable from script and cannot appear in \
         '{construct}' (in type '{enclosing_type}')"
    )]
    NotUsableType {
        /// The offending type
        type_name: String,
        /// Surrounding construct: "typeof", "is", or "as"
        construct: String,
        /// Enclosing compiled type
        enclosing_type: String,
        /// Location of the type reference
        span: Span,
    },

    /// Bitwise operator over a 64-bit integer-family operand
    #[error(
        "Operator '{op}' cannot be applied to 64-bit integer operands in \
         the target numeric model"
    )]
    IllegalOperandType {
        /// Operator spelling
        op: String,
        /// Location of the operator expression
        span: Span,
    },

    /// Any other construct the lowering cannot express
    #[error("Unsupported construct: {message}")]
    Unsupported {
        /// What was encountered
        message: String,
        /// Location of the construct
        span: Span,
    },
}

impl LowerError {
    /// The fixed numeric code for this error
    pub fn code(&self) -> u16 {
        match self {
            LowerError::ExpandedParamReference { .. } | LowerError::Unsupported { .. } => {
                codes::UNSUPPORTED_CONSTRUCT
            }
            LowerError::NotUsableType { .. } => codes::NOT_USABLE_TYPE,
            LowerError::IllegalOperandType { .. } => codes::ILLEGAL_OPERAND_TYPE,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LowerError::ExpandedParamReference { span, .. }
            | LowerError::NotUsableType { span, .. }
            | LowerError::IllegalOperandType { span, .. }
            | LowerError::Unsupported { span, .. } => *span,
        }
    }

    /// Convert into the reported record
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            code: self.code(),
            message: self.to_string(),
            span: self.span(),
        }
    }
}

/// Error-reporting sink collaborator
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Sink that accumulates diagnostics in order of report
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Codes in report order (convenient for assertions)
    pub fn codes(&self) -> Vec<u16> {
        self.diagnostics.iter().map(|d| d.code).collect()
    }

    /// Render all collected diagnostics to stderr with source context
    pub fn emit(
        &self,
        file_name: &str,
        source: &str,
    ) -> Result<(), codespan_reporting::files::Error> {
        let mut files = SimpleFiles::new();
        let file_id = files.add(file_name.to_string(), source.to_string());
        let writer = StandardStream::stderr(ColorChoice::Auto);
        let config = term::Config::default();
        for diag in &self.diagnostics {
            let severity = match diag.severity {
                Severity::Error => codespan_reporting::diagnostic::Severity::Error,
                Severity::Warning => codespan_reporting::diagnostic::Severity::Warning,
            };
            let cs = CsDiagnostic::new(severity)
                .with_code(format!("V{:04}", diag.code))
                .with_message(&diag.message)
                .with_labels(vec![Label::primary(
                    file_id,
                    diag.span.start..diag.span.end,
                )]);
            term::emit(&mut writer.lock(), &config, &files, &cs)?;
        }
        Ok(())
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
