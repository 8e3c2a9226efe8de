//! Pretty-printing for the script AST
//!
//! Provides human-readable output for debugging lowered code. This is a
//! debugging aid, not the production serializer.

use super::{ScriptExpr, ScriptStmt};
use std::fmt::Write;

/// Trait for pretty-printing script constructs
pub trait PrettyPrint {
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for ScriptExpr {
    fn pretty_print(&self) -> String {
        format_expr(self)
    }
}

impl PrettyPrint for ScriptStmt {
    fn pretty_print(&self) -> String {
        format_stmt(self, 0)
    }
}

impl PrettyPrint for [ScriptStmt] {
    fn pretty_print(&self) -> String {
        let mut output = String::new();
        for stmt in self {
            output.push_str(&format_stmt(stmt, 0));
        }
        output
    }
}

impl PrettyPrint for Vec<ScriptStmt> {
    fn pretty_print(&self) -> String {
        self.as_slice().pretty_print()
    }
}

/// Parenthesize operands that would otherwise parse differently
fn format_operand(expr: &ScriptExpr) -> String {
    match expr {
        ScriptExpr::Binary { .. }
        | ScriptExpr::Conditional { .. }
        | ScriptExpr::Assign { .. }
        | ScriptExpr::Function { .. } => format!("({})", format_expr(expr)),
        _ => format_expr(expr),
    }
}

fn format_expr(expr: &ScriptExpr) -> String {
    match expr {
        ScriptExpr::Ident(name) => name.clone(),
        ScriptExpr::This => "this".to_string(),
        ScriptExpr::Null => "null".to_string(),
        ScriptExpr::Bool(b) => b.to_string(),
        ScriptExpr::Int(i) => i.to_string(),
        ScriptExpr::Num(n) => n.to_string(),
        ScriptExpr::Str(s) => format!("{:?}", s),
        ScriptExpr::Member { object, name } => {
            format!("{}.{}", format_operand(object), name)
        }
        ScriptExpr::Index { object, index } => {
            format!("{}[{}]", format_operand(object), format_expr(index))
        }
        ScriptExpr::Call { callee, args } => {
            let args: Vec<String> = args.iter().map(format_expr).collect();
            format!("{}({})", format_operand(callee), args.join(", "))
        }
        ScriptExpr::New { callee, args } => {
            let args: Vec<String> = args.iter().map(format_expr).collect();
            format!("new {}({})", format_operand(callee), args.join(", "))
        }
        ScriptExpr::Function { params, body } => {
            let mut output = format!("function({}) {{", params.join(", "));
            if body.is_empty() {
                output.push_str(" }");
            } else {
                output.push('\n');
                for stmt in body {
                    output.push_str(&format_stmt(stmt, 2));
                }
                output.push('}');
            }
            output
        }
        ScriptExpr::Unary { op, operand } => {
            format!("{}{}", op.symbol(), format_operand(operand))
        }
        ScriptExpr::Binary { op, lhs, rhs } => {
            format!(
                "{} {} {}",
                format_operand(lhs),
                op.symbol(),
                format_operand(rhs)
            )
        }
        ScriptExpr::Conditional {
            test,
            when_true,
            when_false,
        } => {
            format!(
                "{} ? {} : {}",
                format_operand(test),
                format_operand(when_true),
                format_operand(when_false)
            )
        }
        ScriptExpr::Assign { target, value } => {
            format!("{} = {}", format_expr(target), format_expr(value))
        }
        ScriptExpr::ArrayLit(items) => {
            let items: Vec<String> = items.iter().map(format_expr).collect();
            format!("[{}]", items.join(", "))
        }
        ScriptExpr::ObjectLit(entries) => {
            if entries.is_empty() {
                return "{}".to_string();
            }
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_expr(v)))
                .collect();
            format!("{{ {} }}", entries.join(", "))
        }
    }
}

fn format_block(body: &[ScriptStmt], indent: usize) -> String {
    let mut output = String::new();
    for stmt in body {
        output.push_str(&format_stmt(stmt, indent));
    }
    output
}

fn format_stmt(stmt: &ScriptStmt, indent: usize) -> String {
    let prefix = " ".repeat(indent);
    let mut output = String::new();
    match stmt {
        ScriptStmt::Expr(expr) => {
            writeln!(output, "{}{};", prefix, format_expr(expr)).unwrap();
        }
        ScriptStmt::VarDecl { name, init } => match init {
            Some(init) => writeln!(output, "{}var {} = {};", prefix, name, format_expr(init)).unwrap(),
            None => writeln!(output, "{}var {};", prefix, name).unwrap(),
        },
        ScriptStmt::Return(value) => match value {
            Some(value) => writeln!(output, "{}return {};", prefix, format_expr(value)).unwrap(),
            None => writeln!(output, "{}return;", prefix).unwrap(),
        },
        ScriptStmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            writeln!(output, "{}if ({}) {{", prefix, format_expr(cond)).unwrap();
            output.push_str(&format_block(then_branch, indent + 2));
            match else_branch {
                Some(else_branch) => {
                    writeln!(output, "{}}} else {{", prefix).unwrap();
                    output.push_str(&format_block(else_branch, indent + 2));
                    writeln!(output, "{}}}", prefix).unwrap();
                }
                None => writeln!(output, "{}}}", prefix).unwrap(),
            }
        }
        ScriptStmt::While { cond, body } => {
            writeln!(output, "{}while ({}) {{", prefix, format_expr(cond)).unwrap();
            output.push_str(&format_block(body, indent + 2));
            writeln!(output, "{}}}", prefix).unwrap();
        }
        ScriptStmt::DoWhile { body, cond } => {
            writeln!(output, "{}do {{", prefix).unwrap();
            output.push_str(&format_block(body, indent + 2));
            writeln!(output, "{}}} while ({});", prefix, format_expr(cond)).unwrap();
        }
        ScriptStmt::Block(body) => {
            writeln!(output, "{}{{", prefix).unwrap();
            output.push_str(&format_block(body, indent + 2));
            writeln!(output, "{}}}", prefix).unwrap();
        }
        ScriptStmt::Break => writeln!(output, "{}break;", prefix).unwrap(),
        ScriptStmt::Continue => writeln!(output, "{}continue;", prefix).unwrap(),
        ScriptStmt::Throw(value) => {
            writeln!(output, "{}throw {};", prefix, format_expr(value)).unwrap();
        }
    }
    output
}
