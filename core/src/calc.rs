//! Arithmetic at the end of the host text.
//!
//! When the text before the cursor ends in an expression such as `12*3=` or
//! `(1+2)/4`, the keyboard offers the result as literal candidates instead of
//! word predictions. Supported: `+ - * / × ÷`, parentheses, unary minus and
//! decimal numbers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longer trailing expressions are ignored.
pub const MAX_EXPRESSION_CHARS: usize = 100;

static TRAILING_EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9().+\-*/×÷ ]+=?$").expect("valid expression pattern"));

fn is_operator(ch: char) -> bool {
    matches!(ch, '+' | '-' | '*' | '/' | '×' | '÷')
}

/// The arithmetic expression `text` ends with, if any.
///
/// A lone number is not an expression: at least one binary operator must
/// follow a digit or closing parenthesis.
pub fn trailing_expression(text: &str) -> Option<&str> {
    let found = TRAILING_EXPRESSION.find(text)?.as_str();
    let expr = found.trim_start_matches(|c: char| {
        matches!(c, ' ' | '+' | '*' | '/' | '×' | '÷' | ')' | '.')
    });
    let body = expr.trim_end_matches('=');

    let mut seen_operand = false;
    let mut has_binary = false;
    for ch in body.chars() {
        if ch.is_ascii_digit() || ch == ')' {
            seen_operand = true;
        } else if is_operator(ch) && seen_operand {
            has_binary = true;
        }
    }
    if !has_binary || expr.chars().count() >= MAX_EXPRESSION_CHARS {
        return None;
    }
    Some(expr)
}

/// Evaluate `expr`, ignoring spaces and one trailing `=`.
///
/// Returns `None` for malformed input, division by zero or a non-finite
/// result.
pub fn evaluate(expr: &str) -> Option<f64> {
    let body = expr.trim().strip_suffix('=').unwrap_or(expr.trim());
    let chars: Vec<char> = body.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = Parser { chars, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.chars.len() || !value.is_finite() {
        return None;
    }
    Some(value)
}

/// Candidate texts for a trailing expression.
///
/// After `=` only the value is offered; otherwise `=value` comes first so the
/// committed text reads as an equation.
pub fn results_for(expr: &str) -> Vec<String> {
    let Some(value) = evaluate(expr) else {
        return Vec::new();
    };
    let value = format_value(value);
    if expr.trim_end().ends_with('=') {
        vec![value]
    } else {
        vec![format!("={value}"), value]
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let text = format!("{value:.10}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(op @ ('*' | '/' | '×' | '÷')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = match op {
                '*' | '×' => value * rhs,
                _ if rhs == 0.0 => return None,
                _ => value / rhs,
            };
        }
        Some(value)
    }

    fn factor(&mut self) -> Option<f64> {
        match self.peek()? {
            '-' => {
                self.pos += 1;
                Some(-self.factor()?)
            }
            '(' => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(')') {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            _ => self.number(),
        }
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse().ok()
    }
}
