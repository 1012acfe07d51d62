//! Conditional expression evaluation for `if="…"` attributes.
//!
//! The grammar is deliberately small: literals, dot paths, parentheses,
//! `not`/`and`/`or`, the six comparisons, and membership via `in`. There is
//! no function call, no arithmetic, no indexing beyond `.`, and no host
//! evaluator anywhere near this code path. Evaluation short-circuits and a
//! missing dot path yields `null`.

use serde_json::Value;

use crate::diagnostics::{Diagnostic, ErrorCode};

/// Evaluate a conditional expression against the variable scope.
///
/// `line`/`column` locate the attribute that carried the expression, so
/// diagnostics point at the document rather than into the expression text.
pub fn evaluate(
    text: &str,
    scope: &serde_json::Map<String, Value>,
    line: usize,
    column: usize,
) -> Result<Value, Diagnostic> {
    let tokens = lex(text).map_err(|msg| {
        Diagnostic::new(
            ErrorCode::F705,
            format!("cannot parse conditional '{}': {}", text, msg),
            line,
            column,
        )
    })?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.parse_or().map_err(|msg| {
        Diagnostic::new(
            ErrorCode::F705,
            format!("cannot parse conditional '{}': {}", text, msg),
            line,
            column,
        )
    })?;
    if !parser.at_end() {
        return Err(Diagnostic::new(
            ErrorCode::F705,
            format!("cannot parse conditional '{}': trailing input", text),
            line,
            column,
        ));
    }
    eval(&expr, scope, line, column)
}

/// Truthiness used for conditional pruning: `false`, `null`, zero, the empty
/// string, and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Resolve a dot path against the scope; a miss at any step yields `None`.
pub fn resolve_path(scope: &serde_json::Map<String, Value>, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = scope.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    Null,
    LParen,
    RParen,
    Dot,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    And,
    Or,
    Not,
    In,
}

fn lex(text: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            '.' => {
                tokens.push(Tok::Dot);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Eq);
                    i += 2;
                } else {
                    return Err("'=' is not an operator; use '=='".to_string());
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ne);
                    i += 2;
                } else {
                    return Err("'!' is not an operator; use 'not'".to_string());
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Le);
                    i += 2;
                } else {
                    tokens.push(Tok::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ge);
                    i += 2;
                } else {
                    tokens.push(Tok::Gt);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated string".to_string()),
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            i += 1;
                            match chars.get(i) {
                                Some(&esc) => {
                                    s.push(esc);
                                    i += 1;
                                }
                                None => return Err("unterminated string".to_string()),
                            }
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Tok::Str(s));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut text = String::new();
                if c == '-' {
                    text.push('-');
                    i += 1;
                    if !chars.get(i).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        return Err("'-' must start a number".to_string());
                    }
                }
                let mut is_float = false;
                while let Some(&ch) = chars.get(i) {
                    if ch.is_ascii_digit() {
                        text.push(ch);
                        i += 1;
                    } else if ch == '.'
                        && chars.get(i + 1).map(|c| c.is_ascii_digit()).unwrap_or(false)
                    {
                        is_float = true;
                        text.push('.');
                        i += 1;
                    } else {
                        break;
                    }
                }
                if is_float {
                    tokens.push(Tok::Float(text.parse().map_err(|_| "bad number")?));
                } else {
                    tokens.push(Tok::Int(text.parse().map_err(|_| "bad number")?));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&ch) = chars.get(i) {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        word.push(ch);
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(match word.as_str() {
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "not" => Tok::Not,
                    "in" => Tok::In,
                    "true" => Tok::True,
                    "false" => Tok::False,
                    "null" => Tok::Null,
                    _ => Tok::Ident(word),
                });
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
enum Expr {
    Lit(Value),
    Path(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(Box<Expr>, CmpOp, Box<Expr>),
    In(Box<Expr>, Box<Expr>),
}

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl ExprParser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Tok::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Tok::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Tok::Not) {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let left = self.parse_atom()?;
        let op = match self.peek() {
            Some(Tok::Eq) => Some(CmpOp::Eq),
            Some(Tok::Ne) => Some(CmpOp::Ne),
            Some(Tok::Lt) => Some(CmpOp::Lt),
            Some(Tok::Le) => Some(CmpOp::Le),
            Some(Tok::Gt) => Some(CmpOp::Gt),
            Some(Tok::Ge) => Some(CmpOp::Ge),
            Some(Tok::In) => {
                self.pos += 1;
                let right = self.parse_atom()?;
                return Ok(Expr::In(Box::new(left), Box::new(right)));
            }
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let right = self.parse_atom()?;
                Ok(Expr::Cmp(Box::new(left), op, Box::new(right)))
            }
            None => Ok(left),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        match self.peek().cloned() {
            Some(Tok::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                if self.peek() != Some(&Tok::RParen) {
                    return Err("expected ')'".to_string());
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(Tok::Str(s)) => {
                self.pos += 1;
                Ok(Expr::Lit(Value::String(s)))
            }
            Some(Tok::Int(i)) => {
                self.pos += 1;
                Ok(Expr::Lit(Value::Number(i.into())))
            }
            Some(Tok::Float(f)) => {
                self.pos += 1;
                let number = serde_json::Number::from_f64(f).ok_or("bad number")?;
                Ok(Expr::Lit(Value::Number(number)))
            }
            Some(Tok::True) => {
                self.pos += 1;
                Ok(Expr::Lit(Value::Bool(true)))
            }
            Some(Tok::False) => {
                self.pos += 1;
                Ok(Expr::Lit(Value::Bool(false)))
            }
            Some(Tok::Null) => {
                self.pos += 1;
                Ok(Expr::Lit(Value::Null))
            }
            Some(Tok::Ident(first)) => {
                self.pos += 1;
                let mut path = first;
                while self.peek() == Some(&Tok::Dot) {
                    self.pos += 1;
                    match self.peek().cloned() {
                        Some(Tok::Ident(seg)) => {
                            self.pos += 1;
                            path.push('.');
                            path.push_str(&seg);
                        }
                        _ => return Err("expected identifier after '.'".to_string()),
                    }
                }
                Ok(Expr::Path(path))
            }
            Some(tok) => Err(format!("unexpected token {:?}", tok)),
            None => Err("expression is empty".to_string()),
        }
    }
}

fn eval(
    expr: &Expr,
    scope: &serde_json::Map<String, Value>,
    line: usize,
    column: usize,
) -> Result<Value, Diagnostic> {
    match expr {
        Expr::Lit(v) => Ok(v.clone()),
        Expr::Path(path) => Ok(resolve_path(scope, path).unwrap_or(Value::Null)),
        Expr::Not(inner) => {
            let value = eval(inner, scope, line, column)?;
            Ok(Value::Bool(!is_truthy(&value)))
        }
        Expr::And(left, right) => {
            let lv = eval(left, scope, line, column)?;
            if !is_truthy(&lv) {
                return Ok(Value::Bool(false));
            }
            let rv = eval(right, scope, line, column)?;
            Ok(Value::Bool(is_truthy(&rv)))
        }
        Expr::Or(left, right) => {
            let lv = eval(left, scope, line, column)?;
            if is_truthy(&lv) {
                return Ok(Value::Bool(true));
            }
            let rv = eval(right, scope, line, column)?;
            Ok(Value::Bool(is_truthy(&rv)))
        }
        Expr::Cmp(left, op, right) => {
            let lv = eval(left, scope, line, column)?;
            let rv = eval(right, scope, line, column)?;
            compare(&lv, *op == CmpOp::Eq || *op == CmpOp::Ne, op, &rv, line, column)
        }
        Expr::In(left, right) => {
            let needle = eval(left, scope, line, column)?;
            let haystack = eval(right, scope, line, column)?;
            membership(&needle, &haystack, line, column)
        }
    }
}

/// Equality unifies integer and float representations; ordering requires two
/// numbers or two strings.
fn compare(
    left: &Value,
    is_equality: bool,
    op: &CmpOp,
    right: &Value,
    line: usize,
    column: usize,
) -> Result<Value, Diagnostic> {
    if is_equality {
        let equal = json_eq(left, right);
        return Ok(Value::Bool(match op {
            CmpOp::Eq => equal,
            CmpOp::Ne => !equal,
            _ => unreachable!(),
        }));
    }
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(Diagnostic::new(
                ErrorCode::F703,
                format!(
                    "cannot order {} against {}",
                    type_name(left),
                    type_name(right)
                ),
                line,
                column,
            ));
        }
    };
    let Some(ordering) = ordering else {
        return Err(Diagnostic::new(
            ErrorCode::F703,
            "numbers are not comparable",
            line,
            column,
        ));
    };
    let result = match op {
        CmpOp::Lt => ordering == std::cmp::Ordering::Less,
        CmpOp::Le => ordering != std::cmp::Ordering::Greater,
        CmpOp::Gt => ordering == std::cmp::Ordering::Greater,
        CmpOp::Ge => ordering != std::cmp::Ordering::Less,
        CmpOp::Eq | CmpOp::Ne => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn membership(
    needle: &Value,
    haystack: &Value,
    line: usize,
    column: usize,
) -> Result<Value, Diagnostic> {
    match haystack {
        Value::Array(items) => Ok(Value::Bool(items.iter().any(|v| json_eq(v, needle)))),
        Value::String(s) => match needle {
            Value::String(sub) => Ok(Value::Bool(s.contains(sub.as_str()))),
            _ => Err(Diagnostic::new(
                ErrorCode::F703,
                format!("cannot search a string for {}", type_name(needle)),
                line,
                column,
            )),
        },
        Value::Object(map) => match needle {
            Value::String(key) => Ok(Value::Bool(map.contains_key(key))),
            _ => Err(Diagnostic::new(
                ErrorCode::F703,
                format!("cannot search an object for {}", type_name(needle)),
                line,
                column,
            )),
        },
        _ => Err(Diagnostic::new(
            ErrorCode::F703,
            format!("'in' requires an array, string, or object, not {}", type_name(haystack)),
            line,
            column,
        )),
    }
}

/// Structural equality with numeric unification (`1 == 1.0`).
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().unwrap_or(f64::NAN) == y.as_f64().unwrap_or(f64::NAN)
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map(|w| json_eq(v, w)).unwrap_or(false))
        }
        _ => a == b,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
