//! Condition and transform expression evaluation.
//!
//! Conditions and transform expressions are user-authored strings, so
//! they are interpreted by a small hand-written evaluator rather than
//! handed to any host-language evaluation. The grammar is deliberately
//! restricted:
//!
//! - literals: `'text'`, `"text"`, numbers, `true`, `false`, `null`
//! - dot-path lookups into the data context (`user.address.city`)
//! - `==` `!=` `<` `<=` `>` `>=`, `&&` `||`, unary `!` and `-`,
//!   `+ - * /`, parentheses
//!
//! Equality is loose: numbers compare equal to numeric strings, matching
//! the comparisons the workflow editor produces. Condition evaluation
//! never propagates an error; anything that fails to parse or evaluate
//! is `false`.

use crate::error::ExpressionError;
use crate::template::lookup_path;
use serde_json::Value as JsonValue;

/// Evaluates a condition string against a data context.
///
/// A single `==` between two simple operands (quoted literal, numeric
/// literal, or dot-path) takes a fast path matching the editor's
/// generated conditions; anything else runs through the full expression
/// grammar and is coerced to a boolean by truthiness. Evaluation errors
/// are swallowed to `false`.
#[must_use]
pub fn evaluate_condition(condition: &str, context: &JsonValue) -> bool {
    if let Some((left, right)) = split_simple_equality(condition) {
        return loose_eq(&extract_operand(left, context), &extract_operand(right, context));
    }

    match evaluate_expression(condition, context) {
        Ok(value) => truthy(&value),
        Err(e) => {
            tracing::debug!(condition, error = %e, "condition evaluated to false");
            false
        }
    }
}

/// Evaluates an expression string against a data context.
///
/// # Errors
///
/// Returns an error if the expression cannot be parsed or evaluated.
pub fn evaluate_expression(
    expression: &str,
    context: &JsonValue,
) -> Result<JsonValue, ExpressionError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        context,
    };
    let value = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExpressionError::Parse {
            reason: "trailing input after expression".to_string(),
        });
    }
    Ok(value)
}

/// JS-like truthiness: `false`, `null`, `0`, and `""` are falsy.
#[must_use]
pub fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Splits `left == right` when both sides are simple operands.
fn split_simple_equality(condition: &str) -> Option<(&str, &str)> {
    let (left, right) = condition.split_once("==")?;
    let is_simple = |s: &str| {
        !s.contains(['=', '<', '>', '!', '&', '|', '(', ')', '+', '*', '/'])
    };
    if is_simple(left) && is_simple(right) {
        Some((left.trim(), right.trim()))
    } else {
        None
    }
}

/// Resolves one side of a simple equality: quoted literal, numeric
/// literal, or dot-path into the context (missing paths become null).
fn extract_operand(operand: &str, context: &JsonValue) -> JsonValue {
    let trimmed = operand.trim();

    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return JsonValue::String(trimmed[1..trimmed.len() - 1].to_string());
        }
    }

    if let Ok(number) = trimmed.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(number) {
            return JsonValue::Number(n);
        }
    }

    lookup_path(context, trimmed)
        .cloned()
        .unwrap_or(JsonValue::Null)
}

/// Loose equality with numeric coercion.
///
/// Null equals only null (a missing path never equals a number or
/// string); booleans and numeric strings coerce to numbers; everything
/// else falls back to structural equality.
fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => true,
        (JsonValue::Null, _) | (_, JsonValue::Null) => false,
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x == y,
        (JsonValue::String(x), JsonValue::String(y)) => x == y,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Path(String),
    True,
    False,
    Null,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(ExpressionError::Parse {
                        reason: "single '=' is not an operator".to_string(),
                    });
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    tokens.push(Token::Bang);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::AndAnd);
                    i += 2;
                } else {
                    return Err(ExpressionError::Parse {
                        reason: "single '&' is not an operator".to_string(),
                    });
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::OrOr);
                    i += 2;
                } else {
                    return Err(ExpressionError::Parse {
                        reason: "single '|' is not an operator".to_string(),
                    });
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => {
                            return Err(ExpressionError::Parse {
                                reason: "unterminated string literal".to_string(),
                            });
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text.parse::<f64>().map_err(|_| ExpressionError::Parse {
                    reason: format!("invalid number: {text}"),
                })?;
                tokens.push(Token::Number(number));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                match text.as_str() {
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    "null" => tokens.push(Token::Null),
                    _ => tokens.push(Token::Path(text)),
                }
            }
            _ => {
                return Err(ExpressionError::Parse {
                    reason: format!("unexpected character: {c}"),
                });
            }
        }
    }

    if tokens.is_empty() {
        return Err(ExpressionError::Parse {
            reason: "empty expression".to_string(),
        });
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    context: &'a JsonValue,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<JsonValue, ExpressionError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = JsonValue::Bool(truthy(&left) || truthy(&right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<JsonValue, ExpressionError> {
        let mut left = self.parse_equality()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = JsonValue::Bool(truthy(&left) && truthy(&right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<JsonValue, ExpressionError> {
        let mut left = self.parse_comparison()?;
        loop {
            let negate = match self.peek() {
                Some(Token::EqEq) => false,
                Some(Token::NotEq) => true,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            let equal = loose_eq(&left, &right);
            left = JsonValue::Bool(if negate { !equal } else { equal });
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<JsonValue, ExpressionError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => Token::Lt,
                Some(Token::Le) => Token::Le,
                Some(Token::Gt) => Token::Gt,
                Some(Token::Ge) => Token::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = JsonValue::Bool(compare(&op, &left, &right)?);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<JsonValue, ExpressionError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Token::Plus,
                Some(Token::Minus) => Token::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = match op {
                Token::Plus => add(&left, &right)?,
                _ => numeric_op(&left, &right, |a, b| a - b)?,
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<JsonValue, ExpressionError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Token::Star,
                Some(Token::Slash) => Token::Slash,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = match op {
                Token::Star => numeric_op(&left, &right, |a, b| a * b)?,
                _ => numeric_op(&left, &right, |a, b| a / b)?,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<JsonValue, ExpressionError> {
        match self.peek() {
            Some(Token::Bang) => {
                self.advance();
                let value = self.parse_unary()?;
                Ok(JsonValue::Bool(!truthy(&value)))
            }
            Some(Token::Minus) => {
                self.advance();
                let value = self.parse_unary()?;
                let number = as_number(&value).ok_or_else(|| ExpressionError::Eval {
                    reason: "cannot negate a non-numeric value".to_string(),
                })?;
                number_value(-number)
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<JsonValue, ExpressionError> {
        match self.advance() {
            Some(Token::Number(n)) => number_value(n),
            Some(Token::Str(s)) => Ok(JsonValue::String(s)),
            Some(Token::True) => Ok(JsonValue::Bool(true)),
            Some(Token::False) => Ok(JsonValue::Bool(false)),
            Some(Token::Null) => Ok(JsonValue::Null),
            Some(Token::Path(path)) => Ok(lookup_path(self.context, &path)
                .cloned()
                .unwrap_or(JsonValue::Null)),
            Some(Token::LParen) => {
                let value = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ExpressionError::Parse {
                        reason: "expected closing parenthesis".to_string(),
                    }),
                }
            }
            other => Err(ExpressionError::Parse {
                reason: format!("unexpected token: {other:?}"),
            }),
        }
    }
}

fn compare(op: &Token, left: &JsonValue, right: &JsonValue) -> Result<bool, ExpressionError> {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return Ok(match op {
            Token::Lt => a < b,
            Token::Le => a <= b,
            Token::Gt => a > b,
            _ => a >= b,
        });
    }
    if let (JsonValue::String(a), JsonValue::String(b)) = (left, right) {
        return Ok(match op {
            Token::Lt => a < b,
            Token::Le => a <= b,
            Token::Gt => a > b,
            _ => a >= b,
        });
    }
    Err(ExpressionError::Eval {
        reason: "cannot compare non-comparable values".to_string(),
    })
}

fn add(left: &JsonValue, right: &JsonValue) -> Result<JsonValue, ExpressionError> {
    // String concatenation wins when either side is a string.
    if left.is_string() || right.is_string() {
        let render = |v: &JsonValue| match v {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Ok(JsonValue::String(format!("{}{}", render(left), render(right))));
    }
    numeric_op(left, right, |a, b| a + b)
}

fn numeric_op(
    left: &JsonValue,
    right: &JsonValue,
    op: impl Fn(f64, f64) -> f64,
) -> Result<JsonValue, ExpressionError> {
    let (Some(a), Some(b)) = (as_number(left), as_number(right)) else {
        return Err(ExpressionError::Eval {
            reason: "arithmetic requires numeric operands".to_string(),
        });
    };
    number_value(op(a, b))
}

fn number_value(number: f64) -> Result<JsonValue, ExpressionError> {
    serde_json::Number::from_f64(number)
        .map(JsonValue::Number)
        .ok_or_else(|| ExpressionError::Eval {
            reason: "arithmetic produced a non-finite number".to_string(),
        })
}
