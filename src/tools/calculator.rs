use super::traits::{Tool, ToolFuture, ToolInputs, optional_str};
use anyhow::{Result, anyhow, bail};
use serde_json::{Value, json};

/// Arithmetic evaluation and simple descriptive statistics.
pub struct CalculatorTool;

impl CalculatorTool {
    pub const fn new() -> Self {
        Self
    }
}

impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. 'sqrt(16) + 2^3'"
                },
                "operation": {
                    "type": "string",
                    "enum": ["evaluate", "statistics"],
                    "default": "evaluate"
                },
                "data": {
                    "type": "array",
                    "items": {"type": "number"},
                    "description": "Numbers for operation=statistics"
                }
            }
        })
    }

    fn invoke<'a>(&'a self, inputs: &'a ToolInputs) -> ToolFuture<'a> {
        Box::pin(async move {
            match optional_str(inputs, "operation").unwrap_or("evaluate") {
                "evaluate" => {
                    let value = match inputs.get("expression") {
                        Some(Value::String(expression)) => evaluate(expression)?,
                        Some(Value::Number(number)) => number
                            .as_f64()
                            .ok_or_else(|| anyhow!("expression is not a finite number"))?,
                        Some(other) => bail!("expression must be a string, got {other}"),
                        None => bail!("Missing 'expression' parameter"),
                    };
                    Ok(number_value(value))
                }
                "statistics" => {
                    let data = inputs
                        .get("data")
                        .ok_or_else(|| anyhow!("Missing 'data' parameter"))?;
                    statistics(data)
                }
                other => bail!("Unknown operation: {other}"),
            }
        })
    }
}

/// Evaluate an arithmetic expression.
///
/// Supports `+ - * / %`, `^` and `**` for powers (right associative, binding
/// tighter than unary minus), parentheses, the constants `pi` and `e`, and
/// the functions `sin cos tan sqrt log log10 exp pow abs round floor ceil min max`.
pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        bail!("Error evaluating expression: empty expression");
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        bail!("Error evaluating expression: unexpected token {token:?}");
    }
    if !value.is_finite() {
        bail!("Error evaluating expression: result is not finite");
    }
    Ok(value)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_value(value: f64) -> Value {
    const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < EXACT_INT_LIMIT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[allow(clippy::cast_precision_loss)]
fn statistics(data: &Value) -> Result<Value> {
    let items = data
        .as_array()
        .ok_or_else(|| anyhow!("data must be an array of numbers"))?;
    let mut values = items
        .iter()
        .map(|item| match item {
            Value::Number(n) => n.as_f64().ok_or_else(|| anyhow!("invalid number {n}")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| anyhow!("not a number: {s}")),
            other => Err(anyhow!("not a number: {other}")),
        })
        .collect::<Result<Vec<_>>>()?;
    if values.is_empty() {
        bail!("data must not be empty");
    }

    values.sort_by(f64::total_cmp);
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    Ok(json!({
        "mean": number_value(mean),
        "median": number_value(median),
        "std": number_value(variance.sqrt()),
        "min": number_value(values[0]),
        "max": number_value(values[values.len() - 1]),
    }))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars = input.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Scientific notation: 1e3, 2.5E-4
                if i < chars.len()
                    && matches!(chars[i], 'e' | 'E')
                    && chars
                        .get(i + 1)
                        .is_some_and(|n| n.is_ascii_digit() || matches!(n, '+' | '-'))
                {
                    let save = i;
                    i += 1;
                    if matches!(chars[i], '+' | '-') {
                        i += 1;
                    }
                    if i < chars.len() && chars[i].is_ascii_digit() {
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    } else {
                        i = save;
                    }
                }
                let literal = chars[start..i].iter().collect::<String>();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| anyhow!("Error evaluating expression: bad number '{literal}'"))?;
                tokens.push(Token::Number(number));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(
                    chars[start..i].iter().collect::<String>().to_lowercase(),
                ));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Caret);
                i += 2;
            }
            '+' | '-' | '*' | '×' | '/' | '÷' | '%' | '^' | '(' | ')' | ',' => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' | '×' => Token::Star,
                    '/' | '÷' => Token::Slash,
                    '%' => Token::Percent,
                    '^' => Token::Caret,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Comma,
                });
                i += 1;
            }
            other => bail!("Error evaluating expression: unexpected character '{other}'"),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                value += self.term()?;
            } else if self.eat(&Token::Minus) {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        loop {
            if self.eat(&Token::Star) {
                value *= self.unary()?;
            } else if self.eat(&Token::Slash) {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    bail!("Error evaluating expression: division by zero");
                }
                value /= divisor;
            } else if self.eat(&Token::Percent) {
                let divisor = self.unary()?;
                if divisor == 0.0 {
                    bail!("Error evaluating expression: modulo by zero");
                }
                // Floored: the result takes the sign of the divisor.
                value -= divisor * (value / divisor).floor();
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        if self.eat(&Token::Minus) {
            return Ok(-self.unary()?);
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if self.eat(&Token::Caret) {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.expr()?;
                if !self.eat(&Token::RParen) {
                    bail!("Error evaluating expression: missing ')'");
                }
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments()?;
                    call(&name, &args)
                } else {
                    constant(&name)
                }
            }
            Some(token) => bail!("Error evaluating expression: unexpected token {token:?}"),
            None => bail!("Error evaluating expression: unexpected end of input"),
        }
    }

    fn arguments(&mut self) -> Result<Vec<f64>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            bail!("Error evaluating expression: expected ',' or ')'");
        }
    }
}

fn constant(name: &str) -> Result<f64> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        other => bail!("Error evaluating expression: name '{other}' is not defined"),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn call(name: &str, args: &[f64]) -> Result<f64> {
    let unary = |f: fn(f64) -> f64| -> Result<f64> {
        match args {
            [x] => Ok(f(*x)),
            _ => bail!("{name}() takes exactly one argument ({} given)", args.len()),
        }
    };

    match name {
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "tan" => unary(f64::tan),
        "exp" => unary(f64::exp),
        "abs" => unary(f64::abs),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "log10" => unary(f64::log10),
        "sqrt" => match args {
            [x] if *x < 0.0 => bail!("math domain error: sqrt of negative number"),
            _ => unary(f64::sqrt),
        },
        "log" => match args {
            [x] if *x <= 0.0 => bail!("math domain error: log of non-positive number"),
            [x] => Ok(x.ln()),
            [x, base] if *x > 0.0 && *base > 0.0 => Ok(x.log(*base)),
            [_, _] => bail!("math domain error"),
            _ => bail!("log() takes one or two arguments"),
        },
        "pow" => match args {
            [base, exponent] => Ok(base.powf(*exponent)),
            _ => bail!("pow() takes exactly two arguments"),
        },
        "round" => match args {
            [x] => Ok(round_half_even(*x)),
            [x, digits] => {
                let factor = 10_f64.powi(*digits as i32);
                Ok(round_half_even(x * factor) / factor)
            }
            _ => bail!("round() takes one or two arguments"),
        },
        "min" | "max" => {
            if args.is_empty() {
                bail!("{name}() expected at least one argument");
            }
            let fold = if name == "min" { f64::min } else { f64::max };
            Ok(args.iter().copied().fold(args[0], fold))
        }
        other => bail!("Error evaluating expression: unknown function '{other}'"),
    }
}

/// Banker's rounding, matching Python's `round`.
fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - x.signum()
    } else {
        rounded
    }
}
