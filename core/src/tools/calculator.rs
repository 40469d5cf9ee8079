use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolResult};
use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};

const MAX_DEPTH: usize = 64;

/// Arithmetic evaluator. Never hands the expression to anything that could
/// run it as code.
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression with + - * / % ^ and parentheses"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Expression to evaluate, e.g. (2434 + 1988) * 0.05"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let expression = extract_string_arg(&args, "expression")?;
        match evaluate(&expression) {
            Ok(value) => ToolResult::json(&json!({ "expression": expression, "result": value })),
            Err(e) => Ok(ToolResult::error(format!("{e}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if !(d.is_ascii_digit() || d == '.') {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                let literal = &input[start..end];
                let value: f64 = literal
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid number '{literal}'"))?;
                tokens.push(Token::Num(value));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            other => bail!("Unexpected character '{other}' at position {start}"),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            bail!("Expression is nested too deeply");
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            if rhs == 0.0 && op != '*' {
                bail!("Division by zero");
            }
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                self.enter()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(-value)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.enter()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.power(),
        }
    }

    // power := atom ('^' unary)?   right associative
    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            self.enter()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::Open) => {
                self.enter()?;
                let value = self.expr()?;
                if self.next() != Some(Token::Close) {
                    bail!("Missing closing parenthesis");
                }
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Close) => bail!("Unexpected ')'"),
            Some(Token::Op(op)) => bail!("Unexpected operator '{op}'"),
            None => bail!("Unexpected end of expression"),
        }
    }
}

pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        bail!("Expression is empty");
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        bail!("Unexpected input after position {}", parser.pos);
    }
    if !value.is_finite() {
        bail!("Result is not a finite number");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("7 % 4").unwrap(), 3.0);
        assert_eq!(evaluate("2434 * 0.5").unwrap(), 1217.0);
        assert_eq!(evaluate("--3").unwrap(), 3.0);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(evaluate("1 / 0").unwrap_err().to_string().contains("Division by zero"));
        assert!(evaluate("5 % 0").is_err());
        assert!(evaluate("__import__('os')").is_err());
        assert!(evaluate("1 +").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 2").is_err());
        assert!(evaluate("1.2.3").is_err());
        assert!(evaluate("   ").is_err());

        let nested = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(evaluate(&nested).unwrap_err().to_string().contains("nested"));
    }

    #[test]
    fn long_sign_runs_hit_the_nesting_limit() {
        for sign in ["+", "-"] {
            let expression = format!("{}1", sign.repeat(200_000));
            let err = evaluate(&expression).unwrap_err();
            assert!(err.to_string().contains("nested"), "{sign}: {err}");
        }
        assert_eq!(evaluate("+-+1").unwrap(), -1.0);
    }

    #[tokio::test]
    async fn tool_reports_errors_as_results() {
        let ok = CalculatorTool
            .execute(json!({"expression": "(2434 + 1988) / 2"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&ok.output).unwrap();
        assert_eq!(value["result"], 2211.0);

        let err = CalculatorTool.execute(json!({"expression": "1/0"})).await.unwrap();
        assert!(!err.success);
    }
}
