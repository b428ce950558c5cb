//! Literal-type coercion for flat text fields.
//!
//! A trimmed field is parsed as a number, boolean, `None`, quoted string, list
//! or tuple (nesting allowed). Anything that does not parse completely stays a
//! plain string, which lets one positional schema carry both scalars and
//! structured values inside a delimited row.

use crate::domain::Value;

pub fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();
    parse_literal(trimmed).unwrap_or_else(|| Value::Str(trimmed.to_string()))
}

pub fn parse_literal(input: &str) -> Option<Value> {
    let mut parser = LiteralParser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.skip_whitespace();
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos == parser.chars.len() {
        Some(value)
    } else {
        None
    }
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Option<Value> {
        match self.peek()? {
            '[' => self.sequence(']').map(|(items, _)| Value::List(items)),
            '(' => {
                let (mut items, saw_comma) = self.sequence(')')?;
                // `(x)` is just a parenthesised value, `(x,)` is a tuple
                if items.len() == 1 && !saw_comma {
                    items.pop()
                } else {
                    Some(Value::List(items))
                }
            }
            '\'' | '"' => self.string(),
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            c if c.is_ascii_alphabetic() => self.keyword(),
            _ => None,
        }
    }

    /// Parses `open item, item, ... close`, allowing a trailing comma.
    fn sequence(&mut self, close: char) -> Option<(Vec<Value>, bool)> {
        self.bump()?;
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_whitespace();
            if self.peek()? == close {
                self.bump();
                return Some((items, saw_comma));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump()? {
                ',' => saw_comma = true,
                c if c == close => return Some((items, saw_comma)),
                _ => return None,
            }
        }
    }

    fn string(&mut self) -> Option<Value> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    c @ ('\\' | '\'' | '"') => out.push(c),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                },
                c if c == quote => return Some(Value::Str(out)),
                c => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => self.pos += 1,
                '.' => {
                    is_float = true;
                    self.pos += 1;
                }
                'e' | 'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some('-') | Some('+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        let text: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        let digits = text.trim_start_matches(['-', '+']);
        if digits.is_empty() || digits == "." {
            return None;
        }
        if is_float {
            return text.parse::<f64>().ok().map(Value::Float);
        }
        // Leading zeros (`007`) are not integer literals
        if digits.len() > 1 && digits.starts_with('0') && digits.chars().any(|c| c != '0') {
            return None;
        }
        text.parse::<i64>().ok().map(Value::Int)
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            "None" | "null" => Some(Value::None),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(coerce(" 42 "), Value::Int(42));
        assert_eq!(coerce("-3"), Value::Int(-3));
        assert_eq!(coerce("0.25"), Value::Float(0.25));
        assert_eq!(coerce("1e3"), Value::Float(1000.0));
        assert_eq!(coerce("True"), Value::Bool(true));
        assert_eq!(coerce("False"), Value::Bool(false));
        assert_eq!(coerce("None"), Value::None);
    }

    #[test]
    fn unparseable_text_stays_a_trimmed_string() {
        assert_eq!(coerce("  My Collection "), Value::text("My Collection"));
        assert_eq!(coerce("01-01-2024 10:00"), Value::text("01-01-2024 10:00"));
        assert_eq!(coerce("007"), Value::text("007"));
        assert_eq!(coerce("[1, 2"), Value::text("[1, 2"));
        assert_eq!(coerce(""), Value::text(""));
    }

    #[test]
    fn nested_lists_and_tuples() {
        assert_eq!(
            coerce("[['Background', 'Blue'], ('Eyes', \"Green\",)]"),
            Value::List(vec![
                Value::List(vec![Value::text("Background"), Value::text("Blue")]),
                Value::List(vec![Value::text("Eyes"), Value::text("Green")]),
            ])
        );
        assert_eq!(
            coerce("[True, 'secret\\ntext']"),
            Value::List(vec![Value::Bool(true), Value::text("secret\ntext")])
        );
        assert_eq!(coerce("(5)"), Value::Int(5));
        assert_eq!(coerce("[]"), Value::List(vec![]));
    }

    #[test]
    fn display_output_parses_back() {
        let value = Value::List(vec![
            Value::text("it's \\ quoted"),
            Value::Float(3.0),
            Value::List(vec![Value::Bool(false), Value::None]),
        ]);
        assert_eq!(coerce(&value.to_string()), value);
    }
}
