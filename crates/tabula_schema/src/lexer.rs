//! Tokenizer for the canonical schema DSL.

use crate::error::{SchemaError, SchemaResult};

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier or keyword.
    Ident(String),
    /// Numeric literal, kept verbatim.
    Number(String),
    /// Double-quoted string literal, unescaped.
    Str(String),
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `?`
    Question,
    /// `@`
    At,
}

impl Token {
    /// Short description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("`{name}`"),
            Token::Number(n) => format!("number `{n}`"),
            Token::Str(_) => "string literal".to_string(),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Dot => "`.`".to_string(),
            Token::Question => "`?`".to_string(),
            Token::At => "`@`".to_string(),
        }
    }
}

/// A token with its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// 1-based source line.
    pub line: usize,
}

/// Tokenizes a schema document.
///
/// Whitespace is insignificant; `#` and `//` start line comments.
pub fn tokenize(input: &str) -> SchemaResult<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                skip_line(&mut chars);
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    skip_line(&mut chars);
                } else {
                    return Err(SchemaError::parse(line, "unexpected character `/`"));
                }
            }
            '{' => push_single(&mut tokens, &mut chars, Token::LBrace, line),
            '}' => push_single(&mut tokens, &mut chars, Token::RBrace, line),
            '(' => push_single(&mut tokens, &mut chars, Token::LParen, line),
            ')' => push_single(&mut tokens, &mut chars, Token::RParen, line),
            ',' => push_single(&mut tokens, &mut chars, Token::Comma, line),
            '.' => push_single(&mut tokens, &mut chars, Token::Dot, line),
            '?' => push_single(&mut tokens, &mut chars, Token::Question, line),
            '@' => push_single(&mut tokens, &mut chars, Token::At, line),
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => {
                                return Err(SchemaError::parse(line, "unterminated string literal"))
                            }
                        },
                        Some('\n') | None => {
                            return Err(SchemaError::parse(line, "unterminated string literal"))
                        }
                        Some(other) => value.push(other),
                    }
                }
                tokens.push(Spanned {
                    token: Token::Str(value),
                    line,
                });
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut value = String::new();
                if c == '-' {
                    value.push(c);
                    chars.next();
                    if !chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                        return Err(SchemaError::parse(line, "unexpected character `-`"));
                    }
                }
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        value.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Spanned {
                    token: Token::Number(value),
                    line,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut value = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        value.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Spanned {
                    token: Token::Ident(value),
                    line,
                });
            }
            other => {
                return Err(SchemaError::parse(
                    line,
                    format!("unexpected character `{other}`"),
                ));
            }
        }
    }

    Ok(tokens)
}

fn push_single(
    tokens: &mut Vec<Spanned>,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    token: Token,
    line: usize,
) {
    chars.next();
    tokens.push(Spanned { token, line });
}

// Leaves the newline for the main loop so line counting stays right.
fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while let Some(&c) = chars.peek() {
        if c == '\n' {
            break;
        }
        chars.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn tokenizes_table_header() {
        assert_eq!(
            kinds("table students {"),
            vec![
                Token::Ident("table".into()),
                Token::Ident("students".into()),
                Token::LBrace,
            ]
        );
    }

    #[test]
    fn tokenizes_modifiers() {
        assert_eq!(
            kinds("id uuid @id @default(uuid())"),
            vec![
                Token::Ident("id".into()),
                Token::Ident("uuid".into()),
                Token::At,
                Token::Ident("id".into()),
                Token::At,
                Token::Ident("default".into()),
                Token::LParen,
                Token::Ident("uuid".into()),
                Token::LParen,
                Token::RParen,
                Token::RParen,
            ]
        );
    }

    #[test]
    fn tracks_lines_and_comments() {
        let tokens = tokenize("# header\ntable x {\n// note\n}\n").unwrap();
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens.last().unwrap().token, Token::RBrace);
    }

    #[test]
    fn string_and_number_literals() {
        assert_eq!(
            kinds("@default(\"[]\") @default(42) @default(-1.5)"),
            vec![
                Token::At,
                Token::Ident("default".into()),
                Token::LParen,
                Token::Str("[]".into()),
                Token::RParen,
                Token::At,
                Token::Ident("default".into()),
                Token::LParen,
                Token::Number("42".into()),
                Token::RParen,
                Token::At,
                Token::Ident("default".into()),
                Token::LParen,
                Token::Number("-1.5".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn unterminated_string_fails() {
        assert!(matches!(
            tokenize("name text @default(\"oops"),
            Err(SchemaError::Parse { .. })
        ));
    }

    #[test]
    fn stray_character_fails() {
        assert!(matches!(tokenize("table x { a b; }"), Err(SchemaError::Parse { .. })));
    }
}
