//! Recursive-descent parser for the canonical schema DSL.
//!
//! Grammar:
//!
//! ```text
//! schema   := table*
//! table    := "table" IDENT "{" item* "}"
//! item     := "@" "index" "(" IDENT ("," IDENT)* ")"
//!           | column
//! column   := IDENT type "?"? modifier*
//! type     := IDENT ( "(" NUMBER ("," NUMBER)? ")" )?
//! modifier := "@" "id" ( "(" "auto" ")" )?
//!           | "@" "unique"
//!           | "@" "default" "(" default ")"
//!           | "@" "references" "(" IDENT "." IDENT ")"
//! default  := "uuid" "(" ")" | "now" "(" ")" | "true" | "false"
//!           | NUMBER | STRING
//! ```
//!
//! Referential integrity is validated at load time: duplicate names,
//! unknown index columns and unresolved `@references` targets all fail
//! here, before any DDL is emitted.

use crate::error::{SchemaError, SchemaResult};
use crate::lexer::{Spanned, Token};
use crate::model::{
    CanonicalColumn, CanonicalSchema, CanonicalTable, ColumnRef, DefaultValue, IndexDef,
    LogicalType,
};

/// Parses a token stream into a validated schema model.
pub fn parse(tokens: Vec<Spanned>) -> SchemaResult<CanonicalSchema> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut tables = Vec::new();

    while parser.peek().is_some() {
        tables.push(parser.table()?);
    }

    let schema = CanonicalSchema { tables };
    validate(&schema)?;
    Ok(schema)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn current_line(&self) -> usize {
        self.peek()
            .map(|s| s.line)
            .or_else(|| self.tokens.last().map(|s| s.line))
            .unwrap_or(1)
    }

    fn unexpected(&self, expected: &str) -> SchemaError {
        let line = self.current_line();
        match self.peek() {
            Some(spanned) => SchemaError::parse(
                line,
                format!("expected {expected}, found {}", spanned.token.describe()),
            ),
            None => SchemaError::parse(line, format!("expected {expected}, found end of input")),
        }
    }

    fn expect(&mut self, token: &Token, expected: &str) -> SchemaResult<()> {
        match self.peek() {
            Some(spanned) if spanned.token == *token => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> SchemaResult<String> {
        match self.peek() {
            Some(Spanned {
                token: Token::Ident(_),
                ..
            }) => {
                if let Some(Spanned {
                    token: Token::Ident(name),
                    ..
                }) = self.next()
                {
                    Ok(name)
                } else {
                    unreachable!("peeked an identifier")
                }
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().map(|s| &s.token) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn table(&mut self) -> SchemaResult<CanonicalTable> {
        let keyword = self.expect_ident("`table`")?;
        if keyword != "table" {
            return Err(SchemaError::parse(
                self.current_line(),
                format!("expected `table`, found `{keyword}`"),
            ));
        }
        let name = self.expect_ident("table name")?;
        self.expect(&Token::LBrace, "`{` after table name")?;

        let mut columns: Vec<CanonicalColumn> = Vec::new();
        let mut indexes = Vec::new();

        loop {
            match self.peek() {
                Some(Spanned {
                    token: Token::RBrace,
                    ..
                }) => {
                    self.pos += 1;
                    break;
                }
                Some(Spanned {
                    token: Token::At, ..
                }) => {
                    indexes.push(self.table_index(&name)?);
                }
                Some(Spanned {
                    token: Token::Ident(_),
                    ..
                }) => {
                    let column = self.column()?;
                    if columns.iter().any(|c| c.name == column.name) {
                        return Err(SchemaError::DuplicateColumn {
                            table: name,
                            column: column.name,
                        });
                    }
                    columns.push(column);
                }
                _ => return Err(self.unexpected("a column, `@index` or `}`")),
            }
        }

        Ok(CanonicalTable {
            name,
            columns,
            indexes,
        })
    }

    fn table_index(&mut self, table: &str) -> SchemaResult<IndexDef> {
        self.expect(&Token::At, "`@`")?;
        let keyword = self.expect_ident("`index`")?;
        if keyword != "index" {
            return Err(SchemaError::parse(
                self.current_line(),
                format!("unknown table modifier `@{keyword}` on table `{table}`"),
            ));
        }
        self.expect(&Token::LParen, "`(` after `@index`")?;

        let mut columns = vec![self.expect_ident("index column")?];
        while self.eat(&Token::Comma) {
            columns.push(self.expect_ident("index column")?);
        }
        self.expect(&Token::RParen, "`)` closing `@index`")?;

        Ok(IndexDef { columns })
    }

    fn column(&mut self) -> SchemaResult<CanonicalColumn> {
        let name = self.expect_ident("column name")?;
        let type_name = self.expect_ident("column type")?;

        // Type arguments (e.g. decimal(5,2), varchar(255)) do not survive
        // into the logical model; precision is lossy in the mirror.
        if self.eat(&Token::LParen) {
            loop {
                match self.next() {
                    Some(Spanned {
                        token: Token::Number(_) | Token::Comma,
                        ..
                    }) => {}
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => break,
                    _ => return Err(self.unexpected("type arguments")),
                }
            }
        }

        let nullable = self.eat(&Token::Question);

        let mut column = CanonicalColumn {
            name,
            logical_type: LogicalType::from_name(&type_name),
            nullable,
            default: None,
            unique: false,
            primary_key: false,
            auto_increment: false,
            references: None,
        };

        while self.peek().map(|s| &s.token) == Some(&Token::At) {
            self.pos += 1;
            let modifier = self.expect_ident("column modifier")?;
            match modifier.as_str() {
                "id" => {
                    column.primary_key = true;
                    if self.eat(&Token::LParen) {
                        let arg = self.expect_ident("`auto`")?;
                        if arg != "auto" {
                            return Err(SchemaError::parse(
                                self.current_line(),
                                format!("unknown `@id` argument `{arg}`"),
                            ));
                        }
                        column.auto_increment = true;
                        self.expect(&Token::RParen, "`)` closing `@id`")?;
                    }
                }
                "unique" => column.unique = true,
                "default" => {
                    self.expect(&Token::LParen, "`(` after `@default`")?;
                    column.default = Some(self.default_value()?);
                    self.expect(&Token::RParen, "`)` closing `@default`")?;
                }
                "references" => {
                    self.expect(&Token::LParen, "`(` after `@references`")?;
                    let table = self.expect_ident("referenced table")?;
                    self.expect(&Token::Dot, "`.` in reference target")?;
                    let target_column = self.expect_ident("referenced column")?;
                    self.expect(&Token::RParen, "`)` closing `@references`")?;
                    column.references = Some(ColumnRef {
                        table,
                        column: target_column,
                    });
                }
                other => {
                    return Err(SchemaError::parse(
                        self.current_line(),
                        format!("unknown column modifier `@{other}`"),
                    ));
                }
            }
        }

        Ok(column)
    }

    fn default_value(&mut self) -> SchemaResult<DefaultValue> {
        match self.next() {
            Some(Spanned {
                token: Token::Ident(name),
                line,
            }) => match name.as_str() {
                "true" => Ok(DefaultValue::Bool(true)),
                "false" => Ok(DefaultValue::Bool(false)),
                "uuid" => {
                    self.expect(&Token::LParen, "`(` after `uuid`")?;
                    self.expect(&Token::RParen, "`)` after `uuid(`")?;
                    Ok(DefaultValue::GeneratedUuid)
                }
                "now" => {
                    self.expect(&Token::LParen, "`(` after `now`")?;
                    self.expect(&Token::RParen, "`)` after `now(`")?;
                    Ok(DefaultValue::CurrentTimestamp)
                }
                other => Err(SchemaError::parse(
                    line,
                    format!("unknown default expression `{other}`"),
                )),
            },
            Some(Spanned {
                token: Token::Number(value),
                ..
            }) => Ok(DefaultValue::Number(value)),
            Some(Spanned {
                token: Token::Str(value),
                ..
            }) => Ok(match value.as_str() {
                "[]" => DefaultValue::EmptyArray,
                "{}" => DefaultValue::EmptyObject,
                _ => DefaultValue::Text(value),
            }),
            _ => Err(self.unexpected("a default expression")),
        }
    }
}

/// Cross-table validation, run once the whole document is parsed.
fn validate(schema: &CanonicalSchema) -> SchemaResult<()> {
    for (i, table) in schema.tables.iter().enumerate() {
        if schema.tables[..i].iter().any(|t| t.name == table.name) {
            return Err(SchemaError::DuplicateTable {
                table: table.name.clone(),
            });
        }

        for index in &table.indexes {
            for column in &index.columns {
                if table.column(column).is_none() {
                    return Err(SchemaError::UnknownIndexColumn {
                        table: table.name.clone(),
                        column: column.clone(),
                    });
                }
            }
        }

        for column in &table.columns {
            if let Some(target) = &column.references {
                let resolved = schema
                    .table(&target.table)
                    .and_then(|t| t.column(&target.column))
                    .is_some();
                if !resolved {
                    return Err(SchemaError::UnknownReferenceTarget {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}
