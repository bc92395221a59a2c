//! Parser for the `.erd` notation.
//!
//! ```text
//! entity products {
//!     @priority = 2
//!     id int pk
//!     category_id int not null fk -> categories.id [on_delete = cascade]
//!     price decimal(10, 2) default 0 comment "Unit price"
//!     index(price)
//! }
//! ```

use crate::lexer::{LexError, Lexer, Token};
use crate::model::{Cardinality, Column, Diagram, ReferentialAction, Relationship, Table};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected token: {0:?}, expected {1}")]
    Unexpected(Token, &'static str),
    #[error("Invalid {what}: {value}")]
    InvalidValue { what: &'static str, value: String },
    #[error("Duplicate table: {0}")]
    DuplicateTable(String),
    #[error("Duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },
    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },
}

/// Parse `.erd` source into a diagram.
pub fn parse_diagram(input: &str) -> Result<Diagram, ParseError> {
    Parser::new(input)?.parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Block-level constraint, applied once every column of the entity is known.
enum Constraint {
    PrimaryKey(Vec<String>),
    ForeignKey {
        columns: Vec<String>,
        target: String,
        target_columns: Vec<String>,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    },
    Index(Vec<String>),
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_next(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let tok = self.tokens.get(self.pos).unwrap_or(&Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) => Ok(s),
            tok => Err(ParseError::Unexpected(tok, "identifier")),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Str(s) => Ok(s),
            tok => Err(ParseError::Unexpected(tok, "string")),
        }
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ParseError> {
        let tok = self.advance().clone();
        if tok == expected {
            Ok(())
        } else {
            Err(ParseError::Unexpected(tok, what))
        }
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == name)
    }

    /// Keyword followed by `(`, so columns may still be named `index` etc.
    fn check_call(&self, name: &str) -> bool {
        self.check_ident(name) && *self.peek_next() == Token::LParen
    }

    pub fn parse(&mut self) -> Result<Diagram, ParseError> {
        let mut tables: Vec<Table> = Vec::new();
        let mut relationships = Vec::new();

        while *self.peek() != Token::Eof {
            if self.check_ident("entity") {
                self.advance();
                let (table, rels) = self.parse_entity()?;
                if tables.iter().any(|t| t.name == table.name) {
                    return Err(ParseError::DuplicateTable(table.name));
                }
                tables.push(table);
                relationships.extend(rels);
            } else {
                return Err(ParseError::Unexpected(self.peek().clone(), "entity"));
            }
        }

        Ok(Diagram::new(tables, relationships))
    }

    fn parse_entity(&mut self) -> Result<(Table, Vec<Relationship>), ParseError> {
        let name = self.expect_ident()?;
        self.expect(Token::LBrace, "{")?;

        let mut table = Table::new(name, Vec::new());
        let mut relationships = Vec::new();
        let mut constraints = Vec::new();

        while *self.peek() != Token::RBrace {
            if *self.peek() == Token::At {
                self.parse_hint(&mut table)?;
            } else if self.check_call("primary_key") {
                self.advance();
                constraints.push(self.parse_primary_key()?);
            } else if self.check_call("foreign_key") {
                self.advance();
                constraints.push(self.parse_foreign_key()?);
            } else if self.check_call("index") {
                self.advance();
                constraints.push(self.parse_index()?);
            } else {
                let (column, rel) = self.parse_column(&table.name)?;
                if table.column(&column.name).is_some() {
                    return Err(ParseError::DuplicateColumn {
                        table: table.name,
                        column: column.name,
                    });
                }
                relationships.extend(rel);
                table.columns.push(column);
            }
        }

        self.expect(Token::RBrace, "}")?;

        for constraint in constraints {
            apply_constraint(&mut table, &mut relationships, constraint)?;
        }

        Ok((table, relationships))
    }

    fn parse_column(&mut self, table: &str) -> Result<(Column, Option<Relationship>), ParseError> {
        let name = self.expect_ident()?;
        let typ = self.parse_type()?;
        let mut column = Column::new(name, typ);
        let mut relationship = None;

        loop {
            if self.check_ident("pk") {
                self.advance();
                column.is_primary_key = true;
                column.nullable = false;
            } else if self.check_ident("not") {
                self.advance();
                if !self.check_ident("null") {
                    return Err(ParseError::Unexpected(self.peek().clone(), "null"));
                }
                self.advance();
                column.nullable = false;
            } else if self.check_ident("null") {
                self.advance();
                column.nullable = true;
            } else if self.check_ident("unique") {
                self.advance();
                column.is_unique = true;
            } else if self.check_ident("index") && !self.check_call("index") {
                self.advance();
                column.is_indexed = true;
            } else if self.check_ident("default") {
                self.advance();
                column.default_value = Some(self.parse_default_value()?);
            } else if self.check_ident("comment") {
                self.advance();
                column.comment = Some(self.expect_string()?);
            } else if self.check_ident("fk") {
                self.advance();
                self.expect(Token::Arrow, "->")?;
                let target = self.expect_ident()?;
                self.expect(Token::Dot, ".")?;
                let target_column = self.expect_ident()?;
                let mut rel = Relationship::new(table, &column.name, target, target_column);
                if *self.peek() == Token::LBracket {
                    self.parse_fk_options(&mut rel)?;
                }
                column.is_foreign_key = true;
                relationship = Some(rel);
            } else {
                break;
            }
        }

        Ok((column, relationship))
    }

    /// `varchar(255)`, `decimal(10, 2)`, `enum("a", "b")`.
    fn parse_type(&mut self) -> Result<String, ParseError> {
        let mut typ = self.expect_ident()?;
        if *self.peek() != Token::LParen {
            return Ok(typ);
        }
        self.advance();

        let mut args = Vec::new();
        loop {
            match self.advance().clone() {
                Token::Num(n) => args.push(n),
                Token::Ident(s) => args.push(s),
                Token::Str(s) => args.push(format!("'{}'", s.replace('\'', "''"))),
                tok => return Err(ParseError::Unexpected(tok, "type argument")),
            }
            match self.advance().clone() {
                Token::Comma => continue,
                Token::RParen => break,
                tok => return Err(ParseError::Unexpected(tok, ", or )")),
            }
        }

        typ.push('(');
        typ.push_str(&args.join(","));
        typ.push(')');
        Ok(typ)
    }

    fn parse_default_value(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) => {
                // Function call: IDENT()
                if *self.peek() == Token::LParen {
                    self.advance();
                    let mut args = Vec::new();
                    loop {
                        match self.advance().clone() {
                            Token::RParen => break,
                            Token::Comma => {}
                            Token::Ident(a) | Token::Num(a) => args.push(a),
                            Token::Str(st) => args.push(format!("'{st}'")),
                            tok => return Err(ParseError::Unexpected(tok, "function argument")),
                        }
                    }
                    Ok(format!("{}({})", s, args.join(", ")))
                } else {
                    Ok(s)
                }
            }
            Token::Str(s) => Ok(s),
            Token::Num(n) => Ok(n),
            tok => Err(ParseError::Unexpected(tok, "default value")),
        }
    }

    /// `[card = one_to_one, on_delete = cascade, on_update = restrict]`
    fn parse_fk_options(&mut self, rel: &mut Relationship) -> Result<(), ParseError> {
        self.expect(Token::LBracket, "[")?;
        while *self.peek() != Token::RBracket {
            let key = self.expect_ident()?;
            self.expect(Token::Eq, "=")?;
            let value = self.expect_ident()?;
            match key.as_str() {
                "card" | "cardinality" => {
                    rel.cardinality = Cardinality::from_str(&value).ok_or(
                        ParseError::InvalidValue {
                            what: "cardinality",
                            value,
                        },
                    )?;
                }
                "on_delete" => rel.on_delete = Some(parse_action(&value)?),
                "on_update" => rel.on_update = Some(parse_action(&value)?),
                _ => {
                    return Err(ParseError::InvalidValue {
                        what: "fk option",
                        value: key,
                    });
                }
            }
            if *self.peek() == Token::Comma {
                self.advance();
            }
        }
        self.expect(Token::RBracket, "]")
    }

    fn parse_hint(&mut self, table: &mut Table) -> Result<(), ParseError> {
        self.expect(Token::At, "@")?;
        let key = self.expect_ident()?;
        self.expect(Token::Eq, "=")?;

        match (key.as_str(), self.advance().clone()) {
            ("priority", Token::Num(n)) => {
                let priority = n.parse::<i32>().map_err(|_| ParseError::InvalidValue {
                    what: "priority",
                    value: n,
                })?;
                table.priority = Some(priority);
            }
            ("comment", Token::Str(s)) => table.comment = Some(s),
            ("priority" | "comment", tok) => {
                return Err(ParseError::Unexpected(tok, "hint value"));
            }
            _ => {
                return Err(ParseError::InvalidValue {
                    what: "hint",
                    value: key,
                });
            }
        }
        Ok(())
    }

    fn parse_primary_key(&mut self) -> Result<Constraint, ParseError> {
        self.expect(Token::LParen, "(")?;
        let columns = self.parse_ident_list()?;
        self.expect(Token::RParen, ")")?;
        Ok(Constraint::PrimaryKey(columns))
    }

    fn parse_foreign_key(&mut self) -> Result<Constraint, ParseError> {
        self.expect(Token::LParen, "(")?;
        let columns = self.parse_ident_list()?;
        self.expect(Token::RParen, ")")?;

        if !self.check_ident("references") {
            return Err(ParseError::Unexpected(self.peek().clone(), "references"));
        }
        self.advance();

        let target = self.expect_ident()?;
        self.expect(Token::LParen, "(")?;
        let target_columns = self.parse_ident_list()?;
        self.expect(Token::RParen, ")")?;

        let mut on_delete = None;
        let mut on_update = None;

        while self.check_ident("on") {
            self.advance();
            if self.check_ident("delete") {
                self.advance();
                on_delete = Some(self.parse_action_words()?);
            } else if self.check_ident("update") {
                self.advance();
                on_update = Some(self.parse_action_words()?);
            } else {
                return Err(ParseError::Unexpected(self.peek().clone(), "delete or update"));
            }
        }

        Ok(Constraint::ForeignKey {
            columns,
            target,
            target_columns,
            on_delete,
            on_update,
        })
    }

    /// `cascade`, `set_null`, or the two-word forms `set null` / `no action`.
    fn parse_action_words(&mut self) -> Result<ReferentialAction, ParseError> {
        let mut word = self.expect_ident()?;
        if matches!(word.to_lowercase().as_str(), "set" | "no") {
            word.push('_');
            word.push_str(&self.expect_ident()?);
        }
        parse_action(&word)
    }

    fn parse_index(&mut self) -> Result<Constraint, ParseError> {
        self.expect(Token::LParen, "(")?;
        let columns = self.parse_ident_list()?;
        self.expect(Token::RParen, ")")?;
        Ok(Constraint::Index(columns))
    }

    fn parse_ident_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut list = vec![self.expect_ident()?];
        while *self.peek() == Token::Comma {
            self.advance();
            list.push(self.expect_ident()?);
        }
        Ok(list)
    }
}

fn parse_action(value: &str) -> Result<ReferentialAction, ParseError> {
    ReferentialAction::from_str(value).ok_or_else(|| ParseError::InvalidValue {
        what: "referential action",
        value: value.to_string(),
    })
}

fn column_mut<'t>(table: &'t mut Table, name: &str) -> Result<&'t mut Column, ParseError> {
    let table_name = table.name.clone();
    table
        .columns
        .iter_mut()
        .find(|c| c.name == name)
        .ok_or(ParseError::UnknownColumn {
            table: table_name,
            column: name.to_string(),
        })
}

fn apply_constraint(
    table: &mut Table,
    relationships: &mut Vec<Relationship>,
    constraint: Constraint,
) -> Result<(), ParseError> {
    match constraint {
        Constraint::PrimaryKey(columns) => {
            for name in columns {
                let column = column_mut(table, &name)?;
                column.is_primary_key = true;
                column.nullable = false;
            }
        }
        Constraint::ForeignKey {
            columns,
            target,
            target_columns,
            on_delete,
            on_update,
        } => {
            if columns.len() != target_columns.len() {
                return Err(ParseError::InvalidValue {
                    what: "foreign key column count",
                    value: format!("{} -> {}", columns.len(), target_columns.len()),
                });
            }
            for (name, target_column) in columns.into_iter().zip(target_columns) {
                column_mut(table, &name)?.is_foreign_key = true;
                let mut rel = Relationship::new(&table.name, name, &target, target_column);
                rel.on_delete = on_delete;
                rel.on_update = on_update;
                relationships.push(rel);
            }
        }
        Constraint::Index(columns) => {
            for name in columns {
                column_mut(table, &name)?.is_indexed = true;
            }
        }
    }
    Ok(())
}
