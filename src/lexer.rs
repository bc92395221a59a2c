use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    /// Numeric literal kept as written (`42`, `-1`, `0.5`).
    Num(String),

    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Eq,       // =
    At,       // @
    Dot,      // .
    Arrow,    // ->

    Eof,
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character: {0}")]
    UnexpectedChar(char),
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('#') => {
                    while let Some(&c) = self.chars.peek() {
                        self.chars.next();
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_ident(&mut self, first: char) -> String {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == quote => return Ok(s),
                Some('\\') => {
                    if let Some(c) = self.chars.next() {
                        match c {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            'r' => s.push('\r'),
                            _ => s.push(c),
                        }
                    }
                }
                Some(c) => s.push(c),
                None => return Err(LexError::UnterminatedString),
            }
        }
    }

    fn read_number(&mut self, first: char) -> Result<String, LexError> {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if s == "-" || s.ends_with('.') || s.matches('.').count() > 1 {
            return Err(LexError::InvalidNumber(s));
        }
        Ok(s)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();

        let c = match self.chars.next() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let tok = match c {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '=' => Token::Eq,
            '@' => Token::At,
            '.' => Token::Dot,
            '-' => match self.chars.peek() {
                Some('>') => {
                    self.chars.next();
                    Token::Arrow
                }
                Some(d) if d.is_ascii_digit() => Token::Num(self.read_number(c)?),
                _ => return Err(LexError::UnexpectedChar(c)),
            },
            '"' | '\'' => Token::Str(self.read_string(c)?),
            c if c.is_ascii_digit() => Token::Num(self.read_number(c)?),
            c if c.is_alphabetic() || c == '_' => Token::Ident(self.read_ident(c)),
            _ => return Err(LexError::UnexpectedChar(c)),
        };

        Ok(tok)
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            if tok == Token::Eof {
                tokens.push(tok);
                break;
            }
            tokens.push(tok);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokens() {
        let tokens = Lexer::new("entity users { }").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("entity".into()),
                Token::Ident("users".into()),
                Token::LBrace,
                Token::RBrace,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let input = "# comment\nentity users { # inline\n}";
        let tokens = Lexer::new(input).tokenize().unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[1], Token::Ident("users".into()));
    }

    #[test]
    fn test_type_with_length() {
        let tokens = Lexer::new("price decimal(10, 2)").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("price".into()),
                Token::Ident("decimal".into()),
                Token::LParen,
                Token::Num("10".into()),
                Token::Comma,
                Token::Num("2".into()),
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        let tokens = Lexer::new(r#"-1 0.5 "a\"b" 'x'"#).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Num("-1".into()),
                Token::Num("0.5".into()),
                Token::Str("a\"b".into()),
                Token::Str("x".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_symbols() {
        let tokens = Lexer::new("-> = @ . [ ]").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Arrow,
                Token::Eq,
                Token::At,
                Token::Dot,
                Token::LBracket,
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Lexer::new("\"open").tokenize(),
            Err(LexError::UnterminatedString)
        ));
        assert!(matches!(
            Lexer::new("- x").tokenize(),
            Err(LexError::UnexpectedChar('-'))
        ));
        assert!(matches!(
            Lexer::new("1.2.3").tokenize(),
            Err(LexError::InvalidNumber(_))
        ));
    }
}
