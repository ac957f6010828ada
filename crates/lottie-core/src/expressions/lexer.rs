use crate::error::{LottieError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String), // thisComp, value, $bm_rt
    Number(f64),
    String(String),

    Var, // var / let / const
    If,
    Else,
    Return,
    True,
    False,

    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Comma,
    Dot,
    Semicolon,
    Question,
    Colon,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    Assign,      // =
    PlusAssign,  // +=
    MinusAssign, // -=
    StarAssign,  // *=
    SlashAssign, // /=

    Eq, // == or ===
    Ne, // != or !==
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,

    Eof,
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub struct Lexer<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    /// Lexes the whole source, ending with `Token::Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok.token == Token::Eof;
            out.push(tok);
            if done {
                return Ok(out);
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> LottieError {
        LottieError::Syntax {
            expression: self.src.to_string(),
            position: pos,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek().map(|(_, c)| *c) {
                        Some('/') => {
                            while !matches!(self.peek(), None | Some('\n')) {
                                self.bump();
                            }
                        }
                        Some('*') => {
                            let start = self.bump().map(|(p, _)| p).unwrap_or(0);
                            self.bump();
                            let mut prev = '\0';
                            loop {
                                match self.bump() {
                                    Some((_, '/')) if prev == '*' => break,
                                    Some((_, c)) => prev = c,
                                    None => return Err(self.error(start, "unterminated comment")),
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Spanned> {
        self.skip_trivia()?;

        let (pos, c) = match self.bump() {
            Some(pc) => pc,
            None => {
                return Ok(Spanned {
                    token: Token::Eof,
                    pos: self.src.len(),
                })
            }
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '?' => Token::Question,
            ':' => Token::Colon,
            '%' => Token::Percent,
            '+' if self.eat('=') => Token::PlusAssign,
            '+' => Token::Plus,
            '-' if self.eat('=') => Token::MinusAssign,
            '-' => Token::Minus,
            '*' if self.eat('=') => Token::StarAssign,
            '*' => Token::Star,
            '/' if self.eat('=') => Token::SlashAssign,
            '/' => Token::Slash,
            '=' if self.eat('=') => {
                self.eat('=');
                Token::Eq
            }
            '=' => Token::Assign,
            '!' if self.eat('=') => {
                self.eat('=');
                Token::Ne
            }
            '!' => Token::Bang,
            '<' if self.eat('=') => Token::Le,
            '<' => Token::Lt,
            '>' if self.eat('=') => Token::Ge,
            '>' => Token::Gt,
            '&' if self.eat('&') => Token::And,
            '|' if self.eat('|') => Token::Or,

            '"' | '\'' => self.string(pos, c)?,

            '.' if matches!(self.peek(), Some(d) if d.is_ascii_digit()) => self.number(pos)?,
            '.' => Token::Dot,
            c if c.is_ascii_digit() => self.number(pos)?,

            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut end = pos + c.len_utf8();
                while let Some(&(p, ch)) = self.chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                        end = p + ch.len_utf8();
                        self.bump();
                    } else {
                        break;
                    }
                }
                match &self.src[pos..end] {
                    "var" | "let" | "const" => Token::Var,
                    "if" => Token::If,
                    "else" => Token::Else,
                    "return" => Token::Return,
                    "true" => Token::True,
                    "false" => Token::False,
                    ident => Token::Ident(ident.to_string()),
                }
            }

            other => return Err(self.error(pos, format!("unexpected character `{}`", other))),
        };

        Ok(Spanned { token, pos })
    }

    fn string(&mut self, pos: usize, quote: char) -> Result<Token> {
        let mut s = String::new();
        loop {
            match self.bump() {
                Some((_, c)) if c == quote => return Ok(Token::String(s)),
                Some((_, '\\')) => match self.bump() {
                    Some((_, 'n')) => s.push('\n'),
                    Some((_, 't')) => s.push('\t'),
                    Some((_, c)) => s.push(c),
                    None => break,
                },
                Some((_, c)) => s.push(c),
                None => break,
            }
        }
        Err(self.error(pos, "unterminated string"))
    }

    fn number(&mut self, pos: usize) -> Result<Token> {
        let mut end = pos + 1;
        let mut prev = '\0';
        while let Some(&(p, ch)) = self.chars.peek() {
            let exponent_sign = (ch == '+' || ch == '-') && (prev == 'e' || prev == 'E');
            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                end = p + 1;
                prev = ch;
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.src[pos..end];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error(pos, format!("invalid number `{}`", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn lexes_statements() {
        assert_eq!(
            tokens("var x = value[0] * .5; // half\n$bm_rt = x;"),
            vec![
                Token::Var,
                Token::Ident("x".into()),
                Token::Assign,
                Token::Ident("value".into()),
                Token::LBracket,
                Token::Number(0.0),
                Token::RBracket,
                Token::Star,
                Token::Number(0.5),
                Token::Semicolon,
                Token::Ident("$bm_rt".into()),
                Token::Assign,
                Token::Ident("x".into()),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn lexes_operators_and_strings() {
        assert_eq!(
            tokens("a === 'b' && c != 1e3 /* x */ || !d"),
            vec![
                Token::Ident("a".into()),
                Token::Eq,
                Token::String("b".into()),
                Token::And,
                Token::Ident("c".into()),
                Token::Ne,
                Token::Number(1000.0),
                Token::Or,
                Token::Bang,
                Token::Ident("d".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn reports_position_of_bad_input() {
        let err = Lexer::new("1 + #").tokenize().unwrap_err();
        assert!(matches!(err, LottieError::Syntax { position: 4, .. }));
    }
}
