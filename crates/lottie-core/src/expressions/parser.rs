use super::ast::{BinaryOp, Expr, Program, Stmt, Target, UnaryOp};
use super::lexer::{Lexer, Spanned, Token};
use crate::error::{LottieError, Result};

pub struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Result<Self> {
        let tokens = Lexer::new(src).tokenize()?;
        Ok(Self {
            src,
            tokens,
            pos: 0,
        })
    }

    pub fn parse(src: &str) -> Result<Program> {
        Parser::new(src)?.parse_program()
    }

    fn current(&self) -> &Token {
        // tokenize always ends with Eof and `advance` never moves past it
        &self.tokens[self.pos].token
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, t: &Token) -> bool {
        if self.current() == t {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> LottieError {
        LottieError::Syntax {
            expression: self.src.to_string(),
            position: self.tokens[self.pos].pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, t: Token) -> Result<()> {
        if *self.current() != t {
            return Err(self.error(format!("expected {:?}, got {:?}", t, self.current())));
        }
        self.advance();
        Ok(())
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Ident(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(self.error(format!("expected identifier, got {:?}", other))),
        }
    }

    pub fn parse_program(mut self) -> Result<Program> {
        let mut body = Vec::new();
        while *self.current() != Token::Eof {
            if self.eat(&Token::Semicolon) {
                continue;
            }
            body.push(self.parse_stmt()?);
        }
        Ok(Program { body })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let stmt = match self.current() {
            Token::Var => {
                self.advance();
                let mut bindings = Vec::new();
                loop {
                    let name = self.expect_ident()?;
                    let init = if self.eat(&Token::Assign) {
                        Some(self.parse_expr()?)
                    } else {
                        None
                    };
                    bindings.push((name, init));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                Stmt::Let(bindings)
            }
            Token::If => {
                self.advance();
                self.expect(Token::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(Token::RParen)?;
                let then = Box::new(self.parse_stmt()?);
                let otherwise = if self.eat(&Token::Else) {
                    Some(Box::new(self.parse_stmt()?))
                } else {
                    None
                };
                return Ok(Stmt::If {
                    cond,
                    then,
                    otherwise,
                });
            }
            Token::LBrace => {
                self.advance();
                let mut body = Vec::new();
                while !self.eat(&Token::RBrace) {
                    if *self.current() == Token::Eof {
                        return Err(self.error("unclosed block"));
                    }
                    if self.eat(&Token::Semicolon) {
                        continue;
                    }
                    body.push(self.parse_stmt()?);
                }
                return Ok(Stmt::Block(body));
            }
            Token::Return => {
                self.advance();
                if matches!(self.current(), Token::Semicolon | Token::RBrace | Token::Eof) {
                    Stmt::Return(None)
                } else {
                    Stmt::Return(Some(self.parse_expr()?))
                }
            }
            _ => {
                let expr = self.parse_expr()?;
                let op = match self.current() {
                    Token::Assign => Some(None),
                    Token::PlusAssign => Some(Some(BinaryOp::Add)),
                    Token::MinusAssign => Some(Some(BinaryOp::Sub)),
                    Token::StarAssign => Some(Some(BinaryOp::Mul)),
                    Token::SlashAssign => Some(Some(BinaryOp::Div)),
                    _ => None,
                };
                match op {
                    Some(op) => {
                        let target = match expr {
                            Expr::Ident(name) => Target::Var(name),
                            Expr::Index(base, idx) => match *base {
                                Expr::Ident(name) => Target::Element(name, *idx),
                                _ => return Err(self.error("invalid assignment target")),
                            },
                            _ => return Err(self.error("invalid assignment target")),
                        };
                        self.advance();
                        let value = self.parse_expr()?;
                        Stmt::Assign { target, op, value }
                    }
                    None => Stmt::Expr(expr),
                }
            }
        };
        self.eat(&Token::Semicolon);
        Ok(stmt)
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        let cond = self.parse_binary(0)?;
        if self.eat(&Token::Question) {
            let then = self.parse_expr()?;
            self.expect(Token::Colon)?;
            let otherwise = self.parse_expr()?;
            return Ok(Expr::Conditional(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(cond)
    }

    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let op = match self.current() {
            Token::Or => (BinaryOp::Or, 1),
            Token::And => (BinaryOp::And, 2),
            Token::Eq => (BinaryOp::Eq, 3),
            Token::Ne => (BinaryOp::Ne, 3),
            Token::Lt => (BinaryOp::Lt, 4),
            Token::Le => (BinaryOp::Le, 4),
            Token::Gt => (BinaryOp::Gt, 4),
            Token::Ge => (BinaryOp::Ge, 4),
            Token::Plus => (BinaryOp::Add, 5),
            Token::Minus => (BinaryOp::Sub, 5),
            Token::Star => (BinaryOp::Mul, 6),
            Token::Slash => (BinaryOp::Div, 6),
            Token::Percent => (BinaryOp::Rem, 6),
            _ => return None,
        };
        Some(op)
    }

    // precedence climbing, all binary operators are left-associative
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec <= min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.current() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        Ok(Expr::Unary(op, Box::new(self.parse_unary()?)))
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    expr = Expr::Member(Box::new(expr), name);
                }
                Token::LBracket => {
                    self.advance();
                    let idx = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(idx));
                }
                Token::LParen => {
                    self.advance();
                    let args = self.parse_list(Token::RParen)?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::String(s) => Ok(Expr::Str(s)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LBracket => Ok(Expr::Array(self.parse_list(Token::RBracket)?)),
            Token::LParen => {
                let e = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            other => {
                // step back so the error points at the offending token
                self.pos = self.pos.saturating_sub(usize::from(other != Token::Eof));
                Err(self.error(format!("unexpected {:?}", other)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> Expr {
        match Parser::parse(src).unwrap().body.remove(0) {
            Stmt::Expr(e) => e,
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0))
                ))
            )
        );
        assert_eq!(
            expr("a - b - c"),
            Expr::Binary(
                BinaryOp::Sub,
                Box::new(Expr::Binary(
                    BinaryOp::Sub,
                    Box::new(Expr::Ident("a".into())),
                    Box::new(Expr::Ident("b".into()))
                )),
                Box::new(Expr::Ident("c".into()))
            )
        );
    }

    #[test]
    fn member_chains_and_calls() {
        let e = expr("thisComp.layer(\"Null 1\").transform.position[0]");
        let Expr::Index(base, idx) = e else {
            panic!("expected index");
        };
        assert_eq!(*idx, Expr::Number(0.0));
        let Expr::Member(base, prop) = *base else {
            panic!("expected member");
        };
        assert_eq!(prop, "position");
        assert!(matches!(*base, Expr::Member(_, ref m) if m == "transform"));
    }

    #[test]
    fn statements() {
        let program = Parser::parse(
            "var amp = 10, freq;\nif (time > 1) { amp *= 2 } else amp = 0\n$bm_rt = [amp, amp];",
        )
        .unwrap();
        assert_eq!(program.body.len(), 3);
        assert!(matches!(program.body[0], Stmt::Let(ref b) if b.len() == 2));
        assert!(matches!(program.body[1], Stmt::If { otherwise: Some(_), .. }));
        assert!(matches!(
            program.body[2],
            Stmt::Assign { target: Target::Var(ref n), op: None, .. } if n == "$bm_rt"
        ));
    }

    #[test]
    fn ternary_and_unary() {
        assert!(matches!(expr("-x > 0 ? 1 : !y"), Expr::Conditional(..)));
    }

    #[test]
    fn syntax_errors_carry_position() {
        let err = Parser::parse("value + * 2").unwrap_err();
        assert!(matches!(err, LottieError::Syntax { position: 8, .. }));
        assert!(Parser::parse("foo(1, 2").is_err());
        assert!(Parser::parse("1 = 2").is_err());
    }
}
