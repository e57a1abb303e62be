//! Sable parser.
//!
//! Error-tolerant by contract: a malformed unit never fails the parse phase.
//! Problems are recorded in the context log and the parser recovers at the
//! nearest member or class boundary, so the returned tree is the largest
//! well-formed prefix structure the source supports (possibly empty).

use crate::context::Context;
use crate::lexer::{lex, Spanned, Token};
use crate::tree::{
    ClassDecl, CompilationUnit, Expr, FieldDecl, Import, LocalDecl, Member, MethodDecl, Param,
    Span, Stmt, TypeName,
};

/// Parse one unit. Node ids are allocated from the given context and
/// diagnostics land in its log.
pub fn parse(ctx: &mut Context, file: &str, src: &str) -> CompilationUnit {
    let lexed = lex(src, file, &mut ctx.log);
    let mut parser = Parser {
        tokens: &lexed.tokens,
        pos: 0,
        file,
        ctx,
    };

    let mut unit = CompilationUnit {
        package: None,
        imports: Vec::new(),
        classes: Vec::new(),
        comments: lexed.comments,
        span: Span::new(0, src.len(), 1),
    };

    if parser.is_word("package") {
        parser.advance();
        match parser.qualname() {
            Some((name, _)) => {
                unit.package = Some(name);
                parser.expect_semi();
            }
            None => parser.recover_to_semi(),
        }
    }

    while parser.is_word("import") {
        let start = parser.cur_start();
        let line = parser.cur_line();
        parser.advance();
        match parser.qualname() {
            Some((name, end)) => {
                parser.expect_semi();
                unit.imports.push(Import {
                    name,
                    span: Span::new(start, end, line),
                });
            }
            None => parser.recover_to_semi(),
        }
    }

    while !parser.at_eof() {
        if parser.is_word("class") {
            if let Some(class) = parser.class_decl() {
                unit.classes.push(class);
            }
        } else {
            let got = parser.peek().clone();
            parser.error(format!("expected class declaration, got {:?}", got));
            parser.advance();
        }
    }

    unit
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    file: &'a str,
    ctx: &'a mut Context,
}

impl<'a> Parser<'a> {
    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn cur_line(&self) -> u32 {
        self.cur().line
    }

    fn cur_start(&self) -> usize {
        self.cur().start
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[(self.pos - 1).min(self.tokens.len() - 1)].end
        }
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn at_eof(&self) -> bool {
        self.at(&Token::Eof)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w == word)
    }

    fn error(&mut self, message: impl Into<String>) {
        let line = self.cur_line();
        self.ctx.log.error(self.file, line, message);
    }

    fn take_word(&mut self, what: &str) -> Option<String> {
        if let Token::Word(w) = self.peek().clone() {
            self.advance();
            Some(w)
        } else {
            let got = self.peek().clone();
            self.error(format!("expected {}, got {:?}", what, got));
            None
        }
    }

    fn expect_semi(&mut self) {
        if !self.eat(&Token::Semi) {
            let got = self.peek().clone();
            self.error(format!("expected ';', got {:?}", got));
        }
    }

    /// Dotted name: `a` or `a.b.c`. Returns the name and its end offset.
    fn qualname(&mut self) -> Option<(String, usize)> {
        let mut name = self.take_word("identifier")?;
        while self.at(&Token::Dot) {
            self.advance();
            let part = self.take_word("identifier after '.'")?;
            name.push('.');
            name.push_str(&part);
        }
        Some((name, self.prev_end()))
    }

    fn type_name(&mut self) -> Option<TypeName> {
        let start = self.cur_start();
        let line = self.cur_line();
        let (name, end) = self.qualname()?;
        Some(TypeName {
            id: self.ctx.alloc_node(),
            name,
            span: Span::new(start, end, line),
        })
    }

    fn class_decl(&mut self) -> Option<ClassDecl> {
        let start = self.cur_start();
        let line = self.cur_line();
        self.advance(); // 'class'

        let name = match self.take_word("class name") {
            Some(n) => n,
            None => {
                self.recover_to_next_class();
                return None;
            }
        };
        let id = self.ctx.alloc_node();

        let extends = if self.is_word("extends") {
            self.advance();
            self.type_name() // failure already diagnosed; treated as absent
        } else {
            None
        };

        if !self.eat(&Token::LBrace) {
            let got = self.peek().clone();
            self.error(format!("expected '{{' after class header, got {:?}", got));
            self.recover_to_next_class();
            return None;
        }

        let mut members = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                break;
            }
            if self.at_eof() {
                self.error(format!("unexpected end of input in class '{}'", name));
                break;
            }
            match self.member() {
                Some(member) => members.push(member),
                None => self.recover_member(),
            }
        }

        Some(ClassDecl {
            id,
            name,
            extends,
            members,
            span: Span::new(start, self.prev_end(), line),
        })
    }

    fn member(&mut self) -> Option<Member> {
        let start = self.cur_start();
        let line = self.cur_line();
        let ty = self.type_name()?;
        let name = self.take_word("member name")?;

        if self.eat(&Token::Semi) {
            return Some(Member::Field(FieldDecl {
                id: self.ctx.alloc_node(),
                ty,
                name,
                span: Span::new(start, self.prev_end(), line),
            }));
        }

        if self.eat(&Token::LParen) {
            let mut params = Vec::new();
            if !self.at(&Token::RParen) {
                loop {
                    let p_start = self.cur_start();
                    let p_line = self.cur_line();
                    let p_ty = self.type_name()?;
                    let p_name = self.take_word("parameter name")?;
                    params.push(Param {
                        id: self.ctx.alloc_node(),
                        ty: p_ty,
                        name: p_name,
                        span: Span::new(p_start, self.prev_end(), p_line),
                    });
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            if !self.eat(&Token::RParen) {
                let got = self.peek().clone();
                self.error(format!("expected ')', got {:?}", got));
                return None;
            }
            let body = self.block()?;
            return Some(Member::Method(MethodDecl {
                id: self.ctx.alloc_node(),
                ret: ty,
                name,
                params,
                body,
                span: Span::new(start, self.prev_end(), line),
            }));
        }

        let got = self.peek().clone();
        self.error(format!("expected ';' or '(' after member name, got {:?}", got));
        None
    }

    fn block(&mut self) -> Option<Vec<Stmt>> {
        if !self.eat(&Token::LBrace) {
            let got = self.peek().clone();
            self.error(format!("expected '{{' to open method body, got {:?}", got));
            return None;
        }
        let mut stmts = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                break;
            }
            if self.at_eof() {
                self.error("unexpected end of input in method body");
                break;
            }
            match self.stmt() {
                Some(stmt) => stmts.push(stmt),
                None => self.recover_to_semi(),
            }
        }
        Some(stmts)
    }

    fn stmt(&mut self) -> Option<Stmt> {
        let start = self.cur_start();
        let line = self.cur_line();

        if self.is_word("var") {
            self.advance();
            let ty = self.type_name()?;
            let name = self.take_word("variable name")?;
            let init = if self.eat(&Token::Assign) {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect_semi();
            return Some(Stmt::Local(LocalDecl {
                id: self.ctx.alloc_node(),
                ty,
                name,
                init,
                span: Span::new(start, self.prev_end(), line),
            }));
        }

        if self.is_word("return") {
            self.advance();
            let value = if self.at(&Token::Semi) {
                None
            } else {
                Some(self.expr()?)
            };
            self.expect_semi();
            return Some(Stmt::Return {
                value,
                span: Span::new(start, self.prev_end(), line),
            });
        }

        let expr = self.expr()?;
        self.expect_semi();
        Some(Stmt::Expr(expr))
    }

    fn expr(&mut self) -> Option<Expr> {
        let span = Span::new(self.cur_start(), self.cur().end, self.cur_line());
        match self.peek().clone() {
            Token::Word(w) if w == "true" || w == "false" => {
                self.advance();
                Some(Expr::Bool {
                    id: self.ctx.alloc_node(),
                    value: w == "true",
                    span,
                })
            }
            Token::Word(name) => {
                self.advance();
                Some(Expr::Ident {
                    id: self.ctx.alloc_node(),
                    name,
                    span,
                })
            }
            Token::Int(value) => {
                self.advance();
                Some(Expr::Int {
                    id: self.ctx.alloc_node(),
                    value,
                    span,
                })
            }
            Token::Str(value) => {
                self.advance();
                Some(Expr::Str {
                    id: self.ctx.alloc_node(),
                    value,
                    span,
                })
            }
            other => {
                self.error(format!("expected expression, got {:?}", other));
                None
            }
        }
    }

    /// Skip to just past the next ';' (or stop before '}' / at end).
    fn recover_to_semi(&mut self) {
        loop {
            match self.peek() {
                Token::Semi => {
                    self.advance();
                    return;
                }
                Token::RBrace | Token::Eof => return,
                _ => self.advance(),
            }
        }
    }

    /// Member-level recovery: skip to the next ';' or the class's closing
    /// brace, balancing any nested braces passed along the way.
    fn recover_member(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::Semi if depth == 0 => {
                    self.advance();
                    return;
                }
                Token::LBrace => {
                    depth += 1;
                    self.advance();
                }
                Token::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                }
                Token::Eof => return,
                _ => self.advance(),
            }
        }
    }

    /// Class-level recovery: skip to the next `class` keyword or end of input.
    fn recover_to_next_class(&mut self) {
        while !self.at_eof() && !self.is_word("class") {
            self.advance();
        }
    }
}
