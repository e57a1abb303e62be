//! Sable lexer.
//!
//! Tolerant by contract: lexing never fails. Unexpected characters and
//! unterminated literals become diagnostics in the context log and lexing
//! continues, so the parser always receives a token stream ending in `Eof`.
//! Comments are retained and attached to the unit, not discarded.

use crate::diag::DiagnosticLog;
use crate::tree::Comment;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords -- distinguished in the parser
    Word(String),
    /// Quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Integer literal
    Int(i64),
    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    Semi,
    Comma,
    Dot,
    Assign,
    // End of input
    Eof,
}

/// A token plus its source position: starting line and byte range.
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
pub struct LexOutput {
    pub tokens: Vec<Spanned>,
    pub comments: Vec<Comment>,
}

pub fn lex(src: &str, file: &str, log: &mut DiagnosticLog) -> LexOutput {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut pos = 0usize;
    let mut line: u32 = 1;

    let byte_at = |i: usize| -> usize {
        if i < chars.len() {
            chars[i].0
        } else {
            src.len()
        }
    };

    while pos < chars.len() {
        let (offset, c) = chars[pos];

        // Line comment
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1].1 == '/' {
            let start = pos;
            while pos < chars.len() && chars[pos].1 != '\n' {
                pos += 1;
            }
            comments.push(Comment {
                text: src[byte_at(start)..byte_at(pos)].to_owned(),
                line,
            });
            continue;
        }

        // Block comment
        if c == '/' && pos + 1 < chars.len() && chars[pos + 1].1 == '*' {
            let start = pos;
            let start_line = line;
            pos += 2;
            loop {
                if pos >= chars.len() {
                    log.error(file, start_line, "unterminated block comment");
                    break;
                }
                if chars[pos].1 == '\n' {
                    line += 1;
                }
                if chars[pos].1 == '*' && pos + 1 < chars.len() && chars[pos + 1].1 == '/' {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            comments.push(Comment {
                text: src[byte_at(start)..byte_at(pos)].to_owned(),
                line: start_line,
            });
            continue;
        }

        // Whitespace
        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
            }
            pos += 1;
            continue;
        }

        let tok_line = line;
        let tok_start = offset;

        // String literal
        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    log.error(file, tok_line, "unterminated string literal");
                    break;
                }
                let sc = chars[pos].1;
                if sc == '"' {
                    pos += 1;
                    break;
                }
                if sc == '\n' {
                    log.error(file, tok_line, "unterminated string literal");
                    break;
                }
                if sc == '\\' {
                    pos += 1;
                    if pos >= chars.len() {
                        log.error(file, tok_line, "unterminated escape in string");
                        break;
                    }
                    match chars[pos].1 {
                        '"' => s.push('"'),
                        '\\' => s.push('\\'),
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                    pos += 1;
                    continue;
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                line: tok_line,
                start: tok_start,
                end: byte_at(pos),
            });
            continue;
        }

        // Number
        if c.is_ascii_digit()
            || (c == '-' && pos + 1 < chars.len() && chars[pos + 1].1.is_ascii_digit())
        {
            let start = pos;
            if c == '-' {
                pos += 1;
            }
            while pos < chars.len() && chars[pos].1.is_ascii_digit() {
                pos += 1;
            }
            let text = &src[byte_at(start)..byte_at(pos)];
            match text.parse::<i64>() {
                Ok(n) => tokens.push(Spanned {
                    token: Token::Int(n),
                    line: tok_line,
                    start: tok_start,
                    end: byte_at(pos),
                }),
                Err(_) => {
                    log.error(file, tok_line, format!("invalid integer '{}'", text));
                }
            }
            continue;
        }

        // Punctuation
        let punct = match c {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ';' => Some(Token::Semi),
            ',' => Some(Token::Comma),
            '.' => Some(Token::Dot),
            '=' => Some(Token::Assign),
            _ => None,
        };
        if let Some(token) = punct {
            pos += 1;
            tokens.push(Spanned {
                token,
                line: tok_line,
                start: tok_start,
                end: byte_at(pos),
            });
            continue;
        }

        // Identifier / keyword
        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].1.is_alphanumeric() || chars[pos].1 == '_') {
                pos += 1;
            }
            let word = src[byte_at(start)..byte_at(pos)].to_owned();
            tokens.push(Spanned {
                token: Token::Word(word),
                line: tok_line,
                start: tok_start,
                end: byte_at(pos),
            });
            continue;
        }

        // Anything else: diagnose and skip the character.
        log.error(file, tok_line, format!("unexpected character '{}'", c));
        pos += 1;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        line,
        start: src.len(),
        end: src.len(),
    });
    LexOutput { tokens, comments }
}
