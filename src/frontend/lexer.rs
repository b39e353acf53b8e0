// src/frontend/lexer.rs

use std::sync::Arc;

use crate::errors::{Diagnostic, ErrorKey};
use crate::frontend::{SourceFile, Token, TokenKind};

/// Single-pass, non-restartable lexer.
///
/// Errors never abort the scan: the lexer records a diagnostic and resumes
/// at the next byte. Columns are 1-based byte columns, so for every token
/// `column + lexeme.len() - 1` is the column of the token's last byte.
pub struct Lexer<'src> {
    source: &'src str,
    file: Arc<SourceFile>,
    pos: usize,
    row: u32,
    column: u32,
    diagnostics: Vec<Diagnostic>,
}

const TWO_CHAR_OPERATORS: [&str; 9] = ["<<", ">>", "==", "!=", ">=", "<=", "&&", "||", "::"];
const ONE_CHAR_OPERATORS: [char; 13] = [
    '+', '-', '*', '/', '%', '~', '&', '|', '^', '!', '<', '>', '=',
];

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, file: Arc<SourceFile>) -> Self {
        Self {
            source,
            file,
            pos: 0,
            row: 1,
            column: 1,
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the whole source buffer.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while self.pos < self.source.len() {
            if let Some(token) = self.token() {
                tokens.push(token);
            }
        }
        tracing::debug!(
            path = %self.file.path.display(),
            tokens = tokens.len(),
            errors = self.diagnostics.len(),
            "lexed source file"
        );
        tokens
    }

    /// Take all collected diagnostics, leaving the internal list empty.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    fn push_error(&mut self, key: ErrorKey) {
        self.diagnostics.push(Diagnostic {
            severity: key.severity(),
            path: self.file.path.clone(),
            row: self.row,
            column: self.column,
            key,
            args: Vec::new(),
        });
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn newline(&mut self) {
        self.row += 1;
        self.column = 1;
    }

    /// Consume one char, advancing the byte column.
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            self.column += c.len_utf8() as u32;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
            if c == '\n' {
                self.newline();
            } else {
                self.column += c.len_utf8() as u32;
            }
        }
    }

    /// Produce the next token, or `None` for trivia and errors.
    fn token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let c = self.peek()?;
        let row = self.row;
        let column = self.column;
        let start = self.pos;

        let kind = match c {
            ';' => {
                self.advance();
                TokenKind::Semicolon
            }
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            '(' | ')' | '{' | '}' | '[' | ']' => {
                self.advance();
                TokenKind::Brace
            }
            '"' => {
                self.lex_string();
                TokenKind::Value
            }
            '\'' => {
                self.lex_rune();
                TokenKind::Value
            }
            '/' if self.rest().starts_with("//") => {
                self.lex_line_comment();
                return None;
            }
            '/' if self.rest().starts_with("/*") => {
                self.lex_block_comment();
                return None;
            }
            ':' if self.rest().starts_with("::") => {
                self.advance();
                self.advance();
                TokenKind::Operator
            }
            ':' => {
                self.advance();
                TokenKind::Colon
            }
            '.' if self.rest().starts_with("...") => {
                self.advance();
                self.advance();
                self.advance();
                TokenKind::Operator
            }
            _ if TWO_CHAR_OPERATORS.iter().any(|op| self.rest().starts_with(op)) => {
                self.advance();
                self.advance();
                TokenKind::Operator
            }
            _ if ONE_CHAR_OPERATORS.contains(&c) => {
                self.advance();
                TokenKind::Operator
            }
            _ if c == '_' || c.is_alphabetic() => {
                let word = self.lex_name();
                keyword_kind(word)
            }
            _ if c.is_ascii_digit() => {
                self.lex_numeric();
                TokenKind::Value
            }
            _ => {
                self.push_error(ErrorKey::InvalidToken);
                self.advance();
                return None;
            }
        };

        Some(Token {
            kind,
            lexeme: self.source[start..self.pos].to_string(),
            row,
            column,
            file: Arc::clone(&self.file),
        })
    }

    /// Scan an identifier-shaped word and return it.
    fn lex_name(&mut self) -> &'src str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c != '_' && !c.is_ascii_digit() && !c.is_alphabetic() {
                break;
            }
            self.advance();
        }
        &self.source[start..self.pos]
    }

    /// Scan a numeric literal: hex, or decimal with optional fraction and
    /// exponent. The fraction requires a digit after the dot and the
    /// exponent requires at least one digit, otherwise they are not
    /// consumed.
    fn lex_numeric(&mut self) {
        let rest = self.rest();
        if rest.starts_with("0x") {
            let digits = rest[2..]
                .bytes()
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            if digits > 0 {
                self.pos += 2 + digits;
                self.column += (2 + digits) as u32;
                return;
            }
        }
        let int_digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        let mut len = int_digits;
        let bytes = rest.as_bytes();
        if bytes.get(len) == Some(&b'.') {
            let frac = rest[len + 1..]
                .bytes()
                .take_while(|b| b.is_ascii_digit())
                .count();
            if frac > 0 {
                len += 1 + frac;
            }
        }
        if matches!(bytes.get(len), Some(b'e') | Some(b'E')) {
            let mut exp_len = 1;
            if matches!(bytes.get(len + 1), Some(b'+') | Some(b'-')) {
                exp_len += 1;
            }
            let digits = rest[len + exp_len..]
                .bytes()
                .take_while(|b| b.is_ascii_digit())
                .count();
            if digits > 0 {
                len += exp_len + digits;
            }
        }
        self.pos += len;
        self.column += len as u32;
    }

    /// Match an escape sequence at `rest` (which starts with `\`).
    /// Returns its byte length, or `None` when the sequence is invalid.
    fn match_escape(rest: &str) -> Option<usize> {
        let bytes = rest.as_bytes();
        let follows = |n: usize| bytes.len() >= n && !bytes[2..n].contains(&b'\n');
        match bytes.get(1)? {
            b'\\' | b'\'' | b'"' | b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v' => Some(2),
            b'U' if follows(10) => Some(10),
            b'u' if follows(6) => Some(6),
            b'x' if follows(4) => Some(4),
            b'0'..=b'7' => {
                let digits = bytes[1..]
                    .iter()
                    .take(3)
                    .take_while(|b| (b'0'..=b'7').contains(*b))
                    .count();
                Some(1 + digits)
            }
            _ => None,
        }
    }

    /// Consume one rune of string/rune literal content; escapes count as a
    /// single rune. Returns the consumed byte length.
    fn lex_literal_rune(&mut self) -> usize {
        if self.rest().starts_with('\\') {
            match Self::match_escape(self.rest()) {
                Some(len) => {
                    self.pos += len;
                    self.column += len as u32;
                    len
                }
                None => {
                    self.push_error(ErrorKey::InvalidEscapeSequence);
                    self.pos += 1;
                    self.column += 1;
                    1
                }
            }
        } else {
            let len = self.peek().map(char::len_utf8).unwrap_or(0);
            self.pos += len;
            self.column += len as u32;
            len
        }
    }

    /// Consume a string literal, opening quote included.
    fn lex_string(&mut self) {
        self.advance(); // opening quote
        loop {
            match self.peek() {
                None => {
                    self.push_error(ErrorKey::MissingStringEnd);
                    return;
                }
                Some('\n') => {
                    self.push_error(ErrorKey::MissingStringEnd);
                    self.pos += 1;
                    self.newline();
                    return;
                }
                Some('"') => {
                    self.advance();
                    return;
                }
                _ => {
                    self.lex_literal_rune();
                }
            }
        }
    }

    /// Consume a rune literal; exactly one code point is allowed.
    fn lex_rune(&mut self) {
        self.advance(); // opening quote
        let mut count = 0usize;
        loop {
            match self.peek() {
                None => {
                    self.push_error(ErrorKey::MissingRuneEnd);
                    return;
                }
                Some('\n') => {
                    self.push_error(ErrorKey::MissingRuneEnd);
                    self.pos += 1;
                    self.newline();
                    return;
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                _ => {
                    self.lex_literal_rune();
                    count += 1;
                }
            }
        }
        if count == 0 {
            self.push_error(ErrorKey::RuneEmpty);
        } else if count > 1 {
            self.push_error(ErrorKey::RuneOverflow);
        }
    }

    fn lex_line_comment(&mut self) {
        self.pos += 2;
        self.column += 2;
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.newline();
                return;
            }
            self.column += c.len_utf8() as u32;
        }
    }

    fn lex_block_comment(&mut self) {
        self.pos += 2;
        self.column += 2;
        while self.pos < self.source.len() {
            if self.rest().starts_with("*/") {
                self.pos += 2;
                self.column += 2;
                return;
            }
            let c = self.peek().unwrap();
            self.pos += c.len_utf8();
            if c == '\n' {
                self.newline();
            } else {
                self.column += c.len_utf8() as u32;
            }
        }
        self.push_error(ErrorKey::MissingBlockComment);
    }
}

/// Classify an identifier-shaped word: keyword kinds win over plain names.
fn keyword_kind(word: &str) -> TokenKind {
    match word {
        "var" => TokenKind::Var,
        "const" => TokenKind::Const,
        "ret" => TokenKind::Ret,
        "new" => TokenKind::New,
        "true" | "false" | "nil" => TokenKind::Value,
        "bool" | "rune" | "str" | "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16"
        | "uint32" | "uint64" | "float32" | "float64" => TokenKind::Type,
        _ => TokenKind::Name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut lexer = Lexer::new(source, SourceFile::new("test.st"));
        let tokens = lexer.tokenize();
        let diagnostics = lexer.take_diagnostics();
        (tokens, diagnostics)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.into_iter().map(|t| t.kind).collect()
    }

    fn lexemes(source: &str) -> Vec<String> {
        lex(source).0.into_iter().map(|t| t.lexeme).collect()
    }

    #[test]
    fn punctuation_and_braces() {
        assert_eq!(
            kinds("; , ( ) { } [ ] :"),
            vec![
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Brace,
                TokenKind::Brace,
                TokenKind::Brace,
                TokenKind::Brace,
                TokenKind::Brace,
                TokenKind::Brace,
                TokenKind::Colon,
            ]
        );
    }

    #[test]
    fn two_char_operators_before_one_char() {
        assert_eq!(
            lexemes("<< >> == != >= <= && || :: ..."),
            vec!["<<", ">>", "==", "!=", ">=", "<=", "&&", "||", "::", "..."]
        );
        assert_eq!(lexemes("<<="), vec!["<<", "="]);
        assert_eq!(lexemes("<=="), vec!["<=", "="]);
    }

    #[test]
    fn keywords_and_names() {
        assert_eq!(
            kinds("var const ret new true false nil int32 float64 x"),
            vec![
                TokenKind::Var,
                TokenKind::Const,
                TokenKind::Ret,
                TokenKind::New,
                TokenKind::Value,
                TokenKind::Value,
                TokenKind::Value,
                TokenKind::Type,
                TokenKind::Type,
                TokenKind::Name,
            ]
        );
        // Keyword prefixes of longer words are plain names.
        assert_eq!(kinds("variable retain constant"), vec![TokenKind::Name; 3]);
    }

    #[test]
    fn unicode_identifiers() {
        let (tokens, diagnostics) = lex("héllo wörld _x a1");
        assert!(diagnostics.is_empty());
        assert_eq!(
            tokens.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>(),
            vec!["héllo", "wörld", "_x", "a1"]
        );
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Name));
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            lexemes("0x1f 42 3.14 1e10 2.5e-3 007"),
            vec!["0x1f", "42", "3.14", "1e10", "2.5e-3", "007"]
        );
        // Dot without a following digit is not part of the number.
        let (tokens, diagnostics) = lex("5.");
        assert_eq!(tokens[0].lexeme, "5");
        assert_eq!(diagnostics[0].key, ErrorKey::InvalidToken);
        // Exponent without digits is left to the identifier production.
        assert_eq!(lexemes("5e"), vec!["5", "e"]);
    }

    #[test]
    fn string_literals() {
        let (tokens, diagnostics) = lex(r#""hello" "a\n\"b" "\x41" "\101" "é""#);
        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 5);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Value));
        assert_eq!(tokens[1].lexeme, r#""a\n\"b""#);
    }

    #[test]
    fn unterminated_string_reports_missing_end() {
        let (_, diagnostics) = lex("\"abc\nx");
        assert_eq!(diagnostics[0].key, ErrorKey::MissingStringEnd);
    }

    #[test]
    fn invalid_escape_sequence() {
        let (_, diagnostics) = lex(r#""\z""#);
        assert_eq!(diagnostics[0].key, ErrorKey::InvalidEscapeSequence);
    }

    #[test]
    fn rune_literals() {
        let (tokens, diagnostics) = lex(r"'a' '\n' '\x41' 'é'");
        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn rune_empty_and_overflow() {
        let (_, diagnostics) = lex("''");
        assert_eq!(diagnostics[0].key, ErrorKey::RuneEmpty);
        let (_, diagnostics) = lex("'ab'");
        assert_eq!(diagnostics[0].key, ErrorKey::RuneOverflow);
    }

    #[test]
    fn comments_are_trivia() {
        let (tokens, diagnostics) = lex("a // comment\nb /* block\ncomment */ c");
        assert!(diagnostics.is_empty());
        assert_eq!(
            tokens.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn unterminated_block_comment() {
        let (_, diagnostics) = lex("/* never closed");
        assert_eq!(diagnostics[0].key, ErrorKey::MissingBlockComment);
    }

    #[test]
    fn invalid_token_recovers() {
        let (tokens, diagnostics) = lex("a ## b");
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.key == ErrorKey::InvalidToken));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn rows_and_columns() {
        let (tokens, _) = lex("var x\n  ret");
        assert_eq!((tokens[0].row, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].row, tokens[1].column), (1, 5));
        assert_eq!((tokens[2].row, tokens[2].column), (2, 3));
    }

    #[test]
    fn column_matches_last_byte() {
        // column + lexeme byte length - 1 is the column of the last byte.
        let source = "abc def  0x10";
        let (tokens, _) = lex(source);
        for token in &tokens {
            let start = token.column as usize - 1;
            let end = start + token.lexeme.len();
            assert_eq!(&source[start..end], token.lexeme);
        }
    }

    #[test]
    fn lexeme_round_trip() {
        // Joining lexemes with single spaces reproduces the source modulo
        // whitespace collapsing and comment removal.
        let source = "var  x =   3 + 4 // trailing";
        let (tokens, _) = lex(source);
        let joined = tokens
            .iter()
            .map(|t| t.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, "var x = 3 + 4");
    }
}
