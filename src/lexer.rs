use std::str::Chars;

use smallvec::SmallVec;

use crate::Range;

pub const C_LINE_FEED: char = '\n';
pub const C_CARRIAGE_RETURN: char = '\r';
pub const C_FORM_FEED: char = '\u{c}';

pub const C_TAB: char = '\t';
pub const C_SPACE: char = ' ';

pub const C_SOLIDUS: char = '/';
pub const C_REVERSE_SOLIDUS: char = '\\';
pub const C_ASTERISK: char = '*';

pub const C_LEFT_PARENTHESIS: char = '(';
pub const C_RIGHT_PARENTHESIS: char = ')';
pub const C_LEFT_CURLY: char = '{';
pub const C_RIGHT_CURLY: char = '}';

pub const C_QUOTATION_MARK: char = '"';
pub const C_APOSTROPHE: char = '\'';

pub const C_FULL_STOP: char = '.';
pub const C_COLON: char = ':';
pub const C_SEMICOLON: char = ';';
pub const C_COMMA: char = ',';
pub const C_PERCENTAGE: char = '%';
pub const C_AT_SIGN: char = '@';
pub const C_EXCLAMATION_MARK: char = '!';

pub const C_LOW_LINE: char = '_';
pub const C_LOWER_A: char = 'a';
pub const C_LOWER_E: char = 'e';
pub const C_LOWER_Z: char = 'z';
pub const C_UPPER_A: char = 'A';
pub const C_UPPER_E: char = 'E';
pub const C_UPPER_Z: char = 'Z';

pub const C_NUMBER_SIGN: char = '#';
pub const C_PLUS_SIGN: char = '+';
pub const C_HYPHEN_MINUS: char = '-';

pub const C_LESS_THAN_SIGN: char = '<';
pub const C_GREATER_THAN_SIGN: char = '>';

/// Byte offset into the source text.
pub type Pos = u32;

/// Token handlers. Every handler runs after the lexer has moved past the token and may
/// advance the lexer further. Returning `None` stops the scan.
pub trait Visitor<'s> {
    fn is_selector(&mut self, _lexer: &Lexer<'s>) -> bool {
        false
    }

    fn white_space(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn comment(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn string(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn url(
        &mut self,
        _lexer: &mut Lexer<'s>,
        _start: Pos,
        _end: Pos,
        _content_start: Pos,
        _content_end: Pos,
    ) -> Option<()> {
        Some(())
    }

    fn bad_url(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn ident(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn function(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn pseudo_function(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn pseudo_class(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn at_keyword(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn class(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn id(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn numeric(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn delim(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn left_parenthesis(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn right_parenthesis(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn left_curly_bracket(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn right_curly_bracket(
        &mut self,
        _lexer: &mut Lexer<'s>,
        _start: Pos,
        _end: Pos,
    ) -> Option<()> {
        Some(())
    }

    fn semicolon(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }

    fn comma(&mut self, _lexer: &mut Lexer<'s>, _start: Pos, _end: Pos) -> Option<()> {
        Some(())
    }
}

#[derive(Debug, Clone)]
pub struct Lexer<'s> {
    value: &'s str,
    iter: Chars<'s>,
    cur_pos: Pos,
    cur: Option<char>,
    peek: Option<char>,
    peek2: Option<char>,
}

impl<'s> From<&'s str> for Lexer<'s> {
    fn from(value: &'s str) -> Self {
        Self::new(value)
    }
}

impl<'s> Lexer<'s> {
    pub fn new(value: &'s str) -> Self {
        Self::new_at(value, 0)
    }

    /// A lexer whose current char is the one starting at `pos`. Positions that are out of
    /// bounds or not on a char boundary start the lexer at EOF.
    pub fn new_at(value: &'s str, pos: Pos) -> Self {
        let (cur_pos, rest) = match value.get(pos as usize..) {
            Some(rest) => (pos, rest),
            None => (value.len() as Pos, ""),
        };
        let mut iter = rest.chars();
        let cur = iter.next();
        let peek = iter.next();
        let peek2 = iter.next();
        Self {
            value,
            iter,
            cur_pos,
            cur,
            peek,
            peek2,
        }
    }

    /// Moves to the next char. At EOF this is a no-op.
    pub fn consume(&mut self) -> Option<char> {
        if let Some(c) = self.cur {
            self.cur_pos += c.len_utf8() as Pos;
            self.cur = self.peek;
            self.peek = self.peek2;
            self.peek2 = self.iter.next();
        }
        self.cur
    }

    pub fn cur_pos(&self) -> Pos {
        self.cur_pos
    }

    pub fn cur(&self) -> Option<char> {
        self.cur
    }

    pub fn peek_pos(&self) -> Pos {
        self.cur_pos + self.cur.map_or(0, |c| c.len_utf8() as Pos)
    }

    pub fn peek(&self) -> Option<char> {
        self.peek
    }

    pub fn peek2_pos(&self) -> Pos {
        self.peek_pos() + self.peek.map_or(0, |c| c.len_utf8() as Pos)
    }

    pub fn peek2(&self) -> Option<char> {
        self.peek2
    }

    pub fn is_eof(&self) -> bool {
        self.cur.is_none()
    }

    pub fn source(&self) -> &'s str {
        self.value
    }

    pub fn slice(&self, start: Pos, end: Pos) -> Option<&'s str> {
        self.value.get(start as usize..end as usize)
    }

    pub fn slice_range(&self, range: &Range) -> Option<&'s str> {
        self.slice(range.start, range.end)
    }

    // EOF reads as NUL, which is never an ident, digit, escape or whitespace code point.
    fn peeks(&self) -> (char, char, char) {
        (
            self.cur.unwrap_or('\0'),
            self.peek.unwrap_or('\0'),
            self.peek2.unwrap_or('\0'),
        )
    }

    /// The range between the quotes of the string token at `start..end`. An unterminated
    /// string has no closing quote to drop.
    pub fn string_content_range(&self, start: Pos, end: Pos) -> Range {
        let is_closed = end - start >= 2
            && matches!(
                (self.slice(start, start + 1), self.slice(end - 1, end)),
                (Some(open), Some(close)) if open == close
            );
        if is_closed {
            Range::new(start + 1, end - 1)
        } else {
            Range::new((start + 1).min(end), end)
        }
    }

    pub fn starts_ident_sequence(&self) -> bool {
        let (c1, c2, c3) = self.peeks();
        start_ident_sequence(c1, c2, c3)
    }

    fn starts_number(&self) -> bool {
        let (c1, c2, c3) = self.peeks();
        start_number(c1, c2, c3)
    }

    fn starts_valid_escape(&self) -> bool {
        let (c1, c2, _) = self.peeks();
        are_valid_escape(c1, c2)
    }
}

impl<'s> Lexer<'s> {
    pub fn lex<T: Visitor<'s>>(&mut self, visitor: &mut T) {
        while !self.is_eof() {
            if self.lex_token(visitor).is_none() {
                break;
            }
        }
    }

    /// https://drafts.csswg.org/css-syntax/#consume-token
    pub fn lex_token<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let Some(c) = self.cur() else {
            return Some(());
        };
        let start = self.cur_pos();
        match c {
            C_SOLIDUS if self.peek() == Some(C_ASTERISK) => {
                self.consume_comment();
                visitor.comment(self, start, self.cur_pos())
            }
            c if is_white_space(c) => {
                self.consume_white_space();
                visitor.white_space(self, start, self.cur_pos())
            }
            C_QUOTATION_MARK | C_APOSTROPHE => self.consume_string(visitor),
            C_NUMBER_SIGN => self.consume_number_sign(visitor),
            C_LEFT_PARENTHESIS => {
                self.consume();
                visitor.left_parenthesis(self, start, self.cur_pos())
            }
            C_RIGHT_PARENTHESIS => {
                self.consume();
                visitor.right_parenthesis(self, start, self.cur_pos())
            }
            C_PLUS_SIGN => self.consume_plus_sign(visitor),
            C_COMMA => {
                self.consume();
                visitor.comma(self, start, self.cur_pos())
            }
            C_HYPHEN_MINUS => self.consume_minus(visitor),
            C_FULL_STOP => self.consume_full_stop(visitor),
            C_COLON => self.consume_potential_pseudo(visitor),
            C_SEMICOLON => {
                self.consume();
                visitor.semicolon(self, start, self.cur_pos())
            }
            C_LESS_THAN_SIGN => self.consume_less_than_sign(visitor),
            C_AT_SIGN => self.consume_at_sign(visitor),
            C_REVERSE_SOLIDUS => self.consume_reverse_solidus(visitor),
            C_LEFT_CURLY => {
                self.consume();
                visitor.left_curly_bracket(self, start, self.cur_pos())
            }
            C_RIGHT_CURLY => {
                self.consume();
                visitor.right_curly_bracket(self, start, self.cur_pos())
            }
            c if is_digit(c) => self.consume_numeric_token(visitor),
            c if is_ident_start(c) => self.consume_ident_like(visitor),
            _ => self.consume_delim(visitor),
        }
    }

    fn consume_delim<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let start = self.cur_pos();
        self.consume();
        visitor.delim(self, start, self.cur_pos())
    }

    /// Consumes a single `/* ... */`. An unterminated comment runs to EOF.
    pub fn consume_comment(&mut self) {
        if self.cur() != Some(C_SOLIDUS) || self.peek() != Some(C_ASTERISK) {
            return;
        }
        self.consume();
        self.consume();
        while let Some(c) = self.cur() {
            self.consume();
            if c == C_ASTERISK && self.cur() == Some(C_SOLIDUS) {
                self.consume();
                return;
            }
        }
    }

    /// Consumes consecutive comments.
    pub fn consume_comments(&mut self) {
        while self.cur() == Some(C_SOLIDUS) && self.peek() == Some(C_ASTERISK) {
            self.consume_comment();
        }
    }

    pub fn consume_white_space(&mut self) {
        while matches!(self.cur(), Some(c) if is_white_space(c)) {
            self.consume();
        }
    }

    pub fn consume_white_space_and_comments(&mut self) {
        loop {
            match self.cur() {
                Some(C_SOLIDUS) if self.peek() == Some(C_ASTERISK) => self.consume_comment(),
                Some(c) if is_white_space(c) => self.consume_white_space(),
                _ => return,
            }
        }
    }

    /// Consumes spaces and tabs, then at most one line break (`\r\n` counts as one).
    pub fn consume_white_line(&mut self) {
        while matches!(self.cur(), Some(c) if is_space(c)) {
            self.consume();
        }
        match self.cur() {
            Some(C_CARRIAGE_RETURN) => {
                self.consume();
                if self.cur() == Some(C_LINE_FEED) {
                    self.consume();
                }
            }
            Some(c) if is_new_line(c) => {
                self.consume();
            }
            _ => {}
        }
    }

    /// Consumes up to, not including, the first of `delimiters`.
    pub fn consume_until(&mut self, delimiters: &[char]) {
        while let Some(c) = self.cur() {
            if delimiters.contains(&c) {
                return;
            }
            if self.starts_valid_escape() {
                self.consume();
                self.consume_escaped();
            } else {
                self.consume();
            }
        }
    }

    fn consume_digits(&mut self) {
        while matches!(self.cur(), Some(c) if is_digit(c)) {
            self.consume();
        }
    }

    pub fn consume_number(&mut self) {
        if matches!(self.cur(), Some(C_PLUS_SIGN | C_HYPHEN_MINUS)) {
            self.consume();
        }
        self.consume_digits();
        if self.cur() == Some(C_FULL_STOP) && matches!(self.peek(), Some(c) if is_digit(c)) {
            self.consume();
            self.consume_digits();
        }
        if matches!(self.cur(), Some(C_LOWER_E | C_UPPER_E)) {
            let (_, c2, c3) = self.peeks();
            if is_digit(c2) {
                self.consume();
                self.consume_digits();
            } else if (c2 == C_HYPHEN_MINUS || c2 == C_PLUS_SIGN) && is_digit(c3) {
                self.consume();
                self.consume();
                self.consume_digits();
            }
        }
    }

    pub fn consume_numeric_token<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let start = self.cur_pos();
        self.consume_number();
        if self.starts_ident_sequence() {
            self.consume_ident_sequence();
        } else if self.cur() == Some(C_PERCENTAGE) {
            self.consume();
        }
        visitor.numeric(self, start, self.cur_pos())
    }

    pub fn consume_ident_sequence(&mut self) {
        while let Some(c) = self.cur() {
            if self.starts_valid_escape() {
                self.consume();
                self.consume_escaped();
            } else if is_ident(c) {
                self.consume();
            } else {
                return;
            }
        }
    }

    /// Consumes the code point(s) after a `\`: 1-6 hex digits plus one optional whitespace,
    /// or any single code point.
    pub fn consume_escaped(&mut self) {
        match self.cur() {
            Some(c) if is_hex_digit(c) => {
                self.consume();
                for _ in 1..6 {
                    if !matches!(self.cur(), Some(c) if is_hex_digit(c)) {
                        break;
                    }
                    self.consume();
                }
                match self.cur() {
                    Some(C_CARRIAGE_RETURN) => {
                        self.consume();
                        if self.cur() == Some(C_LINE_FEED) {
                            self.consume();
                        }
                    }
                    Some(c) if is_white_space(c) => {
                        self.consume();
                    }
                    _ => {}
                }
            }
            Some(_) => {
                self.consume();
            }
            None => {}
        }
    }

    pub fn consume_ident_like<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let start = self.cur_pos();
        self.consume_ident_sequence();
        if self.cur() != Some(C_LEFT_PARENTHESIS) {
            return visitor.ident(self, start, self.cur_pos());
        }
        let is_url = matches!(
            self.slice(start, self.cur_pos()),
            Some(name) if name.eq_ignore_ascii_case("url")
        );
        self.consume();
        let end = self.cur_pos();
        if is_url {
            let mut lookahead = self.clone();
            lookahead.consume_white_space();
            if !matches!(lookahead.cur(), Some(C_QUOTATION_MARK | C_APOSTROPHE)) {
                return self.consume_url(visitor, start);
            }
        }
        visitor.function(self, start, end)
    }

    /// https://drafts.csswg.org/css-syntax/#consume-url-token
    fn consume_url<T: Visitor<'s>>(&mut self, visitor: &mut T, start: Pos) -> Option<()> {
        self.consume_white_space();
        let content_start = self.cur_pos();
        loop {
            match self.cur() {
                None => return visitor.bad_url(self, start, self.cur_pos()),
                Some(C_RIGHT_PARENTHESIS) => {
                    let content_end = self.cur_pos();
                    self.consume();
                    return visitor.url(self, start, self.cur_pos(), content_start, content_end);
                }
                Some(c) if is_white_space(c) => {
                    let content_end = self.cur_pos();
                    self.consume_white_space();
                    if self.cur() == Some(C_RIGHT_PARENTHESIS) {
                        self.consume();
                        return visitor.url(
                            self,
                            start,
                            self.cur_pos(),
                            content_start,
                            content_end,
                        );
                    }
                    self.consume_bad_url_remnants();
                    return visitor.bad_url(self, start, self.cur_pos());
                }
                Some(C_QUOTATION_MARK | C_APOSTROPHE | C_LEFT_PARENTHESIS) => {
                    self.consume_bad_url_remnants();
                    return visitor.bad_url(self, start, self.cur_pos());
                }
                Some(C_REVERSE_SOLIDUS) => {
                    if !self.starts_valid_escape() {
                        self.consume_bad_url_remnants();
                        return visitor.bad_url(self, start, self.cur_pos());
                    }
                    self.consume();
                    self.consume_escaped();
                }
                Some(_) => {
                    self.consume();
                }
            }
        }
    }

    fn consume_bad_url_remnants(&mut self) {
        while let Some(c) = self.cur() {
            if c == C_RIGHT_PARENTHESIS {
                self.consume();
                return;
            }
            if self.starts_valid_escape() {
                self.consume();
                self.consume_escaped();
            } else {
                self.consume();
            }
        }
    }

    pub fn consume_string<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let start = self.cur_pos();
        self.consume_string_body();
        visitor.string(self, start, self.cur_pos())
    }

    // An unescaped newline ends a bad string without being consumed.
    fn consume_string_body(&mut self) {
        let Some(quote) = self.cur() else {
            return;
        };
        self.consume();
        while let Some(c) = self.cur() {
            if c == quote {
                self.consume();
                return;
            }
            if is_new_line(c) {
                return;
            }
            self.consume();
            if c == C_REVERSE_SOLIDUS {
                if self.cur() == Some(C_CARRIAGE_RETURN) && self.peek() == Some(C_LINE_FEED) {
                    self.consume();
                }
                self.consume();
            }
        }
    }

    fn consume_number_sign<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let start = self.cur_pos();
        self.consume();
        if self.starts_ident_sequence() && visitor.is_selector(self) {
            self.consume_ident_sequence();
            return visitor.id(self, start, self.cur_pos());
        }
        visitor.delim(self, start, self.cur_pos())
    }

    fn consume_plus_sign<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        if self.starts_number() {
            self.consume_numeric_token(visitor)
        } else {
            self.consume_delim(visitor)
        }
    }

    fn consume_minus<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let (_, c2, c3) = self.peeks();
        if self.starts_number() {
            self.consume_numeric_token(visitor)
        } else if c2 == C_HYPHEN_MINUS && c3 == C_GREATER_THAN_SIGN {
            // CDC `-->`
            let start = self.cur_pos();
            self.consume();
            self.consume();
            self.consume();
            visitor.delim(self, start, self.cur_pos())
        } else if self.starts_ident_sequence() {
            self.consume_ident_like(visitor)
        } else {
            self.consume_delim(visitor)
        }
    }

    fn consume_full_stop<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        if self.starts_number() {
            return self.consume_numeric_token(visitor);
        }
        let start = self.cur_pos();
        self.consume();
        if self.starts_ident_sequence() && visitor.is_selector(self) {
            self.consume_ident_sequence();
            return visitor.class(self, start, self.cur_pos());
        }
        visitor.delim(self, start, self.cur_pos())
    }

    pub fn consume_potential_pseudo<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let start = self.cur_pos();
        self.consume();
        if !self.starts_ident_sequence() || !visitor.is_selector(self) {
            return visitor.delim(self, start, self.cur_pos());
        }
        self.consume_ident_sequence();
        if self.cur() == Some(C_LEFT_PARENTHESIS) {
            self.consume();
            visitor.pseudo_function(self, start, self.cur_pos())
        } else {
            visitor.pseudo_class(self, start, self.cur_pos())
        }
    }

    fn consume_less_than_sign<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let start = self.cur_pos();
        self.consume();
        // CDO `<!--`
        if self.cur() == Some(C_EXCLAMATION_MARK)
            && self.peek() == Some(C_HYPHEN_MINUS)
            && self.peek2() == Some(C_HYPHEN_MINUS)
        {
            self.consume();
            self.consume();
            self.consume();
        }
        visitor.delim(self, start, self.cur_pos())
    }

    fn consume_at_sign<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        let start = self.cur_pos();
        self.consume();
        if self.starts_ident_sequence() {
            self.consume_ident_sequence();
            return visitor.at_keyword(self, start, self.cur_pos());
        }
        visitor.delim(self, start, self.cur_pos())
    }

    fn consume_reverse_solidus<T: Visitor<'s>>(&mut self, visitor: &mut T) -> Option<()> {
        if self.starts_valid_escape() {
            self.consume_ident_like(visitor)
        } else {
            self.consume_delim(visitor)
        }
    }
}

/// Result of [`Lexer::eat_import_prelude`]. `layer` and `supports` cover the whole
/// `layer`/`layer(...)` and `supports(...)` tokens.
#[derive(Debug, Default, Clone)]
pub struct ImportPrelude {
    pub url: Option<ImportUrl>,
    pub layer: Option<Range>,
    pub supports: Option<Range>,
    pub semicolon: Option<Range>,
    pub comments: SmallVec<[Range; 1]>,
}

#[derive(Debug, Clone)]
pub struct ImportUrl {
    pub range: Range,
    pub content: Range,
}

#[derive(Debug, Clone, Copy)]
enum ImportScope {
    Url,
    Layer,
    Supports,
}

#[derive(Debug, Default)]
struct ImportPreludeVisitor {
    prelude: ImportPrelude,
    scope: Option<ImportScope>,
    balanced: u32,
}

impl ImportPreludeVisitor {
    fn is_empty(&self) -> bool {
        self.prelude.url.is_none() && self.prelude.layer.is_none() && self.prelude.supports.is_none()
    }
}

impl<'s> Visitor<'s> for ImportPreludeVisitor {
    fn comment(&mut self, _: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        self.prelude.comments.push(Range::new(start, end));
        Some(())
    }

    fn url(&mut self, _: &mut Lexer<'s>, start: Pos, end: Pos, cs: Pos, ce: Pos) -> Option<()> {
        if self.balanced == 0 && self.is_empty() {
            self.prelude.url = Some(ImportUrl {
                range: Range::new(start, end),
                content: Range::new(cs, ce),
            });
        }
        Some(())
    }

    fn string(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if self.balanced == 0 && self.is_empty() {
            self.prelude.url = Some(ImportUrl {
                range: Range::new(start, end),
                content: lexer.string_content_range(start, end),
            });
        } else if self.balanced == 1 && matches!(self.scope, Some(ImportScope::Url)) {
            if let Some(url) = &mut self.prelude.url {
                url.content = lexer.string_content_range(start, end);
            }
        }
        Some(())
    }

    fn function(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if self.balanced == 0 {
            let name = lexer.slice(start, end - 1).unwrap_or_default();
            let is_empty = self.is_empty();
            let prelude = &mut self.prelude;
            if name.eq_ignore_ascii_case("url") && is_empty {
                self.scope = Some(ImportScope::Url);
                prelude.url = Some(ImportUrl {
                    range: Range::new(start, end),
                    content: Range::new(end, end),
                });
            } else if name.eq_ignore_ascii_case("layer")
                && prelude.layer.is_none()
                && prelude.supports.is_none()
            {
                self.scope = Some(ImportScope::Layer);
                prelude.layer = Some(Range::new(start, end));
            } else if name.eq_ignore_ascii_case("supports") && prelude.supports.is_none() {
                self.scope = Some(ImportScope::Supports);
                prelude.supports = Some(Range::new(start, end));
            } else {
                self.scope = None;
            }
        }
        self.balanced += 1;
        Some(())
    }

    fn left_parenthesis(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        self.balanced += 1;
        Some(())
    }

    fn right_parenthesis(&mut self, _: &mut Lexer<'s>, _: Pos, end: Pos) -> Option<()> {
        self.balanced = self.balanced.saturating_sub(1);
        if self.balanced == 0 {
            let prelude = &mut self.prelude;
            let range = match self.scope.take() {
                Some(ImportScope::Url) => prelude.url.as_mut().map(|url| &mut url.range),
                Some(ImportScope::Layer) => prelude.layer.as_mut(),
                Some(ImportScope::Supports) => prelude.supports.as_mut(),
                None => None,
            };
            if let Some(range) = range {
                range.end = end;
            }
        }
        Some(())
    }

    fn ident(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if self.balanced == 0
            && self.prelude.layer.is_none()
            && self.prelude.supports.is_none()
            && matches!(lexer.slice(start, end), Some(name) if name.eq_ignore_ascii_case("layer"))
        {
            self.prelude.layer = Some(Range::new(start, end));
            self.scope = None;
        }
        Some(())
    }

    fn semicolon(&mut self, _: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if self.balanced == 0 {
            self.prelude.semicolon = Some(Range::new(start, end));
            return None;
        }
        Some(())
    }
}

/// Result of [`Lexer::eat_image_set_strings`].
#[derive(Debug, Default, Clone)]
pub struct ImageSetStrings {
    pub strings: SmallVec<[Range; 2]>,
    pub comments: SmallVec<[Range; 1]>,
}

#[derive(Debug, Default)]
struct ImageSetVisitor {
    result: ImageSetStrings,
    balanced: u32,
    is_first: bool,
}

impl<'s> Visitor<'s> for ImageSetVisitor {
    fn comment(&mut self, _: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        self.result.comments.push(Range::new(start, end));
        Some(())
    }

    fn string(&mut self, _: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if self.is_first && self.balanced == 1 {
            self.result.strings.push(Range::new(start, end));
        }
        self.is_first = false;
        Some(())
    }

    fn comma(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        if self.balanced == 1 {
            self.is_first = true;
        }
        Some(())
    }

    fn function(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        self.balanced += 1;
        Some(())
    }

    fn left_parenthesis(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        self.balanced += 1;
        Some(())
    }

    fn right_parenthesis(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        self.balanced -= 1;
        if self.balanced == 0 {
            return None;
        }
        Some(())
    }

    fn semicolon(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        None
    }

    fn left_curly_bracket(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        None
    }

    fn right_curly_bracket(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        None
    }
}

impl Lexer<'_> {
    /// Consumes an identifier at the current position and returns its range.
    pub fn eat_ident_sequence(&mut self) -> Option<Range> {
        if !self.starts_ident_sequence() {
            return None;
        }
        let start = self.cur_pos();
        self.consume_ident_sequence();
        Some(Range::new(start, self.cur_pos()))
    }

    /// Skips whitespace and comments, then consumes a quoted string. The range includes
    /// the quotes.
    pub fn eat_string(&mut self) -> Option<Range> {
        self.consume_white_space_and_comments();
        if !matches!(self.cur(), Some(C_QUOTATION_MARK | C_APOSTROPHE)) {
            return None;
        }
        let start = self.cur_pos();
        self.consume_string_body();
        Some(Range::new(start, self.cur_pos()))
    }

    /// Consumes an identifier or a quoted string at the current position. The flag is
    /// `true` for an identifier.
    pub fn eat_ident_sequence_or_string(&mut self) -> Option<(Range, bool)> {
        if matches!(self.cur(), Some(C_QUOTATION_MARK | C_APOSTROPHE)) {
            let start = self.cur_pos();
            self.consume_string_body();
            return Some((Range::new(start, self.cur_pos()), false));
        }
        self.eat_ident_sequence().map(|range| (range, true))
    }

    /// Consumes an `@import` prelude: `url(...)` or a string, optional `layer` or
    /// `layer(...)`, optional `supports(...)`, media text, and the closing `;`. Stops
    /// before a top level `{` or `}` so a broken rule can't swallow the next block.
    pub fn eat_import_prelude(&mut self) -> ImportPrelude {
        let mut visitor = ImportPreludeVisitor::default();
        while let Some(c) = self.cur() {
            if visitor.balanced == 0 && (c == C_LEFT_CURLY || c == C_RIGHT_CURLY) {
                break;
            }
            if self.lex_token(&mut visitor).is_none() {
                break;
            }
        }
        visitor.prelude
    }

    /// Scans the arguments of an `image-set(` whose opening parenthesis has already been
    /// consumed, returning the quoted strings that start each item and the comments seen
    /// on the way.
    pub fn eat_image_set_strings(&mut self) -> ImageSetStrings {
        let mut visitor = ImageSetVisitor {
            result: ImageSetStrings::default(),
            balanced: 1,
            is_first: true,
        };
        self.lex(&mut visitor);
        visitor.result
    }

    /// Consumes up to the first of `delimiters` that is outside strings, comments and
    /// parentheses.
    pub fn consume_component_values_until(&mut self, delimiters: &[char]) {
        let mut balanced = 0u32;
        while let Some(c) = self.cur() {
            if balanced == 0 && delimiters.contains(&c) {
                return;
            }
            match c {
                C_QUOTATION_MARK | C_APOSTROPHE => self.consume_string_body(),
                C_SOLIDUS if self.peek() == Some(C_ASTERISK) => self.consume_comment(),
                C_LEFT_PARENTHESIS => {
                    balanced += 1;
                    self.consume();
                }
                C_RIGHT_PARENTHESIS => {
                    balanced = balanced.saturating_sub(1);
                    self.consume();
                }
                C_REVERSE_SOLIDUS if self.starts_valid_escape() => {
                    self.consume();
                    self.consume_escaped();
                }
                _ => {
                    self.consume();
                }
            }
        }
    }
}

pub fn is_new_line(c: char) -> bool {
    c == C_LINE_FEED || c == C_CARRIAGE_RETURN || c == C_FORM_FEED
}

pub fn is_space(c: char) -> bool {
    c == C_TAB || c == C_SPACE
}

pub fn is_white_space(c: char) -> bool {
    is_new_line(c) || is_space(c)
}

pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

pub fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

pub fn is_ident_start(c: char) -> bool {
    c == C_LOW_LINE
        || (C_LOWER_A..=C_LOWER_Z).contains(&c)
        || (C_UPPER_A..=C_UPPER_Z).contains(&c)
        || c >= '\u{80}'
}

pub fn is_ident(c: char) -> bool {
    is_ident_start(c) || is_digit(c) || c == C_HYPHEN_MINUS
}

pub fn start_ident_sequence(c1: char, c2: char, c3: char) -> bool {
    if c1 == C_HYPHEN_MINUS {
        is_ident_start(c2) || c2 == C_HYPHEN_MINUS || are_valid_escape(c2, c3)
    } else {
        is_ident_start(c1) || are_valid_escape(c1, c2)
    }
}

pub fn are_valid_escape(c1: char, c2: char) -> bool {
    c1 == C_REVERSE_SOLIDUS && !is_new_line(c2) && c2 != '\0'
}

pub fn start_number(c1: char, c2: char, c3: char) -> bool {
    if c1 == C_PLUS_SIGN || c1 == C_HYPHEN_MINUS {
        is_digit(c2) || (c2 == C_FULL_STOP && is_digit(c3))
    } else {
        is_digit(c1) || (c1 == C_FULL_STOP && is_digit(c2))
    }
}
