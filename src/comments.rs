use std::fmt::Display;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::location::SourceSpan;
use crate::Range;

/// A `/* ... */` comment. `value` is the text between the delimiters.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Comment<'s> {
    pub value: &'s str,
    pub range: Range,
    pub loc: SourceSpan,
}

/// A literal value of a magic comment option.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Regex { pattern: String, flags: String },
    Array(Vec<CommentValue>),
}

impl Display for CommentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentValue::Undefined => write!(f, "undefined"),
            CommentValue::Null => write!(f, "null"),
            CommentValue::Bool(value) => write!(f, "{value}"),
            CommentValue::Number(value) => write!(f, "{value}"),
            CommentValue::String(value) => write!(f, "{value:?}"),
            CommentValue::Regex { pattern, flags } => write!(f, "/{pattern}/{flags}"),
            CommentValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CommentError {
    pub range: Range,
    pub loc: SourceSpan,
    pub comment: String,
    pub message: String,
}

impl Display for CommentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Compilation error while processing magic comment(-s): /*{}*/: {}",
            self.comment, self.message
        )
    }
}

/// Options collected from the magic comments of a range. Later comments override the
/// keys of earlier ones.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommentOptions {
    options: Option<FxHashMap<String, CommentValue>>,
    errors: Vec<CommentError>,
}

impl CommentOptions {
    pub const EMPTY: CommentOptions = CommentOptions {
        options: None,
        errors: Vec::new(),
    };

    pub fn get(&self, key: &str) -> Option<&CommentValue> {
        self.options.as_ref()?.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_none() && self.errors.is_empty()
    }

    pub fn errors(&self) -> &[CommentError] {
        &self.errors
    }
}

/// Recognizes `webpackXxx:` directive comments and evaluates their body as an object
/// literal made of literals, arrays and regexes.
#[derive(Debug, Clone)]
pub struct MagicCommentEvaluator {
    marker: Regex,
}

impl MagicCommentEvaluator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            marker: Regex::new(r"(^|\W)webpack[A-Z][A-Za-z]+:")?,
        })
    }

    pub fn is_magic(&self, comment: &str) -> bool {
        self.marker.is_match(comment)
    }

    pub fn evaluate(&self, comment: &str) -> Result<Vec<(String, CommentValue)>, String> {
        LiteralParser::new(comment).parse_object_body()
    }
}

/// Comments lying fully inside `range`. `comments` must be sorted by start.
pub fn comments_in_range<'a, 's>(
    comments: &'a [Comment<'s>],
    range: Range,
) -> impl Iterator<Item = &'a Comment<'s>> {
    let first = comments.partition_point(|comment| comment.range.start < range.start);
    comments[first..]
        .iter()
        .take_while(move |comment| comment.range.start <= range.end)
        .filter(move |comment| comment.range.end <= range.end)
}

pub fn parse_comment_options(
    comments: &[Comment<'_>],
    range: Range,
    evaluator: &MagicCommentEvaluator,
) -> CommentOptions {
    let mut result = CommentOptions::EMPTY;
    for comment in comments_in_range(comments, range) {
        if !evaluator.is_magic(comment.value) {
            continue;
        }
        match evaluator.evaluate(comment.value) {
            Ok(entries) => result
                .options
                .get_or_insert_with(FxHashMap::default)
                .extend(entries),
            Err(message) => result.errors.push(CommentError {
                range: comment.range,
                loc: comment.loc,
                comment: comment.value.to_string(),
                message,
            }),
        }
    }
    result
}

struct LiteralParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_white_space(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn unexpected(&self) -> String {
        match self.peek() {
            Some(c) => format!("Unexpected token '{c}'"),
            None => "Unexpected end of input".to_string(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        if self.peek() != Some(expected) {
            return Err(self.unexpected());
        }
        self.bump();
        Ok(())
    }

    fn parse_object_body(&mut self) -> Result<Vec<(String, CommentValue)>, String> {
        let mut entries = Vec::new();
        loop {
            self.skip_white_space();
            if self.peek().is_none() {
                return Ok(entries);
            }
            let key = self.parse_key()?;
            self.skip_white_space();
            self.expect(':')?;
            let value = self.parse_value()?;
            entries.push((key, value));
            self.skip_white_space();
            if self.peek().is_none() {
                return Ok(entries);
            }
            self.expect(',')?;
        }
    }

    fn parse_key(&mut self) -> Result<String, String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_string(quote),
            Some(c) if is_identifier_start(c) => Ok(self.parse_identifier().to_string()),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_part) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn parse_value(&mut self) -> Result<CommentValue, String> {
        self.skip_white_space();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_string(quote).map(CommentValue::String),
            Some('[') => self.parse_array(),
            Some('/') => self.parse_regex(),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.parse_number(),
            Some(c) if is_identifier_start(c) => match self.parse_identifier() {
                "true" => Ok(CommentValue::Bool(true)),
                "false" => Ok(CommentValue::Bool(false)),
                "null" => Ok(CommentValue::Null),
                "undefined" => Ok(CommentValue::Undefined),
                "NaN" => Ok(CommentValue::Number(f64::NAN)),
                "Infinity" => Ok(CommentValue::Number(f64::INFINITY)),
                ident => Err(format!("{ident} is not defined")),
            },
            _ => Err(self.unexpected()),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, String> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err("Invalid or unexpected token".to_string()),
                Some(c) if c == quote => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('u') => {
                        let hex = self.rest().get(..4).unwrap_or_default();
                        let c = u32::from_str_radix(hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| "Invalid Unicode escape sequence".to_string())?;
                        self.pos += 4;
                        value.push(c);
                    }
                    Some(c) => value.push(c),
                    None => return Err("Invalid or unexpected token".to_string()),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn parse_array(&mut self) -> Result<CommentValue, String> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_white_space();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(CommentValue::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_white_space();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(']') => {}
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn parse_regex(&mut self) -> Result<CommentValue, String> {
        self.bump();
        let start = self.pos;
        let mut in_class = false;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err("Invalid regular expression: missing /".to_string())
                }
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        let pattern = &self.input[start..self.pos - 1];
        if pattern.is_empty() {
            return Err(self.unexpected());
        }
        let flags = self.parse_identifier();
        Ok(CommentValue::Regex {
            pattern: pattern.to_string(),
            flags: flags.to_string(),
        })
    }

    fn parse_number(&mut self) -> Result<CommentValue, String> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };
        let digits_start = self.pos;
        if self.rest().starts_with("0x") || self.rest().starts_with("0X") {
            self.pos += 2;
            let hex = self.parse_identifier();
            let value = u64::from_str_radix(hex, 16).map_err(|_| self.unexpected())? as f64;
            return Ok(CommentValue::Number(if negative { -value } else { value }));
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E'))
        {
            let c = self.bump();
            if matches!(c, Some('e' | 'E')) && matches!(self.peek(), Some('-' | '+')) {
                self.bump();
            }
        }
        if self.pos == digits_start {
            return Err(self.unexpected());
        }
        self.input[start..self.pos]
            .parse::<f64>()
            .map(CommentValue::Number)
            .map_err(|_| format!("Invalid number '{}'", &self.input[start..self.pos]))
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(value: &str, start: u32) -> Comment<'_> {
        Comment {
            value,
            range: Range::new(start, start + value.len() as u32 + 4),
            loc: SourceSpan::default(),
        }
    }

    #[test]
    fn marker() {
        let evaluator = MagicCommentEvaluator::new().unwrap();
        assert!(evaluator.is_magic(" webpackIgnore: true "));
        assert!(evaluator.is_magic("a, webpackChunkName: 'x'"));
        assert!(!evaluator.is_magic(" webpackignore: true "));
        assert!(!evaluator.is_magic("xwebpackIgnore: true"));
        assert!(!evaluator.is_magic(" some comment "));
    }

    #[test]
    fn evaluate_literals() {
        let evaluator = MagicCommentEvaluator::new().unwrap();
        let entries = evaluator
            .evaluate(r#" webpackIgnore: true, webpackChunkName: "a\"b", webpackPrefetch: -1.5e2 "#)
            .unwrap();
        assert_eq!(
            entries,
            vec![
                ("webpackIgnore".to_string(), CommentValue::Bool(true)),
                ("webpackChunkName".to_string(), CommentValue::String("a\"b".to_string())),
                ("webpackPrefetch".to_string(), CommentValue::Number(-150.0)),
            ]
        );
    }

    #[test]
    fn evaluate_arrays_and_regexes() {
        let evaluator = MagicCommentEvaluator::new().unwrap();
        let entries = evaluator
            .evaluate(" webpackExports: ['a', null], webpackInclude: /\\.css$/i ")
            .unwrap();
        assert_eq!(
            entries[0].1,
            CommentValue::Array(vec![CommentValue::String("a".to_string()), CommentValue::Null])
        );
        assert_eq!(
            entries[1].1,
            CommentValue::Regex {
                pattern: "\\.css$".to_string(),
                flags: "i".to_string()
            }
        );
    }

    #[test]
    fn evaluate_rejects_computation() {
        let evaluator = MagicCommentEvaluator::new().unwrap();
        assert_eq!(
            evaluator.evaluate(" webpackIgnore: foo "),
            Err("foo is not defined".to_string())
        );
        assert!(evaluator.evaluate(" webpackIgnore: 1 + 1 ").is_err());
        assert!(evaluator.evaluate(" webpackIgnore: (true) ").is_err());
    }

    #[test]
    fn options_in_range() {
        let evaluator = MagicCommentEvaluator::new().unwrap();
        let comments = vec![
            comment(" webpackIgnore: false ", 0),
            comment(" plain ", 40),
            comment(" webpackIgnore: true ", 60),
            comment(" webpackIgnore: nope ", 100),
        ];
        let options = parse_comment_options(&comments, Range::new(0, 90), &evaluator);
        assert_eq!(options.get("webpackIgnore"), Some(&CommentValue::Bool(true)));
        assert!(options.errors().is_empty());

        let options = parse_comment_options(&comments, Range::new(90, 200), &evaluator);
        assert_eq!(options.get("webpackIgnore"), None);
        assert_eq!(options.errors().len(), 1);
        assert_eq!(
            options.errors()[0].to_string(),
            "Compilation error while processing magic comment(-s): /* webpackIgnore: nope */: nope is not defined"
        );

        let options = parse_comment_options(&comments, Range::new(30, 59), &evaluator);
        assert!(options.is_empty());
        assert_eq!(options, CommentOptions::EMPTY);
    }
}
