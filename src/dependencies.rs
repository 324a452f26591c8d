use std::borrow::Cow;
use std::fmt::Display;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::trace;

use crate::comments::parse_comment_options;
use crate::comments::Comment;
use crate::comments::CommentError;
use crate::comments::CommentOptions;
use crate::comments::CommentValue;
use crate::comments::MagicCommentEvaluator;
use crate::escape::normalize_url;
use crate::escape::unescape_identifier;
use crate::lexer::is_white_space;
use crate::lexer::C_APOSTROPHE;
use crate::lexer::C_COLON;
use crate::lexer::C_COMMA;
use crate::lexer::C_EXCLAMATION_MARK;
use crate::lexer::C_HYPHEN_MINUS;
use crate::lexer::C_LEFT_CURLY;
use crate::lexer::C_LEFT_PARENTHESIS;
use crate::lexer::C_QUOTATION_MARK;
use crate::lexer::C_RIGHT_CURLY;
use crate::lexer::C_RIGHT_PARENTHESIS;
use crate::lexer::C_SEMICOLON;
use crate::lexer::C_SOLIDUS;
use crate::location::LocConverter;
use crate::location::SourceSpan;
use crate::module::BuildMeta;
use crate::module::ExportsType;
use crate::module::ModuleSink;
use crate::Lexer;
use crate::Pos;
use crate::Visitor;

#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Range {
    pub start: Pos,
    pub end: Pos,
}

impl Range {
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }
}

/// Resolved mode of a module. Only `Local` and `Global` enable CSS Modules features.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Mode {
    Local,
    Global,
    Pure,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum UrlRangeKind {
    Function,
    String,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum IcssExportKind {
    Value,
    ComposesGlobal,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Dependency<'s> {
    Import {
        request: Cow<'s, str>,
        range: Range,
        layer: Option<&'s str>,
        supports: Option<&'s str>,
        media: Option<&'s str>,
        loc: SourceSpan,
    },
    Url {
        request: Cow<'s, str>,
        range: Range,
        kind: UrlRangeKind,
        loc: SourceSpan,
    },
    /// A declared local name, exported by the module.
    LocalIdentifier {
        name: Cow<'s, str>,
        range: Range,
        prefix: &'static str,
        loc: SourceSpan,
    },
    /// A reference to a local name of the same module.
    SelfLocalIdentifier {
        name: Cow<'s, str>,
        range: Range,
        prefix: &'static str,
        composes_into: Option<Cow<'s, str>>,
        loc: SourceSpan,
    },
    IcssImport {
        request: Cow<'s, str>,
        name: Cow<'s, str>,
        range: Range,
        prefix: &'static str,
        composes_into: Option<Cow<'s, str>>,
        loc: SourceSpan,
    },
    IcssExport {
        name: Cow<'s, str>,
        value: Cow<'s, str>,
        kind: IcssExportKind,
        range: Range,
        loc: SourceSpan,
    },
    IcssSymbol {
        name: Cow<'s, str>,
        value: Cow<'s, str>,
        range: Range,
        loc: SourceSpan,
    },
    StaticExports {
        exports: Vec<Cow<'s, str>>,
        can_mangle: bool,
    },
}

impl Dependency<'_> {
    pub fn range(&self) -> Option<Range> {
        match self {
            Dependency::Import { range, .. }
            | Dependency::Url { range, .. }
            | Dependency::LocalIdentifier { range, .. }
            | Dependency::SelfLocalIdentifier { range, .. }
            | Dependency::IcssImport { range, .. }
            | Dependency::IcssExport { range, .. }
            | Dependency::IcssSymbol { range, .. } => Some(*range),
            Dependency::StaticExports { .. } => None,
        }
    }
}

/// Replaces `range` of the source with `content` when the module is rendered.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ConstDependency<'s> {
    pub content: &'s str,
    pub range: Range,
}

impl<'s> ConstDependency<'s> {
    pub fn new(content: &'s str, range: Range) -> Self {
        Self { content, range }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Warning<'s> {
    range: Range,
    loc: SourceSpan,
    kind: WarningKind<'s>,
}

impl<'s> Warning<'s> {
    pub fn new(range: Range, loc: SourceSpan, kind: WarningKind<'s>) -> Self {
        Self { range, loc, kind }
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    pub fn loc(&self) -> &SourceSpan {
        &self.loc
    }

    pub fn kind(&self) -> &WarningKind<'s> {
        &self.kind
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum WarningKind<'s> {
    Unexpected { message: &'s str },
    NamespaceNotSupportedInBundledCss,
    NotPrecededAtImport,
    ExpectedUrl { when: &'s str },
    ExpectedNotInside { pseudo: &'s str },
    MissingWhitespace { surrounding: &'s str },
    UnexpectedComposition { message: &'s str },
    BrokenValue { when: &'s str },
    WebpackIgnoreNotBoolean { value: String },
    MagicComment { error: CommentError },
}

impl Display for Warning<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            WarningKind::Unexpected { message } => write!(f, "{message}"),
            WarningKind::NamespaceNotSupportedInBundledCss => {
                write!(f, "'@namespace' is not supported in bundled CSS")
            }
            WarningKind::NotPrecededAtImport => {
                write!(f, "Any '@import' rules must precede all other rules")
            }
            WarningKind::ExpectedUrl { when } => write!(f, "Expected URL in '{when}'"),
            WarningKind::ExpectedNotInside { pseudo } => write!(
                f,
                "A '{pseudo}' is not allowed inside of a ':local()' or ':global()'"
            ),
            WarningKind::MissingWhitespace { surrounding } => {
                write!(f, "Missing {surrounding} whitespace")
            }
            WarningKind::UnexpectedComposition { message } => write!(f, "Composition is {message}"),
            WarningKind::BrokenValue { when } => write!(f, "Broken '@value' at-rule: {when}"),
            WarningKind::WebpackIgnoreNotBoolean { value } => write!(
                f,
                "`webpackIgnore` expected a boolean, but received: {value}."
            ),
            WarningKind::MagicComment { error } => write!(f, "{error}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    InBlock,
}

#[derive(Debug, Default)]
struct BalancedStack(SmallVec<[BalancedItemKind; 3]>);

impl BalancedStack {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, kind: BalancedItemKind) {
        self.0.push(kind);
    }

    pub fn pop(&mut self) -> Option<BalancedItemKind> {
        self.0.pop()
    }

    pub fn has_mode_function(&self) -> bool {
        self.0.iter().any(BalancedItemKind::is_mode_function)
    }

    /// Mode of the innermost mode function, letting a bare `:local`/`:global` set at
    /// `bare.1` override everything opened before it.
    pub fn topmost_mode(&self, bare: Option<(Mode, usize)>, default: Mode) -> Mode {
        for (index, kind) in self.0.iter().enumerate().rev() {
            if let Some((mode, depth)) = bare {
                if index < depth {
                    return mode;
                }
            }
            match kind {
                BalancedItemKind::LocalFn => return Mode::Local,
                BalancedItemKind::GlobalFn => return Mode::Global,
                BalancedItemKind::Other => {}
            }
        }
        bare.map_or(default, |(mode, _)| mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BalancedItemKind {
    LocalFn,
    GlobalFn,
    Other,
}

impl BalancedItemKind {
    pub fn new(name: &str) -> Self {
        if name.eq_ignore_ascii_case(":local(") {
            Self::LocalFn
        } else if name.eq_ignore_ascii_case(":global(") {
            Self::GlobalFn
        } else {
            Self::Other
        }
    }

    pub fn is_mode_function(&self) -> bool {
        matches!(self, Self::LocalFn | Self::GlobalFn)
    }
}

fn with_vendor_prefixed_eq(left: &str, right: &str, at_rule: bool) -> bool {
    let left = if at_rule {
        if let Some(left) = left.strip_prefix('@') {
            left
        } else {
            return false;
        }
    } else {
        left
    };
    left.eq_ignore_ascii_case(right)
        || ["-webkit-", "-moz-", "-ms-", "-o-"]
            .iter()
            .any(|prefix| matches!(left.strip_prefix(prefix), Some(left) if left.eq_ignore_ascii_case(right)))
}

#[derive(Debug)]
struct InProperty<T: ReservedValues> {
    reserved: T,
    rename: Option<(Range, bool)>,
    balanced_len: usize,
}

impl<T: ReservedValues> InProperty<T> {
    pub fn new(reserved: T, balanced_len: usize) -> Self {
        Self {
            reserved,
            rename: None,
            balanced_len,
        }
    }

    pub fn set_rename(&mut self, ident: &str, range: Range) {
        if self.reserved.check(ident) {
            self.rename = Some((range, false));
        }
    }

    pub fn set_string_rename(&mut self, range: Range) {
        self.rename = Some((range, true));
    }

    pub fn clear_rename(&mut self) {
        self.rename = None;
    }

    pub fn reset_reserved(&mut self) {
        self.reserved.reset();
    }

    pub fn take_rename(&mut self, balanced_len: usize) -> Option<(Range, bool)> {
        // Don't rename when we in functions
        if balanced_len != self.balanced_len {
            return None;
        }
        std::mem::take(&mut self.rename)
    }
}

trait ReservedValues {
    fn check(&mut self, ident: &str) -> bool;
    fn reset(&mut self);
}

/// Keywords of the `animation` shorthand. Each one is reserved only once per animation,
/// so `animation: ease ease` names its animation `ease`.
#[derive(Debug, Default)]
struct AnimationReserved {
    bits: u32,
}

impl ReservedValues for AnimationReserved {
    fn check(&mut self, ident: &str) -> bool {
        match ident {
            "normal" => self.check_and_update(Self::NORMAL),
            "reverse" => self.check_and_update(Self::REVERSE),
            "alternate" => self.check_and_update(Self::ALTERNATE),
            "alternate-reverse" => self.check_and_update(Self::ALTERNATE_REVERSE),
            "forwards" => self.check_and_update(Self::FORWARDS),
            "backwards" => self.check_and_update(Self::BACKWARDS),
            "both" => self.check_and_update(Self::BOTH),
            "infinite" => self.check_and_update(Self::INFINITE),
            "paused" => self.check_and_update(Self::PAUSED),
            "running" => self.check_and_update(Self::RUNNING),
            "ease" => self.check_and_update(Self::EASE),
            "ease-in" => self.check_and_update(Self::EASE_IN),
            "ease-out" => self.check_and_update(Self::EASE_OUT),
            "ease-in-out" => self.check_and_update(Self::EASE_IN_OUT),
            "linear" => self.check_and_update(Self::LINEAR),
            "step-end" => self.check_and_update(Self::STEP_END),
            "step-start" => self.check_and_update(Self::STEP_START),
            // keywords values
            "none" |
            // global values
            "initial" | "inherit" | "unset" | "revert" | "revert-layer" => false,
            _ => true,
        }
    }

    fn reset(&mut self) {
        self.bits = 0;
    }
}

impl AnimationReserved {
    const NORMAL: u32 = 1 << 0;
    const REVERSE: u32 = 1 << 1;
    const ALTERNATE: u32 = 1 << 2;
    const ALTERNATE_REVERSE: u32 = 1 << 3;
    const FORWARDS: u32 = 1 << 4;
    const BACKWARDS: u32 = 1 << 5;
    const BOTH: u32 = 1 << 6;
    const INFINITE: u32 = 1 << 7;
    const PAUSED: u32 = 1 << 8;
    const RUNNING: u32 = 1 << 9;
    const EASE: u32 = 1 << 10;
    const EASE_IN: u32 = 1 << 11;
    const EASE_OUT: u32 = 1 << 12;
    const EASE_IN_OUT: u32 = 1 << 13;
    const LINEAR: u32 = 1 << 14;
    const STEP_END: u32 = 1 << 15;
    const STEP_START: u32 = 1 << 16;

    fn check_and_update(&mut self, bit: u32) -> bool {
        if self.bits & bit == bit {
            return true;
        }
        self.bits |= bit;
        false
    }
}

/// An ICSS name: a local `@value` definition, or an import of `value` from `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IcssDefinition<'s> {
    path: Option<Cow<'s, str>>,
    value: Cow<'s, str>,
}

fn string_content(value: &str) -> &str {
    let mut chars = value.chars();
    let Some(quote @ (C_QUOTATION_MARK | C_APOSTROPHE)) = chars.next() else {
        return value;
    };
    let inner = chars.as_str();
    inner.strip_suffix(quote).unwrap_or(inner)
}

fn strip_quotes(value: Cow<'_, str>) -> Cow<'_, str> {
    match value {
        Cow::Borrowed(value) => Cow::Borrowed(string_content(value)),
        Cow::Owned(value) => Cow::Owned(string_content(&value).to_string()),
    }
}

/// Argument text of a `layer(...)`/`supports(...)` token. A bare `layer` gives `""`.
fn function_arguments(value: &str) -> &str {
    let Some((_, arguments)) = value.split_once(C_LEFT_PARENTHESIS) else {
        return "";
    };
    arguments
        .strip_suffix(C_RIGHT_PARENTHESIS)
        .unwrap_or(arguments)
        .trim_matches(is_white_space)
}

/// Splits `names from source` at the first whitespace delimited `from`.
fn split_value_from(text: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    while let Some(index) = text[offset..].find("from").map(|i| i + offset) {
        let before = text[..index].chars().next_back();
        let after = text[index + 4..].chars().next();
        if before.is_some_and(is_white_space) && after.is_some_and(is_white_space) {
            return Some((
                text[..index].trim_matches(is_white_space),
                text[index + 4..].trim_matches(is_white_space),
            ));
        }
        offset = index + 4;
    }
    None
}

pub struct LexOptions {
    pub url: bool,
    pub import: bool,
}

/// The dependency parser. Drives a [`Lexer`] and reports dependencies, warnings and
/// comments to a [`ModuleSink`].
pub struct LexDependencies<'s, 'a, S> {
    source: &'s str,
    sink: &'a mut S,
    evaluator: &'a MagicCommentEvaluator,
    loc: LocConverter<'s>,
    mode: Mode,
    options: LexOptions,
    scope: Scope,
    block_nesting_level: u32,
    allow_import_at_rule: bool,
    balanced: BalancedStack,
    bare_mode: Option<(Mode, usize)>,
    is_next_rule_prelude: bool,
    is_declaration_start: bool,
    in_animation_property: Option<InProperty<AnimationReserved>>,
    last_local_identifiers: SmallVec<[Cow<'s, str>; 2]>,
    composes_owners: SmallVec<[Cow<'s, str>; 2]>,
    icss_definitions: FxHashMap<Cow<'s, str>, IcssDefinition<'s>>,
    declared_custom_properties: FxHashSet<Cow<'s, str>>,
    last_token_end_for_comments: Pos,
    dependency_count: usize,
    warning_count: usize,
}

impl<'s, 'a, S: ModuleSink<'s>> LexDependencies<'s, 'a, S> {
    pub fn new(
        source: &'s str,
        sink: &'a mut S,
        evaluator: &'a MagicCommentEvaluator,
        mode: Mode,
        options: LexOptions,
    ) -> Self {
        Self {
            source,
            sink,
            evaluator,
            loc: LocConverter::new(source),
            mode,
            options,
            scope: Scope::TopLevel,
            block_nesting_level: 0,
            allow_import_at_rule: true,
            balanced: Default::default(),
            bare_mode: None,
            is_next_rule_prelude: true,
            is_declaration_start: false,
            in_animation_property: None,
            last_local_identifiers: SmallVec::new(),
            composes_owners: SmallVec::new(),
            icss_definitions: FxHashMap::default(),
            declared_custom_properties: FxHashSet::default(),
            last_token_end_for_comments: 0,
            dependency_count: 0,
            warning_count: 0,
        }
    }

    /// Flushes the trailing state and appends the module level records.
    pub fn finish(mut self, named_exports: bool) {
        if let Some(mut animation) = self.in_animation_property.take() {
            if let Some((range, _)) = animation.take_rename(self.balanced.len()) {
                self.add_animation_name(range);
            }
        }
        self.add_dependency(Dependency::StaticExports {
            exports: Vec::new(),
            can_mangle: true,
        });
        tracing::debug!(
            mode = ?self.mode,
            dependencies = self.dependency_count,
            warnings = self.warning_count,
            "lexed css dependencies"
        );
        self.sink.set_build_meta(BuildMeta {
            exports_type: if named_exports {
                ExportsType::Namespace
            } else {
                ExportsType::Default
            },
            declared_custom_properties: self.declared_custom_properties,
        });
    }

    fn is_modules(&self) -> bool {
        self.mode != Mode::Pure
    }

    fn is_local_mode(&self) -> bool {
        self.is_modules() && self.balanced.topmost_mode(self.bare_mode, self.mode) == Mode::Local
    }

    fn slice(&self, start: Pos, end: Pos) -> Option<&'s str> {
        self.source.get(start as usize..end as usize)
    }

    fn add_dependency(&mut self, dependency: Dependency<'s>) {
        self.dependency_count += 1;
        self.sink.add_dependency(dependency);
    }

    fn add_warning(&mut self, range: Range, kind: WarningKind<'s>) {
        self.warning_count += 1;
        let loc = self.loc.span(range.start, range.end);
        self.sink.add_warning(Warning::new(range, loc, kind));
    }

    fn remove(&mut self, range: Range) {
        self.sink
            .add_presentational_dependency(ConstDependency::new("", range));
    }

    fn add_local_identifier(&mut self, name: Cow<'s, str>, range: Range, prefix: &'static str) {
        let loc = self.loc.span(range.start, range.end);
        self.add_dependency(Dependency::LocalIdentifier {
            name,
            range,
            prefix,
            loc,
        });
    }

    fn add_self_local_identifier(
        &mut self,
        name: Cow<'s, str>,
        range: Range,
        prefix: &'static str,
        composes_into: Option<Cow<'s, str>>,
    ) {
        let loc = self.loc.span(range.start, range.end);
        self.add_dependency(Dependency::SelfLocalIdentifier {
            name,
            range,
            prefix,
            composes_into,
            loc,
        });
    }

    fn add_icss_import(
        &mut self,
        request: Cow<'s, str>,
        name: Cow<'s, str>,
        range: Range,
        prefix: &'static str,
        composes_into: Option<Cow<'s, str>>,
    ) {
        let loc = self.loc.span(range.start, range.end);
        self.add_dependency(Dependency::IcssImport {
            request,
            name,
            range,
            prefix,
            composes_into,
            loc,
        });
    }

    fn add_icss_export(
        &mut self,
        name: Cow<'s, str>,
        value: Cow<'s, str>,
        kind: IcssExportKind,
        range: Range,
    ) {
        let loc = self.loc.span(range.start, range.end);
        self.add_dependency(Dependency::IcssExport {
            name,
            value,
            kind,
            range,
            loc,
        });
    }

    fn add_comment(&mut self, range: Range) -> Option<()> {
        let comment = self.make_comment(range)?;
        self.sink.add_comment(comment);
        Some(())
    }

    fn make_comment(&mut self, range: Range) -> Option<Comment<'s>> {
        let value = self.slice(range.start + 2, range.end)?;
        let value = if range.end - range.start >= 4 {
            value.strip_suffix("*/").unwrap_or(value)
        } else {
            value
        };
        Some(Comment {
            value,
            range,
            loc: self.loc.span(range.start, range.end),
        })
    }

    /// Reports the errors of `options` and tells whether `webpackIgnore: true` is set.
    fn is_ignored(&mut self, options: &CommentOptions, range: Range) -> bool {
        for error in options.errors() {
            self.add_warning(
                error.range,
                WarningKind::MagicComment {
                    error: error.clone(),
                },
            );
        }
        match options.get("webpackIgnore") {
            Some(CommentValue::Bool(ignore)) => *ignore,
            Some(value) => {
                self.add_warning(
                    range,
                    WarningKind::WebpackIgnoreNotBoolean {
                        value: value.to_string(),
                    },
                );
                false
            }
            None => false,
        }
    }

    fn lex_url(&mut self, request: Cow<'s, str>, range: Range, kind: UrlRangeKind) {
        let comments_range = Range::new(self.last_token_end_for_comments, range.end);
        self.last_token_end_for_comments = range.end;
        if request.is_empty() {
            return;
        }
        let options = parse_comment_options(self.sink.comments(), comments_range, self.evaluator);
        self.add_url(request, range, kind, &options);
    }

    fn add_url(
        &mut self,
        request: Cow<'s, str>,
        range: Range,
        kind: UrlRangeKind,
        options: &CommentOptions,
    ) {
        if self.is_ignored(options, range) {
            trace!(request = %request, "url ignored by magic comment");
            return;
        }
        let loc = self.loc.span(range.start, range.end);
        let dependency = Dependency::Url {
            request,
            range,
            kind,
            loc,
        };
        self.sink.add_code_generation_dependency(dependency.clone());
        self.add_dependency(dependency);
    }

    fn lex_image_set(&mut self, lexer: &Lexer<'s>, start: Pos) -> Option<()> {
        let mut lookahead = lexer.clone();
        let image_set = lookahead.eat_image_set_strings();
        let mut comments = Vec::with_capacity(image_set.comments.len());
        for range in &image_set.comments {
            comments.push(self.make_comment(*range)?);
        }
        let mut last_end = start;
        for string in image_set.strings {
            let comments_range = Range::new(last_end, string.end);
            last_end = string.end;
            let request = normalize_url(string_content(self.slice(string.start, string.end)?), true);
            if request.is_empty() {
                continue;
            }
            let options = parse_comment_options(&comments, comments_range, self.evaluator);
            self.add_url(request, string, UrlRangeKind::String, &options);
        }
        Some(())
    }

    fn is_next_nested_syntax(&self, lexer: &Lexer<'s>) -> bool {
        let mut lookahead = lexer.clone();
        lookahead.consume_white_space_and_comments();
        match lookahead.cur() {
            None | Some(C_RIGHT_CURLY) => false,
            Some(_) if !lookahead.starts_ident_sequence() => true,
            // `a:hover {` and `color: red;` both start with an ident, the one that reaches
            // a `{` first is a nested rule
            Some(_) => {
                lookahead.consume_component_values_until(&[
                    C_SEMICOLON,
                    C_LEFT_CURLY,
                    C_RIGHT_CURLY,
                ]);
                lookahead.cur() == Some(C_LEFT_CURLY)
            }
        }
    }

    fn eat(&mut self, lexer: &mut Lexer<'s>, chars: &[char], message: &'s str) -> Option<bool> {
        if !chars.contains(&lexer.cur()?) {
            self.add_warning(
                Range::new(lexer.cur_pos(), lexer.peek_pos()),
                WarningKind::Unexpected { message },
            );
            return Some(false);
        }
        lexer.consume();
        Some(true)
    }

    fn lex_import(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        let prelude = lexer.eat_import_prelude();
        for comment in &prelude.comments {
            self.add_comment(*comment)?;
        }
        let Some(url) = prelude.url else {
            let range = Range::new(start, lexer.cur_pos());
            self.add_warning(
                range,
                WarningKind::ExpectedUrl {
                    when: self.slice(range.start, range.end)?,
                },
            );
            return Some(());
        };
        let Some(semicolon) = prelude.semicolon else {
            self.add_warning(
                Range::new(start, lexer.cur_pos()),
                WarningKind::Unexpected {
                    message: "Expected ';' during parsing of '@import'",
                },
            );
            return Some(());
        };
        let is_string = url.content.start > 0
            && matches!(
                self.slice(url.content.start - 1, url.content.start),
                Some("\"" | "'")
            );
        let request = normalize_url(self.slice(url.content.start, url.content.end)?, is_string);
        lexer.consume_white_line();
        let range = Range::new(start, lexer.cur_pos());
        if request.is_empty() {
            self.remove(range);
            return Some(());
        }
        let options = parse_comment_options(
            self.sink.comments(),
            Range::new(end, url.range.end),
            self.evaluator,
        );
        if self.is_ignored(&options, url.range) {
            trace!(request = %request, "@import ignored by magic comment");
            return Some(());
        }
        let mut last_end = url.range.end;
        let layer = match prelude.layer {
            Some(layer) => {
                last_end = last_end.max(layer.end);
                Some(function_arguments(self.slice(layer.start, layer.end)?))
            }
            None => None,
        };
        let supports = match prelude.supports {
            Some(supports) => {
                last_end = last_end.max(supports.end);
                Some(function_arguments(self.slice(supports.start, supports.end)?))
            }
            None => None,
        };
        let media = self
            .slice(last_end, semicolon.start)?
            .trim_matches(is_white_space);
        let loc = self.loc.span(range.start, range.end);
        self.add_dependency(Dependency::Import {
            request,
            range,
            layer,
            supports,
            media: (!media.is_empty()).then_some(media),
            loc,
        });
        Some(())
    }

    fn lex_local_var(&mut self, lexer: &mut Lexer<'s>) -> Option<()> {
        lexer.consume_white_space_and_comments();
        let start = lexer.cur_pos();
        if lexer.cur() != Some(C_HYPHEN_MINUS) || lexer.peek() != Some(C_HYPHEN_MINUS) {
            self.add_warning(
                Range::new(start, lexer.peek2_pos()),
                WarningKind::Unexpected {
                    message: "Expected starts with '--' during parsing of 'var()'",
                },
            );
            return Some(());
        }
        let name_range = lexer.eat_ident_sequence()?;
        let name = unescape_identifier(self.slice(start + 2, name_range.end)?);
        let mut lookahead = lexer.clone();
        lookahead.consume_white_space_and_comments();
        let is_from = lookahead
            .eat_ident_sequence()
            .and_then(|range| lookahead.slice_range(&range))
            .is_some_and(|ident| ident.eq_ignore_ascii_case("from"));
        if !is_from {
            self.add_self_local_identifier(name, name_range, "--", None);
            return Some(());
        }
        lookahead.consume_white_space_and_comments();
        let from_start = lookahead.cur_pos();
        let request = match lookahead.eat_ident_sequence_or_string() {
            Some((range, true))
                if matches!(self.slice(range.start, range.end), Some(ident) if ident.eq_ignore_ascii_case("global")) =>
            {
                self.remove(Range::new(name_range.end, range.end));
                *lexer = lookahead;
                return Some(());
            }
            Some((range, true)) => self.resolve_import_alias(self.slice(range.start, range.end)?),
            Some((range, false)) => Some(Cow::Borrowed(string_content(
                self.slice(range.start, range.end)?,
            ))),
            None => None,
        };
        let Some(request) = request else {
            self.add_warning(
                Range::new(from_start, lookahead.peek_pos()),
                WarningKind::Unexpected {
                    message: "Expected string or 'global' during parsing of 'var()'",
                },
            );
            return Some(());
        };
        let range = Range::new(name_range.start, lookahead.cur_pos());
        self.add_icss_import(request, name, range, "--", None);
        *lexer = lookahead;
        Some(())
    }

    /// The path an `@value` alias such as `@value colors: "./colors.css"` stands for.
    fn resolve_import_alias(&self, alias: &str) -> Option<Cow<'s, str>> {
        let definition = self.icss_definitions.get(alias)?;
        if definition.path.is_some() {
            return None;
        }
        Some(strip_quotes(definition.value.clone()))
    }

    fn lex_local_keyframes_decl(&mut self, lexer: &mut Lexer<'s>) -> Option<()> {
        let mut lookahead = lexer.clone();
        lookahead.consume_white_space_and_comments();
        let mut is_local = self.is_local_mode();
        let mut mode_prefix = None;
        if lookahead.cur() == Some(C_COLON) {
            let start = lookahead.cur_pos();
            lookahead.consume();
            let pseudo = lookahead
                .eat_ident_sequence()
                .and_then(|range| self.slice(range.start, range.end));
            is_local = match pseudo {
                Some(pseudo) if pseudo.eq_ignore_ascii_case("local") => true,
                Some(pseudo) if pseudo.eq_ignore_ascii_case("global") => false,
                _ => {
                    self.add_warning(
                        Range::new(start, lookahead.cur_pos()),
                        WarningKind::Unexpected {
                            message: "Expected ':local', ':local()', ':global', or ':global()' during parsing of '@keyframes' name",
                        },
                    );
                    return Some(());
                }
            };
            let is_function = lookahead.cur() == Some(C_LEFT_PARENTHESIS);
            if is_function {
                lookahead.consume();
            }
            lookahead.consume_white_space_and_comments();
            mode_prefix = Some((Range::new(start, lookahead.cur_pos()), is_function));
        } else if !is_local {
            return Some(());
        }
        let (range, name_range) = match lookahead.eat_ident_sequence_or_string() {
            Some((range, true)) => (range, range),
            Some((range, false)) => (range, lookahead.string_content_range(range.start, range.end)),
            None => {
                self.add_warning(
                    Range::new(lookahead.cur_pos(), lookahead.peek_pos()),
                    WarningKind::Unexpected {
                        message: "Expected ident during parsing of '@keyframes' name",
                    },
                );
                return Some(());
            }
        };
        let mut closing = None;
        if let Some((_, true)) = mode_prefix {
            lookahead.consume_white_space_and_comments();
            if lookahead.cur() != Some(C_RIGHT_PARENTHESIS) {
                self.add_warning(
                    Range::new(lookahead.cur_pos(), lookahead.peek_pos()),
                    WarningKind::Unexpected {
                        message: "Expected ')' during parsing of '@keyframes :local(' or '@keyframes :global('",
                    },
                );
                return Some(());
            }
            lookahead.consume();
            closing = Some(Range::new(range.end, lookahead.cur_pos()));
        }
        if let Some((prefix, _)) = mode_prefix {
            self.remove(prefix);
        }
        if is_local {
            let name = unescape_identifier(self.slice(name_range.start, name_range.end)?);
            self.add_local_identifier(name, name_range, "");
        }
        if let Some(closing) = closing {
            self.remove(closing);
        }
        *lexer = lookahead;
        Some(())
    }

    fn lex_local_property_decl(&mut self, lexer: &mut Lexer<'s>) -> Option<()> {
        if !self.is_local_mode() {
            return Some(());
        }
        let mut lookahead = lexer.clone();
        lookahead.consume_white_space_and_comments();
        let start = lookahead.cur_pos();
        if lookahead.cur() != Some(C_HYPHEN_MINUS) || lookahead.peek() != Some(C_HYPHEN_MINUS) {
            self.add_warning(
                Range::new(start, lookahead.peek2_pos()),
                WarningKind::Unexpected {
                    message: "Expected starts with '--' during parsing of '@property'",
                },
            );
            return Some(());
        }
        let range = lookahead.eat_ident_sequence()?;
        let name = unescape_identifier(self.slice(start + 2, range.end)?);
        self.declared_custom_properties.insert(name.clone());
        self.add_local_identifier(name, range, "--");
        *lexer = lookahead;
        Some(())
    }

    fn lex_icss_value(&mut self, lexer: &mut Lexer<'s>, start: Pos) -> Option<()> {
        let value_start = lexer.cur_pos();
        lexer.consume_component_values_until(&[C_SEMICOLON, C_LEFT_CURLY, C_RIGHT_CURLY]);
        let value_end = lexer.cur_pos();
        let is_terminated = match lexer.cur() {
            Some(C_SEMICOLON) => {
                lexer.consume();
                true
            }
            Some(_) => false,
            None => true,
        };
        let range = Range::new(start, lexer.cur_pos());
        let text = self
            .slice(value_start, value_end)?
            .trim_matches(is_white_space);
        let is_valid = is_terminated
            && match split_value_from(text) {
                Some((names, source)) => self.lex_icss_value_imports(names, source),
                None => self.lex_icss_value_definition(text, range),
            };
        if !is_valid {
            self.add_warning(
                range,
                WarningKind::BrokenValue {
                    when: self.slice(range.start, range.end)?,
                },
            );
            return Some(());
        }
        self.remove(range);
        Some(())
    }

    fn lex_icss_value_imports(&mut self, names: &'s str, source: &'s str) -> bool {
        let request = if source.starts_with([C_QUOTATION_MARK, C_APOSTROPHE]) {
            Cow::Borrowed(string_content(source))
        } else if let Some(request) = self.resolve_import_alias(source) {
            request
        } else {
            return false;
        };
        let names = names
            .strip_prefix(C_LEFT_PARENTHESIS)
            .and_then(|names| names.strip_suffix(C_RIGHT_PARENTHESIS))
            .unwrap_or(names);
        let mut imports: SmallVec<[(&'s str, &'s str); 2]> = SmallVec::new();
        for item in names.split(C_COMMA) {
            let mut parts = item.split_whitespace();
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(name), None, None, None) => imports.push((name, name)),
                (Some(name), Some("as"), Some(alias), None) => imports.push((name, alias)),
                _ => return false,
            }
        }
        for (name, alias) in imports {
            self.icss_definitions.insert(
                Cow::Borrowed(alias),
                IcssDefinition {
                    path: Some(request.clone()),
                    value: Cow::Borrowed(name),
                },
            );
        }
        true
    }

    fn lex_icss_value_definition(&mut self, text: &'s str, range: Range) -> bool {
        let mut name_lexer = Lexer::new(text);
        let Some(name_range) = name_lexer.eat_ident_sequence() else {
            return false;
        };
        let Some(name) = name_lexer.slice_range(&name_range) else {
            return false;
        };
        let rest = text[name_range.end as usize..].trim_start_matches(is_white_space);
        let value = rest
            .strip_prefix(C_COLON)
            .unwrap_or(rest)
            .trim_matches(is_white_space);
        if value.is_empty() {
            return false;
        }
        let definition = match self.icss_definitions.get(value) {
            Some(definition) => definition.clone(),
            None => IcssDefinition {
                path: None,
                value: Cow::Borrowed(value),
            },
        };
        if definition.path.is_none() {
            self.add_icss_export(
                Cow::Borrowed(name),
                definition.value.clone(),
                IcssExportKind::Value,
                range,
            );
        }
        self.icss_definitions.insert(Cow::Borrowed(name), definition);
        true
    }

    fn consume_icss_export_prop(&self, lexer: &mut Lexer<'s>) -> Option<()> {
        loop {
            let c = lexer.cur()?;
            if c == C_COLON
                || c == C_RIGHT_CURLY
                || c == C_SEMICOLON
                || (c == C_SOLIDUS && lexer.peek() == Some('*'))
            {
                break;
            }
            lexer.consume();
        }
        Some(())
    }

    fn consume_icss_export_value(&self, lexer: &mut Lexer<'s>) -> Option<()> {
        loop {
            let c = lexer.cur()?;
            if c == C_RIGHT_CURLY || c == C_SEMICOLON {
                break;
            }
            lexer.consume();
        }
        Some(())
    }

    /// Reads `name: value;` pairs up to the closing `}` of an ICSS block.
    fn lex_icss_pairs(
        &mut self,
        lexer: &mut Lexer<'s>,
        when: &'static str,
    ) -> Option<SmallVec<[(&'s str, &'s str, Range); 4]>> {
        let (left_curly_message, colon_message) = match when {
            ":import" => (
                "Expected '{' during parsing of ':import()'",
                "Expected ':' during parsing of ':import'",
            ),
            _ => (
                "Expected '{' during parsing of ':export'",
                "Expected ':' during parsing of ':export'",
            ),
        };
        let mut pairs = SmallVec::new();
        lexer.consume_white_space_and_comments();
        if !self.eat(lexer, &[C_LEFT_CURLY], left_curly_message)? {
            return None;
        }
        lexer.consume_white_space_and_comments();
        while lexer.cur()? != C_RIGHT_CURLY {
            lexer.consume_white_space_and_comments();
            let prop_start = lexer.cur_pos();
            self.consume_icss_export_prop(lexer)?;
            let prop_end = lexer.cur_pos();
            lexer.consume_white_space_and_comments();
            if !self.eat(lexer, &[C_COLON], colon_message)? {
                return None;
            }
            lexer.consume_white_space_and_comments();
            let value_start = lexer.cur_pos();
            self.consume_icss_export_value(lexer)?;
            let value_end = lexer.cur_pos();
            if lexer.cur()? == C_SEMICOLON {
                lexer.consume();
                lexer.consume_white_space_and_comments();
            }
            pairs.push((
                self.slice(prop_start, prop_end)?
                    .trim_end_matches(is_white_space),
                self.slice(value_start, value_end)?
                    .trim_end_matches(is_white_space),
                Range::new(prop_start, value_end),
            ));
        }
        lexer.consume();
        Some(pairs)
    }

    fn lex_icss_import(&mut self, lexer: &mut Lexer<'s>, start: Pos) -> Option<()> {
        lexer.consume_white_space_and_comments();
        let request = match lexer.eat_string() {
            Some(string) => string_content(self.slice(string.start, string.end)?),
            None => {
                let path_start = lexer.cur_pos();
                lexer.consume_until(&[C_RIGHT_PARENTHESIS, C_LEFT_CURLY, C_SEMICOLON]);
                self.slice(path_start, lexer.cur_pos())?
                    .trim_matches(is_white_space)
            }
        };
        lexer.consume_white_space_and_comments();
        if !self.eat(
            lexer,
            &[C_RIGHT_PARENTHESIS],
            "Expected ')' during parsing of ':import'",
        )? {
            return Some(());
        }
        let Some(pairs) = self.lex_icss_pairs(lexer, ":import") else {
            return Some(());
        };
        for (local, imported, _) in pairs {
            self.icss_definitions.insert(
                Cow::Borrowed(local),
                IcssDefinition {
                    path: Some(Cow::Borrowed(request)),
                    value: Cow::Borrowed(imported),
                },
            );
        }
        self.remove(Range::new(start, lexer.cur_pos()));
        Some(())
    }

    fn lex_icss_export(&mut self, lexer: &mut Lexer<'s>, start: Pos) -> Option<()> {
        let Some(pairs) = self.lex_icss_pairs(lexer, ":export") else {
            return Some(());
        };
        for (name, value, range) in pairs {
            let value = match self.icss_definitions.get(value) {
                Some(definition) => definition.value.clone(),
                None => Cow::Borrowed(value),
            };
            self.add_icss_export(Cow::Borrowed(name), value, IcssExportKind::Value, range);
        }
        self.remove(Range::new(start, lexer.cur_pos()));
        Some(())
    }

    fn lex_composes(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if self.block_nesting_level != 1 {
            self.add_warning(
                Range::new(start, end),
                WarningKind::UnexpectedComposition {
                    message: "not allowed in nested rule",
                },
            );
            return Some(());
        }
        if self.composes_owners.len() != 1 {
            self.add_warning(
                Range::new(start, end),
                WarningKind::UnexpectedComposition {
                    message: "only allowed when selector is single :local class name",
                },
            );
            return Some(());
        }
        let owner = self.composes_owners[0].clone();
        lexer.consume_white_space_and_comments();
        if !self.eat(lexer, &[C_COLON], "Expected ':' during parsing of 'composes'")? {
            return Some(());
        }
        loop {
            let mut names: SmallVec<[(Cow<'s, str>, Range); 2]> = SmallVec::new();
            loop {
                lexer.consume_white_space_and_comments();
                let c = lexer.cur()?;
                if c == C_COMMA || c == C_SEMICOLON || c == C_RIGHT_CURLY {
                    break;
                }
                let name_start = lexer.cur_pos();
                let Some(range) = lexer.eat_ident_sequence() else {
                    self.add_warning(
                        Range::new(name_start, lexer.peek_pos()),
                        WarningKind::Unexpected {
                            message: "Expected ident during parsing of 'composes'",
                        },
                    );
                    return Some(());
                };
                let ident = self.slice(range.start, range.end)?;
                if ident.eq_ignore_ascii_case("global") && lexer.cur() == Some(C_LEFT_PARENTHESIS) {
                    lexer.consume();
                    lexer.consume_white_space_and_comments();
                    let global_start = lexer.cur_pos();
                    let Some(global) = lexer.eat_ident_sequence() else {
                        self.add_warning(
                            Range::new(global_start, lexer.peek_pos()),
                            WarningKind::Unexpected {
                                message: "Expected ident during parsing of 'composes'",
                            },
                        );
                        return Some(());
                    };
                    lexer.consume_white_space_and_comments();
                    if !self.eat(
                        lexer,
                        &[C_RIGHT_PARENTHESIS],
                        "Expected ')' during parsing of 'composes'",
                    )? {
                        return Some(());
                    }
                    let value = unescape_identifier(self.slice(global.start, global.end)?);
                    self.add_icss_export(
                        owner.clone(),
                        value,
                        IcssExportKind::ComposesGlobal,
                        Range::new(name_start, lexer.cur_pos()),
                    );
                    continue;
                }
                if ident.eq_ignore_ascii_case("from") {
                    lexer.consume_white_space_and_comments();
                    let from_start = lexer.cur_pos();
                    match lexer.eat_ident_sequence_or_string() {
                        Some((range, true))
                            if matches!(self.slice(range.start, range.end), Some(ident) if ident.eq_ignore_ascii_case("global")) =>
                        {
                            for (name, range) in names.drain(..) {
                                self.add_icss_export(
                                    owner.clone(),
                                    name,
                                    IcssExportKind::ComposesGlobal,
                                    range,
                                );
                            }
                        }
                        Some((range, is_ident)) => {
                            let source = self.slice(range.start, range.end)?;
                            let request = if is_ident {
                                self.resolve_import_alias(source)
                            } else {
                                Some(Cow::Borrowed(string_content(source)))
                            };
                            let Some(request) = request else {
                                self.add_warning(
                                    range,
                                    WarningKind::Unexpected {
                                        message: "Expected string or ident during parsing of 'composes'",
                                    },
                                );
                                return Some(());
                            };
                            for (name, range) in names.drain(..) {
                                self.add_icss_import(
                                    request.clone(),
                                    name,
                                    range,
                                    "",
                                    Some(owner.clone()),
                                );
                            }
                        }
                        None => {
                            self.add_warning(
                                Range::new(from_start, lexer.peek_pos()),
                                WarningKind::Unexpected {
                                    message: "Expected string or ident during parsing of 'composes'",
                                },
                            );
                            return Some(());
                        }
                    }
                    lexer.consume_white_space_and_comments();
                    break;
                }
                names.push((unescape_identifier(ident), range));
            }
            for (name, range) in names {
                self.add_self_local_identifier(name, range, "", Some(owner.clone()));
            }
            if lexer.cur() != Some(C_COMMA) {
                break;
            }
            lexer.consume();
        }
        if lexer.cur() == Some(C_SEMICOLON) {
            lexer.consume();
            self.is_declaration_start = true;
            self.is_next_rule_prelude = self.is_next_nested_syntax(lexer);
            self.last_token_end_for_comments = lexer.cur_pos();
        }
        self.remove(Range::new(start, lexer.cur_pos()));
        Some(())
    }

    fn lex_declaration_name(
        &mut self,
        lexer: &mut Lexer<'s>,
        ident: &'s str,
        start: Pos,
        end: Pos,
    ) -> Option<()> {
        if !self.is_local_mode() {
            return Some(());
        }
        if let Some(name) = ident.strip_prefix("--") {
            if name.is_empty() {
                return Some(());
            }
            let name = unescape_identifier(name);
            self.declared_custom_properties.insert(name.clone());
            self.add_local_identifier(name, Range::new(start, end), "--");
        } else if with_vendor_prefixed_eq(ident, "animation", false)
            || with_vendor_prefixed_eq(ident, "animation-name", false)
        {
            self.in_animation_property = Some(InProperty::new(
                AnimationReserved::default(),
                self.balanced.len(),
            ));
        } else if ident.eq_ignore_ascii_case("composes")
            || ident.eq_ignore_ascii_case("compose-with")
        {
            return self.lex_composes(lexer, start, end);
        }
        Some(())
    }

    fn add_animation_name(&mut self, range: Range) {
        if let Some(name) = self.slice(range.start, range.end) {
            self.add_self_local_identifier(unescape_identifier(name), range, "", None);
        }
    }

    fn handle_local_animation_dependency(&mut self) {
        let Some(animation) = &mut self.in_animation_property else {
            return;
        };
        let rename = animation.take_rename(self.balanced.len());
        animation.reset_reserved();
        if let Some((range, _)) = rename {
            self.add_animation_name(range);
        }
    }

    fn end_declaration(&mut self) {
        self.handle_local_animation_dependency();
        self.in_animation_property = None;
        self.is_declaration_start = true;
    }

    fn substitute_icss_symbol(&mut self, ident: &'s str, start: Pos, end: Pos) -> bool {
        let Some(definition) = self.icss_definitions.get(ident).cloned() else {
            return false;
        };
        let range = Range::new(start, end);
        match definition.path {
            Some(request) => self.add_icss_import(request, definition.value, range, "", None),
            None => {
                let loc = self.loc.span(start, end);
                self.add_dependency(Dependency::IcssSymbol {
                    name: Cow::Borrowed(ident),
                    value: definition.value,
                    range,
                    loc,
                });
            }
        }
        true
    }
}

impl<'s, S: ModuleSink<'s>> Visitor<'s> for LexDependencies<'s, '_, S> {
    fn is_selector(&mut self, _: &Lexer<'s>) -> bool {
        self.is_next_rule_prelude
    }

    fn comment(&mut self, _: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        self.add_comment(Range::new(start, end))
    }

    fn url(
        &mut self,
        lexer: &mut Lexer<'s>,
        start: Pos,
        end: Pos,
        content_start: Pos,
        content_end: Pos,
    ) -> Option<()> {
        if !self.options.url {
            return Some(());
        }
        let request = normalize_url(lexer.slice(content_start, content_end)?, false);
        self.lex_url(request, Range::new(start, end), UrlRangeKind::Function);
        Some(())
    }

    fn string(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if let Some(animation) = &mut self.in_animation_property {
            if self.balanced.len() == animation.balanced_len {
                animation.set_string_rename(lexer.string_content_range(start, end));
            }
        }
        Some(())
    }

    fn function(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        let name = lexer.slice(start, end - 1)?;
        let depth = self.balanced.len();
        self.balanced.push(BalancedItemKind::Other);
        if name.eq_ignore_ascii_case("url") || name.eq_ignore_ascii_case("src") {
            if !self.options.url {
                return Some(());
            }
            let Some(string) = lexer.eat_string() else {
                return Some(());
            };
            let request = normalize_url(string_content(lexer.slice_range(&string)?), true);
            self.lex_url(request, string, UrlRangeKind::String);
        } else if with_vendor_prefixed_eq(name, "image-set", false) {
            if self.options.url {
                self.lex_image_set(lexer, start)?;
            }
        } else if name.eq_ignore_ascii_case("var") && self.is_modules() {
            if let Some(animation) = &mut self.in_animation_property {
                if animation.balanced_len == depth {
                    animation.clear_rename();
                }
            }
            if self.is_local_mode() {
                self.lex_local_var(lexer)?;
            }
        }
        Some(())
    }

    fn pseudo_function(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        let name = lexer.slice(start, end)?;
        if !self.is_modules() {
            self.balanced.push(BalancedItemKind::Other);
            return Some(());
        }
        let kind = BalancedItemKind::new(name);
        if kind.is_mode_function() {
            if self.balanced.has_mode_function() {
                self.add_warning(
                    Range::new(start, end),
                    WarningKind::ExpectedNotInside {
                        pseudo: lexer.slice(start, end - 1)?,
                    },
                );
            }
            let mut lookahead = lexer.clone();
            lookahead.consume_white_space();
            self.remove(Range::new(start, lookahead.cur_pos()));
            lookahead.consume_white_space_and_comments();
            if lookahead.cur() == Some(C_RIGHT_PARENTHESIS) {
                self.add_warning(
                    Range::new(start, lookahead.peek_pos()),
                    WarningKind::Unexpected {
                        message: "':global()' or ':local()' can't be empty",
                    },
                );
            }
            self.balanced.push(kind);
            return Some(());
        }
        if name.eq_ignore_ascii_case(":import(")
            && self.scope == Scope::TopLevel
            && self.balanced.is_empty()
        {
            return self.lex_icss_import(lexer, start);
        }
        self.balanced.push(kind);
        Some(())
    }

    fn pseudo_class(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if !self.is_modules() {
            return Some(());
        }
        let name = lexer.slice(start, end)?;
        let bare_mode = if name.eq_ignore_ascii_case(":local") {
            Mode::Local
        } else if name.eq_ignore_ascii_case(":global") {
            Mode::Global
        } else {
            if name.eq_ignore_ascii_case(":export")
                && self.scope == Scope::TopLevel
                && self.balanced.is_empty()
            {
                return self.lex_icss_export(lexer, start);
            }
            return Some(());
        };
        self.bare_mode = Some((bare_mode, self.balanced.len()));
        let mut lookahead = lexer.clone();
        lookahead.consume_white_space();
        let remove_end = lookahead.cur_pos();
        if remove_end == end
            && !matches!(
                lexer.cur(),
                None | Some(C_RIGHT_PARENTHESIS | C_LEFT_CURLY | C_COMMA)
            )
        {
            self.add_warning(
                Range::new(start, end),
                WarningKind::MissingWhitespace {
                    surrounding: "trailing",
                },
            );
        }
        self.remove(Range::new(start, remove_end));
        Some(())
    }

    fn at_keyword(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        let name = lexer.slice(start, end)?;
        if name.eq_ignore_ascii_case("@namespace") {
            self.add_warning(
                Range::new(start, end),
                WarningKind::NamespaceNotSupportedInBundledCss,
            );
            trace!("skipping @namespace");
            lexer.consume_component_values_until(&[C_SEMICOLON]);
            return Some(());
        }
        if name.eq_ignore_ascii_case("@import") {
            if !self.allow_import_at_rule || self.scope != Scope::TopLevel {
                self.add_warning(Range::new(start, end), WarningKind::NotPrecededAtImport);
                lexer.consume_component_values_until(&[C_SEMICOLON, C_LEFT_CURLY, C_RIGHT_CURLY]);
                return Some(());
            }
            if !self.options.import {
                lexer.consume_component_values_until(&[C_SEMICOLON, C_LEFT_CURLY, C_RIGHT_CURLY]);
                return Some(());
            }
            return self.lex_import(lexer, start, end);
        }
        if self.is_modules() && name.eq_ignore_ascii_case("@value") {
            return self.lex_icss_value(lexer, start);
        }
        if self.scope == Scope::TopLevel && !name.eq_ignore_ascii_case("@charset") {
            let is_layer_statement = name.eq_ignore_ascii_case("@layer") && {
                let mut lookahead = lexer.clone();
                lookahead.consume_component_values_until(&[C_SEMICOLON, C_LEFT_CURLY]);
                lookahead.cur() == Some(C_SEMICOLON)
            };
            if !is_layer_statement {
                self.allow_import_at_rule = false;
            }
        }
        self.is_next_rule_prelude = name.eq_ignore_ascii_case("@scope");
        if !self.is_modules() {
            return Some(());
        }
        if with_vendor_prefixed_eq(name, "keyframes", true) {
            self.lex_local_keyframes_decl(lexer)?;
        } else if name.eq_ignore_ascii_case("@property") {
            self.lex_local_property_decl(lexer)?;
        }
        Some(())
    }

    fn ident(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        let is_declaration_start = std::mem::replace(&mut self.is_declaration_start, false);
        if !self.is_modules() {
            return Some(());
        }
        let ident = lexer.slice(start, end)?;
        if is_declaration_start && self.scope == Scope::InBlock && !self.is_next_rule_prelude {
            let mut lookahead = lexer.clone();
            lookahead.consume_white_space_and_comments();
            if lookahead.cur() == Some(C_COLON) {
                return self.lex_declaration_name(lexer, ident, start, end);
            }
        }
        if self.substitute_icss_symbol(ident, start, end) {
            return Some(());
        }
        if let Some(animation) = &mut self.in_animation_property {
            let is_important = self.source[..start as usize]
                .trim_end_matches(is_white_space)
                .ends_with(C_EXCLAMATION_MARK);
            if self.balanced.len() == animation.balanced_len && !is_important {
                animation.set_rename(ident, Range::new(start, end));
            }
        }
        Some(())
    }

    fn class(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if !self.is_local_mode() {
            return Some(());
        }
        let name = unescape_identifier(lexer.slice(start + 1, end)?);
        self.last_local_identifiers.push(name.clone());
        self.add_local_identifier(name, Range::new(start + 1, end), "");
        Some(())
    }

    fn id(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        if !self.is_local_mode() {
            return Some(());
        }
        let name = unescape_identifier(lexer.slice(start + 1, end)?);
        self.add_local_identifier(name, Range::new(start + 1, end), "");
        Some(())
    }

    fn left_parenthesis(&mut self, _: &mut Lexer<'s>, _: Pos, _: Pos) -> Option<()> {
        self.balanced.push(BalancedItemKind::Other);
        Some(())
    }

    fn right_parenthesis(&mut self, lexer: &mut Lexer<'s>, start: Pos, end: Pos) -> Option<()> {
        let Some(kind) = self.balanced.pop() else {
            return Some(());
        };
        if kind.is_mode_function() {
            self.remove(Range::new(start, end));
            if self.scope == Scope::InBlock {
                self.is_next_rule_prelude = self.is_next_nested_syntax(lexer);
            }
        }
        if matches!(self.bare_mode, Some((_, depth)) if self.balanced.len() < depth) {
            self.bare_mode = None;
        }
        Some(())
    }

    fn left_curly_bracket(&mut self, lexer: &mut Lexer<'s>, _: Pos, end: Pos) -> Option<()> {
        match self.scope {
            Scope::TopLevel => {
                self.allow_import_at_rule = false;
                self.scope = Scope::InBlock;
                self.block_nesting_level = 1;
            }
            Scope::InBlock => self.block_nesting_level += 1,
        }
        self.composes_owners = std::mem::take(&mut self.last_local_identifiers);
        self.bare_mode = None;
        self.in_animation_property = None;
        self.is_declaration_start = true;
        self.last_token_end_for_comments = end;
        self.is_next_rule_prelude = self.is_next_nested_syntax(lexer);
        Some(())
    }

    fn right_curly_bracket(&mut self, lexer: &mut Lexer<'s>, _: Pos, end: Pos) -> Option<()> {
        if self.scope == Scope::TopLevel {
            return Some(());
        }
        self.end_declaration();
        self.block_nesting_level -= 1;
        if self.block_nesting_level == 0 {
            self.scope = Scope::TopLevel;
            self.is_next_rule_prelude = true;
            self.composes_owners.clear();
        } else {
            self.is_next_rule_prelude = self.is_next_nested_syntax(lexer);
        }
        self.bare_mode = None;
        self.last_local_identifiers.clear();
        self.last_token_end_for_comments = end;
        Some(())
    }

    fn semicolon(&mut self, lexer: &mut Lexer<'s>, _: Pos, end: Pos) -> Option<()> {
        match self.scope {
            Scope::InBlock => {
                self.end_declaration();
                self.is_next_rule_prelude = self.is_next_nested_syntax(lexer);
            }
            Scope::TopLevel => self.is_next_rule_prelude = true,
        }
        self.bare_mode = None;
        self.last_local_identifiers.clear();
        self.last_token_end_for_comments = end;
        Some(())
    }

    fn comma(&mut self, _: &mut Lexer<'s>, _: Pos, end: Pos) -> Option<()> {
        self.handle_local_animation_dependency();
        if matches!(self.bare_mode, Some((_, depth)) if self.balanced.len() <= depth) {
            self.bare_mode = None;
        }
        self.last_token_end_for_comments = end;
        Some(())
    }
}
