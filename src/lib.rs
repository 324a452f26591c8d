mod comments;
mod dependencies;
mod escape;
mod lexer;
mod local_ident;
mod location;
mod module;
mod order;
mod parser;

pub use comments::comments_in_range;
pub use comments::parse_comment_options;
pub use comments::Comment;
pub use comments::CommentError;
pub use comments::CommentOptions;
pub use comments::CommentValue;
pub use comments::MagicCommentEvaluator;
pub use dependencies::ConstDependency;
pub use dependencies::Dependency;
pub use dependencies::IcssExportKind;
pub use dependencies::LexDependencies;
pub use dependencies::LexOptions;
pub use dependencies::Mode;
pub use dependencies::Range;
pub use dependencies::UrlRangeKind;
pub use dependencies::Warning;
pub use dependencies::WarningKind;
pub use escape::escape_identifier;
pub use escape::normalize_url;
pub use escape::unescape_identifier;
pub use lexer::ImageSetStrings;
pub use lexer::ImportPrelude;
pub use lexer::ImportUrl;
pub use lexer::Lexer;
pub use lexer::Pos;
pub use lexer::Visitor;
pub use local_ident::LocalIdentOptions;
pub use location::LocConverter;
pub use location::SourcePosition;
pub use location::SourceSpan;
pub use module::BuildMeta;
pub use module::CssModule;
pub use module::ExportsType;
pub use module::ModuleSink;
pub use order::modules_in_order;
pub use order::ordered_chunk_css_modules;
pub use order::ChunkGroup;
pub use order::CssSourceType;
pub use order::OrderConflictWarning;
pub use order::OrderedModule;
pub use parser::CssMode;
pub use parser::CssParser;
pub use parser::CssParserOptions;
pub use parser::ParseError;

/// Parses `input` with every other option left at its default.
pub fn collect_dependencies(
    input: &str,
    mode: CssMode,
) -> Result<(Vec<Dependency<'_>>, Vec<Warning<'_>>), ParseError> {
    let parser = CssParser::new(CssParserOptions {
        default_mode: mode,
        ..Default::default()
    })?;
    let mut module = CssModule::new("");
    parser.parse(input, &mut module)?;
    Ok(module.into_parts())
}
