use crate::comments::MagicCommentEvaluator;
use crate::dependencies::LexOptions;
use crate::module::ModuleSink;
use crate::LexDependencies;
use crate::Lexer;
use crate::Mode;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("css source is not valid UTF-8 text")]
    NotText(#[from] std::str::Utf8Error),
    #[error("invalid magic comment marker")]
    Marker(#[from] regex::Error),
}

/// How a module's selectors are scoped.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CssMode {
    /// `local` for `*.module.css`/`*.modules.css`, `pure` for everything else.
    Auto,
    #[default]
    Pure,
    Global,
    Local,
}

impl CssMode {
    pub fn resolve(self, resource: &str) -> Mode {
        match self {
            CssMode::Auto if is_module_stylesheet(resource) => Mode::Local,
            CssMode::Auto | CssMode::Pure => Mode::Pure,
            CssMode::Global => Mode::Global,
            CssMode::Local => Mode::Local,
        }
    }
}

fn is_module_stylesheet(resource: &str) -> bool {
    let path = resource
        .split(['?', '#'])
        .next()
        .unwrap_or(resource);
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let mut parts = file_name.rsplitn(3, '.');
    let (Some(ext), Some(marker), Some(stem)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !ext.is_empty()
        && !stem.is_empty()
        && (marker.eq_ignore_ascii_case("module") || marker.eq_ignore_ascii_case("modules"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssParserOptions {
    pub default_mode: CssMode,
    pub named_exports: bool,
    /// Handle `@import` rules.
    pub import: bool,
    /// Handle `url()`, `src()` and `image-set()`.
    pub url: bool,
}

impl Default for CssParserOptions {
    fn default() -> Self {
        Self {
            default_mode: CssMode::Pure,
            named_exports: true,
            import: true,
            url: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CssParser {
    options: CssParserOptions,
    evaluator: MagicCommentEvaluator,
}

impl CssParser {
    pub fn new(options: CssParserOptions) -> Result<Self, ParseError> {
        Ok(Self::with_evaluator(options, MagicCommentEvaluator::new()?))
    }

    pub fn with_evaluator(options: CssParserOptions, evaluator: MagicCommentEvaluator) -> Self {
        Self { options, evaluator }
    }

    pub fn options(&self) -> &CssParserOptions {
        &self.options
    }

    pub fn evaluator(&self) -> &MagicCommentEvaluator {
        &self.evaluator
    }

    pub fn parse<'s, S: ModuleSink<'s>>(
        &self,
        source: &'s str,
        module: &mut S,
    ) -> Result<(), ParseError> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let mode = self.options.default_mode.resolve(module.resource());
        tracing::debug!(resource = module.resource(), ?mode, "parsing css module");
        let mut lexer = Lexer::new(source);
        let mut visitor = LexDependencies::new(
            source,
            module,
            &self.evaluator,
            mode,
            LexOptions {
                url: self.options.url,
                import: self.options.import,
            },
        );
        lexer.lex(&mut visitor);
        visitor.finish(self.options.named_exports);
        Ok(())
    }

    pub fn parse_bytes<'s, S: ModuleSink<'s>>(
        &self,
        source: &'s [u8],
        module: &mut S,
    ) -> Result<(), ParseError> {
        self.parse(std::str::from_utf8(source)?, module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_follows_file_name() {
        assert_eq!(CssMode::Auto.resolve("src/a.module.css"), Mode::Local);
        assert_eq!(CssMode::Auto.resolve("src/a.MODULES.scss"), Mode::Local);
        assert_eq!(CssMode::Auto.resolve("src/a.module.css?inline#x"), Mode::Local);
        assert_eq!(CssMode::Auto.resolve("src/a.css"), Mode::Pure);
        assert_eq!(CssMode::Auto.resolve("src/module.css"), Mode::Pure);
        assert_eq!(CssMode::Auto.resolve("src/.module.css"), Mode::Pure);
        assert_eq!(CssMode::Global.resolve("src/a.module.css"), Mode::Global);
        assert_eq!(CssMode::Pure.resolve("src/a.module.css"), Mode::Pure);
    }

    #[test]
    fn non_text_input_is_an_error() {
        let parser = CssParser::new(CssParserOptions::default()).unwrap();
        let mut module = crate::CssModule::new("a.css");
        let result = parser.parse_bytes(&[b'.', 0xff, 0xfe], &mut module);
        assert!(matches!(result, Err(ParseError::NotText(_))));
        assert!(module.dependencies().is_empty());
    }
}
