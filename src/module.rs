use std::borrow::Cow;

use rustc_hash::FxHashSet;

use crate::comments::parse_comment_options;
use crate::comments::Comment;
use crate::comments::CommentOptions;
use crate::comments::MagicCommentEvaluator;
use crate::ConstDependency;
use crate::Dependency;
use crate::Range;
use crate::Warning;

#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ExportsType {
    /// The module exposes named exports.
    Namespace,
    #[default]
    Default,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildMeta<'s> {
    pub exports_type: ExportsType,
    pub declared_custom_properties: FxHashSet<Cow<'s, str>>,
}

/// Receives everything the parser finds in one module.
pub trait ModuleSink<'s> {
    fn resource(&self) -> &str;

    fn add_dependency(&mut self, dependency: Dependency<'s>);

    fn add_presentational_dependency(&mut self, dependency: ConstDependency<'s>);

    fn add_code_generation_dependency(&mut self, dependency: Dependency<'s>);

    fn add_warning(&mut self, warning: Warning<'s>);

    /// Comments are added in source order.
    fn add_comment(&mut self, comment: Comment<'s>);

    fn comments(&self) -> &[Comment<'s>];

    fn set_build_meta(&mut self, build_meta: BuildMeta<'s>);
}

/// A parsed CSS module that keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct CssModule<'s> {
    resource: String,
    dependencies: Vec<Dependency<'s>>,
    presentational_dependencies: Vec<ConstDependency<'s>>,
    code_generation_dependencies: Vec<Dependency<'s>>,
    warnings: Vec<Warning<'s>>,
    comments: Vec<Comment<'s>>,
    build_meta: BuildMeta<'s>,
}

impl<'s> CssModule<'s> {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    pub fn dependencies(&self) -> &[Dependency<'s>] {
        &self.dependencies
    }

    pub fn presentational_dependencies(&self) -> &[ConstDependency<'s>] {
        &self.presentational_dependencies
    }

    pub fn code_generation_dependencies(&self) -> &[Dependency<'s>] {
        &self.code_generation_dependencies
    }

    pub fn warnings(&self) -> &[Warning<'s>] {
        &self.warnings
    }

    pub fn build_meta(&self) -> &BuildMeta<'s> {
        &self.build_meta
    }

    pub fn into_parts(self) -> (Vec<Dependency<'s>>, Vec<Warning<'s>>) {
        (self.dependencies, self.warnings)
    }

    /// Magic comment options of the comments that lie inside `range`.
    pub fn parse_comment_options(
        &self,
        range: Range,
        evaluator: &MagicCommentEvaluator,
    ) -> CommentOptions {
        parse_comment_options(&self.comments, range, evaluator)
    }
}

impl<'s> ModuleSink<'s> for CssModule<'s> {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn add_dependency(&mut self, dependency: Dependency<'s>) {
        self.dependencies.push(dependency);
    }

    fn add_presentational_dependency(&mut self, dependency: ConstDependency<'s>) {
        self.presentational_dependencies.push(dependency);
    }

    fn add_code_generation_dependency(&mut self, dependency: Dependency<'s>) {
        self.code_generation_dependencies.push(dependency);
    }

    fn add_warning(&mut self, warning: Warning<'s>) {
        self.warnings.push(warning);
    }

    fn add_comment(&mut self, comment: Comment<'s>) {
        self.comments.push(comment);
    }

    fn comments(&self) -> &[Comment<'s>] {
        &self.comments
    }

    fn set_build_meta(&mut self, build_meta: BuildMeta<'s>) {
        self.build_meta = build_meta;
    }
}
