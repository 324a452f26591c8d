use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::escape::escape_identifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentOptions {
    /// Template with `[uniqueName]`, `[id]`, `[local]`, `[hash]` and `[name]`.
    pub local_ident_name: String,
    pub unique_name: String,
    /// Hex digits of `[hash]`, at most 16.
    pub hash_digest_length: usize,
}

impl Default for LocalIdentOptions {
    fn default() -> Self {
        Self {
            local_ident_name: "[uniqueName]-[id]-[local]".to_string(),
            unique_name: String::new(),
            hash_digest_length: 16,
        }
    }
}

impl LocalIdentOptions {
    pub fn new(local_ident_name: impl Into<String>) -> Self {
        Self {
            local_ident_name: local_ident_name.into(),
            ..Default::default()
        }
    }

    /// The exported name for `local` of the module `id` loaded from `resource`.
    pub fn local_ident(&self, resource: &str, id: &str, local: &str) -> String {
        let mut output = String::with_capacity(self.local_ident_name.len() + local.len());
        let mut rest = self.local_ident_name.as_str();
        while let Some(open) = rest.find('[') {
            output.push_str(&rest[..open]);
            rest = &rest[open..];
            let Some(close) = rest.find(']') else {
                break;
            };
            match &rest[1..close] {
                "uniqueName" => output.push_str(&self.unique_name),
                "id" => output.push_str(id),
                "local" => output.push_str(local),
                "name" => output.push_str(file_stem(resource)),
                "hash" => output.push_str(&self.hash(resource, local)),
                _ => output.push_str(&rest[..=close]),
            }
            rest = &rest[close + 1..];
        }
        output.push_str(rest);
        output
    }

    /// [`Self::local_ident`] escaped for use in a selector.
    pub fn css_local_ident(&self, resource: &str, id: &str, local: &str) -> String {
        escape_identifier(&self.local_ident(resource, id, local)).into_owned()
    }

    fn hash(&self, resource: &str, local: &str) -> String {
        let mut hasher = FxHasher::default();
        hasher.write(self.unique_name.as_bytes());
        hasher.write_u8(0);
        hasher.write(resource.as_bytes());
        hasher.write_u8(0);
        hasher.write(local.as_bytes());
        let mut digest = format!("{:016x}", hasher.finish());
        digest.truncate(self.hash_digest_length.min(16));
        digest
    }
}

fn file_stem(resource: &str) -> &str {
    let path = resource.split(['?', '#']).next().unwrap_or(resource);
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match file_name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template() {
        let options = LocalIdentOptions {
            unique_name: "app".to_string(),
            ..Default::default()
        };
        assert_eq!(options.local_ident("./a.module.css", "42", "foo"), "app-42-foo");
    }

    #[test]
    fn name_and_hash() {
        let options = LocalIdentOptions {
            local_ident_name: "[name]__[local]--[hash]".to_string(),
            hash_digest_length: 6,
            ..Default::default()
        };
        let ident = options.local_ident("src/button.module.css?x", "1", "primary");
        assert!(ident.starts_with("button__primary--"));
        assert_eq!(ident.len(), "button__primary--".len() + 6);
        assert_eq!(ident, options.local_ident("src/button.module.css?x", "1", "primary"));
        assert_ne!(ident, options.local_ident("src/button.module.css?x", "1", "secondary"));
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let options = LocalIdentOptions::new("[local]_[ext]_[");
        assert_eq!(options.local_ident("a.css", "0", "x"), "x_[ext]_[");
    }

    #[test]
    fn css_ident_is_escaped() {
        let options = LocalIdentOptions::new("[id]-[local]");
        assert_eq!(options.css_local_ident("a.css", "./a.css", "x"), "\\.\\/a\\.css-x");
        assert_eq!(options.css_local_ident("a.css", "1", "x"), "\\31-x");
    }
}
