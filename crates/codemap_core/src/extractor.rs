//! Import extraction: source text in, local import specifiers out.
//!
//! Extraction sits behind the [`ImportExtractor`] trait so resolution and
//! graph assembly never depend on how specifiers were found. The default
//! strategy is a fixed, ordered list of regular expressions; [`AstExtractor`]
//! swaps in a real JS/TS parser for the same contract.
//!
//! Both strategies only return *local* specifiers (relative, root-absolute or
//! alias-rooted). Bare package names never resolve to a file inside the scanned
//! tree, so they are dropped at the source. Module paths of non-JS ecosystems
//! are the one exception; they are tagged [`SpecKind::Module`] and resolved by
//! their own rules.
//!
//! [`AstExtractor`]: crate::parser::AstExtractor

use log::trace;
use regex::Regex;
use std::{collections::BTreeSet, str::FromStr, sync::OnceLock};

use crate::{
    parser::AstExtractor,
    types::{Ecosystem, SpecKind, Specifier, is_local_request},
};

pub trait ImportExtractor: Send + Sync {
    /// Returns the set of local specifiers referenced by `content`.
    ///
    /// Never fails: text that does not match simply contributes nothing.
    fn extract(&self, content: &str) -> BTreeSet<Specifier>;
}

/// Decides which specifiers are worth resolving.
#[derive(Debug, Clone)]
pub struct LocalFilter {
    alias_prefix: String,
    aliases: Vec<String>,
}

impl LocalFilter {
    pub fn new(alias_prefix: impl Into<String>) -> Self {
        Self { alias_prefix: alias_prefix.into(), aliases: Vec::new() }
    }

    /// Additional alias keys (from tsconfig `paths`) that count as local.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self.aliases.sort();
        self.aliases.dedup();
        self
    }

    pub fn alias_prefix(&self) -> &str {
        &self.alias_prefix
    }

    pub fn accepts(&self, request: &str) -> bool {
        is_local_request(request, &self.alias_prefix)
            || self.aliases.iter().any(|alias| {
                request == alias || request.starts_with(&format!("{}/", alias))
            })
    }
}

/// Which extraction strategy to use for JS/TS content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractorStrategy {
    #[default]
    Regex,
    Ast,
}

impl FromStr for ExtractorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regex" => Ok(ExtractorStrategy::Regex),
            "ast" => Ok(ExtractorStrategy::Ast),
            other => Err(format!("unknown parser '{}', expected 'regex' or 'ast'", other)),
        }
    }
}

pub fn build_extractor(
    strategy: ExtractorStrategy,
    filter: LocalFilter,
    ecosystem: Option<Ecosystem>,
) -> Box<dyn ImportExtractor> {
    let regex = RegexExtractor::new(filter).with_ecosystem(ecosystem);
    match strategy {
        ExtractorStrategy::Regex => Box::new(regex),
        ExtractorStrategy::Ast => Box::new(AstExtractor::new(regex)),
    }
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex literal")
}

fn regex_require() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#))
}

fn regex_from() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"\bfrom\s+['"]([^'"]+)['"]"#))
}

fn regex_bare_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)(?:^|[^@\w])import\s+['"]([^'"]+)['"]"#))
}

fn regex_dynamic_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#))
}

fn regex_style_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"@import\s+(?:url\(\s*)?['"]([^'"]+)['"]"#))
}

fn regex_style_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"\burl\s*\(\s*['"]([^'"]+)['"]\s*\)"#))
}

fn regex_python_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex(r#"(?m)^\s*(?:from\s+([A-Za-z_]\w*(?:\.\w+)*)\s+import\b|import\s+([A-Za-z_]\w*(?:\.\w+)*))"#)
    })
}

fn regex_java_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)^\s*import\s+(?:static\s+)?([A-Za-z_][\w.]*\*?)\s*;"#))
}

fn regex_php_use() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"(?m)^\s*use\s+\\?([A-Za-z_][\w\\]*)\s*;"#))
}

fn regex_ruby_require_relative() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| regex(r#"\brequire_relative\s*\(?\s*['"]([^'"]+)['"]"#))
}

/// Pattern-matching extractor.
#[derive(Debug, Clone)]
pub struct RegexExtractor {
    filter: LocalFilter,
    ecosystem: Option<Ecosystem>,
}

impl RegexExtractor {
    pub fn new(filter: LocalFilter) -> Self {
        Self { filter, ecosystem: None }
    }

    /// Also match the import syntax of a non-JS ecosystem.
    pub fn with_ecosystem(mut self, ecosystem: Option<Ecosystem>) -> Self {
        self.ecosystem = ecosystem;
        self
    }

    pub fn filter(&self) -> &LocalFilter {
        &self.filter
    }

    fn collect(&self, re: &Regex, kind: SpecKind, content: &str, out: &mut BTreeSet<Specifier>) {
        for caps in re.captures_iter(content) {
            if let Some(m) = caps.get(1)
                && self.filter.accepts(m.as_str())
            {
                out.insert(Specifier::new(m.as_str(), kind));
            }
        }
    }

    fn collect_ecosystem(&self, ecosystem: Ecosystem, content: &str, out: &mut BTreeSet<Specifier>) {
        let re = match ecosystem {
            Ecosystem::Python => regex_python_import(),
            Ecosystem::Java => regex_java_import(),
            Ecosystem::Php => regex_php_use(),
            Ecosystem::Ruby => regex_ruby_require_relative(),
            _ => return,
        };
        for caps in re.captures_iter(content) {
            // python alternates between two capture groups
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                trace!("Found {} module import: '{}'", ecosystem, m.as_str());
                out.insert(Specifier::new(m.as_str(), SpecKind::Module(ecosystem)));
            }
        }
    }
}

impl ImportExtractor for RegexExtractor {
    fn extract(&self, content: &str) -> BTreeSet<Specifier> {
        let mut out = BTreeSet::new();
        self.collect(regex_require(), SpecKind::Static, content, &mut out);
        self.collect(regex_from(), SpecKind::Static, content, &mut out);
        self.collect(regex_bare_import(), SpecKind::Static, content, &mut out);
        self.collect(regex_dynamic_import(), SpecKind::Dynamic, content, &mut out);
        self.collect(regex_style_import(), SpecKind::Style, content, &mut out);
        self.collect(regex_style_url(), SpecKind::Style, content, &mut out);
        if let Some(ecosystem) = self.ecosystem {
            self.collect_ecosystem(ecosystem, content, &mut out);
        }
        out
    }
}
