use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use std::collections::BTreeSet;

use crate::{
    extractor::{ImportExtractor, RegexExtractor},
    types::{SpecKind, Specifier},
};

/// Parser-backed extractor for JS/TS sources.
///
/// Content the parser gives up on (and non-JS text such as stylesheets) is
/// handed to the wrapped regex extractor, so swapping strategies never loses
/// files.
pub struct AstExtractor {
    fallback: RegexExtractor,
}

impl AstExtractor {
    pub fn new(fallback: RegexExtractor) -> Self {
        Self { fallback }
    }

    fn push(&self, request: &str, kind: SpecKind, specs: &mut BTreeSet<Specifier>) {
        if self.fallback.filter().accepts(request) {
            specs.insert(Specifier::new(request, kind));
        }
    }
}

impl ImportExtractor for AstExtractor {
    fn extract(&self, content: &str) -> BTreeSet<Specifier> {
        let allocator = Allocator::default();
        let ParserReturn { program, errors, panicked, .. } =
            OxcParser::new(&allocator, content, source_type()).parse();

        if panicked || !errors.is_empty() || program.body.is_empty() {
            trace!("Parser produced no program, falling back to pattern matching");
            return self.fallback.extract(content);
        }

        let mut specs = BTreeSet::new();

        for stmt in &program.body {
            match stmt {
                Statement::ImportDeclaration(decl) => {
                    // import type { Foo } from './types' has no runtime edge
                    if decl.import_kind.is_type() {
                        continue;
                    }

                    let has_runtime_import = if let Some(specifiers) = &decl.specifiers {
                        specifiers.is_empty()
                            || specifiers.iter().any(|spec| match spec {
                                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                                    !s.import_kind.is_type()
                                }
                                ImportDeclarationSpecifier::ImportDefaultSpecifier(_) => true,
                                ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => true,
                            })
                    } else {
                        true
                    };

                    if has_runtime_import {
                        self.push(decl.source.value.as_str(), SpecKind::Static, &mut specs);
                    }
                }
                Statement::ExportAllDeclaration(decl) => {
                    self.push(decl.source.value.as_str(), SpecKind::Static, &mut specs);
                }
                Statement::ExportNamedDeclaration(decl) => {
                    if let Some(source) = &decl.source {
                        self.push(source.value.as_str(), SpecKind::Static, &mut specs);
                    }
                }
                Statement::ExpressionStatement(es) => {
                    self.collect_calls(&es.expression, &mut specs);
                }
                Statement::VariableDeclaration(vd) => {
                    for decl in &vd.declarations {
                        if let Some(init) = &decl.init {
                            self.collect_calls(init, &mut specs);
                        }
                    }
                }
                _ => {}
            }
        }

        debug!("Parser found {} local specifiers", specs.len());
        specs
    }
}

impl AstExtractor {
    fn collect_calls(&self, expr: &Expression, specs: &mut BTreeSet<Specifier>) {
        match expr {
            Expression::CallExpression(ce) => {
                if let Expression::Identifier(callee) = &ce.callee
                    && callee.name.as_str() == "require"
                    && !ce.arguments.is_empty()
                    && let Some(Expression::StringLiteral(sl)) = ce.arguments[0].as_expression()
                {
                    self.push(sl.value.as_str(), SpecKind::Static, specs);
                }
                for arg in &ce.arguments {
                    if let Some(arg_expr) = arg.as_expression() {
                        self.collect_calls(arg_expr, specs);
                    }
                }
                self.collect_calls(&ce.callee, specs);
            }
            Expression::ImportExpression(ie) => {
                if let Expression::StringLiteral(sl) = &ie.source {
                    self.push(sl.value.as_str(), SpecKind::Dynamic, specs);
                }
            }
            Expression::AwaitExpression(ae) => self.collect_calls(&ae.argument, specs),
            Expression::ArrayExpression(ae) => {
                for elem in &ae.elements {
                    if let Some(expr) = elem.as_expression() {
                        self.collect_calls(expr, specs);
                    }
                }
            }
            Expression::ObjectExpression(oe) => {
                for prop in &oe.properties {
                    if let Some(p) = prop.as_property() {
                        self.collect_calls(&p.value, specs);
                    }
                }
            }
            Expression::ConditionalExpression(ce) => {
                self.collect_calls(&ce.test, specs);
                self.collect_calls(&ce.consequent, specs);
                self.collect_calls(&ce.alternate, specs);
            }
            Expression::AssignmentExpression(ae) => self.collect_calls(&ae.right, specs),
            Expression::ParenthesizedExpression(pe) => self.collect_calls(&pe.expression, specs),
            _ => {}
        }
    }
}

fn source_type() -> SourceType {
    // TSX is a superset of what any .js/.jsx/.ts file may contain
    SourceType::default().with_typescript(true).with_jsx(true).with_module(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::LocalFilter;

    fn extractor() -> AstExtractor {
        AstExtractor::new(RegexExtractor::new(LocalFilter::new("@/")))
    }

    fn requests(specs: &BTreeSet<Specifier>) -> Vec<&str> {
        specs.iter().map(|s| s.request.as_str()).collect()
    }

    #[test]
    fn test_static_imports() {
        let specs = extractor()
            .extract("import foo from './foo';\nimport { bar } from '@/bar';\nimport React from 'react';");
        assert_eq!(requests(&specs), vec!["./foo", "@/bar"]);
    }

    #[test]
    fn test_type_only_import_skipped() {
        let specs = extractor().extract("import type { Foo } from './types';\nexport const x = 1;");
        assert!(specs.is_empty());
    }

    #[test]
    fn test_mixed_type_and_runtime_import() {
        let specs = extractor().extract("import { type Foo, bar } from './utils';");
        assert_eq!(requests(&specs), vec!["./utils"]);
    }

    #[test]
    fn test_reexports() {
        let specs = extractor().extract("export * from './a';\nexport { b } from './b';");
        assert_eq!(requests(&specs), vec!["./a", "./b"]);
    }

    #[test]
    fn test_require_and_dynamic_import() {
        let specs = extractor().extract(
            "const cfg = load(require('./config'));\nconst mods = [require('./a'), import('./lazy')];",
        );
        assert!(specs.contains(&Specifier::new("./config", SpecKind::Static)));
        assert!(specs.contains(&Specifier::new("./a", SpecKind::Static)));
        assert!(specs.contains(&Specifier::new("./lazy", SpecKind::Dynamic)));
    }

    #[test]
    fn test_stylesheet_falls_back_to_patterns() {
        let specs = extractor().extract("@import './base.css';");
        assert_eq!(requests(&specs), vec!["./base.css"]);
    }
}
