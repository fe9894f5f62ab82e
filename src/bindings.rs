//! Binding Resolver: finds the local names that refer to the loader.

use std::collections::HashSet;

use swc_core::ecma::{
    ast::*,
    atoms::Atom,
    visit::{Visit, VisitWith},
};

use crate::options::TransformOptions;

#[derive(Debug, Default, Clone)]
pub struct LoaderBindings {
    /// `import lazy from '...'` / `import { lazy as load } from '...'`
    direct: HashSet<Atom>,
    /// `import * as L from '...'`
    namespaces: HashSet<Atom>,
}

impl LoaderBindings {
    pub fn resolve(module: &Module, options: &TransformOptions) -> Self {
        let mut collector = LoaderImportCollector {
            options,
            out: LoaderBindings::default(),
        };
        module.visit_with(&mut collector);
        collector.out
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.namespaces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.direct.len() + self.namespaces.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.direct.iter().any(|a| &**a == name)
    }

    /// Whether `callee` (the callee expression of a call) names the loader,
    /// either directly or as a member of a loader namespace import.
    pub fn is_loader_callee(&self, callee: &Expr, options: &TransformOptions) -> bool {
        match callee {
            Expr::Ident(id) => self.direct.contains(&id.sym),
            Expr::Member(MemberExpr {
                obj,
                prop: MemberProp::Ident(prop),
                ..
            }) => match &**obj {
                Expr::Ident(ns) => {
                    self.namespaces.contains(&ns.sym) && options.is_loader_export(prop.sym.as_ref())
                }
                _ => false,
            },
            Expr::Paren(p) => self.is_loader_callee(&p.expr, options),
            _ => false,
        }
    }
}

struct LoaderImportCollector<'a> {
    options: &'a TransformOptions,
    out: LoaderBindings,
}

impl Visit for LoaderImportCollector<'_> {
    fn visit_import_decl(&mut self, n: &ImportDecl) {
        if n.type_only || !self.options.is_loader_module(n.src.value.as_ref()) {
            return;
        }
        for s in &n.specifiers {
            match s {
                ImportSpecifier::Named(named) => {
                    if named.is_type_only {
                        continue;
                    }
                    let imported = match &named.imported {
                        Some(ModuleExportName::Ident(i)) => i.sym.to_string(),
                        Some(ModuleExportName::Str(s)) => s.value.to_string(),
                        None => named.local.sym.to_string(),
                    };
                    if self.options.is_loader_export(&imported) {
                        self.out.direct.insert(named.local.sym.clone());
                    }
                }
                ImportSpecifier::Default(def) => {
                    if self.options.import_default {
                        self.out.direct.insert(def.local.sym.clone());
                    }
                }
                ImportSpecifier::Namespace(ns) => {
                    self.out.namespaces.insert(ns.local.sym.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Dialect, SourceUnit};

    fn resolve(src: &str) -> LoaderBindings {
        let unit = SourceUnit::parse("t.ts", src, Dialect::Ts).unwrap();
        LoaderBindings::resolve(&unit.module, &TransformOptions::default())
    }

    #[test]
    fn no_loader_import_means_no_bindings() {
        let b = resolve("import React from 'react';\nconst x = lazy('./x');");
        assert!(b.is_empty());
    }

    #[test]
    fn default_and_renamed_named_imports() {
        let b = resolve("import load, { lazy as l2, other } from 'lazy-import';");
        assert!(b.contains("load"));
        assert!(b.contains("l2"));
        assert!(!b.contains("other"));
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn module_name_must_match_exactly() {
        let b = resolve("import lazy from 'lazy-import/extra';");
        assert!(b.is_empty());
    }

    #[test]
    fn type_only_imports_are_ignored() {
        let b = resolve("import type lazy from 'lazy-import';\nimport { type lazy as l } from 'lazy-import';");
        assert!(b.is_empty());
    }

    #[test]
    fn namespace_members_resolve_through_options() {
        let unit = SourceUnit::parse("t.js", "import * as L from 'lazy-import';\nL.lazy('./a'); L.other('./b');", Dialect::Js)
            .unwrap();
        let opts = TransformOptions::default();
        let b = LoaderBindings::resolve(&unit.module, &opts);
        assert_eq!(b.len(), 1);

        let callees: Vec<bool> = unit
            .module
            .body
            .iter()
            .filter_map(|item| match item {
                ModuleItem::Stmt(Stmt::Expr(ExprStmt { expr, .. })) => match &**expr {
                    Expr::Call(CallExpr {
                        callee: Callee::Expr(callee),
                        ..
                    }) => Some(b.is_loader_callee(callee, &opts)),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(callees, vec![true, false]);
    }

    #[test]
    fn custom_allow_lists() {
        let unit = SourceUnit::parse(
            "t.js",
            "import lazy from 'lazy-import';\nimport { loadable } from '@acme/loader';",
            Dialect::Js,
        )
        .unwrap();
        let opts = TransformOptions {
            module_names: vec!["@acme/loader".into()],
            import_default: false,
            import_names: vec!["loadable".into()],
            ..Default::default()
        };
        let b = LoaderBindings::resolve(&unit.module, &opts);
        assert!(b.contains("loadable"));
        assert!(!b.contains("lazy"));
    }
}
