//! Helper Injector: defines the options-preserving wrapper once per unit.

use swc_core::{
    common::Spanned,
    ecma::{
        ast::*,
        visit::{Visit, VisitWith},
    },
};

use crate::source::{Edit, SourceUnit};

const NAME_TOKEN: &str = "__HELPER__";

// Mirrors the runtime loader: cache (default on), retries + retryDelay
// with onError(error, attempt), and preload/clearCache/isCached on the
// returned function.
const HELPER_TEMPLATE: &str = r#"function __HELPER__(importFn, options) {
  var opts = options || {};
  var useCache = opts.cache !== false;
  var retries = opts.retries || 0;
  var retryDelay = opts.retryDelay == null ? 1000 : opts.retryDelay;
  var onError = opts.onError;
  var pending = null;
  var resolved = false;
  function attempt(n) {
    return Promise.resolve().then(importFn).catch(function (error) {
      if (typeof onError === "function") onError(error, n);
      if (n <= retries) {
        return new Promise(function (resolve) {
          setTimeout(resolve, retryDelay);
        }).then(function () {
          return attempt(n + 1);
        });
      }
      throw error;
    });
  }
  function load() {
    if (useCache && pending) return pending;
    var current = attempt(1).then(
      function (mod) {
        if (useCache && pending === current) resolved = true;
        return mod;
      },
      function (error) {
        if (pending === current) pending = null;
        throw error;
      }
    );
    if (useCache) pending = current;
    return current;
  }
  function loader() {
    return load();
  }
  loader.preload = load;
  loader.clearCache = function () {
    pending = null;
    resolved = false;
  };
  loader.isCached = function () {
    return resolved;
  };
  return loader;
}
"#;

pub fn helper_source(name: &str) -> String {
    HELPER_TEMPLATE.replace(NAME_TOKEN, name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    NotNeeded,
    Injected(Edit),
    /// The unit already declares an identifier with the helper's name; the
    /// existing declaration is relied on.
    Collision,
}

/// Per-unit injection state. Created for one transform run and dropped
/// with it.
#[derive(Debug)]
pub struct HelperInjector<'a> {
    name: &'a str,
    used: bool,
}

impl<'a> HelperInjector<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name, used: false }
    }

    pub fn mark_used(&mut self) {
        self.used = true;
    }

    pub fn finish(self, unit: &SourceUnit<'_>) -> Injection {
        if !self.used {
            return Injection::NotNeeded;
        }
        if declares(&unit.module, self.name) {
            return Injection::Collision;
        }
        let at = insertion_offset(unit);
        let source = helper_source(self.name);
        // At the top or after the hashbang line the helper starts its own
        // line; after a directive it needs a line break first.
        let text = if unit.text[..at].is_empty() || unit.text[..at].ends_with('\n') {
            format!("{source}\n")
        } else {
            format!("\n{source}")
        };
        Injection::Injected(Edit::insert(at, text))
    }
}

/// Offset after a hashbang line and any leading directive prologue.
fn insertion_offset(unit: &SourceUnit<'_>) -> usize {
    let last_directive = unit
        .module
        .body
        .iter()
        .take_while(|item| {
            matches!(
                item,
                ModuleItem::Stmt(Stmt::Expr(ExprStmt { expr, .. })) if matches!(&**expr, Expr::Lit(Lit::Str(_)))
            )
        })
        .last();
    if let Some(item) = last_directive {
        return unit.offset(item.span().hi);
    }
    if unit.text.starts_with("#!") {
        return unit.text.find('\n').map_or(unit.text.len(), |i| i + 1);
    }
    0
}

// -----------------------------------------------------------------------------
// Module-scope declarations
// -----------------------------------------------------------------------------

fn declares(module: &Module, name: &str) -> bool {
    if module.body.iter().any(|item| item_declares(item, name)) {
        return true;
    }
    // `var` anywhere outside a function body still lands in module scope.
    let mut finder = HoistedVarFinder { name, found: false };
    module.visit_with(&mut finder);
    finder.found
}

fn item_declares(item: &ModuleItem, name: &str) -> bool {
    match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => import.specifiers.iter().any(|s| {
            let local = match s {
                ImportSpecifier::Named(n) => &n.local,
                ImportSpecifier::Default(d) => &d.local,
                ImportSpecifier::Namespace(ns) => &ns.local,
            };
            &*local.sym == name
        }),
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => decl_declares(&export.decl, name),
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => {
            let ident = match &export.decl {
                DefaultDecl::Fn(f) => f.ident.as_ref(),
                DefaultDecl::Class(c) => c.ident.as_ref(),
                _ => None,
            };
            ident.is_some_and(|i| &*i.sym == name)
        }
        ModuleItem::Stmt(Stmt::Decl(decl)) => decl_declares(decl, name),
        _ => false,
    }
}

fn decl_declares(decl: &Decl, name: &str) -> bool {
    match decl {
        Decl::Fn(f) => &*f.ident.sym == name,
        Decl::Class(c) => &*c.ident.sym == name,
        Decl::Var(v) => v.decls.iter().any(|d| pat_binds(&d.name, name)),
        Decl::Using(u) => u.decls.iter().any(|d| pat_binds(&d.name, name)),
        Decl::TsEnum(e) => &*e.id.sym == name,
        _ => false,
    }
}

fn pat_binds(pat: &Pat, name: &str) -> bool {
    match pat {
        Pat::Ident(b) => &*b.id.sym == name,
        Pat::Array(a) => a.elems.iter().flatten().any(|p| pat_binds(p, name)),
        Pat::Object(o) => o.props.iter().any(|p| match p {
            ObjectPatProp::KeyValue(kv) => pat_binds(&kv.value, name),
            ObjectPatProp::Assign(a) => &*a.key.id.sym == name,
            ObjectPatProp::Rest(r) => pat_binds(&r.arg, name),
        }),
        Pat::Rest(r) => pat_binds(&r.arg, name),
        Pat::Assign(a) => pat_binds(&a.left, name),
        _ => false,
    }
}

struct HoistedVarFinder<'a> {
    name: &'a str,
    found: bool,
}

impl Visit for HoistedVarFinder<'_> {
    fn visit_var_decl(&mut self, n: &VarDecl) {
        if n.kind == VarDeclKind::Var && n.decls.iter().any(|d| pat_binds(&d.name, self.name)) {
            self.found = true;
        }
        n.visit_children_with(self);
    }

    // Function-like bodies open their own var scope.
    fn visit_function(&mut self, _: &Function) {}

    fn visit_arrow_expr(&mut self, _: &ArrowExpr) {}

    fn visit_class(&mut self, _: &Class) {}

    fn visit_getter_prop(&mut self, _: &GetterProp) {}

    fn visit_setter_prop(&mut self, _: &SetterProp) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{apply_edits, Dialect};

    fn inject(src: &str) -> (Injection, String) {
        let unit = SourceUnit::parse("t.js", src, Dialect::Js).unwrap();
        let mut injector = HelperInjector::new("__lazyImport");
        injector.mark_used();
        let injection = injector.finish(&unit);
        let out = match &injection {
            Injection::Injected(edit) => apply_edits(src, vec![edit.clone()]),
            _ => src.to_string(),
        };
        (injection, out)
    }

    #[test]
    fn helper_source_uses_given_name_and_avoids_import_calls() {
        let src = helper_source("__myHelper");
        assert!(src.starts_with("function __myHelper(importFn, options)"));
        assert!(!src.contains(NAME_TOKEN));
        assert!(!src.contains("import("));
    }

    #[test]
    fn unused_injector_does_nothing() {
        let unit = SourceUnit::parse("t.js", "let a;", Dialect::Js).unwrap();
        assert_eq!(HelperInjector::new("__lazyImport").finish(&unit), Injection::NotNeeded);
    }

    #[test]
    fn prepends_at_top_by_default() {
        let (_, out) = inject("const a = 1;\n");
        assert!(out.starts_with("function __lazyImport("));
        assert!(out.ends_with("}\n\nconst a = 1;\n"));
    }

    #[test]
    fn keeps_directives_first() {
        let (_, out) = inject("'use client';\n\"use strict\";\nconst a = 1;\n");
        assert!(out.starts_with("'use client';\n\"use strict\";\nfunction __lazyImport("));
    }

    #[test]
    fn keeps_hashbang_first() {
        let (_, out) = inject("#!/usr/bin/env node\nconst a = 1;\n");
        assert!(out.starts_with("#!/usr/bin/env node\nfunction __lazyImport("));
        assert!(out.ends_with("}\n\nconst a = 1;\n"));
    }

    #[test]
    fn module_scope_declaration_is_a_collision() {
        for src in [
            "function __lazyImport() {}",
            "const __lazyImport = 1;",
            "export let { a: [__lazyImport] } = obj;",
            "import { __lazyImport } from './helpers';",
            "import * as __lazyImport from './helpers';",
            "export default function __lazyImport() {}",
            "export class __lazyImport {}",
            "if (x) { var __lazyImport = 1; }",
        ] {
            assert_eq!(inject(src).0, Injection::Collision, "{src}");
        }
    }

    #[test]
    fn nested_scope_bindings_are_not_collisions() {
        for src in [
            "function outer(__lazyImport) {}",
            "function outer() { var __lazyImport = 1; }",
            "{ const __lazyImport = 1; }",
            "const f = (__lazyImport) => __lazyImport;",
            "class A { m() { let __lazyImport; } }",
            "try {} catch (__lazyImport) {}",
        ] {
            assert!(matches!(inject(src).0, Injection::Injected(_)), "{src}");
        }
    }

    #[test]
    fn mere_references_are_not_declarations() {
        let (injection, _) = inject("__lazyImport();");
        assert!(matches!(injection, Injection::Injected(_)));
    }
}
