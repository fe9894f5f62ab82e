//! Call Site Classifier: records every loader call and decides whether it
//! can be rewritten.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    ops::Range,
};

use swc_core::{
    common::{BytePos, Span, Spanned},
    ecma::{
        ast::*,
        visit::{Visit, VisitWith},
    },
};

use crate::{bindings::LoaderBindings, options::TransformOptions, source::SourceUnit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModulePath {
    Static { value: String, raw: Range<usize> },
    Dynamic { raw: Range<usize> },
}

impl ModulePath {
    pub fn raw(&self) -> &Range<usize> {
        match self {
            ModulePath::Static { raw, .. } | ModulePath::Dynamic { raw } => raw,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            ModulePath::Static { value, .. } => Some(value),
            ModulePath::Dynamic { .. } => None,
        }
    }
}

/// Second argument of a loader call, kept as a byte range so it can be
/// moved into the output without being re-serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsArg {
    pub raw: Range<usize>,
    /// A static `chunkName: '...'` property, when the argument is an object
    /// literal that has one.
    pub chunk_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    BadArity(usize),
    SpreadArgument,
    NonLiteralPath,
    InterpolatedTemplate,
    NestedLoaderCall,
    ContainsLoaderCall,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BadArity(n) => write!(f, "bad arity: expected 1 or 2 arguments, got {n}"),
            SkipReason::SpreadArgument => f.write_str("bad arity: spread argument"),
            SkipReason::NonLiteralPath => f.write_str("non-literal module path"),
            SkipReason::InterpolatedTemplate => {
                f.write_str("non-literal module path: template literal with interpolation")
            }
            SkipReason::NestedLoaderCall => f.write_str("nested loader call"),
            SkipReason::ContainsLoaderCall => f.write_str("contains nested loader call"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Transformable,
    Skipped(SkipReason),
}

/// One occurrence of `<binding>(args...)`. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub range: Range<usize>,
    pub line: usize,
    pub column: usize,
    pub callee: String,
    pub arg_count: usize,
    pub path: Option<ModulePath>,
    pub options: Option<OptionsArg>,
    /// Range of the enclosing zero-argument call when the loader call is
    /// immediately invoked, as in `load('./x')()`.
    pub invoked_by: Option<Range<usize>>,
    /// The call is an operand (member object, callee, binary/unary operand,
    /// `await` argument, ...), so an arrow function replacing it needs
    /// parentheses.
    pub operand: bool,
    /// The call is the leftmost part of an expression statement.
    pub starts_statement: bool,
    pub classification: Classification,
}

impl CallSite {
    pub fn is_transformable(&self) -> bool {
        self.classification == Classification::Transformable
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.classification {
            Classification::Skipped(reason) => Some(reason),
            Classification::Transformable => None,
        }
    }
}

/// Collects and classifies all loader calls of `unit`, in source order.
pub fn classify_calls(
    unit: &SourceUnit<'_>,
    bindings: &LoaderBindings,
    options: &TransformOptions,
) -> Vec<CallSite> {
    if bindings.is_empty() {
        return vec![];
    }
    let mut collector = CallSiteCollector {
        unit,
        bindings,
        options,
        loader_depth: 0,
        invoked: HashMap::new(),
        operands: HashSet::new(),
        statement_starts: HashSet::new(),
        out: vec![],
    };
    unit.module.visit_with(&mut collector);
    collector.out
}

fn is_loader_call(call: &CallExpr, bindings: &LoaderBindings, options: &TransformOptions) -> bool {
    match &call.callee {
        Callee::Expr(callee) => bindings.is_loader_callee(callee, options),
        _ => false,
    }
}

fn unparen(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(p) => unparen(&p.expr),
        other => other,
    }
}

struct CallSiteCollector<'a, 'u> {
    unit: &'a SourceUnit<'u>,
    bindings: &'a LoaderBindings,
    options: &'a TransformOptions,
    // number of loader calls whose arguments we are currently inside
    loader_depth: usize,
    // inner loader call span -> enclosing zero-arg call span
    invoked: HashMap<Span, Span>,
    // loader calls sitting directly in an operand position
    operands: HashSet<Span>,
    // first position of every expression statement in a statement list
    statement_starts: HashSet<BytePos>,
    out: Vec<CallSite>,
}

impl CallSiteCollector<'_, '_> {
    fn note_statement(&mut self, stmt: &Stmt) {
        if let Stmt::Expr(e) = stmt {
            self.statement_starts.insert(e.expr.span().lo);
        }
    }

    fn mark_operand(&mut self, expr: &Expr) {
        if let Expr::Call(call) = expr {
            if is_loader_call(call, self.bindings, self.options) {
                self.operands.insert(call.span);
            }
        }
    }

    fn classify(&self, n: &CallExpr) -> CallSite {
        let (line, column) = self.unit.span_line_col(n.span);
        let callee = match &n.callee {
            Callee::Expr(e) => self.unit.slice(e.span()).to_string(),
            _ => String::new(),
        };
        let path = n.args.first().map(|a| self.module_path(&a.expr));
        let options = n.args.get(1).map(|a| OptionsArg {
            raw: self.unit.range(a.expr.span()),
            chunk_name: static_chunk_name(&a.expr),
        });
        let invoked_by = self.invoked.get(&n.span).map(|outer| self.unit.range(*outer));

        CallSite {
            range: self.unit.range(n.span),
            line,
            column,
            callee,
            arg_count: n.args.len(),
            path,
            options,
            invoked_by,
            operand: self.operands.contains(&n.span),
            starts_statement: self.statement_starts.contains(&n.span.lo),
            classification: self.classification(n),
        }
    }

    fn classification(&self, n: &CallExpr) -> Classification {
        use Classification::Skipped;

        if n.args.is_empty() || n.args.len() > 2 {
            return Skipped(SkipReason::BadArity(n.args.len()));
        }
        if n.args.iter().any(|a| a.spread.is_some()) {
            return Skipped(SkipReason::SpreadArgument);
        }
        match unparen(&n.args[0].expr) {
            Expr::Lit(Lit::Str(_)) => {}
            Expr::Tpl(t) if t.exprs.is_empty() => {}
            Expr::Tpl(_) => return Skipped(SkipReason::InterpolatedTemplate),
            _ if self.options.string_literals_only => return Skipped(SkipReason::NonLiteralPath),
            _ => {}
        }
        if self.loader_depth > 0 {
            return Skipped(SkipReason::NestedLoaderCall);
        }
        let mut finder = LoaderCallFinder {
            bindings: self.bindings,
            options: self.options,
            found: false,
        };
        n.args.visit_with(&mut finder);
        if finder.found {
            return Skipped(SkipReason::ContainsLoaderCall);
        }
        Classification::Transformable
    }

    fn module_path(&self, expr: &Expr) -> ModulePath {
        let raw = self.unit.range(expr.span());
        match unparen(expr) {
            Expr::Lit(Lit::Str(s)) => ModulePath::Static {
                value: s.value.to_string(),
                raw,
            },
            Expr::Tpl(t) if t.exprs.is_empty() => ModulePath::Static {
                value: t.quasis.iter().map(|q| q.raw.to_string()).collect(),
                raw,
            },
            _ => ModulePath::Dynamic { raw },
        }
    }
}

// -----------------------------------------------------------------------------
// Traversal
// -----------------------------------------------------------------------------

impl Visit for CallSiteCollector<'_, '_> {
    fn visit_module(&mut self, n: &Module) {
        for item in &n.body {
            if let ModuleItem::Stmt(stmt) = item {
                self.note_statement(stmt);
            }
        }
        n.visit_children_with(self);
    }

    fn visit_block_stmt(&mut self, n: &BlockStmt) {
        n.stmts.iter().for_each(|s| self.note_statement(s));
        n.visit_children_with(self);
    }

    fn visit_switch_case(&mut self, n: &SwitchCase) {
        n.cons.iter().for_each(|s| self.note_statement(s));
        n.visit_children_with(self);
    }

    fn visit_call_expr(&mut self, n: &CallExpr) {
        if let Callee::Expr(callee) = &n.callee {
            self.mark_operand(callee);
            if n.args.is_empty() {
                if let Expr::Call(inner) = unparen(callee) {
                    if is_loader_call(inner, self.bindings, self.options) {
                        self.invoked.insert(inner.span, n.span);
                    }
                }
            }
        }

        if !is_loader_call(n, self.bindings, self.options) {
            n.visit_children_with(self);
            return;
        }

        let site = self.classify(n);
        self.out.push(site);
        self.loader_depth += 1;
        n.args.visit_with(self);
        self.loader_depth -= 1;
    }

    fn visit_member_expr(&mut self, n: &MemberExpr) {
        self.mark_operand(&n.obj);
        n.visit_children_with(self);
    }

    fn visit_opt_call(&mut self, n: &OptCall) {
        self.mark_operand(&n.callee);
        n.visit_children_with(self);
    }

    fn visit_new_expr(&mut self, n: &NewExpr) {
        self.mark_operand(&n.callee);
        n.visit_children_with(self);
    }

    fn visit_tagged_tpl(&mut self, n: &TaggedTpl) {
        self.mark_operand(&n.tag);
        n.visit_children_with(self);
    }

    fn visit_bin_expr(&mut self, n: &BinExpr) {
        self.mark_operand(&n.left);
        self.mark_operand(&n.right);
        n.visit_children_with(self);
    }

    fn visit_unary_expr(&mut self, n: &UnaryExpr) {
        self.mark_operand(&n.arg);
        n.visit_children_with(self);
    }

    fn visit_update_expr(&mut self, n: &UpdateExpr) {
        self.mark_operand(&n.arg);
        n.visit_children_with(self);
    }

    fn visit_await_expr(&mut self, n: &AwaitExpr) {
        self.mark_operand(&n.arg);
        n.visit_children_with(self);
    }

    fn visit_cond_expr(&mut self, n: &CondExpr) {
        self.mark_operand(&n.test);
        n.visit_children_with(self);
    }

    fn visit_ts_as_expr(&mut self, n: &TsAsExpr) {
        self.mark_operand(&n.expr);
        n.visit_children_with(self);
    }

    fn visit_ts_satisfies_expr(&mut self, n: &TsSatisfiesExpr) {
        self.mark_operand(&n.expr);
        n.visit_children_with(self);
    }

    fn visit_ts_non_null_expr(&mut self, n: &TsNonNullExpr) {
        self.mark_operand(&n.expr);
        n.visit_children_with(self);
    }
}

struct LoaderCallFinder<'a> {
    bindings: &'a LoaderBindings,
    options: &'a TransformOptions,
    found: bool,
}

impl Visit for LoaderCallFinder<'_> {
    fn visit_call_expr(&mut self, n: &CallExpr) {
        if is_loader_call(n, self.bindings, self.options) {
            self.found = true;
            return;
        }
        n.visit_children_with(self);
    }
}

fn static_chunk_name(expr: &Expr) -> Option<String> {
    let Expr::Object(obj) = unparen(expr) else {
        return None;
    };
    obj.props.iter().find_map(|p| {
        let PropOrSpread::Prop(p) = p else {
            return None;
        };
        let Prop::KeyValue(kv) = &**p else {
            return None;
        };
        let key = match &kv.key {
            PropName::Ident(i) => i.sym.to_string(),
            PropName::Str(s) => s.value.to_string(),
            _ => return None,
        };
        if key != "chunkName" {
            return None;
        }
        match unparen(&kv.value) {
            Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
            _ => None,
        }
    })
}
