//! Code generation context and state.
//!
//! Side effects of generation are confined here: appending to the
//! output buffer, idempotent registration of required runtime imports
//! (a set, not a list), and allocation of fresh temporary names from a
//! monotonically increasing per-pass counter.

use rustc_hash::FxHashSet;

use tess_ast::{AstArena, Name, StringInterner, TypeId, TypeKind};

/// State of one generation pass.
pub struct GenContext<'a> {
    pub arena: &'a AstArena,
    pub interner: &'a StringInterner,
    /// Generated code.
    out: String,
    /// Runtime headers required by the generated code.
    imports: FxHashSet<&'static str>,
    /// Counter for unique temporary names; never reset within a pass.
    temp_counter: u32,
    /// Current indentation level.
    indent: usize,
    /// Labels of the alt constructs currently being generated;
    /// `repeat` jumps to the innermost one.
    pub(crate) alt_labels: Vec<String>,
}

impl<'a> GenContext<'a> {
    pub fn new(arena: &'a AstArena, interner: &'a StringInterner) -> Self {
        GenContext {
            arena,
            interner,
            out: String::with_capacity(4096),
            imports: FxHashSet::default(),
            temp_counter: 0,
            indent: 0,
            alt_labels: Vec::new(),
        }
    }

    /// Register a required runtime import. Idempotent.
    pub fn require(&mut self, header: &'static str) {
        self.imports.insert(header);
    }

    /// Allocate a fresh temporary name.
    pub fn fresh_temp(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}_{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    /// Append one indented line to the output.
    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Append pre-rendered statements (already newline-separated).
    pub fn raw(&mut self, text: &str) {
        if !text.is_empty() {
            for line in text.lines() {
                self.line(line);
            }
        }
    }

    /// Append an empty line.
    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Mangle a Tess name into a C identifier.
    pub fn mangle(&self, name: Name) -> String {
        let s = self.interner.lookup(name);
        let mut result = String::with_capacity(s.len() + 5);
        result.push_str("tess_");
        for c in s.chars() {
            if c.is_ascii_alphanumeric() {
                result.push(c);
            } else {
                result.push('_');
            }
        }
        result
    }

    /// C type for a governing type, registering the imports it needs.
    pub fn c_type(&mut self, ty: TypeId) -> &'static str {
        match &self.arena.ty(ty).kind {
            TypeKind::Integer => "int64_t",
            TypeKind::Float => "double",
            TypeKind::Boolean => "bool",
            TypeKind::Charstring => {
                self.require("tessrt/charstring.h");
                "tessrt_charstring"
            }
            TypeKind::Verdict => {
                self.require("tessrt/verdict.h");
                "tessrt_verdict"
            }
            TypeKind::Timer => {
                self.require("tessrt/timer.h");
                "tessrt_timer"
            }
            TypeKind::Default => {
                self.require("tessrt/alt.h");
                "tessrt_default"
            }
            TypeKind::Component { .. } => {
                self.require("tessrt/component.h");
                "tessrt_component"
            }
            TypeKind::Port { .. } => {
                self.require("tessrt/port.h");
                "tessrt_port"
            }
            TypeKind::Record { .. } | TypeKind::ArrayOf { .. } => "tessrt_value",
            TypeKind::Altstep { .. } => {
                self.require("tessrt/alt.h");
                "tessrt_altstep_ref"
            }
            TypeKind::Undefined => "tessrt_value",
        }
    }

    /// Finish the pass: the output buffer and the sorted, deduplicated
    /// import manifest.
    pub fn finish(self) -> (String, Vec<String>) {
        let mut imports: Vec<String> = self.imports.into_iter().map(str::to_owned).collect();
        imports.sort_unstable();
        (self.out, imports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_are_deduplicated_and_sorted() {
        let arena = AstArena::new();
        let interner = StringInterner::new();
        let mut ctx = GenContext::new(&arena, &interner);
        ctx.require("tessrt/timer.h");
        ctx.require("tessrt/alt.h");
        ctx.require("tessrt/timer.h");
        let (_, imports) = ctx.finish();
        assert_eq!(imports, vec!["tessrt/alt.h", "tessrt/timer.h"]);
    }

    #[test]
    fn test_fresh_temps_are_unique() {
        let arena = AstArena::new();
        let interner = StringInterner::new();
        let mut ctx = GenContext::new(&arena, &interner);
        let a = ctx.fresh_temp("cs");
        let b = ctx.fresh_temp("cs");
        assert_ne!(a, b);
    }

    #[test]
    fn test_mangle() {
        let arena = AstArena::new();
        let interner = StringInterner::new();
        let ctx = GenContext::new(&arena, &interner);
        let name = interner.intern("tc_setup-1");
        assert_eq!(ctx.mangle(name), "tess_tc_setup_1");
    }
}
