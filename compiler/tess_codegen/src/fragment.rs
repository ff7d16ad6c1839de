//! Expression fragments.
//!
//! Every generated expression is an ordered triple: statements that
//! must run before the expression is usable, the expression itself,
//! and cleanup that must run after its last use. Composition always
//! concatenates preamble-before-use and postamble-after, in child
//! order.

/// One generated expression with its setup and teardown.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExpressionFragment {
    /// Statements emitted before the expression can be evaluated.
    pub preamble: String,
    /// The usable C expression.
    pub expression: String,
    /// Statements emitted after the expression's last use.
    pub postamble: String,
}

impl ExpressionFragment {
    /// A fragment that is a single expression with no setup.
    pub fn single(expression: impl Into<String>) -> Self {
        ExpressionFragment {
            preamble: String::new(),
            expression: expression.into(),
            postamble: String::new(),
        }
    }

    /// Whether this fragment can be inlined directly.
    pub fn is_single_expression(&self) -> bool {
        self.preamble.is_empty() && self.postamble.is_empty()
    }

    /// Absorb a child fragment's setup and teardown, keeping the
    /// child's expression for the caller to splice in.
    ///
    /// The child's preamble is appended to ours (it runs before our
    /// combined expression) and its postamble is prepended to ours
    /// (children unwind innermost-first).
    pub fn absorb<'a>(&mut self, child: &'a ExpressionFragment) -> &'a str {
        self.preamble.push_str(&child.preamble);
        self.postamble = format!("{}{}", child.postamble, self.postamble);
        &child.expression
    }
}
