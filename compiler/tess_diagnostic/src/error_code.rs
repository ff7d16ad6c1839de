use std::fmt;

/// Error codes for all compiler diagnostics.
///
/// Format: E#### / W#### where the first digit indicates the phase:
/// - E0xxx: lexical errors (escape decoding)
/// - E1xxx: syntax errors surfaced from the grammar layer
/// - E2xxx: semantic errors
/// - W9xxx: configurable-severity classes (default warning)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Lexical errors (E0xxx)
    /// Invalid escape sequence in a charstring literal
    E0001,
    /// Truncated hex escape (`\x` with no usable digits left)
    E0002,
    /// Octal escape above decimal 255
    E0003,
    /// Charstring literal without surrounding quotes
    E0004,

    // Syntax errors (E1xxx), surfaced unchanged from the parser layer
    /// Lexer found no viable alternative
    E1001,
    /// Parser found no viable alternative
    E1002,
    /// Failed grammar predicate
    E1003,
    /// Input mismatch
    E1004,

    // Semantic errors (E2xxx)
    /// Undefined reference
    E2001,
    /// Duplicate definition in one scope
    E2002,
    /// Circular definition
    E2003,
    /// Type mismatch
    E2004,
    /// Argument count mismatch
    E2005,
    /// Field access on a type without that field
    E2006,
    /// Index applied to a non-array type
    E2007,
    /// Call applied to a non-invocable entity
    E2008,
    /// Dereferenced altstep declared "runs on self"
    E2009,
    /// Runs-on component type incompatible with the invoking context
    E2010,
    /// Statement not allowed inside interleave
    E2011,
    /// Return inside interleave
    E2012,
    /// Altstep invocation inside interleave
    E2013,
    /// Guard expression is not boolean
    E2014,
    /// Goto target label is not defined
    E2015,
    /// Duplicate label in the enclosing block chain
    E2016,
    /// Backward goto forms an unconditional loop
    E2017,
    /// Value-returning function may complete without a return
    E2018,
    /// Guard operation not allowed inside interleave
    E2019,
    /// Break or continue outside a loop body
    E2020,
    /// Repeat outside an alt guard body
    E2021,
    /// Reference does not denote the expected entity kind
    E2022,
    /// Guard expression on an interleave branch
    E2023,
    /// Testcase invoked as a plain statement
    E2024,

    // Configurable-severity classes (W9xxx, default warning)
    /// Unreachable code after an unconditional return
    W9001,
    /// Empty statement block
    W9002,
    /// Statement count above the configured maximum
    W9003,
    /// Local definition shadows an outer one
    W9004,
    /// Label never referenced by a goto
    W9005,
}

impl ErrorCode {
    /// Whether the code belongs to the configurable-severity group.
    pub fn is_configurable(self) -> bool {
        matches!(
            self,
            ErrorCode::W9001 | ErrorCode::W9002 | ErrorCode::W9003 | ErrorCode::W9004
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
