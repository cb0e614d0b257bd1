//! Compile-time failures of the core pipeline.
//!
//! Every variant aborts the whole compilation; there is no partial output.
//! Each one carries the source line and the scope (a routine name, or
//! `None` for the top level) so the offending statement can be found.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum CompileError {
    #[snafu(display("{}, line {line}: unsupported construct `{construct}`", scope(routine)))]
    Unsupported {
        construct: String,
        routine: Option<String>,
        line: u32,
    },

    #[snafu(display("{}, line {line}: unresolved name `{name}`", scope(routine)))]
    UnresolvedName {
        name: String,
        routine: Option<String>,
        line: u32,
    },

    #[snafu(display("line {line}: routine `{name}` is already defined"))]
    DuplicateRoutine { name: String, line: u32 },

    #[snafu(display("line {line}: `{name}` clashes with an existing label"))]
    LabelClash { name: String, line: u32 },

    #[snafu(display("{}, line {line}: call to unknown routine `{name}`", scope(routine)))]
    UnknownRoutine {
        name: String,
        routine: Option<String>,
        line: u32,
    },

    #[snafu(display(
        "{}, line {line}: `{callee}` takes {expected} argument(s), {found} given",
        scope(routine)
    ))]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
        routine: Option<String>,
        line: u32,
    },
}

fn scope(routine: &Option<String>) -> String {
    match routine {
        Some(name) => format!("in routine `{name}`"),
        None => "at top level".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_scope() {
        let err = CompileError::UnresolvedName {
            name: "q".into(),
            routine: Some("f".into()),
            line: 4,
        };
        assert_eq!(err.to_string(), "in routine `f`, line 4: unresolved name `q`");

        let err = CompileError::Unsupported {
            construct: "class".into(),
            routine: None,
            line: 1,
        };
        assert_eq!(err.to_string(), "at top level, line 1: unsupported construct `class`");
    }
}
