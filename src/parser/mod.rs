use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::debug;

use crate::processor::ast::{Module, Stmt};

/// Parse the JSON tree produced by the front end into a `Module`.
///
/// The document must be an object with a top-level `body` array; each
/// element is one statement. Statements are decoded one by one so an
/// error names the statement it came from.
pub fn load_from_json(json: &str) -> Result<Module> {
    // Grab the entire file as a dynamic value first.
    let root: Value = serde_json::from_str(json)?;

    let body = root
        .get("body")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("tree has no `body` array"))?;

    debug!(statements = body.len(), "tree loaded");

    let mut stmts = Vec::with_capacity(body.len());
    for (i, stmt_val) in body.iter().enumerate() {
        let stmt: Stmt = serde_json::from_value(stmt_val.clone())
            .with_context(|| format!("statement {i} of `body` is malformed"))?;
        stmts.push(stmt);
    }

    Ok(Module { body: stmts })
}

/// Pretty JSON for `--ast-only`.
pub fn dump(module: &Module) -> Result<String> {
    Ok(serde_json::to_string_pretty(module)?)
}
