//! Handler for the `expression` command.

use chrono::Offset;
use serde_json::json;

use super::command::ExpressionArgs;
use super::context::CommandContext;
use super::output;
use crate::application::dialect::DialectRegistry;
use crate::error::Result;

/// Print the bucket expression `backend` would group by.
///
/// The UTC offset is taken from the current time in the selected timezone.
///
/// # Errors
/// Returns `ExpressionError::UnsupportedBackend` for unknown backends.
pub fn execute(ctx: &CommandContext, args: &ExpressionArgs) -> Result<()> {
    let offset_seconds = ctx.now().offset().fix().local_minus_utc();
    let registry = DialectRegistry::new();
    let sql = registry.make(&args.backend, &args.column, args.unit, offset_seconds)?;

    output::document(&json!({
        "command": "expression",
        "backend": args.backend,
        "column": args.column,
        "unit": args.unit,
        "offset_seconds": offset_seconds,
        "sql": sql,
    }));

    output::headline(&sql);
    if output::verbosity() > 0 {
        output::field("Backends", registry.backends().join(", "));
        output::field("Offset", format!("{offset_seconds}s"));
    }
    Ok(())
}
