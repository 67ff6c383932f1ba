//! Handlers for the `range` and `ranges` commands.

use chrono::SecondsFormat;
use serde_json::json;

use super::command::RangeArgs;
use super::context::CommandContext;
use super::output;
use crate::error::Result;

/// Resolve one token and print the window.
///
/// # Errors
/// Returns an error for unknown tokens or calendar overflow.
pub fn execute(ctx: &CommandContext, args: &RangeArgs) -> Result<()> {
    let resolver = ctx.resolver();
    let now = ctx.now();
    let range = resolver.resolve_at(&args.token, &now)?;

    output::document(&json!({
        "command": "range",
        "token": args.token,
        "timezone": ctx.timezone().name(),
        "now": now.to_rfc3339_opts(SecondsFormat::Micros, true),
        "range": range,
        "interval": range.as_ref().map(|r| r.interval().to_string()),
    }));

    output::section(&format!("Range {}", args.token));
    output::field("Timezone", ctx.timezone().name());
    output::field("Now", now.to_rfc3339_opts(SecondsFormat::Secs, true));
    match &range {
        Some(range) => {
            output::field("Start", range.start().to_rfc3339_opts(SecondsFormat::Micros, true));
            output::field("End", range.end().to_rfc3339_opts(SecondsFormat::Micros, true));
            output::field("Interval", range.interval());
        }
        None => output::field("Window", "unbounded"),
    }
    Ok(())
}

/// List every registered range name.
pub fn execute_list(ctx: &CommandContext) {
    let resolver = ctx.resolver();
    let mut names = resolver.names();
    names.sort_unstable();

    output::document(&json!({
        "command": "ranges",
        "names": names,
    }));

    output::section("Ranges");
    for name in &names {
        output::headline(name);
    }
}
