// EN: src/cli/handlers/escape.rs

use anyhow::{Context, Result};
use clap::Parser;

use super::commons::CliContext;
use crate::core::escape;

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct EscapeArgs {
    /// Parse the value as JSON first (numbers, objects, arrays...).
    #[arg(long)]
    json: bool,
    /// Wrap the result in single quotes.
    #[arg(long)]
    quote: bool,
    /// The value to escape.
    #[arg(allow_hyphen_values = true)]
    value: String,
}

fn render(escape_args: &EscapeArgs) -> Result<String> {
    let escaped = if escape_args.json {
        let value: serde_json::Value = serde_json::from_str(&escape_args.value)
            .with_context(|| format!("'{}' is not valid JSON", escape_args.value))?;
        escape::escape(&value)?
    } else {
        escape::escape_str(&escape_args.value)
    };
    Ok(if escape_args.quote {
        format!("'{}'", escaped)
    } else {
        escaped
    })
}

/// The main handler for the `escape` command.
pub fn handle(args: Vec<String>, _context: &CliContext) -> Result<()> {
    let escape_args = EscapeArgs::try_parse_from(&args)?;
    println!("{}", render(&escape_args)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> Result<String> {
        render(&EscapeArgs::try_parse_from(args)?)
    }

    #[test]
    fn test_plain_value_is_escaped_verbatim() {
        assert_eq!(run(&["it's"]).unwrap(), "it'\\''s");
        assert_eq!(run(&["--quote", "it's"]).unwrap(), "'it'\\''s'");
    }

    #[test]
    fn test_json_value_keeps_nested_quotes() {
        assert_eq!(
            run(&["--json", r#"{"a": "it's"}"#]).unwrap(),
            r#"{"a":"it'\''s"}"#
        );
        assert_eq!(run(&["--json", "4"]).unwrap(), "4");
    }

    #[test]
    fn test_invalid_json_is_reported() {
        assert!(run(&["--json", "{oops"]).is_err());
    }
}
