// EN: src/cli/handlers/open.rs

use anyhow::Result;
use clap::Parser;
use colored::*;

use super::commons::{self, CliContext};
use crate::system::browser;

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct OpenArgs {
    /// The URL to open.
    url: String,
}

/// The main handler for the `open` command.
pub fn handle(args: Vec<String>, context: &CliContext) -> Result<()> {
    let open_args = OpenArgs::try_parse_from(&args)?;
    let opener = context.settings()?.browser.command.as_deref();

    println!("\n> Opening {}", open_args.url.green());
    context.runtime()?.block_on(async {
        let mut process = browser::open_browser_with(opener, &open_args.url)?;
        // The opener hands off to the browser and returns; wait so it is not cut short.
        let status = process.wait().await?;
        if !status.success() {
            println!(
                "{}",
                format!(
                    "Warning: the browser opener finished with {}.",
                    commons::describe_status(&status)
                )
                .yellow()
            );
        }
        Ok::<(), anyhow::Error>(())
    })
}
