// EN: src/system/browser.rs

use crate::models::{CommandParseError, CommandSpec, OutputMode};
use crate::system::spawner::{self, LiveProcess, SpawnError};
use thiserror::Error;

/// Openers tried in order on Linux and the BSDs. The first one found in `PATH` wins.
const UNIX_OPENERS: [&str; 3] = ["xdg-open", "sensible-browser", "x-www-browser"];

/// Why the browser could not be launched.
#[derive(Error, Debug)]
pub enum BrowserError {
    /// The URL was blank.
    #[error("No URL given to open.")]
    EmptyUrl,
    /// The configured opener command line could not be split.
    #[error("Invalid browser command '{command}': {source}")]
    InvalidOpener {
        command: String,
        #[source]
        source: CommandParseError,
    },
    /// The opener could not be started.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// Builds the command that opens `url` in the user's browser.
///
/// `opener` is a full command line such as `"firefox --new-window"`; the URL is appended
/// as its last argument. Without it the platform default is used.
pub fn opener_command(url: &str, opener: Option<&str>) -> Result<CommandSpec, BrowserError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(BrowserError::EmptyUrl);
    }

    if let Some(opener) = opener.filter(|o| !o.trim().is_empty()) {
        let spec = CommandSpec::parse(opener).map_err(|source| BrowserError::InvalidOpener {
            command: opener.to_string(),
            source,
        })?;
        return Ok(spec.arg(url));
    }

    let spec = if cfg!(target_os = "windows") {
        // The empty string is the window title `start` expects before the target.
        CommandSpec::new("cmd").args(["/C", "start", ""]).arg(url)
    } else if cfg!(target_os = "macos") {
        CommandSpec::new("open").arg(url)
    } else {
        let opener = UNIX_OPENERS
            .into_iter()
            .find(|candidate| spawner::is_executable_in_path(candidate))
            .unwrap_or("xdg-open");
        CommandSpec::new(opener).arg(url)
    };
    Ok(spec)
}

/// Opens `url` with the platform's default browser.
pub fn open_browser(url: &str) -> Result<LiveProcess, BrowserError> {
    open_browser_with(None, url)
}

/// Opens `url` with `opener`, or the platform default when `None`.
///
/// The opener is started and left running with its output discarded, so nothing ties it
/// to us: the returned handle may be awaited or simply dropped. Requires a tokio runtime.
pub fn open_browser_with(opener: Option<&str>, url: &str) -> Result<LiveProcess, BrowserError> {
    let spec = opener_command(url, opener)?.output(OutputMode::Null);
    log::debug!("Opening '{}' with '{}'", url, spec.display_line());
    let mut process = spawner::spawn(&spec)?;
    drop(process.take_stdin());
    Ok(process)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const URL: &str = "https://example.com/?q=a b";

    #[test]
    fn test_empty_url_is_rejected() {
        assert!(matches!(opener_command("  ", None), Err(BrowserError::EmptyUrl)));
        assert!(matches!(
            opener_command("", Some("firefox")),
            Err(BrowserError::EmptyUrl)
        ));
    }

    #[test]
    fn test_custom_opener_keeps_its_arguments_and_appends_url() {
        let spec = opener_command(URL, Some("firefox --new-window")).unwrap();
        assert_eq!(spec.program, "firefox");
        assert_eq!(spec.args, vec!["--new-window", URL]);
    }

    #[test]
    fn test_blank_custom_opener_falls_back_to_platform_default() {
        let custom = opener_command(URL, Some("   ")).unwrap();
        let default = opener_command(URL, None).unwrap();
        assert_eq!(custom, default);
    }

    #[test]
    fn test_unbalanced_custom_opener_is_reported() {
        let result = opener_command(URL, Some("firefox 'oops"));
        assert!(matches!(result, Err(BrowserError::InvalidOpener { .. })));
    }

    #[test]
    fn test_platform_default_passes_url_as_single_argument() {
        let spec = opener_command(URL, None).unwrap();
        assert_eq!(spec.args.last().map(String::as_str), Some(URL));

        if cfg!(target_os = "windows") {
            assert_eq!(spec.program, "cmd");
            assert_eq!(spec.args, vec!["/C", "start", "", URL]);
        } else if cfg!(target_os = "macos") {
            assert_eq!(spec.program, "open");
        } else {
            assert!(UNIX_OPENERS.contains(&spec.program.as_str()));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_open_with_custom_opener_spawns_it() {
        let mut process = open_browser_with(Some("echo"), URL).unwrap();
        let status = process.wait().await.unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_opener_keeps_running_after_the_handle_is_dropped() {
        // --- Setup ---
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("opened");
        let opener = format!(
            "sh -c 'sleep 0.3; echo opened; echo failed >&2; touch \"{}\"' opener",
            marker.display()
        );

        // --- Execute ---
        let process = open_browser_with(Some(&opener), URL).unwrap();
        drop(process);
        tokio::time::sleep(Duration::from_millis(1_200)).await;

        // --- Assert ---
        assert!(marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_chatty_opener_can_be_awaited() {
        let opener = "sh -c 'head -c 200000 /dev/zero >&2; head -c 200000 /dev/zero; echo opened' opener";
        let mut process = open_browser_with(Some(opener), URL).unwrap();

        let status = tokio::time::timeout(Duration::from_secs(3), process.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn test_missing_opener_is_a_spawn_error() {
        let result = open_browser_with(Some("procpack-no-such-browser"), URL);
        assert!(matches!(
            result,
            Err(BrowserError::Spawn(SpawnError::ProgramNotFound { .. }))
        ));
    }
}
