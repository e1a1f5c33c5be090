// src/constants.rs

use std::time::Duration;

/// How long the terminator waits for a graceful exit before giving up or escalating.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(500);

/// Grace period granted to a timed-out command between SIGTERM and SIGKILL.
pub const TIMEOUT_GRACE: Duration = Duration::from_millis(500);

/// Upper bound for collecting buffered output once a timed-out command is gone.
/// A grandchild holding the pipe open must not block the caller forever.
pub const OUTPUT_DRAIN_WINDOW: Duration = Duration::from_millis(250);

/// The shell used to append to the history. `history` is a bash builtin.
pub const DEFAULT_HISTORY_SHELL: &str = "bash";

/// The name of the directory containing procpack configuration (in the system config dir).
pub const CONFIG_DIR_NAME: &str = "procpack";

/// The name of the configuration file inside the config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "PROCPACK_CONFIG";
