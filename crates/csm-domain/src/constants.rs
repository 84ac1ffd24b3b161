//! Shared constants referenced across layers.

/// Maximum accepted length for a user-supplied prompt.
pub const MAX_PROMPT_LENGTH: usize = 10_000;

/// Maximum accepted length for a filesystem path argument.
pub const MAX_PATH_LENGTH: usize = 4_096;

/// Upper bound on a state number, used to reject absurd jump targets
/// before they ever reach storage.
pub const MAX_STATE_NUMBER: u64 = 1_000_000;

/// Branch name reported when the project directory is not a git repository.
pub const BRANCH_NOT_VERSIONED: &str = "not_versioned";

/// Branch name reported when `git` itself could not be invoked or errored.
pub const BRANCH_GIT_ERROR: &str = "git_error";

/// Branch name reported when HEAD is detached and the commit cannot be named.
pub const BRANCH_DETACHED_HEAD: &str = "detached_head";

/// Synthetic branch name used for genesis snapshots of a non-repository
/// project.
pub const SYNTHETIC_GENESIS_BRANCH: &str = "codebase-state-machine";

/// Default timeout for shelling out to `git`, in seconds.
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 60;

/// Default SQLite lock-retry parameters.
pub const SQLITE_RETRY_MAX_ATTEMPTS: u32 = 5;
/// Initial delay before the first retry, in milliseconds.
pub const SQLITE_RETRY_INITIAL_DELAY_MS: u64 = 100;
/// Multiplicative backoff factor applied between retries.
pub const SQLITE_RETRY_BACKOFF_FACTOR: f64 = 2.0;
/// Upper bound on the delay between retries, in milliseconds.
pub const SQLITE_RETRY_MAX_DELAY_MS: u64 = 2_000;

/// Default configuration file name searched for by the config loader.
pub const DEFAULT_CONFIG_FILENAME: &str = "csm.toml";

/// Environment variable prefix used by the config loader.
pub const CONFIG_ENV_PREFIX: &str = "CSM";

/// The state number assigned to the genesis snapshot.
pub const GENESIS_STATE_NUMBER: u64 = 0;

/// The first transition id assigned after genesis.
pub const FIRST_TRANSITION_ID: u64 = 1;
