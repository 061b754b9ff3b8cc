/// Application name, used for config and data directory names.
pub const APP_NAME: &str = "chartmart";

/// File name of the workspace manifest inside a workspace directory.
pub const WORKSPACE_MANIFEST: &str = "workspace.yaml";

/// Environment variable overriding the CLI config file location.
pub const CONFIG_ENV: &str = "CHARTMART_CONFIG";

/// Environment variable holding the log filter; falls back to `RUST_LOG`.
pub const LOG_ENV: &str = "CHARTMART_LOG";
