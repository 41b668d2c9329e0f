// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Sandcraft

// Completion Endpoint
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const SANDCRAFT_MODEL: &str = "SANDCRAFT_MODEL";
pub const SANDCRAFT_COMPLETIONS_URL: &str = "SANDCRAFT_COMPLETIONS_URL";

// Agent Loop
pub const SANDCRAFT_MAX_TOOL_ROUNDS: &str = "SANDCRAFT_MAX_TOOL_ROUNDS";

// Sandbox Limits
pub const SANDCRAFT_SANDBOX_TIMEOUT_SECS: &str = "SANDCRAFT_SANDBOX_TIMEOUT_SECS";
pub const SANDCRAFT_SANDBOX_DATA_DIR: &str = "SANDCRAFT_SANDBOX_DATA_DIR";
pub const SANDCRAFT_SANDBOX_MEMORY_MB: &str = "SANDCRAFT_SANDBOX_MEMORY_MB";
pub const SANDCRAFT_SANDBOX_CPU_QUOTA: &str = "SANDCRAFT_SANDBOX_CPU_QUOTA";
pub const SANDCRAFT_SANDBOX_CPU_PERIOD: &str = "SANDCRAFT_SANDBOX_CPU_PERIOD";

// GitHub
pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

// Logging
pub const RUST_LOG: &str = "RUST_LOG";

// Defaults
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;
pub const DEFAULT_SANDBOX_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_SANDBOX_DATA_DIR: &str = "sandbox_data";
pub const DEFAULT_SANDBOX_MEMORY_MB: u64 = 512;
pub const DEFAULT_SANDBOX_CPU_QUOTA: i64 = 50_000;
pub const DEFAULT_SANDBOX_CPU_PERIOD: i64 = 100_000;
