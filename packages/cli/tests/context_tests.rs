// ABOUTME: Tests for assembling the application context from configuration
// ABOUTME: Uses the in-memory runtime so no Docker daemon is needed

use pretty_assertions::assert_eq;
use sandcraft_cli::AppContext;
use sandcraft_config::Config;
use sandcraft_sandbox::InMemoryRuntime;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

fn config(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn test_context_creates_sandboxes_with_configured_caps() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().display().to_string();
    let runtime = Arc::new(InMemoryRuntime::new());
    let context = AppContext::with_runtime(
        config(&[
            ("SANDCRAFT_SANDBOX_DATA_DIR", data_dir.as_str()),
            ("SANDCRAFT_SANDBOX_MEMORY_MB", "256"),
        ]),
        runtime.clone(),
    );

    let sandbox = context
        .orchestrator
        .create_sandbox("local", "python:3.11")
        .await
        .unwrap();

    assert_eq!(sandbox.memory_limit_mb, 256);
    assert_eq!(runtime.created_specs()[0].memory_bytes, 256 * 1024 * 1024);
    assert!(sandbox.host_mount_path.starts_with(temp.path()));
}

#[tokio::test]
async fn test_agent_builds_without_api_key() {
    let context = AppContext::with_runtime(config(&[]), Arc::new(InMemoryRuntime::new()));

    let agent = context.agent().unwrap();

    assert_eq!(agent.executor().definitions().len(), 13);
}
