use std::fs;

use scribe_stack::secrets::{
    EnvSecretProvider, FileSecretProvider, InMemorySecretProvider, SecretProvider,
    resolve_secrets,
};
use uuid::Uuid;

#[tokio::test]
async fn given_key_file_when_resolving_then_value_is_trimmed() {
    let dir = std::env::temp_dir().join(format!("scribe-secrets-test-{}", Uuid::now_v7()));
    fs::create_dir_all(&dir).expect("temp dir should exist");
    fs::write(dir.join("openai-key.txt"), "sk-from-file\n").expect("key file should be written");

    let provider = FileSecretProvider::new(&dir, "txt");
    let value = provider
        .resolve("openai-key")
        .await
        .expect("read should succeed")
        .expect("secret should be present");
    assert_eq!(value.expose(), "sk-from-file");

    let absent = provider
        .resolve("anthropic-key")
        .await
        .expect("missing file is not an error");
    assert!(absent.is_none());

    let _ = fs::remove_file(dir.join("openai-key.txt"));
    let _ = fs::remove_dir(&dir);
}

#[tokio::test]
async fn given_blank_key_file_when_resolving_then_secret_is_absent() {
    let dir = std::env::temp_dir().join(format!("scribe-secrets-test-{}", Uuid::now_v7()));
    fs::create_dir_all(&dir).expect("temp dir should exist");
    fs::write(dir.join("openai-key.txt"), "  \n").expect("key file should be written");

    let provider = FileSecretProvider::new(&dir, "txt");
    let value = provider
        .resolve("openai-key")
        .await
        .expect("read should succeed");
    assert!(value.is_none());

    let _ = fs::remove_file(dir.join("openai-key.txt"));
    let _ = fs::remove_dir(&dir);
}

#[tokio::test]
async fn given_unset_variable_when_resolving_from_env_then_secret_is_absent() {
    let provider = EnvSecretProvider::new(format!("SCRIBE_TEST_{}_", Uuid::now_v7().simple()));
    assert!(provider.variable_for("openai-key").ends_with("_OPENAI_KEY"));

    let value = provider
        .resolve("openai-key")
        .await
        .expect("unset variable is not an error");
    assert!(value.is_none());
}

#[tokio::test]
async fn given_partial_provisioning_when_resolving_many_then_only_present_secrets_are_returned() {
    let provider = InMemorySecretProvider::new()
        .with("openai-key", "sk-test")
        .with("unused-key", "ignored");

    let values = resolve_secrets(&provider, ["openai-key", "slack-webhook", "openai-key"])
        .await
        .expect("resolution should succeed");

    assert_eq!(values.len(), 1);
    assert_eq!(
        values.get("openai-key").map(|value| value.expose()),
        Some("sk-test")
    );
    assert!(values.get("slack-webhook").is_none());
    assert!(values.get("unused-key").is_none());
}
