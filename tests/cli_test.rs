//! CLI-level tests: subcommand behavior and exit codes through the binary.

mod support;

use predicates::prelude::*;
use support::{assert_failure, assert_success, stderr, stdout, Test};

#[test]
fn test_help_lists_subcommands() {
    let t = Test::new();

    t.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("keygen").and(predicate::str::contains("vault")));
}

#[test]
fn test_keygen_prints_public_key() {
    let t = Test::new();

    let output = t.run(&["keygen"]);

    assert_success(&output);
    assert!(stdout(&output).contains("age1"));
    assert!(t
        .home
        .path()
        .join(".warren")
        .join("identity.key")
        .exists());
}

#[test]
fn test_keygen_refuses_overwrite_without_force() {
    let t = Test::with_identity();

    assert_failure(&t.run(&["keygen"]));
    assert_success(&t.run(&["keygen", "--force"]));
}

#[test]
fn test_set_get_roundtrip() {
    let t = Test::new();

    assert_success(&t.run(&["set", "DATABASE_URL", "postgres://localhost/db"]));

    let output = t.run(&["get", "DATABASE_URL"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "postgres://localhost/db");
}

#[test]
fn test_set_encrypted_and_get() {
    let t = Test::with_identity();

    assert_success(&t.run(&["set", "API_KEY", "sk-test-12345", "--encrypt"]));

    // On disk: sealed, never plaintext.
    let record = t.read_record();
    assert!(record.contains("API_KEY=enc:age:"));
    assert!(!record.contains("sk-test-12345"));

    let output = t.run(&["get", "API_KEY"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "sk-test-12345");
}

#[test]
fn test_set_encrypted_without_identity_fails() {
    let t = Test::new();

    let output = t.run(&["set", "API_KEY", "v", "--encrypt"]);

    assert_failure(&output);
    assert!(stderr(&output).contains("identity"));
}

#[test]
fn test_get_missing_key_exits_nonzero() {
    let t = Test::new();
    t.write_record("A=1\n");

    let output = t.run(&["get", "NOPE"]);

    assert_failure(&output);
    assert!(stderr(&output).contains("secret not found"));
}

#[test]
fn test_rm_preserves_other_lines() {
    let t = Test::new();
    t.write_record("# comment\nA=1\nB=2\n");

    assert_success(&t.run(&["rm", "A"]));

    assert_eq!(t.read_record(), "# comment\nB=2\n");
}

#[test]
fn test_keys_lists_record_keys() {
    let t = Test::new();
    t.write_record("A=1\n_PRIVATE=x\nB=2\n");

    let output = t.run(&["keys"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("A"));
    assert!(out.contains("B"));
    assert!(!out.contains("_PRIVATE"));
}

#[test]
fn test_keys_json_output() {
    let t = Test::new();
    t.write_record("A=1\nB=2\n");

    let output = t.run(&["keys", "--json"]);
    assert_success(&output);

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed["keys"], serde_json::json!(["A", "B"]));
}

#[test]
fn test_parse_error_reports_line() {
    let t = Test::new();
    t.write_record("A=1\nBOGUS LINE\n");

    let output = t.run(&["get", "A"]);

    assert_failure(&output);
    assert!(stderr(&output).contains("line 2"));
}

#[cfg(unix)]
#[test]
fn test_run_injects_secrets_and_mirrors_exit_code() {
    let t = Test::new();
    t.write_record("INJECTED_BY_WARREN=hello\n");

    let output = t.run(&["run", "--", "sh", "-c", "test \"$INJECTED_BY_WARREN\" = hello"]);
    assert_success(&output);

    let output = t.run(&["run", "--", "sh", "-c", "exit 7"]);
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn test_vault_set_get_rm_list() {
    let t = Test::with_identity();

    assert_success(&t.run(&["vault", "set", "GLOBAL_DB", "postgres://db"]));

    let output = t.run(&["vault", "get", "GLOBAL_DB"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "postgres://db");

    let output = t.run(&["vault", "list"]);
    assert_success(&output);
    assert!(stdout(&output).contains("GLOBAL_DB"));

    assert_success(&t.run(&["vault", "rm", "GLOBAL_DB"]));
    assert_failure(&t.run(&["vault", "get", "GLOBAL_DB"]));
}

#[test]
fn test_vault_reference_resolves_through_vault() {
    let t = Test::with_identity();
    t.write_record("DB=vault:GLOBAL_DB\n");

    // Dangling reference is a vault error, not "secret not found".
    let output = t.run(&["get", "DB"]);
    assert_failure(&output);
    assert!(stderr(&output).contains("vault key not found"));

    assert_success(&t.run(&["vault", "set", "GLOBAL_DB", "postgres://db"]));

    let output = t.run(&["get", "DB"]);
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "postgres://db");
}

#[test]
fn test_identity_env_override_decrypts() {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let t = Test::with_identity();
    assert_success(&t.run(&["set", "SECRET", "covert", "--encrypt"]));

    // Move the identity out of the default path and hand it over via env.
    let key_path = t.home.path().join(".warren").join("identity.key");
    let raw = std::fs::read_to_string(&key_path).unwrap();
    std::fs::remove_file(&key_path).unwrap();

    assert_failure(&t.run(&["get", "SECRET"]));

    let output = t
        .cmd()
        .env("WARREN_IDENTITY", STANDARD.encode(raw.trim()))
        .args(["get", "SECRET"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "covert");
}

#[test]
fn test_vault_set_with_env_identity_on_fresh_home() {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let t = Test::new();

    // Identity handed over via env only; the home has no .warren yet, so
    // the first vault mutation has to create it itself.
    let scratch = tempfile::TempDir::new().unwrap();
    let ids = warren::IdentityStore::with_root(scratch.path());
    ids.persist(&warren::Identity::generate()).unwrap();
    let raw = std::fs::read_to_string(ids.identity_path().unwrap()).unwrap();
    let encoded = STANDARD.encode(raw.trim());

    let output = t
        .cmd()
        .env("WARREN_IDENTITY", &encoded)
        .args(["vault", "set", "GLOBAL_DB", "postgres://db"])
        .output()
        .unwrap();
    assert_success(&output);

    let output = t
        .cmd()
        .env("WARREN_IDENTITY", &encoded)
        .args(["vault", "get", "GLOBAL_DB"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "postgres://db");
}

#[test]
fn test_set_rejects_multiline_value() {
    let t = Test::new();
    t.write_record("A=1\n");

    let output = t.run(&["set", "K", "x\nA=evil"]);

    assert_failure(&output);
    assert_eq!(t.read_record(), "A=1\n");
    assert_success(&t.run(&["get", "A"]));
}

#[test]
fn test_identity_env_override_rejects_urlsafe_base64() {
    let t = Test::with_identity();
    assert_success(&t.run(&["set", "SECRET", "covert", "--encrypt"]));

    // URL-safe characters must be rejected by the strict alphabet check;
    // the default identity on disk still resolves the secret.
    let output = t
        .cmd()
        .env("WARREN_IDENTITY", "abc-_def")
        .args(["get", "SECRET"])
        .output()
        .unwrap();
    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "covert");
}
