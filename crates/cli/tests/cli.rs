use assert_cmd::Command;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("locallib-cli").unwrap();
    cmd.env("LOCALLIB_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"))
        .env_remove("LOCALLIB_ENV");
    cmd
}

#[test]
fn routes_lists_catalog_surface() {
    let output = cli().arg("routes").assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(output).unwrap();

    assert!(stdout.contains("/healthz"));
    assert!(stdout.contains("/catalog/authors"));
    assert!(stdout.contains("/catalog/bookinstance/{id}/delete"));
    assert!(stdout
        .lines()
        .any(|line| line.starts_with("POST") && line.contains("/catalog/genre/create")));
}

#[test]
fn config_reflects_environment_overrides() {
    let output = cli()
        .arg("config")
        .env("LOCALLIB_SERVER__PORT", "9090")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let config: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(config["server"]["port"], 9090);
    assert_eq!(config["database"]["endpoint"], "memory://");
}

#[test]
fn unknown_subcommand_fails() {
    cli().arg("frobnicate").assert().failure();
}
