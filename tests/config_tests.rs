// Configuration file handling through the public API

use aws_account_migration::config::MigrationConfig;
use tempfile::TempDir;

#[test]
fn test_saved_configuration_loads_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("aws-account-migration.toml");

    let mut config = MigrationConfig::default();
    config.aws.region = Some("us-east-1".to_string());
    config.aws.role_name = "OrganizationAccountAccessRole".to_string();
    config.invitation.notes = "Consolidating into the payer organization".to_string();
    config.observability.json_logs = true;
    config.save_to_file(&path).unwrap();

    let loaded = MigrationConfig::load(Some(&path)).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_unknown_sections_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("migration.toml");
    std::fs::write(
        &path,
        "[aws]\nrequests_per_second = 4\n\n[reporting]\nformat = \"csv\"\n",
    )
    .unwrap();

    let loaded = MigrationConfig::load(Some(&path)).unwrap();
    assert_eq!(loaded.aws.requests_per_second, 4);
    assert_eq!(loaded.aws.burst_capacity, 5);
}

#[test]
fn test_zero_attempts_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("migration.toml");
    std::fs::write(&path, "[aws]\nmax_attempts = 0\n").unwrap();

    let error = MigrationConfig::load(Some(&path)).unwrap_err();
    assert!(error.to_string().contains("max_attempts"));
}
