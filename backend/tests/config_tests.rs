//! Configuration loading: file parsing, environment overrides and validation.

mod support;

use std::io::Write;
use std::path::PathBuf;

use drivingschool::config::{AppConfig, ConfigError, MailTransport};
use drivingschool::db::RepositoryType;

/// Every variable `AppConfig::load` consults, cleared.
const CLEAN_ENV: &[(&str, Option<&str>)] = &[
    ("DRIVINGSCHOOL_CONFIG", None),
    ("HOST", None),
    ("PORT", None),
    ("STATIC_DIR", None),
    ("REPOSITORY_TYPE", None),
    ("DATABASE_URL", None),
    ("PG_DATABASE_URL", None),
    ("PG_POOL_MAX", None),
    ("SMTP_HOST", None),
    ("SMTP_PORT", None),
    ("SMTP_USERNAME", None),
    ("SMTP_PASSWORD", None),
    ("MAIL_FROM", None),
    ("UPLOAD_DIR", None),
    ("ADMIN_EMAIL", None),
    ("ADMIN_PASSWORD", None),
];

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn env_with<'a>(extra: &[(&'a str, Option<&'a str>)]) -> Vec<(&'a str, Option<&'a str>)> {
    let mut env: Vec<_> = CLEAN_ENV
        .iter()
        .filter(|(k, _)| !extra.iter().any(|(e, _)| e == k))
        .copied()
        .collect();
    env.extend_from_slice(extra);
    env
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[server]
port = 9000

[school]
name = "Northside Driving"
"#,
    );
    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.school.name, "Northside Driving");
    assert_eq!(config.mail.transport, MailTransport::Log);
    assert_eq!(config.auth.session_ttl_hours, 24);
    assert!(config.auth.admin_email.is_none());
}

#[test]
fn test_bundled_sample_config_parses() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("drivingschool.toml");
    let config = AppConfig::from_file(path).unwrap();
    assert_eq!(config.repository_type().unwrap(), RepositoryType::Local);
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_file_is_a_parse_error() {
    let file = write_config("[server\nport = ");
    let err = AppConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_missing_file_is_a_read_error() {
    let err = AppConfig::from_file("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_load_applies_env_overrides() {
    let file = write_config("[server]\nport = 9000\n");
    let path = file.path().to_string_lossy().into_owned();
    let env = env_with(&[
        ("DRIVINGSCHOOL_CONFIG", Some(path.as_str())),
        ("PORT", Some("7070")),
        ("UPLOAD_DIR", Some("/var/lib/school/uploads")),
        ("ADMIN_EMAIL", Some("root@example.com")),
        ("ADMIN_PASSWORD", Some("super-secret")),
        ("SMTP_HOST", Some("smtp.example.com")),
    ]);

    support::with_scoped_env(&env, || {
        let config = AppConfig::load().unwrap();
        assert_eq!(config.server.port, 7070);
        assert_eq!(
            config.uploads.dir,
            PathBuf::from("/var/lib/school/uploads")
        );
        assert_eq!(config.auth.admin_email.as_deref(), Some("root@example.com"));
        assert_eq!(config.auth.admin_password.as_deref(), Some("super-secret"));
        assert_eq!(config.mail.transport, MailTransport::Smtp);
        assert_eq!(config.mail.smtp_host, "smtp.example.com");
    });
}

#[test]
fn test_database_url_selects_postgres() {
    let file = write_config("");
    let path = file.path().to_string_lossy().into_owned();
    let env = env_with(&[
        ("DRIVINGSCHOOL_CONFIG", Some(path.as_str())),
        ("DATABASE_URL", Some("postgres://school@localhost/school")),
        ("PG_POOL_MAX", Some("4")),
    ]);

    support::with_scoped_env(&env, || {
        let config = AppConfig::load().unwrap();
        assert_eq!(config.repository_type().unwrap(), RepositoryType::Postgres);
        assert_eq!(
            config.postgres.database_url,
            "postgres://school@localhost/school"
        );
        assert_eq!(config.postgres.max_connections, 4);
    });
}

#[test]
fn test_unparseable_numeric_override_is_ignored() {
    let file = write_config("[server]\nport = 9000\n");
    let path = file.path().to_string_lossy().into_owned();
    let env = env_with(&[
        ("DRIVINGSCHOOL_CONFIG", Some(path.as_str())),
        ("PORT", Some("not-a-port")),
    ]);

    support::with_scoped_env(&env, || {
        assert_eq!(AppConfig::load().unwrap().server.port, 9000);
    });
}

#[test]
fn test_validation_failures() {
    let mut config = AppConfig::default();
    config.repository.repo_type = "mongo".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = AppConfig::default();
    config.mail.transport = MailTransport::Smtp;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = AppConfig::default();
    config.auth.otp_ttl_minutes = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = AppConfig::default();
    config.auth.session_ttl_hours = i64::MAX / 2;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let file = write_config("[repository]\ntype = \"mongo\"\n");
    let path = file.path().to_string_lossy().into_owned();
    let env = env_with(&[("DRIVINGSCHOOL_CONFIG", Some(path.as_str()))]);
    support::with_scoped_env(&env, || {
        assert!(AppConfig::load().is_err());
    });
}
