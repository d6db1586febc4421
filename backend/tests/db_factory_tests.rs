//! Backend selection from the `[repository]` config section.

use std::str::FromStr;

use drivingschool::db::factory::{RepositoryFactory, RepositoryType};
use drivingschool::db::{PostgresSettings, RepositorySettings, UserRepository};

#[test]
fn test_repository_type_from_str_postgres() {
    let rt = RepositoryType::from_str("postgres").unwrap();
    assert_eq!(rt, RepositoryType::Postgres);

    let rt = RepositoryType::from_str("POSTGRES").unwrap();
    assert_eq!(rt, RepositoryType::Postgres);

    let rt = RepositoryType::from_str("pg").unwrap();
    assert_eq!(rt, RepositoryType::Postgres);
}

#[test]
fn test_repository_type_from_str_local() {
    let rt = RepositoryType::from_str("local").unwrap();
    assert_eq!(rt, RepositoryType::Local);

    let rt = RepositoryType::from_str("LOCAL").unwrap();
    assert_eq!(rt, RepositoryType::Local);
}

#[test]
fn test_repository_type_from_str_invalid() {
    let result = RepositoryType::from_str("sqlite");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[tokio::test]
async fn test_create_local_is_healthy() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None)
        .await
        .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_from_settings_local() {
    let repo = RepositoryFactory::from_settings(
        &RepositorySettings::default(),
        &PostgresSettings::default(),
    )
    .await
    .unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_from_settings_rejects_unknown_type() {
    let settings = RepositorySettings {
        repo_type: "mongo".to_string(),
    };
    let err = RepositoryFactory::from_settings(&settings, &PostgresSettings::default())
        .await
        .err()
        .unwrap();
    assert!(err.message().contains("Invalid repository type"));
}

#[tokio::test]
async fn test_from_settings_postgres_requires_url() {
    let settings = RepositorySettings {
        repo_type: "postgres".to_string(),
    };
    let err = RepositoryFactory::from_settings(&settings, &PostgresSettings::default())
        .await
        .err()
        .unwrap();
    assert!(!err.is_retryable());
}
