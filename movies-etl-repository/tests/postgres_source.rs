//! Integration tests for the PostgreSQL source repository.
//!
//! These tests require a real PostgreSQL database and use SQLx test macros
//! to ensure proper test isolation and cleanup.
//!
//! Run with: `cargo test --test postgres_source`

use chrono::{DateTime, Utc};
use movies_etl_repository::{PostgresSourceRepository, SourceRepository, SourceRepositoryError};
use movies_etl_shared::{min_watermark, EntityStream};
use uuid::Uuid;

const NEW_HOPE: &str = "a0000000-0000-0000-0000-000000000001";
const EMPIRE: &str = "a0000000-0000-0000-0000-000000000002";
const STAR_TREK: &str = "a0000000-0000-0000-0000-000000000003";
const ACTION: &str = "b0000000-0000-0000-0000-000000000001";
const SCI_FI: &str = "b0000000-0000-0000-0000-000000000002";
const DOCUMENTARY: &str = "b0000000-0000-0000-0000-000000000003";
const HAMILL: &str = "c0000000-0000-0000-0000-000000000001";
const LUCAS: &str = "c0000000-0000-0000-0000-000000000002";

fn id(value: &str) -> Uuid {
    Uuid::parse_str(value).unwrap()
}

fn ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
}

// ============================================================================
// Change Detection Tests
// ============================================================================

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_modified_since_min_watermark_returns_everything(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let rows = repository
        .modified_since(EntityStream::FilmWork, min_watermark())
        .await
        .unwrap();

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![id(NEW_HOPE), id(EMPIRE), id(STAR_TREK)]);
    assert_eq!(rows[2].modified, ts("2021-06-16T20:14:11Z"));
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_modified_since_is_strictly_greater(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let rows = repository
        .modified_since(EntityStream::Genre, ts("2021-06-16T20:14:10Z"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id(DOCUMENTARY));
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_modified_since_latest_watermark_is_empty(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let rows = repository
        .modified_since(EntityStream::Person, ts("2021-06-16T20:14:11Z"))
        .await
        .unwrap();

    assert!(rows.is_empty());
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_modified_since_sees_new_updates(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool.clone());

    sqlx::query("UPDATE content.person SET full_name = $1, modified = $2 WHERE id = $3")
        .bind("Mark Richard Hamill")
        .bind(ts("2022-01-01T00:00:00Z"))
        .bind(id(HAMILL))
        .execute(&pool)
        .await
        .unwrap();

    let rows = repository
        .modified_since(EntityStream::Person, ts("2021-06-16T20:14:11Z"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id(HAMILL));
}

// ============================================================================
// Cascade Tests
// ============================================================================

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_genre_cascade_returns_distinct_film_works(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let mut ids = repository
        .film_work_ids_by_related(EntityStream::Genre, &[id(ACTION), id(SCI_FI)])
        .await
        .unwrap();
    ids.sort();

    assert_eq!(ids, vec![id(NEW_HOPE), id(EMPIRE)]);
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_person_cascade(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let ids = repository
        .film_work_ids_by_related(EntityStream::Person, &[id(LUCAS)])
        .await
        .unwrap();

    assert_eq!(ids, vec![id(NEW_HOPE)]);
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_orphan_genre_cascades_to_nothing(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let ids = repository
        .film_work_ids_by_related(EntityStream::Genre, &[id(DOCUMENTARY)])
        .await
        .unwrap();

    assert!(ids.is_empty());
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_film_work_stream_has_no_cascade(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let result = repository
        .film_work_ids_by_related(EntityStream::FilmWork, &[id(NEW_HOPE)])
        .await;

    assert!(matches!(
        result,
        Err(SourceRepositoryError::NoJunction(EntityStream::FilmWork))
    ));
}

// ============================================================================
// Enrichment Tests
// ============================================================================

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_film_works_are_joined_with_genres_and_people(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let film_works = repository.film_works(&[id(NEW_HOPE)]).await.unwrap();
    assert_eq!(film_works.len(), 1);

    let film_work = &film_works[0];
    assert_eq!(film_work.title, "Star Wars: Episode IV - A New Hope");
    assert_eq!(film_work.rating, Some(8.6));
    assert_eq!(film_work.genres, vec!["Action".to_string(), "Sci-Fi".to_string()]);

    let mut roles: Vec<(String, String)> = film_work
        .persons
        .iter()
        .map(|p| (p.full_name.clone(), p.role.clone()))
        .collect();
    roles.sort();
    assert_eq!(
        roles,
        vec![
            ("George Lucas".to_string(), "director".to_string()),
            ("George Lucas".to_string(), "writer".to_string()),
            ("Mark Hamill".to_string(), "actor".to_string()),
        ]
    );
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_film_work_without_relations_has_empty_lists(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let film_works = repository.film_works(&[id(STAR_TREK)]).await.unwrap();

    assert_eq!(film_works.len(), 1);
    assert!(film_works[0].genres.is_empty());
    assert!(film_works[0].persons.is_empty());
    assert_eq!(film_works[0].description, None);
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_film_works_null_rating(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let film_works = repository.film_works(&[id(EMPIRE)]).await.unwrap();

    assert_eq!(film_works[0].rating, None);
    assert_eq!(film_works[0].persons.len(), 2);
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_unknown_ids_are_ignored(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let film_works = repository
        .film_works(&[id(NEW_HOPE), Uuid::new_v4()])
        .await
        .unwrap();

    assert_eq!(film_works.len(), 1);
}

#[sqlx::test(migrations = "tests/migrations", fixtures("content"))]
async fn test_genres_and_persons_lookup(pool: sqlx::PgPool) {
    let repository = PostgresSourceRepository::new(pool);

    let genres = repository
        .genres(&[id(SCI_FI), id(DOCUMENTARY)])
        .await
        .unwrap();
    assert_eq!(genres.len(), 2);
    assert_eq!(genres[0].name, "Sci-Fi");
    assert_eq!(genres[0].description.as_deref(), Some("Speculative fiction."));
    assert_eq!(genres[1].name, "Documentary");

    let persons = repository.persons(&[id(HAMILL)]).await.unwrap();
    assert_eq!(persons.len(), 1);
    assert_eq!(persons[0].full_name, "Mark Hamill");
}

// ============================================================================
// Error Classification Tests
// ============================================================================

#[sqlx::test(migrations = "tests/migrations")]
async fn test_statement_timeout_is_transient(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    sqlx::query("SET statement_timeout = 50")
        .execute(&mut *conn)
        .await
        .unwrap();

    let error = sqlx::query("SELECT pg_sleep(2)")
        .execute(&mut *conn)
        .await
        .unwrap_err();

    let error = SourceRepositoryError::from(error);
    assert!(error.is_transient(), "{error}");
}
