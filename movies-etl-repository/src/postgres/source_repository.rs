//! PostgreSQL implementation of the source repository.
//!
//! All queries are read-only and parameterised. Id lists are bound as a single
//! `uuid[]` parameter; table names only ever come from [`EntityStream`].
//!
//! ## Database Tables
//!
//! - `content.film_work`, `content.genre`, `content.person`: entity tables with a `modified` column
//! - `content.genre_film_work`, `content.person_film_work`: junctions to film works

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use movies_etl_shared::{EntityStream, FilmWork, FilmWorkPerson, Genre, ModifiedRow, Person};
use serde::Deserialize;
use sqlx::types::Json;
use uuid::Uuid;

use crate::errors::SourceRepositoryError;
use crate::interfaces::SourceRepository;

const SCHEMA: &str = "content";

#[derive(sqlx::FromRow)]
struct ModifiedRecord {
    id: Uuid,
    modified: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct FilmWorkRecord {
    id: Uuid,
    title: String,
    description: Option<String>,
    rating: Option<f64>,
    persons: Json<Vec<PersonRoleRecord>>,
    genres: Vec<String>,
}

#[derive(Deserialize)]
struct PersonRoleRecord {
    person_id: Uuid,
    person_name: String,
    person_role: String,
}

#[derive(sqlx::FromRow)]
struct GenreRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PersonRecord {
    id: Uuid,
    full_name: String,
}

impl From<FilmWorkRecord> for FilmWork {
    fn from(record: FilmWorkRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            rating: record.rating,
            genres: record.genres,
            persons: record
                .persons
                .0
                .into_iter()
                .map(|p| FilmWorkPerson {
                    id: p.person_id,
                    full_name: p.person_name,
                    role: p.person_role,
                })
                .collect(),
        }
    }
}

/// PostgreSQL-backed source repository.
///
/// Holds a long-lived connection pool shared across passes.
pub struct PostgresSourceRepository {
    pool: sqlx::PgPool,
}

impl PostgresSourceRepository {
    /// Creates a new source repository on top of a configured pool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    fn modified_since_query(stream: EntityStream) -> String {
        format!(
            "SELECT id, modified FROM {SCHEMA}.{table} WHERE modified > $1 ORDER BY modified, id",
            table = stream.table()
        )
    }

    fn film_work_ids_query(stream: EntityStream) -> Result<String, SourceRepositoryError> {
        let junction = stream
            .junction_table()
            .ok_or(SourceRepositoryError::NoJunction(stream))?;
        Ok(format!(
            "SELECT DISTINCT rel.film_work_id FROM {SCHEMA}.{junction} rel WHERE rel.{column}_id = ANY($1)",
            column = stream.table()
        ))
    }

    fn film_works_query() -> String {
        format!(
            r#"
            SELECT
                fw.id,
                fw.title,
                fw.description,
                fw.rating::float8 AS rating,
                COALESCE(
                    json_agg(
                        DISTINCT jsonb_build_object(
                            'person_role', pfw.role,
                            'person_id', p.id,
                            'person_name', p.full_name
                        )
                    ) FILTER (WHERE p.id IS NOT NULL),
                    '[]'
                ) AS persons,
                COALESCE(
                    array_agg(DISTINCT g.name) FILTER (WHERE g.id IS NOT NULL),
                    '{{}}'
                ) AS genres
            FROM {SCHEMA}.film_work fw
            LEFT JOIN {SCHEMA}.person_film_work pfw ON pfw.film_work_id = fw.id
            LEFT JOIN {SCHEMA}.person p ON p.id = pfw.person_id
            LEFT JOIN {SCHEMA}.genre_film_work gfw ON gfw.film_work_id = fw.id
            LEFT JOIN {SCHEMA}.genre g ON g.id = gfw.genre_id
            WHERE fw.id = ANY($1)
            GROUP BY fw.id
            ORDER BY fw.modified
            "#
        )
    }
}

#[async_trait]
impl SourceRepository for PostgresSourceRepository {
    async fn modified_since(
        &self,
        stream: EntityStream,
        since: DateTime<Utc>,
    ) -> Result<Vec<ModifiedRow>, SourceRepositoryError> {
        let rows = sqlx::query_as::<_, ModifiedRecord>(&Self::modified_since_query(stream))
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ModifiedRow::new(row.id, row.modified))
            .collect())
    }

    async fn film_work_ids_by_related(
        &self,
        stream: EntityStream,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, SourceRepositoryError> {
        let query = Self::film_work_ids_query(stream)?;
        let film_work_ids = sqlx::query_scalar::<_, Uuid>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(film_work_ids)
    }

    async fn film_works(&self, ids: &[Uuid]) -> Result<Vec<FilmWork>, SourceRepositoryError> {
        let rows = sqlx::query_as::<_, FilmWorkRecord>(&Self::film_works_query())
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(FilmWork::from).collect())
    }

    async fn genres(&self, ids: &[Uuid]) -> Result<Vec<Genre>, SourceRepositoryError> {
        let rows = sqlx::query_as::<_, GenreRecord>(&format!(
            "SELECT id, name, description FROM {SCHEMA}.genre WHERE id = ANY($1) ORDER BY modified"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Genre {
                id: row.id,
                name: row.name,
                description: row.description,
            })
            .collect())
    }

    async fn persons(&self, ids: &[Uuid]) -> Result<Vec<Person>, SourceRepositoryError> {
        let rows = sqlx::query_as::<_, PersonRecord>(&format!(
            "SELECT id, full_name FROM {SCHEMA}.person WHERE id = ANY($1) ORDER BY modified"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Person {
                id: row.id,
                full_name: row.full_name,
            })
            .collect())
    }
}
