//! Typed records read from the relational source.

use uuid::Uuid;

/// A film work joined with all of its current genres and people.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmWork {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    /// Names of every genre linked to the film work.
    pub genres: Vec<String>,
    /// Every person linked to the film work, with the role they play in it.
    pub persons: Vec<FilmWorkPerson>,
}

/// A person participating in a film work under a given role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilmWorkPerson {
    pub id: Uuid,
    pub full_name: String,
    /// Raw role as stored in the junction table (`actor`, `writer`, `director`).
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: Uuid,
    pub full_name: String,
}
