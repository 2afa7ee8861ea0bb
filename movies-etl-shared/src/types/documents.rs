//! Document types for the search index.
//!
//! Field names are the index mapping's field names; documents are written
//! as-is with `serde`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A document stored in a search collection under its own id.
///
/// Writing the same document twice replaces it in place, which is what makes
/// repeated delivery harmless.
pub trait IndexDocument: Serialize + Send + Sync {
    /// The `_id` the document is stored under.
    fn document_id(&self) -> &str;
}

/// Target collections of the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Movies,
    Genres,
    Persons,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Movies, Self::Genres, Self::Persons];

    /// Index name of the collection.
    pub fn index_name(&self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Genres => "genre",
            Self::Persons => "person",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.index_name())
    }
}

/// Role a person plays in a film work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonRole {
    Actor,
    Writer,
    Director,
}

impl PersonRole {
    /// Parse a role as stored in the relational source. Unknown roles yield `None`.
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "actor" => Some(Self::Actor),
            "writer" => Some(Self::Writer),
            "director" => Some(Self::Director),
            _ => None,
        }
    }
}

/// A person embedded into a movie document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
}

/// Fully denormalized movie document.
///
/// Always rebuilt from a fresh join of the film work with its relations,
/// never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocument {
    pub id: String,
    pub imdb_rating: Option<f64>,
    pub genres: Vec<String>,
    pub title: String,
    pub description: Option<String>,
    pub directors_names: String,
    pub actors_names: String,
    pub writers_names: String,
    pub directors: Vec<PersonRef>,
    pub actors: Vec<PersonRef>,
    pub writers: Vec<PersonRef>,
}

impl IndexDocument for MovieDocument {
    fn document_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl IndexDocument for GenreDocument {
    fn document_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: String,
    pub full_name: String,
}

impl IndexDocument for PersonDocument {
    fn document_id(&self) -> &str {
        &self.id
    }
}
