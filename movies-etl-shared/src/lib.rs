//! # Movies ETL Shared
//!
//! Shared types for the movies ETL pipeline: the entity streams tracked in
//! the relational source, change-sets, typed relational records and the
//! documents written to the search index.

pub mod types;

pub use types::{
    min_watermark, ChangeSet, Collection, EntityStream, FilmWork, FilmWorkPerson, Genre,
    GenreDocument, IndexDocument, ModifiedRow, MovieDocument, Person, PersonDocument, PersonRef,
    PersonRole,
};
