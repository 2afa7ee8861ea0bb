//! Document processor implementation.
//!
//! Pure, synchronous shaping of relational records into the documents each
//! collection stores. Identifiers are stringified here.

use movies_etl_shared::{
    FilmWork, Genre, GenreDocument, MovieDocument, Person, PersonDocument, PersonRef, PersonRole,
};
use tracing::{debug, instrument};

use crate::extractor::{Extraction, RelatedRows};

/// Documents of a secondary stream's own changed rows.
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedDocuments {
    None,
    Genres(Vec<GenreDocument>),
    Persons(Vec<PersonDocument>),
}

impl RelatedDocuments {
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Genres(documents) => documents.len(),
            Self::Persons(documents) => documents.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Documents produced for one stream's extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedBatch {
    pub movies: Vec<MovieDocument>,
    pub related: RelatedDocuments,
}

/// Processor that transforms relational records into search documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    /// Create a new document processor.
    pub fn new() -> Self {
        Self
    }

    /// Shape every document an extraction asks to reload.
    #[instrument(skip_all, fields(stream = %extraction.stream, film_works = extraction.film_works.len()))]
    pub fn process(&self, extraction: &Extraction) -> ProcessedBatch {
        let related = match &extraction.related {
            RelatedRows::None => RelatedDocuments::None,
            RelatedRows::Genres(genres) => RelatedDocuments::Genres(self.genre_documents(genres)),
            RelatedRows::Persons(persons) => {
                RelatedDocuments::Persons(self.person_documents(persons))
            }
        };
        let movies = self.movie_documents(&extraction.film_works);

        debug!(
            movies = movies.len(),
            related = related.len(),
            "Processed extraction"
        );

        ProcessedBatch { movies, related }
    }

    pub fn movie_documents(&self, film_works: &[FilmWork]) -> Vec<MovieDocument> {
        film_works.iter().map(|fw| self.movie_document(fw)).collect()
    }

    /// Build the denormalized movie document of a film work.
    ///
    /// People are partitioned by role; each role also gets its names joined
    /// with `", "` for full-text matching. People with an unknown role are
    /// left out.
    pub fn movie_document(&self, film_work: &FilmWork) -> MovieDocument {
        let mut directors = Vec::new();
        let mut actors = Vec::new();
        let mut writers = Vec::new();

        for person in &film_work.persons {
            let person_ref = PersonRef {
                id: person.id.to_string(),
                name: person.full_name.clone(),
            };
            match PersonRole::parse(&person.role) {
                Some(PersonRole::Director) => directors.push(person_ref),
                Some(PersonRole::Actor) => actors.push(person_ref),
                Some(PersonRole::Writer) => writers.push(person_ref),
                None => debug!(
                    film_work_id = %film_work.id,
                    person_id = %person.id,
                    role = %person.role,
                    "Skipping person with unknown role"
                ),
            }
        }

        MovieDocument {
            id: film_work.id.to_string(),
            imdb_rating: film_work.rating,
            genres: film_work.genres.clone(),
            title: film_work.title.clone(),
            description: film_work.description.clone(),
            directors_names: join_names(&directors),
            actors_names: join_names(&actors),
            writers_names: join_names(&writers),
            directors,
            actors,
            writers,
        }
    }

    pub fn genre_documents(&self, genres: &[Genre]) -> Vec<GenreDocument> {
        genres
            .iter()
            .map(|genre| GenreDocument {
                id: genre.id.to_string(),
                name: genre.name.clone(),
                description: genre.description.clone(),
            })
            .collect()
    }

    pub fn person_documents(&self, persons: &[Person]) -> Vec<PersonDocument> {
        persons
            .iter()
            .map(|person| PersonDocument {
                id: person.id.to_string(),
                full_name: person.full_name.clone(),
            })
            .collect()
    }
}

fn join_names(people: &[PersonRef]) -> String {
    people
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
