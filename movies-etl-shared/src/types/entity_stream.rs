//! Entity streams of the relational source.

use std::fmt;

/// One independently-changing entity table of the relational source.
///
/// Every stream carries its own watermark. `FilmWork` is the primary stream:
/// its rows are the composite documents. `Genre` and `Person` are secondary
/// streams whose changes cascade into every film work embedding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityStream {
    FilmWork,
    Genre,
    Person,
}

impl EntityStream {
    /// All streams in the order a pass processes them.
    pub const ALL: [EntityStream; 3] = [Self::FilmWork, Self::Genre, Self::Person];

    /// Name of the entity table backing this stream.
    pub fn table(&self) -> &'static str {
        match self {
            Self::FilmWork => "film_work",
            Self::Genre => "genre",
            Self::Person => "person",
        }
    }

    /// Key under which the stream's watermark is checkpointed.
    pub fn checkpoint_key(&self) -> &'static str {
        match self {
            Self::FilmWork => "film_work_modified",
            Self::Genre => "genre_modified",
            Self::Person => "person_modified",
        }
    }

    /// Junction table linking this stream's rows to film works.
    ///
    /// `None` for the primary stream, which needs no cascade.
    pub fn junction_table(&self) -> Option<&'static str> {
        match self {
            Self::FilmWork => None,
            Self::Genre => Some("genre_film_work"),
            Self::Person => Some("person_film_work"),
        }
    }
}

impl fmt::Display for EntityStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}
