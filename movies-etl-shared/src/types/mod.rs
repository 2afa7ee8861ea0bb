mod change_set;
mod documents;
mod entity_stream;
mod records;

pub use change_set::{min_watermark, ChangeSet, ModifiedRow};
pub use documents::{
    Collection, GenreDocument, IndexDocument, MovieDocument, PersonDocument, PersonRef, PersonRole,
};
pub use entity_stream::EntityStream;
pub use records::{FilmWork, FilmWorkPerson, Genre, Person};
