//! OpenSearch index configuration and mappings.
//!
//! Every collection shares one custom analyzer so Russian and English text
//! is matched uniformly. Identifier fields are keywords (exact match only).

use movies_etl_shared::Collection;
use serde_json::{json, Value};

/// Name of the shared bilingual analyzer.
pub const ANALYZER_NAME: &str = "ru_en";

fn settings() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": {
                    "type": "stop",
                    "stopwords": "_english_"
                },
                "english_stemmer": {
                    "type": "stemmer",
                    "language": "english"
                },
                "english_possessive_stemmer": {
                    "type": "stemmer",
                    "language": "possessive_english"
                },
                "russian_stop": {
                    "type": "stop",
                    "stopwords": "_russian_"
                },
                "russian_stemmer": {
                    "type": "stemmer",
                    "language": "russian"
                }
            },
            "analyzer": {
                ANALYZER_NAME: {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

fn text() -> Value {
    json!({ "type": "text", "analyzer": ANALYZER_NAME })
}

fn keyword() -> Value {
    json!({ "type": "keyword" })
}

fn nested_persons() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": keyword(),
            "name": text()
        }
    })
}

fn mappings(collection: Collection) -> Value {
    let properties = match collection {
        Collection::Movies => json!({
            "id": keyword(),
            "imdb_rating": { "type": "float" },
            "genres": keyword(),
            "title": {
                "type": "text",
                "analyzer": ANALYZER_NAME,
                "fields": {
                    "raw": keyword()
                }
            },
            "description": text(),
            "directors_names": text(),
            "actors_names": text(),
            "writers_names": text(),
            "directors": nested_persons(),
            "actors": nested_persons(),
            "writers": nested_persons()
        }),
        Collection::Genres => json!({
            "id": keyword(),
            "name": text(),
            "description": text()
        }),
        Collection::Persons => json!({
            "id": keyword(),
            "full_name": text()
        }),
    };

    json!({
        "dynamic": "strict",
        "properties": properties
    })
}

/// Get the index settings and mappings for a collection.
///
/// The configuration includes:
/// - **ru_en analyzer**: lowercase, stop words and stemmers for both languages
/// - **Strict mappings**: documents with unknown fields are rejected
/// - **Keyword fields**: identifiers, genre names and the `title.raw` sort field
pub fn get_index_settings(collection: Collection) -> Value {
    json!({
        "settings": settings(),
        "mappings": mappings(collection)
    })
}
