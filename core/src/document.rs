use serde::{Deserialize, Serialize};

pub type DocId = u32;

/// Named text fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    OriginalTitle,
    Description,
    Genre,
    Cast,
    Director,
    Country,
    Year,
}

impl Field {
    /// Fields fed into the inverted index, in stream order.
    pub const INDEXED: [Field; 7] = [
        Field::Title,
        Field::OriginalTitle,
        Field::Description,
        Field::Genre,
        Field::Cast,
        Field::Director,
        Field::Country,
    ];

    /// Fields concatenated into the lexical match haystack.
    pub const SEARCHABLE: [Field; 7] = [
        Field::Title,
        Field::OriginalTitle,
        Field::Genre,
        Field::Cast,
        Field::Director,
        Field::Country,
        Field::Year,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::OriginalTitle => "original_title",
            Field::Description => "description",
            Field::Genre => "genre",
            Field::Cast => "cast",
            Field::Director => "director",
            Field::Country => "country",
            Field::Year => "year",
        }
    }

    pub fn parse(name: &str) -> Option<Field> {
        let field = match name {
            "title" => Field::Title,
            "original_title" => Field::OriginalTitle,
            "description" => Field::Description,
            "genre" => Field::Genre,
            "cast" => Field::Cast,
            "director" => Field::Director,
            "country" => Field::Country,
            "year" => Field::Year,
            _ => return None,
        };
        Some(field)
    }
}

/// One movie record as held by the record store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub cast: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>) -> Self {
        Self { id, title: title.into(), ..Self::default() }
    }

    /// Text of a field; `None` when absent. `Year` is rendered as digits.
    pub fn field_text(&self, field: Field) -> Option<String> {
        match field {
            Field::Title => Some(self.title.clone()),
            Field::OriginalTitle => self.original_title.clone(),
            Field::Description => self.description.clone(),
            Field::Genre => self.genre.clone(),
            Field::Cast => self.cast.clone(),
            Field::Director => self.director.clone(),
            Field::Country => self.country.clone(),
            Field::Year => self.year.map(|y| y.to_string()),
        }
    }

    /// (field, text) pairs handed to the inverted index.
    pub fn indexed_fields(&self) -> Vec<(Field, String)> {
        Field::INDEXED
            .iter()
            .map(|&f| (f, self.field_text(f).unwrap_or_default()))
            .collect()
    }
}
