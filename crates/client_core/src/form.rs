use std::{collections::BTreeMap, fmt};

use shared::domain::{Rating, SeriesId, WatchStatus};
use thiserror::Error;
use url::Url;

use crate::{
    mapping::status_from_label,
    types::{Series, SeriesDraft},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormField {
    Title,
    Genre,
    Status,
    Link,
    ImageLink,
    Rating,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        Self::Title,
        Self::Genre,
        Self::Status,
        Self::Link,
        Self::ImageLink,
        Self::Rating,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Genre => "genre",
            Self::Status => "status",
            Self::Link => "link",
            Self::ImageLink => "imageLink",
            Self::Rating => "rating",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field name to message. A field without an entry is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} field(s) need attention", .0.len())]
pub struct FieldErrors(BTreeMap<FormField, String>);

impl FieldErrors {
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn set(&mut self, field: FormField, outcome: Option<String>) {
        match outcome {
            Some(message) => {
                self.0.insert(field, message);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { original: Series },
}

/// What a successful submit or a cancel asks the owner of the list to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormIntent {
    /// New record; the collection assigns the id.
    Create(SeriesDraft),
    /// Existing record with the edited fields merged in.
    Update(Series),
    /// Editing ended without changes.
    Cancelled,
}

/// Raw input as typed. The rating is text so a half-typed value can be held.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub title: String,
    pub genre: String,
    pub status: WatchStatus,
    pub link: String,
    pub image_link: String,
    pub rating: String,
}

const TITLE_REQUIRED: &str = "Title is required";
const LINK_INVALID: &str = "Please enter a valid URL for the Link field.";
const IMAGE_LINK_INVALID: &str = "Please enter a valid URL for the Image Link field.";
const RATING_INVALID: &str = "Rating must be a whole number between 1 and 10";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryForm {
    mode: FormMode,
    values: FormValues,
    errors: FieldErrors,
    rating_touched: bool,
}

impl Default for EntryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryForm {
    pub fn new() -> Self {
        Self {
            mode: FormMode::Create,
            values: FormValues::default(),
            errors: FieldErrors::default(),
            rating_touched: false,
        }
    }

    pub fn edit(series: &Series) -> Self {
        let mut form = Self::new();
        form.begin_edit(series);
        form
    }

    /// Switches to editing `series`, replacing whatever was typed.
    pub fn begin_edit(&mut self, series: &Series) {
        self.values = FormValues {
            title: series.title.clone(),
            genre: series.genre.clone(),
            status: series.status,
            link: series.link.clone(),
            image_link: series.image_link.clone(),
            rating: series
                .rating
                .map(|rating| rating.value().to_string())
                .unwrap_or_default(),
        };
        self.mode = FormMode::Edit {
            original: series.clone(),
        };
        self.errors = FieldErrors::default();
        self.rating_touched = false;
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit { .. })
    }

    pub fn editing_id(&self) -> Option<&SeriesId> {
        match &self.mode {
            FormMode::Edit { original } => Some(&original.id),
            FormMode::Create => None,
        }
    }

    /// The rating input is only offered for watched series.
    pub fn rating_editable(&self) -> bool {
        self.values.status.allows_rating()
    }

    /// Updates one input and revalidates only that field.
    pub fn set_field(&mut self, field: FormField, value: &str) {
        match field {
            FormField::Title => self.values.title = value.to_string(),
            FormField::Genre => self.values.genre = value.to_string(),
            FormField::Status => {
                self.values.status = status_from_label(value);
                // The rating rule depends on the status.
                let rating_outcome = self.check(FormField::Rating);
                self.errors.set(FormField::Rating, rating_outcome);
            }
            FormField::Link => self.values.link = value.to_string(),
            FormField::ImageLink => self.values.image_link = value.to_string(),
            FormField::Rating => {
                self.values.rating = value.to_string();
                self.rating_touched = true;
            }
        }
        let outcome = self.check(field);
        self.errors.set(field, outcome);
    }

    pub fn set_status(&mut self, status: WatchStatus) {
        self.set_field(FormField::Status, status.label());
    }

    /// Validates every field. On success the form resets to an empty create
    /// form and the intent is returned; on failure nothing is emitted.
    pub fn submit(&mut self) -> Result<FormIntent, FieldErrors> {
        let mut errors = FieldErrors::default();
        for field in FormField::ALL {
            errors.set(field, self.check(field));
        }
        if !errors.is_empty() {
            self.errors = errors.clone();
            return Err(errors);
        }

        let intent = self.build_intent();
        self.reset();
        Ok(intent)
    }

    pub fn cancel(&mut self) -> FormIntent {
        self.reset();
        FormIntent::Cancelled
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn check(&self, field: FormField) -> Option<String> {
        match field {
            FormField::Title => self
                .values
                .title
                .trim()
                .is_empty()
                .then(|| TITLE_REQUIRED.to_string()),
            FormField::Link => check_url(&self.values.link, LINK_INVALID),
            FormField::ImageLink => check_url(&self.values.image_link, IMAGE_LINK_INVALID),
            FormField::Rating => {
                if !self.rating_editable() {
                    return None;
                }
                parse_rating(&self.values.rating)
                    .err()
                    .map(|()| RATING_INVALID.to_string())
            }
            FormField::Genre | FormField::Status => None,
        }
    }

    fn entered_rating(&self) -> Option<Rating> {
        if !self.rating_editable() {
            return None;
        }
        parse_rating(&self.values.rating).ok().flatten()
    }

    fn build_intent(&self) -> FormIntent {
        let values = &self.values;
        let draft = SeriesDraft {
            title: values.title.trim().to_string(),
            genre: values.genre.trim().to_string(),
            status: values.status,
            link: values.link.trim().to_string(),
            image_link: values.image_link.trim().to_string(),
            rating: self.entered_rating(),
        };

        match &self.mode {
            FormMode::Create => FormIntent::Create(draft),
            FormMode::Edit { original } => {
                let rating = if !draft.status.allows_rating() {
                    None
                } else if self.rating_touched {
                    draft.rating
                } else {
                    original.rating
                };
                FormIntent::Update(Series {
                    rating,
                    ..draft.into_series(original.id.clone(), original.date_added)
                })
            }
        }
    }
}

fn check_url(raw: &str, message: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Url::parse(trimmed).err().map(|_| message.to_string())
}

/// Empty input means "no rating".
fn parse_rating(raw: &str) -> Result<Option<Rating>, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed.parse::<i64>().map_err(|_| ())?;
    Rating::new(value).map(Some).map_err(|_| ())
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
