use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Rating, SeriesId, SortDirection, SortField, StatusFilter, WatchStatus},
    protocol::ListSeriesQuery,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A tracked series in display shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub status: WatchStatus,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub image_link: String,
    #[serde(default)]
    pub rating: Option<Rating>,
    pub date_added: DateTime<Utc>,
}

impl Series {
    /// Rating as it should be shown: hidden unless the series was watched.
    pub fn visible_rating(&self) -> Option<Rating> {
        if self.status.allows_rating() {
            self.rating
        } else {
            None
        }
    }

    pub fn can_rate(&self) -> bool {
        self.status.allows_rating()
    }

    pub fn with_rating(&self, rating: Option<Rating>) -> Self {
        Self {
            rating,
            ..self.clone()
        }
    }
}

/// A series that has not been stored yet. The id and creation time are
/// assigned by whoever stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesDraft {
    pub title: String,
    pub genre: String,
    pub status: WatchStatus,
    pub link: String,
    pub image_link: String,
    pub rating: Option<Rating>,
}

impl SeriesDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn into_series(self, id: SeriesId, date_added: DateTime<Utc>) -> Series {
        Series {
            id,
            title: self.title,
            genre: self.genre,
            status: self.status,
            link: self.link,
            image_link: self.image_link,
            rating: self.rating,
            date_added,
        }
    }
}

/// Page, sort and filter parameters of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesQuery {
    pub page: u32,
    pub size: u32,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub status_filter: StatusFilter,
}

impl Default for SeriesQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
            status_filter: StatusFilter::default(),
        }
    }
}

impl SeriesQuery {
    pub fn to_wire(&self) -> ListSeriesQuery {
        ListSeriesQuery {
            page: self.page,
            size: self.size,
            sort_by: self.sort_field.as_param().to_string(),
            sort_direction: self.sort_direction.as_param().to_string(),
            status: self.status_filter.as_query_value().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesPage {
    pub items: Vec<Series>,
    pub total_pages: u32,
    pub total_elements: u64,
}
