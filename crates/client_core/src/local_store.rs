use std::{cmp::Ordering, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use shared::domain::{SeriesId, SortDirection, SortField};
use storage::{load_json, save_json, KeyValueStore, SERIES_KEY};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    error::ClientError,
    series_api::SeriesApi,
    types::{Series, SeriesDraft, SeriesPage, SeriesQuery},
};

/// Series collection kept entirely on this machine as one serialized list
/// under [`SERIES_KEY`]. Filtering, sorting and paging mirror the server.
pub struct LocalSeriesStore {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write cycles on the stored list.
    write_lock: Mutex<()>,
}

impl LocalSeriesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn all(&self) -> Result<Vec<Series>, ClientError> {
        Ok(load_json::<Vec<Series>>(self.store.as_ref(), SERIES_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, series: &[Series]) -> Result<(), ClientError> {
        save_json(self.store.as_ref(), SERIES_KEY, series).await?;
        Ok(())
    }
}

#[async_trait]
impl SeriesApi for LocalSeriesStore {
    async fn list(&self, query: &SeriesQuery) -> Result<SeriesPage, ClientError> {
        let mut matching: Vec<Series> = self
            .all()
            .await?
            .into_iter()
            .filter(|series| query.status_filter.matches(series.status))
            .collect();
        matching.sort_by(|a, b| compare(a, b, query.sort_field, query.sort_direction));

        let size = query.size.max(1) as usize;
        let total_elements = matching.len() as u64;
        let total_pages = matching.len().div_ceil(size) as u32;
        let items = matching
            .into_iter()
            .skip(query.page as usize * size)
            .take(size)
            .collect();

        Ok(SeriesPage {
            items,
            total_pages,
            total_elements,
        })
    }

    async fn create(&self, draft: &SeriesDraft) -> Result<Series, ClientError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.all().await?;
        let created = draft.clone().into_series(SeriesId::generate(), Utc::now());
        all.push(created.clone());
        self.save(&all).await?;
        info!(series_id = %created.id, "local: series added");
        Ok(created)
    }

    async fn update(&self, series: &Series) -> Result<Series, ClientError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.all().await?;
        let slot = all
            .iter_mut()
            .find(|stored| stored.id == series.id)
            .ok_or_else(|| ClientError::NotFound(format!("series {}", series.id)))?;
        let updated = Series {
            date_added: slot.date_added,
            ..series.clone()
        };
        *slot = updated.clone();
        self.save(&all).await?;
        Ok(updated)
    }

    async fn remove(&self, id: &SeriesId) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.all().await?;
        let before = all.len();
        all.retain(|stored| &stored.id != id);
        if all.len() == before {
            return Err(ClientError::NotFound(format!("series {id}")));
        }
        self.save(&all).await?;
        info!(series_id = %id, "local: series removed");
        Ok(())
    }
}

fn compare(a: &Series, b: &Series, field: SortField, direction: SortDirection) -> Ordering {
    let ordering = match field {
        // The backend stores statuses by wire name and sorts them as text.
        SortField::Status => a.status.wire_name().cmp(b.status.wire_name()),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Genre => a.genre.to_lowercase().cmp(&b.genre.to_lowercase()),
        SortField::Rating => a.rating.cmp(&b.rating),
        SortField::CreatedAt => a.date_added.cmp(&b.date_added),
    }
    .then_with(|| a.date_added.cmp(&b.date_added));

    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
#[path = "tests/local_store_tests.rs"]
mod tests;
