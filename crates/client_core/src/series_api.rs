use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use shared::{domain::SeriesId, protocol::{SeriesDto, SeriesPageResponse}};
use tracing::{error, info};

use crate::{
    error::ClientError,
    mapping::{draft_to_wire, series_from_wire, series_to_wire},
    transport::AuthTransport,
    types::{Series, SeriesDraft, SeriesPage, SeriesQuery},
};

const SERIES_PATH: &str = "/api/series";

/// The series collection, remote or local.
#[async_trait]
pub trait SeriesApi: Send + Sync {
    async fn list(&self, query: &SeriesQuery) -> Result<SeriesPage, ClientError>;
    async fn create(&self, draft: &SeriesDraft) -> Result<Series, ClientError>;
    async fn update(&self, series: &Series) -> Result<Series, ClientError>;
    async fn remove(&self, id: &SeriesId) -> Result<(), ClientError>;
}

/// Rejects ids the server never issued.
pub(crate) fn ensure_server_id(id: &SeriesId) -> Result<(), ClientError> {
    if id.is_placeholder() || id.as_str().trim().is_empty() {
        return Err(ClientError::Validation(format!(
            "series '{id}' has no server identifier yet; reload the list and retry"
        )));
    }
    Ok(())
}

pub struct HttpSeriesApi {
    transport: Arc<AuthTransport>,
}

impl HttpSeriesApi {
    pub fn new(transport: Arc<AuthTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl SeriesApi for HttpSeriesApi {
    async fn list(&self, query: &SeriesQuery) -> Result<SeriesPage, ClientError> {
        let wire_query = query.to_wire();
        info!(
            page = wire_query.page,
            size = wire_query.size,
            sort_by = wire_query.sort_by.as_str(),
            sort_direction = wire_query.sort_direction.as_str(),
            status = wire_query.status.as_str(),
            "series: fetching page"
        );
        let request = self
            .transport
            .authorized(Method::GET, SERIES_PATH)
            .await?
            .query(&wire_query);
        let response: SeriesPageResponse = self
            .transport
            .send_json(request)
            .await
            .inspect_err(|err| error!("series: list failed: {err}"))?;

        let now = Utc::now();
        Ok(SeriesPage {
            items: response
                .series
                .into_iter()
                .map(|dto| series_from_wire(dto, now))
                .collect(),
            total_pages: response.total_pages,
            total_elements: response.total_elements,
        })
    }

    async fn create(&self, draft: &SeriesDraft) -> Result<Series, ClientError> {
        let request = self
            .transport
            .authorized(Method::POST, SERIES_PATH)
            .await?
            .json(&draft_to_wire(draft));
        let created: SeriesDto = self
            .transport
            .send_json(request)
            .await
            .inspect_err(|err| error!("series: create failed: {err}"))?;
        let created = series_from_wire(created, Utc::now());
        info!(series_id = %created.id, "series: created");
        Ok(created)
    }

    async fn update(&self, series: &Series) -> Result<Series, ClientError> {
        ensure_server_id(&series.id)?;
        let request = self
            .transport
            .authorized(Method::PUT, &format!("{SERIES_PATH}/{}", series.id))
            .await?
            .json(&series_to_wire(series));
        let updated: SeriesDto = self
            .transport
            .send_json(request)
            .await
            .inspect_err(|err| error!(series_id = %series.id, "series: update failed: {err}"))?;
        Ok(series_from_wire(updated, series.date_added))
    }

    async fn remove(&self, id: &SeriesId) -> Result<(), ClientError> {
        ensure_server_id(id)?;
        let request = self
            .transport
            .authorized(Method::DELETE, &format!("{SERIES_PATH}/{id}"))
            .await?;
        self.transport
            .send(request)
            .await
            .inspect_err(|err| error!(series_id = %id, "series: delete failed: {err}"))?;
        info!(series_id = %id, "series: deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/series_api_tests.rs"]
mod tests;
