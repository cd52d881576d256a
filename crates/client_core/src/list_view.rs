//! Paginated, sorted and filtered view over a series collection.
//!
//! [`ListView`] is plain state: every parameter change hands out a
//! [`FetchTicket`] numbered from a monotonically increasing sequence, and
//! only the completion carrying the latest number is applied. Older
//! completions are dropped, so a slow response can never overwrite a newer
//! one. [`ListController`] drives a `ListView` against a [`SeriesApi`].

use std::sync::Arc;

use shared::domain::{Rating, SeriesId, SortDirection, SortField, StatusFilter};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    error::ClientError,
    form::FormIntent,
    series_api::SeriesApi,
    types::{Series, SeriesDraft, SeriesPage, SeriesQuery},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub total_pages: u32,
    pub total_elements: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: SeriesQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer fetch was issued after this one; its result was ignored.
    Discarded,
    /// The requested page no longer exists; fetch this instead.
    Retry(FetchTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Load,
    Add,
    Remove,
    Rate,
    Update,
}

impl ListAction {
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Load => "Failed to load TV series. Please try again later.",
            Self::Add => "Failed to add TV series. Please try again later.",
            Self::Remove => "Failed to remove TV series. Please try again later.",
            Self::Rate => "Failed to update rating. Please try again later.",
            Self::Update => "Failed to update TV series. Please try again later.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Page(u32),
    NextPage,
    PreviousPage,
    PageSize(u32),
    Sort(SortField, SortDirection),
    SortField(SortField),
    ToggleSortDirection,
    StatusFilter(StatusFilter),
}

#[derive(Debug, Clone)]
pub struct ListView {
    query: SeriesQuery,
    pagination: Pagination,
    items: Vec<Series>,
    status: ListStatus,
    banner: Option<String>,
    latest_seq: u64,
    loaded: bool,
    session_trigger: Option<u64>,
}

impl Default for ListView {
    fn default() -> Self {
        Self::new(SeriesQuery::default())
    }
}

impl ListView {
    pub fn new(query: SeriesQuery) -> Self {
        Self {
            query,
            pagination: Pagination::default(),
            items: Vec::new(),
            status: ListStatus::Idle,
            banner: None,
            latest_seq: 0,
            loaded: false,
            session_trigger: None,
        }
    }

    pub fn query(&self) -> &SeriesQuery {
        &self.query
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn items(&self) -> &[Series] {
        &self.items
    }

    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    /// Dismissible message for the last failure, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == ListStatus::Loading
    }

    /// Loaded successfully but nothing matched. Not an error.
    pub fn is_empty(&self) -> bool {
        self.status == ListStatus::Ready && self.items.is_empty()
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn find(&self, id: &SeriesId) -> Option<&Series> {
        self.items.iter().find(|series| &series.id == id)
    }

    pub fn has_next_page(&self) -> bool {
        self.query.page + 1 < self.pagination.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.query.page > 0
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Applies a parameter change. Returns the fetch to run when anything
    /// actually changed.
    pub fn apply(&mut self, change: ListChange) -> Option<FetchTicket> {
        match change {
            ListChange::Page(page) => self.set_page(page),
            ListChange::NextPage => self.set_page(self.query.page.saturating_add(1)),
            ListChange::PreviousPage => self.set_page(self.query.page.saturating_sub(1)),
            ListChange::PageSize(size) => self.set_page_size(size),
            ListChange::Sort(field, direction) => self.set_sort(field, direction),
            ListChange::SortField(field) => self.set_sort(field, self.query.sort_direction),
            ListChange::ToggleSortDirection => {
                self.set_sort(self.query.sort_field, self.query.sort_direction.toggled())
            }
            ListChange::StatusFilter(filter) => self.set_status_filter(filter),
        }
    }

    /// Moves to `page`, clamped into `[0, total_pages)` once totals are known.
    pub fn set_page(&mut self, page: u32) -> Option<FetchTicket> {
        let page = self.clamp_page(page);
        if page == self.query.page {
            return None;
        }
        self.query.page = page;
        Some(self.begin_fetch())
    }

    pub fn set_page_size(&mut self, size: u32) -> Option<FetchTicket> {
        let size = size.max(1);
        if size == self.query.size {
            return None;
        }
        self.query.size = size;
        self.query.page = 0;
        Some(self.begin_fetch())
    }

    pub fn set_sort(&mut self, field: SortField, direction: SortDirection) -> Option<FetchTicket> {
        if field == self.query.sort_field && direction == self.query.sort_direction {
            return None;
        }
        self.query.sort_field = field;
        self.query.sort_direction = direction;
        self.query.page = 0;
        Some(self.begin_fetch())
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) -> Option<FetchTicket> {
        if filter == self.query.status_filter {
            return None;
        }
        self.query.status_filter = filter;
        self.query.page = 0;
        Some(self.begin_fetch())
    }

    /// Reloads when the session trigger moved since the last sync.
    pub fn sync_session(&mut self, trigger: u64) -> Option<FetchTicket> {
        if self.session_trigger == Some(trigger) {
            return None;
        }
        self.session_trigger = Some(trigger);
        Some(self.begin_fetch())
    }

    /// Unconditional reload of the current parameters.
    pub fn refresh(&mut self) -> FetchTicket {
        self.begin_fetch()
    }

    fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_seq += 1;
        self.status = ListStatus::Loading;
        FetchTicket {
            seq: self.latest_seq,
            query: self.query,
        }
    }

    fn clamp_page(&self, page: u32) -> u32 {
        if !self.loaded {
            return page;
        }
        page.min(self.pagination.total_pages.saturating_sub(1))
    }

    /// Applies the outcome of `ticket` if it is still the latest fetch.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        outcome: Result<SeriesPage, ClientError>,
    ) -> Completion {
        if ticket.seq != self.latest_seq {
            debug!(
                seq = ticket.seq,
                latest = self.latest_seq,
                page = ticket.query.page,
                "list: discarding stale response"
            );
            return Completion::Discarded;
        }

        match outcome {
            Ok(page) => {
                self.loaded = true;
                self.pagination = Pagination {
                    total_pages: page.total_pages,
                    total_elements: page.total_elements,
                };
                let clamped = self.clamp_page(self.query.page);
                if clamped != self.query.page {
                    info!(
                        requested = self.query.page,
                        total_pages = page.total_pages,
                        "list: page out of range; moving to last page"
                    );
                    self.query.page = clamped;
                    return Completion::Retry(self.begin_fetch());
                }
                self.items = page.items;
                self.status = ListStatus::Ready;
                self.banner = None;
                Completion::Applied
            }
            Err(err) => {
                warn!(seq = ticket.seq, "list: fetch failed: {err}");
                let message = ListAction::Load.failure_message().to_string();
                self.status = ListStatus::Error(message.clone());
                self.banner = Some(message);
                Completion::Applied
            }
        }
    }

    /// Records a failed mutation. Loaded items stay untouched.
    pub fn record_failure(&mut self, action: ListAction) {
        self.banner = Some(action.failure_message().to_string());
        if self.status == ListStatus::Loading {
            self.status = if self.loaded {
                ListStatus::Ready
            } else {
                ListStatus::Idle
            };
        }
    }
}

/// Runs a [`ListView`] against a collection. The view lock is never held
/// while a request is in flight, so parameter changes made meanwhile win.
pub struct ListController {
    api: Arc<dyn SeriesApi>,
    view: Mutex<ListView>,
}

impl ListController {
    pub fn new(api: Arc<dyn SeriesApi>, query: SeriesQuery) -> Self {
        Self {
            api,
            view: Mutex::new(ListView::new(query)),
        }
    }

    pub async fn snapshot(&self) -> ListView {
        self.view.lock().await.clone()
    }

    pub async fn reload(&self) -> ListView {
        let ticket = self.view.lock().await.refresh();
        self.run(ticket).await
    }

    pub async fn change(&self, change: ListChange) -> ListView {
        let ticket = self.view.lock().await.apply(change);
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => self.snapshot().await,
        }
    }

    /// Front ends call this with `SessionState::trigger` after every session
    /// change; a new trigger value reloads the current query.
    pub async fn sync_session(&self, trigger: u64) -> ListView {
        let ticket = self.view.lock().await.sync_session(trigger);
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => self.snapshot().await,
        }
    }

    pub async fn dismiss_banner(&self) {
        self.view.lock().await.dismiss_banner();
    }

    async fn run(&self, mut ticket: FetchTicket) -> ListView {
        loop {
            let outcome = self.api.list(&ticket.query).await;
            let mut view = self.view.lock().await;
            match view.complete(&ticket, outcome) {
                Completion::Retry(next) => ticket = next,
                Completion::Applied | Completion::Discarded => return view.clone(),
            }
        }
    }

    pub async fn add(&self, draft: &SeriesDraft) -> Result<Series, ClientError> {
        match self.api.create(draft).await {
            Ok(created) => {
                self.reload().await;
                Ok(created)
            }
            Err(err) => Err(self.fail(ListAction::Add, err).await),
        }
    }

    pub async fn update(&self, series: &Series) -> Result<Series, ClientError> {
        match self.api.update(series).await {
            Ok(updated) => {
                self.reload().await;
                Ok(updated)
            }
            Err(err) => Err(self.fail(ListAction::Update, err).await),
        }
    }

    pub async fn remove(&self, id: &SeriesId) -> Result<(), ClientError> {
        match self.api.remove(id).await {
            Ok(()) => {
                self.reload().await;
                Ok(())
            }
            Err(err) => Err(self.fail(ListAction::Remove, err).await),
        }
    }

    /// Rates a series on the current page. Only watched series take a
    /// rating; anything else is rejected before a request is made.
    pub async fn rate(&self, id: &SeriesId, rating: Rating) -> Result<Series, ClientError> {
        let target = self.view.lock().await.find(id).cloned();
        let Some(target) = target else {
            return Err(ClientError::NotFound(format!(
                "series {id} is not on the current page"
            )));
        };
        if !target.can_rate() {
            return Err(ClientError::Validation(format!(
                "'{}' is {}; only watched series can be rated",
                target.title, target.status
            )));
        }

        match self.api.update(&target.with_rating(Some(rating))).await {
            Ok(updated) => {
                self.reload().await;
                Ok(updated)
            }
            Err(err) => Err(self.fail(ListAction::Rate, err).await),
        }
    }

    /// Carries out what the entry form asked for.
    pub async fn submit(&self, intent: FormIntent) -> Result<Option<Series>, ClientError> {
        match intent {
            FormIntent::Create(draft) => self.add(&draft).await.map(Some),
            FormIntent::Update(series) => self.update(&series).await.map(Some),
            FormIntent::Cancelled => Ok(None),
        }
    }

    async fn fail(&self, action: ListAction, err: ClientError) -> ClientError {
        error!(?action, "list: {err}");
        self.view.lock().await.record_failure(action);
        err
    }
}

#[cfg(test)]
#[path = "tests/list_view_tests.rs"]
mod tests;
