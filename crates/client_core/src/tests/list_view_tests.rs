use std::sync::Arc;

use shared::domain::{Rating, SeriesId, SortDirection, SortField, StatusFilter, WatchStatus};

use super::*;
use crate::{
    form::FormIntent,
    test_support::{page_of, series, ScriptedSeriesApi},
    types::{SeriesDraft, SeriesQuery},
};

fn loaded_view(total_pages: u32) -> ListView {
    let mut view = ListView::default();
    let ticket = view.refresh();
    let outcome = view.complete(
        &ticket,
        Ok(page_of(vec![series("1", "Dark", WatchStatus::Watched)], total_pages, 25)),
    );
    assert_eq!(outcome, Completion::Applied);
    view
}

async fn controller_with(api: &Arc<ScriptedSeriesApi>) -> Arc<ListController> {
    Arc::new(ListController::new(api.clone(), SeriesQuery::default()))
}

#[test]
fn only_the_latest_ticket_is_applied() {
    let mut view = ListView::default();
    let first = view.refresh();
    let second = view.apply(ListChange::Page(1)).expect("page change fetches");
    assert!(second.seq > first.seq);

    let stale = view.complete(
        &first,
        Ok(page_of(vec![series("a", "Stale", WatchStatus::Watching)], 3, 30)),
    );
    assert_eq!(stale, Completion::Discarded);
    assert!(view.items().is_empty());
    assert!(view.is_loading());

    let fresh = view.complete(
        &second,
        Ok(page_of(vec![series("b", "Fresh", WatchStatus::Watching)], 3, 30)),
    );
    assert_eq!(fresh, Completion::Applied);
    assert_eq!(view.items()[0].title, "Fresh");
    assert_eq!(view.status(), &ListStatus::Ready);
}

#[test]
fn changing_filter_or_sort_returns_to_first_page() {
    let mut view = loaded_view(5);
    view.apply(ListChange::Page(3)).expect("fetch");
    assert_eq!(view.query().page, 3);

    let ticket = view
        .apply(ListChange::StatusFilter(StatusFilter::Only(WatchStatus::Watched)))
        .expect("filter change fetches");
    assert_eq!(ticket.query.page, 0);
    assert_eq!(
        ticket.query.status_filter,
        StatusFilter::Only(WatchStatus::Watched)
    );

    view.apply(ListChange::Page(2)).expect("fetch");
    let ticket = view
        .apply(ListChange::Sort(SortField::Title, SortDirection::Asc))
        .expect("sort change fetches");
    assert_eq!(ticket.query.page, 0);
    assert_eq!(ticket.query.sort_field, SortField::Title);
    assert_eq!(ticket.query.sort_direction, SortDirection::Asc);
}

#[test]
fn unchanged_parameters_do_not_fetch() {
    let mut view = loaded_view(2);
    assert!(view.apply(ListChange::StatusFilter(StatusFilter::All)).is_none());
    assert!(view
        .apply(ListChange::Sort(SortField::Status, SortDirection::Desc))
        .is_none());
    assert!(view.apply(ListChange::Page(0)).is_none());
    assert!(view.apply(ListChange::PreviousPage).is_none());
}

#[test]
fn page_moves_are_clamped_once_totals_are_known() {
    let mut view = loaded_view(2);
    let ticket = view.apply(ListChange::Page(9)).expect("fetch");
    assert_eq!(ticket.query.page, 1);
    assert!(view.apply(ListChange::NextPage).is_none());
    assert!(view.has_previous_page());
    assert!(!view.has_next_page());
}

#[test]
fn toggle_flips_direction_and_keeps_field() {
    let mut view = loaded_view(1);
    let ticket = view.apply(ListChange::ToggleSortDirection).expect("fetch");
    assert_eq!(ticket.query.sort_direction, SortDirection::Asc);
    assert_eq!(ticket.query.sort_field, SortField::Status);
}

#[test]
fn empty_result_is_not_an_error() {
    let mut view = ListView::default();
    let ticket = view.refresh();
    view.complete(&ticket, Ok(page_of(Vec::new(), 0, 0)));
    assert!(view.is_empty());
    assert!(view.banner().is_none());
}

#[tokio::test]
async fn slow_response_for_old_page_is_ignored() {
    let api = Arc::new(ScriptedSeriesApi::default());
    api.set_page(0, page_of(vec![series("a", "Alpha", WatchStatus::Watching)], 3, 25))
        .await;
    api.set_page(1, page_of(vec![series("b", "Beta", WatchStatus::Watching)], 3, 25))
        .await;
    let controller = controller_with(&api).await;
    controller.reload().await;

    let (started, release) = api.gate(0).await;
    let slow = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.reload().await }
    });
    started.await.expect("slow fetch started");

    let view = controller.change(ListChange::Page(1)).await;
    assert_eq!(view.items()[0].title, "Beta");

    release.send(()).expect("release slow fetch");
    slow.await.expect("slow task");

    let view = controller.snapshot().await;
    assert_eq!(view.query().page, 1);
    assert_eq!(view.items().len(), 1);
    assert_eq!(view.items()[0].title, "Beta");
    assert_eq!(view.status(), &ListStatus::Ready);
}

#[tokio::test]
async fn filter_change_issues_exactly_one_fetch() {
    let api = Arc::new(ScriptedSeriesApi::default());
    api.set_page(0, page_of(vec![series("a", "Alpha", WatchStatus::Watched)], 4, 40))
        .await;
    api.set_page(2, page_of(vec![series("c", "Gamma", WatchStatus::Watched)], 4, 40))
        .await;
    let controller = controller_with(&api).await;
    controller.reload().await;
    controller.change(ListChange::Page(2)).await;

    let before = api.query_count().await;
    let view = controller
        .change(ListChange::StatusFilter(StatusFilter::Only(WatchStatus::Watched)))
        .await;
    assert_eq!(api.query_count().await, before + 1);
    assert_eq!(view.query().page, 0);
    let last = api.last_query().await.expect("query recorded");
    assert_eq!(last.page, 0);
    assert_eq!(last.status_filter, StatusFilter::Only(WatchStatus::Watched));
}

#[tokio::test]
async fn out_of_range_page_moves_to_last_page() {
    let api = Arc::new(ScriptedSeriesApi::default());
    api.set_page(0, page_of(vec![series("a", "Alpha", WatchStatus::Watched)], 3, 25))
        .await;
    let controller = controller_with(&api).await;
    controller.reload().await;

    // Everything past the first page was removed elsewhere.
    api.set_page(2, page_of(Vec::new(), 1, 4)).await;
    api.set_page(0, page_of(vec![series("a", "Alpha", WatchStatus::Watched)], 1, 4))
        .await;

    let view = controller.change(ListChange::Page(2)).await;
    assert_eq!(view.query().page, 0);
    assert_eq!(view.items()[0].title, "Alpha");
    assert_eq!(view.pagination().total_pages, 1);
}

#[tokio::test]
async fn failed_load_keeps_previous_items() {
    let api = Arc::new(ScriptedSeriesApi::default());
    api.set_page(0, page_of(vec![series("a", "Alpha", WatchStatus::Watched)], 1, 1))
        .await;
    let controller = controller_with(&api).await;
    controller.reload().await;

    *api.fail_lists.lock().await = true;
    let view = controller.reload().await;
    assert_eq!(
        view.status(),
        &ListStatus::Error(ListAction::Load.failure_message().to_string())
    );
    assert_eq!(view.banner(), Some(ListAction::Load.failure_message()));
    assert_eq!(view.items().len(), 1);

    controller.dismiss_banner().await;
    assert!(controller.snapshot().await.banner().is_none());
}

#[tokio::test]
async fn failed_mutation_sets_banner_without_touching_items() {
    let api = Arc::new(ScriptedSeriesApi::default());
    api.set_page(0, page_of(vec![series("a", "Alpha", WatchStatus::Watched)], 1, 1))
        .await;
    let controller = controller_with(&api).await;
    controller.reload().await;

    *api.fail_mutations.lock().await = true;
    let err = controller
        .add(&SeriesDraft::new("Severance"))
        .await
        .expect_err("create fails");
    assert!(!err.requires_sign_in());

    let view = controller.snapshot().await;
    assert_eq!(view.banner(), Some(ListAction::Add.failure_message()));
    assert_eq!(view.items()[0].title, "Alpha");
    assert_eq!(view.status(), &ListStatus::Ready);
}

#[tokio::test]
async fn only_watched_series_can_be_rated() {
    let api = Arc::new(ScriptedSeriesApi::default());
    api.set_page(
        0,
        page_of(
            vec![
                series("w", "Watched One", WatchStatus::Watched),
                series("p", "Someday", WatchStatus::PlanToWatch),
            ],
            1,
            2,
        ),
    )
    .await;
    let controller = controller_with(&api).await;
    controller.reload().await;

    let rating = Rating::new(8).expect("rating");
    let err = controller
        .rate(&SeriesId::new("p"), rating)
        .await
        .expect_err("plan-to-watch cannot be rated");
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(api.updates.lock().await.is_empty());

    let err = controller
        .rate(&SeriesId::new("missing"), rating)
        .await
        .expect_err("not on page");
    assert!(err.is_not_found());

    controller
        .rate(&SeriesId::new("w"), rating)
        .await
        .expect("watched series takes a rating");
    let updates = api.updates.lock().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].rating, Some(rating));
}

#[tokio::test]
async fn successful_mutations_reload_the_page() {
    let api = Arc::new(ScriptedSeriesApi::default());
    let controller = controller_with(&api).await;
    controller.reload().await;
    let before = api.query_count().await;

    let created = controller
        .submit(FormIntent::Create(SeriesDraft::new("Andor")))
        .await
        .expect("submit")
        .expect("created series");
    assert_eq!(created.title, "Andor");
    controller.remove(&created.id).await.expect("remove");

    assert_eq!(api.query_count().await, before + 2);
    assert_eq!(api.removed.lock().await.as_slice(), &[created.id.clone()]);
}

#[tokio::test]
async fn cancelled_form_does_nothing() {
    let api = Arc::new(ScriptedSeriesApi::default());
    let controller = controller_with(&api).await;
    let outcome = controller.submit(FormIntent::Cancelled).await.expect("ok");
    assert!(outcome.is_none());
    assert_eq!(api.query_count().await, 0);
}

#[tokio::test]
async fn session_trigger_reloads_once_per_change() {
    let api = Arc::new(ScriptedSeriesApi::default());
    let controller = controller_with(&api).await;

    controller.sync_session(1).await;
    controller.sync_session(1).await;
    assert_eq!(api.query_count().await, 1);

    controller.sync_session(2).await;
    assert_eq!(api.query_count().await, 2);
}
