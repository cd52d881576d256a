use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use client_core::{
    AccessGuard, AdminGuard, AdminPanel, EntryForm, FieldErrors, FormField, GuardDecision,
    ListChange, ListController, ListView, LocalSeriesStore, RemoteServices, Route, Series,
    SeriesApi, SeriesQuery, ThemePreference,
};
use shared::domain::{
    Rating, SeriesId, SortDirection, SortField, StatusFilter, Theme, UserId, WatchStatus,
};
use storage::KeyValueStore;

pub const SIGN_IN_HINT: &str =
    "Please sign in first: series login --email <email> --password <password>";

pub enum Backend {
    Remote(RemoteServices),
    Local(Arc<LocalSeriesStore>),
}

impl Backend {
    fn remote(&self) -> Result<&RemoteServices> {
        match self {
            Self::Remote(services) => Ok(services),
            Self::Local(_) => bail!("accounts are not available in local mode"),
        }
    }

    /// The series collection. Remote access goes through the access guard.
    async fn series_api(&self) -> Result<Arc<dyn SeriesApi>> {
        match self {
            Self::Local(store) => Ok(Arc::clone(store) as Arc<dyn SeriesApi>),
            Self::Remote(services) => {
                require(AccessGuard::check(&services.session).await)?;
                Ok(Arc::clone(&services.series) as Arc<dyn SeriesApi>)
            }
        }
    }
}

fn require(decision: GuardDecision) -> Result<()> {
    match decision {
        GuardDecision::Render => Ok(()),
        GuardDecision::Redirect(Route::SignIn) => bail!(SIGN_IN_HINT),
        GuardDecision::Redirect(route) => bail!(
            "You do not have access to this page; go to {} instead.",
            route.path()
        ),
        GuardDecision::Pending => bail!("Still checking your access; try again."),
    }
}

/// Optional entry fields shared by `add` and `edit`.
#[derive(Args, Debug, Default)]
pub struct EntryArgs {
    #[arg(long)]
    pub genre: Option<String>,
    #[arg(long)]
    pub status: Option<WatchStatus>,
    #[arg(long)]
    pub link: Option<String>,
    #[arg(long)]
    pub image_link: Option<String>,
    /// 1 to 10, kept only for watched series.
    #[arg(long)]
    pub rating: Option<String>,
}

impl EntryArgs {
    fn apply_to(self, form: &mut EntryForm) {
        // Status first: the rating rule depends on it.
        if let Some(status) = self.status {
            form.set_status(status);
        }
        let fields = [
            (FormField::Genre, self.genre),
            (FormField::Link, self.link),
            (FormField::ImageLink, self.image_link),
            (FormField::Rating, self.rating),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                form.set_field(field, &value);
            }
        }
    }
}

#[derive(Debug)]
pub struct ListArgs {
    pub page: u32,
    pub size: u32,
    pub sort: Option<SortField>,
    pub direction: Option<SortDirection>,
    pub status: Option<StatusFilter>,
}

fn controller(api: Arc<dyn SeriesApi>, page_size: u32) -> ListController {
    ListController::new(
        api,
        SeriesQuery {
            size: page_size,
            ..SeriesQuery::default()
        },
    )
}

fn invalid_form(errors: FieldErrors) -> anyhow::Error {
    let details: Vec<String> = errors
        .iter()
        .map(|(field, message)| format!("  {field}: {message}"))
        .collect();
    anyhow!("the entry is not valid:\n{}", details.join("\n"))
}

fn ensure_loaded(view: &ListView) -> Result<()> {
    match view.banner() {
        Some(banner) => bail!("{banner}"),
        None => Ok(()),
    }
}

/// Pages through the collection until `id` is on the current page.
async fn locate(controller: &ListController, id: &SeriesId) -> Result<Series> {
    let mut view = controller.reload().await;
    loop {
        ensure_loaded(&view)?;
        if let Some(found) = view.find(id) {
            return Ok(found.clone());
        }
        if !view.has_next_page() {
            bail!("No TV series with id {id}.");
        }
        view = controller.change(ListChange::NextPage).await;
    }
}

fn print_series(series: &Series) {
    let rating = series
        .visible_rating()
        .map(|rating| rating.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<38} {:<32} {:<14} {:>6}  {:<12} {}",
        series.id.as_str(),
        series.title,
        series.status.label(),
        rating,
        series.date_added.format("%Y-%m-%d"),
        series.genre,
    );
}

fn print_view(view: &ListView) -> Result<()> {
    ensure_loaded(view)?;
    if view.is_empty() {
        println!("No TV series found.");
        return Ok(());
    }
    for series in view.items() {
        print_series(series);
    }
    let pagination = view.pagination();
    println!(
        "Page {} of {} ({} series)",
        view.query().page + 1,
        pagination.total_pages.max(1),
        pagination.total_elements
    );
    Ok(())
}

pub async fn register(backend: &Backend, username: &str, email: &str, password: &str) -> Result<()> {
    let services = backend.remote()?;
    services.session.register(username, email, password).await?;
    println!("Registration successful. You can now sign in.");
    Ok(())
}

pub async fn login(backend: &Backend, email: &str, password: &str) -> Result<()> {
    let services = backend.remote()?;
    let user = services.session.login(email, password).await?;
    println!("Signed in as {}.", user.display_name());
    Ok(())
}

pub async fn logout(backend: &Backend) -> Result<()> {
    let services = backend.remote()?;
    services.session.logout().await;
    println!("Signed out.");
    Ok(())
}

pub async fn whoami(backend: &Backend) -> Result<()> {
    let services = backend.remote()?;
    require(AccessGuard::check(&services.session).await)?;
    let role = services.session.resolve_role().await?;
    match services.session.snapshot().await.user {
        Some(user) => println!(
            "{} <{}>{}",
            user.display_name(),
            user.email,
            role.map(|role| format!(" [{role}]")).unwrap_or_default()
        ),
        None => println!("Signed in."),
    }
    Ok(())
}

pub async fn list(backend: &Backend, args: ListArgs) -> Result<()> {
    let api = backend.series_api().await?;
    let mut query = SeriesQuery {
        page: args.page,
        size: args.size,
        ..SeriesQuery::default()
    };
    if let Some(sort) = args.sort {
        query.sort_field = sort;
    }
    if let Some(direction) = args.direction {
        query.sort_direction = direction;
    }
    if let Some(status) = args.status {
        query.status_filter = status;
    }

    let view = ListController::new(api, query).reload().await;
    print_view(&view)
}

pub async fn add(backend: &Backend, title: &str, entry: EntryArgs, page_size: u32) -> Result<()> {
    let api = backend.series_api().await?;
    let mut form = EntryForm::new();
    form.set_field(FormField::Title, title);
    entry.apply_to(&mut form);
    let intent = form.submit().map_err(invalid_form)?;

    let controller = controller(api, page_size);
    if let Some(created) = controller.submit(intent).await? {
        println!("Added '{}' ({}).", created.title, created.id);
    }
    Ok(())
}

pub async fn edit(
    backend: &Backend,
    id: &str,
    title: Option<String>,
    entry: EntryArgs,
    page_size: u32,
) -> Result<()> {
    let api = backend.series_api().await?;
    let controller = controller(api, page_size);
    let original = locate(&controller, &SeriesId::new(id)).await?;

    let mut form = EntryForm::edit(&original);
    if let Some(title) = title {
        form.set_field(FormField::Title, &title);
    }
    entry.apply_to(&mut form);
    let intent = form.submit().map_err(invalid_form)?;

    if let Some(updated) = controller.submit(intent).await? {
        print_series(&updated);
    }
    Ok(())
}

pub async fn rate(backend: &Backend, id: &str, rating: i64, page_size: u32) -> Result<()> {
    let rating = Rating::new(rating)?;
    let api = backend.series_api().await?;
    let controller = controller(api, page_size);
    let id = SeriesId::new(id);
    locate(&controller, &id).await?;

    let rated = controller.rate(&id, rating).await?;
    println!("Rated '{}' {rating}.", rated.title);
    Ok(())
}

pub async fn remove(backend: &Backend, id: &str, page_size: u32) -> Result<()> {
    let api = backend.series_api().await?;
    let controller = controller(api, page_size);
    let target = locate(&controller, &SeriesId::new(id)).await?;

    controller.remove(&target.id).await?;
    println!("Removed '{}'.", target.title);
    Ok(())
}

async fn admin_panel(services: &RemoteServices) -> Result<AdminPanel> {
    require(AdminGuard::check(&services.session).await)?;
    let me = services.session.snapshot().await.user;
    let mut panel = AdminPanel::new(me.as_ref());
    if let Err(err) = panel.load(services.session.accounts()).await {
        let message = panel.error().unwrap_or_default().to_string();
        return Err(anyhow::Error::new(err).context(message));
    }
    Ok(panel)
}

pub async fn users(backend: &Backend) -> Result<()> {
    let panel = admin_panel(backend.remote()?).await?;
    if panel.is_empty() {
        println!("No users found");
        return Ok(());
    }

    println!("{}", panel.summary());
    for row in panel.rows() {
        let user = &row.user;
        println!(
            "{:>6}  {:<20} {:<32} {:<6}{}",
            user.id.map(|id| id.to_string()).unwrap_or_default(),
            user.display_name(),
            user.email,
            user.role.map(|role| role.to_string()).unwrap_or_default(),
            if row.can_delete { "" } else { "  (you)" }
        );
    }
    Ok(())
}

pub async fn delete_user(backend: &Backend, id: i64) -> Result<()> {
    let services = backend.remote()?;
    let mut panel = admin_panel(services).await?;
    if let Err(err) = panel
        .delete(services.session.accounts(), UserId(id))
        .await
    {
        let message = panel
            .error()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(anyhow::Error::new(err).context(message));
    }
    println!("Deleted user {id}.");
    println!("{}", panel.summary());
    Ok(())
}

pub async fn theme(store: Arc<dyn KeyValueStore>, choice: Option<&str>) -> Result<()> {
    let preference = ThemePreference::new(store);
    let theme = match choice {
        None => preference.load().await?,
        Some(choice) if choice.eq_ignore_ascii_case("toggle") => preference.toggle().await?,
        Some(choice) => {
            let theme: Theme = choice.parse()?;
            preference.set(theme).await?;
            theme
        }
    };
    println!("Theme: {}", theme.as_str());
    Ok(())
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
