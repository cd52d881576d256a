mod commands;
mod config;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ClientError, LocalSeriesStore, RemoteServices};
use shared::domain::{SortDirection, SortField, StatusFilter};
use storage::{KeyValueStore, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{Backend, EntryArgs},
    config::{load_settings, normalize_database_url, Mode},
};

#[derive(Parser, Debug)]
#[command(name = "series", about = "Keep track of the TV series you watch")]
struct Cli {
    /// Base URL of the series backend.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// `remote` talks to the backend, `local` keeps everything on disk.
    #[arg(long, global = true)]
    mode: Option<Mode>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    List {
        /// 1-based page number.
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        sort: Option<SortField>,
        #[arg(long)]
        direction: Option<SortDirection>,
        /// all, watching, watched or plan-to-watch.
        #[arg(long)]
        status: Option<StatusFilter>,
    },
    Add {
        title: String,
        #[command(flatten)]
        entry: EntryArgs,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        entry: EntryArgs,
    },
    Rate {
        id: String,
        rating: i64,
    },
    Remove {
        id: String,
    },
    Users,
    DeleteUser {
        id: i64,
    },
    /// Show the theme, or set it to dark, light or toggle.
    Theme {
        choice: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = normalize_database_url(&database_url);
    }
    if let Some(mode) = cli.mode {
        settings.mode = mode;
    }
    info!(
        mode = %settings.mode,
        api_url = settings.api_url.as_str(),
        database_url = settings.database_url.as_str(),
        "settings loaded"
    );

    let storage = Storage::new(&settings.database_url)
        .await
        .with_context(|| format!("failed to open {}", settings.database_url))?;
    let store: Arc<dyn KeyValueStore> = Arc::new(storage);

    let backend = match settings.mode {
        Mode::Remote => {
            let services = RemoteServices::connect(
                settings.api_url.clone(),
                Arc::clone(&store),
                Duration::from_secs(settings.request_timeout_secs),
            )?;
            services.session.initialize().await;
            Backend::Remote(services)
        }
        Mode::Local => Backend::Local(Arc::new(LocalSeriesStore::new(Arc::clone(&store)))),
    };

    let outcome = run(cli.command, &backend, store, settings.page_size).await;
    if let Err(err) = &outcome {
        if err
            .downcast_ref::<ClientError>()
            .is_some_and(ClientError::requires_sign_in)
        {
            eprintln!("{}", commands::SIGN_IN_HINT);
        }
    }
    outcome
}

async fn run(
    command: Command,
    backend: &Backend,
    store: Arc<dyn KeyValueStore>,
    page_size: u32,
) -> Result<()> {
    match command {
        Command::Register {
            username,
            email,
            password,
        } => commands::register(backend, &username, &email, &password).await,
        Command::Login { email, password } => commands::login(backend, &email, &password).await,
        Command::Logout => commands::logout(backend).await,
        Command::Whoami => commands::whoami(backend).await,
        Command::List {
            page,
            size,
            sort,
            direction,
            status,
        } => {
            let query = commands::ListArgs {
                page: page.unwrap_or(1).saturating_sub(1),
                size: size.unwrap_or(page_size),
                sort,
                direction,
                status,
            };
            commands::list(backend, query).await
        }
        Command::Add { title, entry } => commands::add(backend, &title, entry, page_size).await,
        Command::Edit { id, title, entry } => {
            commands::edit(backend, &id, title, entry, page_size).await
        }
        Command::Rate { id, rating } => commands::rate(backend, &id, rating, page_size).await,
        Command::Remove { id } => commands::remove(backend, &id, page_size).await,
        Command::Users => commands::users(backend).await,
        Command::DeleteUser { id } => commands::delete_user(backend, id).await,
        Command::Theme { choice } => commands::theme(store, choice.as_deref()).await,
    }
}
