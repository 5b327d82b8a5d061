use eyre::{Context, Result};
use thinkchat::app::{Renderer, Session, submit};
use thinkchat::backend::{ArcBackend, new_manager};
use thinkchat::chat::ChatService;
use thinkchat::cli::{Action, Command};
use thinkchat::config::constants::NEW_THREAD_TITLE;
use thinkchat::config::{Configuration, init_logger, verbose};
use thinkchat::models::FilterThread;
use thinkchat::storage::{ArcStorage, StorageError, new_storage};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Command::new();
    if cmd.version() {
        cmd.print_version();
        return Ok(());
    }

    better_panic::Settings::auto().install();

    let config = cmd.get_config()?;
    Configuration::init(config.clone())?;
    init_logger(&config.log)?;
    verbose!("[+] Logger initialized");

    let action = cmd.action();
    log::debug!("Running {:?}", action);
    if let Err(err) = run(action, &config).await {
        log::error!("Command failed: {:?}", err);
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(action: Action, config: &Configuration) -> Result<()> {
    verbose!("[+] Initializing storage...");
    let storage = new_storage(&config.storage)
        .await
        .wrap_err("initializing storage")?;
    verbose!("[+] Storage initialized");

    let backend = if action.needs_backend() {
        verbose!("[+] Initializing backend...");
        Some(new_manager(&config.backend).await?)
    } else {
        None
    };

    let mut renderer =
        Renderer::new(std::io::stdout()).with_show_thoughts(config.general.show_thoughts);

    match action {
        Action::Chat {
            thread,
            title,
            model,
        } => {
            let chat = chat_service(backend, storage, config, model)?;
            let mut session = Session::new(chat.clone(), renderer).with_title(title);
            if let Some(id) = thread.as_deref() {
                session = session.with_thread(chat.ensure_thread(Some(id), None, "").await?);
            }
            session
                .run(BufReader::new(tokio::io::stdin()))
                .await
                .wrap_err("running session")?;
        }

        Action::Ask {
            prompt,
            thread,
            model,
        } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                eyre::bail!("prompt is empty");
            }
            let chat = chat_service(backend, storage, config, model)?;
            let thread = chat.ensure_thread(thread.as_deref(), None, &prompt).await?;
            log::info!("Asking in thread {}", thread.id());
            submit(&chat, &mut renderer, thread.id(), &prompt).await?;
        }

        Action::Threads {
            title,
            contains,
            limit,
        } => {
            let mut filter = FilterThread::default();
            if let Some(title) = title {
                filter = filter.with_title(title);
            }
            if let Some(contains) = contains {
                filter = filter.with_message_contains(contains);
            }
            if let Some(limit) = limit {
                filter = filter.with_limit(limit);
            }
            let threads = storage
                .get_threads(filter)
                .await
                .wrap_err("listing threads")?;
            renderer.print_threads(&threads, None)?;
        }

        Action::New { title } => {
            let title = match title.trim() {
                "" => NEW_THREAD_TITLE,
                title => title,
            };
            let thread = storage
                .create_thread(title)
                .await
                .wrap_err("creating thread")?;
            renderer.println(thread.id())?;
        }

        Action::Show { thread_id } => {
            let thread = storage
                .get_thread(&thread_id)
                .await
                .wrap_err("getting thread")?
                .ok_or(StorageError::ThreadNotFound(thread_id.clone()))?;
            renderer.println(format!("# {}\n", thread.title()))?;
            let messages = storage
                .get_messages(thread.id())
                .await
                .wrap_err("getting messages")?;
            renderer.print_messages(&messages)?;
        }

        Action::Rename { thread_id, title } => {
            storage
                .rename_thread(&thread_id, title.trim())
                .await
                .wrap_err("renaming thread")?;
        }

        Action::Delete { thread_id } => {
            storage
                .delete_thread(&thread_id)
                .await
                .wrap_err("deleting thread")?;
            verbose!("[+] Deleted thread {}", thread_id);
        }

        Action::Models => {
            let Some(backend) = backend else {
                eyre::bail!("no backend available");
            };
            verbose!("[+] Fetching models...");
            let models = backend.list_models().await.wrap_err("getting models")?;
            for model in models {
                let marker = if model.id() == config.backend.default_model {
                    "*"
                } else {
                    " "
                };
                renderer.println(format!("{} {}", marker, model))?;
            }
        }
    }
    Ok(())
}

fn chat_service(
    backend: Option<ArcBackend>,
    storage: ArcStorage,
    config: &Configuration,
    model: Option<String>,
) -> Result<ChatService> {
    let Some(backend) = backend else {
        eyre::bail!("no backend available");
    };
    let model = model.unwrap_or_else(|| config.backend.default_model.clone());
    verbose!("[+] Using model {}", model);
    Ok(ChatService::new(backend, storage)
        .with_model(model)
        .with_stream_config(config.stream.clone()))
}
