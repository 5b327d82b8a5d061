#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::io::Write;
use std::sync::Arc;

use eyre::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use super::Renderer;
use crate::chat::ChatService;
use crate::models::{Event, FilterThread, Message, Thread};

const PROMPT: &str = "> ";
const THREAD_LIST_LIMIT: usize = 20;

const HELP: &str = r#"Commands:
  /new [TITLE]   start a new thread
  /threads       list recent threads
  /switch ID     continue another thread
  /history       print the current thread
  /help          show this help
  /quit          leave (Ctrl-D works too)
Anything else is sent to the model. Start a line with // to send a
prompt that begins with a command name."#;

#[derive(Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Quit,
    New(Option<String>),
    Threads,
    Switch(String),
    History,
    Help,
    Prompt(String),
    Empty,
    Unknown(String),
}

impl SessionCommand {
    pub fn parse(line: &str) -> SessionCommand {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return SessionCommand::Empty;
        }
        if !trimmed.starts_with('/') {
            return SessionCommand::Prompt(line.to_string());
        }
        if let Some(rest) = trimmed.strip_prefix("//") {
            return SessionCommand::Prompt(format!("/{}", rest));
        }

        let (name, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (trimmed, ""),
        };
        match (name, arg) {
            ("/quit" | "/exit", _) => SessionCommand::Quit,
            ("/new", "") => SessionCommand::New(None),
            ("/new", title) => SessionCommand::New(Some(title.to_string())),
            ("/threads", _) => SessionCommand::Threads,
            ("/switch", id) if !id.is_empty() => SessionCommand::Switch(id.to_string()),
            ("/history", _) => SessionCommand::History,
            ("/help", _) => SessionCommand::Help,
            ("/switch", _) => SessionCommand::Unknown(trimmed.to_string()),
            // Not a command name, e.g. a path
            _ => SessionCommand::Prompt(line.to_string()),
        }
    }
}

/// Interactive loop over a line reader. The thread is created lazily on
/// the first prompt unless one was given up front.
pub struct Session<W: Write> {
    chat: ChatService,
    renderer: Renderer<W>,
    thread: Option<Thread>,
    pending_title: Option<String>,
}

impl<W: Write> Session<W> {
    pub fn new(chat: ChatService, renderer: Renderer<W>) -> Self {
        Self {
            chat,
            renderer,
            thread: None,
            pending_title: None,
        }
    }

    pub fn with_thread(mut self, thread: Thread) -> Self {
        self.thread = Some(thread);
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.pending_title = title;
        self
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    pub fn into_renderer(self) -> Renderer<W> {
        self.renderer
    }

    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> Result<()> {
        let mut lines = reader.lines();
        match self.thread.as_ref() {
            Some(thread) => self
                .renderer
                .println(format!("Thread: {} ({})", thread.title(), thread.id()))?,
            None => self
                .renderer
                .println(format!("Model: {}. Type /help for commands.", self.chat.model()))?,
        }

        loop {
            self.renderer.print(PROMPT)?;
            let Some(line) = lines.next_line().await.wrap_err("reading input")? else {
                // EOF
                self.renderer.println("")?;
                break;
            };

            let command = SessionCommand::parse(&line);
            if command == SessionCommand::Quit {
                break;
            }
            if let Err(err) = self.dispatch(command).await {
                log::error!("SessionCommand failed: {:?}", err);
                self.renderer.println(format!("error: {:#}", err))?;
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Quit | SessionCommand::Empty => {}
            SessionCommand::Help => self.renderer.println(HELP)?,
            SessionCommand::Unknown(input) => self
                .renderer
                .println(format!("unknown command {}, try /help", input))?,
            SessionCommand::New(title) => {
                self.thread = None;
                self.pending_title = title;
                self.renderer.println("Started a new thread.")?;
            }
            SessionCommand::Threads => {
                let threads = self
                    .chat
                    .storage()
                    .get_threads(FilterThread::default().with_limit(THREAD_LIST_LIMIT))
                    .await?;
                let current = self.thread.as_ref().map(|t| t.id());
                self.renderer.print_threads(&threads, current)?;
            }
            SessionCommand::Switch(id) => {
                let thread = self.chat.ensure_thread(Some(&id), None, "").await?;
                self.renderer
                    .println(format!("Switched to {} ({})", thread.title(), thread.id()))?;
                self.thread = Some(thread);
            }
            SessionCommand::History => match self.thread.as_ref() {
                Some(thread) => {
                    let messages = self.chat.storage().get_messages(thread.id()).await?;
                    self.renderer.print_messages(&messages)?;
                }
                None => self.renderer.println("No messages yet.")?,
            },
            SessionCommand::Prompt(prompt) => {
                let thread = match self.thread.take() {
                    Some(thread) => thread,
                    None => {
                        let title = self.pending_title.take();
                        self.chat
                            .ensure_thread(None, title.as_deref(), &prompt)
                            .await?
                    }
                };
                let thread_id = thread.id().to_string();
                self.thread = Some(thread);
                submit(&self.chat, &mut self.renderer, &thread_id, &prompt).await?;
            }
        }
        Ok(())
    }
}

/// Runs one prompt through `chat`, rendering events while the completion
/// streams in.
pub async fn submit<W: Write>(
    chat: &ChatService,
    renderer: &mut Renderer<W>,
    thread_id: &str,
    prompt: &str,
) -> Result<Option<Message>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let render = async {
        while let Some(event) = rx.recv().await {
            renderer.handle(&event)?;
        }
        Ok::<(), eyre::Report>(())
    };

    let (saved, rendered) = tokio::join!(chat.submit(thread_id, prompt, Arc::new(tx)), render);
    rendered.wrap_err("rendering response")?;
    saved
}
