#[cfg(test)]
#[path = "renderer_test.rs"]
mod tests;

use std::io::Write;

use chrono::Local;
use eyre::{Context, Result};

use crate::models::{Event, Message, Role, Thread};

const THOUGHT_HEADER: &str = "Thinking...";
const THOUGHT_SEPARATOR: &str = "----";

/// Writes streamed events and stored messages to a terminal-like sink.
pub struct Renderer<W: Write> {
    out: W,
    show_thoughts: bool,
    in_thought: bool,
    has_response: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            show_thoughts: true,
            in_thought: false,
            has_response: false,
        }
    }

    pub fn with_show_thoughts(mut self, show_thoughts: bool) -> Self {
        self.show_thoughts = show_thoughts;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::ThoughtDelta(text) => {
                if !self.show_thoughts {
                    return Ok(());
                }
                if !self.in_thought {
                    writeln!(self.out, "{}", THOUGHT_HEADER)?;
                    self.in_thought = true;
                }
                write!(self.out, "{}", text)?;
            }
            Event::ThinkingDone => self.close_thought()?,
            Event::ResponseDelta(text) => {
                self.has_response = true;
                write!(self.out, "{}", text)?;
            }
            Event::MessageSaved(message) if message.role() == Role::Assistant => {
                self.close_thought()?;
                if !self.has_response && !self.show_thoughts {
                    write!(self.out, "(no response)")?;
                }
                writeln!(self.out)?;
                self.has_response = false;
            }
            Event::MessageSaved(_) | Event::BackendPromptResponse(_) => {}
        }
        self.out.flush().wrap_err("flushing output")?;
        Ok(())
    }

    pub fn print_message(&mut self, message: &Message) -> Result<()> {
        writeln!(
            self.out,
            "[{}] {}",
            message.role(),
            message.created_at().with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?;
        if self.show_thoughts && !message.thought().is_empty() {
            writeln!(self.out, "{}", THOUGHT_HEADER)?;
            writeln!(self.out, "{}", message.thought().trim_end())?;
            writeln!(self.out, "{}", THOUGHT_SEPARATOR)?;
        }
        writeln!(self.out, "{}", message.content().trim_end())?;
        writeln!(self.out)?;
        Ok(())
    }

    pub fn print_messages(&mut self, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            writeln!(self.out, "No messages yet.")?;
        }
        for message in messages {
            self.print_message(message)?;
        }
        self.out.flush().wrap_err("flushing output")?;
        Ok(())
    }

    pub fn print_threads(&mut self, threads: &[Thread], current: Option<&str>) -> Result<()> {
        if threads.is_empty() {
            writeln!(self.out, "No threads yet.")?;
        }
        for thread in threads {
            let marker = if Some(thread.id()) == current { "*" } else { " " };
            writeln!(
                self.out,
                "{} {}  {}  {}",
                marker,
                thread.id(),
                thread.updated_at().with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                thread.title()
            )?;
        }
        self.out.flush().wrap_err("flushing output")?;
        Ok(())
    }

    pub fn println(&mut self, line: impl AsRef<str>) -> Result<()> {
        writeln!(self.out, "{}", line.as_ref())?;
        self.out.flush().wrap_err("flushing output")?;
        Ok(())
    }

    pub fn print(&mut self, text: impl AsRef<str>) -> Result<()> {
        write!(self.out, "{}", text.as_ref())?;
        self.out.flush().wrap_err("flushing output")?;
        Ok(())
    }

    fn close_thought(&mut self) -> Result<()> {
        if self.in_thought {
            writeln!(self.out)?;
            writeln!(self.out, "{}", THOUGHT_SEPARATOR)?;
            self.in_thought = false;
        }
        Ok(())
    }
}
