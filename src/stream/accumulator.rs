#[cfg(test)]
#[path = "accumulator_test.rs"]
mod tests;

use crate::config::StreamConfig;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    #[default]
    Thinking,
    Responding,
}

/// Where a pushed fragment ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Thought(String),
    Response(String),
    /// A delimiter fragment; it is not kept in any buffer.
    Skipped,
    /// The end delimiter went by. Everything after it is response.
    ThinkingDone,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Accumulated {
    pub content: String,
    pub thought: String,
}

/// Splits a stream of text fragments into a thought buffer and a content
/// buffer.
///
/// The model is expected to wrap its reasoning in a start and an end
/// delimiter before answering. Matching is done per fragment, not on the
/// joined text: a delimiter split across two fragments is not recognized,
/// and a fragment carrying a delimiter is dropped whole, including any
/// text around the delimiter. When the end delimiter never shows up the
/// whole output stays in the thought buffer and the content is empty.
#[derive(Debug)]
pub struct StreamAccumulator {
    think_start: String,
    think_end: String,
    mode: OutputMode,
    thought: String,
    content: String,
}

impl StreamAccumulator {
    pub fn new(config: &StreamConfig) -> Self {
        Self::with_delimiters(&config.think_start, &config.think_end)
    }

    pub fn with_delimiters(think_start: &str, think_end: &str) -> Self {
        Self {
            think_start: think_start.to_string(),
            think_end: think_end.to_string(),
            mode: OutputMode::default(),
            thought: String::new(),
            content: String::new(),
        }
    }

    pub fn push(&mut self, fragment: &str) -> Fragment {
        if self.mode == OutputMode::Responding {
            self.content.push_str(fragment);
            return Fragment::Response(fragment.to_string());
        }

        if self.contains(fragment, &self.think_end) {
            self.mode = OutputMode::Responding;
            return Fragment::ThinkingDone;
        }

        if self.contains(fragment, &self.think_start) {
            return Fragment::Skipped;
        }

        self.thought.push_str(fragment);
        Fragment::Thought(fragment.to_string())
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn thought(&self) -> &str {
        &self.thought
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn finish(self) -> Accumulated {
        Accumulated {
            content: self.content,
            thought: self.thought,
        }
    }

    fn contains(&self, fragment: &str, delimiter: &str) -> bool {
        !delimiter.is_empty() && fragment.contains(delimiter)
    }
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new(&StreamConfig::default())
    }
}
