use std::collections::VecDeque;
use std::fmt;

use chrono::Utc;

pub const DEFAULT_NOTICE_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// A short, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "INFO",
            NoticeLevel::Warn => "WARN",
            NoticeLevel::Error => "ERROR",
        };
        write!(f, "[{tag}] {}", self.text)
    }
}

#[derive(Debug, Clone)]
pub struct Notices {
    queue: VecDeque<Notice>,
    limit: usize,
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_LIMIT)
    }
}

impl Notices {
    pub fn new(limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, level: NoticeLevel, msg: impl Into<String>) {
        let text = msg.into();
        match level {
            NoticeLevel::Info => log::info!("{text}"),
            NoticeLevel::Warn => log::warn!("{text}"),
            NoticeLevel::Error => log::error!("{text}"),
        }
        self.queue.push_back(Notice {
            level,
            text,
            at: Utc::now().to_rfc3339(),
        });
        while self.queue.len() > self.limit {
            self.queue.pop_front();
        }
    }

    pub fn info(&mut self, msg: impl Into<String>) {
        self.push(NoticeLevel::Info, msg);
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.push(NoticeLevel::Warn, msg);
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.push(NoticeLevel::Error, msg);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_bounded() {
        let mut notices = Notices::new(3);
        for i in 0..5 {
            notices.info(format!("n{i}"));
        }
        let texts: Vec<_> = notices.iter().map(|n| n.text.clone()).collect();
        assert_eq!(texts, vec!["n2", "n3", "n4"]);
        assert_eq!(notices.drain().len(), 3);
        assert!(notices.is_empty());
    }

    #[test]
    fn display_carries_level_tag() {
        let mut notices = Notices::default();
        notices.warn("lineup changed elsewhere");
        let shown = notices.iter().next().unwrap().to_string();
        assert_eq!(shown, "[WARN] lineup changed elsewhere");
    }
}
