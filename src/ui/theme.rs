//! Light/dark theme state.
//!
//! The theme is one explicit state object owned by `AppState` and handed to
//! page rendering, with a `watch` channel for change notification. There is
//! no persistence: every process starts in light mode.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Label for the toggle button: shows the theme it switches to.
    #[must_use]
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::Light => "\u{1f319}",
            Self::Dark => "\u{2600}\u{fe0f}",
        }
    }
}

#[derive(Clone)]
pub struct ThemeState {
    tx: Arc<watch::Sender<Theme>>,
}

impl ThemeState {
    #[must_use]
    pub fn new(initial: Theme) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn current(&self) -> Theme {
        *self.tx.borrow()
    }

    /// Flip the theme and return the new value.
    pub fn toggle(&self) -> Theme {
        let mut next = Theme::default();
        self.tx.send_modify(|theme| {
            *theme = theme.toggled();
            next = *theme;
        });
        next
    }

    pub fn set(&self, theme: Theme) {
        self.tx.send_replace(theme);
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.tx.subscribe()
    }
}

impl Default for ThemeState {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

/// Log every theme change until the state is dropped.
pub fn spawn_theme_logger(theme: &ThemeState) -> tokio::task::JoinHandle<()> {
    let mut rx = theme.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let current = *rx.borrow_and_update();
            tracing::info!(theme = current.as_str(), "theme changed");
        }
    })
}

#[cfg(test)]
#[path = "theme_test.rs"]
mod tests;
