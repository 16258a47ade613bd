//! User-facing notifications
//!
//! Lifecycle events go to every subscriber of the pipeline's event channel.
//! Notifications are the separate, user-visible "your game is ready" message,
//! published once per successful installation through a [`Notifier`].

use crate::types::{GameKey, GameRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A message meant for the user, not for the UI state machine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Game the notification is about
    pub key: GameKey,
    /// Short headline
    pub title: String,
    /// Body text
    pub body: String,
    /// Icon shown with the notification, taken from the game record
    pub icon_url: Option<String>,
}

impl Notification {
    /// Notification published when a game finished installing
    pub fn installation_complete(key: &GameKey, game: &GameRecord) -> Self {
        Self {
            key: key.clone(),
            title: "Installation complete".to_string(),
            body: format!("{} is ready to play", game.title),
            icon_url: game.icon_url.clone(),
        }
    }
}

/// Delivers notifications to the user
///
/// Delivery is fire-and-forget: the pipeline does not wait on the user and
/// a notifier has no way to fail the pipeline.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish one notification
    async fn publish(&self, notification: Notification);
}

/// Notifier that writes notifications to the tracing log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn publish(&self, notification: Notification) {
        info!(
            key = %notification.key,
            title = %notification.title,
            body = %notification.body,
            "notification"
        );
    }
}
