//! Desktop notifications through the platform notification server.
//!
//! `notify-rust` talks to the notification server synchronously, so delivery
//! runs on a dedicated thread. `show` only queues the message and never
//! blocks the timer engine, even when the server is slow or missing.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

use notify_rust::Notification;
use tracing::{debug, warn};

use super::error::NotificationError;
use super::{NotificationBackend, Permission};

const APP_NAME: &str = "focus-timer";

struct Message {
    title: String,
    body: String,
}

/// Sends notifications with `notify-rust`.
///
/// Freedesktop and macOS servers have no prompt the daemon can drive, so a
/// permission request is granted locally. Denial can only come from the
/// user disabling notifications in settings.
pub struct DesktopNotifier {
    permission: Mutex<Permission>,
    sender: Option<mpsc::Sender<Message>>,
}

impl DesktopNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::with_delivery(send_desktop)
    }

    /// Creates a notifier whose thread hands each message to `deliver`.
    pub(crate) fn with_delivery<F>(deliver: F) -> Self
    where
        F: Fn(&str, &str) -> Result<(), NotificationError> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Message>();

        let spawned = thread::Builder::new()
            .name("focus-timer-notify".to_string())
            .spawn(move || {
                for message in receiver {
                    if let Err(e) = deliver(&message.title, &message.body) {
                        warn!("Failed to show notification: {}", e);
                    }
                }
                debug!("Notification thread exiting");
            });

        let sender = match spawned {
            Ok(_) => Some(sender),
            Err(e) => {
                warn!("Notification thread unavailable, notifications disabled: {}", e);
                None
            }
        };

        Self {
            permission: Mutex::new(Permission::Undetermined),
            sender,
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DesktopNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopNotifier")
            .field("permission", &self.permission())
            .field("running", &self.sender.is_some())
            .finish()
    }
}

impl NotificationBackend for DesktopNotifier {
    fn permission(&self) -> Permission {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(Permission::Undetermined)
    }

    fn request_permission(&self) -> Permission {
        if let Ok(mut permission) = self.permission.lock() {
            *permission = Permission::Granted;
        }
        debug!("Desktop notification permission granted");
        Permission::Granted
    }

    /// Queues a notification. Delivery failures are logged by the
    /// notification thread.
    fn show(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        let sender = self.sender.as_ref().ok_or(NotificationError::NotAvailable)?;
        sender
            .send(Message {
                title: title.to_string(),
                body: body.to_string(),
            })
            .map_err(|_| NotificationError::NotAvailable)
    }
}

fn send_desktop(title: &str, body: &str) -> Result<(), NotificationError> {
    Notification::new()
        .summary(title)
        .body(body)
        .appname(APP_NAME)
        .show()
        .map(|_| ())
        .map_err(|e| NotificationError::SendFailed(e.to_string()))
}
