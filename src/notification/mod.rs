//! Notification and audio side effects of timer transitions.
//!
//! The timer never talks to a desktop or an audio device directly. It hands
//! every transition to a [`NotificationGateway`], which plays a sound and
//! shows a desktop notification when the settings allow it. Both
//! capabilities are optional and every failure is logged and dropped.

pub mod error;
mod desktop;
mod gateway;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub use self::desktop::DesktopNotifier;
pub use self::error::NotificationError;
pub use self::gateway::NotificationGateway;

/// Authorization state of a notification backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Permission {
    /// Never asked
    #[default]
    Undetermined,
    Granted,
    Denied,
}

/// A place desktop notifications can be shown.
pub trait NotificationBackend: Send + Sync {
    /// Returns the current authorization state.
    fn permission(&self) -> Permission;

    /// Asks for authorization and returns the outcome.
    fn request_permission(&self) -> Permission;

    /// Shows a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be delivered.
    fn show(&self, title: &str, body: &str) -> Result<(), NotificationError>;
}

/// Mock notification backend for testing.
#[derive(Debug)]
pub struct MockNotificationBackend {
    notifications: Mutex<Vec<(String, String)>>,
    permission: Mutex<Permission>,
    grant_on_request: AtomicBool,
    request_count: AtomicUsize,
    should_fail: AtomicBool,
}

impl Default for MockNotificationBackend {
    fn default() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
            permission: Mutex::new(Permission::Granted),
            grant_on_request: AtomicBool::new(true),
            request_count: AtomicUsize::new(0),
            should_fail: AtomicBool::new(false),
        }
    }
}

impl MockNotificationBackend {
    /// Creates a backend that is already granted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that has never been asked.
    #[must_use]
    pub fn undetermined() -> Self {
        let mock = Self::default();
        mock.set_permission(Permission::Undetermined);
        mock
    }

    pub fn set_permission(&self, permission: Permission) {
        *self.permission.lock().unwrap() = permission;
    }

    /// Controls the answer to the next permission requests.
    pub fn set_grant_on_request(&self, grant: bool) {
        self.grant_on_request.store(grant, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn clear_recorded(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl NotificationBackend for MockNotificationBackend {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap()
    }

    fn request_permission(&self) -> Permission {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let outcome = if self.grant_on_request.load(Ordering::SeqCst) {
            Permission::Granted
        } else {
            Permission::Denied
        };
        self.set_permission(outcome);
        outcome
    }

    fn show(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("Mock failure".to_string()));
        }
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}
