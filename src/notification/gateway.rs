//! The single entry point for timer side effects.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{NotificationBackend, Permission};
use crate::settings::{Settings, SettingsChange};
use crate::sound::{SoundKind, SoundPlayer};

const FOCUS_COMPLETE_TITLE: &str = "集中セッション完了！";
const FOCUS_COMPLETE_BODY: &str = "休憩しましょう！";
const BREAK_COMPLETE_TITLE: &str = "休憩終了！";
const BREAK_COMPLETE_BODY: &str = "集中する準備はできましたか？";

/// Plays sounds and shows notifications for timer transitions.
///
/// Every method is fire-and-forget: failures are logged at `warn` and never
/// returned to the caller.
#[derive(Clone, Default)]
pub struct NotificationGateway {
    sound: Option<Arc<dyn SoundPlayer>>,
    backend: Option<Arc<dyn NotificationBackend>>,
}

impl NotificationGateway {
    /// Creates a gateway and asks for notification permission if
    /// notifications are enabled and the backend has never been asked.
    pub fn new(
        sound: Option<Arc<dyn SoundPlayer>>,
        backend: Option<Arc<dyn NotificationBackend>>,
        settings: &Settings,
    ) -> Self {
        let gateway = Self { sound, backend };
        if settings.notifications_enabled {
            gateway.request_permission_if_undetermined();
        }
        gateway
    }

    /// Creates a gateway with neither sound nor notifications.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns true if a sound player is attached.
    pub fn has_sound(&self) -> bool {
        self.sound.is_some()
    }

    /// Returns true if a notification backend is attached.
    pub fn has_notifications(&self) -> bool {
        self.backend.is_some()
    }

    /// Reacts to a settings update.
    pub fn on_settings_changed(&self, change: &SettingsChange) {
        if change.enabled_notifications() {
            self.request_permission_if_undetermined();
        }
    }

    /// A focus interval started.
    pub fn focus_started(&self, settings: &Settings) {
        self.play_sound(settings, SoundKind::Start);
    }

    /// A break interval started.
    pub fn break_started(&self, settings: &Settings) {
        self.play_sound(settings, SoundKind::Break);
    }

    /// A focus interval ran to completion.
    pub fn focus_completed(&self, settings: &Settings, task_title: Option<&str>) {
        self.play_sound(settings, SoundKind::Complete);

        let body = match task_title {
            Some(title) => format!("タスク: {} - お疲れさまでした！", title),
            None => FOCUS_COMPLETE_BODY.to_string(),
        };
        self.notify(settings, FOCUS_COMPLETE_TITLE, &body);
    }

    /// A break interval ran to completion.
    pub fn break_completed(&self, settings: &Settings) {
        self.play_sound(settings, SoundKind::Start);
        self.notify(settings, BREAK_COMPLETE_TITLE, BREAK_COMPLETE_BODY);
    }

    /// Plays `kind` if sound is enabled.
    pub fn play_sound(&self, settings: &Settings, kind: SoundKind) {
        if !settings.sound_enabled {
            return;
        }
        let Some(player) = &self.sound else {
            debug!("No sound player, skipping {:?}", kind);
            return;
        };
        if let Err(e) = player.play(kind) {
            warn!("Failed to play sound: {}", e);
        }
    }

    /// Shows a notification if enabled and permitted.
    pub fn notify(&self, settings: &Settings, title: &str, body: &str) {
        if !settings.notifications_enabled {
            return;
        }
        let Some(backend) = &self.backend else {
            debug!("No notification backend, skipping '{}'", title);
            return;
        };
        let permission = backend.permission();
        if permission != Permission::Granted {
            debug!("Notification '{}' suppressed: {:?}", title, permission);
            return;
        }
        if let Err(e) = backend.show(title, body) {
            warn!("Failed to show notification: {} ({})", e, e.suggestion());
        }
    }

    fn request_permission_if_undetermined(&self) {
        if let Some(backend) = &self.backend {
            if backend.permission() == Permission::Undetermined {
                let outcome = backend.request_permission();
                debug!("Notification permission requested: {:?}", outcome);
            }
        }
    }
}

impl std::fmt::Debug for NotificationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationGateway")
            .field("sound", &self.has_sound())
            .field("notifications", &self.has_notifications())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::MockNotificationBackend;
    use crate::sound::MockSoundPlayer;

    fn gateway_with(
        settings: &Settings,
        backend: MockNotificationBackend,
    ) -> (NotificationGateway, Arc<MockSoundPlayer>, Arc<MockNotificationBackend>) {
        let sound = Arc::new(MockSoundPlayer::new());
        let backend = Arc::new(backend);
        let gateway = NotificationGateway::new(
            Some(sound.clone() as Arc<dyn SoundPlayer>),
            Some(backend.clone() as Arc<dyn NotificationBackend>),
            settings,
        );
        (gateway, sound, backend)
    }

    mod permission_tests {
        use super::*;

        #[test]
        fn test_requests_undetermined_permission_on_construction() {
            let (_, _, backend) =
                gateway_with(&Settings::default(), MockNotificationBackend::undetermined());
            assert_eq!(backend.request_count(), 1);
            assert_eq!(backend.permission(), Permission::Granted);
        }

        #[test]
        fn test_no_request_when_notifications_disabled() {
            let settings = Settings {
                notifications_enabled: false,
                ..Settings::default()
            };
            let (_, _, backend) = gateway_with(&settings, MockNotificationBackend::undetermined());
            assert_eq!(backend.request_count(), 0);
        }

        #[test]
        fn test_no_request_when_already_granted() {
            let (_, _, backend) = gateway_with(&Settings::default(), MockNotificationBackend::new());
            assert_eq!(backend.request_count(), 0);
        }

        #[test]
        fn test_enabling_notifications_requests_permission() {
            let disabled = Settings {
                notifications_enabled: false,
                ..Settings::default()
            };
            let (gateway, _, backend) =
                gateway_with(&disabled, MockNotificationBackend::undetermined());
            assert_eq!(backend.request_count(), 0);

            gateway.on_settings_changed(&SettingsChange {
                previous: disabled,
                current: Settings::default(),
            });

            assert_eq!(backend.request_count(), 1);
            assert_eq!(backend.permission(), Permission::Granted);
        }

        #[test]
        fn test_denied_permission_is_not_asked_again() {
            let disabled = Settings {
                notifications_enabled: false,
                ..Settings::default()
            };
            let mock = MockNotificationBackend::new();
            mock.set_permission(Permission::Denied);
            let (gateway, _, backend) = gateway_with(&disabled, mock);

            gateway.on_settings_changed(&SettingsChange {
                previous: disabled,
                current: Settings::default(),
            });

            assert_eq!(backend.request_count(), 0);
            assert_eq!(backend.permission(), Permission::Denied);
        }

        #[test]
        fn test_unrelated_change_does_not_request() {
            let quiet = Settings {
                notifications_enabled: false,
                ..Settings::default()
            };
            let (gateway, _, backend) = gateway_with(&quiet, MockNotificationBackend::undetermined());

            gateway.on_settings_changed(&SettingsChange {
                previous: quiet,
                current: quiet.with_focus_minutes(30),
            });

            assert_eq!(backend.request_count(), 0);
        }
    }

    mod delivery_tests {
        use super::*;

        #[test]
        fn test_focus_completed_with_task_title() {
            let (gateway, sound, backend) =
                gateway_with(&Settings::default(), MockNotificationBackend::new());

            gateway.focus_completed(&Settings::default(), Some("API実装"));

            assert_eq!(sound.get_play_calls(), vec![SoundKind::Complete]);
            assert_eq!(
                backend.get_notifications(),
                vec![(
                    "集中セッション完了！".to_string(),
                    "タスク: API実装 - お疲れさまでした！".to_string()
                )]
            );
        }

        #[test]
        fn test_focus_completed_without_task() {
            let (gateway, _, backend) =
                gateway_with(&Settings::default(), MockNotificationBackend::new());

            gateway.focus_completed(&Settings::default(), None);

            assert_eq!(backend.get_notifications()[0].1, "休憩しましょう！");
        }

        #[test]
        fn test_break_completed_plays_start_sound() {
            let (gateway, sound, backend) =
                gateway_with(&Settings::default(), MockNotificationBackend::new());

            gateway.break_completed(&Settings::default());

            assert_eq!(sound.get_play_calls(), vec![SoundKind::Start]);
            assert_eq!(backend.get_notifications()[0].0, "休憩終了！");
        }

        #[test]
        fn test_starts_only_play_sounds() {
            let (gateway, sound, backend) =
                gateway_with(&Settings::default(), MockNotificationBackend::new());

            gateway.focus_started(&Settings::default());
            gateway.break_started(&Settings::default());

            assert_eq!(sound.get_play_calls(), vec![SoundKind::Start, SoundKind::Break]);
            assert_eq!(backend.notification_count(), 0);
        }

        #[test]
        fn test_disabled_settings_suppress_everything() {
            let quiet = Settings {
                sound_enabled: false,
                notifications_enabled: false,
                ..Settings::default()
            };
            let (gateway, sound, backend) = gateway_with(&quiet, MockNotificationBackend::new());

            gateway.focus_completed(&quiet, None);

            assert_eq!(sound.play_count(), 0);
            assert_eq!(backend.notification_count(), 0);
        }

        #[test]
        fn test_denied_permission_suppresses_notification() {
            let mock = MockNotificationBackend::new();
            mock.set_permission(Permission::Denied);
            let (gateway, sound, backend) = gateway_with(&Settings::default(), mock);

            gateway.break_completed(&Settings::default());

            assert_eq!(sound.play_count(), 1);
            assert_eq!(backend.notification_count(), 0);
        }

        #[test]
        fn test_failures_are_swallowed() {
            let (gateway, sound, backend) =
                gateway_with(&Settings::default(), MockNotificationBackend::new());
            sound.set_should_fail(true);
            backend.set_should_fail(true);

            gateway.focus_completed(&Settings::default(), None);

            assert_eq!(sound.play_count(), 0);
            assert_eq!(backend.notification_count(), 0);
        }

        #[test]
        fn test_disabled_gateway_is_silent() {
            let gateway = NotificationGateway::disabled();
            assert!(!gateway.has_sound());
            assert!(!gateway.has_notifications());
            gateway.focus_completed(&Settings::default(), Some("x"));
        }
    }
}
