use std::sync::{Arc, Mutex};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::settings::SettingsStore;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    Granted,
    Denied,
    #[default]
    NotAsked,
}

/// Local (on-device) notification facility.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;
    /// Asks the user once; returns the resulting permission.
    fn request_permission(&self) -> Permission;
    fn show(&self, title: &str, body: &str);
}

/// Writes notifications to the log. Answers permission prompts with the
/// configured decision.
#[derive(Debug)]
pub struct LogNotifier {
    permission: Mutex<Permission>,
    answer: Permission,
}

impl LogNotifier {
    pub fn new(initial: Permission, answer: Permission) -> Self {
        Self {
            permission: Mutex::new(initial),
            answer,
        }
    }
}

impl Notifier for LogNotifier {
    fn permission(&self) -> Permission {
        self.permission.lock().map(|p| *p).unwrap_or(Permission::Denied)
    }

    fn request_permission(&self) -> Permission {
        match self.permission.lock() {
            Ok(mut guard) => {
                if *guard == Permission::NotAsked {
                    *guard = self.answer;
                    info!("Notification permission resolved to {:?}", self.answer);
                }
                *guard
            }
            Err(_) => Permission::Denied,
        }
    }

    fn show(&self, title: &str, body: &str) {
        info!("[notification] {title}: {body}");
    }
}

/// Writes the answer of a permission prompt back to the settings file so the
/// next launch starts from the user's decision instead of prompting again.
pub struct RememberedPermission<N> {
    inner: N,
    settings: Arc<SettingsStore>,
}

impl<N: Notifier> RememberedPermission<N> {
    pub fn new(inner: N, settings: Arc<SettingsStore>) -> Self {
        Self { inner, settings }
    }
}

impl<N: Notifier> Notifier for RememberedPermission<N> {
    fn permission(&self) -> Permission {
        self.inner.permission()
    }

    fn request_permission(&self) -> Permission {
        let answer = self.inner.request_permission();
        if answer == Permission::NotAsked {
            return answer;
        }

        let mut notifications = self.settings.current().notifications;
        if notifications.permission != answer {
            notifications.permission = answer;
            if let Err(err) = self.settings.update_notifications(notifications) {
                warn!("Failed to remember notification permission: {err:#}");
            }
        }
        answer
    }

    fn show(&self, title: &str, body: &str) {
        self.inner.show(title, body);
    }
}

/// Test double that records prompts and deliveries.
#[cfg(test)]
#[derive(Debug)]
pub struct RecordingNotifier {
    permission: Mutex<Permission>,
    answer: Permission,
    prompts: Mutex<usize>,
    shown: Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new(initial: Permission, answer: Permission) -> Self {
        Self {
            permission: Mutex::new(initial),
            answer,
            prompts: Mutex::new(0),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(Permission::Granted, Permission::Granted)
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().map(|count| *count).unwrap_or(0)
    }

    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown
            .lock()
            .map(|shown| shown.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.permission.lock().map(|p| *p).unwrap_or(Permission::Denied)
    }

    fn request_permission(&self) -> Permission {
        if let Ok(mut prompts) = self.prompts.lock() {
            *prompts += 1;
        }
        match self.permission.lock() {
            Ok(mut guard) => {
                *guard = self.answer;
                *guard
            }
            Err(_) => Permission::Denied,
        }
    }

    fn show(&self, title: &str, body: &str) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push((title.to_owned(), body.to_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_notifier_only_resolves_an_unasked_permission() {
        let notifier = LogNotifier::new(Permission::NotAsked, Permission::Granted);
        assert_eq!(notifier.request_permission(), Permission::Granted);

        let denied = LogNotifier::new(Permission::Denied, Permission::Granted);
        assert_eq!(denied.request_permission(), Permission::Denied);
        assert_eq!(denied.permission(), Permission::Denied);
    }

    #[test]
    fn resolved_permission_is_written_to_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Arc::new(SettingsStore::new(path.clone()).unwrap());
        let notifier = RememberedPermission::new(
            RecordingNotifier::new(Permission::NotAsked, Permission::Denied),
            settings.clone(),
        );

        assert_eq!(notifier.request_permission(), Permission::Denied);
        assert_eq!(notifier.inner.prompt_count(), 1);
        assert_eq!(settings.current().notifications.permission, Permission::Denied);

        let reloaded = SettingsStore::new(path).unwrap().current();
        assert_eq!(reloaded.notifications.permission, Permission::Denied);
        assert!(reloaded.notifications.enabled);
    }

    #[test]
    fn unresolved_prompt_leaves_settings_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Arc::new(SettingsStore::new(path.clone()).unwrap());
        let notifier = RememberedPermission::new(
            RecordingNotifier::new(Permission::NotAsked, Permission::NotAsked),
            settings,
        );

        assert_eq!(notifier.request_permission(), Permission::NotAsked);
        assert!(!path.exists());
    }

    #[test]
    fn permission_uses_camel_case_in_config() {
        let parsed: Permission = serde_json::from_str("\"notAsked\"").unwrap();
        assert_eq!(parsed, Permission::NotAsked);
    }
}
