//! Demo-installation restrictions.
//!
//! A demo installation is a shared, publicly reachable instance. A handful of
//! settings are frozen there (branding, telemetry) and demo accounts cannot
//! change their credentials.

use crate::config::DemoConfig;
use crate::model::UserId;

#[derive(Debug, Clone, Default)]
pub struct DemoService {
    enabled: bool,
    user_ids: Vec<UserId>,
}

impl DemoService {
    pub fn from_config(config: &DemoConfig) -> Self {
        Self {
            enabled: config.enabled,
            user_ids: config.user_ids.clone(),
        }
    }

    #[cfg(test)]
    pub fn demo_environment(user_ids: &[UserId]) -> Self {
        Self {
            enabled: true,
            user_ids: user_ids.to_vec(),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.enabled
    }

    pub fn is_demo_user(&self, id: UserId) -> bool {
        self.enabled && self.user_ids.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_service_restricts_nothing() {
        let service = DemoService::default();
        assert!(!service.is_demo());
        assert!(!service.is_demo_user(1));
    }

    #[test]
    fn only_listed_users_are_demo_users() {
        let service = DemoService::demo_environment(&[1, 2]);
        assert!(service.is_demo());
        assert!(service.is_demo_user(1));
        assert!(!service.is_demo_user(3));
    }
}
