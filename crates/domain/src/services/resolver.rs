//! Device identity resolution.
//!
//! Maps an inbound device identifier to its owning account, adopting
//! unknown devices according to the configured [`UnknownDevicePolicy`].

use std::sync::Arc;

use crate::error::{DomainError, DomainResult, DEVICE_NOT_REGISTERED, NO_ACCOUNTS_AVAILABLE};
use crate::models::{Device, NewDevice};
use crate::repositories::{AccountRepository, DeviceRepository};

/// What to do with a device identifier that has no ownership binding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UnknownDevicePolicy {
    /// Bind to the oldest account (ties broken by user code).
    #[default]
    FirstAvailable,
    /// Bind to this account.
    DefaultAccount(String),
    /// Refuse the event.
    Reject,
}

/// Outcome of resolving a device identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub device: Device,
    /// True when this call created the ownership binding.
    pub adopted: bool,
}

pub struct DeviceIdentityResolver {
    accounts: Arc<dyn AccountRepository>,
    devices: Arc<dyn DeviceRepository>,
    policy: UnknownDevicePolicy,
}

impl DeviceIdentityResolver {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        devices: Arc<dyn DeviceRepository>,
        policy: UnknownDevicePolicy,
    ) -> Self {
        Self {
            accounts,
            devices,
            policy,
        }
    }

    pub fn policy(&self) -> &UnknownDevicePolicy {
        &self.policy
    }

    /// Resolve the owning account of `device_id`, adopting it if needed.
    ///
    /// Adoption writes at most one binding per device. A caller that loses
    /// the race gets the winner's binding with `adopted == false`.
    pub async fn resolve(&self, device_id: &str) -> DomainResult<Resolution> {
        if let Some(device) = self.devices.find_by_device_id(device_id).await? {
            return Ok(Resolution {
                device,
                adopted: false,
            });
        }

        let user_code = match &self.policy {
            UnknownDevicePolicy::Reject => {
                tracing::warn!(device_id = %device_id, "Rejecting event from unregistered device");
                return Err(DomainError::NotFound(DEVICE_NOT_REGISTERED.to_string()));
            }
            UnknownDevicePolicy::FirstAvailable => match self.accounts.first_available().await? {
                Some(account) => account.user_code,
                None => {
                    tracing::error!(
                        device_id = %device_id,
                        operational = true,
                        "Cannot adopt device: no accounts exist"
                    );
                    return Err(DomainError::Configuration(NO_ACCOUNTS_AVAILABLE.to_string()));
                }
            },
            UnknownDevicePolicy::DefaultAccount(code) => {
                match self.accounts.find_by_code(code).await? {
                    Some(account) => account.user_code,
                    None => {
                        tracing::error!(
                            device_id = %device_id,
                            default_account = %code,
                            operational = true,
                            "Cannot adopt device: configured default account does not exist"
                        );
                        return Err(DomainError::Configuration(format!(
                            "Default account {} does not exist",
                            code
                        )));
                    }
                }
            }
        };

        let (device, created) = self
            .devices
            .bind_if_absent(NewDevice::adopted(device_id, &user_code))
            .await?;

        if created {
            tracing::info!(
                device_id = %device.device_id,
                user_code = %device.user_code,
                "Adopted unregistered device"
            );
        }

        Ok(Resolution {
            device,
            adopted: created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryStore;
    use chrono::{TimeZone, Utc};

    fn resolver(store: &Arc<InMemoryStore>, policy: UnknownDevicePolicy) -> DeviceIdentityResolver {
        DeviceIdentityResolver::new(store.clone(), store.clone(), policy)
    }

    #[tokio::test]
    async fn test_known_device_resolves_to_owner() {
        let store = InMemoryStore::new();
        store.add_account("DEMO01").await;
        store.add_account("OTHER1").await;
        store.add_device("dev-1", "OTHER1", "Kitchen", None).await;

        let resolution = resolver(&store, UnknownDevicePolicy::FirstAvailable)
            .resolve("dev-1")
            .await
            .unwrap();

        assert_eq!(resolution.device.user_code, "OTHER1");
        assert!(!resolution.adopted);
    }

    #[tokio::test]
    async fn test_unknown_device_adopted_once() {
        let store = InMemoryStore::new();
        store.add_account("DEMO01").await;
        let resolver = resolver(&store, UnknownDevicePolicy::FirstAvailable);

        let first = resolver.resolve("unknown-dev").await.unwrap();
        assert!(first.adopted);
        assert_eq!(first.device.user_code, "DEMO01");
        assert_eq!(first.device.name, "unknown-dev");

        // A later account must not change where the device already lives.
        store
            .add_account_at("AAAA00", Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
            .await;
        let second = resolver.resolve("unknown-dev").await.unwrap();
        assert!(!second.adopted);
        assert_eq!(second.device.user_code, "DEMO01");
        assert_eq!(store.device_count().await, 1);
    }

    #[tokio::test]
    async fn test_first_available_is_oldest_account() {
        let store = InMemoryStore::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.add_account_at("ZED001", at).await;
        store.add_account_at("BETA01", at).await;
        store
            .add_account_at("NEWER1", at + chrono::Duration::days(1))
            .await;

        let resolution = resolver(&store, UnknownDevicePolicy::FirstAvailable)
            .resolve("dev-9")
            .await
            .unwrap();

        assert_eq!(resolution.device.user_code, "BETA01");
    }

    #[tokio::test]
    async fn test_concurrent_adoption_creates_single_binding() {
        let store = InMemoryStore::new();
        store.add_account("DEMO01").await;
        let resolver = Arc::new(resolver(&store, UnknownDevicePolicy::FirstAvailable));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver.resolve("race-dev").await.unwrap()
            }));
        }

        let mut adopted = 0;
        for handle in handles {
            let resolution = handle.await.unwrap();
            assert_eq!(resolution.device.user_code, "DEMO01");
            if resolution.adopted {
                adopted += 1;
            }
        }
        assert_eq!(adopted, 1);
        assert_eq!(store.device_count().await, 1);
    }

    #[tokio::test]
    async fn test_no_accounts_is_configuration_error() {
        let store = InMemoryStore::new();

        let result = resolver(&store, UnknownDevicePolicy::FirstAvailable)
            .resolve("unknown-dev")
            .await;

        match result {
            Err(DomainError::Configuration(msg)) => assert_eq!(msg, NO_ACCOUNTS_AVAILABLE),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
        assert_eq!(store.device_count().await, 0);
    }

    #[tokio::test]
    async fn test_default_account_policy() {
        let store = InMemoryStore::new();
        store.add_account("FIRST1").await;
        store.add_account("HOME01").await;

        let resolution = resolver(
            &store,
            UnknownDevicePolicy::DefaultAccount("HOME01".to_string()),
        )
        .resolve("dev-1")
        .await
        .unwrap();

        assert_eq!(resolution.device.user_code, "HOME01");
        assert!(resolution.adopted);
    }

    #[tokio::test]
    async fn test_missing_default_account_is_configuration_error() {
        let store = InMemoryStore::new();
        store.add_account("FIRST1").await;

        let result = resolver(
            &store,
            UnknownDevicePolicy::DefaultAccount("GHOST1".to_string()),
        )
        .resolve("dev-1")
        .await;

        assert!(matches!(result, Err(DomainError::Configuration(_))));
        assert_eq!(store.device_count().await, 0);
    }

    #[tokio::test]
    async fn test_reject_policy() {
        let store = InMemoryStore::new();
        store.add_account("DEMO01").await;
        store.add_device("dev-1", "DEMO01", "Kitchen", None).await;
        let resolver = resolver(&store, UnknownDevicePolicy::Reject);

        assert!(resolver.resolve("dev-1").await.is_ok());
        match resolver.resolve("dev-2").await {
            Err(DomainError::NotFound(msg)) => assert_eq!(msg, DEVICE_NOT_REGISTERED),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert_eq!(store.device_count().await, 1);
    }
}
