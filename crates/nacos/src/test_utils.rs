//! Test doubles for the config service.

use crate::{
    client::ConfigService,
    types::{ConfigType, NacosError},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// In-memory config service recording how it was called.
#[derive(Debug, Default)]
pub struct MockConfigService {
    configs: Mutex<HashMap<(String, String), String>>,
    get_calls: AtomicUsize,
    publish_calls: AtomicUsize,
    last_get: Mutex<Option<(String, String, u64)>>,
    last_config_type: Mutex<Option<ConfigType>>,
    get_error_status: Mutex<Option<u16>>,
    reject_publish: AtomicBool,
}

impl MockConfigService {
    /// Store `content` under `data_id` in `group`.
    pub fn insert(&self, data_id: &str, group: &str, content: &str) {
        self.configs.lock().insert((data_id.to_string(), group.to_string()), content.to_string());
    }

    /// Content stored under `data_id` in `group`.
    pub fn content(&self, data_id: &str, group: &str) -> Option<String> {
        self.configs.lock().get(&(data_id.to_string(), group.to_string())).cloned()
    }

    /// Number of reads served.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of writes attempted.
    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Arguments of the most recent read.
    pub fn last_get(&self) -> Option<(String, String, u64)> {
        self.last_get.lock().clone()
    }

    /// Content type of the most recent write.
    pub fn last_config_type(&self) -> Option<ConfigType> {
        *self.last_config_type.lock()
    }

    /// Fail every following read with `status`.
    pub fn fail_get_with(&self, status: u16) {
        *self.get_error_status.lock() = Some(status);
    }

    /// Answer every following write with `false`.
    pub fn reject_publish(&self) {
        self.reject_publish.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigService for MockConfigService {
    async fn get_config(
        &self,
        data_id: &str,
        group: &str,
        timeout_ms: u64,
    ) -> Result<Option<String>, NacosError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_get.lock() = Some((data_id.to_string(), group.to_string(), timeout_ms));
        if let Some(status) = *self.get_error_status.lock() {
            return Err(NacosError::Remote { status, message: "injected failure".to_string() });
        }
        Ok(self.content(data_id, group))
    }

    async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
        config_type: ConfigType,
    ) -> Result<bool, NacosError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_config_type.lock() = Some(config_type);
        if self.reject_publish.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.insert(data_id, group, content);
        Ok(true)
    }
}
