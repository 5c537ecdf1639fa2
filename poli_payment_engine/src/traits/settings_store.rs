use crate::traits::GatewayStoreError;

/// Per-event key-value settings. Values are stored as strings; interpretation is up to the caller.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn fetch_setting(&self, event_id: i64, key: &str) -> Result<Option<String>, GatewayStoreError>;

    async fn save_setting(&self, event_id: i64, key: &str, value: &str) -> Result<(), GatewayStoreError>;

    async fn delete_setting(&self, event_id: i64, key: &str) -> Result<(), GatewayStoreError>;
}
