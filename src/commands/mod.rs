use crate::{
    config::{AppConfig, TotalsPolicy},
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    storage::FileStorage,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod amendments;
pub mod bookings;

/// Booking rules that come from configuration.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub crm_prefix: String,
    pub default_currency: String,
    pub totals_policy: TotalsPolicy,
    pub enforce_product_integrity: bool,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            crm_prefix: "TB".to_string(),
            default_currency: "THB".to_string(),
            totals_policy: TotalsPolicy::default(),
            enforce_product_integrity: true,
        }
    }
}

impl From<&AppConfig> for BookingSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            crm_prefix: cfg.crm_prefix.clone(),
            default_currency: cfg.default_currency.clone(),
            totals_policy: cfg.totals_policy,
            enforce_product_integrity: cfg.enforce_product_integrity,
        }
    }
}

/// Dependencies shared by every command.
#[derive(Clone)]
pub struct CommandContext {
    /// Database connection pool for persistence operations
    pub db_pool: Arc<DbPool>,
    /// Channel to publish domain events after commit
    pub event_sender: Arc<EventSender>,
    /// Attachment storage; deletions are best-effort
    pub storage: Arc<dyn FileStorage>,
    pub settings: BookingSettings,
}

/// Command trait for implementing the Command Pattern
///
/// This trait allows for encapsulating all the logic needed to execute a business operation
/// into a single object that can be validated, executed, and produce events.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Returns
    /// * `Result<Self::Result, ServiceError>` - The result of command execution or an error
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError>;
}
