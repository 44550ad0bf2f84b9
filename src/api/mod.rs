pub mod client;
pub mod error;
pub mod responses;

pub use client::*;
pub use error::*;
pub use responses::*;

use async_trait::async_trait;

use crate::config::StrategySettings;
use crate::types::PrivateKey;

/// The bot's JSON control surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn stats(&self) -> Result<StatsSnapshot, ApiError>;
    async fn current_settings(&self) -> Result<StrategySettings, ApiError>;
    async fn start(&self) -> Result<ControlResponse, ApiError>;
    async fn stop(&self) -> Result<ControlResponse, ApiError>;
    async fn reset_stats(&self) -> Result<ControlResponse, ApiError>;
    async fn save_settings(&self, settings: &StrategySettings) -> Result<ControlResponse, ApiError>;
    async fn set_private_key(&self, key: &PrivateKey) -> Result<WalletResponse, ApiError>;
    async fn refresh_balances(&self) -> Result<BalanceResponse, ApiError>;
}
