//! Operator actions. Each one is split into the request (an API call) and an
//! `apply_*` step that folds the answer into the session, so the live view
//! can run requests on background tasks and apply them on its own loop.

use anyhow::{anyhow, bail, Result};
use tracing::{info, warn};

use super::state::DashboardSession;
use crate::api::{
    ApiError, BalanceResponse, ControlResponse, ControlStatus, DashboardApi, WalletResponse,
};
use crate::config::{SettingsEditor, StrategySettings};
use crate::engine::RunMode;
use crate::storage::LocalStore;
use crate::types::{LogLevel, PrivateKey};

pub const WALLET_REQUIRED: &str = "Please connect your wallet first";

fn failure(action: &str, err: &ApiError) -> anyhow::Error {
    anyhow!("Failed to {}: {}", action, err.user_message())
}

fn response_message(status: &ControlStatus, message: &Option<String>) -> String {
    message.clone().unwrap_or_else(|| status.to_string())
}

pub async fn refresh_stats(api: &dyn DashboardApi, session: &mut DashboardSession) -> Result<bool> {
    let snapshot = api.stats().await.map_err(|e| failure("fetch stats", &e))?;
    Ok(session.apply_snapshot(snapshot))
}

pub fn apply_settings(
    session: &mut DashboardSession,
    response: Result<StrategySettings, ApiError>,
) -> Result<StrategySettings> {
    let settings = response.map_err(|e| failure("load settings", &e))?;
    session.settings = Some(SettingsEditor::new(settings.clone()));
    Ok(settings)
}

pub async fn load_settings(api: &dyn DashboardApi, session: &mut DashboardSession) -> Result<StrategySettings> {
    let response = api.current_settings().await;
    apply_settings(session, response)
}

pub fn apply_start(
    session: &mut DashboardSession,
    store: &LocalStore,
    response: Result<ControlResponse, ApiError>,
) -> Result<()> {
    let response = response.map_err(|e| failure("start bot", &e))?;
    session
        .confirm_start(&response.status)
        .map_err(|_| anyhow!("Failed to start bot: {}", response_message(&response.status, &response.message)))?;
    store.store_run_mode(RunMode::Running)?;
    session.add_local_log(LogLevel::Info, "Bot started");
    Ok(())
}

pub async fn start(api: &dyn DashboardApi, store: &LocalStore, session: &mut DashboardSession) -> Result<()> {
    if !session.wallet_connected() {
        bail!(WALLET_REQUIRED);
    }
    let response = api.start().await;
    apply_start(session, store, response)
}

pub fn apply_stop(
    session: &mut DashboardSession,
    store: &LocalStore,
    response: Result<ControlResponse, ApiError>,
) -> Result<()> {
    let response = response.map_err(|e| failure("stop bot", &e))?;
    session
        .confirm_stop(&response.status)
        .map_err(|_| anyhow!("Failed to stop bot: {}", response_message(&response.status, &response.message)))?;
    store.store_run_mode(RunMode::Stopped)?;
    session.add_local_log(LogLevel::Info, "Bot stopped");
    Ok(())
}

pub async fn stop(api: &dyn DashboardApi, store: &LocalStore, session: &mut DashboardSession) -> Result<()> {
    let response = api.stop().await;
    apply_stop(session, store, response)
}

pub fn apply_reset_stats(session: &mut DashboardSession, response: Result<ControlResponse, ApiError>) -> Result<()> {
    let response = response.map_err(|e| failure("reset stats", &e))?;
    match response.status {
        ControlStatus::StatsReset | ControlStatus::Success => {
            session.add_local_log(LogLevel::Info, "Statistics reset");
            Ok(())
        }
        other => bail!("Failed to reset stats: {}", response_message(&other, &response.message)),
    }
}

pub async fn reset_stats(api: &dyn DashboardApi, session: &mut DashboardSession) -> Result<()> {
    let response = api.reset_stats().await;
    apply_reset_stats(session, response)?;
    // Pull the zeroed counters right away rather than waiting for the next tick.
    if let Err(err) = refresh_stats(api, session).await {
        warn!(?err, "stats refresh after reset failed");
    }
    Ok(())
}

pub fn apply_wallet(
    session: &mut DashboardSession,
    store: &LocalStore,
    key: &PrivateKey,
    response: Result<WalletResponse, ApiError>,
) -> Result<()> {
    let response = response.map_err(|e| anyhow!("Error connecting wallet: {}", e.user_message()))?;
    if response.status != ControlStatus::Success {
        bail!(
            "Error connecting wallet: {}",
            response.message.as_deref().unwrap_or("Unknown error")
        );
    }

    store.store_credential(key)?;
    session.set_wallet(response.wallet_address.clone());
    session.update_balances(response.current_balance, response.s_token_balance);
    session.alert = None;
    info!("Wallet connected");
    session.add_local_log(LogLevel::Info, "Wallet connected");
    Ok(())
}

/// Validates the key locally, then hands it to the bot.
pub async fn connect_wallet(
    api: &dyn DashboardApi,
    store: &LocalStore,
    session: &mut DashboardSession,
    raw_key: &str,
) -> Result<()> {
    let key = PrivateKey::parse(raw_key).map_err(|message| anyhow!(message))?;
    let response = api.set_private_key(&key).await;
    apply_wallet(session, store, &key, response)
}

/// Re-sends the stored credential. A rejected credential is forgotten.
/// Returns whether a wallet is connected afterwards.
pub async fn reconnect(api: &dyn DashboardApi, store: &LocalStore, session: &mut DashboardSession) -> Result<bool> {
    let key = match store.credential() {
        Ok(Some(key)) => key,
        Ok(None) => return Ok(false),
        Err(err) => {
            warn!(%err, "discarding unreadable stored credential");
            store.clear_credential()?;
            return Ok(false);
        }
    };

    let response = api.set_private_key(&key).await;
    match apply_wallet(session, store, &key, response) {
        Ok(()) => Ok(true),
        Err(err) => {
            warn!(%err, "stored credential was not accepted");
            store.clear_credential()?;
            Ok(false)
        }
    }
}

/// Forgets the credential. A running bot is asked to stop (best effort) and
/// the dashboard is marked stopped whatever the bot answered.
pub async fn disconnect(api: &dyn DashboardApi, store: &LocalStore, session: &mut DashboardSession) -> Result<()> {
    if session.is_running() {
        if let Err(err) = api.stop().await {
            warn!(%err, "stop request during disconnect failed");
        }
    }
    apply_disconnect(session, store)
}

pub fn apply_disconnect(session: &mut DashboardSession, store: &LocalStore) -> Result<()> {
    session.force_stop();
    session.clear_wallet();
    store.clear_credential()?;
    store.store_run_mode(RunMode::Stopped)?;
    info!("Wallet disconnected");
    session.add_local_log(LogLevel::Info, "Wallet disconnected");
    Ok(())
}

pub fn apply_balances(session: &mut DashboardSession, response: Result<BalanceResponse, ApiError>) -> Result<()> {
    let response = response.map_err(|e| failure("refresh balances", &e))?;
    if response.status != ControlStatus::Success {
        bail!("Failed to refresh balances: {}", response.status);
    }
    session.update_balances(response.current_balance, response.s_token_balance);
    Ok(())
}

pub async fn refresh_balances(api: &dyn DashboardApi, session: &mut DashboardSession) -> Result<()> {
    let response = api.refresh_balances().await;
    apply_balances(session, response)
}

/// The validated draft of the session's settings editor, ready to post.
pub fn settings_draft(session: &DashboardSession) -> Result<StrategySettings> {
    let editor = session
        .settings
        .as_ref()
        .ok_or_else(|| anyhow!("Settings have not been loaded"))?;
    editor.finish().map_err(|message| anyhow!(message))
}

/// The editor only commits once the bot accepts; a rejected draft stays in
/// edit mode.
pub fn apply_save(
    session: &mut DashboardSession,
    draft: StrategySettings,
    response: Result<ControlResponse, ApiError>,
) -> Result<StrategySettings> {
    let response = response.map_err(|e| failure("save settings", &e))?;
    if !response.is_success() {
        bail!(
            "Failed to save settings: {}",
            response_message(&response.status, &response.message)
        );
    }

    match session.settings.as_mut() {
        Some(editor) => editor.commit(draft.clone()),
        None => session.settings = Some(SettingsEditor::new(draft.clone())),
    }
    session.add_local_log(LogLevel::Info, "Bot settings updated successfully");
    Ok(draft)
}

pub async fn save_settings(api: &dyn DashboardApi, session: &mut DashboardSession) -> Result<StrategySettings> {
    let draft = settings_draft(session)?;
    let response = api.save_settings(&draft).await;
    apply_save(session, draft, response)
}

pub fn toggle_theme(session: &mut DashboardSession, store: &LocalStore) -> Result<()> {
    session.theme = session.theme.toggle();
    store.store_theme(session.theme)?;
    Ok(())
}
