use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::actions;
use super::input::{TerminalGuard, UserCommand};
use super::render::render_frame;
use super::state::DashboardSession;
use crate::api::{ApiError, BalanceResponse, ControlResponse, DashboardApi, StatsSnapshot};
use crate::config::{DisplayConfig, PollingConfig, SettingsField, StrategySettings};
use crate::storage::LocalStore;

const RESET_CONFIRM: &str = "Press z again to reset all statistics";

/// Answers from requests running on background tasks.
#[derive(Debug)]
pub enum PollEvent {
    Stats(Result<StatsSnapshot, ApiError>),
    Status(Result<StatsSnapshot, ApiError>),
    BetCheck(Result<StatsSnapshot, ApiError>),
    Started(Result<ControlResponse, ApiError>),
    Stopped(Result<ControlResponse, ApiError>),
    StatsReset(Result<ControlResponse, ApiError>),
    Balances(Result<BalanceResponse, ApiError>),
    SettingsLoaded(Result<StrategySettings, ApiError>),
    SettingsSaved(StrategySettings, Result<ControlResponse, ApiError>),
}

/// Drives the live view. Requests never block the loop: each one runs on its
/// own task and reports back through the event channel, so a slow bot only
/// delays its own answer. The session is only touched from the loop.
pub struct Poller {
    api: Arc<dyn DashboardApi>,
    store: LocalStore,
    session: DashboardSession,
    display: DisplayConfig,
    stats_interval: Duration,
    status_interval: Duration,
    events_tx: mpsc::UnboundedSender<PollEvent>,
    events_rx: mpsc::UnboundedReceiver<PollEvent>,
    reset_armed: bool,
}

impl Poller {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        store: LocalStore,
        session: DashboardSession,
        polling: &PollingConfig,
        display: DisplayConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            store,
            session,
            display,
            stats_interval: Duration::from_millis(polling.stats_interval_ms),
            status_interval: Duration::from_millis(polling.status_interval_ms),
            events_tx,
            events_rx,
            reset_armed: false,
        }
    }

    fn spawn_request<F, Fut>(&self, request: F)
    where
        F: FnOnce(Arc<dyn DashboardApi>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = PollEvent> + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = request(api).await;
            if tx.send(event).is_err() {
                debug!("Poller gone before request finished");
            }
        });
    }

    fn on_stats_tick(&self) {
        self.spawn_request(|api| async move { PollEvent::Stats(api.stats().await) });
        if self.session.is_running() && self.session.currently_betting {
            self.spawn_request(|api| async move { PollEvent::BetCheck(api.stats().await) });
        }
    }

    fn on_status_tick(&self) {
        if self.session.is_running() {
            self.spawn_request(|api| async move { PollEvent::Status(api.stats().await) });
        }
    }

    fn report(&mut self, outcome: anyhow::Result<()>) {
        match outcome {
            Ok(()) => self.session.alert = None,
            Err(err) => {
                warn!(%err, "dashboard action failed");
                self.session.alert = Some(err.to_string());
            }
        }
    }

    pub fn apply_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Stats(Ok(snapshot)) => {
                if !self.session.apply_snapshot(snapshot) {
                    debug!("Stats snapshot had no balance");
                }
            }
            PollEvent::Stats(Err(err)) => warn!(%err, "stats fetch failed"),
            PollEvent::Status(Ok(snapshot)) => self.session.apply_status(snapshot),
            PollEvent::Status(Err(err)) => warn!(%err, "status fetch failed"),
            PollEvent::BetCheck(Ok(snapshot)) => self.session.apply_bet_check(&snapshot),
            PollEvent::BetCheck(Err(err)) => debug!("Bet check failed: {}", err),
            PollEvent::Started(result) => {
                let outcome = actions::apply_start(&mut self.session, &self.store, result);
                self.report(outcome);
            }
            PollEvent::Stopped(result) => {
                let outcome = actions::apply_stop(&mut self.session, &self.store, result);
                self.report(outcome);
            }
            PollEvent::StatsReset(result) => {
                let outcome = actions::apply_reset_stats(&mut self.session, result);
                let refresh = outcome.is_ok();
                self.report(outcome);
                if refresh {
                    self.spawn_request(|api| async move { PollEvent::Stats(api.stats().await) });
                }
            }
            PollEvent::Balances(result) => {
                let outcome = actions::apply_balances(&mut self.session, result);
                self.report(outcome);
            }
            PollEvent::SettingsLoaded(result) => {
                let outcome = actions::apply_settings(&mut self.session, result).map(|_| ());
                let loaded = outcome.is_ok();
                self.report(outcome);
                if loaded {
                    self.begin_settings_edit();
                }
            }
            PollEvent::SettingsSaved(draft, result) => {
                let outcome = actions::apply_save(&mut self.session, draft, result).map(|_| ());
                self.report(outcome);
            }
        }
    }

    /// Opens the settings form, fetching the bot's settings first when the
    /// dashboard has none yet.
    fn begin_settings_edit(&mut self) {
        match self.session.settings.as_mut() {
            Some(editor) => {
                editor.begin_edit();
                self.session.edit_field = SettingsField::MinBet;
                debug!("Settings form opened");
            }
            None => {
                self.spawn_request(|api| async move { PollEvent::SettingsLoaded(api.current_settings().await) });
            }
        }
    }

    fn nudge_setting(&mut self, up: bool) {
        let field = self.session.edit_field;
        if let Some(editor) = self.session.settings.as_mut() {
            let outcome = editor.nudge(field, up).map_err(anyhow::Error::msg);
            self.report(outcome);
        }
    }

    fn save_settings(&mut self) {
        match actions::settings_draft(&self.session) {
            Ok(draft) => {
                info!("Saving strategy settings");
                self.spawn_request(move |api| async move {
                    let response = api.save_settings(&draft).await;
                    PollEvent::SettingsSaved(draft, response)
                });
            }
            Err(err) => self.report(Err(err)),
        }
    }

    /// Keys of the settings form. Returns false when the key is not a form
    /// key, so it falls through to the regular bindings.
    fn handle_form_command(&mut self, command: UserCommand) -> bool {
        match command {
            UserCommand::Up => self.session.edit_field = self.session.edit_field.prev(),
            UserCommand::Down => self.session.edit_field = self.session.edit_field.next(),
            UserCommand::Increase => self.nudge_setting(true),
            UserCommand::Decrease => self.nudge_setting(false),
            UserCommand::Defaults => {
                if let Some(editor) = self.session.settings.as_mut() {
                    editor.reset_defaults();
                }
            }
            UserCommand::Confirm => self.save_settings(),
            UserCommand::Cancel => {
                if let Some(editor) = self.session.settings.as_mut() {
                    editor.cancel();
                }
                self.session.alert = None;
            }
            _ => return false,
        }
        true
    }

    /// Returns false when the operator asked to quit.
    pub fn handle_command(&mut self, command: UserCommand) -> bool {
        let armed = std::mem::take(&mut self.reset_armed);

        if self.session.is_editing_settings() && self.handle_form_command(command) {
            return true;
        }

        match command {
            UserCommand::Quit | UserCommand::Cancel => return false,
            UserCommand::Start => {
                if !self.session.wallet_connected() {
                    self.session.alert = Some(actions::WALLET_REQUIRED.to_string());
                } else {
                    info!("Start requested");
                    self.spawn_request(|api| async move { PollEvent::Started(api.start().await) });
                }
            }
            UserCommand::Stop => {
                info!("Stop requested");
                self.spawn_request(|api| async move { PollEvent::Stopped(api.stop().await) });
            }
            UserCommand::RefreshBalances => {
                self.spawn_request(|api| async move { PollEvent::Balances(api.refresh_balances().await) });
            }
            UserCommand::ClearLogs => self.session.clear_logs(),
            UserCommand::ToggleTheme => {
                let outcome = actions::toggle_theme(&mut self.session, &self.store);
                self.report(outcome);
            }
            UserCommand::ResetStats => {
                if armed {
                    self.session.alert = None;
                    self.spawn_request(|api| async move { PollEvent::StatsReset(api.reset_stats().await) });
                } else {
                    self.reset_armed = true;
                    self.session.alert = Some(RESET_CONFIRM.to_string());
                }
            }
            UserCommand::EditSettings => self.begin_settings_edit(),
            UserCommand::Up
            | UserCommand::Down
            | UserCommand::Increase
            | UserCommand::Decrease
            | UserCommand::Defaults
            | UserCommand::Confirm => debug!("{:?} ignored outside the settings form", command),
        }
        true
    }

    fn draw(&self, terminal: &TerminalGuard) -> Result<()> {
        terminal.draw(&render_frame(&self.session, &self.display))
    }

    pub async fn run(
        mut self,
        terminal: &TerminalGuard,
        mut commands: mpsc::UnboundedReceiver<UserCommand>,
    ) -> Result<DashboardSession> {
        let mut stats_tick = time::interval(self.stats_interval);
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_tick = time::interval(self.status_interval);
        status_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Live view started (stats every {:?}, status every {:?})",
            self.stats_interval, self.status_interval
        );
        self.draw(terminal)?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = stats_tick.tick() => self.on_stats_tick(),
                _ = status_tick.tick() => self.on_status_tick(),
                event = self.events_rx.recv() => {
                    if let Some(event) = event {
                        self.apply_event(event);
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command) {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
            self.draw(terminal)?;
        }

        info!("Live view stopped");
        Ok(self.session)
    }
}
