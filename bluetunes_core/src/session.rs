use crate::{
    bus::{BusError, MediaBus},
    notification::{
        Change, ChangeNotification, PlayerChange, PlayerStatus, TransportState, PLAYER_IFACE, TRANSPORT_IFACE,
    },
    pipeline::PipelineReceiver,
    value::Value,
    view::{Panel, PlayPause, ViewModel},
};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

pub const VOLUME_MAX: u16 = 127;
pub const DEFAULT_VOLUME_STEP: u16 = 4;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no media player is connected")]
    NoPlayer,
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Object paths of the transport and player in use. Held as one optional value,
/// so there is never a player without a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackRef {
    pub transport: String,
    pub player: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No player yet.
    Waiting,
    /// A player was found and the view seeded from it.
    Discovered,
    /// Notifications were applied to an existing player.
    Updated { processed: usize },
    /// The remote device went away; back to waiting.
    Disconnected,
}

impl TickOutcome {
    /// Nothing happened: still waiting, or an empty batch.
    pub fn is_idle(&self) -> bool {
        matches!(self, TickOutcome::Waiting | TickOutcome::Updated { processed: 0 })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeDirection {
    Up,
    Down,
}

/// Step a transport volume, clamping to `0..=VOLUME_MAX`.
pub fn step_volume(current: u16, direction: VolumeDirection, step: u16) -> u16 {
    let current = current.min(VOLUME_MAX);
    match direction {
        VolumeDirection::Up => current.saturating_add(step).min(VOLUME_MAX),
        VolumeDirection::Down => current.saturating_sub(step),
    }
}

/// Consumer side of the pipeline: owns the bus handle, the cached player references and the view.
pub struct Session<B> {
    bus: B,
    receiver: PipelineReceiver,
    playback: Option<PlaybackRef>,
    view: ViewModel,
    volume_step: u16,
}

impl<B: MediaBus> Session<B> {
    pub fn new(bus: B, receiver: PipelineReceiver, view: ViewModel) -> Self {
        Self {
            bus,
            receiver,
            playback: None,
            view,
            volume_step: DEFAULT_VOLUME_STEP,
        }
    }

    pub fn with_volume_step(mut self, step: u16) -> Self {
        self.volume_step = step;
        self
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
    pub fn view(&self) -> &ViewModel {
        &self.view
    }
    pub fn view_mut(&mut self) -> &mut ViewModel {
        &mut self.view
    }
    pub fn playback(&self) -> Option<&PlaybackRef> {
        self.playback.as_ref()
    }

    /// Run one refresh cycle. Without a player this only attempts discovery; with one it
    /// applies every queued notification in order.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.playback.is_none() {
            // The property snapshot read on discovery supersedes anything queued before it. When
            // discovery finds nothing the queue is still emptied, so it cannot grow while waiting.
            let stale = self.receiver.drain_all();
            if !stale.is_empty() {
                trace!(count = stale.len(), "discarding notifications received without a player");
            }
            return self.discover();
        }

        let batch = self.receiver.drain_all();
        let total = batch.len();
        for (i, notification) in batch.iter().enumerate() {
            if self.apply(notification) {
                let dropped = total - i - 1;
                if dropped > 0 {
                    debug!(dropped, "dropping notifications queued after disconnect");
                }
                return Ok(TickOutcome::Disconnected);
            }
        }
        Ok(TickOutcome::Updated { processed: total })
    }

    fn find_single(&self, interface: &str) -> Result<Option<String>, SessionError> {
        let mut paths = self.bus.find_objects(interface)?;
        match paths.len() {
            0 => Ok(None),
            1 => Ok(paths.pop()),
            count => {
                error!(interface, count, ?paths, "multiple objects found for interface");
                Ok(None)
            }
        }
    }

    fn discover(&mut self) -> Result<TickOutcome, SessionError> {
        let Some(transport) = self.find_single(TRANSPORT_IFACE)? else {
            return Ok(TickOutcome::Waiting);
        };
        let Some(player) = self.find_single(PLAYER_IFACE)? else {
            return Ok(TickOutcome::Waiting);
        };
        let props = self.bus.get_all(&player, PLAYER_IFACE)?;
        info!(%transport, %player, "found a media player");

        self.apply_player(&PlayerChange::decode(&props));
        self.playback = Some(PlaybackRef { transport, player });
        self.view.set_panel(Panel::Active);
        Ok(TickOutcome::Discovered)
    }

    fn apply_player(&mut self, change: &PlayerChange) {
        if let Some(track) = &change.track {
            info!(title = ?track.title, artist = ?track.artist, "updating track");
            self.view.set_track(track);
        }
        if let Some(status) = &change.status {
            debug!(?status, "media player status");
            self.view.set_play_pause(if status.is_playing() {
                PlayPause::Pause
            } else {
                PlayPause::Play
            });
        }
        if let Some(name) = &change.name {
            debug!(%name, "media player name");
            self.view.set_display_name(Some(name));
        }
        if let Some(position) = change.position {
            trace!(position, "media player position");
        }
    }

    /// Returns true when the notification ended the session.
    fn apply(&mut self, notification: &ChangeNotification) -> bool {
        match notification.decode() {
            Change::Player(change) => self.apply_player(&change),
            Change::Transport(change) => {
                if let Some(state) = change.state {
                    debug!(?state, "media transport state");
                    match state {
                        TransportState::Idle => self.view.set_play_pause(PlayPause::Play),
                        TransportState::Active => self.view.set_play_pause(PlayPause::Pause),
                        TransportState::Pending | TransportState::Other(_) => {}
                    }
                }
                if let Some(volume) = change.volume {
                    debug!(volume, "media transport volume");
                }
            }
            Change::Device(change) => {
                if let Some(connected) = change.connected {
                    debug!(connected, "remote device connection changed");
                    if !connected {
                        info!("the remote device disconnected");
                        self.playback = None;
                        self.view.set_display_name(None);
                        self.view.set_panel(Panel::Waiting);
                        return true;
                    }
                }
            }
            Change::Control => debug!("media control properties changed"),
            Change::Unrecognized(interface) => {
                warn!(%interface, changed = ?notification.changed, "unrecognized interface in pipeline")
            }
        }
        false
    }

    fn require_playback(&self) -> Result<&PlaybackRef, SessionError> {
        self.playback.as_ref().ok_or(SessionError::NoPlayer)
    }

    /// Pause if the remote reports playing, otherwise play. Returns the new button label.
    pub fn toggle_play_pause(&mut self) -> Result<PlayPause, SessionError> {
        let player = self.require_playback()?.player.clone();
        let status = self
            .bus
            .get(&player, PLAYER_IFACE, "Status")?
            .as_str()
            .map(PlayerStatus::parse)
            .ok_or_else(|| BusError::PropertyType { name: "Status".into() })?;
        if status.is_playing() {
            info!("user paused playing");
            self.bus.call(&player, PLAYER_IFACE, "Pause")?;
            self.view.set_play_pause(PlayPause::Play);
        } else {
            info!("user started playing");
            self.bus.call(&player, PLAYER_IFACE, "Play")?;
            self.view.set_play_pause(PlayPause::Pause);
        }
        Ok(self.view.play_pause())
    }

    pub fn skip(&self) -> Result<(), SessionError> {
        let player = &self.require_playback()?.player;
        info!("user skipped playing");
        self.bus.call(player, PLAYER_IFACE, "Next")?;
        Ok(())
    }

    pub fn volume_up(&self) -> Result<u16, SessionError> {
        self.adjust_volume(VolumeDirection::Up)
    }

    pub fn volume_down(&self) -> Result<u16, SessionError> {
        self.adjust_volume(VolumeDirection::Down)
    }

    fn adjust_volume(&self, direction: VolumeDirection) -> Result<u16, SessionError> {
        let transport = &self.require_playback()?.transport;
        let current = self
            .bus
            .get(transport, TRANSPORT_IFACE, "Volume")?
            .as_u16()
            .ok_or_else(|| BusError::PropertyType { name: "Volume".into() })?;
        let next = step_volume(current, direction, self.volume_step);
        info!(?direction, current, next, "user changed the volume");
        self.bus.set(transport, TRANSPORT_IFACE, "Volume", Value::U16(next))?;
        Ok(next)
    }

    /// Re-read the player's properties and re-seed the view.
    pub fn refresh(&mut self) -> Result<(), SessionError> {
        let player = self.require_playback()?.player.clone();
        info!("user refreshed");
        let props = self.bus.get_all(&player, PLAYER_IFACE)?;
        self.apply_player(&PlayerChange::decode(&props));
        Ok(())
    }
}
