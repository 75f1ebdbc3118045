mod os;

use bluetunes_core::{pipeline, Panel, Session, SessionError, ViewModel, PROGRAM_NAME, TXT_WAITING};
use image::{Rgba, RgbaImage};
use os::{connect_bus, start_listener, PlatformBus};
use rfd::{MessageDialog, MessageLevel};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoopBuilder};
use tracing::{debug, info, warn};
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem},
    Icon as TrayIconImage, TrayIcon, TrayIconBuilder,
};

const ICON_SIZE: u32 = 32;
const THEME_BKGD: [u8; 3] = [0x03, 0x1e, 0x42];
const THEME_TXT_COLOR: [u8; 3] = [0xac, 0xa3, 0xff];
const THEME_BTN_COLOR: [u8; 3] = [0x2d, 0x32, 0xbc];
const TXT_SKIP: &str = "Skip";
const TXT_VOL_UP: &str = "Volume up";
const TXT_VOL_DN: &str = "Volume down";

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("bluetunes_app=info,bluetunes_core=info,bluetunes_bluez=info")
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
struct Config {
    tick_interval_ms: u64,
    volume_step: u16,
    show_album: bool,
    bus_timeout_ms: u64,
    listener_retry_secs: u64,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            volume_step: bluetunes_core::DEFAULT_VOLUME_STEP,
            show_album: true,
            bus_timeout_ms: 2000,
            listener_retry_secs: 5,
        }
    }
}
impl Config {
    fn path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("bluetunes_app.toml"))
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::path() else {
            anyhow::bail!("no config directory available");
        };
        let text = toml::to_string(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
    pub fn load() -> Config {
        let Some(text) = Self::path().and_then(|path| std::fs::read_to_string(path).ok()) else {
            return Config::default();
        };
        match toml::from_str(&text) {
            Ok(conf) => conf,
            Err(err) => {
                warn!(%err, "ignoring unreadable config file");
                Config::default()
            }
        }
    }
    fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(50))
    }
    fn bus_timeout(&self) -> Duration {
        Duration::from_millis(self.bus_timeout_ms)
    }
    fn listener_retry(&self) -> Duration {
        Duration::from_secs(self.listener_retry_secs.max(1))
    }
}

fn show_error_dialog(msg: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(PROGRAM_NAME)
        .set_description(msg)
        .show();
}

/// The two text lines at the top of the menu.
fn status_lines(view: &ViewModel) -> (String, String) {
    match view.panel() {
        Panel::Waiting => (TXT_WAITING.to_string(), String::new()),
        Panel::Active => {
            let title = if view.title().is_empty() {
                view.display_name()
            } else {
                view.title()
            };
            (title.to_string(), view.artist_line().to_string())
        }
    }
}

fn in_circle(x: u32, y: u32, cx: i32, cy: i32, r: i32) -> bool {
    let (dx, dy) = (x as i32 - cx, y as i32 - cy);
    dx * dx + dy * dy <= r * r
}

// A music note on a round badge.
fn make_icon_image(note: [u8; 3]) -> RgbaImage {
    let c = ICON_SIZE as i32 / 2;
    RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let head = in_circle(x, y, 13, 21, 4);
        let stem = (16..=17).contains(&x) && (8..=21).contains(&y);
        let flag = (18..=22).contains(&x) && (8..=10).contains(&y);
        if head || stem || flag {
            let [r, g, b] = note;
            Rgba([r, g, b, 0xff])
        } else if in_circle(x, y, c, c, c - 1) {
            let [r, g, b] = THEME_BKGD;
            Rgba([r, g, b, 0xff])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn make_tray_icon(note: [u8; 3]) -> anyhow::Result<TrayIconImage> {
    let icon = TrayIconImage::from_rgba(make_icon_image(note).into_raw(), ICON_SIZE, ICON_SIZE)?;
    Ok(icon)
}

struct TrayState {
    tray: TrayIcon,
    icon_active: TrayIconImage,
    icon_waiting: TrayIconImage,
    tm_title: MenuItem,
    tm_artist: MenuItem,
    tm_play_pause: MenuItem,
    tm_skip: MenuItem,
    tm_volume_up: MenuItem,
    tm_volume_down: MenuItem,
    tm_refresh: MenuItem,
    tm_album_check: CheckMenuItem,
    tm_quit: MenuItem,
}
impl TrayState {
    fn render(&self, view: &ViewModel) {
        let (title, artist) = status_lines(view);
        self.tm_title.set_text(title);
        self.tm_artist.set_text(artist);
        self.tm_play_pause.set_text(view.play_pause().label());

        let active = view.panel() == Panel::Active;
        for item in [
            &self.tm_play_pause,
            &self.tm_skip,
            &self.tm_volume_up,
            &self.tm_volume_down,
            &self.tm_refresh,
        ] {
            item.set_enabled(active);
        }
        let icon = if active { &self.icon_active } else { &self.icon_waiting };
        _ = self.tray.set_icon(Some(icon.clone()));
        _ = self.tray.set_tooltip(Some(view.display_name()));
    }
}

struct RuntimeState {
    config: Config,
    tray: TrayState,
    session: Session<PlatformBus>,
    next_tick: Instant,
}

enum UserEvent {
    MenuEvent(MenuEvent),
    ShutdownRequested,
}

impl RuntimeState {
    fn new(config: Config, tray: TrayState) -> anyhow::Result<RuntimeState> {
        let bus = connect_bus(config.bus_timeout())?;
        let (sender, receiver) = pipeline();
        start_listener(sender, config.listener_retry())?;

        let session =
            Session::new(bus, receiver, ViewModel::new(config.show_album)).with_volume_step(config.volume_step);
        let mut state = RuntimeState {
            config,
            tray,
            session,
            next_tick: Instant::now(),
        };
        state.repaint_if_needed();
        Ok(state)
    }

    fn save_config(&self) -> anyhow::Result<()> {
        self.config.save()
    }

    fn repaint_if_needed(&mut self) {
        if self.session.view_mut().take_repaint() {
            self.tray.render(self.session.view());
        }
    }

    fn handle_menu_event(&mut self, event: MenuEvent) -> bool {
        if event.id == self.tray.tm_quit.id() {
            return true;
        }

        let result = if event.id == self.tray.tm_play_pause.id() {
            self.session.toggle_play_pause().map(|label| debug!(?label, "play/pause toggled"))
        } else if event.id == self.tray.tm_skip.id() {
            self.session.skip()
        } else if event.id == self.tray.tm_volume_up.id() {
            self.session.volume_up().map(|volume| debug!(volume, "volume raised"))
        } else if event.id == self.tray.tm_volume_down.id() {
            self.session.volume_down().map(|volume| debug!(volume, "volume lowered"))
        } else if event.id == self.tray.tm_refresh.id() {
            self.session.refresh()
        } else if event.id == self.tray.tm_album_check.id() {
            self.config.show_album = self.tray.tm_album_check.is_checked();
            self.session.view_mut().set_show_album(self.config.show_album);
            if let Err(err) = self.save_config() {
                show_error_dialog(&format!("Error saving config: {err:?}"));
            }
            // re-read the track so the artist line picks up the setting
            match self.session.refresh() {
                Err(SessionError::NoPlayer) => Ok(()),
                other => other,
            }
        } else {
            Ok(())
        };

        if let Err(err) = result {
            warn!(%err, "media command failed");
        }
        self.repaint_if_needed();
        false
    }

    fn tick(&mut self) {
        let now = Instant::now();
        if now < self.next_tick {
            return;
        }
        self.next_tick = now + self.config.tick_interval();

        match self.session.tick() {
            Ok(outcome) if !outcome.is_idle() => debug!(?outcome, "tick"),
            Ok(_) => {}
            Err(err) => warn!(%err, "tick aborted"),
        }
        self.repaint_if_needed();
    }

    fn shutdown(self) {
        info!(player = ?self.session.playback(), "shutting down");
    }
}

fn create_tray(config: &Config) -> anyhow::Result<TrayState> {
    let icon_active = make_tray_icon(THEME_TXT_COLOR)?;
    let icon_waiting = make_tray_icon(THEME_BTN_COLOR)?;

    let menu = Menu::new();

    let tm_title = MenuItem::new(TXT_WAITING, false, None);
    let tm_artist = MenuItem::new("", false, None);
    let tm_play_pause = MenuItem::new("Play", false, None);
    let tm_skip = MenuItem::new(TXT_SKIP, false, None);
    let tm_volume_up = MenuItem::new(TXT_VOL_UP, false, None);
    let tm_volume_down = MenuItem::new(TXT_VOL_DN, false, None);
    let tm_refresh = MenuItem::new("Refresh", false, None);
    let tm_album_check = CheckMenuItem::new("Show album", true, config.show_album, None);
    let tm_quit = MenuItem::new("Quit", true, None);

    menu.append(&tm_title)?;
    menu.append(&tm_artist)?;
    menu.append(&PredefinedMenuItem::separator())?;
    menu.append(&tm_play_pause)?;
    menu.append(&tm_skip)?;
    menu.append(&tm_volume_up)?;
    menu.append(&tm_volume_down)?;
    menu.append(&tm_refresh)?;
    menu.append(&PredefinedMenuItem::separator())?;
    menu.append(&tm_album_check)?;
    menu.append(&tm_quit)?;

    let tray = TrayIconBuilder::new()
        .with_tooltip(PROGRAM_NAME)
        .with_icon(icon_waiting.clone())
        .with_menu(Box::new(menu))
        .build()?;

    Ok(TrayState {
        tray,
        icon_active,
        icon_waiting,
        tm_title,
        tm_artist,
        tm_play_pause,
        tm_skip,
        tm_volume_up,
        tm_volume_down,
        tm_refresh,
        tm_album_check,
        tm_quit,
    })
}

fn main() {
    init_tracing();
    info!("started the {PROGRAM_NAME} media controller");
    let config = Config::load();
    let tick_interval = config.tick_interval();

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

    let proxy = event_loop.create_proxy();
    MenuEvent::set_event_handler(Some(move |event| {
        _ = proxy.send_event(UserEvent::MenuEvent(event));
    }));
    let proxy = event_loop.create_proxy();
    if let Err(err) = ctrlc::set_handler(move || {
        _ = proxy.send_event(UserEvent::ShutdownRequested);
    }) {
        warn!(?err, "failed to register shutdown signal handler");
    }

    let mut runtime: Option<RuntimeState> = None;
    let mut initial_config = Some(config);

    event_loop.run(move |event, _, control_flow| {
        let next_tick = runtime
            .as_ref()
            .map_or_else(|| Instant::now() + tick_interval, |state| state.next_tick);
        *control_flow = ControlFlow::WaitUntil(next_tick);

        match event {
            Event::NewEvents(StartCause::Init) => {
                let Some(config) = initial_config.take() else {
                    *control_flow = ControlFlow::Exit;
                    return;
                };
                let tray = match create_tray(&config) {
                    Ok(tray) => tray,
                    Err(err) => {
                        show_error_dialog(&format!("Error creating tray: {err:?}"));
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                };
                match RuntimeState::new(config, tray) {
                    Ok(state) => runtime = Some(state),
                    Err(err) => {
                        show_error_dialog(&format!("Error: {err:?}"));
                        *control_flow = ControlFlow::Exit;
                    }
                }
            }
            Event::UserEvent(UserEvent::MenuEvent(event)) => {
                if let Some(state) = runtime.as_mut() {
                    let should_quit = state.handle_menu_event(event);
                    if should_quit {
                        if let Some(state) = runtime.take() {
                            state.shutdown();
                        }
                        *control_flow = ControlFlow::Exit;
                    }
                }
            }
            Event::UserEvent(UserEvent::ShutdownRequested) => {
                if let Some(state) = runtime.take() {
                    state.shutdown();
                }
                *control_flow = ControlFlow::Exit;
            }
            Event::MainEventsCleared => {
                if let Some(state) = runtime.as_mut() {
                    state.tick();
                    *control_flow = ControlFlow::WaitUntil(state.next_tick);
                }
            }
            Event::LoopDestroyed => {
                if let Some(state) = runtime.take() {
                    state.shutdown();
                }
                info!("exiting the {PROGRAM_NAME} media controller");
            }
            _ => {}
        }
    });
}
