use crate::notification::Track;

pub const PROGRAM_NAME: &str = "BlueTunes";
pub const TXT_WAITING: &str = "Waiting for a Bluetooth Media Player";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayPause {
    #[default]
    Play,
    Pause,
}
impl PlayPause {
    pub fn label(self) -> &'static str {
        match self {
            PlayPause::Play => "Play",
            PlayPause::Pause => "Pause",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Panel {
    #[default]
    Waiting,
    Active,
}

/// What the renderer shows. Written only by the session; the renderer reads it after a tick
/// and repaints when `take_repaint` reports a change.
#[derive(Clone, Debug)]
pub struct ViewModel {
    title: String,
    artist_line: String,
    play_pause: PlayPause,
    panel: Panel,
    display_name: String,
    show_album: bool,
    needs_repaint: bool,
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ViewModel {
    pub fn new(show_album: bool) -> Self {
        Self {
            title: String::new(),
            artist_line: String::new(),
            play_pause: PlayPause::Play,
            panel: Panel::Waiting,
            display_name: PROGRAM_NAME.to_string(),
            show_album,
            needs_repaint: true,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn artist_line(&self) -> &str {
        &self.artist_line
    }
    pub fn play_pause(&self) -> PlayPause {
        self.play_pause
    }
    pub fn panel(&self) -> Panel {
        self.panel
    }
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
    pub fn show_album(&self) -> bool {
        self.show_album
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn take_repaint(&mut self) -> bool {
        std::mem::take(&mut self.needs_repaint)
    }

    fn update<T: PartialEq>(field: &mut T, value: T, needs_repaint: &mut bool) {
        if *field != value {
            *field = value;
            *needs_repaint = true;
        }
    }

    /// Missing fields leave the current text alone. The album, when known and enabled,
    /// is appended to the artist line.
    pub fn set_track(&mut self, track: &Track) {
        if let Some(title) = &track.title {
            Self::update(&mut self.title, title.clone(), &mut self.needs_repaint);
        }
        if let Some(artist) = &track.artist {
            let line = match track.album.as_deref() {
                Some(album) if self.show_album && !album.is_empty() => format!("{artist} - {album}"),
                _ => artist.clone(),
            };
            Self::update(&mut self.artist_line, line, &mut self.needs_repaint);
        }
    }

    pub fn set_play_pause(&mut self, play_pause: PlayPause) {
        Self::update(&mut self.play_pause, play_pause, &mut self.needs_repaint);
    }

    pub fn set_panel(&mut self, panel: Panel) {
        Self::update(&mut self.panel, panel, &mut self.needs_repaint);
    }

    /// `None` or an empty player name shows just the program name.
    pub fn set_display_name(&mut self, player_name: Option<&str>) {
        let name = match player_name {
            Some(name) if !name.is_empty() => format!("{PROGRAM_NAME} ({name})"),
            _ => PROGRAM_NAME.to_string(),
        };
        Self::update(&mut self.display_name, name, &mut self.needs_repaint);
    }

    /// Takes effect from the next track update.
    pub fn set_show_album(&mut self, show_album: bool) {
        self.show_album = show_album;
    }
}
