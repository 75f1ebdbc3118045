use crate::value::{PropertyMap, Value};

pub const BLUEZ_SERVICE: &str = "org.bluez";
pub const PLAYER_IFACE: &str = "org.bluez.MediaPlayer1";
pub const TRANSPORT_IFACE: &str = "org.bluez.MediaTransport1";
pub const DEVICE_IFACE: &str = "org.bluez.Device1";
// deprecated by BlueZ, still emitted by some stacks
pub const CONTROL_IFACE: &str = "org.bluez.MediaControl1";

/// One `PropertiesChanged` signal as delivered by the listener.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeNotification {
    pub interface: String,
    pub changed: PropertyMap,
}

impl ChangeNotification {
    pub fn new(interface: impl Into<String>, changed: PropertyMap) -> Self {
        Self {
            interface: interface.into(),
            changed,
        }
    }

    /// Resolve the interface to its category and pull out the properties that category cares about.
    /// Categories are tried in the order player, transport, device, control.
    pub fn decode(&self) -> Change {
        match self.interface.as_str() {
            PLAYER_IFACE => Change::Player(PlayerChange::decode(&self.changed)),
            TRANSPORT_IFACE => Change::Transport(TransportChange::decode(&self.changed)),
            DEVICE_IFACE => Change::Device(DeviceChange::decode(&self.changed)),
            CONTROL_IFACE => Change::Control,
            other => Change::Unrecognized(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    Player(PlayerChange),
    Transport(TransportChange),
    Device(DeviceChange),
    Control,
    Unrecognized(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerStatus {
    Playing,
    Paused,
    Stopped,
    /// `forward-seek`, `reverse-seek`, `error` and anything newer.
    Other(String),
}

impl PlayerStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "playing" => PlayerStatus::Playing,
            "paused" => PlayerStatus::Paused,
            "stopped" => PlayerStatus::Stopped,
            other => PlayerStatus::Other(other.to_string()),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlayerStatus::Playing)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Track {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl Track {
    fn decode(map: &PropertyMap) -> Self {
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        Track {
            title: text("Title"),
            artist: text("Artist"),
            album: text("Album"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerChange {
    pub name: Option<String>,
    pub status: Option<PlayerStatus>,
    pub track: Option<Track>,
    pub position: Option<u32>,
}

impl PlayerChange {
    /// Works on both a `PropertiesChanged` payload and a full `GetAll` snapshot.
    pub fn decode(props: &PropertyMap) -> Self {
        PlayerChange {
            name: props.get("Name").and_then(Value::as_str).map(str::to_string),
            status: props.get("Status").and_then(Value::as_str).map(PlayerStatus::parse),
            track: props.get("Track").and_then(Value::as_dict).map(Track::decode),
            position: props.get("Position").and_then(Value::as_u32),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Pending,
    Active,
    Other(String),
}

impl TransportState {
    pub fn parse(s: &str) -> Self {
        match s {
            "idle" => TransportState::Idle,
            "pending" => TransportState::Pending,
            "active" => TransportState::Active,
            other => TransportState::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportChange {
    pub state: Option<TransportState>,
    pub volume: Option<u16>,
}

impl TransportChange {
    pub fn decode(props: &PropertyMap) -> Self {
        TransportChange {
            state: props.get("State").and_then(Value::as_str).map(TransportState::parse),
            volume: props.get("Volume").and_then(Value::as_u16),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceChange {
    pub connected: Option<bool>,
}

impl DeviceChange {
    pub fn decode(props: &PropertyMap) -> Self {
        DeviceChange {
            connected: props.get("Connected").and_then(Value::as_bool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(entries: &[(&str, Value)]) -> PropertyMap {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn player_track_decodes_title_artist_album() {
        let track = props(&[
            ("Title", "Blue in Green".into()),
            ("Artist", "Miles Davis".into()),
            ("Album", "Kind of Blue".into()),
            ("TrackNumber", Value::U32(3)),
        ]);
        let n = ChangeNotification::new(PLAYER_IFACE, props(&[("Track", track.into())]));
        let Change::Player(change) = n.decode() else {
            panic!("expected player change");
        };
        let track = change.track.unwrap();
        assert_eq!(track.title.as_deref(), Some("Blue in Green"));
        assert_eq!(track.artist.as_deref(), Some("Miles Davis"));
        assert_eq!(track.album.as_deref(), Some("Kind of Blue"));
        assert!(change.status.is_none());
    }

    #[test]
    fn wrongly_typed_properties_count_as_absent() {
        let n = ChangeNotification::new(DEVICE_IFACE, props(&[("Connected", "no".into())]));
        assert_eq!(n.decode(), Change::Device(DeviceChange { connected: None }));
    }

    #[test]
    fn transport_state_and_volume() {
        let n = ChangeNotification::new(
            TRANSPORT_IFACE,
            props(&[("State", "active".into()), ("Volume", Value::U16(64))]),
        );
        assert_eq!(
            n.decode(),
            Change::Transport(TransportChange {
                state: Some(TransportState::Active),
                volume: Some(64),
            })
        );
    }

    #[test]
    fn control_and_unknown_interfaces() {
        let control = ChangeNotification::new(CONTROL_IFACE, props(&[("Connected", true.into())]));
        assert_eq!(control.decode(), Change::Control);
        let adapter = ChangeNotification::new("org.bluez.Adapter1", PropertyMap::new());
        assert_eq!(adapter.decode(), Change::Unrecognized("org.bluez.Adapter1".into()));
    }

    #[test]
    fn position_decodes_alone() {
        let change = PlayerChange::decode(&props(&[("Position", Value::U32(12_000))]));
        assert_eq!(
            change,
            PlayerChange {
                position: Some(12_000),
                ..Default::default()
            }
        );
        let change = PlayerChange::decode(&props(&[("Position", Value::U32(1)), ("Status", "paused".into())]));
        assert_eq!(change.status, Some(PlayerStatus::Paused));
    }
}
