// Event pipeline and playback state machine behind the BlueTunes controller.
// Bus-agnostic: the BlueZ binding lives in `bluetunes_bluez` and plugs in through `MediaBus`.

pub mod bus;
pub mod notification;
pub mod pipeline;
pub mod session;
pub mod value;
pub mod view;

pub use bus::{BusError, MediaBus};
pub use notification::{
    Change, ChangeNotification, DeviceChange, PlayerChange, PlayerStatus, Track, TransportChange, TransportState,
    BLUEZ_SERVICE, CONTROL_IFACE, DEVICE_IFACE, PLAYER_IFACE, TRANSPORT_IFACE,
};
pub use pipeline::{pipeline, PipelineReceiver, PipelineSender};
pub use session::{
    step_volume, PlaybackRef, Session, SessionError, TickOutcome, VolumeDirection, DEFAULT_VOLUME_STEP, VOLUME_MAX,
};
pub use value::{PropertyMap, Value};
pub use view::{Panel, PlayPause, ViewModel, PROGRAM_NAME, TXT_WAITING};
