pub mod api;
pub mod audio_switch;
pub mod events;
pub mod history;
pub mod logging;
pub mod metadata;
pub mod now_playing;
pub mod player;
pub mod recorder;
pub mod session;
pub mod signals;

pub use events::{EventPublisher, PlayerEvent};
pub use now_playing::{CurrentSong, NowPlaying};
pub use player::{Player, PlayerSettings};
pub use session::{AddOutcome, Session, SessionError};
