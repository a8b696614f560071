pub mod artist;
pub mod release;
pub mod sync;
pub mod user;

pub use artist::{ArtistRef, PlayedArtist, PlayedItem};
pub use release::{AlbumType, Release, Track, TrackId};
pub use sync::{SyncReport, SyncStage, SyncState};
pub use user::{
    Credentials, RegisterUserRequest, UpdatePreferencesRequest, UserPreferences, UserRecord,
};
