//! View models of the presentation layer.
//!
//! They decide what a screen shows and which side effects a user action
//! triggers; drawing is up to the embedding front-end.

mod audio_player;
mod favorite_button;
mod profile_menu;

pub use audio_player::{AudioPlayer, PlaybackState, PlayerError};
pub use favorite_button::{
    ButtonSize, ClickOutcome, FavoriteButton, FavoriteButtonProps, FavoriteButtonView, Icon,
};
pub use profile_menu::{MenuItem, ProfileMenu};
