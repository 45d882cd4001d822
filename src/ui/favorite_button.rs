use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::auth::SessionProvider;
use crate::error::ApiError;
use crate::favorites::Favorites;
use crate::model::{FavoriteStatus, ToggleFavorite, TrackId};
use crate::nav::{Navigator, Route};
use crate::query::QueryState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteButtonProps {
    pub track_id: TrackId,
    pub size: ButtonSize,
    /// Icon only, no label
    pub compact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Spinner,
    HeartFilled,
    HeartOutline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteButtonView {
    pub icon: Icon,
    pub label: Option<&'static str>,
    pub size: ButtonSize,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Anonymous user, sent to the sign-in screen
    RedirectedToSignIn,
    /// A toggle is pending or the status is not loaded yet
    Ignored,
    Toggled { is_favorite: bool },
}

/// Favorite toggle control of one track
pub struct FavoriteButton {
    props: FavoriteButtonProps,
    favorites: Arc<Favorites>,
    session: Arc<dyn SessionProvider>,
    navigator: Arc<dyn Navigator>,
    pending: AtomicBool,
}

/// Clears the pending flag when the toggle finishes, failed or not
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FavoriteButton {
    pub fn new(
        props: FavoriteButtonProps,
        favorites: Arc<Favorites>,
        session: Arc<dyn SessionProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            props,
            favorites,
            session,
            navigator,
            pending: AtomicBool::new(false),
        }
    }

    pub fn props(&self) -> &FavoriteButtonProps {
        &self.props
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Fetch (or read from cache) the status this button displays
    pub async fn load(&self) -> QueryState<FavoriteStatus> {
        match self.favorites.favorite_status(&self.props.track_id).await {
            Ok(Some(status)) => QueryState::Ready(status),
            Ok(None) => QueryState::Loading,
            Err(err) => QueryState::from_result(Err(err)),
        }
    }

    pub fn render(&self, status: &QueryState<FavoriteStatus>) -> FavoriteButtonView {
        let size = self.props.size;
        let Some(status) = status.ready() else {
            return FavoriteButtonView {
                icon: Icon::Spinner,
                label: None,
                size,
                disabled: true,
            };
        };

        let (icon, label) = if status.is_favorite {
            (Icon::HeartFilled, "Favorited")
        } else {
            (Icon::HeartOutline, "Add to favorites")
        };
        FavoriteButtonView {
            icon,
            label: (!self.props.compact).then_some(label),
            size,
            disabled: self.is_pending(),
        }
    }

    /// Handle a click given the status currently displayed
    pub async fn click(&self, status: &QueryState<FavoriteStatus>) -> Result<ClickOutcome, ApiError> {
        if !self.session.is_authenticated().await {
            tracing::debug!(track_id = %self.props.track_id, "favorite clicked while signed out");
            self.navigator.navigate(Route::SignIn);
            return Ok(ClickOutcome::RedirectedToSignIn);
        }

        let Some(status) = status.ready() else {
            return Ok(ClickOutcome::Ignored);
        };
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(ClickOutcome::Ignored);
        }
        let _guard = PendingGuard(&self.pending);

        let toggle = ToggleFavorite {
            track_id: self.props.track_id.clone(),
            is_favorite: status.is_favorite,
        };
        self.favorites.toggle_favorite(&toggle).await?;
        Ok(ClickOutcome::Toggled {
            is_favorite: !toggle.is_favorite,
        })
    }
}
