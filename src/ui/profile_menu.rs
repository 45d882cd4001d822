use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::auth::SessionProvider;
use crate::nav::{Navigator, Route};
use crate::query::QueryCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    SignIn,
    SignUp,
    Profile,
    Favorites,
    SignOut,
}

impl MenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::SignIn => "Sign in",
            MenuItem::SignUp => "Create account",
            MenuItem::Profile => "Profile",
            MenuItem::Favorites => "Favorites",
            MenuItem::SignOut => "Sign out",
        }
    }
}

/// Account menu in the app header
pub struct ProfileMenu {
    session: Arc<dyn SessionProvider>,
    navigator: Arc<dyn Navigator>,
    cache: Arc<QueryCache>,
}

impl ProfileMenu {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        navigator: Arc<dyn Navigator>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            session,
            navigator,
            cache,
        }
    }

    pub async fn items(&self) -> Vec<MenuItem> {
        if self.session.is_authenticated().await {
            vec![MenuItem::Profile, MenuItem::Favorites, MenuItem::SignOut]
        } else {
            vec![MenuItem::SignIn, MenuItem::SignUp]
        }
    }

    pub async fn select(&self, item: MenuItem) -> Result<()> {
        let route = match item {
            MenuItem::SignIn => Route::SignIn,
            MenuItem::SignUp => Route::SignUp,
            MenuItem::Profile => Route::Profile,
            MenuItem::Favorites => Route::Favorites,
            MenuItem::SignOut => {
                self.session.sign_out().await.context("sign out")?;
                // cached queries belong to the previous user
                self.cache.clear();
                Route::Home
            }
        };
        self.navigator.navigate(route);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::MemorySession;
    use crate::nav::HistoryNavigator;
    use crate::query::QueryKey;
    use crate::token::SessionToken;

    #[tokio::test]
    async fn items_follow_authentication() -> Result<()> {
        let session = Arc::new(MemorySession::anonymous());
        let menu = ProfileMenu::new(
            session.clone(),
            Arc::new(HistoryNavigator::default()),
            Arc::new(QueryCache::default()),
        );
        assert_eq!(menu.items().await, vec![MenuItem::SignIn, MenuItem::SignUp]);

        session.sign_in(SessionToken::new("jwt").unwrap());
        assert_eq!(
            menu.items().await,
            vec![MenuItem::Profile, MenuItem::Favorites, MenuItem::SignOut]
        );
        Ok(())
    }

    #[tokio::test]
    async fn sign_out_clears_session_and_cache() -> Result<()> {
        let session = Arc::new(MemorySession::signed_in(SessionToken::new("jwt").unwrap()));
        let navigator = Arc::new(HistoryNavigator::new(Route::Favorites));
        let cache = Arc::new(QueryCache::default());
        cache.set(QueryKey::UserFavorites, (), Duration::from_secs(60));
        let menu = ProfileMenu::new(session.clone(), navigator.clone(), cache.clone());

        menu.select(MenuItem::SignOut).await?;

        assert!(!session.is_authenticated().await);
        assert!(!cache.contains(&QueryKey::UserFavorites));
        assert_eq!(navigator.current(), Route::Home);
        Ok(())
    }
}
