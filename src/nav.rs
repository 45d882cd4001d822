use parking_lot::RwLock;

/// Screens of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    SignIn,
    SignUp,
    ConfirmSignUp,
    ForgotPassword,
    Profile,
    Favorites,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::SignIn => "/auth/sign-in",
            Route::SignUp => "/auth/sign-up",
            Route::ConfirmSignUp => "/auth/confirm-sign-up",
            Route::ForgotPassword => "/auth/forgot-password",
            Route::Profile => "/profile",
            Route::Favorites => "/favorites",
        }
    }

    pub fn is_auth_screen(&self) -> bool {
        self.path().starts_with("/auth/")
    }
}

pub trait Navigator: Send + Sync {
    fn current(&self) -> Route;

    fn navigate(&self, to: Route);
}

/// In-memory navigation history that publishes every route change
pub struct HistoryNavigator {
    history: RwLock<Vec<Route>>,
    sender: flume::Sender<Route>,
    receiver: flume::Receiver<Route>,
}

impl HistoryNavigator {
    pub fn new(start: Route) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            history: RwLock::new(vec![start]),
            sender,
            receiver,
        }
    }

    /// Receive route changes. All subscribers share one queue.
    pub fn subscribe(&self) -> flume::Receiver<Route> {
        self.receiver.clone()
    }

    pub fn history(&self) -> Vec<Route> {
        self.history.read().clone()
    }

    /// Go back one entry; the first entry is never popped
    pub fn back(&self) -> Route {
        let route = {
            let mut history = self.history.write();
            if history.len() > 1 {
                history.pop();
            }
            *history.last().unwrap_or(&Route::Home)
        };
        self.sender.send(route).ok();
        route
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigator for HistoryNavigator {
    fn current(&self) -> Route {
        self.history.read().last().copied().unwrap_or(Route::Home)
    }

    fn navigate(&self, to: Route) {
        tracing::debug!(path = to.path(), "navigate");
        self.history.write().push(to);
        self.sender.send(to).ok();
    }
}
