use bishop_client::{service_spec, Conversation, SendOutcome, TILES};
use bishop_session::auth::CODE_LEN;
use bishop_session::{AuthError, AuthFlow, ChatSession, Landing, Message, ResendCountdown};
use tracing::{debug, info};

use crate::pages::{service_page, ServicePage, KIDS_TABS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Chat,
    Login,
    Verify,
    KidsCorner,
    /// Service landing page by key; unknown keys render "Service Not Found".
    ServicePage(String),
}

impl From<Landing> for Route {
    fn from(landing: Landing) -> Self {
        match landing {
            Landing::Chat => Route::Chat,
            Landing::Login => Route::Login,
        }
    }
}

/// Which chat-screen widget receives keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Sidebar,
    Tiles,
}

pub struct App {
    conversation: Conversation,
    auth: AuthFlow,
    pub route: Route,
    pub focus: Focus,
    pub input: String,
    pub sidebar_index: usize,
    pub tile_index: usize,
    pub phone_input: String,
    pub code_input: String,
    /// Inline error under the login/verify field.
    pub field_error: Option<String>,
    pub countdown: Option<ResendCountdown>,
    pub kids_tab: usize,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll_back: u16,
    pub notice: Option<String>,
    /// Trial messages left; `None` once signed in.
    pub remaining: Option<u32>,
}

impl App {
    pub fn new(conversation: Conversation, auth: AuthFlow, route: Route) -> Self {
        Self {
            conversation,
            auth,
            route,
            focus: Focus::Input,
            input: String::new(),
            sidebar_index: 0,
            tile_index: 0,
            phone_input: String::new(),
            code_input: String::new(),
            field_error: None,
            countdown: None,
            kids_tab: 0,
            scroll_back: 0,
            notice: None,
            remaining: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn sessions(&self) -> &[ChatSession] {
        self.conversation.book().sessions()
    }

    pub fn active_messages(&self) -> &[Message] {
        self.conversation
            .book()
            .active()
            .map(|session| session.messages())
            .unwrap_or(&[])
    }

    pub fn is_pending(&self) -> bool {
        self.conversation.is_pending()
    }

    /// Tiles replace the transcript while there is nothing to show.
    pub fn tiles_visible(&self) -> bool {
        self.active_messages().is_empty()
    }

    pub fn placeholder(&self) -> &'static str {
        service_spec(self.conversation.current_service()).placeholder
    }

    pub fn login_modal_visible(&self) -> bool {
        self.conversation.gate().login_prompt_shown()
    }

    pub fn current_service_page(&self) -> Option<&'static ServicePage> {
        match &self.route {
            Route::ServicePage(key) => service_page(key),
            _ => None,
        }
    }

    /// Re-read the trial counter for the status bar.
    pub async fn refresh(&mut self) -> anyhow::Result<()> {
        self.remaining = self.conversation.gate().remaining().await?;
        Ok(())
    }

    /// Apply finished backend calls.
    pub async fn on_tick(&mut self) -> anyhow::Result<()> {
        if self.conversation.poll().await? > 0 {
            self.scroll_back = 0;
            self.sync_sidebar();
        }
        Ok(())
    }

    pub async fn send_message(&mut self) -> anyhow::Result<()> {
        let outcome = self.conversation.submit(&self.input).await;
        debug!("Send outcome: {:?}", outcome);

        // A failed save still sends, so the input is spent either way.
        if matches!(outcome, Ok(SendOutcome::Sent { .. })) || self.conversation.is_pending() {
            self.input.clear();
            self.after_new_message();
        }
        outcome?;
        self.refresh().await
    }

    pub async fn choose_tile(&mut self) -> anyhow::Result<()> {
        let Some(tile) = TILES.get(self.tile_index) else {
            return Ok(());
        };
        let outcome = self.conversation.choose_tile(tile.label).await?;
        debug!("Tile {} outcome: {:?}", tile.key, outcome);

        if matches!(
            outcome,
            SendOutcome::Sent { .. } | SendOutcome::Prompted { .. }
        ) {
            self.focus = Focus::Input;
            self.after_new_message();
        }
        self.refresh().await
    }

    fn after_new_message(&mut self) {
        self.scroll_back = 0;
        self.sync_sidebar();
    }

    /// Keep the sidebar cursor on the active session.
    fn sync_sidebar(&mut self) {
        if let Some(active) = self.conversation.book().active_id() {
            if let Some(index) = self.sessions().iter().position(|s| s.id() == active) {
                self.sidebar_index = index;
            }
        }
    }

    pub fn new_chat(&mut self) {
        self.conversation.new_chat();
        self.input.clear();
        self.scroll_back = 0;
        self.focus = Focus::Input;
        self.route = Route::Chat;
    }

    pub fn select_session(&mut self) {
        let Some(id) = self
            .sessions()
            .get(self.sidebar_index)
            .map(|session| session.id().to_string())
        else {
            return;
        };
        if self.conversation.select(&id) {
            self.scroll_back = 0;
            self.focus = Focus::Input;
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Sidebar,
            Focus::Sidebar if self.tiles_visible() => Focus::Tiles,
            Focus::Sidebar | Focus::Tiles => Focus::Input,
        };
    }

    pub fn move_up(&mut self) {
        match self.focus {
            Focus::Sidebar => self.sidebar_index = self.sidebar_index.saturating_sub(1),
            Focus::Tiles => self.tile_index = self.tile_index.saturating_sub(1),
            Focus::Input => self.scroll_back = self.scroll_back.saturating_add(1),
        }
    }

    pub fn move_down(&mut self) {
        match self.focus {
            Focus::Sidebar => {
                if self.sidebar_index + 1 < self.sessions().len() {
                    self.sidebar_index += 1;
                }
            }
            Focus::Tiles => {
                if self.tile_index + 1 < TILES.len() {
                    self.tile_index += 1;
                }
            }
            Focus::Input => self.scroll_back = self.scroll_back.saturating_sub(1),
        }
    }

    pub fn page_up(&mut self) {
        self.scroll_back = self.scroll_back.saturating_add(10);
    }

    pub fn page_down(&mut self) {
        self.scroll_back = self.scroll_back.saturating_sub(10);
    }

    pub fn dismiss_login_modal(&mut self) {
        self.conversation.gate_mut().dismiss_prompt();
    }

    /// "Sign Up Now" from the modal, or the sign-in shortcut.
    pub fn open_login(&mut self) {
        self.conversation.gate_mut().dismiss_prompt();
        self.field_error = None;
        self.route = Route::Login;
    }

    pub async fn submit_phone(&mut self) -> anyhow::Result<()> {
        match self.auth.submit_phone(&self.phone_input).await {
            Ok(()) => {
                self.field_error = None;
                self.code_input.clear();
                self.countdown = Some(ResendCountdown::start());
                self.route = Route::Verify;
                Ok(())
            }
            Err(e) if e.is_validation() => {
                self.field_error = Some(e.to_string());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn push_code_digit(&mut self, c: char) {
        if c.is_ascii_digit() && self.code_input.len() < CODE_LEN {
            self.code_input.push(c);
        }
    }

    pub async fn submit_code(&mut self) -> anyhow::Result<()> {
        match self.auth.submit_code(&self.code_input).await {
            Ok(()) => {
                info!("Phone verified");
                self.field_error = None;
                self.countdown = None;
                self.code_input.clear();
                self.notice = Some("Phone verified. Welcome!".to_string());
                self.route = Route::Chat;
                self.refresh().await
            }
            Err(AuthError::NoPhoneOnFile) => {
                self.field_error = Some("Please enter your phone number first".to_string());
                self.route = Route::Login;
                Ok(())
            }
            Err(e) if e.is_validation() => {
                self.field_error = Some(e.to_string());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn resend_code(&mut self) {
        let countdown = self.countdown.get_or_insert_with(ResendCountdown::start);
        if countdown.try_resend() {
            self.notice = Some("Verification code resent".to_string());
        }
    }

    pub async fn sign_out(&mut self) -> anyhow::Result<()> {
        self.auth.sign_out().await?;
        self.phone_input.clear();
        self.notice = Some("Signed out".to_string());
        self.refresh().await
    }

    pub fn open_kids_corner(&mut self) {
        self.kids_tab = 0;
        self.route = Route::KidsCorner;
    }

    pub fn next_kids_tab(&mut self) {
        self.kids_tab = (self.kids_tab + 1) % KIDS_TABS.len();
    }

    pub fn prev_kids_tab(&mut self) {
        self.kids_tab = (self.kids_tab + KIDS_TABS.len() - 1) % KIDS_TABS.len();
    }

    pub fn open_service_page(&mut self, key: &str) {
        self.route = Route::ServicePage(key.to_string());
    }

    pub fn back_to_chat(&mut self) {
        self.field_error = None;
        self.route = Route::Chat;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use bishop_client::{ClientResult, Dispatcher, FaithBackend, ServiceReply, ServiceRequest};
    use bishop_session::{SessionBook, StateStore, TrialGate};

    struct CannedBackend;

    #[async_trait]
    impl FaithBackend for CannedBackend {
        async fn send(&self, request: ServiceRequest) -> ClientResult<ServiceReply> {
            Ok(ServiceReply::text(format!("re: {}", request.text)))
        }
    }

    async fn app_with(state: StateStore) -> App {
        let book = SessionBook::load(state.clone()).await.unwrap();
        let gate = TrialGate::new(state.clone(), 5);
        let conversation = Conversation::new(book, gate, Dispatcher::new(Arc::new(CannedBackend)));
        let mut app = App::new(conversation, AuthFlow::new(state), Route::Chat);
        app.refresh().await.unwrap();
        app
    }

    #[tokio::test]
    async fn test_send_clears_input_and_counts_down() {
        let mut app = app_with(StateStore::in_memory()).await;
        assert_eq!(app.remaining, Some(5));
        assert!(app.tiles_visible());
        assert_eq!(app.placeholder(), "Start a new chat...");

        app.input = "Hello".to_string();
        app.send_message().await.unwrap();
        assert!(app.input.is_empty());
        assert!(app.is_pending());
        assert_eq!(app.remaining, Some(4));
        assert!(!app.tiles_visible());

        while app.is_pending() {
            tokio::task::yield_now().await;
            app.on_tick().await.unwrap();
        }
        assert_eq!(app.active_messages().len(), 2);
        assert_eq!(app.active_messages()[1].content, "re: Hello");
    }

    #[tokio::test]
    async fn test_prompt_tile_switches_placeholder() {
        let mut app = app_with(StateStore::in_memory()).await;
        app.focus = Focus::Tiles;
        app.tile_index = 2;
        app.choose_tile().await.unwrap();

        assert_eq!(app.focus, Focus::Input);
        assert_eq!(app.placeholder(), "Enter a verse to explain...");
        assert_eq!(app.remaining, Some(5));
        assert_eq!(app.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_blocked_send_keeps_input_and_shows_modal() {
        let state = StateStore::in_memory();
        state.set_trial_attempts(5).await.unwrap();
        let mut app = app_with(state).await;

        app.input = "one more".to_string();
        app.send_message().await.unwrap();
        assert_eq!(app.input, "one more");
        assert!(app.login_modal_visible());
        assert!(app.sessions().is_empty());

        app.open_login();
        assert!(!app.login_modal_visible());
        assert_eq!(app.route, Route::Login);
    }

    #[tokio::test]
    async fn test_login_and_verify_flow() {
        let state = StateStore::in_memory();
        state.set_trial_attempts(5).await.unwrap();
        let mut app = app_with(state.clone()).await;
        app.open_login();

        app.phone_input = "123".to_string();
        app.submit_phone().await.unwrap();
        assert_eq!(app.route, Route::Login);
        assert_eq!(
            app.field_error.as_deref(),
            Some("Please enter a valid phone number")
        );

        app.phone_input = "5551234".to_string();
        app.submit_phone().await.unwrap();
        assert_eq!(app.route, Route::Verify);
        assert!(app.field_error.is_none());
        assert!(app.countdown.is_some());

        for c in "12ab34".chars() {
            app.push_code_digit(c);
        }
        app.submit_code().await.unwrap();
        assert_eq!(
            app.field_error.as_deref(),
            Some("Please enter the complete verification code")
        );

        for c in "567890".chars() {
            app.push_code_digit(c);
        }
        assert_eq!(app.code_input, "123456");
        app.submit_code().await.unwrap();
        assert_eq!(app.route, Route::Chat);
        assert_eq!(app.remaining, None);
        assert!(state.is_authenticated().await.unwrap());

        app.sign_out().await.unwrap();
        assert_eq!(app.remaining, Some(0));
    }

    #[tokio::test]
    async fn test_verify_without_phone_returns_to_login() {
        let mut app = app_with(StateStore::in_memory()).await;
        app.route = Route::Verify;
        app.code_input = "123456".to_string();
        app.submit_code().await.unwrap();
        assert_eq!(app.route, Route::Login);
        assert!(app.field_error.is_some());
    }

    #[tokio::test]
    async fn test_focus_cycle_skips_hidden_tiles() {
        let mut app = app_with(StateStore::in_memory()).await;
        app.cycle_focus();
        assert_eq!(app.focus, Focus::Sidebar);
        app.cycle_focus();
        assert_eq!(app.focus, Focus::Tiles);
        app.cycle_focus();
        assert_eq!(app.focus, Focus::Input);

        app.input = "Hello".to_string();
        app.send_message().await.unwrap();
        app.cycle_focus();
        app.cycle_focus();
        assert_eq!(app.focus, Focus::Input);
    }

    #[tokio::test]
    async fn test_pages_and_tabs() {
        let mut app = app_with(StateStore::in_memory()).await;

        app.open_kids_corner();
        app.prev_kids_tab();
        assert_eq!(KIDS_TABS[app.kids_tab].label, "Prayer Wall");
        app.next_kids_tab();
        assert_eq!(app.kids_tab, 0);

        app.open_service_page("business");
        assert_eq!(app.current_service_page().unwrap().name, "Business");
        app.open_service_page("astrology");
        assert!(app.current_service_page().is_none());

        app.new_chat();
        assert_eq!(app.route, Route::Chat);
    }

    #[test]
    fn test_route_from_landing() {
        assert_eq!(Route::from(Landing::Login), Route::Login);
        assert_eq!(Route::from(Landing::Chat), Route::Chat);
    }
}
