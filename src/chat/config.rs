//! Configuration types for the chat application.
//!
//! `ChatArgs` is parsed from the command line via `arrrg` and resolved into
//! a [`ChatConfig`], which carries the [`ClientConfig`] for the HTTP client.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::ClientConfig;

/// User id sent with every chat message unless overridden.
pub const DEFAULT_USER_ID: &str = "agent";

/// Greeting seeded into an empty log once the backend is reachable.
pub const DEFAULT_WELCOME: &str =
    "Hello agent! I'm the NOVA assistant. Connection established, ready for the mission.";

/// Command-line arguments for the novachat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the NOVA API.
    #[arrrg(optional, "NOVA API base URL (default: $NOVA_API_URL or http://localhost:8000)", "URL")]
    pub api_url: Option<String>,

    /// User id sent with each message.
    #[arrrg(optional, "User id sent with each message (default: agent)", "ID")]
    pub user_id: Option<String>,

    /// Value of the client identity header.
    #[arrrg(optional, "Client name sent in the X-NOVA-Client header", "NAME")]
    pub client_name: Option<String>,

    /// Timeout for chat, history and model calls.
    #[arrrg(optional, "Request timeout in seconds (default: 30)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Timeout for health checks.
    #[arrrg(optional, "Health check timeout in seconds (default: 5)", "SECONDS")]
    pub health_timeout: Option<u64>,

    /// Period between background health checks.
    #[arrrg(optional, "Check the API every SECONDS (default: only at startup and on /check)", "SECONDS")]
    pub health_interval: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Resolved configuration for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Settings for the HTTP client.
    pub client: ClientConfig,

    /// User id sent with each message.
    pub user_id: String,

    /// Text of the welcome message.
    pub welcome_message: String,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Period between background health checks; `None` disables polling.
    pub health_interval: Option<Duration>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Client: [`ClientConfig::new`]
    /// - User id: `agent`
    /// - Color: enabled
    /// - Polling: disabled
    pub fn new() -> Self {
        Self {
            client: ClientConfig::new(),
            user_id: DEFAULT_USER_ID.to_string(),
            welcome_message: DEFAULT_WELCOME.to_string(),
            use_color: true,
            health_interval: None,
        }
    }

    /// Sets the client settings.
    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    /// Sets the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Sets the welcome message.
    pub fn with_welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = message.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the background health check period.
    pub fn with_health_interval(mut self, interval: Option<Duration>) -> Self {
        self.health_interval = interval;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    /// Resolves arguments against the environment and defaults.  The base
    /// URL falls back to `NOVA_API_URL`; zero durations are ignored.
    fn from(args: ChatArgs) -> Self {
        let mut client = ClientConfig::from_env();
        if let Some(url) = args.api_url {
            client = client.with_base_url(url);
        }
        if let Some(name) = args.client_name {
            client = client.with_client_name(name);
        }
        if let Some(timeout) = seconds(args.timeout) {
            client = client.with_timeout(timeout);
        }
        if let Some(timeout) = seconds(args.health_timeout) {
            client = client.with_health_timeout(timeout);
        }

        ChatConfig {
            client,
            user_id: args.user_id.unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            use_color: !args.no_color,
            health_interval: seconds(args.health_interval),
            ..ChatConfig::new()
        }
    }
}

fn seconds(value: Option<u64>) -> Option<Duration> {
    value.filter(|secs| *secs > 0).map(Duration::from_secs)
}
