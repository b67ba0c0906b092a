//! Browser identity presented to sites.

use jobscout_core::BrowserConfig;
use rand::seq::SliceRandom;

const DESKTOP_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const DESKTOP_VIEWPORTS: [(u32, u32); 4] = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

/// User agent and window size used for a browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// User-Agent header and `navigator.userAgent`
    pub user_agent: String,
    /// Window width in pixels
    pub viewport_width: u32,
    /// Window height in pixels
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// A random common desktop identity.
    #[must_use]
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();
        let user_agent = DESKTOP_USER_AGENTS
            .choose(&mut rng)
            .copied()
            .unwrap_or(DESKTOP_USER_AGENTS[0]);
        let (width, height) = DESKTOP_VIEWPORTS
            .choose(&mut rng)
            .copied()
            .unwrap_or(DESKTOP_VIEWPORTS[0]);

        Self {
            user_agent: user_agent.to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Identity taken from configuration.
    ///
    /// With `randomize_fingerprint` set, `user_agent` is ignored.
    #[must_use]
    pub fn from_config(config: &BrowserConfig, user_agent: &str) -> Self {
        if config.randomize_fingerprint {
            return Self::randomized();
        }

        Self {
            user_agent: user_agent.to_string(),
            viewport_width: config.window_width,
            viewport_height: config.window_height,
        }
    }
}
