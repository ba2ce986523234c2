//! Client configuration.

use std::time::Duration;

/// Desktop browser user agent expected by the login endpoints.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.10; rv:42.0) Gecko/20100101 Firefox/42.0";

/// Application id registered for the web client.
pub const APP_ID: &str = "wx782c26e4c19acffb";

/// Base configuration used by the webwx client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// User agent advertised on every request.
    pub user_agent: String,
    /// Login host serving token, QR and status endpoints.
    pub login_base: String,
    /// Media upload endpoint (lives on a separate file host).
    pub upload_url: String,
    /// Candidate hosts for the long-poll endpoint, probed in order.
    pub sync_hosts: Vec<String>,
    /// Language parameter sent on login calls.
    pub lang: String,
    /// Hard timeout for every request, long-poll probes included.
    pub request_timeout: Duration,
    /// Fixed delay before retrying after a transport failure.
    pub backoff_delay: Duration,
    /// TCP keep-alive interval on the connection pool.
    pub keepalive: Duration,
    /// Maximum identities per bulk contact fetch.
    pub batch_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.into(),
            login_base: "https://login.weixin.qq.com".into(),
            upload_url: "https://file.wx2.qq.com/cgi-bin/mmwebwx-bin/webwxuploadmedia?f=json"
                .into(),
            sync_hosts: [
                "wx2.qq.com",
                "webpush.wx2.qq.com",
                "wx8.qq.com",
                "webpush.wx8.qq.com",
                "qq.com",
                "webpush.wx.qq.com",
                "web2.wechat.com",
                "webpush.web2.wechat.com",
                "wechat.com",
                "webpush.web.wechat.com",
                "webpush.weixin.qq.com",
                "webpush.wechat.com",
                "webpush1.wechat.com",
                "webpush2.wechat.com",
                "webpush2.wx.qq.com",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            lang: "zh_CN".into(),
            request_timeout: Duration::from_secs(60),
            backoff_delay: Duration::from_secs(3),
            keepalive: Duration::from_secs(60),
            batch_size: 50,
        }
    }
}

impl ClientConfig {
    /// Override the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the login host.
    pub fn with_login_base(mut self, base: impl Into<String>) -> Self {
        self.login_base = base.into();
        self
    }

    /// Override the long-poll host candidates.
    pub fn with_sync_hosts(mut self, hosts: Vec<String>) -> Self {
        self.sync_hosts = hosts;
        self
    }

    /// Override the retry backoff delay.
    pub fn with_backoff_delay(mut self, delay: Duration) -> Self {
        self.backoff_delay = delay;
        self
    }
}
