use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, Context, Result};
use config::{Config as config_config, File as config_file, FileFormat};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::logging;

const CONFIG_PATH: &str = "config.json";
const CONFIG_PATH_ENV: &str = "INDEX_NOTIFIER_CONFIG";

const DEFAULT_INDEX_NAME: &str = "Ibovespa";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 3 * 60;
const DEFAULT_LAST_VALUE_PATH: &str = "last_price.txt";

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct App {
    /// Instrument identifier understood by the quote provider, e.g. `^BVSP`.
    pub symbol: String,
    /// Name used in notification messages.
    pub index_name: String,
    pub poll_interval_secs: u64,
    pub last_value_path: String,
    /// Empty means a generated desktop browser User-Agent.
    pub user_agent: String,
    pub source: Source,
    pub bot: Bot,
}

impl Default for App {
    fn default() -> Self {
        App {
            symbol: String::new(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            last_value_path: DEFAULT_LAST_VALUE_PATH.to_string(),
            user_agent: String::new(),
            source: Default::default(),
            bot: Default::default(),
        }
    }
}

const SYMBOL: &str = "SYMBOL";
const POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Source {
    pub provider: Provider,
    pub alpha_vantage: AlphaVantage,
    pub web_page: WebPage,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Provider {
    #[default]
    AlphaVantage,
    WebPage,
}

const QUOTE_PROVIDER: &str = "QUOTE_PROVIDER";
const ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct AlphaVantage {
    pub api_key: String,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct WebPage {
    pub url: String,
    /// CSS selector of the element holding the value.
    pub selector: String,
    /// Optional nested selector inside `selector`.
    pub element: String,
    /// The page writes `128.431,20` rather than `128,431.20`.
    pub decimal_comma: bool,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Bot {
    pub twitter: Twitter,
    pub telegram: Telegram,
}

const TWITTER_CONSUMER_KEY: &str = "TWITTER_CONSUMER_KEY";
const TWITTER_CONSUMER_SECRET: &str = "TWITTER_CONSUMER_SECRET";
const TWITTER_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
const TWITTER_ACCESS_SECRET: &str = "TWITTER_ACCESS_SECRET";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Twitter {
    pub enabled: bool,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
const TELEGRAM_ALLOWED: &str = "TELEGRAM_ALLOWED";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Telegram {
    pub enabled: bool,
    pub token: String,
    /// chat id -> who it belongs to
    pub allowed: HashMap<String, String>,
}

impl App {
    /// The file written on first run for the operator to fill in.
    pub fn placeholder() -> Self {
        App {
            symbol: "Symbol".to_string(),
            source: Source {
                provider: Provider::AlphaVantage,
                alpha_vantage: AlphaVantage {
                    api_key: "API Key".to_string(),
                },
                web_page: Default::default(),
            },
            bot: Bot {
                twitter: Twitter {
                    enabled: true,
                    consumer_key: "Consumer Key".to_string(),
                    consumer_secret: "Consumer Secret Key".to_string(),
                    access_token: "Access Token".to_string(),
                    access_secret: "Access Secret Token".to_string(),
                },
                telegram: Telegram {
                    enabled: false,
                    token: "Telegram Bot Token".to_string(),
                    allowed: HashMap::new(),
                },
            },
            ..Default::default()
        }
    }

    /// Reads the file through the `config` crate and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let app: App = config_config::builder()
            .add_source(config_file::from(path.to_path_buf()).format(FileFormat::Json))
            .build()?
            .try_deserialize()?;

        let app = app.override_with_env();
        app.validate()?;

        Ok(app)
    }

    fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() && self.source.provider == Provider::AlphaVantage {
            return Err(anyhow!("'symbol' must be set"));
        }

        if self.poll_interval_secs == 0 {
            return Err(anyhow!("'poll_interval_secs' must be greater than zero"));
        }

        if self.source.provider == Provider::WebPage
            && (self.source.web_page.url.is_empty() || self.source.web_page.selector.is_empty())
        {
            return Err(anyhow!(
                "'source.web_page.url' and 'source.web_page.selector' must be set"
            ));
        }

        Ok(())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(symbol) = env::var(SYMBOL) {
            self.symbol = symbol;
        }

        if let Ok(secs) = env::var(POLL_INTERVAL_SECS) {
            match u64::from_str(&secs) {
                Ok(secs) => self.poll_interval_secs = secs,
                Err(why) => logging::error_file_async(format!(
                    "Failed to parse {}={} because {:?}",
                    POLL_INTERVAL_SECS, secs, why
                )),
            }
        }

        if let Ok(provider) = env::var(QUOTE_PROVIDER) {
            match Provider::from_str(&provider) {
                Ok(p) => self.source.provider = p,
                Err(why) => logging::error_file_async(format!(
                    "Failed to parse {}={} because {:?}",
                    QUOTE_PROVIDER, provider, why
                )),
            }
        }

        if let Ok(key) = env::var(ALPHA_VANTAGE_API_KEY) {
            self.source.alpha_vantage.api_key = key;
        }

        if let Ok(key) = env::var(TWITTER_CONSUMER_KEY) {
            self.bot.twitter.consumer_key = key;
        }

        if let Ok(secret) = env::var(TWITTER_CONSUMER_SECRET) {
            self.bot.twitter.consumer_secret = secret;
        }

        if let Ok(token) = env::var(TWITTER_ACCESS_TOKEN) {
            self.bot.twitter.access_token = token;
        }

        if let Ok(secret) = env::var(TWITTER_ACCESS_SECRET) {
            self.bot.twitter.access_secret = secret;
        }

        if let Ok(token) = env::var(TELEGRAM_TOKEN) {
            self.bot.telegram.token = token;
        }

        if let Ok(tg_allowed) = env::var(TELEGRAM_ALLOWED) {
            match serde_json::from_str::<HashMap<String, String>>(&tg_allowed) {
                Ok(allowed) => {
                    self.bot.telegram.allowed = allowed;
                }
                Err(why) => {
                    logging::error_file_async(format!(
                        "Failed to serde_json because: {:?} \r\n {}",
                        why, &tg_allowed
                    ));
                }
            }
        }

        self
    }
}

/// 回傳設定檔的路徑
pub fn config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_PATH))
}

/// Loads the configuration at `path`.
///
/// On first run the file does not exist yet: a placeholder is written for the
/// operator to fill in and `None` is returned, telling the caller to stop.
pub fn bootstrap(path: &Path) -> Result<Option<App>> {
    if !path.exists() {
        let placeholder = serde_json::to_string_pretty(&App::placeholder())?;
        fs::write(path, placeholder)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        logging::warn_file_async(format!(
            "Configure the notifier in \"{}\" and start it again!",
            path.display()
        ));

        return Ok(None);
    }

    App::load(path)
        .with_context(|| format!("Failed to load {}", path.display()))
        .map(Some)
}

#[cfg(test)]
mod tests {
    use std::process;

    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let path = env::temp_dir().join(format!(
            "index_notifier_{}_{}.json",
            name,
            process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_bootstrap_writes_placeholder_then_loads_it() {
        let path = scratch_file("bootstrap");

        assert!(bootstrap(&path).unwrap().is_none());
        assert!(path.exists());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["bot"]["twitter"]["consumer_key"], "Consumer Key");
        assert_eq!(written["source"]["alpha_vantage"]["api_key"], "API Key");
        assert_eq!(written["symbol"], "Symbol");

        let app = bootstrap(&path).unwrap().expect("config exists now");
        assert_eq!(app.poll_interval_secs, 180);
        assert_eq!(app.index_name, "Ibovespa");
        assert_eq!(app.last_value_path, "last_price.txt");
        assert_eq!(app.source.provider, Provider::AlphaVantage);
        assert!(app.bot.twitter.enabled);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let path = scratch_file("partial");
        fs::write(
            &path,
            r#"{
                "symbol": "USDBRL",
                "source": { "provider": "web_page", "web_page": { "url": "https://example.com", "selector": "span.price" } },
                "bot": { "telegram": { "enabled": true, "token": "t", "allowed": { "123": "ops" } } }
            }"#,
        )
        .unwrap();

        let app = App::load(&path).unwrap();
        assert_eq!(app.symbol, "USDBRL");
        assert_eq!(app.source.provider, Provider::WebPage);
        assert_eq!(app.source.web_page.selector, "span.price");
        assert!(app.source.web_page.element.is_empty());
        assert!(!app.bot.twitter.enabled);
        assert!(app.bot.telegram.enabled);
        assert_eq!(app.bot.telegram.allowed.get("123").map(String::as_str), Some("ops"));
        assert_eq!(app.poll_interval_secs, 180);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_incomplete_web_page() {
        let path = scratch_file("invalid");
        fs::write(
            &path,
            r#"{ "symbol": "X", "source": { "provider": "web_page" } }"#,
        )
        .unwrap();

        assert!(App::load(&path).is_err());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!(Provider::from_str("web_page").unwrap(), Provider::WebPage);
        assert_eq!(Provider::from_str("Alpha_Vantage").unwrap(), Provider::AlphaVantage);
        assert!(Provider::from_str("bloomberg").is_err());
        assert_eq!(Provider::WebPage.as_ref(), "web_page");
    }
}
