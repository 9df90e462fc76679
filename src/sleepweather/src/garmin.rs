use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sleepweather_codec::SleepPayload;

mod sso;
pub use sso::OAuth1Token;

const CONNECT_API: &str = "https://connectapi.garmin.com";
const TOKEN_FILE: &str = "oauth2_token.json";
const OAUTH1_FILE: &str = "oauth1_token.json";

/// The wearable service refused the session token.
#[derive(Debug, thiserror::Error)]
#[error("session rejected by wearable service ({0})")]
pub struct SessionRejected(pub StatusCode);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth2Token {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn bearer() -> String {
    "Bearer".to_owned()
}

impl OAuth2Token {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Directory holding the persisted session between runs.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> anyhow::Result<Option<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let value = serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid session file {}", path.display()))?;
        Ok(Some(value))
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.dir.join(file);
        fs::write(&path, serde_json::to_vec_pretty(value)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// `None` when no session was saved yet.
    pub fn load(&self) -> anyhow::Result<Option<OAuth2Token>> {
        self.read(TOKEN_FILE)
    }

    pub fn save(&self, token: &OAuth2Token) -> anyhow::Result<()> {
        self.write(TOKEN_FILE, token)
    }

    pub fn load_oauth1(&self) -> anyhow::Result<Option<OAuth1Token>> {
        self.read(OAUTH1_FILE)
    }

    pub fn save_oauth1(&self, token: &OAuth1Token) -> anyhow::Result<()> {
        self.write(OAUTH1_FILE, token)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocialProfile {
    display_name: String,
}

pub struct GarminClient {
    client: reqwest::Client,
    token: OAuth2Token,
    display_name: String,
}

impl GarminClient {
    /// Resumes the stored session, or signs in once with `credentials` when
    /// it is missing, expired or rejected. A failing fresh login is fatal.
    pub async fn connect(
        store: &SessionStore,
        credentials: Option<&Credentials>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();

        info!("trying stored session in {}", store.dir().display());
        match Self::resume(&client, store).await {
            Ok(Some(garmin)) => {
                info!("using existing session for {}", garmin.display_name);
                return Ok(garmin);
            }
            Ok(None) => info!("no valid session found"),
            Err(error) if error.downcast_ref::<SessionRejected>().is_some() => {
                warn!("{error}")
            }
            Err(error) => info!("no valid session found: {error:#}"),
        }

        let Some(credentials) = credentials else {
            bail!("no valid session and no credentials configured");
        };

        info!("logging in with credentials");
        let (oauth1, token) = sso::login(credentials).await?;
        let display_name = Self::profile(&client, &token)
            .await
            .context("fresh session was not accepted")?;
        store.save_oauth1(&oauth1)?;
        store.save(&token)?;
        info!("new session saved to {}", store.dir().display());

        Ok(Self {
            client,
            token,
            display_name,
        })
    }

    async fn resume(
        client: &reqwest::Client,
        store: &SessionStore,
    ) -> anyhow::Result<Option<Self>> {
        let Some(token) = store.load()? else {
            return Ok(None);
        };
        if token.is_expired(Utc::now().timestamp()) {
            debug!("stored session expired");
            return Ok(None);
        }

        let display_name = Self::profile(client, &token).await?;
        Ok(Some(Self {
            client: client.clone(),
            token,
            display_name,
        }))
    }

    async fn profile(client: &reqwest::Client, token: &OAuth2Token) -> anyhow::Result<String> {
        let resp = client
            .get(format!("{CONNECT_API}/userprofile-service/socialProfile"))
            .header("Authorization", token.header())
            .send()
            .await
            .context("failed to reach wearable profile endpoint")?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SessionRejected(status).into());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("profile request failed ({status}): {body}");
        }

        let profile: SocialProfile = resp.json().await.context("invalid profile response")?;
        Ok(profile.display_name)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Full sleep record of the night ending on `date`.
    pub async fn sleep_data(&self, date: NaiveDate) -> anyhow::Result<SleepPayload> {
        let resp = self
            .client
            .get(sleep_data_url(&self.display_name))
            .query(&[
                ("date", date.format("%Y-%m-%d").to_string()),
                ("nonSleepBufferMinutes", "60".to_owned()),
            ])
            .header("Authorization", self.token.header())
            .send()
            .await
            .context("failed to reach sleep endpoint")?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SessionRejected(status).into());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("sleep data request failed ({status}): {body}");
        }

        let bytes = resp.bytes().await.context("failed to read sleep data")?;
        let payload = SleepPayload::from_slice(&bytes)?;
        info!("downloaded sleep data for {date}");
        Ok(payload)
    }
}

fn sleep_data_url(display_name: &str) -> String {
    format!("{CONNECT_API}/wellness-service/wellness/dailySleepData/{display_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> OAuth2Token {
        OAuth2Token {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            expires_at: Some(1_741_392_000),
            refresh_token: None,
        }
    }

    #[test]
    fn session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join(".garth"));

        assert_eq!(store.load().unwrap(), None);
        store.save(&token()).unwrap();
        assert_eq!(store.load().unwrap(), Some(token()));
        assert!(dir.path().join(".garth").join(TOKEN_FILE).exists());

        let oauth1 = OAuth1Token {
            oauth_token: "t".into(),
            oauth_token_secret: "s".into(),
            mfa_token: None,
            domain: Some("garmin.com".into()),
        };
        assert_eq!(store.load_oauth1().unwrap(), None);
        store.save_oauth1(&oauth1).unwrap();
        assert_eq!(store.load_oauth1().unwrap(), Some(oauth1));
    }

    #[test]
    fn corrupt_session_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TOKEN_FILE), b"not json").unwrap();
        assert!(SessionStore::new(dir.path()).load().is_err());
    }

    #[test]
    fn token_defaults_and_expiry() {
        let token: OAuth2Token = serde_json::from_str(r#"{"access_token": "xyz"}"#).unwrap();
        assert_eq!(token.header(), "Bearer xyz");
        assert!(!token.is_expired(i64::MAX));

        assert!(self::token().is_expired(1_741_392_000));
        assert!(!self::token().is_expired(1_741_391_999));
    }

    #[test]
    fn sleep_url_uses_display_name() {
        assert_eq!(
            sleep_data_url("sleeper42"),
            "https://connectapi.garmin.com/wellness-service/wellness/dailySleepData/sleeper42"
        );
    }

    #[test]
    fn rejection_is_detectable() {
        let error: anyhow::Error = SessionRejected(StatusCode::UNAUTHORIZED).into();
        assert!(error.downcast_ref::<SessionRejected>().is_some());
    }
}
