//! Credential login: SSO ticket, OAuth1 pre-authorization, OAuth2 exchange.

use anyhow::{Context, anyhow, bail};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use regex::Regex;
use reqwest::{Url, header};
use ring::hmac;
use serde::{Deserialize, Serialize};

use super::{CONNECT_API, Credentials, OAuth2Token};

const SSO: &str = "https://sso.garmin.com/sso";
const CONSUMER_URL: &str = "https://thegarth.s3.amazonaws.com/oauth_consumer.json";
const OAUTH_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";
const SSO_USER_AGENT: &str = "GCM-iOS-5.7.2.1";

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConsumer {
    pub consumer_key: String,
    pub consumer_secret: String,
}

/// Long-lived token from the pre-authorization step, stored next to the
/// OAuth2 session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth1Token {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default)]
    pub mfa_token: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: String,
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl ExchangeResponse {
    fn into_token(self, now: i64) -> OAuth2Token {
        OAuth2Token {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_at: self.expires_in.map(|secs| now + secs),
            refresh_token: self.refresh_token,
        }
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// HMAC-SHA1 request signing for the `oauth-service` endpoints.
pub struct OAuth1Signer<'a> {
    consumer: &'a OAuthConsumer,
    token: Option<&'a OAuth1Token>,
}

impl<'a> OAuth1Signer<'a> {
    pub fn new(consumer: &'a OAuthConsumer, token: Option<&'a OAuth1Token>) -> Self {
        Self { consumer, token }
    }

    fn base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        let mut encoded: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        encoded.sort();
        let joined = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(base_url.as_str()),
            encode(&joined)
        )
    }

    fn signature(&self, base_string: &str) -> String {
        let token_secret = self.token.map_or("", |t| t.oauth_token_secret.as_str());
        let key = format!(
            "{}&{}",
            encode(&self.consumer.consumer_secret),
            encode(token_secret)
        );
        let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key.as_bytes());
        BASE64.encode(hmac::sign(&key, base_string.as_bytes()).as_ref())
    }

    /// `Authorization` header value for a request to `url`. Query pairs and
    /// `form` fields take part in the signature.
    pub fn authorization(
        &self,
        method: &str,
        url: &Url,
        form: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut oauth = vec![
            ("oauth_consumer_key", self.consumer.consumer_key.clone()),
            ("oauth_nonce", nonce.to_owned()),
            ("oauth_signature_method", "HMAC-SHA1".to_owned()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_version", "1.0".to_owned()),
        ];
        if let Some(token) = self.token {
            oauth.push(("oauth_token", token.oauth_token.clone()));
        }

        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .chain(form.iter().map(|&(k, v)| (k.to_owned(), v.to_owned())))
            .chain(oauth.iter().map(|(k, v)| ((*k).to_owned(), v.clone())))
            .collect();
        let signature = self.signature(&Self::base_string(method, url, &params));
        oauth.push(("oauth_signature", signature));
        oauth.sort();

        let fields = oauth
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {fields}")
    }
}

fn capture(pattern: &str, html: &str) -> anyhow::Result<Option<String>> {
    let re = Regex::new(pattern)?;
    Ok(re
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned()))
}

fn csrf_token(html: &str) -> anyhow::Result<Option<String>> {
    capture(r#"name="_csrf"\s+value="(.+?)""#, html)
}

fn page_title(html: &str) -> anyhow::Result<Option<String>> {
    capture(r"<title>(.+?)</title>", html)
}

fn ticket(html: &str) -> anyhow::Result<Option<String>> {
    capture(r#"embed\?ticket=([^"]+)""#, html)
}

/// `oauth_token=..&oauth_token_secret=..` body of the pre-authorization.
fn parse_oauth1(body: &str) -> anyhow::Result<OAuth1Token> {
    let mut token = None;
    let mut secret = None;
    let mut mfa_token = None;
    for pair in body.trim().split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)?.into_owned();
        match key {
            "oauth_token" => token = Some(value),
            "oauth_token_secret" => secret = Some(value),
            "mfa_token" => mfa_token = Some(value),
            _ => {}
        }
    }

    Ok(OAuth1Token {
        oauth_token: token.ok_or_else(|| anyhow!("pre-authorization without oauth_token"))?,
        oauth_token_secret: secret
            .ok_or_else(|| anyhow!("pre-authorization without oauth_token_secret"))?,
        mfa_token,
        domain: Some("garmin.com".to_owned()),
    })
}

fn embed_params() -> Vec<(&'static str, String)> {
    vec![
        ("id", "gauth-widget".to_owned()),
        ("embedWidget", "true".to_owned()),
        ("gauthHost", SSO.to_owned()),
    ]
}

fn signin_params() -> Vec<(&'static str, String)> {
    let embed = format!("{SSO}/embed");
    vec![
        ("id", "gauth-widget".to_owned()),
        ("embedWidget", "true".to_owned()),
        ("gauthHost", embed.clone()),
        ("service", embed.clone()),
        ("source", embed.clone()),
        ("redirectAfterAccountLoginUrl", embed.clone()),
        ("redirectAfterAccountCreationUrl", embed),
    ]
}

async fn text(resp: reqwest::Response, step: &str) -> anyhow::Result<String> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{step} failed ({status}): {body}");
    }
    resp.text()
        .await
        .with_context(|| format!("invalid {step} response"))
}

/// Runs the SSO sign-in form and returns the service ticket.
async fn sso_ticket(client: &reqwest::Client, credentials: &Credentials) -> anyhow::Result<String> {
    let embed = Url::parse_with_params(&format!("{SSO}/embed"), embed_params())?;
    let resp = client
        .get(embed.clone())
        .send()
        .await
        .context("failed to reach SSO")?;
    text(resp, "SSO embed").await?;

    let signin = Url::parse_with_params(&format!("{SSO}/signin"), signin_params())?;
    let resp = client
        .get(signin.clone())
        .header(header::REFERER, embed.as_str())
        .send()
        .await
        .context("failed to reach SSO sign-in")?;
    let html = text(resp, "SSO sign-in page").await?;
    let csrf = csrf_token(&html)?.ok_or_else(|| anyhow!("sign-in page without CSRF token"))?;

    let resp = client
        .post(signin.clone())
        .header(header::REFERER, signin.as_str())
        .form(&[
            ("username", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
            ("embed", "true"),
            ("_csrf", csrf.as_str()),
        ])
        .send()
        .await
        .context("failed to submit SSO sign-in")?;
    let html = text(resp, "SSO sign-in").await?;

    let title = page_title(&html)?.unwrap_or_default();
    if title.contains("MFA") {
        bail!("account requires multi-factor authentication, which is not supported");
    }
    if title != "Success" {
        bail!("authentication failed: sign-in page says {title:?}");
    }
    ticket(&html)?.ok_or_else(|| anyhow!("sign-in succeeded without a service ticket"))
}

async fn consumer(client: &reqwest::Client) -> anyhow::Result<OAuthConsumer> {
    let resp = client
        .get(CONSUMER_URL)
        .send()
        .await
        .context("failed to fetch OAuth consumer")?;
    if !resp.status().is_success() {
        bail!("fetching OAuth consumer failed ({})", resp.status());
    }
    resp.json().await.context("invalid OAuth consumer")
}

async fn preauthorize(
    client: &reqwest::Client,
    consumer: &OAuthConsumer,
    ticket: &str,
) -> anyhow::Result<OAuth1Token> {
    let url = Url::parse_with_params(
        &format!("{CONNECT_API}/oauth-service/oauth/preauthorized"),
        [
            ("ticket", ticket.to_owned()),
            ("login-url", format!("{SSO}/embed")),
            ("accepts-mfa-tokens", "true".to_owned()),
        ],
    )?;
    let authorization = OAuth1Signer::new(consumer, None).authorization(
        "GET",
        &url,
        &[],
        &nonce(),
        Utc::now().timestamp(),
    );

    let resp = client
        .get(url)
        .header(header::USER_AGENT, OAUTH_USER_AGENT)
        .header(header::AUTHORIZATION, authorization)
        .send()
        .await
        .context("failed to reach OAuth pre-authorization")?;
    parse_oauth1(&text(resp, "OAuth pre-authorization").await?)
}

/// Trades an OAuth1 token for a fresh OAuth2 session.
async fn exchange(
    client: &reqwest::Client,
    consumer: &OAuthConsumer,
    oauth1: &OAuth1Token,
) -> anyhow::Result<OAuth2Token> {
    let url = Url::parse(&format!(
        "{CONNECT_API}/oauth-service/oauth/exchange/user/2.0"
    ))?;
    let form: Vec<(&str, &str)> = oauth1
        .mfa_token
        .as_deref()
        .map(|mfa| vec![("mfa_token", mfa)])
        .unwrap_or_default();
    let authorization = OAuth1Signer::new(consumer, Some(oauth1)).authorization(
        "POST",
        &url,
        &form,
        &nonce(),
        Utc::now().timestamp(),
    );

    let resp = client
        .post(url)
        .header(header::USER_AGENT, OAUTH_USER_AGENT)
        .header(header::AUTHORIZATION, authorization)
        .form(&form)
        .send()
        .await
        .context("failed to reach OAuth exchange")?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("OAuth exchange failed ({status}): {body}");
    }

    let response: ExchangeResponse = resp.json().await.context("invalid OAuth2 token")?;
    Ok(response.into_token(Utc::now().timestamp()))
}

pub async fn login(credentials: &Credentials) -> anyhow::Result<(OAuth1Token, OAuth2Token)> {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .user_agent(SSO_USER_AGENT)
        .build()?;

    let ticket = sso_ticket(&client, credentials).await?;
    debug!("received SSO ticket");
    let consumer = consumer(&client).await?;
    let oauth1 = preauthorize(&client, &consumer, &ticket).await?;
    let oauth2 = exchange(&client, &consumer, &oauth1).await?;
    Ok((oauth1, oauth2))
}
