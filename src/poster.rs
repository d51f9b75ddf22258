//! Publishing a toot.
//!
//! The bot only needs two calls from a social network: upload an image, then
//! publish a status referring to it. [`Poster`] is that seam; [`MastodonPoster`]
//! implements it over the Mastodon HTTP API and [`post`] drives it.

use crate::credentials::Credentials;
use crate::error::AppError;
use crate::geolocation::GeoEstimate;
use log::{info, warn};
use reqwest::blocking::{multipart, Client, Response};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Server-side id of an uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Direct => "direct",
        }
    }
}

/// Everything the publish call needs.
#[derive(Debug, Clone)]
pub struct PublishRequest<'a> {
    pub status: &'a str,
    pub media: &'a [MediaHandle],
    /// Only honoured by networks that support geotagging.
    pub geo: Option<GeoEstimate>,
    pub visibility: Visibility,
}

pub trait Poster {
    fn upload(&self, image: &Path) -> Result<MediaHandle, AppError>;

    /// Publishes a status and returns its public URL.
    fn publish(&self, request: &PublishRequest<'_>) -> Result<String, AppError>;
}

/// What to post.
#[derive(Debug, Clone, Default)]
pub struct Toot {
    pub status: String,
    pub image: Option<PathBuf>,
    pub geo: Option<GeoEstimate>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostOptions {
    /// Go through the motions without calling the network.
    pub test: bool,
    /// Open the published toot in a web browser.
    pub open_browser: bool,
}

/// Uploads the toot's image and publishes it, returning the toot's URL.
///
/// Returns `Ok(None)` without posting when the status is empty or in test mode.
///
/// # Errors
///
/// Any upload or publish failure aborts the post; nothing is retried.
pub fn post<P: Poster + ?Sized>(
    poster: &P,
    toot: &Toot,
    options: PostOptions,
) -> Result<Option<String>, AppError> {
    if toot.status.is_empty() {
        return Ok(None);
    }

    info!("TOOTING THIS:\n{}", toot.status);
    if let Some(image) = &toot.image {
        info!("with image {}", image.display());
    }

    if options.test {
        info!("(Test mode, not actually tooting)");
        return Ok(None);
    }

    let mut media = Vec::new();
    if let Some(image) = &toot.image {
        info!("Upload image");
        media.push(poster.upload(image)?);
    }

    let url = poster.publish(&PublishRequest {
        status: &toot.status,
        media: &media,
        geo: toot.geo,
        visibility: Visibility::Public,
    })?;
    info!("Tooted:\n{url}");

    if options.open_browser {
        if let Err(e) = webbrowser::open(&url) {
            warn!("Could not open a browser for {url}: {e}");
        }
    }

    Ok(Some(url))
}

#[derive(Debug, Deserialize)]
struct MediaAttachment {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    uri: String,
    url: Option<String>,
}

/// Posts to a Mastodon instance as the bot account.
pub struct MastodonPoster {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MastodonPoster {
    /// Builds a client for `base_url`. No request is made until [`Poster::upload`]
    /// or [`Poster::publish`].
    pub fn new(credentials: &Credentials, base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: credentials.require("mastodon_access_token")?.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn check(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::Api {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        })
    }
}

impl Poster for MastodonPoster {
    fn upload(&self, image: &Path) -> Result<MediaHandle, AppError> {
        let form = multipart::Form::new().file("file", image)?;
        let response = self
            .client
            .post(self.endpoint("api/v2/media"))
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()?;
        let media: MediaAttachment = check(response)?.json()?;
        Ok(MediaHandle(media.id))
    }

    fn publish(&self, request: &PublishRequest<'_>) -> Result<String, AppError> {
        // https://github.com/mastodon/mastodon/issues/8340
        if let Some(geo) = request.geo {
            warn!("Mastodon has no geolocation, not attaching {geo}");
        }

        let mut params = vec![
            ("status", request.status.to_string()),
            ("visibility", request.visibility.as_str().to_string()),
        ];
        params.extend(
            request
                .media
                .iter()
                .map(|handle| ("media_ids[]", handle.0.clone())),
        );

        let response = self
            .client
            .post(self.endpoint("api/v1/statuses"))
            .bearer_auth(&self.access_token)
            .form(&params)
            .send()?;
        let status: Status = check(response)?.json()?;
        Ok(status.url.unwrap_or(status.uri))
    }
}
