//! Share links for persisted sessions

use url::Url;

use crate::error::{Result, RetypeError};
use crate::types::SessionId;

/// Path of the playback page relative to the application origin
pub const PLAYBACK_PATH: &str = "components/Playback";

/// Build `{origin}/components/Playback?sessionId={id}`
pub fn share_link(origin: &Url, session_id: &SessionId) -> Result<Url> {
    let mut url = origin.clone();
    url.path_segments_mut()
        .map_err(|_| RetypeError::Config(format!("{} cannot be a base URL", origin)))?
        .pop_if_empty()
        .extend(PLAYBACK_PATH.split('/'));
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut()
        .append_pair("sessionId", session_id.as_str());
    Ok(url)
}

/// Pull the session id back out of a share link
pub fn session_from_link(link: &Url) -> Result<SessionId> {
    let raw = link
        .query_pairs()
        .find(|(key, _)| key == "sessionId")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| RetypeError::InvalidSessionId(link.to_string()))?;
    SessionId::parse(raw)
}
