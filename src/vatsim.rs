//! Fetch controller history from the [VATSIM core API][api-ref].
//!
//! [api-ref]: https://vatsim.dev/api/core-api

use eyre::{Context, eyre};
use reqwest::{
    Client, Url,
    header::{self, HeaderValue},
};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{config::NetworkId, monthly::MonthlyTotals, sessions::atc_sessions};

/// Base URL of the public VATSIM API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.vatsim.net";

/// Number of connections requested per member. Further pages are never followed.
const HISTORY_LIMIT: u32 = 100;

/// A user agent representing our program.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Body of `GET /v2/members/{id}/atc`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AtcHistory {
    pub items: Vec<AtcHistoryItem>,
}

/// One entry of a member's ATC history. Only the connection is of interest.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AtcHistoryItem {
    pub connection_id: Connection,
}

/// A single logon to the network, as reported by the API.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Connection {
    pub callsign: String,
    /// Logon time, `YYYY-MM-DDTHH:MM:SSZ`
    pub start: String,
    /// Logoff time, `YYYY-MM-DDTHH:MM:SSZ`
    pub end: String,
}

/// Client for the member history endpoints.
#[derive(Clone, Debug)]
pub struct VatsimClient {
    /// Base URL of the API, without the `/v2` part.
    base_url: Url,
    /// HTTP client used to send requests.
    client: Client,
}

impl VatsimClient {
    /// Create a client that talks to the API at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    /// URL of a member's ATC history, without the query string.
    fn history_url(&self, id: NetworkId) -> eyre::Result<Url> {
        let id = id.to_string();
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| eyre!("API base URL {} cannot have a path", self.base_url))?
            .pop_if_empty()
            .extend(["v2", "members", id.as_str(), "atc"]);
        Ok(url)
    }

    /// Fetch the most recent ATC connections of a member.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the request fails, the API answers with an error status, or the body
    /// isn't the expected JSON.
    #[instrument(skip(self))]
    pub async fn atc_history(&self, id: NetworkId) -> eyre::Result<AtcHistory> {
        let response = self
            .client
            .get(self.history_url(id)?)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .header(header::USER_AGENT, USER_AGENT)
            .query(&[("limit", HISTORY_LIMIT)])
            .send()
            .await
            .wrap_err_with(|| format!("Failed to request ATC history of member {id}"))?
            .error_for_status()
            .wrap_err("VATSIM API returned error")?;
        let history = response
            .json::<AtcHistory>()
            .await
            .wrap_err_with(|| format!("Unexpected ATC history body for member {id}"))?;
        debug!(connections = history.items.len(), "Fetched ATC history");
        Ok(history)
    }

    /// Fetch a member's history and sum their ATC sessions per month.
    pub async fn monthly_atc_hours(&self, id: NetworkId) -> eyre::Result<MonthlyTotals> {
        let history = self.atc_history(id).await?;
        let totals = atc_sessions(&history.items)
            .collect::<Result<MonthlyTotals, _>>()
            .wrap_err_with(|| format!("Bad ATC session in history of member {id}"))?;
        Ok(totals)
    }
}
