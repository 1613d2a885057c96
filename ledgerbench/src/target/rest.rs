use super::{sse, EventStream, Target};
use crate::error::TargetError;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use url::Url;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Ledger service reached over its REST API.
///
/// * `GET {base}/api/v1/accounts/{id}/balance`
/// * `GET {base}/api/v1/transactions/stream?rate={n}` as server-sent events
#[derive(Clone, Debug)]
pub struct RestTarget {
    client: Client,
    base: Url,
}

impl RestTarget {
    pub fn new(base_url: &str) -> Result<Self, TargetError> {
        Self::with_client(Client::builder().build()?, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, TargetError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TargetError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Target for RestTarget {
    async fn get_balance(&self, account_id: &str) -> Result<(), TargetError> {
        let url = self.endpoint(&["api", "v1", "accounts", account_id, "balance"])?;
        let res = check_status(self.client.get(url).send().await?).await?;

        // Drain the body so the connection goes back to the pool.
        res.bytes().await?;
        Ok(())
    }

    async fn stream_events(&self, rate: u32) -> Result<EventStream, TargetError> {
        let mut url = self.endpoint(&["api", "v1", "transactions", "stream"])?;
        if rate > 0 {
            url.query_pairs_mut()
                .append_pair("rate", &rate.to_string());
        }

        debug!("Subscribing to {url}");
        let res = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let res = check_status(res).await?;

        Ok(sse::events(res.bytes_stream()))
    }
}

async fn check_status(res: Response) -> Result<Response, TargetError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    Err(TargetError::Status { status, body })
}
