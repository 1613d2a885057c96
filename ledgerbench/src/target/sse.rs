use super::{EventStream, TransactionEvent};
use crate::error::TargetError;
use bytes::Bytes;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::future;
use futures_util::stream::{Stream, StreamExt};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

const TRANSACTION_EVENT: &str = "transaction";
const ERROR_EVENT: &str = "error";
const DEFAULT_EVENT: &str = "message";

/// Turn a `text/event-stream` body into typed transaction events.
pub(crate) fn events<S>(body: S) -> EventStream
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    body.eventsource()
        .filter_map(|item| future::ready(decode(item)))
        .boxed()
}

fn decode(
    item: Result<Event, EventStreamError<reqwest::Error>>,
) -> Option<Result<TransactionEvent, TargetError>> {
    let event = match item {
        Ok(event) => event,
        Err(EventStreamError::Transport(err)) => return Some(Err(err.into())),
        Err(err) => return Some(Err(TargetError::Framing(err.to_string()))),
    };

    match event.event.as_str() {
        ERROR_EVENT => Some(Err(TargetError::Stream(event.data))),
        TRANSACTION_EVENT | DEFAULT_EVENT | "" => {
            if event.data.is_empty() {
                return None;
            }
            Some(serde_json::from_str(&event.data).map_err(TargetError::from))
        }
        other => {
            debug!("Ignoring unknown SSE event `{other}`");
            None
        }
    }
}
