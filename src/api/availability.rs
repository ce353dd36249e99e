//! Server-sent availability stream

use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{Stream, StreamExt};

use crate::{models::AvailabilityEvent, AppState};

/// Stream book availability changes
#[utoipa::path(
    get,
    path = "/stream/books/availability",
    tag = "availability",
    responses(
        (status = 200, description = "Server-sent events, one per availability change",
         content_type = "text/event-stream", body = AvailabilityEvent)
    )
)]
pub async fn stream_availability(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.services.availability.subscribe();
    tracing::debug!(
        subscribers = state.services.availability.subscriber_count(),
        "Availability subscriber connected"
    );

    // The subscription is dropped with the response body when the client goes away
    let events = subscription.map(|event| Event::default().event("availability").json_data(event));

    Sse::new(events).keep_alive(
        KeepAlive::new().interval(Duration::from_secs(state.config.availability.keep_alive_secs)),
    )
}
