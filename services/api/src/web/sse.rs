//! services/api/src/web/sse.rs
//!
//! The live listener endpoint: a long-lived `text/event-stream` that relays
//! scan events for one piece of equipment to a dashboard.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use uuid::Uuid;

use crate::error::AppError;
use crate::web::state::AppState;
use meams_core::protocol::ScanFrame;

/// Idle interval between keepalive comments.
const KEEPALIVE_SECS: u64 = 30;

fn frame_event(frame: &ScanFrame) -> Event {
    match serde_json::to_string(frame) {
        Ok(json) => Event::default().data(json),
        // A frame that cannot serialize carries no data worth sending; keep
        // the stream alive instead of tearing it down.
        Err(e) => {
            tracing::error!("scan frame serialization failed: {}", e);
            Event::default().comment("frame dropped")
        }
    }
}

/// GET /listen/equipment/{asset_id} - Subscribe to scan events
///
/// Emits a `connected` frame, then one frame per scan. Dropping the
/// connection drops the stream, which unregisters the listener from the hub.
pub async fn listen_equipment_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let asset_id = Uuid::parse_str(&asset_id).map_err(|_| AppError::InvalidIdFormat)?;
    // Confirm the asset exists before holding a connection open for it.
    state.assets.get_equipment(asset_id).await?;

    let listener = state.hub.subscribe(asset_id);
    let stream = async_stream::stream! {
        yield Ok(frame_event(&ScanFrame::Connected { equipment_id: asset_id }));
        loop {
            let event = listener.recv().await;
            yield Ok(frame_event(&ScanFrame::Scan(event)));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEPALIVE_SECS))))
}
