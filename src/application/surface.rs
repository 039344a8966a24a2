use super::channel::PinChannel;
use crate::domain::ports::InteractionSurfaceRef;
use std::sync::Arc;

/// Serves PIN requests from `channel` with `surface` until the channel
/// closes.
///
/// Each request gets exactly one `post_response`. A surface error aborts
/// the channel so the worker fails the attempt instead of waiting on it.
pub async fn drive_surface(channel: Arc<PinChannel>, surface: InteractionSurfaceRef) {
    while let Some(request) = channel.next_request().await {
        match surface.collect_pin(&request).await {
            Ok(response) => {
                if let Err(e) = channel.post_response(response) {
                    // The worker gave up on this request (timeout) or is gone.
                    tracing::warn!("Dropping PIN response: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("PIN collection failed: {}", e);
                channel.abort(e.to_string());
                return;
            }
        }
    }
}
