//! Sub-resource request interception.
//!
//! Pauses every outbound request at the Fetch stage and aborts the
//! categories the configuration blocks; everything else continues
//! unmodified. Cuts attempt latency by skipping content extraction never
//! reads (images, styling, fonts, media).

use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::{debug, trace};

use crate::config::BlockedResource;
use crate::error::ScrapeError;

fn resource_type(category: BlockedResource) -> ResourceType {
    match category {
        BlockedResource::Image => ResourceType::Image,
        BlockedResource::Stylesheet => ResourceType::Stylesheet,
        BlockedResource::Font => ResourceType::Font,
        BlockedResource::Media => ResourceType::Media,
    }
}

/// Enable Fetch-stage interception on the page and spawn the dispatcher.
/// The dispatcher lives until the page (and its event stream) goes away at
/// session close.
pub async fn install(page: &Page, blocked: &[BlockedResource]) -> Result<(), ScrapeError> {
    if blocked.is_empty() {
        return Ok(());
    }

    let blocked: Vec<ResourceType> = blocked.iter().copied().map(resource_type).collect();

    let enable = fetch::EnableParams::builder()
        .pattern(
            RequestPattern::builder()
                .url_pattern("*")
                .request_stage(RequestStage::Request)
                .build(),
        )
        .build();
    page.execute(enable)
        .await
        .map_err(|e| ScrapeError::Launch(format!("request interception: {e}")))?;

    let mut requests = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(|e| ScrapeError::Launch(format!("request interception: {e}")))?;

    let page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = requests.next().await {
            let request_id = event.request_id.clone();
            let dispatch_err = if blocked.contains(&event.resource_type) {
                trace!(url = %event.request.url, kind = ?event.resource_type, "aborting sub-resource");
                page.execute(FailRequestParams::new(
                    request_id,
                    ErrorReason::BlockedByClient,
                ))
                .await
                .err()
            } else {
                page.execute(ContinueRequestParams::new(request_id))
                    .await
                    .err()
            };
            if let Some(e) = dispatch_err {
                // Page teardown races are expected here; nothing to recover.
                debug!("request interception dispatch failed: {e}");
            }
        }
    });

    Ok(())
}
