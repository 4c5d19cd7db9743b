use std::cell::{Cell, RefCell};
use std::pin::pin;

use futures::future::{Either, select};
use gloo_timers::future::TimeoutFuture;
use pukpuk_shared::{DatasetRef, GeoSource, LoadError};
use web_sys::AbortController;

/// Datasets larger than a few MB take a while on slow links; past this the
/// request is abandoned.
pub(crate) const DATASET_FETCH_TIMEOUT_MS: u32 = 15_000;

/// Browser `fetch` transport for GeoJSON boundaries.
///
/// Only one request is kept alive: starting a new fetch aborts the previous
/// one at the transport level. The loader's generation check still decides
/// what commits, so an abort that arrives too late is harmless.
pub struct HttpGeoSource {
    timeout_ms: u32,
    next_request_id: Cell<u64>,
    in_flight: RefCell<Option<(u64, AbortController)>>,
}

impl HttpGeoSource {
    pub fn new() -> Self {
        Self::with_timeout(DATASET_FETCH_TIMEOUT_MS)
    }

    pub fn with_timeout(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            next_request_id: Cell::new(0),
            in_flight: RefCell::new(None),
        }
    }

    fn begin(&self) -> Result<(u64, AbortController), LoadError> {
        let controller = AbortController::new()
            .map_err(|_| LoadError::Network("AbortController unavailable".to_string()))?;
        let id = self.next_request_id.get().wrapping_add(1);
        self.next_request_id.set(id);
        if let Some((_, previous)) = self
            .in_flight
            .borrow_mut()
            .replace((id, controller.clone()))
        {
            previous.abort();
        }
        Ok((id, controller))
    }

    fn finish(&self, id: u64) {
        let mut slot = self.in_flight.borrow_mut();
        if slot.as_ref().is_some_and(|(current, _)| *current == id) {
            *slot = None;
        }
    }
}

impl Default for HttpGeoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoSource for HttpGeoSource {
    async fn fetch(&self, dataset: &DatasetRef) -> Result<String, LoadError> {
        let (id, controller) = self.begin()?;
        let url = dataset.path();
        let signal = controller.signal();

        let request = pin!(async {
            let resp = gloo_net::http::Request::get(&url)
                .abort_signal(Some(&signal))
                .send()
                .await
                .map_err(|e| LoadError::Network(e.to_string()))?;
            check_status(resp.status())?;
            resp.text()
                .await
                .map_err(|e| LoadError::Network(e.to_string()))
        });
        let timeout = pin!(TimeoutFuture::new(self.timeout_ms));

        let result = match select(request, timeout).await {
            Either::Left((body, _)) => body,
            Either::Right(((), _)) => {
                controller.abort();
                Err(LoadError::Timeout)
            }
        };
        self.finish(id);
        result
    }
}

fn check_status(status: u16) -> Result<(), LoadError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(LoadError::Http(status))
    }
}
