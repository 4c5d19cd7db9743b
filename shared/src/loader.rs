//! Latest-wins dataset loading.
//!
//! Every call to [`GeoDatasetLoader::load`] takes a fresh generation. A
//! response commits only if its generation is still the newest one issued
//! when it arrives; anything older is dropped without touching state. This
//! keeps the rendered map consistent with the navigation state no matter how
//! overlapping fetches resolve.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::geo::{BoundingRegion, GeoFeatureSet};
use crate::mapping::{DatasetRef, RegionMapping};
use crate::region::{RegionCode, RegionRef};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("no map dataset for region {code}")]
    NotFound { code: RegionCode },
    #[error("dataset request failed with HTTP {0}")]
    Http(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid GeoJSON: {0}")]
    Parse(String),
    #[error("dataset request timed out")]
    Timeout,
}

/// Transport for raw GeoJSON text. The browser implementation uses `fetch`;
/// tests script the resolution order.
pub trait GeoSource {
    fn fetch(&self, dataset: &DatasetRef) -> impl Future<Output = Result<String, LoadError>>;
}

/// A committed dataset and the view it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub region: RegionRef,
    pub dataset: DatasetRef,
    pub features: Arc<GeoFeatureSet>,
    pub bounds: Option<BoundingRegion>,
}

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum LoadOutcome {
    Committed,
    Failed(LoadError),
    /// A newer load was issued before this one finished.
    Discarded,
}

#[derive(Debug, Default)]
struct LoaderState {
    generation: u64,
    loading: bool,
    current: Option<LoadedDataset>,
    error: Option<LoadError>,
}

pub struct GeoDatasetLoader<S> {
    source: S,
    state: RefCell<LoaderState>,
}

impl<S: GeoSource> GeoDatasetLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: RefCell::new(LoaderState::default()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and commit the dataset for `region`, unless superseded.
    pub async fn load(&self, mapping: &RegionMapping, region: RegionRef) -> LoadOutcome {
        let generation = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.loading = true;
            state.error = None;
            state.generation
        };

        let dataset = match mapping.dataset_for(&region) {
            Ok(dataset) => dataset,
            Err(e) => return self.settle_error(generation, e),
        };

        let parsed = self
            .source
            .fetch(&dataset)
            .await
            .and_then(|raw| GeoFeatureSet::parse(&raw, dataset.province_filter.as_deref()));

        match parsed {
            Ok(features) => {
                let mut state = self.state.borrow_mut();
                if state.generation != generation {
                    return LoadOutcome::Discarded;
                }
                let bounds = features.bounds();
                state.current = Some(LoadedDataset {
                    region,
                    dataset,
                    features: Arc::new(features),
                    bounds,
                });
                state.loading = false;
                LoadOutcome::Committed
            }
            Err(e) => self.settle_error(generation, e),
        }
    }

    fn settle_error(&self, generation: u64, error: LoadError) -> LoadOutcome {
        let mut state = self.state.borrow_mut();
        if state.generation != generation {
            return LoadOutcome::Discarded;
        }
        state.loading = false;
        state.error = Some(error.clone());
        LoadOutcome::Failed(error)
    }

    /// Drop the visible dataset and invalidate any in-flight load.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.generation += 1;
        state.loading = false;
        state.current = None;
        state.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<LoadError> {
        self.state.borrow().error.clone()
    }

    pub fn current(&self) -> Option<LoadedDataset> {
        self.state.borrow().current.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::pin::pin;

    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::poll;

    use super::*;
    use crate::region::RegionLevel;

    type Reply = Result<String, LoadError>;

    /// Source whose responses are released by the test, in any order.
    #[derive(Default)]
    struct ScriptedSource {
        pending: RefCell<HashMap<String, oneshot::Receiver<Reply>>>,
    }

    impl ScriptedSource {
        fn expect(&self, file: &str) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().insert(file.to_string(), rx);
            tx
        }
    }

    impl GeoSource for ScriptedSource {
        async fn fetch(&self, dataset: &DatasetRef) -> Reply {
            let rx = self.pending.borrow_mut().remove(&dataset.file);
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(LoadError::Network("sender dropped".to_string()))),
                None => Err(LoadError::Http(404)),
            }
        }
    }

    fn mapping() -> RegionMapping {
        RegionMapping {
            national_dataset: "indonesia".to_string(),
            datasets: HashMap::from([
                ("35".to_string(), "kabupaten".to_string()),
                ("34".to_string(), "kabupaten".to_string()),
                ("3507".to_string(), "id3507_malang".to_string()),
                ("3404".to_string(), "id3404_sleman".to_string()),
            ]),
            regency_names: HashMap::new(),
        }
    }

    fn region(level: RegionLevel, code: &str) -> RegionRef {
        RegionRef {
            level,
            code: code.to_string(),
        }
    }

    fn square(props: &str) -> String {
        format!(
            r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{props},
            "geometry":{{"type":"Polygon","coordinates":[[[110.0,-8.0],[111.0,-8.0],[111.0,-7.0],[110.0,-7.0],[110.0,-8.0]]]}}}}]}}"#
        )
    }

    #[test]
    fn commit_replaces_dataset_and_bounds() {
        let loader = GeoDatasetLoader::new(ScriptedSource::default());
        let tx = loader.source().expect("id3507_malang");
        tx.send(Ok(square(r#"{"district":"Donomulyo"}"#))).unwrap();

        let outcome = block_on(loader.load(&mapping(), region(RegionLevel::Regency, "3507")));
        assert_eq!(outcome, LoadOutcome::Committed);
        assert!(!loader.is_loading());

        let current = loader.current().unwrap();
        assert_eq!(current.region.code, "3507");
        assert_eq!(current.features.len(), 1);
        assert_eq!(current.bounds.unwrap().min_lon, 110.0);
    }

    #[test]
    fn stale_response_is_discarded() {
        let loader = GeoDatasetLoader::new(ScriptedSource::default());
        let malang = loader.source().expect("id3507_malang");
        let sleman = loader.source().expect("id3404_sleman");
        let mapping = mapping();

        block_on(async {
            let mut first = pin!(loader.load(&mapping, region(RegionLevel::Regency, "3507")));
            let mut second = pin!(loader.load(&mapping, region(RegionLevel::Regency, "3404")));
            assert!(poll!(first.as_mut()).is_pending());
            assert!(poll!(second.as_mut()).is_pending());
            assert!(loader.is_loading());

            sleman.send(Ok(square(r#"{"district":"Depok"}"#))).unwrap();
            assert_eq!(second.await, LoadOutcome::Committed);

            malang.send(Ok(square(r#"{"district":"Donomulyo"}"#))).unwrap();
            assert_eq!(first.await, LoadOutcome::Discarded);
        });

        let current = loader.current().unwrap();
        assert_eq!(current.region.code, "3404");
        assert!(!loader.is_loading());
        assert_eq!(loader.error(), None);
    }

    #[test]
    fn stale_failure_does_not_surface() {
        let loader = GeoDatasetLoader::new(ScriptedSource::default());
        let malang = loader.source().expect("id3507_malang");
        let sleman = loader.source().expect("id3404_sleman");
        let mapping = mapping();

        block_on(async {
            let mut first = pin!(loader.load(&mapping, region(RegionLevel::Regency, "3507")));
            let mut second = pin!(loader.load(&mapping, region(RegionLevel::Regency, "3404")));
            assert!(poll!(first.as_mut()).is_pending());
            assert!(poll!(second.as_mut()).is_pending());

            malang.send(Err(LoadError::Http(500))).unwrap();
            assert_eq!(first.await, LoadOutcome::Discarded);
            assert!(loader.is_loading());
            assert_eq!(loader.error(), None);

            sleman.send(Ok(square("{}"))).unwrap();
            assert_eq!(second.await, LoadOutcome::Committed);
        });
    }

    #[test]
    fn failure_keeps_previous_dataset() {
        let loader = GeoDatasetLoader::new(ScriptedSource::default());
        let mapping = mapping();

        let tx = loader.source().expect("indonesia");
        tx.send(Ok(square(r#"{"prov_id":"35"}"#))).unwrap();
        assert_eq!(
            block_on(loader.load(&mapping, RegionRef::root())),
            LoadOutcome::Committed
        );

        let tx = loader.source().expect("id3507_malang");
        tx.send(Ok("not geojson".to_string())).unwrap();
        let outcome = block_on(loader.load(&mapping, region(RegionLevel::Regency, "3507")));
        assert!(matches!(outcome, LoadOutcome::Failed(LoadError::Parse(_))));
        assert!(matches!(loader.error(), Some(LoadError::Parse(_))));
        assert!(!loader.is_loading());
        assert!(loader.current().unwrap().region.is_root());
    }

    #[test]
    fn unknown_region_fails_without_fetching_and_takes_a_generation() {
        let loader = GeoDatasetLoader::new(ScriptedSource::default());
        let before = loader.generation();
        let outcome = block_on(loader.load(&mapping(), region(RegionLevel::Regency, "9999")));
        assert_eq!(
            outcome,
            LoadOutcome::Failed(LoadError::NotFound {
                code: "9999".to_string()
            })
        );
        assert_eq!(loader.generation(), before + 1);
        assert!(loader.current().is_none());
    }

    #[test]
    fn not_found_supersedes_an_in_flight_load() {
        let loader = GeoDatasetLoader::new(ScriptedSource::default());
        let malang = loader.source().expect("id3507_malang");
        let mapping = mapping();

        block_on(async {
            let mut first = pin!(loader.load(&mapping, region(RegionLevel::Regency, "3507")));
            assert!(poll!(first.as_mut()).is_pending());

            let missing = loader
                .load(&mapping, region(RegionLevel::Regency, "9999"))
                .await;
            assert!(matches!(missing, LoadOutcome::Failed(LoadError::NotFound { .. })));

            malang.send(Ok(square("{}"))).unwrap();
            assert_eq!(first.await, LoadOutcome::Discarded);
        });
        assert!(loader.current().is_none());
    }

    #[test]
    fn province_load_filters_shared_file() {
        let loader = GeoDatasetLoader::new(ScriptedSource::default());
        let body = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"prov_id":"35","name":"Malang"},
             "geometry":{"type":"Polygon","coordinates":[[[112.0,-8.0],[113.0,-8.0],[113.0,-7.0],[112.0,-8.0]]]}},
            {"type":"Feature","properties":{"prov_id":"34","name":"Sleman"},
             "geometry":{"type":"Polygon","coordinates":[[[110.0,-8.0],[111.0,-8.0],[111.0,-7.0],[110.0,-8.0]]]}}
        ]}"#;
        loader
            .source()
            .expect("kabupaten")
            .send(Ok(body.to_string()))
            .unwrap();

        let outcome = block_on(loader.load(&mapping(), region(RegionLevel::Province, "34")));
        assert_eq!(outcome, LoadOutcome::Committed);
        let current = loader.current().unwrap();
        assert_eq!(current.features.len(), 1);
        assert_eq!(current.bounds.unwrap().max_lon, 111.0);
    }

    #[test]
    fn clear_blanks_and_invalidates() {
        let loader = GeoDatasetLoader::new(ScriptedSource::default());
        let mapping = mapping();
        let tx = loader.source().expect("indonesia");

        block_on(async {
            let mut pending = pin!(loader.load(&mapping, RegionRef::root()));
            assert!(poll!(pending.as_mut()).is_pending());
            loader.clear();
            assert!(!loader.is_loading());
            tx.send(Ok(square("{}"))).unwrap();
            assert_eq!(pending.await, LoadOutcome::Discarded);
        });
        assert!(loader.current().is_none());
    }
}
