use std::rc::Rc;
use std::sync::Arc;

use gloo_storage::Storage;
use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use pukpuk_shared::{
    DataLayer, GeoDatasetLoader, HeatmapQuery, HeatmapResponse, LoadError, LoadOutcome,
    LoadedDataset, Navigator, RegionIdentity, RegionMapping, RegionRef, Rejection, Transition,
    ViewMode,
};
use wasm_bindgen_futures::spawn_local;

use crate::api;
use crate::breadcrumb::Breadcrumb;
use crate::click::ClickPlan;
use crate::colors::{MAP_BG, TEXT_MUTED, TEXT_STRONG};
use crate::loader::HttpGeoSource;
use crate::map_view::MapView;
use crate::panels::{
    ActiveViewPanel, Controls, Legend, LoadingVeil, NoticeToast, RegionalInsights, StatusBadges,
    Tooltip,
};
use crate::viewport::Viewport;

const SETTINGS_KEY: &str = "pukpuk_settings";
const NOTICE_DURATION_MS: u32 = 3_500;

/// Newtype wrappers so each signal gets a distinct context type.
#[derive(Clone, Copy)]
pub(crate) struct MappingSignal(pub RwSignal<Option<Arc<RegionMapping>>>);
#[derive(Clone, Copy)]
pub(crate) struct MappingFailed(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct Nav(pub RwSignal<Navigator>);
#[derive(Clone, Copy)]
pub(crate) struct CurrentRegion(pub Memo<RegionRef>);
#[derive(Clone, Copy)]
pub(crate) struct Dataset(pub RwSignal<Option<LoadedDataset>>);
#[derive(Clone, Copy)]
pub(crate) struct DatasetLoading(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct DatasetError(pub RwSignal<Option<LoadError>>);
#[derive(Clone, Copy)]
pub(crate) struct ReloadNonce(pub RwSignal<u64>);
#[derive(Clone, Copy)]
pub(crate) struct Overlay(pub RwSignal<Option<Arc<HeatmapResponse>>>);
#[derive(Clone, Copy)]
pub(crate) struct OverlayError(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct Mode(pub RwSignal<ViewMode>);
#[derive(Clone, Copy)]
pub(crate) struct Layer(pub RwSignal<DataLayer>);
#[derive(Clone, Copy)]
pub(crate) struct ForecastWeek(pub RwSignal<u32>);
/// Feature under the pointer: draw index plus its resolved identity.
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<(usize, RegionIdentity)>>);
#[derive(Clone, Copy)]
pub(crate) struct MousePos(pub RwSignal<(f64, f64)>);

/// Transient message with a sequence number so an old dismiss timer cannot
/// hide a newer notice.
#[derive(Clone, Copy)]
pub(crate) struct Notice(pub RwSignal<(u64, Option<String>)>);

impl Notice {
    pub(crate) fn show(self, message: String) {
        let seq = self.0.get_untracked().0.wrapping_add(1);
        self.0.set((seq, Some(message)));
        spawn_local(async move {
            TimeoutFuture::new(NOTICE_DURATION_MS).await;
            if self.0.get_untracked().0 == seq {
                self.0.set((seq, None));
            }
        });
    }

    pub(crate) fn dismiss(self) {
        self.0.update(|(_, message)| *message = None);
    }
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
#[serde(default)]
struct Settings {
    mode: ViewMode,
    layer: DataLayer,
}

/// Carry out a click plan: navigate, or explain why not.
pub(crate) fn apply_click_plan(plan: ClickPlan, nav: RwSignal<Navigator>, notice: Notice) {
    if let Some(message) = plan.notice() {
        notice.show(message);
        return;
    }
    let ClickPlan::DrillIn { code, name } = plan else {
        return;
    };
    let transition = nav
        .try_update(|n| n.drill_in(Some(&code), &name))
        .unwrap_or(Transition::Ignored(Rejection::NoCode));
    if let Transition::Ignored(rejection) = transition {
        web_sys::console::warn_1(&format!("Drill-in to {code} ignored: {rejection:?}").into());
    }
}

/// Root application component. Provides global reactive signals via context.
#[component]
pub fn App() -> impl IntoView {
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();

    let mapping: RwSignal<Option<Arc<RegionMapping>>> = RwSignal::new(None);
    let mapping_failed: RwSignal<Option<String>> = RwSignal::new(None);
    let nav: RwSignal<Navigator> = RwSignal::new(Navigator::new());
    let region = Memo::new(move |_| nav.with(|n| n.current()));
    let dataset: RwSignal<Option<LoadedDataset>> = RwSignal::new(None);
    let dataset_loading: RwSignal<bool> = RwSignal::new(false);
    let dataset_error: RwSignal<Option<LoadError>> = RwSignal::new(None);
    let reload_nonce: RwSignal<u64> = RwSignal::new(0);
    let overlay: RwSignal<Option<Arc<HeatmapResponse>>> = RwSignal::new(None);
    let overlay_error: RwSignal<Option<String>> = RwSignal::new(None);
    let overlay_fetch_nonce: RwSignal<u64> = RwSignal::new(0);
    let mode: RwSignal<ViewMode> = RwSignal::new(saved.mode);
    let layer: RwSignal<DataLayer> = RwSignal::new(saved.layer);
    let forecast_week: RwSignal<u32> = RwSignal::new(0);
    let hovered: RwSignal<Option<(usize, RegionIdentity)>> = RwSignal::new(None);
    let mouse_pos: RwSignal<(f64, f64)> = RwSignal::new((0.0, 0.0));
    let viewport: RwSignal<Viewport> = RwSignal::new(Viewport::default());
    let notice = Notice(RwSignal::new((0, None)));

    provide_context(MappingSignal(mapping));
    provide_context(MappingFailed(mapping_failed));
    provide_context(Nav(nav));
    provide_context(CurrentRegion(region));
    provide_context(Dataset(dataset));
    provide_context(DatasetLoading(dataset_loading));
    provide_context(DatasetError(dataset_error));
    provide_context(ReloadNonce(reload_nonce));
    provide_context(Overlay(overlay));
    provide_context(OverlayError(overlay_error));
    provide_context(Mode(mode));
    provide_context(Layer(layer));
    provide_context(ForecastWeek(forecast_week));
    provide_context(Hovered(hovered));
    provide_context(MousePos(mouse_pos));
    provide_context(viewport);
    provide_context(notice);

    // Persist settings to localStorage on any change
    Effect::new(move || {
        let settings = Settings {
            mode: mode.get(),
            layer: layer.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    // Region mapping: fetched on mount and again whenever a retry clears the failure.
    Effect::new(move || {
        reload_nonce.track();
        if mapping.with_untracked(Option::is_some) {
            return;
        }
        spawn_local(async move {
            match api::fetch_region_mapping().await {
                Ok(fetched) => {
                    mapping_failed.set(None);
                    mapping.set(Some(Arc::new(fetched)));
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("Region mapping fetch failed: {e}").into());
                    mapping_failed.set(Some(e));
                }
            }
        });
    });

    // Dataset for the current region. The loader's generation check makes the
    // newest request the only one allowed to touch these signals.
    let loader = Rc::new(GeoDatasetLoader::new(HttpGeoSource::new()));
    Effect::new({
        let loader = loader.clone();
        move || {
            reload_nonce.track();
            let region = region.get();
            let Some(mapping) = mapping.get() else {
                return;
            };
            dataset_loading.set(true);
            dataset_error.set(None);
            let loader = loader.clone();
            spawn_local(async move {
                match loader.load(&mapping, region).await {
                    LoadOutcome::Committed => dataset.set(loader.current()),
                    LoadOutcome::Failed(e) => {
                        web_sys::console::warn_1(&format!("Map dataset load failed: {e}").into());
                    }
                    LoadOutcome::Discarded => return,
                }
                dataset_loading.set(loader.is_loading());
                dataset_error.set(loader.error());
            });
        }
    });

    // Overlay for (region, mode, layer). Only the latest request may apply.
    Effect::new(move || {
        let query = HeatmapQuery {
            level: region.get().code,
            mode: mode.get(),
            layer: layer.get(),
        };
        let request_nonce = overlay_fetch_nonce.get_untracked().wrapping_add(1);
        overlay_fetch_nonce.set(request_nonce);
        spawn_local(async move {
            let result = api::fetch_heatmap(&query).await;
            if overlay_fetch_nonce.get_untracked() != request_nonce {
                return;
            }
            match result {
                Ok(resp) => {
                    overlay_error.set(None);
                    overlay.set(Some(Arc::new(resp)));
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("Heatmap fetch failed: {e}").into());
                    overlay.set(None);
                    overlay_error.set(Some(e));
                }
            }
        });
    });

    // Hover belongs to the dataset it was measured against.
    Effect::new(move || {
        dataset.track();
        hovered.set(None);
    });

    view! {
        <div style=format!("min-height: 100%; display: flex; flex-direction: column; gap: 16px; padding: 16px; box-sizing: border-box; background: {MAP_BG}; font-family: 'Inter', system-ui, sans-serif;")>
            <header>
                <h1 style=format!("margin: 0; font-size: 1.3rem; color: {TEXT_STRONG};")>"Demand Heatmap"</h1>
                <p style=format!("margin: 2px 0 0; font-size: 0.8rem; color: {TEXT_MUTED};")>
                    "Fertilizer demand and stock risk by region"
                </p>
            </header>
            <div style="display: flex; gap: 16px; align-items: stretch; flex-wrap: wrap;">
                <div style="position: relative; flex: 3 1 640px; height: 600px; border-radius: 10px; overflow: hidden; border: 1px solid #E2E8F0; background: #FFFFFF;">
                    <MapView />
                    <Breadcrumb />
                    <ActiveViewPanel />
                    <Legend />
                    <StatusBadges />
                    <LoadingVeil />
                    <NoticeToast />
                </div>
                <div style="flex: 1 1 260px;">
                    <Controls />
                </div>
            </div>
            <RegionalInsights />
        </div>
        <Tooltip />
    }
}
