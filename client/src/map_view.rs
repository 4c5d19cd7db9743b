use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use pukpuk_shared::geo::Ring;
use pukpuk_shared::{AnalyticsOverlayMap, BoundingRegion, RenderStyle, style_for};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, CanvasWindingRule, HtmlCanvasElement, MouseEvent, PointerEvent,
    WheelEvent,
};

use crate::app::{
    Dataset, Hovered, MappingSignal, MousePos, Nav, Notice, Overlay, apply_click_plan,
};
use crate::click::plan_click;
use crate::colors::{MAP_BG, with_alpha};
use crate::render_loop::RenderScheduler;
use crate::spatial::FeatureIndex;
use crate::viewport::Viewport;

/// Pointer travel (px) below which a press counts as a click, not a drag.
const CLICK_SLOP_PX: f64 = 5.0;

struct ResizeBinding {
    window: web_sys::Window,
    handler: Closure<dyn Fn()>,
}

impl Drop for ResizeBinding {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("resize", self.handler.as_ref().unchecked_ref());
    }
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

/// Canvas map of the committed dataset, styled by the analytics overlay.
#[component]
pub fn MapView() -> impl IntoView {
    let Dataset(dataset) = expect_context();
    let MappingSignal(mapping) = expect_context();
    let Overlay(overlay) = expect_context();
    let Hovered(hovered) = expect_context();
    let MousePos(mouse_pos) = expect_context();
    let Nav(nav) = expect_context();
    let notice: Notice = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    let index: Rc<RefCell<FeatureIndex>> = Rc::new(RefCell::new(FeatureIndex::empty()));
    // Set when a new dataset commits; the next frame fits it to the canvas.
    let needs_fit = Rc::new(Cell::new(false));

    let is_dragging = Rc::new(Cell::new(false));
    let drag_start_x = Rc::new(Cell::new(0.0_f64));
    let drag_start_y = Rc::new(Cell::new(0.0_f64));
    let last_x = Rc::new(Cell::new(0.0_f64));
    let last_y = Rc::new(Cell::new(0.0_f64));

    let scheduler = Rc::new(RenderScheduler::new({
        let index = index.clone();
        let needs_fit = needs_fit.clone();
        move || {
            let Some(canvas) = canvas_ref.get_untracked() else {
                return;
            };
            let canvas: &HtmlCanvasElement = &canvas;
            let Some(parent) = canvas.parent_element() else {
                return;
            };
            let w = parent.client_width() as f64;
            let h = parent.client_height() as f64;
            if w <= 0.0 || h <= 0.0 {
                return;
            }

            if needs_fit.replace(false) {
                let bounds = dataset.with_untracked(|d| d.as_ref().and_then(|d| d.bounds));
                if let Some(bounds) = bounds {
                    // Updating the viewport schedules the frame that paints.
                    viewport.update(|vp| vp.fit_region(&bounds, w, h));
                    return;
                }
            }

            let dpr = web_sys::window()
                .map(|win| win.device_pixel_ratio())
                .unwrap_or(1.0)
                .max(1.0);
            let pw = (w * dpr).round() as u32;
            let ph = (h * dpr).round() as u32;
            if canvas.width() != pw || canvas.height() != ph {
                canvas.set_width(pw);
                canvas.set_height(ph);
            }

            let Some(ctx) = canvas
                .get_context("2d")
                .ok()
                .flatten()
                .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
            else {
                return;
            };
            ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();

            let vp = viewport.get_untracked();
            let hovered_idx = hovered.with_untracked(|h| h.as_ref().map(|(idx, _)| *idx));
            overlay.with_untracked(|resp| {
                paint(PaintInput {
                    ctx: &ctx,
                    w,
                    h,
                    vp: &vp,
                    index: &index.borrow(),
                    overlay: resp.as_ref().map(|r| &r.map_analytics),
                    hovered: hovered_idx,
                });
            });
        }
    }));

    // New dataset: rebuild the hit-test index with the displayed level's rules.
    Effect::new({
        let index = index.clone();
        let needs_fit = needs_fit.clone();
        let scheduler = scheduler.clone();
        move || {
            let committed = dataset.get();
            let names = mapping.get();
            let rebuilt = match (committed, names) {
                (Some(committed), Some(names)) => {
                    FeatureIndex::build(committed.features.clone(), committed.region.level, &*names)
                }
                _ => FeatureIndex::empty(),
            };
            *index.borrow_mut() = rebuilt;
            needs_fit.set(true);
            scheduler.mark_dirty();
        }
    });

    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            viewport.track();
            overlay.track();
            hovered.track();
            scheduler.mark_dirty();
        }
    });

    Effect::new({
        let scheduler = scheduler.clone();
        move || {
            let Some(window) = web_sys::window() else {
                return;
            };
            let scheduler = scheduler.clone();
            let handler = Closure::<dyn Fn()>::new(move || scheduler.mark_dirty());
            if window
                .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
                .is_ok()
            {
                RESIZE_BINDING.with(|slot| {
                    *slot.borrow_mut() = Some(ResizeBinding { window, handler });
                });
            }
            on_cleanup(|| {
                RESIZE_BINDING.with(|slot| {
                    slot.borrow_mut().take();
                });
            });
        }
    });

    let local_point = move |client_x: f64, client_y: f64, fallback: (f64, f64)| {
        canvas_ref
            .get_untracked()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                (client_x - rect.left(), client_y - rect.top())
            })
            .unwrap_or(fallback)
    };

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let (x, y) = local_point(
            e.client_x() as f64,
            e.client_y() as f64,
            (e.offset_x() as f64, e.offset_y() as f64),
        );
        viewport.update(|vp| vp.zoom_at(e.delta_y(), x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            hovered.set(None);
            drag_start_x.set(e.client_x() as f64);
            drag_start_y.set(e.client_y() as f64);
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let index = index.clone();
        move |e: PointerEvent| {
            if is_dragging.get() {
                let dx = e.client_x() as f64 - last_x.get();
                let dy = e.client_y() as f64 - last_y.get();
                last_x.set(e.client_x() as f64);
                last_y.set(e.client_y() as f64);
                viewport.update(|vp| vp.pan(dx, dy));
                return;
            }

            let (sx, sy) = local_point(
                e.client_x() as f64,
                e.client_y() as f64,
                (e.offset_x() as f64, e.offset_y() as f64),
            );
            let (lon, lat) = viewport.with_untracked(|vp| vp.screen_to_lonlat(sx, sy));
            let index = index.borrow();
            let hit = index.find_at(lon, lat);
            let current = hovered.with_untracked(|h| h.as_ref().map(|(idx, _)| *idx));
            if hit != current {
                hovered.set(hit.and_then(|idx| index.identity(idx).map(|id| (idx, id.clone()))));
            }
            if hit.is_some() {
                mouse_pos.set((e.client_x() as f64, e.client_y() as f64));
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if hovered.with_untracked(Option::is_some) {
            hovered.set(None);
        }
    };

    let on_click = {
        let index = index.clone();
        move |e: MouseEvent| {
            let dx = (e.client_x() as f64 - drag_start_x.get()).abs();
            let dy = (e.client_y() as f64 - drag_start_y.get()).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }
            let Some(mapping) = mapping.get_untracked() else {
                return;
            };
            let Some(level) = dataset.with_untracked(|d| d.as_ref().map(|d| d.region.level)) else {
                return;
            };
            let (sx, sy) = local_point(
                e.client_x() as f64,
                e.client_y() as f64,
                (e.offset_x() as f64, e.offset_y() as f64),
            );
            let (lon, lat) = viewport.with_untracked(|vp| vp.screen_to_lonlat(sx, sy));
            let plan = {
                let index = index.borrow();
                let Some(identity) = index.find_at(lon, lat).and_then(|idx| index.identity(idx))
                else {
                    return;
                };
                plan_click(level, identity, &mapping)
            };
            apply_click_plan(plan, nav, notice);
        }
    };

    view! {
        <div
            style="position: absolute; inset: 0; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}

struct PaintInput<'a> {
    ctx: &'a CanvasRenderingContext2d,
    w: f64,
    h: f64,
    vp: &'a Viewport,
    index: &'a FeatureIndex,
    overlay: Option<&'a AnalyticsOverlayMap>,
    hovered: Option<usize>,
}

fn paint(input: PaintInput<'_>) {
    let PaintInput {
        ctx,
        w,
        h,
        vp,
        index,
        overlay,
        hovered,
    } = input;

    ctx.set_fill_style_str(MAP_BG);
    ctx.fill_rect(0.0, 0.0, w, h);
    ctx.set_line_join("round");

    let mut hovered_style = None;
    for (idx, feature, identity) in index.iter() {
        let style = style_for(identity.data_key.as_deref(), &identity.name, overlay);
        if Some(idx) == hovered {
            hovered_style = Some(style.highlighted());
            continue;
        }
        if !on_screen(vp, feature.bounds.as_ref(), w, h) {
            continue;
        }
        draw_feature(ctx, vp, &feature.rings, &style);
    }

    // Highlight goes last so its outline sits above the neighbours'.
    if let (Some(idx), Some(style)) = (hovered, hovered_style)
        && let Some(feature) = index.feature(idx)
    {
        draw_feature(ctx, vp, &feature.rings, &style);
    }
}

fn on_screen(vp: &Viewport, bounds: Option<&BoundingRegion>, w: f64, h: f64) -> bool {
    let Some(b) = bounds else {
        return false;
    };
    let (x1, y1) = vp.lonlat_to_screen(b.min_lon, b.max_lat);
    let (x2, y2) = vp.lonlat_to_screen(b.max_lon, b.min_lat);
    x2 >= 0.0 && y2 >= 0.0 && x1 <= w && y1 <= h
}

fn draw_feature(ctx: &CanvasRenderingContext2d, vp: &Viewport, rings: &[Ring], style: &RenderStyle) {
    ctx.begin_path();
    for ring in rings {
        let mut points = ring.iter().map(|&[lon, lat]| vp.lonlat_to_screen(lon, lat));
        let Some((x0, y0)) = points.next() else {
            continue;
        };
        ctx.move_to(x0, y0);
        for (x, y) in points {
            ctx.line_to(x, y);
        }
        ctx.close_path();
    }

    ctx.set_fill_style_str(&with_alpha(style.fill, style.fill_opacity));
    ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);

    let dash = js_sys::Array::new();
    if let Some(len) = style.dash {
        dash.push(&JsValue::from_f64(len));
        dash.push(&JsValue::from_f64(len));
    }
    ctx.set_line_dash(&dash).ok();
    ctx.set_stroke_style_str(style.stroke);
    ctx.set_line_width(style.weight);
    ctx.stroke();
}
