use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::ev;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use isoline_shared::config::{HIGHLIGHT_Z_INDEX, TILE_Z_INDEX, ZOOM_IN_TIP, ZOOM_OUT_TIP};

use crate::app::{LastHover, MapRevision};
use crate::draw;
use crate::gpu::GpuRenderer;
use crate::hover::{HoverOutcome, PointerMove, clear_hover, handle_pointer_move};
use crate::layers::{FeatureLayerConfig, LayerKind, LayerRole};
use crate::map::{Cursor, IsolineMap, MapHandle};
use crate::render_loop::FrameScheduler;
use crate::scale_line::{ScaleBar, scale_bar};
use crate::tiles::TileCache;

fn device_pixel_ratio() -> f64 {
    web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0)
}

fn highlight_generation(map: &IsolineMap) -> Option<u64> {
    map.layers.get(LayerRole::Highlight).map(|l| l.generation)
}

fn resize_canvas(canvas: &HtmlCanvasElement, width: u32, height: u32) {
    if canvas.width() != width || canvas.height() != height {
        canvas.set_width(width);
        canvas.set_height(height);
    }
}

/// Size the canvas to the device pixel grid and return a cleared context
/// that draws in CSS pixels.
fn prepare_2d(
    canvas: &HtmlCanvasElement,
    (pw, ph): (u32, u32),
    dpr: f64,
    (w, h): (f64, f64),
) -> Option<CanvasRenderingContext2d> {
    resize_canvas(canvas, pw, ph);
    let ctx = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())?;
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
    ctx.clear_rect(0.0, 0.0, w, h);
    Some(ctx)
}

fn canvas_style(z_index: i32) -> String {
    format!(
        "position: absolute; inset: 0; width: 100%; height: 100%; pointer-events: none; z-index: {z_index};"
    )
}

/// Stacked map canvases: tiles, CPU features, GPU features, overlay
/// (labels, then highlight). Input is handled on the container.
#[component]
pub fn MapCanvas(map: MapHandle) -> impl IntoView {
    let revision: MapRevision = expect_context();
    let LastHover(last_hover) = expect_context();

    let container_ref = NodeRef::<leptos::html::Div>::new();
    let tile_canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let feature_canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let gpu_canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let overlay_canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    let is_dragging = Rc::new(Cell::new(false));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));

    // GPU renderer (initialized async, None until ready)
    let gpu: Rc<RefCell<Option<GpuRenderer>>> = Rc::new(RefCell::new(None));
    let gpu_init_started = Rc::new(Cell::new(false));

    // Created on first frame; image loads bump the revision
    let tile_cache: Rc<RefCell<Option<TileCache>>> = Rc::new(RefCell::new(None));

    let render = {
        let map = map.clone();
        let gpu = gpu.clone();
        move || {
            let Some(tile_canvas) = tile_canvas_ref.get_untracked() else {
                return;
            };
            let tile_canvas: &HtmlCanvasElement = &tile_canvas;
            let Some(parent) = tile_canvas.parent_element() else {
                return;
            };
            let w = parent.client_width() as f64;
            let h = parent.client_height() as f64;
            if w <= 0.0 || h <= 0.0 {
                return;
            }
            let dpr = device_pixel_ratio();
            let physical = (
                (w * dpr).round().max(1.0) as u32,
                (h * dpr).round().max(1.0) as u32,
            );

            let mut slot = map.borrow_mut();
            let Some(map) = slot.as_mut() else {
                return;
            };
            map.viewport.set_size(w, h);
            let vp = map.viewport.clone();

            if let Some(ctx) = prepare_2d(tile_canvas, physical, dpr, (w, h)) {
                let mut cache = tile_cache.borrow_mut();
                let cache = cache.get_or_insert_with(|| {
                    TileCache::new(map.base.clone(), Rc::new(move || revision.bump()))
                });
                let ready = cache.request(&map.base.visible_tiles(&vp));
                draw::draw_tiles(&ctx, &vp, &ready);
            }

            let features = map.layers.get(LayerRole::Features);

            let mut gpu_ref = gpu.borrow_mut();
            if let Some(renderer) = gpu_ref.as_mut()
                && let Some(gpu_canvas) = gpu_canvas_ref.get_untracked()
            {
                resize_canvas(&gpu_canvas, physical.0, physical.1);
                renderer.resize(physical.0, physical.1, dpr as f32);
                renderer.render(features, &vp);
            }
            let has_gpu = gpu_ref.is_some();
            drop(gpu_ref);

            if let Some(canvas) = feature_canvas_ref.get_untracked()
                && let Some(ctx) = prepare_2d(&canvas, physical, dpr, (w, h))
                && let Some(layer) = features
                && let LayerKind::Features(config) = &layer.kind
            {
                match config {
                    FeatureLayerConfig::Standard(style_fn) => {
                        draw::draw_features(&ctx, &vp, &layer.features, *style_fn);
                    }
                    FeatureLayerConfig::Accelerated(style) if !has_gpu => {
                        draw::draw_features(&ctx, &vp, &layer.features, |f| style.evaluate(f));
                    }
                    FeatureLayerConfig::Accelerated(_) => {}
                }
            }

            let mut placed = Vec::new();
            if let Some(canvas) = overlay_canvas_ref.get_untracked()
                && let Some(ctx) = prepare_2d(&canvas, physical, dpr, (w, h))
            {
                if let Some(layer) = map.layers.get(LayerRole::Labels)
                    && let LayerKind::Labels { style, declutter } = &layer.kind
                {
                    placed = draw::draw_labels(&ctx, &vp, &layer.features, style, *declutter);
                }
                if let Some(layer) = map.layers.get(LayerRole::Highlight)
                    && let LayerKind::Highlight(style) = &layer.kind
                {
                    draw::draw_highlight(&ctx, &vp, &layer.features, style);
                }
            }
            map.placed_labels = placed;
        }
    };

    let scheduler = Rc::new(FrameScheduler::new(render));

    // Initialize GPU renderer asynchronously
    Effect::new({
        let gpu = gpu.clone();
        let gpu_init_started = gpu_init_started.clone();
        move || {
            if gpu_init_started.get() {
                return;
            }
            let Some(canvas_el) = gpu_canvas_ref.get() else {
                return;
            };
            gpu_init_started.set(true);

            let canvas: &HtmlCanvasElement = &canvas_el;
            let canvas: HtmlCanvasElement = canvas.clone();
            let gpu = gpu.clone();

            wasm_bindgen_futures::spawn_local(async move {
                match GpuRenderer::init(canvas).await {
                    Ok(renderer) => {
                        *gpu.borrow_mut() = Some(renderer);
                        revision.bump();
                    }
                    Err(e) => {
                        web_sys::console::warn_1(
                            &format!("wgpu init failed, using Canvas 2D fallback: {e}").into(),
                        );
                    }
                }
            });
        }
    });

    // Any map mutation repaints on the next frame
    let sched_rev = scheduler.clone();
    Effect::new(move || {
        revision.0.track();
        sched_rev.request();
    });

    let sched_resize = scheduler.clone();
    let _ = window_event_listener(ev::resize, move |_| {
        sched_resize.request();
    });

    let scale: RwSignal<Option<ScaleBar>> = RwSignal::new(None);
    Effect::new({
        let map = map.clone();
        move || {
            revision.0.track();
            let bar = map.borrow().as_ref().and_then(|m| {
                let control = m.scale_line_control()?;
                scale_bar(m.viewport.point_resolution(), control.min_width, control.units)
            });
            if scale.get_untracked() != bar {
                scale.set(bar);
            }
        }
    });

    let apply_cursor = move |cursor: Cursor| {
        if let Some(el) = container_ref.get_untracked() {
            let el: &web_sys::HtmlElement = el.as_ref();
            el.style().set_property("cursor", cursor.css()).ok();
        }
    };

    // --- Input handlers ---

    let on_wheel = {
        let map = map.clone();
        move |e: WheelEvent| {
            e.prevent_default();
            let delta = e.delta_y();
            let x = e.offset_x() as f64;
            let y = e.offset_y() as f64;
            {
                let mut slot = map.borrow_mut();
                let Some(map) = slot.as_mut() else {
                    return;
                };
                map.viewport.zoom_at(delta, x, y);
            }
            revision.bump();
        }
    };

    let on_pointer_down = {
        let map = map.clone();
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);
            if let Some(map) = map.borrow_mut().as_mut() {
                map.cursor = Cursor::Grabbing;
            }
            apply_cursor(Cursor::Grabbing);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
            }
        }
    };

    let on_pointer_move = {
        let map = map.clone();
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            let dragging = is_dragging.get();
            let local = container_ref
                .get_untracked()
                .map(|el| {
                    let rect = el.get_bounding_client_rect();
                    (
                        e.client_x() as f64 - rect.left(),
                        e.client_y() as f64 - rect.top(),
                    )
                })
                .unwrap_or((e.offset_x() as f64, e.offset_y() as f64));

            let (outcome, cursor, changed) = {
                let mut slot = map.borrow_mut();
                let Some(map) = slot.as_mut() else {
                    return;
                };
                if dragging {
                    let dx = e.client_x() as f64 - last_x.get();
                    let dy = e.client_y() as f64 - last_y.get();
                    last_x.set(e.client_x() as f64);
                    last_y.set(e.client_y() as f64);
                    map.viewport.pan(dx, dy);
                }
                let before = highlight_generation(map);
                let outcome = handle_pointer_move(
                    map,
                    PointerMove {
                        pixel: local,
                        dragging,
                    },
                );
                (outcome, map.cursor, highlight_generation(map) != before)
            };
            if !matches!(outcome, HoverOutcome::Ignored) {
                apply_cursor(cursor);
            }
            if let Some(info) = outcome.published()
                && last_hover.get_untracked() != info
            {
                last_hover.set(info);
            }
            if dragging || changed {
                revision.bump();
            }
        }
    };

    let on_pointer_up = {
        let map = map.clone();
        let is_dragging = is_dragging.clone();
        move |_: PointerEvent| {
            is_dragging.set(false);
            if let Some(map) = map.borrow_mut().as_mut() {
                map.cursor = Cursor::Default;
            }
            apply_cursor(Cursor::Default);
        }
    };

    let on_pointer_leave = {
        let map = map.clone();
        let is_dragging = is_dragging.clone();
        move |_: PointerEvent| {
            if is_dragging.get() {
                return;
            }
            let cleared = map.borrow_mut().as_mut().is_some_and(clear_hover);
            apply_cursor(Cursor::Default);
            if last_hover.get_untracked().is_some() {
                last_hover.set(None);
            }
            if cleared {
                revision.bump();
            }
        }
    };

    let zoom_button = {
        let map = map.clone();
        move |direction: f64| {
            let map = map.clone();
            move |_: MouseEvent| {
                {
                    let mut slot = map.borrow_mut();
                    let Some(map) = slot.as_mut() else {
                        return;
                    };
                    let delta = map.zoom_control().map(|z| z.delta).unwrap_or(1.0);
                    map.viewport.zoom_by(direction * delta);
                }
                revision.bump();
            }
        }
    };

    let (zoom_in_tip, zoom_out_tip) = map
        .borrow()
        .as_ref()
        .and_then(|m| m.zoom_control().map(|z| (z.zoom_in_tip, z.zoom_out_tip)))
        .unwrap_or((ZOOM_IN_TIP, ZOOM_OUT_TIP));

    view! {
        <div
            node_ref=container_ref
            style="position: relative; width: 100%; height: 100%; overflow: hidden; touch-action: none;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
        >
            <canvas node_ref=tile_canvas_ref style=canvas_style(TILE_Z_INDEX) />
            <canvas node_ref=feature_canvas_ref style=canvas_style(LayerRole::Features.z_index()) />
            <canvas node_ref=gpu_canvas_ref style=canvas_style(LayerRole::Features.z_index() + 1) />
            <canvas node_ref=overlay_canvas_ref style=canvas_style(LayerRole::Labels.z_index()) />
            <div
                class="map-zoom"
                style=format!("position: absolute; top: 8px; left: 8px; z-index: {}; display: flex; flex-direction: column; gap: 2px;", HIGHLIGHT_Z_INDEX + 10)
                on:pointerdown=|e: PointerEvent| e.stop_propagation()
                on:wheel=|e: WheelEvent| e.stop_propagation()
            >
                <button class="map-zoom-in" title=zoom_in_tip on:click=zoom_button(1.0)>"+"</button>
                <button class="map-zoom-out" title=zoom_out_tip on:click=zoom_button(-1.0)>"\u{2212}"</button>
            </div>
            {move || {
                scale.get().map(|bar| {
                    view! {
                        <div
                            class="map-scale-line"
                            style=format!("position: absolute; left: 8px; bottom: 8px; z-index: {}; pointer-events: none;", HIGHLIGHT_Z_INDEX + 10)
                        >
                            <div
                                class="map-scale-line-inner"
                                style:width=format!("{:.0}px", bar.width_px)
                                style="border: 1px solid #333; border-top: none; font-size: 10px; text-align: center; background: rgba(255,255,255,0.7);"
                            >
                                {bar.label}
                            </div>
                        </div>
                    }
                })
            }}
        </div>
    }
}
