mod app;
mod canvas;
mod data;
mod draw;
mod geom;
#[cfg(target_arch = "wasm32")]
mod gpu;
mod hit_test;
mod hover;
mod label_layout;
mod layers;
mod map;
mod render_loop;
mod scale_line;
mod style;
mod tessellate;
mod tiles;
mod viewport;

#[cfg(not(target_arch = "wasm32"))]
mod gpu {
    use crate::layers::Layer;
    use crate::viewport::Viewport;

    pub struct GpuRenderer;

    impl GpuRenderer {
        pub async fn init(_canvas: web_sys::HtmlCanvasElement) -> Result<Self, String> {
            Err("not wasm".into())
        }
        pub fn resize(&mut self, _w: u32, _h: u32, _dpr: f32) {}
        pub fn render(&mut self, layer: Option<&Layer>, vp: &Viewport) {
            let _ = (layer, vp);
        }
    }
}

use leptos::mount::mount_to;
use std::any::Any;
use std::cell::RefCell;
use wasm_bindgen::JsCast;

thread_local! {
    static APP_MOUNT_HANDLE: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let mount_target = document
        .get_element_by_id("app")
        .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
        .or_else(|| document.body());
    let Some(target) = mount_target else {
        return;
    };

    APP_MOUNT_HANDLE.with(move |slot| {
        // A re-entered main() drops the old mount so its effects stop
        let _old = slot.borrow_mut().take();
        let handle = mount_to(target, app::App);
        *slot.borrow_mut() = Some(Box::new(handle));
    });
}
