use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use isoline_shared::config::DATA_PATH;
use isoline_shared::{FeatureCollectionData, IsolineFeature, parse_feature_collection};

/// Fetch and parse the isoline feature collection.
pub async fn fetch_isolines() -> Result<FeatureCollectionData, String> {
    let resp = gloo_net::http::Request::get(DATA_PATH)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    let text = resp.text().await.map_err(|e| format!("fetch error: {e}"))?;
    parse_feature_collection(&text)
}

/// Load the collection once into `features`. Failures are logged and leave
/// the signal untouched.
pub fn load_isolines(features: RwSignal<Option<Vec<IsolineFeature>>>) {
    spawn_local(async move {
        match fetch_isolines().await {
            Ok(data) => {
                if let Some(description) = data.description.as_deref() {
                    web_sys::console::log_1(
                        &format!("isolines loaded: {description} ({} features)", data.features.len()).into(),
                    );
                }
                features.set(Some(data.features));
            }
            Err(e) => {
                web_sys::console::error_1(&format!("Isoline fetch failed: {e}").into());
            }
        }
    });
}
