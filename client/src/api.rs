use pukpuk_shared::{HeatmapQuery, HeatmapResponse, RegionMapping};

pub(crate) const REGION_MAPPING_URL: &str = "/api/regions/mapping";

pub(crate) const HEATMAP_URL: &str = "/api/demand-heatmap";

/// Query pairs for the overlay request; gloo-net encodes them.
pub(crate) fn heatmap_params(query: &HeatmapQuery) -> [(&'static str, &str); 3] {
    [
        ("level", query.level.as_str()),
        ("mode", query.mode.as_str()),
        ("layer", query.layer.as_str()),
    ]
}

pub async fn fetch_region_mapping() -> Result<RegionMapping, String> {
    let resp = gloo_net::http::Request::get(REGION_MAPPING_URL)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    resp.json::<RegionMapping>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

pub async fn fetch_heatmap(query: &HeatmapQuery) -> Result<HeatmapResponse, String> {
    let resp = gloo_net::http::Request::get(HEATMAP_URL)
        .query(heatmap_params(query))
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    resp.json::<HeatmapResponse>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

#[cfg(test)]
mod tests {
    use pukpuk_shared::{DataLayer, ViewMode};

    use super::*;

    #[test]
    fn heatmap_params_carry_level_mode_and_layer() {
        let query = HeatmapQuery {
            level: "3404".to_string(),
            mode: ViewMode::Live,
            layer: DataLayer::DeadStock,
        };
        assert_eq!(
            heatmap_params(&query),
            [("level", "3404"), ("mode", "live"), ("layer", "dead-stock")]
        );
    }
}
