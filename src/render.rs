use crate::catalog::RegionCatalog;
use geo::Rect;
use std::collections::BTreeSet;
use tracing::warn;

// Map constants
const DEFAULT_CENTER: [f64; 2] = [23.7, 120.9];
const DEFAULT_ZOOM: u8 = 8;
const VISITED_FILL: &str = "#008000";
const UNVISITED_FILL: &str = "#808080";
const STROKE_COLOR: &str = "black";
const STROKE_WEIGHT: f64 = 0.5;
const FILL_OPACITY: f64 = 0.6;
const FIT_PADDING: [u32; 2] = [10, 10];

// Handoff to the external interaction script: the bootstrap polls until
// initializeMapInteraction and the global map handle both exist.
const MAP_VAR: &str = "visited_map";
const INIT_MAX_ATTEMPTS: u32 = 10;
const INIT_RETRY_MS: u32 = 100;
const INIT_DELAY_MS: u32 = 50;

/// Request-scoped render artifact: the map container plus the scripts that
/// build the Leaflet map and hand off to client-side interaction code.
pub struct MapDocument {
    pub html: String,
}

/// Builds the map document. Viewport priority: focus bounds, then the union
/// bounds of the catalog, then the default center and zoom.
pub fn render(
    visited: &BTreeSet<String>,
    catalog: &RegionCatalog,
    focus_bounds: Option<Rect<f64>>,
    name_property: &str,
) -> MapDocument {
    let mut script = String::new();

    script.push_str(&format!(
        "var {MAP_VAR} = L.map(\"{MAP_VAR}\", {{center: [{}, {}], zoom: {DEFAULT_ZOOM}}});\n",
        DEFAULT_CENTER[0], DEFAULT_CENTER[1]
    ));
    script.push_str(&format!(
        "L.tileLayer(\"https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png\", \
         {{noWrap: true, attribution: \"&copy; OpenStreetMap contributors\"}}).addTo({MAP_VAR});\n"
    ));

    if !catalog.is_empty() {
        let boundaries = json_or(
            serde_json::to_string(&catalog.feature_collection(name_property)),
            "null",
        );
        let visited_names = json_or(
            serde_json::to_string(&visited.iter().collect::<Vec<_>>()),
            "[]",
        );
        let prop = json_or(serde_json::to_string(name_property), "\"\"");

        script.push_str(&format!("var areaProperty = {prop};\n"));
        script.push_str(&format!("var visitedAreas = {visited_names};\n"));
        script.push_str(&format!("var boundaries = {boundaries};\n"));
        script.push_str(&format!(
            "L.geoJson(boundaries, {{\n\
             \x20   style: function (feature) {{\n\
             \x20       var name = feature.properties && feature.properties[areaProperty];\n\
             \x20       var fill = (name && visitedAreas.indexOf(name) !== -1) ? \"{VISITED_FILL}\" : \"{UNVISITED_FILL}\";\n\
             \x20       return {{fillColor: fill, color: \"{STROKE_COLOR}\", weight: {STROKE_WEIGHT}, fillOpacity: {FILL_OPACITY}}};\n\
             \x20   }}\n\
             }}).addTo({MAP_VAR});\n"
        ));
    } else {
        let prop = json_or(serde_json::to_string(name_property), "\"\"");
        script.push_str(&format!("var areaProperty = {prop};\n"));
    }

    match focus_bounds.or_else(|| catalog.union_bounds()) {
        Some(rect) => {
            script.push_str(&format!(
                "{MAP_VAR}.fitBounds([[{}, {}], [{}, {}]], {{padding: [{}, {}]}});\n",
                rect.min().y,
                rect.min().x,
                rect.max().y,
                rect.max().x,
                FIT_PADDING[0],
                FIT_PADDING[1]
            ));
        }
        None => {
            script.push_str(&format!(
                "{MAP_VAR}.setView([{}, {}], {DEFAULT_ZOOM});\n",
                DEFAULT_CENTER[0], DEFAULT_CENTER[1]
            ));
        }
    }

    let bootstrap = format!(
        "(function () {{\n\
         \x20   var maxAttempts = {INIT_MAX_ATTEMPTS};\n\
         \x20   var interval = {INIT_RETRY_MS};\n\
         \x20   var attempt = 0;\n\
         \x20   function tryInitMapInteraction() {{\n\
         \x20       attempt++;\n\
         \x20       if (typeof initializeMapInteraction === \"function\") {{\n\
         \x20           var mapInstance = window[\"{MAP_VAR}\"];\n\
         \x20           if (mapInstance) {{\n\
         \x20               initializeMapInteraction(mapInstance, areaProperty);\n\
         \x20           }} else if (attempt < maxAttempts) {{\n\
         \x20               setTimeout(tryInitMapInteraction, interval);\n\
         \x20           }} else {{\n\
         \x20               console.error(\"Map instance '{MAP_VAR}' not found after retries.\");\n\
         \x20           }}\n\
         \x20       }} else if (attempt < maxAttempts) {{\n\
         \x20           setTimeout(tryInitMapInteraction, interval);\n\
         \x20       }} else {{\n\
         \x20           console.error(\"initializeMapInteraction was never defined; map clicks are disabled.\");\n\
         \x20       }}\n\
         \x20   }}\n\
         \x20   setTimeout(tryInitMapInteraction, {INIT_DELAY_MS});\n\
         }})();\n"
    );

    let html = format!(
        "<div id=\"{MAP_VAR}\" class=\"map\"></div>\n\
         <script>\n{script}</script>\n\
         <script>\n{bootstrap}</script>\n"
    );

    MapDocument { html }
}

/// Full index page: sidebar (dropdown form, visited list, counter, feedback
/// banner, clear link) plus the map document. The element ids are part of
/// the contract with static/js/map_interaction.js.
pub fn page(map: &MapDocument, available: &[String], visited: &[String]) -> String {
    let mut options = String::new();
    for name in available {
        let escaped = escape_html(name);
        options.push_str(&format!(
            "            <option value=\"{escaped}\">{escaped}</option>\n"
        ));
    }

    let mut visited_items = String::new();
    if visited.is_empty() {
        visited_items.push_str("          <li class=\"empty-message\">No regions visited yet.</li>\n");
    } else {
        for name in visited {
            visited_items.push_str(&format!("          <li>{}</li>\n", escape_html(name)));
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Visited Regions</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <script src="/static/js/map_interaction.js"></script>
    <style>
      body {{ margin: 0; display: flex; font-family: sans-serif; height: 100vh; }}
      .sidebar {{ width: 280px; padding: 16px; overflow-y: auto; border-right: 1px solid #ccc; }}
      .map-panel {{ flex: 1; }}
      .map {{ width: 100%; height: 100%; }}
      #visited-list {{ padding-left: 20px; }}
      #feedback-message {{ display: none; position: fixed; bottom: 16px; left: 16px;
        padding: 10px 14px; color: white; border-radius: 4px; transition: opacity 0.5s; }}
    </style>
  </head>
  <body>
    <div class="sidebar">
      <h1>Visited Regions</h1>
      <p>Visited: <span id="visited-count">{count}</span></p>
      <form method="post" action="/">
        <select id="area-select" name="area">
{options}        </select>
        <button type="submit">Mark visited</button>
      </form>
      <ul id="visited-list">
{visited_items}      </ul>
      <p><a href="/clear">Clear all</a></p>
      <div id="feedback-message"></div>
    </div>
    <div class="map-panel">
{map_html}    </div>
  </body>
</html>
"#,
        count = visited.len(),
        options = options,
        visited_items = visited_items,
        map_html = map.html,
    )
}

fn json_or(result: Result<String, serde_json::Error>, fallback: &str) -> String {
    match result {
        Ok(s) => s,
        Err(e) => {
            warn!("Error encoding map data: {}", e);
            fallback.to_string()
        }
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RegionCatalog;
    use std::io::Write;

    fn catalog() -> RegionCatalog {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type":"FeatureCollection","features":[
                {{"type":"Feature","properties":{{"COUNTYNAME":"Taipei City"}},
                 "geometry":{{"type":"Polygon","coordinates":[[[121.45,24.95],[121.65,24.95],[121.65,25.2],[121.45,25.2],[121.45,24.95]]]}}}},
                {{"type":"Feature","properties":{{"COUNTYNAME":"Kaohsiung City"}},
                 "geometry":{{"type":"Polygon","coordinates":[[[120.2,22.5],[120.4,22.5],[120.4,22.9],[120.2,22.9],[120.2,22.5]]]}}}}
            ]}}"#
        )
        .unwrap();
        RegionCatalog::load(file.path(), "COUNTYNAME").unwrap()
    }

    fn visited(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn document_carries_both_fill_colors_and_visited_names() {
        let doc = render(&visited(&["Taipei City"]), &catalog(), None, "COUNTYNAME");
        assert!(doc.html.contains(VISITED_FILL));
        assert!(doc.html.contains(UNVISITED_FILL));
        assert!(doc.html.contains("\"Taipei City\""));
    }

    #[test]
    fn focus_bounds_take_priority_over_union() {
        let cat = catalog();
        let focus = cat.bounds_of("Taipei City").unwrap();
        let doc = render(&visited(&[]), &cat, Some(focus), "COUNTYNAME");
        assert!(doc.html.contains("fitBounds([[24.95, 121.45], [25.2, 121.65]]"));
    }

    #[test]
    fn union_bounds_used_without_focus() {
        let doc = render(&visited(&[]), &catalog(), None, "COUNTYNAME");
        assert!(doc.html.contains("fitBounds([[22.5, 120.2], [25.2, 121.65]]"));
    }

    #[test]
    fn empty_catalog_falls_back_to_default_view() {
        let doc = render(&visited(&[]), &RegionCatalog::empty(), None, "COUNTYNAME");
        assert!(doc.html.contains("setView([23.7, 120.9], 8)"));
        assert!(!doc.html.contains("L.geoJson"));
    }

    #[test]
    fn bootstrap_contract_is_embedded() {
        let doc = render(&visited(&[]), &catalog(), None, "COUNTYNAME");
        assert!(doc.html.contains("initializeMapInteraction"));
        assert!(doc.html.contains(&format!("window[\"{MAP_VAR}\"]")));
        assert!(doc.html.contains("var maxAttempts = 10"));
    }

    #[test]
    fn page_lists_available_and_visited() {
        let cat = catalog();
        let doc = render(&visited(&["Taipei City"]), &cat, None, "COUNTYNAME");
        let html = page(
            &doc,
            &["Kaohsiung City".to_string()],
            &["Taipei City".to_string()],
        );
        assert!(html.contains("<option value=\"Kaohsiung City\">"));
        assert!(!html.contains("<option value=\"Taipei City\">"));
        assert!(html.contains("<li>Taipei City</li>"));
        assert!(html.contains("id=\"visited-count\">1<"));
    }

    #[test]
    fn page_shows_placeholder_when_nothing_visited() {
        let doc = render(&visited(&[]), &RegionCatalog::empty(), None, "COUNTYNAME");
        let html = page(&doc, &[], &[]);
        assert!(html.contains("empty-message"));
    }

    #[test]
    fn region_names_are_html_escaped() {
        let doc = render(&visited(&[]), &RegionCatalog::empty(), None, "COUNTYNAME");
        let html = page(&doc, &["A & B <County>".to_string()], &[]);
        assert!(html.contains("A &amp; B &lt;County&gt;"));
        assert!(!html.contains("<County>"));
    }

    #[test]
    fn empty_catalog_still_defines_area_property() {
        let doc = render(&visited(&[]), &RegionCatalog::empty(), None, "COUNTYNAME");
        assert!(doc.html.contains("var areaProperty = \"COUNTYNAME\""));
    }
}
