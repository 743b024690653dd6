const INDEX_HTML: &str = include_str!("../../static/templates/index.html");
const UPLOAD_HTML: &str = include_str!("../../static/templates/upload.html");
const SHOW_HEATMAP_HTML: &str = include_str!("../../static/templates/show_heatmap.html");
const SHOW_GRAPH_HTML: &str = include_str!("../../static/templates/show_graph.html");

// Values are inserted verbatim; callers pass trusted markup only.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |page, (key, value)| {
        page.replace(&format!("{{{{ {key} }}}}"), value)
    })
}

pub fn index() -> String {
    INDEX_HTML.to_string()
}

pub fn upload(title: &str, action: &str) -> String {
    render(UPLOAD_HTML, &[("title", title), ("action", action)])
}

pub fn show_heatmap(img_data: &str) -> String {
    render(SHOW_HEATMAP_HTML, &[("img_data", img_data)])
}

pub fn show_graph(page_title: &str, speed_terrain: &str, speed_terrain_kde: &str) -> String {
    render(
        SHOW_GRAPH_HTML,
        &[
            ("page_title", page_title),
            ("img_speed_terrain", speed_terrain),
            ("img_speed_terrain_kde", speed_terrain_kde),
        ],
    )
}
