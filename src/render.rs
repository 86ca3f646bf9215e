use crate::config::{AppConfig, OutputFormat};
use crate::view::{ChoroplethView, LegendEntry, RegionView, Tooltip};
use anyhow::{Context, Result};
use htmlize::{escape_attribute, escape_text};
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::info;

const STYLE: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; }
#title { font-size: 1.25rem; margin: 12px 25px; }
.county { stroke-width: 0.25; }
.county:hover { opacity: 0.8; }
#legend text { font-size: 10px; }
#tooltip {
    pointer-events: none;
    background: rgba(15, 23, 42, 0.9);
    color: #f8fafc;
    padding: 4px 8px;
    border-radius: 4px;
    font-size: 12px;
    white-space: nowrap;
}
"#;

// Mirrors `Tooltip::on_enter` / `Tooltip::on_leave`.
const HOVER_SCRIPT: &str = r#"
(function () {
  const tooltip = document.getElementById('tooltip');
  const offset = Number(tooltip.dataset.offset);
  document.querySelectorAll('path.county').forEach(function (county) {
    const text = county.dataset.tooltip;
    if (text === undefined) return;
    county.addEventListener('mouseenter', function (evt) {
      tooltip.style.top = (evt.clientY - offset) + 'px';
      tooltip.style.left = (evt.clientX + offset) + 'px';
      tooltip.setAttribute('data-education', county.dataset.education);
      tooltip.style.opacity = 1;
      tooltip.textContent = text;
    });
    county.addEventListener('mouseleave', function () {
      tooltip.style.opacity = 0;
    });
  });
})();
"#;

pub fn render(config: &AppConfig, view: &ChoroplethView) -> String {
    match config.output.format {
        OutputFormat::Html => render_html(config, view),
        OutputFormat::Svg => render_svg(config, view),
    }
}

pub fn write_output(config: &AppConfig, view: &ChoroplethView, path: &Path) -> Result<()> {
    let document = render(config, view);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
    }
    fs::write(path, document).with_context(|| format!("Failed to write map: {:?}", path))?;
    info!("Wrote {} counties to {:?}", view.regions.len(), path);
    Ok(())
}

/// Standalone page: inline SVG, tooltip element and hover wiring.
pub fn render_html(config: &AppConfig, view: &ChoroplethView) -> String {
    let mut svg = String::new();
    write_svg(&mut svg, config, view, false);
    let tooltip = Tooltip::new(config.tooltip.offset);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <h1 id="title">{title}</h1>
{svg}
    <div id="tooltip" data-offset="{offset}" style="opacity: {opacity}; position: fixed; z-index: 10"></div>
    <script>{js}</script>
</body>
</html>
"#,
        title = escape_text(config.output.title.as_str()),
        css = STYLE,
        svg = svg,
        offset = tooltip.offset(),
        opacity = tooltip.opacity,
        js = HOVER_SCRIPT,
    )
}

/// SVG document; matched counties carry their tooltip as a `<title>`.
pub fn render_svg(config: &AppConfig, view: &ChoroplethView) -> String {
    let mut svg = String::new();
    write_svg(&mut svg, config, view, true);
    svg
}

fn write_svg(
    out: &mut String,
    config: &AppConfig,
    view: &ChoroplethView,
    standalone: bool,
) {
    if standalone {
        let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    }
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = view.width,
        h = view.height,
    );
    if standalone {
        let _ = writeln!(out, "  <title>{}</title>", escape_text(config.output.title.as_str()));
    }

    let _ = writeln!(out, r#"  <g class="counties">"#);
    for region in &view.regions {
        write_region(out, config, region, standalone);
    }
    let _ = writeln!(out, "  </g>");

    let _ = writeln!(out, r#"  <g id="legend">"#);
    for entry in &view.legend {
        write_legend_swatch(out, entry);
    }
    for entry in &view.legend {
        write_legend_label(out, entry);
    }
    let _ = writeln!(out, "  </g>");
    let _ = writeln!(out, "</svg>");
}

fn write_region(out: &mut String, config: &AppConfig, region: &RegionView, titles: bool) {
    let _ = write!(
        out,
        r#"    <path class="county" d="{d}" fill="{fill}" data-fips="{fips}""#,
        d = region.path,
        fill = escape_attribute(region.fill.as_str()),
        fips = region.fips,
    );
    if let Some(stroke) = &config.style.stroke {
        let _ = write!(out, r#" stroke="{}""#, escape_attribute(stroke.as_str()));
    }
    if let Some(education) = region.education {
        let _ = write!(out, r#" data-education="{}""#, education);
    }
    match (&region.tooltip, titles) {
        (Some(text), true) => {
            let _ = writeln!(out, "><title>{}</title></path>", escape_text(text.as_str()));
        }
        (Some(text), false) => {
            let _ = writeln!(out, r#" data-tooltip="{}"/>"#, escape_attribute(text.as_str()));
        }
        (None, _) => {
            let _ = writeln!(out, "/>");
        }
    }
}

fn write_legend_swatch(out: &mut String, entry: &LegendEntry) {
    let _ = writeln!(
        out,
        r#"    <rect x="{x}" y="{y}" width="{s}" height="{s}" fill="{fill}"/>"#,
        x = entry.swatch_x,
        y = entry.swatch_y,
        s = entry.swatch_size,
        fill = escape_attribute(entry.color.as_str()),
    );
}

fn write_legend_label(out: &mut String, entry: &LegendEntry) {
    let _ = writeln!(
        out,
        r#"    <text x="{x}" y="{y}" fill="black">{label}</text>"#,
        x = entry.label_x,
        y = entry.label_y,
        label = escape_text(entry.label.as_str()),
    );
}
