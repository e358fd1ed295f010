//! Canvas 2D drawing of tiles, features, labels and the highlight overlay.
//! All coordinates are CSS pixels; callers apply the device pixel ratio.

use std::f64::consts::TAU;

use web_sys::{CanvasRenderingContext2d, CanvasWindingRule, HtmlImageElement};

use isoline_shared::{Coord, Geometry, IsolineFeature, Ring};

use crate::label_layout::{PlacedLabel, estimate_text_width, layout_labels};
use crate::style::{FeatureStyle, HighlightStyle, TextStyle};
use crate::tiles::TileCoord;
use crate::viewport::Viewport;

pub fn draw_tiles(ctx: &CanvasRenderingContext2d, vp: &Viewport, tiles: &[(TileCoord, HtmlImageElement)]) {
    for (tile, image) in tiles {
        let (min_x, min_y, max_x, max_y) = tile.bounds();
        let (x0, y0) = vp.world_to_screen(min_x, max_y);
        let (x1, y1) = vp.world_to_screen(max_x, min_y);
        // Round outward so neighbouring tiles leave no seams
        let (x0, y0) = (x0.floor(), y0.floor());
        let (w, h) = (x1.ceil() - x0, y1.ceil() - y0);
        ctx.draw_image_with_html_image_element_and_dw_and_dh(image, x0, y0, w, h)
            .ok();
    }
}

/// Draw features in order with a per-feature style; `None` skips the feature.
pub fn draw_features(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    features: &[IsolineFeature],
    style_for: impl Fn(&IsolineFeature) -> Option<FeatureStyle>,
) {
    for feature in features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let Some(style) = style_for(feature) else {
            continue;
        };
        draw_geometry(ctx, vp, geometry, &style);
    }
}

fn draw_geometry(ctx: &CanvasRenderingContext2d, vp: &Viewport, geometry: &Geometry, style: &FeatureStyle) {
    match (geometry, style) {
        (Geometry::Point(c), FeatureStyle::Circle { .. }) => draw_circle(ctx, vp, *c, style),
        (Geometry::MultiPoint(cs), FeatureStyle::Circle { .. }) => {
            for c in cs {
                draw_circle(ctx, vp, *c, style);
            }
        }
        // Point geometry without a circle style has nothing to draw
        (Geometry::Point(_) | Geometry::MultiPoint(_), FeatureStyle::Shape { .. }) => {}
        (Geometry::LineString(path), FeatureStyle::Shape { stroke, stroke_width, .. }) => {
            ctx.begin_path();
            trace_path(ctx, vp, path);
            stroke_current(ctx, &stroke.to_css(), *stroke_width);
        }
        (Geometry::MultiLineString(lines), FeatureStyle::Shape { stroke, stroke_width, .. }) => {
            ctx.begin_path();
            for line in lines {
                trace_path(ctx, vp, line);
            }
            stroke_current(ctx, &stroke.to_css(), *stroke_width);
        }
        (Geometry::Polygon(rings), FeatureStyle::Shape { stroke, stroke_width, fill }) => {
            ctx.begin_path();
            trace_rings(ctx, vp, rings);
            fill_current(ctx, &fill.to_css());
            stroke_current(ctx, &stroke.to_css(), *stroke_width);
        }
        (Geometry::MultiPolygon(polys), FeatureStyle::Shape { stroke, stroke_width, fill }) => {
            ctx.begin_path();
            for rings in polys {
                trace_rings(ctx, vp, rings);
            }
            fill_current(ctx, &fill.to_css());
            stroke_current(ctx, &stroke.to_css(), *stroke_width);
        }
        (Geometry::Collection(members), _) => {
            for member in members {
                draw_geometry(ctx, vp, member, style);
            }
        }
        (_, FeatureStyle::Circle { .. }) => {}
    }
}

fn draw_circle(ctx: &CanvasRenderingContext2d, vp: &Viewport, c: Coord, style: &FeatureStyle) {
    let FeatureStyle::Circle {
        radius,
        fill,
        stroke,
        stroke_width,
    } = style
    else {
        return;
    };
    if *radius <= 0.0 {
        return;
    }
    let (x, y) = vp.world_to_screen(c[0], c[1]);
    ctx.begin_path();
    ctx.arc(x, y, *radius, 0.0, TAU).ok();
    fill_current(ctx, &fill.to_css());
    stroke_current(ctx, &stroke.to_css(), *stroke_width);
}

fn trace_path(ctx: &CanvasRenderingContext2d, vp: &Viewport, path: &[Coord]) {
    let mut points = path.iter().map(|c| vp.world_to_screen(c[0], c[1]));
    let Some((x, y)) = points.next() else {
        return;
    };
    ctx.move_to(x, y);
    for (x, y) in points {
        ctx.line_to(x, y);
    }
}

fn trace_rings(ctx: &CanvasRenderingContext2d, vp: &Viewport, rings: &[Ring]) {
    for ring in rings {
        trace_path(ctx, vp, ring);
        ctx.close_path();
    }
}

fn fill_current(ctx: &CanvasRenderingContext2d, css: &str) {
    ctx.set_fill_style_str(css);
    ctx.fill_with_canvas_winding_rule(CanvasWindingRule::Evenodd);
}

fn stroke_current(ctx: &CanvasRenderingContext2d, css: &str, width: f64) {
    if width <= 0.0 {
        return;
    }
    ctx.set_stroke_style_str(css);
    ctx.set_line_width(width);
    ctx.stroke();
}

/// Draw feature names with a halo, dropping overlapping ones when decluttering.
/// Returns the boxes that were drawn.
pub fn draw_labels(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    features: &[IsolineFeature],
    style: &TextStyle,
    declutter: bool,
) -> Vec<PlacedLabel> {
    ctx.set_font(style.font);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    let labels = layout_labels(features, vp, style.font_size, declutter, |text| {
        ctx.measure_text(text)
            .map(|m| m.width())
            .unwrap_or_else(|_| estimate_text_width(text, style.font_size))
    });

    ctx.set_line_width(style.stroke_width);
    ctx.set_stroke_style_str(&style.stroke.to_css());
    ctx.set_fill_style_str(&style.fill.to_css());
    for label in &labels {
        ctx.stroke_text(&label.text, label.x, label.y).ok();
        ctx.fill_text(&label.text, label.x, label.y).ok();
    }
    labels
}

/// Outline the hovered feature.
pub fn draw_highlight(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    features: &[IsolineFeature],
    style: &HighlightStyle,
) {
    let css = style.color.to_css();
    for feature in features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        outline_geometry(ctx, vp, geometry, style, &css);
    }
}

fn outline_geometry(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    geometry: &Geometry,
    style: &HighlightStyle,
    css: &str,
) {
    ctx.begin_path();
    match geometry {
        Geometry::Point(c) => outline_point(ctx, vp, *c, style.point_radius),
        Geometry::MultiPoint(cs) => {
            for c in cs {
                outline_point(ctx, vp, *c, style.point_radius);
            }
        }
        Geometry::LineString(path) => trace_path(ctx, vp, path),
        Geometry::MultiLineString(lines) => {
            for line in lines {
                trace_path(ctx, vp, line);
            }
        }
        Geometry::Polygon(rings) => trace_rings(ctx, vp, rings),
        Geometry::MultiPolygon(polys) => {
            for rings in polys {
                trace_rings(ctx, vp, rings);
            }
        }
        Geometry::Collection(members) => {
            for member in members {
                outline_geometry(ctx, vp, member, style, css);
            }
            return;
        }
    }
    stroke_current(ctx, css, style.stroke_width);
}

fn outline_point(ctx: &CanvasRenderingContext2d, vp: &Viewport, c: Coord, radius: f64) {
    let (x, y) = vp.world_to_screen(c[0], c[1]);
    ctx.move_to(x + radius, y);
    ctx.arc(x, y, radius, 0.0, TAU).ok();
}
