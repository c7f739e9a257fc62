//! Diagram renderer: lays out blocks, variable terminals and wires, and
//! emits SVG primitives plus the canvas extents needed to contain them.
//! Block coordinates come from the source; terminals are placed in
//! deterministic columns (input-side left, output-side right of the
//! block extent). Nothing here defaults a missing block position.

use std::collections::HashMap;
use std::fmt::Write;

use log::warn;

use crate::domain::ast::{PinDirection, Program, VarKind};
use crate::error::LayoutError;

/// Rendering rule parameters, collected in one place instead of being
/// scattered through the layout code. All lengths are unscaled diagram
/// units except `margin`, which is a fixed pixel border applied after
/// scaling.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub margin: f64,
    pub char_width: f64,
    pub header_height: f64,
    pub pin_pitch: f64,
    pub min_block_width: f64,
    pub pin_radius: f64,
    pub terminal_height: f64,
    pub terminal_pitch: f64,
    pub terminal_pad: f64,
    pub column_gap: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin: 10.0,
            char_width: 7.0,
            header_height: 16.0,
            pin_pitch: 14.0,
            min_block_width: 64.0,
            pin_radius: 2.0,
            terminal_height: 26.0,
            terminal_pitch: 34.0,
            terminal_pad: 8.0,
            column_gap: 60.0,
        }
    }
}

/// Render the program's topology at the given positive scale factor.
/// Returns `(width, height, markup)`: the smallest canvas (rounded up,
/// plus the fixed margin) containing every primitive, and the SVG body
/// ready for embedding in a container document.
pub fn render_to_svg(program: &Program, scale: f64) -> Result<(u32, u32, String), LayoutError> {
    render_with_config(program, scale, &RenderConfig::default())
}

pub fn render_with_config(
    program: &Program,
    scale: f64,
    cfg: &RenderConfig,
) -> Result<(u32, u32, String), LayoutError> {
    let mut canvas = Canvas::new(cfg.margin);

    // Anchor points for wire endpoints, keyed by (owner, pin).
    let mut anchors: HashMap<(String, String), (f64, f64)> = HashMap::new();

    draw_blocks(program, scale, cfg, &mut canvas, &mut anchors)?;
    draw_terminals(program, scale, cfg, &mut canvas, &mut anchors);
    draw_wires(program, &mut canvas, &anchors);

    Ok(canvas.finish())
}

/// Fixed style definition for the emitted primitives; no program
/// dependency, so a consumer can build a fully self-contained document.
pub fn self_contained_style_header() -> String {
    STYLE_HEADER.to_string()
}

const STYLE_HEADER: &str = "<style>\n\
.fbd-block { fill: #f4f4f0; stroke: #333333; stroke-width: 1; }\n\
.fbd-block-label { font-family: monospace; font-size: 12px; fill: #111111; }\n\
.fbd-pin { fill: #333333; }\n\
.fbd-pin-label { font-family: monospace; font-size: 9px; fill: #555555; }\n\
.fbd-wire { fill: none; stroke: #2266aa; stroke-width: 1.5; }\n\
.fbd-terminal { fill: #ffffff; stroke: #666666; stroke-width: 1; }\n\
.fbd-terminal-label { font-family: monospace; font-size: 12px; fill: #111111; }\n\
.fbd-comment { font-family: sans-serif; font-size: 9px; fill: #777777; }\n\
</style>";

/// Accumulates primitives and the content extent they cover. Negative
/// block coordinates are legal, so both ends of the extent are tracked
/// and the whole content is shifted into view on finish.
struct Canvas {
    margin: f64,
    body: String,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Canvas {
    fn new(margin: f64) -> Self {
        Self {
            margin,
            body: String::new(),
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 0.0,
        }
    }

    fn cover(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn rect(&mut self, class: &str, x: f64, y: f64, w: f64, h: f64, rx: f64) {
        let _ = writeln!(
            self.body,
            r#"<rect class="{class}" x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" rx="{rx:.1}"/>"#
        );
        self.cover(x, y);
        self.cover(x + w, y + h);
    }

    fn circle(&mut self, class: &str, cx: f64, cy: f64, r: f64) {
        let _ = writeln!(
            self.body,
            r#"<circle class="{class}" cx="{cx:.1}" cy="{cy:.1}" r="{r:.1}"/>"#
        );
        self.cover(cx - r, cy - r);
        self.cover(cx + r, cy + r);
    }

    fn text(&mut self, class: &str, x: f64, y: f64, content: &str) {
        let _ = writeln!(
            self.body,
            r#"<text class="{class}" x="{x:.1}" y="{y:.1}">{}</text>"#,
            xml_escape(content)
        );
        self.cover(x, y);
    }

    fn polyline(&mut self, class: &str, points: &[(f64, f64)]) {
        let mut rendered = String::new();
        for (i, (x, y)) in points.iter().enumerate() {
            if i > 0 {
                rendered.push(' ');
            }
            let _ = write!(rendered, "{x:.1},{y:.1}");
            self.cover(*x, *y);
        }
        let _ = writeln!(self.body, r#"<polyline class="{class}" points="{rendered}"/>"#);
    }

    fn finish(self) -> (u32, u32, String) {
        let width = ((self.max_x - self.min_x).ceil() + 2.0 * self.margin) as u32;
        let height = ((self.max_y - self.min_y).ceil() + 2.0 * self.margin) as u32;
        if self.body.is_empty() {
            return (width, height, String::new());
        }
        let markup = format!(
            "<g transform=\"translate({tx:.1},{ty:.1})\">\n{body}</g>\n",
            tx = self.margin - self.min_x,
            ty = self.margin - self.min_y,
            body = self.body
        );
        (width, height, markup)
    }
}

fn draw_blocks(
    program: &Program,
    scale: f64,
    cfg: &RenderConfig,
    canvas: &mut Canvas,
    anchors: &mut HashMap<(String, String), (f64, f64)>,
) -> Result<(), LayoutError> {
    for block in &program.blocks {
        let pos = block.position.ok_or_else(|| LayoutError::MissingPosition {
            block: block.name.clone(),
        })?;

        let label = format!("{} : {}", block.name, block.type_name);
        let width = (label.len() as f64 * cfg.char_width + 2.0 * cfg.terminal_pad)
            .max(cfg.min_block_width)
            * scale;
        let in_count = block.pins_of(PinDirection::In).count();
        let out_count = block.pins_of(PinDirection::Out).count();
        let rows = in_count.max(out_count).max(1);
        let height = (cfg.header_height + rows as f64 * cfg.pin_pitch) * scale;
        let x = pos.x * scale;
        let y = pos.y * scale;

        canvas.rect("fbd-block", x, y, width, height, 0.0);
        canvas.text(
            "fbd-block-label",
            x + cfg.terminal_pad * scale,
            y + 0.75 * cfg.header_height * scale,
            &label,
        );

        let mut row_in = 0usize;
        let mut row_out = 0usize;
        for pin in &block.pins {
            let (px, row, label_x) = match pin.direction {
                PinDirection::In => {
                    row_in += 1;
                    (x, row_in - 1, x + 4.0 * scale)
                }
                PinDirection::Out => {
                    row_out += 1;
                    let lx = x + width - (pin.name.len() as f64 * cfg.char_width + 4.0) * scale;
                    (x + width, row_out - 1, lx)
                }
            };
            let py = y + (cfg.header_height + (row as f64 + 0.5) * cfg.pin_pitch) * scale;
            canvas.circle("fbd-pin", px, py, cfg.pin_radius * scale);
            canvas.text("fbd-pin-label", label_x, py + 3.0 * scale, &pin.name);
            anchors.insert((block.name.clone(), pin.name.clone()), (px, py));
        }
    }
    Ok(())
}

/// Every variable gets a terminal marker; unwired ones are exactly the
/// dangling I/O terminals, wired ones provide the variable-side anchor.
fn draw_terminals(
    program: &Program,
    scale: f64,
    cfg: &RenderConfig,
    canvas: &mut Canvas,
    anchors: &mut HashMap<(String, String), (f64, f64)>,
) {
    // Output terminals sit in a column right of everything drawn so far.
    let right_column_x = canvas.max_x + cfg.column_gap * scale;

    let mut left_row = 0usize;
    let mut right_row = 0usize;
    for var in &program.variables {
        let label = format!("{} : {}", var.name, var.data_type);
        let width = (label.len() as f64 * cfg.char_width + 2.0 * cfg.terminal_pad) * scale;
        let height = cfg.terminal_height * scale;

        let (x, y, anchor) = match var.kind {
            VarKind::OutputVar => {
                let y = right_row as f64 * cfg.terminal_pitch * scale;
                right_row += 1;
                (right_column_x, y, (right_column_x, y + height / 2.0))
            }
            _ => {
                let y = left_row as f64 * cfg.terminal_pitch * scale;
                left_row += 1;
                (0.0, y, (width, y + height / 2.0))
            }
        };

        canvas.rect("fbd-terminal", x, y, width, height, 3.0 * scale);
        canvas.text(
            "fbd-terminal-label",
            x + cfg.terminal_pad * scale,
            y + 12.0 * scale,
            &label,
        );
        if !var.comment.is_empty() {
            canvas.text(
                "fbd-comment",
                x + cfg.terminal_pad * scale,
                y + 22.0 * scale,
                &var.comment,
            );
        }
        anchors.insert((var.name.clone(), var.name.clone()), anchor);
    }
}

fn draw_wires(
    program: &Program,
    canvas: &mut Canvas,
    anchors: &HashMap<(String, String), (f64, f64)>,
) {
    for conn in &program.connections {
        let src = anchors.get(&(conn.source.owner.clone(), conn.source.pin.clone()));
        let dst = anchors.get(&(conn.dest.owner.clone(), conn.dest.pin.clone()));
        let (Some(&(x1, y1)), Some(&(x2, y2))) = (src, dst) else {
            // Parsed programs cannot reach this; hand-built ones might.
            warn!(
                "skipping wire {}.{} -> {}.{}: unresolved anchor",
                conn.source.owner, conn.source.pin, conn.dest.owner, conn.dest.pin
            );
            continue;
        };
        let mid_x = (x1 + x2) / 2.0;
        canvas.polyline("fbd-wire", &[(x1, y1), (mid_x, y1), (mid_x, y2), (x2, y2)]);
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
