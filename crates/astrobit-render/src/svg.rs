//! SVG drawing of a laid-out tree.

use std::borrow::Cow;
use std::fmt::Write;

use astrobit_forest::{DecisionTree, Node};
use tracing::debug;

use crate::highlight::{Highlight, LEAF_FILL, PATH_FILL};
use crate::layout::{layout, Layout, Placed};
use crate::RenderError;

const BOX_W: f64 = 190.0;
const BOX_H: f64 = 92.0;
const MARKER_W: f64 = 48.0;
const MARKER_H: f64 = 28.0;
const H_GAP: f64 = 18.0;
const V_GAP: f64 = 46.0;
const MARGIN: f64 = 20.0;
const TITLE_H: f64 = 40.0;
const LINE_H: f64 = 16.0;
const FONT_SIZE: f64 = 12.0;

const CLASS_PALETTE: [&str; 8] = [
    "#e58139", "#39e581", "#8139e5", "#e5399e", "#39b9e5", "#e5d839", "#7be539", "#e53939",
];

/// Display settings for a rendered tree.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Deepest level drawn in full; deeper subtrees collapse to `(...)`.
    pub max_depth: Option<usize>,
    /// Heading drawn above the tree.
    pub title: Option<String>,
}

impl RenderOptions {
    /// Set the display depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Set the heading.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Draws one [`DecisionTree`] as an SVG document.
///
/// ```no_run
/// # use astrobit_forest::DecisionTree;
/// # use astrobit_render::{RenderOptions, TreeRenderer};
/// # fn demo(tree: &DecisionTree, features: &[String], classes: &[String]) -> Result<(), astrobit_render::RenderError> {
/// let svg = TreeRenderer::new(tree, features, classes)
///     .with_options(RenderOptions::default().with_max_depth(4))
///     .render()?;
/// # Ok(()) }
/// ```
pub struct TreeRenderer<'a> {
    tree: &'a DecisionTree,
    feature_names: &'a [String],
    class_names: &'a [String],
    options: RenderOptions,
    highlight: Option<Highlight>,
}

impl<'a> TreeRenderer<'a> {
    /// Create a renderer with default options and no highlight.
    #[must_use]
    pub fn new(tree: &'a DecisionTree, feature_names: &'a [String], class_names: &'a [String]) -> Self {
        Self {
            tree,
            feature_names,
            class_names,
            options: RenderOptions::default(),
            highlight: None,
        }
    }

    /// Replace the display options.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Emphasize a root-to-leaf path.
    #[must_use]
    pub fn with_highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
        self
    }

    /// Produce the SVG document.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`RenderError::FeatureNameCount`] | names don't match the tree's features |
    /// | [`RenderError::ClassNameCount`] | names don't match the tree's classes |
    /// | [`RenderError::UnknownHighlightNode`] / [`RenderError::BrokenHighlightPath`] | invalid highlight |
    pub fn render(&self) -> Result<String, RenderError> {
        if self.feature_names.len() != self.tree.n_features() {
            return Err(RenderError::FeatureNameCount {
                expected: self.tree.n_features(),
                got: self.feature_names.len(),
            });
        }
        if self.class_names.len() != self.tree.n_classes() {
            return Err(RenderError::ClassNameCount {
                expected: self.tree.n_classes(),
                got: self.class_names.len(),
            });
        }
        if let Some(h) = &self.highlight {
            h.validate(self.tree)?;
        }

        let layout = layout(self.tree, self.options.max_depth)?;
        let top = if self.options.title.is_some() { MARGIN + TITLE_H } else { MARGIN };
        let width = 2.0 * MARGIN + layout.n_slots as f64 * (BOX_W + H_GAP) - H_GAP;
        let height = top + MARGIN + (layout.max_depth + 1) as f64 * (BOX_H + V_GAP) - V_GAP;

        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}" font-family="Helvetica, Arial, sans-serif" font-size="{FONT_SIZE}">"#
        );
        let _ = writeln!(out, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##);
        if let Some(title) = &self.options.title {
            let _ = writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="20" font-weight="bold">{}</text>"#,
                width / 2.0,
                MARGIN + TITLE_H / 2.0,
                escape(title)
            );
        }

        self.draw_edges(&mut out, &layout, top);
        for placed in &layout.boxes {
            self.draw_box(&mut out, placed, top)?;
        }
        out.push_str("</svg>\n");

        debug!(
            n_boxes = layout.boxes.len(),
            n_slots = layout.n_slots,
            highlighted = self.highlight.as_ref().map_or(0, |h| h.nodes().len()),
            "tree rendered"
        );
        Ok(out)
    }

    fn draw_edges(&self, out: &mut String, layout: &Layout, top: f64) {
        for child in &layout.boxes {
            let Some(parent) = child.parent.map(|p| &layout.boxes[p]) else {
                continue;
            };
            let (px, py) = anchor(parent, top);
            let (cx, cy) = anchor(child, top);
            let on_path = self
                .highlight
                .as_ref()
                .is_some_and(|h| h.contains(parent.node) && h.contains(child.node));
            let (stroke, w) = if on_path { ("#1f2937", 3.0) } else { ("#9ca3af", 1.2) };
            let _ = writeln!(
                out,
                r#"<line x1="{px:.1}" y1="{:.1}" x2="{cx:.1}" y2="{cy:.1}" stroke="{stroke}" stroke-width="{w}"/>"#,
                py + BOX_H
            );
        }
    }

    fn draw_box(&self, out: &mut String, placed: &Placed, top: f64) -> Result<(), RenderError> {
        let (cx, y) = anchor(placed, top);

        if placed.collapsed {
            let _ = writeln!(
                out,
                r##"<rect x="{:.1}" y="{y:.1}" width="{MARKER_W}" height="{MARKER_H}" rx="4" fill="#f3f4f6" stroke="#9ca3af"/>"##,
                cx - MARKER_W / 2.0
            );
            let _ = writeln!(
                out,
                r#"<text x="{cx:.1}" y="{:.1}" text-anchor="middle">(...)</text>"#,
                y + MARKER_H / 2.0 + FONT_SIZE / 3.0
            );
            return Ok(());
        }

        let node = self
            .tree
            .node(placed.node)
            .ok_or(RenderError::MissingNode {
                node: placed.node.index(),
            })?;
        let class = node.majority_class();

        let (fill, opacity, stroke_w) = match &self.highlight {
            Some(h) if h.leaf() == placed.node => (LEAF_FILL, 1.0, 3.0),
            Some(h) if h.on_path(placed.node) => (PATH_FILL, 1.0, 2.0),
            _ => (
                CLASS_PALETTE[class % CLASS_PALETTE.len()],
                purity(node.distribution()),
                1.0,
            ),
        };

        let _ = writeln!(
            out,
            r##"<g data-node="{}"><rect x="{:.1}" y="{y:.1}" width="{BOX_W}" height="{BOX_H}" rx="6" fill="{fill}" fill-opacity="{opacity:.3}" stroke="#111827" stroke-width="{stroke_w}"/>"##,
            placed.node,
            cx - BOX_W / 2.0
        );
        let lines = self.label_lines(node, class);
        let first = y + (BOX_H - LINE_H * lines.len() as f64) / 2.0 + FONT_SIZE;
        for (i, line) in lines.iter().enumerate() {
            let _ = writeln!(
                out,
                r#"<text x="{cx:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                first + i as f64 * LINE_H,
                escape(line)
            );
        }
        out.push_str("</g>\n");
        Ok(())
    }

    fn label_lines(&self, node: &Node, class: usize) -> Vec<String> {
        let mut lines = Vec::with_capacity(5);
        if let Node::Split {
            feature, threshold, ..
        } = node
        {
            let name = self
                .feature_names
                .get(feature.index())
                .map_or_else(|| format!("x[{}]", feature.index()), Clone::clone);
            lines.push(format!("{name} <= {threshold:.2}"));
        }
        lines.push(format!("impurity = {:.2}", node.impurity().value()));
        lines.push(format!("samples = {}", node.n_samples()));
        let value: Vec<String> = node.distribution().iter().map(|v| format!("{v:.2}")).collect();
        lines.push(format!("value = [{}]", value.join(", ")));
        let class_name = self.class_names.get(class).map_or("?", String::as_str);
        lines.push(format!("class = {class_name}"));
        lines
    }
}

/// Top-centre of a placed box in pixels.
fn anchor(placed: &Placed, top: f64) -> (f64, f64) {
    let x = MARGIN + placed.slot * (BOX_W + H_GAP) + BOX_W / 2.0;
    let y = top + placed.depth as f64 * (BOX_H + V_GAP);
    (x, y)
}

/// Fill opacity from how dominant the majority class is.
fn purity(distribution: &[f64]) -> f64 {
    let total: f64 = distribution.iter().sum();
    if distribution.len() < 2 || total <= 0.0 {
        return 1.0;
    }
    let mut sorted: Vec<f64> = distribution.iter().map(|v| v / total).collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let (first, second) = (sorted[0], sorted[1]);
    if second >= 1.0 {
        return 1.0;
    }
    (0.15 + 0.85 * (first - second) / (1.0 - second)).clamp(0.15, 1.0)
}

fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
