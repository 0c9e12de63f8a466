//! DOT graph output of the transform tree.
//!
//! Nodes that consumed a noticeable share of the execution time are shaded
//! red, darker meaning slower; parameter values still at their defaults are
//! grayed out. Useful with `dot -Tpng` to inspect prefix sharing.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::SfeResult;
use crate::tree::TransformTree;

/// Share of the hottest class below which nodes stay unshaded.
const RED_THRESHOLD: f32 = 0.25;
const INITIAL_LIGHT: i32 = 0x30;

fn identifier(class: &str, counter: usize) -> String {
    let safe: String = class
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{safe}{counter}")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl TransformTree {
    /// Writes the DOT description of the tree to `path`.
    pub fn dump_dot(&self, path: &Path) -> SfeResult<()> {
        let report = self.time_report();
        let include_time = !report.is_empty();
        let total = report.get("Total").copied().unwrap_or(0.0);
        let max_ratio = report
            .iter()
            .filter(|(class, _)| class.as_str() != "Total")
            .map(|(_, &share)| share as f32)
            .fold(0.0f32, f32::max);
        let red_shift = RED_THRESHOLD * max_ratio;

        let mut out = String::new();
        out.push_str("digraph TransformsTree {\n");

        let mut counters: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
        let mut names = vec![String::new(); self.nodes.len()];
        for &id in &self.exec_order {
            let class = self.class_of(id);
            let counter = counters.entry(class).or_insert(0);
            names[id] = identifier(class, *counter);
            *counter += 1;

            let _ = write!(out, "\t{} [", names[id]);
            let class_share = report.get(class).copied().unwrap_or(0.0) as f32;
            if include_time && class_share > red_shift && max_ratio > red_shift {
                let light = 255
                    - ((class_share - red_shift) / (max_ratio - red_shift)
                        * (255 - INITIAL_LIGHT) as f32) as i32;
                let _ = write!(out, "style=\"filled\", fillcolor=\"#ff{light:02x}{light:02x}\", ");
            }
            let _ = write!(out, "label=<{}", escape(class));
            if let Some(feature) = &self.nodes[id].feature {
                let _ = write!(out, "<br /><b>{}</b>", escape(feature));
            }
            out.push_str("<br /><font point-size=\"10\">");
            if include_time && total > 0.0 {
                let node_share =
                    self.nodes[id].elapsed.as_nanos() as f64 * 100.0 / total;
                let _ = write!(
                    out,
                    "<b>{}% ({}%)</b>",
                    node_share as i64,
                    (class_share * 100.0) as i64
                );
            }
            let transform = self.transforms[self.nodes[id].transform].as_ref();
            let descriptors = transform.supported_parameters();
            if transform.parameters().len() > 1 {
                out.push_str("<br /> <br />");
                for (name, value) in transform.parameters() {
                    let is_default = descriptors
                        .iter()
                        .any(|d| d.name == name && d.default == value);
                    if is_default {
                        out.push_str("<font color=\"gray\">");
                    }
                    let _ = write!(out, "{} = {}", escape(name), escape(value));
                    if is_default {
                        out.push_str("</font>");
                    }
                    out.push_str("<br />");
                }
            } else {
                out.push(' ');
            }
            out.push_str("</font>>");
            if !self.nodes[id].features_through.is_empty() {
                let _ = write!(
                    out,
                    ", tooltip=\"{}\"",
                    self.nodes[id].features_through.join(", ")
                );
            }
            out.push_str("]\n");
        }

        if include_time {
            let other = report.get("Other").copied().unwrap_or(0.0) * 100.0;
            let _ = write!(
                out,
                "\tOther [label=<Other<br /><font point-size=\"10\"><b>{}%</b></font>>]\n",
                other as i64
            );
        } else {
            out.push_str("\tOther [label=<Other>]\n");
        }
        out.push('\n');

        for &id in &self.exec_order {
            for &child in &self.nodes[id].children {
                let _ = writeln!(out, "\t{} -> {}", names[id], names[child]);
            }
        }
        out.push_str("}\n");
        fs::write(path, out)?;
        Ok(())
    }
}
