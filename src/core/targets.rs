//! Build targets as recorded for documentation and reports.
//!
//! The graph is reconstructed from target names and output paths: a
//! dependency entry refers either to another target's name or to a file
//! that some target lists among its outputs.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::util::diagnostic::UserNotification;
use crate::util::fs::{read_to_string, write_if_changed};

/// Kind of build-system target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    #[default]
    CustomTarget,
    CustomCommand,
    Executable,
    ObjectLibrary,
}

/// A build-system target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub target_type: TargetType,
}

/// All targets of a generated build system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetsData {
    pub targets: Vec<Target>,
}

impl TargetsData {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        let data = serde_json::from_str(&contents).map_err(|e| {
            UserNotification::new(format!(
                "Failed to parse targets data '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(data)
    }

    /// Write as pretty JSON; untouched when the content is unchanged.
    pub fn save(&self, path: &Path) -> Result<bool> {
        let contents =
            serde_json::to_string_pretty(self).context("failed to serialize targets data")?;
        write_if_changed(path, &contents)
    }
}

/// A target and the targets it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTreeNode {
    pub name: String,
    pub children: Vec<TargetTreeNode>,
    /// Set when expansion stopped because the target is already on the path
    pub cycle: bool,
}

/// Dependency graph over [`TargetsData`].
pub struct TargetGraph<'a> {
    data: &'a TargetsData,
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
    by_name: HashMap<&'a str, usize>,
    by_output: HashMap<&'a str, usize>,
}

impl<'a> TargetGraph<'a> {
    pub fn new(data: &'a TargetsData) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..data.targets.len()).map(|i| graph.add_node(i)).collect();

        let mut by_name = HashMap::new();
        let mut by_output = HashMap::new();
        for (i, target) in data.targets.iter().enumerate() {
            by_name.entry(target.name.as_str()).or_insert(i);
            for output in &target.outputs {
                by_output.insert(output.as_str(), i);
            }
        }

        let mut this = TargetGraph {
            data,
            graph,
            nodes,
            by_name,
            by_output,
        };
        for (i, target) in data.targets.iter().enumerate() {
            for dep in &target.depends {
                if let Some(j) = this.lookup(dep) {
                    if !this.graph.contains_edge(this.nodes[i], this.nodes[j]) {
                        this.graph.add_edge(this.nodes[i], this.nodes[j], ());
                    }
                }
            }
        }
        this
    }

    /// Find a target by name or by one of its outputs.
    pub fn lookup(&self, name_or_output: &str) -> Option<usize> {
        self.by_name
            .get(name_or_output)
            .or_else(|| self.by_output.get(name_or_output))
            .copied()
    }

    pub fn target(&self, index: usize) -> &'a Target {
        &self.data.targets[index]
    }

    /// Direct dependencies in declaration order.
    pub fn dependencies(&self, index: usize) -> Vec<usize> {
        // petgraph yields the most recent edge first
        let mut deps: Vec<usize> = self
            .graph
            .neighbors(self.nodes[index])
            .map(|n| self.graph[n])
            .collect();
        deps.reverse();
        deps
    }

    /// Expand the dependency tree of a target, stopping at cycles.
    pub fn tree(&self, name_or_output: &str) -> Option<TargetTreeNode> {
        let index = self.lookup(name_or_output)?;
        let mut path = HashSet::new();
        Some(self.build_tree(index, &mut path))
    }

    fn build_tree(&self, index: usize, path: &mut HashSet<usize>) -> TargetTreeNode {
        let name = self.target(index).name.clone();
        if !path.insert(index) {
            return TargetTreeNode {
                name,
                children: Vec::new(),
                cycle: true,
            };
        }
        let children = self
            .dependencies(index)
            .into_iter()
            .map(|dep| self.build_tree(dep, path))
            .collect();
        path.remove(&index);
        TargetTreeNode {
            name,
            children,
            cycle: false,
        }
    }

    /// Render a markdown document describing the requested targets.
    pub fn render_markdown(&self, target_names: &[String]) -> String {
        let found: Vec<usize> = target_names.iter().filter_map(|n| self.lookup(n)).collect();

        let mut out = String::new();
        let _ = writeln!(out, "# Target Dependencies Documentation\n");
        let _ = writeln!(out, "## Summary\n");
        let _ = writeln!(out, "- **Total targets**: {}", self.data.targets.len());
        let _ = writeln!(out, "- **Root targets**: {}\n", found.len());

        let _ = writeln!(out, "## Targets\n");
        if found.is_empty() {
            let _ = writeln!(out, "No matching targets were found in the provided targets data.");
            return out;
        }

        for index in found {
            let target = self.target(index);
            let _ = writeln!(out, "### {}\n", target.name);
            if let Some(ref description) = target.description {
                let _ = writeln!(out, "{}\n", description);
            }
            if !target.outputs.is_empty() {
                let _ = writeln!(out, "**Outputs**:\n");
                for output in &target.outputs {
                    let _ = writeln!(out, "- `{}`", output);
                }
                let _ = writeln!(out);
            }
            let _ = writeln!(out, "**Dependency tree**:\n");
            if let Some(tree) = self.tree(&target.name) {
                render_tree(&tree, 0, &mut out);
            }
            let _ = writeln!(out);
        }
        out
    }
}

fn render_tree(node: &TargetTreeNode, depth: usize, out: &mut String) {
    let marker = if node.cycle { " (cycle)" } else { "" };
    let _ = writeln!(out, "{}- `{}`{}", "  ".repeat(depth), node.name, marker);
    for child in &node.children {
        render_tree(child, depth + 1, out);
    }
}
