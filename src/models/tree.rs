use std::time::Duration;

use super::result::TestResult;
use super::status::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    Category,
    Test,
}

/// Aggregated counts for a node and everything below it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStats {
    pub tests: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl NodeStats {
    fn record(&mut self, result: &TestResult) {
        self.tests += 1;
        self.duration += result.duration;
        match result.outcome {
            Outcome::Fail => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Success => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub kind: NodeKind,
    pub name: String,
    pub stats: NodeStats,
    /// Only set on `NodeKind::Test` nodes.
    pub result: Option<TestResult>,
}

/// Module → category → test hierarchy over a finished run, sorted by name at every level.
#[derive(Debug, Default)]
pub struct ResultTree {
    nodes: Vec<ResultNode>,
    root_ids: Vec<usize>,
    total: NodeStats,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results(results: &[TestResult]) -> Self {
        let mut sorted: Vec<&TestResult> = results.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut tree = Self::new();
        for result in sorted {
            tree.insert(result.clone());
        }
        tree
    }

    /// Insert a result under its module and category, creating them as needed,
    /// and fold its stats into every ancestor.
    pub fn insert(&mut self, result: TestResult) -> usize {
        let module_id = match self.find_root_by_name(&result.name.module) {
            Some(id) => id,
            None => self.add_root(result.name.module.clone()),
        };
        let category_id = match self.find_child_by_name(module_id, &result.name.category) {
            Some(id) => id,
            None => self.add_child(module_id, NodeKind::Category, result.name.category.clone()),
        };
        let test_id = self.add_child(category_id, NodeKind::Test, result.name.test.clone());

        self.total.record(&result);
        let mut cur = Some(test_id);
        while let Some(id) = cur {
            let node = &mut self.nodes[id];
            node.stats.record(&result);
            cur = node.parent;
        }
        self.nodes[test_id].result = Some(result);
        test_id
    }

    fn add_root(&mut self, name: String) -> usize {
        let id = self.add_node(NodeKind::Module, name, None);
        self.root_ids.push(id);
        id
    }

    fn add_child(&mut self, parent_id: usize, kind: NodeKind, name: String) -> usize {
        let id = self.add_node(kind, name, Some(parent_id));
        self.nodes[parent_id].children.push(id);
        id
    }

    fn add_node(&mut self, kind: NodeKind, name: String, parent: Option<usize>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(ResultNode {
            id,
            parent,
            children: Vec::new(),
            kind,
            name,
            stats: NodeStats::default(),
            result: None,
        });
        id
    }

    pub fn get(&self, id: usize) -> Option<&ResultNode> {
        self.nodes.get(id)
    }

    pub fn roots(&self) -> &[usize] {
        &self.root_ids
    }

    pub fn total(&self) -> NodeStats {
        self.total
    }

    /// Children of `id`, resolved to nodes.
    pub fn children(&self, id: usize) -> impl Iterator<Item = &ResultNode> {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&cid| self.nodes.get(cid))
    }

    pub fn find_root_by_name(&self, name: &str) -> Option<usize> {
        self.root_ids
            .iter()
            .copied()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    pub fn find_child_by_name(&self, parent: usize, name: &str) -> Option<usize> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }
}
