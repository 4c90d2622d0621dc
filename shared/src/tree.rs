//! Category tree aggregator
//!
//! Turns a flat snapshot of items and categories into a forest of category
//! nodes carrying cost and profit rollups. The tree is held in an arena and
//! every traversal uses an explicit stack, so arbitrarily deep nesting in
//! stored data cannot overflow the call stack.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::models::{Category, StockItemView};

/// Id of the synthetic node grouping items without a resolvable category
pub const UNCATEGORIZED_ID: Uuid = Uuid::nil();
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";

/// A category with its direct items and nested children.
///
/// Totals include every descendant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub items: Vec<StockItemView>,
    pub children: Vec<CategoryNode>,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
}

impl CategoryNode {
    pub fn is_uncategorized(&self) -> bool {
        self.id == UNCATEGORIZED_ID
    }
}

/// One line of a depth-first rendering of the tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TreeRow {
    #[serde(rename_all = "camelCase")]
    Category {
        id: Uuid,
        name: String,
        depth: usize,
        total_cost: Decimal,
        total_profit: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Item { depth: usize, item: StockItemView },
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    id: Uuid,
    name: String,
    parent: Option<usize>,
    items: Vec<StockItemView>,
    children: Vec<usize>,
    total_cost: Decimal,
    total_profit: Decimal,
}

impl Slot {
    fn new(id: Uuid, name: String) -> Self {
        Self {
            id,
            name,
            parent: None,
            items: Vec::new(),
            children: Vec::new(),
            total_cost: Decimal::ZERO,
            total_profit: Decimal::ZERO,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    OnPath,
    Done,
}

/// Forest of category nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryTree {
    nodes: Vec<Slot>,
    roots: Vec<usize>,
}

impl CategoryTree {
    /// Build the forest for a snapshot.
    ///
    /// Only categories referenced by an item, directly or as an ancestor,
    /// become nodes. Items whose category is missing from the snapshot land
    /// under the Uncategorized node. Cost and profit fields absent from the
    /// item views count as zero.
    pub fn build(items: &[StockItemView], categories: &[Category]) -> Self {
        let mut index: HashMap<Uuid, &Category> = HashMap::with_capacity(categories.len());
        for category in categories {
            if category.id != UNCATEGORIZED_ID {
                index.entry(category.id).or_insert(category);
            }
        }

        let parent_of = |category: &Category| -> Option<Uuid> {
            let parent = index.get(&category.parent_id?)?;
            (parent.company_id == category.company_id && parent.id != category.id)
                .then_some(parent.id)
        };

        // Materialize referenced categories and their ancestry
        let mut wanted: HashSet<Uuid> = HashSet::new();
        let mut uncategorized = false;
        for item in items {
            let Some(start) = item.category_id.and_then(|id| index.get(&id)) else {
                uncategorized = true;
                continue;
            };
            let mut cursor = Some(*start);
            while let Some(category) = cursor {
                if !wanted.insert(category.id) {
                    break;
                }
                cursor = parent_of(category).and_then(|id| index.get(&id).copied());
            }
        }

        let mut ordered: Vec<&Category> = wanted.iter().filter_map(|id| index.get(id).copied()).collect();
        ordered.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut nodes: Vec<Slot> = ordered
            .iter()
            .map(|c| Slot::new(c.id, c.name.clone()))
            .collect();
        let position: HashMap<Uuid, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        for (i, category) in ordered.iter().enumerate() {
            nodes[i].parent = parent_of(category).and_then(|id| position.get(&id).copied());
        }
        break_cycles(&mut nodes);

        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            match nodes[i].parent {
                Some(p) => nodes[p].children.push(i),
                None => roots.push(i),
            }
        }

        let uncategorized_slot = uncategorized.then(|| {
            nodes.push(Slot::new(UNCATEGORIZED_ID, UNCATEGORIZED_NAME.to_string()));
            roots.push(nodes.len() - 1);
            nodes.len() - 1
        });

        for item in items {
            let slot = item
                .category_id
                .and_then(|id| position.get(&id).copied())
                .or(uncategorized_slot);
            if let Some(slot) = slot {
                nodes[slot].items.push(item.clone());
            }
        }

        let mut tree = Self { nodes, roots };
        tree.compute_totals();
        tree
    }

    /// Pruned copy keeping the nodes that match `term` and their ancestors.
    ///
    /// A node whose name matches keeps all of its items; otherwise only the
    /// items whose name or SKU match are kept. Matching is a
    /// case-insensitive substring test. Totals are those of the unfiltered
    /// tree. A blank term returns the tree unchanged.
    pub fn filter(&self, term: &str) -> Self {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }

        let item_matches = |item: &StockItemView| {
            item.name.to_lowercase().contains(&needle)
                || item
                    .sku
                    .as_deref()
                    .is_some_and(|sku| sku.to_lowercase().contains(&needle))
        };

        let mut name_match = vec![false; self.nodes.len()];
        let mut survives = vec![false; self.nodes.len()];
        for i in self.postorder() {
            let slot = &self.nodes[i];
            name_match[i] = slot.name.to_lowercase().contains(&needle);
            survives[i] = name_match[i]
                || slot.items.iter().any(&item_matches)
                || slot.children.iter().any(|&c| survives[c]);
        }

        let mut remap: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut nodes = Vec::new();
        for (i, slot) in self.nodes.iter().enumerate() {
            if survives[i] {
                remap[i] = Some(nodes.len());
                let items = if name_match[i] {
                    slot.items.clone()
                } else {
                    slot.items.iter().filter(|item| item_matches(*item)).cloned().collect()
                };
                nodes.push(Slot {
                    items,
                    children: Vec::new(),
                    ..slot.clone()
                });
            }
        }

        for (i, slot) in self.nodes.iter().enumerate() {
            if let Some(new) = remap[i] {
                nodes[new].parent = slot.parent.and_then(|p| remap[p]);
                nodes[new].children = slot.children.iter().filter_map(|&c| remap[c]).collect();
            }
        }
        let roots = self.roots.iter().filter_map(|&r| remap[r]).collect();

        Self { nodes, roots }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// `(total_cost, total_profit)` of a node
    pub fn totals(&self, id: Uuid) -> Option<(Decimal, Decimal)> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| (n.total_cost, n.total_profit))
    }

    /// Sum of the root totals
    pub fn grand_totals(&self) -> (Decimal, Decimal) {
        self.roots.iter().fold((Decimal::ZERO, Decimal::ZERO), |(c, p), &r| {
            (c + self.nodes[r].total_cost, p + self.nodes[r].total_profit)
        })
    }

    /// Nested representation of the forest
    pub fn to_nodes(&self) -> Vec<CategoryNode> {
        let mut built: Vec<Option<CategoryNode>> = vec![None; self.nodes.len()];
        for i in self.postorder() {
            let slot = &self.nodes[i];
            let children = slot
                .children
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[i] = Some(CategoryNode {
                id: slot.id,
                name: slot.name.clone(),
                parent_id: slot.parent.map(|p| self.nodes[p].id),
                items: slot.items.clone(),
                children,
                total_cost: slot.total_cost,
                total_profit: slot.total_profit,
            });
        }
        self.roots.iter().filter_map(|&r| built[r].take()).collect()
    }

    /// Depth-first rows: each category followed by its items, then its
    /// children.
    pub fn flatten(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((i, depth)) = stack.pop() {
            let slot = &self.nodes[i];
            rows.push(TreeRow::Category {
                id: slot.id,
                name: slot.name.clone(),
                depth,
                total_cost: slot.total_cost,
                total_profit: slot.total_profit,
            });
            rows.extend(slot.items.iter().map(|item| TreeRow::Item {
                depth: depth + 1,
                item: item.clone(),
            }));
            stack.extend(slot.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        rows
    }

    /// Node indices with every child before its parent
    fn postorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.clone();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(self.nodes[i].children.iter().copied());
        }
        order.reverse();
        order
    }

    // Totals saturate instead of overflowing.
    fn compute_totals(&mut self) {
        for i in self.postorder() {
            let (mut cost, mut profit) = self.nodes[i]
                .items
                .iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(c, p), item| {
                    let value = item.stock_value().unwrap_or(Decimal::MAX);
                    (
                        c.saturating_add(value),
                        p.saturating_add(item.profit.unwrap_or(Decimal::ZERO)),
                    )
                });
            for &c in &self.nodes[i].children {
                cost = cost.saturating_add(self.nodes[c].total_cost);
                profit = profit.saturating_add(self.nodes[c].total_profit);
            }
            self.nodes[i].total_cost = cost;
            self.nodes[i].total_profit = profit;
        }
    }
}

/// Drop the parent edge that closes each cycle, walking nodes in order
fn break_cycles(nodes: &mut [Slot]) {
    let mut state = vec![Visit::Unseen; nodes.len()];
    for start in 0..nodes.len() {
        if state[start] != Visit::Unseen {
            continue;
        }
        let mut path = Vec::new();
        let mut current = start;
        loop {
            state[current] = Visit::OnPath;
            path.push(current);
            match nodes[current].parent {
                Some(p) if state[p] == Visit::Unseen => current = p,
                Some(p) if state[p] == Visit::OnPath => {
                    nodes[current].parent = None;
                    break;
                }
                _ => break,
            }
        }
        for i in path {
            state[i] = Visit::Done;
        }
    }
}

impl Serialize for CategoryTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_nodes().serialize(serializer)
    }
}

pub fn build_tree(items: &[StockItemView], categories: &[Category]) -> CategoryTree {
    CategoryTree::build(items, categories)
}

pub fn filter_tree(tree: &CategoryTree, term: &str) -> CategoryTree {
    tree.filter(term)
}
