/*!
 * Tier forest: parent/child relations between tiers.
 *
 * Relations are kept as an explicit adjacency map keyed by tier name and
 * validated acyclic when the document is built.
 */

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::errors::DocumentError;

/// Parent → children adjacency for all tiers of a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierForest {
    parents: HashMap<String, Option<String>>,
    children: BTreeMap<String, Vec<String>>,
    roots: Vec<String>,
}

impl TierForest {
    /// Build and validate the forest from `(tier, parent)` pairs in declaration order.
    ///
    /// Fails with `UnknownParentTier` when a parent is not declared and with
    /// `MalformedDocument` when the parent references form a cycle.
    pub fn build(edges: &[(String, Option<String>)]) -> Result<Self, DocumentError> {
        let declared: HashSet<&str> = edges.iter().map(|(tier, _)| tier.as_str()).collect();

        let mut forest = TierForest::default();
        for (tier, parent) in edges {
            match parent {
                Some(parent) => {
                    if !declared.contains(parent.as_str()) {
                        return Err(DocumentError::UnknownParentTier {
                            tier: tier.clone(),
                            parent: parent.clone(),
                        });
                    }
                    forest
                        .children
                        .entry(parent.clone())
                        .or_default()
                        .push(tier.clone());
                }
                None => forest.roots.push(tier.clone()),
            }
            forest.parents.insert(tier.clone(), parent.clone());
        }

        forest.ensure_acyclic()?;
        Ok(forest)
    }

    fn ensure_acyclic(&self) -> Result<(), DocumentError> {
        // Every tier must reach a root within `len` steps
        for start in self.parents.keys() {
            let mut seen = HashSet::new();
            let mut current = start.as_str();
            while let Some(Some(parent)) = self.parents.get(current) {
                if !seen.insert(current) {
                    return Err(DocumentError::malformed(
                        0,
                        format!("tier '{}' is part of a parent reference cycle", start),
                    ));
                }
                current = parent.as_str();
            }
        }
        Ok(())
    }

    /// Tiers without a parent, in declaration order
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Direct children of a tier
    pub fn children(&self, tier: &str) -> &[String] {
        self.children.get(tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parent of a tier, if it has one
    pub fn parent(&self, tier: &str) -> Option<&str> {
        self.parents.get(tier).and_then(|p| p.as_deref())
    }

    /// All tiers below `tier`, depth first
    pub fn descendants(&self, tier: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&String> = self.children(tier).iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next.clone());
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Chain of ancestors from the direct parent up to the root
    pub fn ancestors(&self, tier: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = tier;
        while let Some(parent) = self.parent(current) {
            if out.iter().any(|t: &String| t == parent) {
                break;
            }
            out.push(parent.to_string());
            current = parent;
        }
        out
    }
}
