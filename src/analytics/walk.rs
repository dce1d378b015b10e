//! Level-bounded ancestor and descendant walks.
//!
//! Both walks are breadth-first with a visited set. The hop budget is spent
//! once per level, shared by the whole frontier, so `hops = 2` reaches
//! parents and grandparents.

use std::collections::HashSet;

use crate::store::AdGraph;
use crate::types::features::AscendantFeatures;
use crate::types::node::{NodeIndex, NodeKind};

impl AdGraph {
    /// Aggregate script and keyword features over the ancestors of `start`
    /// up to `hops` levels away.
    ///
    /// Element ancestors contribute the `script` tag check and their
    /// memoized ad-keyword flag. Script ancestors contribute eval and
    /// fingerprinting traits (memoized) and, for the nearest one, the text
    /// length. Returns as soon as both "descendant of script" and "ancestor
    /// has ad keyword" hold.
    pub fn ascendant_features(&mut self, start: NodeIndex, hops: usize) -> AscendantFeatures {
        let mut features = AscendantFeatures::default();
        if self.node(start).is_none() {
            return features;
        }

        let mut visited = HashSet::from([start]);
        let mut frontier = vec![start];
        let mut nearest_script_seen = false;

        for _ in 0..hops {
            let mut next = Vec::new();
            for current in frontier {
                let parents = match self.node(current) {
                    Some(node) => node.parents.clone(),
                    None => continue,
                };
                for parent in parents {
                    if !visited.insert(parent) {
                        continue;
                    }
                    next.push(parent);

                    let Some(node) = self.node_mut(parent) else {
                        continue;
                    };
                    match &mut node.kind {
                        NodeKind::Element(element) => {
                            if element.is_script_tag() {
                                features.descendant_of_script = true;
                            }
                            if element.ad_keyword() {
                                features.ascendants_have_ad_keyword = true;
                            }
                        }
                        NodeKind::Script(script) => {
                            features.descendant_of_script = true;
                            features.descendant_of_eval_or_function |= script.is_eval_or_function;
                            let traits = script.traits();
                            features.ascendant_has_eval_or_function |= traits.has_eval_or_function;
                            features.ascendant_has_fingerprinting_keyword |=
                                traits.has_fingerprinting_keyword;
                            if !nearest_script_seen {
                                features.ascendant_script_length = script.length();
                                nearest_script_seen = true;
                            }
                        }
                        NodeKind::Request(_) => {}
                    }

                    if features.descendant_of_script && features.ascendants_have_ad_keyword {
                        return features;
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        features
    }

    /// Number of distinct nodes reachable from `start` over child edges
    /// within `hops` levels.
    pub fn descendant_count(&self, start: NodeIndex, hops: usize) -> usize {
        if self.node(start).is_none() {
            return 0;
        }

        let mut visited = HashSet::from([start]);
        let mut frontier = vec![start];
        let mut count = 0;

        for _ in 0..hops {
            let mut next = Vec::new();
            for current in &frontier {
                let Some(node) = self.node(*current) else {
                    continue;
                };
                for child in &node.children {
                    if visited.insert(*child) {
                        count += 1;
                        next.push(*child);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        count
    }
}
