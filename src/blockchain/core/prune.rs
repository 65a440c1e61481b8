//! Finality horizon garbage collection
//!
//! With `H = max_height - cut_off_age`, only the tip's ancestor at height `H`
//! and the nodes above it stay resident. That ancestor becomes the new root:
//! its parent link is cleared and every resident node reaches it. Everything
//! else at or below `H` goes, together with its subtree, so residency is
//! bounded by the window and not by chain length.
//!
//! Each pass only walks the spine segment between the previous root and the
//! new one. Only the previous root sits at the previous horizon, so after a
//! reorg the new tip still descends from it.

use crate::transaction::TxValidator;
use tracing::debug;

use super::chain::Sha256Hash;
use super::tree::BlockTree;

impl<V: TxValidator> BlockTree<V> {
    /// Runs after the tip advances. Returns the number of evicted nodes.
    pub(super) fn prune(&mut self) -> usize {
        let horizon = match self.finality_horizon() {
            Some(horizon) if horizon > self.pruned_horizon => horizon,
            _ => return 0,
        };

        let spine = self.spine_segment(self.pruned_horizon, horizon);
        let Some(&new_root) = spine.last() else {
            return 0;
        };
        let mut evicted = 0;

        for pair in spine.windows(2) {
            let (finalized, next) = (pair[0], pair[1]);
            let Some(node) = self.nodes.remove(&finalized) else {
                continue;
            };
            evicted += 1;
            for child in node.children {
                if child != next {
                    evicted += self.evict_subtree(child);
                }
            }
        }

        if let Some(root) = self.nodes.get_mut(&new_root) {
            root.parent = None;
        }
        self.root = new_root;

        debug!(
            "Pruned {} nodes up to horizon {} ({} resident)",
            evicted,
            horizon,
            self.nodes.len()
        );
        self.pruned_horizon = horizon;
        evicted
    }

    /// Tip ancestors with heights in `from..=to`, lowest first.
    fn spine_segment(&self, from: u64, to: u64) -> Vec<Sha256Hash> {
        let mut segment = Vec::with_capacity((to - from + 1) as usize);
        let mut cursor = Some(self.tip);
        while let Some(hash) = cursor {
            let Some(node) = self.nodes.get(&hash) else {
                break;
            };
            if node.height < from {
                break;
            }
            if node.height <= to {
                segment.push(hash);
            }
            cursor = node.parent;
        }
        segment.reverse();
        segment
    }

    /// Removes `root` and all its descendants. The caller detaches `root`
    /// from its parent.
    fn evict_subtree(&mut self, root: Sha256Hash) -> usize {
        let mut stack = vec![root];
        let mut evicted = 0;
        while let Some(hash) = stack.pop() {
            if let Some(node) = self.nodes.remove(&hash) {
                stack.extend(node.children);
                evicted += 1;
            }
        }
        evicted
    }
}
