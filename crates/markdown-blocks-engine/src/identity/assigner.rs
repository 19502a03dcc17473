use std::collections::{HashMap, HashSet, VecDeque};

use crate::blocks::{Block, BlockTree};

use super::fingerprint::{Fingerprint, Position};

/// Assigns stable IDs to a freshly converted tree.
///
/// Generation is a pure function of each block's fingerprint. The only state
/// is per call: the set of IDs already handed out, used to suffix collisions.
#[derive(Debug, Clone, Copy)]
pub struct IdAssigner {
    /// Adds the sibling index to the seed, which separates identical
    /// neighbours but makes IDs shift when siblings are inserted.
    pub include_sibling_index: bool,
}

impl Default for IdAssigner {
    fn default() -> Self {
        Self {
            include_sibling_index: true,
        }
    }
}

impl IdAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, blocks: Vec<Block>, doc_len: usize) -> BlockTree {
        self.run(blocks, doc_len, None)
    }

    /// Like [`assign`](Self::assign), but a block whose type and normalized
    /// content match a block of `previous` takes over that block's ID.
    ///
    /// Previous IDs with the same content key are handed out in document
    /// order, so a repeated block keeps its own ID as long as the repeats keep
    /// their relative order.
    pub fn assign_preserving(
        &self,
        blocks: Vec<Block>,
        doc_len: usize,
        previous: &BlockTree,
    ) -> BlockTree {
        let mut carried: HashMap<String, VecDeque<String>> = HashMap::new();
        for old in previous.walk().filter(|b| !b.id.is_empty()) {
            let key = Fingerprint::of(
                old,
                Position {
                    doc_len,
                    sibling_index: None,
                },
            )
            .content_key();
            carried.entry(key).or_default().push_back(old.id.clone());
        }
        self.run(blocks, doc_len, Some(carried))
    }

    fn run(
        &self,
        mut blocks: Vec<Block>,
        doc_len: usize,
        carried: Option<HashMap<String, VecDeque<String>>>,
    ) -> BlockTree {
        let mut pass = Pass {
            include_sibling_index: self.include_sibling_index,
            doc_len,
            used: HashSet::new(),
            next_suffix: HashMap::new(),
            carried: carried.unwrap_or_default(),
            reused: 0,
        };
        pass.siblings(&mut blocks);
        if pass.reused > 0 {
            log::debug!("re-parse kept {} existing block ids", pass.reused);
        }
        BlockTree::new(blocks)
    }
}

struct Pass {
    include_sibling_index: bool,
    doc_len: usize,
    used: HashSet<String>,
    /// Next suffix to try per colliding base ID.
    next_suffix: HashMap<String, usize>,
    carried: HashMap<String, VecDeque<String>>,
    reused: usize,
}

impl Pass {
    fn siblings(&mut self, blocks: &mut [Block]) {
        for (index, block) in blocks.iter_mut().enumerate() {
            let fingerprint = Fingerprint::of(
                block,
                Position {
                    doc_len: self.doc_len,
                    sibling_index: self.include_sibling_index.then_some(index),
                },
            );
            let candidate = match self
                .carried
                .get_mut(&fingerprint.content_key())
                .and_then(VecDeque::pop_front)
            {
                Some(old) => {
                    self.reused += 1;
                    old
                }
                None => fingerprint.id(),
            };
            block.id = self.claim(candidate);
            self.siblings(&mut block.children);
        }
    }

    /// First claimant keeps the ID; later ones get `_1`, `_2`, ...
    fn claim(&mut self, id: String) -> String {
        if self.used.insert(id.clone()) {
            return id;
        }
        let n = self.next_suffix.entry(id.clone()).or_insert(1);
        loop {
            let suffixed = format!("{id}_{n}");
            *n += 1;
            if self.used.insert(suffixed.clone()) {
                return suffixed;
            }
        }
    }
}
