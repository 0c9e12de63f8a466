//! The transform tree: recipes merged into a shared-prefix DAG.
//!
//! Features are inserted one by one; each walks from the root, reusing
//! existing child nodes while the transform classes and parameters match
//! exactly and branching off at the first difference. Format converters are
//! interposed automatically. Equal transforms on equal input formats are
//! deduplicated engine-wide through a fingerprint cache so a transform
//! instance (and its precomputed tables) can back several nodes.
//!
//! `prepare_for_execution` freezes the tree, initializes every distinct
//! transform, wires the linear execution order and hands the tree to the
//! allocation planner. After that only `execute` is allowed.

use std::collections::HashMap;
use std::time::Duration;

use crate::arena::{Arena, Binding};
use crate::config::EngineConfig;
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{parse_raw, ParameterDescriptor, ParameterMap};
use crate::parser;
use crate::registry::Registry;
use crate::transform::{apply_parameters, equivalent, fingerprint, Transform};
use crate::transforms::converters::converter_name;

pub(crate) type NodeId = usize;
pub(crate) type TransformId = usize;

/// One contiguous sub-range of a node's buffer list, executed as a
/// separate invocation when the planner sliced the node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slice {
    pub start: usize,
    pub length: usize,
    pub cycle: usize,
}

pub(crate) struct Node {
    pub parent: Option<NodeId>,
    pub transform: TransformId,
    pub children: Vec<NodeId>,
    pub feature: Option<String>,
    /// Output buffer count on this edge.
    pub buffers_count: usize,
    pub binding: Option<Binding>,
    /// Next node in the linear execution order.
    pub next: Option<NodeId>,
    /// Sliced invocation ranges; empty when the node runs in one call.
    pub slices: Vec<Slice>,
    pub elapsed: Duration,
    /// Features whose recipe passes through this node.
    pub features_through: Vec<String>,
}

/// The no-op transform bound to the root node; its input and output format
/// is the source waveform format.
struct RootTransform {
    format: BufferFormat,
    parameters: ParameterMap,
}

impl Transform for RootTransform {
    fn name(&self) -> &'static str {
        "Root"
    }

    fn description(&self) -> &'static str {
        "The root for all other transforms."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &[]
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, _value: &str) -> SfeResult<()> {
        Err(SfeError::UnknownParameter {
            class: self.name().to_string(),
            name: name.to_string(),
        })
    }

    fn input_format(&self) -> &BufferFormat {
        &self.format
    }

    fn output_format(&self) -> &BufferFormat {
        &self.format
    }

    fn set_input_format(
        &mut self,
        format: &BufferFormat,
        buffers_count: usize,
    ) -> SfeResult<usize> {
        self.format = *format;
        Ok(buffers_count)
    }

    fn process(
        &self,
        _input: &crate::arena::BufferView<'_>,
        _output: &mut crate::arena::BufferViewMut<'_>,
    ) -> SfeResult<()> {
        Ok(())
    }
}

/// The feature-extraction engine.
pub struct TransformTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) transforms: Vec<Box<dyn Transform>>,
    /// Configured (input, output) buffer counts per transform instance.
    pub(crate) transform_counts: Vec<(usize, usize)>,
    /// Transform fingerprint -> instance, for engine-wide deduplication.
    cache: HashMap<String, TransformId>,
    features: Vec<String>,
    frozen: bool,
    pub(crate) exec_order: Vec<NodeId>,
    pub(crate) arena: Option<Arena>,
    pub(crate) config: EngineConfig,
    root_format: BufferFormat,
    pub(crate) class_times: HashMap<String, Duration>,
    pub(crate) total_time: Duration,
    pub(crate) invocations: HashMap<String, u64>,
}

impl TransformTree {
    /// Creates an engine for waveforms of `source_buffer_size` samples at
    /// `source_sampling_rate` Hz.
    pub fn new(source_buffer_size: usize, source_sampling_rate: u32) -> SfeResult<Self> {
        Self::with_config(
            source_buffer_size,
            source_sampling_rate,
            EngineConfig::default(),
        )
    }

    pub fn with_config(
        source_buffer_size: usize,
        source_sampling_rate: u32,
        config: EngineConfig,
    ) -> SfeResult<Self> {
        let root_format =
            BufferFormat::new(FormatId::Int16, source_buffer_size, source_sampling_rate)?;
        let root_transform = RootTransform {
            format: root_format,
            parameters: ParameterMap::new(),
        };
        Ok(Self {
            nodes: vec![Node {
                parent: None,
                transform: 0,
                children: Vec::new(),
                feature: None,
                buffers_count: 1,
                binding: None,
                next: None,
                slices: Vec::new(),
                elapsed: Duration::ZERO,
                features_through: Vec::new(),
            }],
            transforms: vec![Box::new(root_transform)],
            transform_counts: vec![(1, 1)],
            cache: HashMap::new(),
            features: Vec::new(),
            frozen: false,
            exec_order: Vec::new(),
            arena: None,
            config,
            root_format,
            class_times: HashMap::new(),
            total_time: Duration::ZERO,
            invocations: HashMap::new(),
        })
    }

    pub fn root_format(&self) -> &BufferFormat {
        &self.root_format
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Feature names in insertion order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Number of distinct transform instances (excluding the root).
    pub fn transform_count(&self) -> usize {
        self.transforms.len() - 1
    }

    /// Per-class invocation counters accumulated by `execute`.
    pub fn invocation_counts(&self) -> &HashMap<String, u64> {
        &self.invocations
    }

    /// Size of the backing block derived by the allocation planner, zero
    /// before `prepare_for_execution`.
    pub fn arena_len(&self) -> usize {
        self.arena.as_ref().map_or(0, |a| a.len())
    }

    /// Adds one feature from recipe text, e.g.
    /// `"Energy[Window(type=rectangular),Energy]"`.
    pub fn add_feature_from_text(&mut self, recipe: &str) -> SfeResult<()> {
        let (name, transforms) = parser::parse_feature(recipe, self.features.len())?;
        self.add_feature(&name, &transforms)
    }

    /// Adds one feature as an ordered (class name, raw parameters) list.
    ///
    /// On any failure the tree is left exactly as it was before the call.
    pub fn add_feature(&mut self, name: &str, transforms: &[(String, String)]) -> SfeResult<()> {
        if self.frozen {
            return Err(SfeError::TreeIsFrozen);
        }
        if self.features.iter().any(|f| f == name) {
            return Err(SfeError::DuplicateFeatureName(name.to_string()));
        }

        let first_new_node = self.nodes.len();
        let first_new_transform = self.transforms.len();
        let mut new_cache_keys = Vec::new();

        let result = self.insert_chain(name, transforms, &mut new_cache_keys);
        if let Err(error) = result {
            // No partial insertion: new nodes and transforms sit at the tail
            // of their arenas, so rolling back is a truncation plus dropping
            // the child links that point past the old tail.
            for node in &mut self.nodes[..first_new_node] {
                node.children.retain(|&c| c < first_new_node);
            }
            self.nodes.truncate(first_new_node);
            self.transforms.truncate(first_new_transform);
            self.transform_counts.truncate(first_new_transform);
            for key in new_cache_keys {
                self.cache.remove(&key);
            }
            return Err(error);
        }
        Ok(())
    }

    fn insert_chain(
        &mut self,
        name: &str,
        transforms: &[(String, String)],
        new_cache_keys: &mut Vec<String>,
    ) -> SfeResult<()> {
        let mut cursor: NodeId = 0;
        for (class, raw_parameters) in transforms {
            cursor = self.insert_transform(cursor, class, raw_parameters, new_cache_keys)?;
        }
        if cursor == 0 {
            return Err(SfeError::EmptyTree);
        }
        if let Some(existing) = &self.nodes[cursor].feature {
            return Err(SfeError::ChainCollision {
                existing: existing.clone(),
                new: name.to_string(),
            });
        }
        self.nodes[cursor].feature = Some(name.to_string());
        // Remember the feature along the whole path.
        let mut walk = Some(cursor);
        while let Some(id) = walk {
            self.nodes[id].features_through.push(name.to_string());
            walk = self.nodes[id].parent;
        }
        self.features.push(name.to_string());
        Ok(())
    }

    /// Inserts one transform below `cursor`, reusing an identical child or a
    /// cached instance where possible, and returns the node the cursor moves
    /// to. Interposes a format converter first when required.
    fn insert_transform(
        &mut self,
        cursor: NodeId,
        class: &str,
        raw_parameters: &str,
        new_cache_keys: &mut Vec<String>,
    ) -> SfeResult<NodeId> {
        let registry = Registry::global();
        let cursor_format = *self.transforms[self.nodes[cursor].transform].output_format();
        let Some((mut instance, _exact)) = registry.create(class, cursor_format.id()) else {
            return Err(SfeError::TransformNotRegistered(class.to_string()));
        };

        let parameters = parse_raw(raw_parameters)?;
        apply_parameters(instance.as_mut(), &parameters)?;

        // Bridge incompatible formats with a converter node, then retry the
        // transform below it.
        if *instance.input_format() != cursor_format {
            let bridge = converter_name(cursor_format.id(), instance.input_format().id());
            if !registry.contains(&bridge) {
                return Err(SfeError::IncompatibleFormat {
                    from: cursor_format.id().as_str().to_string(),
                    to: instance.input_format().id().as_str().to_string(),
                });
            }
            let converter_node = self.insert_transform(cursor, &bridge, "", new_cache_keys)?;
            return self.insert_transform(converter_node, class, raw_parameters, new_cache_keys);
        }

        // Shared prefix: an identical child transform means the cursor just
        // advances. Sibling order is insertion order.
        for &child in &self.nodes[cursor].children {
            if equivalent(
                self.transforms[self.nodes[child].transform].as_ref(),
                instance.as_ref(),
            ) {
                return Ok(child);
            }
        }

        let input_count = self.nodes[cursor].buffers_count;
        let key = fingerprint(instance.as_ref());
        let cached = self.cache.get(&key).copied();
        let transform_id = match cached {
            // Engine-wide reuse is only sound when the cached instance was
            // configured for the same input shape and buffer count.
            Some(cached)
                if self.formats_identical(
                    self.transforms[cached].input_format(),
                    &cursor_format,
                ) && self.transform_counts[cached].0 == input_count =>
            {
                cached
            }
            _ => {
                let produced = instance.set_input_format(&cursor_format, input_count)?;
                let id = self.transforms.len();
                self.transforms.push(instance);
                self.transform_counts.push((input_count, produced));
                if !self.cache.contains_key(&key) {
                    self.cache.insert(key.clone(), id);
                    new_cache_keys.push(key);
                }
                id
            }
        };

        let buffers_count = self.transform_counts[transform_id].1;
        let node_id = self.nodes.len();
        self.nodes.push(Node {
            parent: Some(cursor),
            transform: transform_id,
            children: Vec::new(),
            feature: None,
            buffers_count,
            binding: None,
            next: None,
            slices: Vec::new(),
            elapsed: Duration::ZERO,
            features_through: Vec::new(),
        });
        self.nodes[cursor].children.push(node_id);
        Ok(node_id)
    }

    /// Structural format identity used for deduplication, stricter than the
    /// id-based equality of `BufferFormat`.
    fn formats_identical(&self, a: &BufferFormat, b: &BufferFormat) -> bool {
        a.id() == b.id() && a.size() == b.size() && a.sampling_rate() == b.sampling_rate()
    }

    /// Freezes the tree: initializes every distinct transform, wires the
    /// execution order and runs the allocation planner. No features can be
    /// added afterwards.
    pub fn prepare_for_execution(&mut self) -> SfeResult<()> {
        if self.frozen {
            return Err(SfeError::TreeIsFrozen);
        }
        if self.features.is_empty() {
            return Err(SfeError::EmptyTree);
        }
        for transform in &mut self.transforms {
            transform.initialize()?;
        }
        self.exec_order = self.execution_order();
        for i in 0..self.exec_order.len() {
            let next = self.exec_order.get(i + 1).copied();
            self.nodes[self.exec_order[i]].next = next;
        }
        crate::planner::plan(self)?;
        self.frozen = true;
        log::debug!(
            "tree prepared: {} nodes, {} distinct transforms, {} features, arena of {} bytes",
            self.node_count(),
            self.transform_count(),
            self.features.len(),
            self.arena.as_ref().map_or(0, |a| a.len())
        );
        Ok(())
    }

    /// Depth-first, left-to-right, parents before children.
    fn execution_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    pub(crate) fn class_of(&self, node: NodeId) -> &'static str {
        self.transforms[self.nodes[node].transform].name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(c, p)| (c.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn add_feature_builds_a_chain_with_a_converter() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        tree.add_feature(
            "Energy",
            &chain(&[("Window", "type=rectangular,length=512,step=205"), ("Energy", "")]),
        )
        .unwrap();
        // Root -> Int16ToFloat -> Window -> Energy.
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.class_of(tree.nodes[1].children[0]), "Window");
        assert_eq!(tree.features(), &["Energy".to_string()]);
    }

    #[test]
    fn shared_prefixes_merge_into_one_branch() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        let prefix = [("Window", "length=512,step=205"), ("RDFT", ""), ("ComplexMagnitude", "")];
        for feature in ["Centroid", "Rolloff", "Flux"] {
            let mut entries = prefix.to_vec();
            entries.push((feature, ""));
            tree.add_feature(feature, &chain(&entries)).unwrap();
        }
        // Converter + Window + RDFT + ComplexMagnitude shared, then 3 tails.
        assert_eq!(tree.node_count(), 4 + 3);
    }

    #[test]
    fn different_parameters_fork_the_branch() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        tree.add_feature("A", &chain(&[("Window", "length=512"), ("Energy", "")]))
            .unwrap();
        tree.add_feature("B", &chain(&[("Window", "length=256"), ("Energy", "")]))
            .unwrap();
        // Converter shared; two Window nodes with different parameters and
        // two Energy nodes.
        assert_eq!(tree.node_count(), 1 + 2 + 2);
    }

    #[test]
    fn equal_transforms_on_different_branches_share_the_instance() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        tree.add_feature(
            "A",
            &chain(&[("Window", "length=512,type=rectangular"), ("Log", "")]),
        )
        .unwrap();
        tree.add_feature(
            "B",
            &chain(&[("Window", "length=512,type=hamming"), ("Log", "")]),
        )
        .unwrap();
        // Two branches but the Log instances deduplicate: converter, two
        // Windows, two Log *nodes* backed by one Log *transform*.
        assert_eq!(tree.node_count(), 5);
        let log_nodes: Vec<_> = (1..tree.nodes.len())
            .filter(|&n| tree.class_of(n) == "Log")
            .collect();
        assert_eq!(log_nodes.len(), 2);
        assert_eq!(
            tree.nodes[log_nodes[0]].transform,
            tree.nodes[log_nodes[1]].transform
        );
    }

    #[test]
    fn duplicate_feature_names_are_rejected() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        tree.add_feature("A", &chain(&[("Identity", "")])).unwrap();
        let err = tree.add_feature("A", &chain(&[("Identity", "")])).unwrap_err();
        assert_eq!(err.category(), "DuplicateFeatureName");
    }

    #[test]
    fn identical_chains_collide() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        tree.add_feature("A", &chain(&[("Window", ""), ("Energy", "")]))
            .unwrap();
        let err = tree
            .add_feature("B", &chain(&[("Window", ""), ("Energy", "")]))
            .unwrap_err();
        match err {
            SfeError::ChainCollision { existing, new } => {
                assert_eq!(existing, "A");
                assert_eq!(new, "B");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_transform_is_reported() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        let err = tree
            .add_feature("A", &chain(&[("Bogus", "")]))
            .unwrap_err();
        assert_eq!(err.category(), "TransformNotRegistered");
    }

    #[test]
    fn failed_insertion_leaves_the_tree_untouched() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        tree.add_feature("A", &chain(&[("Window", ""), ("Energy", "")]))
            .unwrap();
        let nodes_before = tree.node_count();
        let transforms_before = tree.transform_count();

        // Fails midway: Window is fine, FilterBank(number=-1) is not.
        let err = tree
            .add_feature(
                "B",
                &chain(&[("Window", ""), ("RDFT", ""), ("FilterBank", "number=-1")]),
            )
            .unwrap_err();
        assert_eq!(err.category(), "InvalidValue");
        assert_eq!(tree.node_count(), nodes_before);
        assert_eq!(tree.transform_count(), transforms_before);
        assert!(!tree.is_frozen());
        assert_eq!(tree.features(), &["A".to_string()]);

        // The tree still works afterwards.
        tree.add_feature("C", &chain(&[("Window", ""), ("RDFT", "")]))
            .unwrap();
    }

    #[test]
    fn frozen_tree_rejects_new_features() {
        let mut tree = TransformTree::new(4096, 16000).unwrap();
        tree.add_feature("A", &chain(&[("Window", "length=512"), ("Energy", "")]))
            .unwrap();
        tree.prepare_for_execution().unwrap();
        let err = tree.add_feature("B", &chain(&[("Identity", "")])).unwrap_err();
        assert_eq!(err.category(), "TreeIsFrozen");
        let err = tree.prepare_for_execution().unwrap_err();
        assert_eq!(err.category(), "TreeIsFrozen");
    }

    #[test]
    fn empty_tree_cannot_be_prepared() {
        let mut tree = TransformTree::new(4096, 16000).unwrap();
        let err = tree.prepare_for_execution().unwrap_err();
        assert_eq!(err.category(), "EmptyTree");
    }

    #[test]
    fn every_edge_is_format_compatible() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        tree.add_feature_from_text(
            "MFCC[Preemphasis(value=0.9),Window(length=512,step=205),RDFT,SpectralEnergy,\
             FilterBank(number=40),Log,DCT,Selector(length=16)]",
        )
        .unwrap();
        tree.add_feature_from_text(
            "ZCR[Window(length=512,step=205,type=rectangular),ZeroCrossings,Merge,Stats]",
        )
        .unwrap();
        for (id, node) in tree.nodes.iter().enumerate().skip(1) {
            let parent = node.parent.unwrap();
            let child_in = tree.transforms[node.transform].input_format();
            let parent_out = tree.transforms[tree.nodes[parent].transform].output_format();
            assert_eq!(
                child_in.id(),
                parent_out.id(),
                "edge {} -> {}",
                tree.class_of(parent),
                tree.class_of(id)
            );
            assert_eq!(child_in.size(), parent_out.size());
        }
    }

    #[test]
    fn execution_order_is_topological() {
        let mut tree = TransformTree::new(48000, 16000).unwrap();
        tree.add_feature("A", &chain(&[("Window", ""), ("RDFT", ""), ("SpectralEnergy", "")]))
            .unwrap();
        tree.add_feature("B", &chain(&[("Window", ""), ("RDFT", ""), ("ComplexMagnitude", "")]))
            .unwrap();
        let order = tree.execution_order();
        let position: HashMap<_, _> = order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        for (id, node) in tree.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                assert!(position[&parent] < position[&id]);
            }
        }
        assert_eq!(order.len(), tree.nodes.len());
    }
}
