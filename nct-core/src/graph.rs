//! Feature correlation graph for one NCT entry.
//!
//! Every synapse `(feature_i, feature_t)` of every neuron is an undirected
//! co-activation link between two features. The builder deduplicates these
//! links, gives each one a single owner, and derives a normalized importance
//! per feature from how many links it owns.
//!
//! # Degrees
//!
//! Two different degrees are tracked and must not be confused:
//!
//! - **pair degree**: number of distinct pairs a feature participates in.
//!   Only used to decide which endpoint owns a pair.
//! - **ownership degree**: number of partners a feature owns. Importance is
//!   derived from this one, so a feature that never owns a pair has
//!   importance `0.0` even if its pair degree is high.
//!
//! # Ownership
//!
//! The endpoint with the strictly larger pair degree owns the pair. On a tie
//! the numerically smaller id owns it. The edge is stored once, under the
//! owner.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::observer::{BuildObserver, BuildStats};
use crate::types::{FeatureId, MetaDescription, NctEntry, NeuronIndex, PairKey};

/// Number of partners reported by [`CorrelationGraph::feature_stats`].
pub const STATS_TOP_PARTNERS: usize = 5;

/// Partner of a feature together with the partner's importance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PartnerScore {
    pub feature_id: FeatureId,
    pub importance: f64,
}

/// Per-feature summary used by `nct-graph inspect`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureStats {
    pub feature_id: FeatureId,
    pub importance: f64,
    /// Distinct pairs the feature participates in (pair degree), owned or not.
    ///
    /// Differs from `partners_count`, which only counts owned pairs. A
    /// feature that lost every pair to its partners has `occurrences > 0`
    /// and `partners_count == 0`.
    pub occurrences: usize,
    pub neurons_involved: usize,
    pub partners_count: usize,
    pub top_partners: Vec<PartnerScore>,
}

/// Correlation graph built from one NCT entry.
///
/// Immutable after construction. Independent instances share no state, so
/// several NCT entries can be built on separate threads.
pub struct CorrelationGraph {
    nct_index: usize,
    neuron_count: usize,
    pair_count: usize,
    /// feature -> distinct pairs it appears in
    pair_degree: BTreeMap<FeatureId, usize>,
    /// owner -> partner -> partner's pair degree at ownership time
    feature_partners: BTreeMap<FeatureId, BTreeMap<FeatureId, usize>>,
    /// owner -> number of partners owned
    feature_degree: BTreeMap<FeatureId, usize>,
    feature_importance: BTreeMap<FeatureId, f64>,
    neurons_by_feature: BTreeMap<FeatureId, BTreeSet<NeuronIndex>>,
    max_degree: usize,
    observer: Arc<dyn BuildObserver>,
}

impl fmt::Debug for CorrelationGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationGraph")
            .field("nct_index", &self.nct_index)
            .field("pair_count", &self.pair_count)
            .field("owner_count", &self.feature_partners.len())
            .field("max_degree", &self.max_degree)
            .finish_non_exhaustive()
    }
}

impl CorrelationGraph {
    /// Load `meta_path` and build the graph for entry `nct_index`.
    pub fn from_meta_path(
        meta_path: impl AsRef<Path>,
        nct_index: usize,
        observer: Arc<dyn BuildObserver>,
    ) -> Result<Self> {
        let meta = MetaDescription::load(meta_path)?;
        Self::build(&meta, nct_index, observer)
    }

    /// Build the graph for entry `nct_index` of an already parsed meta description.
    ///
    /// # Errors
    ///
    /// - `IndexOutOfRange` if the entry does not exist
    /// - `EmptyGraph` if the entry contains no pair of distinct features
    pub fn build(
        meta: &MetaDescription,
        nct_index: usize,
        observer: Arc<dyn BuildObserver>,
    ) -> Result<Self> {
        let entry = meta.entry(nct_index)?;
        debug!(
            nct_index,
            neurons = entry.synapses.len(),
            synapses = entry.synapse_count(),
            declared_neurons = meta.neurons_count,
            declared_features = meta.feature_count,
            "Building correlation graph"
        );
        Self::from_entry(entry, nct_index, observer)
    }

    /// Build the graph from a single entry.
    pub fn from_entry(
        entry: &NctEntry,
        nct_index: usize,
        observer: Arc<dyn BuildObserver>,
    ) -> Result<Self> {
        let mut neurons_by_feature: BTreeMap<FeatureId, BTreeSet<NeuronIndex>> = BTreeMap::new();
        let mut unique_pairs: BTreeSet<PairKey> = BTreeSet::new();
        let mut pair_degree: BTreeMap<FeatureId, usize> = BTreeMap::new();

        // Pass 1: raw usage and deduplicated pair degree
        for (neuron_idx, neuron_synapses) in entry.synapses.iter().enumerate() {
            for synapse in neuron_synapses {
                for feature_id in [synapse.0, synapse.1] {
                    neurons_by_feature
                        .entry(feature_id)
                        .or_default()
                        .insert(neuron_idx);
                }

                let key = PairKey::from(*synapse);
                if key.is_self_pair() {
                    continue;
                }
                if unique_pairs.insert(key) {
                    *pair_degree.entry(key.low()).or_insert(0) += 1;
                    *pair_degree.entry(key.high()).or_insert(0) += 1;
                }
            }
        }

        // Pass 2: ownership, against the final pair degrees
        let mut feature_partners: BTreeMap<FeatureId, BTreeMap<FeatureId, usize>> =
            BTreeMap::new();
        for key in &unique_pairs {
            let degree_low = pair_degree.get(&key.low()).copied().unwrap_or(0);
            let degree_high = pair_degree.get(&key.high()).copied().unwrap_or(0);

            let (owner, partner, partner_degree) = if degree_high > degree_low {
                (key.high(), key.low(), degree_low)
            } else {
                (key.low(), key.high(), degree_high)
            };

            feature_partners
                .entry(owner)
                .or_default()
                .insert(partner, partner_degree);
        }

        let feature_degree: BTreeMap<FeatureId, usize> = feature_partners
            .iter()
            .map(|(&owner, partners)| (owner, partners.len()))
            .collect();

        let max_degree = match feature_degree.values().copied().max() {
            Some(max) if max > 0 => max,
            _ => return Err(GraphError::EmptyGraph { nct_index }),
        };

        let mut feature_importance = BTreeMap::new();
        for &feature_id in feature_degree.keys().chain(neurons_by_feature.keys()) {
            let degree = feature_degree.get(&feature_id).copied().unwrap_or(0);
            let importance = (degree as f64 / max_degree as f64).min(1.0);
            feature_importance.insert(feature_id, importance);
        }

        let graph = Self {
            nct_index,
            neuron_count: entry.synapses.len(),
            pair_count: unique_pairs.len(),
            pair_degree,
            feature_partners,
            feature_degree,
            feature_importance,
            neurons_by_feature,
            max_degree,
            observer,
        };

        graph.observer.graph_built(&graph.stats());
        Ok(graph)
    }

    /// Index of the NCT entry this graph was built from.
    pub fn nct_index(&self) -> usize {
        self.nct_index
    }

    /// Largest ownership degree.
    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Number of distinct undirected pairs.
    pub fn pair_count(&self) -> usize {
        self.pair_count
    }

    /// Number of features owning at least one edge.
    pub fn owner_count(&self) -> usize {
        self.feature_partners.len()
    }

    pub fn stats(&self) -> BuildStats {
        BuildStats {
            nct_index: self.nct_index,
            owner_count: self.owner_count(),
            max_degree: self.max_degree,
            pair_count: self.pair_count,
            referenced_features: self.neurons_by_feature.len(),
            neuron_count: self.neuron_count,
        }
    }

    pub(crate) fn observer(&self) -> &dyn BuildObserver {
        self.observer.as_ref()
    }

    /// Importance of a feature, `0.0` for unknown ids.
    pub fn feature_importance(&self, feature_id: FeatureId) -> f64 {
        self.feature_importance
            .get(&feature_id)
            .copied()
            .unwrap_or(0.0)
    }

    /// Distinct pairs the feature participates in.
    pub fn pair_degree(&self, feature_id: FeatureId) -> usize {
        self.pair_degree.get(&feature_id).copied().unwrap_or(0)
    }

    /// Number of partners the feature owns.
    pub fn ownership_degree(&self, feature_id: FeatureId) -> usize {
        self.feature_degree.get(&feature_id).copied().unwrap_or(0)
    }

    /// Neurons referencing the feature, ascending. Empty for unknown ids.
    pub fn neurons_for(&self, feature_id: FeatureId) -> Vec<NeuronIndex> {
        self.neurons_by_feature
            .get(&feature_id)
            .map(|neurons| neurons.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Partner -> partner pair degree for an owner.
    pub fn partner_map(&self, feature_id: FeatureId) -> Option<&BTreeMap<FeatureId, usize>> {
        self.feature_partners.get(&feature_id)
    }

    /// Partners owned by `feature_id`, in ascending partner id order.
    ///
    /// This order is NOT by importance: `top_n` simply keeps the first `n`
    /// entries. Use [`top_partners`](Self::top_partners) for "best" partners.
    pub fn partners(&self, feature_id: FeatureId, top_n: Option<usize>) -> Vec<FeatureId> {
        let Some(partners) = self.feature_partners.get(&feature_id) else {
            return Vec::new();
        };
        let limit = top_n.unwrap_or(usize::MAX);
        partners.keys().copied().take(limit).collect()
    }

    /// Up to `n` owned partners, by partner importance descending (ties by id).
    pub fn top_partners(&self, feature_id: FeatureId, n: usize) -> Vec<PartnerScore> {
        let mut ids = self.partners(feature_id, None);
        self.sort_by_importance(&mut ids);
        ids.into_iter()
            .take(n)
            .map(|id| PartnerScore {
                feature_id: id,
                importance: self.feature_importance(id),
            })
            .collect()
    }

    /// Every feature that owns an edge or is referenced by a neuron, ascending.
    pub fn feature_ids(&self) -> Vec<FeatureId> {
        let ids: BTreeSet<FeatureId> = self
            .feature_degree
            .keys()
            .chain(self.neurons_by_feature.keys())
            .copied()
            .collect();
        ids.into_iter().collect()
    }

    /// True if the feature appears anywhere in the graph.
    pub fn contains(&self, feature_id: FeatureId) -> bool {
        self.neurons_by_feature.contains_key(&feature_id)
            || self.feature_partners.contains_key(&feature_id)
    }

    /// Summary of one feature.
    pub fn feature_stats(&self, feature_id: FeatureId) -> FeatureStats {
        FeatureStats {
            feature_id,
            importance: self.feature_importance(feature_id),
            occurrences: self.pair_degree(feature_id),
            neurons_involved: self
                .neurons_by_feature
                .get(&feature_id)
                .map_or(0, BTreeSet::len),
            partners_count: self.ownership_degree(feature_id),
            top_partners: self.top_partners(feature_id, STATS_TOP_PARTNERS),
        }
    }

    /// Stable sort by importance descending; equal scores keep their input order.
    pub(crate) fn sort_by_importance(&self, ids: &mut [FeatureId]) {
        ids.sort_by(|a, b| {
            self.feature_importance(*b)
                .total_cmp(&self.feature_importance(*a))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::testing::RecordingObserver;
    use crate::observer::SilentObserver;
    use crate::types::Synapse;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn entry(synapses: &[&[(FeatureId, FeatureId)]]) -> NctEntry {
        NctEntry::new(
            synapses
                .iter()
                .map(|neuron| neuron.iter().map(|&(i, t)| Synapse(i, t)).collect())
                .collect(),
        )
    }

    fn build(synapses: &[&[(FeatureId, FeatureId)]]) -> Result<CorrelationGraph> {
        CorrelationGraph::from_entry(&entry(synapses), 0, Arc::new(SilentObserver))
    }

    #[test]
    fn test_two_neuron_scenario() {
        let graph = build(&[&[(1, 2)], &[(2, 1), (3, 4)]]).unwrap();

        assert_eq!(graph.pair_count(), 2);
        for feature in 1..=4 {
            assert_eq!(graph.pair_degree(feature), 1);
        }

        // Ties go to the smaller id
        assert_eq!(graph.partners(1, None), vec![2]);
        assert_eq!(graph.partners(3, None), vec![4]);
        assert!(graph.partners(2, None).is_empty());
        assert!(graph.partners(4, None).is_empty());

        assert_eq!(graph.max_degree(), 1);
        assert_eq!(graph.feature_importance(1), 1.0);
        assert_eq!(graph.feature_importance(3), 1.0);
        assert_eq!(graph.feature_importance(2), 0.0);
        assert_eq!(graph.feature_importance(4), 0.0);

        assert_eq!(graph.neurons_for(1), vec![0, 1]);
        assert_eq!(graph.neurons_for(2), vec![0, 1]);
        assert_eq!(graph.neurons_for(3), vec![1]);
        assert_eq!(graph.neurons_for(4), vec![1]);
    }

    #[test]
    fn test_repeated_pair_counted_once() {
        let graph = build(&[&[(5, 6), (6, 5)], &[(5, 6)], &[(6, 5)]]).unwrap();
        assert_eq!(graph.pair_count(), 1);
        assert_eq!(graph.pair_degree(5), 1);
        assert_eq!(graph.pair_degree(6), 1);
        assert_eq!(graph.neurons_for(5), vec![0, 1, 2]);
    }

    #[test]
    fn test_owner_is_higher_degree_endpoint() {
        // 9 has pair degree 3, so it owns its pairs despite the larger id
        let graph = build(&[&[(1, 9), (2, 9)], &[(3, 9), (1, 2)]]).unwrap();

        let partners = graph.partner_map(9).unwrap();
        assert_eq!(partners.len(), 3);
        assert_eq!(partners[&1], 2);
        assert_eq!(partners[&2], 2);
        assert_eq!(partners[&3], 1);

        assert_eq!(graph.partners(1, None), vec![2]);
        assert_eq!(graph.ownership_degree(9), 3);
        assert_eq!(graph.ownership_degree(1), 1);
        assert_eq!(graph.ownership_degree(3), 0);

        assert_eq!(graph.feature_importance(9), 1.0);
        assert!((graph.feature_importance(1) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_importance_uses_ownership_degree() {
        // Every feature in the triangle has pair degree 2, but ownership is 2/1/0
        let graph = build(&[&[(1, 2), (1, 3), (2, 3)], &[(4, 5)]]).unwrap();

        assert_eq!(graph.pair_degree(3), 2);
        assert_eq!(graph.ownership_degree(3), 0);
        assert_eq!(graph.max_degree(), 2);
        assert_eq!(graph.feature_importance(1), 1.0);
        assert_eq!(graph.feature_importance(2), 0.5);
        assert_eq!(graph.feature_importance(4), 0.5);
        assert_eq!(graph.feature_importance(3), 0.0);
        assert_eq!(graph.feature_importance(5), 0.0);
    }

    #[test]
    fn test_self_pair_registers_usage_only() {
        let graph = build(&[&[(7, 7)], &[(1, 2)]]).unwrap();
        assert_eq!(graph.pair_count(), 1);
        assert_eq!(graph.neurons_for(7), vec![0]);
        assert_eq!(graph.pair_degree(7), 0);
        assert!(graph.partners(7, None).is_empty());
        assert!(graph.feature_ids().contains(&7));
        assert_eq!(graph.feature_importance(7), 0.0);
    }

    #[test]
    fn test_empty_graph_errors() {
        let err = build(&[&[]]).unwrap_err();
        assert!(matches!(err, GraphError::EmptyGraph { nct_index: 0 }));

        let err = build(&[&[(3, 3)], &[(4, 4)]]).unwrap_err();
        assert!(matches!(err, GraphError::EmptyGraph { .. }));

        let err = build(&[]).unwrap_err();
        assert!(matches!(err, GraphError::EmptyGraph { .. }));
    }

    #[test]
    fn test_index_out_of_range() {
        let meta = MetaDescription {
            ncts: vec![entry(&[&[(1, 2)]]), entry(&[&[(3, 4)]])],
            neurons_count: 1,
            feature_count: 4,
        };
        let err = CorrelationGraph::build(&meta, 5, Arc::new(SilentObserver)).unwrap_err();
        assert!(matches!(err, GraphError::IndexOutOfRange { index: 5, len: 2 }));

        let graph = CorrelationGraph::build(&meta, 1, Arc::new(SilentObserver)).unwrap();
        assert_eq!(graph.nct_index(), 1);
        assert_eq!(graph.partners(3, None), vec![4]);
    }

    #[test]
    fn test_unknown_feature_queries() {
        let graph = build(&[&[(1, 2)]]).unwrap();
        assert_eq!(graph.feature_importance(42), 0.0);
        assert!(graph.partners(42, Some(3)).is_empty());
        assert!(graph.neurons_for(42).is_empty());
        assert!(!graph.contains(42));
        let stats = graph.feature_stats(42);
        assert_eq!(stats.neurons_involved, 0);
        assert!(stats.top_partners.is_empty());
    }

    #[test]
    fn test_partners_truncation_keeps_construction_order() {
        let graph = build(&[&[(1, 5), (1, 3), (1, 4), (1, 2)]]).unwrap();
        assert_eq!(graph.partners(1, None), vec![2, 3, 4, 5]);
        assert_eq!(graph.partners(1, Some(2)), vec![2, 3]);
        assert!(graph.partners(1, Some(0)).is_empty());
    }

    #[test]
    fn test_top_partners_sorted_by_importance() {
        // 10 owns 1..=4; 3 also owns 20 and 21 so it outranks the others
        let graph = build(&[&[(10, 1), (10, 2), (10, 3), (10, 4)], &[(3, 20), (3, 21)]]).unwrap();
        assert_eq!(graph.partners(10, None), vec![1, 2, 3, 4]);
        assert_eq!(graph.feature_importance(3), 0.5);

        let top = graph.top_partners(10, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].feature_id, 3);
        assert!(top[0].importance > 0.0);
        // equal importance falls back to ascending id
        assert_eq!(top[1].feature_id, 1);
    }

    #[test]
    fn test_feature_stats() {
        let graph = build(&[&[(1, 2), (1, 3)], &[(2, 3)]]).unwrap();
        let stats = graph.feature_stats(1);
        assert_eq!(stats.feature_id, 1);
        assert_eq!(stats.importance, 1.0);
        assert_eq!(stats.occurrences, 2);
        assert_eq!(stats.neurons_involved, 1);
        assert_eq!(stats.partners_count, 2);
        assert_eq!(stats.top_partners[0].feature_id, 2);
    }

    #[test]
    fn test_feature_stats_occurrences_count_unowned_pairs() {
        // 9 owns all three pairs, so 1 participates in one pair but owns none
        let graph = build(&[&[(1, 9), (2, 9)], &[(3, 9)]]).unwrap();
        let stats = graph.feature_stats(1);
        assert_eq!(stats.occurrences, 1);
        assert_eq!(stats.partners_count, 0);

        let owner = graph.feature_stats(9);
        assert_eq!(owner.occurrences, 3);
        assert_eq!(owner.partners_count, 3);
    }

    #[test]
    fn test_observer_receives_stats() {
        let observer = Arc::new(RecordingObserver::default());
        let graph =
            CorrelationGraph::from_entry(&entry(&[&[(1, 2)], &[(3, 4)]]), 4, observer.clone())
                .unwrap();

        let built = observer.built.lock().unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0], graph.stats());
        assert_eq!(built[0].nct_index, 4);
        assert_eq!(built[0].owner_count, 2);
        assert_eq!(built[0].max_degree, 1);
        assert_eq!(built[0].referenced_features, 4);
        assert_eq!(built[0].neuron_count, 2);
    }

    #[test]
    fn test_failed_build_does_not_notify() {
        let observer = Arc::new(RecordingObserver::default());
        let result = CorrelationGraph::from_entry(&entry(&[&[]]), 0, observer.clone());
        assert!(result.is_err());
        assert!(observer.built.lock().unwrap().is_empty());
    }

    fn synapse_lists() -> impl Strategy<Value = Vec<Vec<(FeatureId, FeatureId)>>> {
        prop::collection::vec(
            prop::collection::vec((0i64..12, 0i64..12), 0..6),
            0..8,
        )
    }

    proptest! {
        #[test]
        fn prop_graph_invariants(raw in synapse_lists()) {
            let nct = NctEntry::new(
                raw.iter()
                    .map(|n| n.iter().map(|&(i, t)| Synapse(i, t)).collect())
                    .collect(),
            );
            let expected_pairs: BTreeSet<PairKey> = raw
                .iter()
                .flatten()
                .map(|&(i, t)| PairKey::normalize(i, t))
                .filter(|k| !k.is_self_pair())
                .collect();

            let graph = match CorrelationGraph::from_entry(&nct, 0, Arc::new(SilentObserver)) {
                Ok(graph) => graph,
                Err(GraphError::EmptyGraph { .. }) => {
                    prop_assert!(expected_pairs.is_empty());
                    return Ok(());
                }
                Err(other) => return Err(TestCaseError::fail(other.to_string())),
            };

            // Each pair stored exactly once, under exactly one endpoint
            let mut stored: Vec<PairKey> = Vec::new();
            for owner in graph.feature_ids() {
                for partner in graph.partners(owner, None) {
                    stored.push(PairKey::normalize(owner, partner));
                }
            }
            let stored_set: BTreeSet<PairKey> = stored.iter().copied().collect();
            prop_assert_eq!(stored.len(), stored_set.len());
            prop_assert_eq!(&stored_set, &expected_pairs);
            prop_assert_eq!(graph.pair_count(), expected_pairs.len());

            // Pair degree counts each distinct pair once
            for feature in graph.feature_ids() {
                let expected = expected_pairs
                    .iter()
                    .filter(|k| k.low() == feature || k.high() == feature)
                    .count();
                prop_assert_eq!(graph.pair_degree(feature), expected);
            }

            // Importance bounded, maximum reached
            let ids = graph.feature_ids();
            let bounded = ids
                .iter()
                .all(|&f| (0.0..=1.0).contains(&graph.feature_importance(f)));
            let reaches_max = ids.iter().any(|&f| graph.feature_importance(f) == 1.0);
            prop_assert!(bounded);
            prop_assert!(reaches_max);

            // Raw usage covers every referenced feature and neuron
            let mut usage: BTreeMap<FeatureId, HashSet<usize>> = BTreeMap::new();
            for (neuron, synapses) in raw.iter().enumerate() {
                for &(i, t) in synapses {
                    usage.entry(i).or_default().insert(neuron);
                    usage.entry(t).or_default().insert(neuron);
                }
            }
            prop_assert_eq!(ids.len(), usage.len());
            for (feature, neurons) in &usage {
                let mut expected: Vec<usize> = neurons.iter().copied().collect();
                expected.sort_unstable();
                prop_assert_eq!(graph.neurons_for(*feature), expected);
            }
        }
    }
}
