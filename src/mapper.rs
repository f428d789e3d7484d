//! Compact id <-> index mapping.
//!
//! Partitions are enumerated over u16 indices rather than id strings, so a
//! chunk of 500 partitions costs a few kilobytes instead of megabytes of
//! cloned strings. Ids reappear only at the CSV boundary.

use crate::amount::Amount;
use crate::partitions::{IndexPartition, IndexSet};
use crate::transaction::{Side, TransactionRecord};
use anyhow::{bail, Result};
use std::collections::HashMap;

pub struct ElementMapper {
    elements: Vec<String>,
    index_of: HashMap<String, u16>,
}

impl ElementMapper {
    /// Build a mapper over one side's ordered id list.
    ///
    /// u16 indices cap a side at 65 536 elements, far beyond anything the
    /// search space makes tractable.
    pub fn new(ids: &[String]) -> Result<ElementMapper> {
        if ids.len() > u16::MAX as usize + 1 {
            bail!("too many elements for 16-bit indices: {}", ids.len());
        }
        let mut index_of = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            index_of.insert(id.clone(), i as u16);
        }
        Ok(ElementMapper {
            elements: ids.to_vec(),
            index_of,
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<u16> {
        self.index_of.get(id).copied()
    }

    pub fn id_at(&self, index: u16) -> &str {
        &self.elements[index as usize]
    }

    pub fn to_ids(&self, set: &IndexSet) -> Vec<String> {
        set.iter().map(|&i| self.elements[i as usize].clone()).collect()
    }

    pub fn partition_to_ids(&self, partition: &IndexPartition) -> Vec<Vec<String>> {
        partition.iter().map(|set| self.to_ids(set)).collect()
    }

    /// Index-ordered amount table for one side of a record. Workers sum
    /// blocks through this table without touching the id strings.
    pub fn amounts(&self, record: &TransactionRecord, side: Side) -> Vec<Amount> {
        self.elements
            .iter()
            .map(|id| record.value(side, id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let ids: Vec<String> = ["in0", "in1", "in2"].iter().map(|s| s.to_string()).collect();
        let mapper = ElementMapper::new(&ids).unwrap();
        assert_eq!(mapper.len(), 3);
        for (i, id) in ids.iter().enumerate() {
            let idx = mapper.index_of(id).unwrap();
            assert_eq!(idx as usize, i);
            assert_eq!(mapper.id_at(idx), id);
        }
        assert_eq!(mapper.to_ids(&vec![0, 2]), vec!["in0", "in2"]);
    }

    #[test]
    fn test_partition_to_ids() {
        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mapper = ElementMapper::new(&ids).unwrap();
        let partition: IndexPartition = vec![vec![0, 1], vec![2]];
        assert_eq!(
            mapper.partition_to_ids(&partition),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
    }

    #[test]
    fn test_empty_side() {
        let mapper = ElementMapper::new(&[]).unwrap();
        assert!(mapper.is_empty());
        assert_eq!(mapper.index_of("anything"), None);
    }
}
