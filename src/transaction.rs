//! Transaction record: the (id -> amount) maps for both sides.
//!
//! Immutable after construction and safe to share read-only across the
//! worker pool. Iteration order is the insertion order of the id lists;
//! that order is canonical for everything downstream (index mapping,
//! partition enumeration, CSV cells).

use crate::amount::{Amount, SignedAmount};
use anyhow::{bail, Result};
use std::collections::HashMap;

/// Which side of the transaction a lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Inputs,
    Outputs,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionRecord {
    inputs: HashMap<String, Amount>,
    outputs: HashMap<String, Amount>,
    input_ids: Vec<String>,
    output_ids: Vec<String>,
}

impl TransactionRecord {
    pub fn new() -> TransactionRecord {
        TransactionRecord::default()
    }

    /// Append an input. Duplicate ids, empty ids and zero amounts are
    /// construction errors.
    pub fn add_input(&mut self, id: impl Into<String>, amount: Amount) -> Result<()> {
        let id = id.into();
        Self::validate(&id, amount, self.inputs.contains_key(&id), "input")?;
        self.inputs.insert(id.clone(), amount);
        self.input_ids.push(id);
        Ok(())
    }

    /// Append an output. Same construction rules as [`add_input`](Self::add_input).
    pub fn add_output(&mut self, id: impl Into<String>, amount: Amount) -> Result<()> {
        let id = id.into();
        Self::validate(&id, amount, self.outputs.contains_key(&id), "output")?;
        self.outputs.insert(id.clone(), amount);
        self.output_ids.push(id);
        Ok(())
    }

    fn validate(id: &str, amount: Amount, duplicate: bool, side: &str) -> Result<()> {
        if id.is_empty() {
            bail!("{} id must not be empty", side);
        }
        if amount == Amount::ZERO {
            bail!("{} {} has non-positive amount", side, id);
        }
        if duplicate {
            bail!("duplicate {} id: {}", side, id);
        }
        Ok(())
    }

    /// Value of an input id; ids not in the record read as zero.
    pub fn input_value(&self, id: &str) -> Amount {
        self.inputs.get(id).copied().unwrap_or(Amount::ZERO)
    }

    /// Value of an output id; ids not in the record read as zero.
    pub fn output_value(&self, id: &str) -> Amount {
        self.outputs.get(id).copied().unwrap_or(Amount::ZERO)
    }

    pub fn value(&self, side: Side, id: &str) -> Amount {
        match side {
            Side::Inputs => self.input_value(id),
            Side::Outputs => self.output_value(id),
        }
    }

    pub fn input_ids(&self) -> &[String] {
        &self.input_ids
    }

    pub fn output_ids(&self) -> &[String] {
        &self.output_ids
    }

    pub fn ids(&self, side: Side) -> &[String] {
        match side {
            Side::Inputs => &self.input_ids,
            Side::Outputs => &self.output_ids,
        }
    }

    /// Group sum over input ids.
    pub fn sum_inputs<'a, I>(&self, ids: I) -> Amount
    where
        I: IntoIterator<Item = &'a String>,
    {
        ids.into_iter().map(|id| self.input_value(id)).sum()
    }

    /// Group sum over output ids.
    pub fn sum_outputs<'a, I>(&self, ids: I) -> Amount
    where
        I: IntoIterator<Item = &'a String>,
    {
        ids.into_iter().map(|id| self.output_value(id)).sum()
    }

    pub fn total_input_value(&self) -> Amount {
        self.sum_inputs(&self.input_ids)
    }

    pub fn total_output_value(&self) -> Amount {
        self.sum_outputs(&self.output_ids)
    }

    /// Fee = inputs - outputs; negative when the transaction does not
    /// conserve value. The engine still analyzes such records.
    pub fn fee(&self) -> SignedAmount {
        self.total_input_value().sub_signed(self.total_output_value())
    }

    pub fn is_valid(&self) -> bool {
        self.total_input_value() >= self.total_output_value()
    }
}
