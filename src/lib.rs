//! txflow - forensic enumeration of plausible value flows inside a
//! Bitcoin transaction.
//!
//! Only the aggregate inputs and outputs of a transaction are observable
//! on-chain. Given those, the engine enumerates every structurally
//! plausible internal flow: all pairs of equal-block-count set partitions
//! of the two sides, together with every block bijection under which each
//! output group's value fits inside its matched input group. The search
//! space grows as B(n)·B(m)·k!, so enumeration is lazy and chunked, the
//! hopeless pairs are pruned up front, and the survivors are checked on a
//! worker pool that streams results to a CSV sink.

/// Fixed-precision satoshi arithmetic
pub mod amount;

/// Bell and Stirling tables for sizing the search
pub mod bell;

/// Bijection enumeration for surviving partition pairs
pub mod checker;

/// Parallel dispatcher over partition chunk cross products
pub mod engine;

/// Id <-> compact index mapping
pub mod mapper;

/// Bitcoin node JSON-RPC collaborator
pub mod node_client;

/// Lazy chunked set-partition generator
pub mod partitions;

/// Wall-clock progress reporting
pub mod progress;

/// Sorted-dominance pair rejection
pub mod pruner;

/// Serialized CSV sink for valid mappings
pub mod sink;

/// Degenerate subset-pair analysis mode
pub mod subsets;

/// Transaction record and group sums
pub mod transaction;
