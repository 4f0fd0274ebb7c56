//! Cascade-style parity bisection.
//!
//! Both peers walk the same block list in the same order. For every block
//! longer than one bit the initiator publishes its parity and the responder
//! answers whether its own block agrees. Agreeing blocks are kept minus
//! their last bit, since that bit is now public. Disagreeing blocks are
//! split in two and revisited depth-first. Single-bit blocks are dropped
//! without any exchange.

use super::{ProtocolError, Role};
use crate::bits::BitVector;
use crate::channel::Channel;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The shortened candidate secret.
    pub corrected: BitVector,
    /// Number of parity bits made public.
    pub parities_exchanged: usize,
    /// Number of blocks whose parities disagreed.
    pub mismatches: usize,
    /// Deepest bisection level at which a parity was exchanged.
    pub max_depth: usize,
}

/// Runs one bisection pass over `blocks` with the peer on `link`.
///
/// Both peers must pass blocks of identical lengths; the public exchange
/// then keeps them in lock-step and both outcomes have the same length.
pub fn reconcile<C: Channel + ?Sized>(
    role: Role,
    blocks: Vec<BitVector>,
    link: &mut C,
) -> Result<ReconcileOutcome, ProtocolError> {
    let mut kept: Vec<bool> = Vec::new();
    let mut parities_exchanged = 0;
    let mut mismatches = 0;
    let mut max_depth = 0;

    // LIFO worklist; pushing in reverse preserves left-to-right order.
    let mut pending: Vec<(BitVector, usize)> = blocks.into_iter().rev().map(|b| (b, 0)).collect();

    while let Some((block, depth)) = pending.pop() {
        if block.len() <= 1 {
            continue;
        }

        let matched = exchange_parity(role, &block, link)?;
        parities_exchanged += 1;
        max_depth = max_depth.max(depth);

        if matched {
            kept.extend_from_slice(&block.as_slice()[..block.len() - 1]);
        } else {
            mismatches += 1;
            let halves = block.partition_extra(block.len().div_ceil(2));
            pending.extend(halves.into_iter().rev().map(|half| (half, depth + 1)));
        }

        tracing::trace!(
            %role,
            len = block.len(),
            depth,
            matched,
            "parity exchanged"
        );
    }

    Ok(ReconcileOutcome {
        corrected: BitVector::from(kept),
        parities_exchanged,
        mismatches,
        max_depth,
    })
}

/// Publishes or checks one block parity. Returns true if both peers agree.
fn exchange_parity<C: Channel + ?Sized>(
    role: Role,
    block: &BitVector,
    link: &mut C,
) -> Result<bool, ProtocolError> {
    match role {
        Role::Initiator => {
            link.send_bit(block.parity())?;
            Ok(link.receive_bit()?)
        }
        Role::Responder => {
            let theirs = link.receive_bit()?;
            let matched = theirs == block.parity();
            link.send_bit(matched)?;
            Ok(matched)
        }
    }
}
