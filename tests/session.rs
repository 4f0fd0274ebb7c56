//! End-to-end protocol scenarios.
//!
//! Each test runs both peers on their own threads over real links and
//! checks the reports they return.

use privacy_amplification::{
    bits::BitVector,
    channel::{Channel, ChannelError, LinkConfig, LossyLink, PerfectLink},
    protocol::{run_session, AbortSignal, Initiator, ProtocolError, Responder, SessionConfig},
    source::ChaChaSource,
};
use std::thread;

/// Flips the last (least significant) bit of every message it sends.
struct FlipLast<C>(C);

impl<C: Channel> Channel for FlipLast<C> {
    fn send(&mut self, mut message: BitVector) -> Result<(), ChannelError> {
        if let Some(last) = message.len().checked_sub(1) {
            message.invert(last).expect("index in range");
        }
        self.0.send(message)
    }

    fn receive(&mut self) -> Result<BitVector, ChannelError> {
        self.0.receive()
    }
}

/// Raises `abort` as soon as the peer rejects a hash.
struct AbortOnReject<C> {
    inner: C,
    abort: AbortSignal,
}

impl<C: Channel> Channel for AbortOnReject<C> {
    fn send(&mut self, message: BitVector) -> Result<(), ChannelError> {
        self.inner.send(message)
    }

    fn receive(&mut self) -> Result<BitVector, ChannelError> {
        let message = self.inner.receive()?;
        if message.as_slice() == [false] {
            self.abort.abort();
        }
        Ok(message)
    }
}

/// Every bit inverted in transit: block parities of even-length blocks
/// always agree, so reconciliation can never converge.
fn inverting_link() -> LinkConfig {
    LinkConfig::seeded(1.0, 9)
}

#[test]
fn test_clean_channel_accepts_without_rounds() {
    let config = SessionConfig {
        secret_len: 8,
        min_secret_len: 1,
        ..Default::default()
    };

    let outcome = run_session(
        &config,
        &LinkConfig::seeded(0.0, 1),
        ChaChaSource::from_u64_seed(1),
        ChaChaSource::from_u64_seed(2),
        &AbortSignal::new(),
    )
    .expect("session failed");

    assert!(outcome.agreed());
    assert_eq!(outcome.initiator.secret.len(), 8);
    assert_eq!(outcome.initiator.rounds, 0);
    assert_eq!(outcome.responder.rounds, 0);
    assert!(!outcome.responder.twiddle_corrected);
    assert_eq!(outcome.responder.parities_revealed, 0);
}

#[test]
fn test_single_flip_fixed_by_twiddle() {
    let config = SessionConfig {
        secret_len: 64,
        ..Default::default()
    };
    let (public_a, public_b) = PerfectLink::pair();
    let (private_a, private_b) = PerfectLink::pair();

    let initiator = Initiator::new(config.clone(), ChaChaSource::from_u64_seed(3)).unwrap();
    let responder = Responder::new(config, ChaChaSource::from_u64_seed(4)).unwrap();

    let handle = thread::spawn(move || responder.run(public_b, private_b));
    let initiator_report = initiator
        .run(public_a, FlipLast(private_a))
        .expect("initiator failed");
    let responder_report = handle.join().unwrap().expect("responder failed");

    assert!(responder_report.twiddle_corrected);
    assert_eq!(responder_report.rounds, 0);
    assert_eq!(initiator_report.rounds, 0);
    assert_eq!(responder_report.secret.len(), 64);
    assert_eq!(initiator_report.secret, responder_report.secret);
}

#[test]
fn test_scattered_errors_reconciled() {
    let config = SessionConfig {
        secret_len: 512,
        ..Default::default()
    };

    let outcome = run_session(
        &config,
        &LinkConfig::seeded(0.03, 2024),
        ChaChaSource::from_u64_seed(5),
        ChaChaSource::from_u64_seed(6),
        &AbortSignal::new(),
    )
    .expect("session failed");

    let initiator = &outcome.initiator;
    let responder = &outcome.responder;

    assert!(outcome.agreed());
    assert!(!responder.twiddle_corrected);
    assert!(initiator.rounds >= 1);
    assert!(initiator.rounds <= config.max_rounds);
    assert_eq!(initiator.rounds, responder.rounds);
    assert_eq!(initiator.round_lengths, responder.round_lengths);

    assert!(initiator.round_lengths[0] < 512);
    assert!(initiator
        .round_lengths
        .windows(2)
        .all(|pair| pair[1] < pair[0]));
    assert_eq!(
        initiator.secret.len(),
        *initiator.round_lengths.last().unwrap()
    );
    assert!(initiator.parities_revealed > 0);
}

/// Out-of-the-box settings converge at the default corruption rate.
#[test]
fn test_default_settings_converge() {
    let config = SessionConfig::default();
    let link = LinkConfig::default();
    let seeds = 0..8u64;
    let mut agreed = 0;

    for seed in seeds.clone() {
        let outcome = run_session(
            &config,
            &LinkConfig::seeded(link.error_rate, seed),
            ChaChaSource::from_u64_seed(100 + seed),
            ChaChaSource::from_u64_seed(200 + seed),
            &AbortSignal::new(),
        );
        match outcome {
            Ok(outcome) => {
                assert!(outcome.initiator.rounds >= 1);
                assert!(outcome.initiator.rounds <= config.max_rounds);
                if outcome.agreed() {
                    agreed += 1;
                }
            }
            Err(ProtocolError::ReconciliationExhausted { rounds, len }) => {
                eprintln!("seed {seed}: exhausted after {rounds} rounds at {len} bits");
            }
            Err(e) => panic!("seed {seed}: unexpected error {e}"),
        }
    }

    // The affine hash can accept a wrong candidate now and then.
    assert!(agreed >= 6, "only {agreed} of {} sessions agreed", seeds.count());
}

#[test]
fn test_round_budget_exhausted() {
    let config = SessionConfig {
        secret_len: 64,
        base_block_size: 8,
        max_rounds: 3,
        min_secret_len: 8,
        ..Default::default()
    };

    let result = run_session(
        &config,
        &inverting_link(),
        ChaChaSource::from_u64_seed(7),
        ChaChaSource::from_u64_seed(8),
        &AbortSignal::new(),
    );

    // 64 -> 56 -> 52 -> 49 bits, all blocks agreeing on parity.
    assert!(matches!(
        result,
        Err(ProtocolError::ReconciliationExhausted { rounds: 3, len: 49 })
    ));
}

#[test]
fn test_secret_too_short_to_continue() {
    let config = SessionConfig {
        secret_len: 64,
        base_block_size: 8,
        min_secret_len: 60,
        ..Default::default()
    };

    let result = run_session(
        &config,
        &inverting_link(),
        ChaChaSource::from_u64_seed(7),
        ChaChaSource::from_u64_seed(8),
        &AbortSignal::new(),
    );

    assert!(matches!(
        result,
        Err(ProtocolError::ReconciliationExhausted { rounds: 1, len: 56 })
    ));
}

#[test]
fn test_abort_stops_both_peers() {
    let config = SessionConfig {
        secret_len: 64,
        ..Default::default()
    };
    let abort = AbortSignal::new();
    let (public_a, public_b) = PerfectLink::pair();
    let (private_a, private_b) = LossyLink::pair(&inverting_link()).unwrap();

    let initiator = Initiator::new(config.clone(), ChaChaSource::from_u64_seed(9))
        .unwrap()
        .with_abort(abort.clone());
    let responder = Responder::new(config, ChaChaSource::from_u64_seed(10))
        .unwrap()
        .with_abort(abort.clone());

    let handle = thread::spawn(move || responder.run(public_b, private_b));
    let public_a = AbortOnReject {
        inner: public_a,
        abort: abort.clone(),
    };
    let initiator_result = initiator.run(public_a, private_a);
    let responder_result = handle.join().unwrap();

    assert!(abort.is_aborted());
    assert!(matches!(initiator_result, Err(ProtocolError::Aborted)));
    assert!(matches!(
        responder_result,
        Err(ProtocolError::Aborted) | Err(ProtocolError::Channel(ChannelError::Disconnected))
    ));
}

#[test]
fn test_invalid_link_rejected() {
    let result = run_session(
        &SessionConfig::default(),
        &LinkConfig::seeded(-0.5, 1),
        ChaChaSource::from_u64_seed(1),
        ChaChaSource::from_u64_seed(2),
        &AbortSignal::new(),
    );
    assert!(matches!(
        result,
        Err(ProtocolError::Channel(ChannelError::InvalidErrorRate(_)))
    ));
}
