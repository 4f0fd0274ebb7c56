//! Per-peer orchestration and the two-thread session driver.

use super::{reconcile, shuffle, ProtocolError, Role, SessionConfig, UniversalHash};
use crate::bits::BitVector;
use crate::channel::{Channel, ChannelError, LinkConfig, LossyLink, PerfectLink};
use crate::source::{EntropySource, Generator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Shared cancellation flag, checked by both peers before every round.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// Creates an unset signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that every peer holding this signal stops.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`AbortSignal::abort`] has been called.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ProtocolError> {
        if self.is_aborted() {
            return Err(ProtocolError::Aborted);
        }
        Ok(())
    }
}

/// Orchestrator states, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Peer constructed, nothing exchanged yet.
    Init,
    /// Raw secret crossing the private link.
    Transmit,
    /// Comparing universal hashes.
    Verify,
    /// Responder trying single-bit corrections.
    BitTwiddle,
    /// Parity bisection round `n`, starting at 1.
    ReconcileRound(u32),
    /// Both peers hold the same secret.
    Accepted,
    /// Session finished.
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Init => f.write_str("init"),
            SessionState::Transmit => f.write_str("transmit"),
            SessionState::Verify => f.write_str("verify"),
            SessionState::BitTwiddle => f.write_str("bit_twiddle"),
            SessionState::ReconcileRound(n) => write!(f, "reconcile_round({})", n),
            SessionState::Accepted => f.write_str("accepted"),
            SessionState::Done => f.write_str("done"),
        }
    }
}

/// What one peer ended up with.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Side of the protocol this report describes.
    pub role: Role,
    /// The agreed secret.
    pub secret: BitVector,
    /// Reconciliation rounds executed.
    pub rounds: u32,
    /// Candidate length after each round.
    pub round_lengths: Vec<usize>,
    /// True if a single-bit correction resolved the mismatch.
    /// Only the responder can observe this.
    pub twiddle_corrected: bool,
    /// Parity bits published during reconciliation.
    pub parities_revealed: usize,
    /// Bits sent or received over the public link.
    pub public_bits: u64,
    /// When the peer started.
    pub started_at: DateTime<Utc>,
    /// When the peer accepted.
    pub finished_at: DateTime<Utc>,
}

/// Reports from both peers of a completed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    /// Initiator's view.
    pub initiator: SessionReport,
    /// Responder's view.
    pub responder: SessionReport,
}

impl SessionOutcome {
    /// True iff both peers hold bit-identical secrets.
    pub fn agreed(&self) -> bool {
        self.initiator.secret.equals(&self.responder.secret)
    }
}

/// Counts every bit that crosses the public link in either direction.
struct Metered<C> {
    inner: C,
    bits: u64,
}

impl<C: Channel> Metered<C> {
    fn new(inner: C) -> Self {
        Self { inner, bits: 0 }
    }
}

impl<C: Channel> Channel for Metered<C> {
    fn send(&mut self, message: BitVector) -> Result<(), ChannelError> {
        let len = message.len() as u64;
        self.inner.send(message)?;
        self.bits += len;
        Ok(())
    }

    fn receive(&mut self) -> Result<BitVector, ChannelError> {
        let message = self.inner.receive()?;
        self.bits += message.len() as u64;
        Ok(message)
    }
}

/// Bookkeeping shared by both roles.
struct Progress {
    role: Role,
    state: SessionState,
    started_at: DateTime<Utc>,
    round_lengths: Vec<usize>,
    parities_revealed: usize,
    twiddle_corrected: bool,
}

impl Progress {
    fn new(role: Role) -> Self {
        tracing::debug!(%role, state = %SessionState::Init, "session state");
        Self {
            role,
            state: SessionState::Init,
            started_at: Utc::now(),
            round_lengths: Vec::new(),
            parities_revealed: 0,
            twiddle_corrected: false,
        }
    }

    fn enter(&mut self, state: SessionState) {
        tracing::info!(role = %self.role, from = %self.state, to = %state, "session state");
        self.state = state;
    }

    /// Runs bisection round `round` on `secret` and re-truncates the pads.
    ///
    /// Fails once the candidate drops below the configured minimum; both
    /// peers see the same length and stop together.
    fn reconcile_round<C: Channel + ?Sized>(
        &mut self,
        config: &SessionConfig,
        round: u32,
        secret: &mut BitVector,
        pads: &mut UniversalHash,
        public: &mut C,
    ) -> Result<(), ProtocolError> {
        self.enter(SessionState::ReconcileRound(round));

        shuffle(secret, pads.shuffle_seed())?;
        let blocks = secret.partition_extra(config.block_size(round, secret.len()));
        let outcome = reconcile(self.role, blocks, public)?;

        tracing::debug!(
            role = %self.role,
            round,
            before = secret.len(),
            after = outcome.corrected.len(),
            parities = outcome.parities_exchanged,
            mismatches = outcome.mismatches,
            max_depth = outcome.max_depth,
            "reconciliation round complete"
        );

        self.parities_revealed += outcome.parities_exchanged;
        self.round_lengths.push(outcome.corrected.len());
        *secret = outcome.corrected;

        if secret.len() < config.min_secret_len {
            tracing::warn!(
                role = %self.role,
                round,
                len = secret.len(),
                min = config.min_secret_len,
                "candidate secret too short"
            );
            return Err(ProtocolError::ReconciliationExhausted {
                rounds: round,
                len: secret.len(),
            });
        }

        *pads = pads.truncated(secret.len())?;
        self.enter(SessionState::Verify);
        Ok(())
    }

    fn exhausted(&self, round: u32, max_rounds: u32, len: usize) -> Result<(), ProtocolError> {
        if round >= max_rounds {
            tracing::warn!(role = %self.role, rounds = round, len, "round budget exhausted");
            return Err(ProtocolError::ReconciliationExhausted { rounds: round, len });
        }
        Ok(())
    }

    fn finish(mut self, secret: BitVector, public_bits: u64) -> SessionReport {
        self.enter(SessionState::Accepted);
        let report = SessionReport {
            role: self.role,
            rounds: self.round_lengths.len() as u32,
            round_lengths: self.round_lengths,
            twiddle_corrected: self.twiddle_corrected,
            parities_revealed: self.parities_revealed,
            public_bits,
            started_at: self.started_at,
            finished_at: Utc::now(),
            secret,
        };
        tracing::info!(
            role = %report.role,
            len = report.secret.len(),
            rounds = report.rounds,
            public_bits,
            "secret agreed"
        );
        tracing::debug!(role = %report.role, state = %SessionState::Done, "session state");
        report
    }
}

/// Side that draws the secret and publishes hashes.
pub struct Initiator<S> {
    config: SessionConfig,
    source: S,
    abort: AbortSignal,
}

impl<S: EntropySource> Initiator<S> {
    /// Validates `config` and wraps the secret/pad source.
    pub fn new(config: SessionConfig, source: S) -> Result<Self, ProtocolError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            abort: AbortSignal::new(),
        })
    }

    /// Shares `abort` with this peer.
    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// Runs the initiator to completion. Dropping the links on return
    /// disconnects the responder.
    pub fn run<P: Channel, L: Channel>(
        mut self,
        public: P,
        mut private: L,
    ) -> Result<SessionReport, ProtocolError> {
        let mut public = Metered::new(public);
        let mut progress = Progress::new(Role::Initiator);
        self.abort.check()?;

        let mut secret = self.source.get_bits(self.config.secret_len)?;
        progress.enter(SessionState::Transmit);
        private.send(secret.clone())?;

        let mut pads = UniversalHash::draw(&mut self.source, secret.len())?;
        let digest = pads.hash(&secret)?;
        public.send(pads.pad_a().clone())?;
        public.send(pads.pad_b().clone())?;
        public.send(digest)?;

        progress.enter(SessionState::Verify);
        if !public.receive_bit()? {
            let mut round = 1;
            loop {
                self.abort.check()?;
                progress.reconcile_round(&self.config, round, &mut secret, &mut pads, &mut public)?;
                public.send(pads.hash(&secret)?)?;
                if public.receive_bit()? {
                    break;
                }
                progress.exhausted(round, self.config.max_rounds, secret.len())?;
                round += 1;
            }
        }

        Ok(progress.finish(secret, public.bits))
    }
}

/// Side that receives the noisy secret and answers parity checks.
pub struct Responder<S> {
    config: SessionConfig,
    source: S,
    abort: AbortSignal,
}

impl<S: EntropySource> Responder<S> {
    /// Validates `config`; `source` drives the bit-twiddle positions.
    pub fn new(config: SessionConfig, source: S) -> Result<Self, ProtocolError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            abort: AbortSignal::new(),
        })
    }

    /// Shares `abort` with this peer.
    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// Runs the responder to completion.
    pub fn run<P: Channel, L: Channel>(
        mut self,
        public: P,
        mut private: L,
    ) -> Result<SessionReport, ProtocolError> {
        let mut public = Metered::new(public);
        let mut progress = Progress::new(Role::Responder);
        self.abort.check()?;

        progress.enter(SessionState::Transmit);
        let mut secret = private.receive()?;
        if secret.len() != self.config.secret_len {
            return Err(ChannelError::UnexpectedLength {
                expected: self.config.secret_len,
                got: secret.len(),
            }
            .into());
        }

        let pad_a = public.receive()?;
        let pad_b = public.receive()?;
        let expected = public.receive()?;
        let mut pads = UniversalHash::new(pad_a, pad_b)?;

        progress.enter(SessionState::Verify);
        if pads.verify(&secret, &expected)? {
            public.send_bit(true)?;
            return Ok(progress.finish(secret, public.bits));
        }

        progress.enter(SessionState::BitTwiddle);
        if let Some(corrected) = self.twiddle(&secret, &pads, &expected)? {
            progress.twiddle_corrected = true;
            public.send_bit(true)?;
            return Ok(progress.finish(corrected, public.bits));
        }
        public.send_bit(false)?;

        let mut round = 1;
        loop {
            self.abort.check()?;
            progress.reconcile_round(&self.config, round, &mut secret, &mut pads, &mut public)?;
            let expected = public.receive()?;
            let matched = pads.verify(&secret, &expected)?;
            public.send_bit(matched)?;
            if matched {
                break;
            }
            progress.exhausted(round, self.config.max_rounds, secret.len())?;
            round += 1;
        }

        Ok(progress.finish(secret, public.bits))
    }

    /// Tries single-bit inversions at distinct random positions.
    fn twiddle(
        &mut self,
        secret: &BitVector,
        pads: &UniversalHash,
        expected: &BitVector,
    ) -> Result<Option<BitVector>, ProtocolError> {
        let len = secret.len();
        let attempts = self.config.twiddle_attempts.min(len);
        let mut positions: Vec<usize> = (0..len).collect();
        let mut rng = Generator::new(&mut self.source);

        // Partial Fisher-Yates: the first `attempts` entries are distinct.
        for k in 0..attempts {
            let j = rng.next_int_between(k as u64, len as u64)? as usize;
            positions.swap(k, j);

            let mut candidate = secret.clone();
            candidate.invert(positions[k])?;
            if pads.verify(&candidate, expected)? {
                tracing::info!(position = positions[k], attempt = k + 1, "single-bit correction found");
                return Ok(Some(candidate));
            }
        }

        tracing::debug!(attempts, "no single-bit correction matched");
        Ok(None)
    }
}

/// Runs both peers on their own threads over freshly created links.
///
/// Waits for both peers to terminate. When one peer fails, the other
/// usually follows with [`ChannelError::Disconnected`]; the more specific
/// of the two errors is returned.
pub fn run_session<A, B>(
    config: &SessionConfig,
    link: &LinkConfig,
    initiator_source: A,
    responder_source: B,
    abort: &AbortSignal,
) -> Result<SessionOutcome, ProtocolError>
where
    A: EntropySource + Send + 'static,
    B: EntropySource + Send + 'static,
{
    config.validate()?;
    link.validate()?;

    let (public_a, public_b) = PerfectLink::pair_with_timeout(link.receive_timeout());
    let (private_a, private_b) = LossyLink::pair(link)?;

    let initiator = Initiator::new(config.clone(), initiator_source)?.with_abort(abort.clone());
    let responder = Responder::new(config.clone(), responder_source)?.with_abort(abort.clone());

    tracing::info!(
        secret_len = config.secret_len,
        error_rate = link.error_rate,
        max_rounds = config.max_rounds,
        "starting session"
    );

    let initiator_handle = thread::Builder::new()
        .name(Role::Initiator.to_string())
        .spawn(move || initiator.run(public_a, private_a))?;
    let responder_handle = thread::Builder::new()
        .name(Role::Responder.to_string())
        .spawn(move || responder.run(public_b, private_b))?;

    let initiator = initiator_handle
        .join()
        .map_err(|_| ProtocolError::PeerPanicked(Role::Initiator))
        .and_then(|result| result);
    let responder = responder_handle
        .join()
        .map_err(|_| ProtocolError::PeerPanicked(Role::Responder))
        .and_then(|result| result);

    match (initiator, responder) {
        (Ok(initiator), Ok(responder)) => Ok(SessionOutcome {
            initiator,
            responder,
        }),
        (Err(e), Err(other)) if e.is_disconnect() => Err(other),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}
