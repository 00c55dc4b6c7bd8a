//! SQoS decision logic: the Reveal commit/reveal sub-protocol and the
//! Challenge dispute-window protocol.
//!
//! Both are pure planners over state a handler has already fetched; the
//! handler performs the transactions a plan calls for. Keeping the decisions
//! side-effect free lets the gating rules be tested without a ledger.

/// What a submitter should do for a Reveal-gated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    /// Hidden phase: submit the commitment hash, not the message.
    Commit,
    /// Completion reached and we committed earlier: submit the full message.
    Reveal,
    /// Our commit or reveal is already on the ledger; succeed without a
    /// transaction.
    AlreadySubmitted,
    /// Completion reached but we never committed; this submitter may not
    /// reveal.
    Skip,
}

/// Decides the Reveal step from the slot's ledger state.
///
/// `completed` is the policy's completion condition, `committed` whether this
/// submitter's commitment is recorded, `revealed` whether this submitter
/// already appears among the slot's revealed message groups.
pub fn plan_reveal(completed: bool, committed: bool, revealed: bool) -> RevealStep {
    match (completed, committed) {
        (false, false) => RevealStep::Commit,
        (false, true) => RevealStep::AlreadySubmitted,
        (true, false) => RevealStep::Skip,
        (true, true) => {
            if revealed {
                RevealStep::AlreadySubmitted
            } else {
                RevealStep::Reveal
            }
        }
    }
}

/// What the execute pass should do for one slot under Challenge review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStep {
    /// The slot is executable.
    Execute,
    /// We already challenged this slot; defer without resubmitting.
    AlreadyChallenged,
    /// The candidate diverges from the recorded message: submit exactly one
    /// challenge transaction and defer.
    SubmitChallenge,
}

/// Everything the challenge decision needs, fetched up front.
#[derive(Debug, Clone)]
pub struct ChallengeContext {
    /// A received group matches the recorded canonical hash.
    pub group_found: bool,
    /// The destination contract's configured SQoS for the slot is Challenge.
    pub challenge_configured: bool,
    /// Dispute window period, milliseconds.
    pub window_ms: u128,
    /// Milliseconds since the epoch.
    pub now_ms: u128,
    /// When the slot last received a candidate, milliseconds since the epoch.
    pub last_received_ms: u128,
    /// The slot's receive phase is complete.
    pub completed: bool,
    /// This relayer's address is among the slot's recorded challengers.
    pub already_challenged: bool,
    /// The candidate fetched from the source chain hashes to the recorded
    /// canonical hash.
    pub candidate_matches: bool,
}

/// Decides whether a slot may be executed this pass.
///
/// Challenges are only admissible while the dispute window is still open;
/// once `window_ms` has fully elapsed since the last received candidate the
/// slot is executable regardless. A candidate that matches the recorded
/// hash shows no fraud and executes immediately.
pub fn plan_challenge(ctx: &ChallengeContext) -> ChallengeStep {
    if !ctx.group_found || !ctx.challenge_configured {
        return ChallengeStep::Execute;
    }
    let window_open = ctx.now_ms.saturating_sub(ctx.last_received_ms) <= ctx.window_ms;
    if !window_open {
        return ChallengeStep::Execute;
    }
    if ctx.completed && ctx.already_challenged {
        return ChallengeStep::AlreadyChallenged;
    }
    if ctx.candidate_matches {
        return ChallengeStep::Execute;
    }
    ChallengeStep::SubmitChallenge
}
