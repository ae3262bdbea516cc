//! Third-party platform SDK boundary.
//!
//! Every call is best effort. The scene flow behaves the same whether the
//! SDK is absent ([`NoSdk`]), present and working, or failing on every
//! call. Ad completions arrive as [`AdCompletion`] messages on a channel the
//! scene machine drains once per tick; each carries the [`AdTicket`] it was
//! requested with so late completions can be told apart from current ones.

use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Ad placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdKind {
    /// Shown before a run starts from the main menu.
    Midgame,
    /// Shown before a restart from game over.
    Rewarded,
}

impl fmt::Display for AdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdKind::Midgame => "midgame",
            AdKind::Rewarded => "rewarded",
        })
    }
}

/// Identifies one ad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdTicket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdOutcome {
    Finished,
    Failed(String),
}

/// Message sent by the SDK when an ad is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdCompletion {
    pub ticket: AdTicket,
    pub kind: AdKind,
    pub outcome: AdOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("platform SDK is not available")]
    Unavailable,

    #[error("SDK call '{call}' failed: {reason}")]
    Call { call: &'static str, reason: String },
}

/// Calls the game makes into the hosting platform.
pub trait PlatformSdk {
    fn is_present(&self) -> bool;

    fn loading_start(&mut self) -> Result<(), SdkError>;
    fn loading_stop(&mut self) -> Result<(), SdkError>;
    fn gameplay_start(&mut self) -> Result<(), SdkError>;
    fn gameplay_stop(&mut self) -> Result<(), SdkError>;

    /// Whether an ad blocker is active.
    fn ad_blocked(&mut self) -> Result<bool, SdkError>;

    /// Start an ad. The SDK sends one [`AdCompletion`] on `completions`
    /// when it ends, possibly on a later tick and possibly never.
    fn request_ad(
        &mut self,
        kind: AdKind,
        ticket: AdTicket,
        completions: Sender<AdCompletion>,
    ) -> Result<(), SdkError>;

    fn submit_score(&mut self, score: u32) -> Result<(), SdkError> {
        info!(score, "score submission not supported by platform");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NoSdk
// ---------------------------------------------------------------------------

/// Running outside any hosting platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSdk;

impl PlatformSdk for NoSdk {
    fn is_present(&self) -> bool {
        false
    }

    fn loading_start(&mut self) -> Result<(), SdkError> {
        Ok(())
    }

    fn loading_stop(&mut self) -> Result<(), SdkError> {
        Ok(())
    }

    fn gameplay_start(&mut self) -> Result<(), SdkError> {
        Ok(())
    }

    fn gameplay_stop(&mut self) -> Result<(), SdkError> {
        Ok(())
    }

    fn ad_blocked(&mut self) -> Result<bool, SdkError> {
        Err(SdkError::Unavailable)
    }

    fn request_ad(
        &mut self,
        _kind: AdKind,
        _ticket: AdTicket,
        _completions: Sender<AdCompletion>,
    ) -> Result<(), SdkError> {
        Err(SdkError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// RecordingSdk
// ---------------------------------------------------------------------------

/// How a [`RecordingSdk`] answers ad requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdScript {
    /// Send `Finished` right away.
    Complete,
    /// Send `Failed` right away.
    Fail(String),
    /// Accept the request and never answer.
    Never,
    /// Refuse the request with an error.
    Error,
}

/// One call observed by a [`RecordingSdk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkCall {
    LoadingStart,
    LoadingStop,
    GameplayStart,
    GameplayStop,
    AdBlocked,
    RequestAd { kind: AdKind, ticket: AdTicket },
    SubmitScore(u32),
}

/// Scripted SDK that reports every call on a channel.
#[derive(Debug)]
pub struct RecordingSdk {
    pub ads: AdScript,
    pub adblock: bool,
    /// Make every lifecycle call fail.
    pub failing_calls: bool,
    tx_calls: Sender<SdkCall>,
    /// Senders of unanswered `Never` requests, kept so the channel stays open.
    held: Vec<(AdTicket, Sender<AdCompletion>)>,
}

impl RecordingSdk {
    /// The SDK plus the receiving end of its call log.
    pub fn new(ads: AdScript) -> (Self, Receiver<SdkCall>) {
        let (tx_calls, rx_calls) = unbounded();
        (
            Self {
                ads,
                adblock: false,
                failing_calls: false,
                tx_calls,
                held: Vec::new(),
            },
            rx_calls,
        )
    }

    pub fn with_adblock(mut self, adblock: bool) -> Self {
        self.adblock = adblock;
        self
    }

    pub fn with_failing_calls(mut self, failing: bool) -> Self {
        self.failing_calls = failing;
        self
    }

    fn record(&self, call: SdkCall) {
        let _ = self.tx_calls.send(call);
    }

    fn lifecycle(&self, call: SdkCall, name: &'static str) -> Result<(), SdkError> {
        self.record(call);
        if self.failing_calls {
            Err(SdkError::Call {
                call: name,
                reason: "scripted failure".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl PlatformSdk for RecordingSdk {
    fn is_present(&self) -> bool {
        true
    }

    fn loading_start(&mut self) -> Result<(), SdkError> {
        self.lifecycle(SdkCall::LoadingStart, "loadingStart")
    }

    fn loading_stop(&mut self) -> Result<(), SdkError> {
        self.lifecycle(SdkCall::LoadingStop, "loadingStop")
    }

    fn gameplay_start(&mut self) -> Result<(), SdkError> {
        self.lifecycle(SdkCall::GameplayStart, "gameplayStart")
    }

    fn gameplay_stop(&mut self) -> Result<(), SdkError> {
        self.lifecycle(SdkCall::GameplayStop, "gameplayStop")
    }

    fn ad_blocked(&mut self) -> Result<bool, SdkError> {
        self.lifecycle(SdkCall::AdBlocked, "hasAdblock")?;
        Ok(self.adblock)
    }

    fn request_ad(
        &mut self,
        kind: AdKind,
        ticket: AdTicket,
        completions: Sender<AdCompletion>,
    ) -> Result<(), SdkError> {
        self.record(SdkCall::RequestAd { kind, ticket });
        let outcome = match &self.ads {
            AdScript::Complete => AdOutcome::Finished,
            AdScript::Fail(reason) => AdOutcome::Failed(reason.clone()),
            AdScript::Never => {
                self.held.push((ticket, completions));
                return Ok(());
            }
            AdScript::Error => {
                return Err(SdkError::Call {
                    call: "requestAd",
                    reason: "scripted failure".into(),
                })
            }
        };
        let _ = completions.send(AdCompletion {
            ticket,
            kind,
            outcome,
        });
        Ok(())
    }

    fn submit_score(&mut self, score: u32) -> Result<(), SdkError> {
        self.lifecycle(SdkCall::SubmitScore(score), "submitScore")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_sdk_refuses_ads_but_accepts_lifecycle() {
        let mut sdk = NoSdk;
        let (tx, rx) = unbounded();
        assert!(!sdk.is_present());
        assert!(sdk.gameplay_start().is_ok());
        assert_eq!(
            sdk.request_ad(AdKind::Midgame, AdTicket(0), tx),
            Err(SdkError::Unavailable)
        );
        assert!(rx.try_recv().is_err());
        assert!(sdk.submit_score(30).is_ok());
    }

    #[test]
    fn scripted_completion_is_sent_with_ticket() {
        let (mut sdk, calls) = RecordingSdk::new(AdScript::Fail("no fill".into()));
        let (tx, rx) = unbounded();
        sdk.request_ad(AdKind::Rewarded, AdTicket(4), tx).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            AdCompletion {
                ticket: AdTicket(4),
                kind: AdKind::Rewarded,
                outcome: AdOutcome::Failed("no fill".into()),
            }
        );
        assert_eq!(
            calls.try_iter().collect::<Vec<_>>(),
            [SdkCall::RequestAd {
                kind: AdKind::Rewarded,
                ticket: AdTicket(4)
            }]
        );
    }

    #[test]
    fn never_script_keeps_channel_open_and_silent() {
        let (mut sdk, _calls) = RecordingSdk::new(AdScript::Never);
        let (tx, rx) = unbounded();
        sdk.request_ad(AdKind::Midgame, AdTicket(1), tx).unwrap();
        assert!(matches!(
            rx.try_recv(),
            Err(crossbeam_channel::TryRecvError::Empty)
        ));
    }

    #[test]
    fn failing_calls_error_and_are_still_recorded() {
        let (sdk, calls) = RecordingSdk::new(AdScript::Complete);
        let mut sdk = sdk.with_failing_calls(true).with_adblock(true);
        assert!(sdk.loading_start().is_err());
        assert!(sdk.ad_blocked().is_err());
        assert_eq!(calls.len(), 2);
        assert_eq!(AdKind::Midgame.to_string(), "midgame");
    }
}
