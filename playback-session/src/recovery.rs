use serde::Serialize;
use tracing::{debug, warn};
use common::{FaultCategory, FaultRecord, FaultSeverity, SessionError};
use crate::config::RecoveryConfig;

/// 恢复状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryState {
    Running,
    RecoveringNetwork,
    RecoveringMedia,
    /// Terminal for the session.
    Failed,
}

/// Fatal faults seen per category since the session bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryCounters {
    pub network: u32,
    pub media: u32,
}

/// What the router must do after a fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Diagnostic only
    None,
    ResumeLoad,
    RecoverMedia,
    /// Report the error and tear the engine down
    Fail(SessionError),
}

/// 错误恢复状态机
pub struct RecoveryStateMachine {
    state: RecoveryState,
    counters: RecoveryCounters,
    policy: RecoveryConfig,
}

impl RecoveryStateMachine {
    pub fn new(policy: RecoveryConfig) -> Self {
        Self {
            state: RecoveryState::Running,
            counters: RecoveryCounters::default(),
            policy,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn counters(&self) -> RecoveryCounters {
        self.counters
    }

    /// Classify a fault and advance the machine.
    pub fn on_fault(&mut self, fault: &FaultRecord) -> RecoveryAction {
        if self.state == RecoveryState::Failed {
            debug!(detail = %fault.detail, "Fault ignored, session already failed");
            return RecoveryAction::None;
        }

        match (fault.severity, fault.category) {
            (FaultSeverity::NonFatal, category) => {
                debug!(%category, detail = %fault.detail, "Non-fatal fault, engine will self-heal");
                RecoveryAction::None
            }
            (FaultSeverity::Fatal, FaultCategory::Network) => {
                self.counters.network += 1;
                let attempts = self.counters.network;

                if attempts <= self.policy.max_network_retries {
                    warn!(
                        detail = %fault.detail,
                        "Fatal network fault, resuming load (attempt {}/{})",
                        attempts, self.policy.max_network_retries
                    );
                    self.state = RecoveryState::RecoveringNetwork;
                    RecoveryAction::ResumeLoad
                } else {
                    self.state = RecoveryState::Failed;
                    RecoveryAction::Fail(SessionError::NetworkExhausted {
                        retries: self.policy.max_network_retries,
                    })
                }
            }
            (FaultSeverity::Fatal, FaultCategory::Media) => {
                self.counters.media += 1;
                let attempts = self.counters.media;

                if attempts <= self.policy.max_media_retries {
                    warn!(
                        detail = %fault.detail,
                        "Fatal media fault, recovering decode pipeline (attempt {}/{})",
                        attempts, self.policy.max_media_retries
                    );
                    self.state = RecoveryState::RecoveringMedia;
                    RecoveryAction::RecoverMedia
                } else {
                    self.state = RecoveryState::Failed;
                    RecoveryAction::Fail(SessionError::MediaExhausted {
                        retries: self.policy.max_media_retries,
                    })
                }
            }
            (FaultSeverity::Fatal, FaultCategory::Other) => {
                self.state = RecoveryState::Failed;
                RecoveryAction::Fail(SessionError::Fatal {
                    detail: fault.detail.clone(),
                })
            }
        }
    }
}
