use std::sync::{Arc, Mutex};
use tally_core::agent::{AgentLoop, LoopError, RunOutcome};
use tokio_util::sync::CancellationToken;

/// Routes Ctrl-C to the run in flight. With no run active it exits the process.
#[derive(Clone, Default)]
pub struct Interrupts {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    /// Installs the one process-wide Ctrl-C listener.
    pub fn install() -> Self {
        let interrupts = Self::default();
        let listener = interrupts.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !listener.interrupt() {
                    println!("\n👋 Goodbye!");
                    std::process::exit(130);
                }
            }
        });
        interrupts
    }

    /// Cancels the active run. Returns false when nothing was running.
    fn interrupt(&self) -> bool {
        let active = self.current.lock().ok().and_then(|current| current.clone());
        match active {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn set(&self, token: Option<CancellationToken>) {
        if let Ok(mut current) = self.current.lock() {
            *current = token;
        }
    }

    pub async fn run(
        &self,
        agent_loop: &AgentLoop,
        message: &str,
        budget: usize,
    ) -> Result<RunOutcome, LoopError> {
        let cancel = CancellationToken::new();
        self.set(Some(cancel.clone()));
        let result = agent_loop.run(message, budget, cancel).await;
        self.set(None);
        result
    }
}
