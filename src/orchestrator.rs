use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use postgres::Client;
use tracing::{error, info};

use crate::args::ReplayConfig;
use crate::audit::Checkpoint;
use crate::backlog::BacklogReader;
use crate::error::{Error, Result};
use crate::replayer::Replayer;
use crate::sink::Sink;
use crate::statement::StatementBuilder;
use crate::subscription::Subscription;
use crate::tail::LiveTailer;

/// Runs catch-up followed by live tailing over one session.
pub struct ReplayOrchestrator {
    pub config: ReplayConfig,
}

impl ReplayOrchestrator {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    /// Drains the backlog, then tails until `stop` is set. Returns the final checkpoint,
    /// which an operator passes back as `--start-event-id` on restart. A failure is
    /// wrapped in [`Error::Halted`] so the checkpoint reached so far is not lost.
    pub fn run<S: Sink>(
        &self,
        client: &mut Client,
        sink: S,
        stop: Arc<AtomicBool>,
    ) -> Result<Checkpoint> {
        let config = &self.config;
        let mut replayer = Replayer::new(
            StatementBuilder::new(config.key_columns.clone()),
            sink,
            Checkpoint::new(config.start_event_id),
            config.on_invalid_record,
        );
        let result = self.session(client, &mut replayer, &stop);
        let last_event_id = replayer.checkpoint().last();
        match result {
            Ok(()) => {
                info!(%last_event_id, "replay session finished");
                Ok(replayer.checkpoint())
            }
            Err(e) => {
                error!(%last_event_id, error = %e, "replay halted");
                Err(Error::Halted {
                    last_event_id,
                    source: Box::new(e),
                })
            }
        }
    }

    fn session<S: Sink>(
        &self,
        client: &mut Client,
        replayer: &mut Replayer<S>,
        stop: &AtomicBool,
    ) -> Result<()> {
        let config = &self.config;
        let backlog = BacklogReader::new(config.audit_table.clone(), config.progress_interval);

        if !config.follow {
            backlog.drain(client, config.start_event_id, replayer, stop)?;
            return Ok(());
        }

        // Subscribe before reading the backlog so events committed during catch-up
        // are queued for the tailer.
        let mut subscription = Subscription::listen(client, &config.channel)?;
        let summary = backlog.drain(subscription.client(), config.start_event_id, replayer, stop)?;
        if !summary.interrupted {
            let tailer = LiveTailer::new(config.audit_table.clone(), &config.channel);
            tailer.run(&mut subscription, replayer, stop)?;
        }
        subscription.release()
    }
}
