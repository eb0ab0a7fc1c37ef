//! Run summary → lineage event pair.

use runlineage_types::lineage::{EventType, Run, RunEvent, EVENT_PRODUCER};
use runlineage_types::summary::RunSummary;

/// Build the START event and the terminal (COMPLETE or FAIL) event for a
/// completed run.
///
/// The START event carries only the run id; the terminal event carries the
/// full run including metrics. Inputs, outputs and job are identical on
/// both.
pub fn to_events(summary: &RunSummary) -> (RunEvent, RunEvent) {
    let start = RunEvent {
        event_type: EventType::Start,
        event_time: summary.start_time.clone(),
        run: Run {
            run_id: summary.run.run_id.clone(),
            metrics: None,
        },
        job: summary.job.clone(),
        inputs: summary.inputs.clone(),
        outputs: summary.outputs.clone(),
        producer: EVENT_PRODUCER.to_string(),
    };

    let terminal = RunEvent {
        event_type: if summary.success {
            EventType::Complete
        } else {
            EventType::Fail
        },
        event_time: summary.end_time.clone(),
        run: summary.run.clone(),
        ..start.clone()
    };

    (start, terminal)
}
