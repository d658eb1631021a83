//! Implementation of the `sleuth ask` command.

use anyhow::{Context, Result};
use clap::Args;
use console::{style, Term};
use indicatif::ProgressBar;
use std::path::Path;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::application::ResearchPipeline;
use crate::cli::load_config;
use crate::cli::output::{create_spinner, output, truncate, CommandOutput, ProgressBarExt, SubtaskTable};
use crate::domain::models::{EventSink, FinalAnswer, ResearchEvent};
use crate::infrastructure::logging::LoggerImpl;

/// Arguments for `sleuth ask`.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to research
    pub question: String,

    /// Do not show the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

/// Output of `sleuth ask`. Serializes as the bare `FinalAnswer`.
#[derive(Debug, serde::Serialize)]
pub struct AskOutput {
    /// The synthesized answer and any unresolved subtasks
    #[serde(flatten)]
    pub answer: FinalAnswer,
}

impl CommandOutput for AskOutput {
    fn to_human(&self) -> String {
        format!(
            "{}\n\n{}",
            self.answer.text,
            SubtaskTable::new().render(&self.answer)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Research `args.question` and print the answer.
pub async fn execute(args: AskArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let _logger = LoggerImpl::init(&config.logging)?;

    let pipeline = ResearchPipeline::from_config(&config)?;
    let show_progress = !args.no_progress && !json_mode && Term::stderr().is_term();

    let result = if show_progress {
        let (events, rx) = EventSink::channel();
        let pipeline = pipeline.with_events(events);
        let spinner = create_spinner();
        spinner.set_message("Planning subtasks");
        let reporter = tokio::spawn(report_progress(rx, spinner.clone()));

        let result = pipeline.answer(&args.question).await;
        // Dropping the pipeline closes the channel so the reporter drains and exits
        drop(pipeline);
        let _ = reporter.await;

        match &result {
            Ok(answer) if answer.is_partial() => spinner.finish_error("Answered with gaps"),
            Ok(_) => spinner.finish_success("Answered"),
            Err(_) => spinner.finish_error("Research failed"),
        }
        result
    } else {
        pipeline.answer(&args.question).await
    };

    let answer = result.context("Could not answer the question")?;
    output(&AskOutput { answer }, json_mode);
    Ok(())
}

async fn report_progress(mut rx: UnboundedReceiver<ResearchEvent>, spinner: ProgressBar) {
    while let Some(event) = rx.recv().await {
        match event {
            ResearchEvent::Decomposed { subtasks } => {
                spinner.note("•", format!("Split into {} subtask(s)", subtasks.len()));
            }
            ResearchEvent::SubtaskStarted {
                subtask_id,
                description,
            } => {
                spinner.set_message(format!("{subtask_id} {}", truncate(&description, 60)));
            }
            ResearchEvent::RoundCompleted {
                subtask_id,
                round,
                total_results,
                ..
            } => {
                spinner.set_message(format!(
                    "{subtask_id} round {round}: {total_results} result(s) collected"
                ));
            }
            ResearchEvent::SearchEvaluated {
                subtask_id,
                sufficient: false,
                reason,
                ..
            } => {
                spinner.set_message(format!("{subtask_id} searching again: {}", truncate(&reason, 60)));
            }
            ResearchEvent::AnswerEvaluated {
                subtask_id,
                sufficient: false,
                reason,
                ..
            } => {
                spinner.set_message(format!("{subtask_id} rewriting: {}", truncate(&reason, 60)));
            }
            ResearchEvent::SubtaskCompleted { result } => {
                spinner.note(
                    &style("✓").green().to_string(),
                    format!("{} {}", result.subtask_id, truncate(&result.description, 60)),
                );
            }
            ResearchEvent::SubtaskFailed { subtask_id, error } => {
                spinner.note(
                    &style("✗").red().to_string(),
                    format!("{subtask_id} {}", truncate(&error, 80)),
                );
            }
            ResearchEvent::Synthesized { .. } => spinner.set_message("Final answer written"),
            ResearchEvent::SearchEvaluated { .. } | ResearchEvent::AnswerEvaluated { .. } => {}
        }
    }
}
