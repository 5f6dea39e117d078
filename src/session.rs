//! End-to-end instrumentation session
//!
//! Steps run strictly in order: rewrite the entrypoint, start the
//! instance and wait for readiness, snapshot files, invoke the workload,
//! retrieve the trace log, reduce, snapshot again, read memory usage.
//! Teardown runs afterwards on every path, including fatal errors.

use crate::config::TrimConfig;
use crate::engine::ContainerEngine;
use crate::error::{Diagnostic, DiagnosticKind, Result};
use crate::invoke::Invoker;
use crate::lifecycle::InstanceLifecycle;
use crate::reducer::Reducer;
use crate::report::TrimReport;
use crate::rewriter::{EntrypointRewriter, RewrittenEntrypoint};

pub struct Session<'a, E: ContainerEngine, I: Invoker> {
    engine: &'a E,
    invoker: &'a I,
    config: TrimConfig,
    reducer: Reducer,
}

impl<'a, E: ContainerEngine, I: Invoker> Session<'a, E, I> {
    pub fn new(engine: &'a E, invoker: &'a I, config: TrimConfig) -> Self {
        let reducer = Reducer::new(config.policy());
        Self {
            engine,
            invoker,
            config,
            reducer,
        }
    }

    pub fn config(&self) -> &TrimConfig {
        &self.config
    }

    /// Instrument `image`, trigger it once and report the files it touched
    pub fn run(&self, image: &str) -> Result<TrimReport> {
        let rewriter = EntrypointRewriter::new(self.engine, self.config.tracer_settings());
        // No instance exists yet if this fails, and no wrapper was written
        let rewritten = rewriter.rewrite(image)?;

        let mut lifecycle = InstanceLifecycle::new(self.engine);
        let outcome = self.drive(&mut lifecycle, image, rewritten);

        lifecycle.cleanup();
        let final_state = lifecycle.state();
        let lifecycle_diagnostics = lifecycle.take_diagnostics();

        let mut report = match outcome {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(state = ?final_state, "session aborted");
                return Err(err.with_diagnostics(lifecycle_diagnostics));
            }
        };
        report.final_state = final_state;
        report.diagnostics.extend(lifecycle_diagnostics);
        tracing::info!(
            state = ?report.final_state,
            diagnostics = report.diagnostics.len(),
            "session finished"
        );
        Ok(report)
    }

    fn drive(
        &self,
        lifecycle: &mut InstanceLifecycle<'_>,
        image: &str,
        rewritten: RewrittenEntrypoint,
    ) -> Result<TrimReport> {
        let RewrittenEntrypoint { command, wrapper } = rewritten;
        let command_args = command.args().to_vec();

        let instance = lifecycle.start(image, wrapper, command, &self.config.launch_options())?;

        let before = self
            .config
            .snapshot_files
            .then(|| lifecycle.list_files(&self.config.list_root));

        let invocation = self.invoker.invoke(&self.config.input_text);
        tracing::info!(status = invocation.status, "workload invocation finished");

        let mut diagnostics = Vec::new();
        let mut container_logs = None;

        let reduction = if invocation.is_success() {
            let trace = lifecycle.retrieve_trace_log();
            if trace.trim().is_empty() {
                diagnostics.push(Diagnostic::warn(
                    DiagnosticKind::RetrievalWarning,
                    "Trace log is empty or could not be retrieved; no accesses observed",
                ));
            }

            let after = self
                .config
                .snapshot_files
                .then(|| lifecycle.list_files(&self.config.list_root));

            Some(self.reducer.reduce(&trace, before.as_ref(), after.as_ref()))
        } else {
            diagnostics.push(Diagnostic::warn(
                DiagnosticKind::InvocationWarning,
                format!(
                    "Workload invocation failed with status {}: {}",
                    invocation.status, invocation.body
                ),
            ));
            container_logs = lifecycle.container_logs();
            None
        };

        let memory = lifecycle.memory_usage();

        Ok(TrimReport {
            image: image.to_string(),
            instance_id: instance.id,
            command: command_args,
            invocation,
            reduction,
            memory,
            container_logs,
            final_state: None,
            diagnostics,
        })
    }
}
