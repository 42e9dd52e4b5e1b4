//! Pass finish: settle entries, resolve waiters, notify clients.

use std::sync::Arc;

use super::BuildActor;
use super::pass::PassResult;
use crate::core::{EntryKey, ROOT_PAGES, Target};
use crate::entry::{BuildError, EnsureResult};
use crate::hmr::HmrEvent;
use crate::tracker::{PassReport, TargetOutcome};

impl BuildActor {
    pub(super) fn on_pass_done(&mut self, result: PassResult) {
        let report = self.tracker.record(&result.outcomes);
        // Waiters read the view and events right after they wake up.
        self.view.publish(self.tracker.errors().clone());

        let warnings: Vec<String> = result
            .outcomes
            .iter()
            .filter_map(|(_, outcome)| match outcome {
                TargetOutcome::Done(stats) => Some(stats.warnings.iter().cloned()),
                TargetOutcome::Failed(_) => None,
            })
            .flatten()
            .collect();
        self.publish_report(&report, warnings);
        crate::debug!("build"; "pass {} done in {} ms", self.view.passes(), result.elapsed.as_millis());

        // Deleted while compiling: not found, never a compile error.
        if self.dispose_missing() {
            self.pass_requested = true;
        }
        for key in self.registry.building() {
            let outcome = self.entry_result(&key);
            self.registry.settle(&key, &outcome);
            self.waiters.resolve(&key, &outcome);
        }
        for target in Target::ALL {
            for route in ROOT_PAGES {
                let key = EntryKey::new(target, route);
                if self.waiters.is_waiting(&key) {
                    let outcome = self.entry_result(&key);
                    self.waiters.resolve(&key, &outcome);
                }
            }
        }
        self.show_status(&result);

        if self.pass_requested {
            self.request_pass();
        }
    }

    /// Outcome of the last pass for one entry.
    pub(super) fn entry_result(&self, key: &EntryKey) -> EnsureResult {
        let errors = self.tracker.errors();
        if let Some(message) = errors.fatal(key.target()) {
            return Err(BuildError::Fatal {
                target: key.target(),
                message: Arc::clone(message),
            });
        }
        match errors.page_errors(key.target(), key.route()) {
            Some(page) if !page.is_empty() => Err(BuildError::Compile {
                route: key.route().to_string(),
                errors: page.to_vec().into(),
            }),
            _ => Ok(()),
        }
    }

    fn publish_report(&self, report: &PassReport, warnings: Vec<String>) {
        let changes = &report.changes;
        for route in &changes.added_pages {
            self.bus.publish(&HmrEvent::AddedPage(route.clone()));
        }
        for route in &changes.removed_pages {
            self.bus.publish(&HmrEvent::RemovedPage(route.clone()));
        }
        if !changes.middleware.is_empty() {
            self.bus.publish(&HmrEvent::MiddlewareChanges);
        }
        if !changes.server_only.is_empty() {
            self.bus.publish(&HmrEvent::ServerOnlyChanges {
                pages: changes.server_only.iter().cloned().collect(),
            });
        }
        if report.reload_page {
            self.bus.publish(&HmrEvent::ReloadPage);
        }

        let errors = self.tracker.errors().messages();
        let built = HmrEvent::Built {
            hash: report.hash.clone(),
            errors: errors.clone(),
            warnings: warnings.clone(),
        };
        self.bus.publish(&built);
        self.bus.set_sync(&HmrEvent::Sync {
            hash: report.hash.clone(),
            errors,
            warnings,
        });
    }

    fn show_status(&self, result: &PassResult) {
        let failed = result.outcomes.iter().find_map(|(target, outcome)| match outcome {
            TargetOutcome::Failed(message) => Some((*target, message.as_str())),
            TargetOutcome::Done(_) => None,
        });
        if let Some((target, message)) = failed {
            crate::logger::status_error(&format!("failed: {target}"), message);
            return;
        }

        let messages = self.tracker.errors().messages();
        if let Some(first) = messages.first() {
            crate::logger::status_error(&format!("{} error(s)", messages.len()), first);
            return;
        }

        let warnings: usize = result
            .outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                TargetOutcome::Done(stats) => stats.warnings.len(),
                TargetOutcome::Failed(_) => 0,
            })
            .sum();
        if warnings > 0 {
            crate::logger::status_warning(&format!("built with {warnings} warning(s)"));
            return;
        }

        let pages = self
            .registry
            .iter()
            .filter(|e| e.key.target() == Target::Client)
            .count();
        crate::logger::status_success(&format!(
            "built in {} ms ({} pages)",
            result.elapsed.as_millis(),
            pages
        ));
    }
}
