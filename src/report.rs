use crate::{error::Error, tree::Tree};
use std::panic::Location;

/// One step of a rewrite, handed to a `Sink`.
pub struct Report<'a> {
    pub tree: &'a Tree,
    /// The node produced by the step.
    pub node: usize,
    /// The node that was replaced, if any. It may be retired, but it is still
    /// readable because retired nodes are only dropped on flush.
    pub before: Option<usize>,
    pub error: Option<&'a Error>,
    pub message: &'a str,
    /// Where the step was reported from.
    pub location: &'static Location<'static>,
}

/// Receives a report for every step of a differentiation or
/// simplification. The results of those operations do not depend on the
/// sink.
pub trait Sink {
    fn report(&mut self, report: &Report);
}

/// Discards all reports.
pub struct NullSink;

impl Sink for NullSink {
    fn report(&mut self, _report: &Report) {}
}

/// Emits every report as a `tracing` event.
pub struct TracingSink;

impl Sink for TracingSink {
    fn report(&mut self, report: &Report) {
        let after = report.tree.subtree_latex(report.node);
        match (report.before, report.error) {
            (_, Some(err)) => tracing::warn!(
                location = %report.location,
                "{}: {} ({err})",
                report.message,
                after
            ),
            (Some(before), None) => tracing::debug!(
                location = %report.location,
                "{}: {} => {}",
                report.message,
                report.tree.subtree_latex(before),
                after
            ),
            (None, None) => tracing::debug!(
                location = %report.location,
                "{}: {}",
                report.message,
                after
            ),
        }
    }
}

/// Collects the messages of all reports. Mostly useful in tests.
#[derive(Default)]
pub struct MessageSink {
    pub messages: Vec<String>,
}

impl Sink for MessageSink {
    fn report(&mut self, report: &Report) {
        self.messages.push(report.message.to_string());
    }
}

impl Tree {
    /// Send a report about `node` to `sink`, tagged with the caller's
    /// location.
    #[track_caller]
    pub(crate) fn report(
        &self,
        sink: &mut impl Sink,
        node: usize,
        before: Option<usize>,
        message: &str,
    ) {
        sink.report(&Report {
            tree: self,
            node,
            before,
            error: None,
            message,
            location: Location::caller(),
        });
    }

    #[track_caller]
    pub(crate) fn report_error(&self, sink: &mut impl Sink, node: usize, err: &Error, message: &str) {
        sink.report(&Report {
            tree: self,
            node,
            before: None,
            error: Some(err),
            message,
            location: Location::caller(),
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::parse;

    struct LocationSink(Vec<u32>);

    impl Sink for LocationSink {
        fn report(&mut self, report: &Report) {
            assert!(report.location.file().ends_with("report.rs"));
            self.0.push(report.location.line());
        }
    }

    #[test]
    fn t_caller_location() {
        let tree = parse("x + 1").unwrap();
        let root = tree.root().unwrap();
        let mut sink = LocationSink(Vec::new());
        tree.report(&mut sink, root, None, "first");
        tree.report(&mut sink, root, None, "second");
        assert_eq!(sink.0.len(), 2);
        assert_eq!(sink.0[0] + 1, sink.0[1]);
    }

    #[test]
    fn t_message_sink() {
        let tree = parse("x").unwrap();
        let mut sink = MessageSink::default();
        tree.report(&mut sink, 0, None, "hello");
        tree.report_error(&mut sink, 0, &Error::NullArgument, "oops");
        assert_eq!(sink.messages, vec!["hello", "oops"]);
    }
}
