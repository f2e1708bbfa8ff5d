//! Hand-off point between the parser and whatever stores reports.
//!
//! Storage backends implement [`ReportSink`] and receive each finished [`Report`] by value.
//! Every field is a plain string, integer or list of strings, so a backend binds them as
//! query parameters rather than splicing them into statement text.

use std::convert::Infallible;

use crate::report::Report;

/// Consumer of finished reports
pub trait ReportSink {
    type Error;

    fn accept(&mut self, report: Report) -> Result<(), Self::Error>;
}

/// In-memory collection, mostly useful in tests and one-shot tools
impl ReportSink for Vec<Report> {
    type Error = Infallible;

    fn accept(&mut self, report: Report) -> Result<(), Self::Error> {
        self.push(report);
        Ok(())
    }
}

/// Feed every report into `sink`, stopping at the first storage error
pub fn deliver_all<S, I>(sink: &mut S, reports: I) -> Result<usize, S::Error>
where
    S: ReportSink,
    I: IntoIterator<Item = Report>,
{
    let mut delivered = 0;
    for report in reports {
        sink.accept(report)?;
        delivered += 1;
    }
    Ok(delivered)
}
