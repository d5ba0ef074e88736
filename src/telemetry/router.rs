// Routes decoded records to the output sink registered for each query

use tracing::warn;

use super::parser::{DecodedGroup, Reading, TelemetryDiagnostic};
use crate::config::QueryGroup;
use crate::motor::roboteq::FaultFlags;

/// Output side of the polling loop.
///
/// Registration is consulted on every dispatch, so sinks declared between
/// ticks take effect on the next one.
pub trait TelemetrySink {
    fn is_registered(&self, sink: &str) -> bool;

    /// Fire-and-forget delivery of one record
    fn deliver(&mut self, sink: &str, reading: Reading);

    /// Raw bytes drained this tick, before any normalization
    fn raw(&mut self, _bytes: &[u8]) {}

    /// Fault flags changed since the last report
    fn faults(&mut self, _flags: FaultFlags) {}
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouteReport {
    pub delivered: usize,
    pub diagnostics: Vec<TelemetryDiagnostic>,
}

/// Dispatch one group's records, index-aligned with the group's sink list
pub fn route(
    group: &QueryGroup,
    decoded: DecodedGroup,
    sink: &mut impl TelemetrySink,
) -> RouteReport {
    let mut report = RouteReport::default();

    for (index, record) in decoded.records.into_iter().enumerate() {
        // Undecodable records were already reported by the parser
        let Some(reading) = record else {
            continue;
        };

        match group.sinks.get(index) {
            Some(query) if sink.is_registered(&query.name) => {
                sink.deliver(&query.name, reading);
                report.delivered += 1;
            }
            other => {
                let diagnostic = TelemetryDiagnostic::UnregisteredSink {
                    group: group.tag,
                    index,
                    sink: other.map(|q| q.name.clone()),
                };
                warn!("{}", diagnostic);
                report.diagnostics.push(diagnostic);
            }
        }
    }

    report
}

/// Route every decoded group to the configured group with the same tag
pub fn route_all(
    groups: &[QueryGroup],
    decoded: Vec<DecodedGroup>,
    sink: &mut impl TelemetrySink,
) -> RouteReport {
    let mut report = RouteReport::default();

    for payload in decoded {
        let Some(group) = groups.iter().find(|g| g.tag == payload.tag) else {
            let diagnostic = TelemetryDiagnostic::UnregisteredSink {
                group: payload.tag,
                index: 0,
                sink: None,
            };
            warn!("{}", diagnostic);
            report.diagnostics.push(diagnostic);
            continue;
        };

        let RouteReport {
            delivered,
            diagnostics,
        } = route(group, payload, sink);
        report.delivered += delivered;
        report.diagnostics.extend(diagnostics);
    }

    report
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{GroupTag, QuerySink};
    use crate::messages::ChannelValues;
    use std::collections::HashSet;

    /// Records every delivery in order
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub registered: HashSet<String>,
        pub delivered: Vec<(String, Reading)>,
        pub raw: Vec<Vec<u8>>,
        pub faults: Vec<FaultFlags>,
    }

    impl RecordingSink {
        pub fn with_sinks(names: &[&str]) -> Self {
            Self {
                registered: names.iter().map(|n| n.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl TelemetrySink for RecordingSink {
        fn is_registered(&self, sink: &str) -> bool {
            self.registered.contains(sink)
        }

        fn deliver(&mut self, sink: &str, reading: Reading) {
            self.delivered.push((sink.to_string(), reading));
        }

        fn raw(&mut self, bytes: &[u8]) {
            self.raw.push(bytes.to_vec());
        }

        fn faults(&mut self, flags: FaultFlags) {
            self.faults.push(flags);
        }
    }

    fn group(names: &[&str]) -> QueryGroup {
        QueryGroup {
            tag: GroupTag::High,
            frequency: 10,
            sinks: names
                .iter()
                .map(|name| QuerySink {
                    name: name.to_string(),
                    code: "A".to_string(),
                })
                .collect(),
        }
    }

    fn decoded(records: &[&[i32]]) -> DecodedGroup {
        DecodedGroup {
            tag: GroupTag::High,
            records: records
                .iter()
                .map(|fields| {
                    Some(Reading::Values(ChannelValues::from_fields(
                        fields.iter().copied(),
                    )))
                })
                .collect(),
        }
    }

    #[test]
    fn test_route_in_sink_order() {
        let mut sink = RecordingSink::with_sinks(&["amps", "counts"]);
        let report = route(&group(&["amps", "counts"]), decoded(&[&[1, 2], &[3, 4]]), &mut sink);

        assert_eq!(report.delivered, 2);
        assert!(report.diagnostics.is_empty());
        let names: Vec<_> = sink.delivered.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["amps", "counts"]);
        assert_eq!(
            sink.delivered[1].1,
            Reading::Values(ChannelValues {
                value: vec![0, 3, 4]
            })
        );
    }

    #[test]
    fn test_extra_record_dropped() {
        let mut sink = RecordingSink::with_sinks(&["amps"]);
        let report = route(&group(&["amps"]), decoded(&[&[1], &[2]]), &mut sink);

        assert_eq!(report.delivered, 1);
        assert_eq!(
            report.diagnostics,
            vec![TelemetryDiagnostic::UnregisteredSink {
                group: GroupTag::High,
                index: 1,
                sink: None,
            }]
        );
    }

    #[test]
    fn test_unregistered_sink_dropped() {
        let mut sink = RecordingSink::with_sinks(&["counts"]);
        let report = route(&group(&["amps", "counts"]), decoded(&[&[1], &[2]]), &mut sink);

        assert_eq!(report.delivered, 1);
        assert_eq!(sink.delivered[0].0, "counts");
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_route_all_skips_unconfigured_group() {
        let mut sink = RecordingSink::with_sinks(&["amps"]);
        let mut low = decoded(&[&[5]]);
        low.tag = GroupTag::Low;

        let report = route_all(&[group(&["amps"])], vec![decoded(&[&[1]]), low], &mut sink);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.diagnostics.len(), 1);
    }
}
