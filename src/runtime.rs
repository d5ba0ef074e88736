// 50 Hz telemetry polling loop plus the zenoh request handlers
// The loop is the only reader of the serial port. Velocity commands and
// service calls run on their own tasks and only write (maintenance also
// reads back its reply while holding the port).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use zenoh::handlers::FifoChannelHandler;
use zenoh::pubsub::{Publisher, Subscriber};
use zenoh::query::{Query, Queryable};
use zenoh::sample::Sample;

// local imports
use crate::config::{
    DriverConfig, QueryGroup, LOOP_HZ, TOPIC_FAULTS, TOPIC_READ, TOPIC_SRV_COMMAND,
    TOPIC_SRV_CONFIG, TOPIC_SRV_MAINTENANCE,
};
use crate::messages::{
    DeviceRequest, MaintenanceRequest, MaintenanceResponse, ServiceResponse, VelocityCommand,
};
use crate::motor::{
    FaultFlags, MotorDriver, RoboteqError, SerialTransport, SharedTransport, Transport,
};
use crate::telemetry::{
    route_all, DecodedGroup, FrameAssembler, FrameParser, Reading, TelemetryDiagnostic,
    TelemetrySink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Draining,
    Dispatching,
    Stopped,
}

/// What one tick did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub raw_bytes: usize,
    pub delivered: usize,
    pub diagnostics: Vec<TelemetryDiagnostic>,
}

/// Read side of the driver: drains the port, parses and routes telemetry
pub struct TelemetryPoller {
    transport: SharedTransport,
    groups: Vec<QueryGroup>,
    parser: FrameParser,
    assembler: FrameAssembler,
    last_faults: Option<FaultFlags>,
    state: PollState,
}

impl TelemetryPoller {
    pub fn new(transport: SharedTransport, groups: Vec<QueryGroup>) -> Self {
        let parser = FrameParser::new(&groups);
        Self::with_parser(transport, groups, parser)
    }

    pub fn with_parser(
        transport: SharedTransport,
        groups: Vec<QueryGroup>,
        parser: FrameParser,
    ) -> Self {
        let assembler = FrameAssembler::new(parser.delimiters().terminator);
        Self {
            transport,
            groups,
            parser,
            assembler,
            last_faults: None,
            state: PollState::Idle,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Run one Idle -> Draining -> Dispatching -> Idle cycle
    pub fn tick(&mut self, sink: &mut impl TelemetrySink) -> TickReport {
        let mut report = TickReport::default();
        if self.state == PollState::Stopped {
            return report;
        }

        let raw = {
            let mut transport = self.transport.lock();
            match transport.bytes_available() {
                Ok(0) => return report,
                Ok(_) => {
                    self.state = PollState::Draining;
                    transport.read_available()
                }
                Err(e) => Err(e),
            }
        };
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Serial read failed: {}", e);
                self.state = PollState::Idle;
                return report;
            }
        };
        if raw.is_empty() {
            self.state = PollState::Idle;
            return report;
        }

        report.raw_bytes = raw.len();
        sink.raw(&raw);
        self.state = PollState::Dispatching;

        let (complete, overflow) = self.assembler.push(&raw);
        report.diagnostics.extend(overflow);

        if !complete.is_empty() {
            let text = String::from_utf8_lossy(&complete);
            let output = self.parser.parse(&text);
            report.diagnostics.extend(output.diagnostics);

            self.track_faults(&output.groups, sink);
            let routed = route_all(&self.groups, output.groups, sink);
            report.delivered = routed.delivered;
            report.diagnostics.extend(routed.diagnostics);
        }

        self.state = PollState::Idle;
        report
    }

    /// Report the fault bitmask whenever an `FF` query changes value
    fn track_faults(&mut self, decoded: &[DecodedGroup], sink: &mut impl TelemetrySink) {
        for payload in decoded {
            let Some(group) = self.groups.iter().find(|g| g.tag == payload.tag) else {
                continue;
            };
            for (query, record) in group.sinks.iter().zip(&payload.records) {
                if query.code != FaultFlags::QUERY_CODE {
                    continue;
                }
                let Some(Reading::Values(values)) = record else {
                    continue;
                };
                let Some(&raw) = values.fields().first() else {
                    continue;
                };

                let flags = FaultFlags::from_value(i64::from(raw));
                if self.last_faults != Some(flags) {
                    if flags.is_fault_free() {
                        info!("Controller reports no faults");
                    } else {
                        warn!("Controller faults: {:?}", flags.names());
                    }
                    self.last_faults = Some(flags);
                    sink.faults(flags);
                }
            }
        }
    }

    /// Move to Stopped and close the port
    pub fn stop(&mut self) {
        self.state = PollState::Stopped;
        if self.transport.is_open() {
            self.transport.close();
        }
    }
}

/// Messages produced by one tick, published after the tick completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Raw(Vec<u8>),
    Sink { name: String, payload: Vec<u8> },
    Faults(Vec<u8>),
}

/// Sink that serializes readings for the zenoh publishers
#[derive(Default)]
pub struct TelemetryOutbox {
    registered: HashSet<String>,
    pending: Vec<Outgoing>,
}

impl TelemetryOutbox {
    /// Start routing `sink`; takes effect from the next tick
    pub fn register(&mut self, sink: impl Into<String>) {
        self.registered.insert(sink.into());
    }

    pub fn drain(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.pending)
    }
}

impl TelemetrySink for TelemetryOutbox {
    fn is_registered(&self, sink: &str) -> bool {
        self.registered.contains(sink)
    }

    fn deliver(&mut self, sink: &str, reading: Reading) {
        let payload = match &reading {
            Reading::Values(values) => serde_json::to_vec(values),
            Reading::Text(text) => serde_json::to_vec(text),
        };
        match payload {
            Ok(payload) => self.pending.push(Outgoing::Sink {
                name: sink.to_string(),
                payload,
            }),
            Err(e) => warn!("Failed to serialize reading for {}: {}", sink, e),
        }
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.pending.push(Outgoing::Raw(bytes.to_vec()));
    }

    fn faults(&mut self, flags: FaultFlags) {
        match serde_json::to_vec(&flags.names()) {
            Ok(payload) => self.pending.push(Outgoing::Faults(payload)),
            Err(e) => warn!("Failed to serialize fault flags: {}", e),
        }
    }
}

/// Request/response services exposed as zenoh queryables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Config,
    Command,
    Maintenance,
}

impl Service {
    pub fn topic(&self) -> &'static str {
        match self {
            Service::Config => TOPIC_SRV_CONFIG,
            Service::Command => TOPIC_SRV_COMMAND,
            Service::Maintenance => TOPIC_SRV_MAINTENANCE,
        }
    }

    /// Decode a JSON request, run it against the driver, encode the reply
    pub fn handle(&self, driver: &MotorDriver, payload: &[u8]) -> serde_json::Result<Vec<u8>> {
        match self {
            Service::Config | Service::Command => {
                let response = match serde_json::from_slice::<DeviceRequest>(payload) {
                    Ok(request) if *self == Service::Config => driver.config(&request),
                    Ok(request) => driver.command(&request),
                    Err(e) => ServiceResponse::failed(String::new(), format!("bad request: {e}")),
                };
                serde_json::to_vec(&response)
            }
            Service::Maintenance => {
                let response = match serde_json::from_slice::<MaintenanceRequest>(payload) {
                    Ok(request) => driver.maintenance(&request),
                    Err(e) => MaintenanceResponse {
                        command: ServiceResponse::failed(String::new(), format!("bad request: {e}")),
                        ..Default::default()
                    },
                };
                serde_json::to_vec(&response)
            }
        }
    }
}

async fn follow_velocity(
    subscriber: Subscriber<FifoChannelHandler<Sample>>,
    driver: Arc<MotorDriver>,
) {
    while let Ok(sample) = subscriber.recv_async().await {
        let payload = sample.payload().to_bytes();
        let cmd = match serde_json::from_slice::<VelocityCommand>(&payload) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("Failed to parse velocity command: {}", e);
                continue;
            }
        };

        let driver = Arc::clone(&driver);
        match tokio::task::spawn_blocking(move || driver.drive(&cmd)).await {
            Ok(Ok(sent)) => debug!("{:?} -> {}", cmd, sent),
            Ok(Err(RoboteqError::PortClosed)) => debug!("Velocity command dropped, port closed"),
            Ok(Err(e)) => warn!("Failed to send velocity command: {}", e),
            Err(e) => warn!("Velocity command task failed: {}", e),
        }
    }
}

async fn serve(
    queryable: Queryable<FifoChannelHandler<Query>>,
    service: Service,
    driver: Arc<MotorDriver>,
) {
    while let Ok(query) = queryable.recv_async().await {
        let payload = query
            .payload()
            .map(|p| p.to_bytes().into_owned())
            .unwrap_or_default();

        let driver = Arc::clone(&driver);
        let reply = match tokio::task::spawn_blocking(move || service.handle(&driver, &payload)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Failed to encode {:?} reply: {}", service, e);
                continue;
            }
            Err(e) => {
                warn!("{:?} service task failed: {}", service, e);
                continue;
            }
        };

        if let Err(e) = query.reply(query.key_expr().clone(), reply).await {
            warn!("Failed to reply to {:?} request: {}", service, e);
        }
    }
}

async fn publish(
    outgoing: Vec<Outgoing>,
    pub_read: &Publisher<'static>,
    pub_faults: &Publisher<'static>,
    sink_publishers: &HashMap<String, Publisher<'static>>,
) {
    for message in outgoing {
        let result = match message {
            Outgoing::Raw(bytes) => pub_read.put(bytes).await,
            Outgoing::Faults(payload) => pub_faults.put(payload).await,
            Outgoing::Sink { name, payload } => match sink_publishers.get(&name) {
                Some(publisher) => publisher.put(payload).await,
                None => {
                    warn!("No publisher declared for sink {}", name);
                    continue;
                }
            },
        };
        if let Err(e) = result {
            warn!("Failed to publish telemetry: {}", e);
        }
    }
}

pub async fn run(config: DriverConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.log_summary();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    let transport = SharedTransport::new(SerialTransport::open_or_closed(
        &config.drive.serial_port,
        config.drive.baud_rate,
    ));
    let driver = Arc::new(MotorDriver::new(
        transport.clone(),
        config.geometry(),
        config.maintenance_settle(),
    ));

    let groups: Vec<QueryGroup> = config.query_groups().to_vec();
    if let Err(e) = driver.register_queries(&groups) {
        warn!("Failed to register telemetry queries: {}", e);
    }

    info!("Setting up publishers, subscribers and services...");
    let pub_read = session.declare_publisher(config.topic(TOPIC_READ)).await?;
    let pub_faults = session.declare_publisher(config.topic(TOPIC_FAULTS)).await?;
    // Sinks only receive readings once their publisher exists
    let mut outbox = TelemetryOutbox::default();
    let mut sink_publishers = HashMap::new();
    for group in &groups {
        for sink in &group.sinks {
            let topic = config.sink_topic(&sink.name);
            match session.declare_publisher(topic.clone()).await {
                Ok(publisher) => {
                    info!("Group {} sink {} ({}) -> {}", group.tag, sink.name, sink.code, topic);
                    sink_publishers.insert(sink.name.clone(), publisher);
                    outbox.register(sink.name.clone());
                }
                Err(e) => warn!(
                    "Sink {} left unregistered, cannot publish on {}: {}",
                    sink.name, topic, e
                ),
            }
        }
    }

    let mut requests = JoinSet::new();
    let cmd_topic = config.topic(&config.drive.cmd_vel_topic);
    let subscriber = session.declare_subscriber(cmd_topic.clone()).await?;
    requests.spawn(follow_velocity(subscriber, Arc::clone(&driver)));
    info!("Subscribed to: {}", cmd_topic);

    for service in [Service::Config, Service::Command, Service::Maintenance] {
        let topic = config.topic(service.topic());
        let queryable = session.declare_queryable(topic.clone()).await?;
        requests.spawn(serve(queryable, service, Arc::clone(&driver)));
        info!("Serving {:?} on: {}", service, topic);
    }

    let mut poller = TelemetryPoller::new(transport.clone(), groups.clone());
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Driver started: {}Hz polling loop", LOOP_HZ);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let report = tokio::task::block_in_place(|| poller.tick(&mut outbox));
                if report.raw_bytes > 0 {
                    debug!(
                        "Tick: {} bytes, {} records, {} diagnostics",
                        report.raw_bytes,
                        report.delivered,
                        report.diagnostics.len()
                    );
                }
                publish(outbox.drain(), &pub_read, &pub_faults, &sink_publishers).await;
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
        }
    }

    requests.abort_all();
    if transport.is_open() {
        if let Err(e) = driver.stop() {
            warn!("Failed to stop motors: {}", e);
        }
    }
    poller.stop();
    session.close().await?;

    info!("Exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroupTag, QuerySink};
    use crate::messages::ChannelValues;
    use crate::motor::kinematics::DriveGeometry;
    use crate::motor::transport::mock::MockTransport;
    use crate::telemetry::router::tests::RecordingSink;

    fn group(tag: GroupTag, sinks: &[(&str, &str)]) -> QueryGroup {
        QueryGroup {
            tag,
            frequency: 10,
            sinks: sinks
                .iter()
                .map(|(name, code)| QuerySink {
                    name: name.to_string(),
                    code: code.to_string(),
                })
                .collect(),
        }
    }

    fn poller(groups: Vec<QueryGroup>) -> (TelemetryPoller, MockTransport) {
        let mock = MockTransport::new();
        let poller = TelemetryPoller::new(SharedTransport::new(mock.clone()), groups);
        (poller, mock)
    }

    fn values(reading: &Reading) -> Vec<i32> {
        match reading {
            Reading::Values(ChannelValues { value }) => value.clone(),
            other => panic!("expected values, got {other:?}"),
        }
    }

    #[test]
    fn test_idle_tick_does_nothing() {
        let (mut poller, _mock) = poller(vec![group(GroupTag::High, &[("amps", "A")])]);
        let mut sink = RecordingSink::with_sinks(&["amps"]);

        let report = poller.tick(&mut sink);
        assert_eq!(report, TickReport::default());
        assert!(sink.raw.is_empty());
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[test]
    fn test_tick_republishes_raw_and_routes() {
        let (mut poller, mock) =
            poller(vec![group(GroupTag::High, &[("amps", "A"), ("counts", "C")])]);
        let mut sink = RecordingSink::with_sinks(&["amps", "counts"]);

        mock.push_inbound(b"+\rDH?1:2?3:4\r");
        let report = poller.tick(&mut sink);

        assert_eq!(sink.raw, vec![b"+\rDH?1:2?3:4\r".to_vec()]);
        assert_eq!(report.raw_bytes, 13);
        assert_eq!(report.delivered, 2);
        assert!(report.diagnostics.is_empty());
        assert_eq!(sink.delivered[0].0, "amps");
        assert_eq!(values(&sink.delivered[0].1), vec![0, 1, 2]);
        assert_eq!(values(&sink.delivered[1].1), vec![0, 3, 4]);
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[test]
    fn test_same_frame_twice_gives_identical_emissions() {
        let (mut poller, mock) =
            poller(vec![group(GroupTag::High, &[("amps", "A"), ("counts", "C")])]);
        let mut sink = RecordingSink::with_sinks(&["amps", "counts"]);

        mock.push_inbound(b"D H?1:2_3:4_\r");
        poller.tick(&mut sink);
        mock.push_inbound(b"D H?1:2_3:4_\r");
        poller.tick(&mut sink);

        assert_eq!(sink.delivered.len(), 4);
        assert_eq!(sink.delivered[0..2], sink.delivered[2..4]);
    }

    #[test]
    fn test_partial_frame_waits_for_next_tick() {
        let (mut poller, mock) = poller(vec![group(GroupTag::Low, &[("volts", "V")])]);
        let mut sink = RecordingSink::with_sinks(&["volts"]);

        mock.push_inbound(b"DL?24");
        let report = poller.tick(&mut sink);
        assert_eq!(report.raw_bytes, 5);
        assert_eq!(report.delivered, 0);
        assert!(report.diagnostics.is_empty());

        mock.push_inbound(b"0\r");
        let report = poller.tick(&mut sink);
        assert_eq!(report.delivered, 1);
        assert_eq!(values(&sink.delivered[0].1), vec![0, 240]);
        // Raw stream is still republished exactly as it arrived
        assert_eq!(sink.raw, vec![b"DL?24".to_vec(), b"0\r".to_vec()]);
    }

    #[test]
    fn test_wrong_tag_one_diagnostic() {
        let (mut poller, mock) =
            poller(vec![group(GroupTag::High, &[("amps", "A"), ("counts", "C")])]);
        let mut sink = RecordingSink::with_sinks(&["amps", "counts"]);

        mock.push_inbound(b"D X?1:2_3:4_\r");
        let report = poller.tick(&mut sink);

        assert_eq!(report.delivered, 0);
        assert!(sink.delivered.is_empty());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[test]
    fn test_fewer_records_than_sinks() {
        let (mut poller, mock) = poller(vec![group(
            GroupTag::High,
            &[("a", "A"), ("b", "C"), ("c", "S")],
        )]);
        let mut sink = RecordingSink::with_sinks(&["a", "b", "c"]);

        mock.push_inbound(b"D H?1:2_3:4_\r");
        let report = poller.tick(&mut sink);

        assert_eq!(report.delivered, 2);
        assert_eq!(sink.delivered.len(), 2);
        assert_eq!(
            report.diagnostics,
            vec![TelemetryDiagnostic::FieldCountMismatch {
                group: GroupTag::High,
                expected: 3,
                found: 2,
            }]
        );
    }

    #[test]
    fn test_fault_changes_reported_once() {
        let (mut poller, mock) = poller(vec![group(
            GroupTag::Low,
            &[("battery", "V"), ("fault_flag", "FF")],
        )]);
        let mut sink = RecordingSink::with_sinks(&["battery", "fault_flag"]);

        mock.push_inbound(b"DL?240?5\r");
        poller.tick(&mut sink);
        mock.push_inbound(b"DL?241?5\r");
        poller.tick(&mut sink);
        mock.push_inbound(b"DL?241?0\r");
        poller.tick(&mut sink);

        assert_eq!(
            sink.faults,
            vec![
                FaultFlags::OVERHEAT | FaultFlags::UNDERVOLTAGE,
                FaultFlags::empty()
            ]
        );
        assert_eq!(sink.delivered.len(), 6);
    }

    #[test]
    fn test_stop_closes_transport() {
        let (mut poller, mock) = poller(vec![]);
        let mut sink = RecordingSink::default();

        poller.stop();
        assert_eq!(poller.state(), PollState::Stopped);
        assert!(!mock.is_open_now());

        mock.push_inbound(b"DH?1\r");
        assert_eq!(poller.tick(&mut sink), TickReport::default());
        assert_eq!(poller.state(), PollState::Stopped);
    }

    #[test]
    fn test_closed_transport_ticks_quietly() {
        let mock = MockTransport::closed();
        let mut poller = TelemetryPoller::new(SharedTransport::new(mock), vec![]);
        let mut sink = RecordingSink::default();
        assert_eq!(poller.tick(&mut sink), TickReport::default());
    }

    #[test]
    fn test_sink_registered_between_ticks() {
        let (mut poller, mock) = poller(vec![group(GroupTag::Low, &[("volts", "V")])]);
        let mut outbox = TelemetryOutbox::default();

        mock.push_inbound(b"DL?240\r");
        let report = poller.tick(&mut outbox);
        assert_eq!(report.delivered, 0);
        assert_eq!(outbox.drain(), vec![Outgoing::Raw(b"DL?240\r".to_vec())]);

        outbox.register("volts");
        mock.push_inbound(b"DL?241\r");
        let report = poller.tick(&mut outbox);
        assert_eq!(report.delivered, 1);
        assert_eq!(
            outbox.drain(),
            vec![
                Outgoing::Raw(b"DL?241\r".to_vec()),
                Outgoing::Sink {
                    name: "volts".to_string(),
                    payload: br#"{"value":[0,241]}"#.to_vec(),
                },
            ]
        );
    }

    #[test]
    fn test_outbox_serializes_readings() {
        let mut outbox = TelemetryOutbox::default();
        assert!(!outbox.is_registered("amps"));
        outbox.register("amps");
        assert!(outbox.is_registered("amps"));
        assert!(!outbox.is_registered("firmware"));

        outbox.raw(b"DH?1\r");
        outbox.deliver("amps", Reading::Values(ChannelValues::from_fields([7, 8])));
        outbox.faults(FaultFlags::EMERGENCY_STOP);

        assert_eq!(
            outbox.drain(),
            vec![
                Outgoing::Raw(b"DH?1\r".to_vec()),
                Outgoing::Sink {
                    name: "amps".to_string(),
                    payload: br#"{"value":[0,7,8]}"#.to_vec(),
                },
                Outgoing::Faults(br#"["EMERGENCY_STOP"]"#.to_vec()),
            ]
        );
        assert!(outbox.drain().is_empty());
    }

    fn driver() -> (MotorDriver, MockTransport) {
        let mock = MockTransport::new();
        let driver = MotorDriver::new(
            SharedTransport::new(mock.clone()),
            DriveGeometry::default(),
            Duration::ZERO,
        );
        (driver, mock)
    }

    #[test]
    fn test_config_service_reply() {
        let (driver, mock) = driver();
        let reply = Service::Config
            .handle(
                &driver,
                br#"{"user_input": "MXRPM", "channel": 1, "value": 3000}"#,
            )
            .unwrap();
        let response: ServiceResponse = serde_json::from_slice(&reply).unwrap();

        assert!(response.success);
        assert_eq!(response.result, "^MXRPM 1 3000_ %clsav321654987");
        assert_eq!(mock.wire(), response.result);
    }

    #[test]
    fn test_maintenance_service_reply() {
        let (driver, mock) = driver();
        mock.queue_reply(b"+\r");
        let reply = Service::Maintenance
            .handle(&driver, br#"{"user_input": "EESAV"}"#)
            .unwrap();
        let response: MaintenanceResponse = serde_json::from_slice(&reply).unwrap();

        assert_eq!(response.command.result, "%EESAV _");
        assert_eq!(response.response, "+\r");
    }

    #[test]
    fn test_bad_request_reply() {
        let (driver, mock) = driver();
        let reply = Service::Command.handle(&driver, b"not json").unwrap();
        let response: ServiceResponse = serde_json::from_slice(&reply).unwrap();

        assert!(!response.success);
        assert!(response.error.unwrap().starts_with("bad request"));
        assert!(mock.wire().is_empty());
    }

    #[test]
    fn test_maintenance_reply_not_seen_by_poller() {
        let (driver, mock) = driver();
        let mut poller = TelemetryPoller::new(driver.transport().clone(), vec![]);
        let mut sink = RecordingSink::default();

        mock.queue_reply(b"FF=0\r");
        let response = driver.maintenance(&MaintenanceRequest {
            user_input: "EESAV".to_string(),
        });
        assert_eq!(response.response, "FF=0\r");
        assert_eq!(response.faults, Some(vec![]));

        assert_eq!(poller.tick(&mut sink).raw_bytes, 0);
    }
}
