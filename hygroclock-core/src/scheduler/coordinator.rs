//! Scheduler context
//!
//! The firmware drains its mailboxes into the methods below, then calls
//! `run_iteration`: poll and broadcast when the interval has elapsed, then
//! refresh the face if connected.

use core::fmt::Write;

use heapless::String;
use hygroclock_display::DisplayBackend;

use super::report::{LinkOutcome, PollOutcome, RenderOutcome, TickReport};
use crate::broadcast::{BroadcastError, Broadcaster, EventId, EventKind, SubscribeReport};
use crate::clock::ClockSync;
use crate::config::DeviceConfig;
use crate::error::CoordinatorError;
use crate::notifier::ConnectivityNotifier;
use crate::presenter::{Banner, DisplayPresenter};
use crate::readings::{EncodedReading, ReadingsEncoder, SensorReader};
use crate::state::{ConnectivityState, DeviceAddress, LinkEvent};
use crate::traits::{ClimateSensor, ConnectionId, PushSink, SensorError};

/// The coordinator
pub struct Scheduler<S, D, P> {
    reader: SensorReader<S>,
    encoder: ReadingsEncoder,
    presenter: DisplayPresenter<D>,
    clock: ClockSync,
    broadcaster: Broadcaster,
    notifier: ConnectivityNotifier,
    sink: P,

    connectivity: ConnectivityState,
    address: Option<DeviceAddress>,
    device_name: &'static str,
    wifi_ssid: &'static str,

    poll_interval_ms: u64,
    last_poll_ms: u64,
    banner_hold_ms: u64,
    /// Clock face stays hidden until this uptime
    banner_until_ms: Option<u64>,
    /// Latest uptime seen; keeps timestamps non-decreasing
    last_now_ms: u64,
}

impl<S, D, P> Scheduler<S, D, P>
where
    S: ClimateSensor,
    D: DisplayBackend,
    P: PushSink,
{
    pub fn new(config: &DeviceConfig, sensor: S, display: D, sink: P) -> Self {
        Self {
            reader: SensorReader::new(sensor),
            encoder: ReadingsEncoder::new(),
            presenter: DisplayPresenter::new(display, config.stale_readings),
            clock: ClockSync::new(config.timing.tz_offset_s),
            broadcaster: Broadcaster::new(config.timing.reconnect_hint_ms),
            notifier: ConnectivityNotifier::new(),
            sink,
            connectivity: ConnectivityState::Disconnected,
            address: None,
            device_name: config.name,
            wifi_ssid: config.wifi_ssid,
            poll_interval_ms: u64::from(config.timing.poll_interval_ms),
            last_poll_ms: 0,
            banner_hold_ms: u64::from(config.timing.banner_hold_ms),
            banner_until_ms: None,
            last_now_ms: 0,
        }
    }

    /// Show the association banner
    ///
    /// A failure here means the display is unusable; the error is fatal.
    pub fn boot(&mut self) -> Result<(), CoordinatorError> {
        self.presenter
            .render_banner(Banner::Connecting {
                ssid: self.wifi_ssid,
            })
            .map_err(CoordinatorError::DisplayBusFailure)
    }

    /// Feed a link event from the network stack
    pub fn apply_link_event(&mut self, event: LinkEvent, now_ms: u64) -> LinkOutcome {
        let previous = self.connectivity;
        self.connectivity = previous.transition(event);

        if let LinkEvent::AddressAcquired(address) = event {
            if previous == ConnectivityState::Connecting {
                self.address = Some(address);
            }
        }

        let mut outcome = LinkOutcome {
            previous,
            state: self.connectivity,
            notification: None,
            banner: Ok(()),
        };

        if let Some(address) = self.address {
            outcome.notification =
                self.notifier
                    .notify_once(self.connectivity, self.device_name, address);
            if self.connectivity.is_connected() && !previous.is_connected() {
                outcome.banner = self
                    .presenter
                    .render_banner(Banner::Online { address })
                    .map_err(CoordinatorError::DisplayBusFailure);
                self.banner_until_ms = Some(now_ms.saturating_add(self.banner_hold_ms));
            }
        }

        outcome
    }

    /// Run one iteration of the loop at uptime `now_ms`
    pub fn run_iteration(&mut self, now_ms: u64) -> TickReport {
        let now_ms = now_ms.max(self.last_now_ms);
        self.last_now_ms = now_ms;

        let poll = if now_ms - self.last_poll_ms >= self.poll_interval_ms {
            let outcome = self.poll_cycle(now_ms);
            self.last_poll_ms = now_ms;
            Some(outcome)
        } else {
            None
        };

        let render = self.refresh(now_ms);

        TickReport {
            now_ms,
            poll,
            render,
        }
    }

    /// Read, then push `ping` and (if valid) `new_readings`
    fn poll_cycle(&mut self, now_ms: u64) -> PollOutcome {
        let reading = self.reader.read();
        self.presenter.observe(&reading);

        let mut stamp: String<20> = String::new();
        // u64 has at most 20 digits
        let _ = write!(stamp, "{}", now_ms);
        let ping = self
            .broadcaster
            .push(&mut self.sink, EventKind::Ping, &stamp);

        let readings = if reading.is_valid() {
            match self.encoder.encode(&reading) {
                Ok(encoded) => self
                    .broadcaster
                    .push(&mut self.sink, EventKind::NewReadings, &encoded)
                    .map_err(CoordinatorError::from),
                Err(_) => Err(CoordinatorError::SensorUnavailable(SensorError::OutOfRange)),
            }
        } else {
            let cause = self.reader.last_error().unwrap_or(SensorError::NotANumber);
            Err(CoordinatorError::SensorUnavailable(cause))
        };

        PollOutcome {
            reading,
            ping,
            readings,
        }
    }

    /// Redraw the clock face when connected and no banner is held
    fn refresh(&mut self, now_ms: u64) -> RenderOutcome {
        if !self.connectivity.is_connected() {
            return RenderOutcome::Skipped;
        }
        if let Some(until) = self.banner_until_ms {
            if now_ms < until {
                return RenderOutcome::BannerHeld;
            }
            self.banner_until_ms = None;
        }

        let snapshot = self.clock.tick(now_ms);
        match self.presenter.render(&snapshot, None) {
            Ok(()) => RenderOutcome::Rendered(snapshot),
            Err(e) => RenderOutcome::Failed(CoordinatorError::DisplayBusFailure(e)),
        }
    }

    /// Fresh reading for the query endpoint
    pub fn query_readings(&mut self) -> Result<EncodedReading, CoordinatorError> {
        let reading = self.reader.read();
        if !reading.is_valid() {
            let cause = self.reader.last_error().unwrap_or(SensorError::NotANumber);
            return Err(CoordinatorError::SensorUnavailable(cause));
        }
        self.encoder
            .encode(&reading)
            .map_err(|_| CoordinatorError::SensorUnavailable(SensorError::OutOfRange))
    }

    /// Apply a network time fetch taken at uptime `at_ms`
    pub fn seed_clock(&mut self, unix_secs: u64, at_ms: u64) {
        self.clock.seed(unix_secs, at_ms);
    }

    /// A client opened the push channel
    pub fn on_subscribe(
        &mut self,
        connection: ConnectionId,
        resume_from: Option<EventId>,
    ) -> Result<SubscribeReport, BroadcastError> {
        self.broadcaster
            .on_subscribe(&mut self.sink, connection, resume_from)
    }

    /// A client went away
    pub fn on_unsubscribe(&mut self, connection: ConnectionId) -> bool {
        self.broadcaster.on_unsubscribe(connection)
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.connectivity
    }

    pub fn address(&self) -> Option<DeviceAddress> {
        self.address
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn presenter(&self) -> &DisplayPresenter<D> {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut DisplayPresenter<D> {
        &mut self.presenter
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        self.reader.sensor_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::broadcaster::tests::RecordingSink;
    use crate::config::{RelayConfig, StaleReadingPolicy};
    use crate::presenter::tests::RecordingDisplay;
    use crate::traits::{Measurement, SinkError};
    use proptest::prelude::*;

    /// Replays a script of measurements, sticking on the last entry
    struct Scripted {
        script: std::vec::Vec<Result<Measurement, SensorError>>,
        calls: usize,
    }

    impl ClimateSensor for Scripted {
        fn measure(&mut self) -> Result<Measurement, SensorError> {
            let i = self.calls.min(self.script.len() - 1);
            self.calls += 1;
            self.script[i]
        }
    }

    const GOOD: Result<Measurement, SensorError> = Ok(Measurement {
        humidity: 55.2,
        temperature: 21.7,
    });
    const NAN: Result<Measurement, SensorError> = Ok(Measurement {
        humidity: f32::NAN,
        temperature: f32::NAN,
    });
    const ADDR: DeviceAddress = DeviceAddress([192, 168, 1, 40]);

    type TestScheduler = Scheduler<Scripted, RecordingDisplay, RecordingSink>;

    fn config(policy: StaleReadingPolicy) -> DeviceConfig {
        let mut config = DeviceConfig {
            name: "clock",
            wifi_ssid: "home",
            relay: RelayConfig::Telegram { user: "@me" },
            stale_readings: policy,
            ..DeviceConfig::DEFAULT
        };
        config.timing.tz_offset_s = 0;
        config.timing.banner_hold_ms = 0;
        config
    }

    fn scheduler_with(
        script: std::vec::Vec<Result<Measurement, SensorError>>,
        config: &DeviceConfig,
    ) -> TestScheduler {
        Scheduler::new(
            config,
            Scripted { script, calls: 0 },
            RecordingDisplay::default(),
            RecordingSink::default(),
        )
    }

    fn connect(s: &mut TestScheduler, now_ms: u64) -> LinkOutcome {
        s.apply_link_event(LinkEvent::AssociationSucceeded, now_ms);
        s.apply_link_event(LinkEvent::AddressAcquired(ADDR), now_ms)
    }

    #[test]
    fn test_boot_shows_connecting_banner() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        s.boot().unwrap();
        let frame = s.presenter().display().frames.last().unwrap();
        assert!(frame.contains("Connecting to"));
        assert!(frame.contains("home"));
    }

    #[test]
    fn test_boot_display_failure_is_fatal() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        s.presenter_mut().display_mut().fail = true;
        let err = s.boot().unwrap_err();
        assert!(err.is_fatal_at_boot());
    }

    #[test]
    fn test_connect_notifies_once() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        let first = s.apply_link_event(LinkEvent::AssociationSucceeded, 0);
        assert_eq!(first.state, ConnectivityState::Connecting);
        assert!(first.notification.is_none());

        let second = s.apply_link_event(LinkEvent::AddressAcquired(ADDR), 0);
        assert_eq!(second.previous, ConnectivityState::Connecting);
        assert_eq!(second.state, ConnectivityState::Connected);
        assert_eq!(
            second.notification.unwrap().message.as_str(),
            "clock /192.168.1.40 is online"
        );
        assert_eq!(s.address(), Some(ADDR));

        let again = s.apply_link_event(LinkEvent::AddressAcquired(ADDR), 5);
        assert!(again.notification.is_none());
    }

    #[test]
    fn test_no_notification_without_connect() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        let out = s.apply_link_event(LinkEvent::AddressAcquired(ADDR), 0);
        assert_eq!(out.state, ConnectivityState::Disconnected);
        assert!(out.notification.is_none());
        assert_eq!(s.address(), None);
    }

    #[test]
    fn test_render_skipped_until_connected() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        let report = s.run_iteration(10_000);
        assert_eq!(report.render, RenderOutcome::Skipped);
        // Polling does not wait for the network
        assert!(report.poll.is_some());
        assert!(s.presenter().display().frames.is_empty());
    }

    #[test]
    fn test_scenario_valid_reading() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        connect(&mut s, 0);
        s.on_subscribe(ConnectionId(0), None).unwrap();

        let report = s.run_iteration(10_000);
        let poll = report.poll.unwrap();
        assert_eq!(poll.ping.unwrap().delivered, 1);
        assert_eq!(poll.readings.unwrap().delivered, 1);

        let frames = s.sink().for_conn(ConnectionId(0));
        assert_eq!(frames[1], "id: 1\r\nevent: ping\r\ndata: 10000\r\n\r\n");
        assert_eq!(
            frames[2],
            "id: 2\r\nevent: new_readings\r\ndata: {\"humidity\":\"55.2\",\"temperature\":\"21.7\"}\r\n\r\n"
        );

        let frame = s.presenter().display().frames.last().unwrap();
        assert!(frame.contains("Temp: 21.7 C"));
        assert!(frame.contains("Hum: 55.2 %"));
    }

    #[test]
    fn test_render_uses_this_iterations_snapshot() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        connect(&mut s, 0);
        s.seed_clock(1_717_365_590, 0);
        for now in [1_000u64, 2_500, 10_000, 10_001] {
            let report = s.run_iteration(now);
            assert_eq!(report.render, RenderOutcome::Rendered(s.clock().tick(now)));
        }
    }

    #[test]
    fn test_banner_hold() {
        let mut cfg = config(StaleReadingPolicy::Retain);
        cfg.timing.banner_hold_ms = 10_000;
        let mut s = scheduler_with(vec![GOOD], &cfg);
        let out = connect(&mut s, 1_000);
        assert_eq!(out.banner, Ok(()));
        assert!(s
            .presenter()
            .display()
            .frames
            .last()
            .unwrap()
            .contains("192.168.1.40"));

        assert_eq!(s.run_iteration(5_000).render, RenderOutcome::BannerHeld);
        assert!(matches!(
            s.run_iteration(11_000).render,
            RenderOutcome::Rendered(_)
        ));
    }

    #[test]
    fn test_invalid_reads_push_pings_only() {
        let mut s = scheduler_with(vec![NAN], &config(StaleReadingPolicy::Retain));
        connect(&mut s, 0);
        s.on_subscribe(ConnectionId(0), None).unwrap();

        for now in (0..=50_000u64).step_by(500) {
            let report = s.run_iteration(now);
            if let Some(poll) = report.poll {
                assert!(!poll.reading.is_valid());
                assert_eq!(
                    poll.readings,
                    Err(CoordinatorError::SensorUnavailable(SensorError::NotANumber))
                );
            }
        }
        assert_eq!(s.sink().count_event("ping"), 5);
        assert_eq!(s.sink().count_event("new_readings"), 0);
    }

    #[test]
    fn test_sensor_error_reported_with_cause() {
        let mut s = scheduler_with(
            vec![Err(SensorError::Timeout)],
            &config(StaleReadingPolicy::Retain),
        );
        let poll = s.run_iteration(10_000).poll.unwrap();
        assert_eq!(
            poll.readings,
            Err(CoordinatorError::SensorUnavailable(SensorError::Timeout))
        );
        // Not retried early
        assert!(s.run_iteration(10_001).poll.is_none());
    }

    #[test]
    fn test_stale_policy_retain() {
        let mut s = scheduler_with(vec![GOOD, NAN], &config(StaleReadingPolicy::Retain));
        connect(&mut s, 0);
        s.run_iteration(10_000);
        s.run_iteration(20_000);
        let frame = s.presenter().display().frames.last().unwrap();
        assert!(frame.contains("Temp: 21.7 C"));
    }

    #[test]
    fn test_stale_policy_blank() {
        let mut s = scheduler_with(vec![GOOD, NAN], &config(StaleReadingPolicy::Blank));
        connect(&mut s, 0);
        s.run_iteration(10_000);
        s.run_iteration(20_000);
        let frame = s.presenter().display().frames.last().unwrap();
        assert!(!frame.texts.iter().any(|(_, _, _, t)| t.starts_with("Temp")));
        assert!(!frame.texts.iter().any(|(_, _, _, t)| t.starts_with("Hum")));
    }

    #[test]
    fn test_display_failure_after_boot_is_not_fatal() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        connect(&mut s, 0);
        s.presenter_mut().display_mut().fail = true;
        let report = s.run_iteration(10_000);
        assert!(matches!(
            report.render,
            RenderOutcome::Failed(CoordinatorError::DisplayBusFailure(_))
        ));
        // The poll still ran
        assert!(report.poll.unwrap().readings.is_ok());

        s.presenter_mut().display_mut().fail = false;
        assert!(matches!(
            s.run_iteration(10_500).render,
            RenderOutcome::Rendered(_)
        ));
    }

    #[test]
    fn test_query_readings() {
        let mut s = scheduler_with(vec![GOOD, NAN], &config(StaleReadingPolicy::Retain));
        assert_eq!(
            s.query_readings().unwrap().as_str(),
            "{\"humidity\":\"55.2\",\"temperature\":\"21.7\"}"
        );
        assert_eq!(
            s.query_readings(),
            Err(CoordinatorError::SensorUnavailable(SensorError::NotANumber))
        );
    }

    #[test]
    fn test_reconnect_replays_before_live() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        connect(&mut s, 0);
        s.on_subscribe(ConnectionId(0), None).unwrap();
        s.run_iteration(10_000); // ids 1, 2
        s.run_iteration(20_000); // ids 3, 4
        assert!(s.on_unsubscribe(ConnectionId(0)));

        let report = s.on_subscribe(ConnectionId(1), Some(2)).unwrap();
        assert_eq!(report.replayed, 2);
        s.run_iteration(30_000); // ids 5, 6

        let ids: std::vec::Vec<u32> = s
            .sink()
            .for_conn(ConnectionId(1))
            .iter()
            .skip(1)
            .filter_map(|f| f.lines().find_map(|l| l.strip_prefix("id: ")))
            .filter_map(|v| v.parse().ok())
            .collect();
        assert_eq!(ids, [3, 4, 5, 6]);
    }

    #[test]
    fn test_released_slot_gets_nothing_until_resubscribed() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        s.on_subscribe(ConnectionId(0), None).unwrap();
        assert!(s.on_unsubscribe(ConnectionId(0)));

        s.run_iteration(10_000); // ids 1, 2
        assert_eq!(s.sink().for_conn(ConnectionId(0)).len(), 1);

        s.on_subscribe(ConnectionId(0), None).unwrap();
        s.run_iteration(20_000); // ids 3, 4
        let frames = s.sink().for_conn(ConnectionId(0));
        assert_eq!(frames.len(), 4);
        assert!(frames[1].starts_with("retry: 10000\r\nid: 2\r\n"));
        assert!(frames[2].starts_with("id: 3\r\n"));
    }

    /// Fixed-depth queue per connection that nobody drains
    struct UndrainedSink {
        depth: usize,
        queued: [usize; crate::broadcast::MAX_SUBSCRIBERS],
    }

    impl PushSink for UndrainedSink {
        fn deliver(&mut self, connection: ConnectionId, _frame: &[u8]) -> Result<(), SinkError> {
            let queued = &mut self.queued[usize::from(connection.0)];
            if *queued == self.depth {
                return Err(SinkError::Full);
            }
            *queued += 1;
            Ok(())
        }
    }

    #[test]
    fn test_full_replay_and_poll_fit_one_outbox() {
        use crate::broadcast::REPLAY_DEPTH;
        use crate::scheduler::SUBSCRIBER_BURST;

        let cfg = config(StaleReadingPolicy::Retain);
        let sink = UndrainedSink {
            depth: SUBSCRIBER_BURST,
            queued: [0; crate::broadcast::MAX_SUBSCRIBERS],
        };
        let mut s = Scheduler::new(
            &cfg,
            Scripted {
                script: vec![GOOD],
                calls: 0,
            },
            RecordingDisplay::default(),
            sink,
        );
        for i in 1..=8 {
            s.run_iteration(i * 10_000); // fills the replay log
        }

        let report = s.on_subscribe(ConnectionId(0), Some(0)).unwrap();
        assert_eq!(usize::from(report.replayed), REPLAY_DEPTH);
        assert_eq!(report.failed, 0);

        let poll = s.run_iteration(90_000).poll.unwrap();
        assert_eq!(poll.ping.unwrap().failed, 0);
        let readings = poll.readings.unwrap();
        assert_eq!((readings.delivered, readings.failed), (1, 0));
    }

    #[test]
    fn test_time_never_goes_backwards() {
        let mut s = scheduler_with(vec![GOOD], &config(StaleReadingPolicy::Retain));
        assert_eq!(s.run_iteration(15_000).now_ms, 15_000);
        let report = s.run_iteration(12_000);
        assert_eq!(report.now_ms, 15_000);
        assert!(report.poll.is_none());
    }

    proptest! {
        #[test]
        fn broadcast_cycles_bounded(interval in 1u32..5_000, step in 1u64..5_000, total in 0u64..100_000) {
            let mut cfg = config(StaleReadingPolicy::Retain);
            cfg.timing.poll_interval_ms = interval;
            let mut s = scheduler_with(vec![GOOD], &cfg);

            let mut polls = 0u64;
            let mut now = 0;
            while now <= total {
                if s.run_iteration(now).poll.is_some() {
                    polls += 1;
                }
                now += step;
            }
            prop_assert!(polls <= total / u64::from(interval) + 1);
        }

        #[test]
        fn broadcast_cycles_match_when_step_divides_interval(divisor in 1u64..20, multiple in 1u64..200, total in 0u64..100_000) {
            let step = multiple;
            let interval = step * divisor;
            let mut cfg = config(StaleReadingPolicy::Retain);
            cfg.timing.poll_interval_ms = interval as u32;
            let mut s = scheduler_with(vec![GOOD], &cfg);

            let mut polls = 0u64;
            let mut now = 0;
            while now <= total {
                if s.run_iteration(now).poll.is_some() {
                    polls += 1;
                }
                now += step;
            }
            let expected = total / interval;
            prop_assert!(polls + 1 >= expected && polls <= expected + 1);
        }
    }
}
