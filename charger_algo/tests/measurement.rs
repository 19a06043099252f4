// End-to-end behaviour of the measurement context on a simulated board.

use charger_algo::calibration::PointPair;
use charger_algo::interfaces::{Balancer, BatteryOutput, Clock, MeasurementLog, PowerStages, SampleSource};
use charger_algo::{
    split, AnalogInputs, CalibrationError, CalibrationPoint, CalibrationStorage, CalibrationTable,
    ChargeIntegrator, Config, ConfigError, Name, OutputSource, RawSamples, SampleQueue,
    SharedStorage, Snapshot, Value, PHYSICAL_INPUTS,
};

/// raw == physical on every channel
const IDENTITY: PointPair = [CalibrationPoint::new(0, 0), CalibrationPoint::new(1000, 1000)];

#[derive(Default)]
struct MockBoard {
    now: u32,
    output: bool,
    enables: u32,
    disables: u32,
    immediate_samples: u32,
    next_sample: RawSamples,
    discharge: bool,
    charge: bool,
    balancer_stable: bool,
    logged: Vec<(u16, Value)>,
}

impl Clock for MockBoard {
    fn milliseconds(&self) -> u32 {
        self.now
    }
}

impl BatteryOutput for MockBoard {
    fn set_battery_output(&mut self, enabled: bool) {
        if enabled {
            self.enables += 1;
        } else {
            self.disables += 1;
        }
        self.output = enabled;
    }
}

impl SampleSource for MockBoard {
    fn sample_now(&mut self) -> RawSamples {
        self.immediate_samples += 1;
        self.next_sample
    }
}

impl PowerStages for MockBoard {
    fn is_discharge_powered_on(&self) -> bool {
        self.discharge
    }
    fn is_charge_powered_on(&self) -> bool {
        self.charge
    }
}

impl Balancer for MockBoard {
    fn is_stable(&self) -> bool {
        self.balancer_stable
    }
}

impl MeasurementLog for MockBoard {
    fn send(&mut self, snapshot: &Snapshot<'_>) {
        self.logged.push((snapshot.count, snapshot.real(Name::VoutBalancer)));
    }
}

fn identity_table() -> CalibrationTable {
    CalibrationTable::from_points([IDENTITY; PHYSICAL_INPUTS])
}

fn context(charge: &ChargeIntegrator) -> AnalogInputs<'_, CalibrationTable> {
    AnalogInputs::new(Config::default(), identity_table(), charge).unwrap()
}

fn feed<S: CalibrationStorage>(inputs: &mut AnalogInputs<'_, S>, board: &mut MockBoard, raw: RawSamples, n: usize) {
    for _ in 0..n {
        inputs.finalize_measurement(&raw, board);
    }
}

#[test]
fn invalid_config_fails_startup() {
    let charge = ChargeIntegrator::new();
    let cfg = Config {
        avr_max_count: 0,
        ..Config::default()
    };
    assert!(matches!(
        AnalogInputs::new(cfg, identity_table(), &charge),
        Err(ConfigError::ZeroWindow)
    ));
    let cfg = Config {
        tick_period_us: 0,
        ..Config::default()
    };
    assert!(matches!(
        AnalogInputs::new(cfg, identity_table(), &charge),
        Err(ConfigError::ZeroTickPeriod)
    ));
}

#[test]
fn full_window_after_exactly_avr_max_count() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    let mut sum = 0u32;
    for i in 0..100u16 {
        assert_eq!(inputs.full_measurement_count(), 0);
        let v = 11_000 + (i % 7) * 3;
        sum += v as u32;
        inputs.finalize_measurement(&RawSamples::default().with(Name::Vout, v), &mut board);
    }
    assert_eq!(inputs.full_measurement_count(), 1);
    assert_eq!(inputs.avr_adc_value(Name::Vout), (sum / 100) as Value);
    assert_eq!(inputs.real_value(Name::Vout), (sum / 100) as Value);
    assert_eq!(board.logged, vec![(1, (sum / 100) as Value)]);

    // the next window starts empty
    feed(&mut inputs, &mut board, RawSamples::default().with(Name::Vout, 5000), 99);
    assert_eq!(inputs.full_measurement_count(), 1);
    feed(&mut inputs, &mut board, RawSamples::default().with(Name::Vout, 5000), 1);
    assert_eq!(inputs.real_value(Name::Vout), 5000);
}

#[test]
fn stability_builds_over_windows() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    let raw = RawSamples::default().with(Name::Vin, 15_000);
    feed(&mut inputs, &mut board, raw, 100);
    assert_eq!(inputs.stable_count(Name::Vin), 0);
    for n in 1..=3 {
        feed(&mut inputs, &mut board, raw.with(Name::Vin, 15_000 + n), 100);
        assert_eq!(inputs.stable_count(Name::Vin), n);
    }
    assert!(inputs.is_stable(Name::Vin));
    feed(&mut inputs, &mut board, raw.with(Name::Vin, 15_100), 100);
    assert!(!inputs.is_stable(Name::Vin));
}

#[test]
fn output_stability_includes_balancer() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    let raw = RawSamples::default().with(Name::Vout, 8400);
    // first window jumps from 0, the next three are stable
    feed(&mut inputs, &mut board, raw, 400);
    board.balancer_stable = false;
    assert!(!inputs.is_output_stable(&board));
    board.balancer_stable = true;
    assert!(inputs.is_output_stable(&board));
}

#[test]
fn balancer_selected_and_fallbacks() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    let pack = RawSamples::default()
        .with(Name::Vout, 8350)
        .with(Name::Vb1Pin, 4190)
        .with(Name::Vb2Pin, 4180);
    feed(&mut inputs, &mut board, pack, 100);
    assert_eq!(inputs.output_source(), OutputSource::Vbalancer);
    assert_eq!(inputs.vout(), 8370);
    assert_eq!(inputs.connected_balance_ports(), 2);
    assert_eq!(inputs.real_value(Name::VbalanceInfo), 2);

    // balancer unplugged
    let bare = RawSamples::default().with(Name::Vout, 8350);
    feed(&mut inputs, &mut board, bare, 100);
    assert_eq!(inputs.output_source(), OutputSource::Vout);
    assert_eq!(inputs.vout(), 8350);
    assert_eq!(inputs.real_value(Name::VbalanceInfo), 0);

    // balancer reads far below the direct sense
    let off = pack.with(Name::Vout, 9371);
    feed(&mut inputs, &mut board, off, 100);
    assert_eq!(inputs.output_source(), OutputSource::Vout);
    assert_eq!(inputs.vout(), 9371);
    assert_eq!(inputs.real_value(Name::VbalanceInfo), 0);
    assert_eq!(inputs.real_value(Name::Vbalancer), 8370);
}

#[test]
fn delta_voltage_holds_maximum() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    let mut expected_drop = Vec::new();
    for (k, vout) in [3000u16, 3800, 3500].into_iter().enumerate() {
        let raw = RawSamples::default().with(Name::Vout, vout).with(Name::Textern, 2500);
        feed(&mut inputs, &mut board, raw, 10);
        board.now = (k as u32 + 1) * 60_001;
        feed(&mut inputs, &mut board, raw, 1);
        expected_drop.push(inputs.real_value(Name::DeltaVout));
    }
    assert_eq!(expected_drop, vec![0, 0, 300]);
    assert_eq!(inputs.real_value(Name::DeltaVoutMax), 3800);
    assert_eq!(inputs.real_value(Name::DeltaLastCount), 11);
    assert_eq!(inputs.delta_count(), 3);
    assert_eq!(inputs.full_measurement_count(), 0);
}

#[test]
fn delta_voltage_follows_source_units() {
    // direct sense reads half scale: raw 4000 is 8000 mV
    let mut points = [IDENTITY; PHYSICAL_INPUTS];
    points[Name::Vout.index()] = [CalibrationPoint::new(0, 0), CalibrationPoint::new(1000, 2000)];
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = AnalogInputs::new(Config::default(), CalibrationTable::from_points(points), &charge).unwrap();
    inputs.initialize(&board);

    let bare = RawSamples::default().with(Name::Vout, 4000);
    let pack = bare.with(Name::Vb1Pin, 4100).with(Name::Vb2Pin, 4100);

    // direct source: the window average is calibrated
    feed(&mut inputs, &mut board, bare, 99);
    board.now = 60_001;
    feed(&mut inputs, &mut board, bare, 1);
    assert_eq!(inputs.full_measurement_count(), 1);
    assert_eq!(inputs.real_value(Name::DeltaVoutMax), 8000);
    assert_eq!(inputs.real_value(Name::DeltaVout), 0);

    // balancer plugged in, selected at the next full window
    feed(&mut inputs, &mut board, pack, 100);
    assert_eq!(inputs.full_measurement_count(), 2);
    assert_eq!(inputs.output_source(), OutputSource::Vbalancer);
    assert_eq!(inputs.vout(), 8200);

    // balancer source: only its samples count, already in mV
    feed(&mut inputs, &mut board, pack, 10);
    board.now = 120_002;
    feed(&mut inputs, &mut board, pack, 1);
    assert_eq!(inputs.real_value(Name::DeltaVoutMax), 8200);
    assert_eq!(inputs.real_value(Name::DeltaVout), 0);
    assert_eq!(inputs.real_value(Name::DeltaLastCount), 111);

    // balancer unplugged: falls back to the direct sense mid-window
    feed(&mut inputs, &mut board, bare, 89);
    assert_eq!(inputs.full_measurement_count(), 3);
    assert_eq!(inputs.output_source(), OutputSource::Vout);
    assert_eq!(inputs.vout(), 8000);
    feed(&mut inputs, &mut board, bare, 10);
    board.now = 180_003;
    feed(&mut inputs, &mut board, bare, 1);
    assert_eq!(inputs.real_value(Name::DeltaVoutMax), 8200);
    assert_eq!(inputs.real_value(Name::DeltaVout), 200);
    assert_eq!(inputs.real_value(Name::DeltaLastCount), 100);
    assert_eq!(inputs.delta_count(), 3);
}

#[test]
fn delta_temperature_is_signed_change() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    for (k, t) in [2500u16, 2700, 2650].into_iter().enumerate() {
        let raw = RawSamples::default().with(Name::Textern, t);
        feed(&mut inputs, &mut board, raw, 5);
        board.now = (k as u32 + 1) * 60_001;
        feed(&mut inputs, &mut board, raw, 1);
    }
    assert_eq!(inputs.analog_value(Name::DeltaTextern).value, -50);
    assert_eq!(inputs.analog_value(Name::DeltaTextern).to_string(), "-0.50C");
}

#[test]
fn charge_energy_and_power() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard {
        charge: true,
        ..Default::default()
    };
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    let raw = RawSamples::default().with(Name::Vout, 12_000).with(Name::Ismps, 2000);
    feed(&mut inputs, &mut board, raw, 100);
    assert_eq!(inputs.iout(), 2000);
    assert_eq!(inputs.pout(), 2400);
    assert_eq!(charge.output_current(), 2000);

    // one hour of slow ticks
    for _ in 0..450_000 {
        charge.tick();
    }
    assert_eq!(inputs.charge(), 2000);
    feed(&mut inputs, &mut board, raw, 100);
    assert_eq!(inputs.cout(), 2000);
    assert_eq!(inputs.eout(), 2400);

    board.charge = false;
    feed(&mut inputs, &mut board, raw, 100);
    assert_eq!(inputs.iout(), 0);
    assert_eq!(charge.output_current(), 0);
}

#[test]
fn power_on_is_idempotent() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard {
        next_sample: RawSamples::default().with(Name::Vout, 7400),
        ..Default::default()
    };
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    // stale state from before power on
    feed(&mut inputs, &mut board, RawSamples::default().with(Name::Vout, 100), 150);
    charge.publish_output_current(1000);
    charge.tick();

    inputs.power_on(&mut board);
    assert!(inputs.is_power_on());
    assert!(board.output);
    assert_eq!(board.enables, 1);
    assert_eq!(board.immediate_samples, 1);
    assert_eq!(inputs.full_measurement_count(), 1);
    assert_eq!(inputs.vout(), 7400);
    assert_eq!(charge.accumulated(), 0);

    inputs.power_on(&mut board);
    assert_eq!(board.enables, 1);
    assert_eq!(board.immediate_samples, 1);
    assert_eq!(inputs.full_measurement_count(), 1);

    inputs.power_off(&mut board);
    inputs.power_off(&mut board);
    assert!(!inputs.is_power_on());
    assert!(!board.output);
    assert_eq!(board.disables, 2);
}

#[test]
fn reverse_polarity_uses_instant_samples() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    let raw = RawSamples::default().with(Name::VreversePolarity, 10_000).with(Name::Vout, 6000);
    feed(&mut inputs, &mut board, raw, 1);
    assert!(inputs.is_reverse_polarity());
    feed(&mut inputs, &mut board, raw.with(Name::Vout, 7000), 1);
    assert!(!inputs.is_reverse_polarity()); // exactly at the threshold
    feed(&mut inputs, &mut board, raw.with(Name::Vout, 12_000), 1);
    assert!(!inputs.is_reverse_polarity());
}

#[test]
fn calibration_point_accessors() {
    let charge = ChargeIntegrator::new();
    let mut inputs = context(&charge);

    assert_eq!(inputs.calibration_point(Name::Pout, 0), CalibrationPoint::IDENTITY);
    assert_eq!(inputs.calibration_point(Name::Vout, 2), CalibrationPoint::IDENTITY);
    assert_eq!(inputs.calibration_point(Name::Vout, 1), IDENTITY[1]);

    // out of range is ignored
    assert_eq!(inputs.set_calibration_point(Name::Vout, 2, CalibrationPoint::new(5, 5)), Ok(()));
    assert_eq!(inputs.set_calibration_point(Name::Iout, 0, CalibrationPoint::new(5, 5)), Ok(()));
    assert_eq!(inputs.storage().read_points(Name::Vout), IDENTITY);

    // equal raw coordinates are refused and nothing is stored
    assert_eq!(
        inputs.set_calibration_point(Name::Vout, 0, CalibrationPoint::new(1000, 0)),
        Err(CalibrationError::DegeneratePoints { name: Name::Vout })
    );
    assert_eq!(inputs.storage().read_points(Name::Vout), IDENTITY);

    let p = CalibrationPoint::new(2000, 4000);
    assert_eq!(inputs.set_calibration_point(Name::Vout, 1, p), Ok(()));
    assert_eq!(inputs.calibration_point(Name::Vout, 1), p);
    assert_eq!(inputs.calibrate(Name::Vout, 1500), Ok(3000));
    assert_eq!(inputs.reverse_calibrate(Name::Vout, 3000), Ok(1500));

    inputs.restore_defaults();
    let table = CalibrationTable::new();
    for name in Name::physical() {
        assert_eq!(inputs.storage().read_points(name), table.read_points(name));
    }
}

#[test]
fn broken_calibration_keeps_last_value() {
    let charge = ChargeIntegrator::new();
    let shared = SharedStorage::new(identity_table());
    let mut board = MockBoard::default();
    let mut inputs = AnalogInputs::new(Config::default(), &shared, &charge).unwrap();
    inputs.initialize(&board);

    let raw = RawSamples::default().with(Name::Vin, 15_000);
    feed(&mut inputs, &mut board, raw, 300);
    assert_eq!(inputs.stable_count(Name::Vin), 2);

    // another context writes a degenerate pair behind the core's back
    let mut other = &shared;
    other.write_points(Name::Vin, &[CalibrationPoint::new(10, 0), CalibrationPoint::new(10, 100)]);

    feed(&mut inputs, &mut board, raw.with(Name::Vin, 20_000), 100);
    assert_eq!(inputs.real_value(Name::Vin), 15_000);
    assert_eq!(inputs.stable_count(Name::Vin), 0);
    assert_eq!(inputs.avr_adc_value(Name::Vin), 20_000);
}

#[test]
fn drain_processes_queued_ticks() {
    let charge = ChargeIntegrator::new();
    let mut board = MockBoard::default();
    let mut inputs = context(&charge);
    inputs.initialize(&board);

    let mut queue: SampleQueue<128> = SampleQueue::new();
    let (mut producer, mut consumer) = split(&mut queue);
    for i in 0..100u16 {
        assert!(producer.push(RawSamples::default().with(Name::Ismps, i)));
    }
    assert_eq!(inputs.drain(&mut consumer, &mut board), 100);
    assert!(consumer.is_empty());
    assert_eq!(inputs.full_measurement_count(), 1);
    assert_eq!(inputs.avr_adc_value(Name::Ismps), 49);
    assert_eq!(inputs.drain(&mut consumer, &mut board), 0);
}
