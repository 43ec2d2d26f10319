use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;
use trackside::assembler::{AssemblyOptions, race::assemble_race};
use trackside::session::telemetry::{
    DISTANCE_CHANNEL, DRS_CHANNEL, SPEED_CHANNEL, X_CHANNEL, Y_CHANNEL,
};
use trackside::session::{
    CircuitInfo, DriverInfo, EventInfo, Lap, LapRecord, Session, SessionId, SessionType, Telemetry,
};
use trackside::signal::{drs_zones, has_activation};

const LAP_SAMPLES: usize = 400;
const LAP_LENGTH_M: f64 = 5000.;

fn create_lap_telemetry(start_s: f64, lap_time_s: f64) -> Telemetry {
    let step_s = lap_time_s / LAP_SAMPLES as f64;
    let times: Vec<f64> = (0..LAP_SAMPLES).map(|i| start_s + i as f64 * step_s).collect();
    let distance: Vec<f64> = (0..LAP_SAMPLES)
        .map(|i| LAP_LENGTH_M * i as f64 / LAP_SAMPLES as f64)
        .collect();
    let angle: Vec<f64> = (0..LAP_SAMPLES)
        .map(|i| std::f64::consts::TAU * i as f64 / LAP_SAMPLES as f64)
        .collect();
    let drs: Vec<i32> = (0..LAP_SAMPLES)
        .map(|i| if (40..80).contains(&i) { 12 } else { 0 })
        .collect();

    Telemetry::new(times)
        .with_channel(X_CHANNEL, angle.iter().map(|a| 800. * a.cos()).collect::<Vec<_>>())
        .unwrap()
        .with_channel(Y_CHANNEL, angle.iter().map(|a| 500. * a.sin()).collect::<Vec<_>>())
        .unwrap()
        .with_channel(DISTANCE_CHANNEL, distance)
        .unwrap()
        .with_channel(SPEED_CHANNEL, vec![210.; LAP_SAMPLES])
        .unwrap()
        .with_channel(DRS_CHANNEL, drs)
        .unwrap()
}

fn create_race(drivers: u32, laps: u32) -> Session {
    let mut lap_list = Vec::new();
    let mut driver_list = Vec::new();
    for number in 1..=drivers {
        let code = format!("D{:02}", number);
        let lap_time_s = 90. + number as f64 * 0.1;
        for lap_number in 1..=laps {
            let start_s = 3600. + (lap_number - 1) as f64 * lap_time_s;
            lap_list.push(Lap::with_telemetry(
                LapRecord {
                    driver: code.clone(),
                    driver_number: number,
                    lap_number,
                    lap_time_ms: Some((lap_time_s * 1000.) as u64),
                    deleted: false,
                },
                create_lap_telemetry(start_s, lap_time_s),
            ));
        }
        driver_list.push(DriverInfo {
            code,
            number,
            team: None,
            team_color: None,
        });
    }

    Session::new(
        SessionId::new(2024, 1, SessionType::Race),
        EventInfo::default(),
        CircuitInfo::default(),
        driver_list,
        lap_list,
        Vec::new(),
    )
}

fn bench_drs_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("drs_detection");

    let telemetry = create_lap_telemetry(0., 90.);

    group.bench_function("has_activation", |b| {
        b.iter(|| black_box(has_activation(Some(black_box(&telemetry)))));
    });

    group.bench_function("drs_zones", |b| {
        b.iter(|| black_box(drs_zones(black_box(&telemetry))));
    });

    group.finish();
}

fn bench_race_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("race_assembly");

    let short_race = create_race(20, 3);
    group.bench_function("assemble_20_drivers_3_laps", |b| {
        b.iter(|| black_box(assemble_race(&short_race, &AssemblyOptions::default())));
    });

    let long_race = create_race(20, 20);
    group.bench_function("assemble_20_drivers_20_laps", |b| {
        b.iter(|| black_box(assemble_race(&long_race, &AssemblyOptions::default())));
    });

    group.finish();
}

fn bench_frame_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let race = assemble_race(&create_race(20, 1), &AssemblyOptions::default());
    let frame = race.frames[race.frames.len() / 2].clone();

    group.bench_function("serialize_frame", |b| {
        b.iter(|| black_box(serde_json::to_string(&frame).unwrap()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(50);
    targets = bench_drs_detection, bench_race_assembly, bench_frame_serialization
}
criterion_main!(benches);
