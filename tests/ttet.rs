mod common;

use common::{el, ep, init_tracing, ms};
use fabric_sim::{
    elements::ttet::TtEtConfig, units::Millisecs, Config, ElementConfig, ElementDesc, Error,
    Route, SendDesc, Topology,
};

const TT_A: usize = 1;
const TT_B: usize = 2;
const ET: usize = 3;
const RX: usize = 9;

fn topology() -> Topology {
    let arbiter = TtEtConfig::builder()
        .service_time(Millisecs::new(10))
        .time_triggered(vec![ep(TT_A), ep(TT_B)])
        .build();
    Topology {
        elements: vec![ElementDesc::new(el(0), ElementConfig::TtEt(arbiter))],
        routes: [TT_A, TT_B, ET]
            .into_iter()
            .map(|s| Route::new(ep(s), ep(RX), vec![el(0)]))
            .collect(),
    }
}

fn send(source: usize, at: u64) -> SendDesc<&'static str> {
    let payload = match source {
        ET => "et",
        _ => "tt",
    };
    SendDesc::builder()
        .source(ep(source))
        .dest(ep(RX))
        .at(Millisecs::new(at))
        .payload(payload)
        .build()
}

#[test]
fn time_triggered_overtakes_waiting_event_triggered() -> anyhow::Result<()> {
    init_tracing();
    let cfg = Config::builder()
        .topology(topology())
        .sends(vec![send(ET, 0), send(ET, 1), send(TT_A, 2)])
        .build();
    let records = fabric_sim::run(cfg)?;
    let got: Vec<_> = records.iter().map(|r| (r.payload, r.delivered)).collect();
    assert_eq!(got, vec![("et", ms(10)), ("tt", ms(20)), ("et", ms(30))]);
    Ok(())
}

#[test]
fn overlapping_time_triggered_frames_violate_the_schedule() {
    init_tracing();
    let cfg = Config::builder()
        .topology(topology())
        .sends(vec![send(TT_A, 0), send(TT_B, 4)])
        .build();
    assert!(matches!(
        fabric_sim::run(cfg),
        Err(Error::ScheduleViolation { element, at }) if element == el(0) && at == ms(4)
    ));
}

#[test]
fn time_triggered_frames_on_schedule_are_accepted() -> anyhow::Result<()> {
    init_tracing();
    let cfg = Config::builder()
        .topology(topology())
        .sends(vec![send(TT_A, 0), send(TT_B, 10), send(TT_A, 25)])
        .build();
    let records = fabric_sim::run(cfg)?;
    let delivered: Vec<_> = records.iter().map(|r| r.delivered).collect();
    assert_eq!(delivered, vec![ms(10), ms(20), ms(35)]);
    Ok(())
}
