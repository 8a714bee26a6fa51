mod common;

use common::{el, ep, init_tracing, ms};
use fabric_sim::{
    elements::basic::SwitchConfig,
    port::{PortBinding, PortIndex},
    units::Millisecs,
    Config, ElementConfig, ElementDesc, Record, Route, SendDesc, Topology,
};

// Senders 0 and 1 on input ports 0 and 1; receivers 10 and 11 on output ports 0 and 1
fn switch_config() -> SwitchConfig {
    let delay = Millisecs::new(100).into_ns();
    SwitchConfig::builder()
        .nr_ports(2)
        .input_buffer_delay(delay)
        .switch_fabric_delay(delay)
        .output_buffer_delay(delay)
        .inputs(vec![
            PortBinding::new(ep(0), PortIndex::ZERO),
            PortBinding::new(ep(1), PortIndex::ONE),
        ])
        .outputs(vec![
            PortBinding::new(ep(10), PortIndex::ZERO),
            PortBinding::new(ep(11), PortIndex::ONE),
        ])
        .build()
}

fn run(config: ElementConfig, pairs: &[(usize, usize)]) -> anyhow::Result<Vec<Record<usize>>> {
    init_tracing();
    let routes = [0, 1]
        .into_iter()
        .flat_map(|s| [10, 11].map(|d| Route::new(ep(s), ep(d), vec![el(0)])))
        .collect();
    let sends = pairs
        .iter()
        .enumerate()
        .map(|(i, &(s, d))| {
            SendDesc::builder()
                .source(ep(s))
                .dest(ep(d))
                .at(Millisecs::ZERO)
                .payload(i)
                .build()
        })
        .collect();
    let topology = Topology {
        elements: vec![ElementDesc::new(el(0), config)],
        routes,
    };
    Ok(fabric_sim::run(Config::builder().topology(topology).sends(sends).build())?)
}

#[test]
fn disjoint_pairs_cross_in_parallel() -> anyhow::Result<()> {
    let records = run(ElementConfig::Crossbar(switch_config()), &[(0, 11), (1, 10)])?;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.delivered == ms(300)));
    Ok(())
}

#[test]
fn basic_switch_serializes_the_same_pairs() -> anyhow::Result<()> {
    let records = run(ElementConfig::Basic(switch_config()), &[(0, 11), (1, 10)])?;
    let delivered: Vec<_> = records.iter().map(|r| r.delivered).collect();
    assert_eq!(delivered, vec![ms(300), ms(400)]);
    Ok(())
}

#[test]
fn shared_output_is_contended() -> anyhow::Result<()> {
    let records = run(ElementConfig::Crossbar(switch_config()), &[(0, 10), (1, 10)])?;
    let got: Vec<_> = records.iter().map(|r| (r.payload, r.delivered)).collect();
    // The second transfer waits for the output column, then crosses
    assert_eq!(got, vec![(0, ms(300)), (1, ms(400))]);
    Ok(())
}
