mod common;

use std::path::PathBuf;

use common::{el, ep, init_tracing, ms, us};
use fabric_sim::{
    elements::can::{FrameFormat, FramePolicy},
    units::Millisecs,
    Config, ElementConfig, Error, SendDesc,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn reads_topology_file() -> anyhow::Result<()> {
    let topology = fabric_sim::read_topology(fixture("topology.json"))?;
    assert_eq!(topology.elements.len(), 3);
    assert_eq!(topology.routes.len(), 3);
    assert!(topology.routes[2].hops.is_empty());
    let ElementConfig::Can(can) = &topology.elements[2].config else {
        anyhow::bail!("expected a CAN bus, got {:?}", topology.elements[2].config);
    };
    assert_eq!(can.frame_format, FrameFormat::Extended);
    assert_eq!(can.policy, FramePolicy::MostRecent);
    Ok(())
}

#[test]
fn runs_topology_from_file() -> anyhow::Result<()> {
    init_tracing();
    let topology = fabric_sim::read_topology(fixture("topology.json"))?;
    let sends = [2, 3, 4]
        .into_iter()
        .map(|dest| {
            SendDesc::builder()
                .source(ep(1))
                .dest(ep(dest))
                .at(Millisecs::ZERO)
                .payload(dest)
                .build()
        })
        .collect();
    let records = fabric_sim::run(Config::builder().topology(topology).sends(sends).build())?;
    let got: Vec<_> = records.iter().map(|r| (r.payload, r.delivered)).collect();
    assert_eq!(
        got,
        vec![
            // No hops: delivered as sent
            (4, ms(0)),
            // 128 bits at 125 kbit/s
            (3, us(1_024)),
            // Switch stages, then three bus service units
            (2, ms(303)),
        ]
    );
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        fabric_sim::read_topology(fixture("missing.json")),
        Err(Error::Io(_))
    ));
}

#[test]
fn invalid_element_is_rejected_on_build() -> anyhow::Result<()> {
    let json = r#"{ "id": 4, "kind": "bus", "service_time_factor": 0 }"#;
    let desc: fabric_sim::ElementDesc = serde_json::from_str(json)?;
    assert_eq!(desc.id, el(4));
    assert!(matches!(
        desc.config.build::<()>(desc.id),
        Err(Error::Configuration { .. })
    ));
    Ok(())
}
