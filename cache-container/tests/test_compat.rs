use cache_container::{
    evaluate, CompatibilityResult, ContainerSpecBuilder, ErrorKind, ProtocolVersion,
};
use quickcheck::{quickcheck, Arbitrary, Gen};
use rstest::rstest;

#[derive(Clone, Debug)]
struct ArbitraryProtocol(ProtocolVersion);

impl Arbitrary for ArbitraryProtocol {
    fn arbitrary(g: &mut Gen) -> Self {
        ArbitraryProtocol(*g.choose(&ProtocolVersion::ALL).unwrap())
    }
}

#[derive(Clone, Debug)]
struct ArbitraryVersion(String);

impl Arbitrary for ArbitraryVersion {
    fn arbitrary(g: &mut Gen) -> Self {
        let major = u8::arbitrary(g) % 15;
        let minor = u8::arbitrary(g) % 10;
        let patch = u8::arbitrary(g) % 10;
        let qualifier = g.choose(&["", ".Final", ".CR1", "-SNAPSHOT"]).unwrap();
        ArbitraryVersion(format!("{major}.{minor}.{patch}{qualifier}"))
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().map(ArbitraryVersion))
    }
}

#[rstest]
#[case("9.1.4.Final", ProtocolVersion::V2_6, CompatibilityResult::Compatible)]
#[case("9.1.4", ProtocolVersion::V2_0, CompatibilityResult::Compatible)]
#[case("9.2.0.Final", ProtocolVersion::V2_8, CompatibilityResult::Compatible)]
#[case("8.2.8.Final", ProtocolVersion::V2_6, CompatibilityResult::Compatible)]
#[case("latest", ProtocolVersion::V2_6, CompatibilityResult::Compatible)]
#[case("9.0.3.Final", ProtocolVersion::V2_6, CompatibilityResult::ServerTooOld)]
#[case("9.0", ProtocolVersion::V2_6, CompatibilityResult::ServerTooOld)]
#[case("9.01", ProtocolVersion::V2_6, CompatibilityResult::Compatible)]
#[case("7.2.5.Final", ProtocolVersion::V2_6, CompatibilityResult::ServerTooOld)]
#[case("1.0", ProtocolVersion::V2_6, CompatibilityResult::ServerTooOld)]
#[case("9.1.4.Final", ProtocolVersion::V1_3, CompatibilityResult::ProtocolTooOld)]
#[case("7.2.5.Final", ProtocolVersion::V1_0, CompatibilityResult::ProtocolTooOld)]
fn test_evaluate(
    #[case] server: &str,
    #[case] protocol: ProtocolVersion,
    #[case] expected: CompatibilityResult,
) {
    assert_eq!(evaluate(server, protocol), expected);
}

#[test]
fn test_gate_applies_to_builder() {
    let err = ContainerSpecBuilder::new("cache-server:7.2.5.Final")
        .with_caches(["testCache"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerTooOld);

    let err = ContainerSpecBuilder::new("cache-server:9.1.4")
        .with_protocol_version(ProtocolVersion::V1_2)
        .with_caches(["testCache"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolTooOld);
}

quickcheck! {
    fn protocol_below_floor_always_fails(version: ArbitraryVersion, protocol: ArbitraryProtocol) -> bool {
        let result = evaluate(&version.0, protocol.0);
        (protocol.0 < ProtocolVersion::FLOOR) == (result == CompatibilityResult::ProtocolTooOld)
    }

    fn leading_one_to_seven_is_too_old(version: ArbitraryVersion) -> bool {
        let result = evaluate(&version.0, ProtocolVersion::CURRENT);
        let leading = version.0.chars().next();
        match leading {
            Some('1'..='7') => result == CompatibilityResult::ServerTooOld,
            _ => true,
        }
    }

    fn nine_zero_line_is_too_old(patch: u8) -> bool {
        let version = format!("9.0.{patch}.Final");
        evaluate(&version, ProtocolVersion::CURRENT) == CompatibilityResult::ServerTooOld
    }

    fn compatible_only_from_floor(version: ArbitraryVersion, protocol: ArbitraryProtocol) -> bool {
        !evaluate(&version.0, protocol.0).is_compatible() || protocol.0 >= ProtocolVersion::FLOOR
    }

    fn with_command_is_idempotent(tokens: Vec<String>) -> bool {
        let tokens: Vec<String> = tokens
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect();
        let once = ContainerSpecBuilder::new("cache-server:9.1.4")
            .with_exposed_endpoint("hotrod", 11222)
            .with_command(tokens.clone());
        let twice = once.clone().with_command(tokens);
        let once = once.build().unwrap();
        let twice = twice.build().unwrap();
        once.command() == twice.command()
            && once.command().iter().filter(|t| *t == "standalone").count() == 1
    }
}
